//! Core types, configuration, and errors for regex working sets.
//!
//! This crate provides the foundational types used across the workspace:
//!
//! - [`ResourcePath`], [`ResourceKind`] and [`ResourceHandle`]: the flat
//!   resource model every other crate classifies and stores
//! - Configuration structures ([`Config`] and its sections)
//! - [`ConfigError`] for configuration loading and validation
//! - Group-name helpers that encode rule text in a working-set name
//! - Type aliases for `FxHashMap`/`FxHashSet`/`FxIndexMap`/`FxIndexSet`

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod group;
pub mod hash;
pub mod resource;

pub use config::{Config, DEFAULT_METADATA_FILE_NAME, GroupConfig, WatchConfig, WorkspaceConfig};
pub use error::ConfigError;
pub use group::{GROUP_NAME_PREFIX, group_name, rules_from_group_name};
pub use hash::{
    FxBuildHasher, FxHashMap, FxHashSet, FxIndexMap, FxIndexSet, fx_hash_map, fx_index_map,
    fx_index_set,
};
pub use resource::{ResourceHandle, ResourceKind, ResourcePath};
