//! Incremental membership engine for rule-defined working sets.
//!
//! This crate keeps the membership of every registered group current while
//! a workspace changes, without rescanning the workspace for every change.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐    ┌──────────────────┐    ┌───────────────┐
//! │ ChangeBatch  │───▶│ WorkingSetUpdater│───▶│ GroupRegistry │
//! │ (delta tree) │    │  (FeedVisitor)   │    │  Batch cycle  │
//! └──────────────┘    └──────────────────┘    └───────┬───────┘
//!                                                     │
//!                       GroupFilter (fresh per batch) │
//!                                                     ▼
//!                                            ┌─────────────────┐
//!                                            │ MembershipStore │──▶ WorkingSet
//!                                            └─────────────────┘   (publish)
//! ```
//!
//! - [`Workspace`] is the flat resource interface ([`MemoryWorkspace`],
//!   [`FsWorkspace`])
//! - [`collect_matches`] computes a group's full matching set
//! - [`GroupRegistry::commit`] replaces a group's members with a rescan
//!
//! # Usage
//!
//! ```
//! use std::sync::Arc;
//! use rws_engine::{MemoryWorkspace, SharedWorkingSet, WorkingSet, WorkingSetUpdater};
//!
//! let workspace = MemoryWorkspace::with_files(&["src/a.txt", "src/tmp/b.txt", "docs/c.txt"]);
//! let working_set = SharedWorkingSet::new("src/.*\\.txt\n-src/tmp/.*");
//! let updater = WorkingSetUpdater::new(workspace);
//! let name = updater.add(Arc::new(working_set.clone()));
//! updater.commit(&name)?;
//! assert_eq!(working_set.elements().len(), 1);
//! # Ok::<(), rws_engine::EngineError>(())
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod delta;
pub mod error;
pub mod filter;
pub mod fs;
pub mod membership;
pub mod registry;
pub mod scan;
pub mod updater;
pub mod working_set;
pub mod workspace;

pub use delta::{
    BatchStats, ChangeBatch, ChangeFlags, DeltaKind, DeltaTreeBuilder, DeltaVisitor, ResourceDelta,
};
pub use error::EngineError;
pub use filter::GroupFilter;
pub use fs::FsWorkspace;
pub use membership::MembershipStore;
pub use registry::{Batch, GroupRegistry};
pub use scan::collect_matches;
pub use updater::{BatchReport, WorkingSetUpdater};
pub use working_set::{SharedWorkingSet, WorkingSet};
pub use workspace::{MemoryWorkspace, Workspace};
