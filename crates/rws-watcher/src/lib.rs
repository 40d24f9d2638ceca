//! Filesystem watcher that delivers debounced change batches.
//!
//! This crate watches a workspace directory with `notify`, debounces raw
//! notifications through `notify-debouncer-mini`, and turns every debounce
//! window into one [`ChangeBatch`](rws_engine::ChangeBatch) ready for
//! [`WorkingSetUpdater::process`](rws_engine::WorkingSetUpdater::process).
//!
//! # Crate Dependencies
//!
//! ```text
//! rws-cli ──► rws-watcher ──► rws-engine ──► rws-rules ──► rws-core
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use rws_watcher::{FileWatcher, SkipDirsFilter};
//! use rws_engine::{FsWorkspace, WorkingSetUpdater};
//! use rws_core::WatchConfig;
//! use camino::Utf8Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let root = Utf8Path::new("/path/to/workspace");
//! let updater = WorkingSetUpdater::new(FsWorkspace::new(root)?);
//! let mut watcher =
//!     FileWatcher::new(root, &WatchConfig::default(), SkipDirsFilter::new(&[".git"])).await?;
//!
//! while let Some(batch) = watcher.recv().await {
//!     let report = updater.process(&batch);
//!     println!("{} groups updated", report.groups_flushed);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Performance Considerations
//!
//! - **Debouncing**: a burst of saves inside one window yields one batch, so
//!   the engine publishes each group at most once for the whole burst.
//! - **Filtering at Source**: skipped directories never enter the snapshot
//!   or the channel.
//! - **Bounded Channel**: at most 64 batches are buffered by default.

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod error;
pub mod filter;
pub mod snapshot;
pub mod watcher;

pub use error::WatchError;
pub use filter::{AcceptAllFilter, EventFilter, SkipDirsFilter};
pub use snapshot::PathSnapshot;
pub use watcher::FileWatcher;
