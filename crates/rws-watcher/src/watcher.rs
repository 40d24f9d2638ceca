//! Workspace watcher with async batch streaming.
//!
//! This module provides the [`FileWatcher`] type that bridges the synchronous
//! `notify` debouncer to the async tokio runtime.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Blocking Thread (spawn_blocking)             │
//! │  ┌──────────────────┐    ┌────────────────┐    ┌────────────┐  │
//! │  │ RecommendedWatcher│ -> │ Debouncer      │ -> │ Snapshot   │  │
//! │  │ (notify)         │    │ (one window)   │    │ reconcile  │  │
//! │  └──────────────────┘    └────────────────┘    └─────┬──────┘  │
//! └──────────────────────────────────────────────────────│─────────┘
//!                                                        │
//!                                   blocking_send(batch) │
//!                                                        ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Async Runtime (tokio)                        │
//! │  ┌──────────────────┐    ┌────────────────┐                     │
//! │  │ FileWatcher      │    │ mpsc::Receiver │ -> WorkingSetUpdater│
//! │  │ (shutdown ctrl)  │    │ (ChangeBatch)  │                     │
//! │  └──────────────────┘    └────────────────┘                     │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every debounce window that produces at least one delta becomes exactly
//! one [`ChangeBatch`].

use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use notify::RecursiveMode;
use notify_debouncer_mini::{DebounceEventResult, Debouncer, new_debouncer};
use rws_core::{ResourcePath, WatchConfig};
use rws_engine::{ChangeBatch, DeltaTreeBuilder};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::WatchError;
use crate::filter::EventFilter;
use crate::snapshot::PathSnapshot;

/// Default channel capacity for change batches.
const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Watches a workspace and streams [`ChangeBatch`]es to async code.
///
/// # Lifecycle
///
/// 1. **Creation**: `FileWatcher::new()` validates the root, seeds the
///    known-path snapshot and spawns the blocking notify task.
/// 2. **Reception**: `recv()` / `try_recv()` yield one batch per debounce
///    window.
/// 3. **Shutdown**: `shutdown()` stops the task and reports its result;
///    dropping the watcher sends the shutdown signal without waiting.
///
/// # Examples
///
/// ```no_run
/// use rws_watcher::{FileWatcher, AcceptAllFilter};
/// use rws_core::WatchConfig;
/// use camino::Utf8Path;
///
/// # async fn example() -> Result<(), rws_watcher::WatchError> {
/// let mut watcher = FileWatcher::new(
///     Utf8Path::new("./workspace"),
///     &WatchConfig::default(),
///     AcceptAllFilter,
/// ).await?;
///
/// while let Some(batch) = watcher.recv().await {
///     println!("{:?}", batch.stats());
/// }
/// # Ok(())
/// # }
/// ```
pub struct FileWatcher {
    /// Shutdown signal sender; `None` once shutdown has started.
    shutdown_tx: Option<oneshot::Sender<()>>,

    /// Handle to the blocking watcher task.
    task_handle: Option<JoinHandle<Result<(), WatchError>>>,

    /// Batch receiver for async consumption.
    batch_rx: mpsc::Receiver<ChangeBatch>,

    /// The canonical workspace root being watched.
    watch_path: Utf8PathBuf,
}

impl std::fmt::Debug for FileWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileWatcher")
            .field("watch_path", &self.watch_path)
            .field("is_running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl FileWatcher {
    /// Starts watching the workspace at `path`.
    ///
    /// # Errors
    ///
    /// - [`WatchError::PathNotFound`] if the path doesn't exist
    /// - [`WatchError::Snapshot`] if the initial walk fails
    /// - [`WatchError::Io`] if the path cannot be canonicalized
    pub async fn new<F: EventFilter>(
        path: &Utf8Path,
        config: &WatchConfig,
        filter: F,
    ) -> Result<Self, WatchError> {
        Self::with_capacity(path, config, filter, DEFAULT_CHANNEL_CAPACITY).await
    }

    /// Starts watching with a custom batch channel capacity.
    pub async fn with_capacity<F: EventFilter>(
        path: &Utf8Path,
        config: &WatchConfig,
        filter: F,
        channel_capacity: usize,
    ) -> Result<Self, WatchError> {
        if !path.exists() {
            return Err(WatchError::path_not_found(path));
        }
        let watch_path = path.canonicalize_utf8()?;

        // The initial walk can be large; keep it off the async threads
        let seed_path = watch_path.clone();
        let (snapshot, filter) = tokio::task::spawn_blocking(move || {
            PathSnapshot::scan(&seed_path, &filter).map(|snapshot| (snapshot, filter))
        })
        .await
        .map_err(|_| WatchError::ChannelClosed)??;

        let (batch_tx, batch_rx) = mpsc::channel(channel_capacity);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let task_path = watch_path.clone();
        let debounce_ms = config.debounce_ms;
        let recursive = config.recursive;

        let task_handle = tokio::task::spawn_blocking(move || {
            run_watcher_loop(WatchTask {
                path: task_path,
                debounce_ms,
                recursive,
                batch_tx,
                shutdown_rx,
                snapshot,
                filter,
            })
        });

        Ok(Self {
            shutdown_tx: Some(shutdown_tx),
            task_handle: Some(task_handle),
            batch_rx,
            watch_path,
        })
    }

    /// Receives the next batch.
    ///
    /// Returns `None` once the watcher has stopped.
    pub async fn recv(&mut self) -> Option<ChangeBatch> {
        self.batch_rx.recv().await
    }

    /// Receives a batch without waiting.
    pub fn try_recv(&mut self) -> Result<ChangeBatch, mpsc::error::TryRecvError> {
        self.batch_rx.try_recv()
    }

    /// Returns the batch receiver, for use with `tokio::select!`.
    pub fn batches(&mut self) -> &mut mpsc::Receiver<ChangeBatch> {
        &mut self.batch_rx
    }

    /// Returns the canonical workspace root.
    #[must_use]
    pub fn watch_path(&self) -> &Utf8Path {
        &self.watch_path
    }

    /// Returns `true` if the watcher task is still running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shutdown_tx.is_some() && self.task_handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stops the watcher and waits for its task.
    ///
    /// # Errors
    ///
    /// Returns the error the watcher task stopped with, or
    /// [`WatchError::ChannelClosed`] if it panicked.
    pub async fn shutdown(mut self) -> Result<(), WatchError> {
        if let Some(tx) = self.shutdown_tx.take() {
            // The task may already be gone
            let _ = tx.send(());
        }
        if let Some(handle) = self.task_handle.take() {
            match handle.await {
                Ok(result) => result?,
                Err(_join_error) => return Err(WatchError::ChannelClosed),
            }
        }
        Ok(())
    }
}

impl Drop for FileWatcher {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Everything the blocking task owns.
struct WatchTask<F> {
    path: Utf8PathBuf,
    debounce_ms: u64,
    recursive: bool,
    batch_tx: mpsc::Sender<ChangeBatch>,
    shutdown_rx: oneshot::Receiver<()>,
    snapshot: PathSnapshot,
    filter: F,
}

/// Runs the notify debouncer until the shutdown signal arrives.
fn run_watcher_loop<F: EventFilter>(task: WatchTask<F>) -> Result<(), WatchError> {
    let WatchTask {
        path,
        debounce_ms,
        recursive,
        batch_tx,
        shutdown_rx,
        mut snapshot,
        filter,
    } = task;
    let timeout = Duration::from_millis(debounce_ms);

    let mut debouncer: Debouncer<notify::RecommendedWatcher> =
        new_debouncer(timeout, move |res: DebounceEventResult| match res {
            Ok(events) => {
                let mut paths: Vec<ResourcePath> = Vec::with_capacity(events.len());
                for event in events {
                    let utf8_path = match Utf8PathBuf::try_from(event.path) {
                        Ok(p) => p,
                        Err(e) => {
                            let err = WatchError::non_utf8_path(e.into_path_buf());
                            tracing::warn!(error = %err, "Skipping file event");
                            continue;
                        }
                    };
                    if let Some(resource) = snapshot.relative(&utf8_path) {
                        paths.push(resource);
                    }
                }
                // Parents first, so a new folder is walked before its children
                paths.sort_by(|a, b| a.depth().cmp(&b.depth()).then_with(|| a.cmp(b)));
                paths.dedup();

                let mut builder = DeltaTreeBuilder::new();
                snapshot.reconcile(&paths, &filter, &mut builder);
                if builder.is_empty() {
                    return;
                }
                let batch = ChangeBatch::from_builder(builder);
                tracing::debug!(stats = ?batch.stats(), "Sending change batch");
                if batch_tx.blocking_send(batch).is_err() {
                    tracing::debug!("Batch channel closed, dropping changes");
                }
            }
            Err(error) => {
                tracing::warn!(error = %error, "Debouncer error");
            }
        })?;

    let mode = if recursive {
        RecursiveMode::Recursive
    } else {
        RecursiveMode::NonRecursive
    };
    debouncer.watcher().watch(path.as_std_path(), mode)?;

    tracing::info!(path = %path, recursive, "Workspace watcher started");

    let _ = shutdown_rx.blocking_recv();

    tracing::info!(path = %path, "Workspace watcher stopped");
    Ok(())
}
