//! Error types for the rws-watcher crate.
//!
//! This module provides the [`WatchError`] type for errors that can occur
//! while watching a workspace and turning filesystem events into batches.

use camino::Utf8PathBuf;
use rws_engine::EngineError;

/// Errors that can occur during file watching operations.
///
/// # Error Recovery Strategy
///
/// - **Notify errors** ([`WatchError::Notify`]): Fatal - propagate immediately
/// - **Path not found** ([`WatchError::PathNotFound`]): Fatal - path must exist
/// - **Channel closed** ([`WatchError::ChannelClosed`]): Fatal - communication broken
/// - **Snapshot errors** ([`WatchError::Snapshot`]): Fatal - the known-path
///   snapshot could not be seeded
/// - **Non-UTF-8 path** ([`WatchError::NonUtf8Path`]): Recoverable - skip and continue
/// - **I/O errors** ([`WatchError::Io`]): Fatal - propagate immediately
///
/// # Examples
///
/// ```
/// use rws_watcher::WatchError;
///
/// let err = WatchError::path_not_found("/missing/workspace");
/// assert!(err.is_fatal());
/// assert_eq!(err.path().map(|p| p.as_str()), Some("/missing/workspace"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// Failed to initialize or operate the notify watcher.
    #[error("notify watcher error: {0}")]
    Notify(#[from] notify::Error),

    /// The workspace root does not exist.
    #[error("path does not exist: {0}")]
    PathNotFound(Utf8PathBuf),

    /// The batch channel or the watcher task went away unexpectedly.
    #[error("event channel closed unexpectedly")]
    ChannelClosed,

    /// Seeding the known-path snapshot failed.
    #[error("failed to snapshot workspace: {0}")]
    Snapshot(#[from] EngineError),

    /// A path is not valid UTF-8.
    ///
    /// Such events are logged and skipped.
    #[error("path is not valid UTF-8: {}", _0.display())]
    NonUtf8Path(std::path::PathBuf),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WatchError {
    /// Creates a new [`WatchError::PathNotFound`] error.
    #[inline]
    pub fn path_not_found(path: impl Into<Utf8PathBuf>) -> Self {
        Self::PathNotFound(path.into())
    }

    /// Creates a new [`WatchError::NonUtf8Path`] error.
    #[inline]
    pub fn non_utf8_path(path: impl Into<std::path::PathBuf>) -> Self {
        Self::NonUtf8Path(path.into())
    }

    /// Returns `true` if watching can continue past this error.
    #[inline]
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::NonUtf8Path(_))
    }

    /// Returns `true` if watching must stop.
    #[inline]
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }

    /// Returns the file path associated with this error, if any.
    #[must_use]
    pub const fn path(&self) -> Option<&Utf8PathBuf> {
        match self {
            Self::PathNotFound(path) => Some(path),
            Self::Notify(_)
            | Self::ChannelClosed
            | Self::Snapshot(_)
            | Self::NonUtf8Path(_)
            | Self::Io(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rws_core::ResourcePath;
    use std::path::PathBuf;

    #[test]
    fn test_path_not_found() {
        let err = WatchError::path_not_found("ws/missing");
        assert!(err.is_fatal());
        assert_eq!(err.to_string(), "path does not exist: ws/missing");
    }

    #[test]
    fn test_non_utf8_is_recoverable() {
        let err = WatchError::non_utf8_path(PathBuf::from("bad"));
        assert!(err.is_recoverable());
        assert!(err.path().is_none());
    }

    #[test]
    fn test_snapshot_wraps_engine_error() {
        let err = WatchError::from(EngineError::resolution(ResourcePath::new("p"), "gone"));
        assert!(err.is_fatal());
        assert!(err.to_string().starts_with("failed to snapshot workspace"));
    }
}
