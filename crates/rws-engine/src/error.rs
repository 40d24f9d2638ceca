//! Error types for the rws-engine crate.
//!
//! This module provides the [`EngineError`] type for errors raised while
//! resolving resources, rescanning a workspace, or applying a change batch.

use camino::Utf8PathBuf;
use rws_core::{ConfigError, ResourcePath};
use rws_rules::RuleError;

/// Errors that can occur while maintaining group membership.
///
/// # Error Recovery Strategy
///
/// - **Resolution failures** ([`EngineError::Resolution`]): abort the current
///   batch's apply phase; the batch is still flushed
/// - **Rule errors** ([`EngineError::Rules`]): block a commit until the rule
///   text is fixed
/// - **Non-UTF-8 paths** ([`EngineError::NonUtf8Path`]): Recoverable - skip the entry
/// - **Walk / I/O errors**: abort the rescan that hit them
///
/// # Examples
///
/// ```
/// use rws_engine::EngineError;
/// use rws_core::ResourcePath;
///
/// let err = EngineError::resolution(ResourcePath::new("p/src"), "project is gone");
/// assert!(err.is_fatal());
/// assert_eq!(err.path().map(ResourcePath::as_str), Some("p/src"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A resource could not be resolved to a concrete entry.
    #[error("failed to resolve {path}: {reason}")]
    Resolution {
        /// The resource that could not be resolved.
        path: ResourcePath,
        /// Why resolution failed.
        reason: String,
    },

    /// The rule text of a group does not compile or is empty.
    #[error(transparent)]
    Rules(#[from] RuleError),

    /// No group is registered under the given name.
    #[error("no group registered as '{0}'")]
    UnknownGroup(String),

    /// The workspace configuration is unusable.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Failed to walk the workspace directory.
    #[error("failed to walk workspace: {0}")]
    Walk(#[from] ignore::Error),

    /// An I/O error occurred on a workspace path.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// The filesystem path involved.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A path is not valid UTF-8.
    #[error("path is not valid UTF-8: {}", _0.display())]
    NonUtf8Path(std::path::PathBuf),
}

impl EngineError {
    /// Creates a new [`EngineError::Resolution`] error.
    #[inline]
    pub fn resolution(path: ResourcePath, reason: impl Into<String>) -> Self {
        Self::Resolution {
            path,
            reason: reason.into(),
        }
    }

    /// Creates a new [`EngineError::Io`] error.
    #[inline]
    pub fn io(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns `true` if the failing entry can be skipped.
    #[inline]
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::NonUtf8Path(_))
    }

    /// Returns `true` if the operation that hit this error must stop.
    #[inline]
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }

    /// Returns the resource associated with this error, if any.
    #[must_use]
    pub const fn path(&self) -> Option<&ResourcePath> {
        match self {
            Self::Resolution { path, .. } => Some(path),
            Self::Rules(_)
            | Self::UnknownGroup(_)
            | Self::Config(_)
            | Self::Walk(_)
            | Self::Io { .. }
            | Self::NonUtf8Path(_) => None,
        }
    }
}
