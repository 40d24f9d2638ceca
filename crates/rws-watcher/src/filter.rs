//! Path filtering for watch events.
//!
//! Filters run on the watcher thread, before a path reaches the snapshot, so
//! a rejected path never shows up in any [`ChangeBatch`](rws_engine::ChangeBatch).
//!
//! # Examples
//!
//! ```
//! use rws_watcher::{EventFilter, SkipDirsFilter};
//! use rws_core::ResourcePath;
//!
//! let filter = SkipDirsFilter::new(&[".git", "target"]);
//! assert!(filter.should_process(&ResourcePath::new("p/src/a.txt")));
//! assert!(!filter.should_process(&ResourcePath::new("p/.git/HEAD")));
//! assert!(!filter.should_process(&ResourcePath::new("target")));
//! ```

use rws_core::ResourcePath;
use smallvec::SmallVec;

/// Decides which workspace paths the watcher reports.
///
/// Filters are moved into the blocking watcher task, hence the bounds.
pub trait EventFilter: Send + Sync + 'static {
    /// Returns `true` if changes to `path` should be reported.
    fn should_process(&self, path: &ResourcePath) -> bool;
}

/// A filter that accepts every path.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAllFilter;

impl EventFilter for AcceptAllFilter {
    #[inline]
    fn should_process(&self, _path: &ResourcePath) -> bool {
        true
    }
}

/// Rejects any path with a segment equal to one of the configured names.
#[derive(Debug, Clone, Default)]
pub struct SkipDirsFilter {
    dirs: SmallVec<[String; 4]>,
}

impl SkipDirsFilter {
    /// Creates a filter skipping the given directory names.
    #[must_use]
    pub fn new(dirs: &[&str]) -> Self {
        Self {
            dirs: dirs.iter().map(ToString::to_string).collect(),
        }
    }

    /// Creates a filter from owned names, as found in configuration.
    #[must_use]
    pub fn from_names(dirs: &[String]) -> Self {
        Self {
            dirs: dirs.iter().cloned().collect(),
        }
    }

    /// Returns the skipped directory names.
    #[must_use]
    pub fn dirs(&self) -> &[String] {
        &self.dirs
    }
}

impl EventFilter for SkipDirsFilter {
    fn should_process(&self, path: &ResourcePath) -> bool {
        !path
            .as_str()
            .split('/')
            .any(|segment| self.dirs.iter().any(|dir| dir == segment))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accept_all() {
        assert!(AcceptAllFilter.should_process(&ResourcePath::new("anything")));
        assert!(AcceptAllFilter.should_process(&ResourcePath::root()));
    }

    #[test]
    fn test_skip_dirs_matches_whole_segments() {
        let filter = SkipDirsFilter::new(&[".git"]);
        assert!(!filter.should_process(&ResourcePath::new(".git")));
        assert!(!filter.should_process(&ResourcePath::new("p/.git/objects/ab")));
        assert!(filter.should_process(&ResourcePath::new("p/.gitignore")));
        assert!(filter.should_process(&ResourcePath::new("p/my.git/x")));
    }

    #[test]
    fn test_from_names() {
        let filter = SkipDirsFilter::from_names(&["target".to_owned()]);
        assert_eq!(filter.dirs(), ["target".to_owned()]);
        assert!(!filter.should_process(&ResourcePath::new("crate/target/debug")));
    }
}
