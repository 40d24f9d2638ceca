//! Full rescans: the complete matching set for some rule text.
//!
//! Used for live previews while rules are edited and when a group is
//! committed. A rescan has no prior state; it walks the workspace from the
//! root and classifies every file with the same [`GroupFilter`] the change
//! feed uses.

use std::time::Instant;

use rws_core::{ResourcePath, group_name};

use crate::error::EngineError;
use crate::filter::GroupFilter;
use crate::membership::MembershipStore;
use crate::workspace::Workspace;

/// Returns every file in `workspace` that `rules` include, in walk order.
///
/// # Errors
///
/// - [`EngineError::Rules`] if the rule text does not compile
/// - [`EngineError::Resolution`] (or a walk error) if the workspace cannot
///   be enumerated
///
/// # Examples
///
/// ```
/// use rws_engine::{MemoryWorkspace, collect_matches};
///
/// let workspace = MemoryWorkspace::with_files(&["src/a.txt", "src/tmp/b.txt", "docs/c.txt"]);
/// let matches = collect_matches(&workspace, "src/.*\\.txt\n-src/tmp/.*")?;
/// assert_eq!(matches.len(), 1);
/// assert_eq!(matches[0].as_str(), "src/a.txt");
/// # Ok::<(), rws_engine::EngineError>(())
/// ```
pub fn collect_matches<W: Workspace + ?Sized>(
    workspace: &W,
    rules: &str,
) -> Result<Vec<ResourcePath>, EngineError> {
    let start = Instant::now();
    let filter = GroupFilter::compile(&group_name(rules))?;
    let mut store = MembershipStore::new();
    let resources = workspace.descendants(&workspace.root())?;
    for resource in &resources {
        filter.add_resource(resource, &mut store);
    }
    tracing::debug!(
        visited = resources.len(),
        matched = store.len(),
        elapsed_ms = start.elapsed().as_millis(),
        "Rescan complete"
    );
    Ok(store.to_vec())
}
