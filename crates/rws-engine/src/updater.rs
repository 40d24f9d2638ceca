//! Change feed adapter: applies change batches to registered groups.
//!
//! Each [`ChangeBatch`] runs one Begin/Apply/End cycle on the shared
//! [`GroupRegistry`]:
//!
//! | Delta | Effect |
//! |-------|--------|
//! | `Added` | classify, add on include (`REPLACED` removes the old entry first) |
//! | `Removed` | remove from every group (containers take their subtree) |
//! | `Changed` with `OPEN`, or the metadata file | re-derive, skip children |
//! | any other `Changed` | nothing, children are visited |
//!
//! A resolution failure aborts the apply phase. The end phase still runs, so
//! every change applied before the failure is published.

use std::sync::Arc;

use parking_lot::Mutex;
use rws_core::DEFAULT_METADATA_FILE_NAME;
use serde::Serialize;

use crate::delta::{ChangeBatch, ChangeFlags, DeltaKind, DeltaVisitor, ResourceDelta};
use crate::error::EngineError;
use crate::registry::{Batch, GroupRegistry};
use crate::working_set::WorkingSet;
use crate::workspace::Workspace;

/// Outcome of processing one batch.
#[derive(Debug, Default, Serialize)]
pub struct BatchReport {
    /// Number of deltas that had a membership effect.
    pub events: usize,
    /// Number of groups whose membership was published.
    pub groups_flushed: usize,
    /// The error that cut the apply phase short, if any.
    #[serde(serialize_with = "serialize_error")]
    pub aborted: Option<EngineError>,
}

impl BatchReport {
    /// Returns `true` if every delta was applied.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.aborted.is_none()
    }
}

// serde hands `serialize_with` a reference to the field
#[allow(clippy::ref_option)]
fn serialize_error<S: serde::Serializer>(
    error: &Option<EngineError>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match error {
        Some(err) => serializer.serialize_some(&err.to_string()),
        None => serializer.serialize_none(),
    }
}

/// Keeps registered groups current as change batches arrive.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use rws_engine::{
///     ChangeBatch, ChangeFlags, DeltaKind, DeltaTreeBuilder, MemoryWorkspace,
///     SharedWorkingSet, WorkingSet, WorkingSetUpdater,
/// };
/// use rws_core::ResourceHandle;
///
/// let working_set = SharedWorkingSet::new("src/.*\\.txt");
/// let updater = WorkingSetUpdater::new(MemoryWorkspace::with_files(&["src/a.txt"]));
/// updater.add(Arc::new(working_set.clone()));
///
/// let mut builder = DeltaTreeBuilder::new();
/// builder.push(ResourceHandle::file("src/a.txt"), DeltaKind::Added, ChangeFlags::NONE);
/// let report = updater.process(&ChangeBatch::from_builder(builder));
///
/// assert!(report.is_complete());
/// assert_eq!(working_set.elements().len(), 1);
/// ```
#[derive(Debug)]
pub struct WorkingSetUpdater<W> {
    registry: Arc<Mutex<GroupRegistry>>,
    workspace: W,
    metadata_file_name: String,
}

impl<W: Workspace> WorkingSetUpdater<W> {
    /// Creates an updater with its own empty registry.
    pub fn new(workspace: W) -> Self {
        Self::with_registry(Arc::new(Mutex::new(GroupRegistry::new())), workspace)
    }

    /// Creates an updater over a shared registry.
    pub fn with_registry(registry: Arc<Mutex<GroupRegistry>>, workspace: W) -> Self {
        Self {
            registry,
            workspace,
            metadata_file_name: DEFAULT_METADATA_FILE_NAME.to_owned(),
        }
    }

    /// Sets the file name whose change re-derives membership.
    #[must_use]
    pub fn with_metadata_file_name(mut self, name: impl Into<String>) -> Self {
        self.metadata_file_name = name.into();
        self
    }

    /// Returns the shared registry.
    #[must_use]
    pub fn registry(&self) -> Arc<Mutex<GroupRegistry>> {
        Arc::clone(&self.registry)
    }

    /// Returns the workspace.
    pub const fn workspace(&self) -> &W {
        &self.workspace
    }

    /// Returns the workspace for modification.
    pub fn workspace_mut(&mut self) -> &mut W {
        &mut self.workspace
    }

    /// Registers a working set. Returns its current name.
    pub fn add(&self, working_set: Arc<dyn WorkingSet>) -> String {
        self.registry.lock().register(working_set)
    }

    /// Unregisters a group by its current name.
    pub fn remove(&self, name: &str) -> bool {
        self.registry.lock().unregister(name)
    }

    /// Returns `true` if a group is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.registry.lock().contains(name)
    }

    /// Recomputes one group from the whole workspace.
    pub fn commit(&self, name: &str) -> Result<bool, EngineError> {
        self.registry.lock().commit(name, &self.workspace)
    }

    /// Applies one batch of changes.
    ///
    /// The registry lock is held for the whole batch, so batches are applied
    /// one at a time and each sees one snapshot of every group's rules.
    pub fn process(&self, batch: &ChangeBatch) -> BatchReport {
        let Some(root) = &batch.root else {
            return BatchReport::default();
        };

        let mut registry = self.registry.lock();
        let mut visitor = FeedVisitor {
            batch: registry.begin(),
            workspace: &self.workspace,
            metadata_file_name: &self.metadata_file_name,
            events: 0,
        };
        let result = root.accept(&mut visitor);
        let events = visitor.events;
        let groups_flushed = visitor.batch.finish();

        let aborted = result.err();
        if let Some(err) = &aborted {
            tracing::error!(error = %err, events, groups_flushed, "Change batch aborted");
        } else {
            tracing::debug!(
                events,
                groups_flushed,
                elapsed_ms = batch.received_at.elapsed().as_millis(),
                "Change batch applied"
            );
        }
        BatchReport {
            events,
            groups_flushed,
            aborted,
        }
    }
}

struct FeedVisitor<'a, 'r, W> {
    batch: Batch<'r>,
    workspace: &'a W,
    metadata_file_name: &'a str,
    events: usize,
}

impl<W: Workspace> FeedVisitor<'_, '_, W> {
    fn needs_rederive(&self, delta: &ResourceDelta) -> bool {
        delta.flags.contains(ChangeFlags::OPEN)
            || delta.resource.name() == Some(self.metadata_file_name)
    }
}

impl<W: Workspace> DeltaVisitor for FeedVisitor<'_, '_, W> {
    fn visit(&mut self, delta: &ResourceDelta) -> Result<bool, EngineError> {
        let resource = &delta.resource;
        match delta.kind {
            DeltaKind::Added => {
                self.events += 1;
                if delta.flags.contains(ChangeFlags::REPLACED) {
                    self.batch.remove(resource);
                }
                self.batch.add(resource);
                Ok(true)
            }
            DeltaKind::Removed => {
                self.events += 1;
                self.batch.remove(resource);
                Ok(true)
            }
            DeltaKind::Changed if self.needs_rederive(delta) => {
                self.events += 1;
                if resource.is_file() {
                    self.batch.rederive_file(resource);
                } else {
                    let contents = self.workspace.descendants(resource)?;
                    self.batch.rederive_container(resource, &contents);
                }
                Ok(false)
            }
            DeltaKind::Changed => Ok(true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delta::DeltaTreeBuilder;
    use crate::working_set::SharedWorkingSet;
    use crate::workspace::MemoryWorkspace;
    use rws_core::{ResourceHandle, ResourcePath};

    fn batch(changes: &[(ResourceHandle, DeltaKind, ChangeFlags)]) -> ChangeBatch {
        let mut builder = DeltaTreeBuilder::new();
        for (handle, kind, flags) in changes {
            builder.push(handle.clone(), *kind, *flags);
        }
        ChangeBatch::from_builder(builder)
    }

    #[test]
    fn test_empty_batch_does_nothing() {
        let updater = WorkingSetUpdater::new(MemoryWorkspace::new());
        let report = updater.process(&ChangeBatch::new(None));
        assert_eq!(report.events, 0);
        assert!(report.is_complete());
    }

    #[test]
    fn test_content_change_is_ignored() {
        let set = SharedWorkingSet::new("docs/");
        set.set_elements(vec![ResourcePath::new("src/a.txt")]);
        let updater = WorkingSetUpdater::new(MemoryWorkspace::with_files(&["src/a.txt"]));
        updater.add(Arc::new(set.clone()));

        let report = updater.process(&batch(&[(
            ResourceHandle::file("src/a.txt"),
            DeltaKind::Changed,
            ChangeFlags::CONTENT,
        )]));
        assert_eq!(report.events, 0);
        assert_eq!(report.groups_flushed, 0);
        assert_eq!(set.elements(), vec![ResourcePath::new("src/a.txt")]);
    }

    #[test]
    fn test_metadata_file_change_rederives_file() {
        let set = SharedWorkingSet::new("\\.project$");
        let updater = WorkingSetUpdater::new(MemoryWorkspace::with_files(&["p/.project"]));
        updater.add(Arc::new(set.clone()));

        let report = updater.process(&batch(&[(
            ResourceHandle::file("p/.project"),
            DeltaKind::Changed,
            ChangeFlags::CONTENT,
        )]));
        assert_eq!(report.events, 1);
        assert_eq!(set.elements(), vec![ResourcePath::new("p/.project")]);
    }

    #[test]
    fn test_custom_metadata_file_name() {
        let set = SharedWorkingSet::new("Cargo");
        let updater = WorkingSetUpdater::new(MemoryWorkspace::with_files(&["p/Cargo.toml"]))
            .with_metadata_file_name("Cargo.toml");
        updater.add(Arc::new(set.clone()));
        updater.process(&batch(&[(
            ResourceHandle::file("p/Cargo.toml"),
            DeltaKind::Changed,
            ChangeFlags::CONTENT,
        )]));
        assert_eq!(set.publish_count(), 1);
    }

    #[test]
    fn test_replaced_file_leaves_the_group() {
        let set = SharedWorkingSet::new("p/x");
        set.set_elements(vec![ResourcePath::new("p/x")]);
        let updater = WorkingSetUpdater::new(MemoryWorkspace::with_files(&["p/x/keep.bin"]));
        updater.add(Arc::new(set.clone()));

        let report = updater.process(&batch(&[
            (ResourceHandle::file("p/x"), DeltaKind::Removed, ChangeFlags::NONE),
            (ResourceHandle::file("p/x/keep.bin"), DeltaKind::Added, ChangeFlags::NONE),
            (ResourceHandle::container("p/x"), DeltaKind::Added, ChangeFlags::NONE),
        ]));

        assert_eq!(report.events, 2);
        assert_eq!(set.elements(), vec![ResourcePath::new("p/x/keep.bin")]);
    }

    #[test]
    fn test_report_serializes_abort_as_message() {
        let report = BatchReport {
            events: 2,
            groups_flushed: 1,
            aborted: Some(EngineError::resolution(ResourcePath::new("p"), "closed")),
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["aborted"], "failed to resolve p: closed");
    }
}
