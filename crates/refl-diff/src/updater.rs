use std::sync::Arc;

use refl_clone::Cloner;
use refl_property::Property;
use refl_types::{Introspector, Value};
use tracing::{debug, warn};

use crate::change::Change;
use crate::compare::Comparison;
use crate::config::UpdaterConfig;
use crate::error::{DiffError, DiffResult};

/// Diff engine.
///
/// [`Updater::update`] walks an old and a new instance of the same record
/// type along the registered metadata tree, collects one [`Change`] per
/// difference, and brings the old instance up to date with the new one.
pub struct Updater {
    introspector: Arc<dyn Introspector>,
    cloner: Cloner,
    config: UpdaterConfig,
    changes: Vec<Change>,
}

impl Updater {
    pub fn new(introspector: Arc<dyn Introspector>, config: UpdaterConfig) -> Self {
        Self {
            cloner: Cloner::new(Arc::clone(&introspector)),
            introspector,
            config,
            changes: Vec::new(),
        }
    }

    pub fn config(&self) -> &UpdaterConfig {
        &self.config
    }

    /// Changes found by the last successful [`Updater::update`].
    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    /// Hand over the collected changes, leaving the updater empty.
    pub fn take_changes(&mut self) -> Vec<Change> {
        std::mem::take(&mut self.changes)
    }

    /// Compare `old` with `new` and overwrite every differing location of
    /// `old` with a copy of the new value.
    ///
    /// Nothing is written and no changes are kept when the comparison
    /// fails, so a failed update leaves `old` untouched.
    pub fn update(&mut self, old: &mut Value, new: &Value) -> DiffResult<()> {
        self.changes.clear();
        let (Some(old_type), Some(new_type)) = (old.type_name(), new.type_name()) else {
            return Err(DiffError::InvalidInput(format!(
                "expected two records, got {} and {}",
                old.kind_name(),
                new.kind_name()
            )));
        };
        let node = self
            .introspector
            .root_node(&old_type)
            .ok_or_else(|| DiffError::UnregisteredType(old_type.clone()))?;
        let root = Arc::new(Property::root(
            node,
            self.introspector.primary_key_of(old),
            Arc::clone(&self.introspector),
        ));
        if old_type != new_type {
            return Err(DiffError::Mismatch {
                property_id: root.property_id().to_string(),
                old: old_type,
                new: new_type,
            });
        }

        let mut comparison = Comparison {
            introspector: self.introspector.as_ref(),
            cloner: &self.cloner,
            config: self.config,
            changes: Vec::new(),
        };
        if let Err(e) = comparison.compare(&root, old, new) {
            warn!(root = %root.property_id(), error = %e, "diff aborted");
            return Err(e);
        }
        let changes = comparison.changes;
        // Rehearse on a copy first; it lacks `copy = false` fields, so it
        // only proves every write succeeds and is then dropped.
        let mut rehearsal = self.cloner.clone_value(old);
        for change in &changes {
            if let Err(e) = change.apply(&mut rehearsal) {
                warn!(property = %change.property_id(), error = %e, "change cannot be applied");
                return Err(e.into());
            }
        }
        for change in &changes {
            change.apply(old)?;
        }
        debug!(root = %root.property_id(), changes = changes.len(), "diff complete");
        self.changes = changes;
        Ok(())
    }
}
