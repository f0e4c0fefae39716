//! Changes produced by the updater and their portable record form.

use std::fmt;
use std::sync::Arc;

use refl_clone::Cloner;
use refl_property::{Property, PropertyResult};
use refl_registry::JsonSerializer;
use refl_types::{Introspector, Value};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use tracing::debug;

use crate::error::DiffResult;

/// One difference between two instances: the address it lives at, the old
/// value, and the new value.
///
/// Both values are deep copies, so a change never aliases the instances it
/// was derived from. A new value of [`Value::Deleted`] removes a map entry.
#[derive(Clone, Debug)]
pub struct Change {
    property: Property,
    old: Value,
    new: Value,
}

impl Change {
    pub(crate) fn new(property: Property, old: Value, new: Value) -> Self {
        Self {
            property: property.with_value(new.clone()),
            old,
            new,
        }
    }

    pub fn property(&self) -> &Property {
        &self.property
    }

    pub fn property_id(&self) -> &str {
        self.property.property_id()
    }

    pub fn old_value(&self) -> &Value {
        &self.old
    }

    pub fn new_value(&self) -> &Value {
        &self.new
    }

    /// True when applying the change removes a map entry.
    pub fn is_deletion(&self) -> bool {
        matches!(self.new, Value::Deleted)
    }

    /// Write a copy of the new value into `target` at this change's address.
    pub fn apply(&self, target: &mut Value) -> PropertyResult<()> {
        debug!(property = %self.property_id(), "apply change");
        self.property.set(target, self.fresh_value())
    }

    /// Apply the change to a new root instance whose primary key comes from
    /// the change's address.
    pub fn instantiate(&self) -> PropertyResult<Value> {
        self.property.instantiate(self.fresh_value())
    }

    /// Portable form of this change, with values rendered as JSON.
    pub fn to_record(&self) -> DiffResult<ChangeRecord> {
        let json = JsonSerializer::new();
        Ok(ChangeRecord {
            property_id: self.property_id().to_string(),
            old: json.to_json(&self.old)?,
            new: match &self.new {
                Value::Deleted => Json::Null,
                value => json.to_json(value)?,
            },
            deleted: self.is_deletion(),
        })
    }

    fn fresh_value(&self) -> Value {
        Cloner::new(Arc::clone(self.property.introspector())).clone_value(&self.new)
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} -> {}", self.property_id(), self.old, self.new)
    }
}

/// Serializable form of a [`Change`] for transmission to another process.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub property_id: String,
    #[serde(default)]
    pub old: Json,
    #[serde(default)]
    pub new: Json,
    /// The change removes the map entry at `property_id`.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub deleted: bool,
}

impl ChangeRecord {
    /// Re-parse the address and decode both values against the declared
    /// type it points at.
    pub fn into_change(self, introspector: Arc<dyn Introspector>) -> DiffResult<Change> {
        let property = Property::parse(&self.property_id, Arc::clone(&introspector))?;
        let ty = property.target_type();
        let json = JsonSerializer::new();
        let old = json.from_json(&ty, &self.old, introspector.as_ref())?;
        let new = if self.deleted {
            Value::Deleted
        } else {
            json.from_json(&ty, &self.new, introspector.as_ref())?
        };
        Ok(Change::new(property, old, new))
    }
}
