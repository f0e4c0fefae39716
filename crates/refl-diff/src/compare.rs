//! Per-kind comparators.
//!
//! The kind of the old value picks the comparator. Every comparator either
//! records changes or recurses with a child address; none of them writes to
//! either instance.

use std::collections::BTreeMap;
use std::sync::Arc;

use refl_clone::Cloner;
use refl_property::Property;
use refl_types::{Introspector, Key, Record, Ref, Value};
use tracing::trace;

use crate::change::Change;
use crate::config::UpdaterConfig;
use crate::error::{DiffError, DiffResult};

pub(crate) struct Comparison<'a> {
    pub introspector: &'a dyn Introspector,
    pub cloner: &'a Cloner,
    pub config: UpdaterConfig,
    pub changes: Vec<Change>,
}

impl Comparison<'_> {
    pub fn compare(&mut self, property: &Arc<Property>, old: &Value, new: &Value) -> DiffResult<()> {
        match old {
            Value::Nil => {
                if !new.is_nil() {
                    self.emit(property, old, new);
                }
                Ok(())
            }
            Value::Bool(_)
            | Value::Int(_)
            | Value::Int32(_)
            | Value::Int64(_)
            | Value::Uint(_)
            | Value::Uint32(_)
            | Value::Uint64(_)
            | Value::Float32(_)
            | Value::Float64(_)
            | Value::String(_) => self.compare_scalar(property, old, new),
            Value::Ptr(shared) => self.compare_ptr(property, shared, old, new),
            Value::Record(record) => self.compare_record(property, record, old, new),
            Value::List(_) | Value::Map(_) => self.compare_container(property, old, new),
            Value::Deleted => Err(DiffError::InvalidInput(format!(
                "{}: deleted-entry marker inside an instance",
                property.property_id()
            ))),
        }
    }

    fn compare_scalar(&mut self, property: &Property, old: &Value, new: &Value) -> DiffResult<()> {
        // A scalar cannot hold nil; the new side simply has no value here.
        if new.is_nil() {
            return Ok(());
        }
        if old.kind() != new.kind() {
            return Err(mismatch(property, old, new));
        }
        if old != new && (!new.is_zero() || self.config.nil_valid) {
            self.emit(property, old, new);
        }
        Ok(())
    }

    fn compare_ptr(
        &mut self,
        property: &Arc<Property>,
        shared: &Ref,
        old: &Value,
        new: &Value,
    ) -> DiffResult<()> {
        match new {
            Value::Nil => {
                if self.config.nil_valid {
                    self.emit(property, old, new);
                }
                Ok(())
            }
            Value::Ptr(other) if shared.ptr_eq(other) => Ok(()),
            Value::Ptr(other) => self.compare(property, &shared.get(), &other.get()),
            Value::Record(_) => self.compare(property, &shared.get(), new),
            _ => Err(mismatch(property, old, new)),
        }
    }

    fn compare_record(
        &mut self,
        property: &Arc<Property>,
        record: &Record,
        old: &Value,
        new: &Value,
    ) -> DiffResult<()> {
        if new.is_nil() {
            if self.config.nil_valid {
                self.emit(property, old, new);
            }
            return Ok(());
        }
        let Some(other) = new.record() else {
            return Err(mismatch(property, old, new));
        };
        if record.type_name() != other.type_name() {
            return Err(DiffError::Mismatch {
                property_id: property.property_id().to_string(),
                old: record.type_name().to_string(),
                new: other.type_name().to_string(),
            });
        }

        let node = Arc::clone(property.node());
        if node.is_leaf() {
            // Recursive or unregistered types have no field nodes here.
            if *old != Value::Record(other) {
                self.emit(property, old, new);
            }
            return Ok(());
        }
        for attribute in node.attributes() {
            if !attribute.compares() {
                continue;
            }
            let Some(new_field) = other.get(attribute.field_name()) else {
                continue;
            };
            let old_field = match record.get(attribute.field_name()) {
                Some(field) => field.clone(),
                None => self.introspector.zero_value(attribute.field_type())?,
            };
            let child = Arc::new(Property::child(
                Arc::clone(property),
                Arc::clone(attribute),
                None,
            ));
            self.compare(&child, &old_field, new_field)?;
        }
        Ok(())
    }

    fn compare_container(
        &mut self,
        property: &Arc<Property>,
        old: &Value,
        new: &Value,
    ) -> DiffResult<()> {
        match (old, new) {
            (_, Value::Nil) => {
                if self.config.nil_valid {
                    self.emit(property, old, new);
                }
                Ok(())
            }
            (Value::Map(before), Value::Map(after)) if self.is_deep(property) => {
                self.compare_entries(property, before, after)
            }
            (Value::List(before), Value::List(after)) if self.is_deep(property) => {
                self.compare_items(property, old, new, before, after)
            }
            (Value::Map(_), Value::Map(_)) | (Value::List(_), Value::List(_)) => {
                if old != new {
                    self.emit(property, old, new);
                }
                Ok(())
            }
            _ => Err(mismatch(property, old, new)),
        }
    }

    /// Containers are compared element by element when they hold records of
    /// a type declared deep.
    fn is_deep(&self, property: &Property) -> bool {
        property.key().is_none()
            && property
                .node()
                .field_type()
                .record_type()
                .and_then(|t| self.introspector.descriptor(t))
                .is_some_and(|d| d.is_deep())
    }

    fn compare_entries(
        &mut self,
        property: &Property,
        before: &BTreeMap<Key, Value>,
        after: &BTreeMap<Key, Value>,
    ) -> DiffResult<()> {
        for (key, new_entry) in after {
            let entry = Arc::new(keyed(property, key.clone())?);
            match before.get(key) {
                Some(old_entry) => self.compare(&entry, old_entry, new_entry)?,
                None => self.emit(&entry, &Value::Nil, new_entry),
            }
        }
        if self.config.new_item_is_full {
            for (key, old_entry) in before {
                if !after.contains_key(key) {
                    let entry = keyed(property, key.clone())?;
                    self.emit(&entry, old_entry, &Value::Deleted);
                }
            }
        }
        Ok(())
    }

    fn compare_items(
        &mut self,
        property: &Property,
        old: &Value,
        new: &Value,
        before: &[Value],
        after: &[Value],
    ) -> DiffResult<()> {
        if after.len() < before.len() {
            self.emit(property, old, new);
            return Ok(());
        }
        for (index, new_item) in after.iter().enumerate() {
            let entry = Arc::new(keyed(property, Key::Int(index as i64))?);
            match before.get(index) {
                Some(old_item) => self.compare(&entry, old_item, new_item)?,
                None => self.emit(&entry, &Value::Nil, new_item),
            }
        }
        Ok(())
    }

    fn emit(&mut self, property: &Property, old: &Value, new: &Value) {
        trace!(property = %property.property_id(), "change detected");
        self.changes.push(Change::new(
            property.clone(),
            self.cloner.clone_value(old),
            self.cloner.clone_value(new),
        ));
    }
}

/// Address of one entry of the container at `property`.
fn keyed(property: &Property, key: Key) -> DiffResult<Property> {
    let parent = property.parent().ok_or_else(|| {
        DiffError::InvalidInput(format!("{} is not a container field", property.property_id()))
    })?;
    Ok(Property::child(
        Arc::clone(parent),
        Arc::clone(property.node()),
        Some(key),
    ))
}

fn mismatch(property: &Property, old: &Value, new: &Value) -> DiffError {
    DiffError::Mismatch {
        property_id: property.property_id().to_string(),
        old: old.kind_name().to_string(),
        new: new.kind_name().to_string(),
    }
}
