use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::descriptor::TypeDescriptor;
use crate::error::{TypeError, TypeResult};
use crate::key::Key;
use crate::kind::FieldType;
use crate::node::Node;
use crate::value::{Record, Value};

/// Text formats a [`TextSerializer`] can be registered under.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// The codec used when an address or a change carries a record as text.
    String,
    Json,
}

/// Converts values of registered types to and from text.
pub trait TextSerializer: Send + Sync {
    fn marshal(&self, value: &Value) -> TypeResult<Vec<u8>>;

    /// Decode an instance of `type_name`. Declared field types drive the
    /// scalar widths of the result.
    fn unmarshal(
        &self,
        type_name: &str,
        data: &[u8],
        introspector: &dyn Introspector,
    ) -> TypeResult<Value>;
}

/// Read-only view of the type registry consumed by the engines.
///
/// Implementations are frozen before use and shared behind an `Arc`, so every
/// method takes `&self` and none of them mutates.
pub trait Introspector: Send + Sync {
    /// Metadata node for a canonical node key such as `person.address.city`.
    fn node(&self, key: &str) -> Option<Arc<Node>>;

    fn descriptor(&self, type_name: &str) -> Option<Arc<TypeDescriptor>>;

    /// Numeric value of an enum label.
    fn enum_value(&self, label: &str) -> Option<i32>;

    fn serializer(&self, format: Format) -> Option<Arc<dyn TextSerializer>>;

    fn root_node(&self, type_name: &str) -> Option<Arc<Node>> {
        self.node(&type_name.to_lowercase())
    }

    /// A record of `type_name` with every declared field at its zero value.
    fn new_record(&self, type_name: &str) -> TypeResult<Record> {
        let descriptor = self
            .descriptor(type_name)
            .ok_or_else(|| TypeError::UnknownType(type_name.to_string()))?;
        let mut record = Record::new(type_name);
        for field in descriptor.fields() {
            record.set(field.name.clone(), self.zero_value(&field.ty)?);
        }
        Ok(record)
    }

    /// A fresh root instance, held by reference.
    fn new_instance(&self, type_name: &str) -> TypeResult<Value> {
        Ok(Value::ptr(self.new_record(type_name)?))
    }

    /// Zero value of a declared field type. Inline records are materialized.
    fn zero_value(&self, ty: &FieldType) -> TypeResult<Value> {
        match ty {
            FieldType::Record {
                type_name,
                by_ref: false,
            } => Ok(Value::Record(self.new_record(type_name)?)),
            other => Ok(other.zero()),
        }
    }

    /// A non-nil empty value of a declared field type: a new record, an
    /// empty list or map, or the scalar zero.
    fn materialize(&self, ty: &FieldType) -> TypeResult<Value> {
        match ty {
            FieldType::Record { type_name, by_ref } => {
                let record = self.new_record(type_name)?;
                Ok(if *by_ref {
                    Value::ptr(record)
                } else {
                    Value::Record(record)
                })
            }
            FieldType::List { .. } => Ok(Value::List(Vec::new())),
            FieldType::Map { .. } => Ok(Value::Map(Default::default())),
            other => self.zero_value(other),
        }
    }

    /// Identity of an instance: its primary key field values, or `None` when
    /// the type declares no primary key. Several key fields form a composite.
    fn primary_key_of(&self, instance: &Value) -> Option<Key> {
        let record = instance.record()?;
        let descriptor = self.descriptor(record.type_name())?;
        let mut parts = descriptor
            .primary_key_fields()
            .iter()
            .map(|f| record.get(f).and_then(Key::from_value))
            .collect::<Option<Vec<_>>>()?;
        match parts.len() {
            0 => None,
            1 => parts.pop(),
            _ => Some(Key::Composite(parts)),
        }
    }
}
