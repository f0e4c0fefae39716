//! JSON text serializer.
//!
//! Records become objects keyed by field name, lists become arrays, and maps
//! become objects keyed by the typed key text (`{24}sub`) so key widths
//! survive a round trip. Scalar widths on decode come from the declared
//! field types.

use std::collections::{BTreeMap, HashSet};

use refl_types::{FieldType, Introspector, Key, Kind, TextSerializer, TypeError, TypeResult, Value};
use serde_json::{Map, Value as Json};

/// [`TextSerializer`] backed by `serde_json`.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonSerializer;

impl JsonSerializer {
    pub fn new() -> Self {
        Self
    }

    /// Render a value as a JSON tree. Cyclic graphs cannot be rendered.
    pub fn to_json(&self, value: &Value) -> TypeResult<Json> {
        encode(value, &mut HashSet::new())
    }

    /// Decode a JSON tree as a value of the declared field type.
    pub fn from_json(
        &self,
        ty: &FieldType,
        json: &Json,
        introspector: &dyn Introspector,
    ) -> TypeResult<Value> {
        decode(ty, json, introspector)
    }
}

impl TextSerializer for JsonSerializer {
    fn marshal(&self, value: &Value) -> TypeResult<Vec<u8>> {
        let json = self.to_json(value)?;
        serde_json::to_vec(&json).map_err(|e| TypeError::Serialization(e.to_string()))
    }

    fn unmarshal(
        &self,
        type_name: &str,
        data: &[u8],
        introspector: &dyn Introspector,
    ) -> TypeResult<Value> {
        let json: Json =
            serde_json::from_slice(data).map_err(|e| TypeError::Serialization(e.to_string()))?;
        decode(&FieldType::record(type_name), &json, introspector)
    }
}

fn encode(value: &Value, active: &mut HashSet<usize>) -> TypeResult<Json> {
    Ok(match value {
        Value::Nil => Json::Null,
        Value::Deleted => {
            return Err(TypeError::Serialization(
                "a deleted-entry marker has no text form".into(),
            ))
        }
        Value::Bool(v) => Json::from(*v),
        Value::Int(v) | Value::Int64(v) => Json::from(*v),
        Value::Int32(v) => Json::from(*v),
        Value::Uint(v) | Value::Uint64(v) => Json::from(*v),
        Value::Uint32(v) => Json::from(*v),
        Value::Float32(v) => Json::from(f64::from(*v)),
        Value::Float64(v) => Json::from(*v),
        Value::String(v) => Json::from(v.as_str()),
        Value::Ptr(r) => {
            if !active.insert(r.id()) {
                return Err(TypeError::Serialization(
                    "cyclic reference cannot be rendered as text".into(),
                ));
            }
            let out = encode(&r.get(), active);
            active.remove(&r.id());
            out?
        }
        Value::Record(record) => {
            let mut object = Map::new();
            for (name, field) in record.fields() {
                object.insert(name.to_string(), encode(field, active)?);
            }
            Json::Object(object)
        }
        Value::List(items) => Json::Array(
            items
                .iter()
                .map(|item| encode(item, active))
                .collect::<TypeResult<_>>()?,
        ),
        Value::Map(entries) => {
            let mut object = Map::new();
            for (key, entry) in entries {
                object.insert(key.to_typed_string(), encode(entry, active)?);
            }
            Json::Object(object)
        }
    })
}

fn decode(ty: &FieldType, json: &Json, introspector: &dyn Introspector) -> TypeResult<Value> {
    let mismatch = || TypeError::shape_mismatch(ty.type_name(), shape_name(ty), json_name(json));
    match ty {
        FieldType::Scalar { kind } => decode_scalar(*kind, json).ok_or_else(mismatch),
        FieldType::Enum { .. } => match json {
            Json::String(label) => introspector
                .enum_value(label)
                .map(Value::Int32)
                .ok_or_else(mismatch),
            other => decode_scalar(Kind::Int32, other).ok_or_else(mismatch),
        },
        FieldType::Record { type_name, by_ref } => match json {
            Json::Null => introspector.zero_value(ty),
            Json::Object(object) => {
                let descriptor = introspector
                    .descriptor(type_name)
                    .ok_or_else(|| TypeError::UnknownType(type_name.clone()))?;
                let mut record = introspector.new_record(type_name)?;
                for field in descriptor.fields() {
                    if let Some(value) = object.get(&field.name) {
                        record.set(field.name.clone(), decode(&field.ty, value, introspector)?);
                    }
                }
                Ok(if *by_ref {
                    Value::ptr(record)
                } else {
                    Value::Record(record)
                })
            }
            _ => Err(mismatch()),
        },
        FieldType::List { element } => match json {
            Json::Null => Ok(Value::Nil),
            Json::Array(items) => Ok(Value::List(
                items
                    .iter()
                    .map(|item| decode(element, item, introspector))
                    .collect::<TypeResult<_>>()?,
            )),
            _ => Err(mismatch()),
        },
        FieldType::Map { key, element } => match json {
            Json::Null => Ok(Value::Nil),
            Json::Object(object) => {
                let mut entries = BTreeMap::new();
                for (text, value) in object {
                    entries.insert(key_from_text(*key, text)?, decode(element, value, introspector)?);
                }
                Ok(Value::Map(entries))
            }
            _ => Err(mismatch()),
        },
    }
}

fn decode_scalar(kind: Kind, json: &Json) -> Option<Value> {
    let value = match json {
        Json::Bool(b) => Value::Bool(*b),
        Json::String(s) => Value::String(s.clone()),
        Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int64(i)
            } else if let Some(u) = n.as_u64() {
                Value::Uint64(u)
            } else {
                Value::Float64(n.as_f64()?)
            }
        }
        _ => return None,
    };
    value.convert_to(kind)
}

/// Map keys are written in typed form; plain literals are accepted too and
/// read as the declared key kind.
fn key_from_text(kind: Kind, text: &str) -> TypeResult<Key> {
    if text.starts_with('{') {
        return Key::parse_typed(text)?.convert_to(kind);
    }
    match kind {
        Kind::String => Ok(Key::String(text.to_string())),
        other => Key::parse_typed(&format!("{{{}}}{}", other.tag(), text)),
    }
}

fn shape_name(ty: &FieldType) -> &'static str {
    match ty {
        FieldType::Scalar { kind } => kind.name(),
        FieldType::Enum { .. } => "enum",
        FieldType::Record { .. } => "object",
        FieldType::List { .. } => "array",
        FieldType::Map { .. } => "object",
    }
}

fn json_name(json: &Json) -> &'static str {
    match json {
        Json::Null => "null",
        Json::Bool(_) => "boolean",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::fixtures;

    #[test]
    fn record_roundtrip_keeps_widths() {
        let reg = fixtures::registry(false);
        let original = fixtures::create_instance(3);
        let json = JsonSerializer::new();
        let bytes = json.marshal(&original).unwrap();
        let decoded = json.unmarshal(fixtures::TEST_PROTO, &bytes, &reg).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn enum_labels_decode() {
        let reg = fixtures::registry(false);
        let decoded = JsonSerializer::new()
            .unmarshal(fixtures::TEST_PROTO, br#"{"MyEnum":"ValueTwo"}"#, &reg)
            .unwrap();
        assert_eq!(decoded.field("MyEnum"), Some(Value::Int32(2)));
    }

    #[test]
    fn plain_map_keys_accepted() {
        let reg = fixtures::registry(false);
        let decoded = JsonSerializer::new()
            .unmarshal(
                fixtures::TEST_PROTO,
                br#"{"MyString2ModelMap":{"sub":{"MyString":"x"}}}"#,
                &reg,
            )
            .unwrap();
        let map = decoded.field("MyString2ModelMap").unwrap();
        let Value::Map(entries) = &map else {
            panic!("expected map, got {map:?}");
        };
        assert_eq!(
            entries.get(&Key::string("sub")).and_then(|v| v.field("MyString")),
            Some(Value::from("x"))
        );
    }

    #[test]
    fn cycles_are_rejected() {
        let node = refl_types::Ref::new(Value::Nil);
        node.set(refl_types::Record::new("N").with("Next", Value::Ptr(node.clone())).into());
        let err = JsonSerializer::new().marshal(&Value::Ptr(node)).unwrap_err();
        assert!(matches!(err, TypeError::Serialization(_)));
    }

    #[test]
    fn width_overflow_is_a_mismatch() {
        let reg = fixtures::registry(false);
        let err = JsonSerializer::new()
            .unmarshal(fixtures::TEST_PROTO, br#"{"MyInt32":5000000000}"#, &reg)
            .unwrap_err();
        assert!(matches!(err, TypeError::ShapeMismatch { .. }));
    }

    proptest! {
        #[test]
        fn arbitrary_instances_survive_text_roundtrip(
            index in -50i32..50,
            my_string in ".*",
            my_int64 in any::<i64>(),
            int_keys in prop::collection::btree_map(any::<i32>(), ".{0,8}", 0..4),
            labels in prop::collection::btree_map(".{0,8}", ".{0,8}", 0..4),
        ) {
            let reg = fixtures::registry(false);
            let mut original = fixtures::create_instance(index);
            fixtures::edit(&mut original, |r| {
                r.set("MyString", my_string);
                r.set("MyInt64", my_int64);
                r.set(
                    "MyInt2ModelMap",
                    int_keys
                        .into_iter()
                        .map(|(k, v)| (Key::Int32(k), fixtures::sub(&v, i64::from(k))))
                        .collect::<std::collections::BTreeMap<_, _>>(),
                );
                r.set(
                    "MyString2StringMap",
                    labels
                        .into_iter()
                        .map(|(k, v)| (Key::string(k), Value::from(v)))
                        .collect::<std::collections::BTreeMap<_, _>>(),
                );
            });

            let json = JsonSerializer::new();
            let bytes = json.marshal(&original).unwrap();
            let decoded = json.unmarshal(fixtures::TEST_PROTO, &bytes, &reg).unwrap();
            prop_assert_eq!(decoded, original);
        }
    }
}
