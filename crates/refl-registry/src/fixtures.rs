//! Shared test model.
//!
//! `TestProto` exercises every supported shape: scalars of several widths,
//! an enum, nested records by reference and inline, lists and maps of
//! scalars and records, a self-reference, and an internal field that takes
//! part in neither cloning nor diffing.

use std::collections::BTreeMap;
use std::sync::Arc;

use refl_types::{FieldDecl, FieldType, Introspector, Key, Kind, Record, TypeDescriptor, Value};

use crate::registry::Registry;

pub const TEST_PROTO: &str = "TestProto";
pub const TEST_PROTO_SUB: &str = "TestProtoSub";
pub const TEST_ENUM: &str = "TestEnum";

/// Labels of `TestEnum`.
pub const TEST_ENUM_VALUES: [(&str, i32); 3] = [("Invalid", 0), ("ValueOne", 1), ("ValueTwo", 2)];

/// Registry holding the test model, with every type inspected and the enum
/// labels registered. `deep` marks `TestProtoSub` for per-element diffing.
pub fn registry(deep: bool) -> Registry {
    let mut reg = Registry::new();
    let mut sub = TypeDescriptor::new(TEST_PROTO_SUB)
        .with_field("MyString", FieldType::string())
        .with_field("MyInt64", FieldType::scalar(Kind::Int64));
    if deep {
        sub = sub.deep();
    }
    reg.register(sub);
    reg.register(
        TypeDescriptor::new(TEST_PROTO)
            .with_field("MyString", FieldType::string())
            .with_field("MyInt32", FieldType::scalar(Kind::Int32))
            .with_field("MyInt64", FieldType::scalar(Kind::Int64))
            .with_field("MyUint32", FieldType::scalar(Kind::Uint32))
            .with_field("MyFloat64", FieldType::scalar(Kind::Float64))
            .with_field("MyBool", FieldType::scalar(Kind::Bool))
            .with_field("MyEnum", FieldType::enumeration(TEST_ENUM))
            .with_field("MySingle", FieldType::record(TEST_PROTO_SUB))
            .with_field("MyInline", FieldType::inline(TEST_PROTO_SUB))
            .with_field("MyStringSlice", FieldType::list(FieldType::string()))
            .with_field("MyModelSlice", FieldType::list(FieldType::record(TEST_PROTO_SUB)))
            .with_field(
                "MyString2StringMap",
                FieldType::map(Kind::String, FieldType::string()),
            )
            .with_field(
                "MyInt2ModelMap",
                FieldType::map(Kind::Int32, FieldType::record(TEST_PROTO_SUB)),
            )
            .with_field(
                "MyString2ModelMap",
                FieldType::map(Kind::String, FieldType::record(TEST_PROTO_SUB)),
            )
            .with_field("MyNext", FieldType::record(TEST_PROTO))
            .with(FieldDecl::new("Scratch", FieldType::string()).internal())
            .primary_key(["MyString"]),
    );
    reg.register_enums(TEST_ENUM_VALUES);
    // Both types are valid roots; inspect_all only fails on unknown names.
    if let Err(e) = reg.inspect_all() {
        tracing::warn!(error = %e, "fixture inspection failed");
    }
    reg
}

/// [`registry`], frozen for the engines.
pub fn shared(deep: bool) -> Arc<dyn Introspector> {
    registry(deep).into_shared()
}

/// A `TestProtoSub` held by reference.
pub fn sub(my_string: &str, my_int64: i64) -> Value {
    Value::ptr(sub_record(my_string, my_int64))
}

fn sub_record(my_string: &str, my_int64: i64) -> Record {
    Record::new(TEST_PROTO_SUB)
        .with("MyString", my_string)
        .with("MyInt64", my_int64)
}

/// A fully populated `TestProto` whose values derive from `index`.
pub fn create_instance(index: i32) -> Value {
    let mut string_map = BTreeMap::new();
    string_map.insert(Key::string(format!("k{index}")), Value::from(format!("v{index}")));
    let mut int_map = BTreeMap::new();
    int_map.insert(Key::Int32(index), sub(&format!("int-{index}"), i64::from(index)));
    let mut model_map = BTreeMap::new();
    model_map.insert(Key::string(format!("m{index}")), sub(&format!("map-{index}"), 10));

    Value::ptr(
        Record::new(TEST_PROTO)
            .with("MyString", format!("string-{index}"))
            .with("MyInt32", index)
            .with("MyInt64", i64::from(index) * 1000)
            .with("MyUint32", index.unsigned_abs() + 1)
            .with("MyFloat64", f64::from(index) + 0.25)
            .with("MyBool", index % 2 == 0)
            .with("MyEnum", 1)
            .with("MySingle", sub(&format!("single-{index}"), 1))
            .with("MyInline", sub_record(&format!("inline-{index}"), 2))
            .with(
                "MyStringSlice",
                vec![Value::from(format!("a{index}")), Value::from(format!("b{index}"))],
            )
            .with("MyModelSlice", vec![sub(&format!("slice-{index}"), 3)])
            .with("MyString2StringMap", string_map)
            .with("MyInt2ModelMap", int_map)
            .with("MyString2ModelMap", model_map)
            .with("MyNext", Value::Nil)
            .with("Scratch", format!("scratch-{index}")),
    )
}

/// Apply `f` to the record behind a pointer or held inline.
pub fn edit(value: &mut Value, f: impl FnOnce(&mut Record)) {
    match value {
        Value::Ptr(r) => r.modify(|v| {
            if let Value::Record(record) = v {
                f(record);
            }
        }),
        Value::Record(record) => f(record),
        _ => {}
    }
}
