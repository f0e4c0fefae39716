use std::collections::BTreeMap;

use proptest::prelude::*;
use refl_clone::Cloner;
use refl_registry::fixtures;
use refl_types::{Key, Record, Ref, Value};

fn arb_scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int),
        any::<i32>().prop_map(Value::Int32),
        any::<u32>().prop_map(Value::Uint32),
        (-1.0e6f64..1.0e6).prop_map(Value::Float64),
        "[a-z]{0,8}".prop_map(Value::String),
        Just(Value::Nil),
    ]
}

fn arb_value() -> impl Strategy<Value = Value> {
    arb_scalar().prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..5).prop_map(Value::List),
            prop::collection::btree_map("[a-z]{1,4}".prop_map(Key::String), inner.clone(), 0..5)
                .prop_map(Value::Map),
            prop::collection::vec(("[A-Z][a-z]{0,5}", inner.clone()), 0..5).prop_map(|fields| {
                let mut record = Record::new("Generated");
                for (name, value) in fields {
                    record.set(name, value);
                }
                Value::Record(record)
            }),
            inner.prop_map(Value::ptr),
        ]
    })
}

/// Overwrite every scalar reachable from `value`, through references too.
fn scramble(value: &mut Value) {
    match value {
        Value::Ptr(r) => r.modify(scramble),
        Value::Record(record) => {
            let names: Vec<String> = record.fields().map(|(n, _)| n.to_string()).collect();
            for name in names {
                if let Some(field) = record.get_mut(&name) {
                    scramble(field);
                }
            }
        }
        Value::List(items) => items.iter_mut().for_each(scramble),
        Value::Map(entries) => entries.values_mut().for_each(scramble),
        other => *other = Value::from("scrambled"),
    }
}

proptest! {
    #[test]
    fn clone_is_deep_equal(value in arb_value()) {
        let cloner = Cloner::new(fixtures::shared(false));
        prop_assert_eq!(cloner.clone_value(&value), value);
    }

    #[test]
    fn mutating_the_clone_leaves_the_source_alone(value in arb_value()) {
        let cloner = Cloner::new(fixtures::shared(false));
        let snapshot = cloner.clone_value(&value);
        let mut copy = cloner.clone_value(&value);
        scramble(&mut copy);
        prop_assert_eq!(value, snapshot);
    }
}

#[test]
fn two_node_cycle_terminates() {
    let a = Ref::new(Value::Nil);
    let b = Ref::new(Record::new("Link").with("Next", Value::Ptr(a.clone())).into());
    a.set(Record::new("Link").with("Next", Value::Ptr(b.clone())).into());

    let copy = Cloner::new(fixtures::shared(false)).clone_value(&Value::Ptr(a.clone()));
    let Value::Ptr(copy_a) = &copy else {
        panic!("expected a reference");
    };
    let Some(Value::Ptr(copy_b)) = copy.field("Next") else {
        panic!("expected Next");
    };
    let Some(Value::Ptr(back)) = copy_b.get().field("Next") else {
        panic!("expected Next of Next");
    };
    assert!(back.ptr_eq(copy_a));
    assert!(!copy_b.ptr_eq(&b));
    assert_eq!(copy, Value::Ptr(a));
}

#[test]
fn empty_map_is_not_nil() {
    let copy = Cloner::new(fixtures::shared(false)).clone_value(&Value::Map(BTreeMap::new()));
    assert!(!copy.is_nil());
}
