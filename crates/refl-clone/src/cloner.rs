use std::collections::HashMap;
use std::sync::Arc;

use refl_types::{Introspector, Record, Ref, Value};
use tracing::{trace, warn};

/// Deep cloner for record graphs.
///
/// Every shared reference in the source is cloned exactly once per call, so
/// cycles terminate and diamond-shaped sharing is reproduced in the copy.
/// Fields declared `copy = false` are left at their zero value.
#[derive(Clone)]
pub struct Cloner {
    introspector: Arc<dyn Introspector>,
}

/// Source reference identity to the clone created for it. Lives for one
/// top-level call.
type CycleGuard = HashMap<usize, Ref>;

impl Cloner {
    pub fn new(introspector: Arc<dyn Introspector>) -> Self {
        Self { introspector }
    }

    /// Produce an independent deep copy of `value`.
    pub fn clone_value(&self, value: &Value) -> Value {
        let mut guard = CycleGuard::new();
        let copy = self.clone_with(value, &mut guard);
        trace!(references = guard.len(), "deep clone complete");
        copy
    }

    fn clone_with(&self, value: &Value, guard: &mut CycleGuard) -> Value {
        match value {
            Value::Nil
            | Value::Deleted
            | Value::Bool(_)
            | Value::Int(_)
            | Value::Int32(_)
            | Value::Int64(_)
            | Value::Uint(_)
            | Value::Uint32(_)
            | Value::Uint64(_)
            | Value::Float32(_)
            | Value::Float64(_)
            | Value::String(_) => value.clone(),
            Value::Ptr(source) => Value::Ptr(self.clone_ref(source, guard)),
            Value::Record(record) => Value::Record(self.clone_record(record, guard)),
            Value::List(items) => {
                Value::List(items.iter().map(|item| self.clone_with(item, guard)).collect())
            }
            Value::Map(entries) => Value::Map(
                entries
                    .iter()
                    .map(|(key, entry)| (key.clone(), self.clone_with(entry, guard)))
                    .collect(),
            ),
        }
    }

    fn clone_ref(&self, source: &Ref, guard: &mut CycleGuard) -> Ref {
        if let Some(existing) = guard.get(&source.id()) {
            return existing.clone();
        }
        // Register before populating so a cycle back to `source` finds it.
        let copy = Ref::new(Value::Nil);
        guard.insert(source.id(), copy.clone());
        let inner = self.clone_with(&source.get(), guard);
        copy.set(inner);
        copy
    }

    fn clone_record(&self, record: &Record, guard: &mut CycleGuard) -> Record {
        let descriptor = self.introspector.descriptor(record.type_name());
        let mut copy = Record::new(record.type_name());
        for (name, field) in record.fields() {
            let decl = descriptor.as_ref().and_then(|d| d.field(name));
            let value = match decl {
                Some(decl) if !decl.copy => {
                    self.introspector.zero_value(&decl.ty).unwrap_or_else(|e| {
                        warn!(field = name, error = %e, "no zero value for skipped field");
                        Value::Nil
                    })
                }
                _ => self.clone_with(field, guard),
            };
            copy.set(name, value);
        }
        copy
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use refl_registry::fixtures::{self, TEST_PROTO};
    use refl_types::Key;

    use super::*;

    fn cloner() -> Cloner {
        Cloner::new(fixtures::shared(false))
    }

    #[test]
    fn clone_is_equal_except_internal_fields() {
        let mut original = fixtures::create_instance(7);
        let copy = cloner().clone_value(&original);
        assert_eq!(copy.field("Scratch"), Some(Value::from("")));
        fixtures::edit(&mut original, |r| r.set("Scratch", ""));
        assert_eq!(copy, original);
    }

    #[test]
    fn clone_does_not_alias_source() {
        let original = fixtures::create_instance(1);
        let mut copy = cloner().clone_value(&original);
        fixtures::edit(&mut copy, |r| {
            r.set("MyString", "changed");
            if let Some(Value::List(items)) = r.get_mut("MyStringSlice") {
                items[0] = Value::from("changed");
            }
        });
        if let Some(Value::Ptr(single)) = copy.field("MySingle") {
            single.modify(|v| {
                if let Value::Record(r) = v {
                    r.set("MyString", "changed");
                }
            });
        }
        assert_eq!(original.field("MyString"), Some(Value::from("string-1")));
        assert_eq!(
            original.field("MyStringSlice"),
            Some(Value::List(vec![Value::from("a1"), Value::from("b1")]))
        );
        assert_eq!(
            original.field("MySingle").and_then(|s| s.field("MyString")),
            Some(Value::from("single-1"))
        );
    }

    #[test]
    fn self_reference_is_preserved() {
        let mut original = fixtures::create_instance(2);
        let Value::Ptr(root) = original.clone() else {
            panic!("fixture instance is held by reference");
        };
        fixtures::edit(&mut original, |r| r.set("MyNext", Value::Ptr(root.clone())));

        let copy = cloner().clone_value(&original);
        let (Value::Ptr(copy_root), Some(Value::Ptr(copy_next))) = (&copy, copy.field("MyNext")) else {
            panic!("clone lost its shape");
        };
        assert!(copy_next.ptr_eq(copy_root));
        assert!(!copy_root.ptr_eq(&root));
    }

    #[test]
    fn shared_references_stay_shared() {
        let shared = fixtures::sub("shared", 9);
        let original = Value::Record(
            Record::new(TEST_PROTO)
                .with("MySingle", shared.clone())
                .with("MyModelSlice", vec![shared.clone(), shared]),
        );
        let copy = cloner().clone_value(&original);
        let Some(Value::Ptr(single)) = copy.field("MySingle") else {
            panic!("missing MySingle");
        };
        let Some(Value::List(items)) = copy.field("MyModelSlice") else {
            panic!("missing MyModelSlice");
        };
        for item in items {
            let Value::Ptr(item) = item else {
                panic!("slice element is not a reference");
            };
            assert!(item.ptr_eq(&single));
        }
    }

    #[test]
    fn nil_and_empty_stay_as_they_are() {
        let c = cloner();
        assert_eq!(c.clone_value(&Value::Nil), Value::Nil);
        assert_eq!(c.clone_value(&Value::List(vec![])), Value::List(vec![]));
        assert_eq!(c.clone_value(&Value::Map(BTreeMap::new())), Value::Map(BTreeMap::new()));
    }

    #[test]
    fn map_keys_are_kept_verbatim() {
        let mut entries = BTreeMap::new();
        entries.insert(Key::Int32(4), fixtures::sub("four", 4));
        entries.insert(Key::Uint64(4), Value::from("other width"));
        let copy = cloner().clone_value(&Value::Map(entries.clone()));
        let Value::Map(copied) = &copy else {
            panic!("expected map");
        };
        assert_eq!(copied.keys().collect::<Vec<_>>(), entries.keys().collect::<Vec<_>>());
        assert_eq!(copy, Value::Map(entries));
    }

    #[test]
    fn unregistered_records_copy_every_field() {
        let original = Value::Record(Record::new("Unknown").with("A", 1).with("B", "b"));
        assert_eq!(cloner().clone_value(&original), original);
    }
}
