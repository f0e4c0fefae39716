//! Dynamic value model.
//!
//! A [`Value`] is one node of a record graph. Sharing and cycles are only
//! possible through [`Value::Ptr`], whose [`Ref`] handle gives every shared
//! object a stable identity.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use crate::key::Key;
use crate::kind::Kind;

/// A shared, mutable reference to a value.
///
/// Readers take a snapshot and writers snapshot-modify-store, so no lock is
/// ever held while a caller recurses into the graph. Cloning a `Ref` shares
/// the referent; use a cloner for a deep copy.
#[derive(Clone)]
pub struct Ref(Arc<RwLock<Value>>);

impl Ref {
    pub fn new(value: Value) -> Self {
        Self(Arc::new(RwLock::new(value)))
    }

    /// Snapshot of the referent.
    pub fn get(&self) -> Value {
        self.0.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Replace the referent.
    pub fn set(&self, value: Value) {
        *self.0.write().unwrap_or_else(PoisonError::into_inner) = value;
    }

    /// Modify a snapshot of the referent and store it back.
    pub fn modify<R>(&self, f: impl FnOnce(&mut Value) -> R) -> R {
        let mut value = self.get();
        let out = f(&mut value);
        self.set(value);
        out
    }

    /// Identity of the referent, stable for the lifetime of the allocation.
    pub fn id(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }

    pub fn ptr_eq(&self, other: &Ref) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ref({:#x})", self.id())
    }
}

/// An instance of a record type: its type name and fields in declared order.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    type_name: String,
    fields: Vec<(String, Value)>,
}

impl Record {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: Vec::new(),
        }
    }

    /// Builder form of [`Record::set`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.fields
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Slot for `name`, appended with `default` when the record lacks it.
    pub fn slot(&mut self, name: &str, default: impl FnOnce() -> Value) -> &mut Value {
        let index = match self.fields.iter().position(|(n, _)| n == name) {
            Some(index) => index,
            None => {
                self.fields.push((name.to_string(), default()));
                self.fields.len() - 1
            }
        };
        &mut self.fields[index].1
    }

    /// Set a field, replacing it in place or appending it.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.get_mut(&name) {
            Some(slot) => *slot = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// One value in a record graph.
#[derive(Clone, Debug, Default)]
pub enum Value {
    /// Absent pointer, sequence, map, or record.
    #[default]
    Nil,
    Bool(bool),
    Int(i64),
    Int32(i32),
    Int64(i64),
    Uint(u64),
    Uint32(u32),
    Uint64(u64),
    Float32(f32),
    Float64(f64),
    String(String),
    Ptr(Ref),
    Record(Record),
    List(Vec<Value>),
    Map(BTreeMap<Key, Value>),
    /// Tombstone for a removed map entry; only meaningful as a change's new value.
    Deleted,
}

impl Value {
    /// A platform-width `int`.
    pub fn int(v: i64) -> Self {
        Value::Int(v)
    }

    /// Allocate a new shared reference holding `value`.
    pub fn ptr(value: impl Into<Value>) -> Self {
        Value::Ptr(Ref::new(value.into()))
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Scalar kind of this value, `None` for composites and markers.
    pub fn kind(&self) -> Option<Kind> {
        Some(match self {
            Value::Bool(_) => Kind::Bool,
            Value::Int(_) => Kind::Int,
            Value::Int32(_) => Kind::Int32,
            Value::Int64(_) => Kind::Int64,
            Value::Uint(_) => Kind::Uint,
            Value::Uint32(_) => Kind::Uint32,
            Value::Uint64(_) => Kind::Uint64,
            Value::Float32(_) => Kind::Float32,
            Value::Float64(_) => Kind::Float64,
            Value::String(_) => Kind::String,
            _ => return None,
        })
    }

    /// Short name of the variant, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Ptr(_) => "ptr",
            Value::Record(_) => "record",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Deleted => "deleted",
            scalar => scalar.kind().map_or("unknown", Kind::name),
        }
    }

    /// True for `Nil` and for scalars holding their kind's zero value.
    pub fn is_zero(&self) -> bool {
        match self {
            Value::Nil => true,
            Value::Bool(b) => !b,
            Value::Int(v) | Value::Int64(v) => *v == 0,
            Value::Int32(v) => *v == 0,
            Value::Uint(v) | Value::Uint64(v) => *v == 0,
            Value::Uint32(v) => *v == 0,
            Value::Float32(v) => *v == 0.0,
            Value::Float64(v) => *v == 0.0,
            Value::String(s) => s.is_empty(),
            _ => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Any integer variant widened to `i128`.
    pub fn as_integer(&self) -> Option<i128> {
        match self {
            Value::Int(v) | Value::Int64(v) => Some(i128::from(*v)),
            Value::Int32(v) => Some(i128::from(*v)),
            Value::Uint(v) | Value::Uint64(v) => Some(i128::from(*v)),
            Value::Uint32(v) => Some(i128::from(*v)),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float32(v) => Some(f64::from(*v)),
            Value::Float64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }

    /// Type name of the record held inline or behind a pointer.
    pub fn type_name(&self) -> Option<String> {
        match self {
            Value::Record(r) => Some(r.type_name.clone()),
            Value::Ptr(r) => r.get().type_name(),
            _ => None,
        }
    }

    /// Snapshot of the record held inline or behind a pointer.
    pub fn record(&self) -> Option<Record> {
        match self {
            Value::Record(r) => Some(r.clone()),
            Value::Ptr(r) => r.get().record(),
            _ => None,
        }
    }

    /// Snapshot of a field of the record held inline or behind a pointer.
    pub fn field(&self, name: &str) -> Option<Value> {
        self.record().and_then(|r| r.get(name).cloned())
    }

    /// Convert a scalar to the given width. Integers convert between widths
    /// when the value fits; integers widen into floats.
    pub fn convert_to(&self, kind: Kind) -> Option<Value> {
        if self.kind() == Some(kind) {
            return Some(self.clone());
        }
        match kind {
            Kind::Bool => self.as_bool().map(Value::Bool),
            Kind::String => self.as_str().map(|s| Value::String(s.to_string())),
            Kind::Float32 => self
                .as_f64()
                .or_else(|| self.as_integer().map(|i| i as f64))
                .map(|f| Value::Float32(f as f32)),
            Kind::Float64 => self
                .as_f64()
                .or_else(|| self.as_integer().map(|i| i as f64))
                .map(Value::Float64),
            Kind::Int => self.as_integer().and_then(|i| i64::try_from(i).ok()).map(Value::Int),
            Kind::Int32 => self.as_integer().and_then(|i| i32::try_from(i).ok()).map(Value::Int32),
            Kind::Int64 => self.as_integer().and_then(|i| i64::try_from(i).ok()).map(Value::Int64),
            Kind::Uint => self.as_integer().and_then(|i| u64::try_from(i).ok()).map(Value::Uint),
            Kind::Uint32 => self.as_integer().and_then(|i| u32::try_from(i).ok()).map(Value::Uint32),
            Kind::Uint64 => self.as_integer().and_then(|i| u64::try_from(i).ok()).map(Value::Uint64),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        deep_eq(self, other, &mut HashSet::new())
    }
}

/// Structural equality. A pair of references already under comparison is
/// assumed equal, which makes the comparison terminate on cyclic graphs.
fn deep_eq(a: &Value, b: &Value, seen: &mut HashSet<(usize, usize)>) -> bool {
    match (a, b) {
        (Value::Nil, Value::Nil) | (Value::Deleted, Value::Deleted) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Int(x), Value::Int(y)) | (Value::Int64(x), Value::Int64(y)) => x == y,
        (Value::Int32(x), Value::Int32(y)) => x == y,
        (Value::Uint(x), Value::Uint(y)) | (Value::Uint64(x), Value::Uint64(y)) => x == y,
        (Value::Uint32(x), Value::Uint32(y)) => x == y,
        (Value::Float32(x), Value::Float32(y)) => x == y,
        (Value::Float64(x), Value::Float64(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Ptr(x), Value::Ptr(y)) => {
            if x.ptr_eq(y) || !seen.insert((x.id(), y.id())) {
                return true;
            }
            deep_eq(&x.get(), &y.get(), seen)
        }
        (Value::Record(x), Value::Record(y)) => {
            x.type_name == y.type_name
                && x.fields.len() == y.fields.len()
                && x.fields.iter().all(|(name, xv)| match y.get(name) {
                    Some(yv) => deep_eq(xv, yv, seen),
                    None => false,
                })
        }
        (Value::List(x), Value::List(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(xv, yv)| deep_eq(xv, yv, seen))
        }
        (Value::Map(x), Value::Map(y)) => {
            x.len() == y.len()
                && x.iter()
                    .zip(y)
                    .all(|((xk, xv), (yk, yv))| xk == yk && deep_eq(xv, yv, seen))
        }
        _ => false,
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => f.write_str("nil"),
            Value::Deleted => f.write_str("<deleted>"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) | Value::Int64(v) => write!(f, "{v}"),
            Value::Int32(v) => write!(f, "{v}"),
            Value::Uint(v) | Value::Uint64(v) => write!(f, "{v}"),
            Value::Uint32(v) => write!(f, "{v}"),
            Value::Float32(v) => write!(f, "{v}"),
            Value::Float64(v) => write!(f, "{v}"),
            Value::String(s) => write!(f, "{s:?}"),
            // Pointers print only their type to stay finite on cycles.
            Value::Ptr(r) => match r.get().type_name() {
                Some(name) => write!(f, "&{name}"),
                None => write!(f, "&{}", r.get().kind_name()),
            },
            Value::Record(r) => write!(f, "{}{{{} fields}}", r.type_name, r.len()),
            Value::List(items) => write!(f, "[{} items]", items.len()),
            Value::Map(entries) => write!(f, "{{{} entries}}", entries.len()),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Uint32(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::Uint64(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float32(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Record> for Value {
    fn from(v: Record) -> Self {
        Value::Record(v)
    }
}

impl From<Ref> for Value {
    fn from(v: Ref) -> Self {
        Value::Ptr(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(v)
    }
}

impl From<BTreeMap<Key, Value>> for Value {
    fn from(v: BTreeMap<Key, Value>) -> Self {
        Value::Map(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_set_replaces_in_place() {
        let mut r = Record::new("T").with("A", 1).with("B", "x");
        r.set("A", 2);
        assert_eq!(r.len(), 2);
        assert_eq!(r.get("A"), Some(&Value::Int32(2)));
        assert_eq!(r.fields().next().map(|(n, _)| n), Some("A"));
    }

    #[test]
    fn width_matters_for_equality() {
        assert_ne!(Value::Int(1), Value::Int64(1));
        assert_eq!(Value::Int32(7), Value::from(7));
    }

    #[test]
    fn cyclic_graphs_compare_equal() {
        let a = Ref::new(Value::Nil);
        a.set(Record::new("Node").with("Next", Value::Ptr(a.clone())).into());
        let b = Ref::new(Value::Nil);
        b.set(Record::new("Node").with("Next", Value::Ptr(b.clone())).into());
        assert_eq!(Value::Ptr(a), Value::Ptr(b));
    }

    #[test]
    fn modify_stores_back() {
        let r = Ref::new(Record::new("T").with("A", 1).into());
        r.modify(|v| {
            if let Value::Record(rec) = v {
                rec.set("A", 5);
            }
        });
        assert_eq!(r.get().field("A"), Some(Value::Int32(5)));
    }

    #[test]
    fn convert_between_widths() {
        assert_eq!(Value::Int(3).convert_to(Kind::Int32), Some(Value::Int32(3)));
        assert_eq!(Value::Int(-1).convert_to(Kind::Uint32), None);
        assert_eq!(Value::Int32(2).convert_to(Kind::Float64), Some(Value::Float64(2.0)));
        assert_eq!(Value::from("x").convert_to(Kind::Int), None);
    }

    #[test]
    fn zero_detection() {
        assert!(Value::from("").is_zero());
        assert!(Value::Bool(false).is_zero());
        assert!(!Value::Float64(0.5).is_zero());
        assert!(!Value::List(vec![]).is_zero());
    }

    #[test]
    fn display_is_finite_on_cycles() {
        let a = Ref::new(Value::Nil);
        a.set(Record::new("Node").with("Next", Value::Ptr(a.clone())).into());
        assert_eq!(Value::Ptr(a).to_string(), "&Node");
    }
}
