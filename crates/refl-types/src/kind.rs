use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Scalar kinds, by width.
///
/// The numeric tag of each kind is what appears inside the `{...}` prefix of
/// a typed key literal (`{24}alice`), so the tags are part of the address
/// format and must never be renumbered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Bool,
    Int,
    Int32,
    Int64,
    Uint,
    Uint32,
    Uint64,
    Float32,
    Float64,
    String,
}

impl Kind {
    /// Every scalar kind.
    pub const ALL: [Kind; 10] = [
        Kind::Bool,
        Kind::Int,
        Kind::Int32,
        Kind::Int64,
        Kind::Uint,
        Kind::Uint32,
        Kind::Uint64,
        Kind::Float32,
        Kind::Float64,
        Kind::String,
    ];

    /// Tag used in typed key literals.
    pub const fn tag(self) -> u8 {
        match self {
            Kind::Bool => 1,
            Kind::Int => 2,
            Kind::Int32 => 5,
            Kind::Int64 => 6,
            Kind::Uint => 7,
            Kind::Uint32 => 10,
            Kind::Uint64 => 11,
            Kind::Float32 => 13,
            Kind::Float64 => 14,
            Kind::String => 24,
        }
    }

    /// Inverse of [`Kind::tag`].
    pub fn from_tag(tag: u8) -> Option<Kind> {
        Kind::ALL.into_iter().find(|k| k.tag() == tag)
    }

    /// Type name as it appears in node metadata.
    pub const fn name(self) -> &'static str {
        match self {
            Kind::Bool => "bool",
            Kind::Int => "int",
            Kind::Int32 => "int32",
            Kind::Int64 => "int64",
            Kind::Uint => "uint",
            Kind::Uint32 => "uint32",
            Kind::Uint64 => "uint64",
            Kind::Float32 => "float32",
            Kind::Float64 => "float64",
            Kind::String => "string",
        }
    }

    /// Floats are not totally ordered and cannot key a map.
    pub const fn is_key(self) -> bool {
        !matches!(self, Kind::Float32 | Kind::Float64)
    }

    /// The zero value of this kind.
    pub fn zero(self) -> Value {
        match self {
            Kind::Bool => Value::Bool(false),
            Kind::Int => Value::Int(0),
            Kind::Int32 => Value::Int32(0),
            Kind::Int64 => Value::Int64(0),
            Kind::Uint => Value::Uint(0),
            Kind::Uint32 => Value::Uint32(0),
            Kind::Uint64 => Value::Uint64(0),
            Kind::Float32 => Value::Float32(0.0),
            Kind::Float64 => Value::Float64(0.0),
            Kind::String => Value::String(String::new()),
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Declared shape of a field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum FieldType {
    /// A scalar of the given width.
    Scalar { kind: Kind },
    /// An enumerated `int32` whose labels live in the enum registry.
    Enum { name: String },
    /// A nested record. `by_ref` records are held through a [`crate::Ref`]
    /// and may be nil; inline records are always present.
    Record { type_name: String, by_ref: bool },
    /// An ordered sequence.
    List { element: Box<FieldType> },
    /// A key-ordered map.
    Map { key: Kind, element: Box<FieldType> },
}

impl FieldType {
    pub fn scalar(kind: Kind) -> Self {
        FieldType::Scalar { kind }
    }

    pub fn string() -> Self {
        FieldType::scalar(Kind::String)
    }

    pub fn enumeration(name: impl Into<String>) -> Self {
        FieldType::Enum { name: name.into() }
    }

    /// A record held by reference (the common case for nested records).
    pub fn record(type_name: impl Into<String>) -> Self {
        FieldType::Record {
            type_name: type_name.into(),
            by_ref: true,
        }
    }

    /// A record embedded by value.
    pub fn inline(type_name: impl Into<String>) -> Self {
        FieldType::Record {
            type_name: type_name.into(),
            by_ref: false,
        }
    }

    pub fn list(element: FieldType) -> Self {
        FieldType::List {
            element: Box::new(element),
        }
    }

    pub fn map(key: Kind, element: FieldType) -> Self {
        FieldType::Map {
            key,
            element: Box::new(element),
        }
    }

    /// Name of the element type: the scalar name, enum name, or record name.
    /// Containers report their element's name.
    pub fn type_name(&self) -> &str {
        match self {
            FieldType::Scalar { kind } => kind.name(),
            FieldType::Enum { name } => name,
            FieldType::Record { type_name, .. } => type_name,
            FieldType::List { element } | FieldType::Map { element, .. } => element.type_name(),
        }
    }

    /// Element type of a container, or `self` for anything else.
    pub fn element(&self) -> &FieldType {
        match self {
            FieldType::List { element } | FieldType::Map { element, .. } => element,
            other => other,
        }
    }

    /// The record type held directly or as a container element.
    pub fn record_type(&self) -> Option<&str> {
        match self.element() {
            FieldType::Record { type_name, .. } => Some(type_name),
            _ => None,
        }
    }

    pub fn is_map(&self) -> bool {
        matches!(self, FieldType::Map { .. })
    }

    pub fn is_list(&self) -> bool {
        matches!(self, FieldType::List { .. })
    }

    pub fn is_enum(&self) -> bool {
        matches!(self, FieldType::Enum { .. })
    }

    pub fn key_kind(&self) -> Option<Kind> {
        match self {
            FieldType::Map { key, .. } => Some(*key),
            FieldType::List { .. } => Some(Kind::Int),
            _ => None,
        }
    }

    /// Zero value of the declared type.
    ///
    /// Inline records have no registry-free zero and report `Nil`; use
    /// [`crate::Introspector::zero_value`] when inline records matter.
    pub fn zero(&self) -> Value {
        match self {
            FieldType::Scalar { kind } => kind.zero(),
            FieldType::Enum { .. } => Value::Int32(0),
            FieldType::Record { .. } | FieldType::List { .. } | FieldType::Map { .. } => Value::Nil,
        }
    }
}
