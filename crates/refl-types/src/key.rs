//! Typed keys and their text codec.
//!
//! A key renders as one or more parts, each a `{tag}` kind prefix followed by
//! the literal: `{24}alice`, `{5}42`, `{24}us-east{2}7`. Inside a literal the
//! characters `\`, `<`, `>` and `{` are escaped with a backslash, so a key
//! block embedded in an address is always delimited unambiguously.

use std::fmt;

use crate::error::{TypeError, TypeResult};
use crate::kind::Kind;
use crate::value::Value;

/// A map key, slice index, or primary key.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Key {
    Bool(bool),
    Int(i64),
    Int32(i32),
    Int64(i64),
    Uint(u64),
    Uint32(u32),
    Uint64(u64),
    String(String),
    /// Multi-field primary key, one part per key field.
    Composite(Vec<Key>),
}

impl Key {
    pub fn string(s: impl Into<String>) -> Self {
        Key::String(s.into())
    }

    pub fn kind(&self) -> Option<Kind> {
        Some(match self {
            Key::Bool(_) => Kind::Bool,
            Key::Int(_) => Kind::Int,
            Key::Int32(_) => Kind::Int32,
            Key::Int64(_) => Kind::Int64,
            Key::Uint(_) => Kind::Uint,
            Key::Uint32(_) => Kind::Uint32,
            Key::Uint64(_) => Kind::Uint64,
            Key::String(_) => Kind::String,
            Key::Composite(_) => return None,
        })
    }

    /// Key for a scalar value. Floats and composites have no key form.
    pub fn from_value(value: &Value) -> Option<Key> {
        Some(match value {
            Value::Bool(v) => Key::Bool(*v),
            Value::Int(v) => Key::Int(*v),
            Value::Int32(v) => Key::Int32(*v),
            Value::Int64(v) => Key::Int64(*v),
            Value::Uint(v) => Key::Uint(*v),
            Value::Uint32(v) => Key::Uint32(*v),
            Value::Uint64(v) => Key::Uint64(*v),
            Value::String(v) => Key::String(v.clone()),
            _ => return None,
        })
    }

    /// Scalar value of this key; composites become a list of their parts.
    pub fn to_value(&self) -> Value {
        match self {
            Key::Bool(v) => Value::Bool(*v),
            Key::Int(v) => Value::Int(*v),
            Key::Int32(v) => Value::Int32(*v),
            Key::Int64(v) => Value::Int64(*v),
            Key::Uint(v) => Value::Uint(*v),
            Key::Uint32(v) => Value::Uint32(*v),
            Key::Uint64(v) => Value::Uint64(*v),
            Key::String(v) => Value::String(v.clone()),
            Key::Composite(parts) => Value::List(parts.iter().map(Key::to_value).collect()),
        }
    }

    /// The key as a slice index, if it is a non-negative integer.
    pub fn as_index(&self) -> Option<usize> {
        self.to_value()
            .as_integer()
            .and_then(|i| usize::try_from(i).ok())
    }

    /// Re-type a scalar key to the declared key kind of a container.
    pub fn convert_to(&self, kind: Kind) -> TypeResult<Key> {
        if self.kind() == Some(kind) {
            return Ok(self.clone());
        }
        self.to_value()
            .convert_to(kind)
            .as_ref()
            .and_then(Key::from_value)
            .ok_or_else(|| TypeError::shape_mismatch(self.to_string(), kind.name(), self.type_label()))
    }

    /// Parts of the key: the parts of a composite, or the key itself.
    pub fn parts(&self) -> Vec<&Key> {
        match self {
            Key::Composite(parts) => parts.iter().flat_map(Key::parts).collect(),
            single => vec![single],
        }
    }

    fn type_label(&self) -> &'static str {
        self.kind().map_or("composite", Kind::name)
    }

    /// Canonical typed text of this key.
    pub fn to_typed_string(&self) -> String {
        let mut out = String::new();
        for part in self.parts() {
            // parts() never yields a composite
            let kind = part.kind().unwrap_or(Kind::String);
            out.push('{');
            out.push_str(&kind.tag().to_string());
            out.push('}');
            escape_into(&part.literal(), &mut out);
        }
        out
    }

    fn literal(&self) -> String {
        match self {
            Key::Bool(v) => v.to_string(),
            Key::Int(v) | Key::Int64(v) => v.to_string(),
            Key::Int32(v) => v.to_string(),
            Key::Uint(v) | Key::Uint64(v) => v.to_string(),
            Key::Uint32(v) => v.to_string(),
            Key::String(v) => v.clone(),
            Key::Composite(_) => self.to_string(),
        }
    }

    /// Parse the canonical typed text produced by [`Key::to_typed_string`].
    pub fn parse_typed(input: &str) -> TypeResult<Key> {
        let mut parts = Vec::new();
        let mut chars = input.chars().peekable();
        if chars.peek().is_none() {
            return Err(TypeError::invalid_key(input, "empty key"));
        }
        while let Some(c) = chars.next() {
            if c != '{' {
                return Err(TypeError::invalid_key(input, "expected '{' before kind tag"));
            }
            let mut tag = String::new();
            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(d) if d.is_ascii_digit() => tag.push(d),
                    _ => return Err(TypeError::invalid_key(input, "malformed kind tag")),
                }
            }
            let kind = tag
                .parse::<u8>()
                .ok()
                .and_then(Kind::from_tag)
                .ok_or_else(|| TypeError::invalid_key(input, format!("unknown kind tag {tag:?}")))?;
            let mut literal = String::new();
            while let Some(&next) = chars.peek() {
                if next == '{' {
                    break;
                }
                chars.next();
                if next == '\\' {
                    match chars.next() {
                        Some(escaped) => literal.push(escaped),
                        None => return Err(TypeError::invalid_key(input, "dangling escape")),
                    }
                } else {
                    literal.push(next);
                }
            }
            parts.push(parse_literal(input, kind, &literal)?);
        }
        Ok(if parts.len() == 1 {
            parts.remove(0)
        } else {
            Key::Composite(parts)
        })
    }
}

fn parse_literal(input: &str, kind: Kind, literal: &str) -> TypeResult<Key> {
    let bad = |e: &dyn fmt::Display| TypeError::invalid_key(input, format!("{kind} literal {literal:?}: {e}"));
    Ok(match kind {
        Kind::Bool => Key::Bool(literal.parse().map_err(|e| bad(&e))?),
        Kind::Int => Key::Int(literal.parse().map_err(|e| bad(&e))?),
        Kind::Int32 => Key::Int32(literal.parse().map_err(|e| bad(&e))?),
        Kind::Int64 => Key::Int64(literal.parse().map_err(|e| bad(&e))?),
        Kind::Uint => Key::Uint(literal.parse().map_err(|e| bad(&e))?),
        Kind::Uint32 => Key::Uint32(literal.parse().map_err(|e| bad(&e))?),
        Kind::Uint64 => Key::Uint64(literal.parse().map_err(|e| bad(&e))?),
        Kind::String => Key::String(literal.to_string()),
        Kind::Float32 | Kind::Float64 => return Err(TypeError::UnsupportedKeyKind(kind)),
    })
}

fn escape_into(literal: &str, out: &mut String) {
    for c in literal.chars() {
        if matches!(c, '\\' | '<' | '>' | '{') {
            out.push('\\');
        }
        out.push(c);
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Composite(parts) => {
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{part}")?;
                }
                Ok(())
            }
            single => f.write_str(&single.literal()),
        }
    }
}

impl From<&str> for Key {
    fn from(v: &str) -> Self {
        Key::String(v.to_string())
    }
}

impl From<String> for Key {
    fn from(v: String) -> Self {
        Key::String(v)
    }
}

impl From<i32> for Key {
    fn from(v: i32) -> Self {
        Key::Int32(v)
    }
}

impl From<i64> for Key {
    fn from(v: i64) -> Self {
        Key::Int64(v)
    }
}
