use std::fmt;
use std::sync::{Arc, OnceLock};

use refl_types::{FieldType, Format, Introspector, Key, Kind, Node, Record, TypeError, Value};
use tracing::{debug, trace};

use crate::error::{PropertyError, PropertyResult};
use crate::parser::parse_segments;

/// Address of one location inside an instance graph.
///
/// A property is a chain from a root type down to a field, each link
/// optionally keyed: the root by its primary key, map fields by an entry key,
/// and slice fields by an index. Its canonical text form is
/// `typename<key>.field<key>.field`, with lower-cased names and typed keys.
#[derive(Clone)]
pub struct Property {
    parent: Option<Arc<Property>>,
    node: Arc<Node>,
    key: Option<Key>,
    value: Option<Value>,
    id: OnceLock<String>,
    introspector: Arc<dyn Introspector>,
}

impl Property {
    /// Root address of an instance; `key` is its primary key, if any.
    pub fn root(node: Arc<Node>, key: Option<Key>, introspector: Arc<dyn Introspector>) -> Self {
        Self {
            parent: None,
            node,
            key,
            value: None,
            id: OnceLock::new(),
            introspector,
        }
    }

    /// Root address of an instance of `type_name`.
    pub fn of_type(
        type_name: &str,
        key: Option<Key>,
        introspector: Arc<dyn Introspector>,
    ) -> PropertyResult<Self> {
        let node = introspector
            .root_node(type_name)
            .ok_or_else(|| TypeError::UnknownType(type_name.to_string()))?;
        Ok(Self::root(node, key, introspector))
    }

    /// Address of field `node` below `parent`. `key` selects a map entry or
    /// slice index and is only meaningful on container fields.
    pub fn child(parent: Arc<Property>, node: Arc<Node>, key: Option<Key>) -> Self {
        let introspector = Arc::clone(&parent.introspector);
        Self {
            parent: Some(parent),
            node,
            key,
            value: None,
            id: OnceLock::new(),
            introspector,
        }
    }

    /// Parse the text form of an address against the registered types.
    pub fn parse(input: &str, introspector: Arc<dyn Introspector>) -> PropertyResult<Self> {
        let segments = parse_segments(input)?;
        let node_key = segments
            .iter()
            .map(|s| s.name.to_lowercase())
            .collect::<Vec<_>>()
            .join(".");
        let leaf = introspector
            .node(&node_key)
            .ok_or_else(|| PropertyError::UnknownAttribute(node_key.clone()))?;

        let mut chain = Vec::with_capacity(segments.len());
        let mut cursor = Some(leaf);
        while let Some(node) = cursor {
            cursor = node.parent();
            chain.push(node);
        }
        chain.reverse();
        if chain.len() != segments.len() {
            return Err(PropertyError::UnknownAttribute(node_key));
        }

        let mut property: Option<Property> = None;
        for (node, segment) in chain.into_iter().zip(segments) {
            let key = match segment.key {
                Some(raw) => Some(checked_key(input, &node, Key::parse_typed(&raw)?)?),
                None => None,
            };
            property = Some(match property {
                None => Property::root(node, key, Arc::clone(&introspector)),
                Some(parent) => Property::child(Arc::new(parent), node, key),
            });
        }
        property.ok_or_else(|| PropertyError::malformed(input, "empty address"))
    }

    /// Attach the value observed at this address.
    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }

    pub fn node(&self) -> &Arc<Node> {
        &self.node
    }

    pub fn parent(&self) -> Option<&Arc<Property>> {
        self.parent.as_ref()
    }

    pub fn key(&self) -> Option<&Key> {
        self.key.as_ref()
    }

    /// The value attached with [`Property::with_value`], if any.
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    pub fn introspector(&self) -> &Arc<dyn Introspector> {
        &self.introspector
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    fn root_property(&self) -> &Property {
        match &self.parent {
            None => self,
            Some(parent) => parent.root_property(),
        }
    }

    /// Canonical text form, computed once.
    pub fn property_id(&self) -> &str {
        self.id.get_or_init(|| {
            let mut id = match &self.parent {
                None => self.node.type_name().to_lowercase(),
                Some(parent) => format!(
                    "{}.{}",
                    parent.property_id(),
                    self.node.field_name().to_lowercase()
                ),
            };
            if let Some(key) = &self.key {
                id.push('<');
                id.push_str(&key.to_typed_string());
                id.push('>');
            }
            id
        })
    }

    /// Read the value at this address inside `root`.
    ///
    /// A root address resolved against `Nil` constructs a new instance
    /// carrying the address's primary key.
    pub fn get(&self, root: &Value) -> PropertyResult<Value> {
        let Some(parent) = &self.parent else {
            return if root.is_nil() {
                self.new_root()
            } else {
                Ok(root.clone())
            };
        };
        let record = parent
            .get(root)?
            .record()
            .ok_or_else(|| self.not_found())?;
        let field = match record.get(self.node.field_name()) {
            Some(field) => field.clone(),
            None => self.introspector.zero_value(self.node.field_type())?,
        };
        match &self.key {
            None => Ok(field),
            Some(key) => self.lookup(&field, key),
        }
    }

    fn lookup(&self, container: &Value, key: &Key) -> PropertyResult<Value> {
        match container {
            Value::Map(entries) => entries.get(key).cloned().ok_or_else(|| self.not_found()),
            Value::List(items) => key
                .as_index()
                .and_then(|i| items.get(i))
                .cloned()
                .ok_or_else(|| self.not_found()),
            Value::Nil => Err(self.not_found()),
            other => Err(self.mismatch("map or list", other.kind_name())),
        }
    }

    /// Write `value` at this address inside `root`, creating missing
    /// intermediate records, maps, and slice positions on the way down.
    ///
    /// A `Nil` root is replaced by a new instance first. On a root address
    /// the instance is otherwise left unchanged.
    pub fn set(&self, root: &mut Value, value: Value) -> PropertyResult<()> {
        if root.is_nil() {
            *root = self.root_property().new_root()?;
        }
        let Some(parent) = &self.parent else {
            return Ok(());
        };
        trace!(property = %self.property_id(), value = %value, "set");
        let mut value = Some(value);
        parent.with_record_mut(root, &mut |record| {
            let field = self.field_slot(record)?;
            self.assign(field, value.take().unwrap_or_default())
        })
    }

    /// Build a new instance of the root type, with its primary key taken
    /// from the root address, and set `value` at this address in it.
    pub fn instantiate(&self, value: Value) -> PropertyResult<Value> {
        let mut root = Value::Nil;
        self.set(&mut root, value)?;
        debug!(property = %self.property_id(), "instantiated");
        Ok(root)
    }

    fn new_root(&self) -> PropertyResult<Value> {
        let type_name = self.node.element_type_name();
        let mut record = self.introspector.new_record(type_name)?;
        if let Some(key) = &self.key {
            self.write_primary_key(&mut record, key)?;
        }
        Ok(Value::ptr(record))
    }

    fn write_primary_key(&self, record: &mut Record, key: &Key) -> PropertyResult<()> {
        let descriptor = self
            .introspector
            .descriptor(record.type_name())
            .ok_or_else(|| TypeError::UnknownType(record.type_name().to_string()))?;
        let fields = descriptor.primary_key_fields();
        let parts = key.parts();
        if fields.len() != parts.len() {
            return Err(self.mismatch(
                format!("{} primary key part(s)", fields.len()),
                parts.len().to_string(),
            ));
        }
        for (name, part) in fields.iter().zip(parts) {
            let decl = descriptor.field(name).ok_or_else(|| TypeError::UnknownField {
                type_name: record.type_name().to_string(),
                field: name.clone(),
            })?;
            let slot = record.slot(name, || Value::Nil);
            self.assign_element(slot, &decl.ty, part.to_value())?;
        }
        Ok(())
    }

    /// Declared type of the value this address points at: the element type
    /// when a key selects into a container.
    pub fn target_type(&self) -> FieldType {
        let ty = self.node.field_type();
        match &self.key {
            Some(_) => ty.element().clone(),
            None => ty.clone(),
        }
    }

    /// Run `f` on the record held at this address, creating it and any
    /// missing intermediates.
    fn with_record_mut(
        &self,
        root: &mut Value,
        f: &mut dyn FnMut(&mut Record) -> PropertyResult<()>,
    ) -> PropertyResult<()> {
        let ty = self.target_type();
        if !matches!(ty, FieldType::Record { .. }) {
            return Err(self.mismatch("record", ty.type_name()));
        }
        self.visit_mut(root, &mut |slot| self.enter_record(slot, &ty, &mut *f))
    }

    /// Run `f` on the slot this address points at.
    fn visit_mut(
        &self,
        root: &mut Value,
        f: &mut dyn FnMut(&mut Value) -> PropertyResult<()>,
    ) -> PropertyResult<()> {
        match &self.parent {
            None => f(root),
            Some(parent) => parent.with_record_mut(root, &mut |record| {
                let field = self.field_slot(record)?;
                match &self.key {
                    None => f(field),
                    Some(key) => f(self.entry_slot(field, key)?),
                }
            }),
        }
    }

    fn enter_record(
        &self,
        slot: &mut Value,
        ty: &FieldType,
        f: &mut dyn FnMut(&mut Record) -> PropertyResult<()>,
    ) -> PropertyResult<()> {
        if slot.is_nil() {
            *slot = self.introspector.materialize(ty)?;
        }
        match slot {
            Value::Record(record) => f(record),
            Value::Ptr(shared) => shared.modify(|inner| {
                if inner.is_nil() {
                    *inner = Value::Record(self.introspector.new_record(ty.type_name())?);
                }
                match inner {
                    Value::Record(record) => f(record),
                    other => Err(self.mismatch(ty.type_name(), other.kind_name())),
                }
            }),
            other => Err(self.mismatch(ty.type_name(), other.kind_name())),
        }
    }

    fn field_slot<'r>(&self, record: &'r mut Record) -> PropertyResult<&'r mut Value> {
        let name = self.node.field_name();
        let zero = match record.get(name) {
            Some(_) => Value::Nil,
            None => self.introspector.zero_value(self.node.field_type())?,
        };
        Ok(record.slot(name, || zero))
    }

    /// The map entry or slice position `key` selects, created if missing.
    fn entry_slot<'v>(&self, field: &'v mut Value, key: &Key) -> PropertyResult<&'v mut Value> {
        let ty = self.node.field_type();
        let element = ty.element();
        if field.is_nil() {
            *field = self.introspector.materialize(ty)?;
        }
        match field {
            Value::Map(entries) => {
                if !entries.contains_key(key) {
                    entries.insert(key.clone(), self.introspector.zero_value(element)?);
                }
                entries.get_mut(key).ok_or_else(|| self.not_found())
            }
            Value::List(items) => {
                let index = key
                    .as_index()
                    .ok_or_else(|| self.mismatch("slice index", key.to_string()))?;
                while items.len() <= index {
                    items.push(self.introspector.zero_value(element)?);
                }
                items.get_mut(index).ok_or_else(|| self.not_found())
            }
            other => Err(self.mismatch("map or list", other.kind_name())),
        }
    }

    fn assign(&self, field: &mut Value, value: Value) -> PropertyResult<()> {
        match (self.node.field_type(), &self.key) {
            (FieldType::Map { element, .. }, Some(key)) => {
                if matches!(value, Value::Deleted) {
                    if let Value::Map(entries) = field {
                        entries.remove(key);
                    }
                    return Ok(());
                }
                let entry = self.entry_slot(field, key)?;
                self.assign_element(entry, element, value)
            }
            (FieldType::List { element }, Some(key)) => {
                let entry = self.entry_slot(field, key)?;
                self.assign_element(entry, element, value)
            }
            (ty, _) => self.assign_element(field, ty, value),
        }
    }

    /// Store `value` into `slot`, converted to the declared type `ty`.
    fn assign_element(&self, slot: &mut Value, ty: &FieldType, value: Value) -> PropertyResult<()> {
        match ty {
            FieldType::Scalar { kind } => {
                if value.is_nil() {
                    return Ok(());
                }
                *slot = value
                    .convert_to(*kind)
                    .ok_or_else(|| self.mismatch(kind.name(), value.kind_name()))?;
            }
            FieldType::Enum { name } => {
                *slot = match &value {
                    Value::Nil => return Ok(()),
                    Value::String(label) => self
                        .introspector
                        .enum_value(label)
                        .map(Value::Int32)
                        .ok_or_else(|| self.mismatch(name.as_str(), label.as_str()))?,
                    other => other
                        .convert_to(Kind::Int32)
                        .ok_or_else(|| self.mismatch(name.as_str(), other.kind_name()))?,
                };
            }
            FieldType::Record { type_name, by_ref } => {
                self.assign_record(slot, type_name, *by_ref, value)?
            }
            FieldType::List { .. } => match value {
                Value::Nil | Value::List(_) => *slot = value,
                other => return Err(self.mismatch("list", other.kind_name())),
            },
            FieldType::Map { .. } => match value {
                Value::Nil | Value::Map(_) => *slot = value,
                other => return Err(self.mismatch("map", other.kind_name())),
            },
        }
        Ok(())
    }

    fn assign_record(
        &self,
        slot: &mut Value,
        type_name: &str,
        by_ref: bool,
        value: Value,
    ) -> PropertyResult<()> {
        match value {
            Value::Nil => {
                *slot = if by_ref {
                    Value::Nil
                } else {
                    Value::Record(self.introspector.new_record(type_name)?)
                };
            }
            Value::Ptr(_) | Value::Record(_) => {
                let found = value.type_name().unwrap_or_default();
                if found != type_name {
                    return Err(self.mismatch(type_name, found));
                }
                *slot = hold(value, by_ref);
            }
            Value::Deleted => return Err(self.mismatch(type_name, "deleted")),
            Value::String(text) if slot.is_nil() => {
                *slot = self.decode_record(type_name, by_ref, &text)?;
            }
            _ if slot.is_nil() => {
                *slot = self.introspector.materialize(&FieldType::Record {
                    type_name: type_name.to_string(),
                    by_ref,
                })?;
            }
            // A present record is kept when handed a value it cannot hold.
            _ => {}
        }
        Ok(())
    }

    /// Decode a record from its string form, or fall back to an empty one.
    fn decode_record(&self, type_name: &str, by_ref: bool, text: &str) -> PropertyResult<Value> {
        let decoded = self
            .introspector
            .serializer(Format::String)
            .ok_or_else(|| TypeError::Serialization("no string serializer registered".into()))
            .and_then(|s| s.unmarshal(type_name, text.as_bytes(), self.introspector.as_ref()));
        match decoded {
            Ok(value) => Ok(hold(value, by_ref)),
            Err(e) => {
                debug!(property = %self.property_id(), error = %e, "text is not a record, using an empty instance");
                let record = self.introspector.new_record(type_name)?;
                Ok(hold(Value::Record(record), by_ref))
            }
        }
    }

    fn not_found(&self) -> PropertyError {
        PropertyError::not_found(self.property_id())
    }

    fn mismatch(&self, expected: impl Into<String>, found: impl Into<String>) -> PropertyError {
        PropertyError::type_mismatch(self.property_id(), expected, found)
    }
}

/// Validate a parsed key against the field it selects into.
fn checked_key(input: &str, node: &Node, key: Key) -> PropertyResult<Key> {
    if node.is_root() {
        return Ok(key);
    }
    match node.key_kind() {
        Some(kind) => {
            let key = key.convert_to(kind)?;
            if node.is_slice() && key.as_index().is_none() {
                return Err(PropertyError::malformed(
                    input,
                    "slice index must be a non-negative integer",
                ));
            }
            Ok(key)
        }
        None => Err(PropertyError::malformed(
            input,
            format!("field {} is neither a map nor a slice", node.field_name()),
        )),
    }
}

/// Hold a record value by reference or inline, as the field declares.
fn hold(value: Value, by_ref: bool) -> Value {
    match (value, by_ref) {
        (Value::Record(record), true) => Value::ptr(record),
        (Value::Ptr(shared), false) => shared.get(),
        (value, _) => value,
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.property_id())
    }
}

impl fmt::Debug for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("id", &self.property_id())
            .field("value", &self.value)
            .finish()
    }
}

impl PartialEq for Property {
    fn eq(&self, other: &Self) -> bool {
        self.property_id() == other.property_id()
    }
}

impl Eq for Property {}
