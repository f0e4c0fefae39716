use std::collections::HashMap;
use std::sync::Arc;

use refl_types::{Format, Introspector, Node, TextSerializer, TypeDescriptor, TypeError, TypeResult};
use tracing::debug;

use crate::json::JsonSerializer;

/// In-memory type registry.
///
/// Types, enum labels, and serializers are registered through `&mut self`;
/// the registry is then frozen behind an `Arc` and shared read-only with the
/// engines. Registration never happens after sharing.
pub struct Registry {
    descriptors: HashMap<String, Arc<TypeDescriptor>>,
    nodes: HashMap<String, Arc<Node>>,
    enums: HashMap<String, i32>,
    serializers: HashMap<Format, Arc<dyn TextSerializer>>,
}

impl Registry {
    /// An empty registry with the JSON serializer installed for both
    /// [`Format::String`] and [`Format::Json`].
    pub fn new() -> Self {
        let json: Arc<dyn TextSerializer> = Arc::new(JsonSerializer::new());
        let mut serializers = HashMap::new();
        serializers.insert(Format::String, Arc::clone(&json));
        serializers.insert(Format::Json, json);
        Self {
            descriptors: HashMap::new(),
            nodes: HashMap::new(),
            enums: HashMap::new(),
            serializers,
        }
    }

    /// Declare a record type. Re-registering a name replaces the declaration;
    /// trees already inspected keep the old shape until inspected again.
    pub fn register(&mut self, descriptor: TypeDescriptor) -> Arc<TypeDescriptor> {
        let descriptor = Arc::new(descriptor);
        debug!(
            type_name = descriptor.name(),
            fields = descriptor.fields().len(),
            "registered type"
        );
        self.descriptors
            .insert(descriptor.name().to_string(), Arc::clone(&descriptor));
        descriptor
    }

    /// Build the metadata tree of a registered type and index every node in
    /// it by canonical key. Nested types must be registered first.
    pub fn inspect(&mut self, type_name: &str) -> TypeResult<Arc<Node>> {
        let descriptor = self
            .descriptors
            .get(type_name)
            .cloned()
            .ok_or_else(|| TypeError::UnknownType(type_name.to_string()))?;
        let descriptors = &self.descriptors;
        let resolve = |name: &str| descriptors.get(name).cloned();
        let root = Node::build(&descriptor, &resolve);
        let all = root.walk();
        debug!(type_name, nodes = all.len(), "inspected type");
        for node in all {
            self.nodes.insert(node.key().to_string(), node);
        }
        Ok(root)
    }

    /// Inspect every registered type.
    pub fn inspect_all(&mut self) -> TypeResult<()> {
        let mut names: Vec<String> = self.descriptors.keys().cloned().collect();
        names.sort();
        for name in names {
            self.inspect(&name)?;
        }
        Ok(())
    }

    /// Register enum labels and their numeric values.
    pub fn register_enums<I, S>(&mut self, labels: I)
    where
        I: IntoIterator<Item = (S, i32)>,
        S: Into<String>,
    {
        for (label, value) in labels {
            self.enums.insert(label.into(), value);
        }
    }

    pub fn add_serializer(&mut self, format: Format, serializer: Arc<dyn TextSerializer>) {
        self.serializers.insert(format, serializer);
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Freeze the registry for sharing with the engines.
    pub fn into_shared(self) -> Arc<dyn Introspector> {
        Arc::new(self)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Introspector for Registry {
    fn node(&self, key: &str) -> Option<Arc<Node>> {
        self.nodes.get(key).cloned()
    }

    fn descriptor(&self, type_name: &str) -> Option<Arc<TypeDescriptor>> {
        self.descriptors.get(type_name).cloned()
    }

    fn enum_value(&self, label: &str) -> Option<i32> {
        self.enums.get(label).copied()
    }

    fn serializer(&self, format: Format) -> Option<Arc<dyn TextSerializer>> {
        self.serializers.get(&format).cloned()
    }
}

#[cfg(test)]
mod tests {
    use refl_types::{FieldDecl, FieldType, Key, Kind, Value};

    use super::*;

    fn registry() -> Registry {
        let mut reg = Registry::new();
        reg.register(
            TypeDescriptor::new("Address")
                .with_field("City", FieldType::string())
                .with_field("Zip", FieldType::scalar(Kind::Uint32)),
        );
        reg.register(
            TypeDescriptor::new("Person")
                .with_field("Name", FieldType::string())
                .with_field("Region", FieldType::string())
                .with_field("Home", FieldType::inline("Address"))
                .with_field("Work", FieldType::record("Address"))
                .with(FieldDecl::new("Scratch", FieldType::string()).internal())
                .primary_key(["Name", "Region"]),
        );
        reg.inspect("Person").unwrap();
        reg
    }

    #[test]
    fn inspect_indexes_nested_nodes() {
        let reg = registry();
        assert!(reg.node("person").is_some());
        let zip = reg.node("person.home.zip").unwrap();
        assert_eq!(zip.element_type_name(), "uint32");
        assert!(reg.node("address").is_none());
    }

    #[test]
    fn inspect_unknown_type_fails() {
        let mut reg = Registry::new();
        assert_eq!(
            reg.inspect("Ghost").unwrap_err(),
            TypeError::UnknownType("Ghost".into())
        );
    }

    #[test]
    fn new_instance_zeroes_fields() {
        let reg = registry();
        let person = reg.new_instance("Person").unwrap();
        assert!(matches!(person, Value::Ptr(_)));
        let record = person.record().unwrap();
        assert_eq!(record.get("Name"), Some(&Value::String(String::new())));
        assert_eq!(record.get("Work"), Some(&Value::Nil));
        let home = record.get("Home").and_then(Value::as_record).unwrap();
        assert_eq!(home.get("Zip"), Some(&Value::Uint32(0)));
    }

    #[test]
    fn composite_primary_key() {
        let reg = registry();
        let person = reg.new_instance("Person").unwrap();
        if let Value::Ptr(r) = &person {
            r.modify(|v| {
                if let Value::Record(rec) = v {
                    rec.set("Name", "ada");
                    rec.set("Region", "eu");
                }
            });
        }
        assert_eq!(
            reg.primary_key_of(&person),
            Some(Key::Composite(vec![Key::string("ada"), Key::string("eu")]))
        );
    }

    #[test]
    fn enums_resolve_by_label() {
        let mut reg = Registry::new();
        reg.register_enums([("Red", 1), ("Blue", 2)]);
        assert_eq!(reg.enum_value("Blue"), Some(2));
        assert_eq!(reg.enum_value("Green"), None);
    }

    #[test]
    fn default_serializers_installed() {
        let reg = Registry::new().into_shared();
        assert!(reg.serializer(Format::String).is_some());
        assert!(reg.serializer(Format::Json).is_some());
    }
}
