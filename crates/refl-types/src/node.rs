//! The per-type metadata tree.
//!
//! A root [`Node`] describes a record type; each child describes one field.
//! Children of a record-typed field (or of a container of records) describe
//! that record's fields in turn. A record type that already appears among a
//! node's ancestors is not expanded again, which keeps the tree finite for
//! self-referential types.

use std::sync::{Arc, OnceLock, Weak};

use crate::descriptor::{FieldDecl, TypeDescriptor};
use crate::kind::{FieldType, Kind};

/// One field position in a type's shape. Immutable once built.
#[derive(Debug)]
pub struct Node {
    type_name: String,
    field_name: String,
    field_type: FieldType,
    parent: Weak<Node>,
    attributes: Vec<Arc<Node>>,
    copy: bool,
    compare: bool,
    cached_key: OnceLock<String>,
}

impl Node {
    /// Build the full tree for `descriptor`, resolving nested record types
    /// through `resolve`. Unresolvable record types become leaves.
    pub fn build(
        descriptor: &TypeDescriptor,
        resolve: &dyn Fn(&str) -> Option<Arc<TypeDescriptor>>,
    ) -> Arc<Node> {
        Arc::new_cyclic(|me| {
            let mut chain = vec![descriptor.name().to_string()];
            Node {
                type_name: descriptor.name().to_string(),
                field_name: descriptor.name().to_string(),
                field_type: FieldType::record(descriptor.name()),
                parent: Weak::new(),
                attributes: build_children(descriptor, me, resolve, &mut chain),
                copy: true,
                compare: true,
                cached_key: OnceLock::new(),
            }
        })
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    pub fn field_type(&self) -> &FieldType {
        &self.field_type
    }

    pub fn parent(&self) -> Option<Arc<Node>> {
        self.parent.upgrade()
    }

    pub fn is_root(&self) -> bool {
        self.parent.upgrade().is_none()
    }

    pub fn attributes(&self) -> &[Arc<Node>] {
        &self.attributes
    }

    /// Child node by field name, case-insensitively.
    pub fn attribute(&self, name: &str) -> Option<&Arc<Node>> {
        self.attributes
            .iter()
            .find(|a| a.field_name.eq_ignore_ascii_case(name))
    }

    pub fn is_leaf(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn is_map(&self) -> bool {
        self.field_type.is_map()
    }

    pub fn is_slice(&self) -> bool {
        self.field_type.is_list()
    }

    /// The field holds a record, or a container of records.
    pub fn is_struct(&self) -> bool {
        self.field_type.record_type().is_some()
    }

    /// Element type name: the field type for plain fields, the element type
    /// for containers.
    pub fn element_type_name(&self) -> &str {
        self.field_type.type_name()
    }

    pub fn key_kind(&self) -> Option<Kind> {
        self.field_type.key_kind()
    }

    pub fn copies(&self) -> bool {
        self.copy
    }

    pub fn compares(&self) -> bool {
        self.compare
    }

    /// Canonical key: the lower-cased root type name followed by the
    /// lower-cased field names down to this node, dot-separated.
    pub fn key(&self) -> &str {
        self.cached_key.get_or_init(|| match self.parent() {
            None => self.type_name.to_lowercase(),
            Some(parent) => format!("{}.{}", parent.key(), self.field_name.to_lowercase()),
        })
    }

    /// Number of ancestors.
    pub fn depth(&self) -> usize {
        self.parent().map_or(0, |p| p.depth() + 1)
    }

    /// This node and all of its descendants, parents first.
    pub fn walk(self: &Arc<Self>) -> Vec<Arc<Node>> {
        let mut out = vec![Arc::clone(self)];
        for child in &self.attributes {
            out.extend(child.walk());
        }
        out
    }
}

fn build_children(
    descriptor: &TypeDescriptor,
    parent: &Weak<Node>,
    resolve: &dyn Fn(&str) -> Option<Arc<TypeDescriptor>>,
    chain: &mut Vec<String>,
) -> Vec<Arc<Node>> {
    let mut children = Vec::with_capacity(descriptor.fields().len());
    for field in descriptor.fields() {
        children.push(build_field(field, parent, resolve, chain));
    }
    children
}

fn build_field(
    field: &FieldDecl,
    parent: &Weak<Node>,
    resolve: &dyn Fn(&str) -> Option<Arc<TypeDescriptor>>,
    chain: &mut Vec<String>,
) -> Arc<Node> {
    Arc::new_cyclic(|me| {
        let nested = field
            .ty
            .record_type()
            .filter(|t| !chain.iter().any(|c| c == t))
            .and_then(resolve);
        let attributes = match nested {
            Some(desc) => {
                chain.push(desc.name().to_string());
                let children = build_children(&desc, me, resolve, chain);
                chain.pop();
                children
            }
            None => Vec::new(),
        };
        Node {
            type_name: field.ty.type_name().to_string(),
            field_name: field.name.clone(),
            field_type: field.ty.clone(),
            parent: parent.clone(),
            attributes,
            copy: field.copy,
            compare: field.compare,
            cached_key: OnceLock::new(),
        }
    })
}
