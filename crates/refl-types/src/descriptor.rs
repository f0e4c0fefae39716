use serde::{Deserialize, Serialize};

use crate::kind::FieldType;

/// Declaration of one field of a record type.
///
/// `copy` and `compare` are the field's capabilities: a field with
/// `copy = false` is left at its zero value by the cloner, and a field with
/// `compare = false` is never visited by the diff engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDecl {
    pub name: String,
    pub ty: FieldType,
    #[serde(default = "enabled")]
    pub copy: bool,
    #[serde(default = "enabled")]
    pub compare: bool,
}

fn enabled() -> bool {
    true
}

impl FieldDecl {
    pub fn new(name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            ty,
            copy: true,
            compare: true,
        }
    }

    pub fn no_copy(mut self) -> Self {
        self.copy = false;
        self
    }

    pub fn no_compare(mut self) -> Self {
        self.compare = false;
        self
    }

    /// Bookkeeping field that takes part in neither cloning nor diffing.
    pub fn internal(self) -> Self {
        self.no_copy().no_compare()
    }
}

/// Declaration of a record type: its fields in order, its primary key, and
/// whether containers of it are diffed per element.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDescriptor {
    name: String,
    fields: Vec<FieldDecl>,
    #[serde(default)]
    primary_key: Vec<String>,
    #[serde(default)]
    deep: bool,
}

impl TypeDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            primary_key: Vec::new(),
            deep: false,
        }
    }

    /// Append a field with default capabilities.
    pub fn with_field(self, name: impl Into<String>, ty: FieldType) -> Self {
        self.with(FieldDecl::new(name, ty))
    }

    /// Append a fully specified field declaration.
    pub fn with(mut self, field: FieldDecl) -> Self {
        self.fields.push(field);
        self
    }

    /// Declare the ordered fields forming the identifying key.
    pub fn primary_key<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_key = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Maps and lists of this type are diffed per element instead of being
    /// replaced whole.
    pub fn deep(mut self) -> Self {
        self.deep = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[FieldDecl] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDecl> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn primary_key_fields(&self) -> &[String] {
        &self.primary_key
    }

    pub fn is_deep(&self) -> bool {
        self.deep
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::Kind;

    #[test]
    fn builder_keeps_declaration_order() {
        let desc = TypeDescriptor::new("Person")
            .with_field("Name", FieldType::string())
            .with(FieldDecl::new("Cache", FieldType::string()).internal())
            .with_field("Age", FieldType::scalar(Kind::Int32))
            .primary_key(["Name"]);
        let names: Vec<_> = desc.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["Name", "Cache", "Age"]);
        assert!(!desc.field("Cache").unwrap().copy);
        assert_eq!(desc.primary_key_fields(), ["Name"]);
        assert!(!desc.is_deep());
    }

    #[test]
    fn capabilities_default_on_when_deserialized() {
        let desc: TypeDescriptor = serde_json::from_str(
            r#"{"name":"T","fields":[{"name":"A","ty":{"shape":"scalar","kind":"int32"}}]}"#,
        )
        .unwrap();
        let field = desc.field("A").unwrap();
        assert!(field.copy && field.compare);
        assert_eq!(field.ty, FieldType::scalar(Kind::Int32));
    }
}
