//! Model and field descriptor tables
//!
//! A descriptor table is built once per model type and shared read-only by
//! every translator and correlator call that touches that model.

use serde::{Deserialize, Serialize};

use crate::api::query::Dialect;

/// Backend data kind of a field, used to validate response fragments
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    String,
    Integer,
    Number,
    Boolean,
    DateTime,
    Guid,
    /// Single reference to another model (SharePoint lookup, Graph navigation)
    Lookup,
    /// Multi-valued reference or value list
    Collection,
    /// Structured value without identity of its own
    Complex,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Integer => "integer",
            FieldKind::Number => "number",
            FieldKind::Boolean => "boolean",
            FieldKind::DateTime => "datetime",
            FieldKind::Guid => "guid",
            FieldKind::Lookup => "lookup",
            FieldKind::Collection => "collection",
            FieldKind::Complex => "complex",
        }
    }
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How one model field maps onto each backend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldDescriptor {
    /// Model-side field name used in queries (e.g., "Title")
    pub name: String,
    pub kind: FieldKind,
    /// Wire name in SharePoint REST and CSOM payloads
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sharepoint_name: Option<String>,
    /// Wire name in Microsoft Graph payloads
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graph_name: Option<String>,
    /// Whether the field can appear in `$expand`
    #[serde(default)]
    pub expandable: bool,
    /// Model type reached when expanding this field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default)]
    pub key: bool,
}

impl FieldDescriptor {
    /// Field with no wire names yet; chain `sharepoint`, `graph` or `wire`
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            sharepoint_name: None,
            graph_name: None,
            expandable: false,
            target: None,
            key: false,
        }
    }

    pub fn sharepoint(mut self, wire_name: impl Into<String>) -> Self {
        self.sharepoint_name = Some(wire_name.into());
        self
    }

    pub fn graph(mut self, wire_name: impl Into<String>) -> Self {
        self.graph_name = Some(wire_name.into());
        self
    }

    /// Same wire name for both dialects
    pub fn wire(self, wire_name: &str) -> Self {
        self.sharepoint(wire_name).graph(wire_name)
    }

    /// Mark as expandable navigation onto `target`
    pub fn expands_to(mut self, target: impl Into<String>) -> Self {
        self.expandable = true;
        self.target = Some(target.into());
        self
    }

    pub fn key(mut self) -> Self {
        self.key = true;
        self
    }

    /// Wire name for a dialect, if the field exists there
    pub fn wire_name(&self, dialect: Dialect) -> Option<&str> {
        match dialect {
            Dialect::SharePointRest => self.sharepoint_name.as_deref(),
            Dialect::Graph => self.graph_name.as_deref(),
        }
    }
}

/// Collection endpoint backing a model in one dialect
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollectionInfo {
    /// Path relative to the dialect root (e.g., "web/lists", "users")
    pub path: String,
    /// Whether the endpoint honours `$skip`
    #[serde(default = "default_supports_skip")]
    pub supports_skip: bool,
}

fn default_supports_skip() -> bool {
    true
}

/// Complete descriptor table for one model type
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelDescriptor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sharepoint: Option<CollectionInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graph: Option<CollectionInfo>,
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
}

impl ModelDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sharepoint: None,
            graph: None,
            fields: Vec::new(),
        }
    }

    pub fn sharepoint_collection(mut self, path: impl Into<String>, supports_skip: bool) -> Self {
        self.sharepoint = Some(CollectionInfo {
            path: path.into(),
            supports_skip,
        });
        self
    }

    pub fn graph_collection(mut self, path: impl Into<String>, supports_skip: bool) -> Self {
        self.graph = Some(CollectionInfo {
            path: path.into(),
            supports_skip,
        });
        self
    }

    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    pub fn collection(&self, dialect: Dialect) -> Option<&CollectionInfo> {
        match dialect {
            Dialect::SharePointRest => self.sharepoint.as_ref(),
            Dialect::Graph => self.graph.as_ref(),
        }
    }

    /// Look up a field by its model-side name
    pub fn get(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Look up a field by its wire name in a dialect
    pub fn by_wire_name(&self, dialect: Dialect, wire_name: &str) -> Option<&FieldDescriptor> {
        self.fields
            .iter()
            .find(|f| f.wire_name(dialect) == Some(wire_name))
    }

    pub fn key_field(&self) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list_item() -> ModelDescriptor {
        ModelDescriptor::new("ListItem")
            .sharepoint_collection("web/lists/getbytitle('Tasks')/items", false)
            .field(FieldDescriptor::new("Id", FieldKind::Integer).wire("Id").key())
            .field(FieldDescriptor::new("Title", FieldKind::String).sharepoint("Title"))
            .field(
                FieldDescriptor::new("Author", FieldKind::Lookup)
                    .sharepoint("Author")
                    .expands_to("User"),
            )
    }

    #[test]
    fn test_wire_name_per_dialect() {
        let model = list_item();
        let title = model.get("Title").unwrap();
        assert_eq!(title.wire_name(Dialect::SharePointRest), Some("Title"));
        assert_eq!(title.wire_name(Dialect::Graph), None);
    }

    #[test]
    fn test_lookup_helpers() {
        let model = list_item();
        assert_eq!(model.key_field().unwrap().name, "Id");
        assert_eq!(
            model.by_wire_name(Dialect::SharePointRest, "Author").unwrap().target.as_deref(),
            Some("User")
        );
        assert!(model.collection(Dialect::Graph).is_none());
        assert!(!model.collection(Dialect::SharePointRest).unwrap().supports_skip);
    }

    #[test]
    fn test_descriptor_from_toml() {
        let model: ModelDescriptor = toml::from_str(
            r#"
            name = "Task"

            [sharepoint]
            path = "web/lists/getbytitle('Tasks')/items"

            [[fields]]
            name = "DueDate"
            kind = "date_time"
            sharepoint_name = "DueDate"
            "#,
        )
        .unwrap();

        assert_eq!(model.name, "Task");
        assert!(model.sharepoint.as_ref().unwrap().supports_skip);
        assert_eq!(model.fields[0].kind, FieldKind::DateTime);
        assert!(!model.fields[0].expandable);
    }
}
