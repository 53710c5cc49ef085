//! Action and object-path nodes
//!
//! Nodes reference each other by id only, never by Rust reference, so a
//! graph can be serialized independently of how it was assembled.

use std::fmt;

use uuid::Uuid;

use super::parameter::Parameter;

/// Server object addressed by a batch
#[derive(Debug, Clone, PartialEq)]
pub enum Identity {
    /// Static member of a server type, e.g. `RequestContext.Current`
    StaticProperty { id: u32, type_id: Uuid, name: String },
    /// Property of another object path
    Property { id: u32, parent_id: u32, name: String },
    /// Newly constructed server object
    Constructor {
        id: u32,
        type_id: Uuid,
        parameters: Vec<Parameter>,
    },
    /// Object returned by a method on another object path
    Method {
        id: u32,
        parent_id: u32,
        name: String,
        parameters: Vec<Parameter>,
    },
    /// Object addressed by its server identity string
    Identity { id: u32, name: String },
}

impl Identity {
    pub fn id(&self) -> u32 {
        match self {
            Identity::StaticProperty { id, .. }
            | Identity::Property { id, .. }
            | Identity::Constructor { id, .. }
            | Identity::Method { id, .. }
            | Identity::Identity { id, .. } => *id,
        }
    }

    pub fn parent_id(&self) -> Option<u32> {
        match self {
            Identity::Property { parent_id, .. } | Identity::Method { parent_id, .. } => {
                Some(*parent_id)
            }
            _ => None,
        }
    }

    pub fn parameters(&self) -> &[Parameter] {
        match self {
            Identity::Constructor { parameters, .. } | Identity::Method { parameters, .. } => {
                parameters
            }
            _ => &[],
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Identity::StaticProperty { .. } => NodeKind::StaticProperty,
            Identity::Property { .. } => NodeKind::Property,
            Identity::Constructor { .. } => NodeKind::Constructor,
            Identity::Method { .. } => NodeKind::MethodPath,
            Identity::Identity { .. } => NodeKind::Identity,
        }
    }
}

/// Which properties a `Query` action loads
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectSpec {
    pub select_all: bool,
    pub properties: Vec<String>,
}

impl SelectSpec {
    pub fn all() -> Self {
        Self {
            select_all: true,
            properties: Vec::new(),
        }
    }

    pub fn of<I, S>(properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            select_all: false,
            properties: properties.into_iter().map(Into::into).collect(),
        }
    }
}

/// One operation the server performs against an object path
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Instantiate the object path on the server
    ObjectPath { id: u32, object_path_id: u32 },
    Method {
        id: u32,
        object_path_id: u32,
        name: String,
        parameters: Vec<Parameter>,
    },
    SetProperty {
        id: u32,
        object_path_id: u32,
        name: String,
        value: Parameter,
    },
    Query {
        id: u32,
        object_path_id: u32,
        select: SelectSpec,
    },
    IdentityQuery { id: u32, object_path_id: u32 },
}

impl Action {
    pub fn id(&self) -> u32 {
        match self {
            Action::ObjectPath { id, .. }
            | Action::Method { id, .. }
            | Action::SetProperty { id, .. }
            | Action::Query { id, .. }
            | Action::IdentityQuery { id, .. } => *id,
        }
    }

    pub fn object_path_id(&self) -> u32 {
        match self {
            Action::ObjectPath { object_path_id, .. }
            | Action::Method { object_path_id, .. }
            | Action::SetProperty { object_path_id, .. }
            | Action::Query { object_path_id, .. }
            | Action::IdentityQuery { object_path_id, .. } => *object_path_id,
        }
    }

    /// Object path ids referenced from parameter values
    pub fn parameter_paths(&self) -> Vec<u32> {
        match self {
            Action::Method { parameters, .. } => {
                parameters.iter().flat_map(Parameter::referenced_paths).collect()
            }
            Action::SetProperty { value, .. } => value.referenced_paths(),
            _ => Vec::new(),
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Action::ObjectPath { .. } => NodeKind::ObjectPath,
            Action::Method { .. } => NodeKind::MethodAction,
            Action::SetProperty { .. } => NodeKind::SetProperty,
            Action::Query { .. } => NodeKind::Query,
            Action::IdentityQuery { .. } => NodeKind::IdentityQuery,
        }
    }
}

/// An action and/or identity emitted together
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionObjectPath {
    pub action: Option<Action>,
    pub identity: Option<Identity>,
}

impl ActionObjectPath {
    pub fn action(action: Action) -> Self {
        Self {
            action: Some(action),
            identity: None,
        }
    }

    pub fn identity(identity: Identity) -> Self {
        Self {
            action: None,
            identity: Some(identity),
        }
    }

    pub fn both(action: Action, identity: Identity) -> Self {
        Self {
            action: Some(action),
            identity: Some(identity),
        }
    }
}

/// Node kinds as they appear on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKind {
    ObjectPath,
    MethodAction,
    SetProperty,
    Query,
    IdentityQuery,
    StaticProperty,
    Property,
    Constructor,
    MethodPath,
    Identity,
}

impl NodeKind {
    /// Element name used for this kind
    pub fn tag(&self) -> &'static str {
        match self {
            NodeKind::ObjectPath => "ObjectPath",
            NodeKind::MethodAction | NodeKind::MethodPath => "Method",
            NodeKind::SetProperty => "SetProperty",
            NodeKind::Query => "Query",
            NodeKind::IdentityQuery => "ObjectIdentityQuery",
            NodeKind::StaticProperty => "StaticProperty",
            NodeKind::Property => "Property",
            NodeKind::Constructor => "Constructor",
            NodeKind::Identity => "Identity",
        }
    }

    pub fn is_action(&self) -> bool {
        matches!(
            self,
            NodeKind::ObjectPath
                | NodeKind::MethodAction
                | NodeKind::SetProperty
                | NodeKind::Query
                | NodeKind::IdentityQuery
        )
    }

    /// Kind of an element found under `<Actions>`
    pub fn action_from_tag(tag: &str) -> Option<Self> {
        Some(match tag {
            "ObjectPath" => NodeKind::ObjectPath,
            "Method" => NodeKind::MethodAction,
            "SetProperty" => NodeKind::SetProperty,
            "Query" => NodeKind::Query,
            "ObjectIdentityQuery" => NodeKind::IdentityQuery,
            _ => return None,
        })
    }

    /// Kind of an element found under `<ObjectPaths>`
    pub fn path_from_tag(tag: &str) -> Option<Self> {
        Some(match tag {
            "StaticProperty" => NodeKind::StaticProperty,
            "Property" => NodeKind::Property,
            "Constructor" => NodeKind::Constructor,
            "Method" => NodeKind::MethodPath,
            "Identity" => NodeKind::Identity,
            _ => return None,
        })
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let section = if self.is_action() { "action" } else { "path" };
        write!(f, "{} {}", self.tag(), section)
    }
}

/// `(id, referenced id, kind)` view of one node, comparable across
/// in-memory graphs and parsed envelopes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeSummary {
    pub id: u32,
    /// `ObjectPathId` for actions, `ParentId` for paths
    pub reference: Option<u32>,
    pub kind: NodeKind,
}

impl From<&Action> for NodeSummary {
    fn from(action: &Action) -> Self {
        Self {
            id: action.id(),
            reference: Some(action.object_path_id()),
            kind: action.kind(),
        }
    }
}

impl From<&Identity> for NodeSummary {
    fn from(identity: &Identity) -> Self {
        Self {
            id: identity.id(),
            reference: identity.parent_id(),
            kind: identity.kind(),
        }
    }
}
