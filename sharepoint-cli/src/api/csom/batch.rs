//! Batch-scoped action graph builder
//!
//! A `CsomBatch` owns its `IdProvider` and the ordered list of nodes. Every
//! builder method allocates fresh ids for the nodes it introduces and appends
//! them in the order the server must execute them, so an object path is always
//! declared before the first action that depends on it.

use uuid::{Uuid, uuid};

use super::ids::IdProvider;
use super::nodes::{Action, ActionObjectPath, Identity, NodeSummary, SelectSpec};
use super::parameter::Parameter;
use super::serializer;
use crate::api::error::EncodingError;

/// `Microsoft.SharePoint.Client.RequestContext`
pub const REQUEST_CONTEXT_TYPE: Uuid = uuid!("3747adcd-a3c3-41b9-bfab-4a64dd2f1e0a");
/// `Microsoft.SharePoint.Taxonomy.TaxonomyFieldValue`
pub const TAXONOMY_FIELD_VALUE_TYPE: Uuid = uuid!("19e70ed0-4177-456b-8156-015e4d163ff8");
/// `Microsoft.SharePoint.Taxonomy.TaxonomyFieldValueCollection`
pub const TAXONOMY_FIELD_VALUE_COLLECTION_TYPE: Uuid =
    uuid!("c3dfae10-f3bf-4894-9012-bb60665b6d91");
/// `Microsoft.SharePoint.Client.FieldLookupValue`
pub const FIELD_LOOKUP_VALUE_TYPE: Uuid = uuid!("f1d34cc0-9b50-4a78-be78-d5facfcccfb7");
/// `Microsoft.SharePoint.Client.FieldUserValue`
pub const FIELD_USER_VALUE_TYPE: Uuid = uuid!("c956ab54-16bd-4c18-89d2-996f57282a6f");

/// Handle to an object path declared in a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectRef(u32);

impl ObjectRef {
    /// Refer to an object path by raw id, e.g. one adopted later in the batch
    pub fn from_id(id: u32) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u32 {
        self.0
    }
}

/// Handle to an action whose result can be read from the response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActionRef(u32);

impl ActionRef {
    pub fn id(&self) -> u32 {
        self.0
    }
}

/// How a list item's pending field values are committed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdateMode {
    /// New version, editor and modified date updated
    #[default]
    Update,
    /// No new version, editor and modified date untouched
    SystemUpdate,
    /// Current version overwritten in place
    UpdateOverwriteVersion,
}

impl UpdateMode {
    pub fn method_name(&self) -> &'static str {
        match self {
            UpdateMode::Update => "Update",
            UpdateMode::SystemUpdate => "SystemUpdate",
            UpdateMode::UpdateOverwriteVersion => "UpdateOverwriteVersion",
        }
    }
}

impl std::str::FromStr for UpdateMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "update" => Ok(UpdateMode::Update),
            "systemupdate" => Ok(UpdateMode::SystemUpdate),
            "overwrite" | "updateoverwriteversion" => Ok(UpdateMode::UpdateOverwriteVersion),
            other => Err(format!("unknown update mode '{}'", other)),
        }
    }
}

/// Managed metadata term
#[derive(Debug, Clone, PartialEq)]
pub struct TermValue {
    pub label: String,
    pub term_id: Uuid,
    /// Id in the site's hidden taxonomy list, `-1` when unknown
    pub wss_id: i32,
}

impl TermValue {
    pub fn new(label: impl Into<String>, term_id: Uuid) -> Self {
        Self {
            label: label.into(),
            term_id,
            wss_id: -1,
        }
    }

    fn pair_text(&self) -> String {
        format!("{}|{}", self.label, self.term_id)
    }
}

/// Value written to a list item field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Scalar(Parameter),
    Lookup(i32),
    Lookups(Vec<i32>),
    User(i32),
    Taxonomy(TermValue),
    TaxonomyMulti(Vec<TermValue>),
}

impl From<Parameter> for FieldValue {
    fn from(value: Parameter) -> Self {
        FieldValue::Scalar(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Scalar(value.into())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Scalar(value.into())
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Scalar(value.into())
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Scalar(value.into())
    }
}

#[derive(Debug, Default)]
pub struct CsomBatch {
    ids: IdProvider,
    paths: Vec<ActionObjectPath>,
    context: Option<ObjectRef>,
}

impl CsomBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn paths(&self) -> &[ActionObjectPath] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Id the next node will receive
    pub fn next_id(&self) -> u32 {
        self.ids.peek()
    }

    /// Render the batch as a request envelope
    pub fn to_xml(&self, application_name: &str) -> Result<String, EncodingError> {
        serializer::serialize(&self.paths, application_name)
    }

    /// `(id, reference, kind)` for every node: actions first, then paths
    pub fn summaries(&self) -> Vec<NodeSummary> {
        let actions = self
            .paths
            .iter()
            .filter_map(|p| p.action.as_ref())
            .map(NodeSummary::from);
        let identities = self
            .paths
            .iter()
            .filter_map(|p| p.identity.as_ref())
            .map(NodeSummary::from);
        actions.chain(identities).collect()
    }

    /// Declare an identity and instantiate it with an `ObjectPath` action
    fn declare(&mut self, identity: Identity) -> ObjectRef {
        let target = ObjectRef(identity.id());
        let action = Action::ObjectPath {
            id: self.ids.next_id(),
            object_path_id: target.0,
        };
        self.paths.push(ActionObjectPath::both(action, identity));
        target
    }

    fn push_action(&mut self, action: Action) -> ActionRef {
        let id = action.id();
        self.paths.push(ActionObjectPath::action(action));
        ActionRef(id)
    }

    /// Append an identity with a caller-assigned id
    ///
    /// The id provider skips past the adopted id so later nodes never collide
    /// with it. Adopting an id already used by any action or identity is reported
    /// when the batch is serialized.
    pub fn adopt_identity(&mut self, identity: Identity) -> ObjectRef {
        self.ids.advance_past(identity.id());
        let target = ObjectRef(identity.id());
        self.paths.push(ActionObjectPath::identity(identity));
        target
    }

    /// `RequestContext.Current`, declared once per batch
    pub fn request_context(&mut self) -> ObjectRef {
        if let Some(context) = self.context {
            return context;
        }
        let identity = Identity::StaticProperty {
            id: self.ids.next_id(),
            type_id: REQUEST_CONTEXT_TYPE,
            name: "Current".to_string(),
        };
        let context = self.declare(identity);
        self.context = Some(context);
        context
    }

    /// Property of an existing object path
    pub fn property(&mut self, parent: ObjectRef, name: &str) -> ObjectRef {
        let identity = Identity::Property {
            id: self.ids.next_id(),
            parent_id: parent.0,
            name: name.to_string(),
        };
        self.declare(identity)
    }

    /// Object returned by a method on an existing object path
    pub fn method_path(
        &mut self,
        parent: ObjectRef,
        name: &str,
        parameters: Vec<Parameter>,
    ) -> ObjectRef {
        let identity = Identity::Method {
            id: self.ids.next_id(),
            parent_id: parent.0,
            name: name.to_string(),
            parameters,
        };
        self.declare(identity)
    }

    pub fn current_site(&mut self) -> ObjectRef {
        let context = self.request_context();
        self.property(context, "Site")
    }

    pub fn current_web(&mut self) -> ObjectRef {
        let context = self.request_context();
        self.property(context, "Web")
    }

    /// `web.Lists.GetById(list_id)`
    pub fn web_list_by_id(&mut self, web: ObjectRef, list_id: Uuid) -> ObjectRef {
        let lists = self.property(web, "Lists");
        self.method_path(lists, "GetById", vec![Parameter::Guid(list_id)])
    }

    /// `list.GetItemById(item_id)`
    pub fn list_item_by_id(&mut self, list: ObjectRef, item_id: i32) -> ObjectRef {
        self.method_path(list, "GetItemById", vec![Parameter::Int32(item_id)])
    }

    /// `list.Fields.GetByInternalNameOrTitle(name)`
    pub fn list_field(&mut self, list: ObjectRef, name: &str) -> ObjectRef {
        let fields = self.property(list, "Fields");
        self.method_path(fields, "GetByInternalNameOrTitle", vec![name.into()])
    }

    /// Object addressed by a server identity string from an earlier response
    pub fn object_identity(&mut self, identity: &str) -> ObjectRef {
        let identity = Identity::Identity {
            id: self.ids.next_id(),
            name: identity.to_string(),
        };
        self.declare(identity)
    }

    /// Construct a new server object
    pub fn create_instance(&mut self, type_id: Uuid, parameters: Vec<Parameter>) -> ObjectRef {
        let identity = Identity::Constructor {
            id: self.ids.next_id(),
            type_id,
            parameters,
        };
        self.declare(identity)
    }

    pub fn set_property(
        &mut self,
        target: ObjectRef,
        name: &str,
        value: impl Into<Parameter>,
    ) -> ActionRef {
        let action = Action::SetProperty {
            id: self.ids.next_id(),
            object_path_id: target.0,
            name: name.to_string(),
            value: value.into(),
        };
        self.push_action(action)
    }

    pub fn call_method(
        &mut self,
        target: ObjectRef,
        name: &str,
        parameters: Vec<Parameter>,
    ) -> ActionRef {
        let action = Action::Method {
            id: self.ids.next_id(),
            object_path_id: target.0,
            name: name.to_string(),
            parameters,
        };
        self.push_action(action)
    }

    /// Load scalar properties of `target`; `properties` empty loads all
    pub fn query_properties(&mut self, target: ObjectRef, properties: &[&str]) -> ActionRef {
        let select = if properties.is_empty() {
            SelectSpec::all()
        } else {
            SelectSpec::of(properties.iter().copied())
        };
        let action = Action::Query {
            id: self.ids.next_id(),
            object_path_id: target.0,
            select,
        };
        self.push_action(action)
    }

    /// Ask the server for the identity string of `target`
    pub fn identity_query(&mut self, target: ObjectRef) -> ActionRef {
        let action = Action::IdentityQuery {
            id: self.ids.next_id(),
            object_path_id: target.0,
        };
        self.push_action(action)
    }

    /// Construct a `TaxonomyFieldValue` and populate it
    pub fn taxonomy_field_value(&mut self, term: &TermValue) -> ObjectRef {
        let value = self.create_instance(TAXONOMY_FIELD_VALUE_TYPE, Vec::new());
        self.set_property(value, "Label", term.label.as_str());
        self.set_property(value, "TermGuid", term.term_id.to_string());
        self.set_property(value, "WssId", term.wss_id);
        value
    }

    /// Construct a `TaxonomyFieldValueCollection` bound to `field`
    pub fn taxonomy_field_values(&mut self, field: ObjectRef, terms: &[TermValue]) -> ObjectRef {
        let collection = self.create_instance(
            TAXONOMY_FIELD_VALUE_COLLECTION_TYPE,
            vec![Parameter::String(String::new()), Parameter::ObjectPath(field.0)],
        );
        let pairs = terms
            .iter()
            .map(TermValue::pair_text)
            .collect::<Vec<_>>()
            .join(";");
        self.call_method(collection, "PopulateFromLabelGuidPairs", vec![pairs.into()]);
        collection
    }

    /// Point a taxonomy field at a term store
    pub fn set_taxonomy_store(&mut self, field: ObjectRef, ssp_id: Uuid) -> ActionRef {
        self.set_property(field, "SspId", ssp_id)
    }

    /// Write field values on `item` and commit them with `mode`
    ///
    /// Complex values are built first so the `SetFieldValue` that consumes them
    /// always follows the constructor it references. Multi-value taxonomy
    /// fields need the field object itself, so `list` must be the item's list.
    pub fn update_list_item(
        &mut self,
        list: ObjectRef,
        item: ObjectRef,
        values: Vec<(String, FieldValue)>,
        mode: UpdateMode,
    ) -> ActionRef {
        for (field, value) in values {
            let parameter = match value {
                FieldValue::Scalar(p) => p,
                FieldValue::Lookup(id) => lookup_value(FIELD_LOOKUP_VALUE_TYPE, id),
                FieldValue::User(id) => lookup_value(FIELD_USER_VALUE_TYPE, id),
                FieldValue::Lookups(ids) => Parameter::Array(
                    ids.into_iter()
                        .map(|id| lookup_value(FIELD_LOOKUP_VALUE_TYPE, id))
                        .collect(),
                ),
                FieldValue::Taxonomy(term) => {
                    Parameter::ObjectPath(self.taxonomy_field_value(&term).0)
                }
                FieldValue::TaxonomyMulti(terms) => {
                    let field_ref = self.list_field(list, &field);
                    Parameter::ObjectPath(self.taxonomy_field_values(field_ref, &terms).0)
                }
            };
            self.call_method(item, "SetFieldValue", vec![field.into(), parameter]);
        }
        self.call_method(item, mode.method_name(), Vec::new())
    }
}

fn lookup_value(type_id: Uuid, id: i32) -> Parameter {
    Parameter::Object {
        type_id,
        properties: vec![("LookupId".to_string(), Parameter::Int32(id))],
    }
}
