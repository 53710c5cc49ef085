//! Request envelope writer
//!
//! Output layout:
//!
//! ```xml
//! <Request AddExpandoFieldTypeSuffix="true" SchemaVersion="15.0.0.0" LibraryVersion="16.0.0.0"
//!          ApplicationName="..." xmlns="http://schemas.microsoft.com/sharepoint/clientquery/2009">
//!   <Actions>...</Actions>
//!   <ObjectPaths>...</ObjectPaths>
//! </Request>
//! ```
//!
//! Actions and object paths are written in batch order and attributes in a
//! fixed order per element, so identical batches always produce identical
//! bytes. The graph is validated before anything is written.

use std::borrow::Cow;
use std::collections::HashSet;

use quick_xml::Writer;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::name::QName;

use super::nodes::{Action, ActionObjectPath, Identity, SelectSpec};
use super::parameter::Parameter;
use crate::api::error::EncodingError;

pub const CLIENT_QUERY_NAMESPACE: &str = "http://schemas.microsoft.com/sharepoint/clientquery/2009";
pub const SCHEMA_VERSION: &str = "15.0.0.0";
pub const LIBRARY_VERSION: &str = "16.0.0.0";

/// Validate and render `paths` as one request envelope
pub fn serialize(paths: &[ActionObjectPath], application_name: &str) -> Result<String, EncodingError> {
    validate(paths)?;

    let mut out = EnvelopeWriter::new();
    out.start(
        "Request",
        vec![
            ("AddExpandoFieldTypeSuffix", "true".to_string()),
            ("SchemaVersion", SCHEMA_VERSION.to_string()),
            ("LibraryVersion", LIBRARY_VERSION.to_string()),
            ("ApplicationName", application_name.to_string()),
            ("xmlns", CLIENT_QUERY_NAMESPACE.to_string()),
        ],
    )?;

    out.start("Actions", Vec::new())?;
    for action in paths.iter().filter_map(|p| p.action.as_ref()) {
        out.action(action)?;
    }
    out.end("Actions")?;

    out.start("ObjectPaths", Vec::new())?;
    for identity in paths.iter().filter_map(|p| p.identity.as_ref()) {
        out.identity(identity)?;
    }
    out.end("ObjectPaths")?;

    out.end("Request")?;
    let xml = out.finish()?;

    log::debug!(
        "Serialized CSOM request: {} actions, {} object paths, {} bytes",
        paths.iter().filter(|p| p.action.is_some()).count(),
        paths.iter().filter(|p| p.identity.is_some()).count(),
        xml.len()
    );
    Ok(xml)
}

/// Reject duplicate ids and references to paths the batch never declares
pub fn validate(paths: &[ActionObjectPath]) -> Result<(), EncodingError> {
    // actions and identities share one id space on the wire
    let mut used = HashSet::new();
    let mut declared = HashSet::new();
    for identity in paths.iter().filter_map(|p| p.identity.as_ref()) {
        if !used.insert(identity.id()) {
            return Err(EncodingError::DuplicateId { id: identity.id() });
        }
        declared.insert(identity.id());
    }
    for action in paths.iter().filter_map(|p| p.action.as_ref()) {
        if !used.insert(action.id()) {
            return Err(EncodingError::DuplicateId { id: action.id() });
        }
    }

    let dangling = |node: u32, id: u32| {
        if declared.contains(&id) {
            Ok(())
        } else {
            Err(EncodingError::DanglingReference {
                node,
                object_path_id: id,
            })
        }
    };

    for identity in paths.iter().filter_map(|p| p.identity.as_ref()) {
        if let Some(parent) = identity.parent_id() {
            dangling(identity.id(), parent)?;
        }
        for id in identity.parameters().iter().flat_map(Parameter::referenced_paths) {
            dangling(identity.id(), id)?;
        }
    }

    for action in paths.iter().filter_map(|p| p.action.as_ref()) {
        dangling(action.id(), action.object_path_id())?;
        for id in action.parameter_paths() {
            dangling(action.id(), id)?;
        }
    }

    Ok(())
}

/// Escape element text: `&`, `<` and `>`; tab, CR and LF pass through
pub fn escape_text(value: &str, context: &str) -> Result<String, EncodingError> {
    escape(value, false, context)
}

/// Escape an attribute value: also quotes, and control whitespace as
/// numeric character references
pub fn escape_attribute(value: &str, context: &str) -> Result<String, EncodingError> {
    escape(value, true, context)
}

fn escape(value: &str, attribute: bool, context: &str) -> Result<String, EncodingError> {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            '\'' if attribute => out.push_str("&apos;"),
            '\n' if attribute => out.push_str("&#xA;"),
            '\r' if attribute => out.push_str("&#xD;"),
            '\t' if attribute => out.push_str("&#x9;"),
            '\n' | '\r' | '\t' => out.push(c),
            c if (c as u32) < 0x20 => {
                return Err(EncodingError::ControlCharacter {
                    code_point: c as u32,
                    context: context.to_string(),
                });
            }
            c => out.push(c),
        }
    }
    Ok(out)
}

fn braced(id: &uuid::Uuid) -> String {
    format!("{{{}}}", id)
}

type Attributes = Vec<(&'static str, String)>;

struct EnvelopeWriter {
    writer: Writer<Vec<u8>>,
}

impl EnvelopeWriter {
    fn new() -> Self {
        Self {
            writer: Writer::new(Vec::new()),
        }
    }

    fn element<'a>(tag: &'a str, attributes: Attributes) -> Result<BytesStart<'a>, EncodingError> {
        let mut start = BytesStart::new(tag);
        for (key, value) in attributes {
            let escaped = escape_attribute(&value, tag)?;
            start.push_attribute(Attribute {
                key: QName(key.as_bytes()),
                value: Cow::Owned(escaped.into_bytes()),
            });
        }
        Ok(start)
    }

    fn write(&mut self, event: Event<'_>) -> Result<(), EncodingError> {
        self.writer
            .write_event(event)
            .map_err(|e| EncodingError::Writer(e.to_string()))
    }

    fn start(&mut self, tag: &str, attributes: Attributes) -> Result<(), EncodingError> {
        let start = Self::element(tag, attributes)?;
        self.write(Event::Start(start))
    }

    fn empty(&mut self, tag: &str, attributes: Attributes) -> Result<(), EncodingError> {
        let start = Self::element(tag, attributes)?;
        self.write(Event::Empty(start))
    }

    fn end(&mut self, tag: &str) -> Result<(), EncodingError> {
        self.write(Event::End(BytesEnd::new(tag)))
    }

    fn text(&mut self, value: &str, context: &str) -> Result<(), EncodingError> {
        let escaped = escape_text(value, context)?;
        self.write(Event::Text(BytesText::from_escaped(escaped)))
    }

    fn finish(self) -> Result<String, EncodingError> {
        String::from_utf8(self.writer.into_inner()).map_err(|e| EncodingError::Writer(e.to_string()))
    }

    fn action(&mut self, action: &Action) -> Result<(), EncodingError> {
        let tag = action.kind().tag();
        let mut attributes = vec![
            ("Id", action.id().to_string()),
            ("ObjectPathId", action.object_path_id().to_string()),
        ];

        match action {
            Action::ObjectPath { .. } | Action::IdentityQuery { .. } => self.empty(tag, attributes),
            Action::Method {
                name, parameters, ..
            } => {
                attributes.push(("Name", name.clone()));
                self.with_parameters(tag, attributes, parameters)
            }
            Action::SetProperty { name, value, .. } => {
                attributes.push(("Name", name.clone()));
                self.start(tag, attributes)?;
                self.value("Parameter", None, value)?;
                self.end(tag)
            }
            Action::Query { select, .. } => {
                self.start(tag, attributes)?;
                self.select(select)?;
                self.end(tag)
            }
        }
    }

    fn select(&mut self, select: &SelectSpec) -> Result<(), EncodingError> {
        self.start(
            "Query",
            vec![("SelectAllProperties", select.select_all.to_string())],
        )?;
        self.start("Properties", Vec::new())?;
        for property in &select.properties {
            self.empty(
                "Property",
                vec![
                    ("Name", property.clone()),
                    ("ScalarProperty", "true".to_string()),
                ],
            )?;
        }
        self.end("Properties")?;
        self.end("Query")
    }

    fn identity(&mut self, identity: &Identity) -> Result<(), EncodingError> {
        let tag = identity.kind().tag();
        let id = ("Id", identity.id().to_string());

        match identity {
            Identity::StaticProperty { type_id, name, .. } => self.empty(
                tag,
                vec![id, ("TypeId", braced(type_id)), ("Name", name.clone())],
            ),
            Identity::Property {
                parent_id, name, ..
            } => self.empty(
                tag,
                vec![id, ("ParentId", parent_id.to_string()), ("Name", name.clone())],
            ),
            Identity::Constructor {
                type_id,
                parameters,
                ..
            } => self.with_parameters(tag, vec![id, ("TypeId", braced(type_id))], parameters),
            Identity::Method {
                parent_id,
                name,
                parameters,
                ..
            } => self.with_parameters(
                tag,
                vec![id, ("ParentId", parent_id.to_string()), ("Name", name.clone())],
                parameters,
            ),
            Identity::Identity { name, .. } => self.empty(tag, vec![id, ("Name", name.clone())]),
        }
    }

    fn with_parameters(
        &mut self,
        tag: &str,
        attributes: Attributes,
        parameters: &[Parameter],
    ) -> Result<(), EncodingError> {
        if parameters.is_empty() {
            return self.empty(tag, attributes);
        }
        self.start(tag, attributes)?;
        self.start("Parameters", Vec::new())?;
        for parameter in parameters {
            self.value("Parameter", None, parameter)?;
        }
        self.end("Parameters")?;
        self.end(tag)
    }

    /// Write one value as `<Parameter>`, `<Property>` (object member) or
    /// `<Object>` (array element)
    fn value(&mut self, tag: &str, name: Option<&str>, value: &Parameter) -> Result<(), EncodingError> {
        let mut attributes: Attributes = Vec::new();
        if let Some(name) = name {
            attributes.push(("Name", name.to_string()));
        }

        match value {
            Parameter::ObjectPath(id) => {
                attributes.push(("ObjectPathId", id.to_string()));
                self.empty(tag, attributes)
            }
            Parameter::Object {
                type_id,
                properties,
            } => {
                attributes.push(("TypeId", braced(type_id)));
                self.start(tag, attributes)?;
                for (member, inner) in properties {
                    self.value("Property", Some(member), inner)?;
                }
                self.end(tag)
            }
            Parameter::Array(items) => {
                attributes.push(("Type", "Array".to_string()));
                self.start(tag, attributes)?;
                for item in items {
                    self.value("Object", None, item)?;
                }
                self.end(tag)
            }
            Parameter::Null => {
                attributes.push(("Type", "Null".to_string()));
                self.empty(tag, attributes)
            }
            scalar => {
                if let Some(type_name) = scalar.type_name() {
                    attributes.push(("Type", type_name.to_string()));
                }
                self.start(tag, attributes)?;
                if let Some(text) = scalar.scalar_text() {
                    self.text(&text, tag)?;
                }
                self.end(tag)
            }
        }
    }
}
