//! Read a request envelope back into node summaries

use roxmltree::{Document, Node};

use super::nodes::{NodeKind, NodeSummary};
use crate::api::error::{Error, Result};

/// Parsed view of a request envelope
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSummary {
    pub application_name: Option<String>,
    /// Actions in document order, then object paths in document order
    pub nodes: Vec<NodeSummary>,
}

/// Parse an envelope and list `(id, reference, kind)` for every node
pub fn inspect_request(xml: &str) -> Result<RequestSummary> {
    let doc = Document::parse(xml).map_err(|e| Error::parse(format!("invalid request XML: {}", e)))?;
    let root = doc.root_element();
    if !root.has_tag_name("Request") {
        return Err(Error::parse(format!(
            "expected <Request>, found <{}>",
            root.tag_name().name()
        )));
    }

    let mut nodes = Vec::new();
    if let Some(actions) = child(root, "Actions") {
        for node in actions.children().filter(Node::is_element) {
            let kind = NodeKind::action_from_tag(node.tag_name().name())
                .ok_or_else(|| unknown_element(node))?;
            nodes.push(NodeSummary {
                id: required_id(node, "Id")?,
                reference: Some(required_id(node, "ObjectPathId")?),
                kind,
            });
        }
    }
    if let Some(paths) = child(root, "ObjectPaths") {
        for node in paths.children().filter(Node::is_element) {
            let kind = NodeKind::path_from_tag(node.tag_name().name())
                .ok_or_else(|| unknown_element(node))?;
            let reference = match node.attribute("ParentId") {
                Some(_) => Some(required_id(node, "ParentId")?),
                None => None,
            };
            nodes.push(NodeSummary {
                id: required_id(node, "Id")?,
                reference,
                kind,
            });
        }
    }

    log::debug!("Inspected request envelope with {} nodes", nodes.len());
    Ok(RequestSummary {
        application_name: root.attribute("ApplicationName").map(str::to_string),
        nodes,
    })
}

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|n| n.has_tag_name(name))
}

fn required_id(node: Node, attribute: &str) -> Result<u32> {
    let text = node.attribute(attribute).ok_or_else(|| {
        Error::parse(format!(
            "<{}> is missing the {} attribute",
            node.tag_name().name(),
            attribute
        ))
    })?;
    text.parse().map_err(|_| {
        Error::parse(format!(
            "<{}> has a non-numeric {} '{}'",
            node.tag_name().name(),
            attribute,
            text
        ))
    })
}

fn unknown_element(node: Node) -> Error {
    Error::parse(format!("unknown element <{}>", node.tag_name().name()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::csom::{CsomBatch, FieldValue, TermValue, UpdateMode};
    use uuid::uuid;

    #[test]
    fn test_round_trip_recovers_node_tuples() {
        let list_id = uuid!("1e1a939f-60b2-2000-98a6-d25d3d400a3a");
        let mut batch = CsomBatch::new();
        let web = batch.current_web();
        let list = batch.web_list_by_id(web, list_id);
        let item = batch.list_item_by_id(list, 9);
        batch.update_list_item(
            list,
            item,
            vec![
                ("Title".into(), "Renamed".into()),
                ("Tags".into(), FieldValue::TaxonomyMulti(vec![TermValue::new("A", list_id)])),
            ],
            UpdateMode::SystemUpdate,
        );
        batch.identity_query(item);

        let xml = batch.to_xml("round-trip").unwrap();
        let summary = inspect_request(&xml).unwrap();

        assert_eq!(summary.application_name.as_deref(), Some("round-trip"));
        assert_eq!(summary.nodes, batch.summaries());
    }

    #[test]
    fn test_rejects_foreign_documents() {
        assert!(inspect_request("<Envelope/>").is_err());
        assert!(inspect_request("not xml").is_err());
        assert!(inspect_request(r#"<Request><Actions><Bogus Id="1" ObjectPathId="2"/></Actions></Request>"#).is_err());
        assert!(inspect_request(r#"<Request><Actions><ObjectPath Id="x" ObjectPathId="2"/></Actions></Request>"#).is_err());
    }
}
