//! `$select` / `$expand` rendering for resolved projections
//!
//! Graph nests the child projection inside the expand clause:
//! `$expand=a($select=b;$expand=c($select=d))`.
//! SharePoint REST flattens it into path-prefixed select entries:
//! `$select=a/b,a/c/d&$expand=a,a/c`.

/// A projection entry whose field name is already translated to the wire name
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ResolvedSelection {
    pub wire: String,
    /// `Some` when the field is expanded; empty means all default child fields
    pub expand: Option<Vec<ResolvedSelection>>,
}

/// Rendered projection clauses, empty vectors mean "omit the clause"
#[derive(Debug, Default, PartialEq)]
pub(crate) struct ProjectionClauses {
    pub select: Vec<String>,
    pub expand: Vec<String>,
}

pub(crate) trait ExpansionStrategy: Sync {
    fn render(&self, selections: &[ResolvedSelection]) -> ProjectionClauses;
}

pub(crate) struct GraphExpansion;
pub(crate) struct SharePointExpansion;

pub(crate) static GRAPH_EXPANSION: GraphExpansion = GraphExpansion;
pub(crate) static SHAREPOINT_EXPANSION: SharePointExpansion = SharePointExpansion;

impl GraphExpansion {
    /// Build the expand string for a single node
    fn build_node_string(wire: &str, children: &[ResolvedSelection]) -> String {
        let mut parts = Vec::new();
        let clauses = GraphExpansion.render(children);

        if !clauses.select.is_empty() {
            parts.push(format!("$select={}", clauses.select.join(",")));
        }
        if !clauses.expand.is_empty() {
            parts.push(format!("$expand={}", clauses.expand.join(",")));
        }

        if parts.is_empty() {
            wire.to_string()
        } else {
            format!("{}({})", wire, parts.join(";"))
        }
    }
}

impl ExpansionStrategy for GraphExpansion {
    fn render(&self, selections: &[ResolvedSelection]) -> ProjectionClauses {
        let mut clauses = ProjectionClauses::default();
        for selection in selections {
            match &selection.expand {
                None => clauses.select.push(selection.wire.clone()),
                Some(children) => clauses
                    .expand
                    .push(Self::build_node_string(&selection.wire, children)),
            }
        }
        clauses
    }
}

impl SharePointExpansion {
    fn walk(prefix: &str, selections: &[ResolvedSelection], clauses: &mut ProjectionClauses) {
        for selection in selections {
            let path = format!("{}{}", prefix, selection.wire);
            match &selection.expand {
                None => clauses.select.push(path),
                Some(children) => {
                    clauses.expand.push(path.clone());
                    if children.is_empty() {
                        clauses.select.push(path);
                    } else {
                        Self::walk(&format!("{}/", path), children, clauses);
                    }
                }
            }
        }
    }
}

impl ExpansionStrategy for SharePointExpansion {
    fn render(&self, selections: &[ResolvedSelection]) -> ProjectionClauses {
        let mut clauses = ProjectionClauses::default();
        Self::walk("", selections, &mut clauses);
        clauses
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(wire: &str) -> ResolvedSelection {
        ResolvedSelection {
            wire: wire.to_string(),
            expand: None,
        }
    }

    fn expanded(wire: &str, children: Vec<ResolvedSelection>) -> ResolvedSelection {
        ResolvedSelection {
            wire: wire.to_string(),
            expand: Some(children),
        }
    }

    #[test]
    fn test_plain_fields_only_select() {
        let sel = vec![field("Title"), field("Id")];
        for strategy in [&GRAPH_EXPANSION as &dyn ExpansionStrategy, &SHAREPOINT_EXPANSION] {
            let clauses = strategy.render(&sel);
            assert_eq!(clauses.select, vec!["Title", "Id"]);
            assert!(clauses.expand.is_empty());
        }
    }

    #[test]
    fn test_graph_single_expand() {
        let sel = vec![
            field("displayName"),
            expanded("lists", vec![field("displayName"), field("id")]),
        ];
        let clauses = GRAPH_EXPANSION.render(&sel);
        assert_eq!(clauses.select, vec!["displayName"]);
        assert_eq!(clauses.expand, vec!["lists($select=displayName,id)"]);
    }

    #[test]
    fn test_graph_nested_expand() {
        let sel = vec![expanded(
            "children",
            vec![field("name"), expanded("children", vec![field("size")])],
        )];
        let clauses = GRAPH_EXPANSION.render(&sel);
        assert!(clauses.select.is_empty());
        assert_eq!(
            clauses.expand,
            vec!["children($select=name;$expand=children($select=size))"]
        );
    }

    #[test]
    fn test_graph_expand_without_projection() {
        let clauses = GRAPH_EXPANSION.render(&[expanded("lists", vec![])]);
        assert_eq!(clauses.expand, vec!["lists"]);
    }

    #[test]
    fn test_sharepoint_prefixes_child_selects() {
        let sel = vec![
            field("Title"),
            expanded("Author", vec![field("Title"), field("Email")]),
        ];
        let clauses = SHAREPOINT_EXPANSION.render(&sel);
        assert_eq!(clauses.select, vec!["Title", "Author/Title", "Author/Email"]);
        assert_eq!(clauses.expand, vec!["Author"]);
    }

    #[test]
    fn test_sharepoint_nested_expand() {
        let sel = vec![expanded(
            "Lists",
            vec![field("Title"), expanded("Items", vec![field("Id")])],
        )];
        let clauses = SHAREPOINT_EXPANSION.render(&sel);
        assert_eq!(clauses.select, vec!["Lists/Title", "Lists/Items/Id"]);
        assert_eq!(clauses.expand, vec!["Lists", "Lists/Items"]);
    }

    #[test]
    fn test_sharepoint_expand_without_projection_selects_navigation() {
        let clauses = SHAREPOINT_EXPANSION.render(&[field("Title"), expanded("Author", vec![])]);
        assert_eq!(clauses.select, vec!["Title", "Author"]);
        assert_eq!(clauses.expand, vec!["Author"]);
    }
}
