//! OData query-string translation
//!
//! Walks a `Query` against a model's descriptor table and renders the
//! `$filter`, `$orderby`, `$select`, `$expand`, `$skip` and `$top` clauses in
//! that fixed order. Translation is pure: the same query, model and dialect
//! always render to the same bytes.

use std::fmt;

use super::Dialect;
use super::expand::ResolvedSelection;
use super::filters::Predicate;
use super::projection::Projection;
use super::query::Query;
use crate::api::error::TranslationError;
use crate::api::metadata::{DescriptorProvider, ModelDescriptor};

/// Rendered clauses in emission order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryString {
    clauses: Vec<(&'static str, String)>,
}

impl QueryString {
    fn push(&mut self, name: &'static str, value: String) {
        self.clauses.push((name, value));
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn clauses(&self) -> &[(&'static str, String)] {
        &self.clauses
    }

    /// Value of one clause, e.g. `get("$filter")`
    pub fn get(&self, name: &str) -> Option<&str> {
        self.clauses
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    /// `?$filter=...&...`, or an empty string when there are no clauses
    pub fn to_suffix(&self) -> String {
        if self.is_empty() {
            String::new()
        } else {
            format!("?{}", self)
        }
    }

    /// Suffix with clause values percent-encoded for use in a URL
    pub fn to_encoded_suffix(&self) -> String {
        if self.is_empty() {
            return String::new();
        }
        let encoded: Vec<String> = self
            .clauses
            .iter()
            .map(|(name, value)| format!("{}={}", name, urlencoding::encode(value)))
            .collect();
        format!("?{}", encoded.join("&"))
    }
}

impl fmt::Display for QueryString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in self.clauses.iter().enumerate() {
            if i > 0 {
                f.write_str("&")?;
            }
            write!(f, "{}={}", name, value)?;
        }
        Ok(())
    }
}

/// Translator bound to one dialect and one descriptor source
pub struct Translator<'a> {
    provider: &'a dyn DescriptorProvider,
    dialect: Dialect,
}

impl<'a> Translator<'a> {
    pub fn new(provider: &'a dyn DescriptorProvider, dialect: Dialect) -> Self {
        Self { provider, dialect }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Render `query` against `model`
    pub fn translate(&self, model: &str, query: &Query) -> Result<QueryString, TranslationError> {
        let descriptor = self.model(model)?;
        let collection = descriptor.collection(self.dialect).ok_or_else(|| {
            TranslationError::ModelNotInDialect {
                model: model.to_string(),
                dialect: self.dialect,
            }
        })?;

        let mut out = QueryString::default();

        if let Some(predicate) = query.predicate() {
            let mut filter = String::new();
            self.render_predicate(descriptor, predicate, &mut filter)?;
            out.push("$filter", filter);
        }

        if !query.order().is_empty() {
            let terms = query
                .order()
                .iter()
                .map(|term| {
                    let wire = self.resolve_path(descriptor, &term.field)?;
                    Ok(format!("{} {}", wire, term.direction.as_odata()))
                })
                .collect::<Result<Vec<_>, TranslationError>>()?;
            out.push("$orderby", terms.join(","));
        }

        if !query.projection().is_empty() {
            let resolved = self.resolve_projection(descriptor, query.projection())?;
            let clauses = self.dialect.rules().expansion.render(&resolved);
            if !clauses.select.is_empty() {
                out.push("$select", clauses.select.join(","));
            }
            if !clauses.expand.is_empty() {
                out.push("$expand", clauses.expand.join(","));
            }
        }

        let page = query.page();
        if let Some(skip) = page.skip {
            if !collection.supports_skip {
                return Err(TranslationError::UnsupportedClause {
                    clause: "$skip",
                    model: model.to_string(),
                    dialect: self.dialect,
                });
            }
            out.push("$skip", skip.to_string());
        }
        if let Some(top) = page.top {
            out.push("$top", top.to_string());
        }

        log::debug!("Translated {} query on {}: {}", self.dialect, model, out);
        Ok(out)
    }

    fn model(&self, name: &str) -> Result<&'a ModelDescriptor, TranslationError> {
        self.provider
            .describe(name)
            .ok_or_else(|| TranslationError::UnknownModel {
                model: name.to_string(),
            })
    }

    /// Map a dotted model path (`Author.Title`) to a wire path (`Author/Title`)
    fn resolve_path(&self, model: &ModelDescriptor, path: &str) -> Result<String, TranslationError> {
        let mut current = model;
        let mut wire_segments = Vec::new();
        let segments: Vec<&str> = path.split('.').collect();

        for (i, segment) in segments.iter().enumerate() {
            let field = current
                .get(segment)
                .ok_or_else(|| TranslationError::UnknownField {
                    field: path.to_string(),
                    model: current.name.clone(),
                })?;

            let wire = field.wire_name(self.dialect).ok_or_else(|| {
                TranslationError::FieldNotInDialect {
                    field: field.name.clone(),
                    model: current.name.clone(),
                    dialect: self.dialect,
                }
            })?;
            wire_segments.push(wire);

            if i + 1 < segments.len() {
                current = self.expansion_target(current, segment)?;
            }
        }

        Ok(wire_segments.join("/"))
    }

    /// Descriptor of the model reached by expanding `field` on `model`
    fn expansion_target(
        &self,
        model: &ModelDescriptor,
        field: &str,
    ) -> Result<&'a ModelDescriptor, TranslationError> {
        let descriptor = model
            .get(field)
            .ok_or_else(|| TranslationError::UnknownField {
                field: field.to_string(),
                model: model.name.clone(),
            })?;

        match (&descriptor.target, descriptor.expandable) {
            (Some(target), true) => self.model(target),
            _ => Err(TranslationError::NotExpandable {
                field: field.to_string(),
                model: model.name.clone(),
            }),
        }
    }

    fn render_predicate(
        &self,
        model: &ModelDescriptor,
        predicate: &Predicate,
        out: &mut String,
    ) -> Result<(), TranslationError> {
        match predicate {
            Predicate::Comparison { field, op, value } => {
                let wire = self.resolve_path(model, field)?;
                let literal = self.dialect.rules().literals.render(value).map_err(|reason| {
                    TranslationError::UnrenderableLiteral {
                        field: field.clone(),
                        reason,
                    }
                })?;
                out.push_str(&format!("{} {} {}", wire, op.as_odata(), literal));
            }
            Predicate::And(left, right) => self.render_binary(model, left, "and", right, out)?,
            Predicate::Or(left, right) => self.render_binary(model, left, "or", right, out)?,
            Predicate::Not(inner) => {
                out.push_str("not (");
                self.render_predicate(model, inner, out)?;
                out.push(')');
            }
        }
        Ok(())
    }

    /// Both operands are always parenthesized, whatever their depth
    fn render_binary(
        &self,
        model: &ModelDescriptor,
        left: &Predicate,
        keyword: &str,
        right: &Predicate,
        out: &mut String,
    ) -> Result<(), TranslationError> {
        out.push('(');
        self.render_predicate(model, left, out)?;
        out.push_str(") ");
        out.push_str(keyword);
        out.push_str(" (");
        self.render_predicate(model, right, out)?;
        out.push(')');
        Ok(())
    }

    fn resolve_projection(
        &self,
        model: &ModelDescriptor,
        projection: &Projection,
    ) -> Result<Vec<ResolvedSelection>, TranslationError> {
        projection
            .selections()
            .iter()
            .map(|selection| {
                let wire = self.resolve_path(model, &selection.field)?;
                let expand = match &selection.nested {
                    None => None,
                    Some(nested) => {
                        let target = self.expansion_target(model, &selection.field)?;
                        Some(self.resolve_projection(target, nested)?)
                    }
                };
                Ok(ResolvedSelection { wire, expand })
            })
            .collect()
    }
}

/// Translate `query` on `model` for `dialect`
pub fn translate(
    provider: &dyn DescriptorProvider,
    dialect: Dialect,
    model: &str,
    query: &Query,
) -> Result<QueryString, TranslationError> {
    Translator::new(provider, dialect).translate(model, query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::metadata::DescriptorRegistry;
    use crate::api::query::{Direction, FilterValue};
    use uuid::Uuid;

    fn sp(model: &str, query: &Query) -> Result<QueryString, TranslationError> {
        translate(&DescriptorRegistry::builtin(), Dialect::SharePointRest, model, query)
    }

    fn graph(model: &str, query: &Query) -> Result<QueryString, TranslationError> {
        translate(&DescriptorRegistry::builtin(), Dialect::Graph, model, query)
    }

    #[test]
    fn test_simple_equality_filter() {
        let q = Query::new().filter(Predicate::eq("Title", "Test"));
        assert_eq!(sp("List", &q).unwrap().to_string(), "$filter=Title eq 'Test'");
    }

    #[test]
    fn test_order_and_paging() {
        let q = Query::new()
            .order_by("Title", Direction::Descending)
            .skip(10)
            .top(5);
        assert_eq!(
            sp("List", &q).unwrap().to_string(),
            "$orderby=Title desc&$skip=10&$top=5"
        );
    }

    #[test]
    fn test_empty_query_renders_nothing() {
        let qs = sp("List", &Query::new()).unwrap();
        assert!(qs.is_empty());
        assert_eq!(qs.to_suffix(), "");
        assert_eq!(qs.to_encoded_suffix(), "");
    }

    #[test]
    fn test_unknown_field_fails_in_both_dialects() {
        let q = Query::new().filter(Predicate::eq("Colour", "red"));
        for result in [sp("List", &q), graph("List", &q)] {
            let err = result.unwrap_err();
            assert_eq!(
                err,
                TranslationError::UnknownField {
                    field: "Colour".into(),
                    model: "List".into()
                }
            );
            assert!(err.to_string().contains("Colour"));
        }
    }

    #[test]
    fn test_field_without_wire_name_in_dialect() {
        let q = Query::new().filter(Predicate::eq("ItemCount", 0));
        assert!(sp("List", &q).is_ok());
        assert!(matches!(
            graph("List", &q),
            Err(TranslationError::FieldNotInDialect { .. })
        ));
    }

    #[test]
    fn test_wire_names_are_translated() {
        let q = Query::new()
            .filter(Predicate::eq("Title", "Docs"))
            .order_by("Created", Direction::Ascending);
        let qs = graph("List", &q).unwrap();
        assert_eq!(qs.get("$filter"), Some("displayName eq 'Docs'"));
        assert_eq!(qs.get("$orderby"), Some("createdDateTime asc"));
    }

    #[test]
    fn test_parenthesization_preserves_nesting() {
        let a = Predicate::eq("Title", "a");
        let b = Predicate::eq("Hidden", false);
        let c = Predicate::gt("ItemCount", 10);

        let left_nested = a.clone().and(b.clone()).or(c.clone());
        let right_nested = a.clone().and(b.clone().or(c.clone()));
        let negated = !(a.clone().or(b.clone()));

        let render = |p: Predicate| {
            sp("List", &Query::new().filter(p))
                .unwrap()
                .get("$filter")
                .unwrap()
                .to_string()
        };

        assert_eq!(
            render(left_nested),
            "((Title eq 'a') and (Hidden eq false)) or (ItemCount gt 10)"
        );
        assert_eq!(
            render(right_nested),
            "(Title eq 'a') and ((Hidden eq false) or (ItemCount gt 10))"
        );
        assert_eq!(
            render(negated),
            "not ((Title eq 'a') or (Hidden eq false))"
        );
    }

    #[test]
    fn test_translation_is_deterministic() {
        let q = Query::new()
            .filter(Predicate::ge("Created", "2024-01-01T00:00:00Z").or(!Predicate::eq("Hidden", true)))
            .select(["Title", "Id"])
            .expand("Items", Projection::of(["Title", "Id"]))
            .order_by("Title", Direction::Descending)
            .top(20);
        let first = sp("List", &q).unwrap().to_string();
        let second = sp("List", &q).unwrap().to_string();
        assert_eq!(first, second);
    }

    #[test]
    fn test_guid_literal_per_dialect() {
        let id = Uuid::parse_str("1e1a939f-60b2-2000-98a6-d25d3d400a3a").unwrap();
        let q = Query::new().filter(Predicate::eq("Id", id));
        assert_eq!(
            sp("List", &q).unwrap().get("$filter"),
            Some("Id eq guid'1e1a939f-60b2-2000-98a6-d25d3d400a3a'")
        );
        assert_eq!(
            graph("List", &q).unwrap().get("$filter"),
            Some("id eq 1e1a939f-60b2-2000-98a6-d25d3d400a3a")
        );
    }

    #[test]
    fn test_navigation_path_in_filter() {
        let q = Query::new().filter(Predicate::eq("Author.Email", "megan@contoso.com"));
        assert_eq!(
            sp("ListItem", &q).unwrap().get("$filter"),
            Some("Author/Email eq 'megan@contoso.com'")
        );

        let q = Query::new().filter(Predicate::eq("Title.Length", 3));
        assert!(matches!(
            sp("ListItem", &q),
            Err(TranslationError::NotExpandable { .. })
        ));
    }

    #[test]
    fn test_expansion_differs_by_dialect() {
        let q = Query::new()
            .select(["Title"])
            .expand("Lists", Projection::of(["Title", "Id"]));

        let sp_qs = sp("Web", &q).unwrap();
        assert_eq!(sp_qs.get("$select"), Some("Title,Lists/Title,Lists/Id"));
        assert_eq!(sp_qs.get("$expand"), Some("Lists"));

        let graph_qs = graph("Web", &q).unwrap();
        assert_eq!(graph_qs.get("$select"), Some("displayName"));
        assert_eq!(graph_qs.get("$expand"), Some("lists($select=displayName,id)"));
    }

    #[test]
    fn test_expanding_plain_field_fails() {
        let q = Query::new().expand("Title", Projection::new());
        assert_eq!(
            sp("List", &q).unwrap_err(),
            TranslationError::NotExpandable {
                field: "Title".into(),
                model: "List".into()
            }
        );
    }

    #[test]
    fn test_nested_projection_resolves_against_target_model() {
        let q = Query::new().expand("Lists", Projection::of(["ItemCount"]));
        let err = graph("Web", &q).unwrap_err();
        assert_eq!(
            err,
            TranslationError::FieldNotInDialect {
                field: "ItemCount".into(),
                model: "List".into(),
                dialect: Dialect::Graph
            }
        );
    }

    #[test]
    fn test_skip_rejected_where_unsupported() {
        let q = Query::new().skip(10).top(5);
        let err = sp("ListItem", &q).unwrap_err();
        assert!(matches!(
            err,
            TranslationError::UnsupportedClause { clause: "$skip", .. }
        ));
        // top alone is fine
        assert_eq!(
            sp("ListItem", &Query::new().top(5)).unwrap().to_string(),
            "$top=5"
        );
    }

    #[test]
    fn test_model_not_in_dialect() {
        let err = sp("DriveItem", &Query::new()).unwrap_err();
        assert!(matches!(err, TranslationError::ModelNotInDialect { .. }));
        assert!(matches!(
            sp("Nope", &Query::new()),
            Err(TranslationError::UnknownModel { .. })
        ));
    }

    #[test]
    fn test_unrenderable_literal() {
        let q = Query::new().filter(Predicate::eq("ItemCount", FilterValue::Float(f64::INFINITY)));
        let err = sp("List", &q).unwrap_err();
        assert!(matches!(err, TranslationError::UnrenderableLiteral { ref field, .. } if field == "ItemCount"));
    }

    #[test]
    fn test_clause_order_and_encoding() {
        let q = Query::new()
            .top(3)
            .select(["Title"])
            .order_by("Title", Direction::Ascending)
            .filter(Predicate::eq("Title", "A & B"));
        let qs = sp("List", &q).unwrap();
        let names: Vec<_> = qs.clauses().iter().map(|(n, _)| *n).collect();
        assert_eq!(names, vec!["$filter", "$orderby", "$select", "$top"]);
        assert_eq!(
            qs.to_encoded_suffix(),
            "?$filter=Title%20eq%20%27A%20%26%20B%27&$orderby=Title%20asc&$select=Title&$top=3"
        );
    }
}
