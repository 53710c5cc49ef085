//! `query` command: arguments and query construction

pub mod handler;

pub use handler::handle_query_command;

use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::{Args, ValueEnum};

use crate::api::metadata::{DescriptorProvider, FieldKind};
use crate::api::query::{ComparisonOp, Dialect, FilterValue, OrderBy, Predicate, Projection, Query};

#[derive(Debug, Args)]
pub struct QueryCommands {
    /// Model to query (see `describe`)
    pub model: String,

    /// Backend dialect: sharepoint or graph
    #[arg(short, long)]
    pub dialect: Option<Dialect>,

    /// Filter condition, e.g. `Title=Docs` or `ItemCount>=10`; repeated
    /// conditions are AND-ed
    #[arg(short = 'w', long = "where", value_name = "CONDITION")]
    pub conditions: Vec<String>,

    /// Field to select; repeatable
    #[arg(short, long, value_name = "FIELD")]
    pub select: Vec<String>,

    /// Field to expand, optionally with nested fields: `Author(Title,Email)`
    #[arg(short, long, value_name = "FIELD")]
    pub expand: Vec<String>,

    /// Ordering term `Field[:asc|desc]`; repeatable, first wins ties
    #[arg(short, long, value_name = "FIELD[:DIR]")]
    pub order: Vec<String>,

    #[arg(long)]
    pub skip: Option<u32>,

    #[arg(long)]
    pub top: Option<u32>,

    /// Print the request URL instead of executing it
    #[arg(long)]
    pub dry: bool,

    #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    #[arg(long, value_enum, default_value_t = DisplayStyle::Plain)]
    pub style: DisplayStyle,

    /// Write results to a file instead of stdout
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    JsonCompact,
    Csv,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DisplayStyle {
    Plain,
    Verbose,
}

/// Operators in match order: two-character forms first
const OPERATORS: &[(&str, ComparisonOp)] = &[
    ("!=", ComparisonOp::NotEqual),
    (">=", ComparisonOp::GreaterOrEqual),
    ("<=", ComparisonOp::LessOrEqual),
    ("=", ComparisonOp::Equal),
    (">", ComparisonOp::GreaterThan),
    ("<", ComparisonOp::LessThan),
];

/// Parse `Field<op>Value` into a comparison typed by the field's kind
pub fn parse_condition(
    spec: &str,
    model: &str,
    provider: &dyn DescriptorProvider,
) -> Result<Predicate> {
    let Some((index, symbol, op)) = OPERATORS
        .iter()
        .filter_map(|(symbol, op)| spec.find(symbol).map(|i| (i, *symbol, *op)))
        .min_by_key(|(i, symbol, _)| (*i, std::cmp::Reverse(symbol.len())))
    else {
        bail!("Condition '{}' has no operator (use =, !=, >, >=, <, <=)", spec);
    };

    let field = spec[..index].trim();
    let text = spec[index + symbol.len()..].trim();
    if field.is_empty() {
        bail!("Condition '{}' has no field name", spec);
    }

    // unknown fields are left for the translator to report
    let kind = field_kind(field, model, provider).unwrap_or(FieldKind::String);
    let value = FilterValue::parse_for_kind(kind, text)
        .map_err(|e| anyhow::anyhow!("Invalid value for {}: {}", field, e))?;

    Ok(Predicate::compare(field, op, value))
}

/// Kind of a possibly dotted field path
fn field_kind(path: &str, model: &str, provider: &dyn DescriptorProvider) -> Option<FieldKind> {
    let mut current = provider.describe(model)?;
    let mut segments = path.split('.').peekable();
    while let Some(segment) = segments.next() {
        let field = current.get(segment)?;
        if segments.peek().is_none() {
            return Some(field.kind);
        }
        current = provider.describe(field.target.as_deref()?)?;
    }
    None
}

/// Parse `Field` or `Field(A,B,Nested(C))` into an expansion
pub fn parse_expansion(spec: &str) -> Result<(String, Projection)> {
    let spec = spec.trim();
    let Some(open) = spec.find('(') else {
        return Ok((spec.to_string(), Projection::new()));
    };
    if !spec.ends_with(')') {
        bail!("Unbalanced parentheses in expansion '{}'", spec);
    }

    let field = spec[..open].trim().to_string();
    let inner = &spec[open + 1..spec.len() - 1];
    let mut projection = Projection::new();
    for part in split_top_level(inner)? {
        if part.contains('(') {
            let (nested_field, nested) = parse_expansion(part)?;
            projection = projection.expand(nested_field, nested);
        } else if !part.is_empty() {
            projection = projection.select(part);
        }
    }
    Ok((field, projection))
}

/// Split on commas that are not inside parentheses
fn split_top_level(text: &str) -> Result<Vec<&str>> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| anyhow::anyhow!("Unbalanced parentheses in '{}'", text))?;
            }
            ',' if depth == 0 => {
                parts.push(text[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        bail!("Unbalanced parentheses in '{}'", text);
    }
    parts.push(text[start..].trim());
    Ok(parts)
}

impl QueryCommands {
    /// Assemble the query described by the arguments
    pub fn build_query(&self, provider: &dyn DescriptorProvider) -> Result<Query> {
        let mut query = Query::new();

        for condition in &self.conditions {
            query = query.filter(parse_condition(condition, &self.model, provider)?);
        }
        for term in &self.order {
            let term = OrderBy::parse(term).map_err(anyhow::Error::msg)?;
            query = query.order_by(term.field, term.direction);
        }
        if !self.select.is_empty() {
            query = query.select(self.select.iter().map(String::as_str));
        }
        for spec in &self.expand {
            let (field, nested) = parse_expansion(spec)?;
            query = query.expand(field, nested);
        }
        if let Some(skip) = self.skip {
            query = query.skip(skip);
        }
        if let Some(top) = self.top {
            query = query.top(top);
        }

        Ok(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::metadata::DescriptorRegistry;
    use crate::api::query::{Direction, translate};
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: QueryCommands,
    }

    fn args(argv: &[&str]) -> QueryCommands {
        let mut full = vec!["test"];
        full.extend_from_slice(argv);
        TestCli::parse_from(full).args
    }

    #[test]
    fn test_parse_condition_uses_field_kind() {
        let registry = DescriptorRegistry::builtin();
        let p = parse_condition("ItemCount>=10", "List", &registry).unwrap();
        assert_eq!(p, Predicate::ge("ItemCount", 10));

        let p = parse_condition("Hidden != false", "List", &registry).unwrap();
        assert_eq!(p, Predicate::ne("Hidden", false));

        let p = parse_condition("Author.IsSiteAdmin=true", "ListItem", &registry).unwrap();
        assert_eq!(p, Predicate::eq("Author.IsSiteAdmin", true));

        assert!(parse_condition("ItemCount=lots", "List", &registry).is_err());
        assert!(parse_condition("Title", "List", &registry).is_err());
    }

    #[test]
    fn test_unknown_field_is_left_for_translation() {
        let registry = DescriptorRegistry::builtin();
        let p = parse_condition("Colour=red", "List", &registry).unwrap();
        assert_eq!(p, Predicate::eq("Colour", "red"));
    }

    #[test]
    fn test_parse_expansion() {
        let (field, projection) = parse_expansion("Lists(Title,Items(Title,Id))").unwrap();
        assert_eq!(field, "Lists");
        let expected = Projection::new()
            .select("Title")
            .expand("Items", Projection::of(["Title", "Id"]));
        assert_eq!(projection, expected);

        assert_eq!(parse_expansion("Author").unwrap().1, Projection::new());
        assert!(parse_expansion("Author(Title").is_err());
    }

    #[test]
    fn test_build_query_from_arguments() {
        let registry = DescriptorRegistry::builtin();
        let cmd = args(&[
            "List", "--where", "Title=Docs", "--order", "Title:desc", "--skip", "10", "--top", "5",
        ]);
        let query = cmd.build_query(&registry).unwrap();
        assert_eq!(query.order()[0].direction, Direction::Descending);

        let qs = translate(&registry, Dialect::SharePointRest, "List", &query).unwrap();
        assert_eq!(
            qs.to_string(),
            "$filter=Title eq 'Docs'&$orderby=Title desc&$skip=10&$top=5"
        );
    }

    #[test]
    fn test_dialect_and_format_arguments() {
        let cmd = args(&["User", "-d", "graph", "--format", "json-compact", "--dry"]);
        assert_eq!(cmd.dialect, Some(Dialect::Graph));
        assert_eq!(cmd.format, OutputFormat::JsonCompact);
        assert!(cmd.dry);
    }
}
