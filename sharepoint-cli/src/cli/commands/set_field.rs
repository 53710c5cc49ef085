//! `set-field` command: write one list item field through CSOM

use anyhow::{Context as _, Result, bail};
use clap::{Args, ValueEnum};
use colored::*;
use uuid::Uuid;

use crate::api::client::DEFAULT_APPLICATION_NAME;
use crate::api::csom::{ActionRef, CsomBatch, FieldValue, Parameter, TermValue, UpdateMode};
use crate::api::query::Dialect;
use crate::cli::Context;

#[derive(Debug, Args)]
pub struct SetFieldArgs {
    /// Id of the list holding the item
    #[arg(long)]
    pub list: Uuid,

    /// Item id within the list
    #[arg(long)]
    pub item: i32,

    /// Internal name of the field
    #[arg(long)]
    pub field: String,

    /// New value. Lookups take `3` or `3,5`; taxonomy takes
    /// `Label|term-guid`, several separated by `;`
    #[arg(long, default_value = "")]
    pub value: String,

    #[arg(long = "as", value_enum, default_value_t = ValueType::String)]
    pub value_type: ValueType,

    /// update, system-update or overwrite
    #[arg(long, default_value = "update")]
    pub mode: UpdateMode,

    /// Print the request envelope instead of sending it
    #[arg(long)]
    pub dry: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ValueType {
    String,
    Int,
    Bool,
    Null,
    Lookup,
    User,
    Taxonomy,
}

/// Interpret the command-line value as `value_type`
pub fn parse_value(value_type: ValueType, text: &str) -> Result<FieldValue> {
    let text = text.trim();
    let value = match value_type {
        ValueType::String => FieldValue::from(text),
        ValueType::Int => FieldValue::from(
            text.parse::<i32>()
                .with_context(|| format!("'{}' is not a 32-bit integer", text))?,
        ),
        ValueType::Bool => match text.to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => FieldValue::from(true),
            "false" | "no" | "0" => FieldValue::from(false),
            _ => bail!("'{}' is not a boolean", text),
        },
        ValueType::Null => FieldValue::Scalar(Parameter::Null),
        ValueType::Lookup => {
            let ids = parse_ids(text)?;
            if ids.len() == 1 {
                FieldValue::Lookup(ids[0])
            } else {
                FieldValue::Lookups(ids)
            }
        }
        ValueType::User => FieldValue::User(
            text.parse::<i32>()
                .with_context(|| format!("'{}' is not a user id", text))?,
        ),
        ValueType::Taxonomy => {
            let mut terms = text
                .split(';')
                .filter(|t| !t.trim().is_empty())
                .map(parse_term)
                .collect::<Result<Vec<_>>>()?;
            match terms.len() {
                0 => bail!("Taxonomy value needs at least one 'Label|term-guid' pair"),
                1 => FieldValue::Taxonomy(terms.remove(0)),
                _ => FieldValue::TaxonomyMulti(terms),
            }
        }
    };
    Ok(value)
}

fn parse_ids(text: &str) -> Result<Vec<i32>> {
    text.split(',')
        .map(|id| {
            id.trim()
                .parse::<i32>()
                .with_context(|| format!("'{}' is not a lookup id", id.trim()))
        })
        .collect()
}

fn parse_term(text: &str) -> Result<TermValue> {
    let Some((label, id)) = text.trim().rsplit_once('|') else {
        bail!("Term '{}' is not in 'Label|term-guid' form", text.trim());
    };
    let term_id = Uuid::parse_str(id.trim())
        .with_context(|| format!("'{}' is not a term id", id.trim()))?;
    Ok(TermValue::new(label.trim(), term_id))
}

/// Update the item, then read back its id and the written field
pub fn build_update_batch(
    batch: &mut CsomBatch,
    args: &SetFieldArgs,
    value: FieldValue,
) -> ActionRef {
    let web = batch.current_web();
    let list = batch.web_list_by_id(web, args.list);
    let item = batch.list_item_by_id(list, args.item);
    batch.update_list_item(list, item, vec![(args.field.clone(), value)], args.mode);
    batch.query_properties(item, &["Id", args.field.as_str()])
}

pub async fn handle_set_field_command(args: SetFieldArgs, ctx: &Context) -> Result<()> {
    let value = parse_value(args.value_type, &args.value)?;

    if args.dry {
        let mut batch = CsomBatch::new();
        build_update_batch(&mut batch, &args, value);
        let application_name = ctx
            .config
            .application_name
            .as_deref()
            .unwrap_or(DEFAULT_APPLICATION_NAME);
        println!(
            "{}",
            batch
                .to_xml(application_name)
                .context("Failed to encode request")?
        );
        return Ok(());
    }

    let client = ctx.client(Dialect::SharePointRest)?;
    let mut batch = client.batch();
    let readback = build_update_batch(&mut batch, &args, value);

    let response = client
        .execute_batch(batch)
        .await
        .with_context(|| format!("Failed to update item {} in list {}", args.item, args.list))?;

    println!(
        "{} {} on item {} ({})",
        "Updated".bright_green().bold(),
        args.field.bright_cyan(),
        args.item,
        args.mode.method_name().dimmed()
    );
    if let Some(result) = response.result(readback) {
        println!("{}", serde_json::to_string_pretty(result)?);
    }
    if let Some(trace) = response.trace_correlation_id() {
        println!("Correlation id: {}", trace.dimmed());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::csom::{NodeKind, inspect_request};
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: SetFieldArgs,
    }

    const LIST: &str = "a3b1d6f0-2f3c-4a47-9d5e-0c1b2a3d4e5f";
    const TERM: &str = "1e1a939f-60b2-4b3a-a3f5-7c5f5b8b2e11";

    fn args(argv: &[&str]) -> SetFieldArgs {
        let mut full = vec!["test", "--list", LIST, "--item", "7"];
        full.extend_from_slice(argv);
        TestCli::parse_from(full).args
    }

    #[test]
    fn test_parse_scalar_values() {
        assert_eq!(
            parse_value(ValueType::Int, "42").unwrap(),
            FieldValue::Scalar(Parameter::Int32(42))
        );
        assert_eq!(
            parse_value(ValueType::Bool, "no").unwrap(),
            FieldValue::Scalar(Parameter::Boolean(false))
        );
        assert_eq!(
            parse_value(ValueType::Null, "").unwrap(),
            FieldValue::Scalar(Parameter::Null)
        );
        assert!(parse_value(ValueType::Int, "4.2").is_err());
    }

    #[test]
    fn test_parse_lookup_values() {
        assert_eq!(parse_value(ValueType::Lookup, "3").unwrap(), FieldValue::Lookup(3));
        assert_eq!(
            parse_value(ValueType::Lookup, "3, 5").unwrap(),
            FieldValue::Lookups(vec![3, 5])
        );
        assert_eq!(parse_value(ValueType::User, "12").unwrap(), FieldValue::User(12));
        assert!(parse_value(ValueType::Lookup, "3,x").is_err());
    }

    #[test]
    fn test_parse_taxonomy_values() {
        let term_id = Uuid::parse_str(TERM).unwrap();
        let single = parse_value(ValueType::Taxonomy, &format!("Finance|{}", TERM)).unwrap();
        assert_eq!(single, FieldValue::Taxonomy(TermValue::new("Finance", term_id)));

        let multi =
            parse_value(ValueType::Taxonomy, &format!("Finance|{0};Legal|{0}", TERM)).unwrap();
        assert!(matches!(multi, FieldValue::TaxonomyMulti(ref terms) if terms.len() == 2));

        assert!(parse_value(ValueType::Taxonomy, "Finance").is_err());
        assert!(parse_value(ValueType::Taxonomy, "").is_err());
    }

    #[test]
    fn test_update_batch_sets_field_then_commits() {
        let args = args(&["--field", "Title", "--value", "Q3 report", "--mode", "system-update"]);
        assert_eq!(args.mode, UpdateMode::SystemUpdate);

        let mut batch = CsomBatch::new();
        let value = parse_value(args.value_type, &args.value).unwrap();
        let readback = build_update_batch(&mut batch, &args, value);

        let xml = batch.to_xml("tests").unwrap();
        let set_at = xml.find(r#"Name="SetFieldValue""#).unwrap();
        let commit_at = xml.find(r#"Name="SystemUpdate""#).unwrap();
        assert!(set_at < commit_at);
        assert!(xml.contains("Q3 report"));
        assert!(xml.contains(&format!("{{{}}}", LIST)));

        let summary = inspect_request(&xml).unwrap();
        let query = summary
            .nodes
            .iter()
            .find(|n| n.id == readback.id())
            .unwrap();
        assert_eq!(query.kind, NodeKind::Query);
    }
}
