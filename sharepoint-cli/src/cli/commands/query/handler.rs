//! Query command handler

use anyhow::{Context as _, Result};
use colored::*;
use serde_json::Value;
use std::fs;
use std::time::Instant;

use super::{DisplayStyle, OutputFormat, QueryCommands};
use crate::cli::Context;

pub async fn handle_query_command(args: QueryCommands, ctx: &Context) -> Result<()> {
    let verbose = matches!(args.style, DisplayStyle::Verbose);
    let dialect = args.dialect.unwrap_or_else(|| ctx.config.dialect());

    if verbose {
        println!(
            "Querying {} via {}",
            args.model.bright_cyan().bold(),
            dialect.to_string().bright_green()
        );
    }

    let start_build = Instant::now();
    let query = args
        .build_query(ctx.registry.as_ref())
        .context("Invalid query arguments")?;

    let client = ctx.client(dialect)?;
    let deferred = client
        .query::<Value>(&args.model, dialect)
        .apply(query);
    let url = deferred.url().context("Failed to translate query")?;
    let build_duration = start_build.elapsed();

    if verbose {
        println!("Request URL: {}", url.dimmed());
        println!("Translate time: {:.2}ms", build_duration.as_secs_f64() * 1000.0);
        println!();
    }

    if args.dry {
        println!("{}", url);
        return Ok(());
    }

    let start_exec = Instant::now();
    if verbose {
        println!("Executing query...");
    }

    let items = deferred.to_list().await.context("Failed to execute query")?;
    let exec_duration = start_exec.elapsed();

    if verbose {
        println!(
            "Execution time: {:.2}ms",
            exec_duration.as_secs_f64() * 1000.0
        );
        println!(
            "Total time: {:.2}ms",
            (build_duration + exec_duration).as_secs_f64() * 1000.0
        );
        println!("Results: {}", items.len().to_string().bright_green());
        println!();
    }

    let formatted_output = format_output(&items, args.format)?;

    if let Some(output_path) = args.output {
        fs::write(&output_path, &formatted_output)
            .with_context(|| format!("Failed to write output to: {}", output_path.display()))?;
        if verbose {
            println!(
                "Results saved to: {}",
                output_path.display().to_string().bright_green()
            );
        }
    } else {
        println!("{}", formatted_output);
    }

    Ok(())
}

/// Format query results according to the specified output format
fn format_output(items: &[Value], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(items).context("Failed to format JSON output")
        }
        OutputFormat::JsonCompact => {
            serde_json::to_string(items).context("Failed to format JSON output")
        }
        OutputFormat::Csv => items_to_csv(items),
    }
}

/// One row per item; columns are the union of keys in first-seen order
fn items_to_csv(items: &[Value]) -> Result<String> {
    let mut headers: Vec<&str> = Vec::new();
    for item in items {
        if let Value::Object(obj) = item {
            for key in obj.keys() {
                if !headers.contains(&key.as_str()) {
                    headers.push(key);
                }
            }
        }
    }
    if headers.is_empty() {
        headers.push("value");
    }

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&headers)?;
    for item in items {
        let row: Vec<String> = match item {
            Value::Object(obj) => headers
                .iter()
                .map(|h| obj.get(*h).map(cell_text).unwrap_or_default())
                .collect(),
            other => vec![cell_text(other)],
        };
        writer.write_record(&row)?;
    }

    let bytes = writer.into_inner().context("Failed to flush CSV output")?;
    String::from_utf8(bytes).context("CSV output is not valid UTF-8")
}

/// Cell text; nested values are written as compact JSON
fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_formats() {
        let items = vec![json!({"Title": "Docs"})];
        assert_eq!(
            format_output(&items, OutputFormat::JsonCompact).unwrap(),
            r#"[{"Title":"Docs"}]"#
        );
        assert!(format_output(&items, OutputFormat::Json).unwrap().contains('\n'));
    }

    #[test]
    fn test_csv_unions_columns_and_quotes() {
        let items = vec![
            json!({"Title": "Docs, shared", "ItemCount": 3}),
            json!({"Title": "Tasks", "Hidden": true, "Author": {"Title": "Ann"}}),
        ];
        let csv = format_output(&items, OutputFormat::Csv).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "ItemCount,Title,Author,Hidden");
        assert_eq!(lines[1], "3,\"Docs, shared\",,");
        assert_eq!(lines[2], r#",Tasks,"{""Title"":""Ann""}",true"#);
    }

    #[test]
    fn test_csv_of_scalars() {
        let csv = format_output(&[json!(1), json!("two")], OutputFormat::Csv).unwrap();
        assert_eq!(csv, "value\n1\ntwo\n");
    }
}
