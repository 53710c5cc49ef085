//! `describe` command: print a model's descriptor table

use anyhow::{Result, bail};
use clap::Args;
use colored::*;

use crate::api::metadata::{DescriptorProvider, ModelDescriptor};
use crate::api::query::Dialect;
use crate::cli::Context;

#[derive(Debug, Args)]
pub struct DescribeArgs {
    /// Model name; omit to list every known model
    pub model: Option<String>,
}

pub fn handle_describe_command(args: DescribeArgs, ctx: &Context) -> Result<()> {
    let Some(name) = args.model else {
        println!("{}", "Models:".bold());
        for name in ctx.registry.model_names() {
            println!("  {}", name.bright_cyan());
        }
        return Ok(());
    };

    match ctx.registry.describe(&name) {
        Some(model) => {
            print!("{}", render_model(model));
            Ok(())
        }
        None => {
            let available: Vec<&str> = ctx.registry.model_names().collect();
            bail!(
                "Unknown model '{}'. Available models: {}",
                name,
                available.join(", ")
            )
        }
    }
}

fn render_model(model: &ModelDescriptor) -> String {
    let mut out = format!("{}\n", model.name.bright_cyan().bold());

    for dialect in [Dialect::SharePointRest, Dialect::Graph] {
        let line = match model.collection(dialect) {
            Some(info) if info.supports_skip => info.path.clone(),
            Some(info) => format!("{} {}", info.path, "(no $skip)".dimmed()),
            None => "-".dimmed().to_string(),
        };
        out.push_str(&format!("  {:<16} {}\n", format!("{}:", dialect), line));
    }
    out.push('\n');

    let width = model.fields.iter().map(|f| f.name.len()).max().unwrap_or(0);
    for field in &model.fields {
        let mut line = format!(
            "  {:<width$}  {:<10}  {:<20}  {:<20}",
            field.name,
            field.kind.to_string(),
            field.sharepoint_name.as_deref().unwrap_or("-"),
            field.graph_name.as_deref().unwrap_or("-"),
            width = width
        );
        if field.key {
            line.push_str(&format!("  {}", "key".yellow()));
        }
        if let Some(target) = field.target.as_deref().filter(|_| field.expandable) {
            line.push_str(&format!("  {} {}", "expands ->".dimmed(), target.green()));
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}
