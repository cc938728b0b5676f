//! `blueprint describe` command - Show the parameters of one blueprint

use console::style;
use miette::Result;
use serde::Serialize;
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::{load_config, load_registry, print_structured, truncate_str};
use crate::cli::GlobalOpts;
use crate::core::registry::TemplateRecord;
use crate::schema::model::{FieldKind, FieldSpec};
use crate::schema::wizard::example_document;

#[derive(clap::Args, Debug)]
pub struct DescribeArgs {
    /// Blueprint name
    pub name: String,
}

#[derive(Debug, Serialize)]
struct ParameterRow {
    path: String,
    kind: String,
    required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    default: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

#[derive(Debug, Serialize)]
struct Description<'a> {
    name: &'a str,
    description: Option<&'a str>,
    origin: String,
    parameters: Vec<ParameterRow>,
    example: String,
}

pub fn run(args: DescribeArgs, global: &GlobalOpts) -> Result<()> {
    let config = load_config(global);
    let shared = load_registry(&config, global);
    let registry = shared.snapshot();
    let record = registry.resolve(&args.name)?;

    let description = Description {
        name: &record.name,
        description: record.description.as_deref(),
        origin: record.origin.to_string(),
        parameters: parameter_rows(record),
        example: example_document(record),
    };
    if print_structured(&description, global.format)? {
        return Ok(());
    }

    println!("{}", style(&record.name).bold());
    if let Some(text) = &record.description {
        println!("{}", text);
    }
    println!("{} {}", style("Declared at").dim(), record.origin);
    println!();

    let mut table = Builder::default();
    table.push_record(["PARAMETER", "KIND", "REQUIRED", "DEFAULT", "DESCRIPTION"]);
    for row in &description.parameters {
        table.push_record([
            row.path.clone(),
            row.kind.clone(),
            if row.required { "yes" } else { "no" }.to_string(),
            row.default
                .as_ref()
                .map(|v| truncate_str(&v.to_string(), 24))
                .unwrap_or_default(),
            truncate_str(row.description.as_deref().unwrap_or(""), 48),
        ]);
    }
    println!("{}", table.build().with(Style::sharp()));

    println!();
    println!("{}", style("Example document:").bold());
    println!();
    print!("{}", description.example);
    Ok(())
}

/// Every field in pre-order, nested ones as dotted paths
fn parameter_rows(record: &TemplateRecord) -> Vec<ParameterRow> {
    let mut rows = Vec::new();
    collect_rows(&record.schema.fields, "", &mut rows);
    rows
}

fn collect_rows(fields: &[FieldSpec], prefix: &str, rows: &mut Vec<ParameterRow>) {
    for field in fields {
        let path = if prefix.is_empty() {
            field.name.clone()
        } else {
            format!("{}.{}", prefix, field.name)
        };
        rows.push(ParameterRow {
            path: path.clone(),
            kind: field.kind.to_string(),
            required: field.required,
            default: field.default.clone(),
            description: field.description.clone(),
        });
        if !field.children.is_empty() {
            let prefix = match field.kind.unwrap_optional() {
                FieldKind::List(_) => format!("{}[]", path),
                _ => path,
            };
            collect_rows(&field.children, &prefix, rows);
        }
    }
}
