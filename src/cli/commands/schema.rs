//! `blueprint schema` command - Export a blueprint as JSON Schema
//!
//! The exported document lets editors with YAML language servers validate
//! and complete configuration documents as they are typed.

use console::style;
use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;

use crate::cli::helpers::{load_config, load_registry};
use crate::cli::GlobalOpts;

#[derive(clap::Args, Debug)]
pub struct SchemaArgs {
    /// Blueprint name
    pub name: String,

    /// Write the schema to a file instead of stdout
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

pub fn run(args: SchemaArgs, global: &GlobalOpts) -> Result<()> {
    let config = load_config(global);
    let shared = load_registry(&config, global);
    let registry = shared.snapshot();
    let record = registry.resolve(&args.name)?;

    let title = format!("{} Configuration", record.declaration);
    let schema = record.schema.to_json_schema(&record.name, &title);
    let json = serde_json::to_string_pretty(&schema).into_diagnostic()?;

    match &args.output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).into_diagnostic()?;
            }
            std::fs::write(path, format!("{}\n", json)).into_diagnostic()?;
            if !global.quiet {
                println!(
                    "{} Wrote schema for {} to {}",
                    style("✓").green(),
                    style(&record.name).cyan(),
                    style(path.display()).cyan()
                );
            }
        }
        None => println!("{}", json),
    }
    Ok(())
}
