//! `blueprint init` command - Set up a blueprint project

use console::style;
use miette::{IntoDiagnostic, Result};
use rust_embed::Embed;
use std::path::{Path, PathBuf};

use crate::core::config::PROJECT_CONFIG_FILE;

#[derive(Embed)]
#[folder = "templates/"]
struct StarterFiles;

/// Embedded starter file -> destination relative to the project root
const STARTERS: &[(&str, &str)] = &[
    ("blueprint.yaml", PROJECT_CONFIG_FILE),
    ("example_etl.yaml", ".blueprint/templates/example_etl.yaml"),
    ("customer_etl.dag.yaml", "configs/customer_etl.dag.yaml"),
];

#[derive(clap::Args, Debug)]
pub struct InitArgs {
    /// Directory to initialize (default: current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Overwrite existing starter files
    #[arg(long)]
    pub force: bool,
}

pub fn run(args: InitArgs) -> Result<()> {
    let root = if args.path.as_os_str() == "." {
        std::env::current_dir().into_diagnostic()?
    } else {
        args.path.clone()
    };

    if root.join(PROJECT_CONFIG_FILE).exists() && !args.force {
        println!(
            "{} Blueprint project already exists at {}",
            style("!").yellow(),
            style(root.display()).cyan()
        );
        println!();
        println!("Use {} to reinitialize", style("blueprint init --force").yellow());
        return Ok(());
    }

    let written = write_starters(&root, args.force)?;

    println!(
        "{} Initialized blueprint project at {}",
        style("✓").green(),
        style(root.display()).cyan()
    );
    println!();
    println!("Created:");
    for path in &written {
        println!("  {}", style(path).dim());
    }
    println!();
    println!("Next steps:");
    println!("  {} See the example blueprint", style("blueprint list").yellow());
    println!(
        "  {} Validate the example document",
        style("blueprint lint configs").yellow()
    );
    println!(
        "  {} Scaffold a document of your own",
        style("blueprint new daily_etl").yellow()
    );
    Ok(())
}

/// Write every starter file, returning the destinations written
fn write_starters(root: &Path, force: bool) -> Result<Vec<&'static str>> {
    let mut written = Vec::new();
    for (embedded, destination) in STARTERS {
        let target = root.join(destination);
        if target.exists() && !force {
            continue;
        }
        let file = StarterFiles::get(embedded)
            .ok_or_else(|| miette::miette!("Starter file {} is not embedded", embedded))?;
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).into_diagnostic()?;
        }
        std::fs::write(&target, &file.data[..]).into_diagnostic()?;
        written.push(*destination);
    }
    Ok(written)
}
