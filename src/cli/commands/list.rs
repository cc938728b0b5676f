//! `blueprint list` command - Show discovered blueprints

use console::style;
use miette::Result;
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::{load_config, load_registry, print_structured, truncate_str};
use crate::cli::GlobalOpts;

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Show the full origin of each blueprint instead of a shortened one
    #[arg(long)]
    pub long: bool,
}

pub fn run(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let config = load_config(global);
    let shared = load_registry(&config, global);
    let registry = shared.snapshot();

    if print_structured(&registry.list(), global.format)? {
        return Ok(());
    }

    if registry.is_empty() {
        println!(
            "No blueprints found under {}",
            style(config.template_path().display()).cyan()
        );
        return Ok(());
    }

    let mut table = Builder::default();
    table.push_record(["NAME", "DESCRIPTION", "DECLARATION", "ORIGIN"]);
    for summary in registry.list() {
        let description = summary.description.unwrap_or_default();
        let (description, origin) = if args.long {
            (description, summary.origin)
        } else {
            (truncate_str(&description, 40), truncate_str(&summary.origin, 50))
        };
        table.push_record([summary.name, description, summary.declaration, origin]);
    }
    println!("{}", table.build().with(Style::sharp()));

    if !global.quiet {
        println!("\n{} blueprint(s) found", style(registry.len()).cyan());
    }
    Ok(())
}
