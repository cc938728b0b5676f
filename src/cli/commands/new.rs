//! `blueprint new` command - Scaffold a configuration document

use console::style;
use dialoguer::{theme::ColorfulTheme, Select};
use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;

use crate::cli::helpers::{load_config, load_registry, print_structured};
use crate::cli::GlobalOpts;
use crate::schema::wizard::{Prompter, ScaffoldRequest, Scaffolder, TerminalPrompter};

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Blueprint to instantiate (prompted for when omitted)
    pub blueprint: Option<String>,

    /// Document name, which becomes its identifier
    #[arg(long, short = 'n')]
    pub name: Option<String>,

    /// Set a field directly (repeatable); dotted paths reach nested fields
    #[arg(long = "set", short = 's', value_name = "KEY=VALUE", value_parser = parse_key_val)]
    pub set: Vec<(String, String)>,

    /// Directory for the new document (default: output_dir from config)
    #[arg(long, short = 'o')]
    pub output_dir: Option<PathBuf>,

    /// Never prompt; missing required fields are an error
    #[arg(long)]
    pub no_interactive: bool,

    /// Overwrite an existing document
    #[arg(long)]
    pub force: bool,
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", s))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{}'", s));
    }
    Ok((key.to_string(), value.to_string()))
}

pub fn run(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let config = load_config(global);
    let shared = load_registry(&config, global);
    let registry = shared.snapshot();

    let interactive = !args.no_interactive && console::user_attended();

    let blueprint = match args.blueprint {
        Some(name) => name,
        None if interactive && !registry.is_empty() => {
            let names = registry.names();
            let selection = Select::with_theme(&ColorfulTheme::default())
                .with_prompt("Blueprint")
                .items(&names)
                .default(0)
                .interact()
                .into_diagnostic()?;
            names[selection].clone()
        }
        None => {
            return Err(miette::miette!(
                help = "Run `blueprint list` to see available blueprints",
                "No blueprint given"
            ));
        }
    };

    let request = ScaffoldRequest {
        template: blueprint,
        document_name: args.name,
        overrides: args.set,
        output_dir: args.output_dir.unwrap_or_else(|| config.output_dir()),
        force: args.force,
    };

    let mut terminal = TerminalPrompter::new();
    let prompter: Option<&mut dyn Prompter> = if interactive {
        Some(&mut terminal)
    } else {
        None
    };

    let scaffolded = Scaffolder::new(&registry).scaffold(&request, prompter)?;

    if print_structured(&scaffolded.config, global.format)? {
        return Ok(());
    }
    if !global.quiet {
        println!(
            "{} Created {} document {}",
            style("✓").green(),
            style(scaffolded.config.template()).cyan(),
            style(scaffolded.path.display()).cyan()
        );
        println!(
            "   Lint it with {}",
            style(format!("blueprint lint {}", scaffolded.path.display())).yellow()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_val() {
        assert_eq!(
            parse_key_val("retries=3").unwrap(),
            ("retries".to_string(), "3".to_string())
        );
        assert_eq!(
            parse_key_val("query=a=b").unwrap(),
            ("query".to_string(), "a=b".to_string())
        );
        assert!(parse_key_val("retries").is_err());
        assert!(parse_key_val("=3").is_err());
    }
}
