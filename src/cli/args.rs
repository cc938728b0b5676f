//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::cli::commands::{
    build::BuildArgs, completions::CompletionsArgs, describe::DescribeArgs, init::InitArgs,
    lint::LintArgs, list::ListArgs, new::NewArgs, schema::SchemaArgs,
};

#[derive(Parser)]
#[command(name = "blueprint")]
#[command(author, version, about = "Schema-validated configuration templates")]
#[command(long_about = "Discover blueprint templates, lint configuration documents against them with line-accurate diagnostics, and scaffold new documents.")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "auto")]
    pub format: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Template root (default: template_path from blueprint.yaml, then .blueprint/templates)
    #[arg(long, global = true)]
    pub template_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create blueprint.yaml and an example template
    Init(InitArgs),

    /// Validate configuration documents
    Lint(LintArgs),

    /// List discovered blueprints
    List(ListArgs),

    /// Show the parameters of a blueprint
    Describe(DescribeArgs),

    /// Export a blueprint's schema as JSON Schema
    Schema(SchemaArgs),

    /// Scaffold a new configuration document
    New(NewArgs),

    /// Validate documents and render their artifacts
    Build(BuildArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output
    #[default]
    Auto,
    /// JSON format (for programming)
    Json,
    /// YAML format
    Yaml,
}
