//! Shared helper functions for CLI commands

use console::style;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use tracing::debug;

use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::config::Config;
use crate::core::registry::{Discovery, Registry, SharedRegistry};

/// Load the layered config, with command-line flags on top
pub fn load_config(global: &GlobalOpts) -> Config {
    let mut config = Config::load();
    if let Some(dir) = &global.template_dir {
        config.template_path = Some(dir.clone());
    }
    config
}

/// Discover templates under the configured root
///
/// Discovery warnings go to stderr unless `--quiet`; they never abort.
pub fn load_registry(config: &Config, global: &GlobalOpts) -> SharedRegistry {
    let root = config.template_path();
    debug!("Discovering templates under {}", root.display());
    let (registry, discovery) = Registry::discover(&root);
    if !global.quiet {
        print_warnings(&discovery);
    }
    SharedRegistry::new(registry)
}

pub fn print_warnings(discovery: &Discovery) {
    for warning in &discovery.warnings {
        eprintln!("{} {}", style("!").yellow(), warning);
        if let Some(source) = std::error::Error::source(warning) {
            eprintln!("    {}", style(source).dim());
        }
    }
}

/// Print a serializable value in a machine-readable format
///
/// Returns `false` for [`OutputFormat::Auto`], leaving human output to the caller.
pub fn print_structured<T: Serialize>(value: &T, format: OutputFormat) -> Result<bool> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(value).into_diagnostic()?);
            Ok(true)
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(value).into_diagnostic()?);
            Ok(true)
        }
        OutputFormat::Auto => Ok(false),
    }
}

/// Truncate a string to max_len characters, adding "..." if truncated
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_str() {
        assert_eq!(truncate_str("hello", 10), "hello");
        assert_eq!(truncate_str("hello world", 8), "hello...");
        assert_eq!(truncate_str("hi", 2), "hi");
    }

    #[test]
    fn test_truncate_str_multibyte() {
        assert_eq!(truncate_str("héllo wörld", 8), "héllo...");
    }
}
