//! `blueprint lint` command - Validate configuration documents

use console::style;
use miette::Result;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

use crate::cli::helpers::{load_config, load_registry, print_structured};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::diagnostic::Diagnostic;
use crate::core::naming::is_document_file;
use crate::schema::validator::{ValidationOptions, ValidationResult, Validator};

#[derive(clap::Args, Debug)]
pub struct LintArgs {
    /// Documents or directories to lint (default: every *.dag.yaml below the working directory)
    pub paths: Vec<PathBuf>,

    /// Treat unknown fields as errors
    #[arg(long)]
    pub strict: bool,

    /// Show summary only, don't show individual diagnostics
    #[arg(long)]
    pub summary: bool,
}

/// Lint statistics
#[derive(Debug, Default, Serialize)]
struct LintStats {
    files_checked: usize,
    files_passed: usize,
    files_failed: usize,
    total_errors: usize,
    total_warnings: usize,
}

#[derive(Serialize)]
struct FileReport<'a> {
    file: &'a str,
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    identifier: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    blueprint: Option<&'a str>,
    diagnostics: &'a [Diagnostic],
    #[serde(skip_serializing_if = "Vec::is_empty")]
    duplicate_of: Vec<&'a str>,
}

#[derive(Serialize)]
struct LintReport<'a> {
    files: Vec<FileReport<'a>>,
    stats: &'a LintStats,
}

pub fn run(args: LintArgs, global: &GlobalOpts) -> Result<()> {
    let config = load_config(global);
    let shared = load_registry(&config, global);
    let registry = shared.snapshot();

    let options = ValidationOptions {
        strict: args.strict || config.strict(),
    };
    let validator = Validator::new(&registry).with_options(options);

    let files = if args.paths.is_empty() {
        expand_paths(&[PathBuf::from(".")])
    } else {
        expand_paths(&args.paths)
    };

    if global.format == OutputFormat::Auto && !global.quiet {
        println!(
            "{} Linting {} file(s) against {} blueprint(s)...\n",
            style("→").blue(),
            files.len(),
            registry.len()
        );
    }

    let results: Vec<ValidationResult> = files
        .par_iter()
        .map(|path| validator.validate_file(path))
        .collect();
    debug!("Validated {} document(s)", results.len());

    let duplicates = duplicate_identifiers(&results);

    let mut stats = LintStats::default();
    for (index, result) in results.iter().enumerate() {
        let errors = result.error_count() + usize::from(duplicates.contains_key(&index));
        stats.files_checked += 1;
        stats.total_errors += errors;
        stats.total_warnings += result.warnings().count();
        if errors == 0 {
            stats.files_passed += 1;
        } else {
            stats.files_failed += 1;
        }
    }

    let report = LintReport {
        files: results
            .iter()
            .enumerate()
            .map(|(index, result)| FileReport {
                file: &result.file_name,
                valid: result.is_valid() && !duplicates.contains_key(&index),
                identifier: result.config.as_ref().map(|c| c.identifier()),
                blueprint: result.config.as_ref().map(|c| c.template()),
                diagnostics: &result.diagnostics,
                duplicate_of: duplicates.get(&index).cloned().unwrap_or_default(),
            })
            .collect(),
        stats: &stats,
    };
    if print_structured(&report, global.format)? {
        return finish(&stats);
    }

    for (index, result) in results.iter().enumerate() {
        let duplicate_of = duplicates.get(&index);
        if result.is_valid() && duplicate_of.is_none() {
            if !args.summary && !global.quiet {
                let warnings = result.warnings().count();
                if warnings == 0 {
                    println!("{} {}", style("✓").green(), result.file_name);
                } else {
                    println!(
                        "{} {} ({} warning(s))",
                        style("✓").green(),
                        result.file_name,
                        warnings
                    );
                }
            }
        } else if !args.summary {
            println!("{} {}", style("✗").red(), result.file_name);
        }

        if !args.summary && !result.diagnostics.is_empty() {
            println!("{}", result.report());
        }

        if let Some(others) = duplicate_of {
            if !args.summary {
                let identifier = result.config.as_ref().map(|c| c.identifier()).unwrap_or_default();
                println!(
                    "error[duplicate-identifier] {}: identifier '{}' is also used by {}\n",
                    result.file_name,
                    identifier,
                    others.join(", ")
                );
            }
        }
    }

    if !global.quiet {
        print_summary(&stats);
    }
    finish(&stats)
}

fn print_summary(stats: &LintStats) {
    println!();
    println!("{}", style("─".repeat(60)).dim());
    println!("{}", style("Lint Summary").bold());
    println!("{}", style("─".repeat(60)).dim());
    println!("  Files checked:  {}", style(stats.files_checked).cyan());
    println!("  Files passed:   {}", style(stats.files_passed).green());
    println!("  Files failed:   {}", style(stats.files_failed).red());
    println!("  Total errors:   {}", style(stats.total_errors).red());
    if stats.total_warnings > 0 {
        println!("  Total warnings: {}", style(stats.total_warnings).yellow());
    }
    println!();
}

fn finish(stats: &LintStats) -> Result<()> {
    match stats.files_failed {
        0 => Ok(()),
        1 => Err(miette::miette!("Lint failed: 1 file has errors")),
        n => Err(miette::miette!("Lint failed: {} files have errors", n)),
    }
}

/// Result index -> other files sharing its identifier, for valid documents only
fn duplicate_identifiers(results: &[ValidationResult]) -> BTreeMap<usize, Vec<&str>> {
    let mut by_identifier: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (index, result) in results.iter().enumerate() {
        if let Some(config) = &result.config {
            by_identifier.entry(config.identifier()).or_default().push(index);
        }
    }

    let mut duplicates = BTreeMap::new();
    for indices in by_identifier.values().filter(|indices| indices.len() > 1) {
        for &index in indices {
            let others = indices
                .iter()
                .filter(|&&other| other != index)
                .map(|&other| results[other].file_name.as_str())
                .collect();
            duplicates.insert(index, others);
        }
    }
    duplicates
}

/// Expand directories to the documents below them; explicit files are kept as given
fn expand_paths(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for path in paths {
        if path.is_dir() {
            for entry in WalkDir::new(path)
                .into_iter()
                .filter_entry(|e| e.depth() == 0 || !is_hidden(e.path()))
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
            {
                if is_document_file(entry.path()) {
                    files.push(entry.path().to_path_buf());
                }
            }
        } else {
            // Missing files are reported by the validator
            files.push(path.clone());
        }
    }

    files.sort();
    files.dedup();
    files
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .map(|n| n.to_string_lossy().starts_with('.'))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_expand_paths_finds_documents() {
        let temp = tempdir().unwrap();
        let nested = temp.path().join("team");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::create_dir_all(temp.path().join(".hidden")).unwrap();
        std::fs::write(temp.path().join("a.dag.yaml"), "").unwrap();
        std::fs::write(nested.join("b.dag.yml"), "").unwrap();
        std::fs::write(temp.path().join("notes.yaml"), "").unwrap();
        std::fs::write(temp.path().join(".hidden/c.dag.yaml"), "").unwrap();

        let files = expand_paths(&[temp.path().to_path_buf()]);
        assert_eq!(
            files,
            vec![temp.path().join("a.dag.yaml"), nested.join("b.dag.yml")]
        );
    }

    #[test]
    fn test_explicit_file_is_kept() {
        let files = expand_paths(&[PathBuf::from("missing.yaml")]);
        assert_eq!(files, vec![PathBuf::from("missing.yaml")]);
    }
}
