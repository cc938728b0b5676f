//! `blueprint build` command - Render artifacts from valid documents

use console::style;
use miette::{IntoDiagnostic, Result};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};

use crate::cli::helpers::{load_config, load_registry};
use crate::cli::GlobalOpts;
use crate::core::render::Artifact;
use crate::schema::validator::{ValidationOptions, Validator};

#[derive(clap::Args, Debug)]
pub struct BuildArgs {
    /// Documents to build
    #[arg(required = true)]
    pub documents: Vec<PathBuf>,

    /// Directory for rendered artifacts (default: artifact_dir from config)
    #[arg(long, short = 'o')]
    pub output_dir: Option<PathBuf>,
}

pub fn run(args: BuildArgs, global: &GlobalOpts) -> Result<()> {
    let config = load_config(global);
    let shared = load_registry(&config, global);
    let registry = shared.snapshot();
    let validator = Validator::new(&registry).with_options(ValidationOptions {
        strict: config.strict(),
    });
    let output_dir = args.output_dir.unwrap_or_else(|| config.artifact_dir());

    let mut failed = 0usize;
    for document in &args.documents {
        let result = validator.validate_file(document);
        let Some(validated) = &result.config else {
            failed += 1;
            println!("{} {}", style("✗").red(), result.file_name);
            println!("{}", result.report());
            continue;
        };
        if !result.diagnostics.is_empty() && !global.quiet {
            println!("{}", result.report());
        }

        // Valid configs always name a registered blueprint
        let Some(record) = registry.get(validated.template()) else {
            failed += 1;
            continue;
        };
        let artifact = match record.render(validated) {
            Ok(artifact) => artifact,
            Err(e) => {
                failed += 1;
                eprintln!("{} {}: {:?}", style("✗").red(), result.file_name, miette::Report::new(e));
                continue;
            }
        };

        let target = match artifact_target(&output_dir, &artifact)
            .and_then(|target| write_artifact(&target, &artifact).map(|()| target))
        {
            Ok(target) => target,
            Err(e) => {
                failed += 1;
                eprintln!("{} {}: {:?}", style("✗").red(), result.file_name, e);
                continue;
            }
        };
        if !global.quiet {
            println!(
                "{} {} -> {}",
                style("✓").green(),
                result.file_name,
                style(target.display()).cyan()
            );
        }
    }

    match failed {
        0 => Ok(()),
        1 => Err(miette::miette!("Build failed: 1 document could not be built")),
        n => Err(miette::miette!("Build failed: {} documents could not be built", n)),
    }
}

/// Artifact paths stay inside the output directory
fn artifact_target(output_dir: &Path, artifact: &Artifact) -> Result<PathBuf> {
    let escapes = artifact
        .path
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        return Err(miette::miette!(
            "Artifact path {} must be relative and stay inside the output directory",
            artifact.path.display()
        ));
    }
    Ok(output_dir.join(&artifact.path))
}

fn write_artifact(target: &Path, artifact: &Artifact) -> Result<()> {
    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).into_diagnostic()?;
    }
    debug!("Writing {} bytes", artifact.content.len());
    std::fs::write(target, &artifact.content).into_diagnostic()?;
    info!("Rendered {}", target.display());
    Ok(())
}
