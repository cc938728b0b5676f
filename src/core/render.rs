//! Render callbacks - turning a validated configuration into an artifact

use miette::Diagnostic;
use std::path::PathBuf;
use tera::Tera;
use thiserror::Error;

use crate::schema::extractor::ArtifactDecl;
use crate::schema::model::TEMPLATE_KEY;
use crate::schema::validator::ValidatedConfig;

/// Output of a render callback
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Path relative to the artifact output directory
    pub path: PathBuf,
    pub content: String,
}

#[derive(Debug, Error, Diagnostic)]
pub enum RenderError {
    #[error("Artifact template for '{template}' does not compile: {message}")]
    #[diagnostic(code(blueprint::render::compile))]
    Compile { template: String, message: String },

    #[error("Blueprint '{template}' has no render callback")]
    #[diagnostic(
        code(blueprint::render::missing),
        help("Add an `artifact:` section or a `render:` key to the blueprint declaration")
    )]
    Missing { template: String },

    #[error("Rendering '{template}' failed: {message}")]
    #[diagnostic(code(blueprint::render::failed))]
    Failed { template: String, message: String },
}

/// Artifact-generation callback owned by a template author
///
/// Only ever invoked with a configuration that passed validation.
pub trait Render: Send + Sync {
    fn render(&self, config: &ValidatedConfig) -> Result<Artifact, RenderError>;
}

impl<F> Render for F
where
    F: Fn(&ValidatedConfig) -> Result<Artifact, RenderError> + Send + Sync,
{
    fn render(&self, config: &ValidatedConfig) -> Result<Artifact, RenderError> {
        self(config)
    }
}

const PATH_TEMPLATE: &str = "path";
const BODY_TEMPLATE: &str = "body";

/// Built-in callback rendering tera templates declared in the template file
pub struct TemplateArtifact {
    tera: Tera,
}

impl TemplateArtifact {
    /// Compile both templates up front so broken ones fail at load time
    pub fn compile(template: &str, decl: &ArtifactDecl) -> Result<Self, RenderError> {
        let mut tera = Tera::default();
        tera.add_raw_templates(vec![
            (PATH_TEMPLATE, decl.path.as_str()),
            (BODY_TEMPLATE, decl.template.as_str()),
        ])
        .map_err(|e| RenderError::Compile {
            template: template.to_string(),
            message: error_chain(&e),
        })?;
        Ok(Self { tera })
    }
}

impl Render for TemplateArtifact {
    fn render(&self, config: &ValidatedConfig) -> Result<Artifact, RenderError> {
        let failed = |message: String| RenderError::Failed {
            template: config.template().to_string(),
            message,
        };

        let mut context = tera::Context::from_serialize(config.values())
            .map_err(|e| failed(error_chain(&e)))?;
        context.insert(TEMPLATE_KEY, config.template());

        let path = self
            .tera
            .render(PATH_TEMPLATE, &context)
            .map_err(|e| failed(error_chain(&e)))?;
        let path = path.trim();
        if path.is_empty() {
            return Err(failed("artifact path rendered empty".to_string()));
        }

        let content = self
            .tera
            .render(BODY_TEMPLATE, &context)
            .map_err(|e| failed(error_chain(&e)))?;

        Ok(Artifact {
            path: PathBuf::from(path),
            content,
        })
    }
}

/// Tera nests the useful message in its source chain
fn error_chain(err: &tera::Error) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn artifact(path: &str, template: &str) -> ArtifactDecl {
        ArtifactDecl {
            path: path.to_string(),
            template: template.to_string(),
        }
    }

    #[test]
    fn test_template_artifact_renders_values() {
        let renderer = TemplateArtifact::compile(
            "daily_etl",
            &artifact("{{ identifier }}.py", "# {{ blueprint }}\nretries = {{ retries }}\n"),
        )
        .unwrap();
        let config = ValidatedConfig::new(
            "daily_etl",
            json!({"identifier": "customer", "retries": 2}).as_object().cloned().unwrap(),
        );

        let out = renderer.render(&config).unwrap();
        assert_eq!(out.path, PathBuf::from("customer.py"));
        assert_eq!(out.content, "# daily_etl\nretries = 2\n");
    }

    #[test]
    fn test_broken_template_fails_to_compile() {
        let err = TemplateArtifact::compile("x", &artifact("out.txt", "{% if %}")).err().unwrap();
        assert!(matches!(err, RenderError::Compile { .. }));
    }

    #[test]
    fn test_closure_is_a_render_callback() {
        let callback = |config: &ValidatedConfig| -> Result<Artifact, RenderError> {
            Ok(Artifact {
                path: PathBuf::from(format!("{}.txt", config.identifier())),
                content: String::new(),
            })
        };
        let config = ValidatedConfig::new(
            "t",
            json!({"identifier": "doc"}).as_object().cloned().unwrap(),
        );
        assert_eq!(callback.render(&config).unwrap().path, PathBuf::from("doc.txt"));
    }
}
