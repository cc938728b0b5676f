//! Template registry - discovery, naming, and lookup of templates
//!
//! A [`Registry`] is built once by a discovery pass and never mutated
//! afterwards. Rebuilding produces a fresh registry which [`SharedRegistry`]
//! swaps in atomically; callers holding an older snapshot keep using it.

use indexmap::IndexMap;
use miette::Diagnostic;
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::core::naming;
use crate::core::render::{Artifact, Render, RenderError, TemplateArtifact};
use crate::core::suggest::{did_you_mean, suggest};
use crate::schema::extractor::{extract_root, ExtractError, TemplateDecl, TemplateFile, TypeSet};
use crate::schema::model::Schema;
use crate::schema::validator::ValidatedConfig;
use crate::yaml::diagnostics::YamlSyntaxError;
use crate::yaml::locate::KeyLocations;

/// Prefix marking template files that discovery skips
pub const EXCLUDED_PREFIX: char = '_';

/// Render callbacks available to templates, by key
pub type Renderers = HashMap<String, Arc<dyn Render>>;

/// Where a template was declared
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Origin {
    pub path: PathBuf,
    /// 1-based line of the declaration, when known
    pub line: Option<usize>,
    pub declaration: String,
}

impl Origin {
    pub fn new(path: impl Into<PathBuf>, line: Option<usize>, declaration: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            line,
            declaration: declaration.into(),
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{} ({})", self.path.display(), line, self.declaration),
            None => write!(f, "{} ({})", self.path.display(), self.declaration),
        }
    }
}

/// One indexed template
#[derive(Clone)]
pub struct TemplateRecord {
    pub name: String,
    pub declaration: String,
    pub description: Option<String>,
    pub schema: Schema,
    /// Field path -> default value, inherited defaults already merged
    pub defaults: IndexMap<String, Value>,
    pub origin: Origin,
    render: Option<Arc<dyn Render>>,
}

impl TemplateRecord {
    pub fn required_fields(&self) -> Vec<&str> {
        self.schema.required_fields()
    }

    pub fn has_renderer(&self) -> bool {
        self.render.is_some()
    }

    /// Invoke the template's render callback
    pub fn render(&self, config: &ValidatedConfig) -> Result<Artifact, RenderError> {
        if config.template() != self.name {
            return Err(RenderError::Failed {
                template: self.name.clone(),
                message: format!("configuration was validated against '{}'", config.template()),
            });
        }
        match &self.render {
            Some(callback) => callback.render(config),
            None => Err(RenderError::Missing {
                template: self.name.clone(),
            }),
        }
    }

    pub fn summary(&self) -> TemplateSummary {
        TemplateSummary {
            name: self.name.clone(),
            description: self.description.clone(),
            declaration: self.declaration.clone(),
            origin: self.origin.to_string(),
            required: self
                .required_fields()
                .into_iter()
                .map(String::from)
                .collect(),
            fields: self.schema.fields.len(),
            renders: self.has_renderer(),
        }
    }
}

impl fmt::Debug for TemplateRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateRecord")
            .field("name", &self.name)
            .field("declaration", &self.declaration)
            .field("description", &self.description)
            .field("schema", &self.schema)
            .field("defaults", &self.defaults)
            .field("origin", &self.origin)
            .field("render", &self.render.as_ref().map(|_| "<callback>"))
            .finish()
    }
}

/// Listing entry for a template
#[derive(Debug, Clone, Serialize)]
pub struct TemplateSummary {
    pub name: String,
    pub description: Option<String>,
    pub declaration: String,
    pub origin: String,
    pub required: Vec<String>,
    pub fields: usize,
    pub renders: bool,
}

/// Problems found while loading templates; none of them stop discovery
#[derive(Debug, Error, Diagnostic)]
pub enum RegistryWarning {
    #[error("Template directory {} does not exist", path.display())]
    #[diagnostic(
        code(blueprint::registry::missing_root),
        help("Set template_path in blueprint.yaml, BLUEPRINT_TEMPLATE_PATH, or pass --template-dir")
    )]
    MissingRoot { path: PathBuf },

    #[error("Cannot read {}: {source}", path.display())]
    #[diagnostic(code(blueprint::registry::unreadable))]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed template file {}", path.display())]
    #[diagnostic(code(blueprint::registry::malformed))]
    Malformed {
        path: PathBuf,
        #[source]
        #[diagnostic_source]
        source: YamlSyntaxError,
    },

    #[error("Blueprint '{template}' at {origin} could not be loaded")]
    #[diagnostic(code(blueprint::registry::extract))]
    Extract {
        template: String,
        origin: Origin,
        #[source]
        #[diagnostic_source]
        source: ExtractError,
    },

    #[error("Blueprint '{template}' at {origin} has an unusable render callback")]
    #[diagnostic(code(blueprint::registry::render))]
    Render {
        template: String,
        origin: Origin,
        #[source]
        #[diagnostic_source]
        source: RenderError,
    },

    #[error("Blueprint '{template}' at {origin} uses render callback '{key}', which is not registered")]
    #[diagnostic(code(blueprint::registry::unbound_render))]
    UnboundRender {
        template: String,
        key: String,
        origin: Origin,
    },

    #[error("Blueprint name '{name}' declared at {replaced} is overridden by {winner}")]
    #[diagnostic(
        code(blueprint::registry::name_collision),
        help("Give one of the declarations an explicit `name:`")
    )]
    NameCollision {
        name: String,
        replaced: Origin,
        winner: Origin,
    },
}

#[derive(Debug, Error, Diagnostic)]
pub enum RegistryError {
    #[error("Blueprint '{name}' not found")]
    #[diagnostic(code(blueprint::registry::unknown_template))]
    UnknownTemplate {
        name: String,
        known: Vec<String>,
        suggestions: Vec<String>,
        #[help]
        help: Option<String>,
    },
}

/// Outcome of one discovery pass
#[derive(Debug, Default)]
pub struct Discovery {
    /// Distinct template names added by this pass; replacements are not counted
    pub loaded: usize,
    pub warnings: Vec<RegistryWarning>,
}

/// Immutable index of templates in discovery order
#[derive(Debug, Default)]
pub struct Registry {
    templates: IndexMap<String, TemplateRecord>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Discover every template under `root` with no programmatic callbacks
    pub fn discover(root: &Path) -> (Self, Discovery) {
        let mut builder = RegistryBuilder::new();
        let discovery = builder.discover(root);
        (builder.build(), discovery)
    }

    pub fn get(&self, name: &str) -> Option<&TemplateRecord> {
        self.templates.get(name)
    }

    /// Look up a template by exact (case-sensitive) name
    pub fn resolve(&self, name: &str) -> Result<&TemplateRecord, RegistryError> {
        self.templates.get(name).ok_or_else(|| {
            let known = self.names();
            let suggestions = suggest(name, known.iter().map(String::as_str));
            let help = did_you_mean(&suggestions).or_else(|| {
                if known.is_empty() {
                    Some("No blueprints are registered; run 'blueprint init' to create one".to_string())
                } else {
                    Some(format!("Available blueprints: {}", known.join(", ")))
                }
            });
            RegistryError::UnknownTemplate {
                name: name.to_string(),
                known,
                suggestions,
                help,
            }
        })
    }

    pub fn names(&self) -> Vec<String> {
        self.templates.keys().cloned().collect()
    }

    pub fn list(&self) -> Vec<TemplateSummary> {
        self.templates.values().map(TemplateRecord::summary).collect()
    }

    pub fn records(&self) -> impl Iterator<Item = &TemplateRecord> {
        self.templates.values()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

/// Collects templates into a new [`Registry`]
#[derive(Default)]
pub struct RegistryBuilder {
    templates: IndexMap<String, TemplateRecord>,
    renderers: Renderers,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a render callback available under `key`
    pub fn renderer(mut self, key: impl Into<String>, callback: impl Render + 'static) -> Self {
        self.renderers.insert(key.into(), Arc::new(callback));
        self
    }

    pub fn with_renderers(mut self, renderers: Renderers) -> Self {
        self.renderers.extend(renderers);
        self
    }

    /// Extract and index one declaration
    ///
    /// A failure leaves the builder untouched. On success, a name collision
    /// with an earlier template is returned as a warning; the new template
    /// wins and takes over the earlier one's position.
    pub fn register(
        &mut self,
        declaration: &str,
        decl: &TemplateDecl,
        types: &TypeSet,
        origin: Origin,
    ) -> Result<Option<RegistryWarning>, RegistryWarning> {
        let name = decl
            .name
            .clone()
            .unwrap_or_else(|| naming::template_name(declaration));

        let schema = extract_root(&decl.config, types).map_err(|source| RegistryWarning::Extract {
            template: name.clone(),
            origin: origin.clone(),
            source,
        })?;

        let render: Option<Arc<dyn Render>> = match (&decl.render, &decl.artifact) {
            (Some(key), _) => match self.renderers.get(key) {
                Some(callback) => Some(Arc::clone(callback)),
                None => {
                    return Err(RegistryWarning::UnboundRender {
                        template: name,
                        key: key.clone(),
                        origin,
                    })
                }
            },
            (None, Some(artifact)) => {
                let compiled = TemplateArtifact::compile(&name, artifact).map_err(|source| {
                    RegistryWarning::Render {
                        template: name.clone(),
                        origin: origin.clone(),
                        source,
                    }
                })?;
                Some(Arc::new(compiled) as Arc<dyn Render>)
            }
            (None, None) => None,
        };

        let description = decl
            .description
            .clone()
            .or_else(|| types.get(&decl.config).and_then(|t| t.description.clone()));

        let record = TemplateRecord {
            name: name.clone(),
            declaration: declaration.to_string(),
            description,
            defaults: schema.defaults(),
            schema,
            origin: origin.clone(),
            render,
        };

        let collision = self.templates.get(&name).map(|previous| RegistryWarning::NameCollision {
            name: name.clone(),
            replaced: previous.origin.clone(),
            winner: origin,
        });
        if let Some(warning) = &collision {
            warn!("{}", warning);
        }

        debug!(template = %name, fields = record.schema.fields.len(), "registered blueprint");
        self.templates.insert(name, record);
        Ok(collision)
    }

    /// Load every template file under `root`
    ///
    /// Files are visited in name order at each directory level. A file that
    /// cannot be read or parsed is reported and skipped; within a file, each
    /// declaration succeeds or fails on its own.
    pub fn discover(&mut self, root: &Path) -> Discovery {
        let mut discovery = Discovery::default();

        if !root.is_dir() {
            warn!("Template directory does not exist: {}", root.display());
            discovery.warnings.push(RegistryWarning::MissingRoot {
                path: root.to_path_buf(),
            });
            return discovery;
        }

        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().unwrap_or(root).to_path_buf();
                    warn!("Cannot walk {}: {}", path.display(), e);
                    discovery.warnings.push(RegistryWarning::Unreadable {
                        path,
                        source: e.into(),
                    });
                    continue;
                }
            };
            if entry.file_type().is_file() && is_template_file(entry.path()) {
                self.load_file(entry.path(), &mut discovery);
            }
        }

        info!(
            root = %root.display(),
            loaded = discovery.loaded,
            warnings = discovery.warnings.len(),
            "template discovery finished"
        );
        discovery
    }

    fn load_file(&mut self, path: &Path, discovery: &mut Discovery) {
        debug!("Loading template file {}", path.display());

        let source = match fs::read_to_string(path) {
            Ok(source) => source,
            Err(e) => {
                warn!("Failed to read template file {}: {}", path.display(), e);
                discovery.warnings.push(RegistryWarning::Unreadable {
                    path: path.to_path_buf(),
                    source: e,
                });
                return;
            }
        };

        let file = match TemplateFile::from_yaml(&source, &path.display().to_string()) {
            Ok(file) => file,
            Err(e) => {
                warn!("Skipping malformed template file {}: {}", path.display(), e.message());
                discovery.warnings.push(RegistryWarning::Malformed {
                    path: path.to_path_buf(),
                    source: e,
                });
                return;
            }
        };

        let locations = KeyLocations::index(&source);
        for (declaration, decl) in &file.blueprints {
            let line = locations
                .get(&format!("blueprints.{}", declaration))
                .map(|loc| loc.line);
            let origin = Origin::new(path, line, declaration.as_str());

            match self.register(declaration, decl, &file.types, origin) {
                Ok(Some(collision)) => discovery.warnings.push(collision),
                Ok(None) => discovery.loaded += 1,
                Err(warning) => {
                    warn!("{}", warning);
                    discovery.warnings.push(warning);
                }
            }
        }
    }

    pub fn build(self) -> Registry {
        Registry {
            templates: self.templates,
        }
    }
}

/// Template definition files: YAML, not prefixed with the exclusion marker
fn is_template_file(path: &Path) -> bool {
    let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    if file_name.starts_with(EXCLUDED_PREFIX) {
        return false;
    }
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}

/// Process-wide handle to the current registry snapshot
pub struct SharedRegistry {
    current: RwLock<Arc<Registry>>,
    renderers: Renderers,
}

impl SharedRegistry {
    pub fn new(registry: Registry) -> Self {
        Self {
            current: RwLock::new(Arc::new(registry)),
            renderers: Renderers::new(),
        }
    }

    /// Callbacks re-bound on every rebuild
    pub fn with_renderers(mut self, renderers: Renderers) -> Self {
        self.renderers = renderers;
        self
    }

    /// The registry as of now; stays valid across later rebuilds
    pub fn snapshot(&self) -> Arc<Registry> {
        Arc::clone(&self.current.read())
    }

    pub fn replace(&self, registry: Registry) {
        *self.current.write() = Arc::new(registry);
    }

    /// Discover `root` from scratch and swap the result in
    pub fn rebuild(&self, root: &Path) -> Discovery {
        let mut builder = RegistryBuilder::new().with_renderers(self.renderers.clone());
        let discovery = builder.discover(root);
        self.replace(builder.build());
        discovery
    }
}

impl fmt::Debug for SharedRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedRegistry")
            .field("templates", &self.current.read().names())
            .field("renderers", &self.renderers.keys().collect::<Vec<_>>())
            .finish()
    }
}
