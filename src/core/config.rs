//! Configuration management with layered hierarchy

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Project configuration file, looked up in the working directory
pub const PROJECT_CONFIG_FILE: &str = "blueprint.yaml";

/// Environment variable overriding the template discovery root
pub const TEMPLATE_PATH_ENV: &str = "BLUEPRINT_TEMPLATE_PATH";

const DEFAULT_TEMPLATE_PATH: &str = ".blueprint/templates";
const DEFAULT_OUTPUT_DIR: &str = "configs";
const DEFAULT_ARTIFACT_DIR: &str = "build";

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("Cannot read config file {}: {source}", path.display())]
    #[diagnostic(code(blueprint::config::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {}: {source}", path.display())]
    #[diagnostic(
        code(blueprint::config::parse),
        help("Known keys: template_path, output_dir, artifact_dir, strict")
    )]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yml::Error,
    },
}

/// Blueprint configuration with layered hierarchy
///
/// Layers, lowest priority first: built-in defaults, the global user file,
/// the project `blueprint.yaml`, then `BLUEPRINT_TEMPLATE_PATH`. Command-line
/// flags are applied on top by the CLI.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Root directory searched for template definition files
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_path: Option<PathBuf>,

    /// Where scaffolded documents are written
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,

    /// Where rendered artifacts are written
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_dir: Option<PathBuf>,

    /// Treat unknown document fields as errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strict: Option<bool>,
}

impl Config {
    /// Load configuration from all sources for the current directory
    pub fn load() -> Self {
        let project_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::load_layers(
            Self::global_config_path().as_deref(),
            &project_dir,
            std::env::var(TEMPLATE_PATH_ENV).ok(),
        )
    }

    /// Merge every layer; unreadable files are logged and skipped
    pub fn load_layers(global: Option<&Path>, project_dir: &Path, env_template_path: Option<String>) -> Self {
        let mut config = Config::default();

        // 1. Global user config
        if let Some(global_path) = global {
            config.merge_file(global_path, None);
        }

        // 2. Project config; relative paths are relative to the project
        config.merge_file(&project_dir.join(PROJECT_CONFIG_FILE), Some(project_dir));

        // 3. Environment
        if let Some(path) = env_template_path.filter(|p| !p.trim().is_empty()) {
            debug!("{} overrides template path: {}", TEMPLATE_PATH_ENV, path);
            config.template_path = Some(PathBuf::from(path));
        }

        config
    }

    fn merge_file(&mut self, path: &Path, base_dir: Option<&Path>) {
        if !path.exists() {
            return;
        }
        match Self::load_file(path) {
            Ok(mut layer) => {
                if let Some(base) = base_dir {
                    layer.resolve_relative_to(base);
                }
                debug!("Loaded config layer {}", path.display());
                self.merge(layer);
            }
            Err(e) => warn!("Ignoring config file: {}", e),
        }
    }

    /// Parse one config file
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Get the path to the global config file
    fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "blueprint")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Merge another config into this one (other takes precedence)
    pub fn merge(&mut self, other: Config) {
        if other.template_path.is_some() {
            self.template_path = other.template_path;
        }
        if other.output_dir.is_some() {
            self.output_dir = other.output_dir;
        }
        if other.artifact_dir.is_some() {
            self.artifact_dir = other.artifact_dir;
        }
        if other.strict.is_some() {
            self.strict = other.strict;
        }
    }

    fn resolve_relative_to(&mut self, base: &Path) {
        for path in [&mut self.template_path, &mut self.output_dir, &mut self.artifact_dir]
            .into_iter()
            .flatten()
        {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }

    pub fn template_path(&self) -> PathBuf {
        self.template_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_TEMPLATE_PATH))
    }

    pub fn output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR))
    }

    pub fn artifact_dir(&self) -> PathBuf {
        self.artifact_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ARTIFACT_DIR))
    }

    pub fn strict(&self) -> bool {
        self.strict.unwrap_or(false)
    }
}
