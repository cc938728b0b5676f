//! Core module - registry, diagnostics and shared utilities

pub mod config;
pub mod diagnostic;
pub mod naming;
pub mod registry;
pub mod render;
pub mod suggest;

pub use config::Config;
pub use diagnostic::{Diagnostic, DiagnosticKind, Severity};
pub use registry::{Registry, RegistryBuilder, RegistryError, SharedRegistry, TemplateRecord};
pub use render::{Artifact, Render, RenderError};
