//! Schema system - extraction, validation and scaffolding

pub mod extractor;
pub mod model;
pub mod validator;
pub mod wizard;

pub use extractor::{extract_root, ExtractError, FieldDecl, TemplateDecl, TemplateFile, TypeDecl};
pub use model::{FieldKind, FieldSpec, Schema};
pub use validator::{ValidatedConfig, ValidationOptions, ValidationResult, Validator};
pub use wizard::{ScaffoldError, ScaffoldRequest, Scaffolded, Scaffolder, TerminalPrompter};
