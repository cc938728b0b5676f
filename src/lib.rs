//! Blueprint: schema-validated configuration templates
//!
//! Template authors declare parameter types in YAML template files; users
//! write small YAML documents that instantiate a template by name. The
//! toolkit discovers templates, validates documents against the derived
//! schema with line-accurate diagnostics, and scaffolds new documents.

pub mod cli;
pub mod core;
pub mod schema;
pub mod yaml;
