//! Name derivation for templates and configuration documents
//!
//! Template declarations are identified by CamelCase identifiers such as
//! `DailyETLBlueprint`; their public names are the snake_case form with a
//! conventional suffix removed (`daily_etl`). Documents take their identifier
//! from the file name with the compound document suffix stripped.

use std::path::Path;

/// Suffixes stripped from a declaration identifier before conversion
pub const DECLARATION_SUFFIXES: &[&str] = &["Blueprint", "Template"];

/// Document suffixes, longest first so `.dag.yaml` wins over `.yaml`
pub const DOCUMENT_SUFFIXES: &[&str] = &[".dag.yaml", ".dag.yml", ".yaml", ".yml"];

/// Conventional suffix for newly written configuration documents
pub const DOCUMENT_SUFFIX: &str = ".dag.yaml";

/// Derive the public template name from a declaration identifier
///
/// `DailyETLBlueprint` -> `daily_etl`, `HTTPServerTemplate` -> `http_server`,
/// `multi-source ETL` -> `multi_source_etl`.
pub fn template_name(declaration: &str) -> String {
    let stripped = strip_declaration_suffix(declaration.trim());
    to_snake_case(stripped)
}

fn strip_declaration_suffix(identifier: &str) -> &str {
    for suffix in DECLARATION_SUFFIXES {
        if let Some(rest) = identifier.strip_suffix(suffix) {
            if !rest.is_empty() {
                return rest.trim_end_matches(['_', '-', ' ']);
            }
        }
    }
    identifier
}

/// Convert compound-word casing to lowercase words joined by `_`
pub fn to_snake_case(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_alphanumeric() {
            push_separator(&mut out);
            continue;
        }

        if c.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            // "yE" in DailyETL, or the "PS" boundary in HTTPServer
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_is_lower) {
                push_separator(&mut out);
            }
        }

        out.extend(c.to_lowercase());
    }

    out.trim_matches('_').to_string()
}

fn push_separator(out: &mut String) {
    if !out.is_empty() && !out.ends_with('_') {
        out.push('_');
    }
}

/// Derive a document identifier from its file name
///
/// `configs/customer_etl.dag.yaml` -> `customer_etl`
pub fn document_identifier(path: &Path) -> String {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    strip_document_suffix(&file_name).to_string()
}

/// Strip the conventional document suffix from a file name, if present
pub fn strip_document_suffix(file_name: &str) -> &str {
    DOCUMENT_SUFFIXES
        .iter()
        .find_map(|suffix| file_name.strip_suffix(suffix).filter(|rest| !rest.is_empty()))
        .unwrap_or(file_name)
}

/// True when the path names a configuration document by convention
pub fn is_document_file(path: &Path) -> bool {
    path.file_name()
        .map(|n| {
            let name = n.to_string_lossy();
            name.ends_with(".dag.yaml") || name.ends_with(".dag.yml")
        })
        .unwrap_or(false)
}
