//! Structured validation diagnostics
//!
//! Every problem found in a configuration document is a [`Diagnostic`]: a
//! kind, a field path, a best-known source location, a message, and zero or
//! more suggested fixes. Nothing in validation reports failures any other way.

use serde::Serialize;
use serde_json::Value;
use std::fmt;

use crate::schema::model::{value_kind_name, FieldKind};
use crate::yaml::locate::Location;

/// What went wrong
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticKind {
    MalformedDocument,
    MissingTemplate,
    UnknownTemplate,
    MissingRequiredField,
    TypeMismatch,
    UnknownField,
}

impl DiagnosticKind {
    /// Stable kebab-case code shown in reports
    pub fn code(&self) -> &'static str {
        match self {
            DiagnosticKind::MalformedDocument => "malformed-document",
            DiagnosticKind::MissingTemplate => "missing-template",
            DiagnosticKind::UnknownTemplate => "unknown-template",
            DiagnosticKind::MissingRequiredField => "missing-required-field",
            DiagnosticKind::TypeMismatch => "type-mismatch",
            DiagnosticKind::UnknownField => "unknown-field",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => f.write_str("error"),
            Severity::Warning => f.write_str("warning"),
        }
    }
}

/// One validation failure or warning
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: Severity,
    /// Dotted path to the offending field, empty for document-level problems
    pub field_path: String,
    pub location: Option<Location>,
    pub message: String,
    pub suggestions: Vec<String>,
    /// Expected kind, for missing fields and type mismatches
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<FieldKind>,
    /// Kind of the value actually found, for type mismatches
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<String>,
}

impl Diagnostic {
    fn new(kind: DiagnosticKind, field_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: Severity::Error,
            field_path: field_path.into(),
            location: None,
            message: message.into(),
            suggestions: Vec::new(),
            expected: None,
            actual: None,
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::MalformedDocument, "", message)
    }

    pub fn missing_template() -> Self {
        Self::new(
            DiagnosticKind::MissingTemplate,
            "",
            "Missing required field 'blueprint'",
        )
        .with_suggestions(vec![
            "Add 'blueprint: <blueprint_name>' to your configuration".to_string(),
            "Use 'blueprint list' to see available blueprints".to_string(),
        ])
    }

    pub fn unknown_template(name: &str, known: &[String], suggestions: Vec<String>) -> Self {
        let message = if known.is_empty() {
            format!("Blueprint '{}' not found (no blueprints are registered)", name)
        } else {
            format!(
                "Blueprint '{}' not found (available: {})",
                name,
                known.join(", ")
            )
        };
        Self::new(DiagnosticKind::UnknownTemplate, "blueprint", message).with_suggestions(suggestions)
    }

    pub fn missing_field(path: &str, expected: &FieldKind) -> Self {
        let mut diagnostic = Self::new(
            DiagnosticKind::MissingRequiredField,
            path,
            format!("Missing required field '{}' ({})", path, expected),
        );
        diagnostic.expected = Some(expected.clone());
        diagnostic
    }

    pub fn type_mismatch(path: &str, expected: &FieldKind, found: &Value) -> Self {
        let actual = value_kind_name(found);
        let mut diagnostic = Self::new(
            DiagnosticKind::TypeMismatch,
            path,
            format!(
                "Field '{}' expected {}, found {} {}",
                path, expected, actual, found
            ),
        );
        diagnostic.expected = Some(expected.clone());
        diagnostic.actual = Some(actual.to_string());
        diagnostic
    }

    pub fn unknown_field(path: &str, suggestions: Vec<String>, strict: bool) -> Self {
        let mut diagnostic = Self::new(
            DiagnosticKind::UnknownField,
            path,
            format!("Unknown field '{}'", path),
        )
        .with_suggestions(suggestions);
        if !strict {
            diagnostic.severity = Severity::Warning;
        }
        diagnostic
    }

    pub fn at(mut self, location: Option<Location>) -> Self {
        self.location = location;
        self
    }

    pub fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
        self.suggestions = suggestions;
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]: {}", self.severity, self.kind, self.message)
    }
}
