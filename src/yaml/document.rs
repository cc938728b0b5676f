//! Configuration documents - parsing user-authored YAML with key locations

use serde_json::{Map, Value};
use std::path::Path;

use crate::core::diagnostic::Diagnostic;
use crate::core::naming;
use crate::schema::model::TEMPLATE_KEY;
use crate::yaml::diagnostics::generate_help;
use crate::yaml::locate::{KeyLocations, Location};

/// A parsed configuration document
#[derive(Debug, Clone)]
pub struct Document {
    /// File name used in reports (not necessarily a full path)
    pub file_name: String,
    pub source: String,
    /// Template name from the `blueprint` key, if present
    pub declared_template: Option<String>,
    /// Every key except `blueprint`, in document order
    pub raw_fields: Map<String, Value>,
    /// Identifier derived from the file name
    pub derived_identifier: String,
    pub locations: KeyLocations,
}

impl Document {
    /// Parse document text
    ///
    /// Syntax errors, empty documents, and non-mapping roots are all
    /// `malformed-document`; nothing else is checked here.
    pub fn parse(source: &str, file_name: &str) -> Result<Self, Diagnostic> {
        if source.trim().is_empty() {
            return Err(empty_document());
        }

        let yaml: serde_yml::Value = serde_yml::from_str(source).map_err(|e| {
            let location = e.location().map(|loc| Location::new(loc.line(), loc.column()));
            let message = e.to_string();
            let mut suggestions: Vec<String> = generate_help(&message).into_iter().collect();
            suggestions.push("Check YAML syntax (proper indentation, quotes, etc.)".to_string());
            Diagnostic::malformed(format!("YAML parse error: {}", message))
                .at(location)
                .with_suggestions(suggestions)
        })?;

        if yaml.is_null() {
            return Err(empty_document());
        }

        let value = serde_json::to_value(&yaml)
            .map_err(|e| Diagnostic::malformed(format!("Unsupported YAML content: {}", e)))?;

        let Value::Object(mut raw_fields) = value else {
            return Err(Diagnostic::malformed(format!(
                "Expected a mapping of fields at the top level, found {}",
                crate::schema::model::value_kind_name(&value)
            ))
            .at(Some(Location::new(1, 1))));
        };

        let locations = KeyLocations::index(source);

        let declared_template = match raw_fields.shift_remove(TEMPLATE_KEY) {
            None | Some(Value::Null) => None,
            Some(Value::String(name)) => Some(name),
            Some(other) => {
                return Err(Diagnostic::malformed(format!(
                    "'{}' must be a template name, found {}",
                    TEMPLATE_KEY, other
                ))
                .at(locations.get(TEMPLATE_KEY)));
            }
        };

        Ok(Self {
            file_name: file_name.to_string(),
            source: source.to_string(),
            declared_template,
            raw_fields,
            derived_identifier: naming::document_identifier(Path::new(file_name)),
            locations,
        })
    }
}

fn empty_document() -> Diagnostic {
    Diagnostic::malformed("Configuration file is empty").with_suggestions(vec![
        "Add a 'blueprint' field to specify which blueprint to use".to_string(),
        "Add configuration parameters for your blueprint".to_string(),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::diagnostic::DiagnosticKind;

    #[test]
    fn test_parse_extracts_template_and_fields() {
        let doc = Document::parse("blueprint: daily_etl\njob_id: x\n", "customer.dag.yaml").unwrap();
        assert_eq!(doc.declared_template.as_deref(), Some("daily_etl"));
        assert_eq!(doc.raw_fields.len(), 1);
        assert_eq!(doc.derived_identifier, "customer");
        assert_eq!(doc.locations.get("job_id"), Some(Location::new(2, 1)));
    }

    #[test]
    fn test_empty_document_is_malformed() {
        for source in ["", "   \n", "# only a comment\n"] {
            let err = Document::parse(source, "x.dag.yaml").unwrap_err();
            assert_eq!(err.kind, DiagnosticKind::MalformedDocument, "source: {:?}", source);
        }
    }

    #[test]
    fn test_syntax_error_has_location() {
        let err = Document::parse("blueprint: a\n  bad: [unclosed\n", "x.dag.yaml").unwrap_err();
        assert_eq!(err.kind, DiagnosticKind::MalformedDocument);
        assert!(err.location.is_some());
    }

    #[test]
    fn test_non_mapping_root_is_malformed() {
        let err = Document::parse("- a\n- b\n", "x.dag.yaml").unwrap_err();
        assert_eq!(err.kind, DiagnosticKind::MalformedDocument);
    }

    #[test]
    fn test_missing_blueprint_key_is_not_a_parse_error() {
        let doc = Document::parse("job_id: x\n", "x.dag.yaml").unwrap();
        assert!(doc.declared_template.is_none());
    }
}
