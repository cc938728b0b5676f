//! Configuration validation against a template schema
//!
//! Each document goes through the same steps: parse, find the `blueprint`
//! key, resolve the template, derive the identifier, merge defaults by field
//! path, then check every field depth-first. Every problem is collected as a
//! [`Diagnostic`]; a document is valid when none of them is an error.

use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::path::Path;
use tracing::debug;

use crate::core::diagnostic::Diagnostic;
use crate::core::registry::{Registry, RegistryError};
use crate::core::suggest::suggest;
use crate::schema::model::{FieldKind, FieldSpec, Schema, IDENTIFIER_FIELD, TEMPLATE_KEY};
use crate::yaml::diagnostics::format_report;
use crate::yaml::document::Document;
use crate::yaml::locate::KeyLocations;

/// A configuration that passed validation, defaults merged
///
/// Only the validator creates these, so holding one proves the values match
/// the template's schema.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedConfig {
    template: String,
    values: Map<String, Value>,
}

impl ValidatedConfig {
    pub(crate) fn new(template: impl Into<String>, values: Map<String, Value>) -> Self {
        Self {
            template: template.into(),
            values,
        }
    }

    /// Name of the template this configuration instantiates
    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn identifier(&self) -> &str {
        self.values
            .get(IDENTIFIER_FIELD)
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// Value at a dotted path such as `retry.count` or `sources[0].table`
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let mut current = lookup_segment(&self.values, segments.next()?)?;
        for segment in segments {
            current = lookup_segment(current.as_object()?, segment)?;
        }
        Some(current)
    }

    /// Every field in schema order, identifier first
    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    pub fn into_values(self) -> Map<String, Value> {
        self.values
    }

    /// The configuration as a complete document, `blueprint` key first
    pub fn to_document(&self) -> Map<String, Value> {
        let mut document = Map::new();
        document.insert(TEMPLATE_KEY.to_string(), Value::String(self.template.clone()));
        document.extend(self.values.clone());
        document
    }

    pub fn to_yaml(&self) -> Result<String, serde_yml::Error> {
        serde_yml::to_string(&self.to_document())
    }
}

impl Serialize for ValidatedConfig {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_document().serialize(serializer)
    }
}

/// `name` or `name[3]`
fn lookup_segment<'v>(map: &'v Map<String, Value>, segment: &str) -> Option<&'v Value> {
    match segment.split_once('[') {
        Some((name, index)) => {
            let index: usize = index.strip_suffix(']')?.parse().ok()?;
            map.get(name)?.as_array()?.get(index)
        }
        None => map.get(segment),
    }
}

/// Validation behaviour switches
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidationOptions {
    /// Treat unknown fields as errors instead of warnings
    pub strict: bool,
}

/// Outcome of validating one document
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub file_name: String,
    pub source: String,
    /// Present exactly when the document is valid
    pub config: Option<ValidatedConfig>,
    /// Every diagnostic, in the order fields were visited
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationResult {
    fn invalid(file_name: &str, source: &str, diagnostic: Diagnostic) -> Self {
        Self {
            file_name: file_name.to_string(),
            source: source.to_string(),
            config: None,
            diagnostics: vec![diagnostic],
        }
    }

    pub fn is_valid(&self) -> bool {
        self.config.is_some()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| !d.is_error())
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    /// Human-readable report of every diagnostic
    pub fn report(&self) -> String {
        self.diagnostics
            .iter()
            .map(|d| format_report(d, &self.source, &self.file_name))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Validates documents against one registry snapshot
pub struct Validator<'r> {
    registry: &'r Registry,
    options: ValidationOptions,
}

impl<'r> Validator<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self {
            registry,
            options: ValidationOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ValidationOptions) -> Self {
        self.options = options;
        self
    }

    /// Read and validate a document file
    pub fn validate_file(&self, path: &Path) -> ValidationResult {
        let file_name = path.display().to_string();
        match std::fs::read_to_string(path) {
            Ok(source) => self.validate_str(&source, &file_name),
            Err(e) => ValidationResult::invalid(
                &file_name,
                "",
                Diagnostic::malformed(format!("Cannot read file: {}", e)),
            ),
        }
    }

    /// Validate document text; `file_name` drives the derived identifier
    pub fn validate_str(&self, source: &str, file_name: &str) -> ValidationResult {
        match Document::parse(source, file_name) {
            Ok(document) => self.validate_document(&document),
            Err(diagnostic) => ValidationResult::invalid(file_name, source, diagnostic),
        }
    }

    pub fn validate_document(&self, document: &Document) -> ValidationResult {
        let file_name = document.file_name.as_str();
        let source = document.source.as_str();

        let Some(template) = document.declared_template.as_deref() else {
            return ValidationResult::invalid(file_name, source, Diagnostic::missing_template());
        };

        let record = match self.registry.resolve(template) {
            Ok(record) => record,
            Err(RegistryError::UnknownTemplate {
                known, suggestions, ..
            }) => {
                let diagnostic = Diagnostic::unknown_template(template, &known, suggestions)
                    .at(document.locations.get(TEMPLATE_KEY));
                return ValidationResult::invalid(file_name, source, diagnostic);
            }
        };

        debug!(file = file_name, template, "validating document");

        let mut values = document.raw_fields.clone();
        if !values.contains_key(IDENTIFIER_FIELD) {
            values.insert(
                IDENTIFIER_FIELD.to_string(),
                Value::String(document.derived_identifier.clone()),
            );
        }
        merge_defaults(&mut values, &record.defaults, &record.schema);

        let mut checker = Checker::new(&document.locations, self.options);
        let checked = checker.check_fields(&record.schema.fields, "", &values);
        let diagnostics = checker.diagnostics;

        let config = if diagnostics.iter().any(Diagnostic::is_error) {
            None
        } else {
            Some(ValidatedConfig::new(record.name.clone(), checked))
        };

        debug!(
            file = file_name,
            valid = config.is_some(),
            diagnostics = diagnostics.len(),
            "validated document"
        );

        ValidationResult {
            file_name: file_name.to_string(),
            source: source.to_string(),
            config,
            diagnostics,
        }
    }
}

/// Check one value against a field, as when answering a prompt
///
/// No source locations are attached. Only the field's own subtree is
/// checked; the caller decides whether warnings matter.
pub fn check_field(spec: &FieldSpec, path: &str, value: &Value) -> Vec<Diagnostic> {
    let locations = KeyLocations::default();
    let mut checker = Checker::new(&locations, ValidationOptions::default());
    checker.check_value(spec, &spec.kind, path, value);
    checker.diagnostics
}

/// Inject defaults for absent fields, by full field path
///
/// `defaults` must be in pre-order so a parent's default object exists
/// before its children's defaults are considered. A default that is itself
/// an object also fills keys missing from a user-supplied object, so a
/// partial override keeps the untouched sibling defaults.
pub fn merge_defaults(values: &mut Map<String, Value>, defaults: &IndexMap<String, Value>, schema: &Schema) {
    for (path, default) in defaults {
        let segments: Vec<&str> = path.split('.').collect();
        apply_default(values, &schema.fields, &segments, default);
    }
}

fn apply_default(target: &mut Map<String, Value>, fields: &[FieldSpec], segments: &[&str], default: &Value) {
    let Some((head, rest)) = segments.split_first() else {
        return;
    };
    let (name, each_item) = match head.strip_suffix("[]") {
        Some(name) => (name, true),
        None => (*head, false),
    };
    let Some(spec) = fields.iter().find(|f| f.name == name) else {
        return;
    };

    if rest.is_empty() {
        match (target.get_mut(name), default) {
            (None, _) => {
                target.insert(name.to_string(), default.clone());
            }
            (Some(Value::Object(existing)), Value::Object(default)) => fill_missing(existing, default),
            _ => {}
        }
        return;
    }

    match target.get_mut(name) {
        Some(Value::Array(items)) if each_item => {
            for item in items {
                if let Value::Object(obj) = item {
                    apply_default(obj, &spec.children, rest, default);
                }
            }
        }
        Some(Value::Object(obj)) if !each_item => apply_default(obj, &spec.children, rest, default),
        // Absent or mistyped parents get no children; the checker reports them
        _ => {}
    }
}

fn fill_missing(target: &mut Map<String, Value>, default: &Map<String, Value>) {
    for (key, value) in default {
        match (target.get_mut(key), value) {
            (None, _) => {
                target.insert(key.clone(), value.clone());
            }
            (Some(Value::Object(existing)), Value::Object(nested)) => fill_missing(existing, nested),
            _ => {}
        }
    }
}

/// Depth-first structural check collecting every diagnostic
struct Checker<'a> {
    locations: &'a KeyLocations,
    options: ValidationOptions,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Checker<'a> {
    fn new(locations: &'a KeyLocations, options: ValidationOptions) -> Self {
        Self {
            locations,
            options,
            diagnostics: Vec::new(),
        }
    }

    /// Check a mapping against `fields`; returns the known fields in schema order
    fn check_fields(&mut self, fields: &[FieldSpec], prefix: &str, values: &Map<String, Value>) -> Map<String, Value> {
        let mut checked = Map::new();
        // Missing keys have no line of their own, so point at the parent
        let parent_location = if prefix.is_empty() {
            None
        } else {
            self.locations.nearest(prefix)
        };

        for spec in fields {
            let path = join_path(prefix, &spec.name);
            match values.get(&spec.name) {
                None if spec.required => self
                    .diagnostics
                    .push(Diagnostic::missing_field(&path, &spec.kind).at(parent_location)),
                None => {}
                Some(value) => {
                    if let Some(value) = self.check_value(spec, &spec.kind, &path, value) {
                        checked.insert(spec.name.clone(), value);
                    }
                }
            }
        }

        for key in values.keys() {
            if fields.iter().any(|f| &f.name == key) {
                continue;
            }
            let path = join_path(prefix, key);
            let suggestions = suggest(key, fields.iter().map(|f| f.name.as_str()));
            self.diagnostics.push(
                Diagnostic::unknown_field(&path, suggestions, self.options.strict)
                    .at(self.locations.nearest(&path)),
            );
        }

        checked
    }

    /// Check a value against `kind`; `None` when it does not conform
    fn check_value(&mut self, spec: &FieldSpec, kind: &FieldKind, path: &str, value: &Value) -> Option<Value> {
        match (kind, value) {
            (FieldKind::Optional(_), Value::Null) => Some(Value::Null),
            (FieldKind::Optional(inner), _) => self.check_value(spec, inner, path, value),
            (FieldKind::List(inner), Value::Array(items)) => {
                let mut checked = Vec::with_capacity(items.len());
                for (index, item) in items.iter().enumerate() {
                    let item_path = format!("{}[{}]", path, index);
                    if let Some(item) = self.check_value(spec, inner, &item_path, item) {
                        checked.push(item);
                    }
                }
                Some(Value::Array(checked))
            }
            (FieldKind::Object, Value::Object(map)) => {
                Some(Value::Object(self.check_fields(&spec.children, path, map)))
            }
            (kind, value) if kind.matches(value) => Some(value.clone()),
            (kind, value) => {
                self.diagnostics.push(
                    Diagnostic::type_mismatch(path, kind, value).at(self.locations.nearest(path)),
                );
                None
            }
        }
    }
}

fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", prefix, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::diagnostic::DiagnosticKind;
    use crate::core::registry::{Origin, RegistryBuilder};
    use crate::schema::extractor::{FieldDecl, TemplateDecl, TypeDecl, TypeSet};
    use crate::yaml::locate::Location;
    use serde_json::json;

    fn registry() -> Registry {
        let mut types = TypeSet::new();
        types.insert(
            "DailyEtlConfig".into(),
            TypeDecl::new()
                .field("job_id", FieldDecl::new("string"))
                .field("source_table", FieldDecl::new("string"))
                .field("target_table", FieldDecl::new("string"))
                .field("schedule", FieldDecl::new("string").with_default("@daily"))
                .field("retries", FieldDecl::new("integer").with_default(2)),
        );
        types.insert(
            "Retry".into(),
            TypeDecl::new()
                .field("count", FieldDecl::new("integer").with_default(3))
                .field("delay", FieldDecl::new("integer").with_default(60)),
        );
        types.insert(
            "Source".into(),
            TypeDecl::new()
                .field("table", FieldDecl::new("string"))
                .field("format", FieldDecl::new("string").with_default("csv")),
        );
        types.insert(
            "PipelineConfig".into(),
            TypeDecl::new()
                .field("retry", FieldDecl::new("Retry").with_default(json!({})))
                .field("sources", FieldDecl::new("list[Source]"))
                .field("owner", FieldDecl::new("optional[string]"))
                .field("limits", FieldDecl::new("Limits").with_default(json!({"cpu": 1, "memory": 512}))),
        );
        types.insert(
            "Limits".into(),
            TypeDecl::new()
                .field("cpu", FieldDecl::new("integer"))
                .field("memory", FieldDecl::new("integer")),
        );

        let mut builder = RegistryBuilder::new();
        for (declaration, config) in [("DailyEtlBlueprint", "DailyEtlConfig"), ("PipelineBlueprint", "PipelineConfig")] {
            builder
                .register(
                    declaration,
                    &TemplateDecl::new(config),
                    &types,
                    Origin::new("test.yaml", None, declaration),
                )
                .unwrap();
        }
        builder.build()
    }

    fn validate(source: &str) -> ValidationResult {
        let registry = registry();
        Validator::new(&registry).validate_str(source, "customer.dag.yaml")
    }

    fn kinds(result: &ValidationResult) -> Vec<(DiagnosticKind, String)> {
        result
            .diagnostics
            .iter()
            .map(|d| (d.kind, d.field_path.clone()))
            .collect()
    }

    #[test]
    fn test_valid_document_merges_defaults() {
        let result = validate(
            "blueprint: daily_etl\njob_id: \"x\"\nsource_table: \"a\"\ntarget_table: \"b\"\n",
        );
        assert!(result.diagnostics.is_empty());
        let config = result.config.unwrap();
        assert_eq!(config.template(), "daily_etl");
        assert_eq!(
            Value::Object(config.values().clone()),
            json!({
                "identifier": "customer",
                "job_id": "x",
                "source_table": "a",
                "target_table": "b",
                "schedule": "@daily",
                "retries": 2,
            })
        );
        let keys: Vec<&String> = config.values().keys().collect();
        assert_eq!(keys[0], "identifier");
    }

    #[test]
    fn test_missing_one_required_field() {
        let result = validate("blueprint: daily_etl\njob_id: x\ntarget_table: b\n");
        assert!(!result.is_valid());
        assert_eq!(
            kinds(&result),
            vec![(DiagnosticKind::MissingRequiredField, "source_table".to_string())]
        );
    }

    #[test]
    fn test_every_missing_field_is_reported() {
        let result = validate("blueprint: daily_etl\n");
        let missing: Vec<String> = result
            .errors()
            .filter(|d| d.kind == DiagnosticKind::MissingRequiredField)
            .map(|d| d.field_path.clone())
            .collect();
        assert_eq!(missing, vec!["job_id", "source_table", "target_table"]);
    }

    #[test]
    fn test_typo_in_template_name() {
        let result = validate("blueprint: dialy_etl\njob_id: x\n");
        assert_eq!(result.diagnostics.len(), 1);
        let d = &result.diagnostics[0];
        assert_eq!(d.kind, DiagnosticKind::UnknownTemplate);
        assert_eq!(d.suggestions, vec!["daily_etl"]);
        assert_eq!(d.location, Some(Location::new(1, 1)));
    }

    #[test]
    fn test_case_differing_template_name_is_unknown() {
        let result = validate("blueprint: Daily_ETL\n");
        let d = &result.diagnostics[0];
        assert_eq!(d.kind, DiagnosticKind::UnknownTemplate);
        assert_eq!(d.suggestions, vec!["daily_etl"]);
    }

    #[test]
    fn test_type_mismatch() {
        let result = validate(
            "blueprint: daily_etl\njob_id: x\nsource_table: a\ntarget_table: b\nretries: \"two\"\n",
        );
        let d = &result.diagnostics[0];
        assert_eq!(d.kind, DiagnosticKind::TypeMismatch);
        assert_eq!(d.field_path, "retries");
        assert_eq!(d.expected, Some(FieldKind::Integer));
        assert_eq!(d.actual.as_deref(), Some("string"));
        assert_eq!(d.location, Some(Location::new(5, 1)));
    }

    #[test]
    fn test_missing_template_and_malformed() {
        let result = validate("job_id: x\n");
        assert_eq!(kinds(&result), vec![(DiagnosticKind::MissingTemplate, String::new())]);

        let result = validate("");
        assert_eq!(result.diagnostics[0].kind, DiagnosticKind::MalformedDocument);
    }

    #[test]
    fn test_unknown_field_is_warning_unless_strict() {
        let source = "blueprint: daily_etl\njob_id: x\nsource_table: a\ntarget_table: b\nretrys: 3\n";
        let result = validate(source);
        assert!(result.is_valid());
        let warning = result.warnings().next().unwrap();
        assert_eq!(warning.kind, DiagnosticKind::UnknownField);
        assert_eq!(warning.suggestions, vec!["retries"]);
        // Dropped from the merged configuration
        assert!(result.config.unwrap().get("retrys").is_none());

        let registry = registry();
        let strict = Validator::new(&registry)
            .with_options(ValidationOptions { strict: true })
            .validate_str(source, "customer.dag.yaml");
        assert!(!strict.is_valid());
    }

    #[test]
    fn test_validation_is_idempotent() {
        let registry = registry();
        let validator = Validator::new(&registry);
        let first = validator.validate_str(
            "blueprint: pipeline\nretry:\n  count: 5\nsources:\n  - table: raw.a\nextra: 1\n",
            "nightly.dag.yaml",
        );
        let config = first.config.unwrap();

        let yaml = config.to_yaml().unwrap();
        let second = validator.validate_str(&yaml, "nightly.dag.yaml");
        assert!(second.diagnostics.is_empty(), "{}", second.report());
        assert_eq!(second.config.unwrap(), config);
    }

    #[test]
    fn test_nested_partial_override_keeps_sibling_defaults() {
        let result = validate("blueprint: pipeline\nretry:\n  count: 5\nlimits:\n  cpu: 4\nsources: []\n");
        let config = result.config.unwrap();
        assert_eq!(config.get("retry.count"), Some(&json!(5)));
        assert_eq!(config.get("retry.delay"), Some(&json!(60)));
        assert_eq!(config.get("limits.cpu"), Some(&json!(4)));
        assert_eq!(config.get("limits.memory"), Some(&json!(512)));
    }

    #[test]
    fn test_list_item_defaults_and_errors() {
        let result = validate(
            "blueprint: pipeline\nsources:\n  - table: raw.a\n  - format: json\n  - table: 7\n",
        );
        assert_eq!(
            kinds(&result),
            vec![
                (DiagnosticKind::MissingRequiredField, "sources[1].table".to_string()),
                (DiagnosticKind::TypeMismatch, "sources[2].table".to_string()),
            ]
        );
        assert_eq!(result.diagnostics[0].location, Some(Location::new(4, 3)));
        assert_eq!(result.diagnostics[1].location, Some(Location::new(5, 5)));

        let result = validate("blueprint: pipeline\nsources:\n  - table: raw.a\n");
        let config = result.config.unwrap();
        assert_eq!(config.get("sources[0].format"), Some(&json!("csv")));
    }

    #[test]
    fn test_optional_accepts_null_and_checks_inner_kind() {
        let ok = validate("blueprint: pipeline\nsources: []\nowner: null\n");
        assert!(ok.is_valid());
        let bad = validate("blueprint: pipeline\nsources: []\nowner: 3\n");
        assert_eq!(kinds(&bad), vec![(DiagnosticKind::TypeMismatch, "owner".to_string())]);
    }

    #[test]
    fn test_explicit_identifier_wins() {
        let result = validate("blueprint: pipeline\nidentifier: nightly\nsources: []\n");
        assert_eq!(result.config.unwrap().identifier(), "nightly");
    }

    #[test]
    fn test_report_renders_every_diagnostic() {
        let result = validate("blueprint: daily_etl\nretries: two\n");
        let report = result.report();
        assert!(report.contains("missing-required-field"));
        assert!(report.contains("type-mismatch"));
        assert!(report.contains("customer.dag.yaml:2"));
    }

    #[test]
    fn test_check_field() {
        let spec = FieldSpec {
            name: "retries".into(),
            kind: FieldKind::Integer,
            required: true,
            default: None,
            description: None,
            children: Vec::new(),
        };
        assert!(check_field(&spec, "retries", &json!(3)).is_empty());
        assert_eq!(check_field(&spec, "retries", &json!("x"))[0].kind, DiagnosticKind::TypeMismatch);
    }
}
