//! Scaffolding - generating new configuration documents from a template
//!
//! Two modes share one procedure. Interactive mode walks the template's
//! top-level fields and prompts for each one. Direct mode applies `key=value`
//! overrides and defaults, then prompts only for what is still missing, or
//! reports every missing field at once when nobody can be asked.

use console::style;
use dialoguer::{theme::ColorfulTheme, Input, Select};
use miette::Diagnostic;
use serde_json::{Map, Value};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::core::diagnostic::DiagnosticKind;
use crate::core::naming::DOCUMENT_SUFFIX;
use crate::core::registry::{Registry, RegistryError, TemplateRecord};
use crate::core::suggest::{did_you_mean, suggest};
use crate::schema::model::{FieldKind, FieldSpec, IDENTIFIER_FIELD, TEMPLATE_KEY};
use crate::schema::validator::{check_field, merge_defaults, ValidatedConfig, Validator};

#[derive(Debug, Error, Diagnostic)]
pub enum ScaffoldError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Registry(#[from] RegistryError),

    #[error("Unknown field '{field}' for blueprint '{template}'")]
    #[diagnostic(code(blueprint::scaffold::unknown_field))]
    UnknownField {
        template: String,
        field: String,
        #[help]
        help: Option<String>,
    },

    #[error("Invalid value for '{field}': {message}")]
    #[diagnostic(code(blueprint::scaffold::invalid_value))]
    InvalidValue { field: String, message: String },

    #[error("Missing required fields: {}", fields.join(", "))]
    #[diagnostic(
        code(blueprint::scaffold::missing_fields),
        help("Pass each one with --set <field>=<value>, or run without --no-interactive")
    )]
    MissingFields { fields: Vec<String> },

    #[error("Generated document failed validation:\n{report}")]
    #[diagnostic(code(blueprint::scaffold::invalid))]
    Invalid { report: String },

    #[error("{} already exists", path.display())]
    #[diagnostic(code(blueprint::scaffold::exists), help("Use --force to overwrite"))]
    Exists { path: PathBuf },

    #[error("Cannot write {}: {source}", path.display())]
    #[diagnostic(code(blueprint::scaffold::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Prompt failed: {0}")]
    #[diagnostic(code(blueprint::scaffold::prompt))]
    Prompt(String),
}

/// Source of answers while scaffolding
pub trait Prompter {
    /// Name of the new document, which becomes its identifier
    fn document_name(&mut self, template: &str) -> Result<String, ScaffoldError>;

    /// Raw answer for one field; empty means "keep the default" or "skip"
    fn field_value(&mut self, field: &FieldSpec, path: &str, default: Option<&Value>) -> Result<String, ScaffoldError>;

    /// Tell the user an answer was rejected before asking again
    fn report_invalid(&mut self, path: &str, message: &str);
}

/// Prompts on the terminal with dialoguer
pub struct TerminalPrompter {
    theme: ColorfulTheme,
}

impl TerminalPrompter {
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }

    fn format_prompt(field: &FieldSpec, path: &str) -> String {
        let mut prompt = format!("{} [{}]", path, field.kind);
        if let Some(desc) = &field.description {
            let short = if desc.chars().count() > 50 {
                format!("{}...", desc.chars().take(47).collect::<String>())
            } else {
                desc.clone()
            };
            let _ = write!(prompt, " ({})", style(short).dim());
        }
        prompt
    }
}

impl Default for TerminalPrompter {
    fn default() -> Self {
        Self::new()
    }
}

impl Prompter for TerminalPrompter {
    fn document_name(&mut self, template: &str) -> Result<String, ScaffoldError> {
        println!();
        println!(
            "{} Creating new {} configuration",
            style("◆").cyan(),
            style(template).bold()
        );
        println!("{}", style("─".repeat(50)).dim());

        Input::with_theme(&self.theme)
            .with_prompt("Document name")
            .interact_text()
            .map_err(|e| ScaffoldError::Prompt(e.to_string()))
    }

    fn field_value(&mut self, field: &FieldSpec, path: &str, default: Option<&Value>) -> Result<String, ScaffoldError> {
        let prompt = Self::format_prompt(field, path);

        if *field.kind.unwrap_optional() == FieldKind::Boolean {
            let default_idx = match default {
                Some(Value::Bool(false)) => 1,
                _ => 0,
            };
            let selection = Select::with_theme(&self.theme)
                .with_prompt(&prompt)
                .items(&["true", "false"])
                .default(default_idx)
                .interact()
                .map_err(|e| ScaffoldError::Prompt(e.to_string()))?;
            return Ok(if selection == 0 { "true" } else { "false" }.to_string());
        }

        let mut input = Input::<String>::with_theme(&self.theme)
            .with_prompt(&prompt)
            .allow_empty(true);
        if let Some(default) = default {
            input = input.default(display_value(default)).show_default(true);
        }
        input
            .interact_text()
            .map_err(|e| ScaffoldError::Prompt(e.to_string()))
    }

    fn report_invalid(&mut self, path: &str, message: &str) {
        eprintln!("{} {}: {}", style("✗").red(), path, message);
    }
}

/// What to scaffold
#[derive(Debug, Clone, Default)]
pub struct ScaffoldRequest {
    pub template: String,
    /// Document name; prompted for, or taken from an `identifier` override, when absent
    pub document_name: Option<String>,
    /// `key=value` overrides, keys as dotted field paths
    pub overrides: Vec<(String, String)>,
    pub output_dir: PathBuf,
    pub force: bool,
}

/// A generated, already validated document
#[derive(Debug, Clone)]
pub struct Scaffolded {
    pub path: PathBuf,
    pub content: String,
    pub config: ValidatedConfig,
}

/// Produces new documents for templates in one registry snapshot
pub struct Scaffolder<'r> {
    registry: &'r Registry,
}

impl<'r> Scaffolder<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self { registry }
    }

    /// Build the document and write it to disk
    pub fn scaffold(
        &self,
        request: &ScaffoldRequest,
        prompter: Option<&mut dyn Prompter>,
    ) -> Result<Scaffolded, ScaffoldError> {
        let scaffolded = self.prepare(request, prompter)?;
        write_document(&scaffolded, request.force)?;
        Ok(scaffolded)
    }

    /// Build and validate the document without touching the file system
    pub fn prepare(
        &self,
        request: &ScaffoldRequest,
        mut prompter: Option<&mut dyn Prompter>,
    ) -> Result<Scaffolded, ScaffoldError> {
        let record = self.registry.resolve(&request.template)?;
        let interactive = prompter.is_some() && request.overrides.is_empty();

        let identifier_override = request
            .overrides
            .iter()
            .find(|(key, _)| key == IDENTIFIER_FIELD)
            .map(|(_, value)| value.trim().to_string());
        let name = match (&request.document_name, identifier_override, prompter.as_deref_mut()) {
            (Some(name), _, _) => name.trim().to_string(),
            (None, Some(name), _) => name,
            (None, None, Some(p)) => p.document_name(&record.name)?.trim().to_string(),
            (None, None, None) => record.name.clone(),
        };
        check_document_name(&name)?;

        let mut values = Map::new();
        values.insert(IDENTIFIER_FIELD.to_string(), Value::String(name.clone()));

        for (key, raw) in &request.overrides {
            if key == IDENTIFIER_FIELD {
                continue;
            }
            let spec = lookup_override(record, key)?;
            let value = parse_answer(spec, key, raw)?;
            set_path(&mut values, key, value)?;
        }

        if interactive {
            if let Some(p) = prompter.as_deref_mut() {
                for field in record.schema.fields.iter().filter(|f| f.name != IDENTIFIER_FIELD) {
                    if let Some(value) = ask(p, field, &field.name, field.default.as_ref())? {
                        values.insert(field.name.clone(), value);
                    }
                }
            }
        }

        merge_defaults(&mut values, &record.defaults, &record.schema);

        let file_name = format!("{}{}", name, DOCUMENT_SUFFIX);
        let validator = Validator::new(self.registry);
        let mut asked_for: Option<Vec<String>> = None;

        loop {
            let content = render_document(record, &values);
            let result = validator.validate_str(&content, &file_name);

            if let Some(config) = result.config {
                debug!(template = %record.name, document = %file_name, "scaffolded document validated");
                return Ok(Scaffolded {
                    path: document_path(&request.output_dir, &name),
                    content,
                    config,
                });
            }

            let missing: Vec<String> = result
                .errors()
                .filter(|d| d.kind == DiagnosticKind::MissingRequiredField)
                .map(|d| d.field_path.clone())
                .collect();
            if missing.len() != result.error_count() {
                return Err(ScaffoldError::Invalid {
                    report: result.report(),
                });
            }

            // Asking again for the same fields would never finish
            if asked_for.as_ref() == Some(&missing) {
                return Err(ScaffoldError::MissingFields { fields: missing });
            }
            let Some(p) = prompter.as_deref_mut() else {
                return Err(ScaffoldError::MissingFields { fields: missing });
            };
            for path in &missing {
                let Some(spec) = record.schema.lookup(path) else {
                    return Err(ScaffoldError::MissingFields { fields: missing.clone() });
                };
                // A required field prompt never returns None
                if let Some(value) = ask(p, spec, path, None)? {
                    set_path(&mut values, path, value)?;
                }
            }
            merge_defaults(&mut values, &record.defaults, &record.schema);
            asked_for = Some(missing);
        }
    }
}

/// Prompt until the answer parses and checks against the field
fn ask(
    prompter: &mut dyn Prompter,
    field: &FieldSpec,
    path: &str,
    default: Option<&Value>,
) -> Result<Option<Value>, ScaffoldError> {
    loop {
        let answer = prompter.field_value(field, path, default)?;
        if answer.trim().is_empty() {
            if let Some(default) = default {
                return Ok(Some(default.clone()));
            }
            if !field.required {
                return Ok(None);
            }
            prompter.report_invalid(path, "a value is required");
            continue;
        }
        match parse_answer(field, path, &answer) {
            Ok(value) => return Ok(Some(value)),
            Err(e) => prompter.report_invalid(path, &e.to_string()),
        }
    }
}

fn parse_answer(field: &FieldSpec, path: &str, raw: &str) -> Result<Value, ScaffoldError> {
    let value = field
        .kind
        .parse_input(raw)
        .map_err(|message| ScaffoldError::InvalidValue {
            field: path.to_string(),
            message,
        })?;
    if let Some(problem) = check_field(field, path, &value).into_iter().find(|d| d.is_error()) {
        return Err(ScaffoldError::InvalidValue {
            field: path.to_string(),
            message: problem.message,
        });
    }
    Ok(value)
}

fn lookup_override<'a>(record: &'a TemplateRecord, key: &str) -> Result<&'a FieldSpec, ScaffoldError> {
    if key.contains('[') {
        return Err(ScaffoldError::InvalidValue {
            field: key.to_string(),
            message: "list elements cannot be set individually; set the whole list".to_string(),
        });
    }
    record.schema.lookup(key).ok_or_else(|| {
        let names: Vec<&str> = record.schema.field_names().collect();
        let suggestions = suggest(key, names.iter().copied());
        ScaffoldError::UnknownField {
            template: record.name.clone(),
            field: key.to_string(),
            help: did_you_mean(&suggestions)
                .or_else(|| Some(format!("Available fields: {}", names.join(", ")))),
        }
    })
}

fn check_document_name(name: &str) -> Result<(), ScaffoldError> {
    let problem = if name.is_empty() {
        Some("the document name cannot be empty")
    } else if name.contains(['/', '\\']) {
        Some("the document name cannot contain path separators")
    } else {
        None
    };
    match problem {
        Some(message) => Err(ScaffoldError::InvalidValue {
            field: IDENTIFIER_FIELD.to_string(),
            message: message.to_string(),
        }),
        None => Ok(()),
    }
}

/// Set a dotted path, creating intermediate mappings
///
/// `name[i]` segments address an existing list element; lists are never grown.
fn set_path(values: &mut Map<String, Value>, path: &str, value: Value) -> Result<(), ScaffoldError> {
    let invalid = |message: String| ScaffoldError::InvalidValue {
        field: path.to_string(),
        message,
    };
    let mut segments: Vec<&str> = path.split('.').collect();
    let Some(last) = segments.pop() else {
        return Ok(());
    };

    let mut current = values;
    for segment in segments {
        let slot = match split_index(segment).map_err(&invalid)? {
            (name, Some(index)) => list_item(current, name, index).map_err(&invalid)?,
            (name, None) => current
                .entry(name.to_string())
                .or_insert_with(|| Value::Object(Map::new())),
        };
        current = match slot {
            Value::Object(map) => map,
            _ => return Err(invalid(format!("'{}' is not a mapping", segment))),
        };
    }

    match split_index(last).map_err(&invalid)? {
        (name, Some(index)) => *list_item(current, name, index).map_err(&invalid)? = value,
        (name, None) => {
            current.insert(name.to_string(), value);
        }
    }
    Ok(())
}

/// `sources[2]` -> (`sources`, Some(2)); `retry` -> (`retry`, None)
fn split_index(segment: &str) -> Result<(&str, Option<usize>), String> {
    match segment.split_once('[') {
        Some((name, rest)) => rest
            .strip_suffix(']')
            .and_then(|index| index.parse().ok())
            .map(|index| (name, Some(index)))
            .ok_or_else(|| format!("'{}' is not a valid list index", segment)),
        None => Ok((segment, None)),
    }
}

fn list_item<'v>(map: &'v mut Map<String, Value>, name: &str, index: usize) -> Result<&'v mut Value, String> {
    map.get_mut(name)
        .and_then(Value::as_array_mut)
        .and_then(|items| items.get_mut(index))
        .ok_or_else(|| format!("'{}' has no element {}", name, index))
}

/// Write a scaffolded document, creating parent directories
pub fn write_document(scaffolded: &Scaffolded, force: bool) -> Result<(), ScaffoldError> {
    let path = &scaffolded.path;
    if path.exists() && !force {
        return Err(ScaffoldError::Exists { path: path.clone() });
    }
    let io_error = |source| ScaffoldError::Io {
        path: path.clone(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_error)?;
    }
    std::fs::write(path, &scaffolded.content).map_err(io_error)?;
    info!("Wrote {}", path.display());
    Ok(())
}

/// Render a document for `record` with one comment line per described field
///
/// Fields appear in schema order. Absent optional fields are left as a
/// commented-out line so users can see they exist.
pub fn render_document(record: &TemplateRecord, values: &Map<String, Value>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# {} configuration", record.name);
    if let Some(desc) = &record.description {
        let _ = writeln!(out, "# {}", desc);
    }
    let _ = writeln!(out, "{}: {}", TEMPLATE_KEY, yaml_scalar(&Value::String(record.name.clone())));
    write_fields(&mut out, &record.schema.fields, values, 0);
    out
}

fn write_fields(out: &mut String, fields: &[FieldSpec], values: &Map<String, Value>, depth: usize) {
    let indent = "  ".repeat(depth);
    for field in fields {
        if let Some(desc) = &field.description {
            let _ = writeln!(out, "{}# {}", indent, desc);
        }
        match values.get(&field.name) {
            None => {
                let _ = writeln!(out, "{}# {}: <{}>", indent, field.name, field.kind);
            }
            Some(Value::Object(map)) if !field.children.is_empty() && !map.is_empty() => {
                let _ = writeln!(out, "{}{}:", indent, field.name);
                write_fields(out, &field.children, map, depth + 1);
            }
            Some(value) => {
                let _ = writeln!(out, "{}{}: {}", indent, field.name, yaml_scalar(value));
            }
        }
    }
}

/// Example document for `describe`: placeholders for required fields
pub fn example_document(record: &TemplateRecord) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}: {}", TEMPLATE_KEY, record.name);
    for field in record.schema.fields.iter().filter(|f| f.name != IDENTIFIER_FIELD) {
        if let Some(desc) = &field.description {
            let _ = writeln!(out, "# {}", desc);
        }
        match &field.default {
            Some(default) => {
                let _ = writeln!(out, "{}: {}", field.name, yaml_scalar(default));
            }
            None if field.required => {
                let _ = writeln!(out, "{}: <{}>", field.name, field.kind);
            }
            None => {
                let _ = writeln!(out, "# {}: <{}>", field.name, field.kind);
            }
        }
    }
    out
}

/// One-line YAML rendering of a value
///
/// Plain strings stay unquoted when YAML would read them back as the same
/// string; anything else is written as JSON, which YAML parses identically.
fn yaml_scalar(value: &Value) -> String {
    match value {
        Value::String(s) if is_plain_string(s) => s.clone(),
        other => serde_json::to_string(other).unwrap_or_else(|_| "null".to_string()),
    }
}

fn is_plain_string(s: &str) -> bool {
    const RESERVED: &[&str] = &["true", "false", "yes", "no", "on", "off", "null", "y", "n"];
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '/'))
        && s.chars().next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '/')
        && !RESERVED.contains(&s.to_lowercase().as_str())
}

/// Compact display of a default inside a prompt
fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Document path for `name` under `dir`
pub fn document_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{}{}", name, DOCUMENT_SUFFIX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::registry::{Origin, RegistryBuilder};
    use crate::schema::extractor::{FieldDecl, TemplateDecl, TypeDecl, TypeSet};
    use serde_json::json;
    use std::collections::VecDeque;
    use tempfile::tempdir;

    #[derive(Default)]
    struct ScriptedPrompter {
        name: String,
        answers: VecDeque<String>,
        asked: Vec<String>,
        rejected: Vec<String>,
    }

    impl ScriptedPrompter {
        fn new(name: &str, answers: &[&str]) -> Self {
            Self {
                name: name.to_string(),
                answers: answers.iter().map(|a| a.to_string()).collect(),
                ..Default::default()
            }
        }
    }

    impl Prompter for ScriptedPrompter {
        fn document_name(&mut self, _template: &str) -> Result<String, ScaffoldError> {
            Ok(self.name.clone())
        }

        fn field_value(&mut self, _field: &FieldSpec, path: &str, _default: Option<&Value>) -> Result<String, ScaffoldError> {
            self.asked.push(path.to_string());
            self.answers
                .pop_front()
                .ok_or_else(|| ScaffoldError::Prompt("script exhausted".to_string()))
        }

        fn report_invalid(&mut self, path: &str, _message: &str) {
            self.rejected.push(path.to_string());
        }
    }

    fn registry() -> Registry {
        let mut types = TypeSet::new();
        types.insert(
            "Retry".into(),
            TypeDecl::new()
                .field("count", FieldDecl::new("integer").with_default(3))
                .field("delay", FieldDecl::new("integer").with_default(60)),
        );
        types.insert(
            "DailyEtlConfig".into(),
            TypeDecl::new()
                .field("job_id", FieldDecl::new("string").with_description("Unique job id"))
                .field("source_table", FieldDecl::new("string"))
                .field("target_table", FieldDecl::new("string"))
                .field("schedule", FieldDecl::new("string").with_default("@daily"))
                .field("retries", FieldDecl::new("integer").with_default(2))
                .field("retry", FieldDecl::new("Retry").with_default(json!({})))
                .field("owner", FieldDecl::new("optional[string]")),
        );
        let mut builder = RegistryBuilder::new();
        builder
            .register(
                "DailyEtlBlueprint",
                &TemplateDecl::new("DailyEtlConfig").with_description("Daily ETL job"),
                &types,
                Origin::new("etl.yaml", None, "DailyEtlBlueprint"),
            )
            .unwrap();
        builder.build()
    }

    fn request(overrides: &[(&str, &str)]) -> ScaffoldRequest {
        ScaffoldRequest {
            template: "daily_etl".into(),
            document_name: Some("customer".into()),
            overrides: overrides
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            output_dir: PathBuf::from("configs"),
            force: false,
        }
    }

    #[test]
    fn test_direct_mode_with_all_overrides() {
        let registry = registry();
        let scaffolded = Scaffolder::new(&registry)
            .prepare(
                &request(&[("job_id", "x"), ("source_table", "raw.a"), ("target_table", "dw.b"), ("retry.count", "5")]),
                None,
            )
            .unwrap();

        assert_eq!(scaffolded.path, PathBuf::from("configs/customer.dag.yaml"));
        let config = scaffolded.config;
        assert_eq!(config.identifier(), "customer");
        assert_eq!(config.get("schedule"), Some(&json!("@daily")));
        assert_eq!(config.get("retry.count"), Some(&json!(5)));
        assert_eq!(config.get("retry.delay"), Some(&json!(60)));

        let content = scaffolded.content;
        assert!(content.contains("blueprint: daily_etl\n"));
        assert!(content.contains("# Unique job id\njob_id: x\n"));
        assert!(content.contains("schedule: \"@daily\"\n"));
        assert!(content.contains("retry:\n  count: 5\n  delay: 60\n"));
        assert!(content.contains("# owner: <optional[string]>\n"));
    }

    #[test]
    fn test_direct_mode_reports_all_missing_fields() {
        let registry = registry();
        let err = Scaffolder::new(&registry)
            .prepare(&request(&[("job_id", "x")]), None)
            .unwrap_err();
        match err {
            ScaffoldError::MissingFields { fields } => {
                assert_eq!(fields, vec!["source_table", "target_table"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_direct_mode_prompts_only_for_missing() {
        let registry = registry();
        let mut prompter = ScriptedPrompter::new("ignored", &["raw.a", "dw.b"]);
        let scaffolded = Scaffolder::new(&registry)
            .prepare(&request(&[("job_id", "x")]), Some(&mut prompter))
            .unwrap();
        assert_eq!(prompter.asked, vec!["source_table", "target_table"]);
        assert_eq!(scaffolded.config.get("target_table"), Some(&json!("dw.b")));
    }

    #[test]
    fn test_unknown_override_is_rejected_with_suggestion() {
        let registry = registry();
        let err = Scaffolder::new(&registry)
            .prepare(&request(&[("retires", "3")]), None)
            .unwrap_err();
        match err {
            ScaffoldError::UnknownField { field, help, .. } => {
                assert_eq!(field, "retires");
                assert_eq!(help.as_deref(), Some("Did you mean 'retries'?"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_override_value() {
        let registry = registry();
        let err = Scaffolder::new(&registry)
            .prepare(&request(&[("retries", "two")]), None)
            .unwrap_err();
        assert!(matches!(err, ScaffoldError::InvalidValue { field, .. } if field == "retries"));
    }

    #[test]
    fn test_interactive_mode_reprompts_on_bad_answer() {
        let registry = registry();
        let mut prompter = ScriptedPrompter::new(
            "nightly",
            // job_id, source_table, target_table, schedule (default), retries (bad, then good),
            // retry (default), owner (skip)
            &["x", "raw.a", "dw.b", "", "many", "4", "", ""],
        );
        let mut req = request(&[]);
        req.document_name = None;

        let scaffolded = Scaffolder::new(&registry)
            .prepare(&req, Some(&mut prompter))
            .unwrap();

        assert_eq!(prompter.rejected, vec!["retries"]);
        let config = scaffolded.config;
        assert_eq!(config.identifier(), "nightly");
        assert_eq!(config.get("retries"), Some(&json!(4)));
        assert_eq!(config.get("schedule"), Some(&json!("@daily")));
        assert!(config.get("owner").is_none());
        assert!(!prompter.asked.contains(&"identifier".to_string()));
    }

    fn source_registry() -> Registry {
        let mut types = TypeSet::new();
        types.insert(
            "Source".into(),
            TypeDecl::new()
                .field("table", FieldDecl::new("string"))
                .field("format", FieldDecl::new("string").with_default("parquet")),
        );
        types.insert(
            "IngestConfig".into(),
            TypeDecl::new().field("sources", FieldDecl::new("list[Source]")),
        );
        let mut builder = RegistryBuilder::new();
        builder
            .register(
                "IngestBlueprint",
                &TemplateDecl::new("IngestConfig"),
                &types,
                Origin::new("ingest.yaml", None, "IngestBlueprint"),
            )
            .unwrap();
        builder.build()
    }

    #[test]
    fn test_incomplete_list_item_override_is_rejected() {
        let registry = source_registry();
        let mut req = request(&[("sources", "[{format: json}]")]);
        req.template = "ingest".into();
        let mut prompter = ScriptedPrompter::new("ignored", &[]);

        let err = Scaffolder::new(&registry)
            .prepare(&req, Some(&mut prompter))
            .unwrap_err();
        match err {
            ScaffoldError::InvalidValue { field, message } => {
                assert_eq!(field, "sources");
                assert!(message.contains("table"), "{message}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(prompter.asked.is_empty());
    }

    #[test]
    fn test_set_path_writes_into_list_element() {
        let mut values = Map::new();
        values.insert("sources".into(), json!([{"format": "json"}, {"format": "csv"}]));

        set_path(&mut values, "sources[1].table", json!("raw.b")).unwrap();
        set_path(&mut values, "sources[0]", json!({"table": "raw.a"})).unwrap();

        assert_eq!(
            Value::Object(values),
            json!({"sources": [{"table": "raw.a"}, {"format": "csv", "table": "raw.b"}]})
        );
    }

    #[test]
    fn test_set_path_rejects_missing_list_element() {
        let mut values = Map::new();
        values.insert("sources".into(), json!([{"format": "json"}]));

        for path in ["sources[3].table", "targets[0].table", "sources[x].table"] {
            let err = set_path(&mut values, path, json!("raw.a")).unwrap_err();
            assert!(matches!(err, ScaffoldError::InvalidValue { ref field, .. } if field == path), "{path}");
        }
        assert_eq!(values["sources"], json!([{"format": "json"}]));
    }

    #[test]
    fn test_set_path_rejects_scalar_parent() {
        let mut values = Map::new();
        values.insert("retry".into(), json!(3));
        let err = set_path(&mut values, "retry.count", json!(5)).unwrap_err();
        match err {
            ScaffoldError::InvalidValue { message, .. } => assert!(message.contains("'retry' is not a mapping")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_write_refuses_overwrite_without_force() {
        let temp = tempdir().unwrap();
        let registry = registry();
        let mut req = request(&[("job_id", "x"), ("source_table", "a"), ("target_table", "b")]);
        req.output_dir = temp.path().join("nested/configs");

        let scaffolder = Scaffolder::new(&registry);
        let first = scaffolder.scaffold(&req, None).unwrap();
        assert!(first.path.exists());

        assert!(matches!(scaffolder.scaffold(&req, None), Err(ScaffoldError::Exists { .. })));

        req.force = true;
        assert!(scaffolder.scaffold(&req, None).is_ok());
    }

    #[test]
    fn test_document_name_validation() {
        let registry = registry();
        let mut req = request(&[]);
        req.document_name = Some("../escape".into());
        assert!(matches!(
            Scaffolder::new(&registry).prepare(&req, None),
            Err(ScaffoldError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_example_document_uses_placeholders() {
        let registry = registry();
        let example = example_document(registry.resolve("daily_etl").unwrap());
        assert!(example.starts_with("blueprint: daily_etl\n"));
        assert!(example.contains("source_table: <string>\n"));
        assert!(example.contains("retries: 2\n"));
        assert!(example.contains("# owner: <optional[string]>\n"));
        assert!(!example.contains("identifier"));
    }

    #[test]
    fn test_yaml_scalar_quotes_when_needed() {
        assert_eq!(yaml_scalar(&json!("raw.table")), "raw.table");
        assert_eq!(yaml_scalar(&json!("@daily")), "\"@daily\"");
        assert_eq!(yaml_scalar(&json!("yes")), "\"yes\"");
        assert_eq!(yaml_scalar(&json!("123")), "\"123\"");
        assert_eq!(yaml_scalar(&json!(["a", "b"])), "[\"a\",\"b\"]");
    }
}
