//! Schema extraction - from author declarations to a [`Schema`]
//!
//! Template authors declare record types (optionally extending other types)
//! and templates that point at one of them as their root configuration type.
//! Extraction is a pure pass over those declarations: bases are flattened in
//! order, field kinds are resolved recursively, defaults are type-checked, and
//! the implicit identifier field is injected at the root. Everything that can
//! go wrong surfaces here, at load time, never during validation.

use indexmap::IndexMap;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::schema::model::{FieldKind, FieldSpec, Schema, IDENTIFIER_FIELD, TEMPLATE_KEY};
use crate::schema::validator::{check_field, merge_defaults};
use crate::yaml::diagnostics::YamlSyntaxError;

/// Types declared in one template file, by name
pub type TypeSet = IndexMap<String, TypeDecl>;

/// One declared field of a record type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldDecl {
    /// Kind expression, e.g. `string`, `list[integer]`, `optional[RetryPolicy]`
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FieldDecl {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            default: None,
            description: None,
        }
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A record type: its bases and its own fields in declaration order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TypeDecl {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extends: Vec<String>,
    #[serde(default)]
    pub fields: IndexMap<String, FieldDecl>,
}

impl TypeDecl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extends(mut self, base: impl Into<String>) -> Self {
        self.extends.push(base.into());
        self
    }

    pub fn field(mut self, name: impl Into<String>, decl: FieldDecl) -> Self {
        self.fields.insert(name.into(), decl);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Built-in text artifact: tera templates for the output path and body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArtifactDecl {
    pub path: String,
    pub template: String,
}

/// A template declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TemplateDecl {
    /// Explicit public name; derived from the declaration key when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Root configuration type
    pub config: String,
    /// Key of a programmatically registered render callback
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub render: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<ArtifactDecl>,
}

impl TemplateDecl {
    pub fn new(config: impl Into<String>) -> Self {
        Self {
            name: None,
            description: None,
            config: config.into(),
            render: None,
            artifact: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn render_with(mut self, key: impl Into<String>) -> Self {
        self.render = Some(key.into());
        self
    }

    pub fn with_artifact(mut self, path: impl Into<String>, template: impl Into<String>) -> Self {
        self.artifact = Some(ArtifactDecl {
            path: path.into(),
            template: template.into(),
        });
        self
    }
}

/// Contents of one template definition file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TemplateFile {
    #[serde(default)]
    pub types: TypeSet,
    #[serde(default)]
    pub blueprints: IndexMap<String, TemplateDecl>,
}

impl TemplateFile {
    /// Parse a template definition file
    pub fn from_yaml(source: &str, file_name: &str) -> Result<Self, YamlSyntaxError> {
        if source.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yml::from_str::<Option<Self>>(source)
            .map(Option::unwrap_or_default)
            .map_err(|e| YamlSyntaxError::from_serde_error(&e, source, file_name))
    }
}

/// Load-time extraction failures, attributed to one template
#[derive(Debug, Error, Diagnostic)]
pub enum ExtractError {
    #[error("Unknown type '{name}' referenced by '{referenced_by}'")]
    #[diagnostic(
        code(blueprint::extract::unknown_type),
        help("Declare '{name}' under `types:` in the same file")
    )]
    UnknownType { name: String, referenced_by: String },

    #[error("Unsupported field kind '{kind}' for field '{field}' in type '{type_name}'")]
    #[diagnostic(
        code(blueprint::extract::unsupported_kind),
        help("Supported kinds: string, integer, float, boolean, list[<kind>], optional[<kind>], or a type declared in the same file")
    )]
    UnsupportedKind {
        type_name: String,
        field: String,
        kind: String,
    },

    #[error("Type '{chain}' references itself")]
    #[diagnostic(
        code(blueprint::extract::cycle),
        help("Break the cycle; a type cannot contain or extend itself, directly or transitively")
    )]
    Cycle { chain: String },

    #[error("Field '{field}' in type '{type_name}' is reserved")]
    #[diagnostic(
        code(blueprint::extract::reserved_field),
        help("'identifier' and 'blueprint' are supplied by the system; remove the declaration")
    )]
    ReservedField { type_name: String, field: String },

    #[error("Default {value} for field '{field}' in type '{type_name}' is not a valid {kind}: {reason}")]
    #[diagnostic(
        code(blueprint::extract::invalid_default),
        help("A default must be a complete value; nested required fields need values or their own defaults")
    )]
    InvalidDefault {
        type_name: String,
        field: String,
        kind: FieldKind,
        value: Value,
        reason: String,
    },
}

/// Extract the root schema for a template whose configuration type is `root`
///
/// The identifier field is injected first; the author may not declare it.
pub fn extract_root(root: &str, types: &TypeSet) -> Result<Schema, ExtractError> {
    let mut fields = Extractor::new(types).extract_type(root, root)?;

    if let Some(reserved) = fields
        .iter()
        .find(|f| f.name == IDENTIFIER_FIELD || f.name == TEMPLATE_KEY)
    {
        return Err(ExtractError::ReservedField {
            type_name: root.to_string(),
            field: reserved.name.clone(),
        });
    }

    fields.insert(
        0,
        FieldSpec {
            name: IDENTIFIER_FIELD.to_string(),
            kind: FieldKind::String,
            required: true,
            default: None,
            description: Some("Unique identifier for this configuration (defaults to the file name)".to_string()),
            children: Vec::new(),
        },
    );

    Ok(Schema::new(fields))
}

struct Extractor<'a> {
    types: &'a TypeSet,
    /// Types currently being extracted, outermost first
    stack: Vec<String>,
}

impl<'a> Extractor<'a> {
    fn new(types: &'a TypeSet) -> Self {
        Self {
            types,
            stack: Vec::new(),
        }
    }

    fn extract_type(&mut self, name: &str, referenced_by: &str) -> Result<Vec<FieldSpec>, ExtractError> {
        if let Some(pos) = self.stack.iter().position(|t| t == name) {
            let mut chain = self.stack[pos..].to_vec();
            chain.push(name.to_string());
            return Err(ExtractError::Cycle {
                chain: chain.join(" -> "),
            });
        }

        let types = self.types;
        let decl = types.get(name).ok_or_else(|| ExtractError::UnknownType {
            name: name.to_string(),
            referenced_by: referenced_by.to_string(),
        })?;

        self.stack.push(name.to_string());

        let mut fields: Vec<FieldSpec> = Vec::new();
        for base in &decl.extends {
            for inherited in self.extract_type(base, name)? {
                place(&mut fields, inherited);
            }
        }

        for (field_name, field_decl) in &decl.fields {
            let parent = fields.iter().find(|f| &f.name == field_name);
            let spec = self.field(name, field_name, field_decl, parent)?;
            place(&mut fields, spec);
        }

        self.stack.pop();
        Ok(fields)
    }

    fn field(
        &mut self,
        type_name: &str,
        field_name: &str,
        decl: &FieldDecl,
        overridden: Option<&FieldSpec>,
    ) -> Result<FieldSpec, ExtractError> {
        let (kind, children) = self.resolve_kind(&decl.kind).map_err(|e| match e {
            KindError::Unsupported => ExtractError::UnsupportedKind {
                type_name: type_name.to_string(),
                field: field_name.to_string(),
                kind: decl.kind.clone(),
            },
            KindError::Extract(inner) => inner,
        })?;

        // An override keeps whatever it does not restate
        let default = decl
            .default
            .clone()
            .or_else(|| overridden.and_then(|p| p.default.clone()));
        let description = decl
            .description
            .clone()
            .or_else(|| overridden.and_then(|p| p.description.clone()));

        let spec = FieldSpec {
            name: field_name.to_string(),
            required: default.is_none() && !kind.is_optional(),
            kind,
            default,
            description,
            children,
        };

        if let Some(default) = &spec.default {
            if let Some(reason) = default_problem(&spec, default) {
                return Err(ExtractError::InvalidDefault {
                    type_name: type_name.to_string(),
                    field: field_name.to_string(),
                    kind: spec.kind.clone(),
                    value: default.clone(),
                    reason,
                });
            }
        }

        Ok(spec)
    }

    fn resolve_kind(&mut self, raw: &str) -> Result<(FieldKind, Vec<FieldSpec>), KindError> {
        let raw = raw.trim();

        if let Some(inner) = wrapped(raw, "list") {
            let (kind, children) = self.resolve_kind(inner)?;
            return Ok((FieldKind::list(kind), children));
        }
        if let Some(inner) = wrapped(raw, "optional") {
            let (kind, children) = self.resolve_kind(inner)?;
            return Ok((FieldKind::optional(kind), children));
        }

        let primitive = match raw {
            "string" | "str" => Some(FieldKind::String),
            "integer" | "int" => Some(FieldKind::Integer),
            "float" | "number" => Some(FieldKind::Float),
            "boolean" | "bool" => Some(FieldKind::Boolean),
            _ => None,
        };
        if let Some(kind) = primitive {
            return Ok((kind, Vec::new()));
        }

        if self.types.contains_key(raw) {
            let referenced_by = self.stack.last().cloned().unwrap_or_default();
            let children = self
                .extract_type(raw, &referenced_by)
                .map_err(KindError::Extract)?;
            return Ok((FieldKind::Object, children));
        }

        Err(KindError::Unsupported)
    }
}

/// First error a document relying on `default` would hit, if any
///
/// Nested defaults are merged in first, so `{}` stands for an object whose
/// children all have defaults of their own.
fn default_problem(spec: &FieldSpec, default: &Value) -> Option<String> {
    let schema = Schema::new(vec![spec.clone()]);
    let mut values = Map::new();
    values.insert(spec.name.clone(), default.clone());
    merge_defaults(&mut values, &schema.defaults(), &schema);

    let value = values.get(&spec.name)?;
    check_field(spec, &spec.name, value)
        .into_iter()
        .find(|d| d.is_error())
        .map(|d| d.message)
}

enum KindError {
    Unsupported,
    Extract(ExtractError),
}

/// `list[string]` with prefix `list` -> `string`
fn wrapped<'s>(raw: &'s str, prefix: &str) -> Option<&'s str> {
    raw.strip_prefix(prefix)?
        .trim_start()
        .strip_prefix('[')?
        .strip_suffix(']')
}

/// Insert a field, replacing a same-named one in its original position
fn place(fields: &mut Vec<FieldSpec>, spec: FieldSpec) {
    match fields.iter_mut().find(|f| f.name == spec.name) {
        Some(slot) => *slot = spec,
        None => fields.push(spec),
    }
}
