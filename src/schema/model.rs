//! Schema model - the canonical parameter tree of a template
//!
//! A [`Schema`] is an ordered list of [`FieldSpec`]s. Object-valued fields
//! (and lists of objects) carry their nested fields in `children`. Schemas
//! are produced once by the extractor and never mutated afterwards.

use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use serde_json::{json, Map, Value};
use std::fmt;

/// Name of the implicit identifier field injected into every root schema
pub const IDENTIFIER_FIELD: &str = "identifier";

/// Document key naming the template a document instantiates
pub const TEMPLATE_KEY: &str = "blueprint";

/// Kind of value a field accepts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Integer,
    Float,
    Boolean,
    Object,
    List(Box<FieldKind>),
    Optional(Box<FieldKind>),
}

impl FieldKind {
    pub fn list(inner: FieldKind) -> Self {
        FieldKind::List(Box::new(inner))
    }

    pub fn optional(inner: FieldKind) -> Self {
        FieldKind::Optional(Box::new(inner))
    }

    pub fn is_optional(&self) -> bool {
        matches!(self, FieldKind::Optional(_))
    }

    /// Kind with any optional wrapper removed
    pub fn unwrap_optional(&self) -> &FieldKind {
        match self {
            FieldKind::Optional(inner) => inner.unwrap_optional(),
            other => other,
        }
    }

    /// True when the innermost kind is an object, so the field has children
    pub fn holds_object(&self) -> bool {
        match self {
            FieldKind::Object => true,
            FieldKind::List(inner) | FieldKind::Optional(inner) => inner.holds_object(),
            _ => false,
        }
    }

    /// Check the top level of a value against this kind (no recursion into children)
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            FieldKind::String => value.is_string(),
            FieldKind::Integer => value.is_i64() || value.is_u64(),
            FieldKind::Float => value.is_number(),
            FieldKind::Boolean => value.is_boolean(),
            FieldKind::Object => value.is_object(),
            FieldKind::List(_) => value.is_array(),
            FieldKind::Optional(inner) => value.is_null() || inner.matches(value),
        }
    }

    /// Example value used in "add this line" suggestions and describe output
    pub fn example(&self) -> String {
        match self {
            FieldKind::String => "\"example\"".to_string(),
            FieldKind::Integer => "1".to_string(),
            FieldKind::Float => "1.0".to_string(),
            FieldKind::Boolean => "true".to_string(),
            FieldKind::Object => "{}".to_string(),
            FieldKind::List(inner) => format!("[{}]", inner.example()),
            FieldKind::Optional(inner) => inner.example(),
        }
    }

    /// Parse a line of user input (prompt answer or `key=value` override)
    pub fn parse_input(&self, input: &str) -> Result<Value, String> {
        let trimmed = input.trim();
        match self {
            FieldKind::String => Ok(Value::String(input.to_string())),
            FieldKind::Integer => trimmed
                .parse::<i64>()
                .map(Value::from)
                .map_err(|_| format!("expected an integer, got '{}'", trimmed)),
            FieldKind::Float => trimmed
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| format!("expected a number, got '{}'", trimmed)),
            FieldKind::Boolean => match trimmed.to_lowercase().as_str() {
                "true" | "yes" | "y" | "on" | "1" => Ok(Value::Bool(true)),
                "false" | "no" | "n" | "off" | "0" => Ok(Value::Bool(false)),
                _ => Err(format!("expected true or false, got '{}'", trimmed)),
            },
            FieldKind::Optional(inner) => match trimmed {
                "" | "~" | "null" => Ok(Value::Null),
                _ => inner.parse_input(input),
            },
            FieldKind::List(inner) => {
                if trimmed.starts_with('[') {
                    return parse_flow(trimmed)
                        .filter(Value::is_array)
                        .ok_or_else(|| format!("expected a list like [a, b], got '{}'", trimmed));
                }
                if trimmed.is_empty() {
                    return Ok(Value::Array(Vec::new()));
                }
                trimmed
                    .split(',')
                    .map(|item| inner.parse_input(item.trim()))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array)
            }
            FieldKind::Object => parse_flow(trimmed)
                .filter(Value::is_object)
                .ok_or_else(|| format!("expected a mapping like {{key: value}}, got '{}'", trimmed)),
        }
    }

    /// JSON Schema fragment for this kind
    fn json_schema(&self, children: &[FieldSpec]) -> Value {
        match self {
            FieldKind::String => json!({ "type": "string" }),
            FieldKind::Integer => json!({ "type": "integer" }),
            FieldKind::Float => json!({ "type": "number" }),
            FieldKind::Boolean => json!({ "type": "boolean" }),
            FieldKind::Object => object_json_schema(children),
            FieldKind::List(inner) => json!({ "type": "array", "items": inner.json_schema(children) }),
            FieldKind::Optional(inner) => {
                json!({ "anyOf": [inner.json_schema(children), { "type": "null" }] })
            }
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::String => f.write_str("string"),
            FieldKind::Integer => f.write_str("integer"),
            FieldKind::Float => f.write_str("float"),
            FieldKind::Boolean => f.write_str("boolean"),
            FieldKind::Object => f.write_str("object"),
            FieldKind::List(inner) => write!(f, "list[{}]", inner),
            FieldKind::Optional(inner) => write!(f, "optional[{}]", inner),
        }
    }
}

impl Serialize for FieldKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Parse a YAML flow snippet such as `[a, b]` or `{k: v}`
fn parse_flow(input: &str) -> Option<Value> {
    let yaml: serde_yml::Value = serde_yml::from_str(input).ok()?;
    serde_json::to_value(yaml).ok()
}

/// Name of a value's kind as shown in diagnostics
pub fn value_kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

/// One field of a schema
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<FieldSpec>,
}

impl FieldSpec {
    pub fn child(&self, name: &str) -> Option<&FieldSpec> {
        self.children.iter().find(|c| c.name == name)
    }
}

/// Root schema of a template
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Schema {
    pub fields: Vec<FieldSpec>,
}

impl Schema {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self { fields }
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Names of required fields, in declaration order
    pub fn required_fields(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name.as_str())
            .collect()
    }

    /// Look up a field by dotted path; list indices (`[0]`, `[]`) are ignored
    pub fn lookup(&self, path: &str) -> Option<&FieldSpec> {
        let mut segments = path.split('.').map(strip_index);
        let first = segments.next()?;
        let mut current = self.field(first)?;
        for segment in segments {
            current = current.child(segment)?;
        }
        Some(current)
    }

    /// Flattened defaults keyed by full field path, in pre-order
    ///
    /// Nested object fields contribute `parent.child`; fields inside list
    /// elements contribute `parent[].child`, meaning "every element".
    pub fn defaults(&self) -> IndexMap<String, Value> {
        let mut defaults = IndexMap::new();
        collect_defaults(&self.fields, "", &mut defaults);
        defaults
    }

    /// Export as a draft-07 JSON Schema for editor integration
    pub fn to_json_schema(&self, template: &str, title: &str) -> Value {
        let mut root = object_json_schema(&self.fields);
        if let Some(obj) = root.as_object_mut() {
            // The identifier is derived from the file name when omitted
            if let Some(Value::Array(required)) = obj.get_mut("required") {
                required.retain(|r| r != IDENTIFIER_FIELD);
                required.insert(0, Value::String(TEMPLATE_KEY.to_string()));
            }
            if let Some(Value::Object(props)) = obj.get_mut("properties") {
                let mut ordered = Map::new();
                ordered.insert(
                    TEMPLATE_KEY.to_string(),
                    json!({
                        "type": "string",
                        "const": template,
                        "description": "The blueprint template to use",
                    }),
                );
                ordered.extend(std::mem::take(props));
                *props = ordered;
            }
            obj.insert("$schema".into(), json!("http://json-schema.org/draft-07/schema#"));
            obj.insert("title".into(), json!(title));
        }
        root
    }
}

fn strip_index(segment: &str) -> &str {
    segment.find('[').map(|i| &segment[..i]).unwrap_or(segment)
}

fn collect_defaults(fields: &[FieldSpec], prefix: &str, out: &mut IndexMap<String, Value>) {
    for field in fields {
        let path = if prefix.is_empty() {
            field.name.clone()
        } else {
            format!("{}.{}", prefix, field.name)
        };
        if let Some(default) = &field.default {
            out.insert(path.clone(), default.clone());
        }
        if field.children.is_empty() {
            continue;
        }
        if matches!(field.kind.unwrap_optional(), FieldKind::List(_)) {
            collect_defaults(&field.children, &format!("{}[]", path), out);
        } else {
            collect_defaults(&field.children, &path, out);
        }
    }
}

fn object_json_schema(fields: &[FieldSpec]) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();
    for field in fields {
        let mut schema = field.kind.json_schema(&field.children);
        if let Some(obj) = schema.as_object_mut() {
            if let Some(desc) = &field.description {
                obj.insert("description".into(), json!(desc));
            }
            if let Some(default) = &field.default {
                obj.insert("default".into(), default.clone());
            }
        }
        if field.required {
            required.push(Value::String(field.name.clone()));
        }
        properties.insert(field.name.clone(), schema);
    }
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str, kind: FieldKind) -> FieldSpec {
        FieldSpec {
            name: name.to_string(),
            required: !kind.is_optional(),
            kind,
            default: None,
            description: None,
            children: Vec::new(),
        }
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(FieldKind::list(FieldKind::String).to_string(), "list[string]");
        assert_eq!(
            FieldKind::optional(FieldKind::list(FieldKind::Integer)).to_string(),
            "optional[list[integer]]"
        );
    }

    #[test]
    fn test_kind_matches() {
        assert!(FieldKind::Integer.matches(&json!(2)));
        assert!(!FieldKind::Integer.matches(&json!(2.5)));
        assert!(!FieldKind::Integer.matches(&json!("two")));
        assert!(FieldKind::Float.matches(&json!(2)));
        assert!(FieldKind::optional(FieldKind::String).matches(&Value::Null));
        assert!(!FieldKind::String.matches(&Value::Null));
    }

    #[test]
    fn test_parse_input() {
        assert_eq!(FieldKind::Integer.parse_input(" 3 ").unwrap(), json!(3));
        assert!(FieldKind::Integer.parse_input("three").is_err());
        assert_eq!(FieldKind::Boolean.parse_input("yes").unwrap(), json!(true));
        assert_eq!(
            FieldKind::list(FieldKind::String).parse_input("a, b").unwrap(),
            json!(["a", "b"])
        );
        assert_eq!(
            FieldKind::list(FieldKind::Integer).parse_input("[1, 2]").unwrap(),
            json!([1, 2])
        );
        assert_eq!(FieldKind::optional(FieldKind::Integer).parse_input("").unwrap(), Value::Null);
        assert_eq!(FieldKind::Object.parse_input("{a: 1}").unwrap(), json!({"a": 1}));
    }

    #[test]
    fn test_defaults_are_path_scoped() {
        let mut retry = field("retry", FieldKind::Object);
        let mut count = field("count", FieldKind::Integer);
        count.default = Some(json!(2));
        let mut delay = field("delay", FieldKind::Integer);
        delay.default = Some(json!(30));
        retry.children = vec![count, delay];

        let mut sources = field("sources", FieldKind::list(FieldKind::Object));
        let mut format = field("format", FieldKind::String);
        format.default = Some(json!("csv"));
        sources.children = vec![field("table", FieldKind::String), format];

        let schema = Schema::new(vec![retry, sources]);
        let defaults = schema.defaults();
        let keys: Vec<&str> = defaults.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["retry.count", "retry.delay", "sources[].format"]);
    }

    #[test]
    fn test_lookup_ignores_indices() {
        let mut sources = field("sources", FieldKind::list(FieldKind::Object));
        sources.children = vec![field("table", FieldKind::String)];
        let schema = Schema::new(vec![sources]);
        assert_eq!(schema.lookup("sources[2].table").unwrap().name, "table");
        assert!(schema.lookup("sources.missing").is_none());
    }

    #[test]
    fn test_json_schema_export() {
        let schema = Schema::new(vec![
            field(IDENTIFIER_FIELD, FieldKind::String),
            field("job_id", FieldKind::String),
        ]);
        let exported = schema.to_json_schema("daily_etl", "DailyETL Configuration");
        assert_eq!(exported["required"], json!(["blueprint", "job_id"]));
        assert_eq!(exported["properties"]["blueprint"]["const"], json!("daily_etl"));
        let first_key = exported["properties"].as_object().unwrap().keys().next().unwrap();
        assert_eq!(first_key, "blueprint");
    }
}
