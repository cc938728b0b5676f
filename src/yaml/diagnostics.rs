//! Human-readable rendering of diagnostics
//!
//! [`format_report`] turns a validation [`Diagnostic`] into a plain-text
//! report with file context. [`YamlSyntaxError`] is the miette flavour used
//! when a template definition file itself fails to parse.

use miette::{NamedSource, SourceSpan};
use std::fmt::Write as _;
use thiserror::Error;

use crate::core::diagnostic::{Diagnostic, DiagnosticKind};
use crate::yaml::locate::parent_path;

/// Lines of context shown before the offending line
const CONTEXT_BEFORE: usize = 2;
/// Lines of context shown after the offending line
const CONTEXT_AFTER: usize = 1;

/// Render one diagnostic against the document it was found in
///
/// Never fails: when the location is unknown or outside `source`, the
/// context block is left out and only the summary, hint, and suggestions
/// are printed.
pub fn format_report(diagnostic: &Diagnostic, source: &str, file_name: &str) -> String {
    let mut out = String::new();

    let position = match diagnostic.location {
        Some(loc) => format!("{}:{}", file_name, loc.line),
        None => file_name.to_string(),
    };
    let _ = writeln!(
        out,
        "{}[{}] {}: {}",
        diagnostic.severity, diagnostic.kind, position, diagnostic.message
    );

    if let Some(loc) = diagnostic.location {
        write_context(&mut out, source, loc.line, loc.column);
    }

    if diagnostic.kind == DiagnosticKind::MissingRequiredField {
        if let Some(hint) = add_line_hint(diagnostic) {
            let _ = writeln!(out, "  = help: {}", hint);
        }
    }

    for suggestion in &diagnostic.suggestions {
        let _ = writeln!(out, "  = suggestion: {}", suggestion);
    }

    out
}

fn write_context(out: &mut String, source: &str, line: usize, column: usize) {
    let lines: Vec<&str> = source.lines().collect();
    if line == 0 || line > lines.len() {
        return;
    }

    let first = line.saturating_sub(CONTEXT_BEFORE).max(1);
    let last = (line + CONTEXT_AFTER).min(lines.len());
    let width = last.to_string().len();

    for number in first..=last {
        let marker = if number == line { '>' } else { ' ' };
        let _ = writeln!(
            out,
            "{}{:>width$} | {}",
            marker,
            number,
            lines[number - 1],
            width = width
        );
        if number == line {
            let _ = writeln!(
                out,
                " {:>width$} | {}^",
                "",
                " ".repeat(column.saturating_sub(1)),
                width = width
            );
        }
    }
}

/// "Add this line" hint for a missing field: `name: <example>` under its parent
fn add_line_hint(diagnostic: &Diagnostic) -> Option<String> {
    let expected = diagnostic.expected.as_ref()?;
    let path = diagnostic.field_path.as_str();
    let parent = parent_path(path);
    let name = if parent.is_empty() {
        path
    } else {
        path[parent.len()..].trim_start_matches('.')
    };

    let line = format!("{}: {}", name, expected.example());
    Some(if parent.is_empty() {
        format!("add this line: `{}`", line)
    } else {
        format!("add this line under `{}`: `{}`", parent, line)
    })
}

/// YAML syntax error in a template definition file
#[derive(Debug, Error, miette::Diagnostic)]
#[error("YAML syntax error: {message}")]
#[diagnostic(code(blueprint::yaml::syntax))]
pub struct YamlSyntaxError {
    #[source_code]
    src: NamedSource<String>,

    #[label("error here")]
    span: SourceSpan,

    #[help]
    help: Option<String>,

    message: String,
}

impl YamlSyntaxError {
    /// Build from a serde_yml error, pointing at the reported location
    pub fn from_serde_error(err: &serde_yml::Error, source: &str, file_name: &str) -> Self {
        let (line, column) = err
            .location()
            .map(|loc| (loc.line(), loc.column()))
            .unwrap_or((1, 1));

        let offset = line_col_to_offset(source, line, column);
        let message = err.to_string();
        let help = generate_help(&message);

        Self {
            src: NamedSource::new(file_name, source.to_string()),
            span: SourceSpan::from(offset..offset.saturating_add(1)),
            help,
            message,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Convert a 1-based line/column to a byte offset, clamped to the source
fn line_col_to_offset(source: &str, line: usize, column: usize) -> usize {
    let mut line_start = 0;
    for (idx, text) in source.split_inclusive('\n').enumerate() {
        if idx + 1 == line {
            let body = text.trim_end_matches('\n');
            let col_offset = body
                .char_indices()
                .nth(column.saturating_sub(1))
                .map(|(i, _)| i)
                .unwrap_or(body.len());
            return line_start + col_offset;
        }
        line_start += text.len();
    }
    source.len().saturating_sub(1)
}

/// Hint for common YAML mistakes, keyed off the parser message
pub(crate) fn generate_help(message: &str) -> Option<String> {
    let msg_lower = message.to_lowercase();

    if msg_lower.contains("expected ','") || msg_lower.contains("expected comma") {
        return Some("Add commas between list items: [item1, item2, item3]".to_string());
    }

    if msg_lower.contains("tab") {
        return Some(
            "YAML requires spaces for indentation, not tabs. Replace tabs with spaces.".to_string(),
        );
    }

    if msg_lower.contains("duplicate") {
        return Some("Each key can only appear once. Remove or rename the duplicate key.".to_string());
    }

    if msg_lower.contains("expected block end") || msg_lower.contains("did not find expected key") {
        return Some("Check your indentation - it may be inconsistent.".to_string());
    }

    if msg_lower.contains("mapping values are not allowed") {
        return Some("You may be missing a space after ':' or have incorrect indentation.".to_string());
    }

    if msg_lower.contains("found unexpected ':'") {
        return Some("Colons in values need to be quoted: \"value:with:colons\"".to_string());
    }

    if msg_lower.contains('@') || msg_lower.contains("special character") {
        return Some("Special characters like @ need to be quoted: \"@value\"".to_string());
    }

    None
}
