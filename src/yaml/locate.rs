//! Source locations for keys in block-style YAML
//!
//! serde_yml hands back values without spans, so diagnostics locate fields by
//! scanning the raw text with an indentation stack. Every block mapping key
//! and list item gets a 1-based (line, column); anything written in flow style
//! (`{a: 1}`, `[x, y]`) resolves to its nearest located ancestor.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// 1-based position in a source document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl Location {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Debug)]
struct Frame {
    indent: usize,
    path: String,
    is_item: bool,
}

/// Field path -> location index for one document
#[derive(Debug, Clone, Default)]
pub struct KeyLocations {
    paths: HashMap<String, Location>,
}

impl KeyLocations {
    /// Index every key path in `source`
    pub fn index(source: &str) -> Self {
        let mut paths = HashMap::new();
        let mut stack: Vec<Frame> = Vec::new();
        let mut item_counts: HashMap<String, usize> = HashMap::new();

        for (line_idx, raw) in source.lines().enumerate() {
            let line_no = line_idx + 1;
            let trimmed = raw.trim_start_matches(' ');
            if trimmed.is_empty()
                || trimmed.starts_with('#')
                || trimmed.starts_with("---")
                || trimmed.starts_with("...")
            {
                continue;
            }

            let mut indent = raw.len() - trimmed.len();
            let mut content = trimmed;

            // "- a", "- key: v", "- - nested"
            while content == "-" || content.starts_with("- ") {
                while stack
                    .last()
                    .is_some_and(|f| f.indent > indent || (f.indent == indent && f.is_item))
                {
                    stack.pop();
                }
                let parent = stack.last().map(|f| f.path.clone()).unwrap_or_default();
                let count = item_counts.entry(parent.clone()).or_insert(0);
                let item_path = format!("{}[{}]", parent, count);
                *count += 1;
                paths
                    .entry(item_path.clone())
                    .or_insert(Location::new(line_no, indent + 1));
                stack.push(Frame {
                    indent,
                    path: item_path,
                    is_item: true,
                });

                let rest = content[1..].trim_start_matches(' ');
                indent += content.len() - rest.len();
                content = rest;
            }

            let Some(key) = mapping_key(content) else {
                continue;
            };

            while stack.last().is_some_and(|f| f.indent >= indent) {
                stack.pop();
            }
            let path = match stack.last() {
                Some(parent) => format!("{}.{}", parent.path, key),
                None => key,
            };
            paths
                .entry(path.clone())
                .or_insert(Location::new(line_no, indent + 1));
            stack.push(Frame {
                indent,
                path,
                is_item: false,
            });
        }

        Self { paths }
    }

    /// Exact location of a path
    pub fn get(&self, path: &str) -> Option<Location> {
        self.paths.get(path).copied()
    }

    /// Location of a path, or of its nearest located ancestor
    pub fn nearest(&self, path: &str) -> Option<Location> {
        let mut current = path;
        loop {
            if current.is_empty() {
                return None;
            }
            if let Some(loc) = self.get(current) {
                return Some(loc);
            }
            current = parent_path(current);
        }
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Parent of a dotted/indexed path: `a.b[2].c` -> `a.b[2]` -> `a.b` -> `a` -> ``
pub fn parent_path(path: &str) -> &str {
    let cut = match (path.rfind('.'), path.rfind('[')) {
        (Some(dot), Some(bracket)) => dot.max(bracket),
        (Some(dot), None) => dot,
        (None, Some(bracket)) => bracket,
        (None, None) => 0,
    };
    &path[..cut]
}

/// Extract the key from a `key: value` / `key:` line
fn mapping_key(content: &str) -> Option<String> {
    let (raw_key, _) = if let Some(stripped) = content.strip_suffix(':') {
        (stripped, "")
    } else {
        content.split_once(": ")?
    };

    let raw_key = raw_key.trim();
    if raw_key.is_empty() || raw_key.starts_with(['{', '[', '#', '|', '>']) {
        return None;
    }

    let unquoted = raw_key
        .strip_prefix('"')
        .and_then(|k| k.strip_suffix('"'))
        .or_else(|| raw_key.strip_prefix('\'').and_then(|k| k.strip_suffix('\'')))
        .unwrap_or(raw_key);

    // A space inside an unquoted key means this is prose, not a mapping key
    if unquoted.len() == raw_key.len() && raw_key.contains(' ') {
        return None;
    }

    Some(unquoted.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "\
# comment
blueprint: daily_etl
job_id: x
retry:
  count: 3
  delay: 10
sources:
  - table: raw.a
    format: csv
  - table: raw.b
tags:
- one
- two
";

    #[test]
    fn test_top_level_keys() {
        let locs = KeyLocations::index(DOC);
        assert_eq!(locs.get("blueprint"), Some(Location::new(2, 1)));
        assert_eq!(locs.get("job_id"), Some(Location::new(3, 1)));
    }

    #[test]
    fn test_nested_keys() {
        let locs = KeyLocations::index(DOC);
        assert_eq!(locs.get("retry.count"), Some(Location::new(5, 3)));
        assert_eq!(locs.get("retry.delay"), Some(Location::new(6, 3)));
    }

    #[test]
    fn test_list_items() {
        let locs = KeyLocations::index(DOC);
        assert_eq!(locs.get("sources[0]"), Some(Location::new(8, 3)));
        assert_eq!(locs.get("sources[0].table"), Some(Location::new(8, 5)));
        assert_eq!(locs.get("sources[0].format"), Some(Location::new(9, 5)));
        assert_eq!(locs.get("sources[1].table"), Some(Location::new(10, 5)));
        // Items at the same indentation as their key
        assert_eq!(locs.get("tags[1]"), Some(Location::new(13, 1)));
    }

    #[test]
    fn test_nearest_falls_back_to_ancestor() {
        let locs = KeyLocations::index("retry: {count: 3}\n");
        assert_eq!(locs.nearest("retry.count"), Some(Location::new(1, 1)));
        assert_eq!(locs.nearest("missing"), None);
    }

    #[test]
    fn test_parent_path() {
        assert_eq!(parent_path("a.b[2].c"), "a.b[2]");
        assert_eq!(parent_path("a.b[2]"), "a.b");
        assert_eq!(parent_path("a"), "");
    }

    #[test]
    fn test_quoted_keys_and_prose() {
        let locs = KeyLocations::index("\"quoted key\": 1\ndescription: |\n  some text: here\n");
        assert!(locs.get("quoted key").is_some());
        // Block scalar body is indexed under its key but never shadows real keys
        assert!(locs.get("description").is_some());
        assert!(locs.get("some text").is_none());
    }
}
