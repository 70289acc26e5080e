//! Canonical rendering of template documents.
//!
//! JSON output is pretty-printed with recursively sorted keys and then
//! compacted by an ordered list of text rewrite rules, so short intrinsic
//! function calls and tag pairs stay on one line. The rules run in order
//! and that order is part of the output format.
//!
//! YAML rendered from a document is block style behind a `---` document
//! marker. YAML source text keeps its body as written: only the document
//! marker and the trailing newline are normalized, so comments and scalar
//! quoting survive.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::TemplateError;

use super::format::{Document, TemplateFormat};

/// YAML document start marker.
const DOCUMENT_MARKER: &str = "---";

/// Ordered compaction rules: pattern and replacement.
const COMPACTION_RULES: &[(&str, &str)] = &[
    // attribute lookups
    (
        r#"\{\s*("Fn::GetAtt")\s*:\s*\[\s*("\S+")\s*,\s*("\S+")\s*\]\s*\}"#,
        "{ ${1}: [ ${2}, ${3} ] }",
    ),
    (
        r#"\{\s*("Fn::Select")\s*:\s*\[\s*("\d+")\s*,\s*(\{[^}]+\})\s*\]\s*\}"#,
        "{ ${1}: [ ${2}, ${3} ] }",
    ),
    (r#"\{\s*("Fn::GetAZs")\s*:\s*("\S*")\s*\}"#, "{ ${1}: ${2} }"),
    (r#"\{\s*("Ref")\s*:\s*("\S+")\s*\}"#, "{ ${1}: ${2} }"),
    // name/value and key/value pairs
    (
        r#"\{\s*("Name"):\s*("\S+"),\s*("Value"):\s*("\S*")\s*\}"#,
        "{ ${1}: ${2}, ${3}: ${4} }",
    ),
    (
        r#"\{\s*("Key"):\s*("\S+"),\s*("Value"):\s*("[\S ]*")\s*\}"#,
        "{ ${1}: ${2}, ${3}: ${4} }",
    ),
    (
        r#"\{\s*("Key"):\s*("\S+"),\s*("Value"):\s*(\{[^}]*\})\s*\}"#,
        "{ ${1}: ${2}, ${3}: ${4} }",
    ),
    (
        r#"\{\s*("Field"):\s*("\S+"),\s*("Values"):\s*\[\s*(\S+)\s*\]\s*\}"#,
        "{ ${1}: ${2}, ${3}: [ ${4} ] }",
    ),
    // single element lists
    (r"\[\n\r?\s*([^\n]*)\n\r?\s*\](,?)", "[ ${1} ]${2}"),
    // trailing whitespace
    (r"(?m)\s+$", ""),
    // newline string fragments of Fn::Join bodies
    (r#"([^\n]*)\n\s*("\\n",?)"#, "${1}${2}"),
];

/// A compiled compaction rule.
struct CompactionRule {
    pattern: Regex,
    replacement: &'static str,
}

#[allow(clippy::expect_used)]
static RULES: LazyLock<Vec<CompactionRule>> = LazyLock::new(|| {
    COMPACTION_RULES
        .iter()
        .map(|(pattern, replacement)| CompactionRule {
            pattern: Regex::new(pattern).expect("compaction pattern must compile"),
            replacement,
        })
        .collect()
});

/// Renders a document in its own format's canonical text.
///
/// # Errors
///
/// Returns [`TemplateError::Serialize`] if the document cannot be rendered.
pub fn render(document: &Document) -> Result<String, TemplateError> {
    match document {
        Document::Json(value) => render_json(value),
        Document::Yaml(value) => render_yaml(value),
    }
}

/// Canonical JSON text of a value.
///
/// # Errors
///
/// Returns [`TemplateError::Serialize`] if the value cannot be serialized.
pub fn render_json(value: &serde_json::Value) -> Result<String, TemplateError> {
    let pretty = serde_json::to_string_pretty(&sort_keys(value))
        .map_err(|e| serialize_error(TemplateFormat::Json, e))?;

    let mut text = compact(&pretty);
    text.push('\n');
    Ok(text)
}

/// Canonical YAML text of a value.
///
/// # Errors
///
/// Returns [`TemplateError::Serialize`] if the value cannot be serialized.
pub fn render_yaml(value: &serde_yaml::Value) -> Result<String, TemplateError> {
    let body =
        serde_yaml::to_string(value).map_err(|e| serialize_error(TemplateFormat::Yaml, e))?;
    Ok(format!("{DOCUMENT_MARKER}\n{body}"))
}

/// Canonical form of YAML source text.
///
/// Leading blank lines and an existing `---` marker are dropped, one marker
/// is written first and the body ends with a single newline. Comments ahead
/// of an existing marker move below it.
#[must_use]
pub fn normalize_yaml(text: &str) -> String {
    let mut lines: Vec<&str> = text
        .lines()
        .skip_while(|line| line.trim().is_empty())
        .collect();

    let preamble = lines
        .iter()
        .take_while(|line| {
            let line = line.trim();
            line.is_empty() || line.starts_with('#')
        })
        .count();
    if lines
        .get(preamble)
        .is_some_and(|line| line.trim_end() == DOCUMENT_MARKER)
    {
        lines.remove(preamble);
    }

    let body = lines.join("\n");
    let body = body.trim_end();
    if body.is_empty() {
        format!("{DOCUMENT_MARKER}\n")
    } else {
        format!("{DOCUMENT_MARKER}\n{body}\n")
    }
}

/// Applies every compaction rule, in order, to pretty-printed JSON.
fn compact(text: &str) -> String {
    RULES.iter().fold(text.to_string(), |acc, rule| {
        rule.pattern
            .replace_all(&acc, rule.replacement)
            .into_owned()
    })
}

/// Rebuilds a JSON value with every object's keys in sorted order.
fn sort_keys(value: &serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));
            serde_json::Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.clone(), sort_keys(v)))
                    .collect(),
            )
        }
        serde_json::Value::Array(items) => {
            serde_json::Value::Array(items.iter().map(sort_keys).collect())
        }
        other => other.clone(),
    }
}

fn serialize_error(format: TemplateFormat, reason: impl std::fmt::Display) -> TemplateError {
    TemplateError::Serialize {
        format: format.to_string(),
        reason: reason.to_string(),
    }
}
