//! Template format tag and the structured document it parses into.
//!
//! All format-specific parsing lives here; rendering lives in
//! [`super::canonical`]. The tag is chosen once, at detection or
//! construction time, and every later operation dispatches on it.

use std::fmt;
use std::str::FromStr;

use crate::error::TemplateError;

/// Serialization format of a template document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TemplateFormat {
    /// JSON text.
    Json,
    /// YAML text.
    Yaml,
}

/// A parsed template document.
///
/// YAML documents keep their own value type so short-form tags such as
/// `!Ref` and the author's key order survive a round trip.
#[derive(Debug, Clone, PartialEq)]
pub enum Document {
    /// Document parsed from JSON.
    Json(serde_json::Value),
    /// Document parsed from YAML.
    Yaml(serde_yaml::Value),
}

impl TemplateFormat {
    /// Formats in detection priority order.
    pub const DETECTION_ORDER: [Self; 2] = [Self::Json, Self::Yaml];

    /// File extension used for template files of this format.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Yaml => "yaml",
        }
    }

    /// Template file name for this format.
    #[must_use]
    pub fn file_name(self) -> String {
        format!("template.{}", self.extension())
    }

    /// Parses text strictly as this format.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::FormatMismatch`] if the text is not valid in this format.
    pub fn parse(self, text: &str) -> Result<Document, TemplateError> {
        match self {
            Self::Json => serde_json::from_str(text)
                .map(Document::Json)
                .map_err(|e| TemplateError::mismatch(self, e)),
            Self::Yaml => serde_yaml::from_str(text)
                .map(Document::Yaml)
                .map_err(|e| TemplateError::mismatch(self, e)),
        }
    }

    /// Detects the format of raw text by trying each format in priority order.
    ///
    /// The first format that parses wins.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::UndetectableFormat`] if no format parses the text.
    pub fn detect(text: &str) -> Result<(Self, Document), TemplateError> {
        let mut last_reason = String::new();

        for format in Self::DETECTION_ORDER {
            match format.parse(text) {
                Ok(document) => return Ok((format, document)),
                Err(e) => last_reason = e.to_string(),
            }
        }

        Err(TemplateError::UndetectableFormat {
            reason: last_reason,
        })
    }
}

impl fmt::Display for TemplateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Json => "JSON",
            Self::Yaml => "YAML",
        };
        write!(f, "{name}")
    }
}

impl FromStr for TemplateFormat {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            other => Err(TemplateError::InvalidFormat(other.to_string())),
        }
    }
}

impl Document {
    /// Format this document was parsed from.
    #[must_use]
    pub const fn format(&self) -> TemplateFormat {
        match self {
            Self::Json(_) => TemplateFormat::Json,
            Self::Yaml(_) => TemplateFormat::Yaml,
        }
    }

    /// Converts the document to the given format.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::Conversion`] if the document uses constructs
    /// the target format cannot express (YAML tags, non-string keys).
    pub fn convert(self, format: TemplateFormat) -> Result<Self, TemplateError> {
        match (self, format) {
            (doc @ Self::Json(_), TemplateFormat::Json) | (doc @ Self::Yaml(_), TemplateFormat::Yaml) => {
                Ok(doc)
            }
            (Self::Json(value), TemplateFormat::Yaml) => serde_yaml::to_value(value)
                .map(Self::Yaml)
                .map_err(|e| conversion_error(format, e)),
            (Self::Yaml(value), TemplateFormat::Json) => {
                if contains_tags(&value) {
                    return Err(conversion_error(
                        format,
                        "short-form YAML tags have no JSON equivalent",
                    ));
                }
                serde_json::to_value(value)
                    .map(Self::Json)
                    .map_err(|e| conversion_error(format, e))
            }
        }
    }

    /// Format-independent JSON view used for fingerprinting.
    ///
    /// YAML tags are kept as single-key `{"!Tag": value}` mappings.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::Conversion`] if a mapping key cannot be a JSON key.
    pub fn fingerprint_value(&self) -> Result<serde_json::Value, TemplateError> {
        match self {
            Self::Json(value) => Ok(value.clone()),
            Self::Yaml(value) => serde_json::to_value(value)
                .map_err(|e| conversion_error(TemplateFormat::Json, e)),
        }
    }
}

fn conversion_error(format: TemplateFormat, reason: impl fmt::Display) -> TemplateError {
    TemplateError::Conversion {
        format: format.to_string(),
        reason: reason.to_string(),
    }
}

/// Returns true if any node of the YAML tree carries an explicit tag.
fn contains_tags(value: &serde_yaml::Value) -> bool {
    match value {
        serde_yaml::Value::Tagged(_) => true,
        serde_yaml::Value::Sequence(items) => items.iter().any(contains_tags),
        serde_yaml::Value::Mapping(map) => map
            .iter()
            .any(|(k, v)| contains_tags(k) || contains_tags(v)),
        _ => false,
    }
}
