//! Stack parameters: a flat mapping of names to scalar values.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::TemplateError;

/// A scalar parameter value.
///
/// Numbers keep the text they were written as, so the service receives
/// exactly what the file says.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterValue {
    /// Boolean value.
    Bool(bool),
    /// Numeric value as written in the source.
    Number(String),
    /// Text value.
    Text(String),
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Number(v) | Self::Text(v) => write!(f, "{v}"),
        }
    }
}

impl From<&str> for ParameterValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ParameterValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Ordered set of stack parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Parameters {
    values: BTreeMap<String, ParameterValue>,
}

impl Parameters {
    /// Creates an empty parameter set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            values: BTreeMap::new(),
        }
    }

    /// Parses a parameters file body.
    ///
    /// Empty documents yield an empty set. A key with no value (`Key:` or
    /// `Key: ~`) holds the empty string.
    ///
    /// # Errors
    ///
    /// Returns a reason if the text is not a flat mapping of scalars.
    pub fn parse(text: &str) -> Result<Self, String> {
        let blank = text.lines().map(str::trim).all(|line| {
            line.is_empty() || line == "---" || line.starts_with('#')
        });
        if blank {
            return Ok(Self::new());
        }

        let mapping: Option<BTreeMap<String, serde_yaml::Value>> =
            serde_yaml::from_str(text).map_err(|e| e.to_string())?;

        let mut values = BTreeMap::new();
        for (key, value) in mapping.unwrap_or_default() {
            let value = match value {
                serde_yaml::Value::Null => ParameterValue::Text(String::new()),
                serde_yaml::Value::Bool(v) => ParameterValue::Bool(v),
                serde_yaml::Value::Number(n) => ParameterValue::Number(
                    source_number(text, &key, &n).unwrap_or_else(|| n.to_string()),
                ),
                serde_yaml::Value::String(v) => ParameterValue::Text(v),
                serde_yaml::Value::Sequence(_)
                | serde_yaml::Value::Mapping(_)
                | serde_yaml::Value::Tagged(_) => {
                    return Err(format!("parameter {key} must be a scalar value"));
                }
            };
            values.insert(key, value);
        }
        Ok(Self { values })
    }

    /// Renders the set as a block-style YAML document.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::Serialize`] if a key or text value cannot be serialized.
    pub fn render(&self) -> Result<String, TemplateError> {
        let mut text = String::from("---\n");
        for (key, value) in &self.values {
            let value = match value {
                ParameterValue::Bool(v) => v.to_string(),
                ParameterValue::Number(v) => v.clone(),
                ParameterValue::Text(v) => yaml_scalar(v)?,
            };
            text.push_str(&yaml_scalar(key)?);
            text.push_str(": ");
            text.push_str(&value);
            text.push('\n');
        }
        Ok(text)
    }

    /// Sets a parameter, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParameterValue>) {
        self.values.insert(key.into(), value.into());
    }

    /// Looks up a parameter.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ParameterValue> {
        self.values.get(key)
    }

    /// Returns true if the set has no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Iterates over parameters in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParameterValue)> {
        self.values.iter()
    }

    /// Key/value pairs in the service's textual form.
    #[must_use]
    pub fn as_pairs(&self) -> Vec<(String, String)> {
        self.values
            .iter()
            .map(|(k, v)| (k.clone(), v.to_string()))
            .collect()
    }
}

impl<K: Into<String>, V: Into<ParameterValue>> FromIterator<(K, V)> for Parameters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Finds the text a top-level numeric value was written as.
///
/// Only plain `Key: value` lines are recognised, and the text must parse
/// back to the same number.
fn source_number(text: &str, key: &str, number: &serde_yaml::Number) -> Option<String> {
    let written = text
        .lines()
        .filter(|line| !line.starts_with([' ', '\t', '#']))
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().trim_matches(['"', '\'']) == key)
        .map(|(_, value)| value.split(" #").next().unwrap_or(value).trim().to_string())?;

    match serde_yaml::from_str::<serde_yaml::Value>(&written) {
        Ok(serde_yaml::Value::Number(parsed)) if parsed == *number => Some(written),
        _ => None,
    }
}

fn yaml_scalar(value: &str) -> Result<String, TemplateError> {
    serde_yaml::to_string(value)
        .map(|text| text.trim_end_matches('\n').to_string())
        .map_err(|e| TemplateError::Serialize {
            format: String::from("YAML"),
            reason: e.to_string(),
        })
}
