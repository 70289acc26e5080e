//! Output formatting for CLI commands.
//!
//! This module provides formatting utilities for displaying
//! information to the user as tables or JSON.

use std::collections::BTreeMap;
use std::fmt::Write;

use colored::Colorize;
use serde::Serialize;
use tabled::{Table, Tabled};

use crate::error::Result;
use crate::remote::{ChangeRow, ChangeSetSummary, StackResource};
use crate::template::render_json;

use super::commands::OutputFormat;

/// Status shown for stacks that only exist locally.
pub const LOCAL_ONLY: &str = "LOCAL_ONLY";

/// Output formatter for CLI.
#[derive(Debug, Clone, Copy)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Stack row for table display.
#[derive(Tabled)]
struct StackRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
}

/// Key/value row for parameters and outputs.
#[derive(Tabled)]
struct ValueRow<'a> {
    #[tabled(rename = "Key")]
    key: &'a str,
    #[tabled(rename = "Value")]
    value: &'a str,
}

/// Resource row for table display.
#[derive(Tabled)]
struct ResourceRow<'a> {
    #[tabled(rename = "Resource")]
    logical_id: &'a str,
    #[tabled(rename = "Type")]
    resource_type: &'a str,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "PhysicalId")]
    physical_id: &'a str,
}

/// Change-set row for table display.
#[derive(Tabled)]
struct ChangeSetRow<'a> {
    #[tabled(rename = "Name")]
    name: &'a str,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Execution")]
    execution: &'a str,
    #[tabled(rename = "Created")]
    created: String,
    #[tabled(rename = "Description")]
    description: &'a str,
}

/// Change row for table display.
#[derive(Tabled)]
struct ChangeTableRow<'a> {
    #[tabled(rename = "Resource")]
    resource: &'a str,
    #[tabled(rename = "Type")]
    resource_type: &'a str,
    #[tabled(rename = "PhysicalId")]
    physical_id: &'a str,
    #[tabled(rename = "Action")]
    action: &'a str,
    #[tabled(rename = "Scope")]
    scope: &'a str,
    #[tabled(rename = "Replacement")]
    replacement: String,
}

/// JSON shape of a stack description.
#[derive(Serialize)]
struct StackJson<'a> {
    #[serde(rename = "Parameters")]
    parameters: &'a BTreeMap<String, String>,
    #[serde(rename = "Outputs")]
    outputs: &'a BTreeMap<String, String>,
    #[serde(rename = "Resources")]
    resources: &'a BTreeMap<String, StackResource>,
}

/// JSON shape of a change-set listing entry.
#[derive(Serialize)]
struct ChangeSetJson<'a> {
    #[serde(rename = "Status")]
    status: &'a str,
    #[serde(rename = "ExecutionStatus", skip_serializing_if = "Option::is_none")]
    execution_status: Option<&'a str>,
    #[serde(rename = "StatusReason", skip_serializing_if = "Option::is_none")]
    status_reason: Option<&'a str>,
    #[serde(rename = "Description", skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Returns a formatter with the given format.
    #[must_use]
    pub const fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    /// Selected output format.
    #[must_use]
    pub const fn format(&self) -> OutputFormat {
        self.format
    }

    /// Formats stack names and statuses.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON rendering fails.
    pub fn format_stacks(&self, stacks: &BTreeMap<String, String>) -> Result<String> {
        match self.format {
            OutputFormat::Json => Self::json(stacks),
            OutputFormat::Text => {
                let rows = stacks.iter().map(|(name, status)| StackRow {
                    name: name.clone(),
                    status: Self::colorize_status(status),
                });
                Ok(format!("{}\n", Table::new(rows)))
            }
        }
    }

    /// Formats parameters, outputs and resources of a stack.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON rendering fails.
    pub fn format_stack(
        &self,
        parameters: &BTreeMap<String, String>,
        outputs: &BTreeMap<String, String>,
        resources: &BTreeMap<String, StackResource>,
    ) -> Result<String> {
        if self.format == OutputFormat::Json {
            return Self::json(&StackJson {
                parameters,
                outputs,
                resources,
            });
        }

        let mut output = String::new();
        Self::section(&mut output, "Parameters", parameters);
        Self::section(&mut output, "Outputs", outputs);

        let _ = writeln!(output, "{}", "Resources".bold());
        if resources.is_empty() {
            output.push_str("  none\n");
        } else {
            let rows = resources.iter().map(|(logical_id, resource)| ResourceRow {
                logical_id,
                resource_type: &resource.resource_type,
                status: Self::colorize_status(&resource.status),
                physical_id: resource.physical_id.as_deref().unwrap_or(""),
            });
            let _ = writeln!(output, "{}", Table::new(rows));
        }
        Ok(output)
    }

    /// Formats the change sets of a stack.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON rendering fails.
    pub fn format_change_sets(&self, change_sets: &BTreeMap<String, ChangeSetSummary>) -> Result<String> {
        if self.format == OutputFormat::Json {
            let entries: BTreeMap<&str, ChangeSetJson<'_>> = change_sets
                .iter()
                .map(|(name, summary)| {
                    (
                        name.as_str(),
                        ChangeSetJson {
                            status: &summary.status,
                            execution_status: summary.execution_status.as_deref(),
                            status_reason: summary.status_reason.as_deref(),
                            description: summary.description.as_deref(),
                        },
                    )
                })
                .collect();
            return Self::json(&entries);
        }

        if change_sets.is_empty() {
            return Ok(String::from("No change sets.\n"));
        }

        let rows = change_sets.values().map(|summary| ChangeSetRow {
            name: &summary.name,
            status: Self::colorize_status(&summary.status),
            execution: summary.execution_status.as_deref().unwrap_or(""),
            created: summary
                .created_at
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_default(),
            description: summary.description.as_deref().unwrap_or(""),
        });
        Ok(format!("{}\n", Table::new(rows)))
    }

    /// Formats the proposed changes of a change set.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON rendering fails.
    pub fn format_changes(&self, changes: &[ChangeRow]) -> Result<String> {
        if self.format == OutputFormat::Json {
            return Self::json(&changes);
        }

        if changes.is_empty() {
            return Ok(String::from("No changes.\n"));
        }

        let rows = changes.iter().map(|change| ChangeTableRow {
            resource: &change.resource,
            resource_type: &change.resource_type,
            physical_id: &change.physical_id,
            action: &change.action,
            scope: &change.scope,
            replacement: match change.replacement.as_str() {
                "True" => change.replacement.red().to_string(),
                "Conditional" => change.replacement.yellow().to_string(),
                _ => change.replacement.clone(),
            },
        });
        Ok(format!("{}\n", Table::new(rows)))
    }

    /// Formats one validation result line.
    #[must_use]
    pub fn format_validation(name: &str, width: usize, failure: Option<&str>) -> String {
        match failure {
            None => format!("{name:<width$} {}", "ok".green()),
            Some(message) => format!("{name:<width$} {} {message}", "not ok:".red()),
        }
    }

    /// Colors a stack or resource status by outcome.
    fn colorize_status(status: &str) -> String {
        if status == LOCAL_ONLY {
            status.cyan().to_string()
        } else if status.contains("FAILED") || status.contains("ROLLBACK") {
            status.red().to_string()
        } else if status.ends_with("_COMPLETE") {
            status.green().to_string()
        } else if status.ends_with("_IN_PROGRESS") {
            status.yellow().to_string()
        } else {
            status.to_string()
        }
    }

    fn section(output: &mut String, title: &str, values: &BTreeMap<String, String>) {
        let _ = writeln!(output, "{}", title.bold());
        if values.is_empty() {
            output.push_str("  none\n");
            return;
        }
        let rows = values.iter().map(|(key, value)| ValueRow { key, value });
        let _ = writeln!(output, "{}\n", Table::new(rows));
    }

    fn json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
        let value = serde_json::to_value(value).map_err(|e| crate::error::TemplateError::Serialize {
            format: String::from("JSON"),
            reason: e.to_string(),
        })?;
        Ok(render_json(&value)?)
    }
}
