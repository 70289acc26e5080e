//! Service-neutral types exchanged with the remote stack service.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::Serialize;

/// Resource type of a stack's own events.
pub const STACK_RESOURCE_TYPE: &str = "AWS::CloudFormation::Stack";

/// Status of a stack created only to hold a change set.
pub const REVIEW_IN_PROGRESS: &str = "REVIEW_IN_PROGRESS";

/// Terminal failure status of a stack deletion.
pub const DELETE_FAILED: &str = "DELETE_FAILED";

/// Snapshot of a stack as described by the service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StackDescription {
    /// Stack status.
    pub status: String,
    /// Parameter values by key.
    pub parameters: BTreeMap<String, String>,
    /// Output values by key.
    pub outputs: BTreeMap<String, String>,
}

/// A resource managed by a stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StackResource {
    /// Resource type, e.g. `AWS::S3::Bucket`.
    #[serde(rename = "Type")]
    pub resource_type: String,
    /// Physical identifier, once the resource exists.
    #[serde(rename = "PhysicalId", skip_serializing_if = "Option::is_none")]
    pub physical_id: Option<String>,
    /// Resource status.
    #[serde(rename = "Status")]
    pub status: String,
}

/// One stack event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackEvent {
    /// Event time.
    pub timestamp: DateTime<Utc>,
    /// Logical id of the resource the event is about.
    pub logical_id: String,
    /// Resource type.
    pub resource_type: String,
    /// Resource status after the event.
    pub status: String,
    /// Reason text, if any.
    pub reason: Option<String>,
}

impl StackEvent {
    /// Returns true if the event is about the stack itself.
    #[must_use]
    pub fn is_stack_event(&self, stack_name: &str) -> bool {
        self.logical_id == stack_name && self.resource_type == STACK_RESOURCE_TYPE
    }

    /// Single display line: time, status, type, logical id and reason.
    ///
    /// Completed statuses are green, failed ones red.
    #[must_use]
    pub fn line(&self) -> String {
        let padded = format!("{:<18}", self.status);
        let status = if self.status.contains("FAILED") {
            padded.red().to_string()
        } else if self.status.contains("COMPLETE") {
            padded.green().to_string()
        } else {
            padded
        };

        format!(
            "{} {} {:<25} {} {}",
            self.timestamp.format("%Y-%m-%d/%H:%M:%S"),
            status,
            self.resource_type,
            self.logical_id,
            self.reason.as_deref().unwrap_or(""),
        )
        .trim_end()
        .to_string()
    }
}

/// Whether a change set creates a new stack or updates an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeSetType {
    /// Change set for a stack that does not exist yet.
    Create,
    /// Change set against an existing stack.
    Update,
}

impl ChangeSetType {
    /// Service name of the type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
        }
    }
}

impl fmt::Display for ChangeSetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request to create or update a stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackRequest {
    /// Stack name.
    pub stack_name: String,
    /// Template text.
    pub template_body: String,
    /// Parameter key/value pairs.
    pub parameters: Vec<(String, String)>,
}

/// Request to create a change set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSetRequest {
    /// Stack name.
    pub stack_name: String,
    /// Change-set name.
    pub change_set_name: String,
    /// Template text.
    pub template_body: String,
    /// Parameter key/value pairs.
    pub parameters: Vec<(String, String)>,
    /// Free-form description.
    pub description: Option<String>,
    /// Create or update.
    pub change_set_type: ChangeSetType,
}

/// Change set as listed for a stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSetSummary {
    /// Change-set name.
    pub name: String,
    /// Creation status.
    pub status: String,
    /// Execution status.
    pub execution_status: Option<String>,
    /// Status reason.
    pub status_reason: Option<String>,
    /// Description given at creation.
    pub description: Option<String>,
    /// Creation time.
    pub created_at: Option<DateTime<Utc>>,
}

/// Full description of a change set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSetDescription {
    /// Creation status.
    pub status: String,
    /// Execution status.
    pub execution_status: Option<String>,
    /// Status reason.
    pub status_reason: Option<String>,
    /// Description given at creation.
    pub description: Option<String>,
    /// Proposed changes.
    pub changes: Vec<Change>,
}

/// One proposed change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    /// A change to a stack resource.
    Resource(ResourceChange),
    /// A change kind this tool does not render.
    Other {
        /// Service change type.
        kind: String,
    },
}

/// A proposed change to a stack resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceChange {
    /// Action: Add, Modify, Remove, ...
    pub action: String,
    /// Logical id.
    pub logical_id: String,
    /// Resource type.
    pub resource_type: String,
    /// Physical id, for existing resources.
    pub physical_id: Option<String>,
    /// Changed attribute scopes.
    pub scope: Vec<String>,
    /// Replacement indicator: True, False or Conditional.
    pub replacement: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn event(status: &str) -> StackEvent {
        StackEvent {
            timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 5).single().expect("time"),
            logical_id: String::from("web"),
            resource_type: String::from(STACK_RESOURCE_TYPE),
            status: status.to_string(),
            reason: Some(String::from("User Initiated")),
        }
    }

    #[test]
    fn test_stack_event_detection() {
        let mut e = event("CREATE_COMPLETE");
        assert!(e.is_stack_event("web"));
        assert!(!e.is_stack_event("db"));
        e.resource_type = String::from("AWS::S3::Bucket");
        assert!(!e.is_stack_event("web"));
    }

    #[test]
    fn test_event_line_layout() {
        colored::control::set_override(false);
        let line = event("CREATE_IN_PROGRESS").line();
        assert_eq!(
            line,
            "2024-03-01/12:30:05 CREATE_IN_PROGRESS AWS::CloudFormation::Stack web User Initiated"
        );
    }

    #[test]
    fn test_event_line_without_reason() {
        colored::control::set_override(false);
        let mut e = event("UPDATE_COMPLETE");
        e.reason = None;
        assert!(e.line().ends_with(" web"));
    }
}
