//! Change-set lifecycle for a remote stack.
//!
//! A change set moves through
//! `Uncreated -> Creating -> CreateComplete | CreateFailed`, then
//! `CreateComplete -> Executing -> ExecuteComplete | ExecuteFailed`.
//! Any created, non-executing change set can be deleted.

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{ChangeSetError, Result};
use crate::local::Parameters;
use crate::template::Template;

use super::api::CloudFormationApi;
use super::stack::{RemoteStack, StackPresence};
use super::types::{
    Change, ChangeSetDescription, ChangeSetRequest, ChangeSetSummary, ChangeSetType,
    REVIEW_IN_PROGRESS,
};

/// Default delay between creation status checks.
pub const DEFAULT_WAIT_INTERVAL: Duration = Duration::from_secs(3);

/// Default number of creation status checks.
pub const DEFAULT_WAIT_ATTEMPTS: u32 = 10;

/// Lifecycle state of a change set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeSetState {
    /// Not submitted yet.
    Uncreated,
    /// Submitted, being computed by the service.
    Creating,
    /// Ready for review and execution.
    CreateComplete,
    /// Rejected by the service.
    CreateFailed,
    /// Being applied to the stack.
    Executing,
    /// Applied.
    ExecuteComplete,
    /// Application failed.
    ExecuteFailed,
    /// Deleted.
    Deleted,
}

impl ChangeSetState {
    /// Maps service creation and execution statuses to a state.
    #[must_use]
    pub fn from_service(status: &str, execution_status: Option<&str>) -> Self {
        match execution_status {
            Some("EXECUTE_IN_PROGRESS") => return Self::Executing,
            Some("EXECUTE_COMPLETE") => return Self::ExecuteComplete,
            Some("EXECUTE_FAILED") => return Self::ExecuteFailed,
            _ => {}
        }

        match status {
            "CREATE_COMPLETE" => Self::CreateComplete,
            "FAILED" => Self::CreateFailed,
            "DELETE_PENDING" | "DELETE_IN_PROGRESS" | "DELETE_COMPLETE" => Self::Deleted,
            _ => Self::Creating,
        }
    }

    /// Returns true if creation has finished, successfully or not.
    #[must_use]
    pub const fn is_created(self) -> bool {
        !matches!(self, Self::Uncreated | Self::Creating)
    }
}

impl fmt::Display for ChangeSetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uncreated => "UNCREATED",
            Self::Creating => "CREATE_IN_PROGRESS",
            Self::CreateComplete => "CREATE_COMPLETE",
            Self::CreateFailed => "FAILED",
            Self::Executing => "EXECUTE_IN_PROGRESS",
            Self::ExecuteComplete => "EXECUTE_COMPLETE",
            Self::ExecuteFailed => "EXECUTE_FAILED",
            Self::Deleted => "DELETED",
        };
        f.write_str(name)
    }
}

/// Polling policy while waiting for creation to finish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    /// Delay before each status check.
    pub interval: Duration,
    /// Number of status checks before giving up.
    pub max_attempts: u32,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_WAIT_INTERVAL,
            max_attempts: DEFAULT_WAIT_ATTEMPTS,
        }
    }
}

/// One row of a change set's proposed resource changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeRow {
    /// Logical id.
    #[serde(rename = "Resource")]
    pub resource: String,
    /// Resource type.
    #[serde(rename = "Type")]
    pub resource_type: String,
    /// Physical id, empty for new resources.
    #[serde(rename = "PhysicalId")]
    pub physical_id: String,
    /// Action.
    #[serde(rename = "Action")]
    pub action: String,
    /// Changed attribute scopes, comma separated.
    #[serde(rename = "Scope")]
    pub scope: String,
    /// Replacement indicator.
    #[serde(rename = "Replacement")]
    pub replacement: String,
}

/// A named change set of one stack.
pub struct ChangeSet<'a, C: ?Sized> {
    client: &'a C,
    stack: String,
    name: String,
    state: ChangeSetState,
    description: Option<ChangeSetDescription>,
}

impl<C: ?Sized> fmt::Debug for ChangeSet<'_, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeSet")
            .field("stack", &self.stack)
            .field("name", &self.name)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl<'a, C: CloudFormationApi + ?Sized> ChangeSet<'a, C> {
    /// A change set of `stack` that has not been submitted.
    #[must_use]
    pub fn new(stack: &RemoteStack<'a, C>, name: impl Into<String>) -> Self {
        Self {
            client: stack.client(),
            stack: stack.name().to_string(),
            name: name.into(),
            state: ChangeSetState::Uncreated,
            description: None,
        }
    }

    /// A change set already known to `stack`, in the state of its listing.
    ///
    /// # Errors
    ///
    /// Returns [`ChangeSetError::NotFound`] if the stack does not list it.
    pub fn existing(stack: &RemoteStack<'a, C>, name: &str) -> std::result::Result<Self, ChangeSetError> {
        let summary = stack.change_sets().get(name).ok_or_else(|| ChangeSetError::NotFound {
            stack: stack.name().to_string(),
            name: name.to_string(),
        })?;

        let mut change_set = Self::new(stack, name);
        change_set.state =
            ChangeSetState::from_service(&summary.status, summary.execution_status.as_deref());
        Ok(change_set)
    }

    /// Change-set name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Owning stack name.
    #[must_use]
    pub fn stack_name(&self) -> &str {
        &self.stack
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> ChangeSetState {
        self.state
    }

    /// Description from the last load.
    #[must_use]
    pub const fn description(&self) -> Option<&ChangeSetDescription> {
        self.description.as_ref()
    }

    /// Submits the change set.
    ///
    /// The type is CREATE when the stack is absent or only holds change
    /// sets, UPDATE otherwise. A name the stack already lists is rejected
    /// without contacting the service.
    ///
    /// # Errors
    ///
    /// Returns [`ChangeSetError::StackNotLoaded`] if the stack's existence is
    /// unknown, [`ChangeSetError::AlreadyExists`] for a duplicate name,
    /// [`ChangeSetError::InvalidTransition`] if already submitted, or the
    /// service error.
    pub async fn create(
        &mut self,
        stack: &mut RemoteStack<'a, C>,
        template: &Template,
        parameters: &Parameters,
        description: Option<&str>,
    ) -> Result<ChangeSetType> {
        if self.state != ChangeSetState::Uncreated {
            return Err(self.invalid("create").into());
        }

        let change_set_type = match stack.presence() {
            StackPresence::Unknown => {
                return Err(ChangeSetError::StackNotLoaded {
                    stack: stack.name().to_string(),
                }
                .into());
            }
            StackPresence::Absent => ChangeSetType::Create,
            StackPresence::Present if stack.status() == Some(REVIEW_IN_PROGRESS) => {
                ChangeSetType::Create
            }
            StackPresence::Present => ChangeSetType::Update,
        };

        if stack.change_sets().contains_key(&self.name) {
            return Err(ChangeSetError::AlreadyExists {
                stack: self.stack.clone(),
                name: self.name.clone(),
            }
            .into());
        }

        let request = ChangeSetRequest {
            stack_name: self.stack.clone(),
            change_set_name: self.name.clone(),
            template_body: template.body().to_string(),
            parameters: parameters.as_pairs(),
            description: description.map(str::to_string),
            change_set_type,
        };
        let id = self.client.create_change_set(&request).await?;

        info!(
            "Creating {} change set {} for stack {}",
            change_set_type, self.name, self.stack
        );
        debug!("Change set id: {id}");

        self.state = ChangeSetState::Creating;
        stack.remember_change_set(ChangeSetSummary {
            name: self.name.clone(),
            status: String::from("CREATE_PENDING"),
            execution_status: None,
            status_reason: None,
            description: request.description,
            created_at: None,
        });
        Ok(change_set_type)
    }

    /// Fetches the change set's description and updates the state.
    ///
    /// # Errors
    ///
    /// Returns the service error if the change set cannot be described.
    pub async fn load(&mut self) -> Result<()> {
        let description = self
            .client
            .describe_change_set(&self.stack, &self.name)
            .await?;
        self.state = ChangeSetState::from_service(
            &description.status,
            description.execution_status.as_deref(),
        );
        self.description = Some(description);
        Ok(())
    }

    /// Polls until creation finishes and returns the final state.
    ///
    /// A finished creation, successful or failed, returns immediately.
    ///
    /// # Errors
    ///
    /// Returns [`ChangeSetError::CreateTimeout`] when the attempts run out,
    /// [`ChangeSetError::InvalidTransition`] if never submitted, or the
    /// service error of a status check.
    pub async fn wait_until_created(&mut self, policy: WaitPolicy) -> Result<ChangeSetState> {
        if self.state == ChangeSetState::Uncreated {
            return Err(self.invalid("wait for").into());
        }

        for attempt in 1..=policy.max_attempts {
            if self.state.is_created() {
                return Ok(self.state);
            }
            tokio::time::sleep(policy.interval).await;
            self.load().await?;
            debug!(
                "Change set {} is {} after check {attempt}",
                self.name, self.state
            );
        }

        if self.state.is_created() {
            return Ok(self.state);
        }

        Err(ChangeSetError::CreateTimeout {
            name: self.name.clone(),
            attempts: policy.max_attempts,
        }
        .into())
    }

    /// Proposed resource changes from the last load.
    ///
    /// Changes that are not resource changes are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`ChangeSetError::InvalidTransition`] if not loaded.
    pub fn changes(&self) -> std::result::Result<Vec<ChangeRow>, ChangeSetError> {
        let description = self.description.as_ref().ok_or_else(|| self.invalid("inspect"))?;

        let rows = description
            .changes
            .iter()
            .filter_map(|change| match change {
                Change::Resource(resource) => Some(ChangeRow {
                    resource: resource.logical_id.clone(),
                    resource_type: resource.resource_type.clone(),
                    physical_id: resource.physical_id.clone().unwrap_or_default(),
                    action: resource.action.clone(),
                    scope: resource.scope.join(", "),
                    replacement: resource.replacement.clone().unwrap_or_default(),
                }),
                Change::Other { kind } => {
                    warn!("Skipping unsupported change type {kind} in change set {}", self.name);
                    None
                }
            })
            .collect();
        Ok(rows)
    }

    /// Executes a completed change set.
    ///
    /// # Errors
    ///
    /// Returns [`ChangeSetError::InvalidTransition`] unless the state is
    /// `CreateComplete`, or the service error.
    pub async fn execute(&mut self) -> Result<()> {
        if self.state != ChangeSetState::CreateComplete {
            return Err(self.invalid("execute").into());
        }

        self.client.execute_change_set(&self.stack, &self.name).await?;
        info!("Executing change set {} on stack {}", self.name, self.stack);
        self.state = ChangeSetState::Executing;
        Ok(())
    }

    /// Deletes the change set and drops it from the stack's listing.
    ///
    /// # Errors
    ///
    /// Returns [`ChangeSetError::InvalidTransition`] if the change set was
    /// never created, is executing or is already deleted, or the service error.
    pub async fn delete(&mut self, stack: &mut RemoteStack<'a, C>) -> Result<()> {
        if matches!(
            self.state,
            ChangeSetState::Uncreated | ChangeSetState::Executing | ChangeSetState::Deleted
        ) {
            return Err(self.invalid("delete").into());
        }

        self.client.delete_change_set(&self.stack, &self.name).await?;
        info!("Deleted change set {} of stack {}", self.name, self.stack);
        stack.forget_change_set(&self.name);
        self.state = ChangeSetState::Deleted;
        Ok(())
    }

    fn invalid(&self, operation: &str) -> ChangeSetError {
        ChangeSetError::InvalidTransition {
            name: self.name.clone(),
            state: self.state.to_string(),
            operation: operation.to_string(),
        }
    }
}
