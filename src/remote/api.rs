//! Boundary to the remote stack service.
//!
//! Every call the tool makes to the service goes through
//! [`CloudFormationApi`], so the stack model, change-set engine and commands
//! can run against the real SDK client or a test double.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::ServiceResult;

use super::types::{
    ChangeSetDescription, ChangeSetRequest, ChangeSetSummary, StackDescription, StackEvent,
    StackRequest, StackResource,
};

/// Operations of the remote stack service.
///
/// Failures carry the service's own message unchanged.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CloudFormationApi: Send + Sync {
    /// All live stacks by name, with their status.
    async fn list_stacks(&self) -> ServiceResult<BTreeMap<String, String>>;

    /// Describes one stack.
    async fn describe_stack(&self, name: &str) -> ServiceResult<StackDescription>;

    /// Resources of a stack by logical id.
    async fn list_stack_resources(&self, name: &str)
    -> ServiceResult<BTreeMap<String, StackResource>>;

    /// Deployed template body of a stack.
    async fn get_template(&self, name: &str) -> ServiceResult<String>;

    /// Validates a template body.
    async fn validate_template(&self, body: &str) -> ServiceResult<()>;

    /// Creates a stack and returns its id.
    async fn create_stack(&self, request: &StackRequest) -> ServiceResult<String>;

    /// Updates a stack and returns its id.
    async fn update_stack(&self, request: &StackRequest) -> ServiceResult<String>;

    /// Deletes a stack.
    async fn delete_stack(&self, name: &str) -> ServiceResult<()>;

    /// Full event history of a stack, newest first.
    async fn describe_stack_events(&self, name: &str) -> ServiceResult<Vec<StackEvent>>;

    /// Creates a change set and returns its id.
    async fn create_change_set(&self, request: &ChangeSetRequest) -> ServiceResult<String>;

    /// Change sets of a stack.
    async fn list_change_sets(&self, stack: &str) -> ServiceResult<Vec<ChangeSetSummary>>;

    /// Describes a change set including all of its changes.
    async fn describe_change_set(
        &self,
        stack: &str,
        name: &str,
    ) -> ServiceResult<ChangeSetDescription>;

    /// Executes a change set.
    async fn execute_change_set(&self, stack: &str, name: &str) -> ServiceResult<()>;

    /// Deletes a change set.
    async fn delete_change_set(&self, stack: &str, name: &str) -> ServiceResult<()>;
}
