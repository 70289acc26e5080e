//! In-memory stack service for tests.
//!
//! Event history advances one queued batch per `describe_stack_events`
//! call, after the call returns, so every poll sees a stable snapshot and
//! the next poll sees what arrived meanwhile.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{ServiceError, ServiceResult};

use super::api::CloudFormationApi;
use super::types::{
    Change, ChangeSetDescription, ChangeSetRequest, ChangeSetSummary, ChangeSetType,
    REVIEW_IN_PROGRESS, StackDescription, StackEvent, StackRequest, StackResource,
};

/// Builds an event at `secs` seconds past the epoch.
pub fn event(secs: i64, logical_id: &str, resource_type: &str, status: &str) -> StackEvent {
    StackEvent {
        timestamp: DateTime::<Utc>::from_timestamp(secs, 0).expect("valid timestamp"),
        logical_id: logical_id.to_string(),
        resource_type: resource_type.to_string(),
        status: status.to_string(),
        reason: None,
    }
}

#[derive(Debug, Clone)]
pub struct FakeChangeSet {
    pub status: String,
    pub execution_status: Option<String>,
    pub description: Option<String>,
    pub changes: Vec<Change>,
    pub progress: VecDeque<String>,
}

impl FakeChangeSet {
    pub fn new(status: &str, changes: Vec<Change>) -> Self {
        let execution_status = (status == "CREATE_COMPLETE").then(|| String::from("AVAILABLE"));
        Self {
            status: status.to_string(),
            execution_status,
            description: None,
            changes,
            progress: VecDeque::new(),
        }
    }

    fn summary(&self, name: &str) -> ChangeSetSummary {
        ChangeSetSummary {
            name: name.to_string(),
            status: self.status.clone(),
            execution_status: self.execution_status.clone(),
            status_reason: None,
            description: self.description.clone(),
            created_at: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FakeStack {
    pub template: String,
    pub status: String,
    pub parameters: BTreeMap<String, String>,
    pub outputs: BTreeMap<String, String>,
    pub resources: BTreeMap<String, StackResource>,
    /// Visible history, oldest first.
    pub events: Vec<StackEvent>,
    /// Batches released one per event fetch.
    pub pending_events: VecDeque<Vec<StackEvent>>,
    pub change_sets: BTreeMap<String, FakeChangeSet>,
    /// Removes the stack after this many event fetches.
    pub vanish_after_event_polls: Option<usize>,
    event_polls: usize,
}

impl FakeStack {
    pub fn new(template: &str, status: &str) -> Self {
        Self {
            template: template.to_string(),
            status: status.to_string(),
            parameters: BTreeMap::new(),
            outputs: BTreeMap::new(),
            resources: BTreeMap::new(),
            events: Vec::new(),
            pending_events: VecDeque::new(),
            change_sets: BTreeMap::new(),
            vanish_after_event_polls: None,
            event_polls: 0,
        }
    }
}

#[derive(Debug, Default)]
struct State {
    stacks: BTreeMap<String, FakeStack>,
    calls: Vec<&'static str>,
    validation_errors: BTreeMap<String, String>,
    change_set_progress: Vec<String>,
    last_change_set_type: Option<ChangeSetType>,
}

#[derive(Debug, Default)]
pub struct FakeCloudFormation {
    state: Mutex<State>,
}

fn missing(operation: &str, name: &str) -> ServiceError {
    ServiceError::new(
        operation,
        Some(String::from("ValidationError")),
        format!("Stack with id {name} does not exist"),
    )
}

impl FakeCloudFormation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_stack(&self, name: &str, stack: FakeStack) {
        self.lock().stacks.insert(name.to_string(), stack);
    }

    pub fn stack(&self, name: &str) -> Option<FakeStack> {
        self.lock().stacks.get(name).cloned()
    }

    /// Queues an event batch for a later fetch.
    pub fn push_events(&self, name: &str, batch: Vec<StackEvent>) {
        if let Some(stack) = self.lock().stacks.get_mut(name) {
            stack.pending_events.push_back(batch);
        }
    }

    /// Rejects templates containing `marker` during validation.
    pub fn reject_template(&self, marker: &str, message: &str) {
        self.lock()
            .validation_errors
            .insert(marker.to_string(), message.to_string());
    }

    /// Statuses reported by successive describes of the next created change set.
    pub fn set_change_set_progress(&self, statuses: &[&str]) {
        self.lock().change_set_progress = statuses.iter().map(ToString::to_string).collect();
    }

    pub fn last_change_set_type(&self) -> Option<ChangeSetType> {
        self.lock().last_change_set_type
    }

    /// Number of calls made to an operation.
    pub fn calls(&self, operation: &str) -> usize {
        self.lock().calls.iter().filter(|c| **c == operation).count()
    }

    /// Operations called, in order.
    pub fn call_log(&self) -> Vec<&'static str> {
        self.lock().calls.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().expect("fake state poisoned")
    }

    fn record(&self, operation: &'static str) -> std::sync::MutexGuard<'_, State> {
        let mut state = self.lock();
        state.calls.push(operation);
        state
    }
}

#[async_trait]
impl CloudFormationApi for FakeCloudFormation {
    async fn list_stacks(&self) -> ServiceResult<BTreeMap<String, String>> {
        let state = self.record("list_stacks");
        Ok(state
            .stacks
            .iter()
            .map(|(name, stack)| (name.clone(), stack.status.clone()))
            .collect())
    }

    async fn describe_stack(&self, name: &str) -> ServiceResult<StackDescription> {
        let state = self.record("describe_stack");
        let stack = state
            .stacks
            .get(name)
            .ok_or_else(|| missing("DescribeStacks", name))?;
        Ok(StackDescription {
            status: stack.status.clone(),
            parameters: stack.parameters.clone(),
            outputs: stack.outputs.clone(),
        })
    }

    async fn list_stack_resources(
        &self,
        name: &str,
    ) -> ServiceResult<BTreeMap<String, StackResource>> {
        let state = self.record("list_stack_resources");
        let stack = state
            .stacks
            .get(name)
            .ok_or_else(|| missing("ListStackResources", name))?;
        Ok(stack.resources.clone())
    }

    async fn get_template(&self, name: &str) -> ServiceResult<String> {
        let state = self.record("get_template");
        let stack = state
            .stacks
            .get(name)
            .ok_or_else(|| missing("GetTemplate", name))?;
        Ok(stack.template.clone())
    }

    async fn validate_template(&self, body: &str) -> ServiceResult<()> {
        let state = self.record("validate_template");
        match state
            .validation_errors
            .iter()
            .find(|(marker, _)| body.contains(marker.as_str()))
        {
            Some((_, message)) => Err(ServiceError::new(
                "ValidateTemplate",
                Some(String::from("ValidationError")),
                message.clone(),
            )),
            None => Ok(()),
        }
    }

    async fn create_stack(&self, request: &StackRequest) -> ServiceResult<String> {
        let mut state = self.record("create_stack");
        if state.stacks.contains_key(&request.stack_name) {
            return Err(ServiceError::new(
                "CreateStack",
                Some(String::from("AlreadyExistsException")),
                format!("Stack [{}] already exists", request.stack_name),
            ));
        }
        let mut stack = FakeStack::new(&request.template_body, "CREATE_IN_PROGRESS");
        stack.parameters = request.parameters.iter().cloned().collect();
        state.stacks.insert(request.stack_name.clone(), stack);
        Ok(format!("arn:fake:stack/{}", request.stack_name))
    }

    async fn update_stack(&self, request: &StackRequest) -> ServiceResult<String> {
        let mut state = self.record("update_stack");
        let stack = state
            .stacks
            .get_mut(&request.stack_name)
            .ok_or_else(|| missing("UpdateStack", &request.stack_name))?;

        let parameters: BTreeMap<String, String> = request.parameters.iter().cloned().collect();
        if stack.template == request.template_body && stack.parameters == parameters {
            return Err(ServiceError::new(
                "UpdateStack",
                Some(String::from("ValidationError")),
                "No updates are to be performed.",
            ));
        }
        stack.template.clone_from(&request.template_body);
        stack.parameters = parameters;
        stack.status = String::from("UPDATE_IN_PROGRESS");
        Ok(format!("arn:fake:stack/{}", request.stack_name))
    }

    async fn delete_stack(&self, name: &str) -> ServiceResult<()> {
        let mut state = self.record("delete_stack");
        let stack = state
            .stacks
            .get_mut(name)
            .ok_or_else(|| missing("DeleteStack", name))?;
        stack.status = String::from("DELETE_IN_PROGRESS");
        Ok(())
    }

    async fn describe_stack_events(&self, name: &str) -> ServiceResult<Vec<StackEvent>> {
        let mut state = self.record("describe_stack_events");
        let stack = state
            .stacks
            .get_mut(name)
            .ok_or_else(|| missing("DescribeStackEvents", name))?;

        let mut history = stack.events.clone();
        history.reverse();

        if let Some(batch) = stack.pending_events.pop_front() {
            stack.events.extend(batch);
        }
        stack.event_polls += 1;
        if stack.vanish_after_event_polls == Some(stack.event_polls) {
            state.stacks.remove(name);
        }
        Ok(history)
    }

    async fn create_change_set(&self, request: &ChangeSetRequest) -> ServiceResult<String> {
        let mut state = self.record("create_change_set");
        state.last_change_set_type = Some(request.change_set_type);
        let progress: VecDeque<String> = state.change_set_progress.drain(..).collect();

        if request.change_set_type == ChangeSetType::Create
            && !state.stacks.contains_key(&request.stack_name)
        {
            state.stacks.insert(
                request.stack_name.clone(),
                FakeStack::new(&request.template_body, REVIEW_IN_PROGRESS),
            );
        }
        let stack = state
            .stacks
            .get_mut(&request.stack_name)
            .ok_or_else(|| missing("CreateChangeSet", &request.stack_name))?;

        let mut change_set = FakeChangeSet::new("CREATE_PENDING", Vec::new());
        change_set.description.clone_from(&request.description);
        change_set.progress = progress;
        stack
            .change_sets
            .insert(request.change_set_name.clone(), change_set);
        Ok(format!("arn:fake:changeSet/{}", request.change_set_name))
    }

    async fn list_change_sets(&self, stack: &str) -> ServiceResult<Vec<ChangeSetSummary>> {
        let state = self.record("list_change_sets");
        let entry = state
            .stacks
            .get(stack)
            .ok_or_else(|| missing("ListChangeSets", stack))?;
        Ok(entry
            .change_sets
            .iter()
            .map(|(name, change_set)| change_set.summary(name))
            .collect())
    }

    async fn describe_change_set(
        &self,
        stack: &str,
        name: &str,
    ) -> ServiceResult<ChangeSetDescription> {
        let mut state = self.record("describe_change_set");
        let change_set = state
            .stacks
            .get_mut(stack)
            .and_then(|s| s.change_sets.get_mut(name))
            .ok_or_else(|| {
                ServiceError::new(
                    "DescribeChangeSet",
                    Some(String::from("ChangeSetNotFound")),
                    format!("ChangeSet [{name}] does not exist"),
                )
            })?;

        if let Some(status) = change_set.progress.pop_front() {
            change_set.execution_status =
                (status == "CREATE_COMPLETE").then(|| String::from("AVAILABLE"));
            change_set.status = status;
        }

        Ok(ChangeSetDescription {
            status: change_set.status.clone(),
            execution_status: change_set.execution_status.clone(),
            status_reason: None,
            description: change_set.description.clone(),
            changes: change_set.changes.clone(),
        })
    }

    async fn execute_change_set(&self, stack: &str, name: &str) -> ServiceResult<()> {
        let mut state = self.record("execute_change_set");
        let change_set = state
            .stacks
            .get_mut(stack)
            .and_then(|s| s.change_sets.get_mut(name))
            .ok_or_else(|| {
                ServiceError::new("ExecuteChangeSet", None, format!("ChangeSet [{name}] does not exist"))
            })?;
        change_set.execution_status = Some(String::from("EXECUTE_IN_PROGRESS"));
        Ok(())
    }

    async fn delete_change_set(&self, stack: &str, name: &str) -> ServiceResult<()> {
        let mut state = self.record("delete_change_set");
        state
            .stacks
            .get_mut(stack)
            .and_then(|s| s.change_sets.remove(name))
            .map(|_| ())
            .ok_or_else(|| {
                ServiceError::new("DeleteChangeSet", None, format!("ChangeSet [{name}] does not exist"))
            })
    }
}
