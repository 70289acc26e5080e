//! Client-side model of one remote stack.

use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, info};

use crate::error::{RemoteStackError, Result};
use crate::local::Parameters;
use crate::template::Template;

use super::api::CloudFormationApi;
use super::events::EventLog;
use super::types::{ChangeSetSummary, StackEvent, StackRequest, StackResource};

/// What is known about a stack's existence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackPresence {
    /// Not loaded yet, or the last load failed for another reason.
    Unknown,
    /// The service reported the stack as missing.
    Absent,
    /// A snapshot was loaded.
    Present,
}

/// Result of an update request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The update was accepted.
    Updated {
        /// Stack id.
        stack_id: String,
    },
    /// The service reported nothing to change.
    NoChanges,
}

/// Snapshot of a remote stack plus the operations that change it.
pub struct RemoteStack<'a, C: ?Sized> {
    name: String,
    client: &'a C,
    presence: StackPresence,
    status: Option<String>,
    template: Option<Template>,
    parameters: Parameters,
    outputs: BTreeMap<String, String>,
    resources: BTreeMap<String, StackResource>,
    events: EventLog,
    change_sets: BTreeMap<String, ChangeSetSummary>,
}

impl<C: ?Sized> fmt::Debug for RemoteStack<'_, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteStack")
            .field("name", &self.name)
            .field("presence", &self.presence)
            .field("status", &self.status)
            .field("events", &self.events.len())
            .field("change_sets", &self.change_sets.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl<'a, C: CloudFormationApi + ?Sized> RemoteStack<'a, C> {
    /// Creates an unloaded model of stack `name`.
    #[must_use]
    pub fn new(name: impl Into<String>, client: &'a C) -> Self {
        Self {
            name: name.into(),
            client,
            presence: StackPresence::Unknown,
            status: None,
            template: None,
            parameters: Parameters::new(),
            outputs: BTreeMap::new(),
            resources: BTreeMap::new(),
            events: EventLog::new(),
            change_sets: BTreeMap::new(),
        }
    }

    /// Stack name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Client the model talks to.
    #[must_use]
    pub const fn client(&self) -> &'a C {
        self.client
    }

    /// What is known about the stack's existence.
    #[must_use]
    pub const fn presence(&self) -> StackPresence {
        self.presence
    }

    /// Returns true once a snapshot has been loaded.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.presence == StackPresence::Present
    }

    /// Stack status from the last load.
    #[must_use]
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// Deployed template from the last load.
    #[must_use]
    pub const fn template(&self) -> Option<&Template> {
        self.template.as_ref()
    }

    /// Deployed parameters from the last load.
    #[must_use]
    pub const fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// Outputs by key.
    #[must_use]
    pub const fn outputs(&self) -> &BTreeMap<String, String> {
        &self.outputs
    }

    /// Resources by logical id.
    #[must_use]
    pub const fn resources(&self) -> &BTreeMap<String, StackResource> {
        &self.resources
    }

    /// Known event history.
    #[must_use]
    pub const fn events(&self) -> &EventLog {
        &self.events
    }

    /// Known change sets by name.
    #[must_use]
    pub const fn change_sets(&self) -> &BTreeMap<String, ChangeSetSummary> {
        &self.change_sets
    }

    /// Loads a full snapshot: description, resources, template, event history
    /// and change sets.
    ///
    /// Nothing is assigned unless every fetch succeeds. A stack reported as
    /// missing marks the model [`StackPresence::Absent`].
    ///
    /// # Errors
    ///
    /// Returns [`RemoteStackError::StackNotFound`] for a missing stack, or
    /// the service or template error of the failing fetch.
    pub async fn load(&mut self) -> Result<()> {
        let description = match self.client.describe_stack(&self.name).await {
            Ok(description) => description,
            Err(e) if e.is_stack_missing() => {
                debug!("Stack {} does not exist: {}", self.name, e.message);
                self.presence = StackPresence::Absent;
                return Err(RemoteStackError::StackNotFound {
                    name: self.name.clone(),
                }
                .into());
            }
            Err(e) => return Err(e.into()),
        };

        let resources = self.client.list_stack_resources(&self.name).await?;
        let template = Template::detect(self.client.get_template(&self.name).await?)?;
        let history = self.client.describe_stack_events(&self.name).await?;
        let change_sets = self.client.list_change_sets(&self.name).await?;

        self.status = Some(description.status);
        self.parameters = description.parameters.into_iter().collect();
        self.outputs = description.outputs;
        self.resources = resources;
        self.template = Some(template);
        self.events.merge(history);
        self.change_sets = change_sets
            .into_iter()
            .map(|summary| (summary.name.clone(), summary))
            .collect();
        self.presence = StackPresence::Present;

        debug!(
            "Loaded stack {} ({} events, {} change sets)",
            self.name,
            self.events.len(),
            self.change_sets.len()
        );
        Ok(())
    }

    /// Creates the stack.
    ///
    /// # Errors
    ///
    /// Returns the service error if creation is rejected.
    pub async fn create(&mut self, template: &Template, parameters: &Parameters) -> Result<String> {
        let stack_id = self
            .client
            .create_stack(&self.request(template, parameters))
            .await?;
        info!("Creating stack {}", self.name);
        Ok(stack_id)
    }

    /// Updates the stack.
    ///
    /// "Nothing to update" from the service is a normal outcome, not an error.
    ///
    /// # Errors
    ///
    /// Returns any other service error.
    pub async fn update(
        &mut self,
        template: &Template,
        parameters: &Parameters,
    ) -> Result<UpdateOutcome> {
        match self.client.update_stack(&self.request(template, parameters)).await {
            Ok(stack_id) => {
                info!("Updating stack {}", self.name);
                Ok(UpdateOutcome::Updated { stack_id })
            }
            Err(e) if e.is_no_updates() => {
                info!("Stack {} is up to date", self.name);
                Ok(UpdateOutcome::NoChanges)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Deletes the stack.
    ///
    /// # Errors
    ///
    /// Returns the service error if deletion is rejected.
    pub async fn delete(&mut self) -> Result<()> {
        self.client.delete_stack(&self.name).await?;
        info!("Deleting stack {}", self.name);
        Ok(())
    }

    /// Fetches the event history and merges it into the log.
    ///
    /// Returns the newly appended events, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteStackError::EventsUnavailable`] if events cannot be
    /// fetched, for example after the stack is gone.
    pub async fn poll_events(&mut self) -> std::result::Result<Vec<StackEvent>, RemoteStackError> {
        let history = self
            .client
            .describe_stack_events(&self.name)
            .await
            .map_err(|source| RemoteStackError::EventsUnavailable {
                name: self.name.clone(),
                source,
            })?;
        Ok(self.events.merge(history))
    }

    pub(crate) fn remember_change_set(&mut self, summary: ChangeSetSummary) {
        self.change_sets.insert(summary.name.clone(), summary);
    }

    pub(crate) fn forget_change_set(&mut self, name: &str) {
        self.change_sets.remove(name);
    }

    fn request(&self, template: &Template, parameters: &Parameters) -> StackRequest {
        StackRequest {
            stack_name: self.name.clone(),
            template_body: template.body().to_string(),
            parameters: parameters.as_pairs(),
        }
    }
}
