//! Remote stacks: the service boundary, the AWS client, the client-side
//! stack model, change sets and event following.

mod api;
mod change_set;
mod client;
mod events;
mod poller;
mod stack;
mod types;

#[cfg(test)]
pub(crate) mod fake;

#[cfg(test)]
pub(crate) use api::MockCloudFormationApi;
pub use api::CloudFormationApi;
pub use change_set::{
    ChangeRow, ChangeSet, ChangeSetState, WaitPolicy, DEFAULT_WAIT_ATTEMPTS, DEFAULT_WAIT_INTERVAL,
};
pub use client::AwsCloudFormation;
pub use events::EventLog;
pub use poller::{settled, EventPoller, PollOutcome, DEFAULT_POLL_INTERVAL};
pub use stack::{RemoteStack, StackPresence, UpdateOutcome};
pub use types::{
    Change, ChangeSetDescription, ChangeSetRequest, ChangeSetSummary, ChangeSetType,
    ResourceChange, StackDescription, StackEvent, StackRequest, StackResource, DELETE_FAILED,
    REVIEW_IN_PROGRESS, STACK_RESOURCE_TYPE,
};
