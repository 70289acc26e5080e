//! Follows a stack's events until it settles.

use std::io::Write;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::Result;

use super::api::CloudFormationApi;
use super::stack::RemoteStack;
use super::types::{StackEvent, DELETE_FAILED};

/// Default delay between event fetches.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// How a polling session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// The stack reached a `*_COMPLETE` status.
    Completed {
        /// Final stack status.
        status: String,
    },
    /// The stack reached a stable failure status.
    Failed {
        /// Final stack status.
        status: String,
    },
    /// Events could no longer be fetched, typically because the stack is gone.
    Stopped {
        /// Why fetching stopped.
        reason: String,
    },
}

/// Repeatedly fetches and prints new stack events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventPoller {
    interval: Duration,
    require_new_events: bool,
    print_events: bool,
}

impl Default for EventPoller {
    fn default() -> Self {
        Self::new()
    }
}

impl EventPoller {
    /// Creates a poller with the default interval that prints events.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            require_new_events: false,
            print_events: true,
        }
    }

    /// Sets the delay between fetches.
    #[must_use]
    pub const fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Ignores terminal statuses until at least one new event arrives.
    ///
    /// Used right after a mutation, when the last known event may still be
    /// the previous operation's completion.
    #[must_use]
    pub const fn after_mutation(mut self) -> Self {
        self.require_new_events = true;
        self
    }

    /// Enables or disables printing of event lines.
    #[must_use]
    pub const fn with_output(mut self, print_events: bool) -> Self {
        self.print_events = print_events;
        self
    }

    /// Polls until the stack settles or events stop being available.
    ///
    /// # Errors
    ///
    /// Returns an error only if writing to `out` fails; fetch failures end
    /// the session with [`PollOutcome::Stopped`].
    pub async fn run<C, W>(&self, stack: &mut RemoteStack<'_, C>, out: &mut W) -> Result<PollOutcome>
    where
        C: CloudFormationApi + ?Sized,
        W: Write + ?Sized,
    {
        let mut seen_new = !self.require_new_events;

        loop {
            let fresh = match stack.poll_events().await {
                Ok(fresh) => fresh,
                Err(e) => {
                    warn!("Stopped following events: {e}");
                    return Ok(PollOutcome::Stopped {
                        reason: e.to_string(),
                    });
                }
            };

            if !fresh.is_empty() {
                seen_new = true;
            }
            if self.print_events {
                for event in &fresh {
                    writeln!(out, "{}", event.line())?;
                }
                out.flush()?;
            }

            if seen_new {
                if let Some(outcome) = settled(stack.name(), stack.events().last()) {
                    debug!("Stack {} settled: {outcome:?}", stack.name());
                    return Ok(outcome);
                }
            }

            tokio::time::sleep(self.interval).await;
        }
    }
}

/// Terminal outcome implied by the stack's latest event, if any.
#[must_use]
pub fn settled(stack_name: &str, last: Option<&StackEvent>) -> Option<PollOutcome> {
    let event = last.filter(|event| event.is_stack_event(stack_name))?;

    if event.status.ends_with("_COMPLETE") {
        if event.status.contains("ROLLBACK") {
            warn!("Stack {stack_name} finished with {}", event.status);
        }
        return Some(PollOutcome::Completed {
            status: event.status.clone(),
        });
    }
    if event.status == DELETE_FAILED {
        return Some(PollOutcome::Failed {
            status: event.status.clone(),
        });
    }
    None
}
