//! Command actions.
//!
//! Each CLI command maps to one function here. Local-only commands are free
//! functions over a [`LocalStackStore`]; commands that talk to the service
//! go through [`RemoteActions`]. All user-facing output is written to a
//! caller-supplied writer.

use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::time::Duration;

use tracing::{error, info, warn};

use crate::error::{ChangeSetError, CloudsError, LocalStackError, RemoteStackError, Result};
use crate::local::{LocalStack, LocalStackStore};
use crate::remote::{
    ChangeSet, ChangeSetState, CloudFormationApi, EventPoller, PollOutcome, RemoteStack,
    UpdateOutcome, WaitPolicy, DEFAULT_POLL_INTERVAL,
};
use crate::template::Template;

use super::commands::OutputFormat;
use super::output::{OutputFormatter, LOCAL_ONLY};

/// Stack names from the command line, or every local stack with `all`.
fn resolve_names(store: &LocalStackStore, names: &[String], all: bool) -> Result<Vec<String>> {
    if all {
        return store.list();
    }
    if names.is_empty() {
        return Err(CloudsError::command("no stacks given, name at least one or pass --all"));
    }
    Ok(names.to_vec())
}

fn local_template(stack: &LocalStack) -> Result<&Template> {
    stack.template().ok_or_else(|| {
        CloudsError::from(LocalStackError::MissingTemplate {
            name: stack.name().to_string(),
        })
    })
}

/// Copies local stack `source` to `dest`.
///
/// # Errors
///
/// Returns an error if the source cannot be loaded, the destination exists
/// and `force` is not set, or writing fails.
pub fn clone_stack(
    store: &LocalStackStore,
    source: &str,
    dest: &str,
    force: bool,
    out: &mut dyn Write,
) -> Result<()> {
    let cloned = store.clone_stack(source, dest, force)?;
    writeln!(out, "Cloned {source} to {}", cloned.path().display())?;
    Ok(())
}

/// Rewrites the templates of local stacks in canonical form.
///
/// Templates already in canonical form are left untouched.
///
/// # Errors
///
/// Returns an error if a stack cannot be loaded, parsed or written.
pub fn format_stacks(
    store: &LocalStackStore,
    names: &[String],
    all: bool,
    out: &mut dyn Write,
) -> Result<()> {
    for name in resolve_names(store, names, all)? {
        let mut stack = store.load(&name)?;
        let template = local_template(&stack)?;

        if template.is_canonical()? {
            writeln!(out, "{name}: already formatted")?;
            continue;
        }

        let canonical = template.canonical()?;
        let parameters = stack.parameters().clone();
        stack.update(canonical, parameters);
        stack.save()?;
        info!("Formatted template of stack {name}");
        writeln!(out, "{name}: formatted")?;
    }
    Ok(())
}

/// Reads a template from `input` and writes its canonical form to `out`.
///
/// # Errors
///
/// Returns an error if the input is not a JSON or YAML template.
pub fn format_pipe<R: Read + ?Sized>(input: &mut R, out: &mut dyn Write) -> Result<()> {
    let mut text = String::new();
    input.read_to_string(&mut text)?;
    let canonical = Template::detect(text)?.canonical()?;
    out.write_all(canonical.body().as_bytes())?;
    Ok(())
}

/// Lists local stacks only.
///
/// # Errors
///
/// Returns an error if the stacks root cannot be read.
pub fn list_local(store: &LocalStackStore, formatter: OutputFormatter, out: &mut dyn Write) -> Result<()> {
    let stacks: BTreeMap<String, String> = store
        .list()?
        .into_iter()
        .map(|name| (name, LOCAL_ONLY.to_string()))
        .collect();
    out.write_all(formatter.format_stacks(&stacks)?.as_bytes())?;
    Ok(())
}

/// Commands that need the remote service.
pub struct RemoteActions<'a, C: ?Sized> {
    store: &'a LocalStackStore,
    client: &'a C,
    formatter: OutputFormatter,
    poll_interval: Duration,
    wait_policy: WaitPolicy,
}

impl<'a, C: CloudFormationApi + ?Sized> RemoteActions<'a, C> {
    /// Creates the actions over a local store and a service client.
    #[must_use]
    pub fn new(store: &'a LocalStackStore, client: &'a C, formatter: OutputFormatter) -> Self {
        Self {
            store,
            client,
            formatter,
            poll_interval: DEFAULT_POLL_INTERVAL,
            wait_policy: WaitPolicy::default(),
        }
    }

    /// Sets the delay between event fetches while following a stack.
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the polling policy for change-set creation.
    #[must_use]
    pub const fn with_wait_policy(mut self, policy: WaitPolicy) -> Self {
        self.wait_policy = policy;
        self
    }

    /// Lists remote stacks, plus local-only ones unless `remote_only`.
    ///
    /// # Errors
    ///
    /// Returns the service error, or an error reading the stacks root.
    pub async fn list(&self, remote_only: bool, out: &mut dyn Write) -> Result<()> {
        let mut stacks = self.client.list_stacks().await?;
        if !remote_only {
            for name in self.store.list()? {
                stacks.entry(name).or_insert_with(|| LOCAL_ONLY.to_string());
            }
        }
        out.write_all(self.formatter.format_stacks(&stacks)?.as_bytes())?;
        Ok(())
    }

    /// Prints parameters, outputs and resources of a remote stack.
    ///
    /// # Errors
    ///
    /// Returns an error if the stack cannot be loaded.
    pub async fn describe(&self, name: &str, json: bool, out: &mut dyn Write) -> Result<()> {
        let mut remote = RemoteStack::new(name, self.client);
        remote.load().await?;

        let formatter = if json {
            self.formatter.with_format(OutputFormat::Json)
        } else {
            self.formatter
        };
        if formatter.format() == OutputFormat::Text {
            writeln!(out, "{name}: {}\n", remote.status().unwrap_or_default())?;
        }

        let parameters: BTreeMap<String, String> = remote.parameters().as_pairs().into_iter().collect();
        let text = formatter.format_stack(&parameters, remote.outputs(), remote.resources())?;
        out.write_all(text.as_bytes())?;
        Ok(())
    }

    /// Downloads remote stacks into the local store.
    ///
    /// Stacks whose local copy is identical are skipped. Per-stack failures
    /// are logged and reported together at the end.
    ///
    /// # Errors
    ///
    /// Returns an error if listing fails, no named stack exists remotely, or
    /// any stack failed to dump.
    pub async fn dump(&self, names: &[String], all: bool, force: bool, out: &mut dyn Write) -> Result<()> {
        let remote_stacks = self.client.list_stacks().await?;
        let names: Vec<String> = if all {
            remote_stacks.keys().cloned().collect()
        } else if names.is_empty() {
            return Err(CloudsError::command("no stacks given, name at least one or pass --all"));
        } else {
            names.to_vec()
        };

        let eligible: Vec<&String> = names
            .iter()
            .filter(|name| {
                let exists = remote_stacks.contains_key(*name);
                if !exists {
                    warn!("Stack {name} does not exist remotely, skipping");
                }
                exists
            })
            .collect();
        if eligible.is_empty() {
            return Err(CloudsError::command("no stacks to dump"));
        }

        let mut failed = Vec::new();
        for name in eligible {
            match self.dump_one(name, force).await {
                Ok(true) => writeln!(out, "{name}: dumped")?,
                Ok(false) => writeln!(out, "{name}: unchanged")?,
                Err(e) => {
                    error!("Failed to dump stack {name}: {e}");
                    failed.push(name.as_str());
                }
            }
        }

        if failed.is_empty() {
            Ok(())
        } else {
            Err(CloudsError::command(format!("failed to dump: {}", failed.join(", "))))
        }
    }

    /// Returns false if the local copy already matched.
    async fn dump_one(&self, name: &str, force: bool) -> Result<bool> {
        let mut remote = RemoteStack::new(name, self.client);
        remote.load().await?;

        let template = remote
            .template()
            .ok_or_else(|| RemoteStackError::NotLoaded {
                name: name.to_string(),
            })?
            .canonical()?;
        let parameters = remote.parameters().clone();

        if self.store.exists(name) {
            if let Ok(local) = self.store.load(name) {
                if let Some(existing) = local.template() {
                    if local.parameters().as_pairs() == parameters.as_pairs()
                        && existing.fingerprint()? == template.fingerprint()?
                    {
                        return Ok(false);
                    }
                }
            }
            if !force {
                return Err(LocalStackError::AlreadyExists {
                    name: name.to_string(),
                }
                .into());
            }
        }

        self.store.save(name, &template, parameters, None)?;
        info!("Dumped stack {name} to {}", self.store.root().display());
        Ok(true)
    }

    /// Prints the event history of a stack, then optionally follows it.
    ///
    /// # Errors
    ///
    /// Returns an error if the stack cannot be loaded or the followed
    /// operation fails.
    pub async fn events(&self, name: &str, follow: bool, out: &mut dyn Write) -> Result<()> {
        let mut remote = RemoteStack::new(name, self.client);
        remote.load().await?;

        for event in remote.events().events() {
            writeln!(out, "{}", event.line())?;
        }
        if follow {
            let outcome = EventPoller::new()
                .with_interval(self.poll_interval)
                .run(&mut remote, &mut *out)
                .await?;
            report(name, outcome, out)?;
        }
        Ok(())
    }

    /// Creates or updates a stack from its local directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the local stack is unusable, the stack is missing
    /// remotely and `create_missing` is not set, the service rejects the
    /// request, or a followed operation fails.
    pub async fn update(
        &self,
        name: &str,
        create_missing: bool,
        wait: bool,
        show_events: bool,
        out: &mut dyn Write,
    ) -> Result<()> {
        let local = self.store.load(name)?;
        let template = local_template(&local)?;

        let exists = self.client.list_stacks().await?.contains_key(name);
        if !exists && !create_missing {
            return Err(CloudsError::command(format!(
                "stack {name} does not exist, pass --create-missing to create it"
            )));
        }

        let mut remote = RemoteStack::new(name, self.client);
        if exists {
            remote.poll_events().await?;
            match remote.update(template, local.parameters()).await? {
                UpdateOutcome::NoChanges => {
                    writeln!(out, "Stack {name} is up to date")?;
                    return Ok(());
                }
                UpdateOutcome::Updated { stack_id } => {
                    writeln!(out, "Updating stack {name} ({stack_id})")?;
                }
            }
        } else {
            let stack_id = remote.create(template, local.parameters()).await?;
            writeln!(out, "Creating stack {name} ({stack_id})")?;
        }

        if wait || show_events {
            self.follow(&mut remote, show_events, out).await?;
        }
        Ok(())
    }

    /// Deletes a remote stack.
    ///
    /// # Errors
    ///
    /// Returns an error without `force`, for a missing stack, or if the
    /// deletion fails.
    pub async fn delete(
        &self,
        name: &str,
        force: bool,
        wait: bool,
        show_events: bool,
        out: &mut dyn Write,
    ) -> Result<()> {
        if !force {
            return Err(CloudsError::command(format!(
                "refusing to delete stack {name} without --force"
            )));
        }
        if !self.client.list_stacks().await?.contains_key(name) {
            return Err(RemoteStackError::StackNotFound {
                name: name.to_string(),
            }
            .into());
        }

        let mut remote = RemoteStack::new(name, self.client);
        remote.poll_events().await?;
        remote.delete().await?;
        writeln!(out, "Deleting stack {name}")?;

        if wait || show_events {
            self.follow(&mut remote, show_events, out).await?;
        }
        Ok(())
    }

    /// Validates local templates with the service.
    ///
    /// # Errors
    ///
    /// Returns an error if any template failed validation.
    pub async fn validate(&self, names: &[String], all: bool, out: &mut dyn Write) -> Result<()> {
        let names = resolve_names(self.store, names, all)?;
        let width = names.iter().map(String::len).max().unwrap_or(0);

        let mut failed = 0_usize;
        for name in &names {
            let failure = match self.validate_one(name).await {
                Ok(()) => None,
                Err(CloudsError::Service(e)) => Some(e.message),
                Err(e) => Some(e.to_string()),
            };
            if failure.is_some() {
                failed += 1;
            }
            writeln!(out, "{}", OutputFormatter::format_validation(name, width, failure.as_deref()))?;
        }

        if failed > 0 {
            return Err(CloudsError::command(format!(
                "{failed} of {} templates failed validation",
                names.len()
            )));
        }
        Ok(())
    }

    async fn validate_one(&self, name: &str) -> Result<()> {
        let local = self.store.load(name)?;
        let template = local_template(&local)?;
        self.client.validate_template(template.body()).await?;
        Ok(())
    }

    /// Creates a change set from the local stack.
    ///
    /// # Errors
    ///
    /// Returns an error if the stack is missing remotely and
    /// `create_missing` is not set, creation is rejected, or waiting ends in
    /// failure or timeout.
    pub async fn change_create(
        &self,
        stack: &str,
        name: &str,
        create_missing: bool,
        description: Option<&str>,
        wait: bool,
        out: &mut dyn Write,
    ) -> Result<()> {
        let local = self.store.load(stack)?;
        let template = local_template(&local)?;

        let mut remote = RemoteStack::new(stack, self.client);
        match remote.load().await {
            Ok(()) => {}
            Err(CloudsError::RemoteStack(RemoteStackError::StackNotFound { .. })) if create_missing => {}
            Err(CloudsError::RemoteStack(RemoteStackError::StackNotFound { .. })) => {
                return Err(CloudsError::command(format!(
                    "stack {stack} does not exist, pass --create-missing to create it"
                )));
            }
            Err(e) => return Err(e),
        }

        let mut change_set = ChangeSet::new(&remote, name);
        let kind = change_set
            .create(&mut remote, template, local.parameters(), description)
            .await?;
        writeln!(out, "Creating {kind} change set {name} for stack {stack}")?;

        if wait {
            match change_set.wait_until_created(self.wait_policy).await? {
                ChangeSetState::CreateFailed => {
                    let reason = change_set
                        .description()
                        .and_then(|d| d.status_reason.clone())
                        .unwrap_or_else(|| String::from("no reason given"));
                    return Err(ChangeSetError::CreateFailed {
                        name: name.to_string(),
                        reason,
                    }
                    .into());
                }
                state => writeln!(out, "Change set {name} is {state}")?,
            }
        }
        Ok(())
    }

    /// Lists the change sets of a stack.
    ///
    /// # Errors
    ///
    /// Returns an error if the stack cannot be loaded.
    pub async fn change_list(&self, stack: &str, out: &mut dyn Write) -> Result<()> {
        let mut remote = RemoteStack::new(stack, self.client);
        remote.load().await?;
        out.write_all(self.formatter.format_change_sets(remote.change_sets())?.as_bytes())?;
        Ok(())
    }

    /// Prints the proposed changes of a change set.
    ///
    /// # Errors
    ///
    /// Returns an error if the stack or change set cannot be loaded.
    pub async fn change_describe(&self, stack: &str, name: &str, out: &mut dyn Write) -> Result<()> {
        let mut remote = RemoteStack::new(stack, self.client);
        remote.load().await?;

        let mut change_set = ChangeSet::existing(&remote, name)?;
        change_set.load().await?;

        if self.formatter.format() == OutputFormat::Text {
            writeln!(out, "Change set {name}: {}", change_set.state())?;
        }
        out.write_all(self.formatter.format_changes(&change_set.changes()?)?.as_bytes())?;
        Ok(())
    }

    /// Executes a change set, optionally following the stack.
    ///
    /// # Errors
    ///
    /// Returns an error if the change set is not executable or the followed
    /// operation fails.
    pub async fn change_execute(
        &self,
        stack: &str,
        name: &str,
        wait: bool,
        show_events: bool,
        out: &mut dyn Write,
    ) -> Result<()> {
        let mut remote = RemoteStack::new(stack, self.client);
        remote.load().await?;

        let mut change_set = ChangeSet::existing(&remote, name)?;
        change_set.execute().await?;
        writeln!(out, "Executing change set {name} on stack {stack}")?;

        if wait || show_events {
            self.follow(&mut remote, show_events, out).await?;
        }
        Ok(())
    }

    /// Deletes a change set.
    ///
    /// # Errors
    ///
    /// Returns an error if the change set is unknown or cannot be deleted.
    pub async fn change_delete(&self, stack: &str, name: &str, out: &mut dyn Write) -> Result<()> {
        let mut remote = RemoteStack::new(stack, self.client);
        remote.load().await?;

        let mut change_set = ChangeSet::existing(&remote, name)?;
        change_set.delete(&mut remote).await?;
        writeln!(out, "Deleted change set {name} of stack {stack}")?;
        Ok(())
    }

    async fn follow(
        &self,
        remote: &mut RemoteStack<'a, C>,
        show_events: bool,
        out: &mut dyn Write,
    ) -> Result<()> {
        let outcome = EventPoller::new()
            .with_interval(self.poll_interval)
            .after_mutation()
            .with_output(show_events)
            .run(remote, &mut *out)
            .await?;
        report(remote.name(), outcome, out)
    }
}

fn report(name: &str, outcome: PollOutcome, out: &mut dyn Write) -> Result<()> {
    match outcome {
        PollOutcome::Completed { status } => {
            writeln!(out, "Stack {name} finished with {status}")?;
            Ok(())
        }
        PollOutcome::Failed { status } => Err(CloudsError::command(format!(
            "stack {name} failed with {status}"
        ))),
        PollOutcome::Stopped { reason } => {
            writeln!(out, "Stopped following stack {name}: {reason}")?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::{ParameterValue, Parameters};
    use crate::remote::fake::{event, FakeChangeSet, FakeCloudFormation, FakeStack};
    use crate::remote::{MockCloudFormationApi, STACK_RESOURCE_TYPE};
    use crate::template::TemplateFormat;
    use tempfile::TempDir;

    const BODY: &str = "{\n  \"Resources\": {}\n}\n";

    fn store() -> (TempDir, LocalStackStore) {
        let dir = TempDir::new().expect("tempdir");
        let store = LocalStackStore::new(dir.path().join("stacks"));
        (dir, store)
    }

    fn save(store: &LocalStackStore, name: &str, body: &str) {
        let template = Template::detect(body).expect("template");
        store
            .save(name, &template, Parameters::new(), None)
            .expect("save");
    }

    fn text(out: Vec<u8>) -> String {
        String::from_utf8(out).expect("utf8")
    }

    fn actions<'a, C: CloudFormationApi + ?Sized>(
        store: &'a LocalStackStore,
        client: &'a C,
    ) -> RemoteActions<'a, C> {
        RemoteActions::new(store, client, OutputFormatter::new(OutputFormat::Text))
            .with_poll_interval(Duration::ZERO)
            .with_wait_policy(WaitPolicy {
                interval: Duration::ZERO,
                max_attempts: 3,
            })
    }

    #[test]
    fn test_format_then_save_never_writes_parameters() {
        let (_dir, store) = store();
        let stack_dir = store.root().join("demo");
        std::fs::create_dir_all(&stack_dir).expect("mkdir");
        std::fs::write(stack_dir.join("template.json"), "{\"Resources\":{}}").expect("write");

        let loaded = store.load("demo").expect("load");
        assert!(loaded.parameters().is_empty());

        let mut out = Vec::new();
        format_stacks(&store, &[String::from("demo")], false, &mut out).expect("format");
        format_stacks(&store, &[String::from("demo")], false, &mut out).expect("format again");

        let output = text(out);
        assert!(output.contains("demo: formatted"));
        assert!(output.contains("demo: already formatted"));
        assert_eq!(
            std::fs::read_to_string(stack_dir.join("template.json")).expect("read"),
            BODY
        );
        assert!(!stack_dir.join("parameters.yaml").exists());
    }

    #[test]
    fn test_format_requires_names() {
        let (_dir, store) = store();
        let mut out = Vec::new();
        assert!(matches!(
            format_stacks(&store, &[], false, &mut out),
            Err(CloudsError::CommandFailed(_))
        ));
    }

    #[test]
    fn test_format_pipe() {
        let mut input = "{\"b\": 1, \"a\": [\"x\"]}".as_bytes();
        let mut out = Vec::new();
        format_pipe(&mut input, &mut out).expect("format");
        assert_eq!(text(out), "{\n  \"a\": [ \"x\" ],\n  \"b\": 1\n}\n");
    }

    #[test]
    fn test_clone_refuses_existing_destination() {
        let (_dir, store) = store();
        save(&store, "web", BODY);
        save(&store, "web-copy", BODY);

        let mut out = Vec::new();
        assert!(clone_stack(&store, "web", "web-copy", false, &mut out).is_err());
        clone_stack(&store, "web", "web-copy", true, &mut out).expect("forced clone");
        assert!(text(out).starts_with("Cloned web to"));
    }

    #[tokio::test]
    async fn test_update_missing_stack_only_checks_existence() {
        let (_dir, store) = store();
        save(&store, "demo", BODY);

        let mut mock = MockCloudFormationApi::new();
        mock.expect_list_stacks()
            .times(1)
            .returning(|| Ok(BTreeMap::new()));

        let mut out = Vec::new();
        let result = actions(&store, &mock)
            .update("demo", false, false, false, &mut out)
            .await;

        assert!(matches!(result, Err(CloudsError::CommandFailed(_))));
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_update_creates_missing_stack() {
        let (_dir, store) = store();
        save(&store, "web", BODY);
        let fake = FakeCloudFormation::new();

        let mut out = Vec::new();
        actions(&store, &fake)
            .update("web", true, false, false, &mut out)
            .await
            .expect("update");

        assert_eq!(fake.calls("create_stack"), 1);
        assert_eq!(
            fake.stack("web").map(|s| s.status),
            Some(String::from("CREATE_IN_PROGRESS"))
        );
        assert!(text(out).starts_with("Creating stack web"));
    }

    #[tokio::test]
    async fn test_update_up_to_date() {
        let (_dir, store) = store();
        save(&store, "web", BODY);
        let fake = FakeCloudFormation::new();
        fake.insert_stack("web", FakeStack::new(BODY, "UPDATE_COMPLETE"));

        let mut out = Vec::new();
        actions(&store, &fake)
            .update("web", false, true, true, &mut out)
            .await
            .expect("update");

        assert_eq!(text(out), "Stack web is up to date\n");
    }

    #[tokio::test]
    async fn test_update_and_follow_events() {
        colored::control::set_override(false);
        let (_dir, store) = store();
        save(&store, "web", BODY);

        let fake = FakeCloudFormation::new();
        let mut seeded = FakeStack::new("{}", "CREATE_COMPLETE");
        seeded.events = vec![event(1, "web", STACK_RESOURCE_TYPE, "CREATE_COMPLETE")];
        seeded
            .pending_events
            .push_back(vec![event(2, "web", STACK_RESOURCE_TYPE, "UPDATE_IN_PROGRESS")]);
        seeded
            .pending_events
            .push_back(vec![event(3, "web", STACK_RESOURCE_TYPE, "UPDATE_COMPLETE")]);
        fake.insert_stack("web", seeded);

        let mut out = Vec::new();
        actions(&store, &fake)
            .update("web", false, true, true, &mut out)
            .await
            .expect("update");

        let output = text(out);
        let lines: Vec<&str> = output.lines().collect();
        assert!(lines[0].starts_with("Updating stack web"));
        assert!(lines[1].contains("UPDATE_IN_PROGRESS"));
        assert!(lines[2].contains("UPDATE_COMPLETE"));
        assert_eq!(lines[3], "Stack web finished with UPDATE_COMPLETE");
        assert_eq!(fake.stack("web").map(|s| s.template), Some(String::from(BODY)));
    }

    #[tokio::test]
    async fn test_delete_requires_force() {
        let (_dir, store) = store();
        let mock = MockCloudFormationApi::new();

        let mut out = Vec::new();
        let result = actions(&store, &mock)
            .delete("web", false, false, false, &mut out)
            .await;

        assert!(matches!(result, Err(CloudsError::CommandFailed(_))));
    }

    #[tokio::test]
    async fn test_delete_and_wait() {
        let (_dir, store) = store();
        let fake = FakeCloudFormation::new();
        let mut seeded = FakeStack::new(BODY, "CREATE_COMPLETE");
        seeded.events = vec![event(1, "web", STACK_RESOURCE_TYPE, "CREATE_COMPLETE")];
        fake.insert_stack("web", seeded);
        fake.push_events("web", vec![event(2, "web", STACK_RESOURCE_TYPE, "DELETE_IN_PROGRESS")]);
        fake.push_events("web", vec![event(3, "web", STACK_RESOURCE_TYPE, "DELETE_COMPLETE")]);

        let mut out = Vec::new();
        actions(&store, &fake)
            .delete("web", true, true, false, &mut out)
            .await
            .expect("delete");

        assert_eq!(
            text(out),
            "Deleting stack web\nStack web finished with DELETE_COMPLETE\n"
        );
    }

    #[tokio::test]
    async fn test_validate_reports_each_stack() {
        colored::control::set_override(false);
        let (_dir, store) = store();
        save(&store, "good", BODY);
        save(&store, "bad", "{\"Resources\": {\"X\": {\"Type\": \"AWS::Bad\"}}}");

        let fake = FakeCloudFormation::new();
        fake.reject_template("AWS::Bad", "Unrecognized resource types: [AWS::Bad]");

        let mut out = Vec::new();
        let result = actions(&store, &fake).validate(&[], true, &mut out).await;

        assert!(matches!(result, Err(CloudsError::CommandFailed(_))));
        assert_eq!(
            text(out),
            "bad  not ok: Unrecognized resource types: [AWS::Bad]\ngood ok\n"
        );
        assert_eq!(fake.calls("validate_template"), 2);
    }

    #[tokio::test]
    async fn test_dump_writes_canonical_template() {
        let (_dir, store) = store();
        let fake = FakeCloudFormation::new();
        let mut seeded = FakeStack::new("{\"Resources\":{}}", "CREATE_COMPLETE");
        seeded.parameters.insert(String::from("Env"), String::from("prod"));
        fake.insert_stack("web", seeded);

        let mut out = Vec::new();
        let dumper = actions(&store, &fake);
        dumper
            .dump(&[String::from("web")], false, false, &mut out)
            .await
            .expect("dump");
        dumper
            .dump(&[String::from("web")], false, false, &mut out)
            .await
            .expect("second dump");

        assert_eq!(text(out), "web: dumped\nweb: unchanged\n");
        assert_eq!(fake.call_log().first(), Some(&"list_stacks"));

        let local = store.load("web").expect("load");
        assert_eq!(local.template().map(Template::body), Some(BODY));
        assert_eq!(local.template().map(Template::format), Some(TemplateFormat::Json));
        assert_eq!(
            local.parameters().get("Env"),
            Some(&ParameterValue::Text(String::from("prod")))
        );
    }

    #[tokio::test]
    async fn test_dump_refuses_to_overwrite_different_local_copy() {
        let (_dir, store) = store();
        save(&store, "web", "{\"Resources\": {\"Old\": {\"Type\": \"AWS::SQS::Queue\"}}}");

        let fake = FakeCloudFormation::new();
        fake.insert_stack("web", FakeStack::new(BODY, "CREATE_COMPLETE"));

        let mut out = Vec::new();
        let dumper = actions(&store, &fake);
        let result = dumper.dump(&[String::from("web")], false, false, &mut out).await;
        assert!(matches!(result, Err(CloudsError::CommandFailed(_))));

        dumper
            .dump(&[], true, true, &mut out)
            .await
            .expect("forced dump");
        let local = store.load("web").expect("load");
        assert_eq!(local.template().map(Template::body), Some(BODY));
    }

    #[tokio::test]
    async fn test_dump_fails_when_no_named_stack_exists() {
        let (_dir, store) = store();
        let fake = FakeCloudFormation::new();
        fake.insert_stack("web", FakeStack::new(BODY, "CREATE_COMPLETE"));

        let mut out = Vec::new();
        let dumper = actions(&store, &fake);
        let result = dumper.dump(&[String::from("ghost")], false, false, &mut out).await;

        assert!(matches!(result, Err(CloudsError::CommandFailed(ref m)) if m == "no stacks to dump"));
        assert_eq!(fake.call_log(), vec!["list_stacks"]);
        assert!(!store.exists("ghost"));
        assert!(out.is_empty());

        dumper
            .dump(&[String::from("ghost"), String::from("web")], false, false, &mut out)
            .await
            .expect("dump with one known stack");
        assert_eq!(text(out), "web: dumped\n");
    }

    #[tokio::test]
    async fn test_list_marks_local_only_stacks() {
        let (_dir, store) = store();
        save(&store, "web", BODY);
        let fake = FakeCloudFormation::new();
        fake.insert_stack("db", FakeStack::new(BODY, "UPDATE_COMPLETE"));

        let mut out = Vec::new();
        RemoteActions::new(&store, &fake, OutputFormatter::new(OutputFormat::Json))
            .list(false, &mut out)
            .await
            .expect("list");

        let value: serde_json::Value = serde_json::from_slice(&out).expect("json");
        assert_eq!(value["db"], "UPDATE_COMPLETE");
        assert_eq!(value["web"], LOCAL_ONLY);
    }

    #[tokio::test]
    async fn test_events_prints_history() {
        colored::control::set_override(false);
        let (_dir, store) = store();
        let fake = FakeCloudFormation::new();
        let mut seeded = FakeStack::new(BODY, "CREATE_COMPLETE");
        seeded.events = vec![
            event(1, "web", STACK_RESOURCE_TYPE, "CREATE_IN_PROGRESS"),
            event(2, "web", STACK_RESOURCE_TYPE, "CREATE_COMPLETE"),
        ];
        fake.insert_stack("web", seeded);

        let mut out = Vec::new();
        actions(&store, &fake)
            .events("web", true, &mut out)
            .await
            .expect("events");

        let output = text(out);
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("1970-01-01/00:00:01 CREATE_IN_PROGRESS"));
        assert_eq!(lines[2], "Stack web finished with CREATE_COMPLETE");
    }

    #[tokio::test]
    async fn test_change_create_requires_existing_stack() {
        let (_dir, store) = store();
        save(&store, "web", BODY);
        let fake = FakeCloudFormation::new();

        let mut out = Vec::new();
        let result = actions(&store, &fake)
            .change_create("web", "cs1", false, None, false, &mut out)
            .await;

        assert!(matches!(result, Err(CloudsError::CommandFailed(_))));
        assert_eq!(fake.calls("create_change_set"), 0);
    }

    #[tokio::test]
    async fn test_change_create_wait_and_execute() {
        let (_dir, store) = store();
        save(&store, "web", BODY);
        let fake = FakeCloudFormation::new();
        fake.insert_stack("web", FakeStack::new("{}", "UPDATE_COMPLETE"));
        fake.set_change_set_progress(&["CREATE_COMPLETE"]);

        let mut out = Vec::new();
        let runner = actions(&store, &fake);
        runner
            .change_create("web", "cs1", false, Some("bump"), true, &mut out)
            .await
            .expect("create");
        runner
            .change_execute("web", "cs1", false, false, &mut out)
            .await
            .expect("execute");

        assert_eq!(
            text(out),
            "Creating UPDATE change set cs1 for stack web\n\
             Change set cs1 is CREATE_COMPLETE\n\
             Executing change set cs1 on stack web\n"
        );
        assert_eq!(fake.calls("execute_change_set"), 1);
    }

    #[tokio::test]
    async fn test_change_create_reports_failure_reason() {
        let (_dir, store) = store();
        save(&store, "web", BODY);
        let fake = FakeCloudFormation::new();
        fake.insert_stack("web", FakeStack::new("{}", "UPDATE_COMPLETE"));
        fake.set_change_set_progress(&["FAILED"]);

        let mut out = Vec::new();
        let result = actions(&store, &fake)
            .change_create("web", "cs1", false, None, true, &mut out)
            .await;

        assert!(matches!(
            result,
            Err(CloudsError::ChangeSet(ChangeSetError::CreateFailed { .. }))
        ));
    }

    #[tokio::test]
    async fn test_change_list_describe_delete() {
        colored::control::set_override(false);
        let (_dir, store) = store();
        let fake = FakeCloudFormation::new();
        let mut seeded = FakeStack::new(BODY, "UPDATE_COMPLETE");
        seeded.change_sets.insert(
            String::from("cs1"),
            FakeChangeSet::new("CREATE_COMPLETE", Vec::new()),
        );
        fake.insert_stack("web", seeded);

        let runner = actions(&store, &fake);

        let mut out = Vec::new();
        runner.change_list("web", &mut out).await.expect("list");
        assert!(text(out).contains("cs1"));

        let mut out = Vec::new();
        runner
            .change_describe("web", "cs1", &mut out)
            .await
            .expect("describe");
        assert_eq!(text(out), "Change set cs1: CREATE_COMPLETE\nNo changes.\n");

        let mut out = Vec::new();
        runner
            .change_delete("web", "cs1", &mut out)
            .await
            .expect("delete");
        assert!(fake.stack("web").is_some_and(|s| s.change_sets.is_empty()));
        assert!(matches!(
            runner.change_delete("web", "cs1", &mut out).await,
            Err(CloudsError::ChangeSet(ChangeSetError::NotFound { .. }))
        ));
    }
}
