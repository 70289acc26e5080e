//! clouds CLI entrypoint.
//!
//! This is the main entrypoint for the clouds command-line tool.

use std::path::Path;
use std::process::ExitCode;

use clouds_aws::cli::{
    clone_stack, format_pipe, format_stacks, list_local, ChangeCommands, Cli, Commands,
    OutputFormatter, RemoteActions,
};
use clouds_aws::config::{load_dotenv, ClientConfig, Settings};
use clouds_aws::error::Result;
use clouds_aws::remote::AwsCloudFormation;

use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    // Variables from .env must be visible before clap reads the environment
    let dotenv = load_dotenv(Path::new("."));
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.debug);

    match dotenv {
        Ok(Some(path)) => debug!("Loaded environment from {}", path.display()),
        Ok(None) => {}
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    }

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system.
fn init_logging(verbose: bool, debug: bool) {
    let level = if debug {
        "debug"
    } else if verbose {
        "info"
    } else {
        "warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(level))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Main async entry point.
async fn run(cli: Cli) -> Result<()> {
    let settings = Settings::new(
        cli.stacks_dir.clone(),
        ClientConfig::new(cli.region.clone(), cli.profile.clone()),
    );
    settings.validate()?;

    let store = settings.stack_store();
    let formatter = OutputFormatter::new(cli.output);
    let mut out = std::io::stdout().lock();

    match cli.command {
        Commands::Clone {
            stack,
            new_stack,
            force,
        } => clone_stack(&store, &stack, &new_stack, force, &mut out),
        Commands::Format { pipe: true, .. } => format_pipe(&mut std::io::stdin().lock(), &mut out),
        Commands::Format { stacks, all, .. } => format_stacks(&store, &stacks, all, &mut out),
        Commands::List { local: true, .. } => list_local(&store, formatter, &mut out),
        Commands::List { remote, .. } => {
            let client = create_client(&settings).await;
            RemoteActions::new(&store, &client, formatter)
                .list(remote, &mut out)
                .await
        }
        Commands::Delete {
            stack,
            force,
            wait,
            events,
        } => {
            let client = create_client(&settings).await;
            RemoteActions::new(&store, &client, formatter)
                .delete(&stack, force, wait, events, &mut out)
                .await
        }
        Commands::Describe { stack, json } => {
            let client = create_client(&settings).await;
            RemoteActions::new(&store, &client, formatter)
                .describe(&stack, json, &mut out)
                .await
        }
        Commands::Dump { stacks, all, force } => {
            let client = create_client(&settings).await;
            RemoteActions::new(&store, &client, formatter)
                .dump(&stacks, all, force, &mut out)
                .await
        }
        Commands::Events { stack, follow } => {
            let client = create_client(&settings).await;
            RemoteActions::new(&store, &client, formatter)
                .events(&stack, follow, &mut out)
                .await
        }
        Commands::Update {
            stack,
            create_missing,
            wait,
            events,
        } => {
            let client = create_client(&settings).await;
            RemoteActions::new(&store, &client, formatter)
                .update(&stack, create_missing, wait, events, &mut out)
                .await
        }
        Commands::Validate { stacks, all } => {
            let client = create_client(&settings).await;
            RemoteActions::new(&store, &client, formatter)
                .validate(&stacks, all, &mut out)
                .await
        }
        Commands::Change { command } => {
            let client = create_client(&settings).await;
            let actions = RemoteActions::new(&store, &client, formatter);
            cmd_change(&actions, command, &mut out).await
        }
    }
}

/// Change-set commands.
async fn cmd_change(
    actions: &RemoteActions<'_, AwsCloudFormation>,
    command: ChangeCommands,
    out: &mut dyn std::io::Write,
) -> Result<()> {
    match command {
        ChangeCommands::Create {
            stack,
            name,
            create_missing,
            description,
            wait,
        } => {
            actions
                .change_create(&stack, &name, create_missing, description.as_deref(), wait, out)
                .await
        }
        ChangeCommands::List { stack } => actions.change_list(&stack, out).await,
        ChangeCommands::Describe { stack, name } => actions.change_describe(&stack, &name, out).await,
        ChangeCommands::Execute {
            stack,
            name,
            wait,
            events,
        } => actions.change_execute(&stack, &name, wait, events, out).await,
        ChangeCommands::Delete { stack, name } => actions.change_delete(&stack, &name, out).await,
    }
}

/// Creates the CloudFormation client for the configured region and profile.
async fn create_client(settings: &Settings) -> AwsCloudFormation {
    AwsCloudFormation::connect(&settings.client).await
}
