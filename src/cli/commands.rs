//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::config::{DEFAULT_STACKS_DIR, STACKS_DIR_ENV};

/// clouds - manage CloudFormation stacks as local templates.
#[derive(Parser, Debug)]
#[command(name = "clouds")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// AWS region to operate in.
    #[arg(short, long, global = true, env = "AWS_REGION")]
    pub region: Option<String>,

    /// AWS credentials profile.
    #[arg(short, long, global = true, env = "AWS_PROFILE")]
    pub profile: Option<String>,

    /// Directory holding one subdirectory per stack.
    #[arg(long, global = true, env = STACKS_DIR_ENV, default_value = DEFAULT_STACKS_DIR)]
    pub stacks_dir: PathBuf,

    /// Log progress information.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log debugging information.
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Output format for listings and descriptions.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Copy a local stack to a new name.
    Clone {
        /// Source stack.
        stack: String,

        /// Destination stack.
        new_stack: String,

        /// Overwrite an existing destination.
        #[arg(short, long)]
        force: bool,
    },

    /// Delete a remote stack.
    Delete {
        /// Stack to delete.
        stack: String,

        /// Required to actually delete.
        #[arg(short, long)]
        force: bool,

        /// Wait for the deletion to finish.
        #[arg(short, long)]
        wait: bool,

        /// Print events while waiting.
        #[arg(short, long)]
        events: bool,
    },

    /// Show parameters, outputs and resources of a remote stack.
    Describe {
        /// Stack to describe.
        stack: String,

        /// Print JSON instead of tables.
        #[arg(short, long)]
        json: bool,
    },

    /// Download remote stacks into local directories.
    Dump {
        /// Stacks to download.
        stacks: Vec<String>,

        /// Download every remote stack.
        #[arg(short, long)]
        all: bool,

        /// Overwrite existing local stacks.
        #[arg(short, long)]
        force: bool,
    },

    /// Print the event history of a remote stack.
    Events {
        /// Stack whose events to print.
        stack: String,

        /// Keep printing new events until the stack settles.
        #[arg(short, long)]
        follow: bool,
    },

    /// Rewrite local templates in canonical form.
    Format {
        /// Stacks to reformat.
        stacks: Vec<String>,

        /// Reformat every local stack.
        #[arg(short, long)]
        all: bool,

        /// Read a template from stdin and write it to stdout.
        #[arg(long)]
        pipe: bool,
    },

    /// List local and remote stacks.
    List {
        /// Only local stacks.
        #[arg(short, long)]
        local: bool,

        /// Only remote stacks.
        #[arg(long, conflicts_with = "local")]
        remote: bool,
    },

    /// Create or update a remote stack from its local directory.
    Update {
        /// Stack to deploy.
        stack: String,

        /// Create the stack if it does not exist remotely.
        #[arg(short, long)]
        create_missing: bool,

        /// Wait for the operation to finish.
        #[arg(short, long)]
        wait: bool,

        /// Print events while waiting.
        #[arg(short, long)]
        events: bool,
    },

    /// Validate local templates with the service.
    Validate {
        /// Stacks to validate.
        stacks: Vec<String>,

        /// Validate every local stack.
        #[arg(short, long)]
        all: bool,
    },

    /// Manage change sets.
    Change {
        /// Change-set subcommand.
        #[command(subcommand)]
        command: ChangeCommands,
    },
}

/// Change-set subcommands.
#[derive(Subcommand, Debug)]
pub enum ChangeCommands {
    /// Create a change set from the local stack.
    Create {
        /// Stack the change set belongs to.
        stack: String,

        /// Change-set name.
        name: String,

        /// Allow a change set that creates the stack.
        #[arg(short, long)]
        create_missing: bool,

        /// Change-set description.
        #[arg(long)]
        description: Option<String>,

        /// Wait until the change set is ready.
        #[arg(short, long)]
        wait: bool,
    },

    /// List change sets of a stack.
    List {
        /// Stack whose change sets to list.
        stack: String,
    },

    /// Show the changes of a change set.
    Describe {
        /// Stack the change set belongs to.
        stack: String,

        /// Change-set name.
        name: String,
    },

    /// Execute a change set.
    Execute {
        /// Stack the change set belongs to.
        stack: String,

        /// Change-set name.
        name: String,

        /// Wait for the stack operation to finish.
        #[arg(short, long)]
        wait: bool,

        /// Print events while waiting.
        #[arg(short, long)]
        events: bool,
    },

    /// Delete a change set.
    Delete {
        /// Stack the change set belongs to.
        stack: String,

        /// Change-set name.
        name: String,
    },
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output.
    Json,
}
