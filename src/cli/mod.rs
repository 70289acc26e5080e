//! Command-line interface for the clouds tool.
//!
//! Command definitions, output formatting and the actions behind each
//! command.

mod actions;
mod commands;
mod output;

pub use actions::{clone_stack, format_pipe, format_stacks, list_local, RemoteActions};
pub use commands::{ChangeCommands, Cli, Commands, OutputFormat};
pub use output::{OutputFormatter, LOCAL_ONLY};
