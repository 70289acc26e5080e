//! Configuration for the clouds tool.
//!
//! Settings come from command-line flags, environment variables and an
//! optional `.env` file in the working directory, in that precedence.

mod settings;

pub use settings::{
    load_dotenv, ClientConfig, Settings, DEFAULT_STACKS_DIR, STACKS_DIR_ENV,
};
