//! Runtime settings resolved from flags, environment and `.env`.
//!
//! Flags and environment variables are merged by the CLI parser; this
//! module loads the optional `.env` file beforehand and validates the result.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::ConfigError;
use crate::local::LocalStackStore;

/// Default stacks root, relative to the working directory.
pub const DEFAULT_STACKS_DIR: &str = "stacks";

/// Environment variable overriding the stacks root.
pub const STACKS_DIR_ENV: &str = "CLOUDS_STACKS_DIR";

/// Remote client settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientConfig {
    /// Region override; the SDK's default chain applies when unset.
    pub region: Option<String>,
    /// Named credentials profile.
    pub profile: Option<String>,
}

impl ClientConfig {
    /// Creates client settings, treating blank values as unset.
    #[must_use]
    pub fn new(region: Option<String>, profile: Option<String>) -> Self {
        Self {
            region: non_blank(region),
            profile: non_blank(profile),
        }
    }
}

/// Resolved settings for one invocation.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Directory holding one subdirectory per local stack.
    pub stacks_root: PathBuf,
    /// Remote client settings.
    pub client: ClientConfig,
}

impl Settings {
    /// Creates settings.
    #[must_use]
    pub fn new(stacks_root: impl Into<PathBuf>, client: ClientConfig) -> Self {
        Self {
            stacks_root: stacks_root.into(),
            client,
        }
    }

    /// Checks that the settings are usable.
    ///
    /// A missing stacks root is fine; it is created on first save.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidStacksRoot`] if the root exists but is not a directory.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stacks_root.exists() && !self.stacks_root.is_dir() {
            return Err(ConfigError::InvalidStacksRoot {
                path: self.stacks_root.clone(),
            });
        }
        debug!(
            "Stacks root: {}, region: {}, profile: {}",
            self.stacks_root.display(),
            self.client.region.as_deref().unwrap_or("default"),
            self.client.profile.as_deref().unwrap_or("default"),
        );
        Ok(())
    }

    /// Store over the configured stacks root.
    #[must_use]
    pub fn stack_store(&self) -> LocalStackStore {
        LocalStackStore::new(&self.stacks_root)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::new(DEFAULT_STACKS_DIR, ClientConfig::default())
    }
}

/// Loads `<base>/.env` into the process environment if the file exists.
///
/// Variables already set in the environment win.
///
/// # Errors
///
/// Returns [`ConfigError::DotEnv`] if the file exists but cannot be parsed.
pub fn load_dotenv(base: &Path) -> Result<Option<PathBuf>, ConfigError> {
    let env_path = base.join(".env");
    if !env_path.exists() {
        return Ok(None);
    }

    info!("Loading environment from: {}", env_path.display());
    dotenvy::from_path(&env_path).map_err(|e| ConfigError::DotEnv {
        path: env_path.clone(),
        message: e.to_string(),
    })?;
    Ok(Some(env_path))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
