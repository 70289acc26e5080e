// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(warnings)]                    // All warnings are treated as errors
#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(dead_code)]                   // Unused code is forbidden
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_imports)]              // Unused imports are forbidden
#![deny(unused_variables)]            // Unused variables are forbidden
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # clouds-aws
//!
//! Manage CloudFormation stacks as version-controlled local directories.
//!
//! ## Overview
//!
//! Every stack lives in its own directory holding a template and an
//! optional parameters file:
//!
//! ```text
//! stacks/<name>/template.json   (or template.yaml)
//! stacks/<name>/parameters.yaml
//! ```
//!
//! The `clouds` binary moves stacks between those directories and the
//! service:
//!
//! - `dump` downloads deployed stacks in canonical form
//! - `update` creates or updates a stack from its directory
//! - `change` manages change sets for reviewed deployments
//! - `events` follows a stack until its operation settles
//!
//! ## Modules
//!
//! - [`template`]: format detection and canonical rendering
//! - [`local`]: on-disk stack directories
//! - [`remote`]: service boundary, stack model, change sets, event polling
//! - [`config`]: explicit client and stack-root settings
//! - [`cli`]: command-line interface
//!
//! ## Example
//!
//! ```no_run
//! use clouds_aws::local::LocalStackStore;
//! use clouds_aws::template::TemplateFormat;
//!
//! let store = LocalStackStore::new("stacks");
//! let stack = store.load("web")?;
//! if let Some(template) = stack.template() {
//!     let yaml = template.convert(TemplateFormat::Yaml)?;
//!     store.save("web", &yaml, stack.parameters().clone(), None)?;
//! }
//! # Ok::<(), clouds_aws::CloudsError>(())
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod cli;
pub mod config;
pub mod error;
pub mod local;
pub mod remote;
pub mod template;

// ============================================================================
// Re-exports
// ============================================================================

pub use cli::{Cli, Commands, OutputFormatter, RemoteActions};
pub use config::{ClientConfig, Settings};
pub use error::{CloudsError, Result};
pub use local::{LocalStack, LocalStackStore, Parameters};
pub use remote::{AwsCloudFormation, ChangeSet, CloudFormationApi, EventPoller, RemoteStack};
pub use template::{Template, TemplateFormat};
