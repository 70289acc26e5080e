//! Local stack storage.
//!
//! Each stack lives in its own directory under a stacks root and holds a
//! template file plus an optional parameters file.

mod parameters;
mod stack;
mod store;

pub use parameters::{ParameterValue, Parameters};
pub use stack::{LocalStack, PARAMETERS_FILE};
pub use store::LocalStackStore;
