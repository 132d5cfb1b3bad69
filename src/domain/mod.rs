//! Prompt commands and the registry that serves them
//!
//! Provides command descriptors, the handler contract, the registry and the
//! built-in prompts shipped with the binary.

pub mod command;
pub mod prompts;
pub mod registry;
