//! Common types and utilities shared by the certkeeper crates.

pub mod command;
pub mod ids;

pub use command::{
    CommandError, CommandExecutor, CommandOutput, CommandSpec, SystemExecutor,
    DEFAULT_COMMAND_TIMEOUT,
};
pub use ids::CertName;
