pub mod commands;
pub mod input;

pub use commands::{BiometricCommands, Cli, Commands, ConfigCommands};
