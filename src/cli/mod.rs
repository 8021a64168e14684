//! Command-line interface.

pub mod commands;
pub mod parser;

pub use commands::run;
pub use parser::{Cli, Command};
