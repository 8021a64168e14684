//! Command-line argument definitions.

use clap::{Parser, Subcommand};

/// Distributed research orchestrator exposed as an MCP tool server.
#[derive(Debug, Parser)]
#[command(name = "widescreen-rs", version, about)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the MCP server (stdio transport by default).
    Serve {
        /// Serve over streamable HTTP at `host:port` instead of stdio.
        #[arg(long, value_name = "ADDR")]
        http: Option<String>,
    },

    /// Print an embedded guide.
    Guide {
        /// Guide name, or `list` to see all.
        #[arg(default_value = "main")]
        name: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serve_parses() {
        let cli = Cli::try_parse_from(["widescreen-rs", "serve"]).expect("parse");
        assert!(matches!(cli.command, Command::Serve { http: None }));
    }

    #[test]
    fn test_serve_http_addr() {
        let cli = Cli::try_parse_from(["widescreen-rs", "serve", "--http", "0.0.0.0:8080"])
            .expect("parse");
        match cli.command {
            Command::Serve { http } => assert_eq!(http.as_deref(), Some("0.0.0.0:8080")),
            Command::Guide { .. } => panic!("wrong command"),
        }
    }

    #[test]
    fn test_guide_default_name() {
        let cli = Cli::try_parse_from(["widescreen-rs", "guide"]).expect("parse");
        match cli.command {
            Command::Guide { name } => assert_eq!(name, "main"),
            Command::Serve { .. } => panic!("wrong command"),
        }
    }
}
