//! CLI command definitions for the `replica` binary.
//!
//! Uses clap derive macros for argument parsing.

pub mod files;
pub mod pipeline;
pub mod render;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Clone live web pages into static HTML with AI.
#[derive(Parser)]
#[command(name = "replica", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Detailed output (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to the configuration file (else `REPLICA_CONFIG`, then `./replica.toml`).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP/WebSocket server.
    Serve {
        /// Port to listen on (overrides `[server].port`).
        #[arg(long, short)]
        port: Option<u16>,

        /// Host address to bind to (overrides `[server].host`).
        #[arg(long)]
        host: Option<String>,
    },

    /// Clone a page into the output directory.
    Clone {
        /// Page URL (http or https).
        url: String,

        /// Print streamed AI tokens as they arrive.
        #[arg(long)]
        tokens: bool,
    },

    /// Apply a natural-language edit to the cloned page.
    Modify {
        /// What to change, e.g. "make the header sticky".
        prompt: String,

        /// Print streamed AI tokens as they arrive.
        #[arg(long)]
        tokens: bool,
    },

    /// List the output directory, or print one file.
    Files {
        /// Relative path of a file to print.
        path: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_clone_with_global_flags() {
        let cli = Cli::try_parse_from(["replica", "clone", "https://example.com", "--json", "-vv"])
            .unwrap();
        assert!(cli.json);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Clone { url, tokens } => {
                assert_eq!(url, "https://example.com");
                assert!(!tokens);
            }
            _ => panic!("expected clone"),
        }
    }

    #[test]
    fn parses_serve_overrides() {
        let cli = Cli::try_parse_from(["replica", "serve", "--port", "9000", "--host", "0.0.0.0"])
            .unwrap();
        match cli.command {
            Commands::Serve { port, host } => {
                assert_eq!(port, Some(9000));
                assert_eq!(host.as_deref(), Some("0.0.0.0"));
            }
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn files_path_is_optional() {
        let cli = Cli::try_parse_from(["replica", "files"]).unwrap();
        assert!(matches!(cli.command, Commands::Files { path: None }));

        let cli = Cli::try_parse_from(["replica", "files", "index.html"]).unwrap();
        assert!(matches!(cli.command, Commands::Files { path: Some(ref p) } if p == "index.html"));
    }

    #[test]
    fn modify_requires_prompt() {
        assert!(Cli::try_parse_from(["replica", "modify"]).is_err());
    }
}
