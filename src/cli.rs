//! Command-line interface definitions and parsing
//!
//! This module defines the CLI structure for tagq using the `clap` crate.
//!
//! # Commands
//!
//! - **import**: Load a JSON catalog into the database
//! - **search**: Run a query and print matching post ids
//! - **explain**: Show how a query is tokenized, parsed, counted and ordered
//! - **normalize**: Print the canonical form of a query
//! - **config**: Inspect configuration
//!
//! # Examples
//!
//! ```
//! use tagq::cli::{Cli, Commands};
//!
//! let cli = Cli::parse_from_args(["tagq", "search", "cat -dog", "--as", "alice"]);
//! match cli.command {
//!     Commands::Search { query, user, .. } => {
//!         assert_eq!(query, "cat -dog");
//!         assert_eq!(user.as_deref(), Some("alice"));
//!     }
//!     _ => unreachable!(),
//! }
//! ```

use clap::{Parser, Subcommand};
use std::ffi::OsString;
use std::path::PathBuf;

/// Main CLI structure
#[derive(Parser, Debug)]
#[command(name = "tagq")]
#[command(about = "A tag query engine for post collections", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Database directory (overrides config)
    #[arg(long = "db", value_name = "PATH", global = true)]
    pub db: Option<PathBuf>,

    /// Suppress informational output (only print results)
    #[arg(short = 'q', long = "quiet", global = true)]
    pub quiet: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Import a JSON catalog of posts, users, pools and aliases
    #[command(visible_alias = "i")]
    Import {
        /// Catalog file to import
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Search posts and print matching ids
    #[command(visible_alias = "s")]
    Search {
        /// Query string, e.g. "cat_ears -dog rating:s order:score"
        #[arg(value_name = "QUERY")]
        query: String,

        /// Evaluate as this user instead of anonymously
        #[arg(long = "as", value_name = "USER")]
        user: Option<String>,

        /// Hide deleted posts unless the query mentions status:
        #[arg(long = "hide-deleted")]
        hide_deleted: bool,
    },

    /// Show the tokens, clauses, tag count and ordering of a query
    #[command(visible_alias = "e")]
    Explain {
        #[arg(value_name = "QUERY")]
        query: String,
    },

    /// Print the canonical form of a query
    #[command(visible_alias = "n")]
    Normalize {
        #[arg(value_name = "QUERY")]
        query: String,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug, Clone, Copy)]
pub enum ConfigCommands {
    /// Print the effective configuration as TOML
    Show,
    /// Print the configuration file location
    Path,
}

impl Cli {
    /// Parse command line arguments
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Parse from an explicit argument list
    #[must_use]
    pub fn parse_from_args<I, T>(args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Self::parse_from(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_flags() {
        let cli = Cli::parse_from_args(["tagq", "search", "aaa", "--hide-deleted", "-q"]);
        assert!(cli.quiet);
        match cli.command {
            Commands::Search {
                query,
                user,
                hide_deleted,
            } => {
                assert_eq!(query, "aaa");
                assert!(user.is_none());
                assert!(hide_deleted);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_global_db_after_subcommand() {
        let cli = Cli::parse_from_args(["tagq", "normalize", "b a", "--db", "/tmp/x"]);
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/x")));
        assert!(matches!(cli.command, Commands::Normalize { .. }));
    }

    #[test]
    fn test_aliases() {
        let cli = Cli::parse_from_args(["tagq", "e", "order:score"]);
        assert!(matches!(cli.command, Commands::Explain { .. }));

        let cli = Cli::parse_from_args(["tagq", "config", "show"]);
        assert!(matches!(
            cli.command,
            Commands::Config {
                command: ConfigCommands::Show
            }
        ));
    }

    #[test]
    fn test_rejects_missing_query() {
        assert!(Cli::try_parse_from(["tagq", "search"]).is_err());
    }
}
