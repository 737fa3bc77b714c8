//! Command line configuration.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `MERIDIAN_CATALOG` | `meridian.json` | Catalog file |
//! | `MERIDIAN_LOG_LEVEL` | warn | Log level |
//! | `MERIDIAN_DATABASE` | `:memory:` | SQLite database queries run against |

use std::path::PathBuf;

use clap::{Parser, Subcommand};

const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Resolves resource metadata and plans filtered collection queries.
#[derive(Debug, Clone, Parser)]
#[command(name = "meridian")]
#[command(about = "Resource metadata and filter query planner")]
pub struct Cli {
    /// Catalog file declaring classes, resources and filters.
    #[arg(short, long, env = "MERIDIAN_CATALOG", default_value = "meridian.json")]
    pub catalog: PathBuf,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, env = "MERIDIAN_LOG_LEVEL", default_value = "warn")]
    pub log_level: String,

    /// SQLite database path, `:memory:` for a transient database loaded
    /// from the catalog's `data` section.
    #[arg(long, env = "MERIDIAN_DATABASE", default_value = ":memory:")]
    pub database: String,

    /// Command to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Lists resource classes and their operations.
    Resources,

    /// Prints the resolved metadata of one class.
    Resolve {
        /// Resource class.
        class: String,
    },

    /// Plans the query of a collection operation.
    Query {
        /// Resource class.
        class: String,

        /// Operation name; the first collection operation when omitted.
        #[arg(short, long, conflicts_with = "path")]
        operation: Option<String>,

        /// Request path selecting the operation and its URI variables.
        #[arg(short, long)]
        path: Option<String>,

        /// Query string, without the leading `?`.
        #[arg(short, long, default_value = "")]
        query: String,

        /// Runs the planned query and prints the rows.
        #[arg(short, long)]
        execute: bool,
    },

    /// Loads the catalog's `data` section into the database.
    Load,
}

impl Cli {
    /// Validates option values clap cannot check.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if !LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            errors.push(format!(
                "Log level must be one of {}, got '{}'",
                LOG_LEVELS.join(", "),
                self.log_level
            ));
        }

        if let Command::Query {
            path: Some(path), ..
        } = &self.command
        {
            if !path.starts_with('/') {
                errors.push(format!("Path '{}' must start with '/'", path));
            }
        }

        if matches!(self.command, Command::Load) && self.is_memory() {
            errors.push("Loading data needs a database file".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Returns whether queries run against a transient database.
    pub fn is_memory(&self) -> bool {
        self.database == ":memory:"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("meridian").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&["resources"]);
        assert_eq!(cli.catalog, PathBuf::from("meridian.json"));
        assert_eq!(cli.log_level, "warn");
        assert!(cli.is_memory());
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn test_query_arguments() {
        let cli = parse(&[
            "--catalog",
            "shop.json",
            "query",
            "Book",
            "--path",
            "/publishers/1/books",
            "-q",
            "title=dune",
            "--execute",
        ]);
        match cli.command {
            Command::Query {
                class,
                path,
                query,
                execute,
                operation,
            } => {
                assert_eq!(class, "Book");
                assert_eq!(path.as_deref(), Some("/publishers/1/books"));
                assert_eq!(query, "title=dune");
                assert!(execute);
                assert!(operation.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_operation_conflicts_with_path() {
        let result = Cli::try_parse_from([
            "meridian", "query", "Book", "--operation", "x", "--path", "/books",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate() {
        let cli = parse(&["--log-level", "loud", "query", "Book", "--path", "books"]);
        let errors = cli.validate().unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("Log level"));

        let cli = parse(&["load"]);
        assert!(cli.validate().unwrap_err()[0].contains("database file"));
    }
}
