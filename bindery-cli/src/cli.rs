//! CLI argument parsing definitions

use bindery_core::{Bindable, DataSize};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "bindery", author, version, about, long_about = None)]
pub struct Cli {
    /// Additional configuration file (.properties, .yaml or .yml); may be repeated, later files win
    #[arg(long = "file", value_name = "PATH", global = true)]
    pub files: Vec<PathBuf>,

    /// Directory searched for application.{properties,yaml,yml}; may be repeated
    #[arg(long = "location", value_name = "DIR", global = true)]
    pub locations: Vec<PathBuf>,

    /// Base name of the configuration files to look for
    #[arg(long = "name", id = "config_name", value_name = "NAME", global = true)]
    pub name: Option<String>,

    /// Only read environment variables starting with PREFIX_
    #[arg(long, value_name = "PREFIX", global = true)]
    pub env_prefix: Option<String>,

    /// Ignore environment variables
    #[arg(long, global = true, conflicts_with = "env_prefix")]
    pub no_env: bool,

    /// Set the log level (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Bind a single property and print its value
    Get {
        /// Property name, in any relaxed form
        name: String,

        /// Type to bind to
        #[arg(long = "type", value_enum, default_value_t = TargetType::String)]
        target: TargetType,

        /// Print the value as JSON
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        overrides: Overrides,
    },

    /// List every property, highest-priority source first
    List {
        /// Only list properties under this name
        prefix: Option<String>,

        #[command(flatten)]
        overrides: Overrides,
    },

    /// Bind a property and explain where its value comes from, or why it failed
    Explain {
        /// Property name, in any relaxed form
        name: String,

        /// Type to bind to
        #[arg(long = "type", value_enum)]
        target: TargetType,

        #[command(flatten)]
        overrides: Overrides,
    },

    /// Show the property sources in priority order
    Sources {
        #[command(flatten)]
        overrides: Overrides,
    },
}

impl Commands {
    pub fn overrides(&self) -> &Overrides {
        match self {
            Commands::Get { overrides, .. }
            | Commands::List { overrides, .. }
            | Commands::Explain { overrides, .. }
            | Commands::Sources { overrides } => overrides,
        }
    }
}

/// Arguments after `--`, read as `--key=value` command line properties
#[derive(Args, Debug, Default)]
pub struct Overrides {
    #[arg(last = true, value_name = "ARGS", allow_hyphen_values = true)]
    pub args: Vec<String>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetType {
    String,
    Int,
    Uint,
    Float,
    Bool,
    Duration,
    DataSize,
    /// Comma-separated or indexed list of strings
    List,
    /// Map of string keys to string values
    Map,
}

impl TargetType {
    pub fn bindable(self) -> Bindable {
        match self {
            TargetType::String => Bindable::of::<String>(),
            TargetType::Int => Bindable::of::<i64>(),
            TargetType::Uint => Bindable::of::<u64>(),
            TargetType::Float => Bindable::of::<f64>(),
            TargetType::Bool => Bindable::of::<bool>(),
            TargetType::Duration => Bindable::of::<Duration>(),
            TargetType::DataSize => Bindable::of::<DataSize>(),
            TargetType::List => Bindable::list_of::<String>(),
            TargetType::Map => Bindable::map_of::<String, String>(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_get_with_overrides() {
        let cli = Cli::try_parse_from([
            "bindery",
            "--file",
            "a.yaml",
            "--file",
            "b.properties",
            "get",
            "app.port",
            "--type",
            "uint",
            "--",
            "--app.port=9000",
        ])
        .unwrap();
        assert_eq!(cli.files, vec![PathBuf::from("a.yaml"), PathBuf::from("b.properties")]);
        match &cli.command {
            Commands::Get { name, target, json, .. } => {
                assert_eq!(name, "app.port");
                assert_eq!(*target, TargetType::Uint);
                assert!(!json);
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert_eq!(cli.command.overrides().args, vec!["--app.port=9000".to_string()]);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["bindery", "list", "server", "--no-env", "--log-level", "debug"]).unwrap();
        assert!(cli.no_env);
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert!(matches!(cli.command, Commands::List { prefix: Some(ref p), .. } if p == "server"));
    }

    #[test]
    fn test_explain_requires_type() {
        assert!(Cli::try_parse_from(["bindery", "explain", "app.port"]).is_err());
        let cli = Cli::try_parse_from(["bindery", "explain", "app.size", "--type", "data-size"]).unwrap();
        assert!(matches!(cli.command, Commands::Explain { target: TargetType::DataSize, .. }));
    }

    #[test]
    fn test_no_env_conflicts_with_prefix() {
        assert!(Cli::try_parse_from(["bindery", "--no-env", "--env-prefix", "APP", "sources"]).is_err());
    }
}
