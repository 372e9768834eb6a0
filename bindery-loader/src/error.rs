//! Loader error types

use bindery_core::BindError;
use std::path::PathBuf;
use thiserror::Error;

/// Loader result type
pub type LoadResult<T> = Result<T, LoadError>;

/// Errors raised while assembling property sources
#[derive(Error, Debug)]
pub enum LoadError {
    /// IO error reading a configuration file
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parsing error
    #[error("Failed to parse YAML in {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// Malformed `.properties` content; `line` is one-based
    #[error("Failed to parse {resource} at line {line}: {message}")]
    Properties {
        resource: String,
        line: usize,
        message: String,
    },

    /// A configuration file with an extension no loader handles
    #[error("Unsupported configuration file format: {0}")]
    UnsupportedFormat(PathBuf),

    /// A command line option without a name, such as `--=value`
    #[error("Invalid command line argument {index}: '{argument}'")]
    InvalidArgument { index: usize, argument: String },

    /// Keys that could not be adapted into property names
    #[error(transparent)]
    Bind(#[from] BindError),
}
