//! Property source loading for bindery
//!
//! Reads `.properties` and YAML files with origins, the process environment
//! and command line arguments, and assembles them in priority order for a
//! [`Binder`](bindery_core::Binder).

pub mod command_line;
pub mod environment;
pub mod error;
pub mod properties;
pub mod yaml;

pub use command_line::{CommandLinePropertySource, COMMAND_LINE_ARGS, NON_OPTION_ARGS};
pub use environment::{load_file, EnvironmentLoader};
pub use error::{LoadError, LoadResult};
pub use properties::load_properties;
pub use yaml::load_yaml;
