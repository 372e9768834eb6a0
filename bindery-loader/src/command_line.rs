//! Command line arguments as a property source

use crate::error::{LoadError, LoadResult};
use bindery_core::{Origin, OriginLookup, PropertySource};
use indexmap::IndexMap;
use tracing::debug;

/// Name given to the command line source
pub const COMMAND_LINE_ARGS: &str = "commandLineArgs";

/// Key under which arguments that are not `--options` are exposed
pub const NON_OPTION_ARGS: &str = "nonOptionArgs";

#[derive(Debug, Clone)]
struct OptionValue {
    values: Vec<String>,
    joined: String,
    argument: String,
    index: usize,
}

/// `--key=value` arguments. A bare `--flag` has an empty value and a repeated
/// option joins its values with commas.
#[derive(Debug, Clone)]
pub struct CommandLinePropertySource {
    name: String,
    options: IndexMap<String, OptionValue>,
    non_option_args: Vec<String>,
    non_option_joined: String,
}

impl CommandLinePropertySource {
    pub fn parse<I, S>(args: I) -> LoadResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut options: IndexMap<String, OptionValue> = IndexMap::new();
        let mut non_option_args = Vec::new();
        for (index, arg) in args.into_iter().enumerate() {
            let arg = arg.as_ref();
            let Some(option) = arg.strip_prefix("--") else {
                non_option_args.push(arg.to_string());
                continue;
            };
            let (name, value) = match option.split_once('=') {
                Some((name, value)) => (name, Some(value)),
                None => (option, None),
            };
            if name.is_empty() {
                return Err(LoadError::InvalidArgument {
                    index,
                    argument: arg.to_string(),
                });
            }
            let entry = options.entry(name.to_string()).or_insert_with(|| OptionValue {
                values: Vec::new(),
                joined: String::new(),
                argument: arg.to_string(),
                index,
            });
            if let Some(value) = value {
                entry.values.push(value.to_string());
                entry.joined = entry.values.join(",");
            }
        }
        debug!(
            options = options.len(),
            non_option_args = non_option_args.len(),
            "Parsed command line arguments"
        );
        Ok(Self {
            name: COMMAND_LINE_ARGS.to_string(),
            options,
            non_option_joined: non_option_args.join(","),
            non_option_args,
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn non_option_args(&self) -> &[String] {
        &self.non_option_args
    }

    /// Every value given for `name`
    pub fn option_values(&self, name: &str) -> Option<&[String]> {
        self.options.get(name).map(|option| option.values.as_slice())
    }
}

impl OriginLookup for CommandLinePropertySource {
    fn origin(&self, key: &str) -> Option<Origin> {
        let option = self.options.get(key)?;
        Some(Origin::command_line_argument(&option.argument, option.index))
    }
}

impl PropertySource for CommandLinePropertySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn property_names(&self) -> Vec<&str> {
        self.options.keys().map(String::as_str).collect()
    }

    fn get_property(&self, key: &str) -> Option<&str> {
        if key == NON_OPTION_ARGS {
            return (!self.non_option_args.is_empty()).then_some(self.non_option_joined.as_str());
        }
        self.options.get(key).map(|option| option.joined.as_str())
    }
}
