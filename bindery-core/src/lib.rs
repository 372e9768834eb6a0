//! Relaxed, origin-tracked binding of configuration properties
//!
//! This crate turns layered, string-valued property sources into typed values:
//! scalars, lists, sets, maps and nested objects. Keys match regardless of
//! spelling (`connectionTimeout`, `connection-timeout`, `CONNECTION_TIMEOUT`),
//! higher-priority sources override lower ones, and every bound value keeps
//! the origin it came from so failures can name the file and line at fault.

pub mod annotation;
pub mod bind;
pub mod bindable;
pub mod convert;
pub mod data_size;
pub mod duration;
pub mod error;
pub mod name;
pub mod origin;
pub mod source;
pub mod types;
pub mod validation;
pub mod value;

// Binding engine
pub use bind::{
    BindContext, BindHandler, BindResult, Binder, DefaultBindHandler, IgnoreErrorsBindHandler,
    NoUnboundElementsBindHandler, PlaceholdersResolver, SourcesPlaceholdersResolver,
    ValidationBindHandler,
};
pub use bindable::{BindMethod, BindRestrictions, Bindable};
pub use error::{BindError, BindingFailureKind, InvalidConfigurationPropertyValue, Result};

// Names, sources and origins
pub use name::{ConfigurationPropertyName, Form};
pub use origin::{Location, Origin, OriginLookup};
pub use source::{
    ConfigurationProperty, ConfigurationPropertySource, ConfigurationPropertySources,
    MapPropertySource, PropertySource, SystemEnvironmentPropertySource,
};

// Target descriptions and values
pub use annotation::{Annotation, Annotations};
pub use convert::ConversionService;
pub use data_size::{DataSize, DataUnit};
pub use duration::{DurationStyle, DurationUnit};
pub use types::{Constructor, Describe, Member, ObjectType, ScalarType, TypeDescriptor, TypeKind, TypeRef};
pub use value::{BoundValue, MapKey, ObjectValue};
