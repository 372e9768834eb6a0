//! The binder engine
//!
//! [`Binder`] resolves a [`Bindable`] against its [`ConfigurationPropertySources`].
//! Scalars come from the first source that holds the name. Lists, sets and
//! maps aggregate across every source. Objects are built through a
//! constructor (value-object binding) or by binding the writable properties of
//! an existing or default instance (bean binding). Nested targets are bound by
//! recursing into the binder with the member's name appended.
//!
//! Every bind is all-or-nothing: the first failure aborts the whole call and
//! is returned with its original origin.

mod data_object;
mod handler;
mod indexed;
mod map;
mod placeholders;

pub use handler::{
    BindHandler, DefaultBindHandler, IgnoreErrorsBindHandler, NoUnboundElementsBindHandler,
    ValidationBindHandler,
};
pub use placeholders::{PlaceholdersResolver, SourcesPlaceholdersResolver};

use crate::bindable::{BindRestrictions, Bindable};
use crate::convert::ConversionService;
use crate::error::{BindError, BindingFailureKind, InvalidConfigurationPropertyValue, Result};
use crate::name::ConfigurationPropertyName;
use crate::source::{ConfigurationProperty, ConfigurationPropertySources, PropertySource};
use crate::types::{Describe, TypeKind};
use crate::value::BoundValue;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

/// Binds typed values from configuration property sources
#[derive(Clone)]
pub struct Binder {
    sources: ConfigurationPropertySources,
    conversion: Arc<ConversionService>,
    placeholders: Arc<dyn PlaceholdersResolver>,
    default_handler: Arc<dyn BindHandler>,
}

impl Binder {
    pub fn new(sources: ConfigurationPropertySources) -> Self {
        Self {
            placeholders: Arc::new(SourcesPlaceholdersResolver::new(sources.clone())),
            sources,
            conversion: ConversionService::shared(),
            default_handler: Arc::new(DefaultBindHandler),
        }
    }

    /// Adapt raw sources (highest priority first) and build a binder over them
    pub fn from_sources<I>(sources: I) -> Result<Self>
    where
        I: IntoIterator<Item = Arc<dyn PropertySource>>,
    {
        Ok(Self::new(ConfigurationPropertySources::new(sources)?))
    }

    pub fn with_conversion_service(mut self, conversion: Arc<ConversionService>) -> Self {
        self.conversion = conversion;
        self
    }

    pub fn with_placeholders_resolver(mut self, placeholders: Arc<dyn PlaceholdersResolver>) -> Self {
        self.placeholders = placeholders;
        self
    }

    /// The handler used by [`bind`](Self::bind) and the other calls that do
    /// not take one explicitly
    pub fn with_default_bind_handler(mut self, handler: Arc<dyn BindHandler>) -> Self {
        self.default_handler = handler;
        self
    }

    pub fn sources(&self) -> &ConfigurationPropertySources {
        &self.sources
    }

    pub fn conversion_service(&self) -> &ConversionService {
        &self.conversion
    }

    pub fn bind(&self, name: &str, target: &Bindable) -> Result<BindResult<BoundValue>> {
        let handler = Arc::clone(&self.default_handler);
        self.bind_with_handler(name, target, handler.as_ref())
    }

    pub fn bind_with_handler(
        &self,
        name: &str,
        target: &Bindable,
        handler: &dyn BindHandler,
    ) -> Result<BindResult<BoundValue>> {
        let name = ConfigurationPropertyName::parse(name)?;
        self.bind_name(&name, target, handler).map(BindResult::of)
    }

    /// Bind, or create the target's default value when nothing is bound.
    ///
    /// Fails with [`BindingFailureKind::CannotCreate`] when the target has no
    /// way to be created.
    pub fn bind_or_create(&self, name: &str, target: &Bindable) -> Result<BoundValue> {
        let handler = Arc::clone(&self.default_handler);
        self.bind_or_create_with_handler(name, target, handler.as_ref())
    }

    pub fn bind_or_create_with_handler(
        &self,
        name: &str,
        target: &Bindable,
        handler: &dyn BindHandler,
    ) -> Result<BoundValue> {
        let name = ConfigurationPropertyName::parse(name)?;
        self.check_type(&name, target)?;
        let mut context = BindContext::new(self, handler);
        self.bind_target(&name, target, &mut context, true)?
            .ok_or_else(|| BindError::binding(&name, BindingFailureKind::CannotCreate(target.ty().name().to_string())))
    }

    /// Bind and deserialize into `T`
    pub fn bind_as<T: Describe + DeserializeOwned>(&self, name: &str) -> Result<BindResult<T>> {
        let parsed = ConfigurationPropertyName::parse(name)?;
        let target = Bindable::of::<T>();
        let handler = Arc::clone(&self.default_handler);
        let bound = self.bind_name(&parsed, &target, handler.as_ref())?;
        bound
            .map(|value| value.deserialize_into(&parsed, target.ty().name()))
            .transpose()
            .map(BindResult::of)
    }

    pub fn bind_or_create_as<T: Describe + DeserializeOwned>(&self, name: &str) -> Result<T> {
        let parsed = ConfigurationPropertyName::parse(name)?;
        let target = Bindable::of::<T>();
        self.bind_or_create(name, &target)?
            .deserialize_into(&parsed, target.ty().name())
    }

    /// Bind onto a copy of `instance`; properties without a value keep the
    /// instance's own
    pub fn bind_onto<T>(&self, name: &str, instance: &T) -> Result<T>
    where
        T: Describe + Serialize + DeserializeOwned,
    {
        let parsed = ConfigurationPropertyName::parse(name)?;
        let target = Bindable::of_instance(instance)?;
        self.bind_or_create(name, &target)?
            .deserialize_into(&parsed, target.ty().name())
    }

    fn bind_name(
        &self,
        name: &ConfigurationPropertyName,
        target: &Bindable,
        handler: &dyn BindHandler,
    ) -> Result<Option<BoundValue>> {
        self.check_type(name, target)?;
        let mut context = BindContext::new(self, handler);
        self.bind_target(name, target, &mut context, false)
    }

    fn check_type(&self, name: &ConfigurationPropertyName, target: &Bindable) -> Result<()> {
        match target.ty().find_cycle() {
            Some(path) => Err(BindError::binding(name, BindingFailureKind::CyclicType(path))),
            None => Ok(()),
        }
    }

    pub(crate) fn bind_target(
        &self,
        name: &ConfigurationPropertyName,
        target: &Bindable,
        context: &mut BindContext<'_>,
        create: bool,
    ) -> Result<Option<BoundValue>> {
        match self.try_bind(name, target, context, create) {
            Ok(result) => Ok(result),
            Err(error) => {
                context.configuration_property = None;
                let handler = context.handler;
                handler.on_failure(name, target, context, error)
            }
        }
    }

    fn try_bind(
        &self,
        name: &ConfigurationPropertyName,
        target: &Bindable,
        context: &mut BindContext<'_>,
        create: bool,
    ) -> Result<Option<BoundValue>> {
        let handler = context.handler;
        let Some(target) = handler.on_start(name, target, context) else {
            return self.handle_bind_result(name, target, context, None, create);
        };
        let bound = self.bind_object(name, &target, context)?;
        self.handle_bind_result(name, &target, context, bound, create)
    }

    fn handle_bind_result(
        &self,
        name: &ConfigurationPropertyName,
        target: &Bindable,
        context: &mut BindContext<'_>,
        bound: Option<BoundValue>,
        create: bool,
    ) -> Result<Option<BoundValue>> {
        let handler = context.handler;
        let mut result = match bound {
            Some(value) => Some(handler.on_success(name, target, context, value)?),
            None => None,
        };
        if result.is_none() && create {
            let created = self.create(name, target, context)?;
            result = Some(handler.on_create(name, target, context, created)?);
        }
        handler.on_finish(name, target, context, result.as_ref())?;
        Ok(result)
    }

    fn bind_object(
        &self,
        name: &ConfigurationPropertyName,
        target: &Bindable,
        context: &mut BindContext<'_>,
    ) -> Result<Option<BoundValue>> {
        let property = self.find_property(name, target, context);
        if property.is_none() && context.depth != 0 && !self.sources.contains_descendant_of(name) {
            return Ok(None);
        }
        match target.ty().kind() {
            TypeKind::List(_) | TypeKind::Set(_) => {
                context.with_increased_depth(|context| indexed::bind(self, name, target, context))
            }
            TypeKind::Map { .. } => context.with_increased_depth(|context| map::bind(self, name, target, context)),
            TypeKind::Scalar(_) => match property {
                Some(property) => self.bind_property(target, &property, context),
                None => Ok(None),
            },
            TypeKind::Object(_) => match property {
                Some(property) if self.conversion.has_converter(target.ty().name()) => {
                    self.bind_property(target, &property, context)
                }
                Some(property) => match data_object::bind(self, name, target, context)? {
                    Some(value) => Ok(Some(value)),
                    None => self.bind_property(target, &property, context),
                },
                None => data_object::bind(self, name, target, context),
            },
        }
    }

    fn find_property(
        &self,
        name: &ConfigurationPropertyName,
        target: &Bindable,
        context: &mut BindContext<'_>,
    ) -> Option<ConfigurationProperty> {
        if name.is_empty() || target.has_restriction(BindRestrictions::NO_DIRECT_PROPERTY) {
            return None;
        }
        let property = self.sources.find(name)?;
        trace!(name = %name, source = property.source(), "Found property");
        context.configuration_property = Some(property.clone());
        Some(property)
    }

    /// Resolve placeholders in a single property and convert it to the target
    pub(crate) fn bind_property(
        &self,
        target: &Bindable,
        property: &ConfigurationProperty,
        context: &mut BindContext<'_>,
    ) -> Result<Option<BoundValue>> {
        context.configuration_property = Some(property.clone());
        let resolved = self.placeholders.resolve_placeholders(property.value())?;
        self.conversion
            .convert(&resolved, target.ty(), target.annotations(), property.origin())
            .map_err(|error| invalid_value(property, error))
    }

    fn create(
        &self,
        name: &ConfigurationPropertyName,
        target: &Bindable,
        context: &mut BindContext<'_>,
    ) -> Result<BoundValue> {
        if let Some(value) = target.value() {
            return Ok(value);
        }
        let ty = target.ty();
        if let Some(value) = BoundValue::empty_of(ty).or_else(|| BoundValue::zero_of(ty)) {
            return Ok(value);
        }
        if ty.as_object().is_some() {
            if let Some(value) = data_object::create(self, name, target, context)? {
                debug!(name = %name, target_type = ty.name(), "Created unbound object");
                return Ok(value);
            }
        }
        Err(BindError::binding(name, BindingFailureKind::CannotCreate(ty.name().to_string())))
    }
}

impl fmt::Debug for Binder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binder")
            .field("sources", &self.sources.len())
            .field("conversion", &self.conversion)
            .finish_non_exhaustive()
    }
}

/// Report a conversion failure as an invalid value of the property that
/// reached binding
pub(crate) fn invalid_value(property: &ConfigurationProperty, error: BindError) -> BindError {
    let reason = match &error {
        BindError::ConversionFailure { reason, .. } => reason.clone(),
        other => other.to_string(),
    };
    InvalidConfigurationPropertyValue::for_property(property, Some(reason))
        .with_cause(error)
        .into()
}

/// State of a single bind call, visible to [`BindHandler`]s
pub struct BindContext<'a> {
    binder: &'a Binder,
    handler: &'a dyn BindHandler,
    depth: usize,
    data_objects: Vec<String>,
    configuration_property: Option<ConfigurationProperty>,
    bound_names: RefCell<HashSet<ConfigurationPropertyName>>,
}

impl<'a> BindContext<'a> {
    fn new(binder: &'a Binder, handler: &'a dyn BindHandler) -> Self {
        Self {
            binder,
            handler,
            depth: 0,
            data_objects: Vec::new(),
            configuration_property: None,
            bound_names: RefCell::new(HashSet::new()),
        }
    }

    /// Nesting depth of the target being bound; the root is depth 0
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn sources(&self) -> &ConfigurationPropertySources {
        &self.binder.sources
    }

    pub fn conversion_service(&self) -> &ConversionService {
        &self.binder.conversion
    }

    /// The property most recently found or bound
    pub fn configuration_property(&self) -> Option<&ConfigurationProperty> {
        self.configuration_property.as_ref()
    }

    /// Names recorded as bound so far in this call
    pub(crate) fn record_bound(&self, name: &ConfigurationPropertyName) {
        self.bound_names.borrow_mut().insert(name.clone());
    }

    pub(crate) fn is_recorded_bound(&self, name: &ConfigurationPropertyName) -> bool {
        self.bound_names.borrow().contains(name)
    }

    pub(crate) fn clear_configuration_property(&mut self) {
        self.configuration_property = None;
    }

    pub(crate) fn with_increased_depth<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    pub(crate) fn with_data_object<R>(
        &mut self,
        name: &ConfigurationPropertyName,
        type_name: &str,
        f: impl FnOnce(&mut Self) -> Result<R>,
    ) -> Result<R> {
        if let Some(position) = self.data_objects.iter().position(|t| t == type_name) {
            let mut path = self.data_objects[position..].to_vec();
            path.push(type_name.to_string());
            return Err(BindError::binding(name, BindingFailureKind::CyclicType(path)));
        }
        self.data_objects.push(type_name.to_string());
        let result = self.with_increased_depth(f);
        self.data_objects.pop();
        result
    }
}

/// The outcome of a bind: a value, or unbound
#[derive(Debug, Clone, PartialEq)]
pub struct BindResult<T>(Option<T>);

impl<T> BindResult<T> {
    pub fn of(value: Option<T>) -> Self {
        Self(value)
    }

    pub fn unbound() -> Self {
        Self(None)
    }

    pub fn is_bound(&self) -> bool {
        self.0.is_some()
    }

    pub fn get(&self) -> Option<&T> {
        self.0.as_ref()
    }

    pub fn into_option(self) -> Option<T> {
        self.0
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> BindResult<U> {
        BindResult(self.0.map(f))
    }

    pub fn or_else(self, other: T) -> T {
        self.0.unwrap_or(other)
    }

    pub fn or_else_get(self, f: impl FnOnce() -> T) -> T {
        self.0.unwrap_or_else(f)
    }

    pub fn if_bound(&self, f: impl FnOnce(&T)) {
        if let Some(value) = &self.0 {
            f(value);
        }
    }
}

impl<T> From<BindResult<T>> for Option<T> {
    fn from(value: BindResult<T>) -> Self {
        value.0
    }
}
