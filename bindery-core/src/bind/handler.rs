//! Callbacks around every element bound by a [`Binder`](super::Binder)

use super::BindContext;
use crate::bindable::Bindable;
use crate::error::{BindError, InvalidConfigurationPropertyValue, Result};
use crate::name::ConfigurationPropertyName;
use crate::value::BoundValue;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::warn;

/// Hooks invoked for the root target and for every nested element.
///
/// The default methods leave binding unchanged, so implementations only
/// override what they need.
pub trait BindHandler: Send + Sync {
    /// Called before binding; returning `None` skips the target
    fn on_start(&self, _name: &ConfigurationPropertyName, target: &Bindable, _context: &BindContext<'_>) -> Option<Bindable> {
        Some(target.clone())
    }

    fn on_success(
        &self,
        _name: &ConfigurationPropertyName,
        _target: &Bindable,
        _context: &BindContext<'_>,
        result: BoundValue,
    ) -> Result<BoundValue> {
        Ok(result)
    }

    /// Called when an unbound target was created instead
    fn on_create(
        &self,
        _name: &ConfigurationPropertyName,
        _target: &Bindable,
        _context: &BindContext<'_>,
        result: BoundValue,
    ) -> Result<BoundValue> {
        Ok(result)
    }

    /// Called when binding failed; may recover with a value (or unbound)
    fn on_failure(
        &self,
        _name: &ConfigurationPropertyName,
        _target: &Bindable,
        _context: &BindContext<'_>,
        error: BindError,
    ) -> Result<Option<BoundValue>> {
        Err(error)
    }

    /// Called last for every target that did not fail
    fn on_finish(
        &self,
        _name: &ConfigurationPropertyName,
        _target: &Bindable,
        _context: &BindContext<'_>,
        _result: Option<&BoundValue>,
    ) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultBindHandler;

impl BindHandler for DefaultBindHandler {}

fn default_parent() -> Arc<dyn BindHandler> {
    Arc::new(DefaultBindHandler)
}

/// Turns every failure into an unbound result (or the target's existing value)
pub struct IgnoreErrorsBindHandler {
    parent: Arc<dyn BindHandler>,
}

impl IgnoreErrorsBindHandler {
    pub fn new() -> Self {
        Self::with_parent(default_parent())
    }

    pub fn with_parent(parent: Arc<dyn BindHandler>) -> Self {
        Self { parent }
    }
}

impl Default for IgnoreErrorsBindHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl BindHandler for IgnoreErrorsBindHandler {
    fn on_start(&self, name: &ConfigurationPropertyName, target: &Bindable, context: &BindContext<'_>) -> Option<Bindable> {
        self.parent.on_start(name, target, context)
    }

    fn on_success(
        &self,
        name: &ConfigurationPropertyName,
        target: &Bindable,
        context: &BindContext<'_>,
        result: BoundValue,
    ) -> Result<BoundValue> {
        self.parent.on_success(name, target, context, result)
    }

    fn on_create(
        &self,
        name: &ConfigurationPropertyName,
        target: &Bindable,
        context: &BindContext<'_>,
        result: BoundValue,
    ) -> Result<BoundValue> {
        self.parent.on_create(name, target, context, result)
    }

    fn on_failure(
        &self,
        name: &ConfigurationPropertyName,
        target: &Bindable,
        _context: &BindContext<'_>,
        error: BindError,
    ) -> Result<Option<BoundValue>> {
        warn!(name = %name, error = %error, "Ignoring bind failure");
        Ok(target.value())
    }

    fn on_finish(
        &self,
        name: &ConfigurationPropertyName,
        target: &Bindable,
        context: &BindContext<'_>,
        result: Option<&BoundValue>,
    ) -> Result<()> {
        self.parent.on_finish(name, target, context, result)
    }
}

/// Fails the root bind with [`BindError::UnboundProperties`] if the sources
/// hold properties under the root name that nothing bound.
///
/// Bound names are tracked on the [`BindContext`] of each call, so one handler
/// can serve any number of binds, concurrent ones included.
pub struct NoUnboundElementsBindHandler {
    parent: Arc<dyn BindHandler>,
}

impl NoUnboundElementsBindHandler {
    pub fn new() -> Self {
        Self::with_parent(default_parent())
    }

    pub fn with_parent(parent: Arc<dyn BindHandler>) -> Self {
        Self { parent }
    }

    fn is_bound(context: &BindContext<'_>, candidate: &ConfigurationPropertyName) -> bool {
        if context.is_recorded_bound(candidate) {
            return true;
        }
        let last = candidate.len().saturating_sub(1);
        candidate.is_indexed(last) && context.is_recorded_bound(&candidate.chop(last))
    }

    fn check_no_unbound_elements(&self, name: &ConfigurationPropertyName, context: &BindContext<'_>) -> Result<()> {
        let mut unbound = Vec::new();
        let mut seen = HashSet::new();
        for source in context.sources().iter() {
            for candidate in source.descendants_of(name) {
                if Self::is_bound(context, &candidate) || seen.contains(&candidate) {
                    continue;
                }
                if let Some(property) = source.get(&candidate) {
                    unbound.push(property);
                }
                seen.insert(candidate);
            }
        }
        if unbound.is_empty() {
            return Ok(());
        }
        Err(BindError::UnboundProperties {
            name: name.clone(),
            properties: unbound,
        })
    }
}

impl Default for NoUnboundElementsBindHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl BindHandler for NoUnboundElementsBindHandler {
    fn on_start(&self, name: &ConfigurationPropertyName, target: &Bindable, context: &BindContext<'_>) -> Option<Bindable> {
        self.parent.on_start(name, target, context)
    }

    fn on_success(
        &self,
        name: &ConfigurationPropertyName,
        target: &Bindable,
        context: &BindContext<'_>,
        result: BoundValue,
    ) -> Result<BoundValue> {
        context.record_bound(name);
        if let Some(property) = context.configuration_property().filter(|p| p.name() == name) {
            context.record_bound(property.matched_name());
        }
        self.parent.on_success(name, target, context, result)
    }

    fn on_create(
        &self,
        name: &ConfigurationPropertyName,
        target: &Bindable,
        context: &BindContext<'_>,
        result: BoundValue,
    ) -> Result<BoundValue> {
        self.parent.on_create(name, target, context, result)
    }

    fn on_failure(
        &self,
        name: &ConfigurationPropertyName,
        target: &Bindable,
        context: &BindContext<'_>,
        error: BindError,
    ) -> Result<Option<BoundValue>> {
        if matches!(error, BindError::UnboundProperties { .. }) {
            return Err(error);
        }
        self.parent.on_failure(name, target, context, error)
    }

    fn on_finish(
        &self,
        name: &ConfigurationPropertyName,
        target: &Bindable,
        context: &BindContext<'_>,
        result: Option<&BoundValue>,
    ) -> Result<()> {
        if context.depth() == 0 {
            self.check_no_unbound_elements(name, context)?;
        }
        self.parent.on_finish(name, target, context, result)
    }
}

type Rule = Arc<dyn Fn(&BoundValue) -> std::result::Result<(), String> + Send + Sync>;

/// Checks bound values against per-property rules.
///
/// A failing rule is reported as an [`InvalidConfigurationPropertyValue`]
/// carrying the property's value and origin.
pub struct ValidationBindHandler {
    parent: Arc<dyn BindHandler>,
    rules: HashMap<ConfigurationPropertyName, Vec<Rule>>,
}

impl ValidationBindHandler {
    pub fn new() -> Self {
        Self::with_parent(default_parent())
    }

    pub fn with_parent(parent: Arc<dyn BindHandler>) -> Self {
        Self {
            parent,
            rules: HashMap::new(),
        }
    }

    /// Add a rule for the property `name`; the rule returns the reason the
    /// value is invalid
    pub fn with_rule<F>(mut self, name: &str, rule: F) -> Result<Self>
    where
        F: Fn(&BoundValue) -> std::result::Result<(), String> + Send + Sync + 'static,
    {
        let name = ConfigurationPropertyName::parse(name)?;
        self.rules.entry(name).or_default().push(Arc::new(rule));
        Ok(self)
    }

    fn validate(&self, name: &ConfigurationPropertyName, context: &BindContext<'_>, value: &BoundValue) -> Result<()> {
        let Some(rules) = self.rules.get(name) else {
            return Ok(());
        };
        for rule in rules {
            if let Err(reason) = rule(value) {
                let invalid = match context.sources().find(name) {
                    Some(property) => InvalidConfigurationPropertyValue::for_property(&property, Some(reason)),
                    None => InvalidConfigurationPropertyValue::new(name.clone(), value.to_string(), Some(reason)),
                };
                return Err(invalid.into());
            }
        }
        Ok(())
    }
}

impl Default for ValidationBindHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl BindHandler for ValidationBindHandler {
    fn on_start(&self, name: &ConfigurationPropertyName, target: &Bindable, context: &BindContext<'_>) -> Option<Bindable> {
        self.parent.on_start(name, target, context)
    }

    fn on_success(
        &self,
        name: &ConfigurationPropertyName,
        target: &Bindable,
        context: &BindContext<'_>,
        result: BoundValue,
    ) -> Result<BoundValue> {
        let result = self.parent.on_success(name, target, context, result)?;
        self.validate(name, context, &result)?;
        Ok(result)
    }

    fn on_create(
        &self,
        name: &ConfigurationPropertyName,
        target: &Bindable,
        context: &BindContext<'_>,
        result: BoundValue,
    ) -> Result<BoundValue> {
        let result = self.parent.on_create(name, target, context, result)?;
        self.validate(name, context, &result)?;
        Ok(result)
    }

    fn on_failure(
        &self,
        name: &ConfigurationPropertyName,
        target: &Bindable,
        context: &BindContext<'_>,
        error: BindError,
    ) -> Result<Option<BoundValue>> {
        self.parent.on_failure(name, target, context, error)
    }

    fn on_finish(
        &self,
        name: &ConfigurationPropertyName,
        target: &Bindable,
        context: &BindContext<'_>,
        result: Option<&BoundValue>,
    ) -> Result<()> {
        self.parent.on_finish(name, target, context, result)
    }
}
