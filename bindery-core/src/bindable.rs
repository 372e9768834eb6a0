//! Descriptions of what to bind

use crate::annotation::Annotations;
use crate::error::{BindError, BindingFailureKind, Result};
use crate::name::ConfigurationPropertyName;
use crate::types::{Describe, TypeDescriptor};
use crate::value::BoundValue;
use bitflags::bitflags;
use serde::Serialize;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

bitflags! {
    /// Restrictions applied when binding a [`Bindable`]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct BindRestrictions: u8 {
        /// Ignore a value held directly under the bound name; compose the
        /// target from its nested properties only
        const NO_DIRECT_PROPERTY = 1;
    }
}

/// Forces the strategy used to bind an object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindMethod {
    /// Through a constructor, producing a new value
    ValueObject,
    /// Through the writable properties of an existing or default instance
    JavaBean,
}

type ValueSupplier = Arc<dyn Fn() -> BoundValue + Send + Sync>;

/// A bind request: the target type plus everything that affects binding it.
///
/// `Bindable` is immutable; every `with_*` method returns a new value. The
/// existing/supplied value is not part of equality.
#[derive(Clone)]
pub struct Bindable {
    ty: TypeDescriptor,
    boxed: TypeDescriptor,
    value: Option<ValueSupplier>,
    annotations: Annotations,
    restrictions: BindRestrictions,
    bind_method: Option<BindMethod>,
}

impl Bindable {
    pub fn of_type(ty: TypeDescriptor) -> Self {
        Self {
            boxed: ty.boxed(),
            ty,
            value: None,
            annotations: Annotations::default(),
            restrictions: BindRestrictions::empty(),
            bind_method: None,
        }
    }

    pub fn of<T: Describe>() -> Self {
        Self::of_type(T::describe())
    }

    /// Bind onto `instance`, which is serialized as the existing value
    pub fn of_instance<T: Describe + Serialize>(instance: &T) -> Result<Self> {
        let ty = T::describe();
        let value = BoundValue::from_serialize(instance, &ty)?;
        Self::of_type(ty).with_existing_value(value)
    }

    pub fn list_of<T: Describe>() -> Self {
        Self::of_type(TypeDescriptor::list(T::describe().boxed()))
    }

    pub fn set_of<T: Describe>() -> Self {
        Self::of_type(TypeDescriptor::set(T::describe().boxed()))
    }

    pub fn map_of<K: Describe, V: Describe>() -> Self {
        Self::of_type(TypeDescriptor::map(K::describe().boxed(), V::describe().boxed()))
    }

    pub fn ty(&self) -> &TypeDescriptor {
        &self.ty
    }

    pub fn boxed_type(&self) -> &TypeDescriptor {
        &self.boxed
    }

    /// The existing or supplied value, if any
    pub fn value(&self) -> Option<BoundValue> {
        self.value.as_ref().map(|supplier| supplier())
    }

    pub fn has_value(&self) -> bool {
        self.value.is_some()
    }

    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    pub fn restrictions(&self) -> BindRestrictions {
        self.restrictions
    }

    pub fn has_restriction(&self, restriction: BindRestrictions) -> bool {
        self.restrictions.contains(restriction)
    }

    pub fn bind_method(&self) -> Option<BindMethod> {
        self.bind_method
    }

    /// Bind onto an existing value. Fails with [`BindError::TypeMismatch`] if
    /// `value` is not an instance of the boxed target type, and if value-object
    /// binding was forced. Forces [`BindMethod::JavaBean`].
    pub fn with_existing_value(self, value: BoundValue) -> Result<Self> {
        if !value.is_instance_of(&self.boxed) {
            return Err(BindError::TypeMismatch {
                expected: self.boxed.name().to_string(),
                actual: value.kind_name(),
            });
        }
        if self.bind_method == Some(BindMethod::ValueObject) {
            return Err(BindError::binding(
                &ConfigurationPropertyName::empty(),
                BindingFailureKind::ExistingValueWithValueObject,
            ));
        }
        Ok(Self {
            value: Some(Arc::new(move || value.clone())),
            bind_method: Some(BindMethod::JavaBean),
            ..self
        })
    }

    /// Use `supplier` to produce the value when the target is unbound or
    /// needs a starting instance
    pub fn with_supplied_value<F>(self, supplier: F) -> Self
    where
        F: Fn() -> BoundValue + Send + Sync + 'static,
    {
        Self {
            value: Some(Arc::new(supplier)),
            ..self
        }
    }

    pub fn with_annotations(self, annotations: impl Into<Annotations>) -> Self {
        Self {
            annotations: annotations.into(),
            ..self
        }
    }

    /// Add `restrictions` to those already present
    pub fn with_bind_restrictions(self, restrictions: BindRestrictions) -> Self {
        Self {
            restrictions: self.restrictions | restrictions,
            ..self
        }
    }

    /// Force (or with `None`, stop forcing) a bind method
    pub fn with_bind_method(self, bind_method: Option<BindMethod>) -> Result<Self> {
        if bind_method == Some(BindMethod::ValueObject) && self.value.is_some() {
            return Err(BindError::binding(
                &ConfigurationPropertyName::empty(),
                BindingFailureKind::ExistingValueWithValueObject,
            ));
        }
        Ok(Self { bind_method, ..self })
    }
}

impl PartialEq for Bindable {
    fn eq(&self, other: &Self) -> bool {
        self.ty == other.ty
            && self.annotations == other.annotations
            && self.restrictions == other.restrictions
            && self.bind_method == other.bind_method
    }
}

impl Eq for Bindable {}

impl Hash for Bindable {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ty.hash(state);
        self.annotations.hash(state);
        self.restrictions.hash(state);
        self.bind_method.hash(state);
    }
}

impl fmt::Debug for Bindable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bindable")
            .field("type", &self.ty.name())
            .field("value", &if self.value.is_some() { "provided" } else { "none" })
            .field("annotations", &self.annotations)
            .field("restrictions", &self.restrictions)
            .field("bind_method", &self.bind_method)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::Annotation;

    #[test]
    fn test_existing_value_must_match_boxed_type() {
        let bindable = Bindable::of::<u32>().with_existing_value(BoundValue::UInt(8)).unwrap();
        assert_eq!(bindable.value(), Some(BoundValue::UInt(8)));
        assert_eq!(bindable.bind_method(), Some(BindMethod::JavaBean));

        let error = Bindable::of::<u32>()
            .with_existing_value(BoundValue::String("8".into()))
            .unwrap_err();
        assert!(matches!(error, BindError::TypeMismatch { .. }));
    }

    #[test]
    fn test_value_object_rejects_existing_value() {
        let error = Bindable::of::<u32>()
            .with_supplied_value(|| BoundValue::UInt(1))
            .with_bind_method(Some(BindMethod::ValueObject))
            .unwrap_err();
        assert!(matches!(
            error,
            BindError::BindingFailure {
                kind: BindingFailureKind::ExistingValueWithValueObject,
                ..
            }
        ));

        let forced = Bindable::of::<u32>().with_bind_method(Some(BindMethod::ValueObject)).unwrap();
        assert!(forced.with_existing_value(BoundValue::UInt(1)).is_err());
    }

    #[test]
    fn test_equality_ignores_value() {
        let plain = Bindable::of::<String>();
        let supplied = Bindable::of::<String>().with_supplied_value(|| BoundValue::String("x".into()));
        assert_eq!(plain, supplied);
        assert_ne!(plain, plain.clone().with_bind_restrictions(BindRestrictions::NO_DIRECT_PROPERTY));
        assert_ne!(
            plain,
            plain.clone().with_annotations([Annotation::Delimiter(";".into())])
        );
        assert_ne!(Bindable::of::<u8>(), Bindable::of::<Option<u8>>());
    }

    #[test]
    fn test_collection_constructors() {
        assert_eq!(Bindable::list_of::<u32>().ty().name(), "Vec<u32>");
        assert_eq!(Bindable::set_of::<String>().ty().name(), "Set<String>");
        assert_eq!(Bindable::map_of::<String, u8>().ty().name(), "Map<String, u8>");
        assert!(Bindable::of::<u8>().boxed_type().name() == "u8");
        assert!(!Bindable::of::<u8>().boxed_type().is_primitive());
    }
}
