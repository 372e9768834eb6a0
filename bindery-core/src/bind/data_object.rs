//! Structured objects: value-object (constructor) and bean (property) binding

use super::{BindContext, Binder};
use crate::annotation::Annotations;
use crate::bindable::{BindMethod, Bindable};
use crate::error::{BindError, BindingFailureKind, Result};
use crate::name::{kebab, ConfigurationPropertyName};
use crate::types::{Constructor, Member, ObjectType, TypeDescriptor, TypeKind};
use crate::value::{BoundValue, ObjectValue};
use tracing::{debug, trace};

enum Strategy<'a> {
    ValueObject(&'a Constructor),
    Bean,
}

/// Pick how `object` is bound.
///
/// A marked constructor always wins. Otherwise the only constructor taking
/// parameters is used, unless the type also has a default instance, in
/// which case it is bound as a bean.
fn strategy<'a>(
    name: &ConfigurationPropertyName,
    target: &Bindable,
    object: &'a ObjectType,
) -> Result<Strategy<'a>> {
    let forced = target.bind_method();
    if forced == Some(BindMethod::JavaBean) {
        return Ok(Strategy::Bean);
    }
    let value_object = forced == Some(BindMethod::ValueObject);
    let ambiguous = || BindError::binding(name, BindingFailureKind::AmbiguousConstructors(object.name().to_string()));

    let marked: Vec<_> = object.constructors().iter().filter(|c| c.is_binding()).collect();
    match marked.as_slice() {
        [constructor] => return Ok(Strategy::ValueObject(constructor)),
        [] => {}
        _ => return Err(ambiguous()),
    }
    if target.has_value() {
        return Ok(Strategy::Bean);
    }

    let candidates: Vec<_> = object
        .constructors()
        .iter()
        .filter(|c| !c.parameters().is_empty())
        .collect();
    match candidates.as_slice() {
        [] if value_object => Err(BindError::binding(
            name,
            BindingFailureKind::NoBindConstructor(object.name().to_string()),
        )),
        [] => Ok(Strategy::Bean),
        [constructor] if value_object || !object.has_default_instance() => Ok(Strategy::ValueObject(constructor)),
        [_] => Ok(Strategy::Bean),
        _ if value_object || !object.has_default_instance() => Err(ambiguous()),
        _ => Ok(Strategy::Bean),
    }
}

pub(super) fn bind(
    binder: &Binder,
    name: &ConfigurationPropertyName,
    target: &Bindable,
    context: &mut BindContext<'_>,
) -> Result<Option<BoundValue>> {
    let Some(object) = target.ty().as_object() else {
        return Ok(None);
    };
    let strategy = strategy(name, target, object)?;
    context.with_data_object(name, object.name(), |context| match strategy {
        Strategy::ValueObject(constructor) => {
            let bound = bind_value_object(binder, name, object, constructor, context)?;
            let fallback = bound.is_none()
                && object.has_default_instance()
                && target.bind_method() != Some(BindMethod::ValueObject)
                && !constructor.is_binding();
            if fallback {
                return bind_bean(binder, name, target, object, context);
            }
            Ok(bound)
        }
        Strategy::Bean => bind_bean(binder, name, target, object, context),
    })
}

/// Create an unbound object: every constructor parameter takes its default,
/// or a bean starts from its default instance
pub(super) fn create(
    binder: &Binder,
    name: &ConfigurationPropertyName,
    target: &Bindable,
    context: &mut BindContext<'_>,
) -> Result<Option<BoundValue>> {
    let Some(object) = target.ty().as_object() else {
        return Ok(None);
    };
    match strategy(name, target, object)? {
        Strategy::ValueObject(constructor) => context.with_data_object(name, object.name(), |context| {
            let mut value = ObjectValue::new(object.name());
            for parameter in constructor.parameters() {
                let parameter_name = member_name(name, parameter)?;
                if let Some(default) = default_value(binder, &parameter_name, parameter, context)? {
                    value.set(parameter.name(), default);
                }
            }
            Ok(Some(BoundValue::Object(value)))
        }),
        Strategy::Bean => target
            .value()
            .map(Ok)
            .or_else(|| object.create_default())
            .transpose(),
    }
}

fn member_name(name: &ConfigurationPropertyName, member: &Member) -> Result<ConfigurationPropertyName> {
    match member.annotations().name() {
        Some(renamed) => name.append(renamed),
        None => name.append(&kebab(member.name())),
    }
}

fn bind_value_object(
    binder: &Binder,
    name: &ConfigurationPropertyName,
    object: &ObjectType,
    constructor: &Constructor,
    context: &mut BindContext<'_>,
) -> Result<Option<BoundValue>> {
    trace!(name = %name, target_type = object.name(), "Binding value object");
    let mut value = ObjectValue::new(object.name());
    let mut bound = false;
    for parameter in constructor.parameters() {
        let parameter_name = member_name(name, parameter)?;
        let parameter_target = Bindable::of_type(parameter.ty()).with_annotations(parameter.annotations().clone());
        let argument = match binder.bind_target(&parameter_name, &parameter_target, context, false)? {
            Some(argument) => {
                bound = true;
                Some(argument)
            }
            None => default_value(binder, &parameter_name, parameter, context)?,
        };
        if let Some(argument) = argument {
            value.set(parameter.name(), argument);
        }
    }
    context.clear_configuration_property();
    Ok(bound.then_some(BoundValue::Object(value)))
}

/// The value an unbound constructor parameter takes
fn default_value(
    binder: &Binder,
    name: &ConfigurationPropertyName,
    parameter: &Member,
    context: &mut BindContext<'_>,
) -> Result<Option<BoundValue>> {
    let ty = parameter.ty();
    let annotations = parameter.annotations();
    match annotations.default_value() {
        Some([]) => create_empty(binder, name, &ty, annotations, context),
        Some(defaults) => convert_defaults(binder, defaults, &ty, annotations),
        None => Ok(BoundValue::zero_of(&ty)),
    }
}

fn create_empty(
    binder: &Binder,
    name: &ConfigurationPropertyName,
    ty: &TypeDescriptor,
    annotations: &Annotations,
    context: &mut BindContext<'_>,
) -> Result<Option<BoundValue>> {
    if let Some(empty) = BoundValue::empty_of(ty) {
        return Ok(Some(empty));
    }
    if ty.as_object().is_some() {
        debug!(name = %name, target_type = ty.name(), "Creating empty default");
        return create(binder, name, &Bindable::of_type(ty.clone()), context);
    }
    binder.conversion.convert("", ty, annotations, None)
}

fn convert_defaults(
    binder: &Binder,
    defaults: &[String],
    ty: &TypeDescriptor,
    annotations: &Annotations,
) -> Result<Option<BoundValue>> {
    let conversion = &binder.conversion;
    match ty.kind() {
        TypeKind::List(element) | TypeKind::Set(element) => {
            let mut items: Vec<BoundValue> = Vec::with_capacity(defaults.len());
            for raw in defaults {
                if let Some(item) = conversion.convert(raw, element, annotations, None)? {
                    if matches!(ty.kind(), TypeKind::Set(_)) && items.contains(&item) {
                        continue;
                    }
                    items.push(item);
                }
            }
            Ok(Some(match ty.kind() {
                TypeKind::Set(_) => BoundValue::Set(items),
                _ => BoundValue::List(items),
            }))
        }
        _ => conversion.convert(&defaults.join(","), ty, annotations, None),
    }
}

fn bind_bean(
    binder: &Binder,
    name: &ConfigurationPropertyName,
    target: &Bindable,
    object: &ObjectType,
    context: &mut BindContext<'_>,
) -> Result<Option<BoundValue>> {
    let instance = match target.value() {
        Some(instance) => instance,
        None => match object.create_default() {
            Some(instance) => instance?,
            None => return Ok(None),
        },
    };
    let mut instance = match instance {
        BoundValue::Object(instance) => instance,
        other => {
            return Err(BindError::TypeMismatch {
                expected: object.name().to_string(),
                actual: other.kind_name(),
            })
        }
    };
    trace!(name = %name, target_type = object.name(), "Binding bean properties");

    let mut bound = false;
    for property in object.properties() {
        let property_name = member_name(name, property)?;
        let ty = property.ty();
        let current = instance.get(property.name()).filter(|_| supplies_current(&ty)).cloned();
        if !property.is_writable() && current.is_none() {
            continue;
        }
        let mut property_target = Bindable::of_type(ty).with_annotations(property.annotations().clone());
        if let Some(current) = current {
            property_target = property_target.with_existing_value(current)?;
        }
        if let Some(value) = binder.bind_target(&property_name, &property_target, context, false)? {
            instance.set(property.name(), value);
            bound = true;
        }
    }
    Ok(bound.then_some(BoundValue::Object(instance)))
}

/// Nested maps and beans are bound onto their current value
fn supplies_current(ty: &TypeDescriptor) -> bool {
    match ty.kind() {
        TypeKind::Map { .. } => true,
        TypeKind::Object(object) => !object.properties().is_empty(),
        _ => false,
    }
}
