//! Lists and sets: `name[0]`, `name[1]`, ... or a single delimited value

use super::{invalid_value, BindContext, Binder};
use crate::bindable::{BindRestrictions, Bindable};
use crate::error::Result;
use crate::name::ConfigurationPropertyName;
use crate::source::ConfigurationProperty;
use crate::types::{TypeDescriptor, TypeKind};
use crate::value::BoundValue;
use std::collections::BTreeSet;
use tracing::trace;

const DEFAULT_DELIMITER: &str = ",";

pub(super) fn bind(
    binder: &Binder,
    name: &ConfigurationPropertyName,
    target: &Bindable,
    context: &mut BindContext<'_>,
) -> Result<Option<BoundValue>> {
    let (element, is_set) = match target.ty().kind() {
        TypeKind::List(element) => (element, false),
        TypeKind::Set(element) => (element, true),
        _ => return Ok(None),
    };

    let indices = known_indices(binder, name);
    let items = if indices.is_empty() {
        if name.is_empty() || target.has_restriction(BindRestrictions::NO_DIRECT_PROPERTY) {
            return Ok(None);
        }
        let Some(property) = binder.sources().find(name) else {
            return Ok(None);
        };
        split_property(binder, target, element, &property, context)?
    } else {
        trace!(name = %name, count = indices.len(), "Binding indexed elements");
        let element_target = Bindable::of_type(element.clone()).with_annotations(target.annotations().clone());
        let mut items = Vec::with_capacity(indices.len());
        for index in indices {
            let element_name = name.append_index(index);
            if let Some(item) = binder.bind_target(&element_name, &element_target, context, false)? {
                items.push(item);
            }
        }
        items
    };

    Ok(Some(if is_set {
        let mut unique = Vec::with_capacity(items.len());
        for item in items {
            if !unique.contains(&item) {
                unique.push(item);
            }
        }
        BoundValue::Set(unique)
    } else {
        BoundValue::List(items)
    }))
}

/// Every index directly under `name`, across all sources, ascending
fn known_indices(binder: &Binder, name: &ConfigurationPropertyName) -> BTreeSet<usize> {
    binder
        .sources()
        .iter()
        .flat_map(|source| source.descendants_of(name))
        .filter_map(|candidate| candidate.index_at(name.len()))
        .collect()
}

fn split_property(
    binder: &Binder,
    target: &Bindable,
    element: &TypeDescriptor,
    property: &ConfigurationProperty,
    context: &mut BindContext<'_>,
) -> Result<Vec<BoundValue>> {
    context.configuration_property = Some(property.clone());
    let resolved = binder.placeholders.resolve_placeholders(property.value())?;
    let delimiter = target.annotations().delimiter().unwrap_or(DEFAULT_DELIMITER);
    let mut items = Vec::new();
    for part in resolved.split(delimiter).map(str::trim).filter(|part| !part.is_empty()) {
        let item = binder
            .conversion
            .convert(part, element, target.annotations(), property.origin())
            .map_err(|error| invalid_value(property, error))?;
        items.extend(item);
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use crate::annotation::Annotation;
    use crate::bindable::Bindable;
    use crate::bind::Binder;
    use crate::source::{ConfigurationPropertySources, MapPropertySource, PropertySource};
    use crate::value::BoundValue;
    use std::sync::Arc;

    fn binder(sources: Vec<MapPropertySource>) -> Binder {
        Binder::new(
            ConfigurationPropertySources::new(
                sources
                    .into_iter()
                    .map(|s| Arc::new(s) as Arc<dyn PropertySource>),
            )
            .unwrap(),
        )
    }

    fn uints(values: &[u64]) -> BoundValue {
        BoundValue::List(values.iter().copied().map(BoundValue::UInt).collect())
    }

    #[test]
    fn test_index_order_wins() {
        let binder = binder(vec![MapPropertySource::from_pairs(
            "test",
            [("list[1]", "2"), ("list[0]", "1"), ("list[2]", "3")],
        )]);
        let result = binder.bind("list", &Bindable::list_of::<u32>()).unwrap();
        assert_eq!(result.into_option(), Some(uints(&[1, 2, 3])));
    }

    #[test]
    fn test_indices_aggregate_across_sources() {
        let binder = binder(vec![
            MapPropertySource::from_pairs("high", [("list[0]", "10")]),
            MapPropertySource::from_pairs("low", [("list[0]", "1"), ("list[1]", "2")]),
        ]);
        let result = binder.bind("list", &Bindable::list_of::<u32>()).unwrap();
        assert_eq!(result.into_option(), Some(uints(&[10, 2])));
    }

    #[test]
    fn test_sparse_indices_keep_order() {
        let binder = binder(vec![MapPropertySource::from_pairs(
            "test",
            [("list[5]", "6"), ("list[0]", "1")],
        )]);
        let result = binder.bind("list", &Bindable::list_of::<u32>()).unwrap();
        assert_eq!(result.into_option(), Some(uints(&[1, 6])));
    }

    #[test]
    fn test_delimited_value() {
        let binder = binder(vec![MapPropertySource::from_pairs(
            "test",
            [("list", "1, 2 ,3"), ("other", "a;b;a"), ("empty", "")],
        )]);
        assert_eq!(
            binder.bind("list", &Bindable::list_of::<u32>()).unwrap().into_option(),
            Some(uints(&[1, 2, 3]))
        );
        let set = Bindable::set_of::<String>().with_annotations([Annotation::Delimiter(";".into())]);
        assert_eq!(
            binder.bind("other", &set).unwrap().into_option(),
            Some(BoundValue::Set(vec![
                BoundValue::String("a".into()),
                BoundValue::String("b".into())
            ]))
        );
        assert_eq!(
            binder.bind("empty", &Bindable::list_of::<u32>()).unwrap().into_option(),
            Some(uints(&[]))
        );
    }

    #[test]
    fn test_invalid_element() {
        let binder = binder(vec![MapPropertySource::from_pairs("test", [("list", "1,two")])]);
        let error = binder.bind("list", &Bindable::list_of::<u32>()).unwrap_err();
        let invalid = error.as_invalid_value().unwrap();
        assert_eq!(invalid.name().to_string(), "list");
        assert_eq!(invalid.value(), "1,two");
    }
}
