//! Maps: every descendant of the map's name contributes an entry

use super::{BindContext, Binder};
use crate::bindable::{BindRestrictions, Bindable};
use crate::error::{BindError, BindingFailureKind, Result};
use crate::name::{ConfigurationPropertyName, Form};
use crate::source::ConfigurationPropertySource;
use crate::types::{TypeDescriptor, TypeKind};
use crate::value::{BoundValue, MapKey};
use indexmap::IndexMap;
use tracing::trace;

pub(super) fn bind(
    binder: &Binder,
    name: &ConfigurationPropertyName,
    target: &Bindable,
    context: &mut BindContext<'_>,
) -> Result<Option<BoundValue>> {
    let TypeKind::Map { key, value } = target.ty().kind() else {
        return Ok(None);
    };
    let valid_key = key.as_scalar().is_some_and(|scalar| !scalar.is_float());
    if !valid_key {
        return Err(BindError::binding(
            name,
            BindingFailureKind::UnsupportedMapKey(key.name().to_string()),
        ));
    }

    let has_descendants = binder.sources().contains_descendant_of(name);
    if !has_descendants && !name.is_empty() && !target.has_restriction(BindRestrictions::NO_DIRECT_PROPERTY) {
        if let Some(property) = binder.sources().find(name) {
            return binder.bind_property(target, &property, context);
        }
    }

    let mut entries: IndexMap<MapKey, BoundValue> = IndexMap::new();
    let value_target = Bindable::of_type(value.clone());
    for source in binder.sources().iter() {
        for candidate in source.descendants_of(name) {
            let entry_name = entry_name(binder, name, value, &candidate);
            let entry_key = entry_key(binder, source, name, &entry_name, key, &candidate)?;
            if entries.contains_key(&entry_key) {
                continue;
            }
            trace!(name = %entry_name, key = %entry_key, "Binding map entry");
            if let Some(bound) = binder.bind_target(&entry_name, &value_target, context, false)? {
                entries.insert(entry_key, bound);
            }
        }
    }
    if entries.is_empty() {
        return Ok(None);
    }

    let merged = match target.value() {
        Some(BoundValue::Map(mut existing)) => {
            existing.extend(entries);
            existing
        }
        _ => entries,
    };
    Ok(Some(BoundValue::Map(merged)))
}

/// The name bound for the entry that `candidate` belongs to
fn entry_name(
    binder: &Binder,
    root: &ConfigurationPropertyName,
    value: &TypeDescriptor,
    candidate: &ConfigurationPropertyName,
) -> ConfigurationPropertyName {
    if value.is_collection() {
        return chop_at_numeric_index(root, candidate);
    }
    if !root.is_parent_of(candidate) && !binder.conversion.can_convert(value) {
        return candidate.chop(root.len() + 1);
    }
    candidate.clone()
}

fn chop_at_numeric_index(
    root: &ConfigurationPropertyName,
    candidate: &ConfigurationPropertyName,
) -> ConfigurationPropertyName {
    (root.len() + 1..candidate.len())
        .find(|&i| candidate.index_at(i).is_some())
        .map_or_else(|| candidate.clone(), |i| candidate.chop(i))
}

/// Everything after the root, in its original form, converted to the key type
fn entry_key(
    binder: &Binder,
    source: &ConfigurationPropertySource,
    root: &ConfigurationPropertyName,
    entry_name: &ConfigurationPropertyName,
    key: &TypeDescriptor,
    candidate: &ConfigurationPropertyName,
) -> Result<MapKey> {
    let raw = entry_name
        .elements(Form::Original)
        .skip(root.len())
        .collect::<Vec<_>>()
        .join(".");
    let property = source.get(candidate);
    binder
        .conversion
        .convert_key(&raw, key, &Default::default(), property.as_ref().and_then(|p| p.origin()))
}

#[cfg(test)]
mod tests {
    use crate::bindable::Bindable;
    use crate::bind::Binder;
    use crate::error::{BindError, BindingFailureKind};
    use crate::source::{ConfigurationPropertySources, MapPropertySource, PropertySource};
    use crate::value::{BoundValue, MapKey};
    use std::collections::BTreeMap;
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

    fn key(value: &str) -> MapKey {
        MapKey::String(value.to_string())
    }

    #[test]
    fn test_scalar_entries() {
        let binder = binder(vec![MapPropertySource::from_pairs(
            "test",
            [("app.limits.cpu", "2"), ("app.limits.memory", "4"), ("app.other", "x")],
        )]);
        let bound = binder
            .bind("app.limits", &Bindable::map_of::<String, u32>())
            .unwrap()
            .into_option()
            .unwrap();
        let map = bound.as_map().unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map.get(&key("cpu")), Some(&BoundValue::UInt(2)));
        assert_eq!(map.get(&key("memory")), Some(&BoundValue::UInt(4)));
    }

    #[test]
    fn test_dotted_keys_for_scalar_values() {
        let binder = binder(vec![MapPropertySource::from_pairs(
            "test",
            [("app.labels.team.name", "core"), ("app.labels[x.y]", "bracketed")],
        )]);
        let bound = binder
            .bind("app.labels", &Bindable::map_of::<String, String>())
            .unwrap()
            .into_option()
            .unwrap();
        let map = bound.as_map().unwrap();
        assert_eq!(map.get(&key("team.name")), Some(&BoundValue::String("core".into())));
        assert_eq!(map.get(&key("x.y")), Some(&BoundValue::String("bracketed".into())));
    }

    #[test]
    fn test_higher_priority_source_wins_per_key() {
        let binder = binder(vec![
            MapPropertySource::from_pairs("high", [("app.limits.cpu", "8")]),
            MapPropertySource::from_pairs("low", [("app.limits.cpu", "2"), ("app.limits.disk", "100")]),
        ]);
        let bound = binder
            .bind("app.limits", &Bindable::map_of::<String, u32>())
            .unwrap()
            .into_option()
            .unwrap();
        let map = bound.as_map().unwrap();
        assert_eq!(map.get(&key("cpu")), Some(&BoundValue::UInt(8)));
        assert_eq!(map.get(&key("disk")), Some(&BoundValue::UInt(100)));
    }

    #[test]
    fn test_nested_maps_and_list_values() {
        let binder = binder(vec![MapPropertySource::from_pairs(
            "test",
            [
                ("app.routes.a.x", "1"),
                ("app.routes.a.y", "2"),
                ("app.hosts.eu[0]", "one"),
                ("app.hosts.eu[1]", "two"),
            ],
        )]);
        let nested = binder
            .bind("app.routes", &Bindable::map_of::<String, BTreeMap<String, u32>>())
            .unwrap()
            .into_option()
            .unwrap();
        let inner = nested.as_map().unwrap().get(&key("a")).unwrap().as_map().unwrap();
        assert_eq!(inner.len(), 2);

        let lists = binder
            .bind("app.hosts", &Bindable::map_of::<String, Vec<String>>())
            .unwrap()
            .into_option()
            .unwrap();
        assert_eq!(
            lists.as_map().unwrap().get(&key("eu")),
            Some(&BoundValue::List(vec![
                BoundValue::String("one".into()),
                BoundValue::String("two".into())
            ]))
        );
    }

    #[test]
    fn test_typed_keys() {
        let binder = binder(vec![MapPropertySource::from_pairs("test", [("app.ports[80]", "http")])]);
        let bound = binder
            .bind("app.ports", &Bindable::map_of::<u16, String>())
            .unwrap()
            .into_option()
            .unwrap();
        assert!(bound.as_map().unwrap().contains_key(&MapKey::UInt(80)));
    }

    #[test]
    fn test_float_keys_rejected() {
        let binder = binder(vec![MapPropertySource::from_pairs("test", [("app.weights.a", "1")])]);
        let error = binder
            .bind("app.weights", &Bindable::map_of::<f64, u32>())
            .unwrap_err();
        assert!(matches!(
            error,
            BindError::BindingFailure {
                kind: BindingFailureKind::UnsupportedMapKey(_),
                ..
            }
        ));
    }

    #[test]
    fn test_merges_existing_value() {
        let binder = binder(vec![MapPropertySource::from_pairs("test", [("app.limits.cpu", "4")])]);
        let mut existing = indexmap::IndexMap::new();
        existing.insert(key("cpu"), BoundValue::UInt(1));
        existing.insert(key("gpu"), BoundValue::UInt(1));
        let target = Bindable::map_of::<String, u32>()
            .with_existing_value(BoundValue::Map(existing))
            .unwrap();
        let bound = binder.bind("app.limits", &target).unwrap().into_option().unwrap();
        let map = bound.as_map().unwrap();
        assert_eq!(map.get(&key("cpu")), Some(&BoundValue::UInt(4)));
        assert_eq!(map.get(&key("gpu")), Some(&BoundValue::UInt(1)));
    }
}
