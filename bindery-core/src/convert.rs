//! Conversion of raw property values to typed scalars
//!
//! [`ConversionService`] converts the textual value of a single property to a
//! [`BoundValue`] of a target type. The built-in conversions cover booleans,
//! characters, integers (decimal or `0x`/`#` hex), floats, strings, paths,
//! durations, data sizes and enums. Converters registered by type name take
//! precedence and are the only way to convert [`ScalarType::Custom`] types.

use crate::annotation::Annotations;
use crate::data_size::DataSize;
use crate::duration::DurationStyle;
use crate::error::{BindError, Result};
use crate::origin::Origin;
use crate::types::{ScalarType, TypeDescriptor, TypeKind};
use crate::value::{BoundValue, MapKey};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// A conversion from a raw value to a bound value, or a reason it failed
pub type Converter = Arc<dyn Fn(&str, &Annotations) -> std::result::Result<BoundValue, String> + Send + Sync>;

static SHARED: Lazy<Arc<ConversionService>> = Lazy::new(|| Arc::new(ConversionService::default()));

/// Registry of scalar conversions
#[derive(Clone, Default)]
pub struct ConversionService {
    converters: HashMap<String, Converter>,
}

impl ConversionService {
    /// The process-wide service with only the built-in conversions
    pub fn shared() -> Arc<Self> {
        Arc::clone(&SHARED)
    }

    pub fn builder() -> ConversionServiceBuilder {
        ConversionServiceBuilder::default()
    }

    pub fn has_converter(&self, type_name: &str) -> bool {
        self.converters.contains_key(type_name)
    }

    /// Whether `ty` can be converted from a single raw value
    pub fn can_convert(&self, ty: &TypeDescriptor) -> bool {
        (ty.is_scalar() && !matches!(ty.kind(), TypeKind::Scalar(ScalarType::Custom))) || self.has_converter(ty.name())
    }

    /// Convert `raw` to `ty`.
    ///
    /// Without a registered converter, an empty value converts to `None` for
    /// every type except strings and paths, so `port=` leaves a port unbound
    /// rather than failing.
    pub fn convert(
        &self,
        raw: &str,
        ty: &TypeDescriptor,
        annotations: &Annotations,
        origin: Option<&Origin>,
    ) -> Result<Option<BoundValue>> {
        let failure = |reason: String| BindError::ConversionFailure {
            value: raw.to_string(),
            target: ty.name().to_string(),
            origin: origin.cloned(),
            reason,
        };
        if let Some(converter) = self.converters.get(ty.name()) {
            trace!(target_type = ty.name(), "Using registered converter");
            return converter(raw, annotations).map(Some).map_err(failure);
        }
        let textual = matches!(
            ty.kind(),
            TypeKind::Scalar(ScalarType::String | ScalarType::Path)
        );
        if raw.trim().is_empty() && !textual {
            return Ok(None);
        }
        match ty.kind() {
            TypeKind::Scalar(scalar) => convert_scalar(raw, scalar, annotations).map(Some).map_err(failure),
            _ => Err(failure(format!("no converter for {}", ty.name()))),
        }
    }

    /// Convert a map key; floats and aggregates are rejected
    pub fn convert_key(
        &self,
        raw: &str,
        ty: &TypeDescriptor,
        annotations: &Annotations,
        origin: Option<&Origin>,
    ) -> Result<MapKey> {
        let failure = |reason: &str| BindError::ConversionFailure {
            value: raw.to_string(),
            target: ty.name().to_string(),
            origin: origin.cloned(),
            reason: reason.to_string(),
        };
        let value = self
            .convert(raw, ty, annotations, origin)?
            .ok_or_else(|| failure("map keys cannot be empty"))?;
        MapKey::from_value(value).ok_or_else(|| failure("not a valid map key"))
    }
}

impl fmt::Debug for ConversionService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.converters.keys().collect();
        names.sort();
        f.debug_struct("ConversionService")
            .field("converters", &names)
            .finish()
    }
}

#[derive(Default)]
pub struct ConversionServiceBuilder {
    converters: HashMap<String, Converter>,
}

impl ConversionServiceBuilder {
    /// Register a converter for the type named `type_name`, replacing any
    /// built-in conversion for it
    pub fn with_converter<F>(mut self, type_name: impl Into<String>, converter: F) -> Self
    where
        F: Fn(&str, &Annotations) -> std::result::Result<BoundValue, String> + Send + Sync + 'static,
    {
        self.converters.insert(type_name.into(), Arc::new(converter));
        self
    }

    pub fn build(self) -> ConversionService {
        ConversionService {
            converters: self.converters,
        }
    }
}

fn convert_scalar(raw: &str, scalar: &ScalarType, annotations: &Annotations) -> std::result::Result<BoundValue, String> {
    if let Some((min, max)) = scalar.integer_range() {
        let value = parse_integer(raw)?;
        if !(min..=max).contains(&value) {
            return Err(format!("{value} is out of range [{min}, {max}]"));
        }
        return Ok(if min < 0 {
            BoundValue::Int(value as i64)
        } else {
            BoundValue::UInt(value as u64)
        });
    }
    match scalar {
        ScalarType::Bool => parse_bool(raw).map(BoundValue::Bool),
        ScalarType::Char => {
            let mut chars = raw.chars();
            match (chars.next(), chars.next()) {
                (Some(ch), None) => Ok(BoundValue::Char(ch)),
                _ => Err("expected a single character".to_string()),
            }
        }
        ScalarType::F32 => raw
            .trim()
            .parse::<f32>()
            .map(|v| BoundValue::Float(f64::from(v)))
            .map_err(|e| e.to_string()),
        ScalarType::F64 => raw
            .trim()
            .parse::<f64>()
            .map(BoundValue::Float)
            .map_err(|e| e.to_string()),
        ScalarType::String | ScalarType::Path => Ok(BoundValue::String(raw.to_string())),
        ScalarType::Duration => {
            DurationStyle::parse_any(raw, annotations.duration_unit()).map(BoundValue::Duration)
        }
        ScalarType::DataSize => DataSize::parse(raw, annotations.data_size_unit()).map(BoundValue::DataSize),
        ScalarType::Enum(e) => {
            let wanted = lenient(raw);
            e.constants()
                .iter()
                .find(|constant| lenient(constant) == wanted)
                .map(|constant| BoundValue::Enum(constant.clone()))
                .ok_or_else(|| format!("expected one of [{}]", e.constants().join(", ")))
        }
        ScalarType::Custom => Err("no converter registered".to_string()),
        // integer types are handled above
        _ => Err("unsupported scalar type".to_string()),
    }
}

fn parse_bool(raw: &str) -> std::result::Result<bool, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Ok(true),
        "false" | "off" | "no" | "0" => Ok(false),
        _ => Err("expected one of true/false, on/off, yes/no, 1/0".to_string()),
    }
}

fn parse_integer(raw: &str) -> std::result::Result<i128, String> {
    let trimmed = raw.trim();
    let (negative, unsigned) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let parsed = if let Some(hex) = unsigned
        .strip_prefix("0x")
        .or_else(|| unsigned.strip_prefix("0X"))
        .or_else(|| unsigned.strip_prefix('#'))
    {
        i128::from_str_radix(hex, 16)
    } else {
        unsigned.parse::<i128>()
    };
    let value = parsed.map_err(|_| format!("'{trimmed}' is not a valid integer"))?;
    if unsigned.starts_with(['+', '-']) {
        return Err(format!("'{trimmed}' is not a valid integer"));
    }
    Ok(if negative { -value } else { value })
}

/// The form enum constants are compared in: lowercase alphanumerics only
fn lenient(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::Annotation;
    use crate::data_size::DataUnit;
    use crate::types::Describe;
    use std::time::Duration;

    fn convert(raw: &str, ty: &TypeDescriptor) -> Result<Option<BoundValue>> {
        ConversionService::shared().convert(raw, ty, &Annotations::default(), None)
    }

    #[test]
    fn test_booleans() {
        for raw in ["true", "ON", "yes", "1"] {
            assert_eq!(convert(raw, &bool::describe()).unwrap(), Some(BoundValue::Bool(true)));
        }
        for raw in ["false", "Off", "no", "0"] {
            assert_eq!(convert(raw, &bool::describe()).unwrap(), Some(BoundValue::Bool(false)));
        }
        assert!(convert("maybe", &bool::describe()).is_err());
    }

    #[test]
    fn test_integers() {
        assert_eq!(convert(" 42 ", &u16::describe()).unwrap(), Some(BoundValue::UInt(42)));
        assert_eq!(convert("0xFF", &u8::describe()).unwrap(), Some(BoundValue::UInt(255)));
        assert_eq!(convert("#10", &i32::describe()).unwrap(), Some(BoundValue::Int(16)));
        assert_eq!(convert("-7", &i8::describe()).unwrap(), Some(BoundValue::Int(-7)));
        assert!(convert("256", &u8::describe()).is_err());
        assert!(convert("-1", &u32::describe()).is_err());
        assert!(convert("--1", &i32::describe()).is_err());
    }

    #[test]
    fn test_conversion_failure_carries_context() {
        let origin = Origin::environment_variable("APP_PORT");
        let error = ConversionService::shared()
            .convert("abc", &u16::describe(), &Annotations::default(), Some(&origin))
            .unwrap_err();
        match error {
            BindError::ConversionFailure { value, target, origin, .. } => {
                assert_eq!(value, "abc");
                assert_eq!(target, "u16");
                assert_eq!(origin.unwrap().to_string(), "System Environment Property \"APP_PORT\"");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_empty_value_is_unbound_for_scalars() {
        assert_eq!(convert("", &u32::describe()).unwrap(), None);
        assert_eq!(convert("", &String::describe()).unwrap(), Some(BoundValue::String(String::new())));
    }

    #[test]
    fn test_lenient_enums() {
        let ty = TypeDescriptor::enumeration("Level", ["Debug", "InfoLevel"]);
        assert_eq!(convert("debug", &ty).unwrap(), Some(BoundValue::Enum("Debug".into())));
        assert_eq!(convert("INFO_LEVEL", &ty).unwrap(), Some(BoundValue::Enum("InfoLevel".into())));
        assert_eq!(convert("info-level", &ty).unwrap(), Some(BoundValue::Enum("InfoLevel".into())));
        assert!(convert("trace", &ty).is_err());
    }

    #[test]
    fn test_units_from_annotations() {
        let annotations = Annotations::from([
            Annotation::DurationUnit(crate::duration::DurationUnit::Seconds),
            Annotation::DataSizeUnit(DataUnit::Megabytes),
        ]);
        let service = ConversionService::shared();
        assert_eq!(
            service.convert("30", &Duration::describe(), &annotations, None).unwrap(),
            Some(BoundValue::Duration(Duration::from_secs(30)))
        );
        assert_eq!(
            service.convert("2", &DataSize::describe(), &annotations, None).unwrap(),
            Some(BoundValue::DataSize(DataSize::of_megabytes(2)))
        );
        assert!(service.convert("5 parsecs", &Duration::describe(), &annotations, None).is_err());
    }

    #[test]
    fn test_custom_converter() {
        let service = ConversionService::builder()
            .with_converter("Version", |raw, _| {
                raw.strip_prefix('v')
                    .map(|v| BoundValue::String(v.to_string()))
                    .ok_or_else(|| "versions start with 'v'".to_string())
            })
            .build();
        let ty = TypeDescriptor::custom("Version");
        assert!(service.can_convert(&ty));
        assert!(!ConversionService::shared().can_convert(&ty));
        assert_eq!(
            service.convert("v1.2", &ty, &Annotations::default(), None).unwrap(),
            Some(BoundValue::String("1.2".into()))
        );
        assert!(ConversionService::shared()
            .convert("v1.2", &ty, &Annotations::default(), None)
            .is_err());
    }

    #[test]
    fn test_map_keys() {
        let service = ConversionService::shared();
        assert_eq!(
            service.convert_key("7", &u32::describe(), &Annotations::default(), None).unwrap(),
            MapKey::UInt(7)
        );
        assert!(service.convert_key("1.5", &f64::describe(), &Annotations::default(), None).is_err());
    }
}
