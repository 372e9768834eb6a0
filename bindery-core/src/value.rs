//! Dynamically typed bind results and the serde bridge

use crate::data_size::DataSize;
use crate::duration::DurationStyle;
use crate::error::{BindError, Result};
use crate::name::ConfigurationPropertyName;
use crate::types::{ScalarType, TypeDescriptor, TypeKind};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Number, Value};
use std::fmt;
use std::time::Duration;

/// A value produced by binding
#[derive(Debug, Clone, PartialEq)]
pub enum BoundValue {
    Bool(bool),
    Char(char),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
    Duration(Duration),
    DataSize(DataSize),
    /// The constant name of an enum
    Enum(String),
    List(Vec<BoundValue>),
    /// Set elements in first-bound order, without duplicates
    Set(Vec<BoundValue>),
    Map(IndexMap<MapKey, BoundValue>),
    Object(ObjectValue),
}

/// A bound map key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MapKey {
    Bool(bool),
    Char(char),
    Int(i64),
    UInt(u64),
    String(String),
    Enum(String),
}

impl MapKey {
    /// Narrow a converted scalar to a key; floats and aggregates are not keys
    pub fn from_value(value: BoundValue) -> Option<Self> {
        match value {
            BoundValue::Bool(v) => Some(MapKey::Bool(v)),
            BoundValue::Char(v) => Some(MapKey::Char(v)),
            BoundValue::Int(v) => Some(MapKey::Int(v)),
            BoundValue::UInt(v) => Some(MapKey::UInt(v)),
            BoundValue::String(v) => Some(MapKey::String(v)),
            BoundValue::Enum(v) => Some(MapKey::Enum(v)),
            _ => None,
        }
    }
}

impl fmt::Display for MapKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapKey::Bool(v) => write!(f, "{v}"),
            MapKey::Char(v) => write!(f, "{v}"),
            MapKey::Int(v) => write!(f, "{v}"),
            MapKey::UInt(v) => write!(f, "{v}"),
            MapKey::String(v) | MapKey::Enum(v) => f.write_str(v),
        }
    }
}

/// Fields of a bound object, keyed by member name
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectValue {
    type_name: String,
    fields: IndexMap<String, BoundValue>,
}

impl ObjectValue {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: IndexMap::new(),
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn get(&self, field: &str) -> Option<&BoundValue> {
        self.fields.get(field)
    }

    pub fn set(&mut self, field: impl Into<String>, value: BoundValue) {
        self.fields.insert(field.into(), value);
    }

    pub fn with(mut self, field: impl Into<String>, value: BoundValue) -> Self {
        self.set(field, value);
        self
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &BoundValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl BoundValue {
    pub fn empty_object(type_name: impl Into<String>) -> Self {
        BoundValue::Object(ObjectValue::new(type_name))
    }

    /// The empty value of a collection or map type
    pub fn empty_of(ty: &TypeDescriptor) -> Option<Self> {
        match ty.kind() {
            TypeKind::List(_) => Some(BoundValue::List(Vec::new())),
            TypeKind::Set(_) => Some(BoundValue::Set(Vec::new())),
            TypeKind::Map { .. } => Some(BoundValue::Map(IndexMap::new())),
            _ => None,
        }
    }

    /// The value an unbound primitive takes
    pub fn zero_of(ty: &TypeDescriptor) -> Option<Self> {
        if !ty.is_primitive() {
            return None;
        }
        let zero = match ty.as_scalar()? {
            ScalarType::Bool => BoundValue::Bool(false),
            ScalarType::Char => BoundValue::Char('\0'),
            ScalarType::F32 | ScalarType::F64 => BoundValue::Float(0.0),
            ScalarType::U8 | ScalarType::U16 | ScalarType::U32 | ScalarType::U64 => BoundValue::UInt(0),
            ScalarType::I8 | ScalarType::I16 | ScalarType::I32 | ScalarType::I64 => BoundValue::Int(0),
            _ => return None,
        };
        Some(zero)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            BoundValue::String(v) | BoundValue::Enum(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            BoundValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            BoundValue::Int(v) => Some(*v),
            BoundValue::UInt(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            BoundValue::UInt(v) => Some(*v),
            BoundValue::Int(v) => u64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[BoundValue]> {
        match self {
            BoundValue::List(items) | BoundValue::Set(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<MapKey, BoundValue>> {
        match self {
            BoundValue::Map(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectValue> {
        match self {
            BoundValue::Object(object) => Some(object),
            _ => None,
        }
    }

    /// Short description of the value's shape, used in type mismatch errors
    pub fn kind_name(&self) -> String {
        match self {
            BoundValue::Bool(_) => "bool".into(),
            BoundValue::Char(_) => "char".into(),
            BoundValue::Int(_) | BoundValue::UInt(_) => "integer".into(),
            BoundValue::Float(_) => "float".into(),
            BoundValue::String(_) => "String".into(),
            BoundValue::Duration(_) => "Duration".into(),
            BoundValue::DataSize(_) => "DataSize".into(),
            BoundValue::Enum(constant) => format!("enum constant {constant}"),
            BoundValue::List(_) => "list".into(),
            BoundValue::Set(_) => "set".into(),
            BoundValue::Map(_) => "map".into(),
            BoundValue::Object(object) => object.type_name.clone(),
        }
    }

    /// Whether this value could have been bound to `ty`
    pub fn is_instance_of(&self, ty: &TypeDescriptor) -> bool {
        match (ty.kind(), self) {
            (TypeKind::Scalar(scalar), value) => value.is_scalar_instance_of(scalar),
            (TypeKind::List(element), BoundValue::List(items))
            | (TypeKind::Set(element), BoundValue::Set(items))
            | (TypeKind::Set(element), BoundValue::List(items)) => {
                items.iter().all(|item| item.is_instance_of(element))
            }
            (TypeKind::Map { value, .. }, BoundValue::Map(entries)) => {
                entries.values().all(|v| v.is_instance_of(value))
            }
            (TypeKind::Object(object), BoundValue::Object(instance)) => object.name() == instance.type_name,
            _ => false,
        }
    }

    fn is_scalar_instance_of(&self, scalar: &ScalarType) -> bool {
        if let Some((min, max)) = scalar.integer_range() {
            return match self {
                BoundValue::Int(v) => (min..=max).contains(&i128::from(*v)),
                BoundValue::UInt(v) => (min..=max).contains(&i128::from(*v)),
                _ => false,
            };
        }
        match (scalar, self) {
            (ScalarType::Bool, BoundValue::Bool(_))
            | (ScalarType::Char, BoundValue::Char(_))
            | (ScalarType::String | ScalarType::Path, BoundValue::String(_))
            | (ScalarType::Duration, BoundValue::Duration(_))
            | (ScalarType::DataSize, BoundValue::DataSize(_)) => true,
            (ScalarType::F32 | ScalarType::F64, value) => {
                matches!(value, BoundValue::Float(_) | BoundValue::Int(_) | BoundValue::UInt(_))
            }
            (ScalarType::Enum(e), BoundValue::Enum(constant)) => e.constants().contains(constant),
            (ScalarType::Custom, value) => !matches!(
                value,
                BoundValue::List(_) | BoundValue::Set(_) | BoundValue::Map(_) | BoundValue::Object(_)
            ),
            _ => false,
        }
    }

    /// The JSON form understood by serde's derived `Deserialize`
    pub fn to_json(&self) -> Value {
        match self {
            BoundValue::Bool(v) => Value::Bool(*v),
            BoundValue::Char(v) => Value::String(v.to_string()),
            BoundValue::Int(v) => Value::from(*v),
            BoundValue::UInt(v) => Value::from(*v),
            BoundValue::Float(v) => Number::from_f64(*v).map_or(Value::Null, Value::Number),
            BoundValue::String(v) | BoundValue::Enum(v) => Value::String(v.clone()),
            BoundValue::Duration(d) => {
                let mut map = Map::new();
                map.insert("secs".into(), Value::from(d.as_secs()));
                map.insert("nanos".into(), Value::from(d.subsec_nanos()));
                Value::Object(map)
            }
            BoundValue::DataSize(size) => Value::from(size.to_bytes()),
            BoundValue::List(items) | BoundValue::Set(items) => {
                Value::Array(items.iter().map(BoundValue::to_json).collect())
            }
            BoundValue::Map(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_json()))
                    .collect(),
            ),
            BoundValue::Object(object) => Value::Object(
                object
                    .fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }

    /// Read a JSON value (as produced by `serde_json::to_value`) as `ty`
    pub fn from_json(json: &Value, ty: &TypeDescriptor) -> Result<Self> {
        let mismatch = || BindError::TypeMismatch {
            expected: ty.name().to_string(),
            actual: json_kind(json).to_string(),
        };
        let value = match (ty.kind(), json) {
            (TypeKind::Scalar(scalar), json) => scalar_from_json(scalar, json).ok_or_else(mismatch)?,
            (TypeKind::List(element), Value::Array(items)) => BoundValue::List(
                items
                    .iter()
                    .map(|item| Self::from_json(item, element))
                    .collect::<Result<_>>()?,
            ),
            (TypeKind::Set(element), Value::Array(items)) => {
                let mut set = Vec::with_capacity(items.len());
                for item in items {
                    let item = Self::from_json(item, element)?;
                    if !set.contains(&item) {
                        set.push(item);
                    }
                }
                BoundValue::Set(set)
            }
            (TypeKind::Map { key, value }, Value::Object(entries)) => {
                let key_scalar = key.as_scalar().ok_or_else(mismatch)?;
                let mut map = IndexMap::with_capacity(entries.len());
                for (raw_key, raw_value) in entries {
                    let map_key = scalar_from_json(key_scalar, &Value::String(raw_key.clone()))
                        .or_else(|| key_from_str(key_scalar, raw_key))
                        .and_then(MapKey::from_value)
                        .ok_or_else(mismatch)?;
                    map.insert(map_key, Self::from_json(raw_value, value)?);
                }
                BoundValue::Map(map)
            }
            (TypeKind::Object(object), Value::Object(fields)) => {
                let mut instance = ObjectValue::new(object.name());
                let members = object
                    .properties()
                    .iter()
                    .chain(object.constructors().iter().flat_map(|c| c.parameters()));
                for member in members {
                    if instance.fields.contains_key(member.name()) {
                        continue;
                    }
                    match fields.get(member.name()) {
                        None | Some(Value::Null) => {}
                        Some(field) => {
                            let field = Self::from_json(field, &member.ty())?;
                            instance.set(member.name(), field);
                        }
                    }
                }
                BoundValue::Object(instance)
            }
            _ => return Err(mismatch()),
        };
        Ok(value)
    }

    /// Serialize `value` and read it back as `ty`
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T, ty: &TypeDescriptor) -> Result<Self> {
        let json = serde_json::to_value(value).map_err(|e| BindError::Deserialize {
            name: ConfigurationPropertyName::empty(),
            target: ty.name().to_string(),
            message: e.to_string(),
        })?;
        Self::from_json(&json, ty)
    }

    /// Deserialize into a Rust type; `name` and `target` are used for errors
    pub fn deserialize_into<T: DeserializeOwned>(&self, name: &ConfigurationPropertyName, target: &str) -> Result<T> {
        serde_json::from_value(self.to_json()).map_err(|e| BindError::Deserialize {
            name: name.clone(),
            target: target.to_string(),
            message: e.to_string(),
        })
    }
}

fn json_kind(json: &Value) -> &'static str {
    match json {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn scalar_from_json(scalar: &ScalarType, json: &Value) -> Option<BoundValue> {
    if let Some((min, max)) = scalar.integer_range() {
        let value = json
            .as_i64()
            .map(i128::from)
            .or_else(|| json.as_u64().map(i128::from))?;
        if !(min..=max).contains(&value) {
            return None;
        }
        return Some(if min < 0 {
            BoundValue::Int(i64::try_from(value).ok()?)
        } else {
            BoundValue::UInt(u64::try_from(value).ok()?)
        });
    }
    let value = match (scalar, json) {
        (ScalarType::Bool, Value::Bool(v)) => BoundValue::Bool(*v),
        (ScalarType::Char, Value::String(v)) => {
            let mut chars = v.chars();
            let ch = chars.next()?;
            if chars.next().is_some() {
                return None;
            }
            BoundValue::Char(ch)
        }
        (ScalarType::F32 | ScalarType::F64, Value::Number(n)) => BoundValue::Float(n.as_f64()?),
        (ScalarType::String | ScalarType::Path, Value::String(v)) => BoundValue::String(v.clone()),
        (ScalarType::Duration, Value::Object(map)) => {
            let secs = map.get("secs")?.as_u64()?;
            let nanos = u32::try_from(map.get("nanos")?.as_u64()?).ok()?;
            BoundValue::Duration(Duration::new(secs, nanos))
        }
        (ScalarType::Duration, Value::String(v)) => {
            BoundValue::Duration(DurationStyle::parse_any(v, None).ok()?)
        }
        (ScalarType::DataSize, Value::Number(n)) => BoundValue::DataSize(DataSize::of_bytes(n.as_i64()?)),
        (ScalarType::Enum(e), Value::String(v)) if e.constants().contains(v) => BoundValue::Enum(v.clone()),
        (ScalarType::Custom, Value::Bool(v)) => BoundValue::Bool(*v),
        (ScalarType::Custom, Value::String(v)) => BoundValue::String(v.clone()),
        (ScalarType::Custom, Value::Number(n)) => n
            .as_i64()
            .map(BoundValue::Int)
            .or_else(|| n.as_u64().map(BoundValue::UInt))
            .or_else(|| n.as_f64().map(BoundValue::Float))?,
        _ => return None,
    };
    Some(value)
}

/// Map keys arrive as JSON strings even when the key type is not a string
fn key_from_str(scalar: &ScalarType, raw: &str) -> Option<BoundValue> {
    if scalar.integer_range().is_some() {
        let json = raw
            .parse::<i64>()
            .map(Value::from)
            .or_else(|_| raw.parse::<u64>().map(Value::from))
            .ok()?;
        return scalar_from_json(scalar, &json);
    }
    match scalar {
        ScalarType::Bool => raw.parse().ok().map(BoundValue::Bool),
        _ => None,
    }
}

impl fmt::Display for BoundValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundValue::Bool(v) => write!(f, "{v}"),
            BoundValue::Char(v) => write!(f, "{v}"),
            BoundValue::Int(v) => write!(f, "{v}"),
            BoundValue::UInt(v) => write!(f, "{v}"),
            BoundValue::Float(v) => write!(f, "{v}"),
            BoundValue::String(v) | BoundValue::Enum(v) => f.write_str(v),
            BoundValue::Duration(d) => f.write_str(&DurationStyle::Simple.print(*d)),
            BoundValue::DataSize(size) => write!(f, "{size}"),
            BoundValue::List(items) | BoundValue::Set(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            BoundValue::Map(entries) => {
                f.write_str("{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}={v}")?;
                }
                f.write_str("}")
            }
            BoundValue::Object(object) => {
                write!(f, "{}{{", object.type_name)?;
                for (i, (k, v)) in object.fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}={v}")?;
                }
                f.write_str("}")
            }
        }
    }
}
