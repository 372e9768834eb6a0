//! Runtime descriptions of bind targets
//!
//! The binder never inspects Rust types directly. Every target is described by
//! a [`TypeDescriptor`]: scalars, lists, sets, maps, and objects with
//! constructors and writable properties. Types implement [`Describe`] to
//! supply their descriptor; the standard scalar, collection and map types are
//! covered here.

use crate::annotation::Annotations;
use crate::data_size::DataSize;
use crate::error::Result;
use crate::value::BoundValue;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Types that can describe themselves as a bind target
pub trait Describe {
    fn describe() -> TypeDescriptor;
}

/// A cheap-to-clone description of a bind target type
#[derive(Clone)]
pub struct TypeDescriptor {
    inner: Arc<TypeInner>,
}

struct TypeInner {
    name: String,
    kind: TypeKind,
    primitive: bool,
}

#[derive(Debug, Clone)]
pub enum TypeKind {
    Scalar(ScalarType),
    List(TypeDescriptor),
    Set(TypeDescriptor),
    Map {
        key: TypeDescriptor,
        value: TypeDescriptor,
    },
    Object(ObjectType),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScalarType {
    Bool,
    Char,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    String,
    Duration,
    DataSize,
    Path,
    Enum(EnumType),
    /// Converted only by a converter registered under the type's name
    Custom,
}

impl ScalarType {
    /// Inclusive range of an integer type
    pub(crate) fn integer_range(&self) -> Option<(i128, i128)> {
        let range = match self {
            ScalarType::I8 => (i8::MIN.into(), i8::MAX.into()),
            ScalarType::I16 => (i16::MIN.into(), i16::MAX.into()),
            ScalarType::I32 => (i32::MIN.into(), i32::MAX.into()),
            ScalarType::I64 => (i64::MIN.into(), i64::MAX.into()),
            ScalarType::U8 => (0, u8::MAX.into()),
            ScalarType::U16 => (0, u16::MAX.into()),
            ScalarType::U32 => (0, u32::MAX.into()),
            ScalarType::U64 => (0, u64::MAX.into()),
            _ => return None,
        };
        Some(range)
    }

    pub(crate) fn is_float(&self) -> bool {
        matches!(self, ScalarType::F32 | ScalarType::F64)
    }
}

/// A closed set of named constants
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumType {
    constants: Vec<String>,
}

impl EnumType {
    pub fn constants(&self) -> &[String] {
        &self.constants
    }
}

impl TypeDescriptor {
    fn new(name: impl Into<String>, kind: TypeKind, primitive: bool) -> Self {
        Self {
            inner: Arc::new(TypeInner {
                name: name.into(),
                kind,
                primitive,
            }),
        }
    }

    /// A primitive scalar: never absent, zero when unbound in a constructor
    pub fn primitive(name: impl Into<String>, scalar: ScalarType) -> Self {
        Self::new(name, TypeKind::Scalar(scalar), true)
    }

    pub fn scalar(name: impl Into<String>, scalar: ScalarType) -> Self {
        Self::new(name, TypeKind::Scalar(scalar), false)
    }

    /// An enum whose constants are matched leniently
    pub fn enumeration<I, S>(name: impl Into<String>, constants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let constants = constants.into_iter().map(Into::into).collect();
        Self::scalar(name, ScalarType::Enum(EnumType { constants }))
    }

    /// A scalar converted by a custom converter registered under `name`
    pub fn custom(name: impl Into<String>) -> Self {
        Self::scalar(name, ScalarType::Custom)
    }

    pub fn list(element: TypeDescriptor) -> Self {
        Self::new(format!("Vec<{}>", element.name()), TypeKind::List(element), false)
    }

    pub fn set(element: TypeDescriptor) -> Self {
        Self::new(format!("Set<{}>", element.name()), TypeKind::Set(element), false)
    }

    pub fn map(key: TypeDescriptor, value: TypeDescriptor) -> Self {
        Self::new(
            format!("Map<{}, {}>", key.name(), value.name()),
            TypeKind::Map { key, value },
            false,
        )
    }

    pub fn object(object: ObjectType) -> Self {
        Self::new(object.name.clone(), TypeKind::Object(object), false)
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn kind(&self) -> &TypeKind {
        &self.inner.kind
    }

    pub fn is_primitive(&self) -> bool {
        self.inner.primitive
    }

    /// The same type, but allowed to be absent
    pub fn boxed(&self) -> Self {
        if !self.inner.primitive {
            return self.clone();
        }
        Self::new(self.inner.name.clone(), self.inner.kind.clone(), false)
    }

    pub fn as_scalar(&self) -> Option<&ScalarType> {
        match self.kind() {
            TypeKind::Scalar(scalar) => Some(scalar),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectType> {
        match self.kind() {
            TypeKind::Object(object) => Some(object),
            _ => None,
        }
    }

    /// The element type of a list or set
    pub fn element(&self) -> Option<&TypeDescriptor> {
        match self.kind() {
            TypeKind::List(element) | TypeKind::Set(element) => Some(element),
            _ => None,
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self.kind(), TypeKind::Scalar(_))
    }

    pub fn is_collection(&self) -> bool {
        matches!(self.kind(), TypeKind::List(_) | TypeKind::Set(_))
    }

    pub fn is_map(&self) -> bool {
        matches!(self.kind(), TypeKind::Map { .. })
    }

    /// Walk every type reachable from this one and report the first object
    /// type that reaches itself, as the path of type names around the cycle.
    pub fn find_cycle(&self) -> Option<Vec<String>> {
        let mut stack = Vec::new();
        let mut done = HashSet::new();
        find_cycle(self, &mut stack, &mut done)
    }
}

fn find_cycle(ty: &TypeDescriptor, stack: &mut Vec<String>, done: &mut HashSet<String>) -> Option<Vec<String>> {
    match ty.kind() {
        TypeKind::Scalar(_) => None,
        TypeKind::List(element) | TypeKind::Set(element) => find_cycle(element, stack, done),
        TypeKind::Map { key, value } => {
            find_cycle(key, stack, done).or_else(|| find_cycle(value, stack, done))
        }
        TypeKind::Object(object) => {
            if let Some(position) = stack.iter().position(|name| name == &object.name) {
                let mut path = stack[position..].to_vec();
                path.push(object.name.clone());
                return Some(path);
            }
            if done.contains(&object.name) {
                return None;
            }
            stack.push(object.name.clone());
            let found = object
                .member_types()
                .find_map(|member| find_cycle(&member, stack, done));
            stack.pop();
            done.insert(object.name.clone());
            found
        }
    }
}

impl PartialEq for TypeDescriptor {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
            || (self.inner.name == other.inner.name && self.inner.primitive == other.inner.primitive)
    }
}

impl Eq for TypeDescriptor {}

impl std::hash::Hash for TypeDescriptor {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.inner.name.hash(state);
        self.inner.primitive.hash(state);
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("name", &self.inner.name)
            .field("primitive", &self.inner.primitive)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner.name)
    }
}

/// A member type, resolved on first use so that types can refer to
/// themselves while being described
#[derive(Clone)]
pub enum TypeRef {
    Resolved(TypeDescriptor),
    Lazy(fn() -> TypeDescriptor),
}

impl TypeRef {
    pub fn of<T: Describe>() -> Self {
        TypeRef::Lazy(T::describe)
    }

    pub fn resolve(&self) -> TypeDescriptor {
        match self {
            TypeRef::Resolved(ty) => ty.clone(),
            TypeRef::Lazy(describe) => describe(),
        }
    }
}

impl From<TypeDescriptor> for TypeRef {
    fn from(value: TypeDescriptor) -> Self {
        TypeRef::Resolved(value)
    }
}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Resolved(ty) => write!(f, "{ty}"),
            TypeRef::Lazy(_) => f.write_str("<lazy>"),
        }
    }
}

/// A named, typed member of an object: a writable property or a constructor
/// parameter
#[derive(Debug, Clone)]
pub struct Member {
    name: String,
    ty: TypeRef,
    annotations: Annotations,
    writable: bool,
}

impl Member {
    pub fn new(name: impl Into<String>, ty: impl Into<TypeRef>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            annotations: Annotations::default(),
            writable: true,
        }
    }

    pub fn of<T: Describe>(name: impl Into<String>) -> Self {
        Self::new(name, TypeRef::of::<T>())
    }

    pub fn with_annotations(mut self, annotations: impl Into<Annotations>) -> Self {
        self.annotations = annotations.into();
        self
    }

    /// Bound only by mutating an existing nested value
    pub fn read_only(mut self) -> Self {
        self.writable = false;
        self
    }

    /// The member's own (Rust-side) name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> TypeDescriptor {
        self.ty.resolve()
    }

    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    pub fn is_writable(&self) -> bool {
        self.writable
    }
}

/// A constructor usable for value-object binding
#[derive(Debug, Clone, Default)]
pub struct Constructor {
    parameters: Vec<Member>,
    binding: bool,
}

impl Constructor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn param<T: Describe>(self, name: impl Into<String>) -> Self {
        self.parameter(Member::of::<T>(name))
    }

    pub fn parameter(mut self, parameter: Member) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Mark this as the constructor to bind with, even when others exist
    pub fn binding(mut self) -> Self {
        self.binding = true;
        self
    }

    pub fn parameters(&self) -> &[Member] {
        &self.parameters
    }

    pub fn is_binding(&self) -> bool {
        self.binding
    }
}

type DefaultInstance = Arc<dyn Fn() -> Result<BoundValue> + Send + Sync>;

/// A structured type bound either through a constructor or through its
/// writable properties
#[derive(Clone)]
pub struct ObjectType {
    name: String,
    constructors: Vec<Constructor>,
    properties: Vec<Member>,
    default_instance: Option<DefaultInstance>,
}

impl ObjectType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            constructors: Vec::new(),
            properties: Vec::new(),
            default_instance: None,
        }
    }

    /// Add a writable property
    pub fn property<T: Describe>(self, name: impl Into<String>) -> Self {
        self.member(Member::of::<T>(name))
    }

    pub fn member(mut self, property: Member) -> Self {
        self.properties.push(property);
        self
    }

    pub fn constructor(mut self, constructor: Constructor) -> Self {
        self.constructors.push(constructor);
        self
    }

    /// Bean binding starts from `T::default()`
    pub fn default_instance<T>(self) -> Self
    where
        T: Default + Serialize + Describe,
    {
        self.default_instance_with(|| BoundValue::from_serialize(&T::default(), &T::describe()))
    }

    /// Bean binding starts from an object with no fields set
    pub fn default_empty(self) -> Self {
        let name = self.name.clone();
        self.default_instance_with(move || Ok(BoundValue::empty_object(name.clone())))
    }

    pub fn default_instance_with<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Result<BoundValue> + Send + Sync + 'static,
    {
        self.default_instance = Some(Arc::new(factory));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn constructors(&self) -> &[Constructor] {
        &self.constructors
    }

    pub fn properties(&self) -> &[Member] {
        &self.properties
    }

    pub fn has_default_instance(&self) -> bool {
        self.default_instance.is_some()
    }

    pub fn create_default(&self) -> Option<Result<BoundValue>> {
        self.default_instance.as_ref().map(|factory| factory())
    }

    fn member_types(&self) -> impl Iterator<Item = TypeDescriptor> + '_ {
        self.properties
            .iter()
            .chain(self.constructors.iter().flat_map(|c| c.parameters.iter()))
            .map(Member::ty)
    }
}

impl fmt::Debug for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectType")
            .field("name", &self.name)
            .field("constructors", &self.constructors)
            .field("properties", &self.properties)
            .field("default_instance", &self.default_instance.is_some())
            .finish()
    }
}

impl From<ObjectType> for TypeDescriptor {
    fn from(value: ObjectType) -> Self {
        TypeDescriptor::object(value)
    }
}

macro_rules! describe_primitive {
    ($($ty:ty => $scalar:ident),* $(,)?) => {
        $(
            impl Describe for $ty {
                fn describe() -> TypeDescriptor {
                    TypeDescriptor::primitive(stringify!($ty), ScalarType::$scalar)
                }
            }
        )*
    };
}

describe_primitive! {
    bool => Bool,
    char => Char,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    isize => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    usize => U64,
    f32 => F32,
    f64 => F64,
}

impl Describe for String {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::scalar("String", ScalarType::String)
    }
}

impl Describe for Duration {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::scalar("Duration", ScalarType::Duration)
    }
}

impl Describe for DataSize {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::scalar("DataSize", ScalarType::DataSize)
    }
}

impl Describe for PathBuf {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::scalar("PathBuf", ScalarType::Path)
    }
}

impl<T: Describe> Describe for Option<T> {
    fn describe() -> TypeDescriptor {
        T::describe().boxed()
    }
}

impl<T: Describe> Describe for Box<T> {
    fn describe() -> TypeDescriptor {
        T::describe()
    }
}

impl<T: Describe> Describe for Vec<T> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::list(T::describe().boxed())
    }
}

impl<T: Describe> Describe for BTreeSet<T> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::set(T::describe().boxed())
    }
}

impl<T: Describe, S> Describe for HashSet<T, S> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::set(T::describe().boxed())
    }
}

impl<K: Describe, V: Describe> Describe for BTreeMap<K, V> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::map(K::describe().boxed(), V::describe().boxed())
    }
}

impl<K: Describe, V: Describe, S> Describe for HashMap<K, V, S> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::map(K::describe().boxed(), V::describe().boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Node;

    impl Describe for Node {
        fn describe() -> TypeDescriptor {
            ObjectType::new("Node")
                .property::<String>("name")
                .property::<Vec<Node>>("children")
                .default_empty()
                .into()
        }
    }

    struct Leaf;

    impl Describe for Leaf {
        fn describe() -> TypeDescriptor {
            ObjectType::new("Leaf")
                .constructor(Constructor::new().param::<u32>("size").param::<Option<String>>("label"))
                .into()
        }
    }

    #[test]
    fn test_scalar_descriptors() {
        assert!(u32::describe().is_primitive());
        assert!(!Option::<u32>::describe().is_primitive());
        assert_eq!(Option::<u32>::describe().name(), "u32");
        assert_eq!(Vec::<u32>::describe().name(), "Vec<u32>");
        assert_eq!(
            HashMap::<String, Duration>::describe().name(),
            "Map<String, Duration>"
        );
        assert_ne!(u32::describe(), Option::<u32>::describe());
        assert_eq!(u32::describe().boxed(), Option::<u32>::describe());
    }

    #[test]
    fn test_self_reference_is_a_cycle() {
        let cycle = Node::describe().find_cycle().unwrap();
        assert_eq!(cycle, vec!["Node".to_string(), "Node".to_string()]);
        assert!(Vec::<Node>::describe().find_cycle().is_some());
    }

    #[test]
    fn test_acyclic_types() {
        assert!(Leaf::describe().find_cycle().is_none());
        assert!(BTreeMap::<String, Leaf>::describe().find_cycle().is_none());
    }

    #[test]
    fn test_object_members() {
        let leaf = Leaf::describe();
        let object = leaf.as_object().unwrap();
        assert_eq!(object.constructors().len(), 1);
        let params = object.constructors()[0].parameters();
        assert_eq!(params[0].name(), "size");
        assert!(params[0].ty().is_primitive());
        assert!(!params[1].ty().is_primitive());
        assert!(!object.has_default_instance());
    }
}
