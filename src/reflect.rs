//! # Reflection Module
//!
//! Static field introspection backing the [`copier`](crate::copier) and the
//! [`validator`](crate::validator).
//!
//! ## Overview
//!
//! Instead of walking types at runtime, `#[derive(Reflect)]` generates a
//! [`StructInfo`] listing every field of a struct in declaration order. Each
//! [`FieldInfo`] carries the field name, whether it is exported (`pub`), its
//! type identity and [`Kind`], an optional validation tag, an optional embedded
//! struct descriptor, and type-erased accessors.
//!
//! ```rust
//! use puzzle::Reflect;
//! use puzzle::reflect::{Kind, Reflect as _};
//!
//! #[derive(Debug, Clone, Default, Reflect)]
//! pub struct User {
//!     #[puzzle(check = "min=1")]
//!     pub id: u64,
//!     pub name: String,
//!     secret: Option<String>,
//! }
//!
//! let info = User::struct_info();
//! assert_eq!(info.fields().len(), 3);
//! assert_eq!(info.field("id").map(|f| f.kind()), Some(Kind::Uint));
//! assert!(!info.field("secret").map(|f| f.is_exported()).unwrap_or(true));
//! ```
//!
//! ## Field attributes
//!
//! - `#[puzzle(check = "...")]` - comma separated validation rules
//! - `#[puzzle(embed)]` - the field type derives `Reflect` and its fields are
//!   promoted for copy matching
//! - `#[puzzle(opaque)]` - the field type does not implement [`Field`]; it can
//!   only be copied by assignment and reports [`Kind::Other`]
//! - `#[puzzle(skip)]` - left out of the descriptor
//!
//! Deriving requires the struct to be `Clone`, since derived structs are
//! themselves usable as field values.

use serde::Serialize;
use std::any::{type_name, Any, TypeId};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::Hash;

/// Coarse classification of a field type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Bool,
    Int,
    Uint,
    Float,
    String,
    Bytes,
    Slice,
    Map,
    Option,
    Pointer,
    Struct,
    Other,
}

impl Kind {
    pub fn is_numeric(self) -> bool {
        matches!(self, Kind::Int | Kind::Uint | Kind::Float)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Kind::Bool => "bool",
            Kind::Int => "int",
            Kind::Uint => "uint",
            Kind::Float => "float",
            Kind::String => "string",
            Kind::Bytes => "bytes",
            Kind::Slice => "slice",
            Kind::Map => "map",
            Kind::Option => "option",
            Kind::Pointer => "pointer",
            Kind::Struct => "struct",
            Kind::Other => "other",
        }
    }

    /// Whether a value of kind `self` can be converted into kind `to`.
    ///
    /// Numeric kinds convert among themselves with `as` semantics, strings and
    /// byte vectors convert into each other. Identical types never need this.
    pub fn converts_to(self, to: Kind) -> bool {
        (self.is_numeric() && to.is_numeric())
            || matches!(
                (self, to),
                (Kind::String, Kind::Bytes) | (Kind::Bytes, Kind::String)
            )
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Borrowed view of a field's current value.
///
/// `Option` fields are transparent: `None` reads as [`Value::Nil`] and `Some`
/// reads as the inner value. Collections expose only their length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value<'a> {
    Nil,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    Str(&'a str),
    Bytes(&'a [u8]),
    Seq(usize),
    Map(usize),
    Struct(&'static str),
    Opaque(&'static str),
}

impl fmt::Display for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => f.write_str("<nil>"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Uint(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Str(v) => f.write_str(v),
            Value::Bytes(v) => write!(f, "{v:?}"),
            Value::Seq(len) => write!(f, "[len={len}]"),
            Value::Map(len) => write!(f, "map[len={len}]"),
            Value::Struct(name) => write!(f, "{{{name}}}"),
            Value::Opaque(name) => f.write_str(name),
        }
    }
}

/// A type usable as a reflected field value.
pub trait Field: Any + Clone {
    fn kind() -> Kind;

    fn value(&self) -> Value<'_>;

    /// Builds a value of this type from a value of a convertible kind.
    fn from_value(_value: &Value<'_>) -> Option<Self> {
        None
    }
}

/// A struct with a derived field descriptor.
pub trait Reflect: Any + Sized {
    fn struct_info() -> StructInfo;
}

/// Type-erased field accessors generated by the derive.
pub type Getter = for<'a> fn(&'a dyn Any) -> Option<&'a dyn Any>;
pub type GetterMut = for<'a> fn(&'a mut dyn Any) -> Option<&'a mut dyn Any>;

pub(crate) type AssignFn = fn(&mut dyn Any, &dyn Any) -> bool;
pub(crate) type ReadFn = for<'a> fn(&'a dyn Any) -> Option<Value<'a>>;
pub(crate) type WriteFn = fn(&mut dyn Any, &Value<'_>) -> bool;

#[derive(Clone, Copy)]
pub(crate) struct Reader {
    pub(crate) get: Getter,
    pub(crate) read: ReadFn,
}

#[derive(Clone, Copy)]
pub(crate) struct Writer {
    pub(crate) get_mut: GetterMut,
    pub(crate) assign: AssignFn,
    pub(crate) write: WriteFn,
}

fn read_field<T: Field>(field: &dyn Any) -> Option<Value<'_>> {
    field.downcast_ref::<T>().map(T::value)
}

fn read_opaque<T: Any>(field: &dyn Any) -> Option<Value<'_>> {
    field
        .downcast_ref::<T>()
        .map(|_| Value::Opaque(type_name::<T>()))
}

fn assign_field<T: Any + Clone>(dest: &mut dyn Any, src: &dyn Any) -> bool {
    match (dest.downcast_mut::<T>(), src.downcast_ref::<T>()) {
        (Some(dest), Some(src)) => {
            dest.clone_from(src);
            true
        }
        _ => false,
    }
}

fn write_field<T: Field>(dest: &mut dyn Any, value: &Value<'_>) -> bool {
    match (dest.downcast_mut::<T>(), T::from_value(value)) {
        (Some(dest), Some(converted)) => {
            *dest = converted;
            true
        }
        _ => false,
    }
}

fn write_never(_dest: &mut dyn Any, _value: &Value<'_>) -> bool {
    false
}

/// Descriptor of one struct field.
#[derive(Clone)]
pub struct FieldInfo {
    name: &'static str,
    type_id: TypeId,
    type_name: &'static str,
    kind: Kind,
    check: Option<&'static str>,
    embedded: Option<fn() -> StructInfo>,
    reader: Reader,
    writer: Option<Writer>,
}

impl FieldInfo {
    fn base<T: Any>(name: &'static str, kind: Kind, reader: Reader) -> Self {
        Self {
            name,
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            kind,
            check: None,
            embedded: None,
            reader,
            writer: None,
        }
    }

    #[doc(hidden)]
    pub fn exported<T: Field>(name: &'static str, get: Getter, get_mut: GetterMut) -> Self {
        let mut info = Self::base::<T>(
            name,
            T::kind(),
            Reader {
                get,
                read: read_field::<T>,
            },
        );
        info.writer = Some(Writer {
            get_mut,
            assign: assign_field::<T>,
            write: write_field::<T>,
        });
        info
    }

    #[doc(hidden)]
    pub fn exported_opaque<T: Any + Clone>(
        name: &'static str,
        get: Getter,
        get_mut: GetterMut,
    ) -> Self {
        let mut info = Self::base::<T>(
            name,
            Kind::Other,
            Reader {
                get,
                read: read_opaque::<T>,
            },
        );
        info.writer = Some(Writer {
            get_mut,
            assign: assign_field::<T>,
            write: write_never,
        });
        info
    }

    #[doc(hidden)]
    pub fn unexported<T: Field>(name: &'static str, get: Getter) -> Self {
        Self::base::<T>(
            name,
            T::kind(),
            Reader {
                get,
                read: read_field::<T>,
            },
        )
    }

    #[doc(hidden)]
    pub fn unexported_opaque<T: Any>(name: &'static str, get: Getter) -> Self {
        Self::base::<T>(
            name,
            Kind::Other,
            Reader {
                get,
                read: read_opaque::<T>,
            },
        )
    }

    #[doc(hidden)]
    pub fn check(mut self, tag: &'static str) -> Self {
        self.check = Some(tag);
        self
    }

    #[doc(hidden)]
    pub fn embed(mut self, info: fn() -> StructInfo) -> Self {
        self.embedded = Some(info);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Exported fields are the only ones the copier ever writes.
    pub fn is_exported(&self) -> bool {
        self.writer.is_some()
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    /// Raw validation tag, e.g. `"min=1,max=1000,request"`.
    pub fn check_tag(&self) -> Option<&'static str> {
        self.check
    }

    pub fn is_embedded(&self) -> bool {
        self.embedded.is_some()
    }

    /// Descriptor of the embedded struct, if the field is marked `embed`.
    pub fn embedded(&self) -> Option<StructInfo> {
        self.embedded.map(|info| info())
    }

    /// Reads this field from `owner`, which must be the struct the field belongs to.
    pub fn value<'a>(&self, owner: &'a dyn Any) -> Option<Value<'a>> {
        (self.reader.get)(owner).and_then(self.reader.read)
    }

    pub(crate) fn reader(&self) -> Reader {
        self.reader
    }

    pub(crate) fn writer(&self) -> Option<Writer> {
        self.writer
    }
}

impl fmt::Debug for FieldInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldInfo")
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .field("kind", &self.kind)
            .field("exported", &self.is_exported())
            .field("embedded", &self.is_embedded())
            .field("check", &self.check)
            .finish()
    }
}

/// Descriptor of a struct: its identity and fields in declaration order.
#[derive(Debug, Clone)]
pub struct StructInfo {
    name: &'static str,
    type_id: TypeId,
    fields: Vec<FieldInfo>,
}

impl StructInfo {
    pub fn new<T: Any>(name: &'static str, fields: Vec<FieldInfo>) -> Self {
        Self {
            name,
            type_id: TypeId::of::<T>(),
            fields,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn fields(&self) -> &[FieldInfo] {
        &self.fields
    }

    /// Direct (non-promoted) field lookup by name.
    pub fn field(&self, name: &str) -> Option<&FieldInfo> {
        self.fields.iter().find(|f| f.name == name)
    }
}

macro_rules! numeric_from_value {
    ($t:ty) => {
        fn from_value(value: &Value<'_>) -> Option<Self> {
            match value {
                Value::Int(v) => Some(*v as $t),
                Value::Uint(v) => Some(*v as $t),
                Value::Float(v) => Some(*v as $t),
                _ => None,
            }
        }
    };
}

macro_rules! impl_field_signed {
    ($($t:ty),*) => {$(
        impl Field for $t {
            fn kind() -> Kind {
                Kind::Int
            }

            fn value(&self) -> Value<'_> {
                Value::Int(*self as i64)
            }

            numeric_from_value!($t);
        }
    )*};
}

macro_rules! impl_field_unsigned {
    ($($t:ty),*) => {$(
        impl Field for $t {
            fn kind() -> Kind {
                Kind::Uint
            }

            fn value(&self) -> Value<'_> {
                Value::Uint(*self as u64)
            }

            numeric_from_value!($t);
        }
    )*};
}

macro_rules! impl_field_float {
    ($($t:ty),*) => {$(
        impl Field for $t {
            fn kind() -> Kind {
                Kind::Float
            }

            fn value(&self) -> Value<'_> {
                Value::Float(*self as f64)
            }

            numeric_from_value!($t);
        }
    )*};
}

impl_field_signed!(i8, i16, i32, i64, isize);
impl_field_unsigned!(u8, u16, u32, u64, usize);
impl_field_float!(f32, f64);

impl Field for bool {
    fn kind() -> Kind {
        Kind::Bool
    }

    fn value(&self) -> Value<'_> {
        Value::Bool(*self)
    }

    fn from_value(value: &Value<'_>) -> Option<Self> {
        match value {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

impl Field for String {
    fn kind() -> Kind {
        Kind::String
    }

    fn value(&self) -> Value<'_> {
        Value::Str(self)
    }

    fn from_value(value: &Value<'_>) -> Option<Self> {
        match value {
            Value::Str(v) => Some((*v).to_string()),
            Value::Bytes(v) => Some(String::from_utf8_lossy(v).into_owned()),
            _ => None,
        }
    }
}

impl<T: Field> Field for Vec<T> {
    fn kind() -> Kind {
        if TypeId::of::<T>() == TypeId::of::<u8>() {
            Kind::Bytes
        } else {
            Kind::Slice
        }
    }

    fn value(&self) -> Value<'_> {
        match (self as &dyn Any).downcast_ref::<Vec<u8>>() {
            Some(bytes) => Value::Bytes(bytes),
            None => Value::Seq(self.len()),
        }
    }

    fn from_value(value: &Value<'_>) -> Option<Self> {
        let bytes = match value {
            Value::Bytes(v) => v.to_vec(),
            Value::Str(v) => v.as_bytes().to_vec(),
            _ => return None,
        };
        // Only succeeds when T is u8.
        (Box::new(bytes) as Box<dyn Any>)
            .downcast::<Self>()
            .ok()
            .map(|v| *v)
    }
}

impl<T: Field> Field for Option<T> {
    fn kind() -> Kind {
        Kind::Option
    }

    fn value(&self) -> Value<'_> {
        match self {
            Some(inner) => inner.value(),
            None => Value::Nil,
        }
    }

    fn from_value(value: &Value<'_>) -> Option<Self> {
        match value {
            Value::Nil => Some(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: Field> Field for Box<T> {
    fn kind() -> Kind {
        Kind::Pointer
    }

    fn value(&self) -> Value<'_> {
        self.as_ref().value()
    }

    fn from_value(value: &Value<'_>) -> Option<Self> {
        T::from_value(value).map(Box::new)
    }
}

impl<K, V> Field for HashMap<K, V>
where
    K: Any + Clone + Eq + Hash,
    V: Any + Clone,
{
    fn kind() -> Kind {
        Kind::Map
    }

    fn value(&self) -> Value<'_> {
        Value::Map(self.len())
    }
}

impl<K, V> Field for BTreeMap<K, V>
where
    K: Any + Clone + Ord,
    V: Any + Clone,
{
    fn kind() -> Kind {
        Kind::Map
    }

    fn value(&self) -> Value<'_> {
        Value::Map(self.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Reflect;

    #[derive(Debug, Clone, Default, Reflect)]
    struct Inner {
        pub code: i32,
    }

    #[derive(Debug, Clone, Default, Reflect)]
    struct Outer {
        #[puzzle(embed)]
        pub inner: Inner,
        #[puzzle(check = "min=1,request")]
        pub id: u32,
        pub(crate) hidden: String,
        #[puzzle(skip)]
        pub ignored: u8,
        #[allow(dead_code)]
        private: Option<bool>,
    }

    #[test]
    fn test_struct_info_lists_fields_in_declaration_order() {
        let info = Outer::struct_info();
        let names: Vec<_> = info.fields().iter().map(|f| f.name()).collect();
        assert_eq!(names, vec!["inner", "id", "hidden", "private"]);
        assert_eq!(info.name(), "Outer");
        assert_eq!(info.type_id(), TypeId::of::<Outer>());
    }

    #[test]
    fn test_visibility_and_attributes() {
        let info = Outer::struct_info();
        let inner = info.field("inner").unwrap();
        assert!(inner.is_exported());
        assert!(inner.is_embedded());
        assert_eq!(inner.kind(), Kind::Struct);
        assert_eq!(inner.embedded().unwrap().name(), "Inner");

        let id = info.field("id").unwrap();
        assert_eq!(id.check_tag(), Some("min=1,request"));
        assert_eq!(id.kind(), Kind::Uint);

        assert!(!info.field("hidden").unwrap().is_exported());
        assert!(!info.field("private").unwrap().is_exported());
        assert_eq!(info.field("private").unwrap().kind(), Kind::Option);
        assert!(info.field("ignored").is_none());
    }

    #[test]
    fn test_field_value_reads_through_erased_owner() {
        let outer = Outer {
            id: 7,
            hidden: "h".to_string(),
            ..Default::default()
        };
        let info = Outer::struct_info();
        assert_eq!(info.field("id").unwrap().value(&outer), Some(Value::Uint(7)));
        assert_eq!(
            info.field("hidden").unwrap().value(&outer),
            Some(Value::Str("h"))
        );
        assert_eq!(info.field("private").unwrap().value(&outer), Some(Value::Nil));
        // wrong owner type
        assert_eq!(info.field("id").unwrap().value(&5u8), None);
    }

    #[test]
    fn test_vec_kinds() {
        assert_eq!(<Vec<u8> as Field>::kind(), Kind::Bytes);
        assert_eq!(<Vec<u32> as Field>::kind(), Kind::Slice);
        assert_eq!(vec![1u8, 2].value(), Value::Bytes(&[1, 2]));
        assert_eq!(vec![1u32, 2, 3].value(), Value::Seq(3));
        assert_eq!(
            <Vec<u8> as Field>::from_value(&Value::Str("ab")),
            Some(b"ab".to_vec())
        );
        assert_eq!(<Vec<u32> as Field>::from_value(&Value::Str("ab")), None);
    }

    #[test]
    fn test_numeric_conversion_uses_as_semantics() {
        assert_eq!(<f64 as Field>::from_value(&Value::Int(3)), Some(3.0));
        assert_eq!(<u8 as Field>::from_value(&Value::Int(300)), Some(44));
        assert_eq!(<i32 as Field>::from_value(&Value::Float(2.9)), Some(2));
        assert_eq!(<i32 as Field>::from_value(&Value::Str("1")), None);
    }

    #[test]
    fn test_converts_to() {
        assert!(Kind::Int.converts_to(Kind::Float));
        assert!(Kind::Uint.converts_to(Kind::Int));
        assert!(Kind::String.converts_to(Kind::Bytes));
        assert!(Kind::Bytes.converts_to(Kind::String));
        assert!(!Kind::Int.converts_to(Kind::String));
        assert!(!Kind::Bool.converts_to(Kind::Int));
        assert!(!Kind::Struct.converts_to(Kind::Struct));
    }

    #[test]
    fn test_value_display() {
        assert_eq!(Value::Nil.to_string(), "<nil>");
        assert_eq!(Value::Int(-4).to_string(), "-4");
        assert_eq!(Value::Str("x").to_string(), "x");
        assert_eq!(Value::Seq(2).to_string(), "[len=2]");
        assert_eq!(Value::Struct("Inner").to_string(), "{Inner}");
    }
}
