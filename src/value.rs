//! The dynamically-typed value tree both pipelines operate on.

use std::sync::Arc;

use chrono::{FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use uuid::Uuid;

use crate::ext::Ext;
use crate::integer::Integer;
use crate::ndarray::NdArray;
use crate::record::{EnumValue, ModelHandle, Record};

/// A value the encoder can classify, and the shape the decoder produces.
///
/// The variants up through `Ext` are the native MessagePack universe plus
/// the text-encoded types (dates, times, UUIDs). The remaining variants
/// are the adapted families and the classifier's escape hatches: a
/// `Subclass` wraps the primitive view of a derived type, and a `Foreign`
/// is a value only the caller's `default` hook can rescue.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(Integer),
    /// An integer outside the i64/u64 union. Fails to encode unless
    /// `PASSTHROUGH_BIG_INT` routes it to `default`.
    BigInt(i128),
    F32(f32),
    F64(f64),
    /// Shared text. The `Arc` lets the decoder's key-intern table hand out
    /// the same allocation for every repeat of a hot map key.
    Str(Arc<str>),
    Bin(Vec<u8>),
    Array(Vec<Value>),
    /// Encodes as an array unless `PASSTHROUGH_TUPLE` is set. Never valid
    /// as a map key.
    Tuple(Vec<Value>),
    Map(Map),
    Date(NaiveDate),
    Time(Time),
    DateTime(DateTime),
    Uuid(Uuid),
    Ext(Ext),
    Record(Record),
    Model(ModelHandle),
    Enum(Box<EnumValue>),
    NdArray(NdArray),
    Subclass(Box<Subclass>),
    Foreign(Foreign),
}

impl Value {
    /// Short name of the value's type, used in error messages.
    pub fn type_name(&self) -> &str {
        use self::Value::*;
        match self {
            Null => "NoneType",
            Bool(_) => "bool",
            Int(_) => "int",
            BigInt(_) => "int",
            F32(_) | F64(_) => "float",
            Str(_) => "str",
            Bin(_) => "bytes",
            Array(_) => "list",
            Tuple(_) => "tuple",
            Map(_) => "dict",
            Date(_) => "date",
            Time(_) => "time",
            DateTime(_) => "datetime",
            Uuid(_) => "UUID",
            Ext(_) => "Ext",
            Record(r) => r.name(),
            Model(m) => m.type_name(),
            Enum(e) => e.name(),
            NdArray(_) => "ndarray",
            Subclass(s) => &s.type_name,
            Foreign(f) => &f.type_name,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_bool(&self) -> bool {
        self.as_bool().is_some()
    }

    pub fn is_int(&self) -> bool {
        self.as_int().is_some()
    }

    pub fn is_str(&self) -> bool {
        self.as_str().is_some()
    }

    pub fn is_bin(&self) -> bool {
        self.as_slice().is_some()
    }

    pub fn is_array(&self) -> bool {
        self.as_array().is_some()
    }

    pub fn is_map(&self) -> bool {
        self.as_map().is_some()
    }

    pub fn as_bool(&self) -> Option<bool> {
        if let Value::Bool(val) = *self {
            Some(val)
        } else {
            None
        }
    }

    pub fn as_int(&self) -> Option<Integer> {
        if let Value::Int(val) = *self {
            Some(val)
        } else {
            None
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Int(ref n) => n.as_i64(),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            Value::Int(ref n) => n.as_u64(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Int(ref n) => Some(n.as_f64()),
            Value::F32(n) => Some(n as f64),
            Value::F64(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        if let Value::Str(ref val) = *self {
            Some(val.as_ref())
        } else {
            None
        }
    }

    pub fn as_slice(&self) -> Option<&[u8]> {
        if let Value::Bin(ref val) = *self {
            Some(val)
        } else {
            None
        }
    }

    pub fn as_array(&self) -> Option<&Vec<Value>> {
        if let Value::Array(ref array) = *self {
            Some(array)
        } else {
            None
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut Vec<Value>> {
        match *self {
            Value::Array(ref mut array) => Some(array),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Map> {
        if let Value::Map(ref map) = *self {
            Some(map)
        } else {
            None
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut Map> {
        match *self {
            Value::Map(ref mut map) => Some(map),
            _ => None,
        }
    }

    pub fn as_ext(&self) -> Option<&Ext> {
        if let Value::Ext(ref ext) = *self {
            Some(ext)
        } else {
            None
        }
    }

    pub fn as_uuid(&self) -> Option<Uuid> {
        if let Value::Uuid(id) = *self {
            Some(id)
        } else {
            None
        }
    }
}

/// A mapping that preserves insertion order and places no hashing demands
/// on its keys, so every decodable value is admissible as a key under
/// `NON_STR_KEYS`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Map(Vec<(Value, Value)>);

impl Map {
    pub fn new() -> Self {
        Map(Vec::new())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Map(Vec::with_capacity(capacity))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Append an entry. Duplicate keys are kept; the codec emits entries
    /// exactly as stored.
    pub fn insert(&mut self, key: impl Into<Value>, value: impl Into<Value>) {
        self.0.push((key.into(), value.into()));
    }

    /// First value stored under a string key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0
            .iter()
            .find(|(k, _)| k.as_str() == Some(key))
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, (Value, Value)> {
        self.0.iter()
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &Value> {
        self.0.iter().map(|(k, _)| k)
    }

    pub fn entries(&self) -> &[(Value, Value)] {
        &self.0
    }
}

impl From<Vec<(Value, Value)>> for Map {
    fn from(entries: Vec<(Value, Value)>) -> Self {
        Map(entries)
    }
}

impl FromIterator<(Value, Value)> for Map {
    fn from_iter<T: IntoIterator<Item = (Value, Value)>>(iter: T) -> Self {
        Map(iter.into_iter().collect())
    }
}

impl IntoIterator for Map {
    type Item = (Value, Value);
    type IntoIter = std::vec::IntoIter<(Value, Value)>;
    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// A wall-clock time, possibly carrying a UTC offset.
///
/// The wire format only has a text form for naive times; an offset-carrying
/// time fails to encode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Time {
    time: NaiveTime,
    offset: Option<FixedOffset>,
}

impl Time {
    pub fn naive(time: NaiveTime) -> Self {
        Self { time, offset: None }
    }

    pub fn aware(time: NaiveTime, offset: FixedOffset) -> Self {
        Self {
            time,
            offset: Some(offset),
        }
    }

    pub fn time(&self) -> NaiveTime {
        self.time
    }

    pub fn offset(&self) -> Option<FixedOffset> {
        self.offset
    }
}

/// A date-time, naive or carrying a fixed UTC offset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DateTime {
    Naive(NaiveDateTime),
    Aware(chrono::DateTime<FixedOffset>),
}

/// The primitive view of a value whose host type derives from a primitive.
///
/// The classifier encodes `base` directly unless `PASSTHROUGH_SUBCLASS` is
/// set; float- and tuple-based subclasses never take that shortcut and go
/// to `default` regardless.
#[derive(Clone, Debug, PartialEq)]
pub struct Subclass {
    /// Name of the derived type, for error messages.
    pub type_name: String,
    /// The underlying primitive value.
    pub base: Value,
}

/// A host value with no classification at all. Only the caller's `default`
/// hook can turn it into something encodable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Foreign {
    /// Name of the host type, reported in `UnsupportedType` errors.
    pub type_name: String,
}

impl Foreign {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<Integer> for Value {
    fn from(v: Integer) -> Self {
        Value::Int(v)
    }
}

macro_rules! impl_from_int {
    ($t: ty) => {
        impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::Int(Integer::from(v))
            }
        }
    };
}

impl_from_int!(u8);
impl_from_int!(u16);
impl_from_int!(u32);
impl_from_int!(u64);
impl_from_int!(usize);
impl_from_int!(i8);
impl_from_int!(i16);
impl_from_int!(i32);
impl_from_int!(i64);
impl_from_int!(isize);

/// Normalizes into `Int` when the value fits the wire range, `BigInt`
/// otherwise.
impl From<i128> for Value {
    fn from(v: i128) -> Self {
        match Integer::try_from(v) {
            Ok(n) => Value::Int(n),
            Err(v) => Value::BigInt(v),
        }
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::F32(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::F64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(Arc::from(v))
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(Arc::from(v))
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Array(v)
    }
}

impl From<Map> for Value {
    fn from(v: Map) -> Self {
        Value::Map(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<NaiveTime> for Value {
    fn from(v: NaiveTime) -> Self {
        Value::Time(Time::naive(v))
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::DateTime(DateTime::Naive(v))
    }
}

impl From<chrono::DateTime<FixedOffset>> for Value {
    fn from(v: chrono::DateTime<FixedOffset>) -> Self {
        Value::DateTime(DateTime::Aware(v))
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Uuid(v)
    }
}

impl From<Ext> for Value {
    fn from(v: Ext) -> Self {
        Value::Ext(v)
    }
}
