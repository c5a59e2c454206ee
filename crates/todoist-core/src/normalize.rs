//! Response normalization.
//!
//! Every tool returns whatever the upstream client produced, converted into a
//! JSON-safe [`Value`]. Conversion happens in two steps:
//!
//! 1. [`Introspect`] turns a Rust value into the [`Upstream`] tagged variant.
//!    Domain types describe themselves as a [`Record`] of named attributes
//!    through [`introspect_record!`](crate::introspect_record).
//! 2. [`normalize`] walks the variant top-down and emits JSON.
//!
//! Encoding rules:
//!
//! - calendar dates become `YYYY-MM-DD`
//! - offset-aware date-times become RFC 3339 with an explicit offset and as
//!   many fractional digits as the value carries
//! - offset-naive date-times keep no offset
//! - anything else that is not JSON-safe becomes its text representation
//!
//! The walk is bounded by [`MAX_DEPTH`]; deeper input fails with
//! [`Error::Normalization`] instead of overflowing the stack.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Display;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone};
use serde_json::{Map, Number, Value};

use crate::{Error, Result};

/// Maximum container nesting accepted by [`normalize`].
pub const MAX_DEPTH: usize = 64;

/// Format used for offset-naive date-times.
pub const NAIVE_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Format used for calendar dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A value as seen by the normalizer.
#[derive(Debug, Clone, PartialEq)]
pub enum Upstream {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    Sequence(Vec<Upstream>),
    /// Key-value pairs in insertion order.
    Mapping(Vec<(String, Upstream)>),
    Date(NaiveDate),
    DateTime(DateTime<FixedOffset>),
    NaiveDateTime(NaiveDateTime),
    Object(Record),
    /// Leaf with no JSON counterpart, already rendered as text.
    Opaque(String),
}

impl Upstream {
    /// Wrap a value with no JSON counterpart by its display form.
    pub fn opaque(value: impl Display) -> Self {
        Upstream::Opaque(value.to_string())
    }

    /// Binary payloads are kept as escaped text so no byte is lost.
    pub fn bytes(data: &[u8]) -> Self {
        Upstream::Opaque(data.escape_ascii().to_string())
    }
}

/// A structured object exposing named attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub type_name: &'static str,
    pub attributes: Vec<(&'static str, Upstream)>,
}

impl Record {
    pub fn new(type_name: &'static str) -> Self {
        Self {
            type_name,
            attributes: Vec::new(),
        }
    }

    /// Append an attribute.
    pub fn attr(mut self, name: &'static str, value: impl Introspect) -> Self {
        self.attributes.push((name, value.introspect()));
        self
    }
}

/// Conversion into the normalizer's view of a value.
pub trait Introspect {
    fn introspect(&self) -> Upstream;
}

/// Implement [`Introspect`] for a struct by listing its fields.
///
/// Every listed field becomes an attribute, in the order given.
#[macro_export]
macro_rules! introspect_record {
    ($ty:ident { $($field:ident),* $(,)? }) => {
        impl $crate::normalize::Introspect for $ty {
            fn introspect(&self) -> $crate::normalize::Upstream {
                $crate::normalize::Upstream::Object(
                    $crate::normalize::Record::new(stringify!($ty))
                        $(.attr(stringify!($field), &self.$field))*,
                )
            }
        }
    };
}

/// Normalize any introspectable value into JSON.
pub fn normalize<T: Introspect + ?Sized>(value: &T) -> Result<Value> {
    normalize_upstream(&value.introspect())
}

/// Normalize an already introspected value.
pub fn normalize_upstream(value: &Upstream) -> Result<Value> {
    normalize_at(value, 0)
}

fn normalize_at(value: &Upstream, depth: usize) -> Result<Value> {
    if depth > MAX_DEPTH {
        return Err(Error::Normalization(format!(
            "value nesting exceeds {} levels",
            MAX_DEPTH
        )));
    }

    let normalized = match value {
        Upstream::Null => Value::Null,
        Upstream::Bool(b) => Value::Bool(*b),
        Upstream::Int(i) => Value::from(*i),
        Upstream::UInt(u) => Value::from(*u),
        Upstream::Float(f) => match Number::from_f64(*f) {
            Some(n) => Value::Number(n),
            // NaN and infinities
            None => Value::String(f.to_string()),
        },
        Upstream::Text(s) => Value::String(s.clone()),
        Upstream::Sequence(items) => Value::Array(
            items
                .iter()
                .map(|item| normalize_at(item, depth + 1))
                .collect::<Result<Vec<_>>>()?,
        ),
        Upstream::Mapping(entries) => {
            let mut map = Map::new();
            for (key, item) in entries {
                map.insert(key.clone(), normalize_at(item, depth + 1)?);
            }
            Value::Object(map)
        }
        Upstream::Date(date) => Value::String(date.format(DATE_FORMAT).to_string()),
        Upstream::DateTime(dt) => Value::String(dt.to_rfc3339_opts(SecondsFormat::AutoSi, false)),
        Upstream::NaiveDateTime(dt) => {
            Value::String(dt.format(NAIVE_DATETIME_FORMAT).to_string())
        }
        Upstream::Object(record) => {
            let mut map = Map::new();
            for (name, item) in &record.attributes {
                map.insert((*name).to_string(), normalize_at(item, depth + 1)?);
            }
            Value::Object(map)
        }
        Upstream::Opaque(text) => Value::String(text.clone()),
    };

    Ok(normalized)
}

// =============================================================================
// Introspect implementations
// =============================================================================

impl Introspect for Upstream {
    fn introspect(&self) -> Upstream {
        self.clone()
    }
}

impl Introspect for () {
    fn introspect(&self) -> Upstream {
        Upstream::Null
    }
}

impl Introspect for bool {
    fn introspect(&self) -> Upstream {
        Upstream::Bool(*self)
    }
}

macro_rules! introspect_signed {
    ($($ty:ty),*) => {
        $(impl Introspect for $ty {
            fn introspect(&self) -> Upstream {
                Upstream::Int(i64::from(*self))
            }
        })*
    };
}

macro_rules! introspect_unsigned {
    ($($ty:ty),*) => {
        $(impl Introspect for $ty {
            fn introspect(&self) -> Upstream {
                Upstream::UInt(u64::from(*self))
            }
        })*
    };
}

introspect_signed!(i8, i16, i32, i64);
introspect_unsigned!(u8, u16, u32, u64);

impl Introspect for isize {
    fn introspect(&self) -> Upstream {
        Upstream::Int(*self as i64)
    }
}

impl Introspect for usize {
    fn introspect(&self) -> Upstream {
        Upstream::UInt(*self as u64)
    }
}

impl Introspect for f32 {
    fn introspect(&self) -> Upstream {
        Upstream::Float(f64::from(*self))
    }
}

impl Introspect for f64 {
    fn introspect(&self) -> Upstream {
        Upstream::Float(*self)
    }
}

impl Introspect for str {
    fn introspect(&self) -> Upstream {
        Upstream::Text(self.to_string())
    }
}

impl Introspect for String {
    fn introspect(&self) -> Upstream {
        Upstream::Text(self.clone())
    }
}

impl<T: Introspect + ?Sized> Introspect for &T {
    fn introspect(&self) -> Upstream {
        (**self).introspect()
    }
}

impl<T: Introspect + ?Sized> Introspect for Box<T> {
    fn introspect(&self) -> Upstream {
        (**self).introspect()
    }
}

impl<T: Introspect> Introspect for Option<T> {
    fn introspect(&self) -> Upstream {
        match self {
            Some(value) => value.introspect(),
            None => Upstream::Null,
        }
    }
}

impl<T: Introspect> Introspect for [T] {
    fn introspect(&self) -> Upstream {
        Upstream::Sequence(self.iter().map(Introspect::introspect).collect())
    }
}

impl<T: Introspect> Introspect for Vec<T> {
    fn introspect(&self) -> Upstream {
        self.as_slice().introspect()
    }
}

impl<K: Display, V: Introspect> Introspect for BTreeMap<K, V> {
    fn introspect(&self) -> Upstream {
        Upstream::Mapping(
            self.iter()
                .map(|(k, v)| (k.to_string(), v.introspect()))
                .collect(),
        )
    }
}

impl<K: Display, V: Introspect, S> Introspect for HashMap<K, V, S> {
    /// Hash maps have no stable order; keys are sorted to keep output deterministic.
    fn introspect(&self) -> Upstream {
        let mut entries: Vec<(String, Upstream)> = self
            .iter()
            .map(|(k, v)| (k.to_string(), v.introspect()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Upstream::Mapping(entries)
    }
}

impl Introspect for Value {
    fn introspect(&self) -> Upstream {
        value_at(self, 0)
    }
}

impl Introspect for Map<String, Value> {
    fn introspect(&self) -> Upstream {
        map_at(self, 0)
    }
}

/// Convert a JSON value, cutting it off past [`MAX_DEPTH`].
///
/// A cut node becomes a null leaf that still lies past the bound, so
/// normalizing the result fails instead of silently truncating.
fn value_at(value: &Value, depth: usize) -> Upstream {
    if depth > MAX_DEPTH {
        return Upstream::Null;
    }
    match value {
        Value::Null => Upstream::Null,
        Value::Bool(b) => Upstream::Bool(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Upstream::Int(i)
            } else if let Some(u) = n.as_u64() {
                Upstream::UInt(u)
            } else {
                n.as_f64()
                    .map(Upstream::Float)
                    .unwrap_or_else(|| Upstream::opaque(n))
            }
        }
        Value::String(s) => Upstream::Text(s.clone()),
        Value::Array(items) => {
            Upstream::Sequence(items.iter().map(|v| value_at(v, depth + 1)).collect())
        }
        Value::Object(map) => map_at(map, depth),
    }
}

fn map_at(map: &Map<String, Value>, depth: usize) -> Upstream {
    Upstream::Mapping(
        map.iter()
            .map(|(k, v)| (k.clone(), value_at(v, depth + 1)))
            .collect(),
    )
}

impl Introspect for NaiveDate {
    fn introspect(&self) -> Upstream {
        Upstream::Date(*self)
    }
}

impl Introspect for NaiveDateTime {
    fn introspect(&self) -> Upstream {
        Upstream::NaiveDateTime(*self)
    }
}

impl<Tz: TimeZone> Introspect for DateTime<Tz> {
    fn introspect(&self) -> Upstream {
        Upstream::DateTime(self.fixed_offset())
    }
}
