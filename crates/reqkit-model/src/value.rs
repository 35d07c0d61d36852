//! Request parameter value type and the parameter store.
//!
//! [`ParamValue`] is a closed tagged union covering every value that can reach
//! the parameter store: strings from query strings and form fields, native
//! JSON scalars and composites from JSON bodies, and the explicit absent
//! marker produced by scanning an empty value list.
//!
//! The `to_*` methods implement the coercion rules used by typed accessors.
//! They return `None` only for [`ParamValue::Absent`]; every other kind
//! coerces to a value, falling back to the zero value of the target type when
//! the stored kind does not convert.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Number;

/// Nested object value. Keys are kept sorted so rendering is deterministic.
pub type ParamMap = BTreeMap<String, ParamValue>;

/// A single value in the parameter store.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ParamValue {
    /// Plain string, as received or as left by value identification.
    String(String),
    /// JSON number (integer or float).
    Number(Number),
    /// JSON boolean.
    Bool(bool),
    /// Ordered list of values.
    List(Vec<ParamValue>),
    /// Nested object.
    Map(ParamMap),
    /// No value: an empty value list or a JSON `null`.
    #[default]
    Absent,
}

impl ParamValue {
    /// Returns `true` for the absent marker.
    #[must_use]
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Returns `true` if this is a list value.
    #[must_use]
    pub fn is_list(&self) -> bool {
        matches!(self, Self::List(_))
    }

    /// Returns `true` if this is a map value.
    #[must_use]
    pub fn is_map(&self) -> bool {
        matches!(self, Self::Map(_))
    }

    /// Returns the string if this is a `String` variant.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the items if this is a `List` variant.
    #[must_use]
    pub fn as_list(&self) -> Option<&[ParamValue]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the entries if this is a `Map` variant.
    #[must_use]
    pub fn as_map(&self) -> Option<&ParamMap> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Short name of the stored kind, used in log fields.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Number(_) => "number",
            Self::Bool(_) => "bool",
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::Absent => "absent",
        }
    }

    /// Whether the value counts as filled: non-blank strings, non-empty
    /// lists, and any number, boolean or map. Absent values never do.
    #[must_use]
    pub fn is_filled(&self) -> bool {
        match self {
            Self::String(s) => !s.trim().is_empty(),
            Self::List(items) => !items.is_empty(),
            Self::Number(_) | Self::Bool(_) | Self::Map(_) => true,
            Self::Absent => false,
        }
    }

    /// Coerce to a signed integer.
    ///
    /// Numbers truncate toward zero, strings parse as base-10 (0 on failure),
    /// booleans map to 1/0, composites yield 0.
    #[must_use]
    pub fn to_i64(&self) -> Option<i64> {
        match self {
            Self::Number(n) => Some(number_to_i64(n)),
            Self::String(s) => Some(s.parse().unwrap_or(0)),
            Self::Bool(b) => Some(i64::from(*b)),
            Self::List(_) | Self::Map(_) => Some(0),
            Self::Absent => None,
        }
    }

    /// Coerce to an unsigned integer. Negative numbers saturate to 0.
    #[must_use]
    pub fn to_u64(&self) -> Option<u64> {
        match self {
            Self::Number(n) => Some(number_to_u64(n)),
            Self::String(s) => Some(s.parse().unwrap_or(0)),
            Self::Bool(b) => Some(u64::from(*b)),
            Self::List(_) | Self::Map(_) => Some(0),
            Self::Absent => None,
        }
    }

    /// Coerce to a float.
    #[must_use]
    pub fn to_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(n.as_f64().unwrap_or(0.0)),
            Self::String(s) => Some(s.parse().unwrap_or(0.0)),
            Self::Bool(b) => Some(f64::from(u8::from(*b))),
            Self::List(_) | Self::Map(_) => Some(0.0),
            Self::Absent => None,
        }
    }

    /// Coerce to a boolean.
    ///
    /// Numbers are `true` when `> 0`. Strings are parsed as floats and
    /// compared the same way, so `"1"` is `true` and `"true"` is `false`.
    #[must_use]
    pub fn to_bool(&self) -> Option<bool> {
        match self {
            Self::Number(n) => Some(n.as_f64().is_some_and(|v| v > 0.0)),
            Self::String(s) => Some(s.parse::<f64>().is_ok_and(|v| v > 0.0)),
            Self::Bool(b) => Some(*b),
            Self::List(_) | Self::Map(_) => Some(false),
            Self::Absent => None,
        }
    }

    /// Render as text.
    ///
    /// Booleans are not stringified and yield `None`, like absent values.
    /// Lists and maps render as compact JSON.
    #[must_use]
    pub fn to_text(&self) -> Option<String> {
        match self {
            Self::String(s) => Some(s.clone()),
            Self::Number(n) => Some(n.to_string()),
            Self::List(_) | Self::Map(_) => Some(self.to_string()),
            Self::Bool(_) | Self::Absent => None,
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn number_to_i64(n: &Number) -> i64 {
    if let Some(v) = n.as_i64() {
        return v;
    }
    // Floats and u64 values above i64::MAX; `as` truncates and saturates.
    n.as_f64().map_or(0, |f| f as i64)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn number_to_u64(n: &Number) -> u64 {
    if let Some(v) = n.as_u64() {
        return v;
    }
    n.as_f64().map_or(0, |f| f as u64)
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{n}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::List(_) | Self::Map(_) => {
                let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
                f.write_str(&json)
            }
            Self::Absent => Ok(()),
        }
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<bool> for ParamValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        Self::Number(Number::from(v))
    }
}

impl From<u64> for ParamValue {
    fn from(v: u64) -> Self {
        Self::Number(Number::from(v))
    }
}

impl From<Vec<ParamValue>> for ParamValue {
    fn from(items: Vec<ParamValue>) -> Self {
        Self::List(items)
    }
}

impl Serialize for ParamValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::String(s) => serializer.serialize_str(s),
            Self::Number(n) => n.serialize(serializer),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::List(items) => serializer.collect_seq(items),
            Self::Map(m) => serializer.collect_map(m),
            Self::Absent => serializer.serialize_unit(),
        }
    }
}

impl<'de> Deserialize<'de> for ParamValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ParamValueVisitor)
    }
}

struct ParamValueVisitor;

impl<'de> Visitor<'de> for ParamValueVisitor {
    type Value = ParamValue;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("any JSON value")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
        Ok(ParamValue::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(ParamValue::Number(Number::from(v)))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(ParamValue::Number(Number::from(v)))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        Ok(Number::from_f64(v).map_or(ParamValue::Absent, ParamValue::Number))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok(ParamValue::String(v.to_owned()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
        Ok(ParamValue::String(v))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(ParamValue::Absent)
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(ParamValue::Absent)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        ParamValue::deserialize(deserializer)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(ParamValue::List(items))
    }

    fn visit_map<M: MapAccess<'de>>(self, mut map: M) -> Result<Self::Value, M::Error> {
        let mut entries = ParamMap::new();
        while let Some((key, value)) = map.next_entry::<String, ParamValue>()? {
            entries.insert(key, value);
        }
        Ok(ParamValue::Map(entries))
    }
}

/// The unified request parameter store.
///
/// Keys are unique; inserting an existing key replaces its value. Deserializes
/// from a JSON object, which is how JSON request bodies enter the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamStore {
    inner: HashMap<String, ParamValue>,
}

impl ParamStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a value by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.inner.get(key)
    }

    /// Insert a value, returning the value it replaced.
    pub fn insert(&mut self, key: impl Into<String>, value: ParamValue) -> Option<ParamValue> {
        self.inner.insert(key.into(), value)
    }

    /// Whether the key is present, whatever its value.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    /// Number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether the store has no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Iterate over all entries in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.inner.iter()
    }
}

impl Extend<(String, ParamValue)> for ParamStore {
    fn extend<I: IntoIterator<Item = (String, ParamValue)>>(&mut self, iter: I) {
        self.inner.extend(iter);
    }
}

impl FromIterator<(String, ParamValue)> for ParamStore {
    fn from_iter<I: IntoIterator<Item = (String, ParamValue)>>(iter: I) -> Self {
        Self {
            inner: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for ParamStore {
    type Item = (String, ParamValue);
    type IntoIter = std::collections::hash_map::IntoIter<String, ParamValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(json: &str) -> ParamValue {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_should_truncate_numbers_toward_zero() {
        assert_eq!(num("3.9").to_i64(), Some(3));
        assert_eq!(num("-3.9").to_i64(), Some(-3));
        assert_eq!(num("-3.9").to_u64(), Some(0));
        assert_eq!(num("42").to_u64(), Some(42));
    }

    #[test]
    fn test_should_parse_strings_as_base10_or_fall_back_to_zero() {
        assert_eq!(ParamValue::from("30").to_i64(), Some(30));
        assert_eq!(ParamValue::from("3.5").to_i64(), Some(0));
        assert_eq!(ParamValue::from("abc").to_i64(), Some(0));
        assert_eq!(ParamValue::from("-4").to_u64(), Some(0));
        assert_eq!(ParamValue::from("2.5").to_f64(), Some(2.5));
        assert_eq!(ParamValue::from("x").to_f64(), Some(0.0));
    }

    #[test]
    fn test_should_coerce_booleans_to_one_and_zero() {
        assert_eq!(ParamValue::Bool(true).to_i64(), Some(1));
        assert_eq!(ParamValue::Bool(false).to_u64(), Some(0));
        assert_eq!(ParamValue::Bool(true).to_f64(), Some(1.0));
    }

    #[test]
    fn test_should_coerce_to_bool_via_positive_float() {
        assert_eq!(num("0.1").to_bool(), Some(true));
        assert_eq!(num("0").to_bool(), Some(false));
        assert_eq!(num("-1").to_bool(), Some(false));
        assert_eq!(ParamValue::from("1").to_bool(), Some(true));
        assert_eq!(ParamValue::from("true").to_bool(), Some(false));
        assert_eq!(ParamValue::from("0").to_bool(), Some(false));
    }

    #[test]
    fn test_should_yield_zero_values_for_composites() {
        let list = ParamValue::List(vec![ParamValue::from("a")]);
        let map = ParamValue::Map(ParamMap::new());
        assert_eq!(list.to_i64(), Some(0));
        assert_eq!(map.to_f64(), Some(0.0));
        assert_eq!(map.to_bool(), Some(false));
    }

    #[test]
    fn test_should_return_none_for_absent() {
        let v = ParamValue::Absent;
        assert_eq!(v.to_i64(), None);
        assert_eq!(v.to_u64(), None);
        assert_eq!(v.to_f64(), None);
        assert_eq!(v.to_bool(), None);
        assert_eq!(v.to_text(), None);
    }

    #[test]
    fn test_should_render_text() {
        assert_eq!(num("7").to_text().as_deref(), Some("7"));
        assert_eq!(num("1.5").to_text().as_deref(), Some("1.5"));
        assert_eq!(ParamValue::Bool(true).to_text(), None);
        assert_eq!(num(r#"["a",1]"#).to_text().as_deref(), Some(r#"["a",1]"#));
        assert_eq!(
            num(r#"{"b":2,"a":1}"#).to_text().as_deref(),
            Some(r#"{"a":1,"b":2}"#)
        );
    }

    #[test]
    fn test_should_deserialize_null_as_absent() {
        assert_eq!(num("null"), ParamValue::Absent);
        let list = num("[1,null]");
        assert_eq!(list.as_list().map(<[ParamValue]>::len), Some(2));
        assert!(list.as_list().unwrap()[1].is_absent());
    }

    #[test]
    fn test_should_keep_integer_representation_when_serializing() {
        let v = num("1");
        assert_eq!(serde_json::to_string(&v).unwrap(), "1");
        let v = num(r#"{"id":[1,2.5,"x",true]}"#);
        assert_eq!(
            serde_json::to_string(&v).unwrap(),
            r#"{"id":[1,2.5,"x",true]}"#
        );
    }

    #[test]
    fn test_should_name_each_kind() {
        assert_eq!(ParamValue::from("x").kind(), "string");
        assert_eq!(ParamValue::from(3_i64).kind(), "number");
        assert_eq!(ParamValue::from(true).kind(), "bool");
        assert_eq!(ParamValue::List(Vec::new()).kind(), "list");
        assert_eq!(ParamValue::Absent.kind(), "absent");
    }

    #[test]
    fn test_should_report_filled_by_kind() {
        assert!(!ParamValue::from("   ").is_filled());
        assert!(ParamValue::from("ok").is_filled());
        assert!(!ParamValue::List(vec![]).is_filled());
        assert!(ParamValue::Bool(false).is_filled());
        assert!(!ParamValue::Absent.is_filled());
    }

    #[test]
    fn test_should_deserialize_store_from_json_object() {
        let store: ParamStore = serde_json::from_str(r#"{"a":1,"b":"two"}"#).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.get("b"), Some(&ParamValue::from("two")));
    }

    #[test]
    fn test_should_reject_non_object_store() {
        assert!(serde_json::from_str::<ParamStore>("[1,2]").is_err());
    }

    #[test]
    fn test_should_replace_existing_key_on_insert() {
        let mut store = ParamStore::new();
        store.insert("k", ParamValue::from("query"));
        let old = store.insert("k", ParamValue::from("body"));
        assert_eq!(old, Some(ParamValue::from("query")));
        assert_eq!(store.get("k"), Some(&ParamValue::from("body")));
    }
}
