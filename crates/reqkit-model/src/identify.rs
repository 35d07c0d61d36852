//! Promotion of raw textual field values into parameter values.
//!
//! Query strings and form fields only carry text. A field whose text is a JSON
//! array or a JSON object is promoted to the matching composite; everything
//! else stays a string. Bare JSON scalars are deliberately left alone, so
//! `"123"` is the string `"123"` and `"true"` is the string `"true"`.

use crate::value::{ParamMap, ParamValue};

/// Classify a single raw field value.
///
/// Tries a JSON array first, then a JSON object, and otherwise returns the
/// input unchanged as [`ParamValue::String`].
#[must_use]
pub fn identify(raw: &str) -> ParamValue {
    if let Ok(items) = serde_json::from_str::<Vec<ParamValue>>(raw) {
        return ParamValue::List(items);
    }
    if let Ok(entries) = serde_json::from_str::<ParamMap>(raw) {
        return ParamValue::Map(entries);
    }
    ParamValue::String(raw.to_owned())
}

/// Collapse all values received for one key.
///
/// One value is identified on its own, several become a list of identified
/// values in arrival order, and none yields [`ParamValue::Absent`].
#[must_use]
pub fn scan<S: AsRef<str>>(values: &[S]) -> ParamValue {
    match values {
        [] => ParamValue::Absent,
        [single] => identify(single.as_ref()),
        many => ParamValue::List(many.iter().map(|v| identify(v.as_ref())).collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_identify_json_array() {
        let v = identify("[1,2]");
        let items = v.as_list().expect("should be a list");
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].to_i64(), Some(1));
        assert_eq!(items[1].to_i64(), Some(2));
    }

    #[test]
    fn test_should_identify_json_object() {
        let v = identify(r#"{"obj":{"id":[7]}}"#);
        let map = v.as_map().expect("should be a map");
        let inner = map["obj"].as_map().expect("nested map");
        assert_eq!(inner["id"].as_list().map(<[ParamValue]>::len), Some(1));
    }

    #[test]
    fn test_should_keep_plain_strings() {
        assert_eq!(identify("abc"), ParamValue::from("abc"));
        assert_eq!(identify(""), ParamValue::from(""));
        assert_eq!(identify("[broken"), ParamValue::from("[broken"));
    }

    #[test]
    fn test_should_not_promote_bare_scalars() {
        assert_eq!(identify("123"), ParamValue::from("123"));
        assert_eq!(identify("true"), ParamValue::from("true"));
        assert_eq!(identify("null"), ParamValue::from("null"));
        assert_eq!(identify("\"quoted\""), ParamValue::from("\"quoted\""));
    }

    #[test]
    fn test_should_scan_empty_list_as_absent() {
        let empty: [&str; 0] = [];
        assert_eq!(scan(&empty), ParamValue::Absent);
    }

    #[test]
    fn test_should_scan_single_value_through_identify() {
        assert_eq!(scan(&["x"]), identify("x"));
        assert!(scan(&["[1]"]).is_list());
    }

    #[test]
    fn test_should_scan_many_values_in_order() {
        let v = scan(&["a", "[1]", "b"]);
        let items = v.as_list().expect("should be a list");
        assert_eq!(items[0], ParamValue::from("a"));
        assert!(items[1].is_list());
        assert_eq!(items[2], ParamValue::from("b"));
    }
}
