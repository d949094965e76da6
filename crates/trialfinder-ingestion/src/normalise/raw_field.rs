//! Tagged view over loosely-typed registry JSON.
//!
//! Every field the normaliser reads goes through [`RawField`], which makes
//! the JSON shape explicit and coerces it per field. `serde_json::Value`
//! never leaves the `normalise` module.

use serde_json::{Map, Value};

/// One JSON field as found in a registry record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawField<'a> {
    Missing,
    Null,
    Text(&'a str),
    Number(f64),
    Bool(bool),
    List(&'a [Value]),
    Object(&'a Map<String, Value>),
}

impl<'a> RawField<'a> {
    pub fn of(value: Option<&'a Value>) -> Self {
        match value {
            None                    => RawField::Missing,
            Some(Value::Null)       => RawField::Null,
            Some(Value::String(s))  => RawField::Text(s),
            Some(Value::Number(n))  => n.as_f64().map(RawField::Number).unwrap_or(RawField::Null),
            Some(Value::Bool(b))    => RawField::Bool(*b),
            Some(Value::Array(a))   => RawField::List(a),
            Some(Value::Object(m))  => RawField::Object(m),
        }
    }

    /// Follow a key path through nested objects.
    pub fn at(root: &'a Value, path: &[&str]) -> Self {
        let mut current = RawField::of(Some(root));
        for key in path {
            current = current.get(key);
        }
        current
    }

    /// First path (in priority order) that yields a non-absent field.
    pub fn lookup(root: &'a Value, paths: &[&[&str]]) -> Self {
        paths
            .iter()
            .map(|path| RawField::at(root, path))
            .find(|field| !field.is_absent())
            .unwrap_or(RawField::Missing)
    }

    /// Child field of an object; anything else has no children.
    pub fn get(&self, key: &str) -> RawField<'a> {
        match *self {
            RawField::Object(m) => RawField::of(m.get(key)),
            _ => RawField::Missing,
        }
    }

    /// Missing, null, or text that is blank once trimmed.
    pub fn is_absent(&self) -> bool {
        match *self {
            RawField::Missing | RawField::Null => true,
            RawField::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Trimmed text, only when the field really is a non-blank string.
    pub fn text(&self) -> Option<&'a str> {
        match *self {
            RawField::Text(s) => Some(s.trim()).filter(|s| !s.is_empty()),
            _ => None,
        }
    }

    /// Lenient text coercion for descriptive fields.
    ///
    /// Numbers are printed, `{ "textblock" | "textBlock" | "value": .. }`
    /// objects are unwrapped, lists are joined with "; ".
    pub fn as_text(&self) -> Option<String> {
        match *self {
            RawField::Text(_) => self.text().map(String::from),
            RawField::Number(n) => Some(n.to_string()),
            RawField::Object(_) => ["textblock", "textBlock", "value"]
                .iter()
                .map(|k| self.get(k))
                .find(|f| !f.is_absent())
                .and_then(|f| f.as_text()),
            RawField::List(items) => {
                let parts: Vec<String> = items
                    .iter()
                    .filter_map(|v| RawField::of(Some(v)).as_text())
                    .collect();
                if parts.is_empty() { None } else { Some(parts.join("; ")) }
            }
            RawField::Missing | RawField::Null | RawField::Bool(_) => None,
        }
    }

    /// Elements of a list; a single scalar or object counts as a one-item list.
    pub fn items(&self) -> Vec<RawField<'a>> {
        match *self {
            RawField::List(items) => items.iter().map(|v| RawField::of(Some(v))).collect(),
            RawField::Missing | RawField::Null => vec![],
            other => vec![other],
        }
    }

    /// Text of every element, blanks dropped.
    pub fn as_text_list(&self) -> Vec<String> {
        self.items().iter().filter_map(|f| f.as_text()).collect()
    }
}

/// First non-absent child among several alias keys.
pub fn first_child<'a>(field: &RawField<'a>, keys: &[&str]) -> RawField<'a> {
    keys.iter()
        .map(|k| field.get(k))
        .find(|f| !f.is_absent())
        .unwrap_or(RawField::Missing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lookup_prefers_first_present_path() {
        let v = json!({ "protocolSection": { "identificationModule": { "nctId": "NCT01234567" } }, "identifier": "NCT99999999" });
        let field = RawField::lookup(&v, &[&["protocolSection", "identificationModule", "nctId"], &["identifier"]]);
        assert_eq!(field.text(), Some("NCT01234567"));
    }

    #[test]
    fn test_lookup_skips_blank_and_null() {
        let v = json!({ "briefTitle": "  ", "officialTitle": null, "title": "Real title" });
        let field = RawField::lookup(&v, &[&["briefTitle"], &["officialTitle"], &["title"]]);
        assert_eq!(field.text(), Some("Real title"));
    }

    #[test]
    fn test_path_through_non_object_is_missing() {
        let v = json!({ "protocolSection": "oops" });
        assert_eq!(RawField::at(&v, &["protocolSection", "statusModule"]), RawField::Missing);
    }

    #[test]
    fn test_as_text_unwraps_textblock_and_lists() {
        let v = json!({ "a": { "textBlock": "Inclusion: adults" }, "b": ["x", 2, null] });
        assert_eq!(RawField::at(&v, &["a"]).as_text().as_deref(), Some("Inclusion: adults"));
        assert_eq!(RawField::at(&v, &["b"]).as_text().as_deref(), Some("x; 2"));
    }

    #[test]
    fn test_scalar_counts_as_single_item_list() {
        let v = json!({ "conditions": "Glioma" });
        assert_eq!(RawField::at(&v, &["conditions"]).as_text_list(), vec!["Glioma".to_string()]);
    }
}
