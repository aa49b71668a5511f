//! Purpose: Own one parsed JSON document and expose key-level read/write operations.
//! Exports: `Document`.
//! Role: The value wrapper behind every handle; thin layer over `serde_json::Value`.
//! Invariants: Lookups address top-level object keys only (no nested path queries).
//! Invariants: `get` returns a detached deep copy; children never alias the parent.
//! Invariants: Setters verify by readback; `Ok(false)` means the stored value differs.
//! Invariants: Failed operations leave the document unchanged.
//! Notes: Parsing rejects nesting deeper than 128 levels (serde_json recursion limit).
use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde_json::{Map, Value};

use crate::core::error::{Error, ErrorKind};
use crate::core::kind::JsonType;
use crate::core::print;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Document {
    value: Value,
}

impl Document {
    pub fn new() -> Self {
        Self { value: Value::Null }
    }

    pub fn from_value(value: Value) -> Self {
        Self { value }
    }

    pub fn parse(text: &str) -> Result<Self, Error> {
        let value = serde_json::from_str(text).map_err(|err| {
            Error::new(ErrorKind::Parse)
                .with_message(format!("invalid json at line {} column {}", err.line(), err.column()))
                .with_source(err)
        })?;
        Ok(Self { value })
    }

    pub fn from_reader(mut reader: impl Read) -> Result<Self, Error> {
        let mut text = String::new();
        reader.read_to_string(&mut text).map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to read json stream")
                .with_source(err)
        })?;
        Self::parse(&text)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("cannot open file")
                .with_path(path)
                .with_source(err)
        })?;
        let doc = Self::from_reader(file).map_err(|err| err.with_path(path))?;
        tracing::debug!(path = %path.display(), kind = doc.kind().label(), "loaded document");
        Ok(doc)
    }

    pub fn save(&self, path: impl AsRef<Path>, indent: i32) -> Result<(), Error> {
        let path = path.as_ref();
        let text = self.print(indent)?;
        std::fs::write(path, text).map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("cannot write file")
                .with_path(path)
                .with_source(err)
        })?;
        tracing::debug!(path = %path.display(), indent, "saved document");
        Ok(())
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    pub fn kind(&self) -> JsonType {
        JsonType::of(&self.value)
    }

    pub fn size(&self) -> usize {
        match &self.value {
            Value::Null => 0,
            Value::Array(items) => items.len(),
            Value::Object(map) => map.len(),
            _ => 1,
        }
    }

    pub fn print(&self, indent: i32) -> Result<String, Error> {
        print::render(&self.value, indent)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.value
            .as_object()
            .into_iter()
            .flat_map(|map| map.keys().map(String::as_str))
    }

    pub fn has_key(&self, key: &str) -> bool {
        self.value
            .as_object()
            .is_some_and(|map| map.contains_key(key))
    }

    pub fn is_null(&self, key: &str) -> Result<bool, Error> {
        Ok(self.lookup(key)?.is_null())
    }

    pub fn get(&self, key: &str) -> Result<Document, Error> {
        Ok(Document::from_value(self.lookup(key)?.clone()))
    }

    pub fn get_string(&self, key: &str) -> Result<&str, Error> {
        let value = self.lookup(key)?;
        value
            .as_str()
            .ok_or_else(|| mismatch(key, "string", value))
    }

    pub fn get_int(&self, key: &str) -> Result<i32, Error> {
        let value = self.get_int64(key)?;
        i32::try_from(value).map_err(|_| {
            Error::new(ErrorKind::Type)
                .with_message(format!("{value} does not fit in a 32-bit integer"))
                .with_key(key)
        })
    }

    pub fn get_int64(&self, key: &str) -> Result<i64, Error> {
        let value = self.lookup(key)?;
        value
            .as_i64()
            .ok_or_else(|| mismatch(key, "64-bit integer", value))
    }

    pub fn get_float(&self, key: &str) -> Result<f64, Error> {
        let value = self.lookup(key)?;
        value.as_f64().ok_or_else(|| mismatch(key, "number", value))
    }

    pub fn get_bool(&self, key: &str) -> Result<bool, Error> {
        let value = self.lookup(key)?;
        value.as_bool().ok_or_else(|| mismatch(key, "boolean", value))
    }

    pub fn set_string(&mut self, key: &str, value: &str) -> Result<bool, Error> {
        self.overwrite(key, Value::from(value))?;
        Ok(self.get_string(key).is_ok_and(|stored| stored == value))
    }

    pub fn set_int(&mut self, key: &str, value: i32) -> Result<bool, Error> {
        self.overwrite(key, Value::from(value))?;
        Ok(self.get_int(key).is_ok_and(|stored| stored == value))
    }

    pub fn set_int64(&mut self, key: &str, value: i64) -> Result<bool, Error> {
        self.overwrite(key, Value::from(value))?;
        Ok(self.get_int64(key).is_ok_and(|stored| stored == value))
    }

    pub fn set_bool(&mut self, key: &str, value: bool) -> Result<bool, Error> {
        self.overwrite(key, Value::from(value))?;
        Ok(self.get_bool(key).is_ok_and(|stored| stored == value))
    }

    /// Non-finite values have no JSON form; they are stored as `null` and
    /// reported as a failed readback.
    pub fn set_float(&mut self, key: &str, value: f64) -> Result<bool, Error> {
        self.overwrite(key, Value::from(value))?;
        Ok(self.float_readback(key, value))
    }

    /// Inserts or replaces `key`. A null document becomes an empty object first.
    /// Floats go through `write_float` so non-finite input is caught by readback.
    pub fn write(&mut self, key: &str, value: Value) -> Result<bool, Error> {
        self.object_for_upsert(key)?
            .insert(key.to_string(), value.clone());
        Ok(self.lookup(key).is_ok_and(|stored| *stored == value))
    }

    /// Upserting form of `set_float`, with the same non-finite handling.
    pub fn write_float(&mut self, key: &str, value: f64) -> Result<bool, Error> {
        self.object_for_upsert(key)?
            .insert(key.to_string(), Value::from(value));
        Ok(self.float_readback(key, value))
    }

    /// Inserts a copy of `other` at `key`. When both the existing value and
    /// `other` are objects, members of `other` are merged into the existing one.
    pub fn set(&mut self, key: &str, other: &Document) -> Result<bool, Error> {
        let map = self.object_for_upsert(key)?;
        match (map.get_mut(key), &other.value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                for (member, value) in incoming {
                    existing.insert(member.clone(), value.clone());
                }
            }
            _ => {
                map.insert(key.to_string(), other.value.clone());
            }
        }
        let stored = match (self.lookup(key), &other.value) {
            (Ok(Value::Object(existing)), Value::Object(incoming)) => incoming
                .iter()
                .all(|(member, value)| existing.get(member) == Some(value)),
            (Ok(stored), expected) => stored == expected,
            (Err(_), _) => false,
        };
        if !stored {
            tracing::warn!(key, "nested document readback mismatch");
        }
        Ok(stored)
    }

    pub fn remove_key(&mut self, key: &str) -> bool {
        match &mut self.value {
            Value::Object(map) => map.shift_remove(key).is_some(),
            _ => false,
        }
    }

    /// Resets the document to the zero value of its current type.
    pub fn clear(&mut self) {
        self.value = match &self.value {
            Value::Null => Value::Null,
            Value::Bool(_) => Value::Bool(false),
            Value::Number(num) if num.is_f64() => Value::from(0.0),
            Value::Number(_) => Value::from(0),
            Value::String(_) => Value::String(String::new()),
            Value::Array(_) => Value::Array(Vec::new()),
            Value::Object(_) => Value::Object(Map::new()),
        };
    }

    fn float_readback(&self, key: &str, value: f64) -> bool {
        let stored = self.get_float(key).is_ok_and(|stored| stored == value);
        if !stored {
            tracing::warn!(key, value, "float readback mismatch");
        }
        stored
    }

    fn lookup(&self, key: &str) -> Result<&Value, Error> {
        let map = self.value.as_object().ok_or_else(|| not_an_object(key, self.kind()))?;
        map.get(key).ok_or_else(|| missing(key))
    }

    fn overwrite(&mut self, key: &str, value: Value) -> Result<(), Error> {
        let kind = self.kind();
        let map = self
            .value
            .as_object_mut()
            .ok_or_else(|| not_an_object(key, kind))?;
        let slot = map.get_mut(key).ok_or_else(|| missing(key))?;
        *slot = value;
        Ok(())
    }

    fn object_for_upsert(&mut self, key: &str) -> Result<&mut Map<String, Value>, Error> {
        if self.value.is_null() {
            self.value = Value::Object(Map::new());
        }
        let kind = self.kind();
        self.value
            .as_object_mut()
            .ok_or_else(|| not_an_object(key, kind))
    }
}

fn missing(key: &str) -> Error {
    Error::new(ErrorKind::Key)
        .with_message(format!("key '{key}' not found"))
        .with_key(key)
}

fn not_an_object(key: &str, kind: JsonType) -> Error {
    Error::new(ErrorKind::Type)
        .with_message(format!("cannot use key lookup with {}", kind.label()))
        .with_key(key)
}

fn mismatch(key: &str, expected: &str, found: &Value) -> Error {
    Error::new(ErrorKind::Type)
        .with_message(format!(
            "expected {expected}, found {}",
            JsonType::of(found).label()
        ))
        .with_key(key)
}

#[cfg(test)]
mod tests {
    use super::Document;
    use crate::core::error::ErrorKind;
    use crate::core::kind::JsonType;
    use serde_json::json;

    #[test]
    fn walkthrough_matches_documented_example() {
        let mut doc = Document::parse(r#"{"a":1,"b":"x"}"#).expect("parse");
        assert!(doc.has_key("a"));
        assert_eq!(doc.get_int("a").expect("a"), 1);
        assert!(doc.set_string("b", "y").expect("set"));
        assert_eq!(doc.get_string("b").expect("b"), "y");
        assert!(doc.remove_key("a"));
        assert!(!doc.has_key("a"));
        assert_eq!(doc.print(0).expect("print"), r#"{"b":"y"}"#);
    }

    #[test]
    fn malformed_text_is_a_parse_error() {
        let err = Document::parse(r#"{"a":"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
    }

    #[test]
    fn strict_setters_require_existing_key() {
        let mut doc = Document::parse(r#"{"a":1}"#).expect("parse");
        let err = doc.set_int("missing", 2).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Key);
        assert_eq!(err.key(), Some("missing"));
        assert_eq!(doc.value(), &json!({"a": 1}));

        let mut null_doc = Document::new();
        let err = null_doc.set_bool("a", true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Type);
        assert_eq!(null_doc.kind(), JsonType::Null);
    }

    #[test]
    fn setters_may_change_the_stored_type() {
        let mut doc = Document::parse(r#"{"v":"text"}"#).expect("parse");
        assert!(doc.set_int64("v", i64::MIN).expect("set"));
        assert_eq!(doc.get_int64("v").expect("get"), i64::MIN);
        assert!(doc.set_bool("v", true).expect("set"));
        assert!(doc.get_bool("v").expect("get"));
        assert!(doc.set_float("v", 2.5).expect("set"));
        assert_eq!(doc.get_float("v").expect("get"), 2.5);
    }

    #[test]
    fn typed_getters_are_strict() {
        let doc = Document::parse(r#"{"f":1.5,"big":5000000000,"s":"1","n":null}"#)
            .expect("parse");
        assert_eq!(doc.get_int("f").unwrap_err().kind(), ErrorKind::Type);
        assert_eq!(doc.get_int("big").unwrap_err().kind(), ErrorKind::Type);
        assert_eq!(doc.get_int64("big").expect("big"), 5_000_000_000);
        assert_eq!(doc.get_float("big").expect("big"), 5_000_000_000.0);
        assert_eq!(doc.get_bool("s").unwrap_err().kind(), ErrorKind::Type);
        assert_eq!(doc.get_string("n").unwrap_err().kind(), ErrorKind::Type);
        assert!(doc.is_null("n").expect("n"));
        assert!(!doc.is_null("s").expect("s"));
    }

    #[test]
    fn nesting_beyond_recursion_limit_is_parse_error() {
        let nested = |depth: usize| format!("{}{}", "[".repeat(depth), "]".repeat(depth));
        assert!(Document::parse(&nested(100)).is_ok());
        assert_eq!(Document::parse(&nested(200)).unwrap_err().kind(), ErrorKind::Parse);
    }

    #[test]
    fn non_finite_float_fails_readback() {
        let mut doc = Document::parse(r#"{"x":1.0}"#).expect("parse");
        assert!(!doc.set_float("x", f64::NAN).expect("write happens"));
        assert!(doc.is_null("x").expect("x"));
    }

    #[test]
    fn non_finite_float_fails_readback_on_upsert() {
        let mut doc = Document::new();
        assert!(!doc.write_float("f", f64::NAN).expect("write happens"));
        assert_eq!(doc.print(-1).expect("print"), r#"{"f":null}"#);
        assert!(!doc.write_float("g", f64::INFINITY).expect("write happens"));
        assert!(doc.write_float("h", 2.5).expect("write"));
        assert_eq!(doc.get_float("h").expect("h"), 2.5);
    }

    #[test]
    fn write_creates_keys_and_promotes_null() {
        let mut doc = Document::new();
        assert!(doc.write("name", json!("bot")).expect("write"));
        assert!(doc.write("level", json!(3)).expect("write"));
        assert_eq!(doc.kind(), JsonType::Object);
        assert_eq!(doc.print(-1).expect("print"), r#"{"name":"bot","level":3}"#);

        let mut scalar = Document::parse("42").expect("parse");
        assert_eq!(scalar.write("k", json!(1)).unwrap_err().kind(), ErrorKind::Type);
        assert_eq!(scalar.value(), &json!(42));
    }

    #[test]
    fn set_inserts_replaces_and_merges() {
        let mut doc = Document::parse(r#"{"stats":{"kills":1,"deaths":2},"tag":"x"}"#)
            .expect("parse");
        let patch = Document::parse(r#"{"kills":5,"assists":1}"#).expect("parse");
        assert!(doc.set("stats", &patch).expect("merge"));
        assert_eq!(
            doc.get("stats").expect("stats").value(),
            &json!({"kills": 5, "deaths": 2, "assists": 1})
        );

        let list = Document::parse("[1,2]").expect("parse");
        assert!(doc.set("tag", &list).expect("replace"));
        assert!(doc.set("fresh", &list).expect("insert"));
        assert_eq!(doc.get("fresh").expect("fresh").value(), &json!([1, 2]));
    }

    #[test]
    fn get_returns_detached_copy() {
        let mut parent = Document::parse(r#"{"child":{"hp":100}}"#).expect("parse");
        let mut child = parent.get("child").expect("child");
        assert!(child.set_int("hp", 1).expect("set"));
        assert_eq!(parent.get("child").expect("child").get_int("hp").expect("hp"), 100);

        assert!(parent.write("child", json!({"hp": 7})).expect("write"));
        assert_eq!(child.get_int("hp").expect("hp"), 1);
    }

    #[test]
    fn missing_keys_fail_and_remove_is_noop() {
        let mut doc = Document::parse(r#"{"a":1}"#).expect("parse");
        assert!(!doc.has_key("zz"));
        assert_eq!(doc.get("zz").unwrap_err().kind(), ErrorKind::Key);
        assert_eq!(doc.get_string("zz").unwrap_err().kind(), ErrorKind::Key);
        assert_eq!(doc.get_bool("zz").unwrap_err().kind(), ErrorKind::Key);
        assert!(!doc.remove_key("zz"));
        assert_eq!(doc.value(), &json!({"a": 1}));
    }

    #[test]
    fn clear_resets_to_zero_value_and_is_idempotent() {
        let mut doc = Document::parse(r#"{"a":1}"#).expect("parse");
        doc.clear();
        doc.clear();
        assert_eq!(doc.kind(), JsonType::Object);
        assert_eq!(doc.size(), 0);

        let mut text = Document::parse(r#""abc""#).expect("parse");
        text.clear();
        assert_eq!(text.value(), &json!(""));
        assert_eq!(text.size(), 1);

        let mut none = Document::new();
        none.clear();
        assert_eq!(none.size(), 0);
    }

    #[test]
    fn size_counts_top_level_entries() {
        assert_eq!(Document::parse("[1,[2,3]]").expect("parse").size(), 2);
        assert_eq!(Document::parse(r#"{"a":{"b":1}}"#).expect("parse").size(), 1);
        assert_eq!(Document::parse("true").expect("parse").size(), 1);
    }

    #[test]
    fn keys_follow_insertion_order() {
        let doc = Document::parse(r#"{"z":1,"a":2,"m":3}"#).expect("parse");
        assert_eq!(doc.keys().collect::<Vec<_>>(), vec!["z", "a", "m"]);
        assert_eq!(Document::new().keys().count(), 0);
    }

    #[test]
    fn load_and_save_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("doc.json");
        let doc = Document::parse(r#"{"list":[1,2,{"x":null}],"s":"é"}"#).expect("parse");
        doc.save(&path, 3).expect("save");
        let loaded = Document::load(&path).expect("load");
        assert_eq!(loaded, doc);

        let err = Document::load(dir.path().join("missing.json")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.path().is_some());
    }
}
