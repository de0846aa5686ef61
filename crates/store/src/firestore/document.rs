use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Number, Value as Json};

use busalert_common::types::FieldMap;

/// A Firestore field value in the REST/JSON encoding, e.g. `{"stringValue": "x"}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Value {
    NullValue,
    BooleanValue(bool),
    /// int64 values travel as decimal strings
    IntegerValue(#[serde(deserialize_with = "int64_from_string_or_number")] i64),
    DoubleValue(Double),
    TimestampValue(String),
    StringValue(String),
    /// base64
    BytesValue(String),
    ReferenceValue(String),
    GeoPointValue(LatLng),
    ArrayValue(ArrayValue),
    MapValue(MapValue),
}

/// Doubles are JSON numbers, except NaN and the infinities which are strings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Double {
    Finite(f64),
    Special(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LatLng {
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ArrayValue {
    #[serde(default)]
    pub values: Vec<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MapValue {
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
}

fn int64_from_string_or_number<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Text(String),
        Number(i64),
    }

    match Repr::deserialize(deserializer)? {
        Repr::Number(n) => Ok(n),
        Repr::Text(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

impl Value {
    /// Convert into plain JSON, dropping the type tags.
    pub fn into_json(self) -> Json {
        match self {
            Value::NullValue => Json::Null,
            Value::BooleanValue(b) => Json::Bool(b),
            Value::IntegerValue(i) => Json::Number(i.into()),
            Value::DoubleValue(Double::Finite(f)) => Number::from_f64(f)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::DoubleValue(Double::Special(s)) => Json::String(s),
            Value::TimestampValue(s)
            | Value::StringValue(s)
            | Value::BytesValue(s)
            | Value::ReferenceValue(s) => Json::String(s),
            Value::GeoPointValue(p) => {
                serde_json::json!({ "latitude": p.latitude, "longitude": p.longitude })
            }
            Value::ArrayValue(a) => Json::Array(a.values.into_iter().map(Value::into_json).collect()),
            Value::MapValue(m) => Json::Object(fields_into_json(m.fields)),
        }
    }
}

fn fields_into_json(fields: BTreeMap<String, Value>) -> Map<String, Json> {
    fields.into_iter().map(|(k, v)| (k, v.into_json())).collect()
}

/// A Firestore document as returned by the REST API and carried in trigger events.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
    pub create_time: Option<DateTime<Utc>>,
    pub update_time: Option<DateTime<Utc>>,
}

impl Document {
    pub fn path(&self) -> Option<DocumentPath> {
        DocumentPath::parse(&self.name)
    }

    /// The document id, i.e. the last segment of its name.
    pub fn id(&self) -> Option<&str> {
        self.name.rsplit('/').next().filter(|s| !s.is_empty())
    }

    /// Plain JSON view of the document's fields.
    pub fn field_map(&self) -> FieldMap {
        fields_into_json(self.fields.clone())
    }
}

/// A document path relative to the database root, e.g. `issues/abc123`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentPath {
    segments: Vec<String>,
}

impl DocumentPath {
    /// Parse a full resource name (`projects/p/databases/d/documents/issues/x`),
    /// a CloudEvent subject (`documents/issues/x`) or a relative path (`issues/x`).
    ///
    /// Prefixes are recognised by position, so a collection may itself be
    /// named `documents`.
    pub fn parse(name: &str) -> Option<Self> {
        let all: Vec<&str> = name.trim_matches('/').split('/').collect();

        let relative = match all.as_slice() {
            ["projects", _, "databases", _, "documents", rest @ ..] => rest,
            // A subject has an odd segment count; a relative path never does.
            ["documents", rest @ ..] if all.len() % 2 == 1 => rest,
            _ => all.as_slice(),
        };

        // collection/doc pairs, none empty
        if relative.len() < 2 || relative.len() % 2 != 0 || relative.iter().any(|s| s.is_empty())
        {
            return None;
        }
        Some(Self {
            segments: relative.iter().map(|s| s.to_string()).collect(),
        })
    }

    pub fn document_id(&self) -> &str {
        &self.segments[self.segments.len() - 1]
    }

    /// Path of the collection holding the document, e.g. `issues` or `orgs/o1/issues`.
    pub fn collection_path(&self) -> String {
        self.segments[..self.segments.len() - 1].join("/")
    }

    /// Whether this is a direct child of `collection` (as in a `issues/{issueId}` trigger).
    pub fn is_in_collection(&self, collection: &str) -> bool {
        self.collection_path() == collection.trim_matches('/')
    }
}

impl std::fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.segments.join("/"))
    }
}
