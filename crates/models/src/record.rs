use std::fmt;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Number, Value};

use crate::{collection_type::CollectionType, errors::ModelError};

/// Loose field map used for partial updates and opaque record payloads.
pub type Fields = serde_json::Map<String, Value>;

/// Record identifier: the storefront stores both numeric and string ids.
///
/// Matching is strict, so `1` and `"1"` are different ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Num(i64),
    /// Any other JSON number (fractions, integers beyond `i64`), kept as written.
    Decimal(Number),
    Text(String),
}

impl RecordId {
    /// Interpret a path segment: numeric when it parses as a JSON number, text otherwise.
    pub fn parse(raw: &str) -> Self {
        if let Ok(n) = raw.parse::<i64>() {
            return RecordId::Num(n);
        }
        match raw.parse::<Number>() {
            Ok(n) => RecordId::Decimal(n),
            Err(_) => RecordId::Text(raw.to_string()),
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Num(n) => write!(f, "{n}"),
            RecordId::Decimal(n) => write!(f, "{n}"),
            RecordId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for RecordId {
    fn from(v: i64) -> Self {
        RecordId::Num(v)
    }
}

impl From<&str> for RecordId {
    fn from(v: &str) -> Self {
        RecordId::Text(v.to_string())
    }
}

impl From<String> for RecordId {
    fn from(v: String) -> Self {
        RecordId::Text(v)
    }
}

/// Anything stored in a collection. The persistence layer only looks at `id`.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    fn id(&self) -> &RecordId;
}

/// A record bound to one specific collection.
pub trait Entity: Record {
    const COLLECTION: CollectionType;
}

/// Shallow-merge `partial` into `record`: top-level keys in `partial` replace
/// the record's, everything else is kept.
pub fn merge_fields<R: Record>(record: &R, partial: &Fields) -> Result<R, ModelError> {
    let mut value = serde_json::to_value(record)?;
    let object = value
        .as_object_mut()
        .ok_or_else(|| ModelError::NotAnObject(record.id().to_string()))?;
    for (key, v) in partial {
        object.insert(key.clone(), v.clone());
    }
    Ok(serde_json::from_value(value)?)
}

/// Schemaless record: an id plus whatever fields the caller stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: RecordId,
    #[serde(flatten)]
    pub fields: Fields,
}

impl Document {
    pub fn new(id: impl Into<RecordId>) -> Self {
        Self { id: id.into(), fields: Fields::new() }
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.fields.insert(key.to_string(), value.into());
    }

    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Numeric field; numbers written as strings (form input) are accepted too.
    pub fn f64_field(&self, key: &str) -> Option<f64> {
        match self.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Whole-number field, truncating fractions.
    pub fn i64_field(&self, key: &str) -> Option<i64> {
        match self.get(key)? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl Record for Document {
    fn id(&self) -> &RecordId {
        &self.id
    }
}

/// Declares a typed view over a [`Document`] bound to one collection.
///
/// The view serializes as the document itself, so a record goes back to
/// storage exactly as it was read plus whatever was explicitly changed.
macro_rules! entity_view {
    ($(#[$meta:meta])* $name:ident => $kind:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        pub struct $name($crate::record::Document);

        impl $name {
            pub fn document(&self) -> &$crate::record::Document {
                &self.0
            }

            pub fn into_document(self) -> $crate::record::Document {
                self.0
            }
        }

        impl From<$crate::record::Document> for $name {
            fn from(doc: $crate::record::Document) -> Self {
                Self(doc)
            }
        }

        impl $crate::record::Record for $name {
            fn id(&self) -> &$crate::record::RecordId {
                &self.0.id
            }
        }

        impl $crate::record::Entity for $name {
            const COLLECTION: $crate::collection_type::CollectionType = $kind;
        }
    };
}

pub(crate) use entity_view;
