//! Lossless-enough mapping between schemaless JSON payloads and BSON.
//!
//! Document payloads are plain JSON objects; only the JSON-representable
//! subset of BSON ever round-trips through this module, so the few exotic
//! BSON types map to `null`.

use mongodb::bson::{Bson, Document as BsonDocument};
use serde_json::{Number, Value};

use crate::dao::document_store::{Document, Fields};

/// Convert a JSON field payload to a BSON document (no `_id`).
pub fn fields_to_bson(fields: &Fields) -> BsonDocument {
    let mut document = BsonDocument::new();
    for (key, value) in fields {
        document.insert(key.clone(), value_to_bson(value));
    }
    document
}

/// Convert a stored BSON document into a [`Document`], splitting off `_id`.
pub fn document_from_bson(mut raw: BsonDocument) -> Document {
    let id = match raw.remove("_id") {
        Some(Bson::String(id)) => id,
        Some(other) => other.to_string(),
        None => String::new(),
    };

    let mut fields = Fields::new();
    for (key, value) in raw {
        fields.insert(key, bson_to_value(value));
    }
    Document::new(id, fields)
}

fn value_to_bson(value: &Value) -> Bson {
    match value {
        Value::Null => Bson::Null,
        Value::Bool(flag) => Bson::Boolean(*flag),
        Value::Number(number) => number_to_bson(number),
        Value::String(text) => Bson::String(text.clone()),
        Value::Array(items) => Bson::Array(items.iter().map(value_to_bson).collect()),
        Value::Object(map) => {
            let mut document = BsonDocument::new();
            for (key, item) in map {
                document.insert(key.clone(), value_to_bson(item));
            }
            Bson::Document(document)
        }
    }
}

fn number_to_bson(number: &Number) -> Bson {
    if let Some(int) = number.as_i64() {
        Bson::Int64(int)
    } else if let Some(float) = number.as_f64() {
        Bson::Double(float)
    } else {
        Bson::Null
    }
}

fn bson_to_value(bson: Bson) -> Value {
    match bson {
        Bson::Null => Value::Null,
        Bson::Boolean(flag) => Value::Bool(flag),
        Bson::Int32(int) => Value::Number(int.into()),
        Bson::Int64(int) => Value::Number(int.into()),
        Bson::Double(float) => Number::from_f64(float).map_or(Value::Null, Value::Number),
        Bson::String(text) => Value::String(text),
        Bson::Array(items) => Value::Array(items.into_iter().map(bson_to_value).collect()),
        Bson::Document(document) => {
            let mut map = Fields::new();
            for (key, value) in document {
                map.insert(key, bson_to_value(value));
            }
            Value::Object(map)
        }
        Bson::DateTime(datetime) => Value::Number(datetime.timestamp_millis().into()),
        _ => Value::Null,
    }
}
