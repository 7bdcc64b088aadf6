//! JSON Schema built from a profile's field list.
//!
//! The LLM is asked for a wrapper object `{ "items": [ … ] }` because JSON
//! mode on most providers only guarantees an object at the top level.

use serde_json::{Map, Value, json};

use pagesift_shared::FieldSpec;

/// Schema of one extraction response.
#[derive(Debug, Clone)]
pub struct ExtractionSchema {
    item: Value,
}

impl ExtractionSchema {
    /// Build the item schema from the profile fields.
    pub fn from_fields(fields: &[FieldSpec]) -> Self {
        let mut properties = Map::new();
        for field in fields {
            let mut prop = Map::new();
            prop.insert("type".into(), json!(field.kind.json_type()));
            if !field.description.is_empty() {
                prop.insert("description".into(), json!(field.description));
            }
            properties.insert(field.name.clone(), Value::Object(prop));
        }

        let required: Vec<&str> = fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name.as_str())
            .collect();

        Self {
            item: json!({
                "type": "object",
                "properties": properties,
                "required": required,
            }),
        }
    }

    /// Schema of a single record.
    pub fn item(&self) -> &Value {
        &self.item
    }

    /// Schema of the full `{"items": [...]}` response, shown to the model in the system prompt.
    pub fn response(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "items": {
                    "type": "array",
                    "items": self.item,
                }
            },
            "required": ["items"],
        })
    }
}
