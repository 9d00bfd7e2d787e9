use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Types that can be requested from Claude as a forced tool call.
///
/// Automatically implemented for any type that implements `JsonSchema + DeserializeOwned`.
pub trait StructuredOutput: JsonSchema + DeserializeOwned {
    /// JSON schema used as the `input_schema` of the structured-output tool.
    ///
    /// Every object schema is closed (`additionalProperties: false`), lists all
    /// of its properties as required, and has its `$ref`s inlined so the model
    /// sees one self-contained document.
    fn tool_schema() -> Value {
        let schema = schema_for!(Self);
        let mut value = serde_json::to_value(schema).unwrap_or_default();

        let definitions = match &mut value {
            Value::Object(map) => {
                map.remove("$schema");
                map.remove("definitions")
            }
            _ => None,
        };

        if let Some(Value::Object(defs)) = definitions {
            inline_refs(&mut value, &defs);
        }
        close_objects(&mut value);

        value
    }

    fn type_name() -> String {
        <Self as JsonSchema>::schema_name()
    }
}

impl<T: JsonSchema + DeserializeOwned> StructuredOutput for T {}

fn close_objects(value: &mut Value) {
    match value {
        Value::Object(map) => {
            if map.get("type").and_then(Value::as_str) == Some("object") {
                map.insert("additionalProperties".to_string(), Value::Bool(false));

                let required: Option<Vec<Value>> = map
                    .get("properties")
                    .and_then(Value::as_object)
                    .map(|props| props.keys().cloned().map(Value::String).collect());
                if let Some(required) = required {
                    map.insert("required".to_string(), Value::Array(required));
                }
            }

            for (_, v) in map.iter_mut() {
                close_objects(v);
            }
        }
        Value::Array(items) => items.iter_mut().for_each(close_objects),
        _ => {}
    }
}

fn inline_refs(value: &mut Value, definitions: &Map<String, Value>) {
    match value {
        Value::Object(map) => {
            let target = map
                .get("$ref")
                .and_then(Value::as_str)
                .and_then(|r| r.strip_prefix("#/definitions/"))
                .and_then(|name| definitions.get(name));
            if let Some(def) = target {
                *value = def.clone();
                inline_refs(value, definitions);
                return;
            }

            // schemars wraps documented struct fields as `allOf: [{$ref}]`
            let single_all_of = match map.get_mut("allOf") {
                Some(Value::Array(all_of)) if all_of.len() == 1 => all_of.pop(),
                _ => None,
            };
            if let Some(inner) = single_all_of {
                *value = inner;
                inline_refs(value, definitions);
                return;
            }

            for (_, v) in map.iter_mut() {
                inline_refs(v, definitions);
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                inline_refs(item, definitions);
            }
        }
        _ => {}
    }
}
