//! The command-line options layer.
//!
//! Applications hand over their parsed options struct (anything
//! `Serialize`); it is flattened into dotted setting keys, with nested
//! structs becoming sections. `None` fields are skipped, so only options
//! the user actually passed override anything.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::SettingsError;
use crate::schema::canon;
use crate::value::Value;

/// Typed overrides extracted from a parsed command-line options struct.
#[derive(Debug, Clone, Default)]
pub struct OptionsSource {
    values: BTreeMap<String, Value>,
}

impl OptionsSource {
    pub fn from_args<S: Serialize>(args: &S) -> Result<Self, SettingsError> {
        let tree = serde_json::to_value(args).map_err(|e| SettingsError::InvalidValue {
            key: String::new(),
            reason: format!("options struct is not serializable: {e}"),
        })?;
        let mut values = BTreeMap::new();
        flatten(&tree, String::new(), &mut values)?;
        Ok(Self { values })
    }

    /// The override for a dotted setting key, if the option was passed.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(&canon(key))
    }
}

fn flatten(
    node: &serde_json::Value,
    path: String,
    out: &mut BTreeMap<String, Value>,
) -> Result<(), SettingsError> {
    use serde_json::Value as Json;
    match node {
        // An absent option does not override lower layers.
        Json::Null => Ok(()),
        Json::Object(map) => {
            for (field, child) in map {
                let key = if path.is_empty() {
                    canon(field)
                } else {
                    format!("{path}.{}", canon(field))
                };
                flatten(child, key, out)?;
            }
            Ok(())
        }
        leaf => {
            let value = convert(leaf, &path)?;
            out.insert(path, value);
            Ok(())
        }
    }
}

fn convert(leaf: &serde_json::Value, key: &str) -> Result<Value, SettingsError> {
    use serde_json::Value as Json;
    match leaf {
        Json::Bool(b) => Ok(Value::Bool(*b)),
        Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::Int(i))
            } else if let Some(f) = n.as_f64() {
                Ok(Value::Float(f))
            } else {
                Err(SettingsError::InvalidValue {
                    key: key.to_string(),
                    reason: format!("number {n} does not fit a setting value"),
                })
            }
        }
        Json::String(s) => Ok(Value::Str(s.clone())),
        Json::Array(items) => {
            let converted = items
                .iter()
                .map(|item| convert(item, key))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::List(converted))
        }
        Json::Null | Json::Object(_) => Err(SettingsError::InvalidValue {
            key: key.to_string(),
            reason: "nested containers are not valid option values".into(),
        }),
    }
}
