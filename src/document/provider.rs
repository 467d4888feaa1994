//! Provider records
//!
//! A record keeps every key it was read with, in file order. The managed
//! fields are written back into their original slots, so an untouched record
//! serializes to the same text it was parsed from.

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const NAME_KEY: &str = "name";
const BASE_URL_KEY: &str = "api_base_url";
const API_KEY_KEY: &str = "api_key";
const MODELS_KEY: &str = "models";

/// A named upstream endpoint with its model catalog
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderRecord {
    pub name: String,

    pub api_base_url: String,

    /// Absent means no auth header is sent
    pub api_key: Option<String>,

    /// Set semantics, first-insertion order
    pub models: Vec<String>,

    /// Every key as read, including ones this tool does not manage
    /// (e.g. `transformer`). Empty for records built in code.
    layout: Map<String, Value>,
}

/// The managed subset; unknown keys are ignored here and kept in `layout`
#[derive(Deserialize)]
struct ManagedFields {
    name: String,
    api_base_url: String,
    #[serde(default)]
    api_key: Option<String>,
    #[serde(default)]
    models: Vec<String>,
}

impl<'de> Deserialize<'de> for ProviderRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let layout = Map::deserialize(deserializer)?;
        let fields: ManagedFields =
            serde_json::from_value(Value::Object(layout.clone())).map_err(de::Error::custom)?;
        Ok(Self {
            name: fields.name,
            api_base_url: fields.api_base_url,
            api_key: fields.api_key,
            models: fields.models,
            layout,
        })
    }
}

impl Serialize for ProviderRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_map().serialize(serializer)
    }
}

impl ProviderRecord {
    pub fn new(name: impl Into<String>, api_base_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            api_base_url: api_base_url.into(),
            api_key: None,
            models: Vec::new(),
            layout: Map::new(),
        }
    }

    /// Attach an API key; empty strings are treated as no key
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|k| !k.is_empty());
        self
    }

    /// Existing keys are overwritten in place; new ones are appended.
    fn to_map(&self) -> Map<String, Value> {
        let mut map = self.layout.clone();
        let fresh = self.layout.is_empty();

        map.insert(NAME_KEY.to_string(), Value::String(self.name.clone()));
        map.insert(BASE_URL_KEY.to_string(), Value::String(self.api_base_url.clone()));

        match &self.api_key {
            Some(key) => {
                map.insert(API_KEY_KEY.to_string(), Value::String(key.clone()));
            }
            // A key cleared in code is dropped; a null read from the file stays
            None => {
                if matches!(map.get(API_KEY_KEY), Some(Value::String(_))) {
                    map.shift_remove(API_KEY_KEY);
                }
            }
        }

        // Records built in code always carry the list; parsed records only
        // gain it once they have models
        if fresh || map.contains_key(MODELS_KEY) || !self.models.is_empty() {
            let models = self.models.iter().cloned().map(Value::String).collect();
            map.insert(MODELS_KEY.to_string(), Value::Array(models));
        }
        map
    }

    pub fn has_model(&self, model: &str) -> bool {
        self.models.iter().any(|m| m == model)
    }

    /// Append unless present. Returns true if the model was inserted.
    pub fn insert_model(&mut self, model: impl Into<String>) -> bool {
        let model = model.into();
        if self.has_model(&model) {
            return false;
        }
        self.models.push(model);
        true
    }

    /// Remove a model, keeping the order of the rest. Returns true if found.
    pub fn remove_model(&mut self, model: &str) -> bool {
        let before = self.models.len();
        self.models.retain(|m| m != model);
        self.models.len() != before
    }
}
