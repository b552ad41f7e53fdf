use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ChartError, ChartResult};

/// Declarative chart configuration snapshot.
///
/// The wrapped value is always a JSON object. Structural edits go through
/// `merged_with` / `with_field`, which return new snapshots so the caller's
/// copy is never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct ChartOption(Value);

impl ChartOption {
    #[must_use]
    pub fn new() -> Self {
        Self(Value::Object(Map::new()))
    }

    pub fn from_value(value: Value) -> ChartResult<Self> {
        if !value.is_object() {
            return Err(ChartError::InvalidData(
                "chart option must be a JSON object".to_owned(),
            ));
        }
        Ok(Self(value))
    }

    pub fn from_json_str(input: &str) -> ChartResult<Self> {
        let value: Value = serde_json::from_str(input)
            .map_err(|e| ChartError::InvalidData(format!("failed to parse chart option: {e}")))?;
        Self::from_value(value)
    }

    pub fn to_json_pretty(&self) -> ChartResult<String> {
        serde_json::to_string_pretty(&self.0).map_err(|e| {
            ChartError::InvalidData(format!("failed to serialize chart option: {e}"))
        })
    }

    #[must_use]
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    #[must_use]
    pub fn into_value(self) -> Value {
        self.0
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// JSON-pointer lookup, e.g. `/series/0/data`.
    #[must_use]
    pub fn pointer(&self, pointer: &str) -> Option<&Value> {
        self.0.pointer(pointer)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.as_object().is_none_or(Map::is_empty)
    }

    /// Returns a copy with `key` set to `value`.
    #[must_use]
    pub fn with_field(&self, key: &str, value: Value) -> Self {
        let mut next = self.0.clone();
        if let Some(object) = next.as_object_mut() {
            object.insert(key.to_owned(), value);
        }
        Self(next)
    }

    /// Returns the result of merging `patch` on top of this snapshot.
    ///
    /// Objects merge key by key. Arrays whose patch elements are all objects
    /// merge element-wise by index (the way component lists such as `series`
    /// are matched); any other value is replaced.
    #[must_use]
    pub fn merged_with(&self, patch: &ChartOption) -> Self {
        let mut next = self.0.clone();
        merge_value(&mut next, &patch.0);
        Self(next)
    }
}

impl Default for ChartOption {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<Value> for ChartOption {
    type Error = ChartError;

    fn try_from(value: Value) -> ChartResult<Self> {
        Self::from_value(value)
    }
}

impl From<ChartOption> for Value {
    fn from(option: ChartOption) -> Self {
        option.0
    }
}

pub(crate) fn merge_value(base: &mut Value, patch: &Value) {
    match (base, patch) {
        (Value::Object(base_map), Value::Object(patch_map)) => {
            for (key, patch_value) in patch_map {
                match base_map.get_mut(key) {
                    Some(existing) => merge_value(existing, patch_value),
                    None => {
                        base_map.insert(key.clone(), patch_value.clone());
                    }
                }
            }
        }
        (Value::Array(base_items), Value::Array(patch_items))
            if !patch_items.is_empty() && patch_items.iter().all(Value::is_object) =>
        {
            for (index, patch_item) in patch_items.iter().enumerate() {
                match base_items.get_mut(index) {
                    Some(existing) if existing.is_object() => merge_value(existing, patch_item),
                    Some(existing) => *existing = patch_item.clone(),
                    None => base_items.push(patch_item.clone()),
                }
            }
        }
        (slot, patch) => *slot = patch.clone(),
    }
}
