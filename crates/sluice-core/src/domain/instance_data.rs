use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::CoreError;

/// One named process variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceData {
    /// Variable name
    pub key: String,

    /// Optional declared type, kept as given by the caller
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,

    /// Variable value
    #[serde(default)]
    pub value: Value,
}

impl InstanceData {
    /// Create an untyped variable
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            data_type: None,
            value,
        }
    }
}

/// Variables keyed by name; later entries win on duplicate keys
pub type InstanceDataMap = BTreeMap<String, InstanceData>;

/// Index a variable list by key
pub fn to_data_map(list: impl IntoIterator<Item = InstanceData>) -> InstanceDataMap {
    list.into_iter().map(|data| (data.key.clone(), data)).collect()
}

/// Flatten a variable map into a list ordered by key
pub fn to_data_list(map: &InstanceDataMap) -> Vec<InstanceData> {
    map.values().cloned().collect()
}

/// Render variables as a JSON object, the input of gateway conditions
pub fn to_json_object(map: &InstanceDataMap) -> Value {
    let object: Map<String, Value> = map
        .iter()
        .map(|(key, data)| (key.clone(), data.value.clone()))
        .collect();
    Value::Object(object)
}

/// One stored snapshot of an instance's variables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceDataSnapshot {
    /// Unique snapshot identifier
    pub instance_data_id: String,

    /// Owning process instance
    pub flow_instance_id: String,

    /// Deployment of the owning instance
    pub flow_deploy_id: String,

    /// Serialized variable list
    pub instance_data: String,

    /// Write time
    pub created_at: DateTime<Utc>,
}

impl InstanceDataSnapshot {
    /// Serialize a variable map into a fresh snapshot
    pub fn new(
        flow_instance_id: impl Into<String>,
        flow_deploy_id: impl Into<String>,
        data: &InstanceDataMap,
    ) -> Result<Self, CoreError> {
        Ok(Self {
            instance_data_id: Uuid::new_v4().to_string(),
            flow_instance_id: flow_instance_id.into(),
            flow_deploy_id: flow_deploy_id.into(),
            instance_data: serde_json::to_string(&to_data_list(data))?,
            created_at: Utc::now(),
        })
    }

    /// Decode the stored variables
    pub fn data_map(&self) -> Result<InstanceDataMap, CoreError> {
        let list: Vec<InstanceData> = serde_json::from_str(&self.instance_data)?;
        Ok(to_data_map(list))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_later_duplicates_win() {
        let map = to_data_map(vec![
            InstanceData::new("x", json!(1)),
            InstanceData::new("y", json!("a")),
            InstanceData::new("x", json!(2)),
        ]);
        assert_eq!(map.len(), 2);
        assert_eq!(to_json_object(&map), json!({"x": 2, "y": "a"}));
    }

    #[test]
    fn test_snapshot_decodes() {
        let mut typed = InstanceData::new("amount", json!(12.5));
        typed.data_type = Some("double".to_string());
        let map = to_data_map(vec![typed.clone()]);

        let snapshot = InstanceDataSnapshot::new("fi-1", "fd-1", &map).unwrap();
        assert!(snapshot.instance_data.contains("\"type\":\"double\""));
        assert_eq!(snapshot.data_map().unwrap().get("amount"), Some(&typed));
    }
}
