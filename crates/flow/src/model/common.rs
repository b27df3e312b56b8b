//! Types shared across requests, events and decisions

use serde::{Deserialize, Serialize};

/// `(name, version)` key under which a workflow handler is registered
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkflowType {
    pub name: String,
    pub version: String,
}

impl WorkflowType {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

/// `(name, version)` key under which an activity handler is registered
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActivityType {
    pub name: String,
    pub version: String,
}

impl ActivityType {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

/// Named FIFO channel on the service
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskList {
    pub name: String,
}

impl TaskList {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Identifies one run of a workflow
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowExecution {
    pub workflow_id: String,
    pub run_id: String,
}

/// Serde support for timeouts carried as base-10 second strings
///
/// The service rejects JSON numbers for timeouts. `"NONE"` means no timeout
/// and reads back as `None`.
pub(crate) mod timeout_seconds {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<u64>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(secs) => serializer.serialize_str(&secs.to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            None => Ok(None),
            Some(s) if s.eq_ignore_ascii_case("NONE") => Ok(None),
            Some(s) => s.parse().map(Some).map_err(D::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Timeouts {
        #[serde(
            default,
            skip_serializing_if = "Option::is_none",
            with = "timeout_seconds"
        )]
        timeout: Option<u64>,
    }

    #[test]
    fn test_timeout_written_as_string() {
        let value = serde_json::to_value(Timeouts { timeout: Some(300) }).unwrap();
        assert_eq!(value, json!({"timeout": "300"}));
    }

    #[test]
    fn test_absent_timeout_omitted() {
        let value = serde_json::to_value(Timeouts { timeout: None }).unwrap();
        assert_eq!(value, json!({}));
    }

    #[test]
    fn test_none_timeout_parsed() {
        let parsed: Timeouts = serde_json::from_value(json!({"timeout": "NONE"})).unwrap();
        assert_eq!(parsed.timeout, None);

        let parsed: Timeouts = serde_json::from_value(json!({})).unwrap();
        assert_eq!(parsed.timeout, None);
    }

    #[test]
    fn test_invalid_timeout_rejected() {
        assert!(serde_json::from_value::<Timeouts>(json!({"timeout": "soon"})).is_err());
    }

    #[test]
    fn test_workflow_execution_wire_names() {
        let execution = WorkflowExecution {
            workflow_id: "order-1".to_string(),
            run_id: "run-9".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&execution).unwrap(),
            json!({"workflowId": "order-1", "runId": "run-9"})
        );
    }
}
