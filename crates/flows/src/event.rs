use flowbridge_core::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const SPECVERSION: &str = "1.0";
pub const RESULT_EVENT_TYPE: &str = "dev.flowbridge.flow.execute.result.v1";
pub const RESULT_EVENT_SOURCE: &str = "flowbridge-gateway";

/// A CloudEvents envelope as delivered to the dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudEvent {
    pub id: String,
    pub source: String,
    pub specversion: String,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub data: Value,
}

/// The dispatch payload inside an execute event.
#[derive(Debug, Clone, Deserialize)]
pub struct DispatchData {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tweaks: Value,
    #[serde(default = "default_inputs")]
    pub inputs: Value,
}

fn default_inputs() -> Value {
    json!({ "input": "" })
}

impl CloudEvent {
    /// Structured mode: the whole envelope is the JSON body.
    pub fn from_json(body: &[u8]) -> Result<Self> {
        serde_json::from_slice(body)
            .map_err(|e| Error::Validation(format!("malformed event envelope: {}", e)))
    }

    /// Binary mode: attributes travel as `ce-*` headers, the body is the data.
    pub fn from_binary(
        id: Option<&str>,
        source: Option<&str>,
        specversion: Option<&str>,
        event_type: Option<&str>,
        body: &[u8],
    ) -> Result<Self> {
        let required = |value: Option<&str>, header: &str| -> Result<String> {
            value
                .map(str::to_string)
                .ok_or_else(|| Error::Validation(format!("missing event attribute: {}", header)))
        };

        let data = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(body)
                .map_err(|e| Error::Validation(format!("malformed event data: {}", e)))?
        };

        Ok(Self {
            id: required(id, "ce-id")?,
            source: required(source, "ce-source")?,
            specversion: required(specversion, "ce-specversion")?,
            event_type: required(event_type, "ce-type")?,
            data,
        })
    }

    /// Reject any event whose type is not the expected constant.
    pub fn expect_type(&self, expected: &str) -> Result<()> {
        if self.event_type != expected {
            return Err(Error::Validation(format!(
                "invalid event type '{}', expected '{}'",
                self.event_type, expected
            )));
        }
        Ok(())
    }

    pub fn dispatch_data(&self) -> Result<DispatchData> {
        serde_json::from_value(self.data.clone())
            .map_err(|e| Error::Validation(format!("malformed dispatch data: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structured_parse() {
        let body = br#"{
            "id": "evt-1",
            "source": "scheduler",
            "specversion": "1.0",
            "type": "dev.flowbridge.flow.execute.v1",
            "data": { "name": "daily-report", "inputs": { "input": "go" } }
        }"#;
        let event = CloudEvent::from_json(body).unwrap();
        assert_eq!(event.id, "evt-1");
        assert_eq!(event.event_type, "dev.flowbridge.flow.execute.v1");

        let data = event.dispatch_data().unwrap();
        assert_eq!(data.name, "daily-report");
        assert_eq!(data.inputs["input"], "go");
    }

    #[test]
    fn test_binary_parse() {
        let event = CloudEvent::from_binary(
            Some("evt-2"),
            Some("curl"),
            Some("1.0"),
            Some("dev.flowbridge.flow.execute.v1"),
            br#"{ "name": "daily-report" }"#,
        )
        .unwrap();
        assert_eq!(event.source, "curl");
        assert_eq!(event.dispatch_data().unwrap().name, "daily-report");
    }

    #[test]
    fn test_binary_missing_attribute() {
        let err = CloudEvent::from_binary(Some("evt"), None, Some("1.0"), Some("t"), b"")
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_expect_type() {
        let event = CloudEvent {
            id: "e".to_string(),
            source: "s".to_string(),
            specversion: SPECVERSION.to_string(),
            event_type: "something.else".to_string(),
            data: Value::Null,
        };
        assert!(event.expect_type("dev.flowbridge.flow.execute.v1").is_err());
        assert!(event.expect_type("something.else").is_ok());
    }

    #[test]
    fn test_dispatch_data_defaults() {
        let event = CloudEvent::from_json(
            br#"{ "id": "e", "source": "s", "specversion": "1.0",
                  "type": "t", "data": { "name": "n" } }"#,
        )
        .unwrap();
        let data = event.dispatch_data().unwrap();
        assert_eq!(data.tweaks, Value::Null);
        assert_eq!(data.inputs, json!({ "input": "" }));
    }
}
