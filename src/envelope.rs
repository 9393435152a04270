use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};

/// Payload carried over the shared inbound callback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Envelope {
    Result {
        token: String,
        #[serde(default)]
        value: JsonValue,
    },
    Event {
        id: String,
        #[serde(rename = "eventKind")]
        event_kind: String,
        #[serde(default)]
        fields: JsonMap<String, JsonValue>,
    },
}

impl Envelope {
    pub fn parse(payload: &str) -> serde_json::Result<Self> {
        serde_json::from_str(payload)
    }
}
