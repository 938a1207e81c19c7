//! Feed wire messages.

use crate::error::{WsError, WsResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Market channel subscription request (client -> server).
///
/// One request is sent per market identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscribeRequest {
    #[serde(rename = "type")]
    pub request_type: String,
    pub channel: String,
    pub market: String,
}

impl SubscribeRequest {
    pub fn market(market: impl Into<String>) -> Self {
        Self {
            request_type: "subscribe".to_string(),
            channel: "market".to_string(),
            market: market.into(),
        }
    }

    pub fn to_json(&self) -> WsResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Parsed server payload, forwarded to listeners without schema validation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct UpdateEvent(Value);

impl UpdateEvent {
    pub fn new(payload: Value) -> Self {
        Self(payload)
    }

    pub fn payload(&self) -> &Value {
        &self.0
    }

    pub fn into_payload(self) -> Value {
        self.0
    }
}

/// Parse a text frame into an update event.
pub fn parse_update(text: &str) -> WsResult<UpdateEvent> {
    serde_json::from_str(text)
        .map(UpdateEvent)
        .map_err(|e| WsError::ParseError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_subscribe_request_wire_format() {
        let req = SubscribeRequest::market("0xabc");
        let value: Value = serde_json::from_str(&req.to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({"type": "subscribe", "channel": "market", "market": "0xabc"})
        );
    }

    #[test]
    fn test_parse_update_passthrough() {
        let event = parse_update(r#"{"event_type":"price_change","market":"0xabc","price":"0.51"}"#)
            .unwrap();
        assert_eq!(event.payload()["market"], "0xabc");

        // Arrays and scalars are forwarded as-is
        assert_eq!(parse_update("[1,2]").unwrap().into_payload(), json!([1, 2]));
    }

    #[test]
    fn test_parse_update_rejects_malformed() {
        assert!(matches!(parse_update("PONG"), Err(WsError::ParseError(_))));
        assert!(matches!(parse_update("{\"a\":"), Err(WsError::ParseError(_))));
    }

    #[test]
    fn test_update_event_serializes_transparently() {
        let event = UpdateEvent::new(json!({"k": 1}));
        assert_eq!(serde_json::to_string(&event).unwrap(), r#"{"k":1}"#);
    }
}
