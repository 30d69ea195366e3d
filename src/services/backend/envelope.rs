// JSON-RPC envelope
// Request body and reply classification shared by every booking call

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{BusinessError, ClientError, ClientResult};

pub const RPC_VERSION: &str = "1.1";

#[derive(Debug, Serialize)]
pub struct RpcRequest<'a> {
    pub version: &'static str,
    pub method: &'a str,
    pub params: &'a Value,
}

impl<'a> RpcRequest<'a> {
    pub fn new(method: &'a str, params: &'a Value) -> Self {
        Self {
            version: RPC_VERSION,
            method,
            params,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub result: Value,
    #[serde(default)]
    pub error: Value,
}

/// Result payload of a reply, or the error it carries.
///
/// A non-null `error` is a transport failure; a result flagged as an error
/// is a business refusal.
pub fn unwrap_reply(response: RpcResponse) -> ClientResult<Value> {
    if !response.error.is_null() {
        return Err(ClientError::Transport(error_text(&response.error)));
    }
    check_business(&response.result)?;
    Ok(response.result)
}

pub fn check_business(result: &Value) -> ClientResult<()> {
    if result.get("_type").and_then(Value::as_str) == Some("CSSanitizationError") {
        let invalid_fields = result
            .get("invalidFields")
            .and_then(Value::as_array)
            .map(|fields| {
                fields
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        return Err(ClientError::Business(BusinessError::Sanitization { invalid_fields }));
    }

    if result.get("error").and_then(Value::as_bool) == Some(true) {
        let text = |key: &str| {
            result
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        let mut message = text("errorMessage");
        if message.is_empty() {
            message = "Unknown error".to_string();
        }
        return Err(ClientError::Business(BusinessError::rejected(text("origin"), message)));
    }

    Ok(())
}

pub fn decode<T: DeserializeOwned>(value: Value) -> ClientResult<T> {
    Ok(serde_json::from_value(value)?)
}

fn error_text(error: &Value) -> String {
    match error {
        Value::String(text) => text.clone(),
        Value::Object(map) => map
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string()),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::booking::Booking;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_request_body() {
        let params = json!({"conference": "12", "bookingId": "7"});
        let body = serde_json::to_value(RpcRequest::new("collaboration.startCSBooking", &params)).unwrap();
        assert_eq!(
            body,
            json!({
                "version": "1.1",
                "method": "collaboration.startCSBooking",
                "params": {"conference": "12", "bookingId": "7"}
            })
        );
    }

    #[test]
    fn test_transport_error() {
        let response = RpcResponse {
            result: Value::Null,
            error: json!({"code": "ERR-P0", "message": "Not logged in"}),
        };
        match unwrap_reply(response) {
            Err(ClientError::Transport(text)) => assert_eq!(text, "Not logged in"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_business_rejection() {
        let result = json!({"error": true, "origin": "create", "errorMessage": "Room is busy"});
        let err = check_business(&result).unwrap_err();
        assert_eq!(
            err.business(),
            Some(&BusinessError::rejected("create", "Room is busy"))
        );
    }

    #[test]
    fn test_sanitization_rejection() {
        let result = json!({"error": true, "_type": "CSSanitizationError", "invalidFields": ["roomName"]});
        let err = check_business(&result).unwrap_err();
        assert_eq!(
            err.business(),
            Some(&BusinessError::Sanitization {
                invalid_fields: vec!["roomName".to_string()]
            })
        );
    }

    #[test]
    fn test_success_decodes_booking() {
        let response: RpcResponse =
            serde_json::from_str(r#"{"result": {"id": "7", "type": "Vidyo"}, "error": null}"#).unwrap();
        let booking: Booking = decode(unwrap_reply(response).unwrap()).unwrap();
        assert_eq!(booking.id, "7");
    }
}
