pub mod capabilities;
pub mod constants;
pub mod error;
pub mod message;
pub mod result;

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::protocol::message::{JsonRpcMessage, JsonRpcRaw, RequestId};

    #[test]
    fn test_notification_conversion() {
        let raw = JsonRpcRaw {
            jsonrpc: "2.0".to_string(),
            id: None,
            method: Some("notifications/initialized".to_string()),
            params: None,
            result: None,
            error: None,
        };

        let message = JsonRpcMessage::try_from(raw).unwrap();
        match message {
            JsonRpcMessage::Notification(n) => {
                assert_eq!(n.jsonrpc, "2.0");
                assert_eq!(n.method, "notifications/initialized");
                assert!(n.params.is_none());
            }
            _ => panic!("Expected Notification"),
        }
    }

    #[test]
    fn test_request_conversion() {
        let raw = JsonRpcRaw {
            jsonrpc: "2.0".to_string(),
            id: Some(RequestId::Number(1)),
            method: Some("tools/call".to_string()),
            params: Some(json!({"name": "generate_chart"})),
            result: None,
            error: None,
        };

        let message = JsonRpcMessage::try_from(raw).unwrap();
        match message {
            JsonRpcMessage::Request(r) => {
                assert_eq!(r.jsonrpc, "2.0");
                assert_eq!(r.id, Some(RequestId::Number(1)));
                assert_eq!(r.method, "tools/call");
                assert_eq!(r.params.unwrap(), json!({"name": "generate_chart"}));
            }
            _ => panic!("Expected Request"),
        }
    }

    #[test]
    fn test_string_request_id() {
        let message: JsonRpcMessage =
            serde_json::from_value(json!({"jsonrpc": "2.0", "id": "abc-1", "method": "ping"}))
                .unwrap();
        match message {
            JsonRpcMessage::Request(r) => assert_eq!(r.id, Some(RequestId::String("abc-1".into()))),
            _ => panic!("Expected Request"),
        }
    }

    #[test]
    fn test_error_conversion() {
        let message: JsonRpcMessage = serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "id": 7,
            "error": {"code": -32601, "message": "Method 'x' not found"}
        }))
        .unwrap();
        match message {
            JsonRpcMessage::Error(e) => {
                assert_eq!(e.id, Some(RequestId::Number(7)));
                assert_eq!(e.error.code, -32601);
            }
            _ => panic!("Expected Error"),
        }
    }
}
