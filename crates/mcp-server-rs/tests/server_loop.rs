use std::time::Duration;

use async_trait::async_trait;
use mcp_server_rs::{
    core::{
        Tool,
        content::Content,
        protocol::{
            capabilities::ServerCapabilities,
            constants::{
                INVALID_PARAMS, INVALID_REQUEST, JSONRPC_EXPECTED_VERSION, METHOD_NOT_FOUND,
                PARSE_ERROR,
            },
            message::{
                JsonRpcMessage, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, RequestId,
            },
        },
    },
    error::{Error, Result},
    router::{CapabilitiesBuilder, Router, RouterService},
    server::Server,
    transport::{ServerTransport, SseTransport},
};
use serde_json::{Value, json};
use tokio::sync::mpsc;

#[derive(Clone)]
struct UpperRouter;

#[async_trait]
impl Router for UpperRouter {
    fn name(&self) -> String {
        "upper".to_string()
    }

    fn instructions(&self) -> String {
        "Upper-cases text".to_string()
    }

    fn capabilities(&self) -> ServerCapabilities {
        CapabilitiesBuilder::new().with_tools(false).build()
    }

    fn list_tools(&self) -> Vec<Tool> {
        vec![Tool::new(
            "upper",
            "Upper-case the given text",
            json!({
                "type": "object",
                "properties": { "text": { "type": "string" } },
                "required": ["text"]
            }),
        )]
    }

    async fn call_tool(&self, _tool_name: &str, arguments: Value) -> Result<Vec<Content>> {
        let text = arguments
            .get("text")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::InvalidParameters("Missing text".into()))?;
        if text == "offline" {
            return Err(Error::Upstream("text service unreachable".into()));
        }
        if let Some(delay) = arguments.get("delay_ms").and_then(|v| v.as_u64()) {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        Ok(vec![Content::text(text.to_uppercase())])
    }
}

struct Harness {
    to_server: mpsc::UnboundedSender<JsonRpcMessage>,
    from_server: mpsc::UnboundedReceiver<JsonRpcMessage>,
}

impl Harness {
    fn start() -> Self {
        let (to_client_tx, from_server) = mpsc::unbounded_channel();
        let (to_server, to_server_rx) = mpsc::unbounded_channel();
        let transport = SseTransport::new(to_client_tx, to_server_rx);
        tokio::spawn(Server::new(RouterService(UpperRouter)).run(transport));
        Self {
            to_server,
            from_server,
        }
    }

    fn send(&self, id: u64, method: &str, params: Option<Value>) {
        let request = JsonRpcRequest::new(Some(RequestId::Number(id)), method, params);
        self.to_server.send(JsonRpcMessage::Request(request)).unwrap();
    }

    async fn next_response(&mut self) -> JsonRpcResponse {
        match self.from_server.recv().await.unwrap() {
            JsonRpcMessage::Response(response) => response,
            other => panic!("expected response, got {other:?}"),
        }
    }

    async fn request(&mut self, id: u64, method: &str, params: Option<Value>) -> JsonRpcResponse {
        self.send(id, method, params);
        self.next_response().await
    }
}

#[tokio::test]
async fn initialize_reports_server_info() {
    let mut h = Harness::start();
    let resp = h.request(1, "initialize", Some(json!({}))).await;
    let result = resp.result.unwrap();
    assert_eq!(resp.id, Some(RequestId::Number(1)));
    assert_eq!(result["serverInfo"]["name"], "upper");
    assert_eq!(result["protocolVersion"], "2024-11-05");
    assert!(result["capabilities"]["tools"].is_object());
}

#[tokio::test]
async fn notifications_get_no_reply() {
    let mut h = Harness::start();
    h.to_server
        .send(JsonRpcMessage::Notification(JsonRpcNotification {
            jsonrpc: "2.0".into(),
            method: "notifications/initialized".into(),
            params: None,
        }))
        .unwrap();
    // the next message out must answer the ping, not the notification
    let resp = h.request(2, "ping", None).await;
    assert_eq!(resp.id, Some(RequestId::Number(2)));
    assert_eq!(resp.result, Some(json!({})));
}

#[tokio::test]
async fn tools_list_and_call() {
    let mut h = Harness::start();
    let list = h.request(1, "tools/list", None).await.result.unwrap();
    assert_eq!(list["tools"][0]["name"], "upper");
    assert!(list["tools"][0]["inputSchema"].is_object());

    let call = h
        .request(
            2,
            "tools/call",
            Some(json!({"name": "upper", "arguments": {"text": "chart"}})),
        )
        .await
        .result
        .unwrap();
    assert_eq!(call["content"][0]["type"], "text");
    assert_eq!(call["content"][0]["text"], "CHART");
    assert!(call.get("isError").is_none());
}

#[tokio::test]
async fn tool_errors_become_error_results() {
    let mut h = Harness::start();
    let call = h
        .request(1, "tools/call", Some(json!({"name": "upper", "arguments": {}})))
        .await
        .result
        .unwrap();
    assert_eq!(call["isError"], true);
    assert!(call["content"][0]["text"].as_str().unwrap().contains("Missing text"));
}

#[tokio::test]
async fn upstream_failures_are_error_results_too() {
    let mut h = Harness::start();
    let resp = h
        .request(
            1,
            "tools/call",
            Some(json!({"name": "upper", "arguments": {"text": "offline"}})),
        )
        .await;
    assert!(resp.error.is_none());
    let call = resp.result.unwrap();
    assert_eq!(call["isError"], true);
    assert!(call["content"][0]["text"].as_str().unwrap().contains("unreachable"));
}

#[tokio::test]
async fn unknown_tool_and_method_are_protocol_errors() {
    let mut h = Harness::start();
    let resp = h
        .request(1, "tools/call", Some(json!({"name": "nope", "arguments": {}})))
        .await;
    assert_eq!(resp.error.unwrap().code, INVALID_PARAMS);

    let resp = h.request(2, "resources/list", None).await;
    let error = resp.error.unwrap();
    assert_eq!(error.code, METHOD_NOT_FOUND);
    assert_eq!(error.message, "Method 'resources/list' not found");
}

#[tokio::test]
async fn slow_tool_call_does_not_block_ping() {
    let mut h = Harness::start();
    h.send(
        1,
        "tools/call",
        Some(json!({"name": "upper", "arguments": {"text": "slow", "delay_ms": 2000}})),
    );
    h.send(2, "ping", None);

    let first = tokio::time::timeout(Duration::from_millis(1000), h.next_response())
        .await
        .expect("ping was held up by the tool call");
    assert_eq!(first.id, Some(RequestId::Number(2)));
    assert_eq!(first.result, Some(json!({})));

    let second = h.next_response().await;
    assert_eq!(second.id, Some(RequestId::Number(1)));
    assert_eq!(second.result.unwrap()["content"][0]["text"], "SLOW");
}

#[tokio::test]
async fn in_flight_requests_are_answered_after_input_closes() {
    let Harness {
        to_server,
        mut from_server,
    } = Harness::start();
    let request = JsonRpcRequest::new(
        Some(RequestId::Number(9)),
        "tools/call",
        Some(json!({"name": "upper", "arguments": {"text": "late", "delay_ms": 100}})),
    );
    to_server.send(JsonRpcMessage::Request(request)).unwrap();
    drop(to_server);

    match from_server.recv().await {
        Some(JsonRpcMessage::Response(resp)) => assert_eq!(resp.id, Some(RequestId::Number(9))),
        other => panic!("expected response, got {other:?}"),
    }
}

/// Replays a fixed list of reads and records every write.
struct ScriptedTransport {
    reads: std::vec::IntoIter<Result<JsonRpcMessage>>,
    writes: mpsc::UnboundedSender<JsonRpcMessage>,
}

#[async_trait]
impl ServerTransport for ScriptedTransport {
    async fn read_message(&mut self) -> Option<Result<JsonRpcMessage>> {
        self.reads.next()
    }

    async fn write_message(&mut self, msg: JsonRpcMessage) -> Result<()> {
        self.writes.send(msg).map_err(|_| Error::ChannelClosed)
    }
}

#[tokio::test]
async fn transport_faults_become_error_messages() {
    let bad_json = serde_json::from_str::<Value>("{").unwrap_err();
    let (writes, mut written) = mpsc::unbounded_channel();
    let transport = ScriptedTransport {
        reads: vec![
            Err(Error::Json(bad_json)),
            Err(Error::InvalidMessage("missing method".into())),
        ]
        .into_iter(),
        writes,
    };
    Server::new(RouterService(UpperRouter))
        .run(transport)
        .await
        .unwrap();

    for expected in [PARSE_ERROR, INVALID_REQUEST] {
        match written.recv().await {
            Some(JsonRpcMessage::Error(err)) => {
                assert_eq!(err.jsonrpc, JSONRPC_EXPECTED_VERSION);
                assert_eq!(err.id, None);
                assert_eq!(err.error.code, expected);
            }
            other => panic!("expected error message, got {other:?}"),
        }
    }
    assert!(written.recv().await.is_none());
}
