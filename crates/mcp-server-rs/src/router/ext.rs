use async_trait::async_trait;
use serde::Serialize;

use crate::{
    core::{
        CallToolResult, ToolCall,
        content::Content,
        protocol::{
            constants::{INVALID_PARAMS, PROTOCOL_VERSION},
            error::ErrorData,
            message::{JsonRpcRequest, JsonRpcResponse, RequestId},
            result::{EmptyResult, Implementation, InitializeResult, ListToolsResult},
        },
    },
    error::{Error, Result},
    router::traits::Router,
};

/// JSON-RPC method handlers shared by every [`Router`].
#[async_trait]
pub trait RouterExt: Router {
    fn respond<T: Serialize + Send>(
        &self,
        id: Option<RequestId>,
        result: T,
    ) -> Result<JsonRpcResponse> {
        let value = serde_json::to_value(result)?;
        Ok(JsonRpcResponse::with_result(id, value))
    }

    async fn handle_initialize(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse> {
        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: self.capabilities(),
            server_info: Implementation {
                name: self.name(),
                version: self.version(),
            },
            instructions: Some(self.instructions()),
        };
        self.respond(req.id, result)
    }

    async fn handle_ping(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse> {
        self.respond(req.id, EmptyResult {})
    }

    async fn handle_tools_list(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse> {
        let result = ListToolsResult {
            tools: self.list_tools(),
            next_cursor: None,
        };
        self.respond(req.id, result)
    }

    async fn handle_tools_call(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse> {
        let params = req
            .params
            .ok_or_else(|| Error::InvalidParameters("Missing tools/call params".into()))?;
        let call: ToolCall = serde_json::from_value(params)
            .map_err(|e| Error::InvalidParameters(format!("Invalid tools/call params: {e}")))?;

        if !self.list_tools().iter().any(|t| t.name == call.name) {
            return Ok(JsonRpcResponse::with_error(
                req.id,
                ErrorData::new(INVALID_PARAMS, format!("Tool {} not found", call.name)),
            ));
        }

        tracing::info!(tool = %call.name, "Calling tool");
        let result = match self.call_tool(&call.name, call.arguments).await {
            Ok(content) => CallToolResult::success(content),
            Err(e) => {
                if e.is_invalid_input() {
                    tracing::warn!(tool = %call.name, error = %e, "Tool call rejected");
                } else {
                    tracing::error!(tool = %call.name, error = %e, "Tool call failed");
                }
                CallToolResult::error(vec![Content::text(e.to_string())])
            }
        };
        self.respond(req.id, result)
    }
}

impl<R: Router> RouterExt for R {}
