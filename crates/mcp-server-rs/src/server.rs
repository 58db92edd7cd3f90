use tokio::sync::mpsc;
use tower_service::Service;

use crate::{
    core::protocol::{
        constants::{INTERNAL_ERROR, INVALID_REQUEST, JSONRPC_EXPECTED_VERSION, PARSE_ERROR},
        error::ErrorData,
        message::{JsonRpcError, JsonRpcMessage, JsonRpcRequest, JsonRpcResponse},
    },
    error::{BoxError, Error, Result},
    transport::traits::ServerTransport,
};

pub struct Server<S> {
    service: S,
}

impl<S> Server<S>
where
    S: Service<JsonRpcRequest, Response = JsonRpcResponse> + Clone + Send + 'static,
    S::Error: Into<BoxError> + 'static,
    S::Future: Send + 'static,
{
    pub fn new(service: S) -> Self {
        Self { service }
    }

    /// Serves one session until the transport yields no more messages and
    /// every request already read has been answered.
    ///
    /// Each request runs on its own task against a clone of the service, so
    /// a slow tool call does not hold up later requests. Responses are
    /// written in completion order.
    pub async fn run(self, mut transport: impl ServerTransport) -> Result<()> {
        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<JsonRpcResponse>();
        // dropped once the transport is drained so `done_rx` can close
        let mut done_tx = Some(done_tx);

        tracing::info!("Server started");
        loop {
            tokio::select! {
                msg = transport.read_message(), if done_tx.is_some() => match msg {
                    Some(Ok(msg)) => {
                        if let Some(tx) = &done_tx {
                            self.dispatch(msg, tx);
                        }
                    }
                    Some(Err(e)) => Self::handle_error(&mut transport, e).await?,
                    None => {
                        tracing::info!("Server transport closed, finishing in-flight requests");
                        done_tx = None;
                    }
                },
                Some(response) = done_rx.recv() => {
                    Self::send_response(&mut transport, response).await?;
                }
                else => break,
            }
        }
        tracing::info!("Server run loop exited");

        transport.close().await
    }

    fn dispatch(&self, msg: JsonRpcMessage, done_tx: &mpsc::UnboundedSender<JsonRpcResponse>) {
        match msg {
            JsonRpcMessage::Request(request) => {
                let mut service = self.service.clone();
                let done_tx = done_tx.clone();
                tokio::spawn(async move {
                    let response = Self::process_request(&mut service, request).await;
                    if done_tx.send(response).is_err() {
                        tracing::warn!("Session ended before response could be sent");
                    }
                });
            }
            JsonRpcMessage::Notification(notification) => {
                tracing::debug!(method = %notification.method, "Received notification");
            }
            JsonRpcMessage::Response(_) | JsonRpcMessage::Nil | JsonRpcMessage::Error(_) => {
                tracing::debug!("Ignoring client response message");
            }
        }
    }

    async fn process_request(service: &mut S, request: JsonRpcRequest) -> JsonRpcResponse {
        let id = request.id.clone();
        let request_json = serde_json::to_string(&request)
            .unwrap_or_else(|_| "Failed to serialize request".to_string());

        tracing::debug!(
            request_id = ?id,
            method = ?request.method,
            json = %request_json,
            "Received request"
        );

        match service.call(request).await {
            Ok(resp) => resp,
            Err(e) => {
                let error_msg = e.into().to_string();
                tracing::error!(error = %error_msg, "Request processing failed");
                JsonRpcResponse::with_error(id, ErrorData::new(INTERNAL_ERROR, error_msg))
            }
        }
    }

    async fn send_response(
        transport: &mut impl ServerTransport,
        response: JsonRpcResponse,
    ) -> Result<()> {
        let response_json = serde_json::to_string(&response)
            .unwrap_or_else(|_| "Failed to serialize response".to_string());

        tracing::debug!(
            response_id = ?response.id,
            json = %response_json,
            "Sending response"
        );

        transport
            .write_message(JsonRpcMessage::Response(response))
            .await
    }

    async fn handle_error(transport: &mut impl ServerTransport, e: Error) -> Result<()> {
        let code = match e {
            Error::Json(_) => PARSE_ERROR,
            Error::InvalidMessage(_) => INVALID_REQUEST,
            _ => INTERNAL_ERROR,
        };

        let error_response = JsonRpcMessage::Error(JsonRpcError {
            jsonrpc: JSONRPC_EXPECTED_VERSION.to_string(),
            id: None,
            error: ErrorData::new(code, e.to_string()),
        });

        transport.write_message(error_response).await
    }
}
