use async_trait::async_trait;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

use crate::{
    core::protocol::message::JsonRpcMessage,
    error::{Error, Result},
    transport::traits::ServerTransport,
};

/// One SSE session seen from the server loop: messages POSTed by the client
/// arrive on `receiver`, responses go out through `sender` to the event stream.
pub struct SseTransport {
    sender: UnboundedSender<JsonRpcMessage>,
    receiver: UnboundedReceiver<JsonRpcMessage>,
}

impl SseTransport {
    pub fn new(
        sender: UnboundedSender<JsonRpcMessage>,
        receiver: UnboundedReceiver<JsonRpcMessage>,
    ) -> Self {
        Self { sender, receiver }
    }
}

#[async_trait]
impl ServerTransport for SseTransport {
    async fn write_message(&mut self, msg: JsonRpcMessage) -> Result<()> {
        self.sender.send(msg).map_err(|_| Error::ChannelClosed)
    }

    async fn read_message(&mut self) -> Option<Result<JsonRpcMessage>> {
        self.receiver.recv().await.map(Ok)
    }

    async fn close(&mut self) -> Result<()> {
        self.receiver.close();
        Ok(())
    }
}
