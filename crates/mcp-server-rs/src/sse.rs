use std::{collections::HashMap, sync::Arc};

use axum::{
    Json,
    body::Bytes,
    extract::{DefaultBodyLimit, Query, State},
    http::StatusCode,
    response::{
        Sse,
        sse::{Event, KeepAlive},
    },
    routing::{get, post},
};
use futures::Stream;
use serde_json::{Value, json};
use tokio::{
    io,
    sync::{RwLock, mpsc, oneshot},
};
use tokio_stream::{StreamExt, once, wrappers::UnboundedReceiverStream};

use crate::{
    core::{
        protocol::message::JsonRpcMessage,
        utils::{CleanupStream, parse_json_rpc_message},
    },
    router::{Router, RouterService},
    server::Server,
    transport::SseTransport,
};

pub const SSE_PATH: &str = "/sse";
pub const MESSAGES_PATH: &str = "/messages";
pub const HEALTH_PATH: &str = "/health";

const BODY_BYTES_LIMIT: usize = 1 << 22;

pub type SessionId = Arc<str>;
type SessionSender = mpsc::UnboundedSender<JsonRpcMessage>;

fn session_id() -> SessionId {
    Arc::from(format!("{:016x}", rand::random::<u128>()))
}

/// Open SSE sessions, keyed by the id handed out in the `endpoint` event.
/// A POST is delivered only to the session named in its query string.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<SessionId, SessionSender>>>,
}

impl SessionRegistry {
    pub async fn insert(&self, id: SessionId, sender: SessionSender) {
        self.sessions.write().await.insert(id, sender);
    }

    pub async fn remove(&self, id: &str) {
        self.sessions.write().await.remove(id);
    }

    pub async fn get(&self, id: &str) -> Option<SessionSender> {
        self.sessions.read().await.get(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

/// HTTP front end for one [`Router`]: `GET /sse` opens a session,
/// `POST /messages?sessionId=..` feeds it.
#[derive(Clone)]
pub struct SseApp<R> {
    router: R,
    sessions: SessionRegistry,
}

impl<R> SseApp<R>
where
    R: Router + Clone + 'static,
{
    pub fn new(router: R) -> Self {
        Self {
            router,
            sessions: SessionRegistry::default(),
        }
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn into_router(self) -> axum::Router {
        axum::Router::new()
            .route(SSE_PATH, get(sse_handler::<R>))
            .route(MESSAGES_PATH, post(post_handler::<R>))
            .route(HEALTH_PATH, get(health_handler::<R>))
            .layer(DefaultBodyLimit::max(BODY_BYTES_LIMIT))
            .with_state(self)
    }
}

async fn sse_handler<R>(
    State(app): State<SseApp<R>>,
) -> Sse<impl Stream<Item = Result<Event, io::Error>>>
where
    R: Router + Clone + 'static,
{
    let session = session_id();
    tracing::info!(%session, "new SSE connection");

    let (to_client_tx, to_client_rx) = mpsc::unbounded_channel::<JsonRpcMessage>();
    let (to_server_tx, to_server_rx) = mpsc::unbounded_channel::<JsonRpcMessage>();
    app.sessions.insert(session.clone(), to_server_tx).await;

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let session_for_task = session.clone();
    let sessions = app.sessions.clone();
    let router = app.router.clone();

    tokio::spawn(async move {
        let transport = SseTransport::new(to_client_tx, to_server_rx);
        let server = Server::new(RouterService(router));

        let result = tokio::select! {
            res = server.run(transport) => {
                tracing::info!(%session_for_task, "server.run completed");
                res
            },
            _ = shutdown_rx => {
                tracing::info!(%session_for_task, "client disconnected, cleaning up");
                Ok(())
            }
        };

        sessions.remove(&session_for_task).await;

        if let Err(e) = result {
            tracing::error!(?e, "server run error");
        }
    });

    let init_event = Event::default()
        .event("endpoint")
        .data(format!("{MESSAGES_PATH}?sessionId={session}"));
    let init_stream = once(Ok::<Event, io::Error>(init_event));

    let message_stream = UnboundedReceiverStream::new(to_client_rx).map(|msg| {
        serde_json::to_string(&msg)
            .map(|json| Event::default().event("message").data(json))
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    });

    let stream = CleanupStream::new(init_stream.chain(message_stream), shutdown_tx);

    Sse::new(stream).keep_alive(KeepAlive::default())
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostQuery {
    pub session_id: String,
}

async fn post_handler<R>(
    State(app): State<SseApp<R>>,
    Query(PostQuery { session_id }): Query<PostQuery>,
    body: Bytes,
) -> Result<StatusCode, StatusCode>
where
    R: Router + Clone + 'static,
{
    let sender = app
        .sessions
        .get(&session_id)
        .await
        .ok_or(StatusCode::NOT_FOUND)?;

    let data = String::from_utf8(body.to_vec()).map_err(|_| StatusCode::BAD_REQUEST)?;
    let msg = parse_json_rpc_message(&data).map_err(|e| {
        tracing::warn!(%session_id, error = %e, "Rejected message");
        StatusCode::BAD_REQUEST
    })?;

    sender.send(msg).map_err(|_| StatusCode::GONE)?;
    Ok(StatusCode::ACCEPTED)
}

async fn health_handler<R>(State(app): State<SseApp<R>>) -> Json<Value>
where
    R: Router + Clone + 'static,
{
    Json(json!({
        "status": "ok",
        "service": app.router.name(),
        "sessions": app.sessions.len().await,
    }))
}
