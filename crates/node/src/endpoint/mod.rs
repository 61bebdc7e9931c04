//! chord-node service: websocket endpoint of the hosted members.
#![warn(missing_docs)]
mod http_error;
mod ws;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::extract::Path;
use axum::extract::Query;
use axum::extract::State;
use axum::extract::WebSocketUpgrade;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Json;
use axum::Router;
use serde::Deserialize;
use serde::Serialize;

use self::http_error::HttpError;
use crate::prelude::DHTInspect;
use crate::prelude::KeyedOperation;
use crate::prelude::NodeRef;
use crate::processor::Processor;

/// Shared state of the handlers.
#[derive(Clone)]
pub struct EndpointState {
    processor: Arc<Processor>,
}

/// Routes of the endpoint:
/// * `/node/:id/receive`, websocket carrying envelopes for the member `id`.
/// * `/status`, routing state of every member.
/// * `/lookup/:key`, owner of `key` as seen by the first member.
/// * `/api/get?key=` and `/api/put?key=&value=`, keyed operations routed to the owner.
pub fn router(processor: Arc<Processor>) -> Router {
    let state = Arc::new(EndpointState { processor });
    Router::new()
        .route("/node/:id/receive", get(ws_handler))
        .route("/status", get(status_handler))
        .route("/lookup/:key", get(lookup_handler))
        .route("/api/get", get(get_handler))
        .route("/api/put", get(put_handler))
        .layer(axum::middleware::from_fn(node_info_header))
        .with_state(state)
}

/// Listen on the configured address, then start the members.
/// Returns when the server stops, after stopping stabilization.
pub async fn run_endpoint(processor: Arc<Processor>) -> anyhow::Result<()> {
    let binding_addr: SocketAddr = processor.bind_addr().parse()?;
    let server = axum::Server::try_bind(&binding_addr)?
        .serve(router(processor.clone()).into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal());

    println!("WebSocket endpoint: ws://{binding_addr}/node/<id>/receive");
    let server = tokio::spawn(server);
    processor.start().await?;
    for node in processor.nodes() {
        println!("Member: {}", node.node_ref());
    }

    server.await??;
    processor.stop()?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

async fn node_info_header<B>(
    req: axum::http::Request<B>,
    next: axum::middleware::Next<B>,
) -> axum::response::Response {
    let mut res = next.run(req).await;
    let headers = res.headers_mut();

    if let Ok(version) = axum::http::HeaderValue::from_str(crate::util::build_version().as_str())
    {
        headers.insert("X-NODE-VERSION", version);
    }
    res
}

async fn status_handler(
    State(state): State<Arc<EndpointState>>,
) -> Result<Json<Vec<DHTInspect>>, HttpError> {
    Ok(Json(state.processor.inspect()?))
}

async fn lookup_handler(
    State(state): State<Arc<EndpointState>>,
    Path(key): Path<String>,
) -> Result<Json<NodeRef>, HttpError> {
    Ok(Json(state.processor.lookup(&key)?))
}

/// Query of `/api/get` and `/api/put`.
#[derive(Debug, Clone, Deserialize)]
pub struct KeyedQuery {
    key: String,
    #[serde(default)]
    value: Option<String>,
}

/// Answer of `/api/get` and `/api/put`. Delivery is fire-and-forget, so this only
/// names the member the operation was routed to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyedResponse {
    /// The key before hashing.
    pub key: String,
    /// Owner of the key when the operation left this process.
    pub owner: NodeRef,
}

async fn get_handler(
    State(state): State<Arc<EndpointState>>,
    Query(query): Query<KeyedQuery>,
) -> Result<Json<KeyedResponse>, HttpError> {
    let owner = state
        .processor
        .send_keyed(KeyedOperation::Get {
            key: query.key.clone(),
        })
        .await?;
    Ok(Json(KeyedResponse {
        key: query.key,
        owner,
    }))
}

async fn put_handler(
    State(state): State<Arc<EndpointState>>,
    Query(query): Query<KeyedQuery>,
) -> Result<Json<KeyedResponse>, HttpError> {
    let value = query.value.ok_or(HttpError::BadRequest)?;
    let owner = state
        .processor
        .send_keyed(KeyedOperation::Put {
            key: query.key.clone(),
            value: value.into(),
        })
        .await?;
    Ok(Json(KeyedResponse {
        key: query.key,
        owner,
    }))
}

async fn ws_handler(
    State(state): State<Arc<EndpointState>>,
    Path(id): Path<String>,
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> impl IntoResponse {
    tracing::info!("ws connected to /node/{}/receive, remote: {}", id, addr);
    ws.on_upgrade(move |socket| self::ws::handle_socket(state, socket, id))
}
