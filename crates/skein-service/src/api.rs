//! HTTP API
//!
//! Three endpoints: fire-and-forget execution, execution with a
//! server-sent-event progress stream, and the node metadata query.
//!
//! A graph runs on a blocking worker; the progress stream is bridged over
//! a bounded single-producer single-consumer queue. Closing the queue is
//! the completion sentinel, a trailing error record signals failure, and a
//! consumer that goes away trips the run's cancellation token.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{Stream, StreamExt};

use skein_engine::{EngineError, GraphData, GraphExecutor, NodeRegistry, ProgressEvent};

/// Progress records buffered between the worker and the stream writer
const PROGRESS_QUEUE_DEPTH: usize = 256;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<NodeRegistry>,
}

/// Build the API router
pub fn router(registry: Arc<NodeRegistry>) -> Router {
    Router::new()
        .route("/api/execute-graph", post(execute_graph))
        .route(
            "/api/execute-graph-with-progress",
            post(execute_graph_with_progress),
        )
        .route("/api/node-metas", get(node_metas))
        .with_state(AppState { registry })
}

type ApiError = (StatusCode, Json<serde_json::Value>);

fn bad_request(err: EngineError) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({"detail": err.to_string()})),
    )
}

fn server_error(detail: String) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({"detail": detail})),
    )
}

/// Handler for POST /api/execute-graph
///
/// Runs the graph to completion and reports only the outcome.
async fn execute_graph(
    State(state): State<AppState>,
    Json(doc): Json<serde_json::Value>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let graph = GraphData::from_value(doc).map_err(bad_request)?;
    let registry = state.registry.clone();

    let result = tokio::task::spawn_blocking(move || {
        let mut executor = GraphExecutor::new(registry, graph)?;
        executor.execute(&mut |event| log::trace!("progress: {event:?}"))
    })
    .await
    .map_err(|e| server_error(format!("execution worker failed: {e}")))?;

    match result {
        Ok(()) => Ok(Json(serde_json::json!({"status": "success"}))),
        Err(err) => Err(server_error(err.to_string())),
    }
}

/// Handler for POST /api/execute-graph-with-progress
///
/// Streams every progress record as one `data: <json>` server-sent event
/// until the run finishes or fails.
async fn execute_graph_with_progress(
    State(state): State<AppState>,
    Json(doc): Json<serde_json::Value>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, ApiError> {
    let graph = GraphData::from_value(doc).map_err(bad_request)?;
    let registry = state.registry.clone();

    let (tx, rx) = tokio::sync::mpsc::channel::<Result<ProgressEvent, String>>(PROGRESS_QUEUE_DEPTH);
    tokio::task::spawn_blocking(move || {
        let mut executor = match GraphExecutor::new(registry, graph) {
            Ok(executor) => executor,
            Err(err) => {
                let _ = tx.blocking_send(Err(err.to_string()));
                return;
            }
        };
        let cancel = executor.cancel_token();
        let sender = tx.clone();
        let mut sink = move |event: ProgressEvent| {
            // a closed queue means the client went away; stop the run
            if sender.blocking_send(Ok(event)).is_err() {
                cancel.cancel();
            }
        };
        match executor.execute(&mut sink) {
            Ok(()) => {}
            Err(EngineError::Cancelled) => {
                log::debug!("graph run cancelled after client disconnect");
            }
            Err(err) => {
                log::error!("graph run failed: {err}");
                let _ = tx.blocking_send(Err(err.to_string()));
            }
        }
        // dropping the senders closes the stream
    });

    let stream = ReceiverStream::new(rx).map(|item| match item {
        Ok(event) => Event::default().json_data(&event),
        Err(message) => Event::default().json_data(&serde_json::json!({"error": message})),
    });
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// Handler for GET /api/node-metas
///
/// Returns metadata for every registered node type, for authoring UIs.
async fn node_metas(State(state): State<AppState>) -> Json<serde_json::Value> {
    let metas = state.registry.all_metadata();
    Json(serde_json::json!({"status": "success", "data": metas}))
}
