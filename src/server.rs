//! HTTP API server for the blockcal store.
//!
//! Handlers never touch SQLite themselves. Every request is sent over a
//! bounded channel to a single store loop that owns the `Store`, so merges,
//! splits and edits are applied one at a time.

use crate::protocol::{ListQuery, MergeBody, Request, Response, SplitBody};
use crate::store::Store;
use crate::types::{NewTask, TaskPatch};
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response as HttpResponse};
use axum::routing::{get, post};
use axum::{Json, Router};
use eyre::{Context, Result};
use serde_json::json;
use std::path::PathBuf;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Default bind host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default bind port.
pub const DEFAULT_PORT: u16 = 5000;

/// Default depth of the request queue in front of the store loop.
const DEFAULT_QUEUE_DEPTH: usize = 100;

/// Configuration for the server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Root directory containing .blockcal
    pub root: PathBuf,

    /// Interface to bind
    pub host: String,

    /// Port to bind (0 picks a free port)
    pub port: u16,

    /// Pending requests allowed before handlers wait
    pub queue_depth: usize,
}

impl ServerConfig {
    /// Create config with default settings.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            queue_depth: DEFAULT_QUEUE_DEPTH,
        }
    }

    /// Address string to bind.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

type Envelope = (Request, oneshot::Sender<Response>);

/// Shared state passed to axum handlers.
#[derive(Clone)]
pub struct AppState {
    tx: mpsc::Sender<Envelope>,
}

impl AppState {
    /// Send a request to the store loop and wait for its answer.
    async fn call(&self, request: Request) -> Response {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.tx.send((request, reply_tx)).await.is_err() {
            return Response::error("store loop is not running");
        }
        reply_rx
            .await
            .unwrap_or_else(|_| Response::error("store loop dropped the request"))
    }
}

/// Build the axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/tasks", get(list_tasks).post(create_task))
        .route("/api/tasks/merge", post(merge_tasks))
        .route("/api/tasks/{id}", get(get_task).put(update_task).delete(delete_task))
        .route("/api/tasks/{id}/split", post(split_task))
        .route("/api/health", get(health))
        .with_state(state)
}

/// The blockcal HTTP server.
pub struct Server {
    config: ServerConfig,
    store: Store,
}

impl Server {
    /// Create a new server instance.
    pub fn new(config: ServerConfig) -> Result<Self> {
        let store = Store::open(&config.root).context("Failed to open store")?;
        Ok(Self { config, store })
    }

    /// Bind and serve in the background.
    pub async fn start(self) -> Result<ServerHandle> {
        let (tx, rx) = mpsc::channel::<Envelope>(self.config.queue_depth);
        let store_loop = spawn_store_loop(self.store, rx);

        let router = build_router(AppState { tx });
        let listener = tokio::net::TcpListener::bind(self.config.addr())
            .await
            .with_context(|| format!("Failed to bind {}", self.config.addr()))?;
        let local_addr = listener.local_addr()?;

        log::info!("Server listening on {}", local_addr);

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(async move {
            let result = axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await;
            if let Err(e) = result {
                log::error!("Server error: {}", e);
            }
        });

        Ok(ServerHandle {
            port: local_addr.port(),
            shutdown: shutdown_tx,
            server,
            store_loop,
        })
    }

    /// Serve until Ctrl-C.
    pub async fn run(self) -> Result<()> {
        let handle = self.start().await?;
        tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for Ctrl-C")?;
        log::info!("Server shutting down");
        handle.shutdown().await
    }
}

/// Handle returned by `Server::start`; keeps the background tasks alive.
pub struct ServerHandle {
    pub port: u16,
    shutdown: oneshot::Sender<()>,
    server: JoinHandle<()>,
    store_loop: JoinHandle<()>,
}

impl ServerHandle {
    /// Stop accepting requests and wait for the store loop to drain.
    pub async fn shutdown(self) -> Result<()> {
        let _ = self.shutdown.send(());
        self.server.await.context("Server task panicked")?;
        // Router is gone, so the channel is closed and the loop ends
        self.store_loop.await.context("Store loop panicked")?;
        Ok(())
    }
}

/// Run the store on a blocking thread, answering requests in arrival order.
fn spawn_store_loop(mut store: Store, mut rx: mpsc::Receiver<Envelope>) -> JoinHandle<()> {
    tokio::task::spawn_blocking(move || {
        while let Some((request, reply)) = rx.blocking_recv() {
            let response = handle_request(&mut store, request);
            let _ = reply.send(response);
        }
        log::debug!("Store loop stopped");
    })
}

/// Handle a single request.
fn handle_request(store: &mut Store, request: Request) -> Response {
    match request {
        Request::Create { task } => match store.create(task) {
            Ok(task) => Response::Task { task },
            Err(e) => Response::from_report(e),
        },

        Request::Get { id } => match store.get(id) {
            Ok(Some(task)) => Response::Task { task },
            Ok(None) => Response::NotFound {
                message: format!("task not found: {}", id),
            },
            Err(e) => Response::from_report(e),
        },

        Request::List { start_date, end_date } => {
            let result = match (start_date, end_date) {
                (Some(start), Some(end)) => store.range(&start, &end),
                _ => store.list(),
            };
            match result {
                Ok(tasks) => Response::Tasks { tasks },
                Err(e) => Response::from_report(e),
            }
        }

        Request::Update { id, patch } => match store.update(id, patch) {
            Ok(task) => Response::Task { task },
            Err(e) => Response::from_report(e),
        },

        Request::Delete { id } => match store.delete(id) {
            Ok(()) => Response::Deleted { id },
            Err(e) => Response::from_report(e),
        },

        Request::Merge { task_ids, overrides } => match store.merge(&task_ids, &overrides) {
            Ok(task) => Response::Task { task },
            Err(e) => Response::from_report(e),
        },

        Request::Split { id, split_count } => match store.split(id, split_count) {
            Ok(result) => Response::Split { result },
            Err(e) => Response::from_report(e),
        },

        Request::Ping => Response::Pong,
    }
}

impl IntoResponse for Response {
    fn into_response(self) -> HttpResponse {
        match self {
            Response::Task { task } => Json(task).into_response(),
            Response::Tasks { tasks } => Json(tasks).into_response(),
            Response::Split { result } => Json(result).into_response(),
            Response::Deleted { .. } => Json(json!({ "message": "Task deleted successfully" })).into_response(),
            Response::Pong => Json(json!({ "status": "healthy" })).into_response(),
            Response::NotFound { message } => (StatusCode::NOT_FOUND, Json(json!({ "error": message }))).into_response(),
            Response::Invalid { message } => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            Response::Error { message } => {
                log::error!("Request failed: {}", message);
                (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": message }))).into_response()
            }
        }
    }
}

async fn list_tasks(State(state): State<AppState>, Query(query): Query<ListQuery>) -> Response {
    state
        .call(Request::List {
            start_date: query.start_date,
            end_date: query.end_date,
        })
        .await
}

type TaskId = Result<Path<i64>, PathRejection>;

async fn get_task(State(state): State<AppState>, id: TaskId) -> Response {
    match id {
        Ok(Path(id)) => state.call(Request::Get { id }).await,
        Err(rejection) => Response::invalid(rejection.body_text()),
    }
}

async fn create_task(State(state): State<AppState>, body: Result<Json<NewTask>, JsonRejection>) -> HttpResponse {
    let Json(task) = match body {
        Ok(body) => body,
        Err(rejection) => return Response::invalid(rejection.body_text()).into_response(),
    };

    match state.call(Request::Create { task }).await {
        Response::Task { task } => (StatusCode::CREATED, Json(task)).into_response(),
        other => other.into_response(),
    }
}

async fn update_task(
    State(state): State<AppState>,
    id: TaskId,
    body: Result<Json<TaskPatch>, JsonRejection>,
) -> Response {
    let Path(id) = match id {
        Ok(id) => id,
        Err(rejection) => return Response::invalid(rejection.body_text()),
    };
    match body {
        Ok(Json(patch)) => state.call(Request::Update { id, patch }).await,
        Err(rejection) => Response::invalid(rejection.body_text()),
    }
}

async fn delete_task(State(state): State<AppState>, id: TaskId) -> Response {
    match id {
        Ok(Path(id)) => state.call(Request::Delete { id }).await,
        Err(rejection) => Response::invalid(rejection.body_text()),
    }
}

async fn merge_tasks(State(state): State<AppState>, body: Result<Json<MergeBody>, JsonRejection>) -> Response {
    match body {
        Ok(Json(body)) => {
            state
                .call(Request::Merge {
                    task_ids: body.task_ids,
                    overrides: body.overrides,
                })
                .await
        }
        Err(rejection) => Response::invalid(rejection.body_text()),
    }
}

async fn split_task(
    State(state): State<AppState>,
    id: TaskId,
    body: Result<Json<SplitBody>, JsonRejection>,
) -> Response {
    let Path(id) = match id {
        Ok(id) => id,
        Err(rejection) => return Response::invalid(rejection.body_text()),
    };
    match body {
        Ok(Json(body)) => {
            state
                .call(Request::Split {
                    id,
                    split_count: body.count(),
                })
                .await
        }
        Err(rejection) => Response::invalid(rejection.body_text()),
    }
}

async fn health(State(state): State<AppState>) -> Response {
    state.call(Request::Ping).await
}
