//! The request engine (spec §4.5, C5): per-connection accept loop, host
//! allow-list check, HTTP-vs-WebSocket branch, and the decorator-stack
//! dispatch (middleware before -> rate limit -> cache lookup -> handler on
//! its lane -> middleware after) that turns a resolved route into bytes on
//! the wire. Grounded in `handlers/request_handler/request_handler.py` and
//! `handlers/http_handler/http_handler.py` for the dispatch order, in
//! `handlers/websocket_handler/websocket_handler.py` for the handshake-then-
//! hand-off shape of a WebSocket route, and in the teacher's
//! `pg_protocol/connection_handler.rs` for the accept-loop /
//! per-connection-task shape.

use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::cache::Fingerprint;
use crate::constants::{DEFAULT_READ_DEADLINE_SECS, HTTP_INITIAL_BUFFER};
use crate::error::RequestError;
use crate::http::request::{parse_request, ParsedRequest};
use crate::http::response::{self, HandlerOutput};
use crate::lifecycle::LifecycleHooks;
use crate::middleware::MiddlewareChain;
use crate::route::{HttpRoute, RouteRegistry};
use crate::websocket;
use crate::worker::{Lane, WorkerPools};

/// What a registered handler returns. Distinct from `HandlerOutput` (the
/// wire-serialisation type in `http::response`) so route and engine modules
/// don't need to depend on each other's internals; `into_output` bridges
/// the two at the point of use.
#[derive(Debug, Clone)]
pub enum HandlerOutcome {
    Text(String),
    Json(serde_json::Value),
}

impl HandlerOutcome {
    pub fn text(body: impl Into<String>) -> Self {
        HandlerOutcome::Text(body.into())
    }

    pub fn json(value: serde_json::Value) -> Self {
        HandlerOutcome::Json(value)
    }

    fn into_output(self) -> HandlerOutput {
        match self {
            HandlerOutcome::Text(body) => HandlerOutput::Text(body),
            HandlerOutcome::Json(value) => HandlerOutput::Json(value),
        }
    }
}

fn output_to_outcome(output: HandlerOutput) -> HandlerOutcome {
    match output {
        HandlerOutput::Text(t) => HandlerOutcome::Text(t),
        HandlerOutput::Json(v) => HandlerOutcome::Json(v),
        HandlerOutput::Raw(_) => HandlerOutcome::Text(String::new()),
    }
}

/// A registered HTTP route handler: takes the resolved path parameters,
/// returns a boxed future of the handler's outcome.
pub type Handler =
    Arc<dyn Fn(HashMap<String, String>) -> Pin<Box<dyn Future<Output = HandlerOutcome> + Send>> + Send + Sync>;

/// A registered WebSocket route handler. Unlike `Handler`, it is handed the
/// live, already-upgraded connection and owns it until it returns (§3,
/// §4.5 step 5) — it can run any protocol over the socket, push unsolicited
/// messages, or hold per-connection state, none of which a parameter-only
/// handler could do.
pub type WsHandler = Arc<dyn Fn(TcpStream) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Everything one connection's dispatch needs: the route table, worker
/// lanes, and the global before/after middleware. Built once at startup and
/// shared via `Arc` across every connection task (§5: routes are immutable
/// once serving begins).
pub struct Engine {
    pub routes: RouteRegistry,
    pub workers: WorkerPools,
    pub middleware: MiddlewareChain,
    pub lifecycle: LifecycleHooks,
    pub allowed_hosts: Vec<std::net::IpAddr>,
}

impl Engine {
    pub fn new(routes: RouteRegistry, workers: WorkerPools, allowed_hosts: Vec<std::net::IpAddr>) -> Self {
        Self {
            routes,
            workers,
            middleware: MiddlewareChain::new(),
            lifecycle: LifecycleHooks::new(),
            allowed_hosts,
        }
    }

    fn host_allowed(&self, peer: &SocketAddr) -> bool {
        if self.allowed_hosts.is_empty() {
            return true;
        }
        self.allowed_hosts.contains(&peer.ip())
    }

    /// Handle a single accepted connection end to end (§4.5).
    pub async fn handle_connection(self: Arc<Self>, mut stream: TcpStream, peer: SocketAddr) {
        let connection_id = uuid::Uuid::new_v4();
        tracing::debug!("accepted connection {connection_id} from {peer}");

        if !self.host_allowed(&peer) {
            tracing::debug!("connection {connection_id} from {peer} rejected: host not allowed");
            let _ = stream.shutdown().await;
            return;
        }

        let mut buf = vec![0u8; HTTP_INITIAL_BUFFER];
        let read = tokio::time::timeout(
            Duration::from_secs(DEFAULT_READ_DEADLINE_SECS),
            stream.read(&mut buf),
        )
        .await;

        let n = match read {
            Ok(Ok(0)) | Err(_) => {
                let _ = stream.shutdown().await;
                return;
            }
            Ok(Ok(n)) => n,
            Ok(Err(_)) => {
                let _ = stream.shutdown().await;
                return;
            }
        };
        buf.truncate(n);

        let request = match parse_request(&buf) {
            Ok(req) => req,
            Err(e) => {
                let _ = response::write_status(&mut stream, 400, &e.to_string()).await;
                let _ = stream.shutdown().await;
                return;
            }
        };

        if request.is_websocket_upgrade() {
            self.handle_websocket(stream, &request).await;
            return;
        }

        self.handle_http(stream, &request).await;
    }

    async fn handle_http(&self, mut stream: TcpStream, request: &ParsedRequest) {
        let path = request.path().to_string();
        let outcome = match self.routes.resolve_http(&path) {
            None => Err(RequestError::NotFound),
            Some(resolved) if !resolved.route.methods.iter().any(|m| m == &request.method) => {
                Err(RequestError::MethodNotAllowed(resolved.route.methods.clone()))
            }
            Some(resolved) => self.dispatch(resolved.route, resolved.params).await,
        };

        let (status, output) = match outcome {
            Ok(outcome) => (200, outcome.into_output()),
            Err(e) => (status_for(&e), HandlerOutput::Text(e.to_string())),
        };

        match response::serialize(status, output) {
            Ok(bytes) => {
                let _ = response::write_response(&mut stream, &bytes).await;
            }
            Err(raw) => {
                let _ = response::write_response(&mut stream, &raw).await;
            }
        }
        let _ = stream.shutdown().await;
    }

    /// Run one handler invocation through the decorator stack: before-hooks,
    /// per-route rate limit, per-route cache lookup/fill, the handler itself
    /// on its lane, after-hooks (§4.5 step 6). After-hooks run regardless of
    /// success or failure.
    async fn dispatch(
        &self,
        route: &HttpRoute,
        params: HashMap<String, String>,
    ) -> Result<HandlerOutcome, RequestError> {
        self.middleware.run_before().await;

        let result = self.dispatch_inner(route, params).await;

        self.middleware.run_after().await;
        result
    }

    async fn dispatch_inner(
        &self,
        route: &HttpRoute,
        params: HashMap<String, String>,
    ) -> Result<HandlerOutcome, RequestError> {
        if let Some(limiter) = &route.rate_limiter {
            limiter.check().await?;
        }

        if let Some(cache) = &route.cache {
            let fp = Fingerprint::new("handler", &sorted_values(&params), &[]);
            if let Some(hit) = cache.get(&fp).await {
                return Ok(output_to_outcome(hit));
            }
            let outcome = self.run_on_lane(route, params).await?;
            cache.put(fp, outcome.clone().into_output()).await;
            return Ok(outcome);
        }

        self.run_on_lane(route, params).await
    }

    /// Run the handler on its configured lane (§4.3, §9): inline and I/O
    /// both isolate a handler panic behind a spawned task so it surfaces as
    /// `HandlerFailed` instead of taking the connection task down with it
    /// (§7); CPU-bound runs the handler's future to completion on a
    /// dedicated blocking thread, off the reactor.
    async fn run_on_lane(
        &self,
        route: &HttpRoute,
        params: HashMap<String, String>,
    ) -> Result<HandlerOutcome, RequestError> {
        let handler = route.handler.clone();
        match route.lane {
            Lane::Inline => tokio::spawn(async move { handler(params).await })
                .await
                .map_err(|e| RequestError::HandlerFailed(panic_message(e))),
            Lane::IoBound => self
                .workers
                .run_io(async move { handler(params).await })
                .await
                .map_err(|e| RequestError::HandlerFailed(panic_message(e))),
            Lane::CpuBound => {
                let rt = tokio::runtime::Handle::current();
                self.workers
                    .run_cpu(move || rt.block_on(handler(params)))
                    .await
                    .map_err(|e| RequestError::HandlerFailed(panic_message(e)))
            }
        }
    }

    /// Resolve and run a WebSocket route (§4.5 step 2/5). A missing route or
    /// a missing `Sec-WebSocket-Key` both close the connection with no
    /// response written, matching `websocket_handler.py`'s
    /// `client_socket.close(); return` — a WebSocket client that sent a bad
    /// upgrade request gets silence, not an HTTP error body. Once the
    /// handshake succeeds, the handler takes ownership of `stream` and runs
    /// its own protocol until it returns; the engine does not touch the
    /// socket again afterward.
    async fn handle_websocket(&self, mut stream: TcpStream, request: &ParsedRequest) {
        let path = request.path().to_string();
        let handler = match self.routes.resolve_websocket(&path) {
            Some(h) => h.clone(),
            None => {
                let _ = stream.shutdown().await;
                return;
            }
        };

        let key = match request.header("Sec-WebSocket-Key") {
            Some(k) => k.to_string(),
            None => {
                let _ = stream.shutdown().await;
                return;
            }
        };

        let response_bytes = websocket::handshake_response(&key);
        if stream.write_all(&response_bytes).await.is_err() {
            let _ = stream.shutdown().await;
            return;
        }

        handler(stream).await;
    }
}

fn panic_message(err: tokio::task::JoinError) -> String {
    if !err.is_panic() {
        return "handler task was cancelled".to_string();
    }
    let payload = err.into_panic();
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}

fn sorted_values(params: &HashMap<String, String>) -> Vec<String> {
    let mut keys: Vec<&String> = params.keys().collect();
    keys.sort();
    keys.into_iter().map(|k| format!("{k}={}", params[k])).collect()
}

fn status_for(err: &RequestError) -> u16 {
    match err {
        RequestError::BadRequest(_) => 400,
        RequestError::MethodNotAllowed(_) => 405,
        RequestError::NotFound => 404,
        RequestError::RateLimitExceeded => 429,
        RequestError::HandlerFailed(_) => 500,
    }
}
