//! Black-box routing tests (§4.2): drives resolution through a live
//! connection handled by `Engine`, rather than calling
//! `RouteRegistry::resolve_http` directly, so these also cover the path
//! from an HTTP request line down to the resolved route.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use appserver::engine::{Engine, Handler, HandlerOutcome};
use appserver::route::{RouteOptions, RouteRegistry};
use appserver::worker::WorkerPools;

async fn spawn_engine(routes: RouteRegistry) -> SocketAddr {
    let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let workers = WorkerPools::new(4, 4);
    let engine = Arc::new(Engine::new(routes, workers, vec![]));
    tokio::spawn(async move {
        loop {
            let (stream, peer) = match listener.accept().await {
                Ok(v) => v,
                Err(_) => break,
            };
            let engine = engine.clone();
            tokio::spawn(async move {
                engine.handle_connection(stream, peer).await;
            });
        }
    });
    addr
}

async fn get(addr: SocketAddr, path: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(format!("GET {path} HTTP/1.1\r\n\r\n").as_bytes())
        .await
        .unwrap();
    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await.unwrap();
    String::from_utf8_lossy(&buf).into_owned()
}

fn echo_param(name: &'static str) -> Handler {
    Arc::new(move |params| {
        let value = params.get(name).cloned().unwrap_or_default();
        Box::pin(async move { HandlerOutcome::text(value) })
    })
}

#[tokio::test]
async fn literal_route_wins_over_an_overlapping_dynamic_route() {
    let mut routes = RouteRegistry::new();
    routes
        .register_http("/u/<id>", echo_param("id"), vec!["GET".into()], false, RouteOptions::default())
        .unwrap();
    routes
        .register_http(
            "/u/me",
            Arc::new(|_| Box::pin(async { HandlerOutcome::text("it-is-me") })),
            vec!["GET".into()],
            false,
            RouteOptions::default(),
        )
        .unwrap();
    let addr = spawn_engine(routes).await;

    let response = get(addr, "/u/me").await;
    assert!(response.ends_with("it-is-me"));

    let response = get(addr, "/u/99").await;
    assert!(response.ends_with("99"));
}

#[tokio::test]
async fn duplicate_literal_registration_is_rejected_before_the_server_starts() {
    let mut routes = RouteRegistry::new();
    routes
        .register_http("/dup", echo_param("x"), vec!["GET".into()], false, RouteOptions::default())
        .unwrap();
    let err = routes
        .register_http("/dup", echo_param("x"), vec!["GET".into()], false, RouteOptions::default())
        .unwrap_err();
    assert_eq!(err.to_string(), "route '/dup' is already registered");
}

#[tokio::test]
async fn query_string_does_not_affect_route_resolution() {
    let mut routes = RouteRegistry::new();
    routes
        .register_http("/search", echo_param("q"), vec!["GET".into()], false, RouteOptions::default())
        .unwrap();
    let addr = spawn_engine(routes).await;

    let response = get(addr, "/search?q=rust&sort=new").await;
    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
}
