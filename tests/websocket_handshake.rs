//! Black-box WebSocket tests (§4.1, §4.5 step 5): a real loopback socket
//! drives the engine's upgrade path end to end, confirming the handler
//! takes ownership of the connection rather than being routed through the
//! old hardcoded echo loop.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use appserver::engine::Engine;
use appserver::route::RouteRegistry;
use appserver::websocket::{self, Frame};
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

const SAMPLE_KEY: &str = "dGhlIHNhbXBsZSBub25jZQ==";

fn upgrade_request(path: &str, include_key: bool) -> String {
    let mut req = format!("GET {path} HTTP/1.1\r\nUpgrade: websocket\r\n");
    if include_key {
        req.push_str(&format!("Sec-WebSocket-Key: {SAMPLE_KEY}\r\n"));
    }
    req.push_str("\r\n");
    req
}

#[tokio::test]
async fn handshake_returns_correct_accept_key_and_handler_owns_the_socket() {
    let mut routes = RouteRegistry::new();
    routes.register_websocket(
        "/chat",
        Arc::new(|mut stream: TcpStream| {
            Box::pin(async move {
                if let Ok(Some(Frame::Text(msg))) = websocket::read_frame(&mut stream).await {
                    let _ = websocket::write_text(&mut stream, &format!("echo:{msg}")).await;
                }
            })
        }),
    );
    let addr = spawn_engine(routes).await;

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(upgrade_request("/chat", true).as_bytes())
        .await
        .unwrap();

    let mut header_buf = vec![0u8; 4096];
    let n = stream.read(&mut header_buf).await.unwrap();
    let response = String::from_utf8_lossy(&header_buf[..n]).into_owned();
    assert!(response.starts_with("HTTP/1.1 101 Switching Protocols\r\n"));
    assert!(response.contains("Sec-WebSocket-Accept: s3pPLMBiTxaQ9kYGzzhZRbK+xOo="));

    let masked_hello = {
        let payload = b"hello";
        let mask = [0x11u8, 0x22, 0x33, 0x44];
        let mut raw = vec![0x81, 0x80 | payload.len() as u8];
        raw.extend_from_slice(&mask);
        for (i, b) in payload.iter().enumerate() {
            raw.push(b ^ mask[i % 4]);
        }
        raw
    };
    stream.write_all(&masked_hello).await.unwrap();

    let frame = websocket::read_frame(&mut stream).await.unwrap().unwrap();
    assert_eq!(frame, Frame::Text("echo:hello".to_string()));
}

#[tokio::test]
async fn unregistered_websocket_path_closes_with_no_response() {
    let routes = RouteRegistry::new();
    let addr = spawn_engine(routes).await;

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(upgrade_request("/missing", true).as_bytes())
        .await
        .unwrap();
    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await.unwrap();
    assert!(buf.is_empty());
}

#[tokio::test]
async fn missing_websocket_key_closes_with_no_response() {
    let mut routes = RouteRegistry::new();
    routes.register_websocket(
        "/chat",
        Arc::new(|_stream: TcpStream| Box::pin(async move {})),
    );
    let addr = spawn_engine(routes).await;

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(upgrade_request("/chat", false).as_bytes())
        .await
        .unwrap();
    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await.unwrap();
    assert!(buf.is_empty());
}
