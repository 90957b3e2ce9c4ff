//! Black-box driver tests against a real loopback socket playing a fake
//! PostgreSQL backend (§4.8, C8) — exercising `PgDriver` through its
//! public API rather than the wire-codec unit tests in `pg::message`.

use std::net::SocketAddr;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use appserver::pg::driver::{DriverState, PgDriver, PgDriverConfig};
use appserver::pg::message;

fn backend_frame(tag: u8, payload: &[u8]) -> Vec<u8> {
    let mut out = vec![tag];
    out.extend_from_slice(&((4 + payload.len()) as u32).to_be_bytes());
    out.extend_from_slice(payload);
    out
}

fn auth_ok() -> Vec<u8> {
    backend_frame(b'R', &0i32.to_be_bytes())
}

fn ready_for_query() -> Vec<u8> {
    backend_frame(b'Z', &[b'I'])
}

fn auth_md5(salt: [u8; 4]) -> Vec<u8> {
    let mut payload = 5i32.to_be_bytes().to_vec();
    payload.extend_from_slice(&salt);
    backend_frame(b'R', &payload)
}

/// Accepts one connection, reads the StartupMessage, and replies with
/// whatever backend bytes the test supplied up front — used to drive
/// `connect()`'s authentication branches end to end.
async fn spawn_backend_with_startup_reply(startup_reply: Vec<u8>) -> SocketAddr {
    let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut len_buf = [0u8; 4];
        stream.read_exact(&mut len_buf).await.unwrap();
        let len = u32::from_be_bytes(len_buf) as usize;
        let mut rest = vec![0u8; len - 4];
        stream.read_exact(&mut rest).await.unwrap();
        let _ = stream.write_all(&startup_reply).await;

        // After startup, answer an MD5 password message (if any) then go ready.
        let mut header = [0u8; 5];
        if stream.read_exact(&mut header).await.is_ok() {
            let qlen = u32::from_be_bytes(header[1..5].try_into().unwrap()) as usize;
            let mut body = vec![0u8; qlen - 4];
            let _ = stream.read_exact(&mut body).await;
            let mut reply = auth_ok();
            reply.extend_from_slice(&ready_for_query());
            let _ = stream.write_all(&reply).await;
        }
    });
    addr
}

fn config(addr: SocketAddr) -> PgDriverConfig {
    PgDriverConfig {
        host: addr.ip().to_string(),
        port: addr.port(),
        user: "appuser".to_string(),
        password: "secret".to_string(),
        database: "appdb".to_string(),
    }
}

#[tokio::test]
async fn connect_completes_trust_authentication() {
    let mut reply = auth_ok();
    reply.extend_from_slice(&ready_for_query());
    let addr = spawn_backend_with_startup_reply(reply).await;

    let mut driver = PgDriver::new(config(addr));
    driver.connect().await.unwrap();
    assert_eq!(driver.state(), DriverState::Ready);
}

#[tokio::test]
async fn connect_answers_md5_challenge_then_becomes_ready() {
    let addr = spawn_backend_with_startup_reply(auth_md5([7, 7, 7, 7])).await;

    let mut driver = PgDriver::new(config(addr));
    driver.connect().await.unwrap();
    assert_eq!(driver.state(), DriverState::Ready);
}

#[tokio::test]
async fn reconnect_after_close_drives_a_fresh_startup_round_trip() {
    let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        for _ in 0..2 {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut len_buf = [0u8; 4];
            stream.read_exact(&mut len_buf).await.unwrap();
            let len = u32::from_be_bytes(len_buf) as usize;
            let mut rest = vec![0u8; len - 4];
            stream.read_exact(&mut rest).await.unwrap();
            let mut reply = auth_ok();
            reply.extend_from_slice(&ready_for_query());
            stream.write_all(&reply).await.unwrap();
        }
    });

    let mut driver = PgDriver::new(config(addr));
    driver.connect().await.unwrap();
    driver.reconnect().await.unwrap();
    assert_eq!(driver.state(), DriverState::Ready);
}

#[tokio::test]
async fn is_alive_true_on_a_freshly_connected_driver() {
    let mut reply = auth_ok();
    reply.extend_from_slice(&ready_for_query());
    let addr = spawn_backend_with_startup_reply(reply).await;

    let mut driver = PgDriver::new(config(addr));
    driver.connect().await.unwrap();
    assert!(driver.is_alive().await);
}

#[test]
fn startup_message_frames_match_what_the_driver_sends_on_the_wire() {
    // The wire-codec contract `connect()` relies on: version header is
    // 8 bytes before the parameter block, not part of the length prefix.
    let msg = message::build_startup("alice", "appdb");
    let length = u32::from_be_bytes(msg[0..4].try_into().unwrap()) as usize;
    assert_eq!(length, msg.len());
}
