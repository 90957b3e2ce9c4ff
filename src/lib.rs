//! Library crate backing the `appserver` binary, split out so the
//! integration suite under `tests/` can drive the engine, route registry,
//! and wire codecs through a real loopback socket instead of duplicating
//! them as in-process unit tests.

pub mod cache;
pub mod config;
pub mod constants;
pub mod engine;
pub mod error;
pub mod http;
pub mod keep_alive;
pub mod lifecycle;
pub mod middleware;
pub mod pg;
pub mod route;
pub mod server;
pub mod websocket;
pub mod worker;
