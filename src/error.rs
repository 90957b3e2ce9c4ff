//! Structured error taxonomy (spec §7).
//!
//! Every variant renders as a multi-line, `#`-bordered banner with the
//! offending value and a remediation hint, matching the banner shape of
//! the original `SocketIOException` hierarchy (`socketio_exceptions.py`,
//! `postgres_exceptions.py`).

use std::fmt;

use thiserror::Error;

fn banner(width: usize, lines: &[String]) -> String {
    let bar = "#".repeat(width);
    let mut out = String::new();
    out.push('\n');
    out.push_str(&bar);
    out.push('\n');
    for line in lines {
        out.push_str(line);
        out.push('\n');
    }
    out.push_str(&bar);
    out
}

/// Configuration errors raised at server construction time; fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    ForbiddenPort(u32),
    ImproperPort(i64),
    NoCacheBackend,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let body = match self {
            ConfigError::ForbiddenPort(port) => banner(
                75,
                &[
                    format!("#  ERROR: Port '{port}' is reserved by the system."),
                    "#  Please use a port number higher than 1024.".to_string(),
                    "#  System-reserved ports range: 0-1023.".to_string(),
                ],
            ),
            ConfigError::ImproperPort(port) => banner(
                75,
                &[
                    format!("#  ERROR: Invalid port number '{port}'."),
                    "#  Allowed port range: 0-65535.".to_string(),
                    "#  Please specify a valid port within this range.".to_string(),
                ],
            ),
            ConfigError::NoCacheBackend => banner(
                72,
                &[
                    "#  ERROR: No Redis backend configured for this cache.".to_string(),
                    "#  Are you sure you defined a RedisConfig for it?".to_string(),
                ],
            ),
        };
        write!(f, "{body}")
    }
}

/// Errors raised from within the PostgreSQL wire driver (§4.8, §7).
#[derive(Debug, Error)]
pub enum DriverError {
    Protocol(String),
    Backend { sqlstate: String, message: String },
    AuthUnknownMethod(i32),
    NotReady,
    Io(String),
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let body = match self {
            DriverError::Backend { sqlstate, message } => banner(
                80,
                &[
                    format!("# ERROR: PostgreSQL error {sqlstate}: {message}."),
                    "#".to_string(),
                    "# See the full list of Postgres SQLSTATE codes here:".to_string(),
                    "# https://www.postgresql.org/docs/current/errcodes-appendix.html"
                        .to_string(),
                ],
            ),
            DriverError::AuthUnknownMethod(code) => banner(
                72,
                &[
                    format!("# PostgreSQL authentication failed with unknown code: {code}"),
                    "#".to_string(),
                    "# Refer to the full list of PostgreSQL auth codes:".to_string(),
                    "# -> https://www.postgresql.org/docs/current/errcodes-appendix.html"
                        .to_string(),
                ],
            ),
            DriverError::Protocol(msg) => format!("protocol error: {msg}"),
            DriverError::NotReady => {
                "driver is not in the Ready state; a query is already in flight".to_string()
            }
            DriverError::Io(msg) => format!("i/o error: {msg}"),
        };
        write!(f, "{body}")
    }
}

impl From<std::io::Error> for DriverError {
    fn from(e: std::io::Error) -> Self {
        DriverError::Io(e.to_string())
    }
}

/// Errors surfaced while handling a single HTTP/WebSocket connection (§7).
/// Recoverable: contained to one connection, never propagate to the facade.
#[derive(Debug, Error)]
pub enum RequestError {
    BadRequest(String),
    MethodNotAllowed(Vec<String>),
    NotFound,
    RateLimitExceeded,
    HandlerFailed(String),
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestError::BadRequest(reason) => write!(f, "400 Bad Request: {reason}"),
            RequestError::MethodNotAllowed(allowed) => {
                write!(f, "405 Method Not Allowed: allowed {}", allowed.join(", "))
            }
            RequestError::NotFound => write!(f, "404 Not Found"),
            RequestError::RateLimitExceeded => write!(f, "429 Too Many Requests"),
            RequestError::HandlerFailed(msg) => {
                write!(f, "500 Internal Server Error: {msg}")
            }
        }
    }
}
