//! The PostgreSQL driver session (spec §4.8, C8). Grounded in
//! `orm/postgres/driver/driver.py`'s `PostgresDriver`: a plain TCP socket,
//! a message builder, and a dispatch loop that runs until the backend signals
//! `ReadyForQuery`. Re-expressed as an explicit state machine rather than the
//! original's implicit "keep reading until some sentinel" loop, since Rust's
//! enums make illegal states (e.g. executing a query while still
//! authenticating) unrepresentable instead of merely undocumented.

use std::collections::HashMap;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

use crate::error::DriverError;
use crate::keep_alive;
use crate::pg::message::{self, AuthRequest, BackendMessage};
use crate::pg::sqlstate;

#[derive(Debug, Clone)]
pub struct PgDriverConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
}

/// Connection lifecycle state (§4.8). A query can only be issued from
/// `Ready`, and the driver returns to `Ready` after either a successful
/// result set or a backend error — matching the protocol's guarantee that
/// every query ends in exactly one `ReadyForQuery`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Disconnected,
    Starting,
    Authenticating,
    Ready,
    ExecutingQuery,
    Closed,
}

/// One result row, cells mapped by column name to a UTF-8-decoded value
/// (§3, testable property 7: `SELECT 1 AS n, NULL::text AS t` yields
/// `{"n": "1", "t": null}`). Column names come from the query's most recent
/// `RowDescription`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PgRow {
    pub values: HashMap<String, Option<String>>,
}

pub struct PgDriver {
    config: PgDriverConfig,
    stream: Option<TcpStream>,
    state: DriverState,
}

impl PgDriver {
    pub fn new(config: PgDriverConfig) -> Self {
        Self {
            config,
            stream: None,
            state: DriverState::Disconnected,
        }
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    /// Open the TCP connection, send StartupMessage, and drive the
    /// authentication exchange to completion (§4.8).
    pub async fn connect(&mut self) -> Result<(), DriverError> {
        if self.state != DriverState::Disconnected {
            return Err(DriverError::Protocol(
                "connect() called on a non-Disconnected driver".to_string(),
            ));
        }
        let stream = TcpStream::connect((self.config.host.as_str(), self.config.port)).await?;
        self.stream = Some(stream);
        self.state = DriverState::Starting;

        let startup = message::build_startup(&self.config.user, &self.config.database);
        self.write_all(&startup).await?;

        self.state = DriverState::Authenticating;
        self.run_until_ready().await?;
        self.state = DriverState::Ready;
        Ok(())
    }

    /// Run one simple-query round trip (§4.8). Only valid from `Ready`.
    pub async fn execute(&mut self, sql: &str) -> Result<Vec<PgRow>, DriverError> {
        if self.state != DriverState::Ready {
            return Err(DriverError::NotReady);
        }
        self.state = DriverState::ExecutingQuery;

        let query = message::build_query(sql);
        self.write_all(&query).await?;

        let mut rows = Vec::new();
        let result = self.collect_rows(&mut rows).await;
        self.state = DriverState::Ready;
        result?;
        Ok(rows)
    }

    pub async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.write_all(&message::build_terminate()).await;
            let _ = stream.shutdown().await;
        }
        self.state = DriverState::Closed;
    }

    pub async fn reconnect(&mut self) -> Result<(), DriverError> {
        self.close().await;
        self.connect().await
    }

    /// Probe the connection for liveness (§4.8 supplement: idle-connection
    /// handling). Returns `false` if never connected or if the peer has
    /// clearly gone away; does not change `state`.
    pub async fn is_alive(&mut self) -> bool {
        match self.stream.as_mut() {
            Some(stream) => keep_alive::send_keep_alive_probe(stream).await.unwrap_or(false),
            None => false,
        }
    }

    /// Collect a simple query's result set. An `ErrorResponse` does not end
    /// the loop by itself — the backend always still sends a trailing
    /// `ReadyForQuery` before it will accept another query (§4.8), so
    /// reading continues until that point and the error is returned only
    /// once it has been observed. Returning early would leave the
    /// `ReadyForQuery` byte unread on the socket for the *next* `execute()`
    /// call to misinterpret as its own first message.
    async fn collect_rows(&mut self, rows: &mut Vec<PgRow>) -> Result<(), DriverError> {
        let mut columns: Vec<String> = Vec::new();
        let mut pending_error: Option<DriverError> = None;
        loop {
            match self.read_message().await? {
                None => {
                    return Err(pending_error.unwrap_or_else(|| {
                        DriverError::Protocol("connection closed mid-query".to_string())
                    }))
                }
                Some(BackendMessage::RowDescription { columns: cols }) => columns = cols,
                Some(BackendMessage::DataRow { values }) => {
                    let row = columns
                        .iter()
                        .cloned()
                        .zip(values)
                        .map(|(name, value)| {
                            (name, value.map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
                        })
                        .collect();
                    rows.push(PgRow { values: row });
                }
                Some(BackendMessage::CommandComplete { tag }) => {
                    debug!("command complete: {tag}");
                }
                Some(BackendMessage::ParameterStatus { .. }) => {}
                Some(BackendMessage::NoticeResponse { sqlstate, message }) => {
                    debug!("notice {sqlstate}: {message}");
                }
                Some(BackendMessage::ErrorResponse { sqlstate: code, message: msg }) => {
                    let described = sqlstate::describe(&code);
                    pending_error = Some(DriverError::Backend {
                        sqlstate: code,
                        message: format!("{msg} ({described})"),
                    });
                }
                Some(BackendMessage::ReadyForQuery { .. }) => {
                    return match pending_error {
                        Some(e) => Err(e),
                        None => Ok(()),
                    };
                }
                Some(_) => {}
            }
        }
    }

    /// Authentication loop: consume messages until `ReadyForQuery`,
    /// answering whatever auth challenge the backend poses along the way
    /// (§4.8 — trust/cleartext/MD5). An `ErrorResponse` during startup is
    /// held and only returned once the loop reaches `ReadyForQuery` or the
    /// connection closes, mirroring `collect_rows`' drain-then-report shape.
    async fn run_until_ready(&mut self) -> Result<(), DriverError> {
        let mut pending_error: Option<DriverError> = None;
        loop {
            match self.read_message().await? {
                None => {
                    return Err(pending_error.unwrap_or_else(|| {
                        DriverError::Protocol("connection closed during startup".to_string())
                    }))
                }
                Some(BackendMessage::Authentication(AuthRequest::Ok)) => {}
                Some(BackendMessage::Authentication(AuthRequest::CleartextPassword)) => {
                    let password = message::build_password_cleartext(&self.config.password);
                    self.write_all(&password).await?;
                }
                Some(BackendMessage::Authentication(AuthRequest::Md5Password { salt })) => {
                    let password = message::build_password_md5(&self.config.user, &self.config.password, salt);
                    self.write_all(&password).await?;
                }
                Some(BackendMessage::Authentication(AuthRequest::Unknown(code))) => {
                    return Err(DriverError::AuthUnknownMethod(code));
                }
                Some(BackendMessage::ErrorResponse { sqlstate: code, message: msg }) => {
                    let described = sqlstate::describe(&code);
                    pending_error = Some(DriverError::Backend {
                        sqlstate: code,
                        message: format!("{msg} ({described})"),
                    });
                }
                Some(BackendMessage::BackendKeyData { .. })
                | Some(BackendMessage::ParameterStatus { .. }) => {}
                Some(BackendMessage::ReadyForQuery { .. }) => {
                    return match pending_error {
                        Some(e) => Err(e),
                        None => Ok(()),
                    };
                }
                Some(_) => {}
            }
        }
    }

    async fn read_message(&mut self) -> Result<Option<BackendMessage>, DriverError> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| DriverError::Protocol("not connected".to_string()))?;

        let mut header = [0u8; 5];
        if let Err(e) = stream.read_exact(&mut header).await {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                return Ok(None);
            }
            return Err(e.into());
        }
        let tag = header[0];
        let length = u32::from_be_bytes(header[1..5].try_into().unwrap()) as usize;
        let payload_len = length.saturating_sub(4);

        let mut payload = vec![0u8; payload_len];
        stream.read_exact(&mut payload).await?;

        message::parse_backend_message(tag, &payload).map(Some)
    }

    async fn write_all(&mut self, bytes: &[u8]) -> Result<(), DriverError> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| DriverError::Protocol("not connected".to_string()))?;
        stream.write_all(bytes).await?;
        Ok(())
    }
}
