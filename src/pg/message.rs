//! PostgreSQL frontend/backend wire messages (spec §4.8). Grounded in
//! `message_builder/driver_message_builder.py` for the frontend builders and
//! `message_handlers/driver_message_handler.py` for the backend message type
//! map.

use crate::constants::PG_PROTOCOL_VERSION;
use crate::error::DriverError;

/// Build a StartupMessage (no leading type byte, per protocol): version
/// plus `user`/`database` parameters, terminated by a final null byte.
pub fn build_startup(user: &str, database: &str) -> Vec<u8> {
    let mut payload = Vec::new();
    for (key, value) in [("user", user), ("database", database)] {
        payload.extend_from_slice(key.as_bytes());
        payload.push(0);
        payload.extend_from_slice(value.as_bytes());
        payload.push(0);
    }
    payload.push(0);

    let length = 4 + 4 + payload.len();
    let mut out = Vec::with_capacity(length);
    out.extend_from_slice(&(length as u32).to_be_bytes());
    out.extend_from_slice(&PG_PROTOCOL_VERSION.to_be_bytes());
    out.extend_from_slice(&payload);
    out
}

/// Build a cleartext PasswordMessage (`p`).
pub fn build_password_cleartext(password: &str) -> Vec<u8> {
    let mut payload = password.as_bytes().to_vec();
    payload.push(0);
    frame(b'p', &payload)
}

/// Build an MD5 PasswordMessage (`p`): `"md5" + md5(md5(password + user) + salt)`,
/// hex-encoded, matching the backend's `AuthenticationMD5Password` challenge.
pub fn build_password_md5(user: &str, password: &str, salt: [u8; 4]) -> Vec<u8> {
    let inner = format!("{:x}", md5::compute(format!("{password}{user}")));
    let mut salted = inner.into_bytes();
    salted.extend_from_slice(&salt);
    let outer = format!("{:x}", md5::compute(salted));

    let mut payload = format!("md5{outer}").into_bytes();
    payload.push(0);
    frame(b'p', &payload)
}

/// Build a simple Query message (`Q`).
pub fn build_query(sql: &str) -> Vec<u8> {
    let mut payload = sql.as_bytes().to_vec();
    payload.push(0);
    frame(b'Q', &payload)
}

/// Build a Terminate message (`X`), no payload.
pub fn build_terminate() -> Vec<u8> {
    frame(b'X', &[])
}

fn frame(tag: u8, payload: &[u8]) -> Vec<u8> {
    let length = 4 + payload.len();
    let mut out = Vec::with_capacity(1 + length);
    out.push(tag);
    out.extend_from_slice(&(length as u32).to_be_bytes());
    out.extend_from_slice(payload);
    out
}

/// One authentication request variant from an `AuthenticationXXX` ('R')
/// backend message (§4.8).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthRequest {
    Ok,
    CleartextPassword,
    Md5Password { salt: [u8; 4] },
    Unknown(i32),
}

/// A decoded backend message, tagged by its one-byte message type (§4.8:
/// `R`/`E`/`S`/`K`/`T`/`D`/`C`/`Z`/`N`). Message types this driver doesn't
/// need to act on are preserved as `Other` with their raw tag, matching the
/// original handler's default no-op branches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendMessage {
    Authentication(AuthRequest),
    ErrorResponse { sqlstate: String, message: String },
    NoticeResponse { sqlstate: String, message: String },
    ParameterStatus { name: String, value: String },
    BackendKeyData { process_id: i32, secret_key: i32 },
    RowDescription { columns: Vec<String> },
    DataRow { values: Vec<Option<Vec<u8>>> },
    CommandComplete { tag: String },
    ReadyForQuery { status: u8 },
    Other { tag: u8 },
}

/// Parse one backend message body (everything after the 5-byte type+length
/// header has already been stripped by the caller's framing loop).
pub fn parse_backend_message(tag: u8, payload: &[u8]) -> Result<BackendMessage, DriverError> {
    match tag {
        b'R' => {
            let code = read_i32(payload, 0)?;
            let request = match code {
                0 => AuthRequest::Ok,
                3 => AuthRequest::CleartextPassword,
                5 => {
                    let mut salt = [0u8; 4];
                    if payload.len() < 8 {
                        return Err(DriverError::Protocol(
                            "truncated AuthenticationMD5Password salt".to_string(),
                        ));
                    }
                    salt.copy_from_slice(&payload[4..8]);
                    AuthRequest::Md5Password { salt }
                }
                other => AuthRequest::Unknown(other),
            };
            Ok(BackendMessage::Authentication(request))
        }
        b'E' => {
            let (sqlstate, message) = parse_error_fields(payload)?;
            Ok(BackendMessage::ErrorResponse { sqlstate, message })
        }
        b'N' => {
            let (sqlstate, message) = parse_error_fields(payload)?;
            Ok(BackendMessage::NoticeResponse { sqlstate, message })
        }
        b'S' => {
            let mut parts = payload.split(|&b| b == 0);
            let name = parts.next().unwrap_or_default();
            let value = parts.next().unwrap_or_default();
            Ok(BackendMessage::ParameterStatus {
                name: String::from_utf8_lossy(name).into_owned(),
                value: String::from_utf8_lossy(value).into_owned(),
            })
        }
        b'K' => {
            let process_id = read_i32(payload, 0)?;
            let secret_key = read_i32(payload, 4)?;
            Ok(BackendMessage::BackendKeyData {
                process_id,
                secret_key,
            })
        }
        b'T' => {
            let count = u16::from_be_bytes(
                payload
                    .get(0..2)
                    .ok_or_else(|| DriverError::Protocol("truncated RowDescription".to_string()))?
                    .try_into()
                    .unwrap(),
            );
            let mut columns = Vec::with_capacity(count as usize);
            let mut offset = 2;
            for _ in 0..count {
                let end = payload[offset..]
                    .iter()
                    .position(|&b| b == 0)
                    .ok_or_else(|| DriverError::Protocol("unterminated column name".to_string()))?;
                columns.push(String::from_utf8_lossy(&payload[offset..offset + end]).into_owned());
                offset += end + 1 + 18; // field name + 18 bytes of type metadata
            }
            Ok(BackendMessage::RowDescription { columns })
        }
        b'D' => {
            let count = u16::from_be_bytes(
                payload
                    .get(0..2)
                    .ok_or_else(|| DriverError::Protocol("truncated DataRow".to_string()))?
                    .try_into()
                    .unwrap(),
            );
            let mut values = Vec::with_capacity(count as usize);
            let mut offset = 2;
            for _ in 0..count {
                let len = read_i32(payload, offset)?;
                offset += 4;
                if len < 0 {
                    values.push(None);
                } else {
                    let len = len as usize;
                    values.push(Some(payload[offset..offset + len].to_vec()));
                    offset += len;
                }
            }
            Ok(BackendMessage::DataRow { values })
        }
        b'C' => {
            let tag = payload
                .split(|&b| b == 0)
                .next()
                .map(|s| String::from_utf8_lossy(s).into_owned())
                .unwrap_or_default();
            Ok(BackendMessage::CommandComplete { tag })
        }
        b'Z' => {
            let status = *payload
                .first()
                .ok_or_else(|| DriverError::Protocol("truncated ReadyForQuery".to_string()))?;
            Ok(BackendMessage::ReadyForQuery { status })
        }
        other => Ok(BackendMessage::Other { tag: other }),
    }
}

/// ErrorResponse/NoticeResponse fields are a sequence of `code + value\0`
/// entries terminated by a lone `\0`; field `S` is severity, `C` SQLSTATE,
/// `M` message (§4.8, matching the original's split-on-null parsing).
fn parse_error_fields(payload: &[u8]) -> Result<(String, String), DriverError> {
    let mut sqlstate = None;
    let mut message = None;
    for field in payload.split(|&b| b == 0) {
        if field.is_empty() {
            continue;
        }
        let (code, value) = (field[0], &field[1..]);
        match code {
            b'C' => sqlstate = Some(String::from_utf8_lossy(value).into_owned()),
            b'M' => message = Some(String::from_utf8_lossy(value).into_owned()),
            _ => {}
        }
    }
    Ok((
        sqlstate.unwrap_or_else(|| "UNKNOWN".to_string()),
        message.unwrap_or_else(|| "no message field in error response".to_string()),
    ))
}

fn read_i32(payload: &[u8], offset: usize) -> Result<i32, DriverError> {
    payload
        .get(offset..offset + 4)
        .and_then(|b| b.try_into().ok())
        .map(i32::from_be_bytes)
        .ok_or_else(|| DriverError::Protocol("truncated message".to_string()))
}
