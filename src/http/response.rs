//! Response serialisation and the wire writer (spec §4.5 steps 7-8).

use tokio::io::{AsyncWrite, AsyncWriteExt};

/// The value a handler returned, before it's turned into bytes on the wire.
#[derive(Debug, Clone)]
pub enum HandlerOutput {
    /// A plain string body; serialised as `text/plain`.
    Text(String),
    /// A structured value; JSON-encoded as `application/json`.
    Json(serde_json::Value),
    /// A pre-built HTTP response, forwarded to the socket verbatim.
    Raw(Vec<u8>),
}

pub fn reason_phrase(status: u16) -> &'static str {
    match status {
        101 => "Switching Protocols",
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

/// Serialise `output` into a status + `Content-Type` + body triple, unless
/// it is already a pre-built response (`HandlerOutput::Raw`), in which case
/// it is returned unchanged and must be written as-is.
pub fn serialize(status: u16, output: HandlerOutput) -> Result<Vec<u8>, Vec<u8>> {
    match output {
        HandlerOutput::Raw(bytes) => Err(bytes),
        HandlerOutput::Text(body) => Ok(build(status, "text/plain", body.as_bytes())),
        HandlerOutput::Json(value) => {
            let body = serde_json::to_vec(&value).unwrap_or_default();
            Ok(build(status, "application/json", &body))
        }
    }
}

fn build(status: u16, content_type: &str, body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(body.len() + 128);
    out.extend_from_slice(
        format!(
            "HTTP/1.1 {status} {}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\n\r\n",
            reason_phrase(status),
            body.len()
        )
        .as_bytes(),
    );
    out.extend_from_slice(body);
    out
}

/// Write a plain status-line-plus-body response with the given status and
/// `text/plain` content type (used for 400/404/405/500 paths, §4.5 step 8).
pub async fn write_status<W: AsyncWrite + Unpin>(
    writer: &mut W,
    status: u16,
    body: &str,
) -> std::io::Result<()> {
    let response = build(status, "text/plain", body.as_bytes());
    writer.write_all(&response).await
}

/// Write already-serialised response bytes verbatim.
pub async fn write_response<W: AsyncWrite + Unpin>(
    writer: &mut W,
    bytes: &[u8],
) -> std::io::Result<()> {
    writer.write_all(bytes).await
}
