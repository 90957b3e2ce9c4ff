//! HTTP/1.1 request-line and header parsing (spec §4.1, C1).

use std::collections::HashMap;

use crate::error::RequestError;

#[derive(Debug, Clone)]
pub struct ParsedRequest {
    pub method: String,
    pub target: String,
    pub headers: HashMap<String, String>,
}

impl ParsedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// True if this request asks to be upgraded to a WebSocket connection
    /// (§4.1): `Upgrade: websocket`, case-insensitive.
    pub fn is_websocket_upgrade(&self) -> bool {
        self.header("Upgrade")
            .map(|v| v.eq_ignore_ascii_case("websocket"))
            .unwrap_or(false)
    }

    /// Path portion of the request target, stripped of any query string.
    pub fn path(&self) -> &str {
        self.target.split('?').next().unwrap_or(&self.target)
    }
}

/// Parse raw bytes read off the socket into a request line plus headers.
///
/// Splits on CRLF; the first line must match `METHOD SP TARGET SP HTTP/1.1`.
/// Remaining lines parse as `Name: Value` until an empty line terminates the
/// header block. Header names are kept exactly as received (case-sensitive).
pub fn parse_request(data: &[u8]) -> Result<ParsedRequest, RequestError> {
    let text = std::str::from_utf8(data)
        .map_err(|_| RequestError::BadRequest("request is not valid UTF-8".to_string()))?;

    let mut lines = text.split("\r\n");
    let request_line = lines
        .next()
        .ok_or_else(|| RequestError::BadRequest("empty request".to_string()))?;

    let mut parts = request_line.splitn(3, ' ');
    let method = parts
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| RequestError::BadRequest("missing method".to_string()))?;
    let target = parts
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| RequestError::BadRequest("missing request target".to_string()))?;
    let version = parts
        .next()
        .ok_or_else(|| RequestError::BadRequest("missing HTTP version".to_string()))?;
    if version != "HTTP/1.1" {
        return Err(RequestError::BadRequest(format!(
            "unsupported HTTP version '{version}'"
        )));
    }

    let mut headers = HashMap::new();
    for line in lines {
        if line.is_empty() {
            break;
        }
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| RequestError::BadRequest(format!("malformed header line '{line}'")))?;
        headers.insert(name.trim().to_string(), value.trim().to_string());
    }

    Ok(ParsedRequest {
        method: method.to_string(),
        target: target.to_string(),
        headers,
    })
}
