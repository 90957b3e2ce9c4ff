//! WebSocket handshake and frame codec (spec §4.1, RFC 6455 §4-5).

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use sha1::{Digest, Sha1};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::constants::WEBSOCKET_GUID;

const OPCODE_CONTINUATION: u8 = 0x0;
const OPCODE_TEXT: u8 = 0x1;
const OPCODE_BINARY: u8 = 0x2;
const OPCODE_CLOSE: u8 = 0x8;
const OPCODE_PING: u8 = 0x9;
const OPCODE_PONG: u8 = 0xA;

/// Compute `Sec-WebSocket-Accept` from the client's `Sec-WebSocket-Key`
/// (spec §4.1, testable property 5).
pub fn accept_key(client_key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(client_key.as_bytes());
    hasher.update(WEBSOCKET_GUID.as_bytes());
    let digest = hasher.finalize();
    BASE64.encode(digest)
}

/// The 101 Switching Protocols response for a validated handshake.
pub fn handshake_response(client_key: &str) -> Vec<u8> {
    format!(
        "HTTP/1.1 101 Switching Protocols\r\n\
         Upgrade: websocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Accept: {}\r\n\r\n",
        accept_key(client_key)
    )
    .into_bytes()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
    Ping(Vec<u8>),
    Pong(Vec<u8>),
    Close,
}

/// Read one frame off `reader`, unmasking the payload if the client set the
/// mask bit (server reads must tolerate masked client frames per §6).
/// Returns `Ok(None)` on a close frame or clean EOF.
pub async fn read_frame<R: AsyncRead + Unpin>(
    reader: &mut R,
) -> std::io::Result<Option<Frame>> {
    let mut header = [0u8; 2];
    if reader.read_exact(&mut header).await.is_err() {
        return Ok(None);
    }

    let opcode = header[0] & 0x0F;
    let masked = header[1] & 0x80 != 0;
    let mut length = (header[1] & 0x7F) as u64;

    if length == 126 {
        let mut ext = [0u8; 2];
        reader.read_exact(&mut ext).await?;
        length = u16::from_be_bytes(ext) as u64;
    } else if length == 127 {
        let mut ext = [0u8; 8];
        reader.read_exact(&mut ext).await?;
        length = u64::from_be_bytes(ext);
    }

    let mask = if masked {
        let mut m = [0u8; 4];
        reader.read_exact(&mut m).await?;
        Some(m)
    } else {
        None
    };

    let mut payload = vec![0u8; length as usize];
    reader.read_exact(&mut payload).await?;

    if let Some(mask) = mask {
        for (i, byte) in payload.iter_mut().enumerate() {
            *byte ^= mask[i % 4];
        }
    }

    match opcode {
        OPCODE_CLOSE => Ok(None),
        OPCODE_TEXT | OPCODE_CONTINUATION => Ok(Some(Frame::Text(
            String::from_utf8_lossy(&payload).into_owned(),
        ))),
        OPCODE_BINARY => Ok(Some(Frame::Binary(payload))),
        OPCODE_PING => Ok(Some(Frame::Ping(payload))),
        OPCODE_PONG => Ok(Some(Frame::Pong(payload))),
        _ => Ok(Some(Frame::Binary(payload))),
    }
}

fn encode(opcode: u8, payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(payload.len() + 10);
    frame.push(0x80 | opcode); // FIN + opcode, server frames are never fragmented
    let len = payload.len();
    if len <= 125 {
        frame.push(len as u8);
    } else if len <= 65535 {
        frame.push(126);
        frame.extend_from_slice(&(len as u16).to_be_bytes());
    } else {
        frame.push(127);
        frame.extend_from_slice(&(len as u64).to_be_bytes());
    }
    frame.extend_from_slice(payload);
    frame
}

/// Write a single unmasked text frame (server-to-client frames are never
/// masked per §4.1). The write is atomic: one `write_all` call per message.
pub async fn write_text<W: AsyncWrite + Unpin>(writer: &mut W, text: &str) -> std::io::Result<()> {
    let frame = encode(OPCODE_TEXT, text.as_bytes());
    writer.write_all(&frame).await
}

pub async fn write_pong<W: AsyncWrite + Unpin>(
    writer: &mut W,
    payload: &[u8],
) -> std::io::Result<()> {
    let frame = encode(OPCODE_PONG, payload);
    writer.write_all(&frame).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn computes_rfc6455_example_accept_key() {
        assert_eq!(
            accept_key("dGhlIHNhbXBsZSBub25jZQ=="),
            "s3pPLMBiTxaQ9kYGzzhZRbK+xOo="
        );
    }

    #[tokio::test]
    async fn round_trips_unmasked_server_frame() {
        let mut buf = Vec::new();
        write_text(&mut buf, "hi").await.unwrap();
        let mut cursor = std::io::Cursor::new(buf);
        let frame = read_frame(&mut cursor).await.unwrap().unwrap();
        assert_eq!(frame, Frame::Text("hi".to_string()));
    }

    #[tokio::test]
    async fn decodes_client_masked_frame() {
        let payload = b"hi";
        let mask = [0x01u8, 0x02, 0x03, 0x04];
        let mut raw = vec![0x81, 0x80 | payload.len() as u8];
        raw.extend_from_slice(&mask);
        for (i, b) in payload.iter().enumerate() {
            raw.push(b ^ mask[i % 4]);
        }
        let mut cursor = std::io::Cursor::new(raw);
        let frame = read_frame(&mut cursor).await.unwrap().unwrap();
        assert_eq!(frame, Frame::Text("hi".to_string()));
    }

    #[tokio::test]
    async fn close_frame_yields_none() {
        let raw = vec![0x88, 0x00];
        let mut cursor = std::io::Cursor::new(raw);
        assert_eq!(read_frame(&mut cursor).await.unwrap(), None);
    }
}
