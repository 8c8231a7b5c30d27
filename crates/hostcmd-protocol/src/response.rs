//! Replies sent back to the host

use bytes::{BufMut, BytesMut};
use hostcmd_core::ErrorCode;

/// A reply line
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// +OK <message>
    Ok(String),

    /// -ERR <code> <message>
    Error { code: String, message: String },

    /// $<length>\r\n<data>
    Bulk(Vec<u8>),
}

impl Response {
    pub fn ok(msg: impl Into<String>) -> Self {
        Response::Ok(msg.into())
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Response::Error {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Error reply for a parser error code
    pub fn parse_error(code: ErrorCode) -> Self {
        Response::error(code.tag(), code.message())
    }

    pub fn bulk(data: impl Into<Vec<u8>>) -> Self {
        Response::Bulk(data.into())
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Response::Error { .. })
    }

    /// Encode the response to bytes
    pub fn encode(&self) -> BytesMut {
        let mut buf = BytesMut::new();
        self.encode_into(&mut buf);
        buf
    }

    /// Encode the response into an existing buffer
    pub fn encode_into(&self, buf: &mut BytesMut) {
        match self {
            Response::Ok(msg) => {
                buf.put_slice(b"+OK ");
                buf.put_slice(msg.as_bytes());
                buf.put_slice(b"\r\n");
            }
            Response::Error { code, message } => {
                buf.put_slice(b"-ERR ");
                buf.put_slice(code.as_bytes());
                buf.put_slice(b" ");
                buf.put_slice(message.as_bytes());
                buf.put_slice(b"\r\n");
            }
            Response::Bulk(data) => put_bulk(buf, data),
        }
    }
}

fn put_bulk(buf: &mut BytesMut, data: &[u8]) {
    buf.put_slice(b"$");
    buf.put_slice(data.len().to_string().as_bytes());
    buf.put_slice(b"\r\n");
    buf.put_slice(data);
    buf.put_slice(b"\r\n");
}
