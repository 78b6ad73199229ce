//! Request/response framing for one-request-per-connection transport
//!
//! Requests are an HTTP/1.1 request line, a header block and a body whose size
//! is declared by `Content-Length`. Responses carry a status line,
//! `Content-Type`/`Content-Length` headers and the encoded reply, and always
//! announce `Connection: close`.

use bytes::{BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::DahError;

/// Largest header block accepted before the blank line
pub const MAX_HEAD_BYTES: usize = 16 * 1024;

const HEAD_TERMINATOR: &[u8] = b"\r\n\r\n";

pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";
const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// A fully received inbound request
#[derive(Debug, Clone)]
pub struct InboundRequest {
    pub method: String,
    pub target: String,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl InboundRequest {
    pub fn path(&self) -> &str {
        self.target
            .split_once('?')
            .map_or(self.target.as_str(), |(path, _)| path)
    }

    pub fn query(&self) -> Option<&str> {
        self.target.split_once('?').map(|(_, query)| query)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Response written back on the same connection
#[derive(Debug, Clone)]
pub struct OutboundResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Bytes,
}

impl OutboundResponse {
    pub fn json(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            content_type: JSON_CONTENT_TYPE,
            body: body.into(),
        }
    }

    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: TEXT_CONTENT_TYPE,
            body: Bytes::from(body.into()),
        }
    }

    pub fn reason(&self) -> &'static str {
        match self.status {
            200 => "OK",
            400 => "Bad Request",
            404 => "Not Found",
            405 => "Method Not Allowed",
            413 => "Payload Too Large",
            500 => "Internal Server Error",
            _ => "Unknown",
        }
    }
}

#[derive(Debug)]
struct Head {
    method: String,
    target: String,
    headers: Vec<(String, String)>,
    content_length: usize,
}

/// Codec decoding [`InboundRequest`]s and encoding [`OutboundResponse`]s
#[derive(Debug)]
pub struct HttpFraming {
    max_body_bytes: usize,
    head: Option<Head>,
}

impl HttpFraming {
    pub fn new(max_body_bytes: usize) -> Self {
        Self {
            max_body_bytes,
            head: None,
        }
    }

    fn parse_head(&self, raw: &[u8]) -> Result<Head, DahError> {
        let text = std::str::from_utf8(raw)
            .map_err(|_| DahError::codec("header block is not valid UTF-8"))?;
        let mut lines = text.split("\r\n");

        let request_line = lines.next().unwrap_or_default();
        let mut parts = request_line.split_whitespace();
        let (method, target, version) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(m), Some(t), Some(v), None) => (m, t, v),
            _ => {
                return Err(DahError::codec(format!(
                    "malformed request line '{}'",
                    request_line
                )))
            }
        };
        if !version.starts_with("HTTP/1.") {
            return Err(DahError::codec(format!("unsupported protocol '{}'", version)));
        }

        let mut headers = Vec::new();
        for line in lines {
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| DahError::codec(format!("malformed header line '{}'", line)))?;
            headers.push((name.trim().to_string(), value.trim().to_string()));
        }

        if headers
            .iter()
            .any(|(n, _)| n.eq_ignore_ascii_case("transfer-encoding"))
        {
            return Err(DahError::codec("chunked bodies are not supported"));
        }

        let declared = headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case("content-length"))
            .map(|(_, v)| {
                v.parse::<usize>()
                    .map_err(|_| DahError::codec(format!("invalid Content-Length '{}'", v)))
            })
            .transpose()?;

        let content_length = match (method, declared) {
            (_, Some(length)) => length,
            ("POST", None) | ("PUT", None) => {
                return Err(DahError::codec("missing Content-Length"))
            }
            (_, None) => 0,
        };

        if content_length > self.max_body_bytes {
            return Err(DahError::codec(format!(
                "body of {} bytes exceeds limit of {} bytes",
                content_length, self.max_body_bytes
            )));
        }

        Ok(Head {
            method: method.to_string(),
            target: target.to_string(),
            headers,
            content_length,
        })
    }
}

impl Decoder for HttpFraming {
    type Item = InboundRequest;
    type Error = DahError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.head.is_none() {
            let Some(end) = src
                .windows(HEAD_TERMINATOR.len())
                .position(|w| w == HEAD_TERMINATOR)
            else {
                if src.len() > MAX_HEAD_BYTES {
                    return Err(DahError::codec("header block too large"));
                }
                return Ok(None);
            };
            if end > MAX_HEAD_BYTES {
                return Err(DahError::codec("header block too large"));
            }
            let raw = src.split_to(end + HEAD_TERMINATOR.len());
            self.head = Some(self.parse_head(&raw[..end])?);
        }

        let needed = self.head.as_ref().map_or(0, |h| h.content_length);
        if src.len() < needed {
            src.reserve(needed - src.len());
            return Ok(None);
        }

        let body = src.split_to(needed).freeze();
        let Some(head) = self.head.take() else {
            return Ok(None);
        };
        Ok(Some(InboundRequest {
            method: head.method,
            target: head.target,
            headers: head.headers,
            body,
        }))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(request) => Ok(Some(request)),
            None if src.is_empty() && self.head.is_none() => Ok(None),
            None => Err(DahError::codec("connection closed before the request was complete")),
        }
    }
}

impl Encoder<OutboundResponse> for HttpFraming {
    type Error = DahError;

    fn encode(&mut self, item: OutboundResponse, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let head = format!(
            "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            item.status,
            item.reason(),
            item.content_type,
            item.body.len()
        );
        dst.reserve(head.len() + item.body.len());
        dst.put_slice(head.as_bytes());
        dst.put_slice(&item.body);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn framing() -> HttpFraming {
        HttpFraming::new(1024)
    }

    #[test]
    fn decodes_request_in_pieces() {
        let mut codec = framing();
        let mut buf = BytesMut::from(&b"POST /Host HTTP/1.1\r\nHost: 127.0.0.1\r\nContent-Le"[..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(b"ngth: 5\r\n\r\nhel");
        assert!(codec.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(b"lo");
        let request = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(request.method, "POST");
        assert_eq!(request.path(), "/Host");
        assert_eq!(request.query(), None);
        assert_eq!(request.header("content-length"), Some("5"));
        assert_eq!(&request.body[..], b"hello");
        assert!(buf.is_empty());
    }

    #[test]
    fn get_without_length_has_empty_body() {
        let mut codec = framing();
        let mut buf = BytesMut::from(&b"GET /Host?definition HTTP/1.1\r\n\r\n"[..]);
        let request = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(request.path(), "/Host");
        assert_eq!(request.query(), Some("definition"));
        assert!(request.body.is_empty());
    }

    #[test]
    fn post_requires_length() {
        let mut codec = framing();
        let mut buf = BytesMut::from(&b"POST /Host HTTP/1.1\r\n\r\n{}"[..]);
        assert!(matches!(codec.decode(&mut buf), Err(DahError::Codec(_))));
    }

    #[test]
    fn rejects_malformed_heads() {
        for raw in [
            &b"POST\r\n\r\n"[..],
            &b"POST /Host SPDY/3\r\nContent-Length: 0\r\n\r\n"[..],
            &b"POST /Host HTTP/1.1\r\nno-colon-here\r\n\r\n"[..],
            &b"POST /Host HTTP/1.1\r\nContent-Length: many\r\n\r\n"[..],
            &b"POST /Host HTTP/1.1\r\nContent-Length: 4096\r\n\r\n"[..],
        ] {
            let mut buf = BytesMut::from(raw);
            assert!(framing().decode(&mut buf).is_err(), "{:?}", raw);
        }
    }

    #[test]
    fn eof_mid_body_is_an_error() {
        let mut codec = framing();
        let mut buf = BytesMut::from(&b"POST /Host HTTP/1.1\r\nContent-Length: 10\r\n\r\nabc"[..]);
        assert!(codec.decode_eof(&mut buf).is_err());

        let mut codec = framing();
        let mut empty = BytesMut::new();
        assert!(codec.decode_eof(&mut empty).unwrap().is_none());
    }

    #[test]
    fn encodes_response() {
        let mut codec = framing();
        let mut buf = BytesMut::new();
        codec
            .encode(OutboundResponse::json(200, &b"{\"Result\":true}"[..]), &mut buf)
            .unwrap();
        let text = std::str::from_utf8(&buf).unwrap();
        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.contains("Content-Length: 15\r\n"));
        assert!(text.contains("Connection: close\r\n"));
        assert!(text.ends_with("\r\n\r\n{\"Result\":true}"));
    }
}
