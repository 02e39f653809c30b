/*
 * Copyright (C) 2026 Mark Wells Dev
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

//! JSON-RPC message types and Content-Length framing.
//!
//! WebSocket transports carry one JSON-RPC message per text frame, so only
//! the worker stdio channel uses the Content-Length framing here.

use anyhow::{Context, Result, anyhow};
use bytes::{Buf, BytesMut};
use serde::{Deserialize, Serialize};

/// The JSON-RPC protocol version carried in every message.
pub const JSONRPC_VERSION: &str = "2.0";

/// `MethodNotFound` per the JSON-RPC spec.
pub const METHOD_NOT_FOUND: i64 = -32601;

fn default_null() -> serde_json::Value {
    serde_json::Value::Null
}

/// A request id, which servers may echo back as a number or a string.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum RequestId {
    /// Numeric id (the form this client generates).
    Number(i64),
    /// String id (accepted from servers).
    String(String),
}

impl From<i64> for RequestId {
    fn from(n: i64) -> Self {
        Self::Number(n)
    }
}

/// An outgoing or incoming JSON-RPC request.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RequestMessage {
    /// Always "2.0".
    pub jsonrpc: String,
    /// Correlates the response.
    pub id: RequestId,
    /// The method name.
    pub method: String,
    /// Method parameters, `null` when absent.
    #[serde(default = "default_null")]
    pub params: serde_json::Value,
}

impl RequestMessage {
    /// Builds a request with the protocol version filled in.
    #[must_use]
    pub fn new(id: RequestId, method: &str, params: serde_json::Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            method: method.to_string(),
            params,
        }
    }
}

/// A JSON-RPC response carrying either a result or an error.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ResponseMessage {
    /// Always "2.0".
    pub jsonrpc: String,
    /// The id of the request being answered.
    pub id: Option<RequestId>,
    /// Present on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    /// Present on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ResponseError>,
}

impl ResponseMessage {
    /// The reply sent for server-to-client requests this client does not
    /// implement, so the server is never left waiting.
    #[must_use]
    pub fn method_not_found(id: RequestId, method: &str) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: Some(id),
            result: None,
            error: Some(ResponseError {
                code: METHOD_NOT_FOUND,
                message: format!("Method '{method}' not supported by client"),
                data: None,
            }),
        }
    }
}

/// A JSON-RPC notification (no response expected).
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NotificationMessage {
    /// Always "2.0".
    pub jsonrpc: String,
    /// The method name.
    pub method: String,
    /// Method parameters, `null` when absent.
    #[serde(default = "default_null")]
    pub params: serde_json::Value,
}

impl NotificationMessage {
    /// Builds a notification with the protocol version filled in.
    #[must_use]
    pub fn new(method: &str, params: serde_json::Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.to_string(),
            params,
        }
    }
}

/// The error object inside a failed response.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ResponseError {
    /// JSON-RPC error code.
    pub code: i64,
    /// Human-readable message.
    pub message: String,
    /// Optional structured data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// Wraps a message body in a Content-Length frame.
#[must_use]
pub fn encode_frame(body: &str) -> String {
    format!("Content-Length: {}\r\n\r\n{body}", body.len())
}

/// Extracts the next complete frame body from `buffer`, if one has fully
/// arrived. Consumed bytes are removed from the buffer.
///
/// # Errors
///
/// Returns an error for malformed headers: non-UTF-8 bytes, a complete
/// header block without `Content-Length`, or an unparseable length.
pub fn decode_frame(buffer: &mut BytesMut) -> Result<Option<String>> {
    let Some(header_end) = buffer.windows(4).position(|w| w == b"\r\n\r\n") else {
        return Ok(None);
    };
    let header_len = header_end + 4;

    let headers =
        std::str::from_utf8(&buffer[..header_end]).context("frame headers are not UTF-8")?;

    let mut content_length = None;
    for line in headers.split("\r\n") {
        if let Some((name, value)) = line.split_once(':')
            && name.trim().eq_ignore_ascii_case("content-length")
        {
            content_length = Some(
                value
                    .trim()
                    .parse::<usize>()
                    .context("invalid Content-Length value")?,
            );
        }
    }
    let content_length =
        content_length.ok_or_else(|| anyhow!("frame is missing a Content-Length header"))?;

    if buffer.len() < header_len + content_length {
        return Ok(None);
    }

    buffer.advance(header_len);
    let body = buffer.split_to(content_length);
    String::from_utf8(body.to_vec())
        .map(Some)
        .context("frame body is not UTF-8")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_complete_frame() {
        let body = r#"{"jsonrpc":"2.0","id":1,"method":"initialize"}"#;
        let mut buffer = BytesMut::from(encode_frame(body).as_str());

        let result = decode_frame(&mut buffer).unwrap();
        assert_eq!(result, Some(body.to_string()));
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_decode_incomplete_header() {
        let mut buffer = BytesMut::from("Content-Length: 10\r\n");
        assert_eq!(decode_frame(&mut buffer).unwrap(), None);
    }

    #[test]
    fn test_decode_incomplete_body() {
        let mut buffer = BytesMut::from("Content-Length: 100\r\n\r\n{\"partial\":");
        assert_eq!(decode_frame(&mut buffer).unwrap(), None);
    }

    #[test]
    fn test_decode_multiple_frames() {
        let body1 = r#"{"jsonrpc":"2.0","id":1}"#;
        let body2 = r#"{"jsonrpc":"2.0","id":2}"#;
        let raw = format!("{}{}", encode_frame(body1), encode_frame(body2));
        let mut buffer = BytesMut::from(raw.as_str());

        assert_eq!(decode_frame(&mut buffer).unwrap(), Some(body1.to_string()));
        assert_eq!(decode_frame(&mut buffer).unwrap(), Some(body2.to_string()));
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_decode_case_insensitive_header() {
        let body = r#"{"test":true}"#;
        let raw = format!("content-length: {}\r\n\r\n{}", body.len(), body);
        let mut buffer = BytesMut::from(raw.as_str());

        assert_eq!(decode_frame(&mut buffer).unwrap(), Some(body.to_string()));
    }

    #[test]
    fn test_decode_missing_content_length_is_error() {
        let mut buffer = BytesMut::from("X-Other: 1\r\n\r\n{}");
        assert!(decode_frame(&mut buffer).is_err());
    }

    #[test]
    fn test_request_id_number() {
        let json = r#"{"jsonrpc":"2.0","id":42,"method":"test"}"#;
        let msg: RequestMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.id, RequestId::Number(42));
    }

    #[test]
    fn test_request_id_string() {
        let json = r#"{"jsonrpc":"2.0","id":"abc-123","method":"test"}"#;
        let msg: RequestMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.id, RequestId::String("abc-123".to_string()));
    }

    #[test]
    fn test_response_with_error() {
        let json =
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32600,"message":"Invalid Request"}}"#;
        let msg: ResponseMessage = serde_json::from_str(json).unwrap();
        assert!(msg.result.is_none());
        assert_eq!(msg.error.unwrap().code, -32600);
    }

    #[test]
    fn test_method_not_found_reply() {
        let reply = ResponseMessage::method_not_found(RequestId::Number(7), "workspace/configuration");
        let error = reply.error.unwrap();
        assert_eq!(error.code, METHOD_NOT_FOUND);
        assert!(error.message.contains("workspace/configuration"));
    }
}
