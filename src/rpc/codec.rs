// Copyright 2026 BadCompany
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! RPC Transport Codec.
//!
//! Frames JSON-RPC messages with LSP-style `Content-Length` headers so that
//! binary payloads and embedded newlines never break message boundaries.

use crate::engine_core::constants::limits;
use crate::engine_core::models::{JsonRpcRequest, JsonRpcResponse};
use anyhow::{anyhow, Context, Result};
use bytes::BytesMut;
use serde::Serialize;
use serde_json::Value;
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, trace};

/// One framed message from the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Message(Value),
    /// Framing was intact but the body is not JSON. Decoding can continue.
    Malformed(String),
}

impl Inbound {
    pub fn into_message(self) -> Option<Value> {
        match self {
            Inbound::Message(val) => Some(val),
            Inbound::Malformed(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecodeState {
    Head,
    Body(usize),
}

pub struct RpcCodec {
    state: DecodeState,
    max_message_size: u64,
}

impl RpcCodec {
    #[must_use]
    pub fn new(max_message_size: u64) -> Self {
        Self {
            state: DecodeState::Head,
            max_message_size,
        }
    }

    /// Offset just past the blank line ending the header block, if present.
    fn header_end(src: &[u8]) -> Option<usize> {
        for i in 0..src.len() {
            if src[i] != b'\n' {
                continue;
            }
            // \n\n
            if i >= 1 && src[i - 1] == b'\n' {
                return Some(i + 1);
            }
            // \r\n\r\n
            if i >= 3 && src[i - 1] == b'\r' && src[i - 2] == b'\n' && src[i - 3] == b'\r' {
                return Some(i + 1);
            }
        }
        None
    }

    fn content_length(headers: &str) -> Result<usize> {
        let mut len = None;
        for line in headers.lines() {
            if let Some((name, value)) = line.split_once(':') {
                if name.trim().eq_ignore_ascii_case("content-length") {
                    let parsed = value
                        .trim()
                        .parse::<usize>()
                        .context("Invalid content-length value")?;
                    debug!("Found Content-Length: {}", parsed);
                    len = Some(parsed);
                }
            }
        }
        match len {
            Some(n) if n > 0 => Ok(n),
            _ => Err(anyhow!("Missing or invalid Content-Length header")),
        }
    }

    fn encode_body<T: Serialize>(item: &T, dst: &mut BytesMut) -> Result<()> {
        let body = serde_json::to_vec(item)?;
        let header = format!("Content-Length: {}\r\n\r\n", body.len());
        dst.extend_from_slice(header.as_bytes());
        dst.extend_from_slice(&body);
        Ok(())
    }
}

impl Default for RpcCodec {
    fn default() -> Self {
        Self::new(limits::DEFAULT_MAX_MESSAGE_SIZE_BYTES)
    }
}

impl Decoder for RpcCodec {
    type Item = Inbound;
    type Error = anyhow::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        trace!("Decoder attempting to read from {} bytes buffer", src.len());
        loop {
            match self.state {
                DecodeState::Head => {
                    let Some(end) = Self::header_end(src) else {
                        if src.len() > limits::MAX_HEADER_BYTES {
                            return Err(anyhow!("Header too large"));
                        }
                        return Ok(None);
                    };

                    let header_bytes = src.split_to(end);
                    let headers =
                        std::str::from_utf8(&header_bytes).context("Invalid UTF-8 in headers")?;
                    let len = Self::content_length(headers)?;

                    if len as u64 > self.max_message_size {
                        return Err(anyhow!("Message length {} exceeds max limit", len));
                    }

                    self.state = DecodeState::Body(len);
                }
                DecodeState::Body(len) => {
                    if src.len() < len {
                        src.reserve(len - src.len());
                        return Ok(None);
                    }
                    let body = src.split_to(len);
                    self.state = DecodeState::Head;
                    return match serde_json::from_slice::<Value>(&body) {
                        Ok(val) => {
                            trace!("Decoded message: {:?}", val);
                            Ok(Some(Inbound::Message(val)))
                        }
                        Err(e) => {
                            debug!("Discarding malformed body: {}", e);
                            let reason = format!("Invalid JSON in message body: {}", e);
                            Ok(Some(Inbound::Malformed(reason)))
                        }
                    };
                }
            }
        }
    }
}

impl<'a> Encoder<&'a JsonRpcRequest> for RpcCodec {
    type Error = anyhow::Error;
    fn encode(&mut self, item: &'a JsonRpcRequest, dst: &mut BytesMut) -> Result<()> {
        Self::encode_body(item, dst)
    }
}

impl<'a> Encoder<&'a JsonRpcResponse> for RpcCodec {
    type Error = anyhow::Error;
    fn encode(&mut self, item: &'a JsonRpcResponse, dst: &mut BytesMut) -> Result<()> {
        Self::encode_body(item, dst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decodes_split_message() {
        let mut codec = RpcCodec::default();
        let body = r#"{"jsonrpc":"2.0","method":"Send","id":1}"#;
        let framed = format!("Content-Length: {}\r\n\r\n{}", body.len(), body);

        let mut buf = BytesMut::from(&framed.as_bytes()[..10]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
        buf.extend_from_slice(&framed.as_bytes()[10..]);
        let value = codec.decode(&mut buf).unwrap().and_then(Inbound::into_message).unwrap();
        assert_eq!(value["method"], "Send");
        assert!(buf.is_empty());
    }

    #[test]
    fn test_decodes_back_to_back_messages() {
        let mut codec = RpcCodec::default();
        let mut buf = BytesMut::new();
        for id in 1..=2 {
            let req = JsonRpcRequest {
                jsonrpc: "2.0".to_string(),
                method: "SendReceive".to_string(),
                params: Some(json!({"endpoint_id": 8})),
                id: Some(json!(id)),
            };
            codec.encode(&req, &mut buf).unwrap();
        }
        let mut next_id = || {
            let value = codec.decode(&mut buf).unwrap().and_then(Inbound::into_message);
            value.unwrap()["id"].clone()
        };
        assert_eq!(next_id(), 1);
        assert_eq!(next_id(), 2);
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn test_accepts_bare_newline_headers() {
        let mut codec = RpcCodec::default();
        let mut buf = BytesMut::from("content-length: 2\n\n{}");
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(Inbound::Message(json!({}))));
    }

    #[test]
    fn test_bad_body_keeps_stream_in_sync() {
        let mut codec = RpcCodec::default();
        let good = r#"{"id":7}"#;
        let mut buf = BytesMut::from(
            format!("Content-Length: 9\r\n\r\n{{not jsonContent-Length: {}\r\n\r\n{}", good.len(), good).as_str(),
        );

        assert!(matches!(codec.decode(&mut buf).unwrap(), Some(Inbound::Malformed(_))));
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(Inbound::Message(json!({"id": 7}))));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_rejects_oversized_message() {
        let mut codec = RpcCodec::new(16);
        let mut buf = BytesMut::from("Content-Length: 17\r\n\r\n");
        assert!(codec.decode(&mut buf).is_err());
    }

    #[test]
    fn test_rejects_missing_length() {
        let mut codec = RpcCodec::default();
        let mut buf = BytesMut::from("X-Other: 1\r\n\r\n{}");
        assert!(codec.decode(&mut buf).is_err());
    }
}
