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

//! Domain models for the mctp-bridge.
//!
//! This module contains pure data structures representing endpoint
//! addresses, received units, deadlines and the JSON-RPC envelope.
//! It is designed to be free of I/O side effects.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

use crate::engine_core::constants::mctp;
use crate::engine_core::errors::ExchangeError;

/// Newtype wrapper around Uuid used to correlate the log lines of one exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExchangeId(Uuid);

impl ExchangeId {
    /// Generate a new random ExchangeId
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ExchangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Destination of an addressed exchange.
///
/// Mirrors the fields of the kernel's `sockaddr_mctp`. Requests always carry
/// the tag owner bit so the kernel allocates a tag and routes the reply back
/// to the same socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EndpointAddress {
    pub network_id: u32,
    pub endpoint_id: u8,
    pub message_type: u8,
    pub tag: u8,
}

impl EndpointAddress {
    /// Address for an outgoing request; `network_id` 0 means any network.
    pub fn request(network_id: u32, endpoint_id: u8, message_type: u8) -> Self {
        Self {
            network_id,
            endpoint_id,
            message_type,
            tag: mctp::TAG_OWNER,
        }
    }

    pub fn is_tag_owner(&self) -> bool {
        self.tag & mctp::TAG_OWNER != 0
    }

    /// Whether a datagram from `source` can be the reply to a request sent to `self`.
    ///
    /// Replies come from the requested endpoint, carry the same message type
    /// and have the tag owner bit cleared.
    pub fn accepts_response_from(&self, source: &EndpointAddress) -> bool {
        let same_network =
            self.network_id == mctp::NET_ANY || self.network_id == source.network_id;
        same_network
            && source.endpoint_id == self.endpoint_id
            && source.message_type & mctp::TYPE_MASK == self.message_type & mctp::TYPE_MASK
            && !source.is_tag_owner()
    }
}

impl fmt::Display for EndpointAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "net={} eid={} type={:#04x} tag={:#04x}",
            self.network_id, self.endpoint_id, self.message_type, self.tag
        )
    }
}

/// One unit returned by an addressed socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datagram {
    pub data: Vec<u8>,
    /// Length of the unit on the wire; larger than `data.len()` when truncated
    pub wire_len: usize,
    pub source: Option<EndpointAddress>,
}

impl Datagram {
    pub fn new(data: Vec<u8>) -> Self {
        let wire_len = data.len();
        Self {
            data,
            wire_len,
            source: None,
        }
    }

    pub fn from_source(data: Vec<u8>, source: EndpointAddress) -> Self {
        Self {
            source: Some(source),
            ..Self::new(data)
        }
    }

    pub fn is_truncated(&self) -> bool {
        self.wire_len > self.data.len()
    }
}

/// Direction tag the capture layer attaches to every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Transmitted by this host, including the echo of our own frame
    Outgoing,
    /// Received from a peer
    Incoming,
}

/// One frame returned by a capture socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedFrame {
    pub direction: Direction,
    pub data: Vec<u8>,
    pub wire_len: usize,
}

impl CapturedFrame {
    pub fn outgoing(data: Vec<u8>) -> Self {
        Self::new(Direction::Outgoing, data)
    }

    pub fn incoming(data: Vec<u8>) -> Self {
        Self::new(Direction::Incoming, data)
    }

    pub fn new(direction: Direction, data: Vec<u8>) -> Self {
        let wire_len = data.len();
        Self {
            direction,
            data,
            wire_len,
        }
    }

    pub fn is_truncated(&self) -> bool {
        self.wire_len > self.data.len()
    }
}

/// Relative time budget of one exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline(Duration);

impl Deadline {
    /// Zero is rejected: a zero socket timeout would block forever.
    pub fn from_millis(millis: u64) -> Result<Self, ExchangeError> {
        if millis == 0 {
            return Err(ExchangeError::InvalidDeadline(
                "timeout must be at least 1ms".to_string(),
            ));
        }
        Ok(Self(Duration::from_millis(millis)))
    }

    pub fn duration(&self) -> Duration {
        self.0
    }

    /// Absolute instant at which the exchange gives up, counted from now.
    pub fn arm(&self) -> Instant {
        Instant::now() + self.0
    }

    pub fn expired(&self) -> ExchangeError {
        ExchangeError::Timeout { after: self.0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: Option<serde_json::Value>,
    #[serde(default)]
    pub id: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    pub id: serde_json::Value,
}

impl JsonRpcResponse {
    pub fn success(id: serde_json::Value, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn failure(id: serde_json::Value, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(error),
            id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_address_sets_tag_owner() {
        let addr = EndpointAddress::request(0, 8, 1);
        assert_eq!(addr.tag, mctp::TAG_OWNER);
        assert!(addr.is_tag_owner());
        assert_eq!(addr.to_string(), "net=0 eid=8 type=0x01 tag=0x08");
    }

    #[test]
    fn test_accepts_response_from_peer() {
        let request = EndpointAddress::request(mctp::NET_ANY, 8, 1);
        let reply = EndpointAddress {
            network_id: 1,
            endpoint_id: 8,
            message_type: 1,
            tag: 0x03,
        };
        assert!(request.accepts_response_from(&reply));

        // Integrity check bit does not change the message type
        let reply_ic = EndpointAddress {
            message_type: 0x81,
            ..reply
        };
        assert!(request.accepts_response_from(&reply_ic));
    }

    #[test]
    fn test_rejects_mismatched_responder() {
        let request = EndpointAddress::request(2, 8, 1);
        let reply = EndpointAddress {
            network_id: 2,
            endpoint_id: 8,
            message_type: 1,
            tag: 0x01,
        };

        let other_eid = EndpointAddress {
            endpoint_id: 9,
            ..reply
        };
        let other_type = EndpointAddress {
            message_type: 2,
            ..reply
        };
        let other_net = EndpointAddress {
            network_id: 3,
            ..reply
        };
        let a_request = EndpointAddress {
            tag: mctp::TAG_OWNER | 0x01,
            ..reply
        };

        assert!(request.accepts_response_from(&reply));
        assert!(!request.accepts_response_from(&other_eid));
        assert!(!request.accepts_response_from(&other_type));
        assert!(!request.accepts_response_from(&other_net));
        assert!(!request.accepts_response_from(&a_request));
    }

    #[test]
    fn test_deadline_rejects_zero() {
        let err = Deadline::from_millis(0).unwrap_err();
        assert!(matches!(err, ExchangeError::InvalidDeadline(_)));

        let deadline = Deadline::from_millis(100).unwrap();
        assert_eq!(deadline.duration(), Duration::from_millis(100));
        assert!(deadline.expired().is_timeout());
    }

    #[test]
    fn test_truncation_is_detected() {
        let mut datagram = Datagram::new(vec![0u8; 16]);
        assert!(!datagram.is_truncated());
        datagram.wire_len = 32;
        assert!(datagram.is_truncated());

        let frame = CapturedFrame::incoming(vec![1, 2, 3]);
        assert_eq!(frame.direction, Direction::Incoming);
        assert!(!frame.is_truncated());
    }

    #[test]
    fn test_response_omits_empty_members() {
        let ok = JsonRpcResponse::success(serde_json::json!(1), serde_json::Value::Null);
        let text = serde_json::to_string(&ok).unwrap();
        assert!(text.contains("\"result\":null"));
        assert!(!text.contains("error"));
    }
}
