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

//! mctp-bridge Constants - Single source of truth for all configuration values.
//!
//! This module centralizes protocol numbers, error codes, and configuration
//! constants to ensure consistency between the engine, the RPC layer and the CLI.

/// MCTP protocol and Linux socket numbers
pub mod mctp {
    /// Address family for MCTP sockets (`AF_MCTP` in linux/socket.h)
    pub const AF_MCTP: libc::c_int = 45;
    /// Wildcard network id
    pub const NET_ANY: u32 = 0;
    /// Wildcard endpoint id
    pub const ADDR_ANY: u8 = 0;
    /// Tag owner bit; set on requests so the kernel allocates a tag
    pub const TAG_OWNER: u8 = 0x08;
    /// Message type without the integrity check bit
    pub const TYPE_MASK: u8 = 0x7f;
    /// Ethertype used for MCTP frames on AF_PACKET sockets
    pub const ETH_P_MCTP: u16 = 0x00fa;
}

/// JSON-RPC 2.0 Error Codes
pub mod jsonrpc {
    /// Exchange failed for any reason other than a timeout (custom code)
    pub const ERROR_INTERNAL_FAILURE: i32 = -32000;
    /// No qualifying response before the deadline (custom code)
    pub const ERROR_TIMEOUT: i32 = -32001;
    /// Method not found (standard JSON-RPC)
    pub const ERROR_METHOD_NOT_FOUND: i32 = -32601;
    /// Invalid request (standard JSON-RPC)
    pub const ERROR_INVALID_REQUEST: i32 = -32600;
    /// Invalid params (standard JSON-RPC)
    pub const ERROR_INVALID_PARAMS: i32 = -32602;
    /// Parse error (standard JSON-RPC)
    pub const ERROR_PARSE: i32 = -32700;
}

/// Failure names reported to callers
pub mod failure {
    pub const TIMEOUT: &str = "xyz.openbmc_project.Common.Error.Timeout";
    pub const INTERNAL_FAILURE: &str = "xyz.openbmc_project.Common.Error.InternalFailure";
    pub const TIMEOUT_MESSAGE: &str = "Request Timed Out";
}

/// Configuration Environment Variables
pub mod config {
    pub const ENV_LOG_LEVEL: &str = "MCTP_BRIDGE_LOG_LEVEL";
    pub const ENV_LOG_FORMAT: &str = "MCTP_BRIDGE_LOG_FORMAT";
    pub const ENV_RECV_BUFFER: &str = "MCTP_BRIDGE_RECV_BUFFER";
    pub const ENV_MAX_DISCARDED_FRAMES: &str = "MCTP_BRIDGE_MAX_DISCARDED_FRAMES";
    pub const ENV_VERIFY_RESPONDER: &str = "MCTP_BRIDGE_VERIFY_RESPONDER";
    pub const ENV_MAX_MESSAGE_SIZE: &str = "MCTP_BRIDGE_MAX_MESSAGE_SIZE";
}

/// RPC Methods
pub mod methods {
    pub const SEND: &str = "Send";
    pub const SEND_RECEIVE: &str = "SendReceive";
    /// Name used by the first generation of the tool service
    pub const SEND_RECV: &str = "SendRecv";
    pub const SEND_RAW_FRAME: &str = "SendRawFrame";
    pub const SEND_RECEIVE_RAW_FRAME: &str = "SendReceiveRawFrame";
}

/// Buffer and transport limits
pub mod limits {
    /// Default receive buffer per exchange
    pub const DEFAULT_RECV_BUFFER_BYTES: usize = 4096;
    pub const MIN_RECV_BUFFER_BYTES: usize = 64;
    pub const MAX_RECV_BUFFER_BYTES: usize = 65536;
    /// Default cap on echoed frames skipped while waiting for a reply
    pub const DEFAULT_MAX_DISCARDED_FRAMES: usize = 4096;
    /// Maximum allowed JSON-RPC message size (1 MiB)
    pub const DEFAULT_MAX_MESSAGE_SIZE_BYTES: u64 = 1024 * 1024;
    /// Maximum size of a Content-Length header block
    pub const MAX_HEADER_BYTES: usize = 4096;
}
