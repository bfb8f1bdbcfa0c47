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

//! Error types for the exchange engines and the bridge process.

use std::fmt;
use std::io;
use std::time::Duration;
use thiserror::Error;

/// Step of an exchange at which the transport failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Open,
    Bind,
    Send,
    Receive,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Open => "open",
            Stage::Bind => "bind",
            Stage::Send => "send",
            Stage::Receive => "receive",
        };
        f.write_str(name)
    }
}

/// Failure kinds visible to RPC callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Timeout,
    InternalFailure,
}

/// Outcome of a failed exchange.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ExchangeError {
    /// No qualifying unit arrived before the deadline
    #[error("no response within {}ms", .after.as_millis())]
    Timeout { after: Duration },

    /// The underlying socket reported an error
    #[error("{stage} failed: {source}")]
    Transport {
        stage: Stage,
        #[source]
        source: io::Error,
    },

    /// Deadline of zero or out of range
    #[error("invalid deadline: {0}")]
    InvalidDeadline(String),

    /// Received unit did not fit the receive buffer
    #[error("response of {len} bytes exceeds receive buffer of {capacity} bytes")]
    Truncated { len: usize, capacity: usize },

    /// Exchange abandoned because the service is shutting down
    #[error("exchange cancelled")]
    Cancelled,
}

impl ExchangeError {
    pub fn transport(stage: Stage, source: io::Error) -> Self {
        ExchangeError::Transport { stage, source }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            ExchangeError::Timeout { .. } => FailureKind::Timeout,
            _ => FailureKind::InternalFailure,
        }
    }

    pub fn is_timeout(&self) -> bool {
        self.kind() == FailureKind::Timeout
    }
}

/// Errors raised by the bridge process outside of an exchange.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O Error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
