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

//! Raw interface capture engine.
//!
//! Sends complete frames on a named interface and waits for a peer's frame.
//! The capture socket is promiscuous, so it also receives a copy of every
//! frame this host transmits, starting with the one we just sent. Those
//! echoes are tagged `Outgoing` and skipped; the first `Incoming` frame is
//! the answer.
//!
//! The wait ends at the deadline no matter how many echoes arrive. Any
//! receive error other than the deadline aborts the exchange immediately.

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::engine_core::constants::limits;
use crate::engine_core::errors::{ExchangeError, Stage};
use crate::engine_core::models::{Deadline, Direction};
use crate::engine_core::traits::{CaptureSocket, FrameTransport};

#[derive(Debug, Clone)]
pub struct CaptureOptions {
    /// Stop waiting after this many skipped outgoing frames. `None` leaves
    /// the deadline as the only bound.
    pub max_discarded_frames: Option<usize>,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            max_discarded_frames: Some(limits::DEFAULT_MAX_DISCARDED_FRAMES),
        }
    }
}

pub struct RawCaptureExchange<T> {
    transport: T,
    options: CaptureOptions,
}

impl<T: FrameTransport> RawCaptureExchange<T> {
    pub fn new(transport: T) -> Self {
        Self::with_options(transport, CaptureOptions::default())
    }

    pub fn with_options(transport: T, options: CaptureOptions) -> Self {
        Self { transport, options }
    }

    /// Transmit `frame` verbatim on `interface`.
    pub async fn send_raw_frame(&self, interface: &str, frame: &[u8]) -> Result<(), ExchangeError> {
        let mut socket = self.open(interface).await?;
        socket
            .send(frame)
            .await
            .map_err(|e| ExchangeError::transport(Stage::Send, e))?;
        debug!(interface, len = frame.len(), "frame sent");
        Ok(())
    }

    /// Transmit `frame` on `interface` and return the first incoming frame.
    pub async fn send_receive_raw_frame(
        &self,
        interface: &str,
        frame: &[u8],
        deadline: Deadline,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, ExchangeError> {
        let mut socket = self.open(interface).await?;
        let expires_at = deadline.arm();

        let exchange = async {
            socket
                .send(frame)
                .await
                .map_err(|e| ExchangeError::transport(Stage::Send, e))?;
            trace!(interface, len = frame.len(), "frame sent, awaiting reply");
            self.await_incoming(&mut socket, deadline, expires_at).await
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ExchangeError::Cancelled),
            outcome = tokio::time::timeout_at(expires_at, exchange) => {
                outcome.unwrap_or_else(|_| Err(deadline.expired()))
            }
        }
    }

    async fn open(&self, interface: &str) -> Result<T::Socket, ExchangeError> {
        let mut socket = self
            .transport
            .open()
            .await
            .map_err(|e| ExchangeError::transport(Stage::Open, e))?;
        socket
            .bind(interface)
            .await
            .map_err(|e| ExchangeError::transport(Stage::Bind, e))?;
        Ok(socket)
    }

    async fn await_incoming(
        &self,
        socket: &mut T::Socket,
        deadline: Deadline,
        expires_at: Instant,
    ) -> Result<Vec<u8>, ExchangeError> {
        let mut discarded = 0usize;
        loop {
            // A socket that always has an echo ready never yields to the
            // timer, so the deadline is also checked here.
            if Instant::now() >= expires_at {
                debug!(discarded, "deadline reached while skipping outgoing frames");
                return Err(deadline.expired());
            }

            let frame = socket
                .recv()
                .await
                .map_err(|e| ExchangeError::transport(Stage::Receive, e))?;

            match frame.direction {
                Direction::Outgoing => {
                    discarded += 1;
                    trace!(discarded, len = frame.data.len(), "skipping outgoing frame");
                    if let Some(cap) = self.options.max_discarded_frames {
                        if discarded >= cap {
                            warn!(discarded, "too many outgoing frames while waiting for a reply");
                            return Err(deadline.expired());
                        }
                    }
                }
                Direction::Incoming => {
                    if frame.is_truncated() {
                        return Err(ExchangeError::Truncated {
                            len: frame.wire_len,
                            capacity: frame.data.len(),
                        });
                    }
                    debug!(discarded, len = frame.data.len(), "accepted incoming frame");
                    return Ok(frame.data);
                }
            }
        }
    }
}
