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

//! Addressed exchange engine.
//!
//! Sends messages to `(network, eid, type)` destinations and, for
//! request/response exchanges, waits for the reply the kernel routes back to
//! the same socket. Every call opens its own socket and drops it before
//! returning, on success and on every error path.

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::engine_core::errors::{ExchangeError, Stage};
use crate::engine_core::models::{Deadline, EndpointAddress};
use crate::engine_core::traits::{MessageSocket, MessageTransport};

#[derive(Debug, Clone, Default)]
pub struct AddressedOptions {
    /// Check the source address of every reply instead of trusting the
    /// kernel's tag correlation. Mismatching datagrams are skipped.
    pub verify_responder: bool,
}

pub struct AddressedExchange<T> {
    transport: T,
    options: AddressedOptions,
}

impl<T: MessageTransport> AddressedExchange<T> {
    pub fn new(transport: T) -> Self {
        Self::with_options(transport, AddressedOptions::default())
    }

    pub fn with_options(transport: T, options: AddressedOptions) -> Self {
        Self { transport, options }
    }

    /// Transmit `payload` to `dest` without waiting for a reply.
    pub async fn send(&self, dest: EndpointAddress, payload: &[u8]) -> Result<(), ExchangeError> {
        let mut socket = self.open(&dest).await?;
        socket
            .send(payload)
            .await
            .map_err(|e| ExchangeError::transport(Stage::Send, e))?;
        debug!(%dest, len = payload.len(), "message sent");
        Ok(())
    }

    /// Transmit `payload` to `dest` and return the first reply.
    ///
    /// The deadline is armed before transmitting and bounds both the send and
    /// the wait. Cancelling `cancel` abandons the exchange.
    pub async fn send_receive(
        &self,
        dest: EndpointAddress,
        payload: &[u8],
        deadline: Deadline,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, ExchangeError> {
        let mut socket = self.open(&dest).await?;
        let expires_at = deadline.arm();

        let exchange = async {
            socket
                .send(payload)
                .await
                .map_err(|e| ExchangeError::transport(Stage::Send, e))?;
            trace!(%dest, len = payload.len(), "request sent, awaiting response");
            self.await_response(&mut socket, &dest, deadline, expires_at).await
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ExchangeError::Cancelled),
            outcome = tokio::time::timeout_at(expires_at, exchange) => {
                outcome.unwrap_or_else(|_| Err(deadline.expired()))
            }
        }
    }

    async fn open(&self, dest: &EndpointAddress) -> Result<T::Socket, ExchangeError> {
        let mut socket = self
            .transport
            .open()
            .await
            .map_err(|e| ExchangeError::transport(Stage::Open, e))?;
        socket
            .connect(dest)
            .await
            .map_err(|e| ExchangeError::transport(Stage::Bind, e))?;
        Ok(socket)
    }

    async fn await_response(
        &self,
        socket: &mut T::Socket,
        dest: &EndpointAddress,
        deadline: Deadline,
        expires_at: Instant,
    ) -> Result<Vec<u8>, ExchangeError> {
        loop {
            let datagram = socket
                .recv()
                .await
                .map_err(|e| ExchangeError::transport(Stage::Receive, e))?;

            if datagram.is_truncated() {
                return Err(ExchangeError::Truncated {
                    len: datagram.wire_len,
                    capacity: datagram.data.len(),
                });
            }

            if !self.options.verify_responder {
                return Ok(datagram.data);
            }

            match datagram.source {
                Some(source) if dest.accepts_response_from(&source) => return Ok(datagram.data),
                source => {
                    debug!(
                        expected = %dest,
                        source = ?source,
                        len = datagram.data.len(),
                        "discarding datagram from unexpected responder"
                    );
                    if Instant::now() >= expires_at {
                        return Err(deadline.expired());
                    }
                }
            }
        }
    }
}
