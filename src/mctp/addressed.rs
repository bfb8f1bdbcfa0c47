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

//! Kernel MCTP sockets (`AF_MCTP`, `SOCK_DGRAM`).
//!
//! AF_MCTP has no `connect()`: the remote address is validated and kept on
//! the socket, and every send goes out with `sendto`. Replies to a request
//! sent with the tag owner bit are routed by the kernel to the socket that
//! sent it, so no `bind()` is needed.

use async_trait::async_trait;
use std::io;
use tracing::trace;

use crate::engine_core::constants::{limits, mctp};
use crate::engine_core::models::{Datagram, EndpointAddress};
use crate::engine_core::traits::{MessageSocket, MessageTransport};
use crate::mctp::fd::AsyncSocket;
use crate::mctp::sys::{self, SockaddrMctp};

#[derive(Debug, Clone)]
pub struct MctpTransport {
    recv_buffer_size: usize,
}

impl MctpTransport {
    pub fn new(recv_buffer_size: usize) -> Self {
        Self { recv_buffer_size }
    }
}

impl Default for MctpTransport {
    fn default() -> Self {
        Self::new(limits::DEFAULT_RECV_BUFFER_BYTES)
    }
}

#[async_trait]
impl MessageTransport for MctpTransport {
    type Socket = MctpSocket;

    async fn open(&self) -> io::Result<MctpSocket> {
        let fd = sys::socket(mctp::AF_MCTP, libc::SOCK_DGRAM, 0)?;
        let io = AsyncSocket::new(fd)?;
        trace!(fd = io.as_raw_fd(), "opened mctp socket");
        Ok(MctpSocket {
            io,
            buf: vec![0; self.recv_buffer_size],
            remote: None,
        })
    }
}

#[derive(Debug)]
pub struct MctpSocket {
    io: AsyncSocket,
    buf: Vec<u8>,
    remote: Option<SockaddrMctp>,
}

#[async_trait]
impl MessageSocket for MctpSocket {
    async fn connect(&mut self, remote: &EndpointAddress) -> io::Result<()> {
        if remote.endpoint_id == mctp::ADDR_ANY {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "endpoint id 0 is not a valid destination",
            ));
        }
        self.remote = Some(SockaddrMctp::from_address(remote));
        Ok(())
    }

    async fn send(&mut self, payload: &[u8]) -> io::Result<()> {
        let remote = self.remote.ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotConnected, "no destination address")
        })?;
        let sent = self
            .io
            .write_with(|fd| sys::send_to(fd, payload, &remote))
            .await?;
        if sent != payload.len() {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("short send: {} of {} bytes", sent, payload.len()),
            ));
        }
        Ok(())
    }

    async fn recv(&mut self) -> io::Result<Datagram> {
        let buf = &mut self.buf;
        let (wire_len, source) = self
            .io
            .read_with(|fd| sys::recv_from::<SockaddrMctp>(fd, buf.as_mut_slice()))
            .await?;
        let kept = wire_len.min(self.buf.len());
        Ok(Datagram {
            data: self.buf[..kept].to_vec(),
            wire_len,
            source: Some(source.to_address()),
        })
    }
}

impl Drop for MctpSocket {
    fn drop(&mut self) {
        trace!(fd = self.io.as_raw_fd(), "closing mctp socket");
    }
}
