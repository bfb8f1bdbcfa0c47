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

//! Promiscuous frame capture on one interface (`AF_PACKET`, `SOCK_RAW`).
//!
//! The socket is opened with protocol 0 so the kernel queues nothing until
//! `bind` names the interface. `bind` then listens with `ETH_P_ALL`, which
//! is the only protocol for which the kernel also delivers frames
//! transmitted by this host. Those arrive with
//! `sll_pkttype == PACKET_OUTGOING` and are reported as
//! [`Direction::Outgoing`].

use async_trait::async_trait;
use std::io;
use tracing::trace;

use crate::engine_core::constants::{limits, mctp};
use crate::engine_core::models::{CapturedFrame, Direction};
use crate::engine_core::traits::{CaptureSocket, FrameTransport};
use crate::mctp::fd::AsyncSocket;
use crate::mctp::sys::{self, PacketMreq, RawSockAddr};

fn eth_p_all_be() -> u16 {
    (libc::ETH_P_ALL as u16).to_be()
}

#[derive(Debug, Clone)]
pub struct PacketCaptureTransport {
    recv_buffer_size: usize,
}

impl PacketCaptureTransport {
    pub fn new(recv_buffer_size: usize) -> Self {
        Self { recv_buffer_size }
    }
}

impl Default for PacketCaptureTransport {
    fn default() -> Self {
        Self::new(limits::DEFAULT_RECV_BUFFER_BYTES)
    }
}

#[async_trait]
impl FrameTransport for PacketCaptureTransport {
    type Socket = PacketCaptureSocket;

    async fn open(&self) -> io::Result<PacketCaptureSocket> {
        // Protocol 0: no frame from any interface is queued before bind.
        let fd = sys::socket(libc::AF_PACKET, libc::SOCK_RAW, 0)?;
        let io = AsyncSocket::new(fd)?;
        trace!(fd = io.as_raw_fd(), "opened capture socket");
        Ok(PacketCaptureSocket {
            io,
            buf: vec![0; self.recv_buffer_size],
            ifindex: None,
        })
    }
}

#[derive(Debug)]
pub struct PacketCaptureSocket {
    io: AsyncSocket,
    buf: Vec<u8>,
    ifindex: Option<libc::c_int>,
}

impl PacketCaptureSocket {
    fn link_address(ifindex: libc::c_int, protocol_be: u16) -> libc::sockaddr_ll {
        let mut sll = libc::sockaddr_ll::zeroed();
        sll.sll_family = libc::AF_PACKET as libc::c_ushort;
        sll.sll_protocol = protocol_be;
        sll.sll_ifindex = ifindex;
        sll
    }
}

#[async_trait]
impl CaptureSocket for PacketCaptureSocket {
    async fn bind(&mut self, interface: &str) -> io::Result<()> {
        let index = nix::net::if_::if_nametoindex(interface).map_err(|errno| {
            io::Error::new(
                io::Error::from(errno).kind(),
                format!("unknown interface '{}': {}", interface, errno),
            )
        })?;
        let ifindex = libc::c_int::try_from(index).map_err(|_| {
            io::Error::new(io::ErrorKind::InvalidInput, "interface index out of range")
        })?;

        let fd = self.io.as_raw_fd();
        sys::bind(fd, &Self::link_address(ifindex, eth_p_all_be()))?;

        let membership = PacketMreq {
            mr_ifindex: ifindex,
            mr_type: libc::PACKET_MR_PROMISC as libc::c_ushort,
            mr_alen: 0,
            mr_address: [0; 8],
        };
        sys::set_option(fd, libc::SOL_PACKET, libc::PACKET_ADD_MEMBERSHIP, &membership)?;

        trace!(interface, ifindex, "capture socket bound");
        self.ifindex = Some(ifindex);
        Ok(())
    }

    async fn send(&mut self, frame: &[u8]) -> io::Result<()> {
        let ifindex = self.ifindex.ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotConnected, "capture socket is not bound")
        })?;
        let dest = Self::link_address(ifindex, mctp::ETH_P_MCTP.to_be());
        let sent = self
            .io
            .write_with(|fd| sys::send_to(fd, frame, &dest))
            .await?;
        if sent != frame.len() {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("short send: {} of {} bytes", sent, frame.len()),
            ));
        }
        Ok(())
    }

    async fn recv(&mut self) -> io::Result<CapturedFrame> {
        let buf = &mut self.buf;
        let (wire_len, from) = self
            .io
            .read_with(|fd| sys::recv_from::<libc::sockaddr_ll>(fd, buf.as_mut_slice()))
            .await?;

        let direction = if from.sll_pkttype == libc::PACKET_OUTGOING as u8 {
            Direction::Outgoing
        } else {
            Direction::Incoming
        };
        let kept = wire_len.min(self.buf.len());
        Ok(CapturedFrame {
            direction,
            data: self.buf[..kept].to_vec(),
            wire_len,
        })
    }
}

impl Drop for PacketCaptureSocket {
    fn drop(&mut self) {
        trace!(fd = self.io.as_raw_fd(), "closing capture socket");
    }
}
