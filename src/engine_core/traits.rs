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

//! Transport Traits.
//!
//! The engines only talk to sockets through these traits. The Linux
//! implementations live in `crate::mctp`; tests plug in scripted peers.
//!
//! A socket is released when it is dropped. Implementations must close the
//! underlying descriptor in `Drop` and nowhere else.

use async_trait::async_trait;
use std::io;

use crate::engine_core::models::{CapturedFrame, Datagram, EndpointAddress};

/// Factory for addressed MCTP sockets.
#[async_trait]
pub trait MessageTransport: Send + Sync {
    type Socket: MessageSocket;

    /// Create an unconnected socket.
    async fn open(&self) -> io::Result<Self::Socket>;
}

/// A datagram socket bound to one remote endpoint.
#[async_trait]
pub trait MessageSocket: Send {
    /// Associate the socket with `remote`. All later sends go there.
    async fn connect(&mut self, remote: &EndpointAddress) -> io::Result<()>;

    /// Transmit `payload` as a single message.
    async fn send(&mut self, payload: &[u8]) -> io::Result<()>;

    /// Wait for the next message delivered to this socket.
    async fn recv(&mut self) -> io::Result<Datagram>;
}

/// Factory for promiscuous per-interface capture sockets.
#[async_trait]
pub trait FrameTransport: Send + Sync {
    type Socket: CaptureSocket;

    async fn open(&self) -> io::Result<Self::Socket>;
}

/// A capture socket that sees every frame on one interface, in both directions.
#[async_trait]
pub trait CaptureSocket: Send {
    /// Bind to `interface` and enable promiscuous reception.
    async fn bind(&mut self, interface: &str) -> io::Result<()>;

    /// Transmit `frame` verbatim on the bound interface.
    async fn send(&mut self, frame: &[u8]) -> io::Result<()>;

    /// Wait for the next frame seen on the interface.
    async fn recv(&mut self) -> io::Result<CapturedFrame>;
}
