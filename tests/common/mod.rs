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

//! Scripted peers standing in for kernel sockets.
//!
//! Every socket opened from a fake transport replays the same receive
//! script. A `Probe` records what the engine did so tests can assert on
//! sockets opened and closed, destinations and bytes sent.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use mctp_bridge::engine_core::models::{CapturedFrame, Datagram, EndpointAddress};
use mctp_bridge::engine_core::traits::{
    CaptureSocket, FrameTransport, MessageSocket, MessageTransport,
};

/// One step of a receive script.
#[derive(Debug, Clone)]
pub enum Recv<T> {
    /// Deliver `T` after the delay
    After(Duration, T),
    /// Deliver `T` after the delay, forever
    Repeat(Duration, T),
    Fail(io::ErrorKind),
    /// Panic inside the transport
    Crash,
}

#[derive(Debug, Clone, Default)]
pub struct Faults {
    pub open: Option<io::ErrorKind>,
    /// Fails `connect` (addressed) or `bind` (capture)
    pub attach: Option<io::ErrorKind>,
    pub send: Option<io::ErrorKind>,
}

#[derive(Debug, Default)]
pub struct Probe {
    opened: AtomicUsize,
    closed: AtomicUsize,
    received: AtomicUsize,
    attached: Mutex<Vec<String>>,
    sent: Mutex<Vec<Vec<u8>>>,
}

impl Probe {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    /// Units handed to the engine by `recv`
    pub fn received(&self) -> usize {
        self.received.load(Ordering::SeqCst)
    }

    /// Destinations (`Display` of the address) or interface names, in order
    pub fn attached(&self) -> Vec<String> {
        self.attached.lock().unwrap().clone()
    }

    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.sent.lock().unwrap().clone()
    }
}

fn fault(kind: io::ErrorKind, what: &str) -> io::Error {
    io::Error::new(kind, format!("scripted {} failure", what))
}

struct Script<T> {
    probe: Arc<Probe>,
    steps: VecDeque<Recv<T>>,
    faults: Faults,
}

impl<T: Clone + Send> Script<T> {
    fn attach(&mut self, target: String) -> io::Result<()> {
        if let Some(kind) = self.faults.attach {
            return Err(fault(kind, "attach"));
        }
        self.probe.attached.lock().unwrap().push(target);
        Ok(())
    }

    fn send(&mut self, bytes: &[u8]) -> io::Result<()> {
        if let Some(kind) = self.faults.send {
            return Err(fault(kind, "send"));
        }
        self.probe.sent.lock().unwrap().push(bytes.to_vec());
        Ok(())
    }

    async fn recv(&mut self) -> io::Result<T> {
        let step = if matches!(self.steps.front(), Some(Recv::Repeat(..))) {
            self.steps.front().cloned()
        } else {
            self.steps.pop_front()
        };
        let Some(step) = step else {
            return std::future::pending().await;
        };
        match step {
            Recv::After(delay, item) | Recv::Repeat(delay, item) => {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                self.probe.received.fetch_add(1, Ordering::SeqCst);
                Ok(item)
            }
            Recv::Fail(kind) => Err(fault(kind, "receive")),
            Recv::Crash => panic!("scripted transport crash"),
        }
    }
}

impl<T> Drop for Script<T> {
    fn drop(&mut self) {
        self.probe.closed.fetch_add(1, Ordering::SeqCst);
    }
}

struct Peer<T> {
    probe: Arc<Probe>,
    steps: Vec<Recv<T>>,
    faults: Faults,
}

impl<T: Clone> Peer<T> {
    fn new(steps: Vec<Recv<T>>) -> Self {
        Self {
            probe: Arc::new(Probe::default()),
            steps,
            faults: Faults::default(),
        }
    }

    fn open(&self) -> io::Result<Script<T>> {
        if let Some(kind) = self.faults.open {
            return Err(fault(kind, "open"));
        }
        self.probe.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Script {
            probe: Arc::clone(&self.probe),
            steps: self.steps.iter().cloned().collect(),
            faults: self.faults.clone(),
        })
    }
}

/// Addressed MCTP peer.
pub struct FakeMctp(Peer<Datagram>);

impl FakeMctp {
    pub fn new(steps: Vec<Recv<Datagram>>) -> Self {
        Self(Peer::new(steps))
    }

    /// A peer that never answers
    pub fn silent() -> Self {
        Self::new(Vec::new())
    }

    pub fn with_faults(mut self, faults: Faults) -> Self {
        self.0.faults = faults;
        self
    }

    pub fn probe(&self) -> Arc<Probe> {
        Arc::clone(&self.0.probe)
    }
}

pub struct FakeMctpSocket(Script<Datagram>);

#[async_trait]
impl MessageTransport for FakeMctp {
    type Socket = FakeMctpSocket;

    async fn open(&self) -> io::Result<FakeMctpSocket> {
        self.0.open().map(FakeMctpSocket)
    }
}

#[async_trait]
impl MessageSocket for FakeMctpSocket {
    async fn connect(&mut self, remote: &EndpointAddress) -> io::Result<()> {
        self.0.attach(remote.to_string())
    }

    async fn send(&mut self, payload: &[u8]) -> io::Result<()> {
        self.0.send(payload)
    }

    async fn recv(&mut self) -> io::Result<Datagram> {
        self.0.recv().await
    }
}

/// Interface carrying raw frames in both directions.
pub struct FakeLink(Peer<CapturedFrame>);

impl FakeLink {
    pub fn new(steps: Vec<Recv<CapturedFrame>>) -> Self {
        Self(Peer::new(steps))
    }

    pub fn silent() -> Self {
        Self::new(Vec::new())
    }

    pub fn with_faults(mut self, faults: Faults) -> Self {
        self.0.faults = faults;
        self
    }

    pub fn probe(&self) -> Arc<Probe> {
        Arc::clone(&self.0.probe)
    }
}

pub struct FakeCaptureSocket(Script<CapturedFrame>);

#[async_trait]
impl FrameTransport for FakeLink {
    type Socket = FakeCaptureSocket;

    async fn open(&self) -> io::Result<FakeCaptureSocket> {
        self.0.open().map(FakeCaptureSocket)
    }
}

#[async_trait]
impl CaptureSocket for FakeCaptureSocket {
    async fn bind(&mut self, interface: &str) -> io::Result<()> {
        self.0.attach(interface.to_string())
    }

    async fn send(&mut self, frame: &[u8]) -> io::Result<()> {
        self.0.send(frame)
    }

    async fn recv(&mut self) -> io::Result<CapturedFrame> {
        self.0.recv().await
    }
}

pub fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

/// Reply datagram as the kernel reports it: owner bit clear, same type.
pub fn reply_from(endpoint_id: u8, message_type: u8, data: &[u8]) -> Datagram {
    let source = EndpointAddress {
        network_id: 1,
        endpoint_id,
        message_type,
        tag: 0x01,
    };
    Datagram::from_source(data.to_vec(), source)
}
