//! Linux socket transports.
//!
//! This module implements the transport traits from `engine_core::traits`
//! on top of kernel MCTP sockets and promiscuous AF_PACKET capture.

pub mod addressed;
pub mod capture;
mod fd;
pub mod sys;

pub use addressed::{MctpSocket, MctpTransport};
pub use capture::{PacketCaptureSocket, PacketCaptureTransport};
