//! JSON-RPC service surface.
//!
//! Content-Length framed JSON-RPC 2.0 over a byte stream (stdio by default),
//! dispatching the four bridge methods onto the exchange engines.

pub mod codec;
pub mod dispatch;
pub mod pipeline;
pub mod server;

pub use dispatch::Dispatcher;
pub use server::BridgeService;
