//! Exchange engines.
//!
//! `addressed` talks to MCTP endpoints through the kernel's addressed
//! sockets; `raw` sends and captures whole frames on one interface.

pub mod addressed;
pub mod raw;

pub use addressed::{AddressedExchange, AddressedOptions};
pub use raw::{CaptureOptions, RawCaptureExchange};
