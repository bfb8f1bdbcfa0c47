//! Core domain kernel.
//!
//! This module contains the data structures, errors and transport traits
//! shared by both exchange engines, independent of any real socket.

pub mod constants;
pub mod errors;
pub mod models;
pub mod traits;
