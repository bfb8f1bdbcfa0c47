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

//! mctp-bridge: A JSON-RPC bridge to the Linux MCTP stack.
//!
//! This library exposes four operations on Management Component Transport
//! Protocol endpoints: addressed send and request/response through kernel
//! MCTP sockets, and raw frame send and capture on a named interface.

pub mod config;
pub mod engine;
pub mod engine_core;
pub mod mctp;
pub mod rpc;
