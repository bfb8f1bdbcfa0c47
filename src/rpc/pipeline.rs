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

use futures_util::StreamExt;
use tokio::io::AsyncRead;
use tokio::sync::mpsc;
use tokio_util::codec::FramedRead;
use tracing::{debug, error};

use crate::engine_core::models::JsonRpcRequest;
use crate::rpc::codec::{Inbound, RpcCodec};

/// Messages arriving from the RPC caller
#[derive(Debug)]
pub enum DownstreamEvent {
    Request(JsonRpcRequest),
    /// Well-framed JSON that is not a JSON-RPC request
    Invalid(String),
    /// Well-framed body that is not JSON; later messages are still read
    Malformed(String),
    /// Broken framing; the stream cannot be resynchronised
    Error(String),
    /// Caller disconnected (EOF)
    Disconnect,
}

/// Spawns a background task decoding requests from `stream`.
pub fn spawn_downstream_reader<R>(stream: R, max_message_size: u64, tx: mpsc::Sender<DownstreamEvent>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut framed = FramedRead::new(stream, RpcCodec::new(max_message_size));

        while let Some(result) = framed.next().await {
            match result {
                Ok(Inbound::Malformed(reason)) => {
                    error!("Malformed message body: {}", reason);
                    if tx.send(DownstreamEvent::Malformed(reason)).await.is_err() {
                        return;
                    }
                }
                Ok(Inbound::Message(val)) => match serde_json::from_value::<JsonRpcRequest>(val) {
                    Ok(req) => {
                        debug!(method = %req.method, "request decoded");
                        if tx.send(DownstreamEvent::Request(req)).await.is_err() {
                            return;
                        }
                    }
                    Err(e) => {
                        error!("JSON-RPC Request parse error: {}", e);
                        if tx.send(DownstreamEvent::Invalid(e.to_string())).await.is_err() {
                            return;
                        }
                    }
                },
                Err(e) => {
                    error!("Framing error: {}", e);
                    let _ = tx.send(DownstreamEvent::Error(e.to_string())).await;
                    break;
                }
            }
        }
        let _ = tx.send(DownstreamEvent::Disconnect).await;
    });
}
