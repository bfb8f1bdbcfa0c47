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

//! Bridge service (actor loop).
//!
//! - `spawn_downstream_reader`: decodes framed requests from the caller.
//! - `BridgeService::run`: the coordinator. Every request runs as its own
//!   task so a slow `SendReceive` never blocks the others; responses are
//!   written as they complete and may therefore arrive out of order.
//!
//! Shutdown cancels every in-flight exchange. Their sockets are released by
//! the engines and the cancelled tasks still answer before `run` returns.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use futures::SinkExt;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::{self, JoinError, JoinSet};
use tokio_util::codec::FramedWrite;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::config::Config;
use crate::engine::{AddressedExchange, RawCaptureExchange};
use crate::engine_core::errors::BridgeError;
use crate::engine_core::models::{ExchangeId, JsonRpcRequest, JsonRpcResponse};
use crate::engine_core::traits::{FrameTransport, MessageTransport};
use crate::mctp::{MctpTransport, PacketCaptureTransport};
use crate::rpc::codec::RpcCodec;
use crate::rpc::dispatch::{self, Dispatcher};
use crate::rpc::pipeline::{self, DownstreamEvent};

type Outcome = Option<JsonRpcResponse>;
/// Request ids of spawned exchanges, so a failed task can still be answered.
type Pending = HashMap<task::Id, Option<Value>>;

pub struct BridgeService<M = MctpTransport, C = PacketCaptureTransport> {
    config: Arc<Config>,
    dispatcher: Arc<Dispatcher<M, C>>,
    shutdown: CancellationToken,
}

impl BridgeService {
    /// Build the service on the kernel MCTP and AF_PACKET transports.
    pub fn init(config: Config) -> Result<Self, BridgeError> {
        config.validate()?;
        let addressed = AddressedExchange::with_options(
            MctpTransport::new(config.recv_buffer_size),
            config.addressed_options(),
        );
        let raw = RawCaptureExchange::with_options(
            PacketCaptureTransport::new(config.recv_buffer_size),
            config.capture_options(),
        );
        info!(
            recv_buffer = config.recv_buffer_size,
            verify_responder = config.verify_responder,
            "MCTP bridge initialised"
        );
        Ok(Self::with_dispatcher(config, Dispatcher::new(addressed, raw)))
    }
}

impl<M, C> BridgeService<M, C>
where
    M: MessageTransport + 'static,
    C: FrameTransport + 'static,
{
    pub fn with_dispatcher(config: Config, dispatcher: Dispatcher<M, C>) -> Self {
        Self {
            config: Arc::new(config),
            dispatcher: Arc::new(dispatcher),
            shutdown: CancellationToken::new(),
        }
    }

    /// Token that stops `run` when cancelled; hand it to signal handlers.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn shutdown(&self) {
        info!("Shutdown requested");
        self.shutdown.cancel();
    }

    /// Serve requests from `reader` until EOF or shutdown.
    pub async fn run<R, W>(&self, reader: R, writer: W) -> Result<()>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin,
    {
        let (tx_events, mut rx_events) = mpsc::channel(32);
        pipeline::spawn_downstream_reader(reader, self.config.max_message_size, tx_events);

        let mut sink = FramedWrite::new(writer, RpcCodec::new(self.config.max_message_size));
        let mut inflight: JoinSet<Outcome> = JoinSet::new();
        let mut pending = Pending::new();
        let mut reading = true;

        info!("MCTP bridge serving requests");

        loop {
            if !reading && inflight.is_empty() {
                break;
            }
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!(inflight = inflight.len(), "Stopping; cancelling in-flight exchanges");
                    break;
                }

                event = rx_events.recv(), if reading => {
                    match event {
                        Some(DownstreamEvent::Request(req)) => self.spawn_exchange(&mut inflight, &mut pending, req),
                        Some(DownstreamEvent::Invalid(reason)) => {
                            warn!("Rejecting malformed request: {}", reason);
                            let resp = JsonRpcResponse::failure(Value::Null, dispatch::invalid_request(reason));
                            sink.send(&resp).await?;
                        }
                        Some(DownstreamEvent::Malformed(reason)) => {
                            let resp = JsonRpcResponse::failure(Value::Null, dispatch::parse_error(reason));
                            sink.send(&resp).await?;
                        }
                        Some(DownstreamEvent::Error(reason)) => {
                            warn!("Downstream transport error: {}", reason);
                            let resp = JsonRpcResponse::failure(Value::Null, dispatch::parse_error(reason));
                            sink.send(&resp).await?;
                        }
                        Some(DownstreamEvent::Disconnect) | None => {
                            info!("Client disconnected");
                            reading = false;
                        }
                    }
                }

                Some(joined) = inflight.join_next_with_id() => {
                    Self::write_outcome(&mut sink, &mut pending, joined).await?;
                }
            }
        }

        // Exchanges observe the cancelled token and finish promptly.
        while let Some(joined) = inflight.join_next_with_id().await {
            Self::write_outcome(&mut sink, &mut pending, joined).await?;
        }
        info!("MCTP bridge stopped");
        Ok(())
    }

    fn spawn_exchange(
        &self,
        inflight: &mut JoinSet<Outcome>,
        pending: &mut Pending,
        req: JsonRpcRequest,
    ) {
        let dispatcher = Arc::clone(&self.dispatcher);
        let cancel = self.shutdown.child_token();
        let span = info_span!("exchange", id = %ExchangeId::generate(), method = %req.method);
        let request_id = req.id.clone();
        let handle = inflight.spawn(
            async move { dispatcher.handle(req, cancel).await }.instrument(span),
        );
        pending.insert(handle.id(), request_id);
    }

    async fn write_outcome<W>(
        sink: &mut FramedWrite<W, RpcCodec>,
        pending: &mut Pending,
        joined: Result<(task::Id, Outcome), JoinError>,
    ) -> Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        match joined {
            Ok((task_id, outcome)) => {
                pending.remove(&task_id);
                match outcome {
                    Some(resp) => sink.send(&resp).await?,
                    None => debug!("Notification handled, no response"),
                }
            }
            Err(e) => {
                error!("Exchange task failed: {}", e);
                // Notifications stay unanswered even when their task dies.
                if let Some(Some(id)) = pending.remove(&e.id()) {
                    let resp = JsonRpcResponse::failure(id, dispatch::task_failure(&e));
                    sink.send(&resp).await?;
                }
            }
        }
        Ok(())
    }
}
