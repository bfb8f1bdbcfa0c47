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

//! Method dispatch.
//!
//! Validates the parameters of each RPC method, runs the matching engine
//! operation and maps the outcome onto a JSON-RPC response. Engine failures
//! surface under exactly two names: `Timeout` and `InternalFailure`.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::engine::{AddressedExchange, RawCaptureExchange};
use crate::engine_core::constants::{failure, jsonrpc, methods};
use crate::engine_core::errors::{ExchangeError, FailureKind};
use crate::engine_core::models::{
    Deadline, EndpointAddress, JsonRpcError, JsonRpcRequest, JsonRpcResponse,
};
use crate::engine_core::traits::{FrameTransport, MessageTransport};

/// Longest interface name the kernel accepts (IFNAMSIZ - 1)
const MAX_INTERFACE_NAME: usize = 15;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendParams {
    #[serde(alias = "eid")]
    pub endpoint_id: u8,
    #[serde(alias = "msg_type")]
    pub message_type: u8,
    #[serde(default, alias = "net")]
    pub network_id: u32,
    pub payload: Vec<u8>,
}

impl SendParams {
    pub fn address(&self) -> EndpointAddress {
        EndpointAddress::request(self.network_id, self.endpoint_id, self.message_type)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendReceiveParams {
    #[serde(alias = "eid")]
    pub endpoint_id: u8,
    #[serde(alias = "msg_type")]
    pub message_type: u8,
    #[serde(default, alias = "net")]
    pub network_id: u32,
    pub payload: Vec<u8>,
    pub timeout_ms: u16,
}

impl SendReceiveParams {
    pub fn address(&self) -> EndpointAddress {
        EndpointAddress::request(self.network_id, self.endpoint_id, self.message_type)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawFrameParams {
    #[serde(alias = "iface")]
    pub interface_name: String,
    pub frame: Vec<u8>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawFrameReceiveParams {
    #[serde(alias = "iface")]
    pub interface_name: String,
    pub frame: Vec<u8>,
    pub timeout_ms: u16,
}

fn check_interface(name: &str) -> Result<(), JsonRpcError> {
    if name.is_empty() || name.len() > MAX_INTERFACE_NAME || name.contains('\0') {
        return Err(invalid_params(format!("invalid interface name '{}'", name)));
    }
    Ok(())
}

fn check_frame(frame: &[u8]) -> Result<(), JsonRpcError> {
    if frame.is_empty() {
        return Err(invalid_params("frame cannot be empty".to_string()));
    }
    Ok(())
}

/// Deserialize named (object) or positional (array) params.
pub fn parse_params<T: DeserializeOwned>(params: Option<&Value>) -> Result<T, JsonRpcError> {
    let params = params.ok_or_else(|| invalid_params("missing params".to_string()))?;
    serde_json::from_value(params.clone()).map_err(|e| invalid_params(e.to_string()))
}

pub fn parse_error(reason: String) -> JsonRpcError {
    rpc_error(jsonrpc::ERROR_PARSE, format!("Parse error: {}", reason))
}

pub fn invalid_request(reason: String) -> JsonRpcError {
    rpc_error(jsonrpc::ERROR_INVALID_REQUEST, format!("Invalid request: {}", reason))
}

pub fn invalid_params(reason: String) -> JsonRpcError {
    rpc_error(jsonrpc::ERROR_INVALID_PARAMS, format!("Invalid params: {}", reason))
}

pub fn method_not_found(method: &str) -> JsonRpcError {
    rpc_error(
        jsonrpc::ERROR_METHOD_NOT_FOUND,
        format!("Method not found: {}", method),
    )
}

/// InternalFailure for an exchange whose task panicked or was aborted.
pub fn task_failure(err: &tokio::task::JoinError) -> JsonRpcError {
    let detail = format!("exchange task failed: {}", err);
    JsonRpcError {
        code: jsonrpc::ERROR_INTERNAL_FAILURE,
        message: format!("{}: {}", failure::INTERNAL_FAILURE, detail),
        data: Some(json!({ "name": failure::INTERNAL_FAILURE, "detail": detail })),
    }
}

fn rpc_error(code: i32, message: String) -> JsonRpcError {
    JsonRpcError {
        code,
        message,
        data: None,
    }
}

impl From<ExchangeError> for JsonRpcError {
    fn from(err: ExchangeError) -> Self {
        let detail = err.to_string();
        let (code, name, message) = match err.kind() {
            FailureKind::Timeout => (
                jsonrpc::ERROR_TIMEOUT,
                failure::TIMEOUT,
                format!("{}: {}", failure::TIMEOUT, failure::TIMEOUT_MESSAGE),
            ),
            FailureKind::InternalFailure => (
                jsonrpc::ERROR_INTERNAL_FAILURE,
                failure::INTERNAL_FAILURE,
                format!("{}: {}", failure::INTERNAL_FAILURE, detail),
            ),
        };
        JsonRpcError {
            code,
            message,
            data: Some(json!({ "name": name, "detail": detail })),
        }
    }
}

pub struct Dispatcher<M, C> {
    addressed: AddressedExchange<M>,
    raw: RawCaptureExchange<C>,
}

impl<M: MessageTransport, C: FrameTransport> Dispatcher<M, C> {
    pub fn new(addressed: AddressedExchange<M>, raw: RawCaptureExchange<C>) -> Self {
        Self { addressed, raw }
    }

    /// Run one request to completion. Notifications (no id) yield `None`.
    pub async fn handle(
        &self,
        req: JsonRpcRequest,
        cancel: CancellationToken,
    ) -> Option<JsonRpcResponse> {
        let outcome = self.execute(&req, &cancel).await;
        if let Err(e) = &outcome {
            match e.code {
                jsonrpc::ERROR_TIMEOUT => warn!(method = %req.method, "{}", e.message),
                _ => error!(method = %req.method, "{}", e.message),
            }
        }

        let id = req.id?;
        Some(match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(e) => JsonRpcResponse::failure(id, e),
        })
    }

    pub async fn execute(
        &self,
        req: &JsonRpcRequest,
        cancel: &CancellationToken,
    ) -> Result<Value, JsonRpcError> {
        if req.jsonrpc != "2.0" {
            return Err(invalid_request(format!(
                "unsupported jsonrpc version '{}'",
                req.jsonrpc
            )));
        }
        let params = req.params.as_ref();

        match req.method.as_str() {
            methods::SEND => {
                let p: SendParams = parse_params(params)?;
                let dest = p.address();
                info!(%dest, len = p.payload.len(), "Send");
                self.addressed.send(dest, &p.payload).await?;
                info!("Message sent successfully");
                Ok(Value::Null)
            }
            methods::SEND_RECEIVE | methods::SEND_RECV => {
                let p: SendReceiveParams = parse_params(params)?;
                let dest = p.address();
                let deadline = Deadline::from_millis(u64::from(p.timeout_ms))?;
                info!(%dest, len = p.payload.len(), timeout_ms = p.timeout_ms, "SendReceive");
                let response = self
                    .addressed
                    .send_receive(dest, &p.payload, deadline, cancel)
                    .await?;
                info!(len = response.len(), "Received response");
                Ok(Value::from(response))
            }
            methods::SEND_RAW_FRAME => {
                let p: RawFrameParams = parse_params(params)?;
                check_interface(&p.interface_name)?;
                check_frame(&p.frame)?;
                info!(interface = %p.interface_name, len = p.frame.len(), "SendRawFrame");
                self.raw.send_raw_frame(&p.interface_name, &p.frame).await?;
                info!("Frame sent successfully");
                Ok(Value::Null)
            }
            methods::SEND_RECEIVE_RAW_FRAME => {
                let p: RawFrameReceiveParams = parse_params(params)?;
                check_interface(&p.interface_name)?;
                check_frame(&p.frame)?;
                let deadline = Deadline::from_millis(u64::from(p.timeout_ms))?;
                info!(
                    interface = %p.interface_name,
                    len = p.frame.len(),
                    timeout_ms = p.timeout_ms,
                    "SendReceiveRawFrame"
                );
                let response = self
                    .raw
                    .send_receive_raw_frame(&p.interface_name, &p.frame, deadline, cancel)
                    .await?;
                info!(len = response.len(), "Received frame");
                Ok(Value::from(response))
            }
            other => Err(method_not_found(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::time::Duration;

    use crate::engine_core::errors::Stage;

    #[test]
    fn test_named_and_aliased_params() {
        let named = json!({"endpoint_id": 8, "message_type": 1, "payload": [1, 2]});
        let p: SendParams = parse_params(Some(&named)).unwrap();
        assert_eq!(p.network_id, 0);
        assert_eq!(p.address(), EndpointAddress::request(0, 8, 1));

        let aliased = json!({"eid": 9, "msg_type": 0x7e, "net": 2, "payload": []});
        let p: SendParams = parse_params(Some(&aliased)).unwrap();
        assert_eq!(p.address(), EndpointAddress::request(2, 9, 0x7e));
    }

    #[test]
    fn test_positional_params() {
        let positional = json!([8, 1, 0, [1, 2], 100]);
        let p: SendReceiveParams = parse_params(Some(&positional)).unwrap();
        assert_eq!(p.timeout_ms, 100);
        assert_eq!(p.payload, vec![1, 2]);
    }

    #[test]
    fn test_out_of_range_params_are_rejected() {
        let cases = [
            json!({"endpoint_id": 256, "message_type": 1, "payload": []}),
            json!({"endpoint_id": 8, "message_type": 1, "payload": [300]}),
            json!({"endpoint_id": 8, "message_type": 1, "payload": [], "extra": true}),
        ];
        for case in cases {
            let err = parse_params::<SendParams>(Some(&case)).unwrap_err();
            assert_eq!(err.code, jsonrpc::ERROR_INVALID_PARAMS, "{case}");
        }

        let too_long = json!({"endpoint_id": 8, "message_type": 1, "payload": [], "timeout_ms": 70000});
        let err = parse_params::<SendReceiveParams>(Some(&too_long)).unwrap_err();
        assert_eq!(err.code, jsonrpc::ERROR_INVALID_PARAMS);

        assert!(parse_params::<SendParams>(None).is_err());
    }

    #[test]
    fn test_interface_name_checks() {
        assert!(check_interface("mctpi2c0").is_ok());
        assert!(check_interface("").is_err());
        assert!(check_interface("a-very-long-interface-name").is_err());
        assert!(check_frame(&[]).is_err());
    }

    #[test]
    fn test_exchange_errors_map_to_two_failure_names() {
        let timeout: JsonRpcError = ExchangeError::Timeout {
            after: Duration::from_millis(100),
        }
        .into();
        assert_eq!(timeout.code, jsonrpc::ERROR_TIMEOUT);
        assert_eq!(
            timeout.message,
            "xyz.openbmc_project.Common.Error.Timeout: Request Timed Out"
        );

        let internal: JsonRpcError = ExchangeError::transport(
            Stage::Open,
            io::Error::new(io::ErrorKind::Unsupported, "address family not supported"),
        )
        .into();
        assert_eq!(internal.code, jsonrpc::ERROR_INTERNAL_FAILURE);
        assert!(internal
            .message
            .starts_with("xyz.openbmc_project.Common.Error.InternalFailure: open failed"));
        assert_eq!(
            internal.data.unwrap()["name"],
            "xyz.openbmc_project.Common.Error.InternalFailure"
        );
    }
}
