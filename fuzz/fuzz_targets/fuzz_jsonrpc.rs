// Copyright 2026 BadCompany
// Licensed under the Apache License, Version 2.0

#![no_main]

use libfuzzer_sys::fuzz_target;
use mctp_bridge::engine_core::models::JsonRpcRequest;
use mctp_bridge::rpc::dispatch::{
    parse_params, RawFrameParams, RawFrameReceiveParams, SendParams, SendReceiveParams,
};

fuzz_target!(|data: &[u8]| {
    // Requests and their params come straight from the caller; typed
    // parsing must reject anything malformed without panicking.
    let Ok(req) = serde_json::from_slice::<JsonRpcRequest>(data) else {
        return;
    };
    let params = req.params.as_ref();
    let _ = parse_params::<SendParams>(params);
    let _ = parse_params::<SendReceiveParams>(params);
    let _ = parse_params::<RawFrameParams>(params);
    let _ = parse_params::<RawFrameReceiveParams>(params);
});
