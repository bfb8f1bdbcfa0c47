// Copyright 2026 BadCompany
// Licensed under the Apache License, Version 2.0

#![no_main]

use bytes::BytesMut;
use libfuzzer_sys::fuzz_target;
use mctp_bridge::rpc::codec::RpcCodec;
use tokio_util::codec::Decoder;

fuzz_target!(|data: &[u8]| {
    // No byte sequence on stdin may panic the decoder; it must return
    // Ok(Some), Ok(None) or Err and keep decoding after a complete message.
    let mut codec = RpcCodec::new(64 * 1024);
    let mut buffer = BytesMut::from(data);

    while let Ok(Some(_)) = codec.decode(&mut buffer) {}
});
