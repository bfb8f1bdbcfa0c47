use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};

fn framed(message: &Value) -> Vec<u8> {
    let body = serde_json::to_string(message).unwrap();
    format!("Content-Length: {}\r\n\r\n{}", body.len(), body).into_bytes()
}

fn bridge() -> Command {
    // Provided by cargo for integration tests.
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_mctp-bridge"));
    cmd.env("MCTP_BRIDGE_LOG_LEVEL", "warn");
    cmd
}

#[test]
fn test_help_names_the_binary() {
    bridge()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("mctp-bridge"));
}

#[test]
fn test_unknown_method_is_rejected_and_process_exits_on_eof() {
    let request = json!({"jsonrpc": "2.0", "method": "Reboot", "params": {}, "id": 1});

    bridge()
        .write_stdin(framed(&request))
        .assert()
        .success()
        .stdout(predicate::str::contains("-32601"));
}

#[test]
fn test_garbage_input_is_answered_with_parse_error() {
    bridge()
        .write_stdin("definitely not json-rpc")
        .assert()
        .success()
        .stdout(predicate::str::contains("-32700"));
}

#[test]
fn test_raw_frame_on_missing_interface_is_internal_failure() {
    // Whether the socket cannot be opened (no CAP_NET_RAW) or the interface
    // is unknown, the caller sees the same failure name.
    let request = json!({
        "jsonrpc": "2.0",
        "method": "SendRawFrame",
        "params": {"interface_name": "nonexistent0", "frame": [1, 2, 3]},
        "id": 5
    });

    bridge()
        .write_stdin(framed(&request))
        .assert()
        .success()
        .stdout(predicate::str::contains("-32000"))
        .stdout(predicate::str::contains(
            "xyz.openbmc_project.Common.Error.InternalFailure",
        ));
}

#[test]
fn test_one_shot_failure_sets_exit_code() {
    bridge()
        .args(["send-recv-raw", "--iface", "nonexistent0", "0102"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("InternalFailure"));

    bridge()
        .args(["send-recv", "--eid", "8", "--type", "1", "--timeout-ms", "0", "01"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("invalid deadline"));
}

#[test]
fn test_bad_configuration_refuses_to_start() {
    bridge()
        .env("MCTP_BRIDGE_RECV_BUFFER", "1")
        .write_stdin("")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration error"));
}
