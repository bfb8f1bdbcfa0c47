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

// Main entry point for the MCTP bridge
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use mctp_bridge::config::Config;
use mctp_bridge::engine::{AddressedExchange, RawCaptureExchange};
use mctp_bridge::engine_core::errors::ExchangeError;
use mctp_bridge::engine_core::models::{Deadline, EndpointAddress, JsonRpcError};
use mctp_bridge::mctp::{MctpTransport, PacketCaptureTransport};
use mctp_bridge::rpc::BridgeService;

const EXIT_FAILURE: u8 = 1;
const EXIT_TIMEOUT: u8 = 2;
const SHUTDOWN_GRACE: Duration = Duration::from_millis(200);

#[derive(Parser, Debug)]
#[command(name = "mctp-bridge", version, about = "mctp-bridge: JSON-RPC bridge to Linux MCTP endpoints", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Receive buffer per exchange in bytes (overrides MCTP_BRIDGE_RECV_BUFFER)
    #[arg(long, global = true)]
    recv_buffer: Option<usize>,

    /// Outgoing frames to skip before giving up; 0 disables the cap
    #[arg(long, global = true)]
    max_discarded_frames: Option<usize>,

    /// Only accept replies whose source matches the destination
    #[arg(long, global = true)]
    verify_responder: bool,
}

impl Cli {
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(size) = self.recv_buffer {
            config.recv_buffer_size = size;
        }
        if let Some(cap) = self.max_discarded_frames {
            config.max_discarded_frames = (cap > 0).then_some(cap);
        }
        if self.verify_responder {
            config.verify_responder = true;
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve Content-Length framed JSON-RPC on stdin/stdout (default)
    Serve,

    /// Send one message to an endpoint without waiting for a reply
    Send {
        #[command(flatten)]
        target: Target,
        /// Payload as hex (e.g. "01 02" or "0x0102")
        #[arg(value_parser = parse_hex)]
        payload: HexBytes,
    },

    /// Send one message and print the reply as hex
    SendRecv {
        #[command(flatten)]
        target: Target,
        #[arg(value_parser = parse_hex)]
        payload: HexBytes,
        #[arg(long, default_value_t = 1000)]
        timeout_ms: u16,
    },

    /// Transmit a raw frame on an MCTP interface
    SendRaw {
        #[arg(long)]
        iface: String,
        #[arg(value_parser = parse_hex)]
        frame: HexBytes,
    },

    /// Transmit a raw frame and print the next inbound frame as hex
    SendRecvRaw {
        #[arg(long)]
        iface: String,
        #[arg(value_parser = parse_hex)]
        frame: HexBytes,
        #[arg(long, default_value_t = 1000)]
        timeout_ms: u16,
    },
}

#[derive(clap::Args, Debug)]
struct Target {
    /// Destination endpoint ID
    #[arg(long)]
    eid: u8,
    /// MCTP message type
    #[arg(long = "type")]
    message_type: u8,
    /// MCTP network ID
    #[arg(long, default_value_t = 0)]
    net: u32,
}

impl Target {
    fn address(&self) -> EndpointAddress {
        EndpointAddress::request(self.net, self.eid, self.message_type)
    }
}

#[derive(Debug, Clone)]
struct HexBytes(Vec<u8>);

fn parse_hex(raw: &str) -> Result<HexBytes, String> {
    let digits: String = raw
        .trim()
        .trim_start_matches("0x")
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':')
        .collect();
    hex::decode(&digits)
        .map(HexBytes)
        .map_err(|e| format!("invalid hex '{}': {}", raw, e))
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    install_panic_hook();

    let mut config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_FAILURE);
        }
    };

    // Override from CLI
    cli.apply_overrides(&mut config);
    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        return ExitCode::from(EXIT_FAILURE);
    }

    if let Err(e) = init_tracing(&config) {
        eprintln!("Failed to init tracing: {}", e);
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: failed to start runtime: {}", e);
            return ExitCode::from(EXIT_FAILURE);
        }
    };
    let code = runtime.block_on(dispatch(config, cli.command.unwrap_or(Command::Serve)));
    // A blocking stdin read may still be parked after a signal-driven shutdown.
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
    code
}

async fn dispatch(config: Config, command: Command) -> ExitCode {
    match command {
        Command::Serve => serve(config).await,
        command => match one_shot(&config, command).await {
            Ok(Some(response)) => {
                println!("{}", hex::encode(response));
                ExitCode::SUCCESS
            }
            Ok(None) => ExitCode::SUCCESS,
            Err(e) => {
                let code = if e.is_timeout() { EXIT_TIMEOUT } else { EXIT_FAILURE };
                eprintln!("Error: {}", JsonRpcError::from(e).message);
                ExitCode::from(code)
            }
        },
    }
}

async fn serve(config: Config) -> ExitCode {
    info!("Starting mctp-bridge v{}", env!("CARGO_PKG_VERSION"));
    let service = match BridgeService::init(config) {
        Ok(service) => service,
        Err(e) => {
            error!("Failed to initialise bridge: {}", e);
            return ExitCode::from(EXIT_FAILURE);
        }
    };

    let service = Arc::new(service);
    let signalled = Arc::clone(&service);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down.");
            signalled.shutdown();
        }
    });

    match service.run(tokio::io::stdin(), tokio::io::stdout()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Bridge terminated: {:#}", e);
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

async fn one_shot(config: &Config, command: Command) -> Result<Option<Vec<u8>>, ExchangeError> {
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_signal.cancel();
        }
    });

    let addressed = AddressedExchange::with_options(
        MctpTransport::new(config.recv_buffer_size),
        config.addressed_options(),
    );
    let raw = RawCaptureExchange::with_options(
        PacketCaptureTransport::new(config.recv_buffer_size),
        config.capture_options(),
    );

    match command {
        Command::Serve => Ok(None),
        Command::Send { target, payload } => {
            addressed.send(target.address(), &payload.0).await?;
            Ok(None)
        }
        Command::SendRecv {
            target,
            payload,
            timeout_ms,
        } => {
            let deadline = Deadline::from_millis(u64::from(timeout_ms))?;
            let response = addressed
                .send_receive(target.address(), &payload.0, deadline, &cancel)
                .await?;
            Ok(Some(response))
        }
        Command::SendRaw { iface, frame } => {
            raw.send_raw_frame(&iface, &frame.0).await?;
            Ok(None)
        }
        Command::SendRecvRaw {
            iface,
            frame,
            timeout_ms,
        } => {
            let deadline = Deadline::from_millis(u64::from(timeout_ms))?;
            let response = raw
                .send_receive_raw_frame(&iface, &frame.0, deadline, &cancel)
                .await?;
            Ok(Some(response))
        }
    }
}

fn install_panic_hook() {
    std::panic::set_hook(Box::new(|panic_info| {
        let location = panic_info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_else(|| "unknown".to_string());

        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        eprintln!("PANIC: {} at {}", message, location);
    }));
}

fn init_tracing(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("mctp_bridge=debug,info"));

    // stdout carries protocol frames and hex output; logs go to stderr.
    let subscriber = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr);

    if config.log_format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_accepts_common_spellings() {
        assert_eq!(parse_hex("0102ff").unwrap().0, vec![0x01, 0x02, 0xff]);
        assert_eq!(parse_hex("0x0102").unwrap().0, vec![0x01, 0x02]);
        assert_eq!(parse_hex("01 02:03").unwrap().0, vec![0x01, 0x02, 0x03]);
        assert!(parse_hex("0g").is_err());
        assert!(parse_hex("123").is_err());
    }

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::try_parse_from([
            "mctp-bridge", "send-recv", "--eid", "8", "--type", "1", "--timeout-ms", "50", "0a0b",
        ])
        .unwrap();
        match cli.command {
            Some(Command::SendRecv {
                target,
                payload,
                timeout_ms,
            }) => {
                assert_eq!(target.address(), EndpointAddress::request(0, 8, 1));
                assert_eq!(payload.0, vec![0x0a, 0x0b]);
                assert_eq!(timeout_ms, 50);
            }
            other => panic!("unexpected command: {:?}", other),
        }

        let cli = Cli::try_parse_from(["mctp-bridge"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_cli_flags_override_config() {
        let cli = Cli::try_parse_from([
            "mctp-bridge", "serve", "--recv-buffer", "8192", "--max-discarded-frames", "0",
            "--verify-responder",
        ])
        .unwrap();
        let mut config = Config::default();
        cli.apply_overrides(&mut config);

        assert_eq!(config.recv_buffer_size, 8192);
        assert_eq!(config.max_discarded_frames, None);
        assert!(config.verify_responder);
    }
}
