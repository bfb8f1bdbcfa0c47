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

use crate::engine::{AddressedOptions, CaptureOptions};
use crate::engine_core::constants::{config as env_keys, limits};
use crate::engine_core::errors::BridgeError;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub log_level: String,
    pub log_format: String, // "json" or "text"
    pub recv_buffer_size: usize,
    /// `None` disables the cap
    pub max_discarded_frames: Option<usize>,
    pub verify_responder: bool,
    pub max_message_size: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, BridgeError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, BridgeError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let max_discarded_frames = match lookup(env_keys::ENV_MAX_DISCARDED_FRAMES) {
            Some(raw) => match parse_number::<usize>(env_keys::ENV_MAX_DISCARDED_FRAMES, &raw)? {
                0 => None,
                cap => Some(cap),
            },
            None => defaults.max_discarded_frames,
        };

        let config = Self {
            log_level: lookup(env_keys::ENV_LOG_LEVEL).unwrap_or(defaults.log_level),
            log_format: lookup(env_keys::ENV_LOG_FORMAT).unwrap_or(defaults.log_format),
            recv_buffer_size: lookup(env_keys::ENV_RECV_BUFFER)
                .map(|raw| parse_number(env_keys::ENV_RECV_BUFFER, &raw))
                .transpose()?
                .unwrap_or(defaults.recv_buffer_size),
            max_discarded_frames,
            verify_responder: lookup(env_keys::ENV_VERIFY_RESPONDER)
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(defaults.verify_responder),
            max_message_size: lookup(env_keys::ENV_MAX_MESSAGE_SIZE)
                .map(|raw| parse_number(env_keys::ENV_MAX_MESSAGE_SIZE, &raw))
                .transpose()?
                .unwrap_or(defaults.max_message_size),
        };
        config.validate()?;
        Ok(config)
    }

    /// Fail fast on values the transports cannot work with.
    pub fn validate(&self) -> Result<(), BridgeError> {
        if !(limits::MIN_RECV_BUFFER_BYTES..=limits::MAX_RECV_BUFFER_BYTES)
            .contains(&self.recv_buffer_size)
        {
            return Err(BridgeError::Config(format!(
                "receive buffer must be between {} and {} bytes, got {}",
                limits::MIN_RECV_BUFFER_BYTES,
                limits::MAX_RECV_BUFFER_BYTES,
                self.recv_buffer_size
            )));
        }
        if self.max_message_size == 0 {
            return Err(BridgeError::Config(
                "maximum message size cannot be zero".to_string(),
            ));
        }
        if self.log_format != "json" && self.log_format != "text" {
            return Err(BridgeError::Config(format!(
                "log format must be 'json' or 'text', got '{}'",
                self.log_format
            )));
        }
        Ok(())
    }

    pub fn addressed_options(&self) -> AddressedOptions {
        AddressedOptions {
            verify_responder: self.verify_responder,
        }
    }

    pub fn capture_options(&self) -> CaptureOptions {
        CaptureOptions {
            max_discarded_frames: self.max_discarded_frames,
        }
    }
}

fn parse_number<T: FromStr>(key: &str, raw: &str) -> Result<T, BridgeError> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| BridgeError::Config(format!("{} must be a number, got '{}'", key, raw)))
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "text".to_string(),
            recv_buffer_size: limits::DEFAULT_RECV_BUFFER_BYTES,
            max_discarded_frames: Some(limits::DEFAULT_MAX_DISCARDED_FRAMES),
            verify_responder: false,
            max_message_size: limits::DEFAULT_MAX_MESSAGE_SIZE_BYTES,
        }
    }
}
