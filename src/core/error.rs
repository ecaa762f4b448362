// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut
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

//! Error types for the NV4 emulation core
//!
//! The emulated chip itself never fails: unknown registers read as zero,
//! invalid methods raise a guest-visible interrupt and degenerate PLL
//! divisors are clamped. The errors here only cover host-side operations
//! such as loading configuration files or parsing command line input.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias used throughout the crate
pub type Result<T> = std::result::Result<T, EmulatorError>;

/// Errors produced by host-side operations around the device model
#[derive(Debug, Error)]
pub enum EmulatorError {
    /// The configuration file could not be read
    #[error("Failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for [`crate::core::config::Nv4Config`]
    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// The configuration parsed but holds values the device cannot use
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A register write given on the command line was malformed
    #[error("Invalid register write '{0}', expected ADDRESS=VALUE")]
    InvalidRegisterWrite(String),

    /// A numeric literal could not be parsed
    #[error("Invalid number '{input}': {source}")]
    InvalidNumber {
        input: String,
        #[source]
        source: std::num::ParseIntError,
    },

    /// Serializing a state snapshot failed
    #[error("Failed to serialize state: {0}")]
    Snapshot(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_config_message() {
        let err = EmulatorError::InvalidConfig("cpu_clock_hz must be positive".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid configuration: cpu_clock_hz must be positive"
        );
    }

    #[test]
    fn test_register_write_message() {
        let err = EmulatorError::InvalidRegisterWrite("0x680600".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid register write '0x680600', expected ADDRESS=VALUE"
        );
    }

    #[test]
    fn test_snapshot_error_converts() {
        let json: std::result::Result<serde_json::Value, _> = serde_json::from_str("{");
        let err: EmulatorError = json.unwrap_err().into();
        assert!(matches!(err, EmulatorError::Snapshot(_)));
        assert!(err.to_string().starts_with("Failed to serialize state"));
    }

    #[test]
    fn test_parse_error_converts() {
        let parse: std::result::Result<toml::Value, _> = toml::from_str("clock = [");
        let err: EmulatorError = parse.unwrap_err().into();
        assert!(matches!(err, EmulatorError::ConfigParse(_)));
    }
}
