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

//! Device configuration
//!
//! Values that come from the video BIOS or the host machine on real hardware:
//! the PLL reference crystal, power-on PLL divisors, the host CPU clock used
//! to derive the dot clock, and the timer unit correction factor.
//!
//! Configuration is read from TOML. Every field is optional; missing fields
//! take their power-on defaults.
//!
//! ```toml
//! [clock]
//! crystal = "13.5MHz"
//! cpu_clock_hz = 200000000.0
//! timer_fix_quotient = 1.0
//!
//! [pll.pixel]
//! m = 0x07
//! n = 0xC8
//! p = 0x0C
//!
//! [display]
//! refresh_time = 0.0
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::{EmulatorError, Result};
use super::pramdac::PllDivisors;

/// PLL reference crystal strapped on the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Crystal {
    /// 13.5 MHz reference
    #[default]
    #[serde(rename = "13.5MHz")]
    Crystal13500,

    /// 14.318 MHz reference
    #[serde(rename = "14.318MHz")]
    Crystal14318,
}

impl Crystal {
    /// Reference frequency in hertz
    pub fn frequency_hz(self) -> f64 {
        match self {
            Crystal::Crystal13500 => 13_500_000.0,
            Crystal::Crystal14318 => 14_318_000.0,
        }
    }
}

/// Clock generation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    /// PLL reference crystal
    pub crystal: Crystal,

    /// Host CPU clock in hertz, used to derive the dot clock
    pub cpu_clock_hz: f64,

    /// Scale reconciling the host timer's unit with real microseconds
    pub timer_fix_quotient: f64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            crystal: Crystal::default(),
            cpu_clock_hz: 200_000_000.0,
            timer_fix_quotient: 1.0,
        }
    }
}

/// Raw divisor fields as found in the video BIOS
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DivisorConfig {
    pub m: u8,
    pub n: u8,
    pub p: u8,
}

impl DivisorConfig {
    /// Divisor set as the PLL sees it (P truncated to 3 bits)
    pub fn divisors(self) -> PllDivisors {
        PllDivisors::new(self.m, self.n, self.p)
    }
}

impl Default for DivisorConfig {
    fn default() -> Self {
        Self {
            m: 0x07,
            n: 0xC8,
            p: 0x0C,
        }
    }
}

/// Power-on PLL divisors
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PllConfig {
    pub pixel: DivisorConfig,
    pub memory: DivisorConfig,
}

/// Display refresh settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Seconds between screen refreshes in extended mode (0 = 1/60 s)
    pub refresh_time: f64,
}

/// Complete device configuration
///
/// # Example
///
/// ```
/// use nv4emu::core::config::{Crystal, Nv4Config};
///
/// let config = Nv4Config::from_toml_str("[clock]\ncrystal = \"14.318MHz\"\n").unwrap();
/// assert_eq!(config.clock.crystal, Crystal::Crystal14318);
/// assert_eq!(config.pll, Nv4Config::default().pll);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Nv4Config {
    pub clock: ClockConfig,
    pub pll: PllConfig,
    pub display: DisplayConfig,
}

impl Nv4Config {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| EmulatorError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;

        let config = Self::from_toml_str(&contents)?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that all values are usable by the device
    pub fn validate(&self) -> Result<()> {
        if !(self.clock.cpu_clock_hz.is_finite() && self.clock.cpu_clock_hz > 0.0) {
            return Err(EmulatorError::InvalidConfig(format!(
                "cpu_clock_hz must be positive, got {}",
                self.clock.cpu_clock_hz
            )));
        }

        if !(self.clock.timer_fix_quotient.is_finite() && self.clock.timer_fix_quotient > 0.0) {
            return Err(EmulatorError::InvalidConfig(format!(
                "timer_fix_quotient must be positive, got {}",
                self.clock.timer_fix_quotient
            )));
        }

        if !(self.display.refresh_time.is_finite() && self.display.refresh_time >= 0.0) {
            return Err(EmulatorError::InvalidConfig(format!(
                "refresh_time must not be negative, got {}",
                self.display.refresh_time
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_power_on_values() {
        let config = Nv4Config::default();

        assert_eq!(config.clock.crystal, Crystal::Crystal13500);
        assert_eq!(config.clock.timer_fix_quotient, 1.0);
        assert_eq!(config.pll.pixel, DivisorConfig { m: 0x07, n: 0xC8, p: 0x0C });
        assert_eq!(config.pll.memory, config.pll.pixel);
        assert_eq!(config.display.refresh_time, 0.0);
    }

    #[test]
    fn test_crystal_frequencies() {
        assert_eq!(Crystal::Crystal13500.frequency_hz(), 13_500_000.0);
        assert_eq!(Crystal::Crystal14318.frequency_hz(), 14_318_000.0);
    }

    #[test]
    fn test_empty_document_is_default() {
        let config = Nv4Config::from_toml_str("").unwrap();
        assert_eq!(config, Nv4Config::default());
    }

    #[test]
    fn test_partial_document() {
        let config = Nv4Config::from_toml_str(
            r#"
            [clock]
            cpu_clock_hz = 100000000.0

            [pll.memory]
            m = 1
            n = 2
            p = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.clock.cpu_clock_hz, 100_000_000.0);
        assert_eq!(config.clock.crystal, Crystal::Crystal13500);
        assert_eq!(config.pll.memory, DivisorConfig { m: 1, n: 2, p: 3 });
        assert_eq!(config.pll.pixel, DivisorConfig::default());
    }

    #[test]
    fn test_divisor_config_masks_p() {
        let divisors = DivisorConfig::default().divisors();
        assert_eq!(divisors.p, 0x04);
        assert_eq!(divisors.m, 0x07);
        assert_eq!(divisors.n, 0xC8);
    }

    #[test]
    fn test_rejects_non_positive_cpu_clock() {
        let err = Nv4Config::from_toml_str("[clock]\ncpu_clock_hz = 0.0\n").unwrap_err();
        assert!(matches!(err, EmulatorError::InvalidConfig(_)));
    }

    #[test]
    fn test_rejects_negative_refresh_time() {
        let err = Nv4Config::from_toml_str("[display]\nrefresh_time = -1.0\n").unwrap_err();
        assert!(matches!(err, EmulatorError::InvalidConfig(_)));
    }

    #[test]
    fn test_rejects_unknown_crystal() {
        let err = Nv4Config::from_toml_str("[clock]\ncrystal = \"27MHz\"\n").unwrap_err();
        assert!(matches!(err, EmulatorError::ConfigParse(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[display]\nrefresh_time = 0.02").unwrap();

        let config = Nv4Config::load(file.path()).unwrap();
        assert_eq!(config.display.refresh_time, 0.02);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Nv4Config::load(dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, EmulatorError::ConfigRead { .. }));
    }

    #[test]
    fn test_round_trip_through_toml() {
        let mut config = Nv4Config::default();
        config.clock.crystal = Crystal::Crystal14318;

        let text = toml::to_string(&config).unwrap();
        assert_eq!(Nv4Config::from_toml_str(&text).unwrap(), config);
    }
}
