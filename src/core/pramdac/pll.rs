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

//! PLL frequency synthesizer model
//!
//! Both NV4 clock PLLs (pixel/VPLL and memory/MPLL) derive their output from
//! the board's reference crystal and three divisors:
//!
//! ```text
//! frequency = reference * N / (M << P)
//! ```
//!
//! ## Coefficient Register Format (19 bits)
//!
//! ```text
//! 18-16: P (post divider, log2)
//! 15-8:  N (feedback divider)
//! 7-0:   M (input divider)
//! ```
//!
//! A zero M or N would divide by zero (or stop the clock); both are forced to
//! 1 in the stored divisor set the first time a frequency is computed from
//! them, so the clamped value is what the register reads back afterwards.

use serde::Serialize;

/// P is a 3-bit field
const P_MASK: u8 = 0x07;

/// Divisor fields of one PLL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PllDivisors {
    /// Input divider (bits 0-7)
    pub m: u8,

    /// Feedback divider (bits 8-15)
    pub n: u8,

    /// Post divider shift (bits 16-18)
    pub p: u8,
}

impl PllDivisors {
    /// Build a divisor set, truncating P to its 3-bit field
    ///
    /// # Example
    ///
    /// ```
    /// use nv4emu::core::pramdac::PllDivisors;
    ///
    /// let divisors = PllDivisors::new(0x07, 0xC8, 0x0C);
    /// assert_eq!(divisors.p, 0x04);
    /// ```
    pub const fn new(m: u8, n: u8, p: u8) -> Self {
        Self { m, n, p: p & P_MASK }
    }

    /// Unpack a coefficient register value
    pub fn from_register(value: u32) -> Self {
        Self {
            m: (value & 0xFF) as u8,
            n: ((value >> 8) & 0xFF) as u8,
            p: ((value >> 16) as u8) & P_MASK,
        }
    }

    /// Pack into the coefficient register layout
    pub fn to_register(self) -> u32 {
        (self.m as u32) | ((self.n as u32) << 8) | (((self.p & P_MASK) as u32) << 16)
    }

    /// Force zero M and N to 1
    pub fn clamp(&mut self) {
        if self.m == 0 {
            self.m = 1;
        }

        if self.n == 0 {
            self.n = 1;
        }
    }
}

/// Compute the PLL output frequency in hertz
///
/// Clamps `divisors` in place before computing.
///
/// # Example
///
/// ```
/// use nv4emu::core::pramdac::{compute_frequency, PllDivisors};
///
/// let mut divisors = PllDivisors::new(0, 0x10, 0);
/// let frequency = compute_frequency(&mut divisors, 13_500_000.0);
///
/// assert_eq!(divisors.m, 1);
/// assert_eq!(frequency, 13_500_000.0 * 16.0);
/// ```
pub fn compute_frequency(divisors: &mut PllDivisors, reference_hz: f64) -> f64 {
    divisors.clamp();

    let divider = (divisors.m as u32) << (divisors.p & P_MASK);
    reference_hz * divisors.n as f64 / divider as f64
}

/// Timer period for a clock of `frequency_hz`, in host timer units
pub fn timer_period(frequency_hz: f64, fix_quotient: f64) -> f64 {
    (1_000_000.0 * fix_quotient) / frequency_hz
}
