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

//! NV4 PTIMER (programmable time keeping)
//!
//! PTIMER keeps a 64-bit nanosecond counter advanced from the memory clock
//! and raises an alarm interrupt when the low 32 bits pass the alarm value.
//!
//! ## Registers
//!
//! ```text
//! Address  | Register    | Description
//! ---------|-------------|----------------------------------------
//! 0x009100 | INTR_0      | Interrupt status (write 1 to clear)
//! 0x009140 | INTR_EN_0   | Interrupt enable
//! 0x009200 | NUMERATOR   | Time increment scale numerator
//! 0x009210 | DENOMINATOR | Time increment scale denominator
//! 0x009400 | TIME_0      | Time, low 32 bits
//! 0x009410 | TIME_1      | Time, high 32 bits
//! 0x009420 | ALARM_0     | Alarm compare value (low 32 bits of time)
//! ```

use super::register::{RegisterDescriptor, RegisterTable};

/// PTIMER register addresses
pub mod addr {
    pub const START: u32 = 0x009000;
    pub const END: u32 = 0x009FFF;

    pub const INTR_0: u32 = 0x009100;
    pub const INTR_EN_0: u32 = 0x009140;
    pub const NUMERATOR: u32 = 0x009200;
    pub const DENOMINATOR: u32 = 0x009210;
    pub const TIME_0: u32 = 0x009400;
    pub const TIME_1: u32 = 0x009410;
    pub const ALARM_0: u32 = 0x009420;
}

/// PTIMER interrupt conditions
pub mod intr {
    /// Time passed the alarm value
    pub const ALARM: u32 = 1 << 0;
}

static PTIMER_REGISTERS: [RegisterDescriptor<Ptimer>; 7] = [
    RegisterDescriptor::field(
        addr::INTR_0,
        "PTIMER - Interrupt Status",
        |t| t.intr_status,
        |t, v| t.intr_status &= !v,
    ),
    RegisterDescriptor::field(
        addr::INTR_EN_0,
        "PTIMER - Interrupt Enable",
        |t| t.intr_enable,
        |t, v| t.intr_enable = v & intr::ALARM,
    ),
    RegisterDescriptor::field(
        addr::NUMERATOR,
        "PTIMER - Clock Numerator",
        |t| t.numerator,
        |t, v| t.numerator = v & 0xFFFF,
    ),
    RegisterDescriptor::field(
        addr::DENOMINATOR,
        "PTIMER - Clock Denominator",
        |t| t.denominator,
        |t, v| t.denominator = v & 0xFFFF,
    ),
    RegisterDescriptor::field(
        addr::TIME_0,
        "PTIMER - Time (Low)",
        |t| t.time as u32,
        |t, v| t.time = (t.time & 0xFFFF_FFFF_0000_0000) | v as u64,
    ),
    RegisterDescriptor::field(
        addr::TIME_1,
        "PTIMER - Time (High)",
        |t| (t.time >> 32) as u32,
        |t, v| t.time = (t.time & 0xFFFF_FFFF) | ((v as u64) << 32),
    ),
    RegisterDescriptor::field(
        addr::ALARM_0,
        "PTIMER - Alarm",
        |t| t.alarm,
        |t, v| t.alarm = v,
    ),
];

static PTIMER_TABLE: RegisterTable<Ptimer> = RegisterTable::new("PTIMER", &PTIMER_REGISTERS);

/// NV4 programmable timer
///
/// # Example
///
/// ```
/// use nv4emu::core::ptimer::{addr, intr, Ptimer};
///
/// let mut ptimer = Ptimer::new();
/// ptimer.write(addr::ALARM_0, 1_000);
///
/// // One microsecond of emulated time
/// ptimer.tick(1e-6);
///
/// assert_eq!(ptimer.time(), 1_000);
/// assert_eq!(ptimer.read(addr::INTR_0), intr::ALARM);
/// ```
#[derive(Debug, Clone)]
pub struct Ptimer {
    numerator: u32,
    denominator: u32,

    /// Nanoseconds
    time: u64,

    /// Picoseconds not yet folded into `time`
    remainder_ps: u64,

    alarm: u32,
    intr_status: u32,
    intr_enable: u32,
}

impl Ptimer {
    /// Create a timer at time zero with a 1:1 scale
    pub fn new() -> Self {
        Self {
            numerator: 1,
            denominator: 1,
            time: 0,
            remainder_ps: 0,
            alarm: 0,
            intr_status: 0,
            intr_enable: 0,
        }
    }

    /// Advance the time counter
    ///
    /// # Arguments
    ///
    /// * `real_time` - Elapsed time in seconds since the last tick
    pub fn tick(&mut self, real_time: f64) {
        // A zero denominator would stop time entirely
        let denominator = self.denominator.max(1) as f64;
        let elapsed_ps = (real_time * 1e12 * self.numerator as f64 / denominator).round() as u64;

        let total_ps = elapsed_ps.saturating_add(self.remainder_ps);
        let increment = total_ps / 1_000;
        self.remainder_ps = total_ps % 1_000;

        let before = self.time;
        self.time = self.time.wrapping_add(increment);

        if Self::alarm_crossed(before, increment, self.alarm) {
            self.intr_status |= intr::ALARM;
            log::trace!("PTIMER alarm at time {}", self.time);
        }
    }

    /// True if the low 32 bits of time passed `alarm` while advancing by
    /// `increment` from `before`
    fn alarm_crossed(before: u64, increment: u64, alarm: u32) -> bool {
        if increment == 0 {
            return false;
        }

        if increment > u32::MAX as u64 {
            return true;
        }

        let distance = alarm.wrapping_sub(before as u32) as u64;
        distance != 0 && distance <= increment
    }

    /// Current time in nanoseconds
    pub fn time(&self) -> u64 {
        self.time
    }

    /// True if an enabled condition is asserted
    pub fn pending(&self) -> bool {
        self.intr_status & self.intr_enable != 0
    }

    /// Read a PTIMER register
    pub fn read(&mut self, address: u32) -> u32 {
        PTIMER_TABLE.read(self, address)
    }

    /// Write a PTIMER register
    pub fn write(&mut self, address: u32, value: u32) {
        PTIMER_TABLE.write(self, address, value);
    }
}

impl Default for Ptimer {
    fn default() -> Self {
        Self::new()
    }
}
