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

//! Pixel and memory clock controller
//!
//! Reprogramming either PLL recomputes its frequency and (re)programs the
//! recurring timer of that clock domain. The timer is created and started on
//! first use; afterwards only its period changes, so the phase tracked by the
//! timer primitive is never lost.
//!
//! The pixel clock timer drives screen refreshes in extended mode. The memory
//! clock timer drives PTIMER and the PFIFO pullers; that cascade lives in
//! [`crate::core::device::Nv4Device`], which owns those subsystems.

use serde::Serialize;

use super::pll::{compute_frequency, timer_period};
use super::Pramdac;
use crate::core::rivatimer::TimerHandle;

/// Default refresh interval when none was configured (seconds)
const DEFAULT_REFRESH_TIME: f64 = 1.0 / 60.0;

/// Clock domain a timer belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ClockDomain {
    /// Pixel clock (VPLL)
    Pixel,
    /// Memory clock (MPLL)
    Memory,
}

/// Timer state of one clock domain
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ClockTimer {
    /// Output frequency in hertz
    pub frequency: f64,

    /// Timer period in host timer units
    pub period: f64,

    /// Underlying recurring timer, once created
    #[serde(skip)]
    pub timer: Option<TimerHandle>,
}

impl Pramdac {
    /// Recompute the pixel clock and reprogram its timer
    ///
    /// Also publishes the dot clock (host CPU cycles per pixel) to the
    /// display unit.
    pub fn set_pixel_clock(&mut self) {
        let frequency = compute_frequency(&mut self.pixel_pll, self.reference_hz);
        let period = timer_period(frequency, self.fix_quotient);

        self.display
            .borrow_mut()
            .set_dot_clock(self.cpu_clock_hz / frequency);

        log::debug!("Pixel clock = {:.2} MHz", frequency / 1_000_000.0);

        self.pixel_clock.frequency = frequency;
        self.program_timer(ClockDomain::Pixel, period);
    }

    /// Recompute the memory clock and reprogram its timer
    pub fn set_vram_clock(&mut self) {
        let frequency = compute_frequency(&mut self.memory_pll, self.reference_hz);
        let period = timer_period(frequency, self.fix_quotient);

        log::debug!("Memory clock = {:.2} MHz", frequency / 1_000_000.0);

        self.memory_clock.frequency = frequency;
        self.program_timer(ClockDomain::Memory, period);
    }

    fn program_timer(&mut self, domain: ClockDomain, period: f64) {
        let clock = match domain {
            ClockDomain::Pixel => &mut self.pixel_clock,
            ClockDomain::Memory => &mut self.memory_clock,
        };
        clock.period = period;

        let mut scheduler = self.scheduler.borrow_mut();

        let handle = match clock.timer {
            Some(handle) => handle,
            None => {
                let handle = scheduler.create(period, domain);
                scheduler.start(handle);
                clock.timer = Some(handle);
                handle
            }
        };

        scheduler.set_period(handle, period);
    }

    /// Pixel clock expiry
    ///
    /// Only active in extended mode. Accumulates `real_time` (seconds) and
    /// refreshes the screen once the refresh interval has been exceeded.
    /// The accumulator restarts from zero rather than carrying the excess.
    pub fn pixel_clock_poll(&mut self, real_time: f64) {
        let mut display = self.display.borrow_mut();

        if !display.is_override() {
            return;
        }

        if self.refresh_time == 0.0 {
            self.refresh_time = DEFAULT_REFRESH_TIME;
        }

        self.refresh_clock += real_time;

        if self.refresh_clock > self.refresh_time {
            display.refresh_screen();
            self.refresh_clock = 0.0;
        }
    }
}
