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

//! Recurring clock timers
//!
//! The NV4 pixel and memory clocks run far faster than anything the host can
//! schedule individually, so each clock domain is modeled as a recurring timer
//! with a period in microseconds. The host advances emulated time in steps;
//! every running timer accumulates the step and fires once when the
//! accumulated time reaches its period.
//!
//! ## Firing Rules
//!
//! - A timer fires at most once per [`RivaTimers::advance`] call
//! - The callback receives the accumulated time in seconds
//! - The accumulator resets to zero after firing (remainders are dropped)
//! - Timers are never destroyed; they live as long as the device
//!
//! The scheduling side used by the device model is the [`ClockScheduler`]
//! trait, so the PRAMDAC can be driven by a different timer implementation
//! in tests.

/// Handle to a timer owned by a [`ClockScheduler`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(usize);

impl TimerHandle {
    /// Raw index of this handle
    pub fn index(self) -> usize {
        self.0
    }
}

/// Timer primitive used by the clock controller
///
/// `C` is the callback token reported back when the timer expires.
pub trait ClockScheduler<C> {
    /// Create a stopped timer with the given period (microseconds)
    fn create(&mut self, period: f64, callback: C) -> TimerHandle;

    /// Start a timer
    fn start(&mut self, handle: TimerHandle);

    /// Change the period of an existing timer without touching its
    /// accumulated time
    fn set_period(&mut self, handle: TimerHandle, period: f64);
}

/// A timer that fired during an [`RivaTimers::advance`] step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimerExpiry<C> {
    /// Timer that fired
    pub handle: TimerHandle,

    /// Callback token given at creation
    pub callback: C,

    /// Time accumulated since the previous expiry, in seconds
    pub real_time: f64,
}

#[derive(Debug)]
struct RivaTimer<C> {
    /// Period in microseconds
    period: f64,

    /// Accumulated time in microseconds
    elapsed: f64,

    running: bool,

    callback: C,
}

/// Collection of recurring timers advanced by the host emulator loop
///
/// # Example
///
/// ```
/// use nv4emu::core::rivatimer::{ClockScheduler, RivaTimers};
///
/// let mut timers = RivaTimers::new();
/// let handle = timers.create(100.0, "tick");
/// timers.start(handle);
///
/// assert!(timers.advance(50.0).is_empty());
/// let fired = timers.advance(60.0);
/// assert_eq!(fired.len(), 1);
/// assert_eq!(fired[0].callback, "tick");
/// ```
#[derive(Debug)]
pub struct RivaTimers<C> {
    timers: Vec<RivaTimer<C>>,
}

impl<C: Copy> RivaTimers<C> {
    /// Create an empty timer set
    pub fn new() -> Self {
        Self { timers: Vec::new() }
    }

    /// Number of timers ever created
    pub fn len(&self) -> usize {
        self.timers.len()
    }

    /// True if no timer was created yet
    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Period of a timer in microseconds
    pub fn period(&self, handle: TimerHandle) -> Option<f64> {
        self.timers.get(handle.0).map(|t| t.period)
    }

    /// Whether a timer has been started
    pub fn is_running(&self, handle: TimerHandle) -> bool {
        self.timers.get(handle.0).is_some_and(|t| t.running)
    }

    /// Advance emulated time
    ///
    /// # Arguments
    ///
    /// * `elapsed_us` - Time step in microseconds
    ///
    /// # Returns
    ///
    /// Timers that reached their period during this step, in creation order
    pub fn advance(&mut self, elapsed_us: f64) -> Vec<TimerExpiry<C>> {
        let mut fired = Vec::new();

        for (index, timer) in self.timers.iter_mut().enumerate() {
            if !timer.running {
                continue;
            }

            timer.elapsed += elapsed_us;

            if timer.elapsed >= timer.period {
                fired.push(TimerExpiry {
                    handle: TimerHandle(index),
                    callback: timer.callback,
                    real_time: timer.elapsed / 1_000_000.0,
                });
                timer.elapsed = 0.0;
            }
        }

        fired
    }
}

impl<C: Copy> Default for RivaTimers<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Copy> ClockScheduler<C> for RivaTimers<C> {
    fn create(&mut self, period: f64, callback: C) -> TimerHandle {
        let handle = TimerHandle(self.timers.len());
        self.timers.push(RivaTimer {
            period,
            elapsed: 0.0,
            running: false,
            callback,
        });
        log::debug!("Timer {} created, period {:.6} us", handle.0, period);
        handle
    }

    fn start(&mut self, handle: TimerHandle) {
        match self.timers.get_mut(handle.0) {
            Some(timer) => timer.running = true,
            None => log::warn!("Attempted to start unknown timer {}", handle.0),
        }
    }

    fn set_period(&mut self, handle: TimerHandle, period: f64) {
        match self.timers.get_mut(handle.0) {
            Some(timer) => {
                timer.period = period;
                log::trace!("Timer {} period = {:.6} us", handle.0, period);
            }
            None => log::warn!("Attempted to reprogram unknown timer {}", handle.0),
        }
    }
}
