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

//! Display timing unit (CRTC/SVGA state)
//!
//! The PRAMDAC shares a handful of timing values with the CRT controller and
//! asks it to recalculate its timings after certain register writes. The
//! PRAMDAC only sees the [`DisplayTiming`] trait; [`Svga`] is the concrete
//! unit used by [`crate::core::device::Nv4Device`].
//!
//! ## Derived Timings
//!
//! ```text
//! cycles per line  = htotal (characters) * 8 (dots per char) * dot clock
//! cycles per frame = cycles per line * vtotal
//! ```
//!
//! where the dot clock is the number of host CPU cycles per pixel, published
//! by the PRAMDAC whenever the pixel PLL is reprogrammed.

use serde::Serialize;

/// Dots per character clock
const DOTS_PER_CHAR: f64 = 8.0;

/// Operations the PRAMDAC performs on the display timing unit
pub trait DisplayTiming {
    /// Recompute derived display timings from the current totals
    fn recalc_timings(&mut self);

    /// Total vertical lines
    fn vtotal(&self) -> u32;

    /// Set total vertical lines
    fn set_vtotal(&mut self, value: u32);

    /// Set the horizontal total in characters
    fn set_htotal(&mut self, value: u32);

    /// Publish host CPU cycles per pixel
    fn set_dot_clock(&mut self, clock: f64);

    /// True when the chip drives the display itself rather than through the
    /// VGA-compatible path
    fn is_override(&self) -> bool;

    /// Refresh the visible screen contents
    fn refresh_screen(&mut self);
}

/// SVGA/CRTC display state
#[derive(Debug, Clone, Default, Serialize)]
pub struct Svga {
    /// Extended (accelerated) mode instead of VGA compatibility
    override_mode: bool,

    /// Horizontal total in characters
    htotal: u32,

    /// Vertical total in lines
    vtotal: u32,

    /// Host CPU cycles per pixel
    dot_clock: f64,

    /// Host CPU cycles per scanline, from the last recalculation
    line_time: f64,

    /// Host CPU cycles per frame, from the last recalculation
    frame_time: f64,

    /// Number of timing recalculations performed
    recalc_count: u64,

    /// Number of screen refreshes requested
    refresh_count: u64,
}

impl Svga {
    /// Create a display unit in VGA compatibility mode
    pub fn new() -> Self {
        Self::default()
    }

    /// Switch between VGA compatibility and extended mode
    pub fn set_override(&mut self, enabled: bool) {
        self.override_mode = enabled;
        log::debug!("SVGA override mode = {}", enabled);
    }

    /// Horizontal total in characters
    pub fn htotal(&self) -> u32 {
        self.htotal
    }

    /// Host CPU cycles per pixel
    pub fn dot_clock(&self) -> f64 {
        self.dot_clock
    }

    /// Host CPU cycles per scanline
    pub fn line_time(&self) -> f64 {
        self.line_time
    }

    /// Host CPU cycles per frame
    pub fn frame_time(&self) -> f64 {
        self.frame_time
    }

    /// Number of timing recalculations performed
    pub fn recalc_count(&self) -> u64 {
        self.recalc_count
    }

    /// Number of screen refreshes requested
    pub fn refresh_count(&self) -> u64 {
        self.refresh_count
    }
}

impl DisplayTiming for Svga {
    fn recalc_timings(&mut self) {
        self.recalc_count += 1;
        self.line_time = self.htotal as f64 * DOTS_PER_CHAR * self.dot_clock;
        self.frame_time = self.line_time * self.vtotal as f64;

        log::debug!(
            "SVGA timings: htotal={} vtotal={} line={:.2} frame={:.2} cycles",
            self.htotal,
            self.vtotal,
            self.line_time,
            self.frame_time
        );
    }

    fn vtotal(&self) -> u32 {
        self.vtotal
    }

    fn set_vtotal(&mut self, value: u32) {
        self.vtotal = value;
    }

    fn set_htotal(&mut self, value: u32) {
        self.htotal = value;
    }

    fn set_dot_clock(&mut self, clock: f64) {
        self.dot_clock = clock;
    }

    fn is_override(&self) -> bool {
        self.override_mode
    }

    fn refresh_screen(&mut self) {
        self.refresh_count += 1;
        log::trace!("SVGA refresh #{}", self.refresh_count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_vga_mode() {
        let svga = Svga::new();
        assert!(!svga.is_override());
        assert_eq!(svga.vtotal(), 0);
        assert_eq!(svga.refresh_count(), 0);
    }

    #[test]
    fn test_recalc_derives_line_and_frame_time() {
        let mut svga = Svga::new();
        svga.set_htotal(100);
        svga.set_vtotal(525);
        svga.set_dot_clock(2.0);

        svga.recalc_timings();

        assert_eq!(svga.line_time(), 1600.0);
        assert_eq!(svga.frame_time(), 1600.0 * 525.0);
        assert_eq!(svga.recalc_count(), 1);
    }

    #[test]
    fn test_recalc_with_zero_totals() {
        let mut svga = Svga::new();
        svga.set_dot_clock(3.0);

        svga.recalc_timings();

        assert_eq!(svga.line_time(), 0.0);
        assert_eq!(svga.frame_time(), 0.0);
    }

    #[test]
    fn test_refresh_counts() {
        let mut svga = Svga::new();
        svga.refresh_screen();
        svga.refresh_screen();
        assert_eq!(svga.refresh_count(), 2);
    }

    #[test]
    fn test_override_toggle() {
        let mut svga = Svga::new();
        svga.set_override(true);
        assert!(svga.is_override());
        svga.set_override(false);
        assert!(!svga.is_override());
    }
}
