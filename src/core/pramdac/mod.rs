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

//! NV4 PRAMDAC (RAMDAC and clock generator)
//!
//! The PRAMDAC holds the pixel and memory PLL coefficients and the display
//! timing registers the chip uses in extended mode.
//!
//! ## Registers
//!
//! ```text
//! Address  | Register                  | Behavior
//! ---------|---------------------------|------------------------------------------
//! 0x680504 | MPLL coefficients         | packed M/N/P, reprograms memory clock
//! 0x680508 | VPLL coefficients         | packed M/N/P, reprograms pixel clock
//! 0x68050C | PLL coefficient select    | stored, recalculates display timings
//! 0x680600 | General control           | stored, recalculates display timings
//! 0x68071C | Total vertical lines      | lives in the display unit
//! 0x680700 | Sync/blank/burst timings  | stored
//!  ..73C   |                           |
//! ```
//!
//! VEQU end (0x680704) and VBBLANK start (0x680714) are decoded but have no
//! storage.

mod clock;
mod pll;

pub use clock::{ClockDomain, ClockTimer};
pub use pll::{compute_frequency, timer_period, PllDivisors};

use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;

use super::config::Nv4Config;
use super::display::DisplayTiming;
use super::register::{RegisterDescriptor, RegisterTable};
use super::rivatimer::ClockScheduler;

/// PRAMDAC register addresses
pub mod addr {
    /// First PRAMDAC address
    pub const START: u32 = 0x680300;
    /// Last PRAMDAC address
    pub const END: u32 = 0x680FFF;

    pub const CLOCK_MEMORY: u32 = 0x680504;
    pub const CLOCK_PIXEL: u32 = 0x680508;
    pub const COEFF_SELECT: u32 = 0x68050C;
    pub const GENERAL_CONTROL: u32 = 0x680600;
    pub const VSERR_WIDTH: u32 = 0x680700;
    pub const VEQU_END: u32 = 0x680704;
    pub const VBBLANK_END: u32 = 0x680708;
    pub const VBLANK_END: u32 = 0x68070C;
    pub const VBLANK_START: u32 = 0x680710;
    pub const VBBLANK_START: u32 = 0x680714;
    pub const VEQU_START: u32 = 0x680718;
    pub const VTOTAL: u32 = 0x68071C;
    pub const HSYNC_WIDTH: u32 = 0x680720;
    pub const HBURST_START: u32 = 0x680724;
    pub const HBURST_END: u32 = 0x680728;
    pub const HBLANK_START: u32 = 0x68072C;
    pub const HBLANK_END: u32 = 0x680730;
    pub const HTOTAL: u32 = 0x680734;
    pub const HEQU_WIDTH: u32 = 0x680738;
    pub const HSERR_WIDTH: u32 = 0x68073C;
}

/// Hand the horizontal total to the display unit and recalculate
fn recalc_display(r: &mut Pramdac) {
    let mut display = r.display.borrow_mut();
    display.set_htotal(r.htotal);
    display.recalc_timings();
}

static PRAMDAC_REGISTERS: [RegisterDescriptor<Pramdac>; 20] = [
    RegisterDescriptor::hooked(
        addr::CLOCK_PIXEL,
        "PRAMDAC - NV4 GPU Core - Pixel clock",
        |r| r.pixel_clock_register(),
        |r, v| r.set_pixel_clock_register(v),
    ),
    RegisterDescriptor::hooked(
        addr::CLOCK_MEMORY,
        "PRAMDAC - NV4 GPU Core - Memory clock",
        |r| r.vram_clock_register(),
        |r, v| r.set_vram_clock_register(v),
    ),
    RegisterDescriptor::field_then(
        addr::COEFF_SELECT,
        "PRAMDAC - PLL Clock Coefficient Select",
        |r| r.coeff_select,
        |r, v| r.coeff_select = v,
        recalc_display,
    ),
    RegisterDescriptor::field_then(
        addr::GENERAL_CONTROL,
        "PRAMDAC - General Control",
        |r| r.general_control,
        |r, v| r.general_control = v,
        recalc_display,
    ),
    RegisterDescriptor::field(
        addr::VSERR_WIDTH,
        "PRAMDAC - Vertical Sync Error Width",
        |r| r.vserr_width,
        |r, v| r.vserr_width = v,
    ),
    RegisterDescriptor::unbacked(addr::VEQU_END, "PRAMDAC - VEqu End"),
    RegisterDescriptor::unbacked(addr::VBBLANK_START, "PRAMDAC - VBBlank Start"),
    RegisterDescriptor::field(
        addr::VBBLANK_END,
        "PRAMDAC - VBBlank End",
        |r| r.vbblank_end,
        |r, v| r.vbblank_end = v,
    ),
    RegisterDescriptor::field(
        addr::HBLANK_END,
        "PRAMDAC - Horizontal Blanking Interval End",
        |r| r.hblank_end,
        |r, v| r.hblank_end = v,
    ),
    RegisterDescriptor::field(
        addr::HBLANK_START,
        "PRAMDAC - Horizontal Blanking Interval Start",
        |r| r.hblank_start,
        |r, v| r.hblank_start = v,
    ),
    RegisterDescriptor::field(
        addr::VBLANK_END,
        "PRAMDAC - Vertical Blanking Interval End",
        |r| r.vblank_end,
        |r, v| r.vblank_end = v,
    ),
    RegisterDescriptor::field(
        addr::VBLANK_START,
        "PRAMDAC - Vertical Blanking Interval Start",
        |r| r.vblank_start,
        |r, v| r.vblank_start = v,
    ),
    RegisterDescriptor::field(
        addr::VEQU_START,
        "PRAMDAC - VEqu Start",
        |r| r.vequ_start,
        |r, v| r.vequ_start = v,
    ),
    // Total vertical lines belongs to the display unit
    RegisterDescriptor::field(
        addr::VTOTAL,
        "PRAMDAC - Total Vertical Lines",
        |r| r.display.borrow().vtotal(),
        |r, v| r.display.borrow_mut().set_vtotal(v),
    ),
    RegisterDescriptor::field(
        addr::HSYNC_WIDTH,
        "PRAMDAC - Horizontal Sync Pulse Width",
        |r| r.hsync_width,
        |r, v| r.hsync_width = v,
    ),
    RegisterDescriptor::field(
        addr::HBURST_START,
        "PRAMDAC - Horizontal Burst Signal Start",
        |r| r.hburst_start,
        |r, v| r.hburst_start = v,
    ),
    RegisterDescriptor::field(
        addr::HBURST_END,
        "PRAMDAC - Horizontal Burst Signal End",
        |r| r.hburst_end,
        |r, v| r.hburst_end = v,
    ),
    RegisterDescriptor::field(
        addr::HTOTAL,
        "PRAMDAC - Total Horizontal Lines",
        |r| r.htotal,
        |r, v| r.htotal = v,
    ),
    RegisterDescriptor::field(
        addr::HEQU_WIDTH,
        "PRAMDAC - HEqu End",
        |r| r.hequ_width,
        |r, v| r.hequ_width = v,
    ),
    RegisterDescriptor::field(
        addr::HSERR_WIDTH,
        "PRAMDAC - Horizontal Sync Error",
        |r| r.hserr_width,
        |r, v| r.hserr_width = v,
    ),
];

static PRAMDAC_TABLE: RegisterTable<Pramdac> = RegisterTable::new("PRAMDAC", &PRAMDAC_REGISTERS);

/// Shared handle to the timer primitive driving the clock domains
pub type SharedScheduler = Rc<RefCell<dyn ClockScheduler<ClockDomain>>>;

/// Shared handle to the display timing unit
pub type SharedDisplay = Rc<RefCell<dyn DisplayTiming>>;

/// NV4 RAMDAC state
pub struct Pramdac {
    /// Pixel clock PLL (VPLL)
    pub(crate) pixel_pll: PllDivisors,

    /// Memory clock PLL (MPLL)
    pub(crate) memory_pll: PllDivisors,

    pub(crate) pixel_clock: ClockTimer,
    pub(crate) memory_clock: ClockTimer,

    /// PLL reference frequency in hertz
    reference_hz: f64,

    /// Host CPU clock in hertz
    cpu_clock_hz: f64,

    /// Host timer unit correction
    fix_quotient: f64,

    /// Seconds between screen refreshes in extended mode (0 = default)
    pub(crate) refresh_time: f64,

    /// Seconds accumulated since the last refresh
    pub(crate) refresh_clock: f64,

    coeff_select: u32,
    general_control: u32,
    vserr_width: u32,
    vbblank_end: u32,
    vblank_end: u32,
    vblank_start: u32,
    vequ_start: u32,
    hsync_width: u32,
    hburst_start: u32,
    hburst_end: u32,
    hblank_start: u32,
    hblank_end: u32,
    htotal: u32,
    hequ_width: u32,
    hserr_width: u32,

    scheduler: SharedScheduler,
    display: SharedDisplay,
}

impl Pramdac {
    /// Create a PRAMDAC with the configured power-on divisors
    ///
    /// The clocks are not running until [`Pramdac::init`] is called.
    ///
    /// # Arguments
    ///
    /// * `config` - Device configuration (crystal, CPU clock, divisors)
    /// * `scheduler` - Timer primitive for the pixel and memory clocks
    /// * `display` - Display timing unit
    pub fn new(config: &Nv4Config, scheduler: SharedScheduler, display: SharedDisplay) -> Self {
        Self {
            pixel_pll: config.pll.pixel.divisors(),
            memory_pll: config.pll.memory.divisors(),
            pixel_clock: ClockTimer::default(),
            memory_clock: ClockTimer::default(),
            reference_hz: config.clock.crystal.frequency_hz(),
            cpu_clock_hz: config.clock.cpu_clock_hz,
            fix_quotient: config.clock.timer_fix_quotient,
            refresh_time: config.display.refresh_time,
            refresh_clock: 0.0,
            coeff_select: 0,
            general_control: 0,
            vserr_width: 0,
            vbblank_end: 0,
            vblank_end: 0,
            vblank_start: 0,
            vequ_start: 0,
            hsync_width: 0,
            hburst_start: 0,
            hburst_end: 0,
            hblank_start: 0,
            hblank_end: 0,
            htotal: 0,
            hequ_width: 0,
            hserr_width: 0,
            scheduler,
            display,
        }
    }

    /// Start both clocks
    pub fn init(&mut self) {
        log::info!("Initialising PRAMDAC");

        self.set_pixel_clock();
        self.set_vram_clock();

        log::info!("Initialising PRAMDAC: Done");
    }

    /// Read a PRAMDAC register
    pub fn read(&mut self, address: u32) -> u32 {
        PRAMDAC_TABLE.read(self, address)
    }

    /// Write a PRAMDAC register
    pub fn write(&mut self, address: u32, value: u32) {
        PRAMDAC_TABLE.write(self, address, value);
    }

    /// Packed memory PLL coefficients
    pub fn vram_clock_register(&self) -> u32 {
        self.memory_pll.to_register()
    }

    /// Packed pixel PLL coefficients
    pub fn pixel_clock_register(&self) -> u32 {
        self.pixel_pll.to_register()
    }

    /// Load memory PLL coefficients and reprogram the memory clock
    pub fn set_vram_clock_register(&mut self, value: u32) {
        self.memory_pll = PllDivisors::from_register(value);
        self.set_vram_clock();
    }

    /// Load pixel PLL coefficients and reprogram the pixel clock
    pub fn set_pixel_clock_register(&mut self, value: u32) {
        self.pixel_pll = PllDivisors::from_register(value);
        self.set_pixel_clock();
    }

    /// Pixel PLL divisors
    pub fn pixel_pll(&self) -> PllDivisors {
        self.pixel_pll
    }

    /// Memory PLL divisors
    pub fn memory_pll(&self) -> PllDivisors {
        self.memory_pll
    }

    /// Pixel clock timer state
    pub fn pixel_clock(&self) -> ClockTimer {
        self.pixel_clock
    }

    /// Memory clock timer state
    pub fn memory_clock(&self) -> ClockTimer {
        self.memory_clock
    }

    /// Seconds accumulated toward the next screen refresh
    pub fn refresh_clock(&self) -> f64 {
        self.refresh_clock
    }

    /// Capture the clock state for inspection
    pub fn snapshot(&self) -> RamdacSnapshot {
        RamdacSnapshot {
            pixel_pll: self.pixel_pll,
            memory_pll: self.memory_pll,
            pixel_clock: self.pixel_clock,
            memory_clock: self.memory_clock,
            coeff_select: self.coeff_select,
            general_control: self.general_control,
            htotal: self.htotal,
            vtotal: self.display.borrow().vtotal(),
        }
    }
}

/// Serializable view of the PRAMDAC clock state
#[derive(Debug, Clone, Serialize)]
pub struct RamdacSnapshot {
    pub pixel_pll: PllDivisors,
    pub memory_pll: PllDivisors,
    pub pixel_clock: ClockTimer,
    pub memory_clock: ClockTimer,
    pub coeff_select: u32,
    pub general_control: u32,
    pub htotal: u32,
    pub vtotal: u32,
}
