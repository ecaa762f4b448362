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

//! NV4 device integration
//!
//! Ties the NV4 subsystems together behind one BAR0 register window and
//! drives them from the RAMDAC clocks.
//!
//! ```text
//!  advance(elapsed_us)
//!        │
//!  ┌─────▼──────┐  pixel expiry   ┌──────────┐
//!  │ RivaTimers ├────────────────►│ PRAMDAC  ├──► display refresh
//!  └─────┬──────┘                 └──────────┘
//!        │ memory expiry
//!        ▼
//!  PTIMER tick ──► PFIFO cache0 pull ──► PFIFO cache1 pull ──► PGRAPH
//! ```
//!
//! After every register write and every `advance`, each subsystem's pending
//! state is copied onto its PMC source line.

use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;

use super::config::Nv4Config;
use super::display::Svga;
use super::interrupt::{InterruptController, PmcSources};
use super::mmio::IODevice;
use super::pfifo::Pfifo;
use super::pgraph::Pgraph;
use super::pramdac::{ClockDomain, Pramdac, RamdacSnapshot};
use super::ptimer::Ptimer;
use super::rivatimer::RivaTimers;

/// Last BAR0 address
pub const BAR0_END: u32 = 0x00FF_FFFF;

/// NV4 graphics device
///
/// # Example
///
/// ```
/// use nv4emu::core::config::Nv4Config;
/// use nv4emu::core::device::Nv4Device;
/// use nv4emu::core::ptimer;
///
/// let mut device = Nv4Device::new(&Nv4Config::default());
///
/// // One microsecond: the memory clock fires once and PTIMER advances
/// device.advance(1.0);
/// assert_eq!(device.read32(ptimer::addr::TIME_0), 1_000);
/// ```
pub struct Nv4Device {
    /// Host timers driving the pixel and memory clocks (shared with PRAMDAC)
    timers: Rc<RefCell<RivaTimers<ClockDomain>>>,
    /// Display unit (shared with PRAMDAC)
    display: Rc<RefCell<Svga>>,

    pramdac: Pramdac,
    /// PTIMER (shared via Rc<RefCell> so method handlers can timestamp)
    ptimer: Rc<RefCell<Ptimer>>,
    pfifo: Pfifo,
    pgraph: Pgraph,
    pmc: InterruptController,
}

impl Nv4Device {
    /// Create a device and start its clocks
    pub fn new(config: &Nv4Config) -> Self {
        let timers = Rc::new(RefCell::new(RivaTimers::new()));
        let display = Rc::new(RefCell::new(Svga::new()));

        let mut pramdac = Pramdac::new(config, timers.clone(), display.clone());
        pramdac.init();

        Self {
            timers,
            display,
            pramdac,
            ptimer: Rc::new(RefCell::new(Ptimer::new())),
            pfifo: Pfifo::new(),
            pgraph: Pgraph::new(),
            pmc: InterruptController::new(),
        }
    }

    /// Advance emulated time
    ///
    /// Timer expiries are collected first and then handled in creation
    /// order, so PRAMDAC reprogramming a clock from inside a callback never
    /// re-enters the timer set.
    ///
    /// # Arguments
    ///
    /// * `elapsed_us` - Elapsed host time in microseconds
    pub fn advance(&mut self, elapsed_us: f64) {
        let expiries = self.timers.borrow_mut().advance(elapsed_us);

        for expiry in expiries {
            match expiry.callback {
                ClockDomain::Pixel => self.pramdac.pixel_clock_poll(expiry.real_time),
                ClockDomain::Memory => self.memory_clock_poll(expiry.real_time),
            }
        }

        self.sync_interrupt_lines();
    }

    /// Memory clock expiry
    ///
    /// PGRAPH has no per-tick work of its own.
    fn memory_clock_poll(&mut self, real_time: f64) {
        self.ptimer.borrow_mut().tick(real_time);
        self.pfifo.cache0_pull(&mut self.pgraph);
        self.pfifo.cache1_pull(&mut self.pgraph);
    }

    fn sync_interrupt_lines(&mut self) {
        self.pmc.set_line(PmcSources::PFIFO, self.pfifo.pending());
        self.pmc
            .set_line(PmcSources::PGRAPH, self.pgraph.interrupts().pending());
        self.pmc
            .set_line(PmcSources::PTIMER, self.ptimer.borrow().pending());
    }

    fn route(&mut self, address: u32) -> Option<&mut dyn IODevice> {
        let devices: [&mut dyn IODevice; 5] = [
            &mut self.pmc,
            &mut self.pfifo,
            &mut self.ptimer,
            &mut self.pgraph,
            &mut self.pramdac,
        ];

        devices.into_iter().find(|device| device.contains(address))
    }

    /// Read a 32-bit BAR0 register
    pub fn read32(&mut self, address: u32) -> u32 {
        match self.route(address) {
            Some(device) => device.read_register(address),
            None => {
                log::warn!("Unmapped NV4 read at 0x{:06x}", address);
                0
            }
        }
    }

    /// Write a 32-bit BAR0 register
    pub fn write32(&mut self, address: u32, value: u32) {
        self.write_with(address, value, |device| device.write_register(address, value));
    }

    /// Route a write of any width, then resync the PMC lines
    fn write_with(&mut self, address: u32, value: u32, write: impl FnOnce(&mut dyn IODevice)) {
        match self.route(address) {
            Some(device) => write(device),
            None => {
                log::warn!(
                    "Unmapped NV4 write at 0x{:06x} (value 0x{:08x})",
                    address,
                    value
                );
            }
        }

        self.sync_interrupt_lines();
    }

    /// True if the device is signalling the host CPU
    pub fn is_interrupt_pending(&self) -> bool {
        self.pmc.is_pending()
    }

    /// Reference to the PRAMDAC
    pub fn pramdac(&self) -> &Pramdac {
        &self.pramdac
    }

    /// Mutable reference to the PRAMDAC
    pub fn pramdac_mut(&mut self) -> &mut Pramdac {
        &mut self.pramdac
    }

    /// Reference to PTIMER (wrapped in Rc<RefCell>)
    pub fn ptimer(&self) -> Rc<RefCell<Ptimer>> {
        Rc::clone(&self.ptimer)
    }

    /// Reference to PFIFO
    pub fn pfifo(&self) -> &Pfifo {
        &self.pfifo
    }

    /// Mutable reference to PFIFO, for binding objects and submitting methods
    pub fn pfifo_mut(&mut self) -> &mut Pfifo {
        &mut self.pfifo
    }

    /// Reference to PGRAPH
    pub fn pgraph(&self) -> &Pgraph {
        &self.pgraph
    }

    /// Mutable reference to PGRAPH, for registering method handlers
    pub fn pgraph_mut(&mut self) -> &mut Pgraph {
        &mut self.pgraph
    }

    /// Reference to the PMC interrupt controller
    pub fn interrupt_controller(&self) -> &InterruptController {
        &self.pmc
    }

    /// Reference to the display unit (wrapped in Rc<RefCell>)
    pub fn display(&self) -> Rc<RefCell<Svga>> {
        Rc::clone(&self.display)
    }

    /// Capture the device state for inspection
    pub fn snapshot(&self) -> DeviceSnapshot {
        DeviceSnapshot {
            ramdac: self.pramdac.snapshot(),
            display: self.display.borrow().clone(),
            ptimer_time: self.ptimer.borrow().time(),
            pfifo_cache0: self.pfifo.cache0_len(),
            pfifo_cache1: self.pfifo.cache1_len(),
            pgraph_intr: self.pgraph.interrupts().status(),
            pmc_intr: self.pmc.read_status(),
            interrupt_pending: self.pmc.is_pending(),
        }
    }
}

impl IODevice for Nv4Device {
    fn address_range(&self) -> (u32, u32) {
        (0, BAR0_END)
    }

    fn read_register(&mut self, address: u32) -> u32 {
        self.read32(address)
    }

    fn write_register(&mut self, address: u32, value: u32) {
        self.write32(address, value);
    }

    fn write_register16(&mut self, address: u32, value: u16) {
        self.write_with(address, value as u32, |device| {
            device.write_register16(address, value)
        });
    }

    fn write_register8(&mut self, address: u32, value: u8) {
        self.write_with(address, value as u32, |device| {
            device.write_register8(address, value)
        });
    }

    fn name(&self) -> &'static str {
        "NV4"
    }
}

/// Serializable view of the whole device
#[derive(Debug, Clone, Serialize)]
pub struct DeviceSnapshot {
    pub ramdac: RamdacSnapshot,
    pub display: Svga,
    pub ptimer_time: u64,
    pub pfifo_cache0: usize,
    pub pfifo_cache1: usize,
    pub pgraph_intr: u32,
    pub pmc_intr: u32,
    pub interrupt_pending: bool,
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::core::display::DisplayTiming;
    use crate::core::interrupt;
    use crate::core::pfifo::{self, CacheEntry};
    use crate::core::pgraph::classes::NV4_D3D6_TRIANGLE;
    use crate::core::pgraph::{self, GraphicsObject, InterruptLine, RaminContext};
    use crate::core::pramdac;
    use crate::core::ptimer;

    fn device() -> Nv4Device {
        Nv4Device::new(&Nv4Config::default())
    }

    #[test]
    fn test_new_starts_both_clocks() {
        let device = device();
        let timers = device.timers.borrow();

        assert_eq!(timers.len(), 2);

        let memory = device.pramdac().memory_clock();
        assert!((memory.frequency - 24_107_142.857).abs() < 1.0);
        assert!(timers.is_running(memory.timer.unwrap()));
    }

    #[test]
    fn test_memory_expiry_ticks_ptimer() {
        let mut device = device();

        device.advance(1.0);
        device.advance(2.0);

        assert_eq!(device.ptimer().borrow().time(), 3_000);
    }

    #[test]
    fn test_advance_below_period_does_nothing() {
        let mut device = device();

        device.advance(0.01);
        assert_eq!(device.ptimer().borrow().time(), 0);
    }

    #[test]
    fn test_pixel_expiry_refreshes_in_extended_mode() {
        let mut device = device();
        device.display().borrow_mut().set_override(true);

        // 10 ms, below the default 1/60 s
        device.advance(10_000.0);
        assert_eq!(device.display().borrow().refresh_count(), 0);

        device.advance(10_000.0);
        assert_eq!(device.display().borrow().refresh_count(), 1);
        assert_eq!(device.pramdac().refresh_clock(), 0.0);
    }

    #[test]
    fn test_pixel_expiry_ignored_in_vga_mode() {
        let mut device = device();

        device.advance(50_000.0);
        assert_eq!(device.display().borrow().refresh_count(), 0);
    }

    #[test]
    fn test_mmio_routing() {
        let mut device = device();

        device.write32(ptimer::addr::ALARM_0, 0x1234);
        assert_eq!(device.read32(ptimer::addr::ALARM_0), 0x1234);

        device.write32(pramdac::addr::HTOTAL, 0x50);
        assert_eq!(device.read32(pramdac::addr::HTOTAL), 0x50);

        device.write32(pfifo::addr::CACHE1_PULL0, 1);
        assert_eq!(device.read32(pfifo::addr::CACHE1_PULL0), 1);

        device.write32(pgraph::addr::INTR_EN_1, 0xFFFF_FFFF);
        assert_ne!(device.read32(pgraph::addr::INTR_EN_1), 0);
    }

    #[test]
    fn test_unmapped_reads_zero() {
        let mut device = device();

        device.write32(0x100000, 0xDEAD_BEEF);
        assert_eq!(device.read32(0x100000), 0);
        assert_eq!(device.read32(0xFF0000), 0);
    }

    #[test]
    fn test_vtotal_alias_through_mmio() {
        let mut device = device();

        device.write32(pramdac::addr::VTOTAL, 525);
        assert_eq!(device.display().borrow().vtotal(), 525);
        assert_eq!(device.read32(pramdac::addr::VTOTAL), 525);
    }

    #[test]
    fn test_byte_access_through_bar0() {
        let mut device = device();

        device.write_register8(ptimer::addr::ALARM_0 + 1, 0x12);
        assert_eq!(device.read32(ptimer::addr::ALARM_0), 0x1200);
    }

    #[test]
    fn test_ptimer_alarm_reaches_pmc() {
        let mut device = device();
        device.write32(interrupt::addr::PMC_INTR_EN_0, interrupt::enable::HARDWARE);
        device.write32(ptimer::addr::INTR_EN_0, ptimer::intr::ALARM);
        device.write32(ptimer::addr::ALARM_0, 500);

        assert!(!device.is_interrupt_pending());

        device.advance(1.0);

        assert_eq!(
            device.read32(interrupt::addr::PMC_INTR_0),
            PmcSources::PTIMER.bits()
        );
        assert!(device.is_interrupt_pending());

        device.write32(ptimer::addr::INTR_0, ptimer::intr::ALARM);
        assert_eq!(device.read32(interrupt::addr::PMC_INTR_0), 0);
        assert!(!device.is_interrupt_pending());
    }

    #[test]
    fn test_cache0_drains_before_cache1() {
        let mut device = device();
        let order = Rc::new(RefCell::new(Vec::new()));

        for method in [0x0100u16, 0x0200] {
            let order = Rc::clone(&order);
            device.pgraph_mut().dispatcher_mut().register_method(
                NV4_D3D6_TRIANGLE,
                method,
                Box::new(move |param, _id, _ctx, _obj, _irq| order.borrow_mut().push(param)),
            );
        }

        let context = RaminContext {
            class_id: NV4_D3D6_TRIANGLE,
            ..Default::default()
        };
        device
            .pfifo_mut()
            .bind_subchannel(0, context, GraphicsObject::default());

        device.pfifo_mut().submit_cache1(CacheEntry::new(0, 0x0200, 1));
        device.pfifo_mut().submit_cache0(CacheEntry::new(0, 0x0100, 0));
        device.write32(pfifo::addr::CACHE0_PULL0, 1);
        device.write32(pfifo::addr::CACHE1_PULL0, 1);

        device.advance(1.0);

        assert_eq!(*order.borrow(), vec![0, 1]);
        assert_eq!(device.pfifo().cache0_len(), 0);
        assert_eq!(device.pfifo().cache1_len(), 0);
    }

    #[test]
    fn test_ptimer_ticks_before_pfifo_drains() {
        let mut device = device();
        let seen = Rc::new(Cell::new(u64::MAX));

        let ptimer = device.ptimer();
        let observed = Rc::clone(&seen);
        device.pgraph_mut().dispatcher_mut().register_method(
            NV4_D3D6_TRIANGLE,
            0x0300,
            Box::new(move |_param, _id, _ctx, _obj, _irq| observed.set(ptimer.borrow().time())),
        );

        let context = RaminContext {
            class_id: NV4_D3D6_TRIANGLE,
            ..Default::default()
        };
        device
            .pfifo_mut()
            .bind_subchannel(0, context, GraphicsObject::default());
        device.pfifo_mut().submit_cache1(CacheEntry::new(0, 0x0300, 0));
        device.write32(pfifo::addr::CACHE1_PULL0, 1);

        device.advance(1.0);

        assert_eq!(seen.get(), 1_000);
    }

    #[test]
    fn test_byte_ack_keeps_other_pgraph_conditions() {
        let mut device = device();
        device.write32(
            pgraph::addr::INTR_EN_1,
            pgraph::intr::SOFTWARE_METHOD_PENDING | pgraph::intr::DOUBLE_NOTIFY,
        );
        device.pgraph_mut().dispatcher_mut().register_method(
            NV4_D3D6_TRIANGLE,
            0x0104,
            Box::new(|_param, _id, _ctx, _obj, irq| {
                irq.assert_condition(pgraph::intr::DOUBLE_NOTIFY)
            }),
        );

        let context = RaminContext {
            class_id: NV4_D3D6_TRIANGLE,
            ..Default::default()
        };
        let object = GraphicsObject::default();
        device.pgraph_mut().dispatch(0, 0x0104, context, object);
        device.pgraph_mut().dispatch(0, 0x0ABC, context, object);
        assert_eq!(device.read32(pgraph::addr::INTR_1), 0x0000_1001);

        device.write_register8(pgraph::addr::INTR_1, 0x01);
        assert_eq!(device.read32(pgraph::addr::INTR_1), 0x0000_1000);
        assert!(device
            .interrupt_controller()
            .lines()
            .contains(PmcSources::PGRAPH));

        device.write_register16(pgraph::addr::INTR_1, 0x1000);
        assert_eq!(device.read32(pgraph::addr::INTR_1), 0);
        assert!(!device
            .interrupt_controller()
            .lines()
            .contains(PmcSources::PGRAPH));
    }

    #[test]
    fn test_unknown_method_raises_pgraph_line() {
        let mut device = device();
        device.write32(pgraph::addr::INTR_EN_1, pgraph::intr::SOFTWARE_METHOD_PENDING);

        let context = RaminContext {
            class_id: NV4_D3D6_TRIANGLE,
            ..Default::default()
        };
        device
            .pfifo_mut()
            .bind_subchannel(1, context, GraphicsObject::default());
        device.pfifo_mut().submit_cache1(CacheEntry::new(1, 0x0ABC, 0));
        device.write32(pfifo::addr::CACHE1_PULL0, 1);

        device.advance(1.0);

        assert_eq!(
            device.read32(pgraph::addr::INTR_1),
            pgraph::intr::SOFTWARE_METHOD_PENDING
        );
        assert!(device
            .interrupt_controller()
            .lines()
            .contains(PmcSources::PGRAPH));
    }

    #[test]
    fn test_pll_write_reprograms_without_new_timer() {
        let mut device = device();

        device.write32(pramdac::addr::CLOCK_MEMORY, 0x0001_6407);

        assert_eq!(device.timers.borrow().len(), 2);
        assert_eq!(device.read32(pramdac::addr::CLOCK_MEMORY), 0x0001_6407);
    }

    #[test]
    fn test_snapshot_serializes() {
        let mut device = device();
        device.advance(1.0);

        let json = serde_json::to_value(device.snapshot()).unwrap();
        assert_eq!(json["ptimer_time"], 1_000);
        assert_eq!(json["interrupt_pending"], false);
        assert!(json["ramdac"]["memory_clock"]["frequency"].as_f64().unwrap() > 0.0);
    }
}
