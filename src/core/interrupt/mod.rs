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

//! NV4 PMC interrupt aggregation
//!
//! Each NV4 subsystem (PFIFO, PGRAPH, PTIMER, ...) keeps its own interrupt
//! status register. The master control block (PMC) only sees one line per
//! subsystem and signals the host CPU when any line is asserted and hardware
//! interrupts are enabled.
//!
//! ## Registers
//!
//! - **PMC_INTR_0** (0x000100): Pending subsystem lines (read-only)
//! - **PMC_INTR_EN_0** (0x000140): Interrupt enable
//!   - bit 0: hardware interrupts
//!   - bit 1: software interrupts
//!
//! ## Interrupt Sources (Bit Positions)
//!
//! ```text
//! Bit  | Source   | Description
//! -----|----------|----------------------------------
//! 4    | PMEDIA   | Media port
//! 8    | PFIFO    | Command FIFO
//! 12   | PGRAPH   | Graphics engine
//! 16   | PVIDEO   | Video overlay
//! 20   | PTIMER   | Programmable timer
//! 24   | PCRTC    | CRT controller (vblank)
//! 28   | PBUS     | Bus interface
//! 31   | SOFTWARE | Software interrupt
//! ```

use bitflags::bitflags;

use super::register::{RegisterDescriptor, RegisterTable};

bitflags! {
    /// PMC interrupt source lines
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct PmcSources: u32 {
        const PMEDIA = 1 << 4;
        const PFIFO = 1 << 8;
        const PGRAPH = 1 << 12;
        const PVIDEO = 1 << 16;
        const PTIMER = 1 << 20;
        const PCRTC = 1 << 24;
        const PBUS = 1 << 28;
        const SOFTWARE = 1 << 31;
    }
}

/// PMC_INTR_EN_0 bits
pub mod enable {
    /// Hardware interrupts reach the CPU
    pub const HARDWARE: u32 = 1 << 0;

    /// Software interrupts reach the CPU
    pub const SOFTWARE: u32 = 1 << 1;
}

/// PMC interrupt register addresses
pub mod addr {
    pub const PMC_INTR_0: u32 = 0x000100;
    pub const PMC_INTR_EN_0: u32 = 0x000140;
}

static PMC_REGISTERS: [RegisterDescriptor<InterruptController>; 2] = [
    RegisterDescriptor::field(
        addr::PMC_INTR_0,
        "PMC - Interrupt Status",
        |ic| ic.read_status(),
        // Lines follow the subsystems, writes have no effect
        |_, _| {},
    ),
    RegisterDescriptor::field(
        addr::PMC_INTR_EN_0,
        "PMC - Interrupt Enable",
        |ic| ic.read_enable(),
        |ic, v| ic.write_enable(v),
    ),
];

static PMC_TABLE: RegisterTable<InterruptController> = RegisterTable::new("PMC", &PMC_REGISTERS);

/// NV4 master interrupt controller
///
/// # Example
///
/// ```
/// use nv4emu::core::interrupt::{enable, InterruptController, PmcSources};
///
/// let mut ic = InterruptController::new();
///
/// // PGRAPH raised something
/// ic.set_line(PmcSources::PGRAPH, true);
/// assert!(!ic.is_pending());
///
/// // Enable hardware interrupts
/// ic.write_enable(enable::HARDWARE);
/// assert!(ic.is_pending());
///
/// // PGRAPH status was acknowledged by the driver
/// ic.set_line(PmcSources::PGRAPH, false);
/// assert!(!ic.is_pending());
/// ```
#[derive(Debug, Default)]
pub struct InterruptController {
    /// Asserted subsystem lines
    lines: PmcSources,

    /// PMC_INTR_EN_0
    enable: u32,
}

impl InterruptController {
    /// Create a controller with all lines clear and interrupts disabled
    pub fn new() -> Self {
        Self {
            lines: PmcSources::empty(),
            enable: 0,
        }
    }

    /// Assert or deassert a subsystem line
    ///
    /// # Arguments
    ///
    /// * `source` - Line(s) to update
    /// * `asserted` - New level
    pub fn set_line(&mut self, source: PmcSources, asserted: bool) {
        let before = self.lines;
        self.lines.set(source, asserted);

        if before != self.lines {
            log::trace!(
                "PMC lines: 0x{:08X} -> 0x{:08X}",
                before.bits(),
                self.lines.bits()
            );
        }
    }

    /// Currently asserted lines
    pub fn lines(&self) -> PmcSources {
        self.lines
    }

    /// True if the CPU should see an interrupt
    pub fn is_pending(&self) -> bool {
        let hardware = self.lines.difference(PmcSources::SOFTWARE);
        let software = self.lines.intersection(PmcSources::SOFTWARE);

        (self.enable & enable::HARDWARE != 0 && !hardware.is_empty())
            || (self.enable & enable::SOFTWARE != 0 && !software.is_empty())
    }

    /// Read PMC_INTR_0
    pub fn read_status(&self) -> u32 {
        self.lines.bits()
    }

    /// Read PMC_INTR_EN_0
    pub fn read_enable(&self) -> u32 {
        self.enable
    }

    /// Write PMC_INTR_EN_0
    pub fn write_enable(&mut self, value: u32) {
        self.enable = value & (enable::HARDWARE | enable::SOFTWARE);
        log::debug!("PMC interrupt enable: 0x{:X}", self.enable);
    }

    /// Read a PMC register
    pub fn read(&mut self, address: u32) -> u32 {
        PMC_TABLE.read(self, address)
    }

    /// Write a PMC register
    pub fn write(&mut self, address: u32, value: u32) {
        PMC_TABLE.write(self, address, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_initializes_to_zero() {
        let ic = InterruptController::new();
        assert_eq!(ic.read_status(), 0);
        assert_eq!(ic.read_enable(), 0);
        assert!(!ic.is_pending());
    }

    #[test]
    fn test_line_bit_positions() {
        assert_eq!(PmcSources::PFIFO.bits(), 0x0000_0100);
        assert_eq!(PmcSources::PGRAPH.bits(), 0x0000_1000);
        assert_eq!(PmcSources::PTIMER.bits(), 0x0010_0000);
        assert_eq!(PmcSources::SOFTWARE.bits(), 0x8000_0000);
    }

    #[test]
    fn test_set_line_accumulates() {
        let mut ic = InterruptController::new();

        ic.set_line(PmcSources::PGRAPH, true);
        ic.set_line(PmcSources::PTIMER, true);

        assert_eq!(ic.lines(), PmcSources::PGRAPH | PmcSources::PTIMER);
    }

    #[test]
    fn test_set_line_idempotent() {
        let mut ic = InterruptController::new();

        ic.set_line(PmcSources::PFIFO, true);
        let first = ic.read_status();
        ic.set_line(PmcSources::PFIFO, true);

        assert_eq!(ic.read_status(), first);
    }

    #[test]
    fn test_deassert_preserves_other_lines() {
        let mut ic = InterruptController::new();

        ic.set_line(PmcSources::PGRAPH | PmcSources::PFIFO, true);
        ic.set_line(PmcSources::PGRAPH, false);

        assert_eq!(ic.lines(), PmcSources::PFIFO);
    }

    #[test]
    fn test_pending_requires_enable() {
        let mut ic = InterruptController::new();

        ic.set_line(PmcSources::PTIMER, true);
        assert!(!ic.is_pending());

        ic.write_enable(enable::HARDWARE);
        assert!(ic.is_pending());

        ic.write_enable(0);
        assert!(!ic.is_pending());
    }

    #[test]
    fn test_software_line_uses_software_enable() {
        let mut ic = InterruptController::new();

        ic.set_line(PmcSources::SOFTWARE, true);
        ic.write_enable(enable::HARDWARE);
        assert!(!ic.is_pending());

        ic.write_enable(enable::SOFTWARE);
        assert!(ic.is_pending());
    }

    #[test]
    fn test_enable_ignores_unused_bits() {
        let mut ic = InterruptController::new();

        ic.write_enable(0xFFFF_FFFF);
        assert_eq!(ic.read_enable(), 0x3);
    }

    #[test]
    fn test_registers_through_table() {
        let mut ic = InterruptController::new();

        ic.write(addr::PMC_INTR_EN_0, enable::HARDWARE);
        ic.set_line(PmcSources::PGRAPH, true);

        assert_eq!(ic.read(addr::PMC_INTR_EN_0), enable::HARDWARE);
        assert_eq!(ic.read(addr::PMC_INTR_0), PmcSources::PGRAPH.bits());
    }

    #[test]
    fn test_status_register_is_read_only() {
        let mut ic = InterruptController::new();

        ic.set_line(PmcSources::PFIFO, true);
        ic.write(addr::PMC_INTR_0, 0);

        assert_eq!(ic.read(addr::PMC_INTR_0), PmcSources::PFIFO.bits());
    }
}
