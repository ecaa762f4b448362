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

//! I/O Device Trait
//!
//! Uniform register access for memory-mapped NV4 subsystems. Addresses are
//! absolute BAR0 offsets; each subsystem decodes them against its own
//! register table.
//!
//! Accesses never fail. Unknown registers read as zero and ignore writes,
//! which is what the hardware does for undecoded addresses.
//!
//! Narrow writes merge into the aligned word, except on write-1-to-clear
//! status registers where the untouched byte lanes are written as zero.
//!
//! # Example
//!
//! ```
//! use nv4emu::core::mmio::IODevice;
//!
//! struct Scratch {
//!     value: u32,
//! }
//!
//! impl IODevice for Scratch {
//!     fn address_range(&self) -> (u32, u32) {
//!         (0x1000, 0x1003)
//!     }
//!
//!     fn read_register(&mut self, _address: u32) -> u32 {
//!         self.value
//!     }
//!
//!     fn write_register(&mut self, _address: u32, value: u32) {
//!         self.value = value;
//!     }
//! }
//!
//! let mut scratch = Scratch { value: 0 };
//! scratch.write_register8(0x1001, 0xAB);
//! assert_eq!(scratch.read_register(0x1000), 0xAB00);
//! ```

/// Memory-mapped register block
///
/// Implementors provide 32-bit access. Narrower accesses are derived from
/// the aligned 32-bit word by default.
pub trait IODevice {
    /// Inclusive `(start, end)` address range this device decodes
    fn address_range(&self) -> (u32, u32);

    /// True if `address` falls within this device's range
    fn contains(&self, address: u32) -> bool {
        let (start, end) = self.address_range();
        address >= start && address <= end
    }

    /// Read a 32-bit register
    ///
    /// Takes `&mut self` because some registers have read side effects.
    fn read_register(&mut self, address: u32) -> u32;

    /// Write a 32-bit register
    fn write_register(&mut self, address: u32, value: u32);

    /// True if writing a 1 bit to the aligned register at `address`
    /// clears that bit (interrupt status registers)
    fn is_write_one_to_clear(&self, _address: u32) -> bool {
        false
    }

    /// Current value of the aligned word, as seen by a narrow write
    fn merge_base(&mut self, aligned: u32) -> u32 {
        if self.is_write_one_to_clear(aligned) {
            0
        } else {
            self.read_register(aligned)
        }
    }

    /// Read a 16-bit value from the aligned 32-bit word
    fn read_register16(&mut self, address: u32) -> u16 {
        let value = self.read_register(address & !0x03);
        let shift = (address & 0x02) * 8;
        ((value >> shift) & 0xFFFF) as u16
    }

    /// Read-modify-write one 16-bit half of the aligned word
    fn write_register16(&mut self, address: u32, value: u16) {
        let aligned = address & !0x03;
        let shift = (address & 0x02) * 8;
        let mask = !(0xFFFFu32 << shift);
        let current = self.merge_base(aligned);
        self.write_register(aligned, (current & mask) | ((value as u32) << shift));
    }

    /// Read an 8-bit value from the aligned 32-bit word
    fn read_register8(&mut self, address: u32) -> u8 {
        let value = self.read_register(address & !0x03);
        let shift = (address & 0x03) * 8;
        ((value >> shift) & 0xFF) as u8
    }

    /// Read-modify-write one byte of the aligned word
    fn write_register8(&mut self, address: u32, value: u8) {
        let aligned = address & !0x03;
        let shift = (address & 0x03) * 8;
        let mask = !(0xFFu32 << shift);
        let current = self.merge_base(aligned);
        self.write_register(aligned, (current & mask) | ((value as u32) << shift));
    }

    /// Device name for logging
    fn name(&self) -> &'static str {
        "Unknown Device"
    }
}
