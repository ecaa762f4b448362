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

//! Register tables and dispatch
//!
//! Every NV4 subsystem exposes its MMIO registers through a [`RegisterTable`]:
//! an ordered, fixed-length list of [`RegisterDescriptor`]s mapping an address
//! to a friendly name and to the way the register is read and written.
//!
//! ## Access Kinds
//!
//! ```text
//! Kind   | Read                        | Write
//! -------|-----------------------------|----------------------------------------
//! Hook   | hook result, nothing else   | hook only
//! Field  | getter on the device state  | setter, then optional side effect
//! None   | reads as zero               | ignored
//! ```
//!
//! Addresses missing from a table read as zero and ignore writes. Neither
//! case is an error; both are logged.
//!
//! # Example
//!
//! ```
//! use nv4emu::core::register::{ReadAccess, RegisterDescriptor, RegisterTable, WriteAccess};
//!
//! #[derive(Default)]
//! struct Regs {
//!     control: u32,
//! }
//!
//! static DESCRIPTORS: [RegisterDescriptor<Regs>; 1] = [RegisterDescriptor::field(
//!     0x100,
//!     "Control",
//!     |r| r.control,
//!     |r, v| r.control = v,
//! )];
//! static TABLE: RegisterTable<Regs> = RegisterTable::new("EXAMPLE", &DESCRIPTORS);
//!
//! let mut regs = Regs::default();
//! TABLE.write(&mut regs, 0x100, 0xCAFE);
//! assert_eq!(TABLE.read(&mut regs, 0x100), 0xCAFE);
//! assert_eq!(TABLE.read(&mut regs, 0x104), 0);
//! ```

/// How a register is read
pub enum ReadAccess<S> {
    /// Dedicated read function; its result is returned as-is
    Hook(fn(&mut S) -> u32),

    /// Plain field getter
    Field(fn(&S) -> u32),

    /// Register is decoded but has no storage, reads as zero
    None,
}

/// How a register is written
pub enum WriteAccess<S> {
    /// Dedicated write function
    Hook(fn(&mut S, u32)),

    /// Plain field setter, optionally followed by a side effect on
    /// another subsystem once the field has been stored
    Field {
        set: fn(&mut S, u32),
        then: Option<fn(&mut S)>,
    },

    /// Register is decoded but writes are dropped
    None,
}

/// A single register in a subsystem's address map
pub struct RegisterDescriptor<S> {
    /// Absolute MMIO address
    pub address: u32,

    /// Diagnostic name, used in trace logging only
    pub friendly_name: Option<&'static str>,

    /// Read behavior
    pub read: ReadAccess<S>,

    /// Write behavior
    pub write: WriteAccess<S>,
}

impl<S> RegisterDescriptor<S> {
    /// Register with dedicated read and write hooks
    pub const fn hooked(
        address: u32,
        name: &'static str,
        read: fn(&mut S) -> u32,
        write: fn(&mut S, u32),
    ) -> Self {
        Self {
            address,
            friendly_name: Some(name),
            read: ReadAccess::Hook(read),
            write: WriteAccess::Hook(write),
        }
    }

    /// Register backed by a plain field
    pub const fn field(
        address: u32,
        name: &'static str,
        get: fn(&S) -> u32,
        set: fn(&mut S, u32),
    ) -> Self {
        Self {
            address,
            friendly_name: Some(name),
            read: ReadAccess::Field(get),
            write: WriteAccess::Field { set, then: None },
        }
    }

    /// Register backed by a plain field whose writes also poke a
    /// neighboring subsystem
    pub const fn field_then(
        address: u32,
        name: &'static str,
        get: fn(&S) -> u32,
        set: fn(&mut S, u32),
        then: fn(&mut S),
    ) -> Self {
        Self {
            address,
            friendly_name: Some(name),
            read: ReadAccess::Field(get),
            write: WriteAccess::Field {
                set,
                then: Some(then),
            },
        }
    }

    /// Register the chip decodes but does not store
    pub const fn unbacked(address: u32, name: &'static str) -> Self {
        Self {
            address,
            friendly_name: Some(name),
            read: ReadAccess::None,
            write: WriteAccess::None,
        }
    }

    /// True if reads go through a dedicated hook
    pub fn has_read_hook(&self) -> bool {
        matches!(self.read, ReadAccess::Hook(_))
    }

    /// True if writes go through a dedicated hook
    pub fn has_write_hook(&self) -> bool {
        matches!(self.write, WriteAccess::Hook(_))
    }
}

/// Address map of one subsystem
pub struct RegisterTable<S: 'static> {
    subsystem: &'static str,
    entries: &'static [RegisterDescriptor<S>],
}

impl<S: 'static> RegisterTable<S> {
    /// Create a table over a fixed list of descriptors
    ///
    /// # Arguments
    ///
    /// * `subsystem` - Subsystem name used as log prefix (e.g. "PRAMDAC")
    /// * `entries` - Descriptors, searched in order
    pub const fn new(subsystem: &'static str, entries: &'static [RegisterDescriptor<S>]) -> Self {
        Self { subsystem, entries }
    }

    /// Subsystem name
    pub fn subsystem(&self) -> &'static str {
        self.subsystem
    }

    /// Number of registers in the table
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the table has no registers
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Find the first descriptor for `address`
    pub fn lookup(&self, address: u32) -> Option<&'static RegisterDescriptor<S>> {
        self.entries.iter().find(|reg| reg.address == address)
    }

    /// Read a register
    ///
    /// # Returns
    ///
    /// The hook or field value, or 0 for unbacked and unknown registers
    pub fn read(&self, state: &mut S, address: u32) -> u32 {
        let Some(reg) = self.lookup(address) else {
            log::warn!(
                "{}: Unknown register read (address=0x{:08X}), returning 0x00",
                self.subsystem,
                address
            );
            return 0;
        };

        let value = match reg.read {
            ReadAccess::Hook(hook) => hook(state),
            ReadAccess::Field(get) => get(state),
            ReadAccess::None => 0,
        };

        log::trace!(
            "{} read 0x{:08X} -> 0x{:08X} ({})",
            self.subsystem,
            address,
            value,
            reg.friendly_name.unwrap_or("unnamed")
        );

        value
    }

    /// Write a register
    ///
    /// Unknown registers are ignored.
    pub fn write(&self, state: &mut S, address: u32, value: u32) {
        let Some(reg) = self.lookup(address) else {
            log::warn!(
                "{}: Unknown register write (address=0x{:08X}, value=0x{:08X})",
                self.subsystem,
                address,
                value
            );
            return;
        };

        log::trace!(
            "{} write 0x{:08X} <- 0x{:08X} ({})",
            self.subsystem,
            address,
            value,
            reg.friendly_name.unwrap_or("unnamed")
        );

        match reg.write {
            WriteAccess::Hook(hook) => hook(state, value),
            WriteAccess::Field { set, then } => {
                set(state, value);
                if let Some(side_effect) = then {
                    side_effect(state);
                }
            }
            WriteAccess::None => {}
        }
    }
}
