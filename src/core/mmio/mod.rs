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

//! Memory-mapped register access
//!
//! Every NV4 subsystem exposes its registers through [`IODevice`]. The
//! device routes BAR0 accesses to whichever subsystem claims the address.

mod io_device;

pub use io_device::IODevice;

use std::cell::RefCell;
use std::rc::Rc;
use std::str::FromStr;

use super::error::{EmulatorError, Result};
use super::interrupt::InterruptController;
use super::pfifo::{self, Pfifo};
use super::pgraph::{self, Pgraph};
use super::pramdac::{self, Pramdac};
use super::ptimer::{self, Ptimer};

/// PMC occupies the first page of BAR0
pub const PMC_START: u32 = 0x000000;
pub const PMC_END: u32 = 0x000FFF;

/// Subsystems shared with other owners (e.g. method handlers) are routed
/// through their `RefCell`
impl<T: IODevice> IODevice for Rc<RefCell<T>> {
    fn address_range(&self) -> (u32, u32) {
        self.borrow().address_range()
    }

    fn read_register(&mut self, address: u32) -> u32 {
        self.borrow_mut().read_register(address)
    }

    fn write_register(&mut self, address: u32, value: u32) {
        self.borrow_mut().write_register(address, value);
    }

    fn is_write_one_to_clear(&self, address: u32) -> bool {
        self.borrow().is_write_one_to_clear(address)
    }

    fn name(&self) -> &'static str {
        self.borrow().name()
    }
}

impl IODevice for InterruptController {
    fn address_range(&self) -> (u32, u32) {
        (PMC_START, PMC_END)
    }

    fn read_register(&mut self, address: u32) -> u32 {
        self.read(address)
    }

    fn write_register(&mut self, address: u32, value: u32) {
        self.write(address, value);
    }

    fn name(&self) -> &'static str {
        "PMC"
    }
}

impl IODevice for Pfifo {
    fn address_range(&self) -> (u32, u32) {
        (pfifo::addr::START, pfifo::addr::END)
    }

    fn read_register(&mut self, address: u32) -> u32 {
        self.read(address)
    }

    fn write_register(&mut self, address: u32, value: u32) {
        self.write(address, value);
    }

    fn is_write_one_to_clear(&self, address: u32) -> bool {
        address == pfifo::addr::INTR_0
    }

    fn name(&self) -> &'static str {
        "PFIFO"
    }
}

impl IODevice for Ptimer {
    fn address_range(&self) -> (u32, u32) {
        (ptimer::addr::START, ptimer::addr::END)
    }

    fn read_register(&mut self, address: u32) -> u32 {
        self.read(address)
    }

    fn write_register(&mut self, address: u32, value: u32) {
        self.write(address, value);
    }

    fn is_write_one_to_clear(&self, address: u32) -> bool {
        address == ptimer::addr::INTR_0
    }

    fn name(&self) -> &'static str {
        "PTIMER"
    }
}

impl IODevice for Pgraph {
    fn address_range(&self) -> (u32, u32) {
        (pgraph::addr::START, pgraph::addr::END)
    }

    fn read_register(&mut self, address: u32) -> u32 {
        self.read(address)
    }

    fn write_register(&mut self, address: u32, value: u32) {
        self.write(address, value);
    }

    fn is_write_one_to_clear(&self, address: u32) -> bool {
        address == pgraph::addr::INTR_1
    }

    fn name(&self) -> &'static str {
        "PGRAPH"
    }
}

impl IODevice for Pramdac {
    fn address_range(&self) -> (u32, u32) {
        (pramdac::addr::START, pramdac::addr::END)
    }

    fn read_register(&mut self, address: u32) -> u32 {
        self.read(address)
    }

    fn write_register(&mut self, address: u32, value: u32) {
        self.write(address, value);
    }

    fn name(&self) -> &'static str {
        "PRAMDAC"
    }
}

/// One `ADDRESS=VALUE` register write, as given on the command line
///
/// Both numbers accept a `0x` prefix for hexadecimal.
///
/// # Example
///
/// ```
/// use nv4emu::core::mmio::RegisterWrite;
///
/// let write: RegisterWrite = "0x680504=0x16407".parse().unwrap();
/// assert_eq!(write.address, 0x680504);
/// assert_eq!(write.value, 0x16407);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterWrite {
    pub address: u32,
    pub value: u32,
}

impl FromStr for RegisterWrite {
    type Err = EmulatorError;

    fn from_str(s: &str) -> Result<Self> {
        let (address, value) = s
            .split_once('=')
            .ok_or_else(|| EmulatorError::InvalidRegisterWrite(s.to_string()))?;

        Ok(Self {
            address: parse_u32(address.trim())?,
            value: parse_u32(value.trim())?,
        })
    }
}

/// Parse a decimal or `0x`-prefixed hexadecimal number
pub fn parse_u32(input: &str) -> Result<u32> {
    let parsed = match input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
    {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => input.parse(),
    };

    parsed.map_err(|source| EmulatorError::InvalidNumber {
        input: input.to_string(),
        source,
    })
}
