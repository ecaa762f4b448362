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

//! nv4emu: NVIDIA NV4 (RIVA TNT) device emulation
//!
//! This crate models the clock generation and command path of the NV4:
//! the RAMDAC PLLs that drive the pixel and memory clocks, the timers they
//! program, and the FIFO/graphics engine path that turns submitted methods
//! into handler calls or interrupts.
//!
//! # Example
//!
//! ```
//! use nv4emu::core::config::Nv4Config;
//! use nv4emu::core::device::Nv4Device;
//! use nv4emu::core::pramdac;
//!
//! let mut device = Nv4Device::new(&Nv4Config::default());
//!
//! // Reprogram the memory PLL: M=7, N=100, P=1
//! device.write32(pramdac::addr::CLOCK_MEMORY, 0x0001_6407);
//! device.advance(1.0);
//!
//! let clock = device.pramdac().memory_clock();
//! assert!(clock.frequency > 90_000_000.0);
//! ```
//!
//! # Modules
//!
//! - [`core::register`]: Table-driven register decoding
//! - [`core::pramdac`]: PLL model and clock/timer controller
//! - [`core::rivatimer`]: Recurring host timers
//! - [`core::pgraph`]: Graphics method dispatch
//! - [`core::pfifo`]: Command FIFO caches
//! - [`core::ptimer`]: Programmable nanosecond timer
//! - [`core::interrupt`]: PMC interrupt aggregation
//! - [`core::device`]: Integration and BAR0 routing
//!
//! # Error Handling
//!
//! The emulated hardware never returns errors. Host-side operations such as
//! config loading return [`core::error::Result<T>`], an alias for
//! `Result<T, EmulatorError>`.

pub mod core;

// Re-export commonly used types
pub use core::error::{EmulatorError, Result};
