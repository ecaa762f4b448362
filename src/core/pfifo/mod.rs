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

//! NV4 PFIFO (command FIFO)
//!
//! PFIFO buffers method submissions before the puller hands them to PGRAPH.
//! Cache0 holds a single entry and is used for software injected methods;
//! cache1 is the main 32-entry command queue.
//!
//! Each entry names a subchannel. The subchannel must be bound to a graphics
//! object (its RAMIN context and state words) before its methods can be
//! dispatched.

use std::collections::VecDeque;

use super::pgraph::{GraphicsObject, Pgraph, RaminContext};
use super::register::{RegisterDescriptor, RegisterTable};

/// PFIFO register addresses
pub mod addr {
    pub const START: u32 = 0x002000;
    pub const END: u32 = 0x003FFF;

    pub const INTR_0: u32 = 0x002100;
    pub const INTR_EN_0: u32 = 0x002140;
    pub const CACHE0_PULL0: u32 = 0x003040;
    pub const CACHE1_PULL0: u32 = 0x003240;
}

/// PFIFO interrupt conditions
pub mod intr {
    /// Cache overflow or method on an unbound subchannel
    pub const CACHE_ERROR: u32 = 1 << 0;
}

/// Puller enable bit of CACHEn_PULL0
const PULL0_ACCESS: u32 = 1 << 0;

/// Cache0 capacity
pub const CACHE0_SIZE: usize = 1;

/// Cache1 capacity
pub const CACHE1_SIZE: usize = 32;

/// Number of subchannels per channel
pub const SUBCHANNEL_COUNT: usize = 8;

static PFIFO_REGISTERS: [RegisterDescriptor<Pfifo>; 4] = [
    RegisterDescriptor::field(
        addr::INTR_0,
        "PFIFO - Interrupt Status",
        |f| f.intr_status,
        |f, v| f.intr_status &= !v,
    ),
    RegisterDescriptor::field(
        addr::INTR_EN_0,
        "PFIFO - Interrupt Enable",
        |f| f.intr_enable,
        |f, v| f.intr_enable = v & intr::CACHE_ERROR,
    ),
    RegisterDescriptor::field(
        addr::CACHE0_PULL0,
        "PFIFO - Cache0 Puller Control",
        |f| f.cache0.puller_enabled as u32,
        |f, v| f.cache0.puller_enabled = v & PULL0_ACCESS != 0,
    ),
    RegisterDescriptor::field(
        addr::CACHE1_PULL0,
        "PFIFO - Cache1 Puller Control",
        |f| f.cache1.puller_enabled as u32,
        |f, v| f.cache1.puller_enabled = v & PULL0_ACCESS != 0,
    ),
];

static PFIFO_TABLE: RegisterTable<Pfifo> = RegisterTable::new("PFIFO", &PFIFO_REGISTERS);

/// One queued method submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheEntry {
    pub subchannel: u8,
    pub method: u16,
    pub param: u32,
}

impl CacheEntry {
    pub fn new(subchannel: u8, method: u16, param: u32) -> Self {
        Self {
            subchannel,
            method,
            param,
        }
    }
}

#[derive(Debug)]
struct Cache {
    name: &'static str,
    entries: VecDeque<CacheEntry>,
    capacity: usize,
    puller_enabled: bool,
}

impl Cache {
    fn new(name: &'static str, capacity: usize) -> Self {
        Self {
            name,
            entries: VecDeque::with_capacity(capacity),
            capacity,
            puller_enabled: false,
        }
    }

    fn push(&mut self, entry: CacheEntry) -> bool {
        if self.entries.len() >= self.capacity {
            return false;
        }

        self.entries.push_back(entry);
        true
    }
}

/// Object bound to a subchannel
#[derive(Debug, Clone, Copy)]
struct Binding {
    context: RaminContext,
    object: GraphicsObject,
}

/// NV4 command FIFO
///
/// # Example
///
/// ```
/// use nv4emu::core::pfifo::{addr, CacheEntry, Pfifo};
/// use nv4emu::core::pgraph::{GraphicsObject, Pgraph, RaminContext};
///
/// let mut pfifo = Pfifo::new();
/// let mut pgraph = Pgraph::new();
///
/// pfifo.bind_subchannel(0, RaminContext::from_raw(0x0055_0000), GraphicsObject::default());
/// pfifo.write(addr::CACHE1_PULL0, 1);
/// pfifo.submit_cache1(CacheEntry::new(0, 0x0300, 0xCAFE));
///
/// pfifo.cache1_pull(&mut pgraph);
/// assert_eq!(pfifo.cache1_len(), 0);
/// ```
#[derive(Debug)]
pub struct Pfifo {
    cache0: Cache,
    cache1: Cache,
    subchannels: [Option<Binding>; SUBCHANNEL_COUNT],
    intr_status: u32,
    intr_enable: u32,
}

impl Pfifo {
    /// Create an empty FIFO with both pullers disabled
    pub fn new() -> Self {
        Self {
            cache0: Cache::new("cache0", CACHE0_SIZE),
            cache1: Cache::new("cache1", CACHE1_SIZE),
            subchannels: [None; SUBCHANNEL_COUNT],
            intr_status: 0,
            intr_enable: 0,
        }
    }

    /// Bind a graphics object to a subchannel
    pub fn bind_subchannel(&mut self, subchannel: u8, context: RaminContext, object: GraphicsObject) {
        match self.subchannels.get_mut(subchannel as usize) {
            Some(slot) => {
                log::debug!(
                    "PFIFO: subchannel {} bound to class 0x{:02x}",
                    subchannel,
                    context.class_id
                );
                *slot = Some(Binding { context, object });
            }
            None => {
                log::warn!("PFIFO: bind to invalid subchannel {}", subchannel);
                self.intr_status |= intr::CACHE_ERROR;
            }
        }
    }

    /// Queue an entry in cache0
    ///
    /// Returns `false` (and raises CACHE_ERROR) if the cache is full.
    pub fn submit_cache0(&mut self, entry: CacheEntry) -> bool {
        Self::submit(&mut self.cache0, &mut self.intr_status, entry)
    }

    /// Queue an entry in cache1
    ///
    /// Returns `false` (and raises CACHE_ERROR) if the cache is full.
    pub fn submit_cache1(&mut self, entry: CacheEntry) -> bool {
        Self::submit(&mut self.cache1, &mut self.intr_status, entry)
    }

    fn submit(cache: &mut Cache, intr_status: &mut u32, entry: CacheEntry) -> bool {
        if cache.push(entry) {
            return true;
        }

        log::warn!(
            "PFIFO: {} overflow, dropping method 0x{:04x}",
            cache.name,
            entry.method
        );
        *intr_status |= intr::CACHE_ERROR;
        false
    }

    /// Drain cache0 into PGRAPH if its puller is enabled
    pub fn cache0_pull(&mut self, pgraph: &mut Pgraph) {
        Self::pull(
            &mut self.cache0,
            &self.subchannels,
            &mut self.intr_status,
            pgraph,
        );
    }

    /// Drain cache1 into PGRAPH if its puller is enabled
    pub fn cache1_pull(&mut self, pgraph: &mut Pgraph) {
        Self::pull(
            &mut self.cache1,
            &self.subchannels,
            &mut self.intr_status,
            pgraph,
        );
    }

    fn pull(
        cache: &mut Cache,
        subchannels: &[Option<Binding>; SUBCHANNEL_COUNT],
        intr_status: &mut u32,
        pgraph: &mut Pgraph,
    ) {
        if !cache.puller_enabled {
            return;
        }

        while let Some(entry) = cache.entries.pop_front() {
            let binding = subchannels.get(entry.subchannel as usize).copied().flatten();

            match binding {
                Some(binding) => {
                    pgraph.dispatch(
                        entry.param,
                        entry.method as u32,
                        binding.context,
                        binding.object,
                    );
                }
                None => {
                    log::warn!(
                        "PFIFO: {} method 0x{:04x} on unbound subchannel {}",
                        cache.name,
                        entry.method,
                        entry.subchannel
                    );
                    *intr_status |= intr::CACHE_ERROR;
                }
            }
        }
    }

    pub fn cache0_len(&self) -> usize {
        self.cache0.entries.len()
    }

    pub fn cache1_len(&self) -> usize {
        self.cache1.entries.len()
    }

    /// True if an enabled condition is asserted
    pub fn pending(&self) -> bool {
        self.intr_status & self.intr_enable != 0
    }

    /// Read a PFIFO register
    pub fn read(&mut self, address: u32) -> u32 {
        PFIFO_TABLE.read(self, address)
    }

    /// Write a PFIFO register
    pub fn write(&mut self, address: u32, value: u32) {
        PFIFO_TABLE.write(self, address, value);
    }
}

impl Default for Pfifo {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::core::pgraph::classes::NV4_D3D6_TRIANGLE;

    type Calls = Rc<RefCell<Vec<(u32, u32, u8)>>>;

    fn recording_pgraph(methods: &[u16]) -> (Pgraph, Calls) {
        let calls: Calls = Rc::new(RefCell::new(Vec::new()));
        let mut pgraph = Pgraph::new();

        for &method in methods {
            let calls = Rc::clone(&calls);
            pgraph.dispatcher_mut().register_method(
                NV4_D3D6_TRIANGLE,
                method,
                Box::new(move |param, id, ctx, _obj, _irq| {
                    calls.borrow_mut().push((param, id, ctx.channel));
                }),
            );
        }

        (pgraph, calls)
    }

    fn triangle_context() -> RaminContext {
        RaminContext {
            class_id: NV4_D3D6_TRIANGLE,
            channel: 2,
            ..Default::default()
        }
    }

    #[test]
    fn test_puller_disabled_keeps_entries() {
        let (mut pgraph, calls) = recording_pgraph(&[0x0300]);
        let mut pfifo = Pfifo::new();
        pfifo.bind_subchannel(0, triangle_context(), GraphicsObject::default());

        assert!(pfifo.submit_cache1(CacheEntry::new(0, 0x0300, 1)));
        pfifo.cache1_pull(&mut pgraph);

        assert_eq!(pfifo.cache1_len(), 1);
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn test_cache1_drains_in_order() {
        let (mut pgraph, calls) = recording_pgraph(&[0x0300, 0x0304]);
        let mut pfifo = Pfifo::new();
        pfifo.bind_subchannel(3, triangle_context(), GraphicsObject::default());
        pfifo.write(addr::CACHE1_PULL0, 1);

        pfifo.submit_cache1(CacheEntry::new(3, 0x0300, 10));
        pfifo.submit_cache1(CacheEntry::new(3, 0x0304, 20));
        pfifo.cache1_pull(&mut pgraph);

        assert_eq!(pfifo.cache1_len(), 0);
        assert_eq!(*calls.borrow(), vec![(10, 0x0300, 2), (20, 0x0304, 2)]);
    }

    #[test]
    fn test_cache0_holds_one_entry() {
        let mut pfifo = Pfifo::new();

        assert!(pfifo.submit_cache0(CacheEntry::new(0, 0x0100, 0)));
        assert!(!pfifo.submit_cache0(CacheEntry::new(0, 0x0104, 0)));

        assert_eq!(pfifo.cache0_len(), 1);
        assert_eq!(pfifo.read(addr::INTR_0), intr::CACHE_ERROR);
    }

    #[test]
    fn test_cache1_overflow() {
        let mut pfifo = Pfifo::new();

        for i in 0..CACHE1_SIZE {
            assert!(pfifo.submit_cache1(CacheEntry::new(0, 0x0300, i as u32)));
        }
        assert_eq!(pfifo.read(addr::INTR_0), 0);

        assert!(!pfifo.submit_cache1(CacheEntry::new(0, 0x0300, 99)));
        assert_eq!(pfifo.cache1_len(), CACHE1_SIZE);
        assert_eq!(pfifo.read(addr::INTR_0), intr::CACHE_ERROR);
    }

    #[test]
    fn test_unbound_subchannel_raises_cache_error() {
        let (mut pgraph, calls) = recording_pgraph(&[0x0300]);
        let mut pfifo = Pfifo::new();
        pfifo.write(addr::CACHE0_PULL0, 1);

        pfifo.submit_cache0(CacheEntry::new(5, 0x0300, 1));
        pfifo.cache0_pull(&mut pgraph);

        assert_eq!(pfifo.cache0_len(), 0);
        assert!(calls.borrow().is_empty());
        assert_eq!(pfifo.read(addr::INTR_0), intr::CACHE_ERROR);
    }

    #[test]
    fn test_unknown_method_reaches_pgraph_default() {
        let (mut pgraph, _calls) = recording_pgraph(&[]);
        let mut pfifo = Pfifo::new();
        pfifo.bind_subchannel(0, triangle_context(), GraphicsObject::default());
        pfifo.write(addr::CACHE0_PULL0, 1);

        pfifo.submit_cache0(CacheEntry::new(0, 0x0ABC, 0));
        pfifo.cache0_pull(&mut pgraph);

        assert_eq!(
            pgraph.interrupts().status(),
            crate::core::pgraph::intr::SOFTWARE_METHOD_PENDING
        );
        assert_eq!(pfifo.read(addr::INTR_0), 0);
    }

    #[test]
    fn test_invalid_subchannel_bind() {
        let mut pfifo = Pfifo::new();
        pfifo.bind_subchannel(8, triangle_context(), GraphicsObject::default());
        assert_eq!(pfifo.read(addr::INTR_0), intr::CACHE_ERROR);
    }

    #[test]
    fn test_interrupt_registers() {
        let mut pfifo = Pfifo::new();
        pfifo.submit_cache0(CacheEntry::new(0, 0, 0));
        pfifo.submit_cache0(CacheEntry::new(0, 0, 0));
        assert!(!pfifo.pending());

        pfifo.write(addr::INTR_EN_0, intr::CACHE_ERROR);
        assert!(pfifo.pending());

        pfifo.write(addr::INTR_0, intr::CACHE_ERROR);
        assert!(!pfifo.pending());
        assert_eq!(pfifo.read(addr::CACHE0_PULL0), 0);

        pfifo.write(addr::CACHE0_PULL0, 0xFFFF_FFFF);
        assert_eq!(pfifo.read(addr::CACHE0_PULL0), 1);
    }
}
