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

//! NV4 PGRAPH front end: object method dispatch
//!
//! Drawing commands reach PGRAPH as `(method, parameter)` pairs addressed to a
//! graphics object. The object's class (taken from its RAMIN context) selects
//! a method table; the method id selects the handler inside it.
//!
//! ```text
//! PFIFO puller ──► dispatch(param, method, context, object)
//!                      │
//!                      ├─ class table has method ──► handler(param, method, context, object)
//!                      │
//!                      └─ otherwise ──► warn + SOFTWARE_METHOD_PENDING
//! ```
//!
//! Unimplemented methods are not fatal: the guest driver sees a software
//! method interrupt, exactly as it would for a method the real chip leaves
//! to software.

pub mod classes;

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use super::register::{RegisterDescriptor, RegisterTable};

/// PGRAPH interrupt conditions (PGRAPH_INTR_1)
pub mod intr {
    /// A method was sent that the hardware does not implement
    pub const SOFTWARE_METHOD_PENDING: u32 = 1 << 0;

    /// A method parameter was out of range
    pub const INVALID_DATA: u32 = 1 << 4;

    /// A notifier was requested while one was outstanding
    pub const DOUBLE_NOTIFY: u32 = 1 << 12;
}

/// PGRAPH register addresses
pub mod addr {
    pub const START: u32 = 0x400000;
    pub const END: u32 = 0x401FFF;

    pub const INTR_1: u32 = 0x400104;
    pub const INTR_EN_1: u32 = 0x400144;
}

/// RAMIN context of a graphics object, as stored in the hash table
///
/// ```text
/// 30-24: Channel
/// 23:    Is rendering object
/// 22-16: Class id
/// 15-0:  RAMIN offset (in 16-byte units)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RaminContext {
    pub ramin_offset: u16,
    pub class_id: u8,
    pub is_rendering: bool,
    pub channel: u8,
}

impl RaminContext {
    /// Decode a raw context word
    ///
    /// # Example
    ///
    /// ```
    /// use nv4emu::core::pgraph::RaminContext;
    ///
    /// let context = RaminContext::from_raw(0x0355_1234);
    /// assert_eq!(context.class_id, 0x55);
    /// assert_eq!(context.channel, 3);
    /// assert_eq!(context.ramin_offset, 0x1234);
    /// ```
    pub fn from_raw(value: u32) -> Self {
        Self {
            ramin_offset: (value & 0xFFFF) as u16,
            class_id: ((value >> 16) & 0x7F) as u8,
            is_rendering: (value >> 23) & 1 != 0,
            channel: ((value >> 24) & 0x7F) as u8,
        }
    }

    /// Encode into a raw context word
    pub fn to_raw(self) -> u32 {
        (self.ramin_offset as u32)
            | (((self.class_id & 0x7F) as u32) << 16)
            | ((self.is_rendering as u32) << 23)
            | (((self.channel & 0x7F) as u32) << 24)
    }
}

/// Per-object graphics state words stored in RAMIN
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct GraphicsObject {
    pub words: [u32; 4],
}

impl GraphicsObject {
    pub fn new(words: [u32; 4]) -> Self {
        Self { words }
    }
}

/// Interrupt condition output of the method dispatcher
pub trait InterruptLine {
    /// Assert a condition bit (level-set, idempotent)
    fn assert_condition(&mut self, condition: u32);
}

/// Handler for one method of one class
///
/// Called with `(param, method_id, context, object, interrupt line)`.
pub type MethodHandler =
    Box<dyn FnMut(u32, u32, RaminContext, GraphicsObject, &mut dyn InterruptLine)>;

/// Methods implemented by one class
#[derive(Default)]
pub struct MethodTable {
    methods: HashMap<u16, MethodHandler>,
}

impl MethodTable {
    /// Create an empty table (every method takes the default path)
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a method handler
    pub fn insert(&mut self, method: u16, handler: MethodHandler) {
        self.methods.insert(method, handler);
    }

    /// Number of implemented methods
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    /// True if no method is implemented
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    fn get_mut(&mut self, method: u16) -> Option<&mut MethodHandler> {
        self.methods.get_mut(&method)
    }
}

impl fmt::Debug for MethodTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut methods: Vec<_> = self.methods.keys().collect();
        methods.sort();
        f.debug_struct("MethodTable")
            .field("methods", &methods)
            .finish()
    }
}

/// Class/method switchboard
#[derive(Debug, Default)]
pub struct MethodDispatcher {
    classes: HashMap<u8, MethodTable>,
}

impl MethodDispatcher {
    /// Dispatcher with the built-in NV4 class tables
    pub fn new() -> Self {
        Self {
            classes: classes::builtin_tables(),
        }
    }

    /// Plug a handler into a class table
    pub fn register_method(&mut self, class_id: u8, method: u16, handler: MethodHandler) {
        self.classes.entry(class_id).or_default().insert(method, handler);
    }

    /// Method table of a class, if the class is known
    pub fn table(&self, class_id: u8) -> Option<&MethodTable> {
        self.classes.get(&class_id)
    }

    /// Route a method to its handler
    ///
    /// Methods without a handler log a warning and raise
    /// [`intr::SOFTWARE_METHOD_PENDING`] on `irq`; nothing else happens.
    pub fn dispatch(
        &mut self,
        param: u32,
        method_id: u32,
        context: RaminContext,
        object: GraphicsObject,
        irq: &mut dyn InterruptLine,
    ) {
        let table = self.classes.get_mut(&context.class_id);
        let handler = match (table, u16::try_from(method_id)) {
            (Some(table), Ok(method)) => table.get_mut(method),
            _ => None,
        };

        match handler {
            Some(handler) => {
                log::trace!(
                    "{}: method 0x{:04X} param 0x{:08X}",
                    classes::class_name(context.class_id),
                    method_id,
                    param
                );
                handler(param, method_id, context, object, irq);
            }
            None => {
                log::warn!(
                    "{}: Invalid or unimplemented method 0x{:04x}",
                    classes::class_name(context.class_id),
                    method_id
                );
                irq.assert_condition(intr::SOFTWARE_METHOD_PENDING);
            }
        }
    }
}

/// PGRAPH interrupt status and enable
#[derive(Debug, Default, Clone, Copy)]
pub struct PgraphInterrupts {
    status: u32,
    enable: u32,
}

impl PgraphInterrupts {
    /// PGRAPH_INTR_1
    pub fn status(&self) -> u32 {
        self.status
    }

    /// PGRAPH_INTR_EN_1
    pub fn enable(&self) -> u32 {
        self.enable
    }

    /// Write-1-to-clear acknowledge
    pub fn acknowledge(&mut self, value: u32) {
        self.status &= !value;
    }

    /// True if an enabled condition is asserted
    pub fn pending(&self) -> bool {
        self.status & self.enable != 0
    }
}

impl InterruptLine for PgraphInterrupts {
    fn assert_condition(&mut self, condition: u32) {
        self.status |= condition;
        log::trace!("PGRAPH interrupt 0x{:08X}, status=0x{:08X}", condition, self.status);
    }
}

static PGRAPH_REGISTERS: [RegisterDescriptor<Pgraph>; 2] = [
    RegisterDescriptor::field(
        addr::INTR_1,
        "PGRAPH - Interrupt Status 1",
        |g| g.interrupts.status,
        |g, v| g.interrupts.acknowledge(v),
    ),
    RegisterDescriptor::field(
        addr::INTR_EN_1,
        "PGRAPH - Interrupt Enable 1",
        |g| g.interrupts.enable,
        |g, v| g.interrupts.enable = v,
    ),
];

static PGRAPH_TABLE: RegisterTable<Pgraph> = RegisterTable::new("PGRAPH", &PGRAPH_REGISTERS);

/// PGRAPH front end
#[derive(Debug)]
pub struct Pgraph {
    dispatcher: MethodDispatcher,
    interrupts: PgraphInterrupts,
}

impl Pgraph {
    /// PGRAPH with the built-in class tables and no interrupts pending
    pub fn new() -> Self {
        Self {
            dispatcher: MethodDispatcher::new(),
            interrupts: PgraphInterrupts::default(),
        }
    }

    /// Submit a method to a graphics object
    pub fn dispatch(&mut self, param: u32, method_id: u32, context: RaminContext, object: GraphicsObject) {
        self.dispatcher
            .dispatch(param, method_id, context, object, &mut self.interrupts);
    }

    /// Method dispatcher
    pub fn dispatcher_mut(&mut self) -> &mut MethodDispatcher {
        &mut self.dispatcher
    }

    /// Interrupt status and enable
    pub fn interrupts(&self) -> PgraphInterrupts {
        self.interrupts
    }

    /// Read a PGRAPH register
    pub fn read(&mut self, address: u32) -> u32 {
        PGRAPH_TABLE.read(self, address)
    }

    /// Write a PGRAPH register
    pub fn write(&mut self, address: u32, value: u32) {
        PGRAPH_TABLE.write(self, address, value);
    }
}

impl Default for Pgraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Interrupt line that counts assertions
    #[derive(Default)]
    struct CountingLine {
        asserts: Vec<u32>,
    }

    impl InterruptLine for CountingLine {
        fn assert_condition(&mut self, condition: u32) {
            self.asserts.push(condition);
        }
    }

    type Calls = Rc<RefCell<Vec<(u32, u32, RaminContext, GraphicsObject)>>>;

    fn recording_handler(calls: &Calls) -> MethodHandler {
        let calls = calls.clone();
        Box::new(move |param, method, context, object, _irq| {
            calls.borrow_mut().push((param, method, context, object));
        })
    }

    fn context(class_id: u8) -> RaminContext {
        RaminContext {
            ramin_offset: 0x0120,
            class_id,
            is_rendering: true,
            channel: 2,
        }
    }

    #[test]
    fn test_ramin_context_round_trip() {
        let context = context(0x55);
        assert_eq!(RaminContext::from_raw(context.to_raw()), context);
        assert_eq!(context.to_raw(), 0x02D5_0120);
    }

    #[test]
    fn test_empty_class_raises_software_method() {
        let mut dispatcher = MethodDispatcher::new();
        let mut line = CountingLine::default();

        dispatcher.dispatch(0x1234, 0x0304, context(0x55), GraphicsObject::default(), &mut line);

        assert_eq!(line.asserts, vec![intr::SOFTWARE_METHOD_PENDING]);
    }

    #[test]
    fn test_unknown_class_raises_software_method() {
        let mut dispatcher = MethodDispatcher::new();
        let mut line = CountingLine::default();

        dispatcher.dispatch(0, 0x0100, context(0x7E), GraphicsObject::default(), &mut line);

        assert_eq!(line.asserts.len(), 1);
    }

    #[test]
    fn test_mapped_method_invokes_handler_once() {
        let calls: Calls = Rc::default();
        let mut dispatcher = MethodDispatcher::new();
        dispatcher.register_method(0x55, 0x0300, recording_handler(&calls));

        let mut line = CountingLine::default();
        let object = GraphicsObject::new([1, 2, 3, 4]);

        dispatcher.dispatch(0xCAFE_F00D, 0x0300, context(0x55), object, &mut line);

        assert!(line.asserts.is_empty());
        assert_eq!(
            *calls.borrow(),
            vec![(0xCAFE_F00D, 0x0300, context(0x55), object)]
        );
    }

    #[test]
    fn test_mapped_method_in_other_class_not_used() {
        let calls: Calls = Rc::default();
        let mut dispatcher = MethodDispatcher::new();
        dispatcher.register_method(0x54, 0x0300, recording_handler(&calls));

        let mut line = CountingLine::default();
        dispatcher.dispatch(0, 0x0300, context(0x55), GraphicsObject::default(), &mut line);

        assert!(calls.borrow().is_empty());
        assert_eq!(line.asserts.len(), 1);
    }

    #[test]
    fn test_wide_method_id_takes_default_path() {
        let calls: Calls = Rc::default();
        let mut dispatcher = MethodDispatcher::new();
        dispatcher.register_method(0x55, 0x0300, recording_handler(&calls));

        let mut line = CountingLine::default();
        dispatcher.dispatch(0, 0x1_0300, context(0x55), GraphicsObject::default(), &mut line);

        assert!(calls.borrow().is_empty());
        assert_eq!(line.asserts.len(), 1);
    }

    #[test]
    fn test_handler_can_raise_interrupts() {
        let mut dispatcher = MethodDispatcher::new();
        dispatcher.register_method(
            0x55,
            0x0104,
            Box::new(|_, _, _, _, irq| irq.assert_condition(intr::DOUBLE_NOTIFY)),
        );

        let mut line = CountingLine::default();
        dispatcher.dispatch(0, 0x0104, context(0x55), GraphicsObject::default(), &mut line);

        assert_eq!(line.asserts, vec![intr::DOUBLE_NOTIFY]);
    }

    #[test]
    fn test_software_method_is_level_set() {
        let mut pgraph = Pgraph::new();

        pgraph.dispatch(0, 0x0304, context(0x55), GraphicsObject::default());
        pgraph.dispatch(0, 0x0308, context(0x55), GraphicsObject::default());

        assert_eq!(pgraph.interrupts().status(), intr::SOFTWARE_METHOD_PENDING);
    }

    #[test]
    fn test_interrupt_registers() {
        let mut pgraph = Pgraph::new();
        pgraph.dispatch(0, 0x0304, context(0x55), GraphicsObject::default());

        assert_eq!(pgraph.read(addr::INTR_1), intr::SOFTWARE_METHOD_PENDING);
        assert!(!pgraph.interrupts().pending());

        pgraph.write(addr::INTR_EN_1, intr::SOFTWARE_METHOD_PENDING);
        assert!(pgraph.interrupts().pending());

        // Write 1 to clear
        pgraph.write(addr::INTR_1, intr::SOFTWARE_METHOD_PENDING);
        assert_eq!(pgraph.read(addr::INTR_1), 0);
        assert!(!pgraph.interrupts().pending());
    }

    #[test]
    fn test_acknowledge_preserves_unrelated_bits() {
        let mut interrupts = PgraphInterrupts::default();
        interrupts.assert_condition(intr::SOFTWARE_METHOD_PENDING | intr::INVALID_DATA);

        interrupts.acknowledge(intr::INVALID_DATA);

        assert_eq!(interrupts.status(), intr::SOFTWARE_METHOD_PENDING);
    }

    #[test]
    fn test_table_debug_lists_methods() {
        let mut table = MethodTable::new();
        table.insert(0x0304, Box::new(|_, _, _, _, _| {}));
        table.insert(0x0300, Box::new(|_, _, _, _, _| {}));

        assert_eq!(format!("{:?}", table), "MethodTable { methods: [768, 772] }");
        assert_eq!(table.len(), 2);
    }
}
