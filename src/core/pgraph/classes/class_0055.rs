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

//! Class 0x55: Direct3D 6.0 accelerated multitextured triangle
//!
//! No method of this class is emulated yet. Every method the driver sends
//! (texture setup at 0x0308.., vertex data at 0x0400..) takes the default
//! path and raises a software method interrupt. Handlers added here go
//! straight into the dispatcher at power-on.

use super::super::MethodTable;

pub(super) fn methods() -> MethodTable {
    MethodTable::new()
}
