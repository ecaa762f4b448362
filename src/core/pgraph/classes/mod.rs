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

//! NV4 graphics object classes
//!
//! Class ids as stored in the RAMIN context of each object, plus the method
//! tables the emulator currently provides. A class without a table behaves
//! like a class with an empty one: every method raises a software method
//! interrupt.

mod class_0055;

use std::collections::HashMap;

use super::MethodTable;

pub const NV1_BETA: u8 = 0x12;
pub const NV1_COLOR_KEY: u8 = 0x17;
pub const NV1_PATTERN: u8 = 0x18;
pub const NV1_CLIP: u8 = 0x19;
pub const NV1_LINE: u8 = 0x1C;
pub const NV1_TRIANGLE: u8 = 0x1D;
pub const NV1_RECTANGLE: u8 = 0x1E;
pub const NV1_IMAGE_BLIT: u8 = 0x1F;
pub const NV1_IMAGE_FROM_CPU: u8 = 0x21;
pub const NV1_NULL: u8 = 0x30;
pub const NV3_STRETCHED_IMAGE_FROM_CPU: u8 = 0x36;
pub const NV3_SCALED_IMAGE_FROM_MEMORY: u8 = 0x37;
pub const NV4_DVD_SUBPICTURE: u8 = 0x38;
pub const NV3_MEMORY_TO_MEMORY_FORMAT: u8 = 0x39;
pub const NV4_SURFACES_2D: u8 = 0x42;
pub const NV3_ROP: u8 = 0x43;
pub const NV4_PATTERN: u8 = 0x44;
pub const NV4_GDI_RECTANGLE_TEXT: u8 = 0x4A;
pub const NV4_SWIZZLED_SURFACE: u8 = 0x52;
pub const NV4_SURFACES_3D: u8 = 0x53;
pub const NV4_D3D5_TRIANGLE: u8 = 0x54;
pub const NV4_D3D6_TRIANGLE: u8 = 0x55;
pub const NV4_COLOR_KEY: u8 = 0x57;
pub const NV4_SOLID_LINE: u8 = 0x5C;
pub const NV4_SOLID_TRIANGLE: u8 = 0x5D;
pub const NV4_SOLID_RECTANGLE: u8 = 0x5E;
pub const NV4_IMAGE_BLIT: u8 = 0x5F;
pub const NV4_INDEXED_IMAGE_FROM_CPU: u8 = 0x60;
pub const NV4_IMAGE_FROM_CPU: u8 = 0x61;
pub const NV4_BETA4: u8 = 0x72;
pub const NV4_STRETCHED_IMAGE_FROM_CPU: u8 = 0x76;
pub const NV4_SCALED_IMAGE_FROM_MEMORY: u8 = 0x77;

/// Human readable class name for diagnostics
pub fn class_name(class_id: u8) -> &'static str {
    match class_id {
        NV1_BETA => "NV4 class 0x12: Beta factor",
        NV1_COLOR_KEY => "NV4 class 0x17: Chroma key",
        NV1_PATTERN => "NV4 class 0x18: Pattern",
        NV1_CLIP => "NV4 class 0x19: Clipping rectangle",
        NV1_LINE => "NV4 class 0x1C: Line",
        NV1_TRIANGLE => "NV4 class 0x1D: Triangle",
        NV1_RECTANGLE => "NV4 class 0x1E: Rectangle",
        NV1_IMAGE_BLIT => "NV4 class 0x1F: Image blit",
        NV1_IMAGE_FROM_CPU => "NV4 class 0x21: Image from CPU",
        NV1_NULL => "NV4 class 0x30: Null",
        NV3_STRETCHED_IMAGE_FROM_CPU => "NV4 class 0x36: Stretched image from CPU",
        NV3_SCALED_IMAGE_FROM_MEMORY => "NV4 class 0x37: Scaled image from memory",
        NV4_DVD_SUBPICTURE => "NV4 class 0x38: DVD subpicture",
        NV3_MEMORY_TO_MEMORY_FORMAT => "NV4 class 0x39: Memory to memory format",
        NV4_SURFACES_2D => "NV4 class 0x42: 2D surfaces",
        NV3_ROP => "NV4 class 0x43: Raster operation",
        NV4_PATTERN => "NV4 class 0x44: Pattern",
        NV4_GDI_RECTANGLE_TEXT => "NV4 class 0x4A: GDI rectangle text",
        NV4_SWIZZLED_SURFACE => "NV4 class 0x52: Swizzled surface",
        NV4_SURFACES_3D => "NV4 class 0x53: 3D surfaces",
        NV4_D3D5_TRIANGLE => "NV4 class 0x54: Direct3D 5.0 accelerated textured triangle",
        NV4_D3D6_TRIANGLE => "NV4 class 0x55: Direct3D 6.0 accelerated multitextured triangle",
        NV4_COLOR_KEY => "NV4 class 0x57: Color key",
        NV4_SOLID_LINE => "NV4 class 0x5C: Solid line",
        NV4_SOLID_TRIANGLE => "NV4 class 0x5D: Solid triangle",
        NV4_SOLID_RECTANGLE => "NV4 class 0x5E: Solid rectangle",
        NV4_IMAGE_BLIT => "NV4 class 0x5F: Image blit",
        NV4_INDEXED_IMAGE_FROM_CPU => "NV4 class 0x60: Indexed image from CPU",
        NV4_IMAGE_FROM_CPU => "NV4 class 0x61: Image from CPU",
        NV4_BETA4 => "NV4 class 0x72: Beta factor (4 component)",
        NV4_STRETCHED_IMAGE_FROM_CPU => "NV4 class 0x76: Stretched image from CPU",
        NV4_SCALED_IMAGE_FROM_MEMORY => "NV4 class 0x77: Scaled image from memory",
        _ => "NV4: Unknown class",
    }
}

/// Method tables installed at power-on
pub fn builtin_tables() -> HashMap<u8, MethodTable> {
    let mut tables = HashMap::new();
    tables.insert(NV4_D3D6_TRIANGLE, class_0055::methods());
    tables
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_names() {
        assert_eq!(
            class_name(NV4_D3D6_TRIANGLE),
            "NV4 class 0x55: Direct3D 6.0 accelerated multitextured triangle"
        );
        assert_eq!(class_name(0x7F), "NV4: Unknown class");
    }

    #[test]
    fn test_builtin_tables() {
        let tables = builtin_tables();
        assert!(tables.contains_key(&NV4_D3D6_TRIANGLE));
        assert!(tables[&NV4_D3D6_TRIANGLE].is_empty());
    }
}
