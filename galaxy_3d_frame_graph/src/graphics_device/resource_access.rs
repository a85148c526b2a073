/// GPU access states used by barriers and graph edges

use std::fmt;
use bitflags::bitflags;

bitflags! {
    /// How a pass touches a resource.
    ///
    /// A barrier transitions a resource (or one subresource) from one set of
    /// access flags to another. `DISCARD` marks memory whose previous contents
    /// are not preserved (aliasing barrier).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ResourceAccessFlags: u32 {
        const PRESENT = 1 << 0;
        const RENDER_TARGET = 1 << 1;
        const DEPTH_STENCIL_STORAGE = 1 << 2;
        const DEPTH_STENCIL_READ = 1 << 3;
        const VERTEX_SHADER_READ = 1 << 4;
        const PIXEL_SHADER_READ = 1 << 5;
        const COMPUTE_SHADER_READ = 1 << 6;
        const VERTEX_SHADER_STORAGE = 1 << 7;
        const PIXEL_SHADER_STORAGE = 1 << 8;
        const COMPUTE_SHADER_STORAGE = 1 << 9;
        const STORAGE_CLEAR = 1 << 10;
        const TRANSFER_DST = 1 << 11;
        const TRANSFER_SRC = 1 << 12;
        const SHADING_RATE = 1 << 13;
        const INDEX_BUFFER = 1 << 14;
        const INDIRECT_ARGS = 1 << 15;
        const ACCELERATION_STRUCTURE_READ = 1 << 16;
        const ACCELERATION_STRUCTURE_STORAGE = 1 << 17;
        const DISCARD = 1 << 18;

        // Composites (declared last so Display prefers single bits)
        const MASK_SHADER_VS = Self::VERTEX_SHADER_READ.bits() | Self::VERTEX_SHADER_STORAGE.bits();
        const MASK_SHADER_PS = Self::PIXEL_SHADER_READ.bits() | Self::PIXEL_SHADER_STORAGE.bits();
        const MASK_SHADER_CS = Self::COMPUTE_SHADER_READ.bits() | Self::COMPUTE_SHADER_STORAGE.bits();
        const MASK_SHADER_READ = Self::VERTEX_SHADER_READ.bits()
            | Self::PIXEL_SHADER_READ.bits()
            | Self::COMPUTE_SHADER_READ.bits();
        const MASK_SHADER_STORAGE = Self::VERTEX_SHADER_STORAGE.bits()
            | Self::PIXEL_SHADER_STORAGE.bits()
            | Self::COMPUTE_SHADER_STORAGE.bits();
        const MASK_DEPTH_STENCIL_ACCESS = Self::DEPTH_STENCIL_STORAGE.bits() | Self::DEPTH_STENCIL_READ.bits();
        const MASK_TRANSFER_ACCESS = Self::TRANSFER_DST.bits() | Self::TRANSFER_SRC.bits();
        const MASK_ACCELERATION_STRUCTURE_ACCESS = Self::ACCELERATION_STRUCTURE_READ.bits()
            | Self::ACCELERATION_STRUCTURE_STORAGE.bits();
    }
}

impl ResourceAccessFlags {
    /// Accesses a pass may declare through a plain `read`
    pub const READ_MASK: Self = Self::MASK_SHADER_READ
        .union(Self::INDIRECT_ARGS)
        .union(Self::TRANSFER_SRC)
        .union(Self::INDEX_BUFFER)
        .union(Self::SHADING_RATE)
        .union(Self::ACCELERATION_STRUCTURE_READ);

    /// Accesses a pass may declare through a plain `write`
    pub const WRITE_MASK: Self = Self::MASK_SHADER_STORAGE
        .union(Self::STORAGE_CLEAR)
        .union(Self::TRANSFER_DST)
        .union(Self::ACCELERATION_STRUCTURE_STORAGE);
}

impl Default for ResourceAccessFlags {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Display for ResourceAccessFlags {
    /// `PIXEL_SHADER_READ | DISCARD` style, `NONE` when empty
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("NONE");
        }
        bitflags::parser::to_writer(self, f)
    }
}
