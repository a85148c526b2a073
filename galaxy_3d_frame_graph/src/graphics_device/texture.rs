/// Texture trait, texture descriptor and subresource helpers

use bitflags::bitflags;
use super::MemoryType;

/// Wildcard subresource (every mip of every slice)
///
/// Accepted by barriers on the device side; the render graph rejects it on
/// declared reads and writes.
pub const ALL_SUB_RESOURCE: u32 = u32::MAX;

/// Texel format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[allow(non_camel_case_types)]
pub enum TextureFormat {
    #[default]
    Unknown,

    // Color formats
    R8_UNORM,
    R8G8B8A8_UNORM,
    R8G8B8A8_SRGB,
    B8G8R8A8_UNORM,
    B8G8R8A8_SRGB,
    R16G16_SFLOAT,
    R16G16B16A16_SFLOAT,
    R11G11B10_UFLOAT,
    R32_UINT,
    R32_SFLOAT,
    R32G32B32A32_SFLOAT,

    // Depth/stencil formats
    D16_UNORM,
    D32_SFLOAT,
    D24_UNORM_S8_UINT,
    D32_SFLOAT_S8_UINT,
}

impl TextureFormat {
    /// True for formats usable as depth attachment
    pub fn is_depth(self) -> bool {
        matches!(
            self,
            TextureFormat::D16_UNORM
                | TextureFormat::D32_SFLOAT
                | TextureFormat::D24_UNORM_S8_UINT
                | TextureFormat::D32_SFLOAT_S8_UINT
        )
    }

    /// True for depth formats carrying a stencil aspect
    pub fn has_stencil(self) -> bool {
        matches!(self, TextureFormat::D24_UNORM_S8_UINT | TextureFormat::D32_SFLOAT_S8_UINT)
    }

    /// Size of one texel in bytes (0 for Unknown)
    pub fn bytes_per_texel(self) -> u32 {
        match self {
            TextureFormat::Unknown => 0,
            TextureFormat::R8_UNORM => 1,
            TextureFormat::D16_UNORM => 2,
            TextureFormat::R8G8B8A8_UNORM
            | TextureFormat::R8G8B8A8_SRGB
            | TextureFormat::B8G8R8A8_UNORM
            | TextureFormat::B8G8R8A8_SRGB
            | TextureFormat::R16G16_SFLOAT
            | TextureFormat::R11G11B10_UFLOAT
            | TextureFormat::R32_UINT
            | TextureFormat::R32_SFLOAT
            | TextureFormat::D32_SFLOAT
            | TextureFormat::D24_UNORM_S8_UINT => 4,
            TextureFormat::R16G16B16A16_SFLOAT | TextureFormat::D32_SFLOAT_S8_UINT => 8,
            TextureFormat::R32G32B32A32_SFLOAT => 16,
        }
    }
}

/// Texture dimensionality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureType {
    Texture1D,
    #[default]
    Texture2D,
    Texture2DArray,
    Texture3D,
    TextureCube,
    TextureCubeArray,
}

bitflags! {
    /// Texture usage flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TextureUsage: u32 {
        /// Texture can be bound as color attachment
        const RENDER_TARGET = 1 << 0;
        /// Texture can be bound as depth/stencil attachment
        const DEPTH_STENCIL = 1 << 1;
        /// Texture can be written from shaders (UAV / storage image)
        const SHADER_STORAGE = 1 << 2;
        /// Texture can be shared across devices/processes
        const SHARED = 1 << 3;
    }
}

/// Descriptor for creating a texture
///
/// Heap placement is not part of the description: two descriptions compare
/// equal whatever heap backs the textures created from them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TextureDesc {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub mip_levels: u32,
    pub array_size: u32,
    pub format: TextureFormat,
    pub texture_type: TextureType,
    pub usage: TextureUsage,
    pub memory_type: MemoryType,
}

impl Default for TextureDesc {
    fn default() -> Self {
        Self {
            width: 1,
            height: 1,
            depth: 1,
            mip_levels: 1,
            array_size: 1,
            format: TextureFormat::Unknown,
            texture_type: TextureType::Texture2D,
            usage: TextureUsage::empty(),
            memory_type: MemoryType::GpuOnly,
        }
    }
}

impl TextureDesc {
    /// Single-mip 2D texture in GPU-only memory
    pub fn texture_2d(width: u32, height: u32, format: TextureFormat, usage: TextureUsage) -> Self {
        Self {
            width,
            height,
            format,
            usage,
            ..Default::default()
        }
    }

    /// Number of addressable subresources (mips x slices)
    pub fn subresource_count(&self) -> u32 {
        self.mip_levels * self.array_size
    }
}

/// Linear subresource index of (mip, slice)
pub fn calc_subresource(desc: &TextureDesc, mip: u32, slice: u32) -> u32 {
    mip + desc.mip_levels * slice
}

/// Split a linear subresource index into (mip, slice)
pub fn decompose_subresource(desc: &TextureDesc, subresource: u32) -> (u32, u32) {
    let mip = subresource % desc.mip_levels;
    let slice = (subresource / desc.mip_levels) % desc.array_size;
    (mip, slice)
}

/// GPU texture created by a graphics device
pub trait Texture: Send + Sync {
    /// Creation description
    fn desc(&self) -> &TextureDesc;

    /// Debug name given at creation
    fn name(&self) -> &str;
}

#[cfg(test)]
#[path = "texture_tests.rs"]
mod tests;
