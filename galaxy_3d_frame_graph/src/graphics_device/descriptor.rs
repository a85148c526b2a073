/// Shader-visible descriptors and view descriptions

use super::TextureFormat;

/// Read-only view type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ShaderResourceViewType {
    #[default]
    Texture2D,
    Texture2DArray,
    Texture3D,
    TextureCube,
    TextureCubeArray,
    StructuredBuffer,
    FormattedBuffer,
    RawBuffer,
    AccelerationStructure,
}

/// Read-write view type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum UnorderedAccessViewType {
    #[default]
    Texture2D,
    Texture2DArray,
    Texture3D,
    StructuredBuffer,
    FormattedBuffer,
    RawBuffer,
}

/// Range of a texture covered by a view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureViewRange {
    pub mip_slice: u32,
    pub array_slice: u32,
    /// `u32::MAX` = every mip from `mip_slice`
    pub mip_levels: u32,
    pub array_size: u32,
    pub plane_slice: u32,
}

impl Default for TextureViewRange {
    fn default() -> Self {
        Self {
            mip_slice: 0,
            array_slice: 0,
            mip_levels: u32::MAX,
            array_size: 1,
            plane_slice: 0,
        }
    }
}

/// Range of a buffer covered by a view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BufferViewRange {
    pub offset: u64,
    pub size: u64,
}

/// What a view addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewRange {
    Texture(TextureViewRange),
    Buffer(BufferViewRange),
}

impl Default for ViewRange {
    fn default() -> Self {
        ViewRange::Texture(TextureViewRange::default())
    }
}

/// Description of a read-only (SRV) view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ShaderResourceViewDesc {
    pub view_type: ShaderResourceViewType,
    pub format: TextureFormat,
    pub range: ViewRange,
}

/// Description of a read-write (UAV) view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UnorderedAccessViewDesc {
    pub view_type: UnorderedAccessViewType,
    pub format: TextureFormat,
    pub range: ViewRange,
}

impl Default for UnorderedAccessViewDesc {
    fn default() -> Self {
        Self {
            view_type: UnorderedAccessViewType::Texture2D,
            format: TextureFormat::Unknown,
            // A UAV always targets exactly one mip
            range: ViewRange::Texture(TextureViewRange { mip_levels: 1, ..Default::default() }),
        }
    }
}

/// Shader-visible descriptor created by a graphics device
pub trait Descriptor: Send + Sync {
    /// Index in the bindless descriptor heap
    fn heap_index(&self) -> u32;
}
