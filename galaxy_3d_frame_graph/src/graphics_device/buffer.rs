/// Buffer trait and buffer descriptor

use bitflags::bitflags;
use super::{MemoryType, TextureFormat};

bitflags! {
    /// Buffer usage flags
    ///
    /// The view flags (STRUCTURED, FORMATTED, RAW) also select the view type
    /// the render graph creates for the buffer.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct BufferUsage: u32 {
        const STRUCTURED = 1 << 0;
        const FORMATTED = 1 << 1;
        const UNIFORM = 1 << 2;
        const RAW = 1 << 3;
        /// Buffer can be written from shaders
        const STORAGE = 1 << 4;
    }
}

/// Descriptor for creating a buffer
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BufferDesc {
    /// Size in bytes
    pub size: u64,
    /// Element stride in bytes (structured buffers)
    pub stride: u32,
    /// Element format (formatted buffers)
    pub format: TextureFormat,
    pub memory_type: MemoryType,
    pub usage: BufferUsage,
    /// Persistently mapped
    pub mapped: bool,
}

impl Default for BufferDesc {
    fn default() -> Self {
        Self {
            size: 0,
            stride: 0,
            format: TextureFormat::Unknown,
            memory_type: MemoryType::GpuOnly,
            usage: BufferUsage::empty(),
            mapped: false,
        }
    }
}

impl BufferDesc {
    /// Structured buffer of `count` elements of `stride` bytes
    pub fn structured(stride: u32, count: u32, usage: BufferUsage) -> Self {
        Self {
            size: stride as u64 * count as u64,
            stride,
            usage: usage | BufferUsage::STRUCTURED,
            ..Default::default()
        }
    }

    /// Raw (byte address) buffer of `size` bytes
    pub fn raw(size: u64, usage: BufferUsage) -> Self {
        Self {
            size,
            stride: 4,
            usage: usage | BufferUsage::RAW,
            ..Default::default()
        }
    }
}

/// GPU buffer created by a graphics device
pub trait Buffer: Send + Sync {
    /// Creation description
    fn desc(&self) -> &BufferDesc;

    /// Debug name given at creation
    fn name(&self) -> &str;
}
