/// Heap trait and heap descriptor

/// Memory pool a heap (or a committed resource) lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MemoryType {
    /// Device local only
    #[default]
    GpuOnly,
    /// Staging memory
    CpuOnly,
    /// Upload memory
    CpuToGpu,
    /// Readback memory
    GpuToCpu,
}

/// Descriptor for creating a heap
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HeapDesc {
    /// Size in bytes
    pub size: u64,
    pub memory_type: MemoryType,
}

/// Raw block of device memory that placed resources are created in
pub trait Heap: Send + Sync {
    fn desc(&self) -> &HeapDesc;

    fn name(&self) -> &str;
}
