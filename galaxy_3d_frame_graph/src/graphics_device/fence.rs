/// Timeline fence trait

use crate::error::Result;

/// Monotonic timeline fence shared by CPU and GPU queues
///
/// Command lists signal and wait on fences from the GPU side
/// (`CommandList::signal` / `CommandList::wait`); the methods below are the
/// CPU side of the same primitive.
pub trait Fence: Send + Sync {
    /// Block the calling thread until the fence reaches `value`
    fn wait(&self, value: u64) -> Result<()>;

    /// Set the fence to `value` from the CPU
    fn signal(&self, value: u64) -> Result<()>;

    /// Last value the fence reached
    fn completed_value(&self) -> u64;

    fn name(&self) -> &str;
}
