/// Graphics device module - the narrow GPU interface the frame graph consumes

// Module declarations
pub mod graphics_device;
pub mod resource_access;
pub mod texture;
pub mod buffer;
pub mod heap;
pub mod fence;
pub mod descriptor;
pub mod command_list;

// Re-export everything from graphics_device.rs
pub use graphics_device::*;

// Re-export from other modules
pub use resource_access::*;
pub use texture::*;
pub use buffer::*;
pub use heap::*;
pub use fence::*;
pub use descriptor::*;
pub use command_list::*;

// Mock graphics device (no GPU required)
#[cfg(any(test, feature = "mock"))]
pub mod mock_graphics_device;
