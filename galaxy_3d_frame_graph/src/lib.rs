/*!
# Galaxy 3D Frame Graph

Per-frame render graph for the Galaxy 3D engine.

Rendering code declares GPU passes and the resources they read and write;
the graph then removes unused work, places transient resources in aliased
heap memory, derives the state-transition barriers and synchronizes an
async compute queue with the graphics queue through timeline fences.

## Architecture

- **GraphicsDevice**: Narrow device interface (textures, buffers, heaps, fences, views)
- **CommandList**: Command recording interface (barriers, render passes, fences)
- **RenderGraph**: Pass/resource declaration, compile and execute
- **RenderGraphBuilder**: Facade handed to each pass's setup callback
- **ResourceAllocator**: Heap aliasing and descriptor caching

Backends implement the device traits; the `mock` feature provides a
recording implementation usable without a GPU.
*/

// Internal modules
mod error;
pub mod log;
pub mod config;
pub mod graphics_device;
pub mod render_graph;

// Main galaxy3d namespace module
pub mod galaxy3d {
    // Error types
    pub use crate::error::{Error, Result};

    // Configuration and explicit context
    pub use crate::config::{RenderGraphConfig, RenderGraphContext};

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{DefaultLogger, LogEntry, LogSeverity, Logger, MemoryLogger, NullLogger};
    }

    // Device interface sub-module
    pub mod device {
        pub use crate::graphics_device::*;
    }

    // Render graph sub-module
    pub mod render_graph {
        pub use crate::render_graph::*;
    }
}

// Re-export math library at crate root
pub use glam;
