/// Frame graph configuration and the explicit context handed to it.
///
/// The render graph and its allocator never reach for a global device or
/// logger: everything they need travels in a `RenderGraphContext`.

use std::sync::{Arc, Mutex};
use crate::graphics_device::GraphicsDevice;
use crate::log::{DefaultLogger, Logger};

/// Tunables of the render graph and its resource allocator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderGraphConfig {
    /// Granule heap sizes are rounded up to (bytes, power of two)
    pub heap_alignment: u64,
    /// Unused pooled resources older than this many frames are destroyed
    pub resource_retention_frames: u64,
    /// Debug name of the async compute queue fence
    pub compute_fence_name: String,
    /// Debug name of the graphics queue fence
    pub graphics_fence_name: String,
}

impl Default for RenderGraphConfig {
    fn default() -> Self {
        Self {
            heap_alignment: 64 * 1024,
            resource_retention_frames: 30,
            compute_fence_name: "RenderGraph::ComputeQueueFence".to_string(),
            graphics_fence_name: "RenderGraph::GraphicsQueueFence".to_string(),
        }
    }
}

/// Device, logging sink and configuration shared by the frame graph objects
#[derive(Clone)]
pub struct RenderGraphContext {
    pub device: Arc<Mutex<dyn GraphicsDevice>>,
    pub logger: Arc<dyn Logger>,
    pub config: RenderGraphConfig,
}

impl RenderGraphContext {
    /// Context logging to the console with the default configuration
    pub fn new(device: Arc<Mutex<dyn GraphicsDevice>>) -> Self {
        Self {
            device,
            logger: Arc::new(DefaultLogger::new()),
            config: RenderGraphConfig::default(),
        }
    }

    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_config(mut self, config: RenderGraphConfig) -> Self {
        self.config = config;
        self
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
