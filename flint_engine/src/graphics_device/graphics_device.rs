/// GraphicsDevice trait - the factory and queue a processing pipeline runs on
///
/// The render target layer consumes the device only through this contract.
/// Instance/device bootstrap belongs to the backend.

use std::any::Any;
use std::sync::Arc;
use crate::error::Result;
use crate::graphics_device::{
    CommandBuffer, CommandBufferAllocator, Display, Extent2D, Framebuffer,
    FramebufferDesc, HostSyncPrimitive, Image, ImageDesc, PresentMode,
    RenderPass, RenderPassDesc, Swapchain,
};
use crate::target::{FrameIndex, ImageIndex};

/// Device configuration
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    /// Enable validation/debug layers
    pub enable_validation: bool,
    /// Application name
    pub app_name: String,
    /// Application version (major, minor, patch)
    pub app_version: (u32, u32, u32),
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            enable_validation: cfg!(debug_assertions),
            app_name: "Flint Application".to_string(),
            app_version: (1, 0, 0),
        }
    }
}

/// Presentation half of a graphics submission
///
/// When given, the submission waits on the slot's image-available semaphore
/// and signals the image's render-finished semaphore.
#[derive(Clone, Copy)]
pub struct PresentSync<'a> {
    pub swapchain: &'a dyn Swapchain,
    pub frame_index: FrameIndex,
    pub image_index: ImageIndex,
}

// ============================================================================
// GraphicsDevice trait
// ============================================================================

/// Graphics device
///
/// Central factory for GPU objects and owner of the graphics queue.
/// Implemented by backend-specific devices (e.g., VulkanGraphicsDevice).
pub trait GraphicsDevice: Send + Sync {
    /// Create the display (window surface) presented to by a screen-bound target
    fn create_display(&self, extent: Extent2D, title: &str) -> Result<Arc<dyn Display>>;

    /// Create an image
    fn create_image(&self, desc: &ImageDesc) -> Result<Arc<dyn Image>>;

    /// Create a swapchain on `display`
    ///
    /// # Arguments
    ///
    /// * `display` - Display to present to
    /// * `image_count` - Requested number of presentable images
    /// * `present_mode` - Requested presentation mode
    fn create_swapchain(
        &self,
        display: &Arc<dyn Display>,
        image_count: u32,
        present_mode: PresentMode,
    ) -> Result<Box<dyn Swapchain>>;

    /// Create a render pass
    fn create_render_pass(&self, desc: &RenderPassDesc) -> Result<Arc<dyn RenderPass>>;

    /// Create a framebuffer
    fn create_framebuffer(&self, desc: &FramebufferDesc) -> Result<Arc<dyn Framebuffer>>;

    /// Create the allocator of a pipeline's primary command buffers
    fn create_command_buffer_allocator(&self, buffer_count: u32) -> Result<Box<dyn CommandBufferAllocator>>;

    /// Create a host synchronization primitive in the signaled state
    fn create_host_sync_primitive(&self) -> Result<Box<dyn HostSyncPrimitive>>;

    /// Submit a recorded command buffer to the graphics queue
    ///
    /// `fence` becomes signaled once the GPU completes the submission.
    fn submit_graphics_command_buffer(
        &self,
        command_buffer: &dyn CommandBuffer,
        fence: &dyn HostSyncPrimitive,
        present: Option<PresentSync<'_>>,
    ) -> Result<()>;

    /// Wait for all GPU work to complete
    fn wait_idle(&self) -> Result<()>;

    /// Backend downcasting
    fn as_any(&self) -> &dyn Any;
}
