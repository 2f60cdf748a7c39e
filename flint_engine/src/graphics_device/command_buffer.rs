/// CommandBuffer trait - for recording per-frame GPU work
///
/// One primary command buffer exists per frame-in-flight slot. The pipeline
/// begins and ends recording; processing nodes only record into it.

use std::any::Any;
use std::sync::Arc;
use glam::Vec4;
use crate::error::Result;
use crate::graphics_device::{Framebuffer, Image, RenderPass};

/// Command buffer for recording rendering commands
///
/// Commands are recorded and later submitted to the GPU via
/// `GraphicsDevice::submit_graphics_command_buffer()`.
pub trait CommandBuffer: Send {
    /// Begin recording commands
    fn begin(&mut self) -> Result<()>;

    /// End recording commands
    fn end(&mut self) -> Result<()>;

    /// True between `begin()` and `end()`
    fn is_recording(&self) -> bool;

    /// Begin a render pass
    ///
    /// # Arguments
    ///
    /// * `render_pass` - The render pass to begin
    /// * `framebuffer` - The framebuffer containing the attachments
    /// * `clear_values` - Clear values, one per attachment in framebuffer order
    fn begin_render_pass(
        &mut self,
        render_pass: &Arc<dyn RenderPass>,
        framebuffer: &Arc<dyn Framebuffer>,
        clear_values: &[ClearValue],
    ) -> Result<()>;

    /// End the current render pass
    fn end_render_pass(&mut self) -> Result<()>;

    /// Set the viewport
    fn set_viewport(&mut self, viewport: Viewport) -> Result<()>;

    /// Set the scissor rectangle
    fn set_scissor(&mut self, scissor: Rect2D) -> Result<()>;

    /// Copy the whole of `src` into `dst`, scaling if the extents differ
    ///
    /// Must be called outside a render pass.
    fn copy_image(&mut self, src: &dyn Image, dst: &dyn Image) -> Result<()>;

    /// Execute the secondary command buffers queued for this frame, if any
    fn execute_secondary_commands(&mut self) -> Result<()>;

    /// Backend downcasting
    fn as_any(&self) -> &dyn Any;
}

/// Allocates the primary command buffers of a pipeline, one per frame-in-flight slot
pub trait CommandBufferAllocator: Send + Sync {
    /// Number of command buffers this allocator hands out
    fn buffer_count(&self) -> u32;

    /// Create `buffer_count()` primary command buffers
    fn create_command_buffers(&self) -> Result<Vec<Box<dyn CommandBuffer>>>;
}

/// Viewport
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

/// 2D rectangle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect2D {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Clear value for an attachment
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClearValue {
    /// Color clear value (RGBA)
    Color(Vec4),
    /// Depth/stencil clear value
    DepthStencil { depth: f32, stencil: u32 },
}
