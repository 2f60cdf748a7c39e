/// Framebuffer trait - groups render target attachments for a render pass
///
/// Screen-bound render targets own one framebuffer per swapchain image and
/// select it by image index. Off-screen render targets own one framebuffer per
/// frame-in-flight slot and select it by frame index. Both sets are rebuilt
/// on recreate.

use std::any::Any;
use std::sync::Arc;
use crate::graphics_device::{Extent2D, Image, RenderPass, Swapchain};
use crate::target::ImageIndex;

/// Framebuffer - groups color and depth/stencil attachments together
///
/// Created via `GraphicsDevice::create_framebuffer()`. Keeps its attachment
/// images alive for as long as it exists.
pub trait Framebuffer: Send + Sync {
    fn extent(&self) -> Extent2D;

    /// Backend downcasting
    fn as_any(&self) -> &dyn Any;
}

/// Descriptor for creating a framebuffer
pub struct FramebufferDesc<'a> {
    /// The render pass this framebuffer is compatible with
    pub render_pass: &'a Arc<dyn RenderPass>,
    /// Owned attachments, in render pass order
    pub attachments: Vec<Arc<dyn Image>>,
    /// Swapchain image appended after the owned attachments
    pub swapchain_image: Option<(&'a dyn Swapchain, ImageIndex)>,
    pub extent: Extent2D,
}
