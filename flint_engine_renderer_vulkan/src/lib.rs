/*!
# Flint Engine - Vulkan Backend

Vulkan implementation of the Flint device contracts.

This crate provides a `GraphicsDevice` built on the Ash bindings, with
gpu-allocator for image memory and ash-window/winit for the window surface.
The processing pipeline drives it only through the `flint_engine` traits.

# Example

```no_run
use flint_engine::flint::{Result, device::DeviceConfig, processing::{PipelineConfig, ProcessingPipeline}};
use flint_engine_renderer_vulkan::VulkanGraphicsDevice;
use std::sync::Arc;
use winit::window::Window;

fn build(window: Arc<Window>) -> Result<ProcessingPipeline> {
    let device = Arc::new(VulkanGraphicsDevice::new(window, DeviceConfig::default())?);
    ProcessingPipeline::new(device, PipelineConfig::default())
}
```
*/

mod vulkan;
mod vulkan_context;
mod vulkan_format;
mod vulkan_display;
mod vulkan_swapchain;
mod vulkan_image;
mod vulkan_command_buffer;
mod vulkan_render_pass;
mod vulkan_frame_buffer;
mod vulkan_sync;
#[cfg(feature = "vulkan-validation")]
mod debug;

pub use vulkan::VulkanGraphicsDevice;
pub use vulkan_context::GpuContext;
pub use vulkan_display::Display as VulkanDisplay;
pub use vulkan_swapchain::Swapchain as VulkanSwapchain;
pub use vulkan_image::Image as VulkanImage;
pub use vulkan_command_buffer::{
    CommandBuffer as VulkanCommandBuffer, CommandBufferAllocator as VulkanCommandBufferAllocator,
};
pub use vulkan_render_pass::RenderPass as VulkanRenderPass;
pub use vulkan_frame_buffer::Framebuffer as VulkanFramebuffer;
pub use vulkan_sync::Fence as VulkanFence;

// Re-export debug utilities
#[cfg(feature = "vulkan-validation")]
pub use debug::{get_validation_stats, print_validation_stats_report, ValidationStats};
