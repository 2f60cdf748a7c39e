/// Framebuffer - Vulkan implementation of the Framebuffer trait
///
/// Wraps a VkFramebuffer that groups the owned attachments of a render target
/// and, for screen-bound targets, one swapchain image view.

use flint_engine::flint::{Error, Result};
use flint_engine::flint::device::{Extent2D, Framebuffer as EngineFramebuffer, FramebufferDesc, Image as EngineImage};
use flint_engine::{engine_err, engine_error};
use ash::vk;
use std::any::Any;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;
use crate::vulkan_image::Image;
use crate::vulkan_render_pass::RenderPass;
use crate::vulkan_swapchain::Swapchain;

/// Vulkan framebuffer implementation
///
/// Keeps its owned attachment images alive. Destroyed when dropped.
pub struct Framebuffer {
    pub(crate) framebuffer: vk::Framebuffer,
    extent: Extent2D,
    /// Owned attachments, in render pass order
    pub(crate) attachments: Vec<Arc<dyn EngineImage>>,
    ctx: Arc<GpuContext>,
}

impl Framebuffer {
    pub(crate) fn new(ctx: Arc<GpuContext>, desc: &FramebufferDesc) -> Result<Self> {
        let render_pass = desc.render_pass.as_any().downcast_ref::<RenderPass>().ok_or_else(|| {
            engine_error!("flint::vulkan", "create_framebuffer: render pass is not a Vulkan render pass");
            Error::InvalidResource("render pass is not a Vulkan render pass".to_string())
        })?;

        let expected = render_pass.desc.attachments.len();
        if desc.attachments.len() != expected
            || desc.swapchain_image.is_some() != render_pass.desc.swapchain.is_some()
        {
            engine_error!("flint::vulkan",
                "create_framebuffer: {} attachments (swapchain: {}) do not match the render pass ({} attachments, swapchain: {})",
                desc.attachments.len(), desc.swapchain_image.is_some(),
                expected, render_pass.desc.swapchain.is_some());
            return Err(Error::InvalidArgument(
                "framebuffer attachments do not match the render pass".to_string(),
            ));
        }

        let mut views = Vec::with_capacity(desc.attachments.len() + 1);
        for image in &desc.attachments {
            let vk_image = image.as_any().downcast_ref::<Image>().ok_or_else(|| {
                engine_error!("flint::vulkan", "create_framebuffer: '{}' is not a Vulkan image", image.desc().name);
                Error::InvalidResource(format!("'{}' is not a Vulkan image", image.desc().name))
            })?;
            views.push(vk_image.view);
        }

        if let Some((swapchain, image_index)) = desc.swapchain_image {
            let vk_swapchain = swapchain.as_any().downcast_ref::<Swapchain>().ok_or_else(|| {
                engine_error!("flint::vulkan", "create_framebuffer: swapchain is not a Vulkan swapchain");
                Error::InvalidResource("swapchain is not a Vulkan swapchain".to_string())
            })?;
            views.push(vk_swapchain.image_view(image_index)?);
        }

        let framebuffer_info = vk::FramebufferCreateInfo::default()
            .render_pass(render_pass.render_pass)
            .attachments(&views)
            .width(desc.extent.width)
            .height(desc.extent.height)
            .layers(1);

        let framebuffer = unsafe { ctx.device.create_framebuffer(&framebuffer_info, None) }
            .map_err(|e| engine_err!("flint::vulkan", "Failed to create framebuffer: {:?}", e))?;

        Ok(Self {
            framebuffer,
            extent: desc.extent,
            attachments: desc.attachments.clone(),
            ctx,
        })
    }
}

impl EngineFramebuffer for Framebuffer {
    fn extent(&self) -> Extent2D {
        self.extent
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for Framebuffer {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_framebuffer(self.framebuffer, None);
        }
    }
}
