/// CommandBuffer - Vulkan implementation of CommandBuffer and CommandBufferAllocator

use flint_engine::flint::{Error, Result};
use flint_engine::flint::device::{
    ClearValue, CommandBuffer as EngineCommandBuffer, CommandBufferAllocator as EngineCommandBufferAllocator,
    Framebuffer as EngineFramebuffer, Image as EngineImage, Rect2D, RenderPass as EngineRenderPass, Viewport,
};
use flint_engine::{engine_err, engine_error};
use ash::vk;
use std::any::Any;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;
use crate::vulkan_format::attachment_layout;
use crate::vulkan_frame_buffer::Framebuffer;
use crate::vulkan_image::Image;
use crate::vulkan_render_pass::RenderPass;

const SOURCE: &str = "flint::vulkan::CommandBuffer";

/// Command pool shared by the buffers it allocated
///
/// Destroyed once the allocator and every buffer are gone.
pub(crate) struct CommandPool {
    pool: vk::CommandPool,
    ctx: Arc<GpuContext>,
}

impl Drop for CommandPool {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_command_pool(self.pool, None);
        }
    }
}

/// Allocates the primary command buffers of one pipeline
pub struct CommandBufferAllocator {
    pool: Arc<CommandPool>,
    buffer_count: u32,
}

impl CommandBufferAllocator {
    pub(crate) fn new(ctx: Arc<GpuContext>, buffer_count: u32) -> Result<Self> {
        if buffer_count == 0 {
            engine_error!(SOURCE, "Command buffer allocator needs at least one buffer");
            return Err(Error::InvalidArgument("buffer_count must be > 0".to_string()));
        }

        let create_info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(ctx.graphics_queue_family)
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);

        let pool = unsafe { ctx.device.create_command_pool(&create_info, None) }
            .map_err(|e| engine_err!(SOURCE, "Failed to create command pool: {:?}", e))?;

        Ok(Self {
            pool: Arc::new(CommandPool { pool, ctx }),
            buffer_count,
        })
    }
}

impl EngineCommandBufferAllocator for CommandBufferAllocator {
    fn buffer_count(&self) -> u32 {
        self.buffer_count
    }

    fn create_command_buffers(&self) -> Result<Vec<Box<dyn EngineCommandBuffer>>> {
        let allocate_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(self.pool.pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(self.buffer_count);

        let buffers = unsafe { self.pool.ctx.device.allocate_command_buffers(&allocate_info) }
            .map_err(|e| engine_err!(SOURCE, "Failed to allocate {} command buffers: {:?}", self.buffer_count, e))?;

        Ok(buffers
            .into_iter()
            .map(|command_buffer| {
                Box::new(CommandBuffer {
                    command_buffer,
                    is_recording: false,
                    in_render_pass: false,
                    pass_attachments: Vec::new(),
                    secondary_commands: Vec::new(),
                    pool: Arc::clone(&self.pool),
                }) as Box<dyn EngineCommandBuffer>
            })
            .collect())
    }
}

/// Vulkan primary command buffer
///
/// Records the work of one frame-in-flight slot. Image layouts are tracked on
/// the images themselves as commands are recorded.
pub struct CommandBuffer {
    command_buffer: vk::CommandBuffer,
    is_recording: bool,
    in_render_pass: bool,
    /// Owned attachments of the render pass being recorded
    pass_attachments: Vec<Arc<dyn EngineImage>>,
    /// Secondary buffers executed by `execute_secondary_commands()`
    secondary_commands: Vec<vk::CommandBuffer>,
    pool: Arc<CommandPool>,
}

impl CommandBuffer {
    /// Get the underlying Vulkan command buffer
    pub fn command_buffer(&self) -> vk::CommandBuffer {
        self.command_buffer
    }

    /// Queue secondary command buffers for the next `execute_secondary_commands()`
    pub fn push_secondary_commands(&mut self, buffers: &[vk::CommandBuffer]) {
        self.secondary_commands.extend_from_slice(buffers);
    }

    fn device(&self) -> &ash::Device {
        &self.pool.ctx.device
    }

    pub(crate) fn require_recording(&self, operation: &str) -> Result<()> {
        if !self.is_recording {
            engine_error!(SOURCE, "{}: command buffer is not recording", operation);
            return Err(Error::InvalidOperation(format!("{}: command buffer is not recording", operation)));
        }
        Ok(())
    }

    pub(crate) fn require_outside_render_pass(&self, operation: &str) -> Result<()> {
        self.require_recording(operation)?;
        if self.in_render_pass {
            engine_error!(SOURCE, "{}: not allowed inside a render pass", operation);
            return Err(Error::InvalidOperation(format!("{}: not allowed inside a render pass", operation)));
        }
        Ok(())
    }

    fn as_vk_image<'a>(image: &'a dyn EngineImage, operation: &str) -> Result<&'a Image> {
        image.as_any().downcast_ref::<Image>().ok_or_else(|| {
            engine_error!(SOURCE, "{}: '{}' is not a Vulkan image", operation, image.desc().name);
            Error::InvalidResource(format!("'{}' is not a Vulkan image", image.desc().name))
        })
    }
}

fn full_layers(aspect: vk::ImageAspectFlags) -> vk::ImageSubresourceLayers {
    vk::ImageSubresourceLayers {
        aspect_mask: aspect,
        mip_level: 0,
        base_array_layer: 0,
        layer_count: 1,
    }
}

impl EngineCommandBuffer for CommandBuffer {
    fn begin(&mut self) -> Result<()> {
        if self.is_recording {
            engine_error!(SOURCE, "begin: command buffer is already recording");
            return Err(Error::InvalidOperation("command buffer is already recording".to_string()));
        }

        unsafe {
            self.device()
                .reset_command_buffer(self.command_buffer, vk::CommandBufferResetFlags::empty())
                .map_err(|e| engine_err!(SOURCE, "Failed to reset command buffer: {:?}", e))?;

            let begin_info = vk::CommandBufferBeginInfo::default()
                .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);

            self.device()
                .begin_command_buffer(self.command_buffer, &begin_info)
                .map_err(|e| engine_err!(SOURCE, "Failed to begin command buffer: {:?}", e))?;
        }

        self.is_recording = true;
        self.in_render_pass = false;
        self.pass_attachments.clear();
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        self.require_outside_render_pass("end")?;

        unsafe { self.device().end_command_buffer(self.command_buffer) }
            .map_err(|e| engine_err!(SOURCE, "Failed to end command buffer: {:?}", e))?;

        self.is_recording = false;
        Ok(())
    }

    fn is_recording(&self) -> bool {
        self.is_recording
    }

    fn begin_render_pass(
        &mut self,
        render_pass: &Arc<dyn EngineRenderPass>,
        framebuffer: &Arc<dyn EngineFramebuffer>,
        clear_values: &[ClearValue],
    ) -> Result<()> {
        self.require_outside_render_pass("begin_render_pass")?;

        let vk_render_pass = render_pass.as_any().downcast_ref::<RenderPass>().ok_or_else(|| {
            engine_error!(SOURCE, "begin_render_pass: render pass is not a Vulkan render pass");
            Error::InvalidResource("render pass is not a Vulkan render pass".to_string())
        })?;
        let vk_framebuffer = framebuffer.as_any().downcast_ref::<Framebuffer>().ok_or_else(|| {
            engine_error!(SOURCE, "begin_render_pass: framebuffer is not a Vulkan framebuffer");
            Error::InvalidResource("framebuffer is not a Vulkan framebuffer".to_string())
        })?;

        let vk_clear_values: Vec<vk::ClearValue> = clear_values
            .iter()
            .map(|cv| match cv {
                ClearValue::Color(color) => vk::ClearValue {
                    color: vk::ClearColorValue {
                        float32: color.to_array(),
                    },
                },
                ClearValue::DepthStencil { depth, stencil } => vk::ClearValue {
                    depth_stencil: vk::ClearDepthStencilValue {
                        depth: *depth,
                        stencil: *stencil,
                    },
                },
            })
            .collect();

        let extent = framebuffer.extent();
        let render_pass_info = vk::RenderPassBeginInfo::default()
            .render_pass(vk_render_pass.render_pass)
            .framebuffer(vk_framebuffer.framebuffer)
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent: vk::Extent2D { width: extent.width, height: extent.height },
            })
            .clear_values(&vk_clear_values);

        unsafe {
            self.device().cmd_begin_render_pass(
                self.command_buffer,
                &render_pass_info,
                vk::SubpassContents::INLINE,
            );
        }

        self.pass_attachments = vk_framebuffer.attachments.clone();
        self.in_render_pass = true;
        Ok(())
    }

    fn end_render_pass(&mut self) -> Result<()> {
        self.require_recording("end_render_pass")?;
        if !self.in_render_pass {
            engine_error!(SOURCE, "end_render_pass: no render pass in progress");
            return Err(Error::InvalidOperation("no render pass in progress".to_string()));
        }

        unsafe {
            self.device().cmd_end_render_pass(self.command_buffer);
        }

        // The render pass left every owned attachment in its attachment-optimal layout
        for image in self.pass_attachments.drain(..) {
            if let Some(vk_image) = image.as_any().downcast_ref::<Image>() {
                vk_image.set_layout(attachment_layout(image.desc().format));
            }
        }
        self.in_render_pass = false;
        Ok(())
    }

    fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        self.require_recording("set_viewport")?;

        let vk_viewport = vk::Viewport {
            x: viewport.x,
            y: viewport.y,
            width: viewport.width,
            height: viewport.height,
            min_depth: viewport.min_depth,
            max_depth: viewport.max_depth,
        };

        unsafe {
            self.device().cmd_set_viewport(self.command_buffer, 0, &[vk_viewport]);
        }
        Ok(())
    }

    fn set_scissor(&mut self, scissor: Rect2D) -> Result<()> {
        self.require_recording("set_scissor")?;

        let vk_scissor = vk::Rect2D {
            offset: vk::Offset2D { x: scissor.x, y: scissor.y },
            extent: vk::Extent2D { width: scissor.width, height: scissor.height },
        };

        unsafe {
            self.device().cmd_set_scissor(self.command_buffer, 0, &[vk_scissor]);
        }
        Ok(())
    }

    fn copy_image(&mut self, src: &dyn EngineImage, dst: &dyn EngineImage) -> Result<()> {
        self.require_outside_render_pass("copy_image")?;

        let vk_src = Self::as_vk_image(src, "copy_image")?;
        let vk_dst = Self::as_vk_image(dst, "copy_image")?;
        let (src_desc, dst_desc) = (src.desc(), dst.desc());

        let same_shape = src_desc.extent == dst_desc.extent && src_desc.format == dst_desc.format;
        let src_samples = src_desc.sample_count.samples();
        let dst_samples = dst_desc.sample_count.samples();

        if dst_samples > 1 || (src_samples > 1 && !same_shape) {
            engine_error!(SOURCE,
                "copy_image: cannot copy '{}' ({} samples) into '{}' ({} samples)",
                src_desc.name, src_samples, dst_desc.name, dst_samples);
            return Err(Error::InvalidArgument(format!(
                "cannot copy '{}' into '{}'", src_desc.name, dst_desc.name
            )));
        }
        if !same_shape && src_desc.format.is_depth() {
            engine_error!(SOURCE, "copy_image: depth image '{}' can only be copied 1:1", src_desc.name);
            return Err(Error::InvalidArgument(format!(
                "depth image '{}' can only be copied 1:1", src_desc.name
            )));
        }

        vk_src.record_transition(
            self.command_buffer,
            vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
            vk::AccessFlags::TRANSFER_READ,
            vk::PipelineStageFlags::TRANSFER,
        );
        vk_dst.record_transition(
            self.command_buffer,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            vk::AccessFlags::TRANSFER_WRITE,
            vk::PipelineStageFlags::TRANSFER,
        );

        let src_layers = full_layers(vk_src.aspect);
        let dst_layers = full_layers(vk_dst.aspect);
        let device = self.device();

        unsafe {
            if src_samples > 1 {
                let region = vk::ImageResolve {
                    src_subresource: src_layers,
                    src_offset: vk::Offset3D::default(),
                    dst_subresource: dst_layers,
                    dst_offset: vk::Offset3D::default(),
                    extent: vk::Extent3D { width: src_desc.extent.width, height: src_desc.extent.height, depth: 1 },
                };
                device.cmd_resolve_image(
                    self.command_buffer,
                    vk_src.image, vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                    vk_dst.image, vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                    &[region],
                );
            } else if same_shape {
                let region = vk::ImageCopy {
                    src_subresource: src_layers,
                    src_offset: vk::Offset3D::default(),
                    dst_subresource: dst_layers,
                    dst_offset: vk::Offset3D::default(),
                    extent: vk::Extent3D { width: src_desc.extent.width, height: src_desc.extent.height, depth: 1 },
                };
                device.cmd_copy_image(
                    self.command_buffer,
                    vk_src.image, vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                    vk_dst.image, vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                    &[region],
                );
            } else {
                let region = vk::ImageBlit {
                    src_subresource: src_layers,
                    src_offsets: [
                        vk::Offset3D { x: 0, y: 0, z: 0 },
                        vk::Offset3D { x: src_desc.extent.width as i32, y: src_desc.extent.height as i32, z: 1 },
                    ],
                    dst_subresource: dst_layers,
                    dst_offsets: [
                        vk::Offset3D { x: 0, y: 0, z: 0 },
                        vk::Offset3D { x: dst_desc.extent.width as i32, y: dst_desc.extent.height as i32, z: 1 },
                    ],
                };
                device.cmd_blit_image(
                    self.command_buffer,
                    vk_src.image, vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                    vk_dst.image, vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                    &[region],
                    vk::Filter::LINEAR,
                );
            }
        }
        Ok(())
    }

    fn execute_secondary_commands(&mut self) -> Result<()> {
        self.require_recording("execute_secondary_commands")?;
        if self.secondary_commands.is_empty() {
            return Ok(());
        }
        unsafe {
            self.device().cmd_execute_commands(self.command_buffer, &self.secondary_commands);
        }
        self.secondary_commands.clear();
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for CommandBuffer {
    fn drop(&mut self) {
        unsafe {
            self.pool.ctx.device.free_command_buffers(self.pool.pool, &[self.command_buffer]);
        }
    }
}
