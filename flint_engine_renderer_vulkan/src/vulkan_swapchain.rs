/// Swapchain - Vulkan implementation of the Swapchain trait
///
/// Owns the presentable images and the presentation semaphores: one
/// image-available semaphore per frame-in-flight slot and one render-finished
/// semaphore per swapchain image.

use flint_engine::flint::{Error, Result};
use flint_engine::flint::device::{
    AcquireOutcome, CommandBuffer as EngineCommandBuffer, Display as EngineDisplay, Extent2D,
    Image as EngineImage,
    ImageFormat, PresentMode, PresentOutcome, Swapchain as EngineSwapchain,
};
use flint_engine::flint::target::{FrameIndex, ImageIndex};
use flint_engine::{engine_debug, engine_err, engine_error, engine_info, engine_warn};
use ash::vk;
use std::any::Any;
use std::sync::Arc;

use crate::vulkan_command_buffer::CommandBuffer;
use crate::vulkan_context::GpuContext;
use crate::vulkan_display::Display;
use crate::vulkan_format::{choose_extent, clamp_image_count, extent_from_vk, format_from_vk, present_mode_to_vk};
use crate::vulkan_image::Image;

const SOURCE: &str = "flint::vulkan::Swapchain";

/// Stage at which a submission waits on its image-available semaphore
pub(crate) const ACQUIRE_WAIT_STAGE: vk::PipelineStageFlags = vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT;

/// Vulkan swapchain implementation
///
/// Handles image acquisition, presentation, and recreation on resize.
pub struct Swapchain {
    swapchain: vk::SwapchainKHR,
    images: Vec<vk::Image>,
    image_views: Vec<vk::ImageView>,
    surface_format: vk::SurfaceFormatKHR,
    format: ImageFormat,
    extent: vk::Extent2D,
    /// Present mode actually in use (FIFO when the requested one is unsupported)
    present_mode: PresentMode,
    /// Minimum image count asked for; also the number of frame slots
    requested_image_count: u32,

    /// One semaphore per frame in flight (for acquire)
    image_available_semaphores: Vec<vk::Semaphore>,
    /// One semaphore per swapchain image (for present)
    render_finished_semaphores: Vec<vk::Semaphore>,

    display: Arc<Display>,
    ctx: Arc<GpuContext>,
}

impl Swapchain {
    /// Create a new swapchain
    ///
    /// # Arguments
    ///
    /// * `ctx` - Shared GPU context
    /// * `display` - Display whose surface is presented to
    /// * `image_count` - Requested image count, also the number of frames in flight
    /// * `present_mode` - Requested presentation mode
    pub(crate) fn new(
        ctx: Arc<GpuContext>,
        display: Arc<Display>,
        image_count: u32,
        present_mode: PresentMode,
    ) -> Result<Self> {
        if image_count == 0 {
            engine_error!(SOURCE, "Swapchain needs at least one image");
            return Err(Error::InvalidArgument("image_count must be > 0".to_string()));
        }

        let surface_format = display.best_surface_format()?;
        let format = format_from_vk(surface_format.format).ok_or_else(|| {
            engine_error!(SOURCE, "Surface format {:?} has no engine equivalent", surface_format.format);
            Error::InvalidResource(format!("unsupported surface format {:?}", surface_format.format))
        })?;

        let supported_modes = display.surface_present_modes()?;
        let present_mode = if supported_modes.contains(&present_mode_to_vk(present_mode)) {
            present_mode
        } else {
            engine_warn!(SOURCE, "Present mode {:?} is not supported, falling back to Fifo", present_mode);
            PresentMode::Fifo
        };

        let mut swapchain = Self {
            swapchain: vk::SwapchainKHR::null(),
            images: Vec::new(),
            image_views: Vec::new(),
            surface_format,
            format,
            extent: vk::Extent2D::default(),
            present_mode,
            requested_image_count: image_count,
            image_available_semaphores: Vec::new(),
            render_finished_semaphores: Vec::new(),
            display,
            ctx,
        };
        let extent = swapchain.display.extent();
        swapchain.build(extent)?;

        engine_info!(SOURCE, "Created {}x{} swapchain: {} images, {:?}, {:?}",
            swapchain.extent.width, swapchain.extent.height,
            swapchain.images.len(), swapchain.format, swapchain.present_mode);

        Ok(swapchain)
    }

    /// (Re)build the swapchain, its views and its semaphores at `extent`
    ///
    /// The previous swapchain, if any, is handed to Vulkan as `old_swapchain`
    /// and destroyed afterwards.
    fn build(&mut self, extent: Extent2D) -> Result<()> {
        if extent.is_zero() {
            engine_error!(SOURCE, "Cannot build a swapchain with an empty extent ({}x{})", extent.width, extent.height);
            return Err(Error::InvalidArgument("swapchain extent must be non-zero".to_string()));
        }

        let capabilities = self.display.surface_capabilities()?;
        let vk_extent = choose_extent(extent, &capabilities);
        let min_image_count = clamp_image_count(self.requested_image_count, &capabilities);

        let mut usage = vk::ImageUsageFlags::COLOR_ATTACHMENT;
        if capabilities.supported_usage_flags.contains(vk::ImageUsageFlags::TRANSFER_DST) {
            usage |= vk::ImageUsageFlags::TRANSFER_DST;
        }

        let old_swapchain = self.swapchain;
        let create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(self.display.surface)
            .min_image_count(min_image_count)
            .image_format(self.surface_format.format)
            .image_color_space(self.surface_format.color_space)
            .image_extent(vk_extent)
            .image_array_layers(1)
            .image_usage(usage)
            .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            .pre_transform(capabilities.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode_to_vk(self.present_mode))
            .clipped(true)
            .old_swapchain(old_swapchain);

        unsafe {
            let swapchain = self.ctx.swapchain_loader
                .create_swapchain(&create_info, None)
                .map_err(|e| engine_err!(SOURCE, "Failed to create swapchain: {:?}", e))?;

            self.destroy_views_and_semaphores();
            if old_swapchain != vk::SwapchainKHR::null() {
                self.ctx.swapchain_loader.destroy_swapchain(old_swapchain, None);
            }
            self.swapchain = swapchain;
            self.extent = vk_extent;

            self.images = self.ctx.swapchain_loader
                .get_swapchain_images(swapchain)
                .map_err(|e| engine_err!(SOURCE, "Failed to get swapchain images: {:?}", e))?;

            for &image in &self.images {
                let view_info = vk::ImageViewCreateInfo::default()
                    .image(image)
                    .view_type(vk::ImageViewType::TYPE_2D)
                    .format(self.surface_format.format)
                    .components(vk::ComponentMapping {
                        r: vk::ComponentSwizzle::IDENTITY,
                        g: vk::ComponentSwizzle::IDENTITY,
                        b: vk::ComponentSwizzle::IDENTITY,
                        a: vk::ComponentSwizzle::IDENTITY,
                    })
                    .subresource_range(color_range());

                let view = self.ctx.device.create_image_view(&view_info, None)
                    .map_err(|e| engine_err!(SOURCE, "Failed to create swapchain image view: {:?}", e))?;
                self.image_views.push(view);
            }

            // Semaphores are recreated too: a skipped suboptimal acquire leaves
            // an image-available semaphore signaled with no waiter
            let semaphore_info = vk::SemaphoreCreateInfo::default();
            for _ in 0..self.requested_image_count {
                let semaphore = self.ctx.device.create_semaphore(&semaphore_info, None)
                    .map_err(|e| engine_err!(SOURCE, "Failed to create image-available semaphore: {:?}", e))?;
                self.image_available_semaphores.push(semaphore);
            }
            for _ in 0..self.images.len() {
                let semaphore = self.ctx.device.create_semaphore(&semaphore_info, None)
                    .map_err(|e| engine_err!(SOURCE, "Failed to create render-finished semaphore: {:?}", e))?;
                self.render_finished_semaphores.push(semaphore);
            }
        }

        Ok(())
    }

    fn destroy_views_and_semaphores(&mut self) {
        unsafe {
            for semaphore in self.image_available_semaphores.drain(..) {
                self.ctx.device.destroy_semaphore(semaphore, None);
            }
            for semaphore in self.render_finished_semaphores.drain(..) {
                self.ctx.device.destroy_semaphore(semaphore, None);
            }
            for view in self.image_views.drain(..) {
                self.ctx.device.destroy_image_view(view, None);
            }
        }
    }

    /// View of the swapchain image at `image_index`
    pub(crate) fn image_view(&self, image_index: ImageIndex) -> Result<vk::ImageView> {
        self.image_views.get(image_index.as_usize()).copied().ok_or(Error::IndexOutOfRange {
            index: image_index.as_usize(),
            len: self.image_views.len(),
        })
    }

    /// Semaphores of a submission presenting `image_index` from `frame_index`'s slot
    ///
    /// Returns (wait_semaphore, signal_semaphore).
    pub(crate) fn sync_info(&self, frame_index: FrameIndex, image_index: ImageIndex) -> Result<(vk::Semaphore, vk::Semaphore)> {
        let wait = self.image_available_semaphores.get(frame_index.as_usize()).copied().ok_or(Error::IndexOutOfRange {
            index: frame_index.as_usize(),
            len: self.image_available_semaphores.len(),
        })?;
        let signal = self.render_finished_semaphores.get(image_index.as_usize()).copied().ok_or(Error::IndexOutOfRange {
            index: image_index.as_usize(),
            len: self.render_finished_semaphores.len(),
        })?;
        Ok((wait, signal))
    }
}

fn color_range() -> vk::ImageSubresourceRange {
    vk::ImageSubresourceRange {
        aspect_mask: vk::ImageAspectFlags::COLOR,
        base_mip_level: 0,
        level_count: 1,
        base_array_layer: 0,
        layer_count: 1,
    }
}

/// Barrier taking an acquired swapchain image to TRANSFER_DST before the present blit
///
/// Returns `(src_stage, dst_stage, barrier)`. The source stage is the acquire
/// wait stage, so the transfer is ordered after the semaphore wait.
pub(crate) fn acquired_to_transfer_dst(
    image: vk::Image,
) -> (vk::PipelineStageFlags, vk::PipelineStageFlags, vk::ImageMemoryBarrier<'static>) {
    // The whole image is overwritten: its previous content is discarded
    let barrier = vk::ImageMemoryBarrier::default()
        .old_layout(vk::ImageLayout::UNDEFINED)
        .new_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
        .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .image(image)
        .subresource_range(color_range())
        .src_access_mask(vk::AccessFlags::empty())
        .dst_access_mask(vk::AccessFlags::TRANSFER_WRITE);
    (ACQUIRE_WAIT_STAGE, vk::PipelineStageFlags::TRANSFER, barrier)
}

impl EngineSwapchain for Swapchain {
    fn acquire_next_image(&mut self, frame_index: FrameIndex) -> Result<AcquireOutcome> {
        let semaphore = self.image_available_semaphores.get(frame_index.as_usize()).copied().ok_or_else(|| {
            engine_error!(SOURCE, "acquire_next_image: {} out of range ({} slots)",
                frame_index, self.image_available_semaphores.len());
            Error::IndexOutOfRange {
                index: frame_index.as_usize(),
                len: self.image_available_semaphores.len(),
            }
        })?;

        let result = unsafe {
            self.ctx.swapchain_loader.acquire_next_image(
                self.swapchain,
                u64::MAX,
                semaphore,
                vk::Fence::null(),
            )
        };

        match result {
            Ok((index, false)) => Ok(AcquireOutcome::Acquired(ImageIndex::new(index))),
            Ok((index, true)) => {
                engine_debug!(SOURCE, "Suboptimal swapchain image {} acquired", index);
                Ok(AcquireOutcome::Suboptimal(ImageIndex::new(index)))
            }
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                engine_debug!(SOURCE, "Swapchain out of date during acquire");
                Ok(AcquireOutcome::OutOfDate)
            }
            Err(vk::Result::ERROR_DEVICE_LOST) => {
                engine_error!(SOURCE, "Device lost during acquire");
                Err(Error::DeviceLost)
            }
            Err(e) => Err(engine_err!(SOURCE, "Failed to acquire next swapchain image: {:?}", e)),
        }
    }

    fn present(&mut self, frame_index: FrameIndex, image_index: ImageIndex) -> Result<PresentOutcome> {
        let (_, render_finished) = self.sync_info(frame_index, image_index)?;

        let swapchains = [self.swapchain];
        let image_indices = [image_index.get()];
        let wait_semaphores = [render_finished];

        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        let result = {
            let _queues = self.ctx.lock_queues()?;
            unsafe { self.ctx.swapchain_loader.queue_present(self.ctx.present_queue, &present_info) }
        };

        match result {
            Ok(false) => Ok(PresentOutcome::Presented),
            Ok(true) | Err(vk::Result::SUBOPTIMAL_KHR) | Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                engine_debug!(SOURCE, "Swapchain out of date during present of image {}", image_index.get());
                Ok(PresentOutcome::OutOfDate)
            }
            Err(vk::Result::ERROR_DEVICE_LOST) => {
                engine_error!(SOURCE, "Device lost during present");
                Err(Error::DeviceLost)
            }
            Err(e) => Err(engine_err!(SOURCE, "Failed to present swapchain image: {:?}", e)),
        }
    }

    fn recreate(&mut self, extent: Extent2D) -> Result<()> {
        unsafe { self.ctx.device.device_wait_idle() }
            .map_err(|e| engine_err!(SOURCE, "Failed to wait idle before swapchain recreate: {:?}", e))?;

        self.build(extent)?;

        engine_debug!(SOURCE, "Recreated swapchain at {}x{} ({} images)",
            self.extent.width, self.extent.height, self.images.len());
        Ok(())
    }

    fn record_present_blit(
        &self,
        cmd: &mut dyn EngineCommandBuffer,
        src: &dyn EngineImage,
        image_index: ImageIndex,
    ) -> Result<()> {
        let dst_image = self.images.get(image_index.as_usize()).copied().ok_or_else(|| {
            engine_error!(SOURCE, "record_present_blit: image_index {} out of range (count: {})",
                image_index.get(), self.images.len());
            Error::IndexOutOfRange { index: image_index.as_usize(), len: self.images.len() }
        })?;

        let vk_cmd = cmd.as_any().downcast_ref::<CommandBuffer>().ok_or_else(|| {
            engine_error!(SOURCE, "record_present_blit: command buffer is not a Vulkan command buffer");
            Error::InvalidResource("command buffer is not a Vulkan command buffer".to_string())
        })?;
        vk_cmd.require_outside_render_pass("record_present_blit")?;

        let vk_src = src.as_any().downcast_ref::<Image>().ok_or_else(|| {
            engine_error!(SOURCE, "record_present_blit: '{}' is not a Vulkan image", src.desc().name);
            Error::InvalidResource(format!("'{}' is not a Vulkan image", src.desc().name))
        })?;
        let src_desc = src.desc();
        if src_desc.sample_count.samples() > 1 || src_desc.format.is_depth() {
            engine_error!(SOURCE, "record_present_blit: '{}' must be a single-sampled color image", src_desc.name);
            return Err(Error::InvalidArgument(format!(
                "'{}' must be a single-sampled color image", src_desc.name
            )));
        }

        let cb = vk_cmd.command_buffer();
        let device = &self.ctx.device;

        vk_src.record_transition(
            cb,
            vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
            vk::AccessFlags::TRANSFER_READ,
            vk::PipelineStageFlags::TRANSFER,
        );

        unsafe {
            let (src_stage, dst_stage, to_transfer) = acquired_to_transfer_dst(dst_image);
            device.cmd_pipeline_barrier(
                cb,
                src_stage,
                dst_stage,
                vk::DependencyFlags::empty(),
                &[], &[], &[to_transfer],
            );

            let layers = vk::ImageSubresourceLayers {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                mip_level: 0,
                base_array_layer: 0,
                layer_count: 1,
            };
            let region = vk::ImageBlit {
                src_subresource: layers,
                src_offsets: [
                    vk::Offset3D { x: 0, y: 0, z: 0 },
                    vk::Offset3D { x: src_desc.extent.width as i32, y: src_desc.extent.height as i32, z: 1 },
                ],
                dst_subresource: layers,
                dst_offsets: [
                    vk::Offset3D { x: 0, y: 0, z: 0 },
                    vk::Offset3D { x: self.extent.width as i32, y: self.extent.height as i32, z: 1 },
                ],
            };

            device.cmd_blit_image(
                cb,
                vk_src.image,
                vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                dst_image,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[region],
                vk::Filter::LINEAR,
            );

            // Transition dst: TRANSFER_DST_OPTIMAL → PRESENT_SRC_KHR
            let to_present = vk::ImageMemoryBarrier::default()
                .old_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
                .new_layout(vk::ImageLayout::PRESENT_SRC_KHR)
                .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .image(dst_image)
                .subresource_range(color_range())
                .src_access_mask(vk::AccessFlags::TRANSFER_WRITE)
                .dst_access_mask(vk::AccessFlags::empty());

            device.cmd_pipeline_barrier(
                cb,
                vk::PipelineStageFlags::TRANSFER,
                vk::PipelineStageFlags::BOTTOM_OF_PIPE,
                vk::DependencyFlags::empty(),
                &[], &[], &[to_present],
            );
        }

        Ok(())
    }

    fn image_count(&self) -> u32 {
        self.images.len() as u32
    }

    fn extent(&self) -> Extent2D {
        extent_from_vk(self.extent)
    }

    fn format(&self) -> ImageFormat {
        self.format
    }

    fn present_mode(&self) -> PresentMode {
        self.present_mode
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.device_wait_idle().ok();
        }
        self.destroy_views_and_semaphores();
        unsafe {
            self.ctx.swapchain_loader.destroy_swapchain(self.swapchain, None);
        }
    }
}

#[cfg(test)]
#[path = "vulkan_swapchain_tests.rs"]
mod tests;
