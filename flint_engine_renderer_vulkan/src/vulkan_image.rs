/// Image - Vulkan implementation of the Image trait

use flint_engine::flint::Result;
use flint_engine::flint::device::{Image as EngineImage, ImageDesc};
use flint_engine::{engine_err, engine_warn};
use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use gpu_allocator::MemoryLocation;
use std::any::Any;
use std::sync::{Arc, Mutex};

use crate::vulkan_context::GpuContext;
use crate::vulkan_format::{aspect_of, format_to_vk, samples_to_vk, usage_to_vk};

/// Vulkan image with its view and device-local memory
///
/// The current layout is tracked at record time: command buffers read it to
/// build barriers and update it after every transition they record.
pub struct Image {
    pub(crate) image: vk::Image,
    pub(crate) view: vk::ImageView,
    pub(crate) aspect: vk::ImageAspectFlags,
    layout: Mutex<vk::ImageLayout>,
    allocation: Option<Allocation>,
    desc: ImageDesc,
    ctx: Arc<GpuContext>,
}

impl Image {
    pub(crate) fn new(ctx: Arc<GpuContext>, desc: &ImageDesc) -> Result<Self> {
        let format = format_to_vk(desc.format);
        let aspect = aspect_of(desc.format);

        unsafe {
            let image_info = vk::ImageCreateInfo::default()
                .image_type(vk::ImageType::TYPE_2D)
                .format(format)
                .extent(vk::Extent3D { width: desc.extent.width, height: desc.extent.height, depth: 1 })
                .mip_levels(1)
                .array_layers(1)
                .samples(samples_to_vk(desc.sample_count))
                .tiling(vk::ImageTiling::OPTIMAL)
                .usage(usage_to_vk(desc.usage))
                .sharing_mode(vk::SharingMode::EXCLUSIVE)
                .initial_layout(vk::ImageLayout::UNDEFINED);

            let image = ctx.device.create_image(&image_info, None)
                .map_err(|e| engine_err!("flint::vulkan::Image",
                    "Failed to create image '{}': {:?}", desc.name, e))?;

            let requirements = ctx.device.get_image_memory_requirements(image);

            let allocation = {
                let mut allocator = ctx.lock_allocator()?;
                allocator.allocate(&AllocationCreateDesc {
                    name: &desc.name,
                    requirements,
                    location: MemoryLocation::GpuOnly,
                    linear: false,
                    allocation_scheme: AllocationScheme::GpuAllocatorManaged,
                })
            };
            let allocation = match allocation {
                Ok(allocation) => allocation,
                Err(e) => {
                    ctx.device.destroy_image(image, None);
                    return Err(engine_err!("flint::vulkan::Image",
                        "Failed to allocate memory for image '{}': {:?}", desc.name, e));
                }
            };

            if let Err(e) = ctx.device.bind_image_memory(image, allocation.memory(), allocation.offset()) {
                ctx.device.destroy_image(image, None);
                if let Ok(mut allocator) = ctx.lock_allocator() {
                    allocator.free(allocation).ok();
                }
                return Err(engine_err!("flint::vulkan::Image",
                    "Failed to bind memory of image '{}': {:?}", desc.name, e));
            }

            let view_info = vk::ImageViewCreateInfo::default()
                .image(image)
                .view_type(vk::ImageViewType::TYPE_2D)
                .format(format)
                .subresource_range(vk::ImageSubresourceRange {
                    aspect_mask: aspect,
                    base_mip_level: 0,
                    level_count: 1,
                    base_array_layer: 0,
                    layer_count: 1,
                });

            let view = match ctx.device.create_image_view(&view_info, None) {
                Ok(view) => view,
                Err(e) => {
                    ctx.device.destroy_image(image, None);
                    if let Ok(mut allocator) = ctx.lock_allocator() {
                        allocator.free(allocation).ok();
                    }
                    return Err(engine_err!("flint::vulkan::Image",
                        "Failed to create view of image '{}': {:?}", desc.name, e));
                }
            };

            Ok(Self {
                image,
                view,
                aspect,
                layout: Mutex::new(vk::ImageLayout::UNDEFINED),
                allocation: Some(allocation),
                desc: desc.clone(),
                ctx,
            })
        }
    }

    /// Layout recorded by the last command touching this image
    pub(crate) fn layout(&self) -> vk::ImageLayout {
        self.layout.lock().map(|l| *l).unwrap_or(vk::ImageLayout::UNDEFINED)
    }

    pub(crate) fn set_layout(&self, layout: vk::ImageLayout) {
        if let Ok(mut current) = self.layout.lock() {
            *current = layout;
        }
    }

    /// Whole-image subresource range
    pub(crate) fn subresource_range(&self) -> vk::ImageSubresourceRange {
        vk::ImageSubresourceRange {
            aspect_mask: self.aspect,
            base_mip_level: 0,
            level_count: 1,
            base_array_layer: 0,
            layer_count: 1,
        }
    }

    /// Record a barrier moving this image from its tracked layout to `new_layout`
    pub(crate) fn record_transition(
        &self,
        cmd: vk::CommandBuffer,
        new_layout: vk::ImageLayout,
        dst_access: vk::AccessFlags,
        dst_stage: vk::PipelineStageFlags,
    ) {
        let old_layout = self.layout();
        let (src_access, src_stage) = match old_layout {
            vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL => (
                vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
                vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
            ),
            vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL => (
                vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
                vk::PipelineStageFlags::LATE_FRAGMENT_TESTS,
            ),
            vk::ImageLayout::TRANSFER_DST_OPTIMAL => (
                vk::AccessFlags::TRANSFER_WRITE,
                vk::PipelineStageFlags::TRANSFER,
            ),
            vk::ImageLayout::TRANSFER_SRC_OPTIMAL => (
                vk::AccessFlags::TRANSFER_READ,
                vk::PipelineStageFlags::TRANSFER,
            ),
            _ => (vk::AccessFlags::empty(), vk::PipelineStageFlags::TOP_OF_PIPE),
        };

        let barrier = vk::ImageMemoryBarrier::default()
            .old_layout(old_layout)
            .new_layout(new_layout)
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .image(self.image)
            .subresource_range(self.subresource_range())
            .src_access_mask(src_access)
            .dst_access_mask(dst_access);

        unsafe {
            self.ctx.device.cmd_pipeline_barrier(
                cmd,
                src_stage,
                dst_stage,
                vk::DependencyFlags::empty(),
                &[], &[], &[barrier],
            );
        }
        self.set_layout(new_layout);
    }
}

impl EngineImage for Image {
    fn desc(&self) -> &ImageDesc {
        &self.desc
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for Image {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_image_view(self.view, None);
            self.ctx.device.destroy_image(self.image, None);
        }
        if let Some(allocation) = self.allocation.take() {
            match self.ctx.lock_allocator() {
                Ok(mut allocator) => {
                    if let Err(e) = allocator.free(allocation) {
                        engine_warn!("flint::vulkan::Image", "Failed to free image '{}': {:?}", self.desc.name, e);
                    }
                }
                Err(_) => engine_warn!("flint::vulkan::Image", "Leaking memory of image '{}'", self.desc.name),
            }
        }
    }
}
