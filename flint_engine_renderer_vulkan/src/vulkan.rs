/// VulkanGraphicsDevice - Vulkan implementation of the GraphicsDevice trait

use flint_engine::flint::{Error, Result};
use flint_engine::flint::device::{
    CommandBuffer as EngineCommandBuffer, CommandBufferAllocator as EngineCommandBufferAllocator,
    DeviceConfig, Display as EngineDisplay, Extent2D, Framebuffer as EngineFramebuffer,
    FramebufferDesc, GraphicsDevice, HostSyncPrimitive, Image as EngineImage, ImageDesc,
    PresentMode, PresentSync, RenderPass as EngineRenderPass, RenderPassDesc,
    Swapchain as EngineSwapchain,
};
use flint_engine::{engine_debug, engine_err, engine_error, engine_info, engine_warn};
use ash::vk;
use std::any::Any;
use std::ffi::CString;
use std::sync::Arc;
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use winit::window::Window;

use crate::vulkan_command_buffer::{CommandBuffer, CommandBufferAllocator};
use crate::vulkan_context::{DebugMessenger, GpuContext, QueueSelection};
use crate::vulkan_display::Display;
use crate::vulkan_frame_buffer::Framebuffer;
use crate::vulkan_image::Image;
use crate::vulkan_render_pass::RenderPass;
use crate::vulkan_swapchain::{Swapchain, ACQUIRE_WAIT_STAGE};
use crate::vulkan_sync::Fence;

const SOURCE: &str = "flint::vulkan";

/// Vulkan device implementation
///
/// Central object for creating GPU objects and submitting command buffers.
/// It is bound to one window: the display it hands out presents to that
/// window's surface.
pub struct VulkanGraphicsDevice {
    /// Dropped before the context so the surface goes before the instance
    display: Arc<Display>,
    /// Shared GPU context; owns device, instance and debug messenger destruction
    ctx: Arc<GpuContext>,
}

/// Map a failed device bootstrap step to `InitializationFailed`
fn init_failed(what: &str, e: impl std::fmt::Debug) -> Error {
    engine_error!(SOURCE, "{}: {:?}", what, e);
    Error::InitializationFailed(format!("{}: {:?}", what, e))
}

impl VulkanGraphicsDevice {
    /// Create a new Vulkan device
    ///
    /// # Arguments
    ///
    /// * `window` - Window for surface creation
    /// * `config` - Device configuration
    pub fn new(window: Arc<Window>, config: DeviceConfig) -> Result<Self> {
        let validation = config.enable_validation && cfg!(feature = "vulkan-validation");
        if config.enable_validation && !validation {
            engine_warn!(SOURCE, "Validation requested but the vulkan-validation feature is disabled");
        }

        unsafe {
            let entry = ash::Entry::load()
                .map_err(|e| init_failed("Failed to load Vulkan library", e))?;

            let app_name = CString::new(config.app_name.clone()).map_err(|e| {
                engine_error!(SOURCE, "Invalid application name '{}': {}", config.app_name, e);
                Error::InvalidArgument(format!("invalid application name: {}", e))
            })?;
            let (major, minor, patch) = config.app_version;

            let app_info = vk::ApplicationInfo::default()
                .application_name(&app_name)
                .application_version(vk::make_api_version(0, major, minor, patch))
                .engine_name(c"Flint")
                .engine_version(vk::make_api_version(0, 0, 1, 0))
                .api_version(vk::API_VERSION_1_3);

            let display_handle = window.display_handle()
                .map_err(|e| init_failed("Failed to get display handle", e))?;
            let mut extension_names = ash_window::enumerate_required_extensions(display_handle.as_raw())
                .map_err(|e| init_failed("Failed to get required extensions", e))?
                .to_vec();

            if validation {
                extension_names.push(ash::ext::debug_utils::NAME.as_ptr());
            }
            let layer_names = if validation {
                vec![c"VK_LAYER_KHRONOS_validation".as_ptr()]
            } else {
                vec![]
            };

            let create_info = vk::InstanceCreateInfo::default()
                .application_info(&app_info)
                .enabled_layer_names(&layer_names)
                .enabled_extension_names(&extension_names);

            let instance = entry
                .create_instance(&create_info, None)
                .map_err(|e| init_failed("Failed to create Vulkan instance", e))?;

            let debug = if validation {
                Self::create_debug_messenger(&entry, &instance)?
            } else {
                (None, None)
            };

            let window_handle = window.window_handle()
                .map_err(|e| init_failed("Failed to get window handle", e))?;
            let surface = ash_window::create_surface(
                &entry,
                &instance,
                display_handle.as_raw(),
                window_handle.as_raw(),
                None,
            )
            .map_err(|e| init_failed("Failed to create surface", e))?;

            let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);
            let (physical_device, graphics_family, present_family) =
                Self::pick_physical_device(&instance, &surface_loader, surface)?;

            let properties = instance.get_physical_device_properties(physical_device);
            let device_name = properties
                .device_name_as_c_str()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();

            // Create Logical Device
            let queue_priorities = [1.0];
            let mut queue_create_infos = vec![
                vk::DeviceQueueCreateInfo::default()
                    .queue_family_index(graphics_family)
                    .queue_priorities(&queue_priorities),
            ];
            if present_family != graphics_family {
                queue_create_infos.push(vk::DeviceQueueCreateInfo::default()
                    .queue_family_index(present_family)
                    .queue_priorities(&queue_priorities));
            }

            let device_extension_names = [ash::khr::swapchain::NAME.as_ptr()];
            let device_create_info = vk::DeviceCreateInfo::default()
                .queue_create_infos(&queue_create_infos)
                .enabled_extension_names(&device_extension_names);

            let device = instance
                .create_device(physical_device, &device_create_info, None)
                .map_err(|e| init_failed("Failed to create logical device", e))?;

            let queues = QueueSelection {
                graphics_queue: device.get_device_queue(graphics_family, 0),
                graphics_queue_family: graphics_family,
                present_queue: device.get_device_queue(present_family, 0),
            };

            let allocator = Allocator::new(&AllocatorCreateDesc {
                instance: instance.clone(),
                device: device.clone(),
                physical_device,
                debug_settings: Default::default(),
                buffer_device_address: false,
                allocation_sizes: Default::default(),
            })
            .map_err(|e| init_failed("Failed to create GPU allocator", e))?;

            let ctx = Arc::new(GpuContext::new(
                entry,
                instance,
                physical_device,
                device,
                allocator,
                queues,
                debug,
            ));
            let display = Arc::new(Display::new(Arc::clone(&ctx), window, surface));

            engine_info!(SOURCE, "Vulkan device ready on '{}' (graphics family {}, present family {}, validation: {})",
                device_name, graphics_family, present_family, validation);

            Ok(Self { display, ctx })
        }
    }

    #[cfg(feature = "vulkan-validation")]
    unsafe fn create_debug_messenger(entry: &ash::Entry, instance: &ash::Instance) -> Result<DebugMessenger> {
        let debug_utils = ash::ext::debug_utils::Instance::new(entry, instance);
        crate::debug::reset_validation_stats();

        let messenger = debug_utils
            .create_debug_utils_messenger(&crate::debug::messenger_create_info(), None)
            .map_err(|e| init_failed("Failed to create debug messenger", e))?;

        Ok((Some(debug_utils), Some(messenger)))
    }

    #[cfg(not(feature = "vulkan-validation"))]
    unsafe fn create_debug_messenger(_entry: &ash::Entry, _instance: &ash::Instance) -> Result<DebugMessenger> {
        Ok((None, None))
    }

    /// Pick a GPU with a graphics queue and presentation support, preferring discrete GPUs
    ///
    /// Returns (physical device, graphics family, present family).
    unsafe fn pick_physical_device(
        instance: &ash::Instance,
        surface_loader: &ash::khr::surface::Instance,
        surface: vk::SurfaceKHR,
    ) -> Result<(vk::PhysicalDevice, u32, u32)> {
        let physical_devices = instance
            .enumerate_physical_devices()
            .map_err(|e| init_failed("Failed to enumerate physical devices", e))?;

        let mut candidates: Vec<(vk::PhysicalDevice, u32, u32, bool)> = Vec::new();
        for physical_device in physical_devices {
            let queue_families = instance.get_physical_device_queue_family_properties(physical_device);

            let graphics_family = queue_families
                .iter()
                .position(|qf| qf.queue_flags.contains(vk::QueueFlags::GRAPHICS))
                .map(|i| i as u32);

            let supports_present = |i: u32| {
                surface_loader
                    .get_physical_device_surface_support(physical_device, i, surface)
                    .unwrap_or(false)
            };
            // Prefer presenting from the graphics family
            let present_family = match graphics_family {
                Some(g) if supports_present(g) => Some(g),
                _ => (0..queue_families.len() as u32).find(|&i| supports_present(i)),
            };

            if let (Some(graphics), Some(present)) = (graphics_family, present_family) {
                let discrete = instance.get_physical_device_properties(physical_device).device_type
                    == vk::PhysicalDeviceType::DISCRETE_GPU;
                candidates.push((physical_device, graphics, present, discrete));
            }
        }

        candidates
            .iter()
            .find(|c| c.3)
            .or_else(|| candidates.first())
            .map(|&(device, graphics, present, _)| (device, graphics, present))
            .ok_or_else(|| {
                engine_error!(SOURCE, "No Vulkan-capable GPU can present to this window");
                Error::InitializationFailed("No Vulkan-capable GPU can present to this window".to_string())
            })
    }

    /// The display bound to this device's window
    ///
    /// The application forwards window events to it.
    pub fn vulkan_display(&self) -> &Arc<Display> {
        &self.display
    }

    /// Shared GPU context (for backend-specific extensions)
    pub fn context(&self) -> &Arc<GpuContext> {
        &self.ctx
    }

    fn downcast<'a, T: 'static>(object: &'a dyn Any, what: &str) -> Result<&'a T> {
        object.downcast_ref::<T>().ok_or_else(|| {
            engine_error!(SOURCE, "{} was not created by a Vulkan device", what);
            Error::InvalidResource(format!("{} was not created by a Vulkan device", what))
        })
    }
}

impl GraphicsDevice for VulkanGraphicsDevice {
    fn create_display(&self, extent: Extent2D, title: &str) -> Result<Arc<dyn EngineDisplay>> {
        self.display.configure(extent, title);
        Ok(Arc::clone(&self.display) as Arc<dyn EngineDisplay>)
    }

    fn create_image(&self, desc: &ImageDesc) -> Result<Arc<dyn EngineImage>> {
        if desc.extent.is_zero() {
            engine_error!(SOURCE, "create_image: '{}' has an empty extent ({}x{})",
                desc.name, desc.extent.width, desc.extent.height);
            return Err(Error::InvalidArgument(format!("image '{}' has an empty extent", desc.name)));
        }
        Ok(Arc::new(Image::new(Arc::clone(&self.ctx), desc)?))
    }

    fn create_swapchain(
        &self,
        display: &Arc<dyn EngineDisplay>,
        image_count: u32,
        present_mode: PresentMode,
    ) -> Result<Box<dyn EngineSwapchain>> {
        let vk_display = Self::downcast::<Display>(display.as_any(), "display")?;
        if !std::ptr::eq(vk_display, self.display.as_ref()) {
            engine_error!(SOURCE, "create_swapchain: display belongs to another device");
            return Err(Error::InvalidArgument("display belongs to another device".to_string()));
        }
        Ok(Box::new(Swapchain::new(
            Arc::clone(&self.ctx),
            Arc::clone(&self.display),
            image_count,
            present_mode,
        )?))
    }

    fn create_render_pass(&self, desc: &RenderPassDesc) -> Result<Arc<dyn EngineRenderPass>> {
        Ok(Arc::new(RenderPass::new(Arc::clone(&self.ctx), desc)?))
    }

    fn create_framebuffer(&self, desc: &FramebufferDesc) -> Result<Arc<dyn EngineFramebuffer>> {
        Ok(Arc::new(Framebuffer::new(Arc::clone(&self.ctx), desc)?))
    }

    fn create_command_buffer_allocator(&self, buffer_count: u32) -> Result<Box<dyn EngineCommandBufferAllocator>> {
        Ok(Box::new(CommandBufferAllocator::new(Arc::clone(&self.ctx), buffer_count)?))
    }

    fn create_host_sync_primitive(&self) -> Result<Box<dyn HostSyncPrimitive>> {
        Ok(Box::new(Fence::new(Arc::clone(&self.ctx))?))
    }

    fn submit_graphics_command_buffer(
        &self,
        command_buffer: &dyn EngineCommandBuffer,
        fence: &dyn HostSyncPrimitive,
        present: Option<PresentSync<'_>>,
    ) -> Result<()> {
        if command_buffer.is_recording() {
            engine_error!(SOURCE, "submit: command buffer is still recording");
            return Err(Error::InvalidOperation("command buffer is still recording".to_string()));
        }

        let vk_cmd = Self::downcast::<CommandBuffer>(command_buffer.as_any(), "command buffer")?;
        let vk_fence = Self::downcast::<Fence>(fence.as_any(), "fence")?;

        let semaphores = match present {
            Some(sync) => {
                let swapchain = Self::downcast::<Swapchain>(sync.swapchain.as_any(), "swapchain")?;
                Some(swapchain.sync_info(sync.frame_index, sync.image_index)?)
            }
            None => None,
        };

        let command_buffers = [vk_cmd.command_buffer()];
        let wait_stages = [ACQUIRE_WAIT_STAGE];
        let wait_semaphores: Vec<vk::Semaphore> = semaphores.iter().map(|s| s.0).collect();
        let signal_semaphores: Vec<vk::Semaphore> = semaphores.iter().map(|s| s.1).collect();

        let mut submit_info = vk::SubmitInfo::default().command_buffers(&command_buffers);
        if !wait_semaphores.is_empty() {
            submit_info = submit_info
                .wait_semaphores(&wait_semaphores)
                .wait_dst_stage_mask(&wait_stages)
                .signal_semaphores(&signal_semaphores);
        }

        let result = {
            let _queues = self.ctx.lock_queues()?;
            unsafe { self.ctx.device.queue_submit(self.ctx.graphics_queue, &[submit_info], vk_fence.fence) }
        };

        match result {
            Ok(()) => Ok(()),
            Err(vk::Result::ERROR_DEVICE_LOST) => {
                engine_error!(SOURCE, "Device lost during submit");
                Err(Error::DeviceLost)
            }
            Err(e) => Err(engine_err!(SOURCE, "Failed to submit commands to GPU queue: {:?}", e)),
        }
    }

    fn wait_idle(&self) -> Result<()> {
        engine_debug!(SOURCE, "Waiting for device idle");
        match unsafe { self.ctx.device.device_wait_idle() } {
            Ok(()) => Ok(()),
            Err(vk::Result::ERROR_DEVICE_LOST) => Err(Error::DeviceLost),
            Err(e) => Err(engine_err!(SOURCE, "Failed to wait idle: {:?}", e)),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
