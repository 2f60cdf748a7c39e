/// GpuContext - Shared GPU state for all Vulkan objects
///
/// Contains everything needed for GPU operations:
/// - Device for Vulkan API calls
/// - Allocator for memory management
/// - Queues for submission and presentation
/// - Surface and swapchain loaders

use flint_engine::flint::{Error, Result};
use flint_engine::engine_error;
use ash::vk;
use gpu_allocator::vulkan::Allocator;
use std::mem::ManuallyDrop;
use std::sync::{Mutex, MutexGuard};

/// Shared GPU context for all Vulkan resources.
///
/// Every object created by the device (images, swapchains, command pools,
/// fences, the display) keeps an `Arc<GpuContext>`, so the device and the
/// instance are destroyed only once the last of them is gone.
pub struct GpuContext {
    /// Vulkan logical device
    pub device: ash::Device,

    pub physical_device: vk::PhysicalDevice,

    /// GPU memory allocator
    /// Wrapped in ManuallyDrop to ensure it's dropped BEFORE the device is destroyed
    pub allocator: ManuallyDrop<Mutex<Allocator>>,

    pub graphics_queue: vk::Queue,
    pub graphics_queue_family: u32,

    /// Present queue (may be same as graphics)
    pub present_queue: vk::Queue,

    pub surface_loader: ash::khr::surface::Instance,
    pub swapchain_loader: ash::khr::swapchain::Device,

    /// Queues are externally synchronized: submit and present hold this lock
    queue_lock: Mutex<()>,

    instance: ash::Instance,

    /// Keeps the Vulkan library loaded
    _entry: ash::Entry,

    debug_utils_loader: Option<ash::ext::debug_utils::Instance>,
    debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
}

/// Queue handles chosen during device bootstrap
pub struct QueueSelection {
    pub graphics_queue: vk::Queue,
    pub graphics_queue_family: u32,
    pub present_queue: vk::Queue,
}

/// Optional validation-layer messenger
pub type DebugMessenger = (Option<ash::ext::debug_utils::Instance>, Option<vk::DebugUtilsMessengerEXT>);

impl GpuContext {
    /// Create a new GPU context, taking ownership of the device and instance
    ///
    /// # Arguments
    ///
    /// * `entry` - Loaded Vulkan library
    /// * `instance` - Vulkan instance
    /// * `physical_device` - Selected physical device
    /// * `device` - Vulkan logical device
    /// * `allocator` - GPU memory allocator
    /// * `queues` - Graphics and present queues
    /// * `debug` - Debug utils loader and messenger (if validation enabled)
    pub fn new(
        entry: ash::Entry,
        instance: ash::Instance,
        physical_device: vk::PhysicalDevice,
        device: ash::Device,
        allocator: Allocator,
        queues: QueueSelection,
        debug: DebugMessenger,
    ) -> Self {
        let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);
        let swapchain_loader = ash::khr::swapchain::Device::new(&instance, &device);
        Self {
            device,
            physical_device,
            allocator: ManuallyDrop::new(Mutex::new(allocator)),
            graphics_queue: queues.graphics_queue,
            graphics_queue_family: queues.graphics_queue_family,
            present_queue: queues.present_queue,
            surface_loader,
            swapchain_loader,
            queue_lock: Mutex::new(()),
            instance,
            _entry: entry,
            debug_utils_loader: debug.0,
            debug_messenger: debug.1,
        }
    }

    pub fn instance(&self) -> &ash::Instance {
        &self.instance
    }

    /// Exclusive access to the queues for one submission or presentation
    pub fn lock_queues(&self) -> Result<MutexGuard<'_, ()>> {
        self.queue_lock.lock().map_err(|_| {
            engine_error!("flint::vulkan", "Queue lock poisoned");
            Error::BackendError("Queue lock poisoned".to_string())
        })
    }

    /// Exclusive access to the memory allocator
    pub fn lock_allocator(&self) -> Result<MutexGuard<'_, Allocator>> {
        self.allocator.lock().map_err(|_| {
            engine_error!("flint::vulkan", "Allocator lock poisoned");
            Error::BackendError("Allocator lock poisoned".to_string())
        })
    }
}

impl Drop for GpuContext {
    fn drop(&mut self) {
        unsafe {
            self.device.device_wait_idle().ok();

            // 1. Free VkDeviceMemory pages BEFORE destroying the device
            ManuallyDrop::drop(&mut self.allocator);

            // 2. Debug messenger BEFORE device and instance
            if let (Some(debug_utils), Some(messenger)) = (&self.debug_utils_loader, self.debug_messenger) {
                debug_utils.destroy_debug_utils_messenger(messenger, None);
            }

            // 3. Device and instance
            self.device.destroy_device(None);
            self.instance.destroy_instance(None);
        }
    }
}
