/// Display - Vulkan implementation of the Display trait
///
/// Wraps a winit window and its Vulkan surface. Window events stay in the
/// application's event loop, which reports them through `notify_resized()`
/// and `notify_close_requested()`.

use flint_engine::flint::{Error, Result};
use flint_engine::flint::device::{Display as EngineDisplay, Extent2D, GraphicsDevice, ImageFormat};
use flint_engine::{engine_debug, engine_err, engine_error};
use ash::vk;
use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::vulkan::VulkanGraphicsDevice;
use crate::vulkan_context::GpuContext;
use crate::vulkan_format::{best_image_count, choose_surface_format, format_from_vk};

const SOURCE: &str = "flint::vulkan::Display";

pub struct Display {
    window: Arc<Window>,
    pub(crate) surface: vk::SurfaceKHR,
    title: Mutex<String>,
    /// Extent seen by the last `update()`
    last_extent: Mutex<Extent2D>,
    resized: AtomicBool,
    closed: AtomicBool,
    ctx: Arc<GpuContext>,
}

impl Display {
    pub(crate) fn new(ctx: Arc<GpuContext>, window: Arc<Window>, surface: vk::SurfaceKHR) -> Self {
        let title = window.title();
        let extent = Self::window_extent(&window);
        Self {
            window,
            surface,
            title: Mutex::new(title),
            last_extent: Mutex::new(extent),
            resized: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            ctx,
        }
    }

    fn window_extent(window: &Window) -> Extent2D {
        if window.is_minimized() == Some(true) {
            return Extent2D::new(0, 0);
        }
        let size = window.inner_size();
        Extent2D::new(size.width, size.height)
    }

    pub fn window(&self) -> &Arc<Window> {
        &self.window
    }

    /// Apply the title and initial size asked for by a pipeline
    pub(crate) fn configure(&self, extent: Extent2D, title: &str) {
        self.window.set_title(title);
        if let Ok(mut current) = self.title.lock() {
            *current = title.to_string();
        }
        if !extent.is_zero() && self.extent() != extent {
            // The window system may refuse or adjust; the real size arrives as a resize event
            let _ = self.window.request_inner_size(PhysicalSize::new(extent.width, extent.height));
        }
    }

    /// Record a resize reported by the window system
    pub fn notify_resized(&self) {
        if let Ok(mut last) = self.last_extent.lock() {
            *last = Self::window_extent(&self.window);
        }
        self.resized.store(true, Ordering::Release);
    }

    /// Record a close request reported by the window system
    pub fn notify_close_requested(&self) {
        self.closed.store(true, Ordering::Release);
    }

    pub(crate) fn surface_capabilities(&self) -> Result<vk::SurfaceCapabilitiesKHR> {
        unsafe {
            self.ctx
                .surface_loader
                .get_physical_device_surface_capabilities(self.ctx.physical_device, self.surface)
        }
        .map_err(|e| engine_err!(SOURCE, "Failed to get surface capabilities: {:?}", e))
    }

    pub(crate) fn surface_formats(&self) -> Result<Vec<vk::SurfaceFormatKHR>> {
        unsafe {
            self.ctx
                .surface_loader
                .get_physical_device_surface_formats(self.ctx.physical_device, self.surface)
        }
        .map_err(|e| engine_err!(SOURCE, "Failed to get surface formats: {:?}", e))
    }

    pub(crate) fn surface_present_modes(&self) -> Result<Vec<vk::PresentModeKHR>> {
        unsafe {
            self.ctx
                .surface_loader
                .get_physical_device_surface_present_modes(self.ctx.physical_device, self.surface)
        }
        .map_err(|e| engine_err!(SOURCE, "Failed to get surface present modes: {:?}", e))
    }

    /// Preferred surface format, as a Vulkan format/color space pair
    pub(crate) fn best_surface_format(&self) -> Result<vk::SurfaceFormatKHR> {
        let formats = self.surface_formats()?;
        choose_surface_format(&formats).ok_or_else(|| {
            engine_error!(SOURCE, "No supported surface format among {:?}", formats);
            Error::InvalidResource("no supported surface format".to_string())
        })
    }

    fn check_device(device: &dyn GraphicsDevice) -> Result<()> {
        if device.as_any().downcast_ref::<VulkanGraphicsDevice>().is_none() {
            engine_error!(SOURCE, "A Vulkan display can only be queried against a Vulkan device");
            return Err(Error::InvalidArgument("device is not a VulkanGraphicsDevice".to_string()));
        }
        Ok(())
    }
}

impl EngineDisplay for Display {
    fn title(&self) -> String {
        self.title.lock().map(|t| t.clone()).unwrap_or_default()
    }

    fn extent(&self) -> Extent2D {
        Self::window_extent(&self.window)
    }

    fn update(&self) {
        let extent = self.extent();
        if let Ok(mut last) = self.last_extent.lock() {
            if *last != extent {
                engine_debug!(SOURCE, "Window extent changed from {}x{} to {}x{}",
                    last.width, last.height, extent.width, extent.height);
                *last = extent;
                self.resized.store(true, Ordering::Release);
            }
        }
    }

    fn find_best_buffer_count(&self, device: &dyn GraphicsDevice) -> Result<u32> {
        Self::check_device(device)?;
        Ok(best_image_count(&self.surface_capabilities()?))
    }

    fn best_swapchain_format(&self, device: &dyn GraphicsDevice) -> Result<ImageFormat> {
        Self::check_device(device)?;
        let surface_format = self.best_surface_format()?;
        format_from_vk(surface_format.format).ok_or_else(|| {
            engine_error!(SOURCE, "Surface format {:?} has no engine equivalent", surface_format.format);
            Error::InvalidResource(format!("unsupported surface format {:?}", surface_format.format))
        })
    }

    fn is_resized(&self) -> bool {
        self.resized.load(Ordering::Acquire)
    }

    fn clear_resized(&self) {
        self.resized.store(false, Ordering::Release);
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for Display {
    fn drop(&mut self) {
        unsafe {
            self.ctx.surface_loader.destroy_surface(self.surface, None);
        }
    }
}
