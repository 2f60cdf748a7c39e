/// Display trait - the window surface a screen-bound render target presents to

use std::any::Any;
use crate::error::Result;
use crate::graphics_device::{Extent2D, GraphicsDevice, ImageFormat};

/// Display (window surface)
///
/// Event plumbing stays in the windowing layer. The display only exposes the
/// resulting state: current extent, resize flag and close flag.
pub trait Display: Send + Sync {
    fn title(&self) -> String;

    /// Current drawable extent (0x0 while minimized)
    fn extent(&self) -> Extent2D;

    /// Poll pending window state
    fn update(&self);

    /// Best buffer count supported by the device for this display
    fn find_best_buffer_count(&self, device: &dyn GraphicsDevice) -> Result<u32>;

    /// Preferred swapchain image format for this display
    fn best_swapchain_format(&self, device: &dyn GraphicsDevice) -> Result<ImageFormat>;

    /// True when the windowing layer reported a resize not yet handled
    fn is_resized(&self) -> bool;

    /// Acknowledge a resize (called by the render target after recreating)
    fn clear_resized(&self);

    /// True once the user asked to close the window
    fn is_closed(&self) -> bool;

    /// Backend downcasting
    fn as_any(&self) -> &dyn Any;
}
