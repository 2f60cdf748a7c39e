/// Graphics device module - the GPU contracts consumed by render targets and pipelines

// Module declarations
pub mod graphics_device;
pub mod image;
pub mod command_buffer;
pub mod render_pass;
pub mod frame_buffer;
pub mod swapchain;
pub mod display;
pub mod sync;

// Re-export everything from graphics_device.rs
pub use graphics_device::*;

// Re-export from other modules
pub use image::*;
pub use command_buffer::*;
pub use render_pass::*;
pub use frame_buffer::*;
pub use swapchain::*;
pub use display::*;
pub use sync::*;

// Mock graphics device for tests (no GPU required)
#[cfg(test)]
pub mod mock_graphics_device;
