/*!
# Flint Engine

Render-target lifecycle and frame submission for Flint.

This crate provides the platform-agnostic half of the renderer: the render
targets, the frames-in-flight protocol and the processing pipeline that drives
a frame from swapchain acquire to present. GPU work goes through the
`GraphicsDevice` trait family, implemented by backend crates
(`flint_engine_renderer_vulkan`).

## Architecture

- **GraphicsDevice**: Factory trait for displays, images, swapchains and command buffers
- **RenderTarget**: Attachments plus framebuffers, implemented by
  `ScreenBoundRenderTarget` and `OffScreenRenderTarget`
- **FrameSynchronizer**: One host synchronization primitive per frame in flight
- **ProcessingPipeline**: Ordered processing nodes recorded into one command buffer per frame
- **ProcessingNode**: Unit of per-frame work (`OffScreenPass`, `ScreenPass`, `PresentPass`)
*/

// Internal modules
mod error;
mod engine;
pub mod log;
pub mod graphics_device;
pub mod target;
pub mod frame;
pub mod processing;

// Main flint namespace module
pub mod flint {
    // Error types
    pub use crate::error::{Error, Result};

    // Engine singleton (logger)
    pub use crate::engine::Engine;

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
    }

    // Device abstraction consumed by every other module
    pub mod device {
        pub use crate::graphics_device::*;
    }

    // Render targets and resize notifications
    pub mod target {
        pub use crate::target::*;
    }

    // Frames-in-flight synchronization
    pub mod frame {
        pub use crate::frame::*;
    }

    // Processing pipeline and built-in nodes
    pub mod processing {
        pub use crate::processing::*;
    }
}

// Re-export math library at crate root
pub use glam;
