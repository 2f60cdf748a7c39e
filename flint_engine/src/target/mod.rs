//! Render target module
//!
//! A render target owns the attachments a frame is rendered into and drives
//! the per-frame protocol: screen-bound targets acquire and present swapchain
//! images, off-screen targets are always ready.

mod frame_index;
mod attachment;
mod resize_signal;
mod render_target;
mod screen_bound_render_target;
mod off_screen_render_target;

pub use frame_index::{FrameIndex, ImageIndex};
pub use attachment::RenderTargetAttachment;
pub use resize_signal::{ResizeEvent, ResizeListener, ResizeSignal, SubscriptionKey};
pub use render_target::{RenderTarget, RenderTargetCore};
pub use screen_bound_render_target::{FrameState, ScreenBoundRenderTarget};
pub use off_screen_render_target::OffScreenRenderTarget;
