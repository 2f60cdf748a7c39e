/// Swapchain trait - for window presentation

use std::any::Any;
use crate::error::Result;
use crate::graphics_device::{CommandBuffer, Extent2D, Image, ImageFormat};
use crate::target::{FrameIndex, ImageIndex};

/// Presentation mode of a swapchain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PresentMode {
    Immediate,
    #[default]
    MailBox,
    Fifo,
    RelaxedFifo,
    SharedDemandRefresh,
    SharedContinuousRefresh,
}

/// Result of asking the presentation engine for the next image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// An image is ready for rendering
    Acquired(ImageIndex),
    /// An image was acquired but the swapchain no longer matches the surface
    Suboptimal(ImageIndex),
    /// The swapchain can no longer be used with the surface
    OutOfDate,
}

impl AcquireOutcome {
    /// Image index usable for this frame, if the swapchain does not need recreating
    pub fn ready_image(&self) -> Option<ImageIndex> {
        match self {
            AcquireOutcome::Acquired(index) => Some(*index),
            AcquireOutcome::Suboptimal(_) | AcquireOutcome::OutOfDate => None,
        }
    }
}

/// Result of queueing an image for presentation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentOutcome {
    Presented,
    /// Out-of-date or suboptimal: the swapchain must be recreated
    OutOfDate,
}

/// Swapchain for presenting rendered images to a display
///
/// Owns the presentable images. The render target borrows them to build one
/// framebuffer per swapchain image.
pub trait Swapchain: Send + Sync {
    /// Acquire the next available swapchain image
    ///
    /// The presentation engine chooses the image; the returned index need not
    /// follow the frame index. `frame_index` selects the image-available
    /// semaphore of the slot.
    fn acquire_next_image(&mut self, frame_index: FrameIndex) -> Result<AcquireOutcome>;

    /// Queue the image for presentation once the slot's rendering has finished
    fn present(&mut self, frame_index: FrameIndex, image_index: ImageIndex) -> Result<PresentOutcome>;

    /// Recreate the swapchain at a new extent (e.g. after a window resize)
    ///
    /// The image count and present mode are preserved.
    fn recreate(&mut self, extent: Extent2D) -> Result<()>;

    /// Record a blit from `src` into the swapchain image at `image_index`
    ///
    /// Handles layout transitions and format conversion. Must be called while
    /// the command buffer is recording and outside a render pass.
    fn record_present_blit(
        &self,
        cmd: &mut dyn CommandBuffer,
        src: &dyn Image,
        image_index: ImageIndex,
    ) -> Result<()>;

    /// Number of images in the swapchain
    fn image_count(&self) -> u32;

    /// Extent of the swapchain images
    fn extent(&self) -> Extent2D;

    /// Pixel format of the swapchain images
    fn format(&self) -> ImageFormat;

    fn present_mode(&self) -> PresentMode;

    /// Backend downcasting
    fn as_any(&self) -> &dyn Any;
}
