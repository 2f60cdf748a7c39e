/// Off-screen render target - rendered into, then sampled or copied by later passes
///
/// Has no swapchain and no display, so preparing a frame always succeeds.
/// Keeps one framebuffer per frame-in-flight slot, selected by frame index.

use std::sync::Arc;
use crate::error::{Error, Result};
use crate::graphics_device::{
    ClearValue, Extent2D, Framebuffer, FramebufferDesc, GraphicsDevice, RenderPass, RenderPassDesc,
};
use crate::target::{
    FrameIndex, ImageIndex, RenderTarget, RenderTargetAttachment, RenderTargetCore, ResizeSignal,
};
use crate::engine_debug;

const SOURCE: &str = "flint::OffScreenRenderTarget";

/// Render target not bound to a display
pub struct OffScreenRenderTarget {
    framebuffers: Vec<Arc<dyn Framebuffer>>,
    render_pass: Arc<dyn RenderPass>,
    core: RenderTargetCore,
    resize_signal: ResizeSignal,
}

impl OffScreenRenderTarget {
    /// # Errors
    ///
    /// `InvalidArgument` when `attachments` is empty, when `buffer_count` is 0
    /// or when `extent` is empty.
    pub fn new(
        device: Arc<dyn GraphicsDevice>,
        extent: Extent2D,
        buffer_count: u32,
        attachments: Vec<RenderTargetAttachment>,
    ) -> Result<Self> {
        if attachments.is_empty() {
            return Err(Error::InvalidArgument(
                "an off-screen render target needs at least one attachment".to_string()
            ).logged(SOURCE));
        }

        let core = RenderTargetCore::new(device, extent, buffer_count, attachments, SOURCE)?;
        let (render_pass, framebuffers) = Self::build_framebuffers(&core)?;

        Ok(Self {
            framebuffers,
            render_pass,
            core,
            resize_signal: ResizeSignal::new(),
        })
    }

    /// Always ready: there is no presentation engine to race against
    pub fn prepare_new_frame(&mut self) -> Result<bool> {
        Ok(true)
    }

    /// Rebuild the attachment images (and the framebuffers using them) at `extent`
    ///
    /// The frame index and buffer count are preserved. Subscribers of the
    /// resize signal are notified afterwards.
    pub fn recreate(&mut self, extent: Extent2D) -> Result<()> {
        if extent.is_zero() {
            return Err(Error::InvalidArgument(format!(
                "cannot recreate an off-screen render target at {}x{}",
                extent.width, extent.height
            )).logged(SOURCE));
        }

        self.core.device().wait_idle()?;

        self.framebuffers.clear();
        self.core.rebuild_attachments(extent, SOURCE)?;
        let (render_pass, framebuffers) = Self::build_framebuffers(&self.core)?;
        self.render_pass = render_pass;
        self.framebuffers = framebuffers;

        engine_debug!(
            SOURCE,
            "Recreated at {}x{} (generation {})",
            extent.width,
            extent.height,
            self.core.generation()
        );

        let event = self.core.resize_event();
        self.resize_signal.emit(&event)?;
        Ok(())
    }

    pub fn framebuffers(&self) -> &[Arc<dyn Framebuffer>] {
        &self.framebuffers
    }

    fn build_framebuffers(core: &RenderTargetCore) -> Result<(Arc<dyn RenderPass>, Vec<Arc<dyn Framebuffer>>)> {
        let device = core.device();
        let images = core.attachment_images();
        let render_pass = device.create_render_pass(&RenderPassDesc::for_images(&images, None))?;

        let framebuffers = (0..core.buffer_count())
            .map(|_| {
                device.create_framebuffer(&FramebufferDesc {
                    render_pass: &render_pass,
                    attachments: images.clone(),
                    swapchain_image: None,
                    extent: core.extent(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok((render_pass, framebuffers))
    }
}

impl RenderTarget for OffScreenRenderTarget {
    fn core(&self) -> &RenderTargetCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut RenderTargetCore {
        &mut self.core
    }

    fn prepare_new_frame(&mut self) -> Result<bool> {
        OffScreenRenderTarget::prepare_new_frame(self)
    }

    fn render_pass(&self) -> &Arc<dyn RenderPass> {
        &self.render_pass
    }

    fn framebuffer(&self, frame_index: FrameIndex, _image_index: ImageIndex) -> Result<&Arc<dyn Framebuffer>> {
        self.framebuffers.get(frame_index.as_usize()).ok_or(Error::IndexOutOfRange {
            index: frame_index.as_usize(),
            len: self.framebuffers.len(),
        })
    }

    fn clear_values(&self) -> Vec<ClearValue> {
        self.core.clear_values()
    }

    fn resize_signal_mut(&mut self) -> &mut ResizeSignal {
        &mut self.resize_signal
    }
}

#[cfg(test)]
#[path = "off_screen_render_target_tests.rs"]
mod tests;
