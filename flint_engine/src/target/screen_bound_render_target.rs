/// Screen-bound render target - a render target presented to a display
///
/// Adds the acquire/present half of the frame protocol on top of
/// `RenderTargetCore`:
///
/// ```text
/// Ready --prepare_new_frame--> Acquired --mark_submitted--> Submitted --present_to_display--> Ready
///   |  acquire out-of-date/suboptimal                          |  present out-of-date / display resized
///   +--------------------------> RecreateNeeded <--------------+
///                                      |
///                                      +--recreate--> Ready
/// ```
///
/// Out-of-date and suboptimal swapchains are reported as `Ok(false)`, never
/// as errors: during a live resize they are expected on almost every frame.

use std::sync::Arc;
use glam::Vec4;
use crate::error::{Error, Result};
use crate::graphics_device::{
    ClearValue, CommandBuffer, Display, Extent2D, Framebuffer, FramebufferDesc,
    GraphicsDevice, Image, LoadOp, PresentMode, PresentOutcome, RenderPass, RenderPassDesc,
    Swapchain, SwapchainAttachmentDesc,
};
use crate::target::{
    FrameIndex, ImageIndex, RenderTarget, RenderTargetAttachment, RenderTargetCore, ResizeSignal,
};
use crate::{engine_debug, engine_info, engine_trace};

const SOURCE: &str = "flint::ScreenBoundRenderTarget";

/// Position of a screen-bound render target in the per-frame protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    /// Waiting for `prepare_new_frame()`
    Ready,
    /// A swapchain image is acquired; commands may be recorded and submitted
    Acquired,
    /// The frame was submitted; waiting for `present_to_display()`
    Submitted,
    /// The swapchain or the display changed; `recreate()` must run before the next frame
    RecreateNeeded,
}

/// Render target bound to a swapchain and a display
pub struct ScreenBoundRenderTarget {
    // Drop order: framebuffers reference swapchain images and attachments
    framebuffers: Vec<Arc<dyn Framebuffer>>,
    render_pass: Arc<dyn RenderPass>,
    swapchain: Box<dyn Swapchain>,
    core: RenderTargetCore,
    display: Arc<dyn Display>,
    swapchain_clear_color: Vec4,
    image_index: Option<ImageIndex>,
    state: FrameState,
    should_recreate_resources: bool,
    resize_signal: ResizeSignal,
}

impl ScreenBoundRenderTarget {
    /// Create the swapchain, render pass and per-image framebuffers
    ///
    /// # Arguments
    ///
    /// * `device` - Device creating every GPU object of the target
    /// * `display` - Display presented to
    /// * `extent` - Initial extent of the attachments
    /// * `buffer_count` - Number of frames in flight (also the requested swapchain image count)
    /// * `attachments` - Owned attachments; color first, depth after
    /// * `present_mode` - Requested presentation mode
    /// * `swapchain_clear_color` - Clear color of the swapchain image when no color attachment exists
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for a zero buffer count or an empty extent, plus any
    /// device error.
    pub fn new(
        device: Arc<dyn GraphicsDevice>,
        display: Arc<dyn Display>,
        extent: Extent2D,
        buffer_count: u32,
        attachments: Vec<RenderTargetAttachment>,
        present_mode: PresentMode,
        swapchain_clear_color: Vec4,
    ) -> Result<Self> {
        let mut core = RenderTargetCore::new(device.clone(), extent, buffer_count, attachments, SOURCE)?;
        let swapchain = device.create_swapchain(&display, buffer_count, present_mode)?;

        // The surface decides the swapchain extent; attachments must match it
        let swapchain_extent = swapchain.extent();
        if swapchain_extent != extent {
            engine_debug!(
                SOURCE,
                "Swapchain extent {}x{} differs from requested {}x{}, resizing attachments",
                swapchain_extent.width,
                swapchain_extent.height,
                extent.width,
                extent.height
            );
            core.fit_attachments(swapchain_extent, SOURCE)?;
        }
        let (render_pass, framebuffers) = Self::build_framebuffers(&core, swapchain.as_ref())?;

        engine_info!(
            SOURCE,
            "Created {}x{} with {} frames in flight, {} swapchain images, {} attachments",
            swapchain_extent.width,
            swapchain_extent.height,
            buffer_count,
            swapchain.image_count(),
            core.attachments().len()
        );

        Ok(Self {
            framebuffers,
            render_pass,
            swapchain,
            core,
            display,
            swapchain_clear_color,
            image_index: None,
            state: FrameState::Ready,
            should_recreate_resources: false,
            resize_signal: ResizeSignal::new(),
        })
    }

    // ===== FRAME PROTOCOL =====

    /// Acquire the next swapchain image
    ///
    /// The host wait on the slot's synchronization primitive is done by the
    /// caller beforehand. Returns `Ok(false)` when the swapchain is out of date
    /// or suboptimal, or when a previous recreate was skipped; the caller must
    /// then `recreate()` and skip the frame.
    pub fn prepare_new_frame(&mut self) -> Result<bool> {
        match self.state {
            FrameState::Ready => {}
            FrameState::RecreateNeeded => return Ok(false),
            state => {
                return Err(Error::InvalidOperation(format!(
                    "prepare_new_frame called in state {:?}", state
                )).logged(SOURCE));
            }
        }

        let frame_index = self.core.frame_index();
        let outcome = self.swapchain.acquire_next_image(frame_index)?;
        match outcome.ready_image() {
            Some(image_index) => {
                engine_trace!(SOURCE, "Acquired {} for {}", image_index, frame_index);
                self.image_index = Some(image_index);
                self.state = FrameState::Acquired;
                Ok(true)
            }
            None => {
                engine_debug!(SOURCE, "Acquire on {} reported {:?}, recreate needed", frame_index, outcome);
                self.image_index = None;
                self.state = FrameState::RecreateNeeded;
                Ok(false)
            }
        }
    }

    /// Record that the current frame's commands were submitted
    pub fn mark_submitted(&mut self) -> Result<()> {
        if self.state != FrameState::Acquired {
            return Err(Error::InvalidOperation(format!(
                "mark_submitted called in state {:?}", self.state
            )).logged(SOURCE));
        }
        self.state = FrameState::Submitted;
        Ok(())
    }

    /// Present the current image
    ///
    /// Returns `Ok(false)` when the swapchain reports out-of-date/suboptimal
    /// or when the display flagged a resize; the caller must then `recreate()`.
    pub fn present_to_display(&mut self) -> Result<bool> {
        if self.state != FrameState::Submitted {
            return Err(Error::InvalidOperation(format!(
                "present_to_display called in state {:?}", self.state
            )).logged(SOURCE));
        }
        let image_index = self.image_index.take().ok_or_else(|| {
            Error::InvalidOperation("present_to_display without an acquired image".to_string())
                .logged(SOURCE)
        })?;

        let frame_index = self.core.frame_index();
        let outcome = self.swapchain.present(frame_index, image_index)?;
        let resized = self.display.is_resized();

        if outcome == PresentOutcome::Presented && !resized {
            self.state = FrameState::Ready;
            return Ok(true);
        }

        engine_debug!(
            SOURCE,
            "Present of {} reported {:?} (display resized: {}), recreate needed",
            image_index,
            outcome,
            resized
        );
        self.state = FrameState::RecreateNeeded;
        Ok(false)
    }

    /// Rebuild the swapchain, attachments, render pass and framebuffers for the display's extent
    ///
    /// The swapchain is rebuilt first and the attachments follow the extent it
    /// actually got, which the surface may pick differently. The buffer count, attachment count/formats and frame index are
    /// preserved. When the display is minimized (empty extent) nothing is
    /// rebuilt and the target stays in `RecreateNeeded`. Subscribers of the
    /// resize signal are notified after a successful rebuild.
    pub fn recreate(&mut self) -> Result<()> {
        let extent = self.display.extent();
        if extent.is_zero() {
            engine_debug!(SOURCE, "Display extent is empty, recreate postponed");
            self.image_index = None;
            self.state = FrameState::RecreateNeeded;
            return Ok(());
        }

        self.core.device().wait_idle()?;

        // Release the old framebuffers before their attachments are replaced
        self.framebuffers.clear();
        self.swapchain.recreate(extent)?;
        let swapchain_extent = self.swapchain.extent();
        self.core.rebuild_attachments(swapchain_extent, SOURCE)?;
        self.display.clear_resized();

        let (render_pass, framebuffers) = Self::build_framebuffers(&self.core, self.swapchain.as_ref())?;
        self.render_pass = render_pass;
        self.framebuffers = framebuffers;

        self.image_index = None;
        self.state = FrameState::Ready;
        self.should_recreate_resources = true;

        engine_debug!(
            SOURCE,
            "Recreated at {}x{} (generation {}), {}",
            swapchain_extent.width,
            swapchain_extent.height,
            self.core.generation(),
            self.core.frame_index()
        );

        let event = self.core.resize_event();
        self.resize_signal.emit(&event)?;
        Ok(())
    }

    // ===== ACCESSORS =====

    /// Swapchain image acquired for the current frame
    ///
    /// `None` outside of the acquire..present window.
    pub fn image_index(&self) -> Option<ImageIndex> {
        self.image_index
    }

    pub fn state(&self) -> FrameState {
        self.state
    }

    pub fn swapchain(&self) -> &dyn Swapchain {
        self.swapchain.as_ref()
    }

    pub fn display(&self) -> &Arc<dyn Display> {
        &self.display
    }

    pub fn framebuffers(&self) -> &[Arc<dyn Framebuffer>] {
        &self.framebuffers
    }

    /// True after a recreate until dependents acknowledge it
    pub fn should_recreate_resources(&self) -> bool {
        self.should_recreate_resources
    }

    pub fn acknowledge_recreated_resources(&mut self) {
        self.should_recreate_resources = false;
    }

    /// Blit `src` into the swapchain image acquired for this frame
    pub fn record_present_blit(
        &self,
        cmd: &mut dyn CommandBuffer,
        src: &dyn Image,
        image_index: ImageIndex,
    ) -> Result<()> {
        self.swapchain.record_present_blit(cmd, src, image_index)
    }

    // ===== INTERNAL =====

    /// How the swapchain image takes part in the render pass
    ///
    /// - no color attachment: rendered to directly, cleared to the swapchain clear color
    /// - multisampled color attachment: resolve target
    /// - single-sampled color attachment: not in the pass, filled by a blit at the end
    fn swapchain_attachment(core: &RenderTargetCore, swapchain: &dyn Swapchain) -> Option<SwapchainAttachmentDesc> {
        match core.attachments().iter().find(|a| !a.is_depth()) {
            None => Some(SwapchainAttachmentDesc {
                format: swapchain.format(),
                load_op: LoadOp::Clear,
            }),
            Some(color) if color.image.desc().sample_count.samples() > 1 => Some(SwapchainAttachmentDesc {
                format: swapchain.format(),
                load_op: LoadOp::DontCare,
            }),
            Some(_) => None,
        }
    }

    fn build_framebuffers(
        core: &RenderTargetCore,
        swapchain: &dyn Swapchain,
    ) -> Result<(Arc<dyn RenderPass>, Vec<Arc<dyn Framebuffer>>)> {
        let device = core.device();
        let images = core.attachment_images();
        let swapchain_attachment = Self::swapchain_attachment(core, swapchain);
        let uses_swapchain_image = swapchain_attachment.is_some();

        let render_pass = device.create_render_pass(&RenderPassDesc::for_images(&images, swapchain_attachment))?;

        let framebuffers = (0..swapchain.image_count())
            .map(|index| {
                device.create_framebuffer(&FramebufferDesc {
                    render_pass: &render_pass,
                    attachments: images.clone(),
                    swapchain_image: uses_swapchain_image.then_some((swapchain, ImageIndex::new(index))),
                    extent: swapchain.extent(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok((render_pass, framebuffers))
    }

    /// Color attachment blitted to the swapchain at the end of the screen pass
    fn blit_source(&self) -> Option<&RenderTargetAttachment> {
        self.core
            .attachments()
            .iter()
            .find(|a| !a.is_depth())
            .filter(|a| a.image.desc().sample_count.samples() == 1)
    }
}

impl RenderTarget for ScreenBoundRenderTarget {
    fn core(&self) -> &RenderTargetCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut RenderTargetCore {
        &mut self.core
    }

    fn prepare_new_frame(&mut self) -> Result<bool> {
        ScreenBoundRenderTarget::prepare_new_frame(self)
    }

    fn render_pass(&self) -> &Arc<dyn RenderPass> {
        &self.render_pass
    }

    fn framebuffer(&self, _frame_index: FrameIndex, image_index: ImageIndex) -> Result<&Arc<dyn Framebuffer>> {
        self.framebuffers.get(image_index.as_usize()).ok_or(Error::IndexOutOfRange {
            index: image_index.as_usize(),
            len: self.framebuffers.len(),
        })
    }

    fn clear_values(&self) -> Vec<ClearValue> {
        let mut values = self.core.clear_values();
        if Self::swapchain_attachment(&self.core, self.swapchain.as_ref()).is_some() {
            values.push(ClearValue::Color(self.swapchain_clear_color));
        }
        values
    }

    fn resize_signal_mut(&mut self) -> &mut ResizeSignal {
        &mut self.resize_signal
    }

    fn end_render_pass(&self, cmd: &mut dyn CommandBuffer, image_index: ImageIndex) -> Result<()> {
        cmd.end_render_pass()?;
        if let Some(color) = self.blit_source() {
            self.swapchain.record_present_blit(cmd, color.image.as_ref(), image_index)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "screen_bound_render_target_tests.rs"]
mod tests;
