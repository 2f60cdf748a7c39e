/// Render target - a fixed set of attachments rendered into once per frame
///
/// The shared state (attachments, buffer count, frame index, generation,
/// altered flag) lives in `RenderTargetCore`. The two kinds of render target,
/// `ScreenBoundRenderTarget` and `OffScreenRenderTarget`, embed a core and
/// implement the `RenderTarget` trait. Callers are generic over the trait, so
/// the per-frame path is statically dispatched.

use std::sync::{Arc, Weak};
use crate::error::{Error, Result};
use crate::graphics_device::{
    ClearValue, CommandBuffer, Extent2D, Framebuffer, GraphicsDevice, Image, RenderPass,
};
use crate::target::{
    FrameIndex, ImageIndex, RenderTargetAttachment, ResizeEvent, ResizeSignal,
};

// ============================================================================
// RenderTargetCore
// ============================================================================

/// State shared by every render target
pub struct RenderTargetCore {
    attachments: Vec<RenderTargetAttachment>,
    device: Arc<dyn GraphicsDevice>,
    extent: Extent2D,
    buffer_count: u32,
    frame_index: FrameIndex,
    generation: u64,
    altered: bool,
}

impl RenderTargetCore {
    /// Validate and build the shared state
    ///
    /// # Errors
    ///
    /// `InvalidArgument` when `buffer_count` is 0 or `extent` is empty.
    pub fn new(
        device: Arc<dyn GraphicsDevice>,
        extent: Extent2D,
        buffer_count: u32,
        attachments: Vec<RenderTargetAttachment>,
        source: &str,
    ) -> Result<Self> {
        if buffer_count == 0 {
            return Err(Error::InvalidArgument(
                "buffer count must be greater than 0".to_string()
            ).logged(source));
        }
        if extent.is_zero() {
            return Err(Error::InvalidArgument(format!(
                "render target extent must not be empty (got {}x{})",
                extent.width, extent.height
            )).logged(source));
        }

        Ok(Self {
            attachments,
            device,
            extent,
            buffer_count,
            frame_index: FrameIndex::default(),
            generation: 0,
            altered: false,
        })
    }

    pub fn device(&self) -> &Arc<dyn GraphicsDevice> {
        &self.device
    }

    pub fn extent(&self) -> Extent2D {
        self.extent
    }

    pub fn buffer_count(&self) -> u32 {
        self.buffer_count
    }

    pub fn attachments(&self) -> &[RenderTargetAttachment] {
        &self.attachments
    }

    /// Attachment at `index`
    ///
    /// # Errors
    ///
    /// `IndexOutOfRange` when `index >= attachments().len()`.
    pub fn attachment(&self, index: usize) -> Result<&RenderTargetAttachment> {
        self.attachments.get(index).ok_or(Error::IndexOutOfRange {
            index,
            len: self.attachments.len(),
        })
    }

    /// Owning handles of every attachment image, in attachment order
    pub fn attachment_images(&self) -> Vec<Arc<dyn Image>> {
        self.attachments.iter().map(|a| a.image.clone()).collect()
    }

    pub fn clear_values(&self) -> Vec<ClearValue> {
        self.attachments.iter().map(|a| a.clear_value).collect()
    }

    pub fn frame_index(&self) -> FrameIndex {
        self.frame_index
    }

    /// Advance to the next frame-in-flight slot, wrapping at the buffer count
    ///
    /// Called once per completed frame, after submission.
    pub fn increment_frame_index(&mut self) {
        self.frame_index = self.frame_index.next(self.buffer_count);
    }

    /// Number of recreates this render target went through
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Mark bindings as changed; consulted by higher layers, not by the GPU protocol
    pub fn flag_altered(&mut self) {
        self.altered = true;
    }

    pub fn is_altered(&self) -> bool {
        self.altered
    }

    pub fn clear_altered(&mut self) {
        self.altered = false;
    }

    /// Recreate every attachment image at `extent`
    ///
    /// The attachment count, formats, usages, sample counts and clear values
    /// are preserved. On failure the previous attachments are left in place.
    pub fn rebuild_attachments(&mut self, extent: Extent2D, source: &str) -> Result<()> {
        self.replace_attachments(extent, source)?;
        self.generation += 1;
        Ok(())
    }

    /// Resize the attachments at construction time, before anything observed them
    ///
    /// Same as `rebuild_attachments()` without starting a new generation.
    pub fn fit_attachments(&mut self, extent: Extent2D, source: &str) -> Result<()> {
        self.replace_attachments(extent, source)
    }

    fn replace_attachments(&mut self, extent: Extent2D, source: &str) -> Result<()> {
        let mut rebuilt = Vec::with_capacity(self.attachments.len());
        for attachment in &self.attachments {
            let desc = attachment.image.desc().with_extent(extent);
            let image = self.device.create_image(&desc)?;
            if image.desc().format != desc.format {
                return Err(Error::InvalidResource(format!(
                    "attachment '{}' changed format on recreate ({:?} -> {:?})",
                    desc.name, desc.format, image.desc().format
                )).logged(source));
            }
            rebuilt.push(RenderTargetAttachment::new(image, attachment.clear_value));
        }

        // Old images are released here unless a framebuffer still holds them
        self.attachments = rebuilt;
        self.extent = extent;
        Ok(())
    }

    /// Event describing the current attachments, emitted after a recreate
    pub fn resize_event(&self) -> ResizeEvent {
        ResizeEvent {
            extent: self.extent,
            generation: self.generation,
            attachments: self.attachments.iter().map(|a| Arc::downgrade(&a.image)).collect(),
        }
    }
}

// ============================================================================
// RenderTarget trait
// ============================================================================

/// Common per-frame contract of screen-bound and off-screen render targets
pub trait RenderTarget {
    fn core(&self) -> &RenderTargetCore;

    fn core_mut(&mut self) -> &mut RenderTargetCore;

    /// Make the target ready for recording the current frame
    ///
    /// Returns `Ok(false)` when the target must be recreated before rendering.
    fn prepare_new_frame(&mut self) -> Result<bool>;

    fn render_pass(&self) -> &Arc<dyn RenderPass>;

    /// Framebuffer to render into for the current frame
    ///
    /// Screen-bound targets select by `image_index`, off-screen targets by
    /// `frame_index`.
    fn framebuffer(&self, frame_index: FrameIndex, image_index: ImageIndex) -> Result<&Arc<dyn Framebuffer>>;

    /// Clear values in framebuffer attachment order
    fn clear_values(&self) -> Vec<ClearValue>;

    fn resize_signal_mut(&mut self) -> &mut ResizeSignal;

    // ===== PROVIDED =====

    fn attachments(&self) -> &[RenderTargetAttachment] {
        self.core().attachments()
    }

    fn attachment(&self, index: usize) -> Result<&RenderTargetAttachment> {
        self.core().attachment(index)
    }

    /// Non-owning reference to the attachment image at `index`
    fn attachment_image(&self, index: usize) -> Result<Weak<dyn Image>> {
        Ok(Arc::downgrade(&self.core().attachment(index)?.image))
    }

    fn extent(&self) -> Extent2D {
        self.core().extent()
    }

    fn buffer_count(&self) -> u32 {
        self.core().buffer_count()
    }

    fn frame_index(&self) -> FrameIndex {
        self.core().frame_index()
    }

    fn increment_frame_index(&mut self) {
        self.core_mut().increment_frame_index();
    }

    fn generation(&self) -> u64 {
        self.core().generation()
    }

    fn flag_altered(&mut self) {
        self.core_mut().flag_altered();
    }

    fn is_altered(&self) -> bool {
        self.core().is_altered()
    }

    /// Begin this target's render pass on the framebuffer of the current frame
    fn begin_render_pass(
        &self,
        cmd: &mut dyn CommandBuffer,
        frame_index: FrameIndex,
        image_index: ImageIndex,
    ) -> Result<()> {
        let framebuffer = self.framebuffer(frame_index, image_index)?;
        cmd.begin_render_pass(self.render_pass(), framebuffer, &self.clear_values())
    }

    /// End this target's render pass
    fn end_render_pass(&self, cmd: &mut dyn CommandBuffer, _image_index: ImageIndex) -> Result<()> {
        cmd.end_render_pass()
    }
}

#[cfg(test)]
#[path = "render_target_tests.rs"]
mod tests;
