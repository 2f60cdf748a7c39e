/// Off-screen pass - renders into its own off-screen target and outputs the color image

use std::any::Any;
use std::sync::Weak;
use glam::Vec4;
use crate::error::Result;
use crate::graphics_device::{CommandBuffer, Image, ImageDesc, ImageFormat, ImageUsage, MultiSampleCount};
use crate::processing::{FrameContext, ProcessingNode, RenderAction};
use crate::target::{
    FrameIndex, ImageIndex, OffScreenRenderTarget, RenderTarget, RenderTargetAttachment,
    ResizeEvent, ResizeListener, ScreenBoundRenderTarget,
};

/// Node owning an off-screen render target
///
/// Attachment 0 is a single-sampled color image usable as a copy source and
/// for sampling; it is the node's output. An optional depth attachment
/// follows. The target follows the screen's extent when the node is
/// subscribed to the pipeline's resize signal.
pub struct OffScreenPass {
    name: String,
    context: FrameContext,
    target: OffScreenRenderTarget,
    action: Box<dyn RenderAction>,
}

impl OffScreenPass {
    /// # Arguments
    ///
    /// * `name` - Node name (unique within the pipeline)
    /// * `context` - Frame context handed out by the pipeline
    /// * `format` - Color attachment format
    /// * `clear_color` - Color the attachment is cleared to every frame
    /// * `with_depth` - Also create a D24S8 depth attachment
    /// * `action` - Commands recorded inside the render pass
    pub fn new(
        name: &str,
        context: FrameContext,
        format: ImageFormat,
        clear_color: Vec4,
        with_depth: bool,
        action: impl RenderAction + 'static,
    ) -> Result<Self> {
        let device = context.device().clone();
        let extent = context.extent();

        let color = device.create_image(&ImageDesc {
            name: format!("{}::color", name),
            extent,
            format,
            usage: ImageUsage::COLOR | ImageUsage::SAMPLED | ImageUsage::TRANSFER_SRC,
            sample_count: MultiSampleCount::One,
        })?;
        let mut attachments = vec![RenderTargetAttachment::color(color, clear_color)];

        if with_depth {
            let depth = device.create_image(&ImageDesc {
                name: format!("{}::depth", name),
                extent,
                format: ImageFormat::D24_UNORM_S8_UINT,
                usage: ImageUsage::DEPTH,
                sample_count: MultiSampleCount::One,
            })?;
            attachments.push(RenderTargetAttachment::depth(depth, 1.0, 0));
        }

        let target = OffScreenRenderTarget::new(device, extent, context.buffer_count(), attachments)?;

        Ok(Self {
            name: name.to_string(),
            context,
            target,
            action: Box::new(action),
        })
    }

    pub fn render_target(&self) -> &OffScreenRenderTarget {
        &self.target
    }

    /// Mutable access, e.g. to subscribe to this node's own resize signal
    pub fn render_target_mut(&mut self) -> &mut OffScreenRenderTarget {
        &mut self.target
    }

    pub fn context(&self) -> &FrameContext {
        &self.context
    }
}

impl ProcessingNode for OffScreenPass {
    fn name(&self) -> &str {
        &self.name
    }

    fn process(
        &mut self,
        _previous: Option<&dyn ProcessingNode>,
        command_buffer: &mut dyn CommandBuffer,
        frame_index: FrameIndex,
        image_index: ImageIndex,
        _screen: &ScreenBoundRenderTarget,
    ) -> Result<()> {
        self.target.prepare_new_frame()?;
        self.target.begin_render_pass(command_buffer, frame_index, image_index)?;
        self.action.record(command_buffer, &self.context)?;
        self.target.end_render_pass(command_buffer, image_index)
    }

    fn output_image(&self) -> Option<Weak<dyn Image>> {
        self.target.attachment_image(0).ok()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl ResizeListener for OffScreenPass {
    fn on_resized(&mut self, event: &ResizeEvent) -> Result<()> {
        self.context = self.context.refreshed(event);
        self.target.recreate(event.extent)
    }
}
