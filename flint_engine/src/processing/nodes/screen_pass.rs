/// Screen pass - records directly into the screen-bound render target

use std::any::Any;
use crate::error::Result;
use crate::graphics_device::CommandBuffer;
use crate::processing::{FrameContext, ProcessingNode, RenderAction};
use crate::target::{
    FrameIndex, ImageIndex, RenderTarget, ResizeEvent, ResizeListener, ScreenBoundRenderTarget,
};

/// Node rendering into the pipeline's screen-bound target
///
/// The framebuffer is picked by swapchain image index. Ending the pass
/// delivers a color buffer to the swapchain image (resolve or blit).
pub struct ScreenPass {
    name: String,
    context: FrameContext,
    action: Box<dyn RenderAction>,
}

impl ScreenPass {
    pub fn new(name: &str, context: FrameContext, action: impl RenderAction + 'static) -> Self {
        Self {
            name: name.to_string(),
            context,
            action: Box::new(action),
        }
    }

    pub fn context(&self) -> &FrameContext {
        &self.context
    }
}

impl ProcessingNode for ScreenPass {
    fn name(&self) -> &str {
        &self.name
    }

    fn process(
        &mut self,
        _previous: Option<&dyn ProcessingNode>,
        command_buffer: &mut dyn CommandBuffer,
        frame_index: FrameIndex,
        image_index: ImageIndex,
        screen: &ScreenBoundRenderTarget,
    ) -> Result<()> {
        screen.begin_render_pass(command_buffer, frame_index, image_index)?;
        self.action.record(command_buffer, &self.context)?;
        screen.end_render_pass(command_buffer, image_index)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl ResizeListener for ScreenPass {
    fn on_resized(&mut self, event: &ResizeEvent) -> Result<()> {
        self.context = self.context.refreshed(event);
        Ok(())
    }
}
