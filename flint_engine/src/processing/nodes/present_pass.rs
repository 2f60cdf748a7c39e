/// Present pass - moves the previous node's output onto the screen

use std::any::Any;
use std::sync::Weak;
use crate::error::{Error, Result};
use crate::graphics_device::{CommandBuffer, Image, MultiSampleCount};
use crate::processing::{FrameContext, ProcessingNode};
use crate::target::{
    FrameIndex, ImageIndex, ResizeEvent, ResizeListener, ScreenBoundRenderTarget,
};

const SOURCE: &str = "flint::PresentPass";

/// Node consuming the previous node's output image
///
/// The output is borrowed, never owned: the node keeps the `Weak` handle it
/// was given and upgrades it only while recording. When the pipeline has a
/// single-sampled color buffer the output is copied into it and the color
/// buffer is blitted to the swapchain image. Otherwise the output is blitted
/// to the swapchain image directly.
pub struct PresentPass {
    name: String,
    context: FrameContext,
    bound_input: Option<Weak<dyn Image>>,
}

impl PresentPass {
    pub fn new(name: &str, context: FrameContext) -> Self {
        Self {
            name: name.to_string(),
            context,
            bound_input: None,
        }
    }

    /// Image consumed during the last processed frame
    ///
    /// Cleared on resize.
    pub fn bound_input(&self) -> Option<&Weak<dyn Image>> {
        self.bound_input.as_ref()
    }

    pub fn context(&self) -> &FrameContext {
        &self.context
    }
}

impl ProcessingNode for PresentPass {
    fn name(&self) -> &str {
        &self.name
    }

    fn process(
        &mut self,
        previous: Option<&dyn ProcessingNode>,
        command_buffer: &mut dyn CommandBuffer,
        _frame_index: FrameIndex,
        image_index: ImageIndex,
        screen: &ScreenBoundRenderTarget,
    ) -> Result<()> {
        let previous = previous.ok_or_else(|| {
            Error::InvalidOperation(format!("'{}' needs a previous node to present", self.name))
                .logged(SOURCE)
        })?;
        let input = previous.output_image().ok_or_else(|| {
            Error::InvalidOperation(format!("'{}' produces no output image", previous.name()))
                .logged(SOURCE)
        })?;
        let source = input.upgrade().ok_or_else(|| {
            Error::InvalidResource(format!("output image of '{}' was released", previous.name()))
                .logged(SOURCE)
        })?;

        let color_buffer = self
            .context
            .color_buffer()
            .and_then(|weak| weak.upgrade())
            .filter(|color| color.desc().sample_count == MultiSampleCount::One);

        match color_buffer {
            Some(color) => {
                command_buffer.copy_image(source.as_ref(), color.as_ref())?;
                screen.record_present_blit(command_buffer, color.as_ref(), image_index)?;
            }
            None => {
                screen.record_present_blit(command_buffer, source.as_ref(), image_index)?;
            }
        }

        self.bound_input = Some(input);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl ResizeListener for PresentPass {
    fn on_resized(&mut self, event: &ResizeEvent) -> Result<()> {
        self.context = self.context.refreshed(event);
        self.bound_input = None;
        Ok(())
    }
}
