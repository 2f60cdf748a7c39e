/// Render action trait and implementations.
///
/// Defines what a pass node records between begin_render_pass() and
/// end_render_pass().

use crate::error::Result;
use crate::graphics_device::{CommandBuffer, Rect2D, Viewport};
use crate::processing::FrameContext;

/// Action executed inside a pass node's render pass
pub trait RenderAction: Send {
    /// Record commands into the command buffer
    fn record(&mut self, cmd: &mut dyn CommandBuffer, context: &FrameContext) -> Result<()>;
}

/// Full-frame action (data-driven, no closure)
///
/// Sets the viewport and scissor to the whole frame. On its own it leaves
/// the attachments at their clear values; used for clear-only passes and as
/// the first step of fullscreen post-processing.
#[derive(Debug, Default, Clone, Copy)]
pub struct FullFrameAction;

impl RenderAction for FullFrameAction {
    fn record(&mut self, cmd: &mut dyn CommandBuffer, context: &FrameContext) -> Result<()> {
        let extent = context.extent();
        cmd.set_viewport(Viewport {
            x: 0.0,
            y: 0.0,
            width: extent.width as f32,
            height: extent.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        })?;
        cmd.set_scissor(Rect2D {
            x: 0,
            y: 0,
            width: extent.width,
            height: extent.height,
        })
    }
}

/// Custom action (closure-based)
///
/// Executes a user-provided closure for full control over command recording.
pub struct ClosureAction {
    callback: Box<dyn FnMut(&mut dyn CommandBuffer, &FrameContext) -> Result<()> + Send>,
}

impl ClosureAction {
    pub fn new<F>(callback: F) -> Self
    where
        F: FnMut(&mut dyn CommandBuffer, &FrameContext) -> Result<()> + Send + 'static,
    {
        Self { callback: Box::new(callback) }
    }
}

impl RenderAction for ClosureAction {
    fn record(&mut self, cmd: &mut dyn CommandBuffer, context: &FrameContext) -> Result<()> {
        (self.callback)(cmd, context)
    }
}
