/// Processing node - one unit of per-frame GPU work in a processing pipeline

use std::any::Any;
use std::sync::Weak;
use crate::error::Result;
use crate::graphics_device::{CommandBuffer, Image};
use crate::target::{FrameIndex, ImageIndex, ScreenBoundRenderTarget};

/// A named unit of per-frame GPU work
///
/// Nodes are created once through `ProcessingPipeline::create_processing_node()`
/// and then processed every frame in registration order. Expensive setup
/// (render targets, pipelines, images) belongs in the constructor; only
/// `process()` runs per frame.
///
/// Nodes owning extent-dependent resources also implement
/// `ResizeListener` and subscribe to the pipeline's resize signal.
pub trait ProcessingNode: Send {
    /// Unique name within the pipeline
    fn name(&self) -> &str;

    /// Record this node's commands for the current frame
    ///
    /// The command buffer is already recording; the node must neither begin,
    /// end nor submit it.
    ///
    /// # Arguments
    ///
    /// * `previous` - Node processed just before this one (`None` for the first node)
    /// * `command_buffer` - Command buffer of the current frame-in-flight slot
    /// * `frame_index` - Frame-in-flight slot (selects per-slot resources)
    /// * `image_index` - Acquired swapchain image (selects screen framebuffers)
    /// * `screen` - The pipeline's screen-bound render target
    fn process(
        &mut self,
        previous: Option<&dyn ProcessingNode>,
        command_buffer: &mut dyn CommandBuffer,
        frame_index: FrameIndex,
        image_index: ImageIndex,
        screen: &ScreenBoundRenderTarget,
    ) -> Result<()>;

    /// Image produced by this node, readable by the next node
    ///
    /// Non-owning: valid until the producer is resized or dropped.
    fn output_image(&self) -> Option<Weak<dyn Image>> {
        None
    }

    /// Downcasting to the concrete node type
    fn as_any(&self) -> &dyn Any;
}
