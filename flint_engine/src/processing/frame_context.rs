/// Frame context - what a processing node knows about its pipeline
///
/// Captured when the node is created and replaced through `refreshed()` when
/// the node receives a resize event. Nodes never reach back into the pipeline.

use std::sync::{Arc, Weak};
use crate::graphics_device::{Display, Extent2D, GraphicsDevice, Image, ImageFormat, MultiSampleCount};
use crate::target::ResizeEvent;

#[derive(Clone)]
pub struct FrameContext {
    device: Arc<dyn GraphicsDevice>,
    display: Arc<dyn Display>,
    extent: Extent2D,
    buffer_count: u32,
    multi_sample_count: MultiSampleCount,
    swapchain_format: ImageFormat,
    generation: u64,
    color_buffer: Option<Weak<dyn Image>>,
    depth_buffer: Option<Weak<dyn Image>>,
}

impl FrameContext {
    /// Context without color/depth buffers, single-sampled, generation 0
    pub fn new(
        device: Arc<dyn GraphicsDevice>,
        display: Arc<dyn Display>,
        extent: Extent2D,
        buffer_count: u32,
        swapchain_format: ImageFormat,
    ) -> Self {
        Self {
            device,
            display,
            extent,
            buffer_count,
            multi_sample_count: MultiSampleCount::One,
            swapchain_format,
            generation: 0,
            color_buffer: None,
            depth_buffer: None,
        }
    }

    pub fn with_multi_sample_count(mut self, count: MultiSampleCount) -> Self {
        self.multi_sample_count = count;
        self
    }

    pub fn with_color_buffer(mut self, image: Weak<dyn Image>) -> Self {
        self.color_buffer = Some(image);
        self
    }

    pub fn with_depth_buffer(mut self, image: Weak<dyn Image>) -> Self {
        self.depth_buffer = Some(image);
        self
    }

    pub fn with_generation(mut self, generation: u64) -> Self {
        self.generation = generation;
        self
    }

    /// Context matching the screen-bound render target after `event`
    ///
    /// The color buffer, when present, is attachment 0; the depth buffer
    /// follows it (or is attachment 0 when there is no color buffer).
    pub fn refreshed(&self, event: &ResizeEvent) -> Self {
        let depth_index = if self.color_buffer.is_some() { 1 } else { 0 };
        Self {
            extent: event.extent,
            generation: event.generation,
            color_buffer: self.color_buffer.as_ref().and_then(|_| event.attachment(0)),
            depth_buffer: self.depth_buffer.as_ref().and_then(|_| event.attachment(depth_index)),
            ..self.clone()
        }
    }

    pub fn device(&self) -> &Arc<dyn GraphicsDevice> {
        &self.device
    }

    pub fn display(&self) -> &Arc<dyn Display> {
        &self.display
    }

    pub fn extent(&self) -> Extent2D {
        self.extent
    }

    pub fn buffer_count(&self) -> u32 {
        self.buffer_count
    }

    pub fn multi_sample_count(&self) -> MultiSampleCount {
        self.multi_sample_count
    }

    pub fn swapchain_format(&self) -> ImageFormat {
        self.swapchain_format
    }

    /// Render target generation this context was captured at
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Pipeline color buffer; upgrade it each frame, never keep the strong handle
    pub fn color_buffer(&self) -> Option<Weak<dyn Image>> {
        self.color_buffer.clone()
    }

    pub fn depth_buffer(&self) -> Option<Weak<dyn Image>> {
        self.depth_buffer.clone()
    }
}
