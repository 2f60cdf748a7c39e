/// Processing pipeline configuration and per-frame results

use std::time::Duration;
use glam::Vec4;
use crate::frame::INFINITE_TIMEOUT;
use crate::graphics_device::{Extent2D, MultiSampleCount, PresentMode};

/// Clear color of the pipeline's color buffer
pub const DEFAULT_CLEAR_COLOR: Vec4 = Vec4::new(32.0 / 255.0, 32.0 / 255.0, 32.0 / 255.0, 1.0);

/// Processing pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Initial window size
    pub frame_extent: Extent2D,
    /// Window title
    pub display_title: String,
    /// Number of frames in flight; 0 asks the display for the best supported count
    pub pipeline_count: u32,
    /// Sample count; anything above One forces a color buffer (resolved to the swapchain)
    pub msaa_count: MultiSampleCount,
    /// Create a color buffer even without multisampling
    pub force_color_buffer: bool,
    /// Create a depth buffer
    pub force_depth_buffer: bool,
    pub present_mode: PresentMode,
    /// Clear color of the swapchain image when there is no color buffer
    pub swapchain_clear_color: Vec4,
    /// Timeout of the per-frame host wait; expiry is fatal
    pub frame_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            frame_extent: Extent2D::new(1280, 720),
            display_title: "Flint".to_string(),
            pipeline_count: 0,
            msaa_count: MultiSampleCount::One,
            force_color_buffer: false,
            force_depth_buffer: false,
            present_mode: PresentMode::MailBox,
            swapchain_clear_color: Vec4::new(0.0, 0.0, 0.0, 1.0),
            frame_timeout: INFINITE_TIMEOUT,
        }
    }
}

impl PipelineConfig {
    /// True when the configuration asks for a color buffer attachment
    pub fn needs_color_buffer(&self) -> bool {
        self.msaa_count != MultiSampleCount::One || self.force_color_buffer
    }
}

/// What `ProcessingPipeline::execute()` did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// Recorded, submitted and presented
    ///
    /// Also reported when the display asked for a recreate that was
    /// postponed because its extent is empty.
    Rendered,
    /// Presented, then the render target was recreated (out-of-date or resized display)
    RenderedAndRecreated,
    /// Nothing was submitted; the render target was recreated (or is waiting for a non-empty display)
    Skipped,
}

/// Counters maintained by the pipeline
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Frames submitted to the GPU
    pub frames_rendered: u64,
    /// `execute()` calls that submitted nothing
    pub frames_skipped: u64,
    /// Successful render target recreations
    pub recreations: u64,
}
