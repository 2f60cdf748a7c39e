//! Processing pipeline module
//!
//! A processing pipeline is an ordered list of processing nodes recorded into
//! one command buffer per frame and presented through one screen-bound
//! render target.

mod pipeline_config;
mod frame_context;
mod processing_node;
mod render_action;
mod processing_pipeline;
mod nodes;

pub use pipeline_config::{PipelineConfig, FrameStatus, PipelineStats, DEFAULT_CLEAR_COLOR};
pub use frame_context::FrameContext;
pub use processing_node::ProcessingNode;
pub use render_action::{RenderAction, FullFrameAction, ClosureAction};
pub use processing_pipeline::ProcessingPipeline;
pub use nodes::{OffScreenPass, ScreenPass, PresentPass};
