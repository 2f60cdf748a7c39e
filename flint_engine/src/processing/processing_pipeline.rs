/// Processing pipeline - drives the per-frame execute loop
///
/// Owns one screen-bound render target, one command buffer allocator with a
/// command buffer per frame-in-flight slot, one frame synchronizer and the
/// ordered list of processing nodes.
///
/// Per `execute()`:
/// 1. wait on the slot's host synchronization primitive (the only blocking point)
/// 2. acquire a swapchain image; on out-of-date, recreate and skip the frame
/// 3. reset the slot's primitive and begin the slot's command buffer
/// 4. process every node in order, threading the previous node through
/// 5. execute secondary commands, end, submit with the slot's primitive
/// 6. present; on out-of-date or display resize, recreate
/// 7. advance the frame index

use std::sync::{Arc, Mutex, MutexGuard};
use rustc_hash::FxHashMap;
use crate::error::{Error, Result};
use crate::frame::FrameSynchronizer;
use crate::graphics_device::{
    CommandBuffer, CommandBufferAllocator, Display, Extent2D, GraphicsDevice, Image, ImageDesc,
    ImageFormat, ImageUsage, MultiSampleCount, PresentSync,
};
use crate::processing::{
    FrameContext, FrameStatus, PipelineConfig, PipelineStats, ProcessingNode, DEFAULT_CLEAR_COLOR,
};
use crate::target::{
    FrameIndex, ImageIndex, RenderTarget, RenderTargetAttachment, ResizeListener,
    ScreenBoundRenderTarget, SubscriptionKey,
};
use crate::{engine_debug, engine_info, engine_warn};

const SOURCE: &str = "flint::ProcessingPipeline";

/// Ordered processing nodes sharing one screen-bound render target
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use flint_engine::flint::{Result, device::GraphicsDevice};
/// use flint_engine::flint::processing::{
///     ProcessingPipeline, PipelineConfig, OffScreenPass, PresentPass, FullFrameAction,
/// };
///
/// fn run(device: Arc<dyn GraphicsDevice>) -> Result<()> {
///     let mut pipeline = ProcessingPipeline::new(device, PipelineConfig::default())?;
///     let format = pipeline.swapchain_format();
///     pipeline.create_subscribed_processing_node(|ctx| {
///         OffScreenPass::new("scene", ctx, format, flint_engine::glam::Vec4::ONE, true, FullFrameAction)
///     })?;
///     pipeline.create_subscribed_processing_node(|ctx| Ok(PresentPass::new("present", ctx)))?;
///
///     while !pipeline.display().is_closed() {
///         pipeline.update_display();
///         pipeline.execute()?;
///     }
///     Ok(())
/// }
/// ```
pub struct ProcessingPipeline {
    // Drop order: nodes and per-frame objects first, then the render target,
    // the allocator, the display and finally the device
    nodes: Vec<Arc<Mutex<dyn ProcessingNode>>>,
    node_indices: FxHashMap<String, usize>,
    command_buffers: Vec<Box<dyn CommandBuffer>>,
    synchronizer: FrameSynchronizer,
    screen_target: ScreenBoundRenderTarget,
    allocator: Box<dyn CommandBufferAllocator>,
    display: Arc<dyn Display>,
    device: Arc<dyn GraphicsDevice>,
    config: PipelineConfig,
    swapchain_format: ImageFormat,
    has_color_buffer: bool,
    has_depth_buffer: bool,
    executed: bool,
    /// A frame failed after its fence was reset; that fence never signals again
    failed: bool,
    stats: PipelineStats,
}

impl ProcessingPipeline {
    /// Create the display, render target, command buffers and synchronizer
    ///
    /// A color buffer is created when `config.msaa_count` is above One or
    /// `config.force_color_buffer` is set; a depth buffer when
    /// `config.force_depth_buffer` is set. With `config.pipeline_count == 0`
    /// the display picks the buffer count.
    pub fn new(device: Arc<dyn GraphicsDevice>, config: PipelineConfig) -> Result<Self> {
        let display = device.create_display(config.frame_extent, &config.display_title)?;

        let buffer_count = if config.pipeline_count == 0 {
            display.find_best_buffer_count(device.as_ref())?
        } else {
            config.pipeline_count
        };
        let extent = display.extent();
        let swapchain_format = display.best_swapchain_format(device.as_ref())?;

        let has_color_buffer = config.needs_color_buffer();
        let has_depth_buffer = config.force_depth_buffer;

        let mut attachments = Vec::new();
        if has_color_buffer {
            let image = device.create_image(&ImageDesc {
                name: "flint::color_buffer".to_string(),
                extent,
                format: swapchain_format,
                usage: ImageUsage::COLOR | ImageUsage::SAMPLED | ImageUsage::TRANSFER_SRC | ImageUsage::TRANSFER_DST,
                sample_count: config.msaa_count,
            })?;
            attachments.push(RenderTargetAttachment::color(image, DEFAULT_CLEAR_COLOR));
        }
        if has_depth_buffer {
            let image = device.create_image(&ImageDesc {
                name: "flint::depth_buffer".to_string(),
                extent,
                format: ImageFormat::D24_UNORM_S8_UINT,
                usage: ImageUsage::DEPTH,
                sample_count: config.msaa_count,
            })?;
            attachments.push(RenderTargetAttachment::depth(image, 1.0, 0));
        }

        let screen_target = ScreenBoundRenderTarget::new(
            device.clone(),
            display.clone(),
            extent,
            buffer_count,
            attachments,
            config.present_mode,
            config.swapchain_clear_color,
        )?;

        let allocator = device.create_command_buffer_allocator(buffer_count)?;
        let command_buffers = allocator.create_command_buffers()?;
        if command_buffers.len() != buffer_count as usize {
            return Err(Error::InvalidResource(format!(
                "command buffer allocator returned {} buffers, expected {}",
                command_buffers.len(),
                buffer_count
            )).logged(SOURCE));
        }

        let synchronizer = FrameSynchronizer::new(device.as_ref(), buffer_count, config.frame_timeout)?;

        engine_info!(
            SOURCE,
            "Created '{}' {}x{}: {} frames in flight, {:?}, color buffer: {}, depth buffer: {}",
            config.display_title,
            screen_target.extent().width,
            screen_target.extent().height,
            buffer_count,
            config.msaa_count,
            has_color_buffer,
            has_depth_buffer
        );

        Ok(Self {
            nodes: Vec::new(),
            node_indices: FxHashMap::default(),
            command_buffers,
            synchronizer,
            screen_target,
            allocator,
            display,
            device,
            config,
            swapchain_format,
            has_color_buffer,
            has_depth_buffer,
            executed: false,
            failed: false,
            stats: PipelineStats::default(),
        })
    }

    // ===== NODE REGISTRATION =====

    /// Build a node from the current frame context and append it to the pipeline
    ///
    /// # Errors
    ///
    /// - `InvalidOperation` once `execute()` has been called
    /// - `InvalidArgument` when a node with the same name already exists
    /// - any error returned by `build`
    pub fn create_processing_node<T, F>(&mut self, build: F) -> Result<Arc<Mutex<T>>>
    where
        T: ProcessingNode + 'static,
        F: FnOnce(FrameContext) -> Result<T>,
    {
        if self.executed {
            return Err(Error::InvalidOperation(
                "processing nodes must be created before the first execute()".to_string()
            ).logged(SOURCE));
        }

        let node = build(self.frame_context())?;
        let name = node.name().to_string();
        if self.node_indices.contains_key(&name) {
            return Err(Error::InvalidArgument(format!(
                "ProcessingNode '{}' already exists", name
            )).logged(SOURCE));
        }

        let node = Arc::new(Mutex::new(node));
        let shared: Arc<Mutex<dyn ProcessingNode>> = node.clone();
        self.node_indices.insert(name.clone(), self.nodes.len());
        self.nodes.push(shared);

        engine_debug!(SOURCE, "Added processing node '{}' at position {}", name, self.nodes.len() - 1);
        Ok(node)
    }

    /// `create_processing_node()` followed by `subscribe_to_resize()`
    pub fn create_subscribed_processing_node<T, F>(&mut self, build: F) -> Result<Arc<Mutex<T>>>
    where
        T: ProcessingNode + ResizeListener + 'static,
        F: FnOnce(FrameContext) -> Result<T>,
    {
        let node = self.create_processing_node(build)?;
        self.subscribe_to_resize(&node);
        Ok(node)
    }

    /// Notify `listener` after every recreate of the screen-bound render target
    pub fn subscribe_to_resize<L: ResizeListener + 'static>(&mut self, listener: &Arc<Mutex<L>>) -> SubscriptionKey {
        self.screen_target.resize_signal_mut().subscribe(listener)
    }

    pub fn unsubscribe_from_resize(&mut self, key: SubscriptionKey) -> bool {
        self.screen_target.resize_signal_mut().unsubscribe(key)
    }

    // ===== FRAME LOOP =====

    /// Render one frame
    ///
    /// Out-of-date swapchains and display resizes are handled here by
    /// recreating the render target. Any other failure is returned to the
    /// caller and is not recovered from. Once recording or submission has
    /// failed, later calls fail with `InvalidOperation` instead of waiting on
    /// a fence that will never signal.
    pub fn execute(&mut self) -> Result<FrameStatus> {
        if self.failed {
            return Err(Error::InvalidOperation(
                "a previous frame failed after its fence was reset, the pipeline cannot render again".to_string()
            ).logged(SOURCE));
        }
        self.executed = true;
        let frame_index = self.screen_target.frame_index();

        self.synchronizer.wait(frame_index)?;

        if !self.screen_target.prepare_new_frame()? {
            self.recreate_render_target()?;
            self.stats.frames_skipped += 1;
            engine_debug!(SOURCE, "Skipped {}", frame_index);
            return Ok(FrameStatus::Skipped);
        }

        let image_index = self.screen_target.image_index().ok_or_else(|| {
            Error::InvalidOperation("no swapchain image after a successful acquire".to_string())
                .logged(SOURCE)
        })?;

        self.synchronizer.reset(frame_index)?;
        if let Err(err) = self.record_and_submit(frame_index, image_index) {
            self.failed = true;
            return Err(err);
        }
        self.stats.frames_rendered += 1;

        let status = if self.screen_target.present_to_display()? || !self.recreate_render_target()? {
            FrameStatus::Rendered
        } else {
            FrameStatus::RenderedAndRecreated
        };

        self.screen_target.increment_frame_index();
        Ok(status)
    }

    /// Recreate the screen-bound render target and notify resize subscribers
    ///
    /// Returns false when the recreate was postponed because the display
    /// extent is empty; the next `execute()` tries again.
    pub fn recreate_render_target(&mut self) -> Result<bool> {
        let generation = self.screen_target.generation();
        self.screen_target.recreate()?;
        let rebuilt = self.screen_target.generation() != generation;
        if rebuilt {
            self.stats.recreations += 1;
        }
        Ok(rebuilt)
    }

    /// Record every node into the slot's command buffer and submit it
    fn record_and_submit(&mut self, frame_index: FrameIndex, image_index: ImageIndex) -> Result<()> {
        let command_buffer = self
            .command_buffers
            .get_mut(frame_index.as_usize())
            .ok_or(Error::IndexOutOfRange {
                index: frame_index.as_usize(),
                len: self.allocator.buffer_count() as usize,
            })?;

        command_buffer.begin()?;
        Self::process_nodes(
            &self.nodes,
            command_buffer.as_mut(),
            frame_index,
            image_index,
            &self.screen_target,
        )?;
        command_buffer.execute_secondary_commands()?;
        command_buffer.end()?;

        self.device.submit_graphics_command_buffer(
            command_buffer.as_ref(),
            self.synchronizer.primitive(frame_index)?,
            Some(PresentSync {
                swapchain: self.screen_target.swapchain(),
                frame_index,
                image_index,
            }),
        )?;
        self.screen_target.mark_submitted()
    }

    fn process_nodes(
        nodes: &[Arc<Mutex<dyn ProcessingNode>>],
        command_buffer: &mut dyn CommandBuffer,
        frame_index: FrameIndex,
        image_index: ImageIndex,
        screen: &ScreenBoundRenderTarget,
    ) -> Result<()> {
        let mut previous: Option<MutexGuard<'_, dyn ProcessingNode + 'static>> = None;
        for node in nodes {
            let mut current = node
                .lock()
                .map_err(|_| Error::BackendError("ProcessingNode lock poisoned".to_string()).logged(SOURCE))?;
            current.process(previous.as_deref(), command_buffer, frame_index, image_index, screen)?;
            previous = Some(current);
        }
        Ok(())
    }

    // ===== DISPLAY =====

    /// Poll the display
    pub fn update_display(&self) {
        self.display.update();
    }

    // ===== ACCESSORS =====

    pub fn device(&self) -> &Arc<dyn GraphicsDevice> {
        &self.device
    }

    pub fn display(&self) -> &Arc<dyn Display> {
        &self.display
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn extent(&self) -> Extent2D {
        self.screen_target.extent()
    }

    pub fn buffer_count(&self) -> u32 {
        self.screen_target.buffer_count()
    }

    pub fn multi_sample_count(&self) -> MultiSampleCount {
        self.config.msaa_count
    }

    pub fn swapchain_format(&self) -> ImageFormat {
        self.swapchain_format
    }

    pub fn frame_index(&self) -> FrameIndex {
        self.screen_target.frame_index()
    }

    pub fn image_index(&self) -> Option<ImageIndex> {
        self.screen_target.image_index()
    }

    /// Command buffer of the current frame-in-flight slot
    pub fn command_buffer_in_flight(&self) -> Result<&dyn CommandBuffer> {
        let index = self.frame_index().as_usize();
        self.command_buffers
            .get(index)
            .map(|cmd| cmd.as_ref())
            .ok_or(Error::IndexOutOfRange { index, len: self.command_buffers.len() })
    }

    pub fn command_buffer_allocator(&self) -> &dyn CommandBufferAllocator {
        self.allocator.as_ref()
    }

    pub fn synchronizer(&self) -> &FrameSynchronizer {
        &self.synchronizer
    }

    pub fn screen_bound_render_target(&self) -> &ScreenBoundRenderTarget {
        &self.screen_target
    }

    pub fn screen_bound_render_target_mut(&mut self) -> &mut ScreenBoundRenderTarget {
        &mut self.screen_target
    }

    /// Color buffer image (attachment 0), when the pipeline has one
    pub fn color_buffer(&self) -> Option<&Arc<dyn Image>> {
        if !self.has_color_buffer {
            return None;
        }
        self.screen_target.attachments().first().map(|a| &a.image)
    }

    /// Depth buffer image: attachment 1 with a color buffer, attachment 0 without
    pub fn depth_buffer(&self) -> Option<&Arc<dyn Image>> {
        if !self.has_depth_buffer {
            return None;
        }
        let index = if self.has_color_buffer { 1 } else { 0 };
        self.screen_target.attachments().get(index).map(|a| &a.image)
    }

    /// Context handed to nodes created now
    pub fn frame_context(&self) -> FrameContext {
        let mut context = FrameContext::new(
            self.device.clone(),
            self.display.clone(),
            self.screen_target.extent(),
            self.screen_target.buffer_count(),
            self.swapchain_format,
        )
        .with_multi_sample_count(self.config.msaa_count)
        .with_generation(self.screen_target.generation());

        if let Some(color) = self.color_buffer() {
            context = context.with_color_buffer(Arc::downgrade(color));
        }
        if let Some(depth) = self.depth_buffer() {
            context = context.with_depth_buffer(Arc::downgrade(depth));
        }
        context
    }

    /// Nodes in processing order
    pub fn processing_nodes(&self) -> &[Arc<Mutex<dyn ProcessingNode>>] {
        &self.nodes
    }

    /// Node registered under `name`
    pub fn processing_node(&self, name: &str) -> Option<&Arc<Mutex<dyn ProcessingNode>>> {
        self.node_indices.get(name).and_then(|&index| self.nodes.get(index))
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats
    }
}

impl Drop for ProcessingPipeline {
    fn drop(&mut self) {
        // In-flight submissions still reference the command buffers and attachments
        if let Err(err) = self.device.wait_idle() {
            engine_warn!(SOURCE, "wait_idle failed during teardown: {}", err);
        }
    }
}

#[cfg(test)]
#[path = "processing_pipeline_tests.rs"]
mod tests;
