/// Mock GraphicsDevice for unit tests (no GPU required)
///
/// Every call that matters to the frame protocol is appended to a shared
/// event log, so tests can assert on the exact order of waits, resets,
/// acquires, submissions and presents. Images and framebuffers are counted
/// while alive to detect leaks across recreates.

use std::any::Any;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use crate::error::{Error, Result};
use crate::graphics_device::{
    AcquireOutcome, ClearValue, CommandBuffer, CommandBufferAllocator, Display, Extent2D,
    Framebuffer, FramebufferDesc, GraphicsDevice, HostSyncPrimitive, Image, ImageDesc,
    ImageFormat, PresentMode, PresentOutcome, PresentSync, Rect2D, RenderPass, RenderPassDesc,
    Swapchain, Viewport,
};
use crate::target::{FrameIndex, ImageIndex};
use crate::engine_bail;

const SOURCE: &str = "flint::MockGraphicsDevice";

// ============================================================================
// Shared state
// ============================================================================

/// One observable device call
#[derive(Debug, Clone, PartialEq)]
pub enum MockEvent {
    Wait { fence: u32 },
    Reset { fence: u32 },
    Acquire { frame: u32, outcome: AcquireOutcome },
    Begin { buffer: u32 },
    End { buffer: u32 },
    Command { buffer: u32, name: String },
    Submit { buffer: u32, fence: u32, image: Option<u32> },
    Present { frame: u32, image: u32 },
    SwapchainRecreate { width: u32, height: u32 },
    WaitIdle,
}

/// Scripted result of the next acquire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockAcquire {
    Image(u32),
    Suboptimal(u32),
    OutOfDate,
}

#[derive(Default)]
pub struct MockState {
    events: Mutex<Vec<MockEvent>>,
    acquire_script: Mutex<VecDeque<MockAcquire>>,
    present_script: Mutex<VecDeque<PresentOutcome>>,
    live_images: AtomicUsize,
    live_framebuffers: AtomicUsize,
    next_id: AtomicU32,
    stall_gpu: AtomicBool,
    fail_submit: AtomicBool,
    swapchain_padding: AtomicU32,
}

impl MockState {
    fn record(&self, event: MockEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }

    fn next_id(&self) -> u32 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Extent a swapchain ends up with when `requested` is asked for
    fn swapchain_extent(&self, requested: Extent2D) -> Extent2D {
        let padding = self.swapchain_padding.load(Ordering::SeqCst);
        Extent2D::new(requested.width + padding, requested.height + padding)
    }
}

fn command_buffer_id(cmd: &dyn CommandBuffer) -> u32 {
    cmd.as_any()
        .downcast_ref::<MockCommandBuffer>()
        .map(|cmd| cmd.id)
        .unwrap_or(u32::MAX)
}

fn image_name(image: &dyn Image) -> &str {
    &image.desc().name
}

// ============================================================================
// Mock Image
// ============================================================================

pub struct MockImage {
    pub desc: ImageDesc,
    state: Arc<MockState>,
}

impl MockImage {
    fn new(desc: ImageDesc, state: Arc<MockState>) -> Self {
        state.live_images.fetch_add(1, Ordering::SeqCst);
        Self { desc, state }
    }
}

impl Image for MockImage {
    fn desc(&self) -> &ImageDesc {
        &self.desc
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for MockImage {
    fn drop(&mut self) {
        self.state.live_images.fetch_sub(1, Ordering::SeqCst);
    }
}

// ============================================================================
// Mock RenderPass / Framebuffer
// ============================================================================

pub struct MockRenderPass {
    pub desc: RenderPassDesc,
}

impl RenderPass for MockRenderPass {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub struct MockFramebuffer {
    pub id: u32,
    pub extent: Extent2D,
    pub attachments: Vec<Arc<dyn Image>>,
    pub swapchain_image: Option<u32>,
    state: Arc<MockState>,
}

impl MockFramebuffer {
    pub fn attachment_names(&self) -> Vec<String> {
        self.attachments.iter().map(|a| a.desc().name.clone()).collect()
    }
}

impl Framebuffer for MockFramebuffer {
    fn extent(&self) -> Extent2D {
        self.extent
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for MockFramebuffer {
    fn drop(&mut self) {
        self.state.live_framebuffers.fetch_sub(1, Ordering::SeqCst);
    }
}

// ============================================================================
// Mock CommandBuffer
// ============================================================================

pub struct MockCommandBuffer {
    pub id: u32,
    recording: bool,
    in_render_pass: bool,
    state: Arc<MockState>,
}

impl MockCommandBuffer {
    fn command(&self, name: String) -> Result<()> {
        if !self.recording {
            engine_bail!(SOURCE, "'{}' recorded into command buffer {} while not recording", name, self.id);
        }
        self.state.record(MockEvent::Command { buffer: self.id, name });
        Ok(())
    }
}

impl CommandBuffer for MockCommandBuffer {
    fn begin(&mut self) -> Result<()> {
        if self.recording {
            engine_bail!(SOURCE, "command buffer {} already recording", self.id);
        }
        self.recording = true;
        self.state.record(MockEvent::Begin { buffer: self.id });
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        if !self.recording || self.in_render_pass {
            engine_bail!(SOURCE, "command buffer {} cannot end here", self.id);
        }
        self.recording = false;
        self.state.record(MockEvent::End { buffer: self.id });
        Ok(())
    }

    fn is_recording(&self) -> bool {
        self.recording
    }

    fn begin_render_pass(
        &mut self,
        _render_pass: &Arc<dyn RenderPass>,
        framebuffer: &Arc<dyn Framebuffer>,
        clear_values: &[ClearValue],
    ) -> Result<()> {
        let framebuffer_id = framebuffer
            .as_any()
            .downcast_ref::<MockFramebuffer>()
            .map(|fb| fb.id)
            .unwrap_or(u32::MAX);
        self.command(format!("begin_render_pass:{}:{}", framebuffer_id, clear_values.len()))?;
        self.in_render_pass = true;
        Ok(())
    }

    fn end_render_pass(&mut self) -> Result<()> {
        self.command("end_render_pass".to_string())?;
        self.in_render_pass = false;
        Ok(())
    }

    fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        self.command(format!("set_viewport:{}x{}", viewport.width, viewport.height))
    }

    fn set_scissor(&mut self, scissor: Rect2D) -> Result<()> {
        self.command(format!("set_scissor:{}x{}", scissor.width, scissor.height))
    }

    fn copy_image(&mut self, src: &dyn Image, dst: &dyn Image) -> Result<()> {
        if self.in_render_pass {
            engine_bail!(SOURCE, "copy_image inside a render pass");
        }
        self.command(format!("copy_image:{}->{}", image_name(src), image_name(dst)))
    }

    fn execute_secondary_commands(&mut self) -> Result<()> {
        self.command("execute_secondary_commands".to_string())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub struct MockCommandBufferAllocator {
    buffer_count: u32,
    state: Arc<MockState>,
}

impl CommandBufferAllocator for MockCommandBufferAllocator {
    fn buffer_count(&self) -> u32 {
        self.buffer_count
    }

    fn create_command_buffers(&self) -> Result<Vec<Box<dyn CommandBuffer>>> {
        Ok((0..self.buffer_count)
            .map(|_| {
                Box::new(MockCommandBuffer {
                    id: self.state.next_id(),
                    recording: false,
                    in_render_pass: false,
                    state: self.state.clone(),
                }) as Box<dyn CommandBuffer>
            })
            .collect())
    }
}

// ============================================================================
// Mock Fence
// ============================================================================

pub struct MockFence {
    pub id: u32,
    signaled: AtomicBool,
    state: Arc<MockState>,
}

impl MockFence {
    pub fn is_signaled(&self) -> bool {
        self.signaled.load(Ordering::SeqCst)
    }
}

impl HostSyncPrimitive for MockFence {
    fn wait(&self, timeout: Duration) -> Result<()> {
        self.state.record(MockEvent::Wait { fence: self.id });
        if self.is_signaled() {
            Ok(())
        } else {
            Err(Error::Timeout(format!("fence {} not signaled after {:?}", self.id, timeout)))
        }
    }

    fn reset(&self) -> Result<()> {
        self.state.record(MockEvent::Reset { fence: self.id });
        self.signaled.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ============================================================================
// Mock Display
// ============================================================================

pub struct MockDisplay {
    title: String,
    extent: Mutex<Extent2D>,
    resized: AtomicBool,
    closed: AtomicBool,
    best_buffer_count: AtomicU32,
    format: ImageFormat,
}

impl MockDisplay {
    /// Simulate a window resize reported by the windowing layer
    pub fn set_extent(&self, extent: Extent2D) {
        if let Ok(mut current) = self.extent.lock() {
            *current = extent;
        }
        self.resized.store(true, Ordering::SeqCst);
    }

    pub fn set_best_buffer_count(&self, count: u32) {
        self.best_buffer_count.store(count, Ordering::SeqCst);
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

impl Display for MockDisplay {
    fn title(&self) -> String {
        self.title.clone()
    }

    fn extent(&self) -> Extent2D {
        self.extent.lock().map(|e| *e).unwrap_or_default()
    }

    fn update(&self) {}

    fn find_best_buffer_count(&self, _device: &dyn GraphicsDevice) -> Result<u32> {
        Ok(self.best_buffer_count.load(Ordering::SeqCst))
    }

    fn best_swapchain_format(&self, _device: &dyn GraphicsDevice) -> Result<ImageFormat> {
        Ok(self.format)
    }

    fn is_resized(&self) -> bool {
        self.resized.load(Ordering::SeqCst)
    }

    fn clear_resized(&self) {
        self.resized.store(false, Ordering::SeqCst);
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ============================================================================
// Mock Swapchain
// ============================================================================

pub struct MockSwapchain {
    image_count: u32,
    extent: Extent2D,
    format: ImageFormat,
    present_mode: PresentMode,
    next_image: u32,
    state: Arc<MockState>,
}

impl Swapchain for MockSwapchain {
    fn acquire_next_image(&mut self, frame_index: FrameIndex) -> Result<AcquireOutcome> {
        let scripted = self.state.acquire_script.lock().ok().and_then(|mut s| s.pop_front());
        let outcome = match scripted {
            Some(MockAcquire::Image(index)) => AcquireOutcome::Acquired(ImageIndex::new(index)),
            Some(MockAcquire::Suboptimal(index)) => AcquireOutcome::Suboptimal(ImageIndex::new(index)),
            Some(MockAcquire::OutOfDate) => AcquireOutcome::OutOfDate,
            None => {
                let index = self.next_image;
                self.next_image = (self.next_image + 1) % self.image_count;
                AcquireOutcome::Acquired(ImageIndex::new(index))
            }
        };
        self.state.record(MockEvent::Acquire { frame: frame_index.get(), outcome });
        Ok(outcome)
    }

    fn present(&mut self, frame_index: FrameIndex, image_index: ImageIndex) -> Result<PresentOutcome> {
        self.state.record(MockEvent::Present { frame: frame_index.get(), image: image_index.get() });
        let scripted = self.state.present_script.lock().ok().and_then(|mut s| s.pop_front());
        Ok(scripted.unwrap_or(PresentOutcome::Presented))
    }

    fn recreate(&mut self, extent: Extent2D) -> Result<()> {
        self.state.record(MockEvent::SwapchainRecreate { width: extent.width, height: extent.height });
        self.extent = self.state.swapchain_extent(extent);
        self.next_image = 0;
        Ok(())
    }

    fn record_present_blit(
        &self,
        cmd: &mut dyn CommandBuffer,
        src: &dyn Image,
        image_index: ImageIndex,
    ) -> Result<()> {
        if !cmd.is_recording() {
            engine_bail!(SOURCE, "present blit outside of recording");
        }
        self.state.record(MockEvent::Command {
            buffer: command_buffer_id(cmd),
            name: format!("present_blit:{}->swapchain[{}]", image_name(src), image_index.get()),
        });
        Ok(())
    }

    fn image_count(&self) -> u32 {
        self.image_count
    }

    fn extent(&self) -> Extent2D {
        self.extent
    }

    fn format(&self) -> ImageFormat {
        self.format
    }

    fn present_mode(&self) -> PresentMode {
        self.present_mode
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ============================================================================
// Mock GraphicsDevice
// ============================================================================

pub struct MockGraphicsDevice {
    state: Arc<MockState>,
    display: Mutex<Option<Arc<MockDisplay>>>,
    best_buffer_count: u32,
}

impl MockGraphicsDevice {
    /// Device whose displays report a best buffer count of 2
    pub fn new() -> Arc<Self> {
        Self::with_best_buffer_count(2)
    }

    pub fn with_best_buffer_count(best_buffer_count: u32) -> Arc<Self> {
        Arc::new(Self {
            state: Arc::new(MockState::default()),
            display: Mutex::new(None),
            best_buffer_count,
        })
    }

    /// Display created through `create_display()` (the last one)
    pub fn display(&self) -> Option<Arc<MockDisplay>> {
        self.display.lock().ok().and_then(|d| d.clone())
    }

    /// Display created directly, for targets built without a pipeline
    pub fn make_display(&self, extent: Extent2D) -> Arc<MockDisplay> {
        self.build_display(extent, "mock")
    }

    fn build_display(&self, extent: Extent2D, title: &str) -> Arc<MockDisplay> {
        let display = Arc::new(MockDisplay {
            title: title.to_string(),
            extent: Mutex::new(extent),
            resized: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            best_buffer_count: AtomicU32::new(self.best_buffer_count),
            format: ImageFormat::B8G8R8A8_SRGB,
        });
        if let Ok(mut current) = self.display.lock() {
            *current = Some(display.clone());
        }
        display
    }

    pub fn events(&self) -> Vec<MockEvent> {
        self.state.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn clear_events(&self) {
        if let Ok(mut events) = self.state.events.lock() {
            events.clear();
        }
    }

    pub fn script_acquire(&self, outcome: MockAcquire) {
        if let Ok(mut script) = self.state.acquire_script.lock() {
            script.push_back(outcome);
        }
    }

    pub fn script_present(&self, outcome: PresentOutcome) {
        if let Ok(mut script) = self.state.present_script.lock() {
            script.push_back(outcome);
        }
    }

    /// Submissions no longer signal their fence (simulates a hung GPU)
    pub fn stall_gpu(&self, stall: bool) {
        self.state.stall_gpu.store(stall, Ordering::SeqCst);
    }

    pub fn fail_submit(&self, fail: bool) {
        self.state.fail_submit.store(fail, Ordering::SeqCst);
    }

    /// Swapchains come out `pixels` wider and taller than requested, like a
    /// surface whose current extent runs ahead of the window size
    pub fn pad_swapchain_extent(&self, pixels: u32) {
        self.state.swapchain_padding.store(pixels, Ordering::SeqCst);
    }

    pub fn live_images(&self) -> usize {
        self.state.live_images.load(Ordering::SeqCst)
    }

    pub fn live_framebuffers(&self) -> usize {
        self.state.live_framebuffers.load(Ordering::SeqCst)
    }
}

impl GraphicsDevice for MockGraphicsDevice {
    fn create_display(&self, extent: Extent2D, title: &str) -> Result<Arc<dyn Display>> {
        Ok(self.build_display(extent, title))
    }

    fn create_image(&self, desc: &ImageDesc) -> Result<Arc<dyn Image>> {
        if desc.extent.is_zero() {
            return Err(Error::InvalidArgument(format!("image '{}' has an empty extent", desc.name)));
        }
        Ok(Arc::new(MockImage::new(desc.clone(), self.state.clone())))
    }

    fn create_swapchain(
        &self,
        display: &Arc<dyn Display>,
        image_count: u32,
        present_mode: PresentMode,
    ) -> Result<Box<dyn Swapchain>> {
        Ok(Box::new(MockSwapchain {
            image_count,
            extent: self.state.swapchain_extent(display.extent()),
            format: display.best_swapchain_format(self)?,
            present_mode,
            next_image: 0,
            state: self.state.clone(),
        }))
    }

    fn create_render_pass(&self, desc: &RenderPassDesc) -> Result<Arc<dyn RenderPass>> {
        Ok(Arc::new(MockRenderPass { desc: desc.clone() }))
    }

    fn create_framebuffer(&self, desc: &FramebufferDesc) -> Result<Arc<dyn Framebuffer>> {
        self.state.live_framebuffers.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(MockFramebuffer {
            id: self.state.next_id(),
            extent: desc.extent,
            attachments: desc.attachments.clone(),
            swapchain_image: desc.swapchain_image.map(|(_, index)| index.get()),
            state: self.state.clone(),
        }))
    }

    fn create_command_buffer_allocator(&self, buffer_count: u32) -> Result<Box<dyn CommandBufferAllocator>> {
        Ok(Box::new(MockCommandBufferAllocator {
            buffer_count,
            state: self.state.clone(),
        }))
    }

    fn create_host_sync_primitive(&self) -> Result<Box<dyn HostSyncPrimitive>> {
        Ok(Box::new(MockFence {
            id: self.state.next_id(),
            signaled: AtomicBool::new(true),
            state: self.state.clone(),
        }))
    }

    fn submit_graphics_command_buffer(
        &self,
        command_buffer: &dyn CommandBuffer,
        fence: &dyn HostSyncPrimitive,
        present: Option<PresentSync<'_>>,
    ) -> Result<()> {
        if self.state.fail_submit.load(Ordering::SeqCst) {
            return Err(Error::DeviceLost);
        }
        if command_buffer.is_recording() {
            engine_bail!(SOURCE, "submitted command buffer is still recording");
        }
        let fence = fence
            .as_any()
            .downcast_ref::<MockFence>()
            .ok_or_else(|| Error::InvalidResource("not a MockFence".to_string()))?;
        if fence.is_signaled() {
            engine_bail!(SOURCE, "fence {} submitted while signaled", fence.id);
        }

        self.state.record(MockEvent::Submit {
            buffer: command_buffer_id(command_buffer),
            fence: fence.id,
            image: present.map(|p| p.image_index.get()),
        });

        // The mock GPU completes instantly
        if !self.state.stall_gpu.load(Ordering::SeqCst) {
            fence.signaled.store(true, Ordering::SeqCst);
        }
        Ok(())
    }

    fn wait_idle(&self) -> Result<()> {
        self.state.record(MockEvent::WaitIdle);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
#[path = "mock_graphics_device_tests.rs"]
mod tests;
