//! Unit tests for processing_pipeline.rs
//!
//! Drive the whole execute loop against the mock device and check the exact
//! sequence of device calls per frame.

use crate::processing::{
    ClosureAction, FrameStatus, FullFrameAction, OffScreenPass, PipelineConfig, PresentPass, ProcessingNode,
    ProcessingPipeline, ScreenPass,
};
use crate::target::{FrameIndex, FrameState, ImageIndex, RenderTarget, ScreenBoundRenderTarget};
use crate::graphics_device::mock_graphics_device::{
    MockAcquire, MockDisplay, MockEvent, MockFence, MockGraphicsDevice,
};
use crate::graphics_device::{
    CommandBuffer, Display, Extent2D, Image, ImageFormat, MultiSampleCount, PresentOutcome,
};
use crate::error::{Error, Result};
use glam::Vec4;
use std::any::Any;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

const EXTENT: Extent2D = Extent2D::new(800, 600);

// ============================================================================
// TEST HELPERS
// ============================================================================

fn config() -> PipelineConfig {
    PipelineConfig {
        frame_extent: EXTENT,
        display_title: "Test".to_string(),
        ..Default::default()
    }
}

fn make_pipeline(config: PipelineConfig) -> (Arc<MockGraphicsDevice>, Arc<MockDisplay>, ProcessingPipeline) {
    let device = MockGraphicsDevice::new();
    let pipeline = ProcessingPipeline::new(device.clone(), config).unwrap();
    let display = device.display().unwrap();
    (device, display, pipeline)
}

fn fence_id(pipeline: &ProcessingPipeline, slot: u32) -> u32 {
    pipeline
        .synchronizer()
        .primitive(FrameIndex::new(slot))
        .unwrap()
        .as_any()
        .downcast_ref::<MockFence>()
        .unwrap()
        .id
}

/// Names of the commands recorded since the last `clear_events()`
fn commands(device: &MockGraphicsDevice) -> Vec<String> {
    device
        .events()
        .into_iter()
        .filter_map(|e| match e {
            MockEvent::Command { name, .. } => Some(name),
            _ => None,
        })
        .collect()
}

fn count(device: &MockGraphicsDevice, predicate: impl Fn(&MockEvent) -> bool) -> usize {
    device.events().iter().filter(|e| predicate(e)).count()
}

/// Records which node preceded it on every frame
struct TraceNode {
    name: String,
    trace: Arc<Mutex<Vec<(String, Option<String>)>>>,
}

impl TraceNode {
    fn new(name: &str, trace: &Arc<Mutex<Vec<(String, Option<String>)>>>) -> Self {
        Self { name: name.to_string(), trace: trace.clone() }
    }
}

impl ProcessingNode for TraceNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn process(
        &mut self,
        previous: Option<&dyn ProcessingNode>,
        command_buffer: &mut dyn CommandBuffer,
        _frame_index: FrameIndex,
        _image_index: ImageIndex,
        _screen: &ScreenBoundRenderTarget,
    ) -> Result<()> {
        assert!(command_buffer.is_recording());
        self.trace
            .lock()
            .unwrap()
            .push((self.name.clone(), previous.map(|p| p.name().to_string())));
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn add_scene_and_present(
    pipeline: &mut ProcessingPipeline,
) -> (Arc<Mutex<OffScreenPass>>, Arc<Mutex<PresentPass>>) {
    let scene = pipeline
        .create_subscribed_processing_node(|ctx| {
            OffScreenPass::new("scene", ctx, ImageFormat::R8G8B8A8_UNORM, Vec4::ONE, true, FullFrameAction)
        })
        .unwrap();
    let present = pipeline
        .create_subscribed_processing_node(|ctx| Ok(PresentPass::new("present", ctx)))
        .unwrap();
    (scene, present)
}

// ============================================================================
// CONSTRUCTION TESTS
// ============================================================================

#[test]
fn test_new_uses_display_best_buffer_count() {
    let (_device, display, pipeline) = make_pipeline(config());
    assert_eq!(pipeline.buffer_count(), 2);
    assert_eq!(pipeline.synchronizer().buffer_count(), 2);
    assert_eq!(pipeline.command_buffer_allocator().buffer_count(), 2);
    assert_eq!(pipeline.extent(), EXTENT);
    assert_eq!(pipeline.frame_index(), FrameIndex::new(0));
    assert_eq!(pipeline.image_index(), None);
    assert_eq!(display.title(), "Test");
}

#[test]
fn test_new_with_explicit_pipeline_count() {
    let (_device, _display, pipeline) = make_pipeline(PipelineConfig { pipeline_count: 3, ..config() });
    assert_eq!(pipeline.buffer_count(), 3);
    assert_eq!(pipeline.screen_bound_render_target().swapchain().image_count(), 3);
}

#[test]
fn test_default_config_has_no_color_or_depth_buffer() {
    let (_device, _display, pipeline) = make_pipeline(config());
    assert!(pipeline.color_buffer().is_none());
    assert!(pipeline.depth_buffer().is_none());
    assert!(pipeline.screen_bound_render_target().attachments().is_empty());
}

#[test]
fn test_msaa_forces_color_buffer_first_then_depth() {
    let (_device, _display, pipeline) = make_pipeline(PipelineConfig {
        msaa_count: MultiSampleCount::Four,
        force_depth_buffer: true,
        ..config()
    });

    let attachments = pipeline.screen_bound_render_target().attachments();
    assert_eq!(attachments.len(), 2);

    let color = pipeline.color_buffer().unwrap();
    let depth = pipeline.depth_buffer().unwrap();
    assert!(Arc::ptr_eq(color, &attachments[0].image));
    assert!(Arc::ptr_eq(depth, &attachments[1].image));
    assert_eq!(color.desc().sample_count, MultiSampleCount::Four);
    assert_eq!(color.desc().format, pipeline.swapchain_format());
    assert_eq!(depth.desc().format, ImageFormat::D24_UNORM_S8_UINT);
}

#[test]
fn test_depth_only_is_first_attachment() {
    let (_device, _display, pipeline) = make_pipeline(PipelineConfig { force_depth_buffer: true, ..config() });
    let attachments = pipeline.screen_bound_render_target().attachments();
    assert_eq!(attachments.len(), 1);
    assert!(pipeline.color_buffer().is_none());
    assert!(Arc::ptr_eq(pipeline.depth_buffer().unwrap(), &attachments[0].image));
}

#[test]
fn test_frame_context_carries_pipeline_state() {
    let (_device, _display, pipeline) = make_pipeline(PipelineConfig {
        force_color_buffer: true,
        ..config()
    });
    let ctx = pipeline.frame_context();
    assert_eq!(ctx.extent(), EXTENT);
    assert_eq!(ctx.buffer_count(), 2);
    assert_eq!(ctx.multi_sample_count(), MultiSampleCount::One);
    assert_eq!(ctx.generation(), 0);
    let color = ctx.color_buffer().unwrap().upgrade().unwrap();
    assert!(Arc::ptr_eq(&color, pipeline.color_buffer().unwrap()));
    assert!(ctx.depth_buffer().is_none());
}

// ============================================================================
// NODE REGISTRATION TESTS
// ============================================================================

#[test]
fn test_duplicate_node_name_is_rejected() {
    let (_device, _display, mut pipeline) = make_pipeline(config());
    let trace = Arc::new(Mutex::new(Vec::new()));
    pipeline.create_processing_node(|_| Ok(TraceNode::new("a", &trace))).unwrap();

    let result = pipeline.create_processing_node(|_| Ok(TraceNode::new("a", &trace)));
    assert!(matches!(result, Err(Error::InvalidArgument(_))));
    assert_eq!(pipeline.processing_nodes().len(), 1);
}

#[test]
fn test_node_lookup_by_name() {
    let (_device, _display, mut pipeline) = make_pipeline(config());
    let trace = Arc::new(Mutex::new(Vec::new()));
    let a = pipeline.create_processing_node(|_| Ok(TraceNode::new("a", &trace))).unwrap();
    pipeline.create_processing_node(|_| Ok(TraceNode::new("b", &trace))).unwrap();

    let found = pipeline.processing_node("a").unwrap();
    assert_eq!(found.lock().unwrap().name(), "a");
    assert!(found.lock().unwrap().as_any().downcast_ref::<TraceNode>().is_some());
    assert_eq!(a.lock().unwrap().name, "a");
    assert!(pipeline.processing_node("missing").is_none());
}

#[test]
fn test_build_error_is_propagated() {
    let (_device, _display, mut pipeline) = make_pipeline(config());
    let result = pipeline.create_processing_node::<TraceNode, _>(|_| {
        Err(Error::InitializationFailed("node setup".to_string()))
    });
    assert!(matches!(result, Err(Error::InitializationFailed(_))));
    assert!(pipeline.processing_nodes().is_empty());
}

#[test]
fn test_registration_after_execute_is_rejected() {
    let (_device, _display, mut pipeline) = make_pipeline(config());
    let trace = Arc::new(Mutex::new(Vec::new()));
    pipeline.create_processing_node(|_| Ok(TraceNode::new("a", &trace))).unwrap();
    pipeline.execute().unwrap();

    let result = pipeline.create_processing_node(|_| Ok(TraceNode::new("late", &trace)));
    assert!(matches!(result, Err(Error::InvalidOperation(_))));
}

// ============================================================================
// EXECUTE ORDER TESTS
// ============================================================================

#[test]
fn test_execute_call_sequence() {
    let (device, _display, mut pipeline) = make_pipeline(config());
    let fence = fence_id(&pipeline, 0);
    device.clear_events();

    assert_eq!(pipeline.execute().unwrap(), FrameStatus::Rendered);

    let events = device.events();
    let buffer = match events[3] {
        MockEvent::Begin { buffer } => buffer,
        ref other => panic!("expected Begin, got {:?}", other),
    };
    assert_eq!(events, vec![
        MockEvent::Wait { fence },
        MockEvent::Acquire {
            frame: 0,
            outcome: crate::graphics_device::AcquireOutcome::Acquired(ImageIndex::new(0)),
        },
        MockEvent::Reset { fence },
        MockEvent::Begin { buffer },
        MockEvent::Command { buffer, name: "execute_secondary_commands".to_string() },
        MockEvent::End { buffer },
        MockEvent::Submit { buffer, fence, image: Some(0) },
        MockEvent::Present { frame: 0, image: 0 },
    ]);
    assert_eq!(pipeline.frame_index(), FrameIndex::new(1));
    assert_eq!(pipeline.screen_bound_render_target().state(), FrameState::Ready);
}

#[test]
fn test_nodes_processed_in_order_with_previous() {
    let (_device, _display, mut pipeline) = make_pipeline(config());
    let trace = Arc::new(Mutex::new(Vec::new()));
    for name in ["a", "b", "c"] {
        pipeline.create_processing_node(|_| Ok(TraceNode::new(name, &trace))).unwrap();
    }

    pipeline.execute().unwrap();
    pipeline.execute().unwrap();

    let expected_frame = vec![
        ("a".to_string(), None),
        ("b".to_string(), Some("a".to_string())),
        ("c".to_string(), Some("b".to_string())),
    ];
    let trace = trace.lock().unwrap();
    assert_eq!(trace[..3], expected_frame[..]);
    assert_eq!(trace[3..], expected_frame[..]);
}

#[test]
fn test_slots_cycle_with_their_own_command_buffer_and_fence() {
    let (device, _display, mut pipeline) = make_pipeline(PipelineConfig { pipeline_count: 3, ..config() });
    let fences: Vec<u32> = (0..3).map(|slot| fence_id(&pipeline, slot)).collect();
    device.clear_events();

    for _ in 0..6 {
        pipeline.execute().unwrap();
    }

    let submits: Vec<(u32, u32)> = device
        .events()
        .into_iter()
        .filter_map(|e| match e {
            MockEvent::Submit { buffer, fence, .. } => Some((buffer, fence)),
            _ => None,
        })
        .collect();
    assert_eq!(submits.len(), 6);
    for frame in 0..6 {
        let slot = frame % 3;
        assert_eq!(submits[frame].1, fences[slot]);
        // Frame N and N + 3 share a command buffer, neighbours never do
        assert_eq!(submits[frame].0, submits[slot].0);
        assert_ne!(submits[frame].0, submits[(frame + 1) % 3].0);
    }
    assert_eq!(pipeline.frame_index(), FrameIndex::new(0));
}

#[test]
fn test_out_of_order_images_select_framebuffer_by_image_index() {
    let (device, _display, mut pipeline) = make_pipeline(PipelineConfig {
        pipeline_count: 3,
        force_color_buffer: true,
        msaa_count: MultiSampleCount::Four,
        ..config()
    });
    let fences: Vec<u32> = (0..3).map(|slot| fence_id(&pipeline, slot)).collect();
    pipeline
        .create_processing_node(|ctx| Ok(ScreenPass::new("screen", ctx, FullFrameAction)))
        .unwrap();
    let framebuffer_ids: Vec<u32> = pipeline
        .screen_bound_render_target()
        .framebuffers()
        .iter()
        .map(|fb| {
            fb.as_any()
                .downcast_ref::<crate::graphics_device::mock_graphics_device::MockFramebuffer>()
                .unwrap()
                .id
        })
        .collect();

    let images = [2, 0, 1, 2, 0, 1];
    for image in images {
        device.script_acquire(MockAcquire::Image(image));
    }
    device.clear_events();
    for _ in 0..images.len() {
        assert_eq!(pipeline.execute().unwrap(), FrameStatus::Rendered);
    }

    let begins: Vec<String> = commands(&device)
        .into_iter()
        .filter(|c| c.starts_with("begin_render_pass:"))
        .collect();
    let submits: Vec<(u32, Option<u32>)> = device
        .events()
        .into_iter()
        .filter_map(|e| match e {
            MockEvent::Submit { fence, image, .. } => Some((fence, image)),
            _ => None,
        })
        .collect();

    for (frame, image) in images.iter().enumerate() {
        assert!(begins[frame].starts_with(&format!("begin_render_pass:{}:", framebuffer_ids[*image as usize])));
        assert_eq!(submits[frame], (fences[frame % 3], Some(*image)));
    }
}

// ============================================================================
// RECREATE / SKIP TESTS
// ============================================================================

#[test]
fn test_out_of_date_on_third_call_skips_and_keeps_frame_index() {
    let device = MockGraphicsDevice::new();
    let mut pipeline = ProcessingPipeline::new(device.clone(), PipelineConfig {
        pipeline_count: 2,
        force_color_buffer: true,
        ..config()
    })
    .unwrap();
    assert_eq!(pipeline.screen_bound_render_target().attachments().len(), 1);

    let mut statuses = Vec::new();
    let mut frame_indices = Vec::new();
    for call in 1..=5 {
        if call == 3 {
            device.script_acquire(MockAcquire::OutOfDate);
        }
        device.clear_events();
        statuses.push(pipeline.execute().unwrap());
        frame_indices.push(pipeline.frame_index().get());

        let submits = count(&device, |e| matches!(e, MockEvent::Submit { .. }));
        let presents = count(&device, |e| matches!(e, MockEvent::Present { .. }));
        let resets = count(&device, |e| matches!(e, MockEvent::Reset { .. }));
        let acquires = count(&device, |e| matches!(e, MockEvent::Acquire { .. }));
        assert_eq!(acquires, 1);
        if call == 3 {
            assert_eq!((submits, presents, resets), (0, 0, 0));
            assert!(device.events().contains(&MockEvent::WaitIdle));
        } else {
            assert_eq!((submits, presents, resets), (1, 1, 1));
        }
    }

    assert_eq!(statuses, vec![
        FrameStatus::Rendered,
        FrameStatus::Rendered,
        FrameStatus::Skipped,
        FrameStatus::Rendered,
        FrameStatus::Rendered,
    ]);
    assert_eq!(frame_indices, vec![1, 0, 0, 1, 0]);
    assert_eq!(pipeline.stats().frames_rendered, 4);
    assert_eq!(pipeline.stats().frames_skipped, 1);
    assert_eq!(pipeline.stats().recreations, 1);
    assert_eq!(pipeline.buffer_count(), 2);
}

#[test]
fn test_present_out_of_date_recreates_after_presenting() {
    let (device, _display, mut pipeline) = make_pipeline(config());
    device.script_present(PresentOutcome::OutOfDate);

    assert_eq!(pipeline.execute().unwrap(), FrameStatus::RenderedAndRecreated);
    assert_eq!(pipeline.frame_index(), FrameIndex::new(1));
    assert_eq!(pipeline.screen_bound_render_target().generation(), 1);
    assert_eq!(pipeline.execute().unwrap(), FrameStatus::Rendered);
}

#[test]
fn test_repeated_recreate_does_not_leak() {
    let (device, _display, mut pipeline) = make_pipeline(PipelineConfig {
        msaa_count: MultiSampleCount::Four,
        force_depth_buffer: true,
        ..config()
    });
    let images = device.live_images();
    let framebuffers = device.live_framebuffers();
    let formats: Vec<_> = pipeline
        .screen_bound_render_target()
        .attachments()
        .iter()
        .map(|a| a.image.desc().format)
        .collect();

    for _ in 0..5 {
        assert!(pipeline.recreate_render_target().unwrap());
    }

    assert_eq!(device.live_images(), images);
    assert_eq!(device.live_framebuffers(), framebuffers);
    let after: Vec<_> = pipeline
        .screen_bound_render_target()
        .attachments()
        .iter()
        .map(|a| a.image.desc().format)
        .collect();
    assert_eq!(after, formats);
    assert_eq!(pipeline.stats().recreations, 5);
}

#[test]
fn test_minimized_display_skips_until_restored() {
    let (device, display, mut pipeline) = make_pipeline(config());
    pipeline.execute().unwrap();

    display.set_extent(Extent2D::new(0, 0));
    // Present notices the resize, recreate is postponed
    assert_eq!(pipeline.execute().unwrap(), FrameStatus::Rendered);
    assert_eq!(pipeline.screen_bound_render_target().state(), FrameState::RecreateNeeded);

    device.clear_events();
    assert_eq!(pipeline.execute().unwrap(), FrameStatus::Skipped);
    assert_eq!(pipeline.execute().unwrap(), FrameStatus::Skipped);
    assert_eq!(count(&device, |e| matches!(e, MockEvent::Acquire { .. })), 0);
    assert_eq!(count(&device, |e| matches!(e, MockEvent::Submit { .. })), 0);
    assert_eq!(pipeline.stats().recreations, 0);

    display.set_extent(Extent2D::new(1024, 768));
    assert_eq!(pipeline.execute().unwrap(), FrameStatus::Skipped);
    assert_eq!(pipeline.extent(), Extent2D::new(1024, 768));
    assert_eq!(pipeline.execute().unwrap(), FrameStatus::Rendered);
    assert_eq!(pipeline.stats().recreations, 1);
}

// ============================================================================
// NODE CHAINING / RESIZE PROPAGATION TESTS
// ============================================================================

#[test]
fn test_present_pass_borrows_previous_output() {
    let (device, _display, mut pipeline) = make_pipeline(config());
    let (scene, present) = add_scene_and_present(&mut pipeline);
    device.clear_events();

    pipeline.execute().unwrap();

    let output: Weak<dyn Image> = scene.lock().unwrap().output_image().unwrap();
    let present = present.lock().unwrap();
    let bound = present.bound_input().unwrap();
    assert!(Weak::ptr_eq(bound, &output));

    let commands = commands(&device);
    assert!(commands.contains(&"present_blit:scene::color->swapchain[0]".to_string()));
}

#[test]
fn test_resize_reaches_subscribed_nodes() {
    let (_device, display, mut pipeline) = make_pipeline(config());
    let (scene, present) = add_scene_and_present(&mut pipeline);
    pipeline.execute().unwrap();
    let old_output = scene.lock().unwrap().output_image().unwrap();

    let new_extent = Extent2D::new(1024, 768);
    display.set_extent(new_extent);
    assert_eq!(pipeline.execute().unwrap(), FrameStatus::RenderedAndRecreated);

    {
        let scene = scene.lock().unwrap();
        assert_eq!(scene.render_target().extent(), new_extent);
        assert_eq!(scene.context().extent(), new_extent);
        assert_eq!(scene.context().generation(), 1);
    }
    assert!(old_output.upgrade().is_none());
    assert!(present.lock().unwrap().bound_input().is_none());
    assert_eq!(present.lock().unwrap().context().extent(), new_extent);

    assert_eq!(pipeline.execute().unwrap(), FrameStatus::Rendered);
    let output = scene.lock().unwrap().output_image().unwrap();
    assert!(Weak::ptr_eq(present.lock().unwrap().bound_input().unwrap(), &output));
}

#[test]
fn test_buffers_and_nodes_follow_swapchain_extent() {
    let device = MockGraphicsDevice::new();
    device.pad_swapchain_extent(16);
    let mut pipeline = ProcessingPipeline::new(
        device.clone(),
        PipelineConfig {
            force_color_buffer: true,
            force_depth_buffer: true,
            ..config()
        },
    )
    .unwrap();
    let display = device.display().unwrap();
    let (scene, _present) = add_scene_and_present(&mut pipeline);

    let check = |pipeline: &ProcessingPipeline, expected: Extent2D| {
        let target = pipeline.screen_bound_render_target();
        assert_eq!(target.swapchain().extent(), expected);
        assert_eq!(pipeline.extent(), expected);
        assert_eq!(pipeline.color_buffer().unwrap().desc().extent, expected);
        assert_eq!(pipeline.depth_buffer().unwrap().desc().extent, expected);
        assert!(target.framebuffers().iter().all(|fb| fb.extent() == expected));
    };

    check(&pipeline, Extent2D::new(816, 616));
    assert_eq!(scene.lock().unwrap().context().extent(), Extent2D::new(816, 616));
    pipeline.execute().unwrap();

    display.set_extent(Extent2D::new(1024, 768));
    assert_eq!(pipeline.execute().unwrap(), FrameStatus::RenderedAndRecreated);

    let resized = Extent2D::new(1040, 784);
    check(&pipeline, resized);
    let scene = scene.lock().unwrap();
    assert_eq!(scene.context().extent(), resized);
    assert_eq!(scene.render_target().extent(), resized);
}

#[test]
fn test_dropped_node_handle_stays_subscribed_through_pipeline() {
    let (_device, display, mut pipeline) = make_pipeline(config());
    {
        add_scene_and_present(&mut pipeline);
    }
    display.set_extent(Extent2D::new(320, 240));
    pipeline.execute().unwrap();

    let node = pipeline.processing_node("scene").unwrap().lock().unwrap();
    let scene = node.as_any().downcast_ref::<OffScreenPass>().unwrap();
    assert_eq!(scene.render_target().extent(), Extent2D::new(320, 240));
}

// ============================================================================
// FAILURE TESTS
// ============================================================================

#[test]
fn test_hung_gpu_times_out() {
    let (device, _display, mut pipeline) = make_pipeline(PipelineConfig {
        frame_timeout: Duration::from_millis(10),
        ..config()
    });
    device.stall_gpu(true);

    pipeline.execute().unwrap();
    pipeline.execute().unwrap();
    assert!(matches!(pipeline.execute(), Err(Error::Timeout(_))));
}

#[test]
fn test_submit_failure_is_not_recovered() {
    let (device, _display, mut pipeline) = make_pipeline(config());
    device.fail_submit(true);

    assert_eq!(pipeline.execute(), Err(Error::DeviceLost));
    assert_eq!(pipeline.stats().frames_rendered, 0);
}

#[test]
fn test_submit_failure_stops_later_frames() {
    let (device, _display, mut pipeline) = make_pipeline(config());
    device.fail_submit(true);
    assert_eq!(pipeline.execute(), Err(Error::DeviceLost));

    device.fail_submit(false);
    device.clear_events();
    assert!(matches!(pipeline.execute(), Err(Error::InvalidOperation(_))));
    assert!(matches!(pipeline.execute(), Err(Error::InvalidOperation(_))));
    // Returned before the fence wait and the acquire
    assert!(device.events().is_empty());
    assert_eq!(pipeline.stats().frames_rendered, 0);
}

#[test]
fn test_node_failure_stops_later_frames() {
    let (device, _display, mut pipeline) = make_pipeline(config());
    pipeline
        .create_processing_node(|ctx| {
            Ok(ScreenPass::new("broken", ctx, ClosureAction::new(|_, _| Err(Error::OutOfMemory))))
        })
        .unwrap();

    assert_eq!(pipeline.execute(), Err(Error::OutOfMemory));
    assert_eq!(count(&device, |e| matches!(e, MockEvent::Submit { .. })), 0);

    device.clear_events();
    assert!(matches!(pipeline.execute(), Err(Error::InvalidOperation(_))));
    assert!(device.events().is_empty());
}

#[test]
fn test_drop_waits_for_device_idle() {
    let (device, _display, pipeline) = make_pipeline(config());
    device.clear_events();
    drop(pipeline);
    assert_eq!(device.events(), vec![MockEvent::WaitIdle]);
}
