//! Flint demo
//!
//! Opens a window and renders an off-screen pass that is blitted to the
//! swapchain every redraw. Resizing, minimizing and closing the window
//! exercise the render target recreation path.

use std::sync::Arc;

use flint_engine::flint::device::{DeviceConfig, GraphicsDevice, ImageFormat};
use flint_engine::flint::processing::{
    FrameStatus, FullFrameAction, OffScreenPass, PipelineConfig, PresentPass, ProcessingPipeline,
};
use flint_engine::flint::{Error, Result};
use flint_engine::glam::Vec4;
use flint_engine::{engine_error, engine_info};
use flint_engine_renderer_vulkan::VulkanGraphicsDevice;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

const SOURCE: &str = "flint::demo";

struct App {
    device: Option<Arc<VulkanGraphicsDevice>>,
    pipeline: Option<ProcessingPipeline>,
}

impl App {
    fn new() -> Self {
        Self { device: None, pipeline: None }
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attributes = Window::default_attributes()
            .with_title("Flint Demo")
            .with_inner_size(PhysicalSize::new(1280, 720));
        let window = event_loop
            .create_window(attributes)
            .map_err(|e| Error::InitializationFailed(format!("Failed to create window: {}", e)))?;

        let config = DeviceConfig {
            enable_validation: cfg!(feature = "vulkan-validation"),
            app_name: "Flint Demo".to_string(),
            ..Default::default()
        };
        let device = Arc::new(VulkanGraphicsDevice::new(Arc::new(window), config)?);

        let mut pipeline = ProcessingPipeline::new(
            device.clone(),
            PipelineConfig {
                display_title: "Flint Demo".to_string(),
                force_depth_buffer: true,
                ..Default::default()
            },
        )?;
        pipeline.create_subscribed_processing_node(|ctx| {
            OffScreenPass::new(
                "scene",
                ctx,
                ImageFormat::R8G8B8A8_UNORM,
                Vec4::new(0.05, 0.25, 0.45, 1.0),
                true,
                FullFrameAction,
            )
        })?;
        pipeline.create_subscribed_processing_node(|ctx| Ok(PresentPass::new("present", ctx)))?;

        engine_info!(SOURCE, "Initialization complete ({} frames in flight), entering main loop",
            pipeline.buffer_count());
        self.device = Some(device);
        self.pipeline = Some(pipeline);
        Ok(())
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(device) = &self.device {
            if let Err(e) = device.wait_idle() {
                engine_error!(SOURCE, "wait_idle failed during shutdown: {}", e);
            }
        }
        // Nodes and render targets go before the device
        self.pipeline = None;
        self.device = None;
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.pipeline.is_some() {
            return;
        }
        if let Err(e) = self.init(event_loop) {
            engine_error!(SOURCE, "Failed to initialize: {}", e);
            event_loop.exit();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                engine_info!(SOURCE, "Close requested, shutting down");
                if let Some(device) = &self.device {
                    device.vulkan_display().notify_close_requested();
                }
                self.shutdown(event_loop);
            }
            WindowEvent::Resized(size) => {
                engine_info!(SOURCE, "Window resized to {}x{}", size.width, size.height);
                if let Some(device) = &self.device {
                    device.vulkan_display().notify_resized();
                }
            }
            WindowEvent::RedrawRequested => {
                let Some(pipeline) = self.pipeline.as_mut() else {
                    return;
                };
                match pipeline.execute() {
                    Ok(FrameStatus::Rendered) => {}
                    Ok(status) => {
                        engine_info!(SOURCE, "{:?} at {}x{}", status,
                            pipeline.extent().width, pipeline.extent().height);
                    }
                    Err(e) => {
                        engine_error!(SOURCE, "Render error: {}", e);
                        self.shutdown(event_loop);
                    }
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(device) = &self.device {
            device.vulkan_display().window().request_redraw();
        }
    }
}

fn main() {
    engine_info!(SOURCE, "Starting Flint demo");

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(e) => {
            engine_error!(SOURCE, "Failed to create event loop: {}", e);
            std::process::exit(1);
        }
    };
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new();
    if let Err(e) = event_loop.run_app(&mut app) {
        engine_error!(SOURCE, "Event loop error: {}", e);
        std::process::exit(1);
    }
}
