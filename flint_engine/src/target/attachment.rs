/// Render target attachments

use std::sync::Arc;
use glam::Vec4;
use crate::graphics_device::{ClearValue, Image};

/// One image of a render target together with the value it is cleared to
///
/// The render target holds the owning handle. Nodes only ever receive
/// `Weak` references to the image.
#[derive(Clone)]
pub struct RenderTargetAttachment {
    pub image: Arc<dyn Image>,
    pub clear_value: ClearValue,
}

impl RenderTargetAttachment {
    pub fn new(image: Arc<dyn Image>, clear_value: ClearValue) -> Self {
        Self { image, clear_value }
    }

    /// Color attachment cleared to `color`
    pub fn color(image: Arc<dyn Image>, color: Vec4) -> Self {
        Self::new(image, ClearValue::Color(color))
    }

    /// Depth/stencil attachment cleared to `depth` / `stencil`
    pub fn depth(image: Arc<dyn Image>, depth: f32, stencil: u32) -> Self {
        Self::new(image, ClearValue::DepthStencil { depth, stencil })
    }

    pub fn is_depth(&self) -> bool {
        self.image.desc().format.is_depth()
    }
}
