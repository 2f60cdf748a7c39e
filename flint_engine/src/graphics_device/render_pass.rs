/// RenderPass trait - describes how the attachments of a render target are used

use std::any::Any;
use std::sync::Arc;
use crate::graphics_device::{Image, ImageFormat, MultiSampleCount};

/// Render pass
///
/// Describes how attachments are loaded, stored and transitioned. Rebuilt
/// together with the framebuffers whenever a render target is recreated.
pub trait RenderPass: Send + Sync {
    /// Backend downcasting
    fn as_any(&self) -> &dyn Any;
}

/// Load operation for an attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOp {
    /// Load existing content
    Load,
    /// Clear the content
    Clear,
    /// Don't care about existing content
    DontCare,
}

/// Descriptor for a single owned attachment in a render pass
#[derive(Debug, Clone, PartialEq)]
pub struct AttachmentDesc {
    pub format: ImageFormat,
    pub sample_count: MultiSampleCount,
    pub load_op: LoadOp,
}

/// Descriptor for the swapchain image attachment of a screen-bound render pass
///
/// When a multisampled color attachment exists, the swapchain image is its
/// resolve target. Otherwise it is rendered to directly.
#[derive(Debug, Clone, PartialEq)]
pub struct SwapchainAttachmentDesc {
    pub format: ImageFormat,
    pub load_op: LoadOp,
}

/// Descriptor for creating a render pass
#[derive(Debug, Clone, PartialEq)]
pub struct RenderPassDesc {
    /// Owned attachments, in render target order
    pub attachments: Vec<AttachmentDesc>,
    /// Swapchain image, appended after the owned attachments
    pub swapchain: Option<SwapchainAttachmentDesc>,
}

impl RenderPassDesc {
    /// Describe a render pass clearing every attachment of `images`
    pub fn for_images(images: &[Arc<dyn Image>], swapchain: Option<SwapchainAttachmentDesc>) -> Self {
        Self {
            attachments: images
                .iter()
                .map(|image| AttachmentDesc {
                    format: image.desc().format,
                    sample_count: image.desc().sample_count,
                    load_op: LoadOp::Clear,
                })
                .collect(),
            swapchain,
        }
    }
}
