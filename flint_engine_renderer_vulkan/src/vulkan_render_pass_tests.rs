//! Unit tests for the attachment layout of render passes (no GPU required)

use super::subpass_layout;
use flint_engine::flint::device::{
    AttachmentDesc, ImageFormat, LoadOp, MultiSampleCount, RenderPassDesc, SwapchainAttachmentDesc,
};
use ash::vk;

fn color(samples: MultiSampleCount) -> AttachmentDesc {
    AttachmentDesc { format: ImageFormat::B8G8R8A8_SRGB, sample_count: samples, load_op: LoadOp::Clear }
}

fn depth(samples: MultiSampleCount) -> AttachmentDesc {
    AttachmentDesc { format: ImageFormat::D24_UNORM_S8_UINT, sample_count: samples, load_op: LoadOp::Clear }
}

fn swapchain(load_op: LoadOp) -> Option<SwapchainAttachmentDesc> {
    Some(SwapchainAttachmentDesc { format: ImageFormat::B8G8R8A8_SRGB, load_op })
}

// ============================================================================
// SWAPCHAIN ATTACHMENT TESTS
// ============================================================================

#[test]
fn test_swapchain_is_the_only_color_attachment_without_owned_color() {
    let desc = RenderPassDesc { attachments: vec![depth(MultiSampleCount::One)], swapchain: swapchain(LoadOp::Clear) };
    let layout = subpass_layout(&desc);

    assert_eq!(layout.attachments.len(), 2);
    assert_eq!(layout.color_refs.len(), 1);
    assert_eq!(layout.color_refs[0].attachment, 1);
    assert!(layout.resolve_refs.is_empty());
    assert_eq!(layout.depth_ref.map(|r| r.attachment), Some(0));
    assert_eq!(layout.attachments[1].load_op, vk::AttachmentLoadOp::CLEAR);
    assert_eq!(layout.attachments[1].final_layout, vk::ImageLayout::PRESENT_SRC_KHR);
}

#[test]
fn test_swapchain_resolves_multisampled_color() {
    let desc = RenderPassDesc {
        attachments: vec![color(MultiSampleCount::Four), depth(MultiSampleCount::Four)],
        swapchain: swapchain(LoadOp::DontCare),
    };
    let layout = subpass_layout(&desc);

    assert_eq!(layout.attachments.len(), 3);
    assert_eq!(layout.color_refs.len(), 1);
    assert_eq!(layout.resolve_refs.len(), 1);
    assert_eq!(layout.resolve_refs[0].attachment, 2);
    assert_eq!(layout.attachments[2].load_op, vk::AttachmentLoadOp::DONT_CARE);
    assert_eq!(layout.attachments[0].samples, vk::SampleCountFlags::TYPE_4);
}

#[test]
fn test_off_screen_pass_has_no_swapchain_attachment() {
    let desc = RenderPassDesc { attachments: vec![color(MultiSampleCount::One)], swapchain: None };
    let layout = subpass_layout(&desc);

    assert_eq!(layout.attachments.len(), 1);
    assert!(layout.resolve_refs.is_empty());
    assert!(layout.depth_ref.is_none());
    assert_eq!(layout.attachments[0].initial_layout, vk::ImageLayout::UNDEFINED);
    assert_eq!(layout.attachments[0].final_layout, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);
}

#[test]
fn test_loaded_attachment_starts_in_attachment_layout() {
    let desc = RenderPassDesc {
        attachments: vec![AttachmentDesc { load_op: LoadOp::Load, ..color(MultiSampleCount::One) }],
        swapchain: None,
    };
    let layout = subpass_layout(&desc);
    assert_eq!(layout.attachments[0].initial_layout, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);
}
