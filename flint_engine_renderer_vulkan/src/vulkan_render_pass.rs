/// RenderPass - Vulkan implementation of the RenderPass trait
///
/// Owned attachments come first, in render target order. The swapchain image,
/// when it takes part in the pass, is appended last: as the resolve target of
/// the first multisampled color attachment, or as the only color attachment
/// when the target owns none.

use flint_engine::flint::Result;
use flint_engine::flint::device::{LoadOp, RenderPass as EngineRenderPass, RenderPassDesc};
use flint_engine::engine_err;
use ash::vk;
use std::any::Any;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;
use crate::vulkan_format::{attachment_layout, format_to_vk, load_op_to_vk, samples_to_vk};

/// Vulkan render pass implementation
pub struct RenderPass {
    pub(crate) render_pass: vk::RenderPass,
    pub(crate) desc: RenderPassDesc,
    ctx: Arc<GpuContext>,
}

/// Attachment descriptions and references of one single-subpass render pass
#[derive(Debug, Default)]
pub(crate) struct SubpassLayout {
    pub attachments: Vec<vk::AttachmentDescription>,
    pub color_refs: Vec<vk::AttachmentReference>,
    pub resolve_refs: Vec<vk::AttachmentReference>,
    pub depth_ref: Option<vk::AttachmentReference>,
}

/// Build the attachment list of `desc`
///
/// Owned attachments are left in their attachment-optimal layout so later
/// copies and blits can transition them from a known state. The swapchain
/// image ends in PRESENT_SRC.
pub(crate) fn subpass_layout(desc: &RenderPassDesc) -> SubpassLayout {
    let mut layout = SubpassLayout::default();

    for (i, attachment) in desc.attachments.iter().enumerate() {
        let final_layout = attachment_layout(attachment.format);
        let initial_layout = match attachment.load_op {
            LoadOp::Load => final_layout,
            _ => vk::ImageLayout::UNDEFINED,
        };
        layout.attachments.push(vk::AttachmentDescription::default()
            .format(format_to_vk(attachment.format))
            .samples(samples_to_vk(attachment.sample_count))
            .load_op(load_op_to_vk(attachment.load_op))
            .store_op(vk::AttachmentStoreOp::STORE)
            .stencil_load_op(load_op_to_vk(attachment.load_op))
            .stencil_store_op(vk::AttachmentStoreOp::STORE)
            .initial_layout(initial_layout)
            .final_layout(final_layout));

        let reference = vk::AttachmentReference::default()
            .attachment(i as u32)
            .layout(final_layout);
        if attachment.format.is_depth() {
            layout.depth_ref = Some(reference);
        } else {
            layout.color_refs.push(reference);
        }
    }

    if let Some(swapchain) = &desc.swapchain {
        let index = layout.attachments.len() as u32;
        layout.attachments.push(vk::AttachmentDescription::default()
            .format(format_to_vk(swapchain.format))
            .samples(vk::SampleCountFlags::TYPE_1)
            .load_op(load_op_to_vk(swapchain.load_op))
            .store_op(vk::AttachmentStoreOp::STORE)
            .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
            .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .final_layout(vk::ImageLayout::PRESENT_SRC_KHR));

        let reference = vk::AttachmentReference::default()
            .attachment(index)
            .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);

        let multisampled_color = desc
            .attachments
            .iter()
            .filter(|a| !a.format.is_depth())
            .position(|a| a.sample_count.samples() > 1);

        match multisampled_color {
            Some(resolved) => {
                layout.resolve_refs = (0..layout.color_refs.len())
                    .map(|i| if i == resolved {
                        reference
                    } else {
                        vk::AttachmentReference::default()
                            .attachment(vk::ATTACHMENT_UNUSED)
                            .layout(vk::ImageLayout::UNDEFINED)
                    })
                    .collect();
            }
            None => layout.color_refs.push(reference),
        }
    }

    layout
}

impl RenderPass {
    pub(crate) fn new(ctx: Arc<GpuContext>, desc: &RenderPassDesc) -> Result<Self> {
        let layout = subpass_layout(desc);

        let mut subpass = vk::SubpassDescription::default()
            .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
            .color_attachments(&layout.color_refs);
        if !layout.resolve_refs.is_empty() {
            subpass = subpass.resolve_attachments(&layout.resolve_refs);
        }
        if let Some(ref depth_ref) = layout.depth_ref {
            subpass = subpass.depth_stencil_attachment(depth_ref);
        }

        // Depth stages join the dependency when a depth attachment is present
        let (stage_mask, access_mask) = if layout.depth_ref.is_some() {
            (
                vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
                    | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS,
                vk::AccessFlags::COLOR_ATTACHMENT_WRITE
                    | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
            )
        } else {
            (
                vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
                vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
            )
        };

        let dependency = vk::SubpassDependency::default()
            .src_subpass(vk::SUBPASS_EXTERNAL)
            .dst_subpass(0)
            .src_stage_mask(stage_mask)
            .src_access_mask(vk::AccessFlags::empty())
            .dst_stage_mask(stage_mask)
            .dst_access_mask(access_mask);

        let render_pass_info = vk::RenderPassCreateInfo::default()
            .attachments(&layout.attachments)
            .subpasses(std::slice::from_ref(&subpass))
            .dependencies(std::slice::from_ref(&dependency));

        let render_pass = unsafe { ctx.device.create_render_pass(&render_pass_info, None) }
            .map_err(|e| engine_err!("flint::vulkan", "Failed to create render pass: {:?}", e))?;

        Ok(Self { render_pass, desc: desc.clone(), ctx })
    }
}

impl EngineRenderPass for RenderPass {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for RenderPass {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_render_pass(self.render_pass, None);
        }
    }
}

#[cfg(test)]
#[path = "vulkan_render_pass_tests.rs"]
mod tests;
