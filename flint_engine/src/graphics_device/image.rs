/// Image trait and image descriptors
///
/// Images are the attachments of render targets and the outputs of processing
/// nodes. They are created through `GraphicsDevice::create_image()` and are
/// destroyed when the last owning handle is dropped.

use std::any::Any;
use bitflags::bitflags;

/// Two-dimensional extent in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Extent2D {
    pub width: u32,
    pub height: u32,
}

impl Extent2D {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True when either dimension is 0 (e.g. minimized window)
    pub fn is_zero(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl From<glam::UVec2> for Extent2D {
    fn from(v: glam::UVec2) -> Self {
        Self::new(v.x, v.y)
    }
}

impl From<Extent2D> for glam::UVec2 {
    fn from(e: Extent2D) -> Self {
        glam::UVec2::new(e.width, e.height)
    }
}

/// Image pixel formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum ImageFormat {
    R8G8B8A8_SRGB,
    R8G8B8A8_UNORM,
    B8G8R8A8_SRGB,
    B8G8R8A8_UNORM,
    R16G16B16A16_SFLOAT,
    R32G32B32A32_SFLOAT,
    D16_UNORM,
    D32_FLOAT,
    D24_UNORM_S8_UINT,
}

impl ImageFormat {
    /// True for depth (and depth/stencil) formats
    pub fn is_depth(&self) -> bool {
        matches!(
            self,
            ImageFormat::D16_UNORM | ImageFormat::D32_FLOAT | ImageFormat::D24_UNORM_S8_UINT
        )
    }

    pub fn has_stencil(&self) -> bool {
        matches!(self, ImageFormat::D24_UNORM_S8_UINT)
    }
}

bitflags! {
    /// How an image is going to be used
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ImageUsage: u32 {
        /// Color attachment of a render pass
        const COLOR = 1 << 0;
        /// Depth/stencil attachment of a render pass
        const DEPTH = 1 << 1;
        /// Read from shaders
        const SAMPLED = 1 << 2;
        /// Read/written by compute shaders
        const STORAGE = 1 << 3;
        /// Source of a copy/blit
        const TRANSFER_SRC = 1 << 4;
        /// Destination of a copy/blit
        const TRANSFER_DST = 1 << 5;
    }
}

/// Number of samples per pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MultiSampleCount {
    #[default]
    One,
    Two,
    Four,
    Eight,
    Sixteen,
    ThirtyTwo,
    SixtyFour,
}

impl MultiSampleCount {
    pub fn samples(&self) -> u32 {
        match self {
            MultiSampleCount::One => 1,
            MultiSampleCount::Two => 2,
            MultiSampleCount::Four => 4,
            MultiSampleCount::Eight => 8,
            MultiSampleCount::Sixteen => 16,
            MultiSampleCount::ThirtyTwo => 32,
            MultiSampleCount::SixtyFour => 64,
        }
    }
}

/// Descriptor for creating an image
#[derive(Debug, Clone, PartialEq)]
pub struct ImageDesc {
    /// Debug name
    pub name: String,
    pub extent: Extent2D,
    pub format: ImageFormat,
    pub usage: ImageUsage,
    pub sample_count: MultiSampleCount,
}

impl ImageDesc {
    /// Same image description at another extent (used when attachments are rebuilt)
    pub fn with_extent(&self, extent: Extent2D) -> Self {
        Self { extent, ..self.clone() }
    }
}

/// GPU image
pub trait Image: Send + Sync {
    /// Creation parameters of this image
    fn desc(&self) -> &ImageDesc;

    /// Backend downcasting
    fn as_any(&self) -> &dyn Any;
}
