/// Frame-in-flight and swapchain image indices
///
/// The two indices advance independently: the frame index cycles through the
/// buffered slots in order, while the presentation engine hands out image
/// indices in whatever order images become available. Distinct types keep
/// fences from being selected by image index and framebuffers by frame index.

use std::fmt;

/// Frame-in-flight slot, in `[0, buffer_count)`
///
/// Selects the command buffer and the host synchronization primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct FrameIndex(u32);

impl FrameIndex {
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    pub fn get(&self) -> u32 {
        self.0
    }

    pub fn as_usize(&self) -> usize {
        self.0 as usize
    }

    /// Next slot, wrapping at `buffer_count`
    pub fn next(&self, buffer_count: u32) -> Self {
        debug_assert!(buffer_count > 0);
        Self((self.0 + 1) % buffer_count)
    }
}

impl fmt::Display for FrameIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "frame {}", self.0)
    }
}

/// Swapchain image chosen by the presentation engine
///
/// Selects the screen-bound framebuffer and the render-finished semaphore.
/// Only meaningful between a successful acquire and the matching present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageIndex(u32);

impl ImageIndex {
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    pub fn get(&self) -> u32 {
        self.0
    }

    pub fn as_usize(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ImageIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "image {}", self.0)
    }
}
