/// Frame synchronizer - one host-waitable primitive per frame-in-flight slot
///
/// Frame N and frame N + buffer_count share a slot. Before the slot's command
/// buffer is recorded again, the primitive signaled by the previous submission
/// of that slot must be waited on. The synchronizer lives as long as its
/// pipeline and is not rebuilt when the render target is recreated.

use std::time::Duration;
use crate::error::{Error, Result};
use crate::graphics_device::{GraphicsDevice, HostSyncPrimitive};
use crate::target::FrameIndex;
use crate::engine_trace;

const SOURCE: &str = "flint::FrameSynchronizer";

/// Wait timeout meaning "wait forever"
pub const INFINITE_TIMEOUT: Duration = Duration::MAX;

/// Per-slot host synchronization primitives
pub struct FrameSynchronizer {
    primitives: Vec<Box<dyn HostSyncPrimitive>>,
    timeout: Duration,
}

impl FrameSynchronizer {
    /// Create `buffer_count` signaled primitives
    ///
    /// # Errors
    ///
    /// `InvalidArgument` when `buffer_count` is 0, plus any device error.
    pub fn new(device: &dyn GraphicsDevice, buffer_count: u32, timeout: Duration) -> Result<Self> {
        if buffer_count == 0 {
            return Err(Error::InvalidArgument(
                "frame synchronizer needs at least one slot".to_string()
            ).logged(SOURCE));
        }

        let primitives = (0..buffer_count)
            .map(|_| device.create_host_sync_primitive())
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { primitives, timeout })
    }

    pub fn buffer_count(&self) -> u32 {
        self.primitives.len() as u32
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Primitive of `frame_index`'s slot
    pub fn primitive(&self, frame_index: FrameIndex) -> Result<&dyn HostSyncPrimitive> {
        self.primitives
            .get(frame_index.as_usize())
            .map(|p| p.as_ref())
            .ok_or(Error::IndexOutOfRange {
                index: frame_index.as_usize(),
                len: self.primitives.len(),
            })
    }

    /// Block until the previous submission of `frame_index`'s slot has completed
    ///
    /// A timeout is fatal: it is logged and returned as `Error::Timeout`.
    pub fn wait(&self, frame_index: FrameIndex) -> Result<()> {
        engine_trace!(SOURCE, "Waiting on {}", frame_index);
        self.primitive(frame_index)?
            .wait(self.timeout)
            .map_err(|err| match err {
                Error::Timeout(_) => Error::Timeout(format!(
                    "{} not signaled within {:?}", frame_index, self.timeout
                )).logged(SOURCE),
                other => other,
            })
    }

    /// Unsignal `frame_index`'s primitive before it is attached to a new submission
    pub fn reset(&self, frame_index: FrameIndex) -> Result<()> {
        self.primitive(frame_index)?.reset()
    }

    /// Wait on every slot (e.g. before tearing resources down)
    pub fn wait_all(&self) -> Result<()> {
        (0..self.buffer_count()).try_for_each(|index| self.wait(FrameIndex::new(index)))
    }
}

#[cfg(test)]
#[path = "frame_synchronizer_tests.rs"]
mod tests;
