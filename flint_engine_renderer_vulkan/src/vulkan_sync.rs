/// Fence - Vulkan implementation of HostSyncPrimitive

use flint_engine::flint::{Error, Result};
use flint_engine::flint::device::HostSyncPrimitive;
use flint_engine::{engine_err, engine_error};
use ash::vk;
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use crate::vulkan_context::GpuContext;

pub struct Fence {
    pub(crate) fence: vk::Fence,
    ctx: Arc<GpuContext>,
}

impl Fence {
    /// Create a fence in the signaled state
    pub(crate) fn new(ctx: Arc<GpuContext>) -> Result<Self> {
        let create_info = vk::FenceCreateInfo::default()
            .flags(vk::FenceCreateFlags::SIGNALED);

        let fence = unsafe { ctx.device.create_fence(&create_info, None) }
            .map_err(|e| engine_err!("flint::vulkan::Fence", "Failed to create fence: {:?}", e))?;

        Ok(Self { fence, ctx })
    }
}

/// Fence timeout in nanoseconds (saturates to "forever")
pub(crate) fn timeout_nanos(timeout: Duration) -> u64 {
    u64::try_from(timeout.as_nanos()).unwrap_or(u64::MAX)
}

impl HostSyncPrimitive for Fence {
    fn wait(&self, timeout: Duration) -> Result<()> {
        let result = unsafe {
            self.ctx.device.wait_for_fences(&[self.fence], true, timeout_nanos(timeout))
        };
        match result {
            Ok(()) => Ok(()),
            Err(vk::Result::TIMEOUT) => {
                engine_error!("flint::vulkan::Fence", "Fence wait expired after {:?}", timeout);
                Err(Error::Timeout(format!("fence wait expired after {:?}", timeout)))
            }
            Err(vk::Result::ERROR_DEVICE_LOST) => {
                engine_error!("flint::vulkan::Fence", "Device lost while waiting on a fence");
                Err(Error::DeviceLost)
            }
            Err(e) => Err(engine_err!("flint::vulkan::Fence", "Failed to wait for fence: {:?}", e)),
        }
    }

    fn reset(&self) -> Result<()> {
        unsafe { self.ctx.device.reset_fences(&[self.fence]) }
            .map_err(|e| engine_err!("flint::vulkan::Fence", "Failed to reset fence: {:?}", e))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for Fence {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_fence(self.fence, None);
        }
    }
}

#[cfg(test)]
#[path = "vulkan_sync_tests.rs"]
mod tests;
