/// Host synchronization primitive - a fence the CPU can wait on

use std::any::Any;
use std::time::Duration;
use crate::error::Result;

/// Host-waitable synchronization primitive
///
/// Created in the signaled state so the first wait of every frame slot returns
/// immediately. The GPU signals it when the submission it was attached to
/// completes.
pub trait HostSyncPrimitive: Send + Sync {
    /// Block until signaled or until `timeout` expires
    ///
    /// Expiry is reported as `Error::Timeout` and is fatal for the caller.
    fn wait(&self, timeout: Duration) -> Result<()>;

    /// Return to the unsignaled state
    fn reset(&self) -> Result<()>;

    /// Backend downcasting
    fn as_any(&self) -> &dyn Any;
}
