/// Resize signal - publish/subscribe notification of render target recreation
///
/// Render targets emit a `ResizeEvent` after every successful recreate. Nodes
/// owning extent-dependent resources subscribe themselves and drop any image
/// reference cached before the event.

use std::sync::{Arc, Mutex, Weak};
use slotmap::{new_key_type, SlotMap};
use crate::error::{Error, Result};
use crate::graphics_device::{Extent2D, Image};

const SOURCE: &str = "flint::ResizeSignal";

new_key_type! {
    /// Handle returned by `ResizeSignal::subscribe()`
    pub struct SubscriptionKey;
}

/// Emitted once per successful recreate
#[derive(Clone)]
pub struct ResizeEvent {
    /// New extent of the render target
    pub extent: Extent2D,
    /// Recreate generation of the render target after the rebuild
    pub generation: u64,
    /// Non-owning references to the rebuilt attachments, in attachment order
    pub attachments: Vec<Weak<dyn Image>>,
}

impl ResizeEvent {
    /// Weak reference to the rebuilt attachment at `index`
    pub fn attachment(&self, index: usize) -> Option<Weak<dyn Image>> {
        self.attachments.get(index).cloned()
    }
}

/// Receives resize events
pub trait ResizeListener: Send {
    fn on_resized(&mut self, event: &ResizeEvent) -> Result<()>;
}

/// Subscriber list of a render target
///
/// Holds listeners weakly: dropping a node unsubscribes it.
#[derive(Default)]
pub struct ResizeSignal {
    subscribers: SlotMap<SubscriptionKey, Weak<Mutex<dyn ResizeListener>>>,
}

impl ResizeSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `listener` to future resize events
    pub fn subscribe<L: ResizeListener + 'static>(&mut self, listener: &Arc<Mutex<L>>) -> SubscriptionKey {
        let listener: Arc<Mutex<dyn ResizeListener>> = listener.clone();
        self.subscribers.insert(Arc::downgrade(&listener))
    }

    /// Remove a subscription. Returns false if it was already gone.
    pub fn unsubscribe(&mut self, key: SubscriptionKey) -> bool {
        self.subscribers.remove(key).is_some()
    }

    /// Number of subscribers still alive
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .values()
            .filter(|listener| listener.strong_count() > 0)
            .count()
    }

    /// Deliver `event` to every live subscriber
    ///
    /// Subscribers that have been dropped are pruned. Returns the number of
    /// listeners notified. The first listener error aborts delivery.
    pub fn emit(&mut self, event: &ResizeEvent) -> Result<usize> {
        self.subscribers.retain(|_, listener| listener.strong_count() > 0);

        let mut notified = 0;
        for listener in self.subscribers.values() {
            let Some(listener) = listener.upgrade() else {
                continue;
            };
            let mut guard = listener
                .lock()
                .map_err(|_| Error::BackendError("Resize listener lock poisoned".to_string()).logged(SOURCE))?;
            guard.on_resized(event)?;
            notified += 1;
        }
        Ok(notified)
    }
}

#[cfg(test)]
#[path = "resize_signal_tests.rs"]
mod tests;
