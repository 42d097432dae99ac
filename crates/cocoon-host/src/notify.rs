//! Change notification.

use parking_lot::Mutex;
use std::sync::Arc;

type Listener = Arc<dyn Fn() + Send + Sync>;

/// Subscription list fired once per settled lifecycle transition.
///
/// Listeners take no arguments; they re-read state from the host.
/// No ordering is guaranteed between listeners.
#[derive(Default)]
pub struct ChangeBroadcaster {
    listeners: Mutex<Vec<Listener>>,
}

impl ChangeBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: impl Fn() + Send + Sync + 'static) {
        self.listeners.lock().push(Arc::new(listener));
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    /// Call every listener. The list lock is not held while they run, so a
    /// listener may subscribe or trigger another transition.
    pub fn notify(&self) {
        let listeners: Vec<Listener> = self.listeners.lock().clone();
        for listener in listeners {
            listener();
        }
    }
}
