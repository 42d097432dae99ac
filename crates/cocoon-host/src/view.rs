//! Caller-owned editor handles.

use crate::error::Result;
use crate::instance::PluginView;
use std::ffi::c_void;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Counts editor handles that are still alive for one host.
#[derive(Debug, Clone, Default)]
pub(crate) struct ViewTracker {
    live: Arc<AtomicUsize>,
}

impl ViewTracker {
    pub(crate) fn live(&self) -> usize {
        self.live.load(Ordering::Acquire)
    }

    fn acquire(&self) -> ViewToken {
        self.live.fetch_add(1, Ordering::AcqRel);
        ViewToken {
            live: Arc::clone(&self.live),
        }
    }
}

struct ViewToken {
    live: Arc<AtomicUsize>,
}

impl Drop for ViewToken {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::AcqRel);
    }
}

/// The hosted plugin's editor, owned by the view layer.
///
/// Must be dropped before the next `load` or `close` on the host that
/// handed it out.
pub struct ViewHandle {
    // dropped first: the editor is torn down before the token is released
    view: Box<dyn PluginView>,
    _token: ViewToken,
}

impl ViewHandle {
    pub(crate) fn new(view: Box<dyn PluginView>, tracker: &ViewTracker) -> Self {
        Self {
            view,
            _token: tracker.acquire(),
        }
    }

    pub fn size(&self) -> Option<(u32, u32)> {
        self.view.size()
    }

    pub fn attach(&mut self, parent: *mut c_void) -> Result<(u32, u32)> {
        self.view.attach(parent)
    }

    pub fn idle(&mut self) {
        self.view.idle();
    }
}

impl std::fmt::Debug for ViewHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewHandle")
            .field("size", &self.view.size())
            .finish()
    }
}
