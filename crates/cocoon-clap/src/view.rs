//! Embedded CLAP editor.

use crate::error::ClapError;
use crate::host::HostRequests;
use clap_sys::ext::gui::{clap_plugin_gui, clap_window, clap_window_handle};
use clap_sys::plugin::clap_plugin;
use cocoon_host::{HostError, PluginView};
use std::ffi::{c_void, CStr};
use tracing::debug;

#[cfg(target_os = "macos")]
pub(crate) const WINDOW_API: &CStr = clap_sys::ext::gui::CLAP_WINDOW_API_COCOA;
#[cfg(target_os = "windows")]
pub(crate) const WINDOW_API: &CStr = clap_sys::ext::gui::CLAP_WINDOW_API_WIN32;
#[cfg(not(any(target_os = "macos", target_os = "windows")))]
pub(crate) const WINDOW_API: &CStr = clap_sys::ext::gui::CLAP_WINDOW_API_X11;

fn window(parent: *mut c_void) -> clap_window {
    #[cfg(target_os = "macos")]
    let specific = clap_window_handle { cocoa: parent };
    #[cfg(target_os = "windows")]
    let specific = clap_window_handle { win32: parent };
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    let specific = clap_window_handle {
        x11: parent as std::ffi::c_ulong,
    };

    clap_window {
        api: WINDOW_API.as_ptr(),
        specific,
    }
}

/// An embedded (non-floating) editor created through `clap.gui`.
///
/// Holds raw pointers into the owning [`ClapInstance`](crate::ClapInstance),
/// which must outlive it. Callers drop every view before the next load or
/// close; the lifecycle manager only asserts this.
pub(crate) struct ClapView {
    plugin: *const clap_plugin,
    gui: *const clap_plugin_gui,
    requests: *const HostRequests,
    shown: bool,
}

impl ClapView {
    /// Create the plugin's GUI. Returns `None` when the plugin refuses.
    ///
    /// # Safety
    /// `plugin` and `gui` must be live, and stay live for the returned view.
    pub(crate) unsafe fn create(
        plugin: *const clap_plugin,
        gui: *const clap_plugin_gui,
        requests: &HostRequests,
    ) -> Option<Self> {
        let create = (*gui).create?;
        if !create(plugin, WINDOW_API.as_ptr(), false) {
            debug!("CLAP plugin refused to create its GUI");
            return None;
        }
        Some(Self {
            plugin,
            gui,
            requests,
            shown: false,
        })
    }

    fn gui(&self) -> &clap_plugin_gui {
        unsafe { &*self.gui }
    }
}

impl PluginView for ClapView {
    fn size(&self) -> Option<(u32, u32)> {
        let get_size = self.gui().get_size?;
        let (mut width, mut height) = (0u32, 0u32);
        unsafe { get_size(self.plugin, &mut width, &mut height) }.then_some((width, height))
    }

    fn attach(&mut self, parent: *mut c_void) -> cocoon_host::Result<(u32, u32)> {
        let set_parent = self
            .gui()
            .set_parent
            .ok_or_else(|| HostError::EditorError(ClapError::MissingExtension("gui.set_parent").to_string()))?;
        let window = window(parent);
        if !unsafe { set_parent(self.plugin, &window) } {
            return Err(HostError::EditorError(ClapError::Rejected("gui set_parent").to_string()));
        }

        let size = self
            .size()
            .ok_or_else(|| HostError::EditorError("could not get GUI size".to_string()))?;
        if let Some(show) = self.gui().show {
            self.shown = unsafe { show(self.plugin) };
        }
        Ok(size)
    }

    fn idle(&mut self) {
        let requests = unsafe { &*self.requests };
        if requests.take_callback() {
            if let Some(on_main_thread) = unsafe { (*self.plugin).on_main_thread } {
                unsafe { on_main_thread(self.plugin) };
            }
        }
    }
}

impl Drop for ClapView {
    fn drop(&mut self) {
        let gui = self.gui();
        if self.shown {
            if let Some(hide) = gui.hide {
                unsafe { hide(self.plugin) };
            }
        }
        if let Some(destroy) = gui.destroy {
            unsafe { destroy(self.plugin) };
        }
    }
}
