//! The `clap_host` each plugin instance calls back into.

use clap_sys::host::clap_host;
use clap_sys::version::CLAP_VERSION;
use std::ffi::{c_char, c_void};
use std::ptr;
use std::sync::atomic::{AtomicBool, Ordering};

/// Flags a plugin raises through its host pointer.
#[derive(Debug, Default)]
pub(crate) struct HostRequests {
    callback: AtomicBool,
    restart: AtomicBool,
}

impl HostRequests {
    /// Whether `on_main_thread` is owed. Clears the flag.
    pub(crate) fn take_callback(&self) -> bool {
        self.callback.swap(false, Ordering::AcqRel)
    }

    /// Whether the plugin asked to be deactivated and reactivated. Clears the flag.
    pub(crate) fn take_restart(&self) -> bool {
        self.restart.swap(false, Ordering::AcqRel)
    }
}

/// Owns the `clap_host` table and the request flags it points at. Both are
/// boxed so their addresses survive moves of this struct.
pub(crate) struct ClapHost {
    raw: Box<clap_host>,
    requests: Box<HostRequests>,
}

impl ClapHost {
    pub(crate) fn new() -> Self {
        let requests = Box::new(HostRequests::default());
        let raw = Box::new(clap_host {
            clap_version: CLAP_VERSION,
            host_data: &*requests as *const HostRequests as *mut c_void,
            name: c"cocoon".as_ptr(),
            vendor: c"cocoon".as_ptr(),
            url: c"".as_ptr(),
            version: c"0.0.1".as_ptr(),
            get_extension: Some(get_extension),
            request_restart: Some(request_restart),
            request_process: Some(request_process),
            request_callback: Some(request_callback),
        });
        Self { raw, requests }
    }

    pub(crate) fn as_ptr(&self) -> *const clap_host {
        &*self.raw
    }

    pub(crate) fn requests(&self) -> &HostRequests {
        &self.requests
    }
}

unsafe fn requests_from<'a>(host: *const clap_host) -> Option<&'a HostRequests> {
    if host.is_null() {
        return None;
    }
    ((*host).host_data as *const HostRequests).as_ref()
}

unsafe extern "C" fn get_extension(
    _host: *const clap_host,
    _extension_id: *const c_char,
) -> *const c_void {
    ptr::null()
}

unsafe extern "C" fn request_restart(host: *const clap_host) {
    if let Some(requests) = requests_from(host) {
        requests.restart.store(true, Ordering::Release);
    }
}

unsafe extern "C" fn request_process(_host: *const clap_host) {}

unsafe extern "C" fn request_callback(host: *const clap_host) {
    if let Some(requests) = requests_from(host) {
        requests.callback.store(true, Ordering::Release);
    }
}
