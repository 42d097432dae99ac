//! An opened `.clap` binary.

use crate::error::{ClapError, LoadStage, Result};
use clap_sys::entry::clap_plugin_entry;
use clap_sys::factory::plugin_factory::{clap_plugin_factory, CLAP_PLUGIN_FACTORY_ID};
use clap_sys::host::clap_host;
use clap_sys::plugin::{clap_plugin, clap_plugin_descriptor};
use std::ffi::{c_char, CStr, CString};
use std::path::{Path, PathBuf};
use std::ptr;

/// Descriptor fields copied out of the binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ClapPluginInfo {
    pub id: String,
    pub name: String,
    pub vendor: String,
    pub version: String,
    pub features: Vec<String>,
}

/// Keeps the library mapped and its entry initialised.
///
/// `deinit` runs on drop, before the library itself is unloaded.
pub(crate) struct ClapLibrary {
    entry: *const clap_plugin_entry,
    factory: *const clap_plugin_factory,
    path: PathBuf,
    _library: libloading::Library,
}

// Safety: the entry and factory are immutable tables inside the mapped binary.
unsafe impl Send for ClapLibrary {}
unsafe impl Sync for ClapLibrary {}

impl ClapLibrary {
    pub(crate) fn open(path: &Path) -> Result<Self> {
        let library = unsafe { libloading::Library::new(path) }.map_err(|e| {
            ClapError::load(path, LoadStage::Opening, format!("failed to load library: {e}"))
        })?;

        let entry = unsafe {
            let symbol: libloading::Symbol<*const clap_plugin_entry> =
                library.get(b"clap_entry\0").map_err(|e| {
                    ClapError::load(path, LoadStage::Opening, format!("no clap_entry symbol: {e}"))
                })?;
            *symbol
        };
        if entry.is_null() {
            return Err(ClapError::load(path, LoadStage::Opening, "clap_entry is null"));
        }

        let entry_ref = unsafe { &*entry };
        if entry_ref.clap_version.major < 1 {
            return Err(ClapError::load(
                path,
                LoadStage::Opening,
                format!("unsupported CLAP version {}", entry_ref.clap_version.major),
            ));
        }

        let path_str = path
            .to_str()
            .ok_or_else(|| ClapError::load(path, LoadStage::Opening, "path contains invalid UTF-8"))?;
        let c_path = CString::new(path_str)
            .map_err(|_| ClapError::load(path, LoadStage::Opening, "path contains a null byte"))?;
        let init = entry_ref
            .init
            .ok_or_else(|| ClapError::load(path, LoadStage::Opening, "no entry init function"))?;
        if !unsafe { init(c_path.as_ptr()) } {
            return Err(ClapError::load(path, LoadStage::Opening, "entry init failed"));
        }

        // initialised: from here on, dropping `opened` runs deinit
        let mut opened = Self {
            entry,
            factory: ptr::null(),
            path: path.to_path_buf(),
            _library: library,
        };

        let get_factory = entry_ref
            .get_factory
            .ok_or_else(|| ClapError::load(path, LoadStage::Factory, "no get_factory function"))?;
        let factory = unsafe { get_factory(CLAP_PLUGIN_FACTORY_ID.as_ptr()) };
        if factory.is_null() {
            return Err(ClapError::load(path, LoadStage::Factory, "no plugin factory"));
        }
        opened.factory = factory as *const clap_plugin_factory;

        Ok(opened)
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    fn factory(&self) -> &clap_plugin_factory {
        unsafe { &*self.factory }
    }

    pub(crate) fn plugin_count(&self) -> u32 {
        match self.factory().get_plugin_count {
            Some(count) => unsafe { count(self.factory) },
            None => 0,
        }
    }

    fn raw_descriptor(&self, index: u32) -> Option<&clap_plugin_descriptor> {
        let get = self.factory().get_plugin_descriptor?;
        let desc = unsafe { get(self.factory, index) };
        if desc.is_null() {
            None
        } else {
            Some(unsafe { &*desc })
        }
    }

    /// Factory descriptors in factory order. Entries without an id are skipped.
    pub(crate) fn plugins(&self) -> Vec<ClapPluginInfo> {
        (0..self.plugin_count())
            .filter_map(|index| self.raw_descriptor(index))
            .filter(|desc| !desc.id.is_null())
            .map(|desc| {
                let id = c_string(desc.id);
                let name = if desc.name.is_null() {
                    id.clone()
                } else {
                    c_string(desc.name)
                };
                ClapPluginInfo {
                    name,
                    vendor: c_string(desc.vendor),
                    version: c_string(desc.version),
                    features: parse_features(desc.features),
                    id,
                }
            })
            .collect()
    }

    /// Create (but do not init) the plugin with `id`.
    pub(crate) fn create_plugin(&self, host: *const clap_host, id: &str) -> Result<*const clap_plugin> {
        let c_id = CString::new(id).map_err(|_| {
            ClapError::load(&self.path, LoadStage::Instantiation, "plugin id contains a null byte")
        })?;
        let create = self.factory().create_plugin.ok_or_else(|| {
            ClapError::load(&self.path, LoadStage::Instantiation, "no create_plugin function")
        })?;
        let plugin = unsafe { create(self.factory, host, c_id.as_ptr()) };
        if plugin.is_null() {
            return Err(ClapError::load(
                &self.path,
                LoadStage::Instantiation,
                format!("factory refused to create {id}"),
            ));
        }
        Ok(plugin)
    }
}

impl Drop for ClapLibrary {
    fn drop(&mut self) {
        let entry = unsafe { &*self.entry };
        if let Some(deinit) = entry.deinit {
            unsafe { deinit() };
        }
    }
}

pub(crate) fn c_string(ptr: *const c_char) -> String {
    if ptr.is_null() {
        return String::new();
    }
    unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
}

/// Read a null-terminated array of C strings.
pub(crate) fn parse_features(features: *const *const c_char) -> Vec<String> {
    let mut parsed = Vec::new();
    if features.is_null() {
        return parsed;
    }
    let mut i = 0;
    loop {
        let feature = unsafe { *features.add(i) };
        if feature.is_null() {
            break;
        }
        parsed.push(c_string(feature));
        i += 1;
    }
    parsed
}
