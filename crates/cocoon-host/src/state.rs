//! Persisted-state codec.
//!
//! The wrapper's saved state is a small JSON document:
//!
//! ```json
//! { "plugin_path": "/path/to/Plugin.clap", "inner_state": "<base64>" }
//! ```
//!
//! `inner_state` is the hosted instance's own opaque state blob.

use crate::error::{HostError, Result};
use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};

/// The unit of save and restore.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PersistedState {
    pub plugin_path: String,
    pub inner_state: Vec<u8>,
}

impl PersistedState {
    pub fn new(plugin_path: impl Into<String>, inner_state: Vec<u8>) -> Self {
        Self {
            plugin_path: plugin_path.into(),
            inner_state,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct StateDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    plugin_path: Option<String>,
    #[serde(default)]
    inner_state: String,
}

pub fn encode(state: &PersistedState) -> Result<Vec<u8>> {
    let document = StateDocument {
        plugin_path: Some(state.plugin_path.clone()),
        inner_state: general_purpose::STANDARD.encode(&state.inner_state),
    };
    serde_json::to_vec(&document).map_err(|e| HostError::StateSaveError(e.to_string()))
}

/// Parse a state document.
///
/// `Ok(None)` when the document has no `plugin_path`: there is nothing to
/// restore. A missing `inner_state` decodes as empty.
pub fn decode(bytes: &[u8]) -> Result<Option<PersistedState>> {
    let document: StateDocument =
        serde_json::from_slice(bytes).map_err(|e| HostError::MalformedState(e.to_string()))?;

    let Some(plugin_path) = document.plugin_path else {
        return Ok(None);
    };

    let inner_state = general_purpose::STANDARD
        .decode(document.inner_state.trim())
        .map_err(|e| HostError::MalformedState(format!("inner_state: {e}")))?;

    Ok(Some(PersistedState {
        plugin_path,
        inner_state,
    }))
}
