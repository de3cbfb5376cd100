//! The launcher profile a remote generator appears as.

use std::fmt;
use std::sync::Arc;

use biomewire_registry::ProfileSelection;

use crate::REMOTE_VERSION_ID;

/// A map viewer's profile entry for a remote generator.
///
/// Remote profiles have no game jar or saves directory; they name the
/// endpoint and share the biome profile selection the client resets after
/// each world creation.
#[derive(Clone)]
pub struct RemoteProfile {
    name: String,
    endpoint: String,
    biome_profiles: Arc<dyn ProfileSelection>,
}

impl RemoteProfile {
    pub fn new(endpoint: &str, biome_profiles: Arc<dyn ProfileSelection>) -> Self {
        Self {
            name: format!("Remote connection to {endpoint}"),
            endpoint: endpoint.to_string(),
            biome_profiles,
        }
    }

    /// Display name, `Remote connection to <endpoint>`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Always [`REMOTE_VERSION_ID`].
    pub fn version_id(&self) -> &'static str {
        REMOTE_VERSION_ID
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn biome_profiles(&self) -> &Arc<dyn ProfileSelection> {
        &self.biome_profiles
    }
}

impl fmt::Debug for RemoteProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteProfile")
            .field("name", &self.name)
            .field("version_id", &REMOTE_VERSION_ID)
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}
