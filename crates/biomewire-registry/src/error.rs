//! Error types for the registry layer.

use biomewire_protocol::BiomeId;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Registered biomes are never replaced; a second registration under
    /// the same id is refused.
    #[error("{0} is already registered")]
    DuplicateBiome(BiomeId),
}
