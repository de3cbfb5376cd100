//! Local biome state for biomewire.
//!
//! The remote generator names biomes by integer id. Before a map can
//! render those ids it needs a local record for each one, with a name and
//! a display color. This crate owns that state:
//!
//! 1. **Registry**: the id → [`Biome`] map ([`BiomeRegistry`] trait,
//!    [`InMemoryBiomeRegistry`]), shared by every client.
//! 2. **Profiles**: which biomes are highlighted ([`ProfileSelection`],
//!    [`BiomeProfileSelection`]).
//! 3. **Reconciliation**: folding server-reported biome lists into the
//!    registry ([`BiomeReconciler`]).
//!
//! ```text
//! Client (above)        ← calls the reconciler after every biome-revealing reply
//!     ↕
//! Registry (this crate) ← owns biome records and profile selection
//!     ↕
//! Protocol (below)      ← provides BiomeId, BiomeListEntry
//! ```

mod biome;
mod error;
mod profile;
mod reconciler;
mod registry;

pub use biome::{Biome, BiomeCategory, BiomeColor};
pub use error::RegistryError;
pub use profile::{BiomeProfile, BiomeProfileSelection, ProfileSelection};
pub use reconciler::{BiomeReconciler, ReconcileReport};
pub use registry::{BiomeRegistry, InMemoryBiomeRegistry, Registration};
