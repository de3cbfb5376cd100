//! Biome profiles: which biomes the map highlights.
//!
//! Profiles may cache biome indices, so learning new biome ids makes the
//! current selection stale. The reconciler resets it after a world is
//! created through [`ProfileSelection::reset_to_default`].

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use biomewire_protocol::BiomeId;
use serde::{Deserialize, Serialize};

/// A handle to the active profile selection.
pub trait ProfileSelection: Send + Sync + 'static {
    fn reset_to_default(&self);
}

/// A named set of highlighted biomes. `None` highlights every biome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BiomeProfile {
    pub name: String,
    pub highlighted: Option<BTreeSet<BiomeId>>,
}

impl BiomeProfile {
    /// The profile that highlights everything.
    pub fn all() -> Self {
        Self {
            name: "All biomes".to_string(),
            highlighted: None,
        }
    }

    pub fn only(name: impl Into<String>, ids: impl IntoIterator<Item = BiomeId>) -> Self {
        Self {
            name: name.into(),
            highlighted: Some(ids.into_iter().collect()),
        }
    }

    pub fn highlights(&self, id: BiomeId) -> bool {
        self.highlighted.as_ref().is_none_or(|ids| ids.contains(&id))
    }
}

impl Default for BiomeProfile {
    fn default() -> Self {
        Self::all()
    }
}

/// The selection a map viewer holds: a current profile that falls back to
/// a default one on reset.
#[derive(Debug)]
pub struct BiomeProfileSelection {
    default: BiomeProfile,
    current: RwLock<BiomeProfile>,
    resets: AtomicU64,
}

impl BiomeProfileSelection {
    pub fn new(default: BiomeProfile) -> Self {
        Self {
            current: RwLock::new(default.clone()),
            default,
            resets: AtomicU64::new(0),
        }
    }

    pub fn select(&self, profile: BiomeProfile) {
        tracing::debug!(profile = %profile.name, "biome profile selected");
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = profile;
    }

    pub fn current(&self) -> BiomeProfile {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// How many times the selection has been reset.
    pub fn reset_count(&self) -> u64 {
        self.resets.load(Ordering::Relaxed)
    }
}

impl Default for BiomeProfileSelection {
    fn default() -> Self {
        Self::new(BiomeProfile::all())
    }
}

impl ProfileSelection for BiomeProfileSelection {
    fn reset_to_default(&self) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = self.default.clone();
        self.resets.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(profile = %self.default.name, "biome profile reset to default");
    }
}
