//! Merging server-reported biomes into the local registry.
//!
//! Every exchange that reveals biome ids (biome list, world creation)
//! goes through [`BiomeReconciler`] before its result reaches a caller,
//! so a biome id is always registered before any map data refers to it.

use std::collections::HashSet;
use std::sync::Arc;

use biomewire_protocol::{BiomeId, BiomeListEntry};

use crate::{Biome, BiomeColor, BiomeRegistry, ProfileSelection, Registration};

/// Result of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Every id in the input, first occurrence order, without repeats.
    pub ids: Vec<BiomeId>,
    /// Ids that were new to the registry and have been registered.
    pub added: Vec<BiomeId>,
    /// How many input ids were already registered.
    pub already_known: usize,
}

#[derive(Clone)]
pub struct BiomeReconciler {
    registry: Arc<dyn BiomeRegistry>,
    profiles: Arc<dyn ProfileSelection>,
}

impl BiomeReconciler {
    pub fn new(registry: Arc<dyn BiomeRegistry>, profiles: Arc<dyn ProfileSelection>) -> Self {
        Self { registry, profiles }
    }

    pub fn registry(&self) -> &Arc<dyn BiomeRegistry> {
        &self.registry
    }

    pub fn profiles(&self) -> &Arc<dyn ProfileSelection> {
        &self.profiles
    }

    /// Registers every entry whose id is not yet known, each with its own
    /// random color. Known ids, and repeats within `entries`, keep their
    /// existing record.
    pub fn merge(&self, entries: &[BiomeListEntry]) -> ReconcileReport {
        let mut rng = rand::rng();
        let mut seen = HashSet::with_capacity(entries.len());
        let mut report = ReconcileReport::default();

        for entry in entries {
            if !seen.insert(entry.biome_id) {
                continue;
            }
            report.ids.push(entry.biome_id);

            let outcome = self.registry.register_if_absent(entry.biome_id, &mut || {
                Biome::remote(entry.biome_id, &entry.biome_name, BiomeColor::random(&mut rng))
            });
            match outcome {
                Registration::Added => report.added.push(entry.biome_id),
                Registration::AlreadyKnown => report.already_known += 1,
            }
        }

        tracing::debug!(
            total = report.ids.len(),
            added = report.added.len(),
            "biome list reconciled"
        );
        report
    }

    /// [`merge`](Self::merge), then reset the profile selection, whose
    /// cached indices may not cover the newly created world.
    pub fn merge_world_creation(&self, entries: &[BiomeListEntry]) -> ReconcileReport {
        let report = self.merge(entries);
        self.profiles.reset_to_default();
        tracing::info!(
            biomes = report.ids.len(),
            added = report.added.len(),
            "world biomes absorbed, profile selection reset"
        );
        report
    }
}

impl std::fmt::Debug for BiomeReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BiomeReconciler")
            .field("registered", &self.registry.len())
            .finish_non_exhaustive()
    }
}
