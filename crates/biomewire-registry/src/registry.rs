//! The biome registry shared by every client and profile.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use biomewire_protocol::BiomeId;

use crate::{Biome, RegistryError};

/// Outcome of [`BiomeRegistry::register_if_absent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    Added,
    AlreadyKnown,
}

/// Mapping from biome id to registered biome.
///
/// Entries are only ever added. Implementations are shared between
/// clients, so every method takes `&self` and writes must be serialized.
pub trait BiomeRegistry: Send + Sync + 'static {
    fn contains(&self, id: BiomeId) -> bool;

    fn get(&self, id: BiomeId) -> Option<Biome>;

    /// # Errors
    /// [`RegistryError::DuplicateBiome`] if `biome.id` is already present.
    fn register(&self, biome: Biome) -> Result<(), RegistryError>;

    /// Registers `make()` under `id` unless `id` is already present.
    ///
    /// The lookup and the insert are one atomic step: when several
    /// callers race on the same new id, exactly one `make` runs.
    fn register_if_absent(&self, id: BiomeId, make: &mut dyn FnMut() -> Biome) -> Registration;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All registered ids in ascending order.
    fn ids(&self) -> Vec<BiomeId>;
}

/// A [`BiomeRegistry`] held in memory behind a read-write lock.
#[derive(Debug, Default)]
pub struct InMemoryBiomeRegistry {
    biomes: RwLock<BTreeMap<BiomeId, Biome>>,
}

impl InMemoryBiomeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populates the registry, e.g. with a built-in biome table.
    /// Later duplicates of an id are ignored.
    pub fn with_biomes(biomes: impl IntoIterator<Item = Biome>) -> Self {
        let mut map = BTreeMap::new();
        for biome in biomes {
            map.entry(biome.id).or_insert(biome);
        }
        Self {
            biomes: RwLock::new(map),
        }
    }

    /// Copies out every registered biome, ordered by id.
    pub fn snapshot(&self) -> Vec<Biome> {
        self.read().values().cloned().collect()
    }

    // A panicking writer cannot leave the map half-updated, so a poisoned
    // lock still guards consistent data.
    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<BiomeId, Biome>> {
        self.biomes.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<BiomeId, Biome>> {
        self.biomes.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl BiomeRegistry for InMemoryBiomeRegistry {
    fn contains(&self, id: BiomeId) -> bool {
        self.read().contains_key(&id)
    }

    fn get(&self, id: BiomeId) -> Option<Biome> {
        self.read().get(&id).cloned()
    }

    fn register(&self, biome: Biome) -> Result<(), RegistryError> {
        let mut biomes = self.write();
        if biomes.contains_key(&biome.id) {
            return Err(RegistryError::DuplicateBiome(biome.id));
        }
        tracing::debug!(id = %biome.id, name = %biome.name, "biome registered");
        biomes.insert(biome.id, biome);
        Ok(())
    }

    fn register_if_absent(&self, id: BiomeId, make: &mut dyn FnMut() -> Biome) -> Registration {
        if self.contains(id) {
            return Registration::AlreadyKnown;
        }

        let mut biomes = self.write();
        if biomes.contains_key(&id) {
            return Registration::AlreadyKnown;
        }
        let mut biome = make();
        biome.id = id;
        tracing::debug!(%id, name = %biome.name, color = %biome.color, "biome registered");
        biomes.insert(id, biome);
        Registration::Added
    }

    fn len(&self) -> usize {
        self.read().len()
    }

    fn ids(&self) -> Vec<BiomeId> {
        self.read().keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BiomeColor;

    fn biome(id: i32, name: &str) -> Biome {
        Biome::remote(BiomeId(id), name, BiomeColor::new(10, 20, 30))
    }

    #[test]
    fn test_register_then_get() {
        let registry = InMemoryBiomeRegistry::new();
        registry.register(biome(1, "Plains")).unwrap();

        assert!(registry.contains(BiomeId(1)));
        assert_eq!(registry.get(BiomeId(1)).unwrap().name, "Plains");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_register_duplicate_is_refused() {
        let registry = InMemoryBiomeRegistry::new();
        registry.register(biome(1, "Plains")).unwrap();

        let result = registry.register(biome(1, "Other"));

        assert!(matches!(result, Err(RegistryError::DuplicateBiome(BiomeId(1)))));
        assert_eq!(registry.get(BiomeId(1)).unwrap().name, "Plains");
    }

    #[test]
    fn test_register_if_absent_skips_known_ids() {
        let registry = InMemoryBiomeRegistry::with_biomes([biome(4, "Forest")]);
        let mut calls = 0;

        let outcome = registry.register_if_absent(BiomeId(4), &mut || {
            calls += 1;
            biome(4, "Replacement")
        });

        assert_eq!(outcome, Registration::AlreadyKnown);
        assert_eq!(calls, 0);
        assert_eq!(registry.get(BiomeId(4)).unwrap().name, "Forest");
    }

    #[test]
    fn test_register_if_absent_keys_by_requested_id() {
        let registry = InMemoryBiomeRegistry::new();
        registry.register_if_absent(BiomeId(9), &mut || biome(0, "Swamp"));

        assert_eq!(registry.ids(), vec![BiomeId(9)]);
        assert_eq!(registry.get(BiomeId(9)).unwrap().id, BiomeId(9));
    }

    #[test]
    fn test_with_biomes_keeps_first_duplicate() {
        let registry =
            InMemoryBiomeRegistry::with_biomes([biome(2, "Desert"), biome(2, "Not Desert")]);
        assert_eq!(registry.snapshot().len(), 1);
        assert_eq!(registry.get(BiomeId(2)).unwrap().name, "Desert");
    }
}
