//! Registered biome records.

use std::fmt;

use biomewire_protocol::BiomeId;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Display color of a biome on the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BiomeColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl BiomeColor {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Draws each channel independently and uniformly from `0..=255`.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            r: rng.random_range(0..=255),
            g: rng.random_range(0..=255),
            b: rng.random_range(0..=255),
        }
    }
}

impl fmt::Display for BiomeColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Terrain class of a biome, used to pick relief shading.
///
/// The remote generator does not report one, so remote biomes are
/// registered as [`BiomeCategory::Ocean`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BiomeCategory {
    #[default]
    Ocean,
    DeepOcean,
    Beach,
    Plains,
    Hills,
    Mountains,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Biome {
    pub id: BiomeId,
    pub name: String,
    pub color: BiomeColor,
    pub category: BiomeCategory,
}

impl Biome {
    pub fn new(
        id: BiomeId,
        name: impl Into<String>,
        color: BiomeColor,
        category: BiomeCategory,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            color,
            category,
        }
    }

    /// A biome learned from a remote generator: caller-chosen color,
    /// default category.
    pub fn remote(id: BiomeId, name: impl Into<String>, color: BiomeColor) -> Self {
        Self::new(id, name, color, BiomeCategory::default())
    }
}

impl fmt::Display for Biome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, {})", self.name, self.id, self.color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_color_display_is_hex() {
        assert_eq!(BiomeColor::new(0, 128, 255).to_string(), "#0080ff");
    }

    #[test]
    fn test_random_colors_cover_both_extremes() {
        let mut rng = StdRng::seed_from_u64(7);
        let channels: Vec<u8> = (0..20_000)
            .map(|_| BiomeColor::random(&mut rng).r)
            .collect();
        assert!(channels.contains(&0));
        assert!(channels.contains(&255));
    }

    #[test]
    fn test_remote_biome_defaults_to_ocean() {
        let biome = Biome::remote(BiomeId(3), "Mountains", BiomeColor::new(1, 2, 3));
        assert_eq!(biome.category, BiomeCategory::Ocean);
    }
}
