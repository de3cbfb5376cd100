//! The interface a map viewer uses to drive any world generation backend.

use biomewire_protocol::WorldType;

use crate::RecognisedVersion;

/// A world generation backend: local, or remote through
/// [`RemoteWorldClient`](crate::RemoteWorldClient).
///
/// Calls take `&mut self`; one request is outstanding at a time.
pub trait WorldGenerationPort {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Row-major biome ids for the rectangle, `width * height` entries.
    async fn biome_data(
        &mut self,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        quarter_resolution: bool,
    ) -> Result<Vec<i32>, Self::Error>;

    /// Starts a new world. Returns once the world's biomes are known
    /// locally.
    async fn create_world(
        &mut self,
        seed: i64,
        world_type: WorldType,
        generator_options: &str,
    ) -> Result<(), Self::Error>;

    fn recognised_version(&self) -> RecognisedVersion;

    /// Version id the backend reports in profile lists.
    fn version_id(&self) -> &str;

    /// Human-readable description of the backend, for profile lists.
    fn description(&self) -> String;
}
