//! A world generator server, for tests, demos, and local probing.
//!
//! Real generators run inside the game's own process. This module speaks
//! the generator's side of all three wire generations so a client can be
//! exercised end to end without one.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

use biomewire_protocol::{
    BiomeDataRequest, BiomeListEntry, CreateWorldRequest, FramedCodec, JsonCodec, SbeCodec,
};
use biomewire_transport::{ConnectionId, Deadline, IpcConfig, IpcDriver, Transport, TransportError};
use tokio::net::TcpListener;

use crate::handler::handle_requests;

/// The generator side of the protocol.
///
/// Methods are synchronous and take `&self`; a generator is shared by
/// every connection the server accepts.
pub trait WorldGenerator: Send + Sync + 'static {
    /// Row-major biome ids for the requested rectangle.
    fn biome_data(&self, request: &BiomeDataRequest) -> Vec<i32>;

    fn create_world(&self, request: &CreateWorldRequest);

    fn biome_list(&self) -> Vec<BiomeListEntry>;
}

// ---------------------------------------------------------------------------
// ToyGenerator
// ---------------------------------------------------------------------------

/// Largest rectangle the toy generator fills.
const MAX_AREA: usize = 4 * 1024 * 1024;

/// Side of the square regions that share one biome, in blocks.
const REGION_SHIFT: i64 = 6;

/// A generator that paints seeded 64×64-block regions from a fixed biome
/// table. Same seed, same map.
#[derive(Debug)]
pub struct ToyGenerator {
    biomes: Vec<BiomeListEntry>,
    seed: AtomicI64,
    worlds_created: AtomicU64,
}

impl ToyGenerator {
    pub fn new() -> Self {
        Self::with_biomes(vec![
            BiomeListEntry::new(0, "Ocean"),
            BiomeListEntry::new(1, "Plains"),
            BiomeListEntry::new(2, "Desert"),
            BiomeListEntry::new(3, "Extreme Hills"),
            BiomeListEntry::new(4, "Forest"),
            BiomeListEntry::new(5, "Taiga"),
            BiomeListEntry::new(6, "Swampland"),
            BiomeListEntry::new(7, "River"),
            BiomeListEntry::new(12, "Ice Plains"),
            BiomeListEntry::new(21, "Jungle"),
            BiomeListEntry::new(24, "Deep Ocean"),
        ])
    }

    pub fn with_biomes(biomes: Vec<BiomeListEntry>) -> Self {
        Self {
            biomes,
            seed: AtomicI64::new(0),
            worlds_created: AtomicU64::new(0),
        }
    }

    pub fn seed(&self) -> i64 {
        self.seed.load(Ordering::Relaxed)
    }

    pub fn worlds_created(&self) -> u64 {
        self.worlds_created.load(Ordering::Relaxed)
    }

    fn biome_at(&self, seed: i64, x: i64, y: i64) -> i32 {
        if self.biomes.is_empty() {
            return 0;
        }
        let region_x = mix((x >> REGION_SHIFT) as u64);
        let region_y = mix(((y >> REGION_SHIFT) as u64).rotate_left(32));
        let hash = mix(seed as u64 ^ region_x ^ region_y);
        let index = (hash % self.biomes.len() as u64) as usize;
        self.biomes.get(index).map_or(0, |entry| entry.biome_id.0)
    }
}

impl Default for ToyGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl WorldGenerator for ToyGenerator {
    fn biome_data(&self, request: &BiomeDataRequest) -> Vec<i32> {
        let len = request.expected_len();
        if len > MAX_AREA {
            tracing::warn!(len, "biome data request too large");
            return Vec::new();
        }

        let seed = self.seed();
        let scale: i64 = if request.quarter_resolution { 4 } else { 1 };
        let (width, height) = (i64::from(request.width), i64::from(request.height));
        let mut data = Vec::with_capacity(len);
        for row in 0..height {
            for col in 0..width {
                let x = (i64::from(request.x) + col) * scale;
                let y = (i64::from(request.y) + row) * scale;
                data.push(self.biome_at(seed, x, y));
            }
        }
        data
    }

    fn create_world(&self, request: &CreateWorldRequest) {
        self.seed.store(request.seed, Ordering::Relaxed);
        self.worlds_created.fetch_add(1, Ordering::Relaxed);
        tracing::info!(
            seed = request.seed,
            world_type = %request.world_type,
            options = %request.generator_options,
            "toy world created"
        );
    }

    fn biome_list(&self) -> Vec<BiomeListEntry> {
        self.biomes.clone()
    }
}

/// SplitMix64 finaliser.
fn mix(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

// ---------------------------------------------------------------------------
// GeneratorServer
// ---------------------------------------------------------------------------

/// Serves a [`WorldGenerator`] over any of the three generations.
///
/// # Example
///
/// ```rust,no_run
/// use biomewire::{GeneratorServer, ToyGenerator};
///
/// # async fn run() -> std::io::Result<()> {
/// let listener = tokio::net::TcpListener::bind("127.0.0.1:25565").await?;
/// GeneratorServer::new(ToyGenerator::new()).serve_framed(listener).await;
/// # Ok(())
/// # }
/// ```
pub struct GeneratorServer<G: WorldGenerator> {
    generator: Arc<G>,
}

impl<G: WorldGenerator> GeneratorServer<G> {
    pub fn new(generator: G) -> Self {
        Self::from_arc(Arc::new(generator))
    }

    /// Serves a generator the caller keeps a handle to.
    pub fn from_arc(generator: Arc<G>) -> Self {
        Self { generator }
    }

    pub fn generator(&self) -> &Arc<G> {
        &self.generator
    }

    /// Accepts framed TCP clients until the task is cancelled.
    pub async fn serve_framed(&self, listener: TcpListener) {
        tracing::info!(addr = ?listener.local_addr().ok(), "framed generator listening");
        loop {
            match listener.accept().await {
                Ok((mut stream, peer)) => {
                    let generator = Arc::clone(&self.generator);
                    tokio::spawn(async move {
                        let id = ConnectionId::next();
                        tracing::debug!(%id, %peer, "framed client connected");
                        if let Err(e) = stream.set_nodelay(true) {
                            tracing::debug!(%id, error = %e, "could not disable nagle");
                        }
                        if let Err(e) =
                            handle_requests(id, &mut stream, &FramedCodec, generator.as_ref()).await
                        {
                            tracing::debug!(%id, error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }

    /// Accepts WebSocket clients until the task is cancelled.
    pub async fn serve_rpc(&self, listener: TcpListener) {
        tracing::info!(addr = ?listener.local_addr().ok(), "rpc generator listening");
        loop {
            match listener.accept().await {
                Ok((stream, peer)) => {
                    let generator = Arc::clone(&self.generator);
                    tokio::spawn(async move {
                        let id = ConnectionId::next();
                        let mut ws = match tokio_tungstenite::accept_async(stream).await {
                            Ok(ws) => ws,
                            Err(e) => {
                                tracing::debug!(%id, %peer, error = %e, "websocket upgrade failed");
                                return;
                            }
                        };
                        tracing::debug!(%id, %peer, "rpc client connected");
                        if let Err(e) =
                            handle_requests(id, &mut ws, &JsonCodec, generator.as_ref()).await
                        {
                            tracing::debug!(%id, error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }

    /// Serves one zero-copy client on `directory` until it closes its
    /// stream.
    pub async fn serve_ipc(
        &self,
        driver: &IpcDriver,
        directory: &str,
        config: IpcConfig,
    ) -> Result<(), TransportError> {
        let mut transport = driver.serve(directory, config);
        tracing::info!(directory, "zero-copy generator waiting for a client");
        transport.handshake(Deadline::never()).await?;

        let id = transport.id();
        let result = handle_requests(id, &mut transport, &SbeCodec, self.generator.as_ref()).await;
        transport.close().await?;
        result
    }
}
