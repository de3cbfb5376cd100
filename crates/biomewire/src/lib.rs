//! # biomewire
//!
//! Client for remote world generators.
//!
//! A map viewer asks a world generator, running in another process or on
//! another machine, for biome data and new worlds. [`RemoteWorldClient`]
//! does the asking over one of three wire generations, and keeps a local
//! biome registry in step with every biome the generator reveals.
//!
//! | Generation | Transport            | Codec         | Connect with                                 |
//! |------------|----------------------|---------------|----------------------------------------------|
//! | framed     | TCP, length-prefixed | `FramedCodec` | [`connect_framed`](RemoteWorldClientBuilder::connect_framed) |
//! | json       | WebSocket            | `JsonCodec`   | [`connect_rpc`](RemoteWorldClientBuilder::connect_rpc)       |
//! | zero-copy  | in-process IPC       | `SbeCodec`    | [`connect_ipc`](RemoteWorldClientBuilder::connect_ipc)       |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use biomewire::prelude::*;
//!
//! # async fn run() -> Result<(), ClientError> {
//! let mut client = RemoteWorldClient::builder()
//!     .connect_rpc("ws://127.0.0.1:25566")
//!     .await?;
//!
//! client.create_world(42, WorldType::LargeBiomes, "").await?;
//! let report = client.get_biome_list().await?;
//! println!("generator knows {} biomes", report.ids.len());
//! # Ok(())
//! # }
//! ```

#![allow(async_fn_in_trait)]

mod client;
mod config;
mod error;
mod handler;
mod port;
mod profile;
mod server;
mod version;

pub use client::{ClientState, RemoteWorldClient, RemoteWorldClientBuilder};
pub use config::ClientConfig;
pub use error::{ClientError, Step};
pub use port::WorldGenerationPort;
pub use profile::RemoteProfile;
pub use server::{GeneratorServer, ToyGenerator, WorldGenerator};
pub use version::{REMOTE_VERSION_ID, RecognisedVersion};

pub use biomewire_protocol as protocol;
pub use biomewire_registry as registry;
pub use biomewire_transport as transport;

/// Everything needed to connect a client and use its results.
pub mod prelude {
    pub use crate::{
        ClientConfig, ClientError, ClientState, REMOTE_VERSION_ID, RecognisedVersion,
        RemoteProfile, RemoteWorldClient, RemoteWorldClientBuilder, Step, WorldGenerationPort,
    };
    pub use biomewire_protocol::{BiomeId, BiomeListEntry, WorldType};
    pub use biomewire_registry::{
        Biome, BiomeColor, BiomeProfile, BiomeProfileSelection, BiomeRegistry,
        InMemoryBiomeRegistry, ProfileSelection, ReconcileReport,
    };
    pub use biomewire_transport::{Deadline, IpcConfig, IpcDriver};
}
