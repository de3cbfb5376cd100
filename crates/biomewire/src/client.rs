//! [`RemoteWorldClient`]: the biome protocol client, and its builder.
//!
//! A client owns exactly one transport and one codec. Every operation is a
//! short conversation over that pair:
//!
//! ```text
//! get_biome_data   BiomeDataRequest  → BiomeDataResponse
//! get_biome_list   BiomeListRequest  → BiomeListResponse → merge
//! create_world     CreateWorldRequest  (no reply)
//!                  BiomeListRequest  → BiomeListResponse → merge + profile reset
//! ```
//!
//! State machine:
//!
//! ```text
//! Connecting ──(handshake ok)──→ Ready ──(fatal error / close)──→ Closed
//!      │                                                            ↑
//!      └────────────────────(handshake failed)──────────────────────┘
//! ```

use std::sync::Arc;

use biomewire_protocol::{
    BiomeDataRequest, BiomeListEntry, CreateWorldRequest, FramedCodec, JsonCodec, Message,
    MessageKind, SbeCodec, WireCodec, WorldType,
};
use biomewire_registry::{
    BiomeProfileSelection, BiomeReconciler, BiomeRegistry, InMemoryBiomeRegistry,
    ProfileSelection, ReconcileReport,
};
use biomewire_transport::{
    ConnectionId, Deadline, IpcDriver, IpcTransport, TcpTransport, Transport, WebSocketTransport,
};

use crate::{
    ClientConfig, ClientError, REMOTE_VERSION_ID, RecognisedVersion, RemoteProfile, Step,
    WorldGenerationPort,
};

/// Lifecycle of a [`RemoteWorldClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Connecting,
    Ready,
    Closed,
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Configures and connects a [`RemoteWorldClient`].
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use biomewire::prelude::*;
///
/// # async fn run() -> Result<(), ClientError> {
/// let registry = Arc::new(InMemoryBiomeRegistry::new());
/// let mut client = RemoteWorldClient::builder()
///     .registry(registry.clone())
///     .connect_framed("25565")
///     .await?;
///
/// client.create_world(42, WorldType::Default, "").await?;
/// let ids = client.get_biome_data(0, 0, 4, 4, false).await?;
/// assert_eq!(ids.len(), 16);
/// # Ok(())
/// # }
/// ```
pub struct RemoteWorldClientBuilder {
    registry: Option<Arc<dyn BiomeRegistry>>,
    profiles: Option<Arc<dyn ProfileSelection>>,
    config: ClientConfig,
}

impl RemoteWorldClientBuilder {
    pub fn new() -> Self {
        Self {
            registry: None,
            profiles: None,
            config: ClientConfig::default(),
        }
    }

    /// The registry newly learned biomes are merged into. Defaults to a
    /// fresh [`InMemoryBiomeRegistry`].
    pub fn registry(mut self, registry: Arc<dyn BiomeRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// The profile selection reset after each world creation. Defaults to
    /// a private [`BiomeProfileSelection`].
    pub fn profiles(mut self, profiles: Arc<dyn ProfileSelection>) -> Self {
        self.profiles = Some(profiles);
        self
    }

    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// First generation: length-prefixed frames over TCP. `endpoint` is a
    /// bare port on the loopback interface or `host:port`.
    pub async fn connect_framed(
        self,
        endpoint: &str,
    ) -> Result<RemoteWorldClient<TcpTransport, FramedCodec>, ClientError> {
        let deadline = Deadline::from_timeout(self.config.connect_timeout);
        let transport = TcpTransport::connect(endpoint, deadline)
            .await
            .map_err(|source| ClientError::ConnectionFailed {
                endpoint: endpoint.to_string(),
                source,
            })?;
        self.connect(transport, FramedCodec).await
    }

    /// Second generation: JSON messages over a WebSocket (`ws://` URL).
    pub async fn connect_rpc(
        self,
        url: &str,
    ) -> Result<RemoteWorldClient<WebSocketTransport, JsonCodec>, ClientError> {
        let deadline = Deadline::from_timeout(self.config.connect_timeout);
        let transport = WebSocketTransport::connect(url, deadline)
            .await
            .map_err(|source| ClientError::ConnectionFailed {
                endpoint: url.to_string(),
                source,
            })?;
        self.connect(transport, JsonCodec).await
    }

    /// Third generation: zero-copy messages over the IPC streams in
    /// `directory`. Waits for the generator to attach.
    pub async fn connect_ipc(
        self,
        driver: &IpcDriver,
        directory: &str,
    ) -> Result<RemoteWorldClient<IpcTransport, SbeCodec>, ClientError> {
        let transport = driver.connect(directory, self.config.ipc.clone());
        self.connect(transport, SbeCodec).await
    }

    /// Connects over any transport and codec pair.
    pub async fn connect<T: Transport, C: WireCodec>(
        self,
        transport: T,
        codec: C,
    ) -> Result<RemoteWorldClient<T, C>, ClientError> {
        let registry = self
            .registry
            .unwrap_or_else(|| Arc::new(InMemoryBiomeRegistry::new()));
        let profiles = self
            .profiles
            .unwrap_or_else(|| Arc::new(BiomeProfileSelection::default()));

        let mut client = RemoteWorldClient {
            transport,
            codec,
            reconciler: BiomeReconciler::new(registry, profiles),
            config: self.config,
            state: ClientState::Connecting,
        };
        client.open().await?;
        Ok(client)
    }
}

impl Default for RemoteWorldClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// A connection to a remote world generator.
///
/// Owns its transport exclusively; operations take `&mut self`, so there
/// is never more than one request in flight. Use one client per task that
/// needs to talk to the generator, sharing a registry between them.
pub struct RemoteWorldClient<T: Transport, C: WireCodec> {
    transport: T,
    codec: C,
    reconciler: BiomeReconciler,
    config: ClientConfig,
    state: ClientState,
}

impl RemoteWorldClient<TcpTransport, FramedCodec> {
    pub fn builder() -> RemoteWorldClientBuilder {
        RemoteWorldClientBuilder::new()
    }
}

impl<T: Transport, C: WireCodec> RemoteWorldClient<T, C> {
    pub fn state(&self) -> ClientState {
        self.state
    }

    pub fn id(&self) -> ConnectionId {
        self.transport.id()
    }

    pub fn endpoint(&self) -> &str {
        self.transport.endpoint()
    }

    /// Wire generation name of the codec in use.
    pub fn generation(&self) -> &'static str {
        self.codec.generation()
    }

    pub fn registry(&self) -> &Arc<dyn BiomeRegistry> {
        self.reconciler.registry()
    }

    /// The profile entry this connection appears as.
    pub fn profile(&self) -> RemoteProfile {
        RemoteProfile::new(self.endpoint(), Arc::clone(self.reconciler.profiles()))
    }

    /// Returns row-major biome ids for the `width * height` rectangle at
    /// (`x`, `y`).
    ///
    /// # Errors
    /// - [`ClientError::InvalidRequest`] if `width` or `height` is not
    ///   positive. Nothing is sent.
    /// - [`ClientError::MalformedResponse`] if the reply does not hold
    ///   exactly `width * height` ids. The client stays ready.
    /// - Fatal errors close the client.
    pub async fn get_biome_data(
        &mut self,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        quarter_resolution: bool,
    ) -> Result<Vec<i32>, ClientError> {
        self.ensure_ready()?;
        let request = BiomeDataRequest::new(x, y, width, height, quarter_resolution)
            .map_err(|e| ClientError::InvalidRequest(e.to_string()))?;

        let result = self.fetch_biome_data(request).await;
        self.settle(result).await
    }

    /// Creates a world, then fetches and merges its biome list, resetting
    /// the profile selection.
    ///
    /// Exactly one biome list round trip follows every successful create.
    ///
    /// # Errors
    /// [`ClientError::WorldCreatedButBiomesUnsynced`] if the create went
    /// out but the biome list step failed. If that error is not fatal,
    /// [`resync_biomes`](Self::resync_biomes) retries the biome list step.
    pub async fn create_world(
        &mut self,
        seed: i64,
        world_type: WorldType,
        generator_options: &str,
    ) -> Result<ReconcileReport, ClientError> {
        self.ensure_ready()?;
        let request = CreateWorldRequest {
            seed,
            world_type,
            generator_options: generator_options.to_string(),
        };

        let result = self.create_world_then_sync(request).await;
        self.settle(result).await
    }

    /// Fetches the generator's biome list and merges it into the registry.
    /// The report's `ids` are every biome the generator knows.
    pub async fn get_biome_list(&mut self) -> Result<ReconcileReport, ClientError> {
        self.ensure_ready()?;
        let result = self
            .fetch_biome_list(Step::BiomeListSync)
            .await
            .map(|entries| self.reconciler.merge(&entries));
        self.settle(result).await
    }

    /// Repeats the biome list half of [`create_world`](Self::create_world),
    /// profile reset included.
    pub async fn resync_biomes(&mut self) -> Result<ReconcileReport, ClientError> {
        self.ensure_ready()?;
        let result = self
            .fetch_biome_list(Step::BiomeListSync)
            .await
            .map(|entries| self.reconciler.merge_world_creation(&entries));
        self.settle(result).await
    }

    /// Closes the transport. Further calls fail with
    /// [`ClientError::ClientClosed`].
    pub async fn close(&mut self) {
        if self.state == ClientState::Closed {
            return;
        }
        self.state = ClientState::Closed;
        if let Err(e) = self.transport.close().await {
            tracing::debug!(id = %self.transport.id(), error = %e, "error while closing transport");
        }
        tracing::info!(id = %self.transport.id(), "remote world client closed");
    }

    // -- Internals ---------------------------------------------------------

    async fn open(&mut self) -> Result<(), ClientError> {
        let deadline = Deadline::from_timeout(self.config.connect_timeout);
        if let Err(source) = self.transport.handshake(deadline).await {
            let err = ClientError::ConnectionFailed {
                endpoint: self.transport.endpoint().to_string(),
                source,
            };
            self.shut_down(&err).await;
            return Err(err);
        }

        self.state = ClientState::Ready;
        tracing::info!(
            id = %self.transport.id(),
            endpoint = self.transport.endpoint(),
            generation = self.codec.generation(),
            "remote world client ready"
        );
        Ok(())
    }

    fn ensure_ready(&self) -> Result<(), ClientError> {
        match self.state {
            ClientState::Ready => Ok(()),
            ClientState::Connecting | ClientState::Closed => Err(ClientError::ClientClosed),
        }
    }

    /// Closes the client if `result` carries a fatal error.
    async fn settle<R>(&mut self, result: Result<R, ClientError>) -> Result<R, ClientError> {
        if let Err(err) = &result {
            if err.is_fatal() {
                self.shut_down(err).await;
            }
        }
        result
    }

    async fn shut_down(&mut self, cause: &ClientError) {
        tracing::warn!(
            id = %self.transport.id(),
            step = %cause.step().unwrap_or(Step::Connect),
            error = %cause,
            "fatal error, closing remote world client"
        );
        self.close().await;
    }

    async fn fetch_biome_data(&mut self, request: BiomeDataRequest) -> Result<Vec<i32>, ClientError> {
        let step = Step::BiomeDataFetch;
        let reply = self
            .round_trip(step, &request.into(), MessageKind::BiomeDataResponse)
            .await?;
        let response = match reply {
            Message::BiomeDataResponse(response) => response,
            other => return Err(unexpected(step, &other)),
        };

        let expected = request.expected_len();
        if response.data.len() != expected {
            return Err(ClientError::MalformedResponse {
                step,
                reason: format!(
                    "expected {expected} biome ids for {}x{}, got {}",
                    request.width,
                    request.height,
                    response.data.len()
                ),
            });
        }
        Ok(response.data)
    }

    async fn create_world_then_sync(
        &mut self,
        request: CreateWorldRequest,
    ) -> Result<ReconcileReport, ClientError> {
        let seed = request.seed;
        let world_type = request.world_type;
        let deadline = self.request_deadline();
        self.send(Step::WorldCreation, &request.into(), deadline).await?;
        tracing::info!(seed, %world_type, "world creation requested");

        match self.fetch_biome_list(Step::BiomeListSync).await {
            Ok(entries) => Ok(self.reconciler.merge_world_creation(&entries)),
            Err(source) => Err(ClientError::WorldCreatedButBiomesUnsynced {
                source: Box::new(source),
            }),
        }
    }

    async fn fetch_biome_list(&mut self, step: Step) -> Result<Vec<BiomeListEntry>, ClientError> {
        let reply = self
            .round_trip(step, &Message::BiomeListRequest, MessageKind::BiomeListResponse)
            .await?;
        match reply {
            Message::BiomeListResponse(response) => Ok(response.biomes),
            other => Err(unexpected(step, &other)),
        }
    }

    async fn round_trip(
        &mut self,
        step: Step,
        message: &Message,
        expected: MessageKind,
    ) -> Result<Message, ClientError> {
        let deadline = self.request_deadline();
        self.send(step, message, deadline).await?;

        let reply = self
            .transport
            .receive(deadline)
            .await
            .map_err(|e| ClientError::from_transport(step, e))?;

        let message = self
            .codec
            .decode_expecting(&reply, expected)
            .map_err(|e| ClientError::from_decode(step, e))?;
        tracing::debug!(id = %self.transport.id(), %step, kind = %expected, bytes = reply.len(), "reply decoded");
        Ok(message)
    }

    async fn send(
        &mut self,
        step: Step,
        message: &Message,
        deadline: Deadline,
    ) -> Result<(), ClientError> {
        let frame = self
            .codec
            .encode(message)
            .map_err(|e| ClientError::InvalidRequest(e.to_string()))?;
        tracing::debug!(id = %self.transport.id(), %step, kind = %message.kind(), bytes = frame.len(), "sending request");
        self.transport
            .send(&frame, deadline)
            .await
            .map_err(|e| ClientError::from_transport(step, e))
    }

    fn request_deadline(&self) -> Deadline {
        Deadline::from_timeout(self.config.request_timeout)
    }
}

fn unexpected(step: Step, message: &Message) -> ClientError {
    ClientError::MalformedResponse {
        step,
        reason: format!("unexpected {} reply", message.kind()),
    }
}

// ---------------------------------------------------------------------------
// WorldGenerationPort
// ---------------------------------------------------------------------------

impl<T: Transport, C: WireCodec> WorldGenerationPort for RemoteWorldClient<T, C> {
    type Error = ClientError;

    async fn biome_data(
        &mut self,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        quarter_resolution: bool,
    ) -> Result<Vec<i32>, ClientError> {
        self.get_biome_data(x, y, width, height, quarter_resolution).await
    }

    async fn create_world(
        &mut self,
        seed: i64,
        world_type: WorldType,
        generator_options: &str,
    ) -> Result<(), ClientError> {
        RemoteWorldClient::create_world(self, seed, world_type, generator_options)
            .await
            .map(|_| ())
    }

    fn recognised_version(&self) -> RecognisedVersion {
        RecognisedVersion::Unknown
    }

    fn version_id(&self) -> &str {
        REMOTE_VERSION_ID
    }

    fn description(&self) -> String {
        self.profile().name().to_string()
    }
}
