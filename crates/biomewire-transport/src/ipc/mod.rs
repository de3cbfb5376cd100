//! Publish/poll IPC transport (the zero-copy generation).
//!
//! Requests travel on stream [`REQUEST_STREAM_ID`], responses on
//! [`RESPONSE_STREAM_ID`], both under one directory name on an
//! [`IpcDriver`]. Unlike the request/response transports:
//!
//! - `send` retries a non-blocking claim while the stream is full or has
//!   no subscriber. It never drops the message. A message larger than the
//!   stream is offered fragment by fragment as the peer drains it.
//! - `receive` polls in a loop, reassembling fragments that may straddle
//!   poll calls, and returns once one whole message is available.
//!
//! Both loops run until their [`Deadline`] expires; with
//! [`Deadline::never`] they run until the stream closes.

mod assembler;
mod driver;
mod idle;

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

pub use assembler::FragmentAssembler;
pub use driver::{
    BEGIN_FLAG, ClaimOutcome, END_FLAG, Fragment, IpcDriver, Publication,
    Subscription, UNFRAGMENTED,
};
pub use idle::IdleStrategy;

use idle::Idler;

use crate::{ConnectionId, Deadline, Transport, TransportError};

/// Stream carrying client → server messages.
pub const REQUEST_STREAM_ID: i32 = 1001;
/// Stream carrying server → client messages.
pub const RESPONSE_STREAM_ID: i32 = 1002;

/// Settings for an IPC stream pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpcConfig {
    /// Largest fragment payload in bytes.
    pub mtu: usize,
    /// Bytes a stream may hold before publishers are back-pressured.
    pub term_capacity: usize,
    /// Fragments handed out per poll.
    pub fragment_limit: usize,
    /// Back-off between unproductive attempts.
    pub idle: IdleStrategy,
}

impl Default for IpcConfig {
    fn default() -> Self {
        Self {
            mtu: 1408,
            term_capacity: 4 * 1024 * 1024,
            fragment_limit: 10,
            idle: IdleStrategy::default(),
        }
    }
}

impl IpcDriver {
    /// Opens the client end of the stream pair under `directory`.
    pub fn connect(&self, directory: &str, config: IpcConfig) -> IpcTransport {
        let subscription = self.add_subscription(
            directory,
            RESPONSE_STREAM_ID,
            config.term_capacity,
        );
        let publication = self.add_publication(
            directory,
            REQUEST_STREAM_ID,
            config.term_capacity,
            config.mtu,
        );
        IpcTransport::new(directory, publication, subscription, config)
    }

    /// Opens the server end of the stream pair under `directory`.
    pub fn serve(&self, directory: &str, config: IpcConfig) -> IpcTransport {
        let subscription = self.add_subscription(
            directory,
            REQUEST_STREAM_ID,
            config.term_capacity,
        );
        let publication = self.add_publication(
            directory,
            RESPONSE_STREAM_ID,
            config.term_capacity,
            config.mtu,
        );
        IpcTransport::new(directory, publication, subscription, config)
    }
}

/// A publish/poll [`Transport`] over a pair of IPC streams.
pub struct IpcTransport {
    id: ConnectionId,
    endpoint: String,
    publication: Option<Publication>,
    subscription: Subscription,
    assembler: FragmentAssembler,
    ready: VecDeque<Vec<u8>>,
    fragment_limit: usize,
    idler: Idler,
}

impl IpcTransport {
    /// Builds a transport from an already-added stream pair.
    pub fn new(
        directory: &str,
        publication: Publication,
        subscription: Subscription,
        config: IpcConfig,
    ) -> Self {
        let id = ConnectionId::next();
        tracing::debug!(%id, directory, mtu = config.mtu, "ipc transport opened");
        Self {
            id,
            endpoint: directory.to_string(),
            publication: Some(publication),
            subscription,
            assembler: FragmentAssembler::new(),
            ready: VecDeque::new(),
            fragment_limit: config.fragment_limit.max(1),
            idler: Idler::new(config.idle),
        }
    }

    fn publication(&self) -> Result<&Publication, TransportError> {
        self.publication
            .as_ref()
            .ok_or_else(|| TransportError::closed("transport closed"))
    }

    /// Offers `frame` a few fragments at a time. If the deadline passes
    /// midway the peer holds a partial message, which it discards when the
    /// next message begins.
    async fn send_streamed(
        &mut self,
        frame: &[u8],
        deadline: Deadline,
    ) -> Result<(), TransportError> {
        let mut offset = 0;
        loop {
            let (outcome, next) = self.publication()?.offer(frame, offset)?;
            let appended = next - offset;
            offset = next;
            match outcome {
                ClaimOutcome::Claimed => {
                    tracing::trace!(id = %self.id, len = frame.len(), "ipc offer complete");
                    return Ok(());
                }
                ClaimOutcome::BackPressured | ClaimOutcome::NotConnected => {
                    deadline.check("send")?;
                    self.idler.idle(appended).await;
                }
            }
        }
    }
}

impl Transport for IpcTransport {
    /// Waits until the peer has subscribed to our outbound stream.
    async fn handshake(
        &mut self,
        deadline: Deadline,
    ) -> Result<(), TransportError> {
        self.idler.reset();
        loop {
            if self.publication()?.is_connected() {
                tracing::debug!(id = %self.id, "ipc peer attached");
                return Ok(());
            }
            deadline.check("handshake")?;
            self.idler.idle(0).await;
        }
    }

    async fn send(
        &mut self,
        frame: &[u8],
        deadline: Deadline,
    ) -> Result<(), TransportError> {
        self.idler.reset();
        if frame.len() > self.publication()?.capacity() {
            return self.send_streamed(frame, deadline).await;
        }

        let mut attempts: u64 = 0;
        loop {
            attempts += 1;
            let outcome = self.publication()?.try_claim(frame)?;
            match outcome {
                ClaimOutcome::Claimed => {
                    tracing::trace!(id = %self.id, len = frame.len(), attempts, "ipc claim");
                    return Ok(());
                }
                ClaimOutcome::BackPressured | ClaimOutcome::NotConnected => {
                    deadline.check("send")?;
                    self.idler.idle(0).await;
                }
            }
        }
    }

    async fn receive(
        &mut self,
        deadline: Deadline,
    ) -> Result<Vec<u8>, TransportError> {
        self.publication()?;
        self.idler.reset();
        loop {
            if let Some(message) = self.ready.pop_front() {
                return Ok(message);
            }

            let polled = self.subscription.poll(self.fragment_limit, |fragment| {
                if let Some(message) = self.assembler.on_fragment(fragment) {
                    self.ready.push_back(message);
                }
            });
            if polled > 0 {
                tracing::trace!(
                    id = %self.id,
                    polled,
                    assembling = self.assembler.is_assembling(),
                    "ipc poll"
                );
                continue;
            }

            if self.subscription.is_closed() {
                return Err(TransportError::closed("peer closed its stream"));
            }
            deadline.check("receive")?;
            self.idler.idle(polled).await;
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if let Some(publication) = self.publication.take() {
            publication.close();
            tracing::debug!(id = %self.id, "ipc transport closed");
        }
        self.ready.clear();
        Ok(())
    }

    fn id(&self) -> ConnectionId {
        self.id
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}
