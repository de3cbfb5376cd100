//! A scripted in-memory transport for driving the client state machine.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use biomewire::protocol::{
    BiomeDataResponse, BiomeListEntry, BiomeListResponse, FramedCodec, Message, MessageKind,
    WireCodec,
};
use biomewire::transport::{ConnectionId, Deadline, Transport, TransportError};

/// What the fake server does with the next request.
pub enum Scripted {
    /// Replies with these bytes.
    Reply(Vec<u8>),
    /// Replies with an empty frame.
    Ack,
    /// The connection drops while sending.
    Hangup,
    /// The deadline runs out before a reply.
    Stall,
    /// The request goes out and no reply ever comes back.
    Silent,
}

impl Scripted {
    pub fn reply(message: Message) -> Self {
        Self::Reply(FramedCodec.encode(&message).unwrap())
    }

    pub fn biome_data(data: Vec<i32>) -> Self {
        Self::reply(Message::BiomeDataResponse(BiomeDataResponse { data }))
    }

    pub fn biome_list(entries: &[(i32, &str)]) -> Self {
        Self::reply(Message::BiomeListResponse(BiomeListResponse {
            biomes: entries
                .iter()
                .map(|(id, name)| BiomeListEntry::new(*id, *name))
                .collect(),
        }))
    }
}

/// What the test can observe after the client has run.
#[derive(Clone, Default)]
pub struct Observed {
    sent: Arc<Mutex<Vec<Vec<u8>>>>,
    closed: Arc<AtomicBool>,
}

impl Observed {
    /// Kinds of every frame the client sent, in order.
    pub fn sent_kinds(&self) -> Vec<MessageKind> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|frame| FramedCodec.read_header(frame).unwrap().kind().unwrap())
            .collect()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// A request/response transport that answers from a script.
pub struct ScriptedTransport {
    id: ConnectionId,
    script: VecDeque<Scripted>,
    pending: Option<Vec<u8>>,
    silent: bool,
    observed: Observed,
}

impl ScriptedTransport {
    pub fn new(script: impl IntoIterator<Item = Scripted>) -> (Self, Observed) {
        let observed = Observed::default();
        let transport = Self {
            id: ConnectionId::next(),
            script: script.into_iter().collect(),
            pending: None,
            silent: false,
            observed: observed.clone(),
        };
        (transport, observed)
    }
}

impl Transport for ScriptedTransport {
    async fn send(&mut self, frame: &[u8], _deadline: Deadline) -> Result<(), TransportError> {
        self.observed.sent.lock().unwrap().push(frame.to_vec());
        self.pending = None;
        self.silent = false;
        match self.script.pop_front() {
            Some(Scripted::Reply(reply)) => {
                self.pending = Some(reply);
                Ok(())
            }
            Some(Scripted::Ack) => Ok(()),
            Some(Scripted::Silent) => {
                self.silent = true;
                Ok(())
            }
            Some(Scripted::Hangup) | None => {
                Err(TransportError::ConnectionClosed("script ended".into()))
            }
            Some(Scripted::Stall) => Err(TransportError::Timeout { operation: "send" }),
        }
    }

    async fn receive(&mut self, deadline: Deadline) -> Result<Vec<u8>, TransportError> {
        if self.silent {
            return deadline
                .run("receive", std::future::pending::<Result<Vec<u8>, TransportError>>())
                .await;
        }
        self.pending.take().ok_or(TransportError::NoResponse)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.observed.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn id(&self) -> ConnectionId {
        self.id
    }

    fn endpoint(&self) -> &str {
        "scripted"
    }
}
