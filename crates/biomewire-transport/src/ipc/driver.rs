//! In-process media driver: named, bounded fragment streams.
//!
//! A stream is identified by a directory name and a stream id. Publishers
//! split each message into MTU-sized fragments. [`Publication::try_claim`]
//! appends a message only if all of it fits in the remaining capacity;
//! [`Publication::offer`] appends what fits and resumes later, for messages
//! larger than the stream. A subscriber drains fragments in order, a
//! bounded number per poll.
//!
//! Closing a stream does not remove it. The next publication or
//! subscription on the same key reopens it in place, so a peer that stayed
//! attached sees the new session.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::TransportError;

/// Fragment flag: first fragment of a message.
pub const BEGIN_FLAG: u8 = 0x80;
/// Fragment flag: last fragment of a message.
pub const END_FLAG: u8 = 0x40;
/// Both flags: the message fits in one fragment.
pub const UNFRAGMENTED: u8 = BEGIN_FLAG | END_FLAG;

/// One transport-level packet carrying all or part of a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub flags: u8,
    pub payload: Vec<u8>,
}

impl Fragment {
    pub fn is_begin(&self) -> bool {
        self.flags & BEGIN_FLAG != 0
    }

    pub fn is_end(&self) -> bool {
        self.flags & END_FLAG != 0
    }
}

/// Result of a non-blocking claim on a publication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// The message was appended to the stream.
    Claimed,
    /// The stream is full; retry after the subscriber drains it.
    BackPressured,
    /// No subscriber is attached yet.
    NotConnected,
}

#[derive(Debug, Default)]
struct TermLog {
    fragments: VecDeque<Fragment>,
    used: usize,
    closed: bool,
    /// Bumped on every reopen; publications from an older session no
    /// longer reach the stream.
    session: u64,
}

impl TermLog {
    fn reopen(&mut self) {
        self.fragments.clear();
        self.used = 0;
        self.closed = false;
        self.session += 1;
    }
}

#[derive(Debug)]
struct LogStream {
    log: Mutex<TermLog>,
    subscribers: AtomicUsize,
    capacity: usize,
}

impl LogStream {
    fn new(capacity: usize) -> Self {
        Self {
            log: Mutex::new(TermLog::default()),
            subscribers: AtomicUsize::new(0),
            capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, TermLog> {
        // The log holds plain data; a panicking holder cannot leave it
        // half-written in a way later readers care about.
        self.log.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Hosts every stream in the process, keyed by `(directory, stream id)`.
///
/// Cloning a driver yields another handle to the same streams.
#[derive(Debug, Clone, Default)]
pub struct IpcDriver {
    streams: Arc<Mutex<HashMap<(String, i32), Arc<LogStream>>>>,
}

impl IpcDriver {
    /// Creates an empty driver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up or creates the stream, reopening it if its last publisher
    /// closed it. Leftover fragments of the closed session are discarded.
    fn stream(
        &self,
        directory: &str,
        stream_id: i32,
        capacity: usize,
    ) -> (Arc<LogStream>, u64) {
        let mut streams =
            self.streams.lock().unwrap_or_else(PoisonError::into_inner);
        let stream = streams
            .entry((directory.to_string(), stream_id))
            .or_insert_with(|| Arc::new(LogStream::new(capacity)));

        let mut log = stream.lock();
        if log.closed {
            tracing::debug!(
                directory,
                stream_id,
                discarded = log.fragments.len(),
                "reopening closed stream"
            );
            log.reopen();
        }
        let session = log.session;
        drop(log);
        (Arc::clone(stream), session)
    }

    /// Adds a publication on `(directory, stream_id)`.
    pub fn add_publication(
        &self,
        directory: &str,
        stream_id: i32,
        capacity: usize,
        mtu: usize,
    ) -> Publication {
        let (stream, session) = self.stream(directory, stream_id, capacity);
        let mtu = mtu.clamp(1, stream.capacity.max(1));
        tracing::trace!(directory, stream_id, capacity, mtu, "publication added");
        Publication {
            stream,
            mtu,
            session,
        }
    }

    /// Adds the subscription on `(directory, stream_id)`.
    pub fn add_subscription(
        &self,
        directory: &str,
        stream_id: i32,
        capacity: usize,
    ) -> Subscription {
        let (stream, _) = self.stream(directory, stream_id, capacity);
        stream.subscribers.fetch_add(1, Ordering::AcqRel);
        tracing::trace!(directory, stream_id, "subscription added");
        Subscription { stream }
    }
}

/// The sending end of a stream.
#[derive(Debug)]
pub struct Publication {
    stream: Arc<LogStream>,
    mtu: usize,
    session: u64,
}

impl Publication {
    /// Attempts to append all of `message` without blocking.
    ///
    /// # Errors
    /// - [`TransportError::ConnectionClosed`] if the stream was closed.
    /// - [`TransportError::FrameTooLarge`] if the message can never fit in
    ///   the stream at once; use [`offer`](Self::offer) for those.
    pub fn try_claim(
        &self,
        message: &[u8],
    ) -> Result<ClaimOutcome, TransportError> {
        if message.len() > self.stream.capacity {
            return Err(TransportError::FrameTooLarge {
                len: message.len(),
                max: self.stream.capacity,
            });
        }

        let mut log = self.open_log()?;
        if !self.is_connected() {
            return Ok(ClaimOutcome::NotConnected);
        }
        if log.used + message.len() > self.stream.capacity {
            return Ok(ClaimOutcome::BackPressured);
        }

        let appended = self.append(&mut log, message, 0, usize::MAX);
        debug_assert_eq!(appended, message.len());
        Ok(ClaimOutcome::Claimed)
    }

    /// Appends as many whole fragments of `message[offset..]` as fit,
    /// without blocking, and returns the outcome with the new offset.
    ///
    /// `Claimed` means the END fragment is in the stream. Otherwise call
    /// again with the returned offset once the subscriber has drained.
    /// Fragments of one message must not be interleaved with other
    /// messages on the same publication.
    pub fn offer(
        &self,
        message: &[u8],
        offset: usize,
    ) -> Result<(ClaimOutcome, usize), TransportError> {
        let mut log = self.open_log()?;
        if !self.is_connected() {
            return Ok((ClaimOutcome::NotConnected, offset));
        }

        let room = self.stream.capacity.saturating_sub(log.used);
        let offset = offset + self.append(&mut log, message, offset, room);
        if offset >= message.len() {
            Ok((ClaimOutcome::Claimed, offset))
        } else {
            Ok((ClaimOutcome::BackPressured, offset))
        }
    }

    fn open_log(&self) -> Result<MutexGuard<'_, TermLog>, TransportError> {
        let log = self.stream.lock();
        if log.closed || log.session != self.session {
            return Err(TransportError::closed("publication closed"));
        }
        Ok(log)
    }

    /// Pushes MTU-sized fragments of `message[offset..]` while they fit in
    /// `room` bytes. Returns how many bytes were appended.
    fn append(
        &self,
        log: &mut TermLog,
        message: &[u8],
        offset: usize,
        room: usize,
    ) -> usize {
        if message.is_empty() {
            log.fragments.push_back(Fragment {
                flags: UNFRAGMENTED,
                payload: Vec::new(),
            });
            return 0;
        }

        let mut at = offset;
        while at < message.len() {
            let end = (at + self.mtu).min(message.len());
            let len = end - at;
            if len > room - (at - offset) {
                break;
            }
            let mut flags = 0;
            if at == 0 {
                flags |= BEGIN_FLAG;
            }
            if end == message.len() {
                flags |= END_FLAG;
            }
            log.fragments.push_back(Fragment {
                flags,
                payload: message[at..end].to_vec(),
            });
            at = end;
        }
        log.used += at - offset;
        at - offset
    }

    /// Bytes the stream holds before it back-pressures.
    pub fn capacity(&self) -> usize {
        self.stream.capacity
    }

    /// Returns `true` while a subscriber is attached to the stream.
    pub fn is_connected(&self) -> bool {
        self.stream.subscribers.load(Ordering::Acquire) > 0
    }

    /// Closes the stream. The subscriber still drains what was published.
    pub fn close(&self) {
        let mut log = self.stream.lock();
        if log.session == self.session {
            log.closed = true;
        }
    }
}

impl Drop for Publication {
    fn drop(&mut self) {
        self.close();
    }
}

/// The receiving end of a stream.
#[derive(Debug)]
pub struct Subscription {
    stream: Arc<LogStream>,
}

impl Subscription {
    /// Hands at most `fragment_limit` fragments to `handler`, returning
    /// how many were delivered.
    pub fn poll<F>(&mut self, fragment_limit: usize, mut handler: F) -> usize
    where
        F: FnMut(Fragment),
    {
        let batch: Vec<Fragment> = {
            let mut log = self.stream.lock();
            let n = fragment_limit.min(log.fragments.len());
            let batch: Vec<Fragment> = log.fragments.drain(..n).collect();
            let drained: usize = batch.iter().map(|f| f.payload.len()).sum();
            log.used -= drained;
            batch
        };

        let count = batch.len();
        for fragment in batch {
            handler(fragment);
        }
        count
    }

    /// Returns `true` once the publisher closed the stream and every
    /// fragment has been drained.
    pub fn is_closed(&self) -> bool {
        let log = self.stream.lock();
        log.closed && log.fragments.is_empty()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.stream.subscribers.fetch_sub(1, Ordering::AcqRel);
    }
}
