use std::collections::HashMap;
use std::io;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::instrument;

use crate::envelope::{EventData, RecordedEvent};
use crate::error::{self, Error};
use crate::transport::{Ack, Credentials, ExpectedVersion, RequestContext, Transport};

/// An event store held entirely in memory.
///
/// This implements the [`Transport`] port with the same semantics as a
/// remote store (versioned reads, atomic appends with optimistic
/// concurrency, credential checks) and is meant for tests and local
/// development. Clones share the same underlying streams.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

#[derive(Default)]
struct Inner {
    streams: HashMap<String, Vec<RecordedEvent>>,
    required_credentials: Option<Credentials>,
    unavailable: bool,
}

impl MemoryStore {
    /// Create an empty store that accepts any (or no) credentials.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every request not made with exactly these credentials.
    pub async fn require_credentials(&self, credentials: Option<Credentials>) {
        self.inner.write().await.required_credentials = credentials;
    }

    /// Simulate a store that is reachable but not ready to serve requests.
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.inner.write().await.unavailable = unavailable;
    }

    /// The head of a stream (its number of events); 0 for a missing stream.
    pub async fn head(&self, stream: &str) -> u64 {
        self.inner
            .read()
            .await
            .streams
            .get(stream)
            .map_or(0, |events| events.len() as u64)
    }

    /// A snapshot of all events in a stream, in order.
    pub async fn events(&self, stream: &str) -> Vec<RecordedEvent> {
        self.inner
            .read()
            .await
            .streams
            .get(stream)
            .cloned()
            .unwrap_or_default()
    }
}

impl Inner {
    fn check(
        &self,
        stream: &str,
        version: Option<u64>,
        context: &RequestContext,
    ) -> error::Result<()> {
        if context.is_expired() {
            let source = io::Error::new(io::ErrorKind::TimedOut, "request deadline elapsed");
            return Err(Error::transport(stream, version, source));
        }
        if self.unavailable {
            return Err(Error::TemporarilyUnavailable {
                stream: stream.to_owned(),
                version,
            });
        }
        match &self.required_credentials {
            Some(required) if context.credentials.as_ref() != Some(required) => {
                Err(Error::Unauthorized {
                    stream: stream.to_owned(),
                })
            },
            _ => Ok(()),
        }
    }
}

impl Transport for MemoryStore {
    #[instrument(skip_all, level = "trace")]
    async fn read_at(
        &self,
        stream: &str,
        version: u64,
        context: &RequestContext,
    ) -> error::Result<RecordedEvent> {
        let inner = self.inner.read().await;
        inner.check(stream, Some(version), context)?;

        let events = inner.streams.get(stream).ok_or_else(|| Error::StreamNotFound {
            stream: stream.to_owned(),
        })?;
        usize::try_from(version)
            .ok()
            .and_then(|index| events.get(index))
            .cloned()
            .ok_or_else(|| Error::NoMoreEvents {
                stream: stream.to_owned(),
                version,
            })
    }

    #[instrument(skip_all, level = "trace")]
    async fn append(
        &self,
        stream: &str,
        expected: ExpectedVersion,
        events: &[EventData],
        context: &RequestContext,
    ) -> error::Result<Ack> {
        let mut inner = self.inner.write().await;
        inner.check(stream, None, context)?;

        let head = inner.streams.get(stream).map_or(0, |e| e.len() as u64);
        if let ExpectedVersion::Exact(expected) = expected {
            if expected != head {
                return Err(Error::ConcurrencyConflict {
                    stream: stream.to_owned(),
                    expected,
                    actual: head,
                });
            }
        }

        if !events.is_empty() {
            let recorded = inner.streams.entry(stream.to_owned()).or_default();
            recorded.extend(
                events
                    .iter()
                    .zip(head..)
                    .map(|(data, version)| RecordedEvent::new(stream, version, data.clone())),
            );
            tracing::debug!(stream, count = events.len(), first_version = head, "appended events");
        }

        Ok(Ack {
            first_version: head,
            next_expected_version: head + events.len() as u64,
        })
    }
}
