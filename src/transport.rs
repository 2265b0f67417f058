use std::fmt;
use std::time::{Duration, Instant};

use serde::Deserialize;

use crate::envelope::{EventData, RecordedEvent};
use crate::error;

/// The precondition an append places on the head of a stream.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// Append regardless of the current head.
    #[default]
    Any,
    /// Append only if the head of the stream is exactly this version.
    ///
    /// The head is the number of events in the stream, so `Exact(0)` requires
    /// the stream to be empty or missing.
    Exact(u64),
}

/// The acknowledgement of a successful append.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ack {
    /// The version assigned to the first event in the batch.
    pub first_version: u64,
    /// The head of the stream after the append.
    pub next_expected_version: u64,
}

/// A username and password pair sent with every request.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    username: String,
    password: String,
}

/// Per-request parameters forwarded to the transport untouched.
#[derive(Clone, Debug, Default)]
pub struct RequestContext {
    /// The credentials the request is made with.
    pub credentials: Option<Credentials>,
    /// The point in time after which the request should be abandoned.
    pub deadline: Option<Instant>,
}

/// The network boundary of the engine.
///
/// Implementations issue the actual requests against an event store and
/// classify every failure into an [`Error`](`crate::error::Error`) variant.
/// They are expected to honor the deadline and credentials of the request
/// context, and must evaluate the expected version of an append atomically
/// with the append itself.
#[trait_variant::make(Send)]
pub trait Transport {
    /// Read the event at a version of a stream.
    ///
    /// Reading at or past the head returns
    /// [`NoMoreEvents`](`crate::error::Error::NoMoreEvents`).
    async fn read_at(
        &self,
        stream: &str,
        version: u64,
        context: &RequestContext,
    ) -> error::Result<RecordedEvent>;

    /// Append a batch of events to a stream, all or nothing.
    ///
    /// A missing stream is created by the first successful append.
    async fn append(
        &self,
        stream: &str,
        expected: ExpectedVersion,
        events: &[EventData],
        context: &RequestContext,
    ) -> error::Result<Ack>;
}

impl Credentials {
    /// Create a new credential pair.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// The username.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// The password.
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl RequestContext {
    /// Create a context whose deadline is the given timeout from now.
    pub fn with_timeout(credentials: Option<Credentials>, timeout: Option<Duration>) -> Self {
        Self {
            credentials,
            deadline: timeout.map(|t| Instant::now() + t),
        }
    }

    /// Whether the deadline of this context has passed.
    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}
