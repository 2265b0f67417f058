use std::fmt;

type BoxStdError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The classified outcome of a failed request against an event store.
///
/// Every variant carries the stream it refers to (and the version, where one
/// was involved), so callers can act on an error without extra bookkeeping.
/// The engine itself never retries; see [`RetryPolicy`](`crate::retry::RetryPolicy`)
/// for a caller-side policy keyed on [`ErrorKind`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The network or protocol layer failed to reach the store, or the store
    /// produced a malformed response.
    #[error("transport error on stream {stream}{} ({source})", at_version(.version))]
    Transport {
        /// The stream the request targeted.
        stream: String,
        /// The version being read, if the request was a read.
        version: Option<u64>,
        /// The underlying transport failure.
        #[source]
        source: BoxStdError,
    },
    /// The store is reachable but reports a transient busy/starting state.
    #[error("event store temporarily unavailable (stream {stream}{})", at_version(.version))]
    TemporarilyUnavailable {
        /// The stream the request targeted.
        stream: String,
        /// The version being read, if the request was a read.
        version: Option<u64>,
    },
    /// The target stream does not exist (yet).
    #[error("stream {stream} does not exist")]
    StreamNotFound {
        /// The missing stream.
        stream: String,
    },
    /// The store rejected the request's credentials.
    #[error("unauthorized access to stream {stream}")]
    Unauthorized {
        /// The stream the request targeted.
        stream: String,
    },
    /// The read position is at or past the head of the stream.
    ///
    /// This is the normal end of an enumeration, not a failure of the store.
    #[error("no more events in stream {stream} at version {version}")]
    NoMoreEvents {
        /// The stream being read.
        stream: String,
        /// The version that was requested.
        version: u64,
    },
    /// An append's expected version did not match the head of the stream.
    ///
    /// None of the events in the rejected batch were written.
    #[error("wrong expected version for stream {stream} (expected {expected}, actual {actual})")]
    ConcurrencyConflict {
        /// The stream the batch was appended to.
        stream: String,
        /// The version the writer expected the head to be at.
        expected: u64,
        /// The head of the stream when the append was evaluated.
        actual: u64,
    },
    /// Payload or metadata bytes could not be mapped onto the requested type.
    ///
    /// The stream and version are absent when the error was raised while
    /// building an envelope, before it belonged to any stream.
    #[error(
        "bad envelope format{}{} ({source})",
        in_stream(.stream.as_deref()),
        at_version(.version)
    )]
    Decoding {
        /// The stream the envelope was read from.
        stream: Option<String>,
        /// The version of the envelope.
        version: Option<u64>,
        /// The serializer error or type mismatch.
        #[source]
        source: BoxStdError,
    },
    /// An envelope was requested from a reader that has nothing staged.
    #[error("reader for stream {stream} has no staged event")]
    NotStaged {
        /// The stream being read.
        stream: String,
    },
    /// A reader was repositioned while a staged event was still undecoded.
    #[error("reader for stream {stream} has an undecoded event at version {version}")]
    Pending {
        /// The stream being read.
        stream: String,
        /// The version of the staged event.
        version: u64,
    },
}

/// A field-less mirror of [`Error`], for matching and policy tables.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`Error::Transport`].
    Transport,
    /// See [`Error::TemporarilyUnavailable`].
    TemporarilyUnavailable,
    /// See [`Error::StreamNotFound`].
    StreamNotFound,
    /// See [`Error::Unauthorized`].
    Unauthorized,
    /// See [`Error::NoMoreEvents`].
    NoMoreEvents,
    /// See [`Error::ConcurrencyConflict`].
    ConcurrencyConflict,
    /// See [`Error::Decoding`].
    Decoding,
    /// See [`Error::NotStaged`] and [`Error::Pending`].
    Usage,
}

impl Error {
    /// Get the classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport { .. } => ErrorKind::Transport,
            Self::TemporarilyUnavailable { .. } => ErrorKind::TemporarilyUnavailable,
            Self::StreamNotFound { .. } => ErrorKind::StreamNotFound,
            Self::Unauthorized { .. } => ErrorKind::Unauthorized,
            Self::NoMoreEvents { .. } => ErrorKind::NoMoreEvents,
            Self::ConcurrencyConflict { .. } => ErrorKind::ConcurrencyConflict,
            Self::Decoding { .. } => ErrorKind::Decoding,
            Self::NotStaged { .. } | Self::Pending { .. } => ErrorKind::Usage,
        }
    }

    /// The stream this error refers to, if any.
    pub fn stream(&self) -> Option<&str> {
        match self {
            Self::Transport { stream, .. }
            | Self::TemporarilyUnavailable { stream, .. }
            | Self::StreamNotFound { stream }
            | Self::Unauthorized { stream }
            | Self::NoMoreEvents { stream, .. }
            | Self::ConcurrencyConflict { stream, .. }
            | Self::NotStaged { stream }
            | Self::Pending { stream, .. } => Some(stream),
            Self::Decoding { stream, .. } => stream.as_deref(),
        }
    }

    /// Wrap any transport failure as an [`Error::Transport`].
    pub fn transport<E>(stream: impl Into<String>, version: Option<u64>, source: E) -> Self
    where
        E: Into<BoxStdError>,
    {
        Self::Transport {
            stream: stream.into(),
            version,
            source: source.into(),
        }
    }
}

fn in_stream(stream: Option<&str>) -> String {
    stream.map(|s| format!(" in stream {s}")).unwrap_or_default()
}

fn at_version(version: &Option<u64>) -> String {
    match version {
        Some(v) => format!(" at version {v}"),
        None => String::new(),
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Transport => "transport",
            Self::TemporarilyUnavailable => "temporarily unavailable",
            Self::StreamNotFound => "stream not found",
            Self::Unauthorized => "unauthorized",
            Self::NoMoreEvents => "no more events",
            Self::ConcurrencyConflict => "concurrency conflict",
            Self::Decoding => "decoding",
            Self::Usage => "usage",
        };
        f.write_str(name)
    }
}

/// An alias type that always implies an event store client error.
pub type Result<T> = std::result::Result<T, Error>;
