use std::time::Duration;

use futures::{stream, Stream};

use crate::envelope::RecordedEvent;
use crate::error::{self, Error, ErrorKind};
use crate::reader::StreamReader;
use crate::transport::Transport;

const DEFAULT_UNAVAILABLE_DELAY: Duration = Duration::from_secs(30);
const DEFAULT_NOT_FOUND_DELAY: Duration = Duration::from_secs(10);

/// What a caller should do after a reader step failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    /// Wait, then request the same version again.
    Retry(Duration),
    /// The enumeration has ended normally.
    Stop,
    /// The error cannot be recovered from by retrying.
    Fatal,
}

/// A caller-side policy deciding how to react to reader errors.
///
/// The reader never retries on its own. This policy encodes the usual
/// reaction to each [`ErrorKind`]:
/// * transport errors and a temporarily unavailable store are retried after
///   `unavailable_delay`, up to `max_unavailable_retries` times in a row;
/// * a missing stream is retried after `not_found_delay` (it may be created
///   later), up to `max_not_found_retries` times in a row;
/// * running past the head of the stream stops the enumeration;
/// * everything else (unauthorized, conflicts, decoding) is fatal.
///
/// Both retry limits default to unbounded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// The delay before retrying a transport error or unavailable store.
    pub unavailable_delay: Duration,
    /// The delay before retrying a missing stream.
    pub not_found_delay: Duration,
    /// The number of consecutive transport/unavailable retries allowed.
    pub max_unavailable_retries: Option<u32>,
    /// The number of consecutive missing-stream retries allowed.
    pub max_not_found_retries: Option<u32>,
}

impl RetryPolicy {
    /// Decide how to react to an error, given how many consecutive failures
    /// (including this one) drew on the same retry budget, as counted by
    /// [`Attempts`].
    pub fn decide(&self, error: &Error, attempt: u32) -> Decision {
        let within = |max: Option<u32>| max.map_or(true, |max| attempt <= max);

        match error.kind() {
            ErrorKind::Transport | ErrorKind::TemporarilyUnavailable
                if within(self.max_unavailable_retries) =>
            {
                Decision::Retry(self.unavailable_delay)
            },
            ErrorKind::StreamNotFound if within(self.max_not_found_retries) => {
                Decision::Retry(self.not_found_delay)
            },
            ErrorKind::NoMoreEvents => Decision::Stop,
            ErrorKind::Transport
            | ErrorKind::TemporarilyUnavailable
            | ErrorKind::StreamNotFound
            | ErrorKind::Unauthorized
            | ErrorKind::ConcurrencyConflict
            | ErrorKind::Decoding
            | ErrorKind::Usage => Decision::Fatal,
        }
    }

    /// Set the delay used for transport errors and an unavailable store.
    pub fn unavailable_delay(mut self, delay: Duration) -> Self {
        self.unavailable_delay = delay;
        self
    }

    /// Set the delay used for a missing stream.
    pub fn not_found_delay(mut self, delay: Duration) -> Self {
        self.not_found_delay = delay;
        self
    }

    /// Bound the consecutive retries of transport errors and an unavailable
    /// store.
    pub fn max_unavailable_retries(mut self, max: Option<u32>) -> Self {
        self.max_unavailable_retries = max;
        self
    }

    /// Bound the consecutive retries of a missing stream.
    pub fn max_not_found_retries(mut self, max: Option<u32>) -> Self {
        self.max_not_found_retries = max;
        self
    }
}

/// Counts consecutive failures per retry budget.
///
/// Transport errors and an unavailable store share one budget, a missing
/// stream has its own. A failure against another budget starts the count
/// over, and so should a successful read (see [`reset`](`Attempts::reset`)).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Attempts {
    budget: Option<ErrorKind>,
    count: u32,
}

impl Attempts {
    /// Record a failure and return the number of consecutive failures
    /// against its budget, this one included.
    pub fn record(&mut self, error: &Error) -> u32 {
        let budget = match error.kind() {
            ErrorKind::Transport => ErrorKind::TemporarilyUnavailable,
            kind => kind,
        };
        if self.budget != Some(budget) {
            self.budget = Some(budget);
            self.count = 0;
        }

        self.count += 1;
        self.count
    }

    /// Forget all recorded failures.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            unavailable_delay: DEFAULT_UNAVAILABLE_DELAY,
            not_found_delay: DEFAULT_NOT_FOUND_DELAY,
            max_unavailable_retries: None,
            max_not_found_retries: None,
        }
    }
}

impl<T> StreamReader<T>
where
    T: Transport + Send + Sync,
{
    /// Turn this reader into a Stream of events, applying a retry policy.
    ///
    /// The Stream yields events from the reader's next version onwards. It
    /// sleeps and retries whenever the policy says so, ends when the head of
    /// the stream is reached, and yields a fatal error as its last item.
    pub fn into_stream(
        self,
        policy: RetryPolicy,
    ) -> impl Stream<Item = error::Result<RecordedEvent>> + Send {
        stream::unfold(Some((self, policy)), |state| async move {
            let (mut reader, policy) = state?;
            let mut attempts = Attempts::default();

            loop {
                reader.advance().await;
                let Some(error) = reader.take_error() else {
                    let event = reader.take_current()?;
                    return Some((Ok(event), Some((reader, policy))));
                };

                let attempt = attempts.record(&error);
                match policy.decide(&error, attempt) {
                    Decision::Retry(delay) => {
                        tracing::debug!(%error, attempt, ?delay, "retrying read");
                        tokio::time::sleep(delay).await;
                    },
                    Decision::Stop => return None,
                    Decision::Fatal => return Some((Err(error), None)),
                }
            }
        })
    }
}
