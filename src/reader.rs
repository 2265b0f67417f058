use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use tracing::instrument;

use crate::envelope::{RecordedEvent, TryFromEnvelope};
use crate::error::{self, Error};
use crate::transport::{Credentials, RequestContext, Transport};

/// A cursor over the events of a single stream.
///
/// Each call to [`advance`](`StreamReader::advance`) requests the event at the
/// cursor's next version and stages either that event or the error the
/// transport classified. The result of a step is read from
/// [`last_error`](`StreamReader::last_error`) and
/// [`current`](`StreamReader::current`); `advance` itself only signals that
/// the enumeration may continue, so a transient outage never ends a loop
/// on its own.
///
/// # Example
/// ```rust
/// # use std::collections::HashMap;
/// # use evstream::{Client, Error, MemoryStore};
/// # use serde::Deserialize;
/// #
/// # #[derive(Deserialize)]
/// # struct FooEvent {}
/// #
/// # async fn read(client: Client<MemoryStore>) -> Result<(), Error> {
/// let mut reader = client.new_stream_reader("foostream");
/// while reader.advance().await {
///     match reader.last_error() {
///         Some(Error::NoMoreEvents { .. }) => break,
///         Some(_) => return Err(reader.take_error().unwrap()),
///         None => {
///             let (event, meta): (FooEvent, HashMap<String, String>) = reader.deserialize()?;
///         },
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub struct StreamReader<T> {
    transport: Arc<T>,
    stream: String,
    credentials: Option<Credentials>,
    timeout: Option<Duration>,
    deadline: Option<Instant>,

    next_version: u64,
    stage: Stage,
}

enum Stage {
    Idle,
    Delivering(RecordedEvent),
    Consumed(RecordedEvent),
    Failed(Error),
}

impl<T: Transport> StreamReader<T> {
    pub(crate) fn new(
        transport: Arc<T>,
        stream: String,
        credentials: Option<Credentials>,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            transport,
            stream,
            credentials,
            timeout,
            deadline: None,

            next_version: 0,
            stage: Stage::Idle,
        }
    }

    /// Request the event at the next version and stage the outcome.
    ///
    /// On success the cursor moves forward by one. On failure the error is
    /// staged and the cursor stays put, so the same version is requested
    /// again on the next call. This always returns `true`.
    #[instrument(
        skip_all,
        level = "debug",
        fields(stream = %self.stream, version = self.next_version)
    )]
    pub async fn advance(&mut self) -> bool {
        let context = self.context();
        let result = self
            .transport
            .read_at(&self.stream, self.next_version, &context)
            .await;

        self.stage = match result {
            Ok(event) => {
                self.next_version += 1;
                Stage::Delivering(event)
            },
            Err(error) => Stage::Failed(error),
        };

        true
    }

    /// The error staged by the most recent call to `advance`, if any.
    pub fn last_error(&self) -> Option<&Error> {
        match &self.stage {
            Stage::Failed(error) => Some(error),
            _ => None,
        }
    }

    /// Take ownership of the staged error, leaving the reader idle.
    pub fn take_error(&mut self) -> Option<Error> {
        match std::mem::replace(&mut self.stage, Stage::Idle) {
            Stage::Failed(error) => Some(error),
            other => {
                self.stage = other;
                None
            },
        }
    }

    /// The staged event, without decoding it.
    pub fn current(&self) -> Option<&RecordedEvent> {
        match &self.stage {
            Stage::Delivering(event) | Stage::Consumed(event) => Some(event),
            _ => None,
        }
    }

    /// Move the cursor so the next `advance` requests the given version.
    ///
    /// This is rejected while a staged event has not been decoded yet;
    /// advance past it or decode it first. A staged error or decoded event
    /// is cleared.
    pub fn seek(&mut self, version: u64) -> error::Result<()> {
        if let Stage::Delivering(event) = &self.stage {
            return Err(Error::Pending {
                stream: self.stream.clone(),
                version: event.version(),
            });
        }

        self.stage = Stage::Idle;
        self.next_version = version;
        Ok(())
    }

    /// Decode the payload and metadata of the staged event.
    ///
    /// A decoding failure leaves the staged event and the cursor untouched,
    /// so the caller may retry with other types or advance past it.
    #[instrument(skip_all, level = "trace")]
    pub fn deserialize<P, M>(&mut self) -> error::Result<(P, M)>
    where
        P: DeserializeOwned,
        M: DeserializeOwned,
    {
        let event = self.staged()?;
        let decoded = (event.payload()?, event.metadata()?);

        self.consume();
        Ok(decoded)
    }

    /// Decode the staged event into existing payload and metadata values.
    ///
    /// The targets are only overwritten if both decode successfully.
    pub fn deserialize_into<P, M>(&mut self, payload: &mut P, metadata: &mut M) -> error::Result<()>
    where
        P: DeserializeOwned,
        M: DeserializeOwned,
    {
        let (p, m) = self.deserialize()?;
        *payload = p;
        *metadata = m;
        Ok(())
    }

    /// Decode the staged event as one of several event types, chosen by its
    /// event type.
    pub fn decode<G: TryFromEnvelope>(&mut self) -> error::Result<G> {
        let decoded = G::try_from_envelope(self.staged()?)?;

        self.consume();
        Ok(decoded)
    }

    /// Pin the deadline of every following request, overriding the client's
    /// timeout. `None` goes back to the timeout.
    pub fn set_deadline(&mut self, deadline: Option<Instant>) {
        self.deadline = deadline;
    }

    /// The version the next call to `advance` will request.
    pub fn next_version(&self) -> u64 {
        self.next_version
    }

    /// The name of the stream being read.
    pub fn stream(&self) -> &str {
        &self.stream
    }

    // Move the staged event out, leaving the reader idle.
    pub(crate) fn take_current(&mut self) -> Option<RecordedEvent> {
        match std::mem::replace(&mut self.stage, Stage::Idle) {
            Stage::Delivering(event) | Stage::Consumed(event) => Some(event),
            other => {
                self.stage = other;
                None
            },
        }
    }

    fn context(&self) -> RequestContext {
        match self.deadline {
            Some(deadline) => RequestContext {
                credentials: self.credentials.clone(),
                deadline: Some(deadline),
            },
            None => RequestContext::with_timeout(self.credentials.clone(), self.timeout),
        }
    }

    fn staged(&self) -> error::Result<&RecordedEvent> {
        self.current().ok_or_else(|| Error::NotStaged {
            stream: self.stream.clone(),
        })
    }

    fn consume(&mut self) {
        self.stage = match std::mem::replace(&mut self.stage, Stage::Idle) {
            Stage::Delivering(event) => Stage::Consumed(event),
            other => other,
        };
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde::{Deserialize, Serialize};

    use super::*;
    use crate::envelope::EventData;
    use crate::error::ErrorKind;
    use crate::event::Event;
    use crate::memory::MemoryStore;
    use crate::transport::ExpectedVersion;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Counted {
        n: u64,
    }

    impl Event for Counted {
        fn name() -> &'static str {
            "Counted"
        }
    }

    async fn store_with(stream: &str, count: u64) -> Arc<MemoryStore> {
        let store = MemoryStore::new();
        let events: Vec<_> = (0..count)
            .map(|n| EventData::json(&Counted { n }).unwrap())
            .collect();
        store
            .append(stream, ExpectedVersion::Any, &events, &RequestContext::default())
            .await
            .unwrap();
        Arc::new(store)
    }

    fn reader(store: Arc<MemoryStore>, stream: &str) -> StreamReader<MemoryStore> {
        StreamReader::new(store, stream.into(), None, None)
    }

    #[tokio::test]
    async fn advance_stages_and_moves_cursor() {
        let mut reader = reader(store_with("s", 3).await, "s");

        assert!(reader.advance().await);
        assert!(reader.last_error().is_none());
        assert_eq!(Some(0), reader.current().map(RecordedEvent::version));
        assert_eq!(1, reader.next_version());

        let (event, _): (Counted, HashMap<String, String>) = reader.deserialize().unwrap();
        assert_eq!(Counted { n: 0 }, event);
    }

    #[tokio::test]
    async fn seek_then_advance() {
        let mut reader = reader(store_with("s", 5).await, "s");

        reader.seek(3).unwrap();
        reader.advance().await;

        assert_eq!(Some(3), reader.current().map(RecordedEvent::version));
        assert_eq!(4, reader.next_version());
    }

    #[tokio::test]
    async fn seek_rejected_while_delivering() {
        let mut reader = reader(store_with("s", 2).await, "s");
        reader.advance().await;

        let error = reader.seek(0).unwrap_err();
        assert!(matches!(error, Error::Pending { version: 0, .. }));

        reader.deserialize::<Counted, HashMap<String, String>>().unwrap();
        reader.seek(0).unwrap();
        assert!(reader.current().is_none());
        assert_eq!(0, reader.next_version());
    }

    #[tokio::test]
    async fn no_more_events_is_stable() {
        let mut reader = reader(store_with("s", 1).await, "s");
        reader.advance().await;

        for _ in 0..3 {
            assert!(reader.advance().await);
            let error = reader.last_error().unwrap();
            assert_eq!(ErrorKind::NoMoreEvents, error.kind());
            assert_eq!(1, reader.next_version());
        }
    }

    #[tokio::test]
    async fn failure_keeps_cursor() {
        let store = store_with("s", 2).await;
        let mut reader = reader(store.clone(), "s");

        store.set_unavailable(true).await;
        reader.advance().await;
        assert_eq!(Some(ErrorKind::TemporarilyUnavailable), reader.last_error().map(Error::kind));
        assert_eq!(0, reader.next_version());
        assert!(reader.current().is_none());

        store.set_unavailable(false).await;
        reader.advance().await;
        assert!(reader.last_error().is_none());
        assert_eq!(Some(0), reader.current().map(RecordedEvent::version));
    }

    #[tokio::test]
    async fn deserialize_without_event() {
        let mut reader = reader(store_with("s", 0).await, "s");

        let error = reader.deserialize::<Counted, ()>().unwrap_err();
        assert!(matches!(error, Error::NotStaged { .. }));

        reader.advance().await;
        let error = reader.deserialize::<Counted, ()>().unwrap_err();
        assert!(matches!(error, Error::NotStaged { .. }));
    }

    #[tokio::test]
    async fn decoding_error_does_not_poison_cursor() {
        let mut reader = reader(store_with("s", 2).await, "s");
        reader.advance().await;

        let error = reader.deserialize::<Vec<String>, HashMap<String, String>>().unwrap_err();
        assert_eq!(ErrorKind::Decoding, error.kind());
        assert_eq!(Some(0), reader.current().map(RecordedEvent::version));

        reader.advance().await;
        let (event, _): (Counted, HashMap<String, String>) = reader.deserialize().unwrap();
        assert_eq!(Counted { n: 1 }, event);
    }

    #[tokio::test]
    async fn deserialize_into_targets() {
        let mut reader = reader(store_with("s", 1).await, "s");
        reader.advance().await;

        let mut event = Counted { n: 99 };
        let mut meta: HashMap<String, String> = HashMap::from([("stale".into(), "x".into())]);
        reader.deserialize_into(&mut event, &mut meta).unwrap();

        assert_eq!(Counted { n: 0 }, event);
        assert!(meta.is_empty());
    }

    #[tokio::test]
    async fn decode_by_event_type() {
        let mut reader = reader(store_with("s", 1).await, "s");
        reader.advance().await;

        assert_eq!(Counted { n: 0 }, reader.decode::<Counted>().unwrap());
    }

    #[tokio::test]
    async fn deadline_reaches_transport() {
        let mut reader = reader(store_with("s", 1).await, "s");

        reader.set_deadline(Some(Instant::now()));
        reader.advance().await;
        assert_eq!(Some(ErrorKind::Transport), reader.last_error().map(Error::kind));
        assert_eq!(0, reader.next_version());

        reader.set_deadline(None);
        reader.advance().await;
        assert_eq!(Some(0), reader.current().map(RecordedEvent::version));
    }

    #[tokio::test]
    async fn take_error_leaves_idle() {
        let mut reader = reader(store_with("s", 0).await, "s");
        reader.advance().await;

        assert!(reader.take_error().is_some());
        assert!(reader.last_error().is_none());
        assert!(reader.take_error().is_none());
    }
}
