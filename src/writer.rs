use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::instrument;

use crate::envelope::EventData;
use crate::error;
use crate::transport::{Ack, Credentials, ExpectedVersion, RequestContext, Transport};

/// Appends batches of events to a single stream.
///
/// A batch is written all or nothing. With an
/// [`Exact`](`ExpectedVersion::Exact`) expected version, the batch is only
/// written if the head of the stream still matches; otherwise the append
/// fails with a [`ConcurrencyConflict`](`crate::Error::ConcurrencyConflict`)
/// and the caller decides how to reconcile.
pub struct StreamWriter<T> {
    transport: Arc<T>,
    stream: String,
    credentials: Option<Credentials>,
    timeout: Option<Duration>,
    deadline: Option<Instant>,
}

impl<T: Transport> StreamWriter<T> {
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
        }
    }

    /// Append the events, in order, at the head of the stream.
    ///
    /// The stream is created if it does not exist yet. An empty batch still
    /// has its expected version checked.
    #[instrument(skip_all, level = "debug", fields(stream = %self.stream, ?expected))]
    pub async fn append<I>(&mut self, expected: ExpectedVersion, events: I) -> error::Result<Ack>
    where
        I: IntoIterator<Item = EventData>,
    {
        let events: Vec<EventData> = events.into_iter().collect();
        let context = match self.deadline {
            Some(deadline) => RequestContext {
                credentials: self.credentials.clone(),
                deadline: Some(deadline),
            },
            None => RequestContext::with_timeout(self.credentials.clone(), self.timeout),
        };

        self.transport
            .append(&self.stream, expected, &events, &context)
            .await
    }

    /// Pin the deadline of every following append, overriding the client's
    /// timeout. `None` goes back to the timeout.
    pub fn set_deadline(&mut self, deadline: Option<Instant>) {
        self.deadline = deadline;
    }

    /// The name of the stream being written to.
    pub fn stream(&self) -> &str {
        &self.stream
    }
}

#[cfg(test)]
mod tests {
    use serde::Serialize;

    use super::*;
    use crate::error::{Error, ErrorKind};
    use crate::event::Event;
    use crate::memory::MemoryStore;

    #[derive(Serialize)]
    struct Placed {
        order: u32,
    }

    impl Event for Placed {
        fn name() -> &'static str {
            "Placed"
        }
    }

    fn placed(order: u32) -> EventData {
        EventData::json(&Placed { order }).unwrap()
    }

    fn writer(store: &Arc<MemoryStore>) -> StreamWriter<MemoryStore> {
        StreamWriter::new(store.clone(), "orders".into(), None, None)
    }

    #[tokio::test]
    async fn unconditional_append() {
        let store = Arc::new(MemoryStore::new());
        let mut writer = writer(&store);

        writer.append(ExpectedVersion::Any, [placed(1), placed(2)]).await.unwrap();
        let ack = writer.append(ExpectedVersion::Any, [placed(3)]).await.unwrap();

        assert_eq!(2, ack.first_version);
        assert_eq!(3, store.head("orders").await);
    }

    #[tokio::test]
    async fn exact_version_matches_head() {
        let store = Arc::new(MemoryStore::new());
        let mut writer = writer(&store);

        writer.append(ExpectedVersion::Exact(0), [placed(1)]).await.unwrap();
        let ack = writer.append(ExpectedVersion::Exact(1), [placed(2)]).await.unwrap();

        assert_eq!(2, ack.next_expected_version);
    }

    #[tokio::test]
    async fn stale_version_rejects_whole_batch() {
        let store = Arc::new(MemoryStore::new());
        let mut writer = writer(&store);
        writer.append(ExpectedVersion::Any, [placed(1)]).await.unwrap();

        let error = writer
            .append(ExpectedVersion::Exact(0), [placed(2), placed(3), placed(4)])
            .await
            .unwrap_err();

        assert_eq!(ErrorKind::ConcurrencyConflict, error.kind());
        assert!(matches!(error, Error::ConcurrencyConflict { expected: 0, actual: 1, .. }));
        assert_eq!(1, store.head("orders").await);
    }

    #[tokio::test]
    async fn expired_deadline_writes_nothing() {
        let store = Arc::new(MemoryStore::new());
        let mut writer = writer(&store);

        writer.set_deadline(Some(Instant::now()));
        let error = writer.append(ExpectedVersion::Any, [placed(1)]).await.unwrap_err();
        assert_eq!(ErrorKind::Transport, error.kind());
        assert_eq!(0, store.head("orders").await);

        writer.set_deadline(None);
        writer.append(ExpectedVersion::Any, [placed(1)]).await.unwrap();
        assert_eq!(1, store.head("orders").await);
    }

    #[tokio::test]
    async fn batch_order_is_kept() {
        let store = Arc::new(MemoryStore::new());
        let mut writer = writer(&store);
        let batch = vec![placed(1), placed(2), placed(3)];
        let ids: Vec<_> = batch.iter().map(EventData::id).collect();

        writer.append(ExpectedVersion::Any, batch).await.unwrap();

        let stored: Vec<_> = store.events("orders").await.iter().map(|e| e.id()).collect();
        assert_eq!(ids, stored);
    }
}
