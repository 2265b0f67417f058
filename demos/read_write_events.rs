//! Write events with metadata to a stream, then read them back.
//!
//! The store here is the in-memory transport, so the retry branches below are
//! only reached if it is switched to unavailable or made to require other
//! credentials; against a remote store they handle a server that is still
//! starting up or a stream that has not been created yet.

use std::collections::HashMap;
use std::time::Duration;

use evstream::{
    to_envelope, Attempts, Client, Credentials, Decision, Error, Event, EventData,
    ExpectedVersion, MemoryStore, RetryPolicy, Transport,
};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Event, Serialize, Deserialize)]
#[allow(non_snake_case)]
struct FooEvent {
    FooField: String,
    BarField: String,
    BazField: i32,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let store = MemoryStore::new();
    store
        .require_credentials(Some(Credentials::new("admin", "changeit")))
        .await;

    let mut client = Client::new(store);
    client.set_credentials("admin", "changeit");

    let stream = "foostream";
    write_events(&client, stream).await?;
    read_events(&client, stream).await?;

    Ok(())
}

async fn write_events<T: Transport>(client: &Client<T>, stream: &str) -> anyhow::Result<()> {
    let event1 = FooEvent {
        FooField: "Lorem Ipsum".into(),
        BarField: "Dolor Sit Amet".into(),
        BazField: 42,
    };
    let meta1 = HashMap::from([("Foo", "consectetur adipiscing elit")]);
    // Explicit ID and event type.
    let id = uuid::Uuid::now_v7();
    let envelope1 = to_envelope(Some(id), Some("FooEvent"), &event1, Some(&meta1))?;

    let event2 = FooEvent {
        FooField: "Mary had a little lamb".into(),
        BarField: "Its fleece was white as snow".into(),
        BazField: 1,
    };
    // Generated ID, and the event type taken from FooEvent.
    let envelope2 = EventData::json(&event2)?;

    let mut writer = client.new_stream_writer(stream);
    writer
        .append(ExpectedVersion::Any, [envelope1.clone(), envelope2])
        .await?;

    match writer.append(ExpectedVersion::Exact(0), [envelope1]).await {
        Err(error @ Error::ConcurrencyConflict { .. }) => {
            tracing::info!(%error, "received expected conflict");
        },
        other => anyhow::bail!("expected a concurrency conflict, got {other:?}"),
    }

    tracing::info!(stream, "written events to the event store");
    Ok(())
}

async fn read_events<T: Transport>(client: &Client<T>, stream: &str) -> anyhow::Result<()> {
    let policy = RetryPolicy::default()
        .unavailable_delay(Duration::from_secs(30))
        .not_found_delay(Duration::from_secs(10));
    let mut reader = client.new_stream_reader(stream);
    let mut attempts = Attempts::default();

    while reader.advance().await {
        if let Some(error) = reader.take_error() {
            match policy.decide(&error, attempts.record(&error)) {
                Decision::Retry(delay) => tokio::time::sleep(delay).await,
                Decision::Stop => return Ok(()),
                Decision::Fatal => return Err(error.into()),
            }
            continue;
        }

        attempts.reset();
        let version = reader.current().map(|e| e.version());
        let (event, meta): (FooEvent, HashMap<String, String>) = reader.deserialize()?;
        tracing::info!(?version, ?event, ?meta, "read event");
    }

    Ok(())
}
