#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Create stream readers and writers bound to a shared transport.
pub mod client;
/// Event envelopes, as written to and read back from a stream.
pub mod envelope;
/// The classified errors returned by every store request.
pub mod error;
/// The Event trait, naming the type tag of a domain event.
pub mod event;
/// An event store held in memory, for tests and local development.
pub mod memory;
/// A cursor reading the events of a stream one version at a time.
pub mod reader;
/// Caller-side retry decisions for reader errors.
pub mod retry;
/// The network boundary the engine issues its requests through.
pub mod transport;
/// Append batches of events under an expected-version precondition.
pub mod writer;

pub use client::{Client, ClientConfig};
pub use envelope::{to_envelope, EventData, RecordedEvent};
pub use error::{Error, ErrorKind};
pub use event::Event;
pub use memory::MemoryStore;
pub use reader::StreamReader;
pub use retry::{Attempts, Decision, RetryPolicy};
pub use transport::{Ack, Credentials, ExpectedVersion, RequestContext, Transport};
pub use writer::StreamWriter;
