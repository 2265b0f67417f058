use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::instrument;
use uuid::Uuid;

use crate::error::{self, Error};
use crate::event::Event;

#[cfg(feature = "derive")]
#[doc(inline)]
pub use evstream_derive::TryFromEnvelope;

// Absent metadata is stored as empty bytes and read back as an empty mapping.
const EMPTY_METADATA: &[u8] = b"{}";

/// An event prepared for writing, with its identity and type fixed.
///
/// The payload and metadata are held as serialized JSON bytes. Once built,
/// neither the ID nor the type of the event can be changed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventData {
    id: Uuid,
    event_type: String,
    payload: Vec<u8>,
    metadata: Vec<u8>,
}

/// An event read back from a stream, at the version the store assigned it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedEvent {
    stream: String,
    version: u64,
    data: EventData,
}

/// Build an envelope from a payload and optional metadata.
///
/// A missing (or nil) ID is replaced by a newly generated one, and a missing
/// (or empty) event type is taken from [`Event::name`] of the payload type.
/// Metadata may be left out; it is then read back as an empty mapping.
///
/// # Example
/// ```rust
/// # use std::collections::HashMap;
/// # use evstream::envelope::to_envelope;
/// # use evstream::Event;
/// use serde::Serialize;
///
/// #[derive(Event, Serialize)]
/// struct FooEvent {
///     foo_field: String,
/// }
///
/// let event = FooEvent { foo_field: "Lorem Ipsum".into() };
/// let metadata = HashMap::from([("Foo", "consectetur adipiscing elit")]);
///
/// let envelope = to_envelope(None, None, &event, Some(&metadata)).unwrap();
/// assert_eq!(envelope.event_type(), "FooEvent");
/// ```
#[instrument(skip_all, level = "trace")]
pub fn to_envelope<E, M>(
    id: Option<Uuid>,
    event_type: Option<&str>,
    payload: &E,
    metadata: Option<&M>,
) -> error::Result<EventData>
where
    E: Event + Serialize + ?Sized,
    M: Serialize + ?Sized,
{
    let payload = serde_json::to_vec(payload).map_err(encode_error)?;
    let metadata = match metadata {
        Some(metadata) => serde_json::to_vec(metadata).map_err(encode_error)?,
        None => Vec::new(),
    };
    let event_type = event_type.filter(|t| !t.is_empty()).unwrap_or(E::name());

    Ok(EventData::from_parts(id, event_type, payload, metadata))
}

fn encode_error(error: serde_json::Error) -> Error {
    Error::Decoding {
        stream: None,
        version: None,
        source: error.into(),
    }
}

impl EventData {
    /// Serialize a payload into an envelope, with a generated ID, the type
    /// named by its [`Event`] implementation, and no metadata.
    pub fn json<E>(payload: &E) -> error::Result<Self>
    where
        E: Event + Serialize + ?Sized,
    {
        to_envelope::<E, ()>(None, None, payload, None)
    }

    /// Like [`EventData::json`], but also serialize the given metadata.
    pub fn json_with_metadata<E, M>(payload: &E, metadata: &M) -> error::Result<Self>
    where
        E: Event + Serialize + ?Sized,
        M: Serialize + ?Sized,
    {
        to_envelope(None, None, payload, Some(metadata))
    }

    /// Build an envelope from already serialized payload and metadata bytes.
    ///
    /// The ID is generated if it is missing or nil.
    pub fn from_parts(
        id: Option<Uuid>,
        event_type: impl Into<String>,
        payload: Vec<u8>,
        metadata: Vec<u8>,
    ) -> Self {
        let id = id.filter(|id| !id.is_nil()).unwrap_or_else(Uuid::now_v7);

        Self {
            id,
            event_type: event_type.into(),
            payload,
            metadata,
        }
    }

    /// The unique ID of this event.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The type tag of this event.
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// The serialized payload.
    pub fn raw_payload(&self) -> &[u8] {
        &self.payload
    }

    /// The serialized metadata; empty if none was given.
    pub fn raw_metadata(&self) -> &[u8] {
        &self.metadata
    }
}

impl RecordedEvent {
    /// Place an envelope at a version of a stream.
    ///
    /// _This should only be needed within transport implementations; the
    /// version of an event is assigned by the store._
    pub fn new(stream: impl Into<String>, version: u64, data: EventData) -> Self {
        Self {
            stream: stream.into(),
            version,
            data,
        }
    }

    /// The name of the stream this event was read from.
    pub fn stream(&self) -> &str {
        &self.stream
    }

    /// The position of this event in its stream.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// The unique ID of this event.
    pub fn id(&self) -> Uuid {
        self.data.id
    }

    /// The type tag of this event.
    pub fn event_type(&self) -> &str {
        &self.data.event_type
    }

    /// The serialized payload.
    pub fn raw_payload(&self) -> &[u8] {
        &self.data.payload
    }

    /// The serialized metadata; empty if none was written.
    pub fn raw_metadata(&self) -> &[u8] {
        &self.data.metadata
    }

    /// The envelope as it was written.
    pub fn data(&self) -> &EventData {
        &self.data
    }

    /// Decode the payload into the given type.
    #[instrument(skip_all, level = "trace")]
    pub fn payload<P: DeserializeOwned>(&self) -> error::Result<P> {
        serde_json::from_slice(&self.data.payload).map_err(|e| self.decode_error(e))
    }

    /// Decode the metadata into the given type.
    ///
    /// Events written without metadata decode as an empty JSON object.
    #[instrument(skip_all, level = "trace")]
    pub fn metadata<M: DeserializeOwned>(&self) -> error::Result<M> {
        let bytes = match self.data.metadata.as_slice() {
            [] => EMPTY_METADATA,
            bytes => bytes,
        };
        serde_json::from_slice(bytes).map_err(|e| self.decode_error(e))
    }

    /// The error raised when this event's type matches none of the types a
    /// caller tried to decode it as.
    #[doc(hidden)]
    pub fn unknown_event_type(&self) -> Error {
        let message = format!("unexpected event type {:?}", self.data.event_type);
        self.decode_error(message)
    }

    fn decode_error(&self, source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Error {
        Error::Decoding {
            stream: Some(self.stream.clone()),
            version: Some(self.version),
            source: source.into(),
        }
    }
}

/// Attempt to decode a recorded event into the implementing type.
///
/// This trait is implemented for every deserializable [`Event`] type, where
/// it checks the event type before decoding. It can also be implemented
/// (or derived) for enums holding several events, to dispatch on the event
/// type of the envelope.
///
/// # Example
/// ```rust
/// # use evstream::envelope::{RecordedEvent, TryFromEnvelope};
/// # use evstream::{Error, Event};
/// use serde::Deserialize;
///
/// #[derive(Event, Deserialize)]
/// struct OrderPlaced;
///
/// #[derive(Event, Deserialize)]
/// struct OrderShipped;
///
/// enum OrderEvent {
///     Placed(OrderPlaced),
///     Shipped(OrderShipped),
/// }
///
/// impl TryFromEnvelope for OrderEvent {
///     fn try_from_envelope(envelope: &RecordedEvent) -> Result<Self, Error> {
///         if envelope.event_type() == OrderPlaced::name() {
///             Ok(OrderEvent::Placed(envelope.payload()?))
///         } else {
///             Ok(OrderEvent::Shipped(OrderShipped::try_from_envelope(envelope)?))
///         }
///     }
/// }
/// ```
pub trait TryFromEnvelope: Sized {
    /// Attempt to decode the payload of a recorded event.
    fn try_from_envelope(envelope: &RecordedEvent) -> error::Result<Self>;
}

impl<E> TryFromEnvelope for E
where
    E: Event + DeserializeOwned,
{
    fn try_from_envelope(envelope: &RecordedEvent) -> error::Result<Self> {
        if envelope.event_type() != E::name() {
            return Err(envelope.unknown_event_type());
        }

        envelope.payload()
    }
}
