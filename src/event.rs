#[cfg(feature = "derive")]
#[doc(inline)]
pub use evstream_derive::Event;

/// A domain event type that can be written to a stream.
///
/// The name is the type tag stored with every envelope of this type. It is
/// used when an envelope is built without an explicit type, and when an
/// envelope is dispatched to one of several event types on read (see
/// [`TryFromEnvelope`](`crate::envelope::TryFromEnvelope`)). Once events have
/// been written, the name of an event type should stay the same, even if its
/// data structure changes.
///
/// # Example
/// ```rust
/// # use evstream::Event;
/// #
/// struct FooEvent {
///     foo_field: String,
/// }
///
/// impl Event for FooEvent {
///     fn name() -> &'static str {
///         "FooEvent"
///     }
/// }
/// ```
pub trait Event {
    /// The type tag of this event.
    fn name() -> &'static str;
}

impl<E: Event + ?Sized> Event for &E {
    fn name() -> &'static str {
        E::name()
    }
}

impl<E: Event + ?Sized> Event for Box<E> {
    fn name() -> &'static str {
        E::name()
    }
}
