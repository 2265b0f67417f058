use darling::FromDeriveInput;
use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

mod envelope;
mod event;
mod util;

#[derive(FromDeriveInput)]
#[darling(attributes(evstream))]
struct EvstreamAttributes {
    #[darling(default)]
    pub name: Option<String>,
}

macro_rules! impl_derive {
    ($(#[$doc:meta])* $target:ident, $method:path $(,)?) => {
        #[proc_macro_derive($target, attributes(evstream))]
        #[allow(non_snake_case)]
        $(#[$doc])*
        pub fn $target(input: TokenStream) -> TokenStream {
            let input = parse_macro_input!(input as DeriveInput);
            let result = $method(input);

            result.unwrap_or_else(|e| e.into_compile_error()).into()
        }
    };
}

impl_derive!(
    /// Derive an Event implementation, with optional custom naming.
    ///
    /// The Event's `name` (the type tag written with every envelope) is the
    /// name of the derived type, unless `evstream(name = "...")` is given.
    ///
    /// # Example
    /// ```rust
    /// # use evstream::Event;
    ///
    /// #[derive(Event)]
    /// #[evstream(name = "order-placed")]
    /// struct OrderPlaced;
    ///
    /// #[derive(Event)]
    /// struct FooEvent;
    ///
    /// assert_eq!(OrderPlaced::name(), "order-placed");
    /// assert_eq!(FooEvent::name(), "FooEvent");
    /// ```
    Event, event::derive_event
);

impl_derive!(
    /// Derive a TryFromEnvelope implementation for an enum type.
    ///
    /// The generated method compares the envelope's event type against each
    /// variant's `Event::name` and decodes the payload as the matching
    /// variant. An unknown event type results in a decoding error.
    ///
    /// An `evstream(ignore)` attribute may be specified on individual variants
    /// to leave them out of the dispatch (it also allows non-Event variants to
    /// be included in the type).
    TryFromEnvelope,
    envelope::derive_try_from_envelope,
);
