use darling::FromDeriveInput;
use proc_macro2::TokenStream;
use quote::quote;
use syn::{DeriveInput, Error};

pub fn derive_event(input: DeriveInput) -> Result<TokenStream, Error> {
    let args = super::EvstreamAttributes::from_derive_input(&input).map_err(Error::from)?;

    let name = input.ident;
    let (impl_generics, ty_generics, clause) = input.generics.split_for_impl();

    // The type tag is either the attribute value or the bare type name, so a
    // `FooEvent` struct is written with the "FooEvent" type.
    let event_name = args.name.unwrap_or_else(|| name.to_string());
    if event_name.is_empty() {
        return Err(Error::new(name.span(), "event name must not be empty"));
    }

    Ok(quote! {
        impl #impl_generics ::evstream::event::Event for #name #ty_generics #clause {
            fn name() -> &'static str {
                #event_name
            }
        }
    })
}
