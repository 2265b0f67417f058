use darling::FromVariant;
use proc_macro2::{Span, TokenStream};
use quote::quote;
use syn::spanned::Spanned;
use syn::{DeriveInput, Error, Fields, Ident, Variant};

use crate::util::variant;

#[derive(FromVariant)]
#[darling(attributes(evstream))]
struct TryFromEnvelopeArgs {
    #[darling(default)]
    pub ignore: bool,
}

pub fn derive_try_from_envelope(input: DeriveInput) -> Result<TokenStream, Error> {
    let variants = variant::try_collect(&input, |arg: &TryFromEnvelopeArgs| !arg.ignore)?;

    let name = input.ident;
    let envelope = Ident::new("envelope", Span::call_site());

    let variant_branches = variants
        .into_iter()
        .map(|v| get_decode_branch(&name, &envelope, v))
        .collect::<Result<Vec<_>, Error>>()?;

    let (impl_generics, ty_generics, clause) = input.generics.split_for_impl();

    // Event::name() is not a constant expression, so the dispatch is an
    // if-else chain opened by an unreachable `if false` branch.
    Ok(quote! {
        impl #impl_generics ::evstream::envelope::TryFromEnvelope for #name #ty_generics #clause {
            fn try_from_envelope(
                #envelope: &::evstream::envelope::RecordedEvent
            ) -> ::evstream::error::Result<Self> {
                if false {
                    unreachable!()
                }
                #(#variant_branches)*
                else {
                    Err(#envelope.unknown_event_type())
                }
            }
        }
    })
}

fn get_decode_branch(
    name: &Ident,
    envelope: &Ident,
    variant: Variant,
) -> Result<TokenStream, Error> {
    let variant_name = variant.ident.clone();
    let field_ty = variant::try_into_inner_type(variant.clone())?;

    let field_ctor = match variant.fields {
        Fields::Named(fields) => {
            let field_name = fields.named.into_iter().next().and_then(|f| f.ident);

            quote! {
                #name::#variant_name {
                    #field_name: #envelope.payload()?
                }
            }
        },
        Fields::Unnamed(_) => quote! {
            #name::#variant_name(#envelope.payload()?)
        },
        _ => return Err(Error::new(variant.span(), "bad enum field")),
    };

    Ok(quote! {
        else if #envelope.event_type() == <#field_ty as ::evstream::event::Event>::name() {
            Ok(#field_ctor)
        }
    })
}
