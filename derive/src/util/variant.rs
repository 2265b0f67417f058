use darling::FromVariant;
use syn::spanned::Spanned;
use syn::{Data, DeriveInput, Error, Type, Variant};

// Collect the variants of an enum whose attributes pass the filter.
pub fn try_collect<T, F>(input: &DeriveInput, filter: F) -> Result<Vec<Variant>, Error>
where
    T: FromVariant,
    F: Fn(&T) -> bool,
{
    let Data::Enum(ref data) = input.data else {
        return Err(Error::new(input.span(), "expected enum type"));
    };

    let mut variants = Vec::with_capacity(data.variants.len());
    for variant in &data.variants {
        let args = T::from_variant(variant).map_err(Error::from)?;
        if filter(&args) {
            variants.push(variant.clone());
        }
    }

    Ok(variants)
}

// A dispatched variant wraps exactly one event type.
pub fn try_into_inner_type(variant: Variant) -> Result<Type, Error> {
    let span = variant.span();
    let mut fields = variant.fields.into_iter();

    match (fields.next(), fields.next()) {
        (Some(field), None) => Ok(field.ty),
        _ => Err(Error::new(span, "variant should have exactly one field")),
    }
}
