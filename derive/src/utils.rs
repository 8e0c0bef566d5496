use syn::spanned::Spanned;
use syn::Error;
use syn::Result;

/// only `Vec<f64>`, `&[f64]` and references to those can become arrays
pub(crate) fn is_valid_field(field_type: &syn::Type) -> Result<()> {
    match field_type {
        syn::Type::Path(path) => inner_type_vec_float(&path.path, field_type.span()),
        syn::Type::Slice(slice) => inner_type_float(&slice.elem),
        // a reference to either a vector or a slice, recurse on the referenced type
        syn::Type::Reference(reference) => is_valid_field(&reference.elem),
        _ => Err(Error::new(
            field_type.span(),
            "unhandled datatype. Only accepts Vec<f64> and &[f64]",
        )),
    }
}

fn inner_type_vec_float(path: &syn::Path, span: proc_macro2::Span) -> Result<()> {
    let segment = path
        .segments
        .last()
        .filter(|segment| segment.ident == "Vec")
        .ok_or_else(|| Error::new(span, "expected Vec<f64>"))?;

    match &segment.arguments {
        syn::PathArguments::AngleBracketed(args) if args.args.len() == 1 => match &args.args[0] {
            syn::GenericArgument::Type(inner) => inner_type_float(inner),
            _ => Err(Error::new(span, "expected Vec<f64>")),
        },
        _ => Err(Error::new(span, "expected Vec<f64>")),
    }
}

fn inner_type_float(ty: &syn::Type) -> Result<()> {
    match ty {
        syn::Type::Path(path) if path.path.is_ident("f64") => Ok(()),
        _ => Err(Error::new(ty.span(), "array values must be f64")),
    }
}
