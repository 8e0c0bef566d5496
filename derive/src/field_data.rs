use super::utils;

use darling::{ast, FromDeriveInput, FromField};
use proc_macro2::TokenStream;
use quote::quote;
use syn::spanned::Spanned;

#[derive(FromDeriveInput)]
#[darling(supports(struct_named))]
struct FieldDataInput {
    ident: syn::Ident,
    generics: syn::Generics,
    data: ast::Data<(), FieldOptions>,
}

#[derive(FromField)]
#[darling(attributes(field))]
struct FieldOptions {
    ident: Option<syn::Ident>,
    ty: syn::Type,
    #[darling(default)]
    rename: Option<String>,
    #[darling(default)]
    components: Option<usize>,
}

/// generate the impl, or the compile errors explaining why it cannot be generated
pub fn derive(input: syn::DeriveInput) -> Result<TokenStream, TokenStream> {
    let parsed = FieldDataInput::from_derive_input(&input).map_err(|e| e.write_errors())?;

    let fields = parsed
        .data
        .take_struct()
        .ok_or_else(|| {
            syn::Error::new(input.span(), "can only derive for structs").into_compile_error()
        })?
        .fields;

    let mut body = quote! {};

    for field in fields {
        utils::is_valid_field(&field.ty).map_err(syn::Error::into_compile_error)?;

        let ident = field.ident.clone().ok_or_else(|| {
            syn::Error::new(field.ty.span(), "cannot derive for structs with unnamed fields")
                .into_compile_error()
        })?;

        if field.components == Some(0) {
            return Err(
                syn::Error::new(ident.span(), "`components` must be at least 1")
                    .into_compile_error(),
            );
        }

        // the array name defaults to the field identifier
        let name = field.rename.unwrap_or_else(|| ident.to_string());
        let lit = syn::LitStr::new(&name, proc_macro2::Span::call_site());
        let components = field.components.unwrap_or(1);

        body = quote! {
            #body
            arrays.push(gridwrite::FieldArray::vector(#lit, #components, self.#ident.to_vec()));
        };
    }

    let struct_type = parsed.ident;
    let (impl_generics, ty_generics, where_clause) = parsed.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics gridwrite::FieldData for #struct_type #ty_generics #where_clause {
            fn field_arrays(&self) -> Vec<gridwrite::FieldArray> {
                let mut arrays = Vec::new();
                #body
                arrays
            }
        }
    })
}
