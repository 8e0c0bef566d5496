mod field_data;
mod utils;

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

/// Implement `gridwrite::FieldData` for a struct of float vectors.
///
/// Every named field becomes one array. `#[field(rename = "...")]` changes the array
/// name and `#[field(components = n)]` groups the values into tuples of `n`.
#[proc_macro_derive(FieldData, attributes(field))]
pub fn derive_field_data(input: TokenStream) -> TokenStream {
    // Parse the input tokens into a syntax tree
    let input = parse_macro_input!(input as DeriveInput);

    field_data::derive(input)
        .unwrap_or_else(|e| e)
        .into()
}
