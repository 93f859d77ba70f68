mod record;

use proc_macro::TokenStream;

/// Derive macro for implementing the `Record` trait.
///
/// # Usage
///
/// ```ignore
/// use luvhive_state::Record;
///
/// #[derive(Clone, Serialize, Deserialize, Record)]
/// #[record(collection = "posts")]
/// struct Post {
///     #[record(id)]
///     pub id: String,
///     pub content: String,
/// }
/// ```
///
/// # Attributes
///
/// - `#[record(collection = "...")]` - Collection type used in shadow keys
///   (defaults to the snake_case struct name + "s", e.g. `Story` -> `storys`).
/// - `#[record(id)]` - Marks the identifier field (defaults to a field named `id`).
///   The field must deref to `str`.
#[proc_macro_derive(Record, attributes(record))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    record::derive_record(input)
}
