use proc_macro::TokenStream;

mod injectable;

/// Derive macro generating the constructor descriptor of a struct
///
/// - `Arc<T>` fields are injected by type, `#[inject(name = "q")]` adds a qualifier.
/// - `#[inject(default)]` fields take `Default::default()` and are never injected.
/// - Any other field is an unannotated parameter and fails at bootstrap.
///
/// # Example
/// ```ignore
/// use axum_boot::prelude::*;
///
/// #[derive(Injectable)]
/// pub struct BookService {
///     repository: Arc<dyn BookRepository>,
///     #[inject(name = "classics")]
///     classics: Arc<Vec<Book>>,
///     #[inject(default)]
///     hits: AtomicU64,
/// }
/// ```
#[proc_macro_derive(Injectable, attributes(inject))]
pub fn derive_injectable(input: TokenStream) -> TokenStream {
    injectable::derive_injectable(input)
}
