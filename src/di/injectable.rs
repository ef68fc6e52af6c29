use crate::di::{Args, Signature};
use crate::error::Result;

/// Trait for types that can be created by the injector
///
/// This trait is typically implemented automatically via the `#[derive(Injectable)]` macro.
///
/// # Example
/// ```
/// use axum_boot::prelude::*;
///
/// trait BookRepository: Send + Sync {}
///
/// #[derive(Injectable)]
/// pub struct BookService {
///     // resolved by type
///     repository: Arc<dyn BookRepository>,
///     // resolved by type and qualifier
///     #[inject(name = "classics")]
///     classics: Arc<Vec<String>>,
///     // never injected
///     #[inject(default)]
///     hits: u64,
/// }
/// ```
pub trait Injectable: Sized + Send + Sync + 'static {
    /// Descriptor table of the constructor parameters
    fn signature() -> Signature;

    /// Build the instance from resolved parameters
    ///
    /// # Errors
    /// Returns an error if a parameter is missing or has an unexpected type.
    fn construct(args: Args) -> Result<Self>;
}

/// Anonymous scopes such as `Prefix::<()>::new("/v1")` carry no state.
impl Injectable for () {
    fn signature() -> Signature {
        Signature::of::<()>()
    }

    fn construct(_args: Args) -> Result<Self> {
        Ok(())
    }
}
