#[allow(clippy::module_inception)]
pub mod error;
pub mod executor;
pub mod resolve;

pub use error::{keys, ErrorPayload, LoaderError};
pub use executor::{TaskError, TransitionError};
pub use resolve::{CatalogError, ResolveError};
