pub mod error;
pub mod protocol;
pub mod selectors;

pub use error::backend_error::BackendError;
