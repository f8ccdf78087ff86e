pub mod error;
pub mod time_value;
pub mod types;

#[cfg(feature = "valuation")]
pub mod valuation;

#[cfg(feature = "sroi")]
pub mod sroi;

#[cfg(feature = "scenarios")]
pub mod scenarios;

#[cfg(feature = "projects")]
pub mod project;

pub use error::SroiError;
pub use types::*;

/// Standard result type for all SROI operations
pub type SroiResult<T> = Result<T, SroiError>;
