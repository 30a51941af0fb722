//! reqwest client for the recap backend.

pub mod client;
pub mod error;

pub use client::{paths, RecapHttpClient, CSRF_HEADER};
pub use error::{ApiError, ApiResult};
