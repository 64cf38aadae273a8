//! Extract and transform stages.

pub mod fetch;
pub mod normalize;

pub use fetch::{HttpRateFetcher, RateFetcher, DEFAULT_API_BASE};
pub use normalize::normalize;
