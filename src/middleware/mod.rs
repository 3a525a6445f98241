// Request pipeline middleware: CORS, exception translation, rate limiting,
// response normalization

pub mod cors;
pub mod exception_filter;
pub mod rate_limiter;
pub mod response_normalizer;

pub use cors::*;
pub use exception_filter::*;
pub use rate_limiter::*;
pub use response_normalizer::*;
