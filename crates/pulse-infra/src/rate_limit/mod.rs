//! Rate limiting implementations.

mod keyed;

pub use keyed::{KeyedRateLimiter, RateLimitConfig};
