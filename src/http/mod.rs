pub mod client;

pub use client::{RateLimitedHttpClient, RateLimits, JSON_API, OCTET_STREAM};
