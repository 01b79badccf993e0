pub mod openai;
pub mod rate_limiter;
pub mod types;

pub use openai::{ChatCompletion, OpenAiClient};
pub use rate_limiter::{RateLimiter, RateLimiterConfig};
pub use types::*;
