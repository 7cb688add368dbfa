pub mod client;
pub mod error;
pub mod retry;

pub use client::TimeApi;
pub use error::ApiError;
pub use retry::RetryConfig;
pub use tempo_api;
