pub mod client;
pub mod error;
pub mod json_extract;
pub mod params_clean;
pub mod trait_def;

pub use client::{HttpLlmBridge, LlmConfig};
pub use error::{LlmError, LlmResult};
pub use trait_def::LlmBridge;
