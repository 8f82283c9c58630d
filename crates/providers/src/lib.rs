//! LLM provider adapters for ThreadChat.

pub mod google;
pub mod openai_compat;
pub mod registry;
pub mod traits;
pub(crate) mod util;

// Re-exports for convenience.
pub use registry::ProviderRegistry;
pub use traits::{ChatRequest, ChatResponse, LlmProvider, Usage};
pub use util::{resolve_api_key, resolve_optional_api_key};
