//! LLM Provider implementations for Quill.
//!
//! All providers implement the `quill_core::Provider` trait.
//! The router selects the correct provider based on configuration and wraps
//! it in the retrying [`LlmClient`].

pub mod openai_compat;
pub mod retry;
pub mod router;

pub use openai_compat::OpenAiCompatProvider;
pub use retry::{LlmClient, RetryPolicy};
pub use router::{ProviderRouter, build_client, build_from_config};
