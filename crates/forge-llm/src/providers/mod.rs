//! Provider implementations for the completion-adapter framework (§4.1).
//!
//! Each provider module implements the [`Adapter`](crate::adapter::Adapter)
//! trait for its respective vendor.
//!
//! - [`anthropic`]: Anthropic / Claude — the vision-capable reasoning and
//!   code adapters.
//! - [`openai`]: OpenAI — the fast code specialist fallback.
//! - [`google`]: Google / Gemini — the UI/Text-quality adapter.

pub mod anthropic;
pub mod google;
pub mod openai;

pub use anthropic::AnthropicAdapter;
pub use google::GoogleAdapter;
pub use openai::OpenAiAdapter;
