//! LLM provider boundary: chat messages in, completion text out.

pub mod anthropic;
pub mod any;
pub mod config;
pub mod error;
pub mod http;
#[cfg(feature = "mock")]
pub mod mock;
pub mod openai;
pub mod provider;

pub use any::AnyProvider;
pub use config::{LlmConfig, ProviderKind};
pub use error::LlmError;
pub use provider::{ChatCompletion, ChatOptions, LlmProvider, Message, Role, Usage};
