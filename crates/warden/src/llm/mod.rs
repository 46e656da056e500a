//! Upstream language model client and prompt decoration.

mod gemini;
mod persona;

pub use gemini::GeminiClient;
pub use persona::Persona;

use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Upstream failure categories; details stay in the logs
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("upstream request failed: {0}")]
    Transport(String),

    #[error("upstream returned status {0}")]
    Status(u16),

    #[error("upstream response could not be decoded")]
    Decode,

    #[error("upstream is not configured")]
    NotConfigured,
}

impl UpstreamError {
    /// Short category for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::Status(_) => "status",
            Self::Decode => "decode",
            Self::NotConfigured => "not_configured",
        }
    }
}

pub type LlmFuture<'a> = Pin<Box<dyn Future<Output = Result<String, UpstreamError>> + Send + 'a>>;

/// Text generation backend
pub trait LlmClient: Send + Sync {
    /// Generate a completion for an already decorated prompt
    fn generate<'a>(&'a self, prompt: &'a str) -> LlmFuture<'a>;
}
