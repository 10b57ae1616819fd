//! Generation provider trait for turning a prompt into answer text.

use async_trait::async_trait;

use crate::error::Result;

/// A text generation backend.
///
/// Calls may fail for transient reasons (network, quota, timeouts); the
/// orchestrator treats every error as a degraded answer rather than a crash.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &str;

    /// Generate a completion for `prompt`.
    async fn generate(&self, prompt: &str) -> Result<String>;
}
