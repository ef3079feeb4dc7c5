//! Adapter traits for the three external model providers.
//!
//! Each trait is object-safe so the pipeline can hold `Arc<dyn ...>`
//! resolved from configuration at startup.

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::types::{AsyncHandle, GenerationOutput, PollStatus, VisionAnalysis};

/// Produces a master image for a prompt.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Adapter name as used in configuration.
    fn name(&self) -> &'static str;

    /// Whether [`generate`](Self::generate) returns a handle that must be
    /// polled rather than image bytes.
    fn is_async(&self) -> bool {
        false
    }

    /// Generate an image for the prompt at the requested master size.
    async fn generate(
        &self,
        prompt: &str,
        width: u32,
        height: u32,
    ) -> Result<GenerationOutput, ProviderError>;

    /// Poll an in-flight generation. Synchronous providers never hand out
    /// handles and should reject the call as terminal.
    async fn poll(&self, handle: &AsyncHandle) -> Result<PollStatus, ProviderError>;
}

/// Analyzes an image and produces searchable tags plus a description.
#[async_trait]
pub trait VisionProvider: Send + Sync {
    /// Adapter name as used in configuration.
    fn name(&self) -> &'static str;

    /// Analyze the full-resolution image together with its original
    /// generation prompt.
    async fn analyze(&self, image: &[u8], prompt: &str) -> Result<VisionAnalysis, ProviderError>;
}

/// Produces fixed-dimension text embeddings for semantic search.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Adapter name as used in configuration.
    fn name(&self) -> &'static str;

    /// Model identifier persisted alongside stored vectors.
    fn model(&self) -> &'static str;

    /// Dimensionality of produced vectors. Constant per adapter.
    fn dimension(&self) -> usize;

    /// Embed a single text string.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError>;
}
