//! Shared adapter types.

use serde::{Deserialize, Serialize};

/// A finished generation: the master image plus cost metadata.
#[derive(Debug, Clone)]
pub struct GeneratedImage {
    pub bytes: Vec<u8>,
    /// Generation cost in USD.
    pub cost: f64,
    /// Provider model identifier.
    pub model: String,
}

/// Opaque handle to an in-flight generation on an asynchronous provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AsyncHandle {
    /// Adapter name that issued the handle.
    pub provider: String,
    /// Provider-side job identifier.
    pub id: String,
}

/// Result of a generation call: synchronous providers return bytes
/// directly, asynchronous ones return a handle to poll.
#[derive(Debug, Clone)]
pub enum GenerationOutput {
    Image(GeneratedImage),
    Handle(AsyncHandle),
}

/// Result of polling an [`AsyncHandle`].
#[derive(Debug, Clone)]
pub enum PollStatus {
    /// Still working; optional provider-reported progress in 0..=100.
    Pending(Option<u8>),
    Completed(GeneratedImage),
}

/// Vision-tagging result for one image.
#[derive(Debug, Clone)]
pub struct VisionAnalysis {
    pub tags: Vec<String>,
    pub category: String,
    pub description: String,
    /// Confidence in the tagging, 0..=1.
    pub confidence: f64,
    /// Raw structured analysis from the vision model.
    pub analysis: serde_json::Value,
    /// Provider model identifier.
    pub model: String,
    /// Tagging cost in USD.
    pub cost: f64,
}
