//! Provider adapters for image generation, vision tagging, and text
//! embeddings.
//!
//! Every adapter normalizes its failures into [`error::ProviderError`] with
//! a [`larder_core::failure::FailureKind`] before the error crosses into
//! the pipeline, so the retry policy never inspects provider-specific
//! error shapes.

pub mod error;
pub mod openai;
pub mod registry;
pub mod stub;
pub mod traits;
pub mod types;

pub use error::ProviderError;
pub use registry::ProviderRegistry;
pub use traits::{EmbeddingProvider, GenerationProvider, VisionProvider};
pub use types::{AsyncHandle, GeneratedImage, GenerationOutput, PollStatus, VisionAnalysis};
