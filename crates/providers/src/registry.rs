//! Maps configured adapter names to concrete implementations.

use std::sync::Arc;

use larder_core::error::CoreError;

use crate::openai::{OpenAiEmbedding, OpenAiGeneration, OpenAiVision};
use crate::stub::{StubEmbedding, StubGeneration, StubVision};
use crate::traits::{EmbeddingProvider, GenerationProvider, VisionProvider};

/// The resolved set of adapters the pipeline runs against.
#[derive(Clone)]
pub struct ProviderRegistry {
    pub generation: Arc<dyn GenerationProvider>,
    pub vision: Arc<dyn VisionProvider>,
    pub embedding: Arc<dyn EmbeddingProvider>,
}

impl ProviderRegistry {
    /// Resolve adapter names from configuration.
    ///
    /// `api_key` is required whenever any adapter is `openai`.
    pub fn from_names(
        generation: &str,
        vision: &str,
        embedding: &str,
        api_key: Option<&str>,
    ) -> Result<Self, CoreError> {
        let key_for = |adapter: &str| -> Result<String, CoreError> {
            api_key.map(str::to_string).ok_or_else(|| {
                CoreError::Validation(format!(
                    "Provider '{adapter}' is 'openai' but OPENAI_API_KEY is not set"
                ))
            })
        };

        let generation: Arc<dyn GenerationProvider> = match generation {
            "openai" => Arc::new(OpenAiGeneration::new(key_for("generation")?, None)),
            "stub" => Arc::new(StubGeneration::new()),
            other => {
                return Err(CoreError::Validation(format!(
                    "Unknown generation provider '{other}'"
                )))
            }
        };

        let vision: Arc<dyn VisionProvider> = match vision {
            "openai" => Arc::new(OpenAiVision::new(key_for("vision")?, None)),
            "stub" => Arc::new(StubVision::new()),
            other => {
                return Err(CoreError::Validation(format!(
                    "Unknown vision provider '{other}'"
                )))
            }
        };

        let embedding: Arc<dyn EmbeddingProvider> = match embedding {
            "openai" => Arc::new(OpenAiEmbedding::new(key_for("embedding")?, None)),
            "stub" => Arc::new(StubEmbedding::new()),
            other => {
                return Err(CoreError::Validation(format!(
                    "Unknown embedding provider '{other}'"
                )))
            }
        };

        Ok(Self {
            generation,
            vision,
            embedding,
        })
    }

    /// All-stub registry for tests and credential-less local runs.
    pub fn stubs() -> Self {
        Self {
            generation: Arc::new(StubGeneration::new()),
            vision: Arc::new(StubVision::new()),
            embedding: Arc::new(StubEmbedding::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_names_resolve() {
        let registry = ProviderRegistry::from_names("stub", "stub", "stub", None).unwrap();
        assert_eq!(registry.generation.name(), "stub");
        assert_eq!(registry.embedding.dimension(), 1536);
    }

    #[test]
    fn openai_requires_api_key() {
        assert!(ProviderRegistry::from_names("openai", "stub", "stub", None).is_err());
        assert!(ProviderRegistry::from_names("openai", "stub", "stub", Some("sk-test")).is_ok());
    }

    #[test]
    fn unknown_adapter_rejected() {
        assert!(ProviderRegistry::from_names("dalle", "stub", "stub", None).is_err());
    }
}
