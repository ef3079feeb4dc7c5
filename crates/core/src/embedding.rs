//! Search-embedding input construction and validation.
//!
//! The embedding input is rebuilt deterministically from persisted fields so
//! a replayed task produces byte-identical input: tags are sorted
//! lexicographically before joining.

use crate::error::CoreError;

/// Dimensionality of search embeddings (text-embedding-ada-002).
pub const EMBEDDING_DIMENSION: usize = 1536;

/// Label stored in `image_embeddings.embedding_source`.
pub const EMBEDDING_SOURCE: &str = "prompt+tags+description";

/// Build the text fed to the embedding provider for one image.
///
/// Concatenates prompt, description, category, and the tag list. Empty
/// category and empty tag lists are omitted. Tags are sorted so the result
/// does not depend on provider ordering.
pub fn build_embedding_input(
    prompt: &str,
    description: &str,
    category: &str,
    tags: &[String],
) -> String {
    let mut parts = vec![
        format!("Image: {prompt}"),
        format!("Description: {description}"),
    ];

    if !category.is_empty() {
        parts.push(format!("Category: {category}"));
    }

    if !tags.is_empty() {
        let mut sorted: Vec<&str> = tags.iter().map(String::as_str).collect();
        sorted.sort_unstable();
        parts.push(format!("Tags: {}", sorted.join(", ")));
    }

    parts.join(" ")
}

/// Validate that an embedding vector has the expected dimensionality.
pub fn validate_embedding_dimension(embedding: &[f32]) -> Result<(), CoreError> {
    if embedding.len() != EMBEDDING_DIMENSION {
        return Err(CoreError::Validation(format!(
            "Embedding must be {EMBEDDING_DIMENSION}-dimensional, got {}",
            embedding.len()
        )));
    }
    Ok(())
}
