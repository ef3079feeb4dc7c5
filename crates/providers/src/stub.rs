//! Deterministic in-process adapters.
//!
//! Used for local development without API credentials and by the
//! integration tests to script provider behavior (latency, transient
//! failures, terminal failures, async polling) without touching the
//! network.

use std::io::Cursor;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;

use crate::error::ProviderError;
use crate::traits::{EmbeddingProvider, GenerationProvider, VisionProvider};
use crate::types::{AsyncHandle, GeneratedImage, GenerationOutput, PollStatus, VisionAnalysis};

/// Encode a small two-tone JPEG so downstream decode, resize, and palette
/// extraction all have real pixels to work with.
fn stub_jpeg() -> Vec<u8> {
    let img = image::RgbImage::from_fn(256, 256, |x, _| {
        if x < 128 {
            image::Rgb([214, 166, 92])
        } else {
            image::Rgb([240, 236, 228])
        }
    });

    let mut buffer = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut buffer, 90)
        .encode_image(&img)
        .expect("encoding a stub JPEG cannot fail");
    buffer.into_inner()
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// Scriptable generation stub.
pub struct StubGeneration {
    bytes: Vec<u8>,
    latency: Duration,
    /// Remaining transient failures before calls start succeeding.
    transient_failures: AtomicU32,
    /// Pending polls before an async handle completes. Zero means the
    /// adapter is synchronous.
    async_polls: AtomicU32,
    asynchronous: bool,
}

impl StubGeneration {
    pub fn new() -> Self {
        Self {
            bytes: stub_jpeg(),
            latency: Duration::ZERO,
            transient_failures: AtomicU32::new(0),
            async_polls: AtomicU32::new(0),
            asynchronous: false,
        }
    }

    /// Sleep this long inside every generate call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Fail the first `n` generate calls with a transient error.
    pub fn failing_transient(self, n: u32) -> Self {
        self.transient_failures.store(n, Ordering::SeqCst);
        self
    }

    /// Return empty bytes instead of a valid image.
    pub fn returning_empty(mut self) -> Self {
        self.bytes = Vec::new();
        self
    }

    /// Behave as an asynchronous provider: generate returns a handle, and
    /// the handle reports pending for `polls` polls before completing.
    pub fn asynchronous(mut self, polls: u32) -> Self {
        self.asynchronous = true;
        self.async_polls.store(polls, Ordering::SeqCst);
        self
    }

    fn finished(&self) -> GeneratedImage {
        GeneratedImage {
            bytes: self.bytes.clone(),
            cost: 0.0,
            model: "stub-image".to_string(),
        }
    }
}

impl Default for StubGeneration {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GenerationProvider for StubGeneration {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn is_async(&self) -> bool {
        self.asynchronous
    }

    async fn generate(
        &self,
        _prompt: &str,
        _width: u32,
        _height: u32,
    ) -> Result<GenerationOutput, ProviderError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let remaining = self
            .transient_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if remaining {
            return Err(ProviderError::transient("stub: simulated transient failure"));
        }

        if self.asynchronous {
            return Ok(GenerationOutput::Handle(AsyncHandle {
                provider: "stub".to_string(),
                id: uuid::Uuid::new_v4().to_string(),
            }));
        }

        Ok(GenerationOutput::Image(self.finished()))
    }

    async fn poll(&self, _handle: &AsyncHandle) -> Result<PollStatus, ProviderError> {
        let still_pending = self
            .async_polls
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if still_pending {
            Ok(PollStatus::Pending(None))
        } else {
            Ok(PollStatus::Completed(self.finished()))
        }
    }
}

// ---------------------------------------------------------------------------
// Vision
// ---------------------------------------------------------------------------

/// Scriptable vision stub.
pub struct StubVision {
    tags: Vec<String>,
    category: String,
    description: String,
    confidence: f64,
    calls: AtomicU32,
    /// 1-based call number that fails terminally, if any.
    fail_terminal_on_call: Option<u32>,
}

impl StubVision {
    pub fn new() -> Self {
        Self {
            tags: vec!["stub-food".to_string(), "studio".to_string()],
            category: "food".to_string(),
            description: "A stub product photo.".to_string(),
            confidence: 0.95,
            calls: AtomicU32::new(0),
            fail_terminal_on_call: None,
        }
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    /// Fail terminally on exactly the `n`-th analyze call (1-based).
    pub fn failing_terminal_on_call(mut self, n: u32) -> Self {
        self.fail_terminal_on_call = Some(n);
        self
    }
}

impl Default for StubVision {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VisionProvider for StubVision {
    fn name(&self) -> &'static str {
        "stub"
    }

    async fn analyze(&self, _image: &[u8], prompt: &str) -> Result<VisionAnalysis, ProviderError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_terminal_on_call == Some(call) {
            return Err(ProviderError::terminal("stub: simulated tagging failure"));
        }

        Ok(VisionAnalysis {
            tags: self.tags.clone(),
            category: self.category.clone(),
            description: self.description.clone(),
            confidence: self.confidence,
            analysis: serde_json::json!({ "main_items": [prompt] }),
            model: "stub-vision".to_string(),
            cost: 0.0,
        })
    }
}

// ---------------------------------------------------------------------------
// Embeddings
// ---------------------------------------------------------------------------

/// Zero-vector embedding stub at the production dimensionality.
pub struct StubEmbedding {
    transient_failures: AtomicU32,
}

impl StubEmbedding {
    pub fn new() -> Self {
        Self {
            transient_failures: AtomicU32::new(0),
        }
    }

    /// Fail the first `n` embed calls with a transient error.
    pub fn failing_transient(self, n: u32) -> Self {
        self.transient_failures.store(n, Ordering::SeqCst);
        self
    }
}

impl Default for StubEmbedding {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for StubEmbedding {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn model(&self) -> &'static str {
        "stub-embedding"
    }

    fn dimension(&self) -> usize {
        larder_core::embedding::EMBEDDING_DIMENSION
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>, ProviderError> {
        let failing = self
            .transient_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(ProviderError::transient("stub: simulated embed failure"));
        }
        Ok(vec![0.0; self.dimension()])
    }
}
