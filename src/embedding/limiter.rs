use std::num::NonZeroU32;
use std::sync::Arc;

use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};

use super::{EmbeddingError, EmbeddingGateway, EmbeddingMode};

/// Holds every outbound request until the provider quota has room for it.
/// A batch call counts as one request.
pub struct RateLimitedEmbedder {
    inner: Arc<dyn EmbeddingGateway>,
    limiter: DefaultDirectRateLimiter,
}

impl RateLimitedEmbedder {
    pub fn per_minute(inner: Arc<dyn EmbeddingGateway>, requests_per_minute: u32) -> Self {
        let rpm = NonZeroU32::new(requests_per_minute).unwrap_or(NonZeroU32::MIN);
        Self {
            inner,
            limiter: RateLimiter::direct(Quota::per_minute(rpm)),
        }
    }
}

#[async_trait]
impl EmbeddingGateway for RateLimitedEmbedder {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    async fn embed(&self, text: &str, mode: EmbeddingMode) -> Result<Vec<f32>, EmbeddingError> {
        self.limiter.until_ready().await;
        self.inner.embed(text, mode).await
    }

    async fn embed_many(
        &self,
        texts: &[String],
        mode: EmbeddingMode,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.limiter.until_ready().await;
        self.inner.embed_many(texts, mode).await
    }
}
