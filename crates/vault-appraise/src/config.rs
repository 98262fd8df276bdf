//! Pipeline configuration.
//!
//! Model selection and image preprocessing are deliberately knobs, not
//! constants: which model is primary versus fallback and how hard the
//! capture is compressed are product-tuning decisions that keep moving.

use serde::{Deserialize, Serialize};

use crate::retry::RetryPolicy;

/// System-wide pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PipelineConfig {
    pub models: ModelSelection,
    pub retry: RetryConfig,
    pub image: ImageConfig,
}

/// Which remote model serves each stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSelection {
    /// Vision model for the primary identification stage.
    pub identify: String,
    /// Search-grounded model for market research.
    pub research: String,
    /// Schema-constrained model for the structuring stage.
    pub structure: String,
    /// Vision model for the degraded basic-mode path.
    pub fallback: String,
}

impl Default for ModelSelection {
    fn default() -> Self {
        Self {
            identify: "gemini-2.5-flash".to_string(),
            research: "gemini-2.5-flash".to_string(),
            structure: "gemini-2.5-flash".to_string(),
            fallback: "gemini-2.5-flash-lite".to_string(),
        }
    }
}

/// Retry budgets for the two routes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Full (grounded) route: 3 attempts, 2s/4s backoff.
    pub primary: RetryPolicy,
    /// Basic-mode route gets a smaller budget and shorter waits.
    pub fallback: RetryPolicy,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            primary: RetryPolicy {
                max_attempts: 3,
                base_delay_ms: 2_000,
            },
            fallback: RetryPolicy {
                max_attempts: 2,
                base_delay_ms: 1_000,
            },
        }
    }
}

/// How the capture is downscaled before upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageConfig {
    /// Longest edge in pixels after resize.
    pub max_dimension: u32,
    /// JPEG quality, 0.0..=1.0.
    pub jpeg_quality: f32,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            max_dimension: 1024,
            jpeg_quality: 0.8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_shipping_budgets() {
        let config = PipelineConfig::default();
        assert_eq!(config.retry.primary.max_attempts, 3);
        assert_eq!(config.retry.primary.base_delay_ms, 2_000);
        assert_eq!(config.retry.fallback.max_attempts, 2);
        assert!(config.retry.fallback.base_delay_ms < config.retry.primary.base_delay_ms);
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = PipelineConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: PipelineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.models.identify, config.models.identify);
        assert_eq!(back.image.max_dimension, config.image.max_dimension);
    }
}
