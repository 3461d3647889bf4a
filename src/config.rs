//! Configuration types for BOL batch processing.
//!
//! All batch behaviour is controlled through [`BatchConfig`], built via its
//! [`BatchConfigBuilder`]. The tariff ([`RateConfig`]) travels inside the
//! config and is snapshotted when a batch starts, so an operator editing
//! rates mid-run only affects later batches.

use crate::cancel::CancellationFlag;
use crate::error::BolError;
use crate::pipeline::reader::DocumentReader;
use crate::pipeline::split::PageSplitter;
use crate::pricing::RateConfig;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::sync::Arc;

/// Configuration for one BOL batch.
///
/// # Example
/// ```rust
/// use bol_billing::{BatchConfig, RateConfig};
///
/// let config = BatchConfig::builder()
///     .concurrency(4)
///     .model("claude-sonnet-4-20250514")
///     .rates(RateConfig::default().with_fuel_surcharge(0.26))
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct BatchConfig {
    /// Number of extraction calls in flight at once. Default: 1 (sequential).
    ///
    /// Outcomes are always returned in page order whatever the value.
    pub concurrency: usize,

    /// LLM model identifier. If None, the provider default is used.
    pub model: Option<String>,

    /// LLM provider name (e.g. "anthropic", "openai", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Pre-constructed extraction capability. Takes precedence over every
    /// provider setting; the LLM is not consulted at all.
    pub reader: Option<Arc<dyn DocumentReader>>,

    /// Page splitter. Defaults to the pdfium splitter.
    pub splitter: Option<Arc<dyn PageSplitter>>,

    /// Sampling temperature. Default: 0.0.
    pub temperature: f32,

    /// Maximum tokens per extraction reply. Default: 1024.
    pub max_tokens: usize,

    /// Per-page extraction call timeout in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Longest edge, in pixels, of the page image sent to the model. Default: 2000.
    pub max_rendered_pixels: u32,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Custom extraction instruction. If None, uses the built-in one.
    pub instruction: Option<String>,

    /// Tariff used to price every page of the batch.
    pub rates: RateConfig,

    /// Per-page progress events.
    pub progress_callback: Option<ProgressCallback>,

    /// Cancel switch checked between page completions.
    pub cancellation: Option<CancellationFlag>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrency: 1,
            model: None,
            provider_name: None,
            provider: None,
            reader: None,
            splitter: None,
            temperature: 0.0,
            max_tokens: 1024,
            api_timeout_secs: 60,
            download_timeout_secs: 120,
            max_rendered_pixels: 2000,
            password: None,
            instruction: None,
            rates: RateConfig::default(),
            progress_callback: None,
            cancellation: None,
        }
    }
}

impl fmt::Debug for BatchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchConfig")
            .field("concurrency", &self.concurrency)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("reader", &self.reader.as_ref().map(|_| "<dyn DocumentReader>"))
            .field("splitter", &self.splitter.as_ref().map(|_| "<dyn PageSplitter>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("fuel_surcharge_percent", &self.rates.fuel_surcharge_percent)
            .finish()
    }
}

impl BatchConfig {
    /// Create a new builder for `BatchConfig`.
    pub fn builder() -> BatchConfigBuilder {
        BatchConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`BatchConfig`].
#[derive(Debug)]
pub struct BatchConfigBuilder {
    config: BatchConfig,
}

impl BatchConfigBuilder {
    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn reader(mut self, reader: Arc<dyn DocumentReader>) -> Self {
        self.config.reader = Some(reader);
        self
    }

    pub fn splitter(mut self, splitter: Arc<dyn PageSplitter>) -> Self {
        self.config.splitter = Some(splitter);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn instruction(mut self, text: impl Into<String>) -> Self {
        self.config.instruction = Some(text.into());
        self
    }

    pub fn rates(mut self, rates: RateConfig) -> Self {
        self.config.rates = rates;
        self
    }

    pub fn fuel_surcharge(mut self, ratio: f64) -> Self {
        self.config.rates.fuel_surcharge_percent = ratio;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    pub fn cancellation(mut self, flag: CancellationFlag) -> Self {
        self.config.cancellation = Some(flag);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<BatchConfig, BolError> {
        let c = &self.config;
        if c.concurrency == 0 {
            return Err(BolError::InvalidConfig("Concurrency must be ≥ 1".into()));
        }
        if c.api_timeout_secs == 0 {
            return Err(BolError::InvalidConfig(
                "API timeout must be at least 1 second".into(),
            ));
        }
        c.rates.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sequential_with_standard_tariff() {
        let config = BatchConfig::default();
        assert_eq!(config.concurrency, 1);
        assert_eq!(config.rates.fuel_surcharge_percent, 0.24);
        assert_eq!(config.api_timeout_secs, 60);
        assert!(config.instruction.is_none());
    }

    #[test]
    fn builder_clamps_concurrency() {
        let config = BatchConfig::builder().concurrency(0).build().unwrap();
        assert_eq!(config.concurrency, 1);
    }

    #[test]
    fn builder_rejects_negative_fuel_surcharge() {
        let err = BatchConfig::builder().fuel_surcharge(-1.0).build().unwrap_err();
        assert!(matches!(err, BolError::InvalidConfig(_)));
    }

    #[test]
    fn builder_rejects_zero_timeout() {
        assert!(BatchConfig::builder().api_timeout_secs(0).build().is_err());
    }

    #[test]
    fn debug_hides_provider_internals() {
        let s = format!("{:?}", BatchConfig::default());
        assert!(s.contains("BatchConfig"));
        assert!(s.contains("fuel_surcharge_percent"));
    }
}
