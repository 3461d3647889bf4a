//! The document-understanding seam: one page + instruction → free text.
//!
//! [`DocumentReader`] is the only place the pipeline touches the network.
//! The default [`LlmDocumentReader`] rasterises the page and asks a vision
//! LLM through `edgequake-llm`; tests and embedders plug in their own.
//!
//! Readers only report what the service said. Timeouts, JSON location and
//! normalization are the caller's job ([`crate::pipeline::extract`]).

use crate::config::BatchConfig;
use crate::error::{BolError, PageError};
use crate::output::PageDocument;
use crate::pipeline::raster;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::sync::Arc;
use tracing::debug;

/// Default model when a provider is named without one.
const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

/// What the document-understanding service answered for one page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReaderReply {
    /// Untrusted free text, expected to contain one JSON object.
    pub text: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl ReaderReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }
}

/// External document-understanding capability.
///
/// Must be safe to call concurrently for different pages.
pub trait DocumentReader: Send + Sync {
    fn read<'a>(
        &'a self,
        page: &'a PageDocument,
        instruction: &'a str,
    ) -> BoxFuture<'a, Result<ReaderReply, PageError>>;
}

/// Reads pages with a vision LLM.
pub struct LlmDocumentReader {
    provider: Arc<dyn LLMProvider>,
    options: CompletionOptions,
    max_rendered_pixels: u32,
    password: Option<String>,
}

impl LlmDocumentReader {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &BatchConfig) -> Self {
        Self {
            provider,
            options: build_options(config),
            max_rendered_pixels: config.max_rendered_pixels,
            password: config.password.clone(),
        }
    }

    async fn read_page(&self, page: &PageDocument, instruction: &str) -> Result<ReaderReply, PageError> {
        let page_num = page.page_number();
        let image = raster::rasterise_page(page, self.max_rendered_pixels, self.password.as_deref()).await?;

        let messages = vec![
            ChatMessage::system(instruction),
            ChatMessage::user_with_images("Extract the shipment fields from this bill of lading page.", vec![image]),
        ];

        let response = self
            .provider
            .chat(&messages, Some(&self.options))
            .await
            .map_err(|e| PageError::ExtractionCall {
                page: page_num,
                detail: e.to_string(),
            })?;

        debug!(
            "Page {}: {} input tokens, {} output tokens",
            page_num, response.prompt_tokens, response.completion_tokens
        );

        Ok(ReaderReply {
            text: response.content,
            input_tokens: response.prompt_tokens as u64,
            output_tokens: response.completion_tokens as u64,
        })
    }
}

impl DocumentReader for LlmDocumentReader {
    fn read<'a>(
        &'a self,
        page: &'a PageDocument,
        instruction: &'a str,
    ) -> BoxFuture<'a, Result<ReaderReply, PageError>> {
        self.read_page(page, instruction).boxed()
    }
}

fn build_options(config: &BatchConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

/// Pick the reader for a batch: an injected reader wins, otherwise an
/// [`LlmDocumentReader`] over the resolved provider.
pub fn resolve_reader(config: &BatchConfig) -> Result<Arc<dyn DocumentReader>, BolError> {
    if let Some(ref reader) = config.reader {
        return Ok(Arc::clone(reader));
    }
    let provider = resolve_provider(config)?;
    Ok(Arc::new(LlmDocumentReader::new(provider, config)))
}

fn create_vision_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, BolError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        BolError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific:
///
/// 1. `config.provider`, used as-is.
/// 2. `config.provider_name` + `config.model`.
/// 3. `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`, when both are set.
/// 4. Anthropic, when `ANTHROPIC_API_KEY` is set.
/// 5. Whatever `ProviderFactory::from_env` detects.
pub fn resolve_provider(config: &BatchConfig) -> Result<Arc<dyn LLMProvider>, BolError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);

    if let Some(ref name) = config.provider_name {
        return create_vision_provider(name, model);
    }

    if let (Ok(prov), Ok(env_model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !env_model.is_empty() {
            return create_vision_provider(&prov, &env_model);
        }
    }

    if std::env::var("ANTHROPIC_API_KEY").is_ok_and(|k| !k.is_empty()) {
        return create_vision_provider("anthropic", model);
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| BolError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set ANTHROPIC_API_KEY, OPENAI_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}
