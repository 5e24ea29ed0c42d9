use utsushi_core::http::HttpError;
use utsushi_core::{EngineError, EngineRegistry};

pub mod engines;
mod manager;

pub use engines::default_registry;
pub use manager::{TranslationDispatch, TranslationManager};
pub(crate) use utsushi_core::http::ensure_success;

/// Translation provider interface
#[async_trait::async_trait]
pub trait Translator: Send + Sync {
    /// Translate `text` into the configured target language
    async fn translate(&self, text: &str) -> Result<String, TranslateError>;

    /// Whether results arrive incrementally through [`Translator::translate_stream`]
    fn supports_streaming(&self) -> bool {
        false
    }

    /// Deliver the translation as fragments. The default emits one fragment.
    async fn translate_stream(
        &self,
        text: &str,
        on_chunk: &(dyn Fn(String) + Send + Sync),
    ) -> Result<(), TranslateError> {
        let result = self.translate(text).await?;
        on_chunk(result);
        Ok(())
    }
}

pub type BoxedTranslator = Box<dyn Translator>;
pub type TranslatorRegistry = EngineRegistry<BoxedTranslator>;

#[derive(Debug, thiserror::Error)]
pub enum TranslateError {
    #[error("API error: {0}")]
    ApiError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Authentication error")]
    AuthenticationError,

    #[error("Response contained no translation")]
    EmptyResponse,

    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl From<HttpError> for TranslateError {
    fn from(err: HttpError) -> Self {
        match err {
            HttpError::Unauthorized(_) => Self::AuthenticationError,
            HttpError::RateLimited => Self::RateLimitExceeded,
            HttpError::Status { .. } => Self::ApiError(err.to_string()),
        }
    }
}
