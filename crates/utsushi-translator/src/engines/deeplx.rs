use std::sync::Arc;

use serde_json::{Value, json};
use utsushi_config::Settings;
use utsushi_core::{EngineContext, EngineError};

use super::http_client;
use crate::{TranslateError, Translator, ensure_success};

pub const NAME: &str = "DeepLX";
const URL_KEY: &str = "deeplx_api_url";

/// Self-hosted DeepLX server.
pub struct DeepLx {
    client: reqwest::Client,
    settings: Arc<Settings>,
}

impl DeepLx {
    pub fn setup(ctx: &EngineContext) -> Result<Self, EngineError> {
        if configured_url(&ctx.settings).is_none() {
            return Err(EngineError::NotConfigured(URL_KEY.to_string()));
        }
        Ok(Self {
            client: http_client()?,
            settings: Arc::clone(&ctx.settings),
        })
    }

    fn request_body(&self, text: &str) -> Value {
        let lang = |key: &str, fallback: &str| {
            self.settings
                .get_string(key)
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| fallback.to_string())
        };
        json!({
            "text": text,
            "source_lang": lang("translation_source_lang", "AUTO"),
            "target_lang": lang("translation_target_lang", "EN"),
        })
    }
}

#[async_trait::async_trait]
impl Translator for DeepLx {
    async fn translate(&self, text: &str) -> Result<String, TranslateError> {
        let url = configured_url(&self.settings)
            .ok_or_else(|| EngineError::NotConfigured(URL_KEY.to_string()))?;

        let response = self
            .client
            .post(url)
            .json(&self.request_body(text))
            .send()
            .await?;
        let value: Value = ensure_success(response).await?.json().await?;

        value["data"]
            .as_str()
            .map(str::to_string)
            .ok_or(TranslateError::EmptyResponse)
    }
}

fn configured_url(settings: &Settings) -> Option<String> {
    settings
        .get_string(URL_KEY)
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty())
}
