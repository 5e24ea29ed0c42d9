use std::sync::Arc;
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Value, json};
use utsushi_config::Settings;
use utsushi_core::engine::resolve_preset;
use utsushi_core::http::{self, chat_completions_url, ensure_success};
use utsushi_core::{EngineContext, EngineError};
use utsushi_types::{PresetKind, RawImage};

use crate::engine::{OcrEngine, OcrError, encode_png, ensure_image};

const OCR_PROMPT: &str = "OCR extract text from this image. Output only text, without any explanation.";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Vision chat completion against an OpenAI-compatible endpoint.
///
/// The preset profile is re-read on every prediction, so edits to url, model
/// or key apply without rebuilding the engine.
pub struct OpenAiOcr {
    client: reqwest::Client,
    settings: Arc<Settings>,
    preset: String,
}

impl OpenAiOcr {
    pub fn setup(ctx: &EngineContext) -> Result<Self, EngineError> {
        let (preset, profile) = ctx.resolve_preset(PresetKind::Ocr)?;
        let client = http::client(REQUEST_TIMEOUT)?;

        tracing::info!("[OCR] Vision preset '{preset}' using model '{}'", profile.model);
        Ok(Self {
            client,
            settings: Arc::clone(&ctx.settings),
            preset,
        })
    }
}

#[async_trait::async_trait]
impl OcrEngine for OpenAiOcr {
    async fn predict(&self, image: &RawImage) -> Result<String, OcrError> {
        ensure_image(image)?;
        let (_, profile) = resolve_preset(&self.settings, PresetKind::Ocr, &self.preset)?;

        let png = encode_png(image)?;
        let body = json!({
            "model": profile.model,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": OCR_PROMPT },
                    {
                        "type": "image_url",
                        "image_url": { "url": format!("data:image/png;base64,{}", STANDARD.encode(png)) }
                    }
                ]
            }]
        });

        let mut request = self
            .client
            .post(chat_completions_url(&profile.url))
            .json(&body);
        if !profile.key.is_empty() {
            request = request.bearer_auth(&profile.key);
        }

        let response = ensure_success(request.send().await?).await?;
        let value: Value = response.json().await?;
        value["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or(OcrError::EmptyResponse)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn setup_requires_named_or_default_profile() {
        let settings = Arc::new(Settings::in_memory());
        let ctx = EngineContext::new(Arc::clone(&settings)).with_preset("vision");
        assert!(matches!(
            OpenAiOcr::setup(&ctx),
            Err(EngineError::MissingPreset(_))
        ));

        let settings = Arc::new(Settings::in_memory_with(json!({
            "ocr_presets": { "default": { "url": "http://localhost:1234/v1", "model": "qwen-vl" } }
        })));
        let engine = OpenAiOcr::setup(&EngineContext::new(settings).with_preset("vision")).unwrap();
        assert_eq!(engine.preset, "default");
    }

    #[tokio::test]
    async fn predict_rejects_empty_image() {
        let settings = Arc::new(Settings::in_memory_with(json!({
            "ocr_presets": { "vision": {} }
        })));
        let engine = OpenAiOcr::setup(&EngineContext::new(settings).with_preset("vision")).unwrap();

        let result = engine.predict(&RawImage::blank(0, 10)).await;
        assert!(matches!(result, Err(OcrError::EmptyImage { .. })));
    }
}
