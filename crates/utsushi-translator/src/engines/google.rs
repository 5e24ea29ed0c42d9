use std::sync::Arc;

use serde_json::Value;
use utsushi_config::Settings;
use utsushi_core::{EngineContext, EngineError};

use super::http_client;
use crate::{TranslateError, Translator, ensure_success};

pub const NAME: &str = "GoogleTranslate";
const ENDPOINT: &str = "https://translate.googleapis.com/translate_a/single";

/// Public web endpoint, no key required.
pub struct GoogleTranslate {
    client: reqwest::Client,
    settings: Arc<Settings>,
}

impl GoogleTranslate {
    pub fn setup(ctx: &EngineContext) -> Result<Self, EngineError> {
        Ok(Self {
            client: http_client()?,
            settings: Arc::clone(&ctx.settings),
        })
    }
}

#[async_trait::async_trait]
impl Translator for GoogleTranslate {
    async fn translate(&self, text: &str) -> Result<String, TranslateError> {
        let source = self
            .settings
            .get_string("translation_source_lang")
            .unwrap_or_else(|| "auto".to_string());
        let target = self
            .settings
            .get_string("translation_target_lang")
            .unwrap_or_else(|| "en".to_string());

        let response = self
            .client
            .get(ENDPOINT)
            .query(&[
                ("client", "gtx"),
                ("dt", "t"),
                ("sl", source.as_str()),
                ("tl", target.as_str()),
                ("q", text),
            ])
            .send()
            .await?;
        let value: Value = ensure_success(response).await?.json().await?;

        join_segments(&value).ok_or(TranslateError::EmptyResponse)
    }
}

/// The response is `[[["translated", "original", ...], ...], ...]`.
fn join_segments(value: &Value) -> Option<String> {
    let segments = value.get(0)?.as_array()?;
    let text: String = segments
        .iter()
        .filter_map(|segment| segment.get(0).and_then(Value::as_str))
        .collect();
    (!text.is_empty()).then_some(text)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn segments_are_concatenated() {
        let value = json!([
            [["Hello, ", "こんにちは、", null], ["world.", "世界。", null]],
            null,
            "ja"
        ]);
        assert_eq!(join_segments(&value).as_deref(), Some("Hello, world."));
    }

    #[test]
    fn malformed_response_has_no_text() {
        assert_eq!(join_segments(&json!({"error": "nope"})), None);
        assert_eq!(join_segments(&json!([[]])), None);
    }
}
