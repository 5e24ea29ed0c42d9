use std::sync::Arc;

use futures_util::StreamExt;
use serde_json::{Value, json};
use utsushi_config::Settings;
use utsushi_config::defaults::DEFAULT_TRANSLATION_PROMPT;
use utsushi_core::engine::resolve_preset;
use utsushi_core::http::chat_completions_url;
use utsushi_core::{EngineContext, EngineError};
use utsushi_types::PresetKind;

use super::http_client;
use crate::{TranslateError, Translator, ensure_success};

/// Chat completion against an OpenAI-compatible endpoint, streamed over SSE.
///
/// Profile, prompt and target language are re-read on every request.
pub struct OpenAiTranslator {
    client: reqwest::Client,
    settings: Arc<Settings>,
    preset: String,
}

impl OpenAiTranslator {
    pub fn setup(ctx: &EngineContext) -> Result<Self, EngineError> {
        let (preset, profile) = ctx.resolve_preset(PresetKind::Translation)?;
        tracing::info!(
            "[TRANSLATE] Preset '{preset}' using model '{}'",
            profile.model
        );
        Ok(Self {
            client: http_client()?,
            settings: Arc::clone(&ctx.settings),
            preset,
        })
    }

    fn prompt(&self, text: &str) -> String {
        let instructions = self
            .settings
            .get_string("openai_translation_prompt")
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_TRANSLATION_PROMPT.to_string());
        let target = self
            .settings
            .get_string("translation_target_lang")
            .unwrap_or_else(|| "en".to_string());
        format!("{instructions} Translate to {target} following text: {text}")
    }

    async fn send(&self, text: &str, stream: bool) -> Result<reqwest::Response, TranslateError> {
        let (_, profile) = resolve_preset(&self.settings, PresetKind::Translation, &self.preset)?;
        let body = json!({
            "model": profile.model,
            "stream": stream,
            "messages": [{ "role": "user", "content": self.prompt(text) }]
        });

        let mut request = self
            .client
            .post(chat_completions_url(&profile.url))
            .json(&body);
        if !profile.key.is_empty() {
            request = request.bearer_auth(&profile.key);
        }
        Ok(ensure_success(request.send().await?).await?)
    }
}

#[async_trait::async_trait]
impl Translator for OpenAiTranslator {
    async fn translate(&self, text: &str) -> Result<String, TranslateError> {
        let value: Value = self.send(text, false).await?.json().await?;
        value["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or(TranslateError::EmptyResponse)
    }

    fn supports_streaming(&self) -> bool {
        true
    }

    async fn translate_stream(
        &self,
        text: &str,
        on_chunk: &(dyn Fn(String) + Send + Sync),
    ) -> Result<(), TranslateError> {
        let mut stream = self.send(text, true).await?.bytes_stream();
        let mut lines = SseLines::default();

        while let Some(bytes) = stream.next().await {
            for data in lines.push(&bytes?) {
                match data {
                    SseData::Delta(fragment) => on_chunk(fragment),
                    SseData::Done => return Ok(()),
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, PartialEq, Eq)]
enum SseData {
    Delta(String),
    Done,
}

/// Splits a byte stream into `data:` lines; partial lines wait for the next push.
#[derive(Default)]
struct SseLines {
    pending: Vec<u8>,
}

impl SseLines {
    fn push(&mut self, bytes: &[u8]) -> Vec<SseData> {
        self.pending.extend_from_slice(bytes);

        let mut out = Vec::new();
        while let Some(end) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=end).collect();
            let line = String::from_utf8_lossy(&line);
            let Some(payload) = line.trim().strip_prefix("data:") else {
                continue;
            };
            let payload = payload.trim();
            if payload == "[DONE]" {
                out.push(SseData::Done);
                break;
            }
            match serde_json::from_str::<Value>(payload) {
                Ok(value) => {
                    if let Some(content) = value["choices"][0]["delta"]["content"].as_str()
                        && !content.is_empty()
                    {
                        out.push(SseData::Delta(content.to_string()));
                    }
                }
                Err(e) => tracing::debug!("[TRANSLATE] Skipping malformed SSE payload: {e}"),
            }
        }
        out
    }
}
