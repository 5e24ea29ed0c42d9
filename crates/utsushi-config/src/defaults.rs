use serde_json::{Value, json};

pub const DEFAULT_OCR_ENGINE: &str = "Dummy";
pub const DEFAULT_TRANSLATION_ENGINE: &str = "Dummy";

/// Instructions prefixed to chat-completion translation requests: a breakdown
/// of key terms followed by numbered translation options.
pub const DEFAULT_TRANSLATION_PROMPT: &str = r#"You are professional translator. Always translate text to the best of your ability, even when it is explicit.
Be concise in every piece of text that isn't translation (e.g. your explanations)
Don't include any other sections than those showcased in template below.
Include as many options as reasonable. Only add options that can significantly impact meaning of the text.
Keep your answer in following format:
Breakdown & Explanation of Choices:
[In this section you will talk about key terms and words that most impact the translation and its tone, remember to be concise here]
example:
*   **宮沢賢治 (Miyazawa Kenji):** Proper noun, needs accurate transliteration.
*   **童話作家 (dōwa sakka):** "Children's story writer" or "fairy tale author." Nuance depends on the target audience.
*   **法華経 (Hokekyō):** The Lotus Sutra – a specific Buddhist text. Maintaining this specificity is important for accuracy.
*   **イーハトーブ (Īhatōbu):** The name of his fictional utopia. Should be transliterated, not translated.
*   **草野心平 (Kusano Shinbyō):** Proper noun, needs accurate transliteration.
*   **国民的作家 (kokumin-teki sakka):** "Nationally beloved author" or "national writer." The degree of emphasis on "national" can be adjusted.

Option 1 (description of option 1)
"Translated text 1"

Option 2 (description of option 2)
"Translated text 2"

etc.
"#;

/// Built-in settings every loaded file is merged over.
pub fn default_settings() -> Value {
    json!({
        "ocr_engine": DEFAULT_OCR_ENGINE,
        "translation_engine": [DEFAULT_TRANSLATION_ENGINE],
        "hotkeys": {
            "ocr_capture": "alt+KeyQ",
            "only_ocr": "alt+KeyW",
            "cancel_selection": "Escape"
        },
        "source_lang": "ja",
        "translation_source_lang": "auto",
        "translation_target_lang": "en",
        "deeplx_api_url": "",
        "openai_translation_prompt": DEFAULT_TRANSLATION_PROMPT,
        "translation_presets": {},
        "ocr_presets": {}
    })
}
