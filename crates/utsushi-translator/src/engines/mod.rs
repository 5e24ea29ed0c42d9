use utsushi_core::EngineRegistry;
use utsushi_types::PresetKind;

use crate::{BoxedTranslator, TranslatorRegistry};

pub mod deeplx;
pub mod dummy;
pub mod google;
pub mod openai;

pub use deeplx::DeepLx;
pub use dummy::DummyTranslator;
pub use google::GoogleTranslate;
pub use openai::OpenAiTranslator;

/// Registry with every built-in translation engine and chat-completion presets.
pub fn default_registry() -> TranslatorRegistry {
    let registry = EngineRegistry::with_preset_constructor(PresetKind::Translation, |ctx| {
        Ok(Box::new(OpenAiTranslator::setup(ctx)?) as BoxedTranslator)
    });
    registry.register(dummy::NAME, |_| Ok(Box::new(DummyTranslator) as BoxedTranslator));
    registry.register(google::NAME, |ctx| {
        Ok(Box::new(GoogleTranslate::setup(ctx)?) as BoxedTranslator)
    });
    registry.register(deeplx::NAME, |ctx| {
        Ok(Box::new(DeepLx::setup(ctx)?) as BoxedTranslator)
    });
    registry
}

pub(crate) fn http_client() -> Result<reqwest::Client, utsushi_core::EngineError> {
    utsushi_core::http::client(std::time::Duration::from_secs(60))
}
