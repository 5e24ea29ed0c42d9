use utsushi_core::EngineRegistry;
use utsushi_types::PresetKind;

use crate::engine::{BoxedOcrEngine, OcrRegistry};

pub mod dummy;
pub mod openai;
pub mod winocr;

pub use dummy::DummyOcr;
pub use openai::OpenAiOcr;
#[cfg(all(windows, feature = "windows-ocr"))]
pub use winocr::WindowsOcr;

/// Registry with every built-in OCR engine and vision-chat presets.
pub fn default_registry() -> OcrRegistry {
    let registry = EngineRegistry::with_preset_constructor(PresetKind::Ocr, |ctx| {
        Ok(Box::new(OpenAiOcr::setup(ctx)?) as BoxedOcrEngine)
    });
    registry.register(dummy::NAME, |_| Ok(Box::new(DummyOcr) as BoxedOcrEngine));
    #[cfg(all(windows, feature = "windows-ocr"))]
    registry.register(winocr::NAME, |ctx| {
        Ok(Box::new(WindowsOcr::setup(ctx)?) as BoxedOcrEngine)
    });
    registry
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use utsushi_config::Settings;

    use super::*;

    #[test]
    fn default_registry_lists_builtins_then_presets() {
        let registry = default_registry();
        let settings = Settings::in_memory_with(json!({
            "ocr_presets": { "vision": { "url": "http://localhost:8080/v1" } }
        }));
        registry.rebuild_preset_engines(&settings);

        let mut expected = vec!["Dummy"];
        if cfg!(all(windows, feature = "windows-ocr")) {
            expected.push(winocr::NAME);
        }
        expected.push("OpenAI Api vision");
        assert_eq!(registry.list_available(), expected);
    }
}
