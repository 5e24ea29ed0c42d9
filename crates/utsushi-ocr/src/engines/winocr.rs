use serde_json::Value;
use utsushi_config::Settings;

#[cfg(all(windows, feature = "windows-ocr"))]
pub use self::recognizer::WindowsOcr;

pub const NAME: &str = "WindowsOCR";
const FALLBACK_LANGUAGE: &str = "en";

/// Recognizer language tag: the engine's `language` option, else `source_lang`.
pub fn recognizer_language(settings: &Settings, option: Option<&str>) -> String {
    option
        .map(str::to_string)
        .or_else(|| settings.get_string("source_lang"))
        .map(|tag| tag.trim().to_string())
        .filter(|tag| !tag.is_empty())
        .unwrap_or_else(|| FALLBACK_LANGUAGE.to_string())
}

/// The `language` engine option, if set.
pub fn language_option(options: &serde_json::Map<String, Value>) -> Option<&str> {
    options.get("language").and_then(Value::as_str)
}

#[cfg(all(windows, feature = "windows-ocr"))]
mod recognizer {
    use std::sync::Arc;

    use utsushi_config::Settings;
    use utsushi_core::{EngineContext, EngineError};
    use utsushi_types::RawImage;
    use windows::Globalization::Language;
    use windows::Graphics::Imaging::BitmapDecoder;
    use windows::Media::Ocr::OcrEngine as WinOcrEngine;
    use windows::Storage::Streams::{DataWriter, InMemoryRandomAccessStream};
    use windows::Win32::System::Com::{COINIT_MULTITHREADED, CoInitializeEx, CoUninitialize};
    use windows::core::HSTRING;

    use super::{language_option, recognizer_language};
    use crate::engine::{OcrEngine, OcrError, encode_png, ensure_image};

    /// COM stays initialized on this thread until the guard drops.
    struct ComGuard;

    impl ComGuard {
        fn initialize() -> windows::core::Result<Self> {
            unsafe { CoInitializeEx(Some(std::ptr::null()), COINIT_MULTITHREADED).ok()? };
            Ok(Self)
        }
    }

    impl Drop for ComGuard {
        fn drop(&mut self) {
            unsafe { CoUninitialize() };
        }
    }

    fn create_engine(language: &str) -> windows::core::Result<WinOcrEngine> {
        let language = Language::CreateLanguage(&HSTRING::from(language))?;
        WinOcrEngine::TryCreateFromLanguage(&language)
    }

    fn recognize(language: &str, png: &[u8]) -> windows::core::Result<String> {
        let _com = ComGuard::initialize()?;
        let engine = create_engine(language)?;

        let stream = InMemoryRandomAccessStream::new()?;
        let writer = DataWriter::CreateDataWriter(&stream)?;
        writer.WriteBytes(png)?;
        writer.StoreAsync()?.get()?;
        writer.FlushAsync()?.get()?;
        stream.Seek(0)?;

        let decoder = BitmapDecoder::CreateAsync(&stream)?.get()?;
        let bitmap = decoder.GetSoftwareBitmapAsync()?.get()?;
        let result = engine.RecognizeAsync(&bitmap)?.get()?;

        let lines = result.Lines()?;
        let mut texts = Vec::with_capacity(lines.Size()? as usize);
        for i in 0..lines.Size()? {
            texts.push(lines.GetAt(i)?.Text()?.to_string());
        }
        Ok(texts.join("\n"))
    }

    /// Built-in Windows.Media.Ocr recognizer.
    ///
    /// The language is re-read on every prediction, so changing `source_lang`
    /// applies without swapping engines.
    pub struct WindowsOcr {
        settings: Arc<Settings>,
        language: Option<String>,
    }

    impl WindowsOcr {
        pub fn setup(ctx: &EngineContext) -> Result<Self, EngineError> {
            let engine = Self {
                settings: Arc::clone(&ctx.settings),
                language: language_option(&ctx.options).map(str::to_string),
            };
            let language = engine.language();
            let _com = ComGuard::initialize().map_err(|e| EngineError::Setup(e.to_string()))?;
            create_engine(&language).map_err(|e| {
                EngineError::Setup(format!("no Windows OCR recognizer for '{language}': {e}"))
            })?;

            tracing::info!("[OCR] Windows OCR ready for '{language}'");
            Ok(engine)
        }

        fn language(&self) -> String {
            recognizer_language(&self.settings, self.language.as_deref())
        }
    }

    #[async_trait::async_trait]
    impl OcrEngine for WindowsOcr {
        async fn predict(&self, image: &RawImage) -> Result<String, OcrError> {
            ensure_image(image)?;
            let png = encode_png(image)?;
            let language = self.language();

            tokio::task::spawn_blocking(move || recognize(&language, &png))
                .await
                .map_err(|e| OcrError::Recognition(e.to_string()))?
                .map_err(|e| OcrError::Recognition(e.to_string()))
        }
    }
}
