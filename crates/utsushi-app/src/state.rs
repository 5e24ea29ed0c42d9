use std::sync::Arc;

use anyhow::Context;
use kanal::AsyncSender;
use tokio::sync::RwLock;
use utsushi_config::Settings;
use utsushi_core::EngineOptions;
use utsushi_ocr::{HotkeyMap, OcrManager, OcrRegistry, Overlay, RegionSelector, ScreenGrabber};
use utsushi_translator::{TranslationManager, TranslatorRegistry};
use utsushi_types::TranslationEvent;

/// Everything the event handlers share.
pub struct AppState {
    pub settings: Arc<Settings>,
    pub ocr: RwLock<OcrManager>,
    pub translation: RwLock<TranslationManager>,
    pub selector: Arc<RegionSelector>,
    pub hotkeys: RwLock<HotkeyMap>,
    /// Text of the last successful OCR, used by an empty retranslate
    pub last_ocr_text: RwLock<String>,
}

impl AppState {
    /// Build the managers from `settings` with the built-in engine registries.
    pub async fn init(
        settings: Arc<Settings>,
        overlay: Arc<dyn Overlay>,
        grabber: Arc<dyn ScreenGrabber>,
        translation_events: AsyncSender<TranslationEvent>,
    ) -> anyhow::Result<Self> {
        Self::with_registries(
            settings,
            Arc::new(utsushi_ocr::default_registry()),
            Arc::new(utsushi_translator::default_registry()),
            overlay,
            grabber,
            translation_events,
        )
        .await
    }

    pub async fn with_registries(
        settings: Arc<Settings>,
        ocr_registry: Arc<OcrRegistry>,
        translator_registry: Arc<TranslatorRegistry>,
        overlay: Arc<dyn Overlay>,
        grabber: Arc<dyn ScreenGrabber>,
        translation_events: AsyncSender<TranslationEvent>,
    ) -> anyhow::Result<Self> {
        ocr_registry.rebuild_preset_engines(&settings);
        translator_registry.rebuild_preset_engines(&settings);

        let ocr_engine = settings.ocr_engine();
        let ocr = OcrManager::new(
            ocr_registry,
            Arc::clone(&settings),
            &ocr_engine,
            EngineOptions::new(),
        )
        .await
        .with_context(|| format!("failed to start OCR engine '{ocr_engine}'"))?;
        tracing::info!("[STATE] OCR engine '{ocr_engine}' ready");

        let mut translation = TranslationManager::new(
            translator_registry,
            Arc::clone(&settings),
            translation_events,
        );
        let wanted = settings.translation_engines();
        let active = translation
            .set_active_engines(&wanted, EngineOptions::new())
            .await;
        if active.len() < wanted.len() {
            tracing::warn!("[STATE] Translation engines {wanted:?} requested, {active:?} active");
        } else {
            tracing::info!("[STATE] Translation engines {active:?} active");
        }

        let hotkeys = HotkeyMap::from_settings(&settings);

        Ok(Self {
            settings,
            ocr: RwLock::new(ocr),
            translation: RwLock::new(translation),
            selector: Arc::new(RegionSelector::new(overlay, grabber)),
            hotkeys: RwLock::new(hotkeys),
            last_ocr_text: RwLock::new(String::new()),
        })
    }
}
