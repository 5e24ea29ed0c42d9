use std::sync::Arc;

use utsushi_config::Settings;
use utsushi_core::{EngineContext, EngineDescriptor, EngineOptions, Initialized};
use utsushi_types::RawImage;

use crate::engine::{BoxedOcrEngine, OcrEngine, OcrError, OcrRegistry};

#[derive(Debug, thiserror::Error)]
pub enum OcrManagerError {
    #[error("OCR engine '{0}' not found")]
    NotFound(String),

    #[error("OCR engine '{name}' failed to initialize: {reason}")]
    Initialization { name: String, reason: String },

    #[error("no OCR engine is active")]
    NoActiveEngine,

    #[error(transparent)]
    Predict(#[from] OcrError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapOutcome {
    Unchanged,
    Swapped,
}

struct ActiveEngine {
    name: String,
    preset_name: Option<String>,
    engine: Arc<dyn OcrEngine>,
}

/// Owns at most one working OCR engine.
pub struct OcrManager {
    registry: Arc<OcrRegistry>,
    settings: Arc<Settings>,
    current: Option<ActiveEngine>,
}

impl OcrManager {
    /// Construct the manager with `name` active. Fails if the engine is not
    /// registered or does not come up working.
    pub async fn new(
        registry: Arc<OcrRegistry>,
        settings: Arc<Settings>,
        name: &str,
        options: EngineOptions,
    ) -> Result<Self, OcrManagerError> {
        let mut manager = Self {
            registry,
            settings,
            current: None,
        };
        let descriptor = manager.lookup(name)?;
        manager.activate(descriptor, options).await?;
        Ok(manager)
    }

    pub async fn predict(&self, image: &RawImage) -> Result<String, OcrManagerError> {
        let engine = self.handle().ok_or(OcrManagerError::NoActiveEngine)?;
        Ok(engine.predict(image).await?)
    }

    /// Shared handle to the active engine, for predicting without holding the manager.
    pub fn handle(&self) -> Option<Arc<dyn OcrEngine>> {
        self.current.as_ref().map(|c| Arc::clone(&c.engine))
    }

    /// Switch to `name`. A no-op when that engine (and preset) is already active.
    ///
    /// The current engine is released before the new one is built; if
    /// construction fails no engine is active afterwards.
    pub async fn swap_engine(
        &mut self,
        name: &str,
        options: EngineOptions,
    ) -> Result<SwapOutcome, OcrManagerError> {
        let descriptor = self.lookup(name)?;

        if let Some(current) = &self.current
            && current.name == descriptor.name
            && current.preset_name == descriptor.preset_name
        {
            tracing::debug!("[OCR] Engine '{name}' already active");
            return Ok(SwapOutcome::Unchanged);
        }

        if let Some(previous) = self.current.take() {
            tracing::info!("[OCR] Releasing engine '{}'", previous.name);
        }
        self.activate(descriptor, options).await?;
        Ok(SwapOutcome::Swapped)
    }

    pub fn current_engine(&self) -> Option<&str> {
        self.current.as_ref().map(|c| c.name.as_str())
    }

    pub fn available_engines(&self) -> Vec<String> {
        self.registry.list_available()
    }

    pub fn rebuild_preset_engines(&self) -> Vec<String> {
        self.registry.rebuild_preset_engines(&self.settings)
    }

    fn lookup(&self, name: &str) -> Result<EngineDescriptor<BoxedOcrEngine>, OcrManagerError> {
        self.registry
            .lookup(name)
            .ok_or_else(|| OcrManagerError::NotFound(name.to_string()))
    }

    async fn activate(
        &mut self,
        descriptor: EngineDescriptor<BoxedOcrEngine>,
        options: EngineOptions,
    ) -> Result<(), OcrManagerError> {
        let name = descriptor.name.clone();
        let preset_name = descriptor.preset_name.clone();
        let ctx = EngineContext::new(Arc::clone(&self.settings)).with_options(options);

        let outcome = tokio::task::spawn_blocking(move || descriptor.construct(ctx))
            .await
            .unwrap_or_else(|e| Initialized::failed(format!("constructor panicked: {e}")));

        match outcome {
            Initialized::Ready(engine) => {
                tracing::info!("[OCR] Engine '{name}' ready");
                self.current = Some(ActiveEngine {
                    name,
                    preset_name,
                    engine: Arc::from(engine),
                });
                Ok(())
            }
            Initialized::Failed { reason } => {
                tracing::error!("[OCR] Engine '{name}' failed to initialize: {reason}");
                Err(OcrManagerError::Initialization { name, reason })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;
    use utsushi_core::EngineError;

    use super::*;
    use crate::engines::{DummyOcr, default_registry};

    struct EchoOcr(&'static str);

    #[async_trait::async_trait]
    impl OcrEngine for EchoOcr {
        async fn predict(&self, _image: &RawImage) -> Result<String, OcrError> {
            Ok(self.0.to_string())
        }
    }

    fn settings() -> Arc<Settings> {
        Arc::new(Settings::in_memory())
    }

    fn counting_registry(counter: Arc<AtomicUsize>) -> Arc<OcrRegistry> {
        let registry = default_registry();
        registry.register("Counted", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(EchoOcr("counted")) as BoxedOcrEngine)
        });
        registry.register("Broken", |_| Err(EngineError::Setup("no model".into())));
        Arc::new(registry)
    }

    #[tokio::test]
    async fn dummy_engine_predicts_fixed_text() {
        let manager = OcrManager::new(
            Arc::new(default_registry()),
            settings(),
            "Dummy",
            EngineOptions::new(),
        )
        .await
        .unwrap();

        assert_eq!(manager.current_engine(), Some("Dummy"));
        let text = manager.predict(&RawImage::blank(8, 8)).await.unwrap();
        assert_eq!(text, "Dummy OCR'd Text");
    }

    #[tokio::test]
    async fn unknown_engine_is_lookup_error() {
        let result = OcrManager::new(
            Arc::new(default_registry()),
            settings(),
            "MangaOCR",
            EngineOptions::new(),
        )
        .await;
        assert!(matches!(result, Err(OcrManagerError::NotFound(name)) if name == "MangaOCR"));
    }

    #[tokio::test]
    async fn non_working_engine_is_initialization_error() {
        let registry = counting_registry(Arc::new(AtomicUsize::new(0)));
        let result = OcrManager::new(registry, settings(), "Broken", EngineOptions::new()).await;
        assert!(matches!(result, Err(OcrManagerError::Initialization { .. })));
    }

    #[tokio::test]
    async fn swap_to_same_engine_constructs_once() {
        let counter = Arc::new(AtomicUsize::new(0));
        let registry = counting_registry(Arc::clone(&counter));
        let mut manager = OcrManager::new(registry, settings(), "Dummy", EngineOptions::new())
            .await
            .unwrap();

        let first = manager.swap_engine("Counted", EngineOptions::new()).await.unwrap();
        let second = manager.swap_engine("Counted", EngineOptions::new()).await.unwrap();

        assert_eq!(first, SwapOutcome::Swapped);
        assert_eq!(second, SwapOutcome::Unchanged);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(manager.current_engine(), Some("Counted"));
    }

    #[tokio::test]
    async fn failed_swap_leaves_no_active_engine() {
        let registry = counting_registry(Arc::new(AtomicUsize::new(0)));
        let mut manager = OcrManager::new(registry, settings(), "Dummy", EngineOptions::new())
            .await
            .unwrap();

        let result = manager.swap_engine("Broken", EngineOptions::new()).await;

        assert!(matches!(result, Err(OcrManagerError::Initialization { .. })));
        assert_eq!(manager.current_engine(), None);
        assert!(matches!(
            manager.predict(&RawImage::blank(1, 1)).await,
            Err(OcrManagerError::NoActiveEngine)
        ));
    }

    #[tokio::test]
    async fn swap_to_unknown_engine_keeps_current() {
        let mut manager = OcrManager::new(
            Arc::new(default_registry()),
            settings(),
            "Dummy",
            EngineOptions::new(),
        )
        .await
        .unwrap();

        let result = manager.swap_engine("Nope", EngineOptions::new()).await;

        assert!(matches!(result, Err(OcrManagerError::NotFound(_))));
        assert_eq!(manager.current_engine(), Some("Dummy"));
    }

    #[tokio::test]
    async fn preset_engines_follow_settings() {
        let settings = Arc::new(Settings::in_memory_with(json!({
            "ocr_presets": { "vision": { "url": "http://localhost:1/v1" } }
        })));
        let registry = Arc::new(default_registry());
        registry.register("Plain", |_| Ok(Box::new(DummyOcr) as BoxedOcrEngine));
        let manager = OcrManager::new(registry, Arc::clone(&settings), "Dummy", EngineOptions::new())
            .await
            .unwrap();

        assert_eq!(manager.rebuild_preset_engines(), vec!["OpenAI Api vision"]);
        assert_eq!(
            manager.available_engines(),
            vec!["Dummy", "Plain", "OpenAI Api vision"]
        );
    }
}
