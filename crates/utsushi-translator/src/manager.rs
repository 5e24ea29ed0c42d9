use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use kanal::AsyncSender;
use tokio::task::JoinHandle;
use utsushi_config::Settings;
use utsushi_core::{EngineContext, EngineOptions, Initialized};
use utsushi_types::{TranslationEvent, TranslationEventKind};

use crate::{Translator, TranslatorRegistry};

/// Tasks started by one [`TranslationManager::translate`] call.
#[derive(Debug)]
pub struct TranslationDispatch {
    pub generation: u64,
    pub engines: Vec<String>,
    pub tasks: Vec<JoinHandle<()>>,
}

impl TranslationDispatch {
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Wait until every engine has sent its terminal event.
    pub async fn join(self) {
        for task in self.tasks {
            if let Err(e) = task.await {
                tracing::error!("[TRANSLATE] Engine task failed: {e}");
            }
        }
    }
}

/// Owns the set of active translation engines and fans text out to them.
///
/// Results are delivered as [`TranslationEvent`]s on the channel given at
/// construction, each tagged with the engine name and the generation of the
/// `translate` call that produced it.
pub struct TranslationManager {
    registry: Arc<TranslatorRegistry>,
    settings: Arc<Settings>,
    active: Vec<(String, Arc<dyn Translator>)>,
    events: AsyncSender<TranslationEvent>,
    generation: AtomicU64,
}

impl TranslationManager {
    pub fn new(
        registry: Arc<TranslatorRegistry>,
        settings: Arc<Settings>,
        events: AsyncSender<TranslationEvent>,
    ) -> Self {
        Self {
            registry,
            settings,
            active: Vec::new(),
            events,
            generation: AtomicU64::new(0),
        }
    }

    /// Replace the active set. Unknown names are skipped, engines that fail
    /// to initialize are dropped. Returns the names now active.
    pub async fn set_active_engines(
        &mut self,
        names: &[String],
        options: EngineOptions,
    ) -> Vec<String> {
        if !self.active.is_empty() {
            tracing::info!("[TRANSLATE] Releasing {} engine(s)", self.active.len());
            self.active.clear();
        }

        for name in names {
            if self.active.iter().any(|(active, _)| active == name) {
                continue;
            }
            let Some(descriptor) = self.registry.lookup(name) else {
                tracing::debug!("[TRANSLATE] Skipping unknown engine '{name}'");
                continue;
            };

            let ctx = EngineContext::new(Arc::clone(&self.settings)).with_options(options.clone());
            let outcome = tokio::task::spawn_blocking(move || descriptor.construct(ctx))
                .await
                .unwrap_or_else(|e| Initialized::failed(format!("constructor panicked: {e}")));

            match outcome {
                Initialized::Ready(engine) => {
                    tracing::info!("[TRANSLATE] Engine '{name}' ready");
                    self.active.push((name.clone(), Arc::from(engine)));
                }
                Initialized::Failed { reason } => {
                    tracing::warn!("[TRANSLATE] Engine '{name}' could not be initialized: {reason}");
                }
            }
        }

        self.current_engines()
    }

    /// Translate with every active engine, or only `target` if given.
    ///
    /// A target that is not active yields an empty dispatch.
    pub fn translate(&self, text: &str, target: Option<&str>) -> TranslationDispatch {
        let selected: Vec<_> = self
            .active
            .iter()
            .filter(|(name, _)| target.is_none_or(|t| t == name.as_str()))
            .collect();

        if selected.is_empty() {
            if let Some(target) = target {
                tracing::debug!("[TRANSLATE] Engine '{target}' is not active");
            }
            return TranslationDispatch {
                generation: self.last_generation(),
                engines: Vec::new(),
                tasks: Vec::new(),
            };
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let mut engines = Vec::with_capacity(selected.len());
        let mut tasks = Vec::with_capacity(selected.len());

        for (name, engine) in selected {
            tracing::debug!("[TRANSLATE] Dispatching generation {generation} to '{name}'");
            engines.push(name.clone());
            tasks.push(tokio::spawn(run_engine(
                generation,
                name.clone(),
                Arc::clone(engine),
                text.to_string(),
                self.events.clone(),
            )));
        }

        TranslationDispatch {
            generation,
            engines,
            tasks,
        }
    }

    pub fn available_engines(&self) -> Vec<String> {
        self.registry.list_available()
    }

    /// Active engine names, in construction order.
    pub fn current_engines(&self) -> Vec<String> {
        self.active.iter().map(|(name, _)| name.clone()).collect()
    }

    /// Regenerate preset engines. The active set is left alone.
    pub fn rebuild_preset_engines(&self) -> Vec<String> {
        self.registry.rebuild_preset_engines(&self.settings)
    }

    pub fn last_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }
}

async fn run_engine(
    generation: u64,
    name: String,
    engine: Arc<dyn Translator>,
    text: String,
    events: AsyncSender<TranslationEvent>,
) {
    let event = |kind| TranslationEvent {
        generation,
        engine: name.clone(),
        kind,
    };

    let terminal = if engine.supports_streaming() {
        let on_chunk = |fragment: String| {
            if let Err(e) = events.try_send(event(TranslationEventKind::Chunk(fragment))) {
                tracing::debug!("[TRANSLATE] Dropping chunk from '{name}': {e}");
            }
        };
        match engine.translate_stream(&text, &on_chunk).await {
            Ok(()) => TranslationEventKind::Complete,
            Err(e) => TranslationEventKind::Error(e.to_string()),
        }
    } else {
        match engine.translate(&text).await {
            Ok(result) => TranslationEventKind::Ready(result),
            Err(e) => TranslationEventKind::Error(e.to_string()),
        }
    };

    if let TranslationEventKind::Error(message) = &terminal {
        tracing::error!("[TRANSLATE] '{name}' failed: {message}");
    }
    if let Err(e) = events.send(event(terminal)).await {
        tracing::debug!("[TRANSLATE] Result from '{name}' dropped: {e}");
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use kanal::AsyncReceiver;
    use serde_json::json;
    use utsushi_core::EngineError;

    use super::*;
    use crate::engines::default_registry;
    use crate::{BoxedTranslator, TranslateError};

    struct Echo(&'static str);

    #[async_trait::async_trait]
    impl Translator for Echo {
        async fn translate(&self, text: &str) -> Result<String, TranslateError> {
            Ok(format!("{}:{text}", self.0))
        }
    }

    struct Streaming;

    #[async_trait::async_trait]
    impl Translator for Streaming {
        async fn translate(&self, text: &str) -> Result<String, TranslateError> {
            Ok(text.to_string())
        }

        fn supports_streaming(&self) -> bool {
            true
        }

        async fn translate_stream(
            &self,
            _text: &str,
            on_chunk: &(dyn Fn(String) + Send + Sync),
        ) -> Result<(), TranslateError> {
            on_chunk("Hel".into());
            on_chunk("lo".into());
            Ok(())
        }
    }

    struct Failing;

    #[async_trait::async_trait]
    impl Translator for Failing {
        async fn translate(&self, _text: &str) -> Result<String, TranslateError> {
            Err(TranslateError::RateLimitExceeded)
        }
    }

    fn registry() -> Arc<TranslatorRegistry> {
        let registry = default_registry();
        registry.register("EchoA", |_| Ok(Box::new(Echo("a")) as BoxedTranslator));
        registry.register("EchoB", |_| Ok(Box::new(Echo("b")) as BoxedTranslator));
        registry.register("Streaming", |_| Ok(Box::new(Streaming) as BoxedTranslator));
        registry.register("Failing", |_| Ok(Box::new(Failing) as BoxedTranslator));
        registry.register("Broken", |_| Err(EngineError::Setup("missing key".into())));
        Arc::new(registry)
    }

    fn manager_with(
        settings: Settings,
    ) -> (TranslationManager, AsyncReceiver<TranslationEvent>) {
        let (tx, rx) = kanal::unbounded_async();
        (TranslationManager::new(registry(), Arc::new(settings), tx), rx)
    }

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    async fn recv(rx: &AsyncReceiver<TranslationEvent>) -> TranslationEvent {
        tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("timed out waiting for translation event")
            .expect("channel closed")
    }

    #[tokio::test]
    async fn broken_and_unknown_engines_are_not_active() {
        let (mut manager, _rx) = manager_with(Settings::in_memory());

        let active = manager
            .set_active_engines(&names(&["EchoA", "Broken", "Missing", "EchoB"]), EngineOptions::new())
            .await;

        assert_eq!(active, vec!["EchoA", "EchoB"]);
        assert_eq!(manager.current_engines(), active);
    }

    #[tokio::test]
    async fn one_task_per_active_engine() {
        let (mut manager, rx) = manager_with(Settings::in_memory());
        manager
            .set_active_engines(&names(&["EchoA", "EchoB"]), EngineOptions::new())
            .await;

        let dispatch = manager.translate("猫", None);
        assert_eq!(dispatch.tasks.len(), 2);
        assert_eq!(dispatch.generation, 1);
        dispatch.join().await;

        let mut results = vec![recv(&rx).await, recv(&rx).await];
        results.sort_by(|a, b| a.engine.cmp(&b.engine));
        assert_eq!(
            results[0],
            TranslationEvent {
                generation: 1,
                engine: "EchoA".into(),
                kind: TranslationEventKind::Ready("a:猫".into()),
            }
        );
        assert_eq!(results[1].kind, TranslationEventKind::Ready("b:猫".into()));
    }

    #[tokio::test]
    async fn targeted_translate_of_inactive_engine_does_nothing() {
        let (mut manager, rx) = manager_with(Settings::in_memory());
        manager
            .set_active_engines(&names(&["EchoA"]), EngineOptions::new())
            .await;

        let dispatch = manager.translate("猫", Some("EchoB"));
        assert!(dispatch.is_empty());
        assert_eq!(manager.last_generation(), 0);
        assert!(rx.is_empty());

        let dispatch = manager.translate("猫", Some("EchoA"));
        assert_eq!(dispatch.engines, vec!["EchoA"]);
        dispatch.join().await;
        assert_eq!(recv(&rx).await.kind, TranslationEventKind::Ready("a:猫".into()));
    }

    #[tokio::test]
    async fn streaming_engine_sends_chunks_then_complete() {
        let (mut manager, rx) = manager_with(Settings::in_memory());
        manager
            .set_active_engines(&names(&["Streaming"]), EngineOptions::new())
            .await;

        manager.translate("Hello", None).join().await;

        let kinds: Vec<_> = [recv(&rx).await, recv(&rx).await, recv(&rx).await]
            .into_iter()
            .map(|e| e.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                TranslationEventKind::Chunk("Hel".into()),
                TranslationEventKind::Chunk("lo".into()),
                TranslationEventKind::Complete,
            ]
        );
    }

    #[tokio::test]
    async fn failure_is_reported_for_that_engine_only() {
        let (mut manager, rx) = manager_with(Settings::in_memory());
        manager
            .set_active_engines(&names(&["Failing", "EchoA"]), EngineOptions::new())
            .await;

        manager.translate("猫", None).join().await;

        let mut results = vec![recv(&rx).await, recv(&rx).await];
        results.sort_by(|a, b| a.engine.cmp(&b.engine));
        assert_eq!(results[0].kind, TranslationEventKind::Ready("a:猫".into()));
        assert_eq!(
            results[1].kind,
            TranslationEventKind::Error("Rate limit exceeded".into())
        );
    }

    #[tokio::test]
    async fn generations_increase_per_call() {
        let (mut manager, rx) = manager_with(Settings::in_memory());
        manager
            .set_active_engines(&names(&["EchoA"]), EngineOptions::new())
            .await;

        manager.translate("one", None).join().await;
        manager.translate("two", None).join().await;

        assert_eq!(recv(&rx).await.generation, 1);
        assert_eq!(recv(&rx).await.generation, 2);
    }

    #[tokio::test]
    async fn deleting_preset_keeps_active_engine() {
        let settings = Settings::in_memory_with(json!({
            "translation_presets": { "local": { "url": "http://localhost:1234/v1" } }
        }));
        let (mut manager, _rx) = manager_with(settings);
        manager.rebuild_preset_engines();
        manager
            .set_active_engines(&names(&["OpenAI Api local"]), EngineOptions::new())
            .await;
        assert_eq!(manager.current_engines(), vec!["OpenAI Api local"]);

        manager
            .settings
            .delete_preset(utsushi_types::PresetKind::Translation, "local")
            .unwrap();
        manager.rebuild_preset_engines();

        assert!(!manager.available_engines().contains(&"OpenAI Api local".to_string()));
        assert_eq!(manager.current_engines(), vec!["OpenAI Api local"]);
    }
}
