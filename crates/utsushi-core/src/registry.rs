use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use utsushi_config::Settings;
use utsushi_types::PresetKind;

use crate::engine::{EngineContext, EngineError, Initialized};

/// Display-name prefix of engines generated from preset profiles.
pub const PRESET_ENGINE_PREFIX: &str = "OpenAI Api ";

pub fn preset_engine_name(preset: &str) -> String {
    format!("{PRESET_ENGINE_PREFIX}{preset}")
}

pub fn is_preset_engine_name(name: &str) -> bool {
    name.starts_with(PRESET_ENGINE_PREFIX)
}

pub type Constructor<E> = Arc<dyn Fn(&EngineContext) -> Result<E, EngineError> + Send + Sync>;

pub struct EngineDescriptor<E> {
    pub name: String,
    pub constructor: Constructor<E>,
    pub preset_name: Option<String>,
}

impl<E> Clone for EngineDescriptor<E> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            constructor: Arc::clone(&self.constructor),
            preset_name: self.preset_name.clone(),
        }
    }
}

impl<E> fmt::Debug for EngineDescriptor<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineDescriptor")
            .field("name", &self.name)
            .field("preset_name", &self.preset_name)
            .finish_non_exhaustive()
    }
}

impl<E> EngineDescriptor<E> {
    pub fn is_preset(&self) -> bool {
        self.preset_name.is_some()
    }

    /// Run the constructor. Preset-derived engines get their preset name injected.
    pub fn construct(&self, mut ctx: EngineContext) -> Initialized<E> {
        if let Some(preset) = &self.preset_name {
            ctx.preset_name = Some(preset.clone());
        }
        (self.constructor)(&ctx).into()
    }
}

/// Named engine constructors of one kind, in registration order.
///
/// Built-in engines are registered once at startup. Preset-derived engines
/// are regenerated from settings by [`EngineRegistry::rebuild_preset_engines`].
pub struct EngineRegistry<E> {
    kind: PresetKind,
    entries: RwLock<Vec<EngineDescriptor<E>>>,
    preset_constructor: Option<Constructor<E>>,
}

impl<E> EngineRegistry<E> {
    pub fn new(kind: PresetKind) -> Self {
        Self {
            kind,
            entries: RwLock::new(Vec::new()),
            preset_constructor: None,
        }
    }

    /// Registry whose presets are all built by `constructor`.
    pub fn with_preset_constructor<F>(kind: PresetKind, constructor: F) -> Self
    where
        F: Fn(&EngineContext) -> Result<E, EngineError> + Send + Sync + 'static,
    {
        Self {
            preset_constructor: Some(Arc::new(constructor)),
            ..Self::new(kind)
        }
    }

    pub fn kind(&self) -> PresetKind {
        self.kind
    }

    /// Register a built-in engine. Re-registering a name replaces it in place.
    pub fn register<F>(&self, name: impl Into<String>, constructor: F)
    where
        F: Fn(&EngineContext) -> Result<E, EngineError> + Send + Sync + 'static,
    {
        self.insert(EngineDescriptor {
            name: name.into(),
            constructor: Arc::new(constructor),
            preset_name: None,
        });
    }

    pub fn register_preset(
        &self,
        name: impl Into<String>,
        constructor: Constructor<E>,
        preset_name: impl Into<String>,
    ) {
        self.insert(EngineDescriptor {
            name: name.into(),
            constructor,
            preset_name: Some(preset_name.into()),
        });
    }

    fn insert(&self, descriptor: EngineDescriptor<E>) {
        let mut entries = self.entries.write();
        upsert(&mut entries, descriptor);
    }

    pub fn unregister(&self, name: &str) -> bool {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|d| d.name != name);
        entries.len() != before
    }

    pub fn list_available(&self) -> Vec<String> {
        self.entries.read().iter().map(|d| d.name.clone()).collect()
    }

    pub fn lookup(&self, name: &str) -> Option<EngineDescriptor<E>> {
        self.entries.read().iter().find(|d| d.name == name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.read().iter().any(|d| d.name == name)
    }

    /// Drop every preset-derived engine and register one per profile currently
    /// in settings, in configuration order. Built-ins are untouched.
    ///
    /// Readers never observe a half-rebuilt list. Returns the new preset engine names.
    pub fn rebuild_preset_engines(&self, settings: &Settings) -> Vec<String> {
        let presets = settings.preset_names(self.kind);

        let mut entries = self.entries.write();
        entries.retain(|d| !is_preset_engine_name(&d.name));

        let Some(constructor) = &self.preset_constructor else {
            if !presets.is_empty() {
                tracing::warn!(
                    "{} {:?} presets configured but no preset engine is available",
                    presets.len(),
                    self.kind
                );
            }
            return Vec::new();
        };

        let mut names = Vec::with_capacity(presets.len());
        for preset in presets {
            let name = preset_engine_name(&preset);
            upsert(
                &mut entries,
                EngineDescriptor {
                    name: name.clone(),
                    constructor: Arc::clone(constructor),
                    preset_name: Some(preset),
                },
            );
            names.push(name);
        }

        tracing::debug!("Rebuilt {:?} preset engines: {names:?}", self.kind);
        names
    }
}

fn upsert<E>(entries: &mut Vec<EngineDescriptor<E>>, descriptor: EngineDescriptor<E>) {
    match entries.iter_mut().find(|d| d.name == descriptor.name) {
        Some(existing) => *existing = descriptor,
        None => entries.push(descriptor),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn ctx(settings: Settings) -> EngineContext {
        EngineContext::new(Arc::new(settings))
    }

    fn registry() -> EngineRegistry<String> {
        let registry = EngineRegistry::with_preset_constructor(PresetKind::Translation, |ctx| {
            Ok(format!("preset:{}", ctx.preset_or_default()))
        });
        registry.register("Dummy", |_| Ok("dummy".to_string()));
        registry.register("DeepLX", |_| Ok("deeplx".to_string()));
        registry
    }

    #[test]
    fn register_same_name_replaces_in_place() {
        let registry = registry();
        registry.register("Dummy", |_| Ok("second".to_string()));

        assert_eq!(registry.list_available(), vec!["Dummy", "DeepLX"]);
        let engine = registry
            .lookup("Dummy")
            .unwrap()
            .construct(ctx(Settings::in_memory()))
            .into_result()
            .unwrap();
        assert_eq!(engine, "second");
    }

    #[test]
    fn rebuild_tracks_presets_in_settings() {
        let registry = registry();
        let settings = Settings::in_memory_with(json!({
            "translation_presets": { "local": {}, "remote": {} }
        }));

        let names = registry.rebuild_preset_engines(&settings);
        assert_eq!(names, vec!["OpenAI Api local", "OpenAI Api remote"]);
        assert_eq!(
            registry.list_available(),
            vec!["Dummy", "DeepLX", "OpenAI Api local", "OpenAI Api remote"]
        );

        settings.delete_preset(PresetKind::Translation, "local").unwrap();
        registry.rebuild_preset_engines(&settings);
        assert_eq!(
            registry.list_available(),
            vec!["Dummy", "DeepLX", "OpenAI Api remote"]
        );
        assert!(!registry.contains("OpenAI Api local"));
    }

    #[test]
    fn rebuild_ignores_presets_of_other_kind() {
        let registry = registry();
        let settings = Settings::in_memory_with(json!({ "ocr_presets": { "vision": {} } }));

        assert!(registry.rebuild_preset_engines(&settings).is_empty());
        assert_eq!(registry.list_available(), vec!["Dummy", "DeepLX"]);
    }

    #[test]
    fn preset_descriptor_injects_preset_name() {
        let registry = registry();
        let settings = Settings::in_memory_with(json!({
            "translation_presets": { "gpt-4.1": {} }
        }));
        registry.rebuild_preset_engines(&settings);

        let descriptor = registry.lookup("OpenAI Api gpt-4.1").unwrap();
        assert!(descriptor.is_preset());
        let engine = descriptor.construct(ctx(settings)).into_result().unwrap();
        assert_eq!(engine, "preset:gpt-4.1");
    }

    #[test]
    fn rebuild_without_preset_constructor_only_removes() {
        let registry: EngineRegistry<String> = EngineRegistry::new(PresetKind::Ocr);
        registry.register("Dummy", |_| Ok(String::new()));
        registry.register_preset(
            preset_engine_name("old"),
            Arc::new(|_: &EngineContext| -> Result<String, EngineError> {
                Ok(String::new())
            }),
            "old",
        );
        let settings = Settings::in_memory_with(json!({ "ocr_presets": { "new": {} } }));

        assert!(registry.rebuild_preset_engines(&settings).is_empty());
        assert_eq!(registry.list_available(), vec!["Dummy"]);
    }

    #[test]
    fn failing_constructor_yields_failed_state() {
        let registry: EngineRegistry<String> = EngineRegistry::new(PresetKind::Ocr);
        registry.register("Broken", |_| Err(EngineError::Setup("no device".into())));

        let outcome = registry
            .lookup("Broken")
            .unwrap()
            .construct(ctx(Settings::in_memory()));
        assert!(!outcome.is_working());
    }
}
