use std::sync::Arc;

use serde_json::{Map, Value};
use utsushi_config::Settings;
use utsushi_types::{PresetKind, PresetProfile};

/// Free-form keyword configuration handed to engine constructors.
pub type EngineOptions = Map<String, Value>;

/// Construction-time failure of an engine
#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    #[error("engine setup failed: {0}")]
    Setup(String),

    #[error("preset profile '{0}' not found")]
    MissingPreset(String),

    #[error("setting '{0}' is not configured")]
    NotConfigured(String),
}

/// Everything an engine constructor may read.
#[derive(Clone)]
pub struct EngineContext {
    pub settings: Arc<Settings>,
    /// Set by the registry for preset-derived engines
    pub preset_name: Option<String>,
    pub options: EngineOptions,
}

impl EngineContext {
    pub fn new(settings: Arc<Settings>) -> Self {
        Self {
            settings,
            preset_name: None,
            options: EngineOptions::new(),
        }
    }

    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_preset(mut self, preset_name: impl Into<String>) -> Self {
        self.preset_name = Some(preset_name.into());
        self
    }

    pub fn option_str(&self, key: &str) -> Option<&str> {
        self.options.get(key).and_then(Value::as_str)
    }

    /// Name of the profile to use: the injected preset, else `default`.
    pub fn preset_or_default(&self) -> &str {
        self.preset_name.as_deref().unwrap_or("default")
    }

    /// Resolve the profile for this engine, falling back to the `default` profile.
    pub fn resolve_preset(
        &self,
        kind: PresetKind,
    ) -> Result<(String, PresetProfile), EngineError> {
        resolve_preset(&self.settings, kind, self.preset_or_default())
    }
}

/// Look up `name` under `kind`, falling back to the `default` profile.
pub fn resolve_preset(
    settings: &Settings,
    kind: PresetKind,
    name: &str,
) -> Result<(String, PresetProfile), EngineError> {
    if let Some(profile) = settings.preset(kind, name) {
        return Ok((name.to_string(), profile));
    }
    if let Some(profile) = settings.preset(kind, "default") {
        tracing::warn!("Preset '{name}' not found, using 'default'");
        return Ok(("default".to_string(), profile));
    }
    Err(EngineError::MissingPreset(name.to_string()))
}

/// Outcome of the two-phase engine construction.
///
/// A failed setup is recorded here instead of propagating, so callers decide
/// whether it is fatal (OCR) or merely drops the engine (translation).
pub enum Initialized<E> {
    Ready(E),
    Failed { reason: String },
}

impl<E> Initialized<E> {
    pub fn is_working(&self) -> bool {
        matches!(self, Initialized::Ready(_))
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Initialized::Failed {
            reason: reason.into(),
        }
    }

    pub fn into_result(self) -> Result<E, String> {
        match self {
            Initialized::Ready(engine) => Ok(engine),
            Initialized::Failed { reason } => Err(reason),
        }
    }
}

impl<E> From<Result<E, EngineError>> for Initialized<E> {
    fn from(result: Result<E, EngineError>) -> Self {
        match result {
            Ok(engine) => Initialized::Ready(engine),
            Err(e) => Initialized::failed(e.to_string()),
        }
    }
}
