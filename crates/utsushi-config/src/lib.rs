use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

pub mod defaults;
pub mod paths;
pub mod presets;

pub use defaults::default_settings;
pub use paths::default_config_path;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read settings from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("settings in {0} are not a JSON object")]
    NotAMapping(PathBuf),

    #[error("failed to write settings to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("settings key is empty")]
    EmptyKey,
}

/// Key-path settings store over a JSON mapping, merged over built-in defaults.
///
/// Keys are dotted paths (`translation_presets.local.url`). Every `set` is
/// persisted immediately when the store is backed by a file.
pub struct Settings {
    path: Option<PathBuf>,
    defaults: Value,
    values: RwLock<Value>,
}

impl Settings {
    /// Load settings from `path`, creating the file with defaults if missing.
    ///
    /// A file that cannot be read or parsed is logged and replaced by defaults
    /// in memory; it is only overwritten by the next `set`.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let defaults = default_settings();

        if !path.exists() {
            tracing::info!("Creating settings file at {}", path.display());
            let settings = Self::from_parts(Some(path), defaults.clone(), defaults);
            settings.save()?;
            return Ok(settings);
        }

        match read_settings(&path) {
            Ok(loaded) => {
                let mut merged = defaults.clone();
                merge(&mut merged, loaded);
                let settings = Self::from_parts(Some(path), defaults, merged);
                settings.save()?;
                Ok(settings)
            }
            Err(e) => {
                tracing::error!("Error loading settings: {e}. Using defaults.");
                Ok(Self::from_parts(Some(path), defaults.clone(), defaults))
            }
        }
    }

    /// Defaults only, never written to disk.
    pub fn in_memory() -> Self {
        let defaults = default_settings();
        Self::from_parts(None, defaults.clone(), defaults)
    }

    /// `overrides` merged over the defaults, never written to disk.
    pub fn in_memory_with(overrides: Value) -> Self {
        let defaults = default_settings();
        let mut merged = defaults.clone();
        merge(&mut merged, overrides);
        Self::from_parts(None, defaults, merged)
    }

    fn from_parts(path: Option<PathBuf>, defaults: Value, values: Value) -> Self {
        Self {
            path,
            defaults,
            values: RwLock::new(values),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Value at `key`, falling back to the built-in default for that key.
    pub fn get(&self, key: &str) -> Option<Value> {
        let values = self.values.read();
        lookup(&values, key)
            .or_else(|| lookup(&self.defaults, key))
            .cloned()
    }

    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get(key)?;
        match serde_json::from_value(value) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!("Setting '{key}' has an unexpected shape: {e}");
                None
            }
        }
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Set `key`, creating missing parents, and persist.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> Result<(), ConfigError> {
        let mut parts: Vec<&str> = key.split('.').collect();
        let last = parts
            .pop()
            .filter(|k| !k.is_empty())
            .ok_or(ConfigError::EmptyKey)?;

        {
            let mut values = self.values.write();
            let mut node: &mut Value = &mut values;
            for part in parts {
                node = ensure_object(node)
                    .entry(part.to_string())
                    .or_insert_with(|| Value::Object(Map::new()));
            }
            ensure_object(node).insert(last.to_string(), value.into());
        }

        self.save()
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let contents = serde_json::to_string_pretty(&*self.values.read())?;
        write_atomically(path, &contents)
    }

    /// Copy of the whole current mapping.
    pub fn snapshot(&self) -> Value {
        self.values.read().clone()
    }

    pub fn ocr_engine(&self) -> String {
        self.get_string("ocr_engine")
            .unwrap_or_else(|| defaults::DEFAULT_OCR_ENGINE.to_string())
    }

    /// Selected translation engines. A plain string is read as a one-element list.
    pub fn translation_engines(&self) -> Vec<String> {
        match self.get("translation_engine") {
            Some(Value::String(name)) if !name.is_empty() => vec![name],
            Some(Value::Array(items)) => items
                .into_iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            _ => vec![defaults::DEFAULT_TRANSLATION_ENGINE.to_string()],
        }
    }

    /// Action name → key combo, in configuration order.
    pub fn hotkeys(&self) -> Vec<(String, String)> {
        match self.get("hotkeys") {
            Some(Value::Object(map)) => map
                .into_iter()
                .filter_map(|(action, combo)| combo.as_str().map(|c| (action, c.to_string())))
                .collect(),
            _ => Vec::new(),
        }
    }
}

fn lookup<'a>(root: &'a Value, key: &str) -> Option<&'a Value> {
    key.split('.').try_fold(root, |node, part| node.get(part))
}

fn ensure_object(value: &mut Value) -> &mut Map<String, Value> {
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    match value {
        Value::Object(map) => map,
        _ => unreachable!("value was just replaced by an object"),
    }
}

/// Recursively merge `update` into `base`; nested objects merge, everything else replaces.
fn merge(base: &mut Value, update: Value) {
    match (base, update) {
        (Value::Object(base), Value::Object(update)) => {
            for (key, value) in update {
                match base.get_mut(&key) {
                    Some(existing) if existing.is_object() && value.is_object() => {
                        merge(existing, value)
                    }
                    _ => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, update) => *base = update,
    }
}

fn read_settings(path: &Path) -> Result<Value, ConfigError> {
    let data = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let value: Value = serde_json::from_str(&data).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    if !value.is_object() {
        return Err(ConfigError::NotAMapping(path.to_path_buf()));
    }
    Ok(value)
}

fn write_atomically(path: &Path, contents: &str) -> Result<(), ConfigError> {
    let write_err = |source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(write_err)?;
    }

    let temp_path = path.with_extension("json.tmp");
    fs::write(&temp_path, contents).map_err(write_err)?;
    fs::rename(&temp_path, path).map_err(write_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn load_creates_default_file_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = dir.path().join("nested").join("cfg.json");

        let settings = Settings::load(&cfg).unwrap();

        assert!(cfg.exists());
        assert_eq!(settings.get_string("source_lang").as_deref(), Some("ja"));
    }

    #[test]
    fn load_merges_file_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = dir.path().join("cfg.json");
        fs::write(&cfg, r#"{"source_lang": "pl", "hotkeys": {"ocr_capture": "ctrl+KeyE"}}"#)
            .unwrap();

        let settings = Settings::load(&cfg).unwrap();

        assert_eq!(settings.get_string("source_lang").as_deref(), Some("pl"));
        assert_eq!(settings.get_string("translation_target_lang").as_deref(), Some("en"));
        assert_eq!(settings.get_string("hotkeys.ocr_capture").as_deref(), Some("ctrl+KeyE"));
        assert_eq!(settings.get_string("hotkeys.cancel_selection").as_deref(), Some("Escape"));
    }

    #[test]
    fn load_with_corrupt_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = dir.path().join("cfg.json");
        fs::write(&cfg, "{ not json").unwrap();

        let settings = Settings::load(&cfg).unwrap();

        assert_eq!(settings.ocr_engine(), "Dummy");
    }

    #[test]
    fn set_edits_setting() {
        let settings = Settings::in_memory();
        settings.set("translation_target_lang", "pl").unwrap();
        assert_eq!(settings.get_string("translation_target_lang").as_deref(), Some("pl"));
    }

    #[test]
    fn set_nested_creates_parents() {
        let settings = Settings::in_memory();
        let url = "http://localhost:1234/v1";
        settings.set("translation_presets.myPreset.url", url).unwrap();
        assert_eq!(
            settings.get_string("translation_presets.myPreset.url").as_deref(),
            Some(url)
        );
    }

    #[test]
    fn set_replaces_non_object_parent() {
        let settings = Settings::in_memory();
        settings.set("source_lang.code", "ja").unwrap();
        assert_eq!(settings.get_string("source_lang.code").as_deref(), Some("ja"));
    }

    #[test]
    fn set_rejects_empty_key() {
        let settings = Settings::in_memory();
        assert!(matches!(settings.set("", "x"), Err(ConfigError::EmptyKey)));
        assert!(matches!(settings.set("hotkeys.", "x"), Err(ConfigError::EmptyKey)));
    }

    #[test]
    fn set_persists_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = dir.path().join("cfg.json");
        let settings = Settings::load(&cfg).unwrap();

        settings.set("translation_target_lang", "pl").unwrap();

        let saved: Value = serde_json::from_str(&fs::read_to_string(&cfg).unwrap()).unwrap();
        assert_eq!(saved["translation_target_lang"], "pl");
        assert!(!cfg.with_extension("json.tmp").exists());
    }

    #[test]
    fn get_missing_key_falls_back_to_default_then_none() {
        let settings = Settings::in_memory_with(json!({ "hotkeys": "broken" }));
        assert_eq!(settings.get_string("hotkeys.ocr_capture").as_deref(), Some("alt+KeyQ"));
        assert_eq!(settings.get("translation_presets.nope.url"), None);
    }

    #[test]
    fn translation_engines_accepts_plain_string() {
        let settings = Settings::in_memory_with(json!({ "translation_engine": "DeepLX" }));
        assert_eq!(settings.translation_engines(), vec!["DeepLX".to_string()]);

        settings
            .set("translation_engine", json!(["Dummy", "GoogleTranslate"]))
            .unwrap();
        assert_eq!(settings.translation_engines(), vec!["Dummy", "GoogleTranslate"]);
    }

    #[test]
    fn hotkeys_keep_configuration_order() {
        let settings = Settings::in_memory();
        let actions: Vec<String> = settings.hotkeys().into_iter().map(|(a, _)| a).collect();
        assert_eq!(actions, vec!["ocr_capture", "only_ocr", "cancel_selection"]);
    }
}
