use serde_json::{Map, Value};
use utsushi_types::{PresetKind, PresetProfile};

use crate::{ConfigError, Settings};

impl Settings {
    /// Profiles of `kind` in configuration order. Malformed entries read as empty profiles.
    pub fn presets(&self, kind: PresetKind) -> Vec<(String, PresetProfile)> {
        self.preset_map(kind)
            .into_iter()
            .map(|(name, value)| {
                let profile = serde_json::from_value(value).unwrap_or_default();
                (name, profile)
            })
            .collect()
    }

    pub fn preset_names(&self, kind: PresetKind) -> Vec<String> {
        self.preset_map(kind).into_iter().map(|(name, _)| name).collect()
    }

    pub fn preset(&self, kind: PresetKind, name: &str) -> Option<PresetProfile> {
        self.presets(kind)
            .into_iter()
            .find_map(|(n, profile)| (n == name).then_some(profile))
    }

    /// Add an empty profile. Returns `false` if the name is blank or already taken.
    pub fn create_preset(&self, kind: PresetKind, name: &str) -> Result<bool, ConfigError> {
        let name = name.trim();
        let mut map = self.preset_map(kind);
        if name.is_empty() || map.contains_key(name) {
            return Ok(false);
        }
        map.insert(name.to_string(), profile_value(&PresetProfile::default())?);
        self.set(kind.config_key(), Value::Object(map))?;
        tracing::info!("Created {:?} preset '{name}'", kind);
        Ok(true)
    }

    /// Insert or overwrite a profile.
    pub fn update_preset(
        &self,
        kind: PresetKind,
        name: &str,
        profile: &PresetProfile,
    ) -> Result<(), ConfigError> {
        let mut map = self.preset_map(kind);
        map.insert(name.to_string(), profile_value(profile)?);
        self.set(kind.config_key(), Value::Object(map))
    }

    /// Remove a profile. Returns `false` if it did not exist.
    pub fn delete_preset(&self, kind: PresetKind, name: &str) -> Result<bool, ConfigError> {
        let mut map = self.preset_map(kind);
        if map.shift_remove(name).is_none() {
            return Ok(false);
        }
        self.set(kind.config_key(), Value::Object(map))?;
        tracing::info!("Deleted {:?} preset '{name}'", kind);
        Ok(true)
    }

    fn preset_map(&self, kind: PresetKind) -> Map<String, Value> {
        match self.get(kind.config_key()) {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

fn profile_value(profile: &PresetProfile) -> Result<Value, ConfigError> {
    Ok(serde_json::to_value(profile)?)
}
