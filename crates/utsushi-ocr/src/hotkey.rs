use utsushi_config::Settings;

/// Action names understood by the event loop.
pub mod actions {
    pub const OCR_CAPTURE: &str = "ocr_capture";
    pub const ONLY_OCR: &str = "only_ocr";
    pub const CANCEL_SELECTION: &str = "cancel_selection";
}

/// Action → key combo bindings, in configuration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HotkeyMap {
    bindings: Vec<(String, String)>,
}

impl HotkeyMap {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            bindings: settings.hotkeys(),
        }
    }

    pub fn get_hotkeys(&self) -> Vec<(String, String)> {
        self.bindings.clone()
    }

    pub fn combo(&self, action: &str) -> Option<&str> {
        self.bindings
            .iter()
            .find(|(a, _)| a == action)
            .map(|(_, combo)| combo.as_str())
    }

    /// Change the combo of `action`, adding the binding if it is new.
    pub fn update_hotkey(&mut self, action: &str, combo: &str) {
        match self.bindings.iter_mut().find(|(a, _)| a == action) {
            Some((_, existing)) => *existing = combo.to_string(),
            None => self.bindings.push((action.to_string(), combo.to_string())),
        }
    }
}

#[cfg(feature = "hotkeys")]
pub use listener::{GlobalHotkeyListener, HotkeyError};

#[cfg(feature = "hotkeys")]
mod listener {
    use global_hotkey::hotkey::HotKey;
    use global_hotkey::{GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState};

    use super::HotkeyMap;

    #[derive(Debug, thiserror::Error)]
    pub enum HotkeyError {
        #[error("failed to create hotkey manager: {0}")]
        Manager(#[from] global_hotkey::Error),
    }

    /// System-wide hotkeys for every binding in a [`HotkeyMap`].
    pub struct GlobalHotkeyListener {
        manager: GlobalHotKeyManager,
        registered: Vec<(HotKey, String)>,
    }

    impl GlobalHotkeyListener {
        pub fn new(map: &HotkeyMap) -> Result<Self, HotkeyError> {
            let manager = GlobalHotKeyManager::new()?;
            let mut listener = Self {
                manager,
                registered: Vec::new(),
            };
            listener.register_all(map);
            Ok(listener)
        }

        /// Action of the next pressed hotkey, if any (non-blocking).
        pub fn poll(&self) -> Option<String> {
            let receiver = GlobalHotKeyEvent::receiver();
            while let Ok(event) = receiver.try_recv() {
                if event.state != HotKeyState::Pressed {
                    continue;
                }
                match self.registered.iter().find(|(hk, _)| hk.id() == event.id) {
                    Some((_, action)) => return Some(action.clone()),
                    None => tracing::debug!("Unmatched hotkey event: {:?}", event.id),
                }
            }
            None
        }

        /// Drop every registration and register `map` afresh.
        pub fn restart(&mut self, map: &HotkeyMap) {
            self.unregister_all();
            self.register_all(map);
        }

        fn register_all(&mut self, map: &HotkeyMap) {
            for (action, combo) in map.get_hotkeys() {
                let hotkey = match combo.parse::<HotKey>() {
                    Ok(hotkey) => hotkey,
                    Err(e) => {
                        tracing::warn!("Skipping hotkey '{combo}' for '{action}': {e}");
                        continue;
                    }
                };
                match self.manager.register(hotkey) {
                    Ok(()) => {
                        tracing::info!("Hotkey '{combo}' registered for '{action}'");
                        self.registered.push((hotkey, action));
                    }
                    Err(e) => tracing::warn!("Failed to register hotkey '{combo}': {e}"),
                }
            }
        }

        fn unregister_all(&mut self) {
            for (hotkey, _) in self.registered.drain(..) {
                let _ = self.manager.unregister(hotkey);
            }
        }
    }

    impl Drop for GlobalHotkeyListener {
        fn drop(&mut self) {
            self.unregister_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_come_from_settings() {
        let map = HotkeyMap::from_settings(&Settings::in_memory());
        assert_eq!(map.combo(actions::OCR_CAPTURE), Some("alt+KeyQ"));
        assert_eq!(map.combo(actions::ONLY_OCR), Some("alt+KeyW"));
        assert_eq!(map.combo(actions::CANCEL_SELECTION), Some("Escape"));
    }

    #[test]
    fn update_hotkey_changes_or_adds() {
        let mut map = HotkeyMap::from_settings(&Settings::in_memory());
        let before = map.get_hotkeys();

        map.update_hotkey(actions::OCR_CAPTURE, "ctrl+shift+KeyS");
        map.update_hotkey("toggle_window", "F9");

        assert_eq!(map.combo(actions::OCR_CAPTURE), Some("ctrl+shift+KeyS"));
        assert_eq!(map.get_hotkeys().len(), before.len() + 1);
        assert_eq!(before[0].1, "alt+KeyQ");
    }
}
