//! Hotkey parsing on top of the core Config.

use std::str::FromStr;

use global_hotkey::hotkey::{Code, HotKey, Modifiers};
use tracing::warn;

use crate::Config;

/// Default hotkey: Alt+Shift+M
pub fn default_hotkey() -> HotKey {
    HotKey::new(Some(Modifiers::ALT | Modifiers::SHIFT), Code::KeyM)
}

/// Extension trait for Config to handle hotkeys.
pub trait ConfigExt {
    /// The configured hotkey, or the default one if it does not parse.
    fn parsed_hotkey(&self) -> HotKey;
}

impl ConfigExt for Config {
    fn parsed_hotkey(&self) -> HotKey {
        match HotKey::from_str(self.hotkey()) {
            Ok(hotkey) => hotkey,
            Err(e) => {
                warn!(hotkey = self.hotkey(), error = %e, "Invalid hotkey, using the default");
                default_hotkey()
            }
        }
    }
}
