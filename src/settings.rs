use serde::{Deserialize, Serialize};

const SHORTCUT_MODIFIERS: &[&str] = &["Ctrl", "Alt", "Shift", "Cmd", "Super"];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    System,
    Light,
    Dark,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSize {
    pub width: u32,
    pub height: u32,
}

impl Default for WindowSize {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 700,
        }
    }
}

/// User preferences, persisted alongside the scan history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub auto_launch: bool,
    pub exit_to_tray: bool,
    pub shortcut: String,
    pub theme: Theme,
    pub last_window_size: WindowSize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            auto_launch: false,
            exit_to_tray: true,
            shortcut: "Alt+Shift+S".into(),
            theme: Theme::System,
            last_window_size: WindowSize::default(),
        }
    }
}

/// Checks an accelerator string like `Ctrl+Shift+Q`: at least one modifier,
/// every modifier known, and a non-empty key last.
pub fn validate_shortcut(shortcut: &str) -> bool {
    let parts: Vec<&str> = shortcut.split('+').collect();
    let Some((key, modifiers)) = parts.split_last() else {
        return false;
    };
    !modifiers.is_empty()
        && !key.is_empty()
        && modifiers.iter().all(|m| SHORTCUT_MODIFIERS.contains(m))
}
