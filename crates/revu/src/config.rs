use std::collections::HashMap;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use revu_config::ViewerConfig;

use crate::action::Action;

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub keybinds: Keybinds,
    pub viewer: ViewerConfig,
}

impl Config {
    pub fn new(viewer: ViewerConfig) -> Self {
        Self {
            viewer,
            ..Default::default()
        }
    }
}

pub type InnerKeybinds = HashMap<KeyEvent, Action>;

#[derive(Clone, Debug)]
pub struct Keybinds(pub InnerKeybinds);

impl Keybinds {
    pub fn action_for(&self, key: &KeyEvent) -> Option<&Action> {
        // Shift is implied by the character itself, so it is not part of the binding.
        let normalised = KeyEvent::new(key.code, key.modifiers.difference(KeyModifiers::SHIFT));
        self.0.get(&normalised)
    }
}

impl Default for Keybinds {
    fn default() -> Self {
        let bindings = [
            ("q", Action::Quit),
            ("r", Action::Refresh),
            ("j", Action::SelectNext),
            ("down", Action::SelectNext),
            ("k", Action::SelectPrevious),
            ("up", Action::SelectPrevious),
            ("pagedown", Action::PageDown),
            ("pageup", Action::PageUp),
            ("enter", Action::OpenDetail),
            ("esc", Action::CloseDetail),
        ];

        let keybinds = bindings
            .into_iter()
            .filter_map(|(raw, action)| match parse_key_event(raw) {
                Ok(key) => Some((key, action)),
                Err(e) => {
                    tracing::error!("invalid default keybind: {e}");
                    None
                }
            })
            .collect();

        Self(keybinds)
    }
}

fn parse_key_event(raw: &str) -> anyhow::Result<KeyEvent> {
    let raw_lower = raw.to_ascii_lowercase();

    let code = match raw_lower.as_str() {
        "enter" => KeyCode::Enter,
        "esc" => KeyCode::Esc,
        "up" => KeyCode::Up,
        "down" => KeyCode::Down,
        "pageup" => KeyCode::PageUp,
        "pagedown" => KeyCode::PageDown,
        other => {
            let mut chars = other.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => KeyCode::Char(c),
                _ => anyhow::bail!("Unable to parse {raw_lower}"),
            }
        }
    };

    Ok(KeyEvent::new(code, KeyModifiers::empty()))
}
