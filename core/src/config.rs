use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::input::{Modifiers, PointerButton, PointerEvent};

// Button plus exact modifier state that starts a drag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventBinding {
    pub button: PointerButton,
    #[serde(default)]
    pub modifiers: Modifiers,
}

impl EventBinding {
    pub fn matches(&self, event: &PointerEvent) -> bool {
        event.button == self.button && event.modifiers == self.modifiers
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    // Screen distance under which a pointer grabs a control point
    pub hit_tolerance_px: f64,
    pub drag_binding: EventBinding,
    pub toggle_button: PointerButton,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            hit_tolerance_px: 8.0,
            drag_binding: EventBinding {
                button: PointerButton::Primary,
                modifiers: Modifiers::default(),
            },
            toggle_button: PointerButton::Secondary,
        }
    }
}

impl EditorConfig {
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    // Parse `text` if given, falling back to defaults on any problem.
    pub fn from_json_or_default(text: Option<&str>) -> Self {
        match text.map(Self::from_json_str) {
            Some(Ok(config)) => config,
            Some(Err(err)) => {
                warn!("ignoring editor config: {err}");
                Self::default()
            }
            None => Self::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::EditorConfig;
    use crate::input::{Modifiers, PointerButton, PointerEvent};
    use crate::projection::ScreenPos;

    #[test]
    fn partial_config_fills_defaults() {
        let config = EditorConfig::from_json_str(r#"{"hit_tolerance_px": 12.0}"#).unwrap();
        assert_eq!(config.hit_tolerance_px, 12.0);
        assert_eq!(config.toggle_button, PointerButton::Secondary);
        assert_eq!(config.drag_binding, EditorConfig::default().drag_binding);
    }

    #[test_log::test]
    fn bad_config_falls_back() {
        let config = EditorConfig::from_json_or_default(Some("[1, 2"));
        assert_eq!(config, EditorConfig::default());
    }

    #[test]
    fn binding_requires_exact_modifiers() {
        let binding = EditorConfig::default().drag_binding;
        let plain = PointerEvent::new(ScreenPos::new(0.0, 0.0), PointerButton::Primary);
        assert!(binding.matches(&plain));
        let shifted = plain.with_modifiers(Modifiers {
            shift: true,
            ..Modifiers::default()
        });
        assert!(!binding.matches(&shifted));
        let right = PointerEvent::new(ScreenPos::new(0.0, 0.0), PointerButton::Secondary);
        assert!(!binding.matches(&right));
    }
}
