use serde::{Deserialize, Serialize};
use std::fmt;

/// Stock icon selectors understood by the native dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Icon {
    #[default]
    None,
    Warning,
    Error,
    Information,
    Shield,
}

/// Which of the two icon positions an icon update targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IconSlot {
    Main,
    Footer,
}

impl fmt::Display for IconSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IconSlot::Main => write!(f, "main"),
            IconSlot::Footer => write!(f, "footer"),
        }
    }
}

/// Progress bar state, as shown by the native control colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressBarState {
    #[default]
    Normal,
    Error,
    Paused,
}

/// Behaviour flags. Locked once the dialog is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DialogFlags {
    pub use_links: bool,
    pub use_command_links: bool,
    pub use_progress_bar: bool,
    pub use_timer: bool,
    pub cancelable: bool,
    pub minimizable: bool,
}

/// Standard buttons rendered by the dialog itself, in addition to custom buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CommonButtons {
    pub ok: bool,
    pub yes: bool,
    pub no: bool,
    pub cancel: bool,
    pub retry: bool,
    pub close: bool,
}

impl CommonButtons {
    /// Button ids the native dialog reports for the enabled standard buttons
    pub fn ids(&self) -> Vec<i32> {
        let mut ids = Vec::new();
        if self.ok {
            ids.push(1);
        }
        if self.cancel {
            ids.push(2);
        }
        if self.retry {
            ids.push(4);
        }
        if self.yes {
            ids.push(6);
        }
        if self.no {
            ids.push(7);
        }
        if self.close {
            ids.push(8);
        }
        ids
    }
}

/// Everything the native dialog needs to render one page, minus the button lists.
///
/// Text fields are `None` until set. While a page is shown only the update-in-place
/// path may change what is on screen; see [`crate::engine::DialogEngine`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DialogConfig {
    pub window_title: Option<String>,
    pub main_instruction: Option<String>,
    pub content: Option<String>,
    pub footer: Option<String>,
    pub verification_text: Option<String>,
    pub expanded_information: Option<String>,
    pub expanded_control_text: Option<String>,
    pub collapsed_control_text: Option<String>,
    pub main_icon: Icon,
    pub footer_icon: Icon,
    pub flags: DialogFlags,
    pub common_buttons: CommonButtons,
}

impl DialogConfig {
    /// Check the icon/text pairing required by the native dialog.
    ///
    /// An icon without its neighbouring text crashes the native control, so a
    /// non-`None` icon requires the matching text to be present.
    pub fn icon_text_missing(&self) -> Option<IconSlot> {
        if self.main_icon != Icon::None && self.main_instruction.is_none() {
            return Some(IconSlot::Main);
        }
        if self.footer_icon != Icon::None && self.footer.is_none() {
            return Some(IconSlot::Footer);
        }
        None
    }

    /// All text that may carry `<a href="...">` anchors
    pub fn link_bearing_text(&self) -> impl Iterator<Item = &str> {
        [&self.content, &self.expanded_information, &self.footer]
            .into_iter()
            .filter_map(|text| text.as_deref())
    }
}

/// Progress bar settings that are staged before show and re-applied once the
/// window exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressSettings {
    pub marquee: bool,
    pub marquee_speed: u32,
    pub state: Option<ProgressBarState>,
    pub range: (u16, u16),
    pub position: Option<i32>,
}

impl Default for ProgressSettings {
    fn default() -> Self {
        Self {
            marquee: false,
            marquee_speed: 0,
            state: None,
            range: (0, 100),
            position: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_button_ids() {
        let buttons = CommonButtons {
            ok: true,
            cancel: true,
            ..Default::default()
        };
        assert_eq!(buttons.ids(), vec![1, 2]);
    }

    #[test]
    fn test_icon_requires_text() {
        let mut config = DialogConfig {
            main_icon: Icon::Warning,
            ..Default::default()
        };
        assert_eq!(config.icon_text_missing(), Some(IconSlot::Main));

        config.main_instruction = Some("Careful".to_string());
        assert_eq!(config.icon_text_missing(), None);

        config.footer_icon = Icon::Information;
        assert_eq!(config.icon_text_missing(), Some(IconSlot::Footer));
    }

    #[test]
    fn test_config_from_yaml_uses_defaults() {
        let yaml = "window_title: Hello\nflags:\n  use_timer: true\nmain_icon: shield\n";
        let config: DialogConfig = serde_yaml_ng::from_str(yaml).unwrap();

        assert_eq!(config.window_title.as_deref(), Some("Hello"));
        assert!(config.flags.use_timer);
        assert!(!config.flags.cancelable);
        assert_eq!(config.main_icon, Icon::Shield);
        assert_eq!(config.content, None);
    }
}
