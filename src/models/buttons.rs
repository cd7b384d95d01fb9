use crate::error::{DialogError, DialogResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// First id handed out to custom buttons and radio buttons.
pub const FIRST_BUTTON_ID: i32 = 101;

/// Ids at or above this value belong to message-only buttons, which never close
/// the dialog when clicked.
pub const MESSAGE_ONLY_BASE: i32 = 1000;

/// Whether a button id follows the message-only convention
pub fn is_message_only(button_id: i32) -> bool {
    button_id >= MESSAGE_ONLY_BASE
}

/// Key reported for the standard buttons drawn by the dialog itself
pub fn standard_button_key(button_id: i32) -> Option<&'static str> {
    match button_id {
        1 => Some("ok"),
        2 => Some("cancel"),
        3 => Some("abort"),
        4 => Some("retry"),
        5 => Some("ignore"),
        6 => Some("yes"),
        7 => Some("no"),
        8 => Some("close"),
        _ => None,
    }
}

/// Host-side description of a custom button: a key the host recognises, the label to
/// display and whether clicking it leaves the dialog open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonDefinition {
    pub key: String,
    pub label: String,
    #[serde(default)]
    pub message_only: bool,
}

impl ButtonDefinition {
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            message_only: false,
        }
    }

    pub fn message_only(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            message_only: true,
        }
    }
}

/// Host-side description of a radio button
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RadioDefinition {
    pub key: String,
    pub label: String,
}

impl RadioDefinition {
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
        }
    }
}

/// A button as the native dialog sees it: numeric id and label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonSpec {
    pub id: i32,
    pub label: String,
}

/// Ordered list of custom buttons with their host keys.
///
/// Ids are assigned by position: `101 + index`, plus [`MESSAGE_ONLY_BASE`] when the
/// button is message-only. Display order is the definition order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ButtonList {
    keys: Vec<String>,
    specs: Vec<ButtonSpec>,
}

impl ButtonList {
    /// Build a button list from host definitions, rejecting duplicate keys
    pub fn from_definitions(definitions: &[ButtonDefinition]) -> DialogResult<Self> {
        let mut seen = HashSet::new();
        let mut list = Self::default();

        for (index, definition) in definitions.iter().enumerate() {
            if !seen.insert(definition.key.as_str()) {
                return Err(DialogError::DuplicateButtonKey(definition.key.clone()));
            }
            let mut id = FIRST_BUTTON_ID + index as i32;
            if definition.message_only {
                id += MESSAGE_ONLY_BASE;
            }
            list.keys.push(definition.key.clone());
            list.specs.push(ButtonSpec {
                id,
                label: definition.label.clone(),
            });
        }

        Ok(list)
    }

    /// Build a radio list; radio buttons never use the message-only offset
    pub fn from_radio_definitions(definitions: &[RadioDefinition]) -> DialogResult<Self> {
        let buttons: Vec<ButtonDefinition> = definitions
            .iter()
            .map(|radio| ButtonDefinition::new(radio.key.clone(), radio.label.clone()))
            .collect();
        Self::from_definitions(&buttons)
    }

    pub fn specs(&self) -> &[ButtonSpec] {
        &self.specs
    }

    /// Translate a native id back into the host key it was created from.
    ///
    /// Message-only ids lose their offset first; standard button ids resolve to their
    /// well-known names.
    pub fn key_for(&self, id: i32) -> Option<String> {
        let base = if is_message_only(id) {
            id - MESSAGE_ONLY_BASE
        } else {
            id
        };

        if base >= FIRST_BUTTON_ID {
            let index = (base - FIRST_BUTTON_ID) as usize;
            return self.keys.get(index).cloned();
        }

        standard_button_key(base).map(str::to_string)
    }

    /// Native id of the button created for `key`
    pub fn id_for(&self, key: &str) -> Option<i32> {
        self.keys
            .iter()
            .position(|k| k == key)
            .map(|index| self.specs[index].id)
    }
}

/// Raw result of a modal session, produced once when the dialog closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DialogOutcome {
    pub selected_button_id: i32,
    pub selected_radio_id: i32,
    pub verification_checked: bool,
}

/// [`DialogOutcome`] translated into host keys against the final page of the
/// navigation chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOutcome {
    pub button: Option<String>,
    pub radio: Option<String>,
    pub verification: bool,
    pub raw: DialogOutcome,
}

impl ResolvedOutcome {
    pub fn resolve(raw: DialogOutcome, buttons: &ButtonList, radios: &ButtonList) -> Self {
        Self {
            button: buttons.key_for(raw.selected_button_id),
            radio: if raw.selected_radio_id >= FIRST_BUTTON_ID {
                radios.key_for(raw.selected_radio_id)
            } else {
                None
            },
            verification: raw.verification_checked,
            raw,
        }
    }
}
