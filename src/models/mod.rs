//! Data models for taskbridge.
//!
//! - [`DialogConfig`]: text, icons and flags of a single dialog page
//! - [`ButtonList`]: custom buttons or radio buttons with their native ids and host keys
//! - [`DialogOutcome`] / [`ResolvedOutcome`]: result of a modal session
//! - [`Settings`] / [`PageDefinition`]: configuration loaded by
//!   [`ConfigManager`](crate::config::ConfigManager)
//!
//! Everything here is plain data and `Send`; host-only values live in
//! [`crate::bridge::payload`].

pub mod buttons;
pub mod config;
pub mod dialog;

pub use buttons::{
    ButtonDefinition, ButtonList, ButtonSpec, DialogOutcome, FIRST_BUTTON_ID, MESSAGE_ONLY_BASE,
    RadioDefinition, ResolvedOutcome, is_message_only, standard_button_key,
};
pub use config::{BridgeSettings, LoggingSettings, PageDefinition, Settings};
pub use dialog::{
    CommonButtons, DialogConfig, DialogFlags, Icon, IconSlot, ProgressBarState, ProgressSettings,
};
