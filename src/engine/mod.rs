//! Dialog engine: the per-page state machine behind a native modal dialog.
//!
//! The native side is abstracted as three traits:
//!
//! - [`NativeDialog`] runs one modal session on a worker thread and reports every
//!   interaction to a [`PageCallback`]
//! - [`DialogWindow`] is the live window, usable from any thread for in-place updates
//! - [`PageCallback`] receives [`Notification`]s and answers with a [`Reply`]
//!
//! [`DialogEngine`] implements `PageCallback` for one page and forwards every
//! interaction to a [`DialogHooks`] implementation, which is where the controller
//! turns them into bridge events. [`ScriptedDialog`] is an in-process `NativeDialog`
//! driven by a list of user actions.

pub mod page;
pub mod scripted;

pub use page::DialogEngine;
pub use scripted::{CommandLog, ScriptStep, ScriptedDialog, WindowCommand};

use crate::bridge::DialogId;
use crate::error::DialogResult;
use crate::models::{ButtonSpec, DialogConfig, DialogOutcome, Icon, IconSlot, ProgressBarState};
use std::sync::Arc;
use std::time::Duration;

/// Standard id reported when a dialog is cancelled or closed from the window frame
pub const IDCANCEL: i32 = 2;

/// Notifications the native dialog sends while it runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Created,
    /// The window handle became valid. Sent again for each navigated page.
    DialogConstructed,
    Navigated,
    ButtonClicked(i32),
    HyperlinkClicked(String),
    /// Time since the dialog was created or the timer was last reset
    Timer(Duration),
    Destroyed,
    RadioButtonClicked(i32),
    VerificationClicked(bool),
    Help,
    ExpandoButtonClicked(bool),
}

/// Answer to a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Reply {
    /// Default handling
    #[default]
    Continue,
    /// Only meaningful for button clicks: do not close the dialog
    KeepOpen,
    /// Only meaningful for timer ticks: restart the timer baseline
    ResetTimer,
}

/// What a button click handler decided
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonAction {
    Close,
    KeepOpen,
}

/// Text elements that can be replaced while the window is live
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DialogElement {
    Content,
    ExpandedInformation,
    Footer,
    MainInstruction,
}

/// Opaque handle of the window that owns the modal dialog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentWindow(pub isize);

/// A page with its button lists frozen into the form the native dialog needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrozenPage {
    pub dialog: DialogId,
    pub config: DialogConfig,
    pub buttons: Vec<ButtonSpec>,
    pub radio_buttons: Vec<ButtonSpec>,
}

impl FrozenPage {
    /// Ids a user can click: custom buttons and the enabled common buttons
    pub fn clickable_ids(&self) -> Vec<i32> {
        let mut ids: Vec<i32> = self.buttons.iter().map(|b| b.id).collect();
        ids.extend(self.config.common_buttons.ids());
        ids
    }

    pub fn default_radio(&self) -> i32 {
        self.radio_buttons.first().map_or(0, |radio| radio.id)
    }
}

/// The live native window.
///
/// Every method may be called from any thread. Calls are delivered to the dialog
/// in order; none of them wait for the dialog to react.
pub trait DialogWindow: Send + Sync {
    fn set_title(&self, title: &str);
    fn set_element_text(&self, element: DialogElement, text: &str);
    fn update_icon(&self, slot: IconSlot, icon: Icon);
    fn click_button(&self, button_id: i32);
    fn click_radio_button(&self, button_id: i32);
    fn click_verification(&self, checked: bool, set_focus: bool);
    fn enable_button(&self, button_id: i32, enable: bool);
    fn enable_radio_button(&self, button_id: i32, enable: bool);
    fn set_progress_bar_marquee(&self, marquee: bool, speed: u32);
    fn set_progress_bar_state(&self, state: ProgressBarState);
    fn set_progress_bar_range(&self, min: u16, max: u16);
    fn set_progress_bar_position(&self, position: i32);
    fn set_button_elevation_required(&self, button_id: i32, required: bool);

    /// Replace the displayed page without closing the window. Notifications after
    /// the swap go to `callback`.
    fn navigate_page(&self, page: FrozenPage, callback: Arc<dyn PageCallback>);
}

/// Receives native notifications on the dialog's worker thread
pub trait PageCallback: Send + Sync {
    fn notify(&self, window: &Arc<dyn DialogWindow>, notification: Notification) -> Reply;
}

/// A native modal dialog primitive.
///
/// `run_modal` blocks the calling thread until the dialog is closed.
pub trait NativeDialog: Send {
    fn run_modal(
        &mut self,
        parent: Option<ParentWindow>,
        page: FrozenPage,
        callback: Arc<dyn PageCallback>,
    ) -> DialogResult<DialogOutcome>;
}

/// Per-interaction hooks called by [`DialogEngine`] on the worker thread.
///
/// Every method has a pass-through default, so implementors override only what they
/// care about.
#[cfg_attr(test, mockall::automock)]
pub trait DialogHooks: Send + Sync {
    fn on_constructed(&self) {}

    fn on_navigated(&self) {}

    fn on_hyperlink(&self, _href: &str) {}

    /// Decide whether a click on `button_id` closes the dialog. Message-only ids stay
    /// open whatever this returns.
    fn on_button(&self, _button_id: i32) -> ButtonAction {
        ButtonAction::Close
    }

    fn on_radio(&self, _button_id: i32) {}

    fn on_verification(&self, _checked: bool) {}

    fn on_expando(&self, _expanded: bool) {}

    /// Return `true` to reset the timer baseline
    fn on_timer(&self, _elapsed: Duration) -> bool {
        false
    }

    fn on_help(&self) {}
}

/// Hooks that accept every default
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultHooks;

impl DialogHooks for DefaultHooks {}
