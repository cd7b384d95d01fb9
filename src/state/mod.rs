// Page state management
//
// Each dialog page moves through Unshown -> Shown -> (Navigating -> Shown)* -> Closed,
// or ends Detached when another page takes over its window. The manager is shared by
// the host thread and the dialog worker thread and emits change events on every
// accepted transition.

use crate::bridge::DialogId;
use crate::bridge::{read_lock, write_lock};
use std::fmt;
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;

/// Lifecycle state of one dialog page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PageState {
    /// Configured but never displayed. Everything is staged.
    #[default]
    Unshown,

    /// Target of a navigation that the window has not completed yet
    Navigating,

    /// Displayed and owning the window
    Shown,

    /// The window was destroyed; the outcome is readable
    Closed,

    /// Another page took over the window. Inert from here on.
    Detached,
}

impl PageState {
    /// Whether the state machine accepts `self -> next`
    pub fn can_transition_to(self, next: PageState) -> bool {
        use PageState::*;
        matches!(
            (self, next),
            (Unshown, Shown)
                | (Unshown, Navigating)
                | (Unshown, Closed)
                | (Navigating, Shown)
                | (Navigating, Closed)
                | (Shown, Closed)
                | (Shown, Detached)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, PageState::Closed | PageState::Detached)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PageState::Unshown => "unshown",
            PageState::Navigating => "navigating",
            PageState::Shown => "shown",
            PageState::Closed => "closed",
            PageState::Detached => "detached",
        }
    }
}

impl fmt::Display for PageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Emitted for every accepted page transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateChange {
    pub dialog: DialogId,
    pub from: PageState,
    pub to: PageState,
}

/// Thread-safe page state with change notification.
///
/// Cloning shares the same state and channel, so the host-side dialog object and the
/// worker-side engine observe one lifecycle.
///
/// # Usage
///
/// - [`current()`](Self::current) for the state right now
/// - [`transition()`](Self::transition) to move, rejected if not allowed from the
///   current state
/// - [`subscribe()`](Self::subscribe) to listen for changes
#[derive(Clone)]
pub struct PageStateManager {
    dialog: DialogId,
    state: Arc<RwLock<PageState>>,
    state_tx: broadcast::Sender<StateChange>,
}

impl PageStateManager {
    /// Create a manager in [`PageState::Unshown`] with a 32-event broadcast buffer
    pub fn new(dialog: DialogId) -> Self {
        let (state_tx, _) = broadcast::channel(32);
        Self {
            dialog,
            state: Arc::new(RwLock::new(PageState::Unshown)),
            state_tx,
        }
    }

    pub fn dialog(&self) -> DialogId {
        self.dialog
    }

    pub fn current(&self) -> PageState {
        *read_lock(&self.state)
    }

    pub fn is(&self, state: PageState) -> bool {
        self.current() == state
    }

    /// Move to `to` if the current state allows it.
    ///
    /// The check and the write happen under one lock, so two threads racing for the
    /// same transition see exactly one success.
    ///
    /// # Returns
    /// The emitted change, or `None` if the transition was rejected
    pub fn transition(&self, to: PageState) -> Option<StateChange> {
        let change = {
            let mut state = write_lock(&self.state);
            let from = *state;
            if !from.can_transition_to(to) {
                tracing::debug!(dialog = %self.dialog, %from, %to, "Rejected page transition");
                return None;
            }
            *state = to;
            StateChange {
                dialog: self.dialog,
                from,
                to,
            }
        };

        tracing::debug!(dialog = %self.dialog, from = %change.from, to = %change.to, "Page transition");
        // Ignore send errors - nobody has to be listening
        let _ = self.state_tx.send(change);
        Some(change)
    }

    /// Subscribe to future transitions
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.state_tx.subscribe()
    }
}

impl fmt::Debug for PageStateManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageStateManager")
            .field("dialog", &self.dialog)
            .field("state", &self.current())
            .finish()
    }
}
