use thiserror::Error;

use crate::models::IconSlot;

/// Errors surfaced by dialog pages and the controller.
///
/// Most variants are contract violations reported at the call site that made the
/// bad request. Faults on the worker thread side of the bridge are absorbed and logged
/// instead of being turned into one of these.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DialogError {
    #[error("Dialog page is already shown")]
    AlreadyShown,

    #[error("Dialog page is not shown")]
    NotShown,

    #[error("Dialog page was navigated away from and is detached")]
    Detached,

    #[error("Cannot navigate to a dialog page that is already visible")]
    TargetAlreadyShown,

    #[error("Navigation target belongs to a different event bridge")]
    ForeignBridge,

    #[error("Before setting the {0} icon, ensure that its text has a value")]
    IconWithoutText(IconSlot),

    #[error("Duplicate button key: {0}")]
    DuplicateButtonKey(String),

    #[error("Option {0} can only be changed before the dialog is shown")]
    OptionLocked(&'static str),

    #[error("Native dialog failure: {0}")]
    Native(String),

    #[error("Dialog worker thread failed: {0}")]
    WorkerPanicked(String),
}

pub type DialogResult<T> = std::result::Result<T, DialogError>;
