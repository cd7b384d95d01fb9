// taskbridge - Drive blocking native task dialogs from a single-threaded host
//
// This is the library crate containing the event bridge, the dialog page state machine
// and the host-facing TaskDialog. The binary crate (main.rs) runs a demo wizard on the
// headless scripted dialog.

pub mod bridge;
pub mod config;
pub mod controller;
pub mod engine;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod state;

// Re-export commonly used types for convenience
pub use bridge::{
    BridgeProducer, CallbackSink, DialogId, Event, EventBridge, EventName, HostLoop, HostValue,
    Payload, SessionGuard,
};
pub use config::ConfigManager;
pub use controller::TaskDialog;
pub use engine::{ScriptStep, ScriptedDialog};
pub use error::{DialogError, DialogResult};
pub use metrics::BridgeMetrics;
pub use models::{ButtonDefinition, DialogOutcome, RadioDefinition, ResolvedOutcome, Settings};
pub use state::{PageState, StateChange};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
