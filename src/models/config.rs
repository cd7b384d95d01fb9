use super::buttons::{ButtonDefinition, RadioDefinition};
use super::dialog::{DialogConfig, ProgressSettings};
use serde::{Deserialize, Serialize};

/// Application settings from settings.yaml, overridable through `TASKBRIDGE__*`
/// environment variables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub bridge: BridgeSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub dir: String,
    pub prefix: String,
    pub debug_mode: bool,
    pub console_output: bool,
    /// Write the log file as JSON lines instead of plain text
    pub json_format: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            dir: "logs".to_string(),
            prefix: "taskbridge".to_string(),
            debug_mode: false,
            console_output: true,
            json_format: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeSettings {
    /// Log the bridge counters when the host loop shuts down
    pub log_metrics_on_exit: bool,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            log_metrics_on_exit: true,
        }
    }
}

/// A complete, named dialog page as stored in pages.yaml
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageDefinition {
    #[serde(flatten)]
    pub config: DialogConfig,
    pub buttons: Vec<ButtonDefinition>,
    pub radio_buttons: Vec<RadioDefinition>,
    pub progress: ProgressSettings,
}
