//! taskbridge - demo entry point.
//!
//! # Overview
//!
//! Runs a multi-page task dialog wizard on the headless scripted dialog and prints
//! every event the host receives. It initializes:
//! - Configuration ([`ConfigManager`]): `settings.yaml` + `TASKBRIDGE__*` overrides
//! - Logging (daily file rotation + optional console output)
//! - The host loop ([`HostLoop`]: current-thread tokio runtime + `LocalSet`)
//!
//! The threading model matches a real embedding:
//! - **Host thread**: owns every `TaskDialog` and runs all event callbacks
//! - **Blocking pool thread**: runs the modal dialog and its notification callbacks
//!
//! # Usage
//!
//! ```text
//! taskbridge [data-dir]
//! ```
//!
//! `data-dir` (default `taskbridge-data`) holds `settings.yaml` and `pages.yaml`. When
//! no pages are defined, a three-page wizard is written to `pages.yaml` and used.

use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use regex::Regex;
use std::rc::Rc;
use std::time::Duration;
use taskbridge::config::PageMap;
use taskbridge::models::{ButtonList, DialogConfig, DialogFlags, Icon, PageDefinition, ProgressSettings};
use taskbridge::{
    APP_NAME, ButtonDefinition, ConfigManager, DialogResult, EventName, HostLoop, HostValue,
    RadioDefinition, ResolvedOutcome, ScriptStep, ScriptedDialog, TaskDialog, VERSION,
};

/// Key of the message-only button that advances the wizard
const NEXT_KEY: &str = "next";

fn main() -> Result<()> {
    let data_dir = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "taskbridge-data".to_string());

    let config_manager = ConfigManager::new(Utf8PathBuf::from(data_dir))?;
    let settings = config_manager.load_settings()?;

    // Keep the guard alive until exit so buffered log lines are flushed
    let _log_guard = taskbridge::logging::setup_logging(&settings.logging)?;
    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    let mut pages = config_manager.load_pages()?;
    if pages.is_empty() {
        pages = wizard_pages();
        config_manager.save_pages(&pages)?;
    }

    let host = HostLoop::new()?;
    let outcome = run_wizard(&host, &pages)?;

    println!(
        "Outcome: button={} radio={} verification={}",
        outcome.button.as_deref().unwrap_or("<none>"),
        outcome.radio.as_deref().unwrap_or("<none>"),
        outcome.verification
    );

    if settings.bridge.log_metrics_on_exit {
        host.bridge().metrics().log_summary();
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Show the first page and let the wizard navigate through the rest
fn run_wizard(host: &HostLoop, pages: &PageMap) -> Result<ResolvedOutcome> {
    let bridge = host.bridge();
    let dialogs: Vec<TaskDialog> = pages
        .values()
        .map(|page| TaskDialog::from_definition(bridge, page))
        .collect::<DialogResult<_>>()
        .context("Invalid page definition")?;
    let dialogs = Rc::new(dialogs);

    for (index, name) in pages.keys().enumerate() {
        let wizard = Rc::downgrade(&dialogs);
        let name = name.clone();

        dialogs[index].set_sink(move |event: EventName, value: HostValue| {
            let Some(wizard) = wizard.upgrade() else {
                return;
            };
            let page = &wizard[index];

            match event {
                EventName::ButtonClicked => {
                    let key = page.button_key(&value);
                    println!("[{name}] {event}: {}", key.as_deref().unwrap_or("?"));

                    if key.as_deref() == Some(NEXT_KEY) {
                        if let Some(next) = wizard.get(index + 1) {
                            if let Err(e) = page.navigate(next) {
                                tracing::warn!("Navigation from {} failed: {}", name, e);
                            }
                        }
                    }
                }
                EventName::RadioClicked => {
                    let key = page.radio_key(&value);
                    println!("[{name}] {event}: {}", key.as_deref().unwrap_or("?"));
                }
                EventName::Timer => {
                    let elapsed = value.as_number().unwrap_or_default();
                    println!("[{name}] {event}: {elapsed:.0} ms");
                    // Reset before the text update so the dialog sees both together
                    if elapsed >= 1000.0 {
                        page.reset_timer();
                    }
                    page.set_content(format!("Running for {:.1} s", elapsed / 1000.0));
                }
                _ => println!("[{name}] {event}: {}", describe(&value)),
            }
        });
    }

    let first = dialogs.first().context("No pages defined")?;
    let script = demo_script(pages)?;
    tracing::info!("Running wizard with {} page(s), {} scripted step(s)", dialogs.len(), script.len());

    let outcome = host.block_on(first.show_async(ScriptedDialog::new(script), None))?;
    Ok(outcome)
}

fn describe(value: &HostValue) -> String {
    match value {
        HostValue::Undefined => "-".to_string(),
        HostValue::String(text) => text.to_string(),
        HostValue::Number(number) => number.to_string(),
        HostValue::Boolean(flag) => flag.to_string(),
    }
}

/// User actions that walk through every page: follow the first link, pick the last
/// radio, tick the verification box, let the timer run, then advance or finish
fn demo_script(pages: &PageMap) -> Result<Vec<ScriptStep>> {
    let href_pattern = Regex::new(r#"<a\s+href="([^"]*)""#).context("Invalid href regex")?;
    let mut script = Vec::new();

    for (index, page) in pages.values().enumerate() {
        let buttons = ButtonList::from_definitions(&page.buttons)?;
        let radios = ButtonList::from_radio_definitions(&page.radio_buttons)?;
        let is_last = index + 1 == pages.len();

        if page.config.flags.use_links {
            let first_href = page
                .config
                .link_bearing_text()
                .find_map(|text| href_pattern.captures(text))
                .map(|anchor| anchor[1].to_string());
            if let Some(href) = first_href {
                script.push(ScriptStep::ClickLink(href));
            }
        }
        if let Some(radio) = radios.specs().last() {
            script.push(ScriptStep::ClickRadio(radio.id));
        }
        if page.config.verification_text.is_some() {
            script.push(ScriptStep::ToggleVerification);
        }
        if page.config.flags.use_timer {
            script.push(ScriptStep::Advance(Duration::from_millis(1200)));
            script.push(ScriptStep::AwaitCommand);
            script.push(ScriptStep::Advance(Duration::from_millis(300)));
            script.push(ScriptStep::Advance(Duration::from_millis(300)));
        }

        match buttons.id_for(NEXT_KEY) {
            Some(next) if !is_last => {
                script.push(ScriptStep::Click(next));
                script.push(ScriptStep::AwaitNavigation);
            }
            _ => {
                let closing = page
                    .buttons
                    .iter()
                    .find(|button| !button.message_only)
                    .and_then(|button| buttons.id_for(&button.key));
                script.push(closing.map_or(ScriptStep::Close, ScriptStep::Click));
                break;
            }
        }
    }

    Ok(script)
}

/// Built-in three-page wizard used when pages.yaml is empty
fn wizard_pages() -> PageMap {
    let mut pages = PageMap::new();

    pages.insert(
        "welcome".to_string(),
        PageDefinition {
            config: DialogConfig {
                window_title: Some("taskbridge demo".to_string()),
                main_instruction: Some("Welcome".to_string()),
                content: Some(
                    r#"This wizard runs on a worker thread. See the <a href="https://example.com/taskbridge">project page</a>."#
                        .to_string(),
                ),
                main_icon: Icon::Information,
                flags: DialogFlags {
                    use_links: true,
                    cancelable: true,
                    ..DialogFlags::default()
                },
                ..DialogConfig::default()
            },
            buttons: vec![
                ButtonDefinition::message_only(NEXT_KEY, "Next"),
                ButtonDefinition::new("quit", "Quit"),
            ],
            ..PageDefinition::default()
        },
    );

    pages.insert(
        "options".to_string(),
        PageDefinition {
            config: DialogConfig {
                window_title: Some("taskbridge demo".to_string()),
                main_instruction: Some("Choose a mode".to_string()),
                verification_text: Some("Remember my choice".to_string()),
                ..DialogConfig::default()
            },
            buttons: vec![
                ButtonDefinition::message_only(NEXT_KEY, "Next"),
                ButtonDefinition::new("quit", "Quit"),
            ],
            radio_buttons: vec![
                RadioDefinition::new("fast", "Fast"),
                RadioDefinition::new("thorough", "Thorough"),
            ],
            ..PageDefinition::default()
        },
    );

    pages.insert(
        "finish".to_string(),
        PageDefinition {
            config: DialogConfig {
                window_title: Some("taskbridge demo".to_string()),
                main_instruction: Some("Working".to_string()),
                content: Some("Running for 0.0 s".to_string()),
                flags: DialogFlags {
                    use_progress_bar: true,
                    use_timer: true,
                    ..DialogFlags::default()
                },
                ..DialogConfig::default()
            },
            buttons: vec![ButtonDefinition::new("finish", "Finish")],
            progress: ProgressSettings {
                marquee: true,
                marquee_speed: 30,
                ..ProgressSettings::default()
            },
            ..PageDefinition::default()
        },
    );

    pages
}
