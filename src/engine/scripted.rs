//! In-process stand-in for the native modal dialog.
//!
//! [`ScriptedDialog`] plays a fixed list of user actions against a page on the thread
//! that calls [`NativeDialog::run_modal`], exactly as the native dialog would: every
//! action becomes a [`Notification`] to the current page callback, and the replies
//! decide whether the dialog closes or the timer restarts. Window commands sent from
//! other threads are applied between actions and recorded in a [`CommandLog`].

use super::{
    DialogElement, DialogWindow, FrozenPage, IDCANCEL, NativeDialog, Notification,
    PageCallback, ParentWindow, Reply,
};
use crate::bridge::DialogId;
use crate::error::DialogResult;
use crate::models::{DialogOutcome, Icon, IconSlot, ProgressBarState};
use regex::Regex;
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// How long the await steps wait for the host before giving up
const HOST_TIMEOUT: Duration = Duration::from_secs(5);

/// One simulated user action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptStep {
    /// Click a custom or common button
    Click(i32),
    ClickRadio(i32),
    /// Toggle the verification checkbox
    ToggleVerification,
    /// Click the anchor with this `href`
    ClickLink(String),
    ToggleExpando,
    /// Press F1
    Help,
    /// Let time pass; produces one timer tick when the page uses the timer
    Advance(Duration),
    /// Process window commands until the host navigates to another page
    AwaitNavigation,
    /// Block until the host sends at least one window command
    AwaitCommand,
    /// Close from the window frame
    Close,
}

/// A window command as it was applied by the dialog
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowCommand {
    SetTitle(String),
    SetElementText(DialogElement, String),
    UpdateIcon(IconSlot, Icon),
    ClickButton(i32),
    ClickRadioButton(i32),
    ClickVerification { checked: bool, set_focus: bool },
    EnableButton(i32, bool),
    EnableRadioButton(i32, bool),
    ProgressBarMarquee { marquee: bool, speed: u32 },
    ProgressBarState(ProgressBarState),
    ProgressBarRange(u16, u16),
    ProgressBarPosition(i32),
    ElevationRequired(i32, bool),
    Navigate(DialogId),
}

/// Shared, append-only record of applied window commands
#[derive(Debug, Clone, Default)]
pub struct CommandLog {
    entries: Arc<Mutex<Vec<WindowCommand>>>,
}

impl CommandLog {
    fn push(&self, command: WindowCommand) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(command);
    }

    pub fn snapshot(&self) -> Vec<WindowCommand> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

enum WindowMessage {
    Command(WindowCommand),
    Navigate(FrozenPage, Arc<dyn PageCallback>),
}

/// Window handle given to page callbacks. Forwards every call to the dialog thread.
struct ScriptedWindow {
    tx: mpsc::UnboundedSender<WindowMessage>,
}

impl ScriptedWindow {
    fn send(&self, message: WindowMessage) {
        if self.tx.send(message).is_err() {
            tracing::debug!("Window command sent after the dialog closed - ignored");
        }
    }

    fn command(&self, command: WindowCommand) {
        self.send(WindowMessage::Command(command));
    }
}

impl DialogWindow for ScriptedWindow {
    fn set_title(&self, title: &str) {
        self.command(WindowCommand::SetTitle(title.to_string()));
    }

    fn set_element_text(&self, element: DialogElement, text: &str) {
        self.command(WindowCommand::SetElementText(element, text.to_string()));
    }

    fn update_icon(&self, slot: IconSlot, icon: Icon) {
        self.command(WindowCommand::UpdateIcon(slot, icon));
    }

    fn click_button(&self, button_id: i32) {
        self.command(WindowCommand::ClickButton(button_id));
    }

    fn click_radio_button(&self, button_id: i32) {
        self.command(WindowCommand::ClickRadioButton(button_id));
    }

    fn click_verification(&self, checked: bool, set_focus: bool) {
        self.command(WindowCommand::ClickVerification { checked, set_focus });
    }

    fn enable_button(&self, button_id: i32, enable: bool) {
        self.command(WindowCommand::EnableButton(button_id, enable));
    }

    fn enable_radio_button(&self, button_id: i32, enable: bool) {
        self.command(WindowCommand::EnableRadioButton(button_id, enable));
    }

    fn set_progress_bar_marquee(&self, marquee: bool, speed: u32) {
        self.command(WindowCommand::ProgressBarMarquee { marquee, speed });
    }

    fn set_progress_bar_state(&self, state: ProgressBarState) {
        self.command(WindowCommand::ProgressBarState(state));
    }

    fn set_progress_bar_range(&self, min: u16, max: u16) {
        self.command(WindowCommand::ProgressBarRange(min, max));
    }

    fn set_progress_bar_position(&self, position: i32) {
        self.command(WindowCommand::ProgressBarPosition(position));
    }

    fn set_button_elevation_required(&self, button_id: i32, required: bool) {
        self.command(WindowCommand::ElevationRequired(button_id, required));
    }

    fn navigate_page(&self, page: FrozenPage, callback: Arc<dyn PageCallback>) {
        self.send(WindowMessage::Navigate(page, callback));
    }
}

/// Headless [`NativeDialog`] driven by a script of user actions.
///
/// If the script runs out before the dialog closes, the dialog is closed as if
/// cancelled.
pub struct ScriptedDialog {
    script: VecDeque<ScriptStep>,
    log: CommandLog,
    link_pattern: Regex,
}

impl ScriptedDialog {
    pub fn new(script: impl IntoIterator<Item = ScriptStep>) -> Self {
        Self {
            script: script.into_iter().collect(),
            log: CommandLog::default(),
            link_pattern: Regex::new(r#"<a\s+href="([^"]*)"\s*>"#).expect("Invalid link regex"),
        }
    }

    /// Handle to the commands this dialog applies, readable from any thread
    pub fn command_log(&self) -> CommandLog {
        self.log.clone()
    }
}

impl NativeDialog for ScriptedDialog {
    fn run_modal(
        &mut self,
        parent: Option<ParentWindow>,
        page: FrozenPage,
        callback: Arc<dyn PageCallback>,
    ) -> DialogResult<DialogOutcome> {
        tracing::debug!(dialog = %page.dialog, ?parent, steps = self.script.len(), "Scripted dialog starting");

        let (tx, rx) = mpsc::unbounded_channel();
        let window: Arc<dyn DialogWindow> = Arc::new(ScriptedWindow { tx });
        let mark = Mark {
            applied: 0,
            dialog: page.dialog,
        };
        let mut session = Session {
            selected_radio: page.default_radio(),
            page,
            callback,
            window,
            rx,
            log: self.log.clone(),
            link_pattern: &self.link_pattern,
            clock: Duration::ZERO,
            baseline: Duration::ZERO,
            disabled: HashSet::new(),
            verification: false,
            expanded: false,
            applied: 0,
            mark,
            closed_with: None,
        };

        session.notify(Notification::Created);
        session.notify(Notification::DialogConstructed);
        session.pump();
        session.mark = session.current_mark();

        while session.closed_with.is_none() {
            session.pump();
            if session.closed_with.is_some() {
                break;
            }
            let Some(step) = self.script.pop_front() else {
                tracing::debug!("Script exhausted - cancelling dialog");
                session.closed_with = Some(IDCANCEL);
                break;
            };
            session.perform(step);
        }

        session.notify(Notification::Destroyed);
        Ok(DialogOutcome {
            selected_button_id: session.closed_with.unwrap_or(IDCANCEL),
            selected_radio_id: session.selected_radio,
            verification_checked: session.verification,
        })
    }
}

/// State of one running scripted dialog
struct Session<'a> {
    page: FrozenPage,
    callback: Arc<dyn PageCallback>,
    window: Arc<dyn DialogWindow>,
    rx: mpsc::UnboundedReceiver<WindowMessage>,
    log: CommandLog,
    link_pattern: &'a Regex,
    clock: Duration,
    baseline: Duration,
    disabled: HashSet<i32>,
    selected_radio: i32,
    verification: bool,
    expanded: bool,
    applied: usize,
    mark: Mark,
    closed_with: Option<i32>,
}

/// Window position the await steps measure host replies against. Taken when a
/// user action starts, so replies pumped before the next step still count.
#[derive(Debug, Clone, Copy)]
struct Mark {
    applied: usize,
    dialog: DialogId,
}

impl Session<'_> {
    fn notify(&self, notification: Notification) -> Reply {
        self.callback.notify(&self.window, notification)
    }

    /// Apply every window message already waiting
    fn pump(&mut self) {
        while self.closed_with.is_none() {
            match self.rx.try_recv() {
                Ok(message) => self.apply(message),
                Err(_) => break,
            }
        }
    }

    fn current_mark(&self) -> Mark {
        Mark {
            applied: self.applied,
            dialog: self.page.dialog,
        }
    }

    fn perform(&mut self, step: ScriptStep) {
        tracing::trace!(?step, "Performing script step");
        if !matches!(step, ScriptStep::AwaitNavigation | ScriptStep::AwaitCommand) {
            self.mark = self.current_mark();
        }
        match step {
            ScriptStep::Click(button_id) => self.press(button_id),
            ScriptStep::ClickRadio(button_id) => self.select_radio(button_id),
            ScriptStep::ToggleVerification => {
                if self.page.config.verification_text.is_some() {
                    self.set_verification(!self.verification);
                }
            }
            ScriptStep::ClickLink(href) => self.click_link(href),
            ScriptStep::ToggleExpando => {
                if self.page.config.expanded_information.is_some() {
                    self.expanded = !self.expanded;
                    self.notify(Notification::ExpandoButtonClicked(self.expanded));
                }
            }
            ScriptStep::Help => {
                self.notify(Notification::Help);
            }
            ScriptStep::Advance(by) => self.advance(by),
            ScriptStep::AwaitNavigation => {
                let from = self.mark.dialog;
                self.await_host(|session| session.page.dialog != from);
                self.mark = self.current_mark();
            }
            ScriptStep::AwaitCommand => {
                let seen = self.mark.applied;
                self.await_host(|session| session.applied > seen);
                self.mark = self.current_mark();
            }
            ScriptStep::Close => self.close_from_frame(),
        }
    }

    fn close_from_frame(&mut self) {
        let config = &self.page.config;
        if !config.flags.cancelable && !config.common_buttons.cancel {
            tracing::debug!(dialog = %self.page.dialog, "Page is not cancelable - frame close ignored");
            return;
        }
        if self.notify(Notification::ButtonClicked(IDCANCEL)) != Reply::KeepOpen {
            self.closed_with = Some(IDCANCEL);
        }
    }

    fn press(&mut self, button_id: i32) {
        if self.disabled.contains(&button_id) {
            tracing::debug!(button_id, "Click on disabled button ignored");
            return;
        }
        if !self.page.clickable_ids().contains(&button_id) {
            tracing::warn!(button_id, "Click on unknown button ignored");
            return;
        }
        if self.notify(Notification::ButtonClicked(button_id)) != Reply::KeepOpen {
            self.closed_with = Some(button_id);
        }
    }

    fn select_radio(&mut self, button_id: i32) {
        let known = self.page.radio_buttons.iter().any(|r| r.id == button_id);
        if !known || self.disabled.contains(&button_id) {
            tracing::debug!(button_id, "Radio click ignored");
            return;
        }
        self.selected_radio = button_id;
        self.notify(Notification::RadioButtonClicked(button_id));
    }

    fn set_verification(&mut self, checked: bool) {
        self.verification = checked;
        self.notify(Notification::VerificationClicked(checked));
    }

    fn click_link(&mut self, href: String) {
        if !self.page.config.flags.use_links {
            tracing::debug!(%href, "Links are disabled - click ignored");
            return;
        }
        let present = self.page.config.link_bearing_text().any(|text| {
            self.link_pattern
                .captures_iter(text)
                .any(|anchor| &anchor[1] == href)
        });
        if present {
            self.notify(Notification::HyperlinkClicked(href));
        } else {
            tracing::warn!(%href, "No anchor with this href on the page");
        }
    }

    fn advance(&mut self, by: Duration) {
        self.clock += by;
        if !self.page.config.flags.use_timer {
            return;
        }
        let elapsed = self.clock - self.baseline;
        if self.notify(Notification::Timer(elapsed)) == Reply::ResetTimer {
            self.baseline = self.clock;
        }
    }

    /// Apply window messages as they arrive until `done` holds or the dialog closes
    fn await_host(&mut self, done: impl Fn(&Self) -> bool) {
        let deadline = Instant::now() + HOST_TIMEOUT;

        while !done(self) && self.closed_with.is_none() {
            match self.rx.try_recv() {
                Ok(message) => self.apply(message),
                Err(mpsc::error::TryRecvError::Empty) => {
                    if Instant::now() >= deadline {
                        tracing::warn!("Timed out waiting for the host");
                        return;
                    }
                    std::thread::sleep(Duration::from_millis(1));
                }
                Err(mpsc::error::TryRecvError::Disconnected) => return,
            }
        }
    }

    fn apply(&mut self, message: WindowMessage) {
        self.applied += 1;
        let command = match message {
            WindowMessage::Navigate(page, callback) => {
                self.navigate(page, callback);
                return;
            }
            WindowMessage::Command(command) => command,
        };
        self.log.push(command.clone());

        match command {
            WindowCommand::SetTitle(title) => self.page.config.window_title = Some(title),
            WindowCommand::SetElementText(element, text) => {
                let config = &mut self.page.config;
                let slot = match element {
                    DialogElement::Content => &mut config.content,
                    DialogElement::ExpandedInformation => &mut config.expanded_information,
                    DialogElement::Footer => &mut config.footer,
                    DialogElement::MainInstruction => &mut config.main_instruction,
                };
                *slot = Some(text);
            }
            WindowCommand::UpdateIcon(IconSlot::Main, icon) => self.page.config.main_icon = icon,
            WindowCommand::UpdateIcon(IconSlot::Footer, icon) => {
                self.page.config.footer_icon = icon
            }
            WindowCommand::ClickButton(button_id) => self.press(button_id),
            WindowCommand::ClickRadioButton(button_id) => self.select_radio(button_id),
            WindowCommand::ClickVerification { checked, .. } => self.set_verification(checked),
            WindowCommand::EnableButton(button_id, enable)
            | WindowCommand::EnableRadioButton(button_id, enable) => {
                if enable {
                    self.disabled.remove(&button_id);
                } else {
                    self.disabled.insert(button_id);
                }
            }
            WindowCommand::ProgressBarMarquee { .. }
            | WindowCommand::ProgressBarState(_)
            | WindowCommand::ProgressBarRange(..)
            | WindowCommand::ProgressBarPosition(_)
            | WindowCommand::ElevationRequired(..)
            | WindowCommand::Navigate(_) => {}
        }
    }

    fn navigate(&mut self, page: FrozenPage, callback: Arc<dyn PageCallback>) {
        self.log.push(WindowCommand::Navigate(page.dialog));
        tracing::debug!(from = %self.page.dialog, to = %page.dialog, "Scripted dialog navigating");

        self.selected_radio = page.default_radio();
        self.page = page;
        self.callback = callback;
        self.disabled.clear();
        self.verification = false;
        self.expanded = false;
        self.baseline = self.clock;

        self.notify(Notification::DialogConstructed);
        self.notify(Notification::Navigated);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ButtonSpec, DialogConfig};

    /// Records notifications and answers from a fixed policy
    struct Recorder {
        seen: Mutex<Vec<Notification>>,
        keep_open: HashSet<i32>,
        reset_on_tick: bool,
    }

    impl Recorder {
        fn new() -> Arc<Self> {
            Self::with_policy(&[], false)
        }

        fn with_policy(keep_open: &[i32], reset_on_tick: bool) -> Arc<Self> {
            Arc::new(Self {
                seen: Mutex::new(Vec::new()),
                keep_open: keep_open.iter().copied().collect(),
                reset_on_tick,
            })
        }

        fn seen(&self) -> Vec<Notification> {
            self.seen.lock().unwrap().clone()
        }
    }

    impl PageCallback for Recorder {
        fn notify(&self, _window: &Arc<dyn DialogWindow>, notification: Notification) -> Reply {
            let reply = match &notification {
                Notification::ButtonClicked(id) if self.keep_open.contains(id) => Reply::KeepOpen,
                Notification::Timer(_) if self.reset_on_tick => Reply::ResetTimer,
                _ => Reply::Continue,
            };
            self.seen.lock().unwrap().push(notification);
            reply
        }
    }

    /// Answers every notification through a closure, with access to the window
    struct Replier<F>(F);

    impl<F> PageCallback for Replier<F>
    where
        F: Fn(&Arc<dyn DialogWindow>, &Notification) -> Reply + Send + Sync,
    {
        fn notify(&self, window: &Arc<dyn DialogWindow>, notification: Notification) -> Reply {
            (self.0)(window, &notification)
        }
    }

    fn page() -> FrozenPage {
        FrozenPage {
            dialog: DialogId::next(),
            config: DialogConfig {
                content: Some(r#"See <a href="https://example.com/docs">the docs</a>."#.into()),
                verification_text: Some("Do not ask again".into()),
                ..DialogConfig::default()
            },
            buttons: vec![
                ButtonSpec { id: 101, label: "Yes".into() },
                ButtonSpec { id: 102, label: "No".into() },
            ],
            radio_buttons: vec![
                ButtonSpec { id: 101, label: "Low".into() },
                ButtonSpec { id: 102, label: "High".into() },
            ],
        }
    }

    #[test]
    fn test_click_closes_with_button_id() {
        let recorder = Recorder::new();
        let mut dialog = ScriptedDialog::new([ScriptStep::Click(102)]);

        let outcome = dialog.run_modal(None, page(), recorder.clone()).unwrap();

        assert_eq!(outcome.selected_button_id, 102);
        assert_eq!(outcome.selected_radio_id, 101);
        assert!(!outcome.verification_checked);
        assert_eq!(
            recorder.seen(),
            vec![
                Notification::Created,
                Notification::DialogConstructed,
                Notification::ButtonClicked(102),
                Notification::Destroyed,
            ]
        );
    }

    #[test]
    fn test_keep_open_reply_prevents_close() {
        let recorder = Recorder::with_policy(&[101], false);
        let mut dialog = ScriptedDialog::new([
            ScriptStep::Click(101),
            ScriptStep::ClickRadio(102),
            ScriptStep::ToggleVerification,
            ScriptStep::Click(102),
        ]);

        let outcome = dialog.run_modal(None, page(), recorder).unwrap();

        assert_eq!(outcome.selected_button_id, 102);
        assert_eq!(outcome.selected_radio_id, 102);
        assert!(outcome.verification_checked);
    }

    #[test]
    fn test_exhausted_script_cancels() {
        let mut dialog = ScriptedDialog::new(Vec::new());
        let outcome = dialog.run_modal(None, page(), Recorder::new()).unwrap();
        assert_eq!(outcome.selected_button_id, IDCANCEL);
    }

    #[test]
    fn test_links_require_flag_and_anchor() {
        let recorder = Recorder::new();
        let mut with_links = page();
        with_links.config.flags.use_links = true;

        let mut dialog = ScriptedDialog::new([
            ScriptStep::ClickLink("https://example.com/docs".into()),
            ScriptStep::ClickLink("https://example.com/missing".into()),
        ]);
        dialog.run_modal(None, with_links, recorder.clone()).unwrap();
        assert!(
            recorder
                .seen()
                .contains(&Notification::HyperlinkClicked("https://example.com/docs".into()))
        );
        assert!(
            !recorder
                .seen()
                .contains(&Notification::HyperlinkClicked("https://example.com/missing".into()))
        );

        let recorder = Recorder::new();
        let mut dialog = ScriptedDialog::new([ScriptStep::ClickLink("https://example.com/docs".into())]);
        dialog.run_modal(None, page(), recorder.clone()).unwrap();
        assert!(
            !recorder
                .seen()
                .iter()
                .any(|n| matches!(n, Notification::HyperlinkClicked(_)))
        );
    }

    #[test]
    fn test_timer_elapsed_and_reset_baseline() {
        let recorder = Recorder::with_policy(&[], true);
        let mut timed = page();
        timed.config.flags.use_timer = true;

        let mut dialog = ScriptedDialog::new([
            ScriptStep::Advance(Duration::from_millis(300)),
            ScriptStep::Advance(Duration::from_millis(200)),
            ScriptStep::Close,
        ]);
        dialog.run_modal(None, timed, recorder.clone()).unwrap();

        let ticks: Vec<Duration> = recorder
            .seen()
            .into_iter()
            .filter_map(|n| match n {
                Notification::Timer(elapsed) => Some(elapsed),
                _ => None,
            })
            .collect();
        assert_eq!(ticks, vec![Duration::from_millis(300), Duration::from_millis(200)]);
    }

    #[test]
    fn test_no_timer_ticks_without_flag() {
        let recorder = Recorder::new();
        let mut dialog = ScriptedDialog::new([ScriptStep::Advance(Duration::from_secs(1))]);
        dialog.run_modal(None, page(), recorder.clone()).unwrap();
        assert!(
            !recorder
                .seen()
                .iter()
                .any(|n| matches!(n, Notification::Timer(_)))
        );
    }

    #[test]
    fn test_await_command_sees_reply_to_previous_click() {
        let callback = Arc::new(Replier(|window: &Arc<dyn DialogWindow>, notification: &Notification| {
            match notification {
                Notification::ButtonClicked(101) => {
                    window.set_title("pong");
                    Reply::KeepOpen
                }
                _ => Reply::Continue,
            }
        }));
        let mut dialog = ScriptedDialog::new([
            ScriptStep::Click(101),
            ScriptStep::AwaitCommand,
            ScriptStep::Click(102),
        ]);
        let log = dialog.command_log();

        let started = Instant::now();
        let outcome = dialog.run_modal(None, page(), callback).unwrap();

        assert!(started.elapsed() < HOST_TIMEOUT / 5);
        assert_eq!(outcome.selected_button_id, 102);
        assert_eq!(log.snapshot(), vec![WindowCommand::SetTitle("pong".into())]);
    }

    #[test]
    fn test_await_navigation_sees_earlier_navigate() {
        let target = Recorder::new();
        let mut next = page();
        next.dialog = DialogId::next();
        let next_id = next.dialog;

        let handoff = Arc::clone(&target);
        let callback = Arc::new(Replier(move |window: &Arc<dyn DialogWindow>, notification: &Notification| {
            match notification {
                Notification::ButtonClicked(101) => {
                    window.navigate_page(next.clone(), handoff.clone());
                    Reply::KeepOpen
                }
                _ => Reply::Continue,
            }
        }));
        let mut dialog = ScriptedDialog::new([
            ScriptStep::Click(101),
            ScriptStep::AwaitNavigation,
            ScriptStep::Click(102),
        ]);
        let log = dialog.command_log();

        let started = Instant::now();
        let outcome = dialog.run_modal(None, page(), callback).unwrap();

        assert!(started.elapsed() < HOST_TIMEOUT / 5);
        assert_eq!(outcome.selected_button_id, 102);
        assert_eq!(log.snapshot(), vec![WindowCommand::Navigate(next_id)]);
        assert_eq!(
            target.seen(),
            vec![
                Notification::DialogConstructed,
                Notification::Navigated,
                Notification::ButtonClicked(102),
                Notification::Destroyed,
            ]
        );
    }

    #[test]
    fn test_frame_close_needs_cancelable_page() {
        let recorder = Recorder::new();
        let mut dialog = ScriptedDialog::new([ScriptStep::Close, ScriptStep::Click(102)]);
        let outcome = dialog.run_modal(None, page(), recorder.clone()).unwrap();

        assert_eq!(outcome.selected_button_id, 102);
        assert!(!recorder.seen().contains(&Notification::ButtonClicked(IDCANCEL)));

        let mut cancelable = page();
        cancelable.config.flags.cancelable = true;
        let mut dialog = ScriptedDialog::new([ScriptStep::Close, ScriptStep::Click(102)]);
        let outcome = dialog.run_modal(None, cancelable, Recorder::new()).unwrap();
        assert_eq!(outcome.selected_button_id, IDCANCEL);

        let mut with_cancel_button = page();
        with_cancel_button.config.common_buttons.cancel = true;
        let mut dialog = ScriptedDialog::new([ScriptStep::Close]);
        let outcome = dialog.run_modal(None, with_cancel_button, Recorder::new()).unwrap();
        assert_eq!(outcome.selected_button_id, IDCANCEL);
    }
}
