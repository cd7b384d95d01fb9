// Dialog Controller - host-facing TaskDialog wired to the event bridge
//
// This module contains the TaskDialog which coordinates between:
// - DialogEngine (page state machine, shared with the worker thread)
// - EventBridge (worker -> host event delivery)
// - NativeDialog (the blocking modal primitive, run on tokio's blocking pool)
//
// It handles:
// - Staging configuration before show and updating the live window after
// - Turning every dialog interaction into a bridge event
// - Navigation from one page to another inside the same window
// - Resolving the final outcome into host button keys

use crate::bridge::{
    BridgeProducer, CallbackSink, DialogId, Event, EventBridge, EventName, HostValue, Payload,
    run_blocking,
};
use crate::engine::{
    ButtonAction, DialogElement, DialogEngine, DialogHooks, DialogWindow, NativeDialog,
    ParentWindow,
};
use crate::error::{DialogError, DialogResult};
use crate::models::{
    ButtonDefinition, ButtonList, CommonButtons, DialogConfig, DialogFlags, Icon, IconSlot,
    PageDefinition, ProgressBarState, RadioDefinition, ResolvedOutcome,
};
use crate::state::{PageState, StateChange};
use std::rc::Rc;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;

/// Decides on the worker thread whether a click on a (non message-only) button keeps
/// the dialog open
pub type KeepOpenPolicy = Arc<dyn Fn(i32) -> bool + Send + Sync>;

type SharedPolicy = Arc<RwLock<Option<KeepOpenPolicy>>>;

/// Engine hooks that forward every interaction to the bridge
struct BridgeHooks {
    dialog: DialogId,
    producer: BridgeProducer,
    keep_open: SharedPolicy,
}

impl BridgeHooks {
    fn raise(&self, name: EventName, payload: impl Into<Payload>) {
        self.producer.enqueue(Event::new(self.dialog, name, payload));
    }
}

impl DialogHooks for BridgeHooks {
    fn on_constructed(&self) {
        self.producer.enqueue(Event::bare(self.dialog, EventName::Loaded));
    }

    fn on_navigated(&self) {
        self.producer.enqueue(Event::bare(self.dialog, EventName::Navigated));
    }

    fn on_hyperlink(&self, href: &str) {
        self.raise(EventName::LinkClicked, href);
    }

    fn on_button(&self, button_id: i32) -> ButtonAction {
        self.raise(EventName::ButtonClicked, button_id);

        let policy = self
            .keep_open
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match policy {
            Some(keep_open) if keep_open(button_id) => ButtonAction::KeepOpen,
            _ => ButtonAction::Close,
        }
    }

    fn on_radio(&self, button_id: i32) {
        self.raise(EventName::RadioClicked, button_id);
    }

    fn on_verification(&self, checked: bool) {
        self.raise(EventName::VerificationClicked, checked);
    }

    fn on_expando(&self, expanded: bool) {
        self.raise(EventName::ExpandoClicked, expanded);
    }

    fn on_timer(&self, elapsed: Duration) -> bool {
        self.raise(EventName::Timer, elapsed);
        false
    }

    fn on_help(&self) {
        tracing::debug!(dialog = %self.dialog, "Help requested");
    }
}

/// A task dialog page, owned by the host thread
///
/// Configuration set before [`show()`](Self::show) is staged; once the page is shown,
/// text and icon setters update the live window in place. Every interaction is
/// delivered to the sink registered with [`set_sink()`](Self::set_sink), on the host
/// thread, in the order it happened.
///
/// # Example
/// ```ignore
/// let host = HostLoop::new()?;
/// let dialog = TaskDialog::new(host.bridge());
/// dialog.set_window_title("Example");
/// dialog.set_buttons(vec![ButtonDefinition::new("yes", "Yes"), ButtonDefinition::new("no", "No")])?;
/// dialog.set_sink(|name, value| println!("{name}: {value:?}"));
///
/// let outcome = host.block_on(dialog.show_async(ScriptedDialog::new([ScriptStep::Click(102)]), None))?;
/// assert_eq!(outcome.button.as_deref(), Some("no"));
/// ```
pub struct TaskDialog {
    /// Bridge this page reports to
    bridge: Rc<EventBridge>,

    /// Page state machine, shared with the dialog worker thread
    engine: Arc<DialogEngine>,

    /// Keep-open policy read by the worker thread on button clicks
    keep_open: SharedPolicy,
}

impl TaskDialog {
    /// Create an unshown page reporting to `bridge`
    pub fn new(bridge: &Rc<EventBridge>) -> Self {
        let dialog = DialogId::next();
        let keep_open: SharedPolicy = Arc::new(RwLock::new(None));
        let hooks = BridgeHooks {
            dialog,
            producer: bridge.producer(),
            keep_open: Arc::clone(&keep_open),
        };

        tracing::debug!(%dialog, "Task dialog created");
        Self {
            bridge: Rc::clone(bridge),
            engine: Arc::new(DialogEngine::new(dialog, Box::new(hooks))),
            keep_open,
        }
    }

    /// Create a page from a stored definition
    ///
    /// # Arguments
    /// * `bridge` - Bridge the page reports to
    /// * `definition` - Text, flags, buttons and progress settings
    ///
    /// # Returns
    /// The configured page, or an error for a malformed button list or an icon
    /// without its text
    pub fn from_definition(
        bridge: &Rc<EventBridge>,
        definition: &PageDefinition,
    ) -> DialogResult<Self> {
        if let Some(slot) = definition.config.icon_text_missing() {
            return Err(DialogError::IconWithoutText(slot));
        }

        let dialog = Self::new(bridge);
        dialog.engine.update_config(|config| *config = definition.config.clone());
        dialog.set_buttons(definition.buttons.clone())?;
        dialog.set_radio_buttons(definition.radio_buttons.clone())?;
        dialog
            .engine
            .update_progress(|progress| *progress = definition.progress);
        Ok(dialog)
    }

    pub fn id(&self) -> DialogId {
        self.engine.dialog()
    }

    pub fn state(&self) -> PageState {
        self.engine.state().current()
    }

    pub fn is_visible(&self) -> bool {
        self.state() == PageState::Shown
    }

    /// Subscribe to this page's lifecycle transitions
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.engine.state().subscribe()
    }

    /// Snapshot of the staged configuration
    pub fn config(&self) -> DialogConfig {
        self.engine.config()
    }

    /// Deliver this page's events to `sink`, replacing any previous sink
    pub fn set_sink(&self, sink: impl CallbackSink + 'static) {
        self.bridge.register(self.id(), Rc::new(sink));
    }

    /// Set the worker-side decision for button clicks.
    ///
    /// The policy runs inside the dialog's own callback, before the click returns, so
    /// it must not wait on the host thread.
    pub fn set_keep_open_policy(&self, policy: impl Fn(i32) -> bool + Send + Sync + 'static) {
        *self
            .keep_open
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(policy));
    }

    // Text

    pub fn set_window_title(&self, title: impl Into<String>) {
        let title = title.into();
        self.engine
            .update_config(|config| config.window_title = Some(title.clone()));
        if let Some(window) = self.engine.live_window() {
            window.set_title(&title);
        }
    }

    pub fn set_main_instruction(&self, text: impl Into<String>) {
        self.set_element(DialogElement::MainInstruction, text.into());
    }

    pub fn set_content(&self, text: impl Into<String>) {
        self.set_element(DialogElement::Content, text.into());
    }

    pub fn set_footer(&self, text: impl Into<String>) {
        self.set_element(DialogElement::Footer, text.into());
    }

    pub fn set_expanded_information(&self, text: impl Into<String>) {
        self.set_element(DialogElement::ExpandedInformation, text.into());
    }

    /// Staged only; the window keeps the label it was shown with
    pub fn set_verification_text(&self, text: impl Into<String>) {
        let text = text.into();
        self.engine
            .update_config(|config| config.verification_text = Some(text));
    }

    /// Staged only
    pub fn set_expanded_control_text(&self, text: impl Into<String>) {
        let text = text.into();
        self.engine
            .update_config(|config| config.expanded_control_text = Some(text));
    }

    /// Staged only
    pub fn set_collapsed_control_text(&self, text: impl Into<String>) {
        let text = text.into();
        self.engine
            .update_config(|config| config.collapsed_control_text = Some(text));
    }

    fn set_element(&self, element: DialogElement, text: String) {
        self.engine.update_config(|config| {
            let slot = match element {
                DialogElement::Content => &mut config.content,
                DialogElement::ExpandedInformation => &mut config.expanded_information,
                DialogElement::Footer => &mut config.footer,
                DialogElement::MainInstruction => &mut config.main_instruction,
            };
            *slot = Some(text.clone());
        });
        if let Some(window) = self.engine.live_window() {
            window.set_element_text(element, &text);
        }
    }

    // Icons

    /// Set the main icon. Requires a main instruction.
    pub fn set_main_icon(&self, icon: Icon) -> DialogResult<()> {
        self.set_icon(IconSlot::Main, icon)
    }

    /// Set the footer icon. Requires a footer.
    pub fn set_footer_icon(&self, icon: Icon) -> DialogResult<()> {
        self.set_icon(IconSlot::Footer, icon)
    }

    fn set_icon(&self, slot: IconSlot, icon: Icon) -> DialogResult<()> {
        let has_text = self.engine.with_config(|config| match slot {
            IconSlot::Main => config.main_instruction.is_some(),
            IconSlot::Footer => config.footer.is_some(),
        });
        if !has_text {
            return Err(DialogError::IconWithoutText(slot));
        }

        self.engine.update_config(|config| match slot {
            IconSlot::Main => config.main_icon = icon,
            IconSlot::Footer => config.footer_icon = icon,
        });
        if let Some(window) = self.engine.live_window() {
            window.update_icon(slot, icon);
        }
        Ok(())
    }

    // Structural options, locked once shown

    fn ensure_unshown(&self, option: &'static str) -> DialogResult<()> {
        if self.state() == PageState::Unshown {
            Ok(())
        } else {
            Err(DialogError::OptionLocked(option))
        }
    }

    pub fn set_flags(&self, flags: DialogFlags) -> DialogResult<()> {
        self.ensure_unshown("flags")?;
        self.engine.update_config(|config| config.flags = flags);
        Ok(())
    }

    pub fn set_common_buttons(&self, buttons: CommonButtons) -> DialogResult<()> {
        self.ensure_unshown("common_buttons")?;
        self.engine
            .update_config(|config| config.common_buttons = buttons);
        Ok(())
    }

    /// Replace the custom buttons; ids are assigned from 101 in the given order
    pub fn set_buttons(&self, definitions: Vec<ButtonDefinition>) -> DialogResult<()> {
        self.ensure_unshown("buttons")?;
        self.engine
            .set_buttons(ButtonList::from_definitions(&definitions)?);
        Ok(())
    }

    pub fn set_radio_buttons(&self, definitions: Vec<RadioDefinition>) -> DialogResult<()> {
        self.ensure_unshown("radio_buttons")?;
        self.engine
            .set_radio_buttons(ButtonList::from_radio_definitions(&definitions)?);
        Ok(())
    }

    /// Native id of the custom button created for `key`
    pub fn button_id(&self, key: &str) -> Option<i32> {
        self.engine.buttons().id_for(key)
    }

    pub fn radio_button_id(&self, key: &str) -> Option<i32> {
        self.engine.radio_buttons().id_for(key)
    }

    /// Host key for a `click:button` payload
    pub fn button_key(&self, value: &HostValue) -> Option<String> {
        let id = value.as_number()? as i32;
        self.engine.buttons().key_for(id)
    }

    /// Host key for a `click:radio` payload
    pub fn radio_key(&self, value: &HostValue) -> Option<String> {
        let id = value.as_number()? as i32;
        self.engine.radio_buttons().key_for(id)
    }

    // Progress bar: staged before show, re-applied when the window is constructed

    pub fn set_progress_bar_marquee(&self, marquee: bool, speed: u32) {
        self.engine.update_progress(|progress| {
            progress.marquee = marquee;
            progress.marquee_speed = speed;
        });
        if let Some(window) = self.engine.live_window() {
            window.set_progress_bar_marquee(marquee, speed);
        }
    }

    pub fn set_progress_bar_state(&self, state: ProgressBarState) {
        self.engine
            .update_progress(|progress| progress.state = Some(state));
        if let Some(window) = self.engine.live_window() {
            window.set_progress_bar_state(state);
        }
    }

    pub fn set_progress_bar_range(&self, min: u16, max: u16) {
        self.engine
            .update_progress(|progress| progress.range = (min, max));
        if let Some(window) = self.engine.live_window() {
            window.set_progress_bar_range(min, max);
        }
    }

    pub fn set_progress_bar_position(&self, position: i32) {
        self.engine
            .update_progress(|progress| progress.position = Some(position));
        if let Some(window) = self.engine.live_window() {
            window.set_progress_bar_position(position);
        }
    }

    // Window commands, only while shown

    fn window(&self) -> DialogResult<Arc<dyn DialogWindow>> {
        self.engine.live_window().ok_or_else(|| match self.state() {
            PageState::Detached => DialogError::Detached,
            _ => DialogError::NotShown,
        })
    }

    pub fn click_button(&self, button_id: i32) -> DialogResult<()> {
        self.window()?.click_button(button_id);
        Ok(())
    }

    pub fn click_radio_button(&self, button_id: i32) -> DialogResult<()> {
        self.window()?.click_radio_button(button_id);
        Ok(())
    }

    pub fn click_verification(&self, checked: bool, set_focus: bool) -> DialogResult<()> {
        self.window()?.click_verification(checked, set_focus);
        Ok(())
    }

    pub fn enable_button(&self, button_id: i32, enable: bool) -> DialogResult<()> {
        self.window()?.enable_button(button_id, enable);
        Ok(())
    }

    pub fn enable_radio_button(&self, button_id: i32, enable: bool) -> DialogResult<()> {
        self.window()?.enable_radio_button(button_id, enable);
        Ok(())
    }

    pub fn set_button_elevation_required(&self, button_id: i32, required: bool) -> DialogResult<()> {
        self.window()?
            .set_button_elevation_required(button_id, required);
        Ok(())
    }

    /// Make the next timer tick report zero and restart the baseline.
    ///
    /// # Returns
    /// `false` (and does nothing) unless the page uses the timer and is shown
    pub fn reset_timer(&self) -> bool {
        let use_timer = self.engine.with_config(|config| config.flags.use_timer);
        if !use_timer || !self.is_visible() {
            return false;
        }
        self.engine.request_timer_reset();
        true
    }

    // Lifecycle

    /// Show the page modally on a worker thread
    ///
    /// Opens a session on the bridge for the whole navigation chain started here. When
    /// the modal call returns, any remaining events are dispatched first, then the
    /// session is released and `on_complete` runs on the host thread. Must be called
    /// from inside the host loop.
    ///
    /// # Arguments
    /// * `native` - The modal dialog primitive to run
    /// * `parent` - Owner window, if any
    /// * `on_complete` - Receives the outcome resolved against the final page
    ///
    /// # Returns
    /// The completion task, or [`DialogError::AlreadyShown`] / [`DialogError::Detached`]
    /// if this page cannot be shown
    pub fn show<N, F>(
        &self,
        native: N,
        parent: Option<ParentWindow>,
        on_complete: F,
    ) -> DialogResult<JoinHandle<()>>
    where
        N: NativeDialog + 'static,
        F: FnOnce(DialogResult<ResolvedOutcome>) + 'static,
    {
        let page = self.engine.begin_show()?;
        let session = self.bridge.acquire_session();

        let worker_engine = Arc::clone(&self.engine);
        let engine = Arc::clone(&self.engine);
        let bridge = Rc::clone(&self.bridge);
        let mut native = native;

        Ok(run_blocking(
            move || worker_engine.run_modal(&mut native, parent, page),
            move |joined| {
                // Events raised before the modal call returned are still queued
                bridge.drain_and_dispatch();
                drop(session);

                let result = match joined {
                    Ok(Ok(raw)) => {
                        let final_page = engine.final_page();
                        Ok(ResolvedOutcome::resolve(
                            raw,
                            &final_page.buttons(),
                            &final_page.radio_buttons(),
                        ))
                    }
                    Ok(Err(e)) => Err(e),
                    Err(e) => {
                        tracing::error!("Dialog worker failed: {}", e);
                        Err(DialogError::WorkerPanicked(e.to_string()))
                    }
                };
                on_complete(result);
            },
        ))
    }

    /// [`show()`](Self::show), awaiting the outcome
    pub async fn show_async<N>(
        &self,
        native: N,
        parent: Option<ParentWindow>,
    ) -> DialogResult<ResolvedOutcome>
    where
        N: NativeDialog + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.show(native, parent, move |result| {
            let _ = tx.send(result);
        })?;
        rx.await
            .map_err(|_| DialogError::WorkerPanicked("completion was dropped".to_string()))?
    }

    /// Replace this page with `target` inside the live window
    ///
    /// `target` keeps reporting to the same bridge and inherits the running session;
    /// this page becomes detached and can be neither shown nor navigated again.
    pub fn navigate(&self, target: &TaskDialog) -> DialogResult<()> {
        match self.state() {
            PageState::Shown => {}
            PageState::Detached => return Err(DialogError::Detached),
            _ => return Err(DialogError::NotShown),
        }
        if target.state() != PageState::Unshown {
            return Err(DialogError::TargetAlreadyShown);
        }
        if !self.bridge.same_as(&target.bridge) {
            return Err(DialogError::ForeignBridge);
        }

        self.engine.navigate(&target.engine)
    }

    /// Outcome of the modal session, if this page was the last one shown
    pub fn outcome(&self) -> Option<ResolvedOutcome> {
        let raw = self.engine.outcome()?;
        Some(ResolvedOutcome::resolve(
            raw,
            &self.engine.buttons(),
            &self.engine.radio_buttons(),
        ))
    }
}

impl Drop for TaskDialog {
    fn drop(&mut self) {
        self.bridge.unregister(self.id());
    }
}
