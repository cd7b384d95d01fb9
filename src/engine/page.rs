use super::{
    ButtonAction, DialogHooks, DialogWindow, FrozenPage, NativeDialog, Notification,
    PageCallback, ParentWindow, Reply,
};
use crate::bridge::{DialogId, read_lock, write_lock};
use crate::error::{DialogError, DialogResult};
use crate::models::{
    ButtonList, DialogConfig, DialogOutcome, ProgressSettings, is_message_only,
};
use crate::state::{PageState, PageStateManager};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// Mutable page data, guarded by one lock.
///
/// Never hold this lock across a window call or a hook call: both may re-enter the
/// engine from another thread.
#[derive(Default)]
struct PageInner {
    config: DialogConfig,
    buttons: ButtonList,
    radio_buttons: ButtonList,
    progress: ProgressSettings,
    window: Option<Arc<dyn DialogWindow>>,
    navigated_to: Option<Arc<DialogEngine>>,
    outcome: Option<DialogOutcome>,
}

/// State machine for one dialog page.
///
/// Shared between the host thread, which stages configuration and issues window
/// commands, and the worker thread, where the native dialog calls
/// [`PageCallback::notify`].
pub struct DialogEngine {
    dialog: DialogId,
    state: PageStateManager,
    inner: RwLock<PageInner>,
    reset_timer: AtomicBool,
    hooks: Box<dyn DialogHooks>,
}

impl DialogEngine {
    pub fn new(dialog: DialogId, hooks: Box<dyn DialogHooks>) -> Self {
        Self {
            dialog,
            state: PageStateManager::new(dialog),
            inner: RwLock::new(PageInner::default()),
            reset_timer: AtomicBool::new(false),
            hooks,
        }
    }

    pub fn dialog(&self) -> DialogId {
        self.dialog
    }

    pub fn state(&self) -> &PageStateManager {
        &self.state
    }

    pub fn config(&self) -> DialogConfig {
        read_lock(&self.inner).config.clone()
    }

    /// Read the staged configuration without cloning it
    pub fn with_config<R>(&self, f: impl FnOnce(&DialogConfig) -> R) -> R {
        f(&read_lock(&self.inner).config)
    }

    /// Change the staged configuration. Does not touch the live window.
    pub fn update_config<R>(&self, f: impl FnOnce(&mut DialogConfig) -> R) -> R {
        f(&mut write_lock(&self.inner).config)
    }

    pub fn buttons(&self) -> ButtonList {
        read_lock(&self.inner).buttons.clone()
    }

    pub fn radio_buttons(&self) -> ButtonList {
        read_lock(&self.inner).radio_buttons.clone()
    }

    pub fn set_buttons(&self, buttons: ButtonList) {
        write_lock(&self.inner).buttons = buttons;
    }

    pub fn set_radio_buttons(&self, radio_buttons: ButtonList) {
        write_lock(&self.inner).radio_buttons = radio_buttons;
    }

    pub fn progress(&self) -> ProgressSettings {
        read_lock(&self.inner).progress
    }

    pub fn update_progress(&self, f: impl FnOnce(&mut ProgressSettings)) {
        f(&mut write_lock(&self.inner).progress)
    }

    /// The window, while this page owns it
    pub fn live_window(&self) -> Option<Arc<dyn DialogWindow>> {
        if !self.state.is(PageState::Shown) {
            return None;
        }
        read_lock(&self.inner).window.clone()
    }

    /// Outcome of the modal session, once this page was the last one shown
    pub fn outcome(&self) -> Option<DialogOutcome> {
        read_lock(&self.inner).outcome
    }

    pub fn navigated_to(&self) -> Option<Arc<DialogEngine>> {
        read_lock(&self.inner).navigated_to.clone()
    }

    /// Last page of the navigation chain starting here
    pub fn final_page(self: &Arc<Self>) -> Arc<DialogEngine> {
        let mut page = Arc::clone(self);
        while let Some(next) = page.navigated_to() {
            page = next;
        }
        page
    }

    /// Ask for the next timer tick to report zero and restart the baseline
    pub fn request_timer_reset(&self) {
        self.reset_timer.store(true, Ordering::Release);
    }

    fn freeze(&self) -> DialogResult<FrozenPage> {
        let inner = read_lock(&self.inner);
        if let Some(slot) = inner.config.icon_text_missing() {
            return Err(DialogError::IconWithoutText(slot));
        }
        Ok(FrozenPage {
            dialog: self.dialog,
            config: inner.config.clone(),
            buttons: inner.buttons.specs().to_vec(),
            radio_buttons: inner.radio_buttons.specs().to_vec(),
        })
    }

    fn state_error(&self) -> DialogError {
        match self.state.current() {
            PageState::Detached => DialogError::Detached,
            PageState::Unshown => DialogError::NotShown,
            _ => DialogError::AlreadyShown,
        }
    }

    /// Freeze the page and mark it shown.
    ///
    /// Fails if the page was ever shown before or was used as a navigation target.
    pub fn begin_show(&self) -> DialogResult<FrozenPage> {
        if !self.state.is(PageState::Unshown) {
            return Err(self.state_error());
        }
        let page = self.freeze()?;
        self.state
            .transition(PageState::Shown)
            .ok_or_else(|| self.state_error())?;
        tracing::info!(dialog = %self.dialog, "Showing dialog page");
        Ok(page)
    }

    /// Run the modal session on the current (worker) thread.
    ///
    /// On return the outcome is stored on the final page of the navigation chain,
    /// which is moved to [`PageState::Closed`].
    pub fn run_modal(
        self: &Arc<Self>,
        native: &mut dyn NativeDialog,
        parent: Option<ParentWindow>,
        page: FrozenPage,
    ) -> DialogResult<DialogOutcome> {
        let callback: Arc<dyn PageCallback> = Arc::clone(self) as Arc<dyn PageCallback>;
        let result = native.run_modal(parent, page, callback);

        let final_page = self.final_page();
        match &result {
            Ok(outcome) => {
                tracing::info!(
                    dialog = %final_page.dialog,
                    button = outcome.selected_button_id,
                    radio = outcome.selected_radio_id,
                    verification = outcome.verification_checked,
                    "Dialog closed"
                );
                write_lock(&final_page.inner).outcome = Some(*outcome);
            }
            Err(e) => tracing::error!(dialog = %final_page.dialog, "Dialog failed: {}", e),
        }
        final_page.close();
        result
    }

    fn close(&self) {
        write_lock(&self.inner).window = None;
        self.state.transition(PageState::Closed);
    }

    /// Replace this page with `target` in the live window.
    ///
    /// `target` must never have been shown. This page is detached immediately; the
    /// target becomes shown once the window reports the navigation as done.
    pub fn navigate(self: &Arc<Self>, target: &Arc<DialogEngine>) -> DialogResult<()> {
        let source_error = |state: PageState| match state {
            PageState::Detached => DialogError::Detached,
            _ => DialogError::NotShown,
        };
        if !self.state.is(PageState::Shown) {
            return Err(source_error(self.state.current()));
        }
        let window = read_lock(&self.inner)
            .window
            .clone()
            .ok_or(DialogError::NotShown)?;

        if !target.state.is(PageState::Unshown) {
            return Err(DialogError::TargetAlreadyShown);
        }
        let page = target.freeze()?;

        // The window may be destroyed between the checks above and here
        if self.state.transition(PageState::Detached).is_none() {
            return Err(source_error(self.state.current()));
        }
        write_lock(&self.inner).window = None;

        if target.state.transition(PageState::Navigating).is_none() {
            tracing::warn!(from = %self.dialog, to = %target.dialog, "Navigation target was shown concurrently");
            return Err(DialogError::TargetAlreadyShown);
        }
        write_lock(&self.inner).navigated_to = Some(Arc::clone(target));

        tracing::info!(from = %self.dialog, to = %target.dialog, "Navigating dialog page");
        let callback: Arc<dyn PageCallback> = Arc::clone(target) as Arc<dyn PageCallback>;
        window.navigate_page(page, callback);
        Ok(())
    }

    fn attach(&self, window: &Arc<dyn DialogWindow>) {
        write_lock(&self.inner).window = Some(Arc::clone(window));
    }

    /// Push staged progress bar settings to a freshly constructed window
    fn apply_progress(&self, window: &Arc<dyn DialogWindow>) {
        let (enabled, progress) = {
            let inner = read_lock(&self.inner);
            (inner.config.flags.use_progress_bar, inner.progress)
        };
        if !enabled {
            return;
        }

        if progress.marquee {
            window.set_progress_bar_marquee(true, progress.marquee_speed);
        }
        window.set_progress_bar_range(progress.range.0, progress.range.1);
        if let Some(state) = progress.state {
            window.set_progress_bar_state(state);
        }
        if let Some(position) = progress.position {
            window.set_progress_bar_position(position);
        }
    }

    fn on_timer(&self, elapsed: Duration) -> Reply {
        if self.reset_timer.swap(false, Ordering::AcqRel) {
            self.hooks.on_timer(Duration::ZERO);
            return Reply::ResetTimer;
        }
        if self.hooks.on_timer(elapsed) {
            Reply::ResetTimer
        } else {
            Reply::Continue
        }
    }
}

impl PageCallback for DialogEngine {
    fn notify(&self, window: &Arc<dyn DialogWindow>, notification: Notification) -> Reply {
        tracing::trace!(dialog = %self.dialog, ?notification, "Dialog notification");

        match notification {
            Notification::Created => Reply::Continue,
            Notification::DialogConstructed => {
                self.attach(window);
                self.apply_progress(window);
                self.hooks.on_constructed();
                Reply::Continue
            }
            Notification::Navigated => {
                self.attach(window);
                self.state.transition(PageState::Shown);
                self.hooks.on_navigated();
                Reply::Continue
            }
            Notification::ButtonClicked(button_id) => {
                let action = self.hooks.on_button(button_id);
                if is_message_only(button_id) || action == ButtonAction::KeepOpen {
                    tracing::debug!(dialog = %self.dialog, button_id, "Button click keeps dialog open");
                    Reply::KeepOpen
                } else {
                    Reply::Continue
                }
            }
            Notification::HyperlinkClicked(href) => {
                self.hooks.on_hyperlink(&href);
                Reply::Continue
            }
            Notification::Timer(elapsed) => self.on_timer(elapsed),
            Notification::Destroyed => {
                self.close();
                Reply::Continue
            }
            Notification::RadioButtonClicked(button_id) => {
                self.hooks.on_radio(button_id);
                Reply::Continue
            }
            Notification::VerificationClicked(checked) => {
                self.hooks.on_verification(checked);
                Reply::Continue
            }
            Notification::Help => {
                self.hooks.on_help();
                Reply::Continue
            }
            Notification::ExpandoButtonClicked(expanded) => {
                self.hooks.on_expando(expanded);
                Reply::Continue
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{DefaultHooks, DialogElement, MockDialogHooks};
    use crate::models::{ButtonDefinition, Icon, IconSlot, ProgressBarState};
    use mockall::predicate::eq;

    struct NullWindow;

    impl DialogWindow for NullWindow {
        fn set_title(&self, _title: &str) {}
        fn set_element_text(&self, _element: DialogElement, _text: &str) {}
        fn update_icon(&self, _slot: IconSlot, _icon: Icon) {}
        fn click_button(&self, _button_id: i32) {}
        fn click_radio_button(&self, _button_id: i32) {}
        fn click_verification(&self, _checked: bool, _set_focus: bool) {}
        fn enable_button(&self, _button_id: i32, _enable: bool) {}
        fn enable_radio_button(&self, _button_id: i32, _enable: bool) {}
        fn set_progress_bar_marquee(&self, _marquee: bool, _speed: u32) {}
        fn set_progress_bar_state(&self, _state: ProgressBarState) {}
        fn set_progress_bar_range(&self, _min: u16, _max: u16) {}
        fn set_progress_bar_position(&self, _position: i32) {}
        fn set_button_elevation_required(&self, _button_id: i32, _required: bool) {}
        fn navigate_page(&self, _page: FrozenPage, _callback: Arc<dyn PageCallback>) {}
    }

    fn window() -> Arc<dyn DialogWindow> {
        Arc::new(NullWindow)
    }

    fn engine_with(hooks: MockDialogHooks) -> Arc<DialogEngine> {
        Arc::new(DialogEngine::new(DialogId::next(), Box::new(hooks)))
    }

    #[test]
    fn test_message_only_button_stays_open_regardless_of_hook() {
        let mut hooks = MockDialogHooks::new();
        hooks
            .expect_on_button()
            .with(eq(1101))
            .times(1)
            .return_const(ButtonAction::Close);
        let engine = engine_with(hooks);

        let reply = engine.notify(&window(), Notification::ButtonClicked(1101));
        assert_eq!(reply, Reply::KeepOpen);
    }

    #[test]
    fn test_regular_button_follows_hook_decision() {
        let mut hooks = MockDialogHooks::new();
        hooks
            .expect_on_button()
            .with(eq(101))
            .return_const(ButtonAction::KeepOpen);
        hooks
            .expect_on_button()
            .with(eq(102))
            .return_const(ButtonAction::Close);
        let engine = engine_with(hooks);

        assert_eq!(engine.notify(&window(), Notification::ButtonClicked(101)), Reply::KeepOpen);
        assert_eq!(engine.notify(&window(), Notification::ButtonClicked(102)), Reply::Continue);
    }

    #[test]
    fn test_timer_reset_reports_zero_once() {
        let mut hooks = MockDialogHooks::new();
        let mut seq = mockall::Sequence::new();
        hooks
            .expect_on_timer()
            .with(eq(Duration::from_millis(800)))
            .times(1)
            .in_sequence(&mut seq)
            .return_const(false);
        hooks
            .expect_on_timer()
            .with(eq(Duration::ZERO))
            .times(1)
            .in_sequence(&mut seq)
            .return_const(false);
        hooks
            .expect_on_timer()
            .with(eq(Duration::from_millis(200)))
            .times(1)
            .in_sequence(&mut seq)
            .return_const(false);
        let engine = engine_with(hooks);
        let window = window();

        assert_eq!(
            engine.notify(&window, Notification::Timer(Duration::from_millis(800))),
            Reply::Continue
        );
        engine.request_timer_reset();
        assert_eq!(
            engine.notify(&window, Notification::Timer(Duration::from_millis(1000))),
            Reply::ResetTimer
        );
        assert_eq!(
            engine.notify(&window, Notification::Timer(Duration::from_millis(200))),
            Reply::Continue
        );
    }

    #[test]
    fn test_constructed_attaches_window_and_calls_hook() {
        let mut hooks = MockDialogHooks::new();
        hooks.expect_on_constructed().times(1).return_const(());
        let engine = engine_with(hooks);

        engine.begin_show().unwrap();
        assert!(engine.live_window().is_none());

        engine.notify(&window(), Notification::DialogConstructed);
        assert!(engine.live_window().is_some());
    }

    #[test]
    fn test_begin_show_twice_fails() {
        let engine = Arc::new(DialogEngine::new(DialogId::next(), Box::new(DefaultHooks)));
        engine
            .set_buttons(ButtonList::from_definitions(&[ButtonDefinition::new("yes", "Yes")]).unwrap());

        let page = engine.begin_show().unwrap();
        assert_eq!(page.buttons.len(), 1);
        assert_eq!(page.buttons[0].id, 101);
        assert_eq!(engine.begin_show().unwrap_err(), DialogError::AlreadyShown);
    }

    #[test]
    fn test_begin_show_checks_icon_text() {
        let engine = DialogEngine::new(DialogId::next(), Box::new(DefaultHooks));
        engine.update_config(|config| config.footer_icon = Icon::Error);

        assert_eq!(
            engine.begin_show().unwrap_err(),
            DialogError::IconWithoutText(IconSlot::Footer)
        );
        assert!(engine.state().is(PageState::Unshown));
    }

    #[test]
    fn test_navigate_requires_shown_source() {
        let source = Arc::new(DialogEngine::new(DialogId::next(), Box::new(DefaultHooks)));
        let target = Arc::new(DialogEngine::new(DialogId::next(), Box::new(DefaultHooks)));

        assert_eq!(source.navigate(&target).unwrap_err(), DialogError::NotShown);
        assert!(target.state().is(PageState::Unshown));
    }

    #[test]
    fn test_navigate_detaches_source_and_links_target() {
        let source = Arc::new(DialogEngine::new(DialogId::next(), Box::new(DefaultHooks)));
        let target = Arc::new(DialogEngine::new(DialogId::next(), Box::new(DefaultHooks)));
        let window = window();

        source.begin_show().unwrap();
        source.notify(&window, Notification::DialogConstructed);
        source.navigate(&target).unwrap();

        assert!(source.state().is(PageState::Detached));
        assert!(target.state().is(PageState::Navigating));
        assert!(Arc::ptr_eq(&source.final_page(), &target));
        assert_eq!(source.begin_show().unwrap_err(), DialogError::Detached);

        target.notify(&window, Notification::DialogConstructed);
        target.notify(&window, Notification::Navigated);
        assert!(target.state().is(PageState::Shown));
        assert!(target.live_window().is_some());
    }

    #[test]
    fn test_navigate_after_destroy_leaves_target_untouched() {
        let source = Arc::new(DialogEngine::new(DialogId::next(), Box::new(DefaultHooks)));
        let target = Arc::new(DialogEngine::new(DialogId::next(), Box::new(DefaultHooks)));
        let window = window();

        source.begin_show().unwrap();
        source.notify(&window, Notification::DialogConstructed);
        source.notify(&window, Notification::Destroyed);

        assert_eq!(source.navigate(&target).unwrap_err(), DialogError::NotShown);
        assert!(source.state().is(PageState::Closed));
        assert!(target.state().is(PageState::Unshown));
        assert!(source.navigated_to().is_none());
    }

    #[test]
    fn test_navigate_racing_destroy_never_splits_the_chain() {
        for _ in 0..200 {
            let source = Arc::new(DialogEngine::new(DialogId::next(), Box::new(DefaultHooks)));
            let target = Arc::new(DialogEngine::new(DialogId::next(), Box::new(DefaultHooks)));
            let window = window();

            source.begin_show().unwrap();
            source.notify(&window, Notification::DialogConstructed);

            let worker = {
                let source = Arc::clone(&source);
                let window = Arc::clone(&window);
                std::thread::spawn(move || {
                    source.notify(&window, Notification::Destroyed);
                })
            };
            let navigated = source.navigate(&target);
            worker.join().unwrap();

            match navigated {
                Ok(()) => {
                    assert!(source.state().is(PageState::Detached));
                    assert!(target.state().is(PageState::Navigating));
                    assert!(Arc::ptr_eq(&source.final_page(), &target));
                }
                Err(error) => {
                    assert_eq!(error, DialogError::NotShown);
                    assert!(source.state().is(PageState::Closed));
                    assert!(target.state().is(PageState::Unshown));
                    assert!(source.navigated_to().is_none());
                }
            }
        }
    }
}
