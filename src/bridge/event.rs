use super::payload::Payload;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifies the dialog page an event belongs to, so the host side can find the
/// matching callback sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DialogId(u64);

impl DialogId {
    /// Allocate a process-unique id
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for DialogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dialog#{}", self.0)
    }
}

/// The fixed set of events a dialog page reports to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventName {
    Loaded,
    Navigated,
    LinkClicked,
    ButtonClicked,
    RadioClicked,
    VerificationClicked,
    ExpandoClicked,
    Timer,
}

impl EventName {
    pub const ALL: [EventName; 8] = [
        EventName::Loaded,
        EventName::Navigated,
        EventName::LinkClicked,
        EventName::ButtonClicked,
        EventName::RadioClicked,
        EventName::VerificationClicked,
        EventName::ExpandoClicked,
        EventName::Timer,
    ];

    /// Name the host registers handlers under
    pub fn as_str(self) -> &'static str {
        match self {
            EventName::Loaded => "loaded",
            EventName::Navigated => "navigated",
            EventName::LinkClicked => "click:link",
            EventName::ButtonClicked => "click:button",
            EventName::RadioClicked => "click:radio",
            EventName::VerificationClicked => "click:verification",
            EventName::ExpandoClicked => "click:expando",
            EventName::Timer => "timer",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|event| event.as_str() == name)
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One dialog notification on its way from the worker thread to the host.
///
/// Built on the worker thread, moved into the queue, and consumed by dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub dialog: DialogId,
    pub name: EventName,
    pub payload: Payload,
}

impl Event {
    pub fn new(dialog: DialogId, name: EventName, payload: impl Into<Payload>) -> Self {
        Self {
            dialog,
            name,
            payload: payload.into(),
        }
    }

    /// Event without a payload
    pub fn bare(dialog: DialogId, name: EventName) -> Self {
        Self {
            dialog,
            name,
            payload: Payload::None,
        }
    }
}
