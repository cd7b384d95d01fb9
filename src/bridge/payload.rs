//! Values captured on the dialog thread and materialized on the host thread.
//!
//! [`Payload`] is plain `Send` data and is the only thing that crosses threads.
//! [`HostValue`] is the host's own value representation; it holds `Rc` strings, so
//! the compiler keeps it on the host thread.

use std::rc::Rc;
use std::time::Duration;

/// Primitive captured alongside an event on the worker thread.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Payload {
    #[default]
    None,
    Str(String),
    Int(i64),
    Bool(bool),
    Duration(Duration),
}

impl Payload {
    /// Convert into the host's value representation.
    ///
    /// Consumes the payload; call this only on the host thread. A missing payload
    /// becomes [`HostValue::Undefined`]. Durations are reported in milliseconds.
    pub fn materialize(self) -> HostValue {
        match self {
            Payload::None => HostValue::Undefined,
            Payload::Str(text) => HostValue::String(Rc::from(text)),
            Payload::Int(value) => HostValue::Number(value as f64),
            Payload::Bool(value) => HostValue::Boolean(value),
            Payload::Duration(elapsed) => HostValue::Number(elapsed.as_millis() as f64),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Payload::None)
    }
}

impl From<&str> for Payload {
    fn from(value: &str) -> Self {
        Payload::Str(value.to_string())
    }
}

impl From<String> for Payload {
    fn from(value: String) -> Self {
        Payload::Str(value)
    }
}

impl From<i32> for Payload {
    fn from(value: i32) -> Self {
        Payload::Int(i64::from(value))
    }
}

impl From<i64> for Payload {
    fn from(value: i64) -> Self {
        Payload::Int(value)
    }
}

impl From<bool> for Payload {
    fn from(value: bool) -> Self {
        Payload::Bool(value)
    }
}

impl From<Duration> for Payload {
    fn from(value: Duration) -> Self {
        Payload::Duration(value)
    }
}

/// A value in the host's representation. Not `Send`.
#[derive(Debug, Clone, PartialEq)]
pub enum HostValue {
    Undefined,
    String(Rc<str>),
    Number(f64),
    Boolean(bool),
}

impl HostValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            HostValue::String(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            HostValue::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, HostValue::Undefined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_materialize_each_variant() {
        assert_eq!(Payload::None.materialize(), HostValue::Undefined);
        assert_eq!(
            Payload::from("https://example.com").materialize().as_str(),
            Some("https://example.com")
        );
        assert_eq!(Payload::from(102).materialize(), HostValue::Number(102.0));
        assert_eq!(Payload::from(true).materialize(), HostValue::Boolean(true));
        assert_eq!(
            Payload::from(Duration::from_millis(1500)).materialize(),
            HostValue::Number(1500.0)
        );
    }

    #[test]
    fn test_missing_payload_is_not_an_error() {
        let value = Payload::default().materialize();
        assert!(value.is_undefined());
        assert_eq!(value.as_number(), None);
    }
}
