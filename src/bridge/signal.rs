use std::sync::Arc;
use tokio::sync::Notify;

/// Cross-thread wake-up for the host loop.
///
/// Any thread may call [`signal()`](Self::signal). The host side awaits
/// [`notified()`](Self::notified). Signals sent while nobody is waiting are kept as a
/// single pending permit, so several signals coalesce into one wake but a signal is
/// never lost.
#[derive(Debug, Clone, Default)]
pub struct BridgeSignal {
    notify: Arc<Notify>,
}

impl BridgeSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wake the consumer. Never blocks.
    pub fn signal(&self) {
        self.notify.notify_one();
    }

    /// Wait for the next wake-up
    pub async fn notified(&self) {
        self.notify.notified().await;
    }

    /// Whether two handles refer to the same underlying primitive
    pub fn same_as(&self, other: &BridgeSignal) -> bool {
        Arc::ptr_eq(&self.notify, &other.notify)
    }
}
