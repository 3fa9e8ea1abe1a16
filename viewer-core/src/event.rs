//! Pointer events and surface listeners.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};

/// Kind of pointer event a listener subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerKind {
    /// Button pressed and released.
    Click,
    /// Pointer moved over the surface.
    Move,
}

/// A pointer (mouse) event in page coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerEvent {
    /// Event kind.
    pub kind: PointerKind,
    /// X position relative to the page.
    pub page_x: f64,
    /// Y position relative to the page.
    pub page_y: f64,
}

impl PointerEvent {
    /// Create a click event.
    #[must_use]
    pub fn click(page_x: f64, page_y: f64) -> Self {
        Self {
            kind: PointerKind::Click,
            page_x,
            page_y,
        }
    }

    /// Create a move event.
    #[must_use]
    pub fn moved(page_x: f64, page_y: f64) -> Self {
        Self {
            kind: PointerKind::Move,
            page_x,
            page_y,
        }
    }
}

/// Identifier for a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Allocate a fresh, process-unique listener ID.
    #[must_use]
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for ListenerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

/// Where a listener delivers events.
#[derive(Debug)]
pub enum Listener {
    /// Delivers the first matching event, then is removed.
    Once(oneshot::Sender<PointerEvent>),
    /// Delivers every matching event until removed.
    Repeating(mpsc::UnboundedSender<PointerEvent>),
}

impl Listener {
    /// A once-only listener and the receiver its event arrives on.
    #[must_use]
    pub fn once() -> (Self, oneshot::Receiver<PointerEvent>) {
        let (tx, rx) = oneshot::channel();
        (Self::Once(tx), rx)
    }

    /// A repeating listener and the receiver its events arrive on.
    #[must_use]
    pub fn repeating() -> (Self, mpsc::UnboundedReceiver<PointerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::Repeating(tx), rx)
    }
}
