//! Hooks into the view that displays a pipe's output.

use tokio::sync::mpsc;

/// Lets a pipe ask its view to render again.
///
/// Implementations must tolerate calls from timer tasks at any time.
pub trait ChangeDetector: Send + Sync {
    fn mark_for_check(&self);
}

/// Execution context the view uses to track changes.
///
/// Timer bodies are started through `run_outside` so that waiting on them is
/// invisible to the view; the final re-render request goes through `run`.
pub trait Zone: Send + Sync {
    fn run_outside(&self, f: Box<dyn FnOnce() + '_>);
    fn run(&self, f: Box<dyn FnOnce() + '_>);
}

/// A zone with no change tracking: both entry points just call through.
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectZone;

impl Zone for DirectZone {
    fn run_outside(&self, f: Box<dyn FnOnce() + '_>) {
        f()
    }

    fn run(&self, f: Box<dyn FnOnce() + '_>) {
        f()
    }
}

/// For pipes rendered once with nobody listening for refreshes.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopDetector;

impl ChangeDetector for NoopDetector {
    fn mark_for_check(&self) {}
}

/// Forwards every re-render request to a channel the view loop selects on.
#[derive(Debug, Clone)]
pub struct ChannelDetector {
    tx: mpsc::UnboundedSender<()>,
}

impl ChannelDetector {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ChangeDetector for ChannelDetector {
    fn mark_for_check(&self) {
        // The receiver is gone once the view has shut down.
        let _ = self.tx.send(());
    }
}
