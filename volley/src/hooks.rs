//! Observers of a run
use tokio::sync::mpsc::UnboundedSender;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};
use volley_core::{RunStats, RunStatus};

/// Receives the output of a run.
///
/// The scheduler calls these methods from a single task, in order, and never concurrently.
/// Every value handed over is an owned snapshot. After `on_complete` or `on_error` nothing else
/// is delivered.
pub trait RunHooks: Send {
    /// Fired once when the run starts, once per completed call and once on the terminal
    /// transition.
    fn on_progress(&mut self, status: RunStatus);

    /// Fired exactly once when every call has been issued and recorded.
    fn on_complete(&mut self, stats: RunStats);

    /// Fired exactly once when the run could not proceed.
    fn on_error(&mut self, message: String);
}

impl<H: RunHooks + ?Sized> RunHooks for &mut H {
    fn on_progress(&mut self, status: RunStatus) {
        (**self).on_progress(status)
    }

    fn on_complete(&mut self, stats: RunStats) {
        (**self).on_complete(stats)
    }

    fn on_error(&mut self, message: String) {
        (**self).on_error(message)
    }
}

impl<H: RunHooks + ?Sized> RunHooks for Box<H> {
    fn on_progress(&mut self, status: RunStatus) {
        (**self).on_progress(status)
    }

    fn on_complete(&mut self, stats: RunStats) {
        (**self).on_complete(stats)
    }

    fn on_error(&mut self, message: String) {
        (**self).on_error(message)
    }
}

/// Everything a run reports, as a single stream.
#[derive(Clone, Debug, PartialEq)]
pub enum RunEvent {
    Progress(RunStatus),
    Complete(RunStats),
    Error(String),
}

impl RunHooks for UnboundedSender<RunEvent> {
    fn on_progress(&mut self, status: RunStatus) {
        forward(self, RunEvent::Progress(status));
    }

    fn on_complete(&mut self, stats: RunStats) {
        forward(self, RunEvent::Complete(stats));
    }

    fn on_error(&mut self, message: String) {
        forward(self, RunEvent::Error(message));
    }
}

fn forward(tx: &UnboundedSender<RunEvent>, event: RunEvent) {
    if tx.send(event).is_err() {
        trace!("Run event receiver dropped.");
    }
}

type Hook<T> = Box<dyn FnMut(T) + Send>;

/// Closure based [`RunHooks`]. Hooks that are not set do nothing.
///
/// # Example
/// ```
/// use volley::Callbacks;
///
/// let hooks = Callbacks::new()
///     .progress(|status| println!("{status}"))
///     .error(|err| eprintln!("{err}"));
/// ```
pub struct Callbacks {
    progress: Hook<RunStatus>,
    complete: Hook<RunStats>,
    error: Hook<String>,
}

impl Default for Callbacks {
    fn default() -> Self {
        Self::new()
    }
}

impl Callbacks {
    pub fn new() -> Self {
        Self {
            progress: Box::new(|_| {}),
            complete: Box::new(|_| {}),
            error: Box::new(|_| {}),
        }
    }

    pub fn progress(mut self, f: impl FnMut(RunStatus) + Send + 'static) -> Self {
        self.progress = Box::new(f);
        self
    }

    pub fn complete(mut self, f: impl FnMut(RunStats) + Send + 'static) -> Self {
        self.complete = Box::new(f);
        self
    }

    pub fn error(mut self, f: impl FnMut(String) + Send + 'static) -> Self {
        self.error = Box::new(f);
        self
    }
}

impl RunHooks for Callbacks {
    fn on_progress(&mut self, status: RunStatus) {
        (self.progress)(status)
    }

    fn on_complete(&mut self, stats: RunStats) {
        (self.complete)(stats)
    }

    fn on_error(&mut self, message: String) {
        (self.error)(message)
    }
}
