use crate::event_bus::EventBus;
use crate::frame::Frame;

/// Signature of a per-frame job: it mutates the shared state `S` in place and
/// may publish events of type `E`.
pub type JobFn<S, E> = fn(state: &mut S, frame: Frame, bus: &mut EventBus<E>);

/// A deterministic unit of work executed by the [`Scheduler`](crate::Scheduler).
///
/// Jobs are run in a stable order based on their `(priority, id)`.
pub struct Job<S, E> {
    pub id: &'static str,
    /// Smaller values run earlier.
    pub priority: i32,
    pub run: JobFn<S, E>,
}

impl<S, E> Job<S, E> {
    pub fn new(id: &'static str, run: JobFn<S, E>) -> Self {
        Self::with_priority(id, 0, run)
    }

    pub fn with_priority(id: &'static str, priority: i32, run: JobFn<S, E>) -> Self {
        Self { id, priority, run }
    }
}

impl<S, E> std::fmt::Debug for Job<S, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .finish()
    }
}
