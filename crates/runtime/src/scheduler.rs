use crate::event_bus::EventBus;
use crate::frame::Frame;
use crate::job::Job;

/// Runs registered jobs against one explicit state value, once per frame.
pub struct Scheduler<S, E> {
    next_order: u64,
    sorted: bool,
    jobs: Vec<(u64, Job<S, E>)>,
}

impl<S, E> Default for Scheduler<S, E> {
    fn default() -> Self {
        Self {
            next_order: 0,
            sorted: true,
            jobs: Vec::new(),
        }
    }
}

impl<S, E> Scheduler<S, E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_job(&mut self, job: Job<S, E>) {
        let order = self.next_order;
        self.next_order = self.next_order.wrapping_add(1);
        self.jobs.push((order, job));
        self.sorted = false;
    }

    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    /// Job ids in the order they will run.
    pub fn order(&mut self) -> Vec<&'static str> {
        self.sort();
        self.jobs.iter().map(|(_, j)| j.id).collect()
    }

    /// Run all jobs for the given frame.
    ///
    /// Ordering is `(priority, id, insertion_order)`, so duplicate ids still
    /// run deterministically.
    pub fn run_frame(&mut self, state: &mut S, frame: Frame, bus: &mut EventBus<E>) {
        self.sort();
        for (_order, job) in &self.jobs {
            (job.run)(state, frame, bus);
        }
    }

    pub fn clear(&mut self) {
        self.jobs.clear();
    }

    fn sort(&mut self) {
        if self.sorted {
            return;
        }
        self.jobs.sort_by(|(oa, a), (ob, b)| {
            a.priority
                .cmp(&b.priority)
                .then_with(|| a.id.cmp(b.id))
                .then_with(|| oa.cmp(ob))
        });
        self.sorted = true;
    }
}
