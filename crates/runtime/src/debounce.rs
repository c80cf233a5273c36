use foundation::time::Time;

/// Single-shot delayed action that can be cancelled or restarted.
///
/// Arming while already armed moves the deadline instead of queueing a second
/// firing, so at most one action is ever pending.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Debounce {
    delay_s: f64,
    deadline: Option<Time>,
}

impl Debounce {
    pub fn new(delay_s: f64) -> Self {
        Self {
            delay_s: delay_s.max(0.0),
            deadline: None,
        }
    }

    pub fn delay_s(&self) -> f64 {
        self.delay_s
    }

    /// Starts (or restarts) the countdown from `now`.
    pub fn arm(&mut self, now: Time) {
        self.deadline = Some(now.after(self.delay_s));
    }

    pub fn cancel(&mut self) -> bool {
        self.deadline.take().is_some()
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Time> {
        self.deadline
    }

    /// Returns `true` exactly once, on the first poll at or past the deadline.
    pub fn poll(&mut self, now: Time) -> bool {
        match self.deadline {
            Some(deadline) if now.seconds() >= deadline.seconds() => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Debounce;
    use foundation::time::Time;

    #[test]
    fn fires_once_after_delay() {
        let mut d = Debounce::new(0.26);
        d.arm(Time(1.0));
        assert!(!d.poll(Time(1.2)));
        assert!(d.poll(Time(1.27)));
        assert!(!d.poll(Time(2.0)));
        assert!(!d.is_pending());
    }

    #[test]
    fn rearming_restarts_the_countdown() {
        let mut d = Debounce::new(0.26);
        d.arm(Time(0.0));
        d.arm(Time(0.2));
        assert!(!d.poll(Time(0.3)));
        assert!(d.poll(Time(0.47)));
    }

    #[test]
    fn cancel_prevents_firing() {
        let mut d = Debounce::new(0.5);
        assert!(!d.cancel());
        d.arm(Time(0.0));
        assert!(d.cancel());
        assert!(!d.poll(Time(10.0)));
    }
}
