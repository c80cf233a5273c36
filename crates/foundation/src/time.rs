/// Time primitives
#[derive(Copy, Clone, Debug, PartialEq, PartialOrd, Default)]
pub struct Time(pub f64); // seconds

impl Time {
    pub fn seconds(self) -> f64 {
        self.0
    }

    pub fn from_millis(ms: f64) -> Self {
        Self(ms / 1000.0)
    }

    pub fn after(self, seconds: f64) -> Self {
        Self(self.0 + seconds)
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TimeSpan {
    pub start: Time,
    pub end: Time,
}

impl TimeSpan {
    pub fn instant(t: Time) -> Self {
        Self { start: t, end: t }
    }

    /// Span starting at `start_s` and lasting `duration_s` seconds.
    pub fn window(start_s: f64, duration_s: f64) -> Self {
        Self {
            start: Time(start_s),
            end: Time(start_s + duration_s.max(0.0)),
        }
    }

    pub fn duration(&self) -> f64 {
        (self.end.0 - self.start.0).max(0.0)
    }

    pub fn contains(&self, t: Time) -> bool {
        t.0 >= self.start.0 && t.0 <= self.end.0
    }

    /// Linear progress of `t` through the span, clamped to [0, 1].
    ///
    /// Zero-length spans behave as a step at `start`.
    pub fn progress(&self, t: Time) -> f64 {
        let d = self.duration();
        if d <= 0.0 {
            return if t.0 >= self.start.0 { 1.0 } else { 0.0 };
        }
        ((t.0 - self.start.0) / d).clamp(0.0, 1.0)
    }
}
