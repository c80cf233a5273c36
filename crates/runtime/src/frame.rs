use foundation::time::Time;

/// Largest step a single frame may advance the clamped clock by, in seconds.
///
/// Background tabs pause `requestAnimationFrame`; without a clamp the first
/// frame after resuming would jump every motion integrator to its end.
/// Timelines that must track real time read [`Frame::wall`] instead.
pub const MAX_FRAME_DT_S: f64 = 0.1;

/// Frame metadata handed to every scheduled job.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Frame {
    /// 0-based frame index.
    pub index: u64,
    /// Seconds since the previous frame (clamped).
    pub dt_s: f64,
    /// Sum of clamped steps since the first frame.
    pub time: Time,
    /// Unclamped seconds since the first frame; never decreases.
    pub wall: Time,
}

impl Frame {
    pub fn new(index: u64, dt_s: f64) -> Self {
        let time = Time(index as f64 * dt_s);
        Self {
            index,
            dt_s,
            time,
            wall: time,
        }
    }

    pub fn next(self) -> Self {
        Self::new(self.index + 1, self.dt_s)
    }
}

/// Turns host wall-clock timestamps (milliseconds) into [`Frame`]s.
///
/// The first timestamp seen becomes time zero. Engine time only moves
/// forward, even if the host hands back an older timestamp.
#[derive(Debug, Default, Clone)]
pub struct FrameClock {
    origin_ms: Option<f64>,
    last_ms: f64,
    elapsed_s: f64,
    next_index: u64,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tick(&mut self, timestamp_ms: f64) -> Frame {
        let ts = if timestamp_ms.is_finite() {
            timestamp_ms
        } else {
            self.last_ms
        };
        let (origin, dt_s) = match self.origin_ms {
            None => {
                self.origin_ms = Some(ts);
                self.last_ms = ts;
                (ts, 0.0)
            }
            Some(origin) => (
                origin,
                ((ts - self.last_ms) / 1000.0).clamp(0.0, MAX_FRAME_DT_S),
            ),
        };
        self.last_ms = self.last_ms.max(ts);
        self.elapsed_s += dt_s;

        let frame = Frame {
            index: self.next_index,
            dt_s,
            time: Time(self.elapsed_s),
            wall: Time((self.last_ms - origin) / 1000.0),
        };
        self.next_index += 1;
        frame
    }

    pub fn frames_ticked(&self) -> u64 {
        self.next_index
    }

    pub fn elapsed(&self) -> Time {
        Time(self.elapsed_s)
    }
}

#[cfg(test)]
mod tests {
    use super::{Frame, FrameClock, MAX_FRAME_DT_S};
    use foundation::time::Time;

    #[test]
    fn frame_time_is_deterministic() {
        let a = Frame::new(10, 1.0 / 60.0);
        let b = Frame::new(10, 1.0 / 60.0);
        assert_eq!(a, b);
        assert_eq!(a.time, Time(10.0 / 60.0));
        assert_eq!(a.next().index, 11);
    }

    #[test]
    fn first_tick_is_time_zero() {
        let mut clock = FrameClock::new();
        let f0 = clock.tick(12_345.0);
        assert_eq!(f0.index, 0);
        assert_eq!(f0.dt_s, 0.0);
        assert_eq!(f0.time, Time(0.0));

        let f1 = clock.tick(12_345.0 + 16.0);
        assert_eq!(f1.index, 1);
        assert!((f1.dt_s - 0.016).abs() < 1e-12);
        assert!((f1.time.seconds() - 0.016).abs() < 1e-12);
    }

    #[test]
    fn long_gaps_are_clamped_and_time_never_rewinds() {
        let mut clock = FrameClock::new();
        clock.tick(0.0);
        let f1 = clock.tick(5_000.0);
        assert_eq!(f1.dt_s, MAX_FRAME_DT_S);

        let f2 = clock.tick(4_000.0);
        assert_eq!(f2.dt_s, 0.0);
        assert_eq!(f2.time, f1.time);
        assert_eq!(f2.wall, f1.wall);
        assert_eq!(clock.frames_ticked(), 3);
    }

    #[test]
    fn wall_time_tracks_timestamps_without_clamping() {
        let mut clock = FrameClock::new();
        clock.tick(1_000.0);
        let mut last = clock.tick(1_250.0);
        for i in 2..=8 {
            last = clock.tick(1_000.0 + 250.0 * i as f64);
        }
        assert_eq!(last.wall, Time(2.0));
        assert!((last.time.seconds() - 0.8).abs() < 1e-12);
        assert!(last.time < last.wall);
    }
}
