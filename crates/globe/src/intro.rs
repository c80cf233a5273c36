use foundation::math::{clamp01, ease_in_out_cubic};
use foundation::time::{Time, TimeSpan};

use crate::config::{
    Curve, IntroConfig, PHASE_GALAXY_IN, PHASE_GALAXY_OUT, PHASE_PLANET_IN, PHASE_SOLAR_IN,
    PHASE_SOLAR_OUT,
};

/// One named window of the intro timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseWindow {
    pub name: String,
    pub span: TimeSpan,
    pub curve: Curve,
}

impl PhaseWindow {
    pub fn new(name: impl Into<String>, start_s: f64, duration_s: f64, curve: Curve) -> Self {
        Self {
            name: name.into(),
            span: TimeSpan::window(start_s, duration_s),
            curve,
        }
    }

    /// Eased progress through the window at `elapsed_s`, in [0, 1].
    pub fn progress(&self, elapsed_s: f64) -> f64 {
        let t = self.span.progress(Time(elapsed_s));
        match self.curve {
            Curve::Linear => t,
            Curve::EaseInOutCubic => ease_in_out_cubic(t),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IntroTimeline {
    pub total_duration_s: f64,
    pub phases: Vec<PhaseWindow>,
}

impl IntroTimeline {
    pub fn from_config(config: &IntroConfig) -> Self {
        Self {
            total_duration_s: config.total_duration_s,
            phases: config
                .phases
                .iter()
                .map(|p| PhaseWindow::new(p.name.clone(), p.start_s, p.duration_s, p.curve))
                .collect(),
        }
    }

    pub fn phase(&self, name: &str) -> Option<&PhaseWindow> {
        self.phases.iter().find(|p| p.name == name)
    }

    /// Progress of a named phase; an absent phase counts as finished.
    pub fn progress(&self, name: &str, elapsed_s: f64) -> f64 {
        self.phase(name).map_or(1.0, |p| p.progress(elapsed_s))
    }

    /// Eased progress through the whole intro, driving the camera path.
    pub fn overall(&self, elapsed_s: f64) -> f64 {
        if self.total_duration_s <= 0.0 {
            return 1.0;
        }
        ease_in_out_cubic(clamp01(elapsed_s / self.total_duration_s))
    }

    /// Layer intensities at `elapsed_s`.
    pub fn sample(&self, elapsed_s: f64) -> IntroFrame {
        let p = |name| self.progress(name, elapsed_s);
        IntroFrame {
            elapsed_s,
            overall: self.overall(elapsed_s),
            stars: p(PHASE_GALAXY_IN),
            galaxy: p(PHASE_GALAXY_IN) * (1.0 - p(PHASE_GALAXY_OUT)),
            solar: p(PHASE_SOLAR_IN) * (1.0 - p(PHASE_SOLAR_OUT)),
            planet: p(PHASE_PLANET_IN),
        }
    }
}

/// Opacity factors and camera progress for one intro frame.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct IntroFrame {
    pub elapsed_s: f64,
    pub overall: f64,
    pub stars: f64,
    pub galaxy: f64,
    pub solar: f64,
    pub planet: f64,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum IntroState {
    Playing,
    Complete,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum IntroStep {
    Playing(IntroFrame),
    /// The single `Playing -> Complete` transition.
    JustCompleted,
    Complete,
}

/// Drives the intro from elapsed time. Completion happens once and sticks.
#[derive(Debug, Clone)]
pub struct IntroSequencer {
    timeline: IntroTimeline,
    state: IntroState,
    elapsed_s: f64,
    skip_requested: bool,
}

impl IntroSequencer {
    pub fn new(timeline: IntroTimeline) -> Self {
        Self {
            timeline,
            state: IntroState::Playing,
            elapsed_s: 0.0,
            skip_requested: false,
        }
    }

    pub fn from_config(config: &IntroConfig) -> Self {
        let mut sequencer = Self::new(IntroTimeline::from_config(config));
        if !config.enabled {
            sequencer.skip();
        }
        sequencer
    }

    pub fn state(&self) -> IntroState {
        self.state
    }

    pub fn is_complete(&self) -> bool {
        self.state == IntroState::Complete
    }

    pub fn timeline(&self) -> &IntroTimeline {
        &self.timeline
    }

    /// Requests completion on the next `advance`.
    pub fn skip(&mut self) {
        if self.state == IntroState::Playing {
            self.skip_requested = true;
        }
    }

    pub fn advance(&mut self, elapsed_s: f64) -> IntroStep {
        if self.state == IntroState::Complete {
            return IntroStep::Complete;
        }
        // Elapsed time never runs backwards, so phase progress stays monotonic.
        if elapsed_s.is_finite() {
            self.elapsed_s = self.elapsed_s.max(elapsed_s);
        }
        if self.skip_requested || self.elapsed_s > self.timeline.total_duration_s {
            self.state = IntroState::Complete;
            return IntroStep::JustCompleted;
        }
        IntroStep::Playing(self.timeline.sample(self.elapsed_s))
    }
}

#[cfg(test)]
mod tests {
    use super::{IntroSequencer, IntroState, IntroStep, IntroTimeline, PhaseWindow};
    use crate::config::{Curve, IntroConfig};

    fn sequencer() -> IntroSequencer {
        IntroSequencer::from_config(&IntroConfig::default())
    }

    #[test]
    fn phase_progress_is_clamped_and_eased() {
        let w = PhaseWindow::new("w", 1.0, 2.0, Curve::EaseInOutCubic);
        assert_eq!(w.progress(0.0), 0.0);
        assert_eq!(w.progress(1.0), 0.0);
        assert!((w.progress(2.0) - 0.5).abs() < 1e-12);
        assert_eq!(w.progress(3.0), 1.0);
        assert_eq!(w.progress(50.0), 1.0);

        let linear = PhaseWindow::new("l", 0.0, 4.0, Curve::Linear);
        assert_eq!(linear.progress(1.0), 0.25);
    }

    #[test]
    fn missing_phase_counts_as_finished() {
        let timeline = IntroTimeline {
            total_duration_s: 1.0,
            phases: Vec::new(),
        };
        assert_eq!(timeline.progress("anything", 0.0), 1.0);
    }

    #[test]
    fn layers_cross_fade_in_order() {
        let timeline = IntroTimeline::from_config(&IntroConfig::default());
        let start = timeline.sample(0.0);
        assert_eq!((start.galaxy, start.solar, start.planet), (0.0, 0.0, 0.0));

        let wide = timeline.sample(2.0);
        assert_eq!(wide.galaxy, 1.0);
        assert_eq!(wide.solar, 0.0);

        let mid = timeline.sample(4.8);
        assert_eq!(mid.galaxy, 0.0);
        assert_eq!(mid.solar, 1.0);
        assert_eq!(mid.planet, 0.0);

        let end = timeline.sample(8.5);
        assert_eq!(end.solar, 0.0);
        assert_eq!(end.planet, 1.0);
        assert!(end.overall > mid.overall && mid.overall > wide.overall);
    }

    #[test]
    fn completes_exactly_once() {
        let mut seq = sequencer();
        assert!(matches!(seq.advance(0.0), IntroStep::Playing(_)));
        assert!(matches!(seq.advance(9.0), IntroStep::Playing(_)));
        assert_eq!(seq.advance(9.01), IntroStep::JustCompleted);
        assert_eq!(seq.state(), IntroState::Complete);
        assert_eq!(seq.advance(9.5), IntroStep::Complete);
        assert_eq!(seq.advance(0.0), IntroStep::Complete);
        seq.skip();
        assert_eq!(seq.advance(20.0), IntroStep::Complete);
    }

    #[test]
    fn skip_and_disabled_complete_on_next_advance() {
        let mut seq = sequencer();
        seq.advance(1.0);
        seq.skip();
        assert_eq!(seq.advance(1.1), IntroStep::JustCompleted);

        let mut disabled = IntroSequencer::from_config(&IntroConfig {
            enabled: false,
            ..IntroConfig::default()
        });
        assert_eq!(disabled.advance(0.0), IntroStep::JustCompleted);
    }

    #[test]
    fn progress_never_runs_backwards() {
        let mut seq = sequencer();
        let IntroStep::Playing(late) = seq.advance(7.0) else {
            panic!("still playing");
        };
        let IntroStep::Playing(again) = seq.advance(3.0) else {
            panic!("still playing");
        };
        assert_eq!(late, again);
    }
}
