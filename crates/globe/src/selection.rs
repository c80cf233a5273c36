use foundation::time::Time;
use runtime::Debounce;

/// Detail-card visibility. `Closing` keeps the selection alive while the
/// card plays its exit transition.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum PanelVisibility {
    #[default]
    Hidden,
    Open,
    Closing,
}

/// The single active selection plus its debounced close.
#[derive(Debug, Clone)]
pub struct SelectionState {
    active: Option<usize>,
    panel: PanelVisibility,
    close: Debounce,
}

impl SelectionState {
    pub fn new(close_delay_s: f64) -> Self {
        Self {
            active: None,
            panel: PanelVisibility::Hidden,
            close: Debounce::new(close_delay_s),
        }
    }

    pub fn active(&self) -> Option<usize> {
        self.active
    }

    pub fn panel(&self) -> PanelVisibility {
        self.panel
    }

    pub fn is_closing(&self) -> bool {
        self.close.is_pending()
    }

    /// Selects `marker`, replacing any previous selection and cancelling a
    /// pending close. Returns the replaced marker.
    pub fn open(&mut self, marker: usize) -> Option<usize> {
        self.close.cancel();
        self.panel = PanelVisibility::Open;
        self.active.replace(marker)
    }

    /// Hides the card and (re)starts the close delay. Returns `false` when
    /// nothing is selected.
    pub fn begin_close(&mut self, now: Time) -> bool {
        if self.active.is_none() {
            return false;
        }
        self.panel = PanelVisibility::Closing;
        self.close.arm(now);
        true
    }

    /// Clears the selection once the close delay has elapsed and returns the
    /// marker that was deselected.
    pub fn tick(&mut self, now: Time) -> Option<usize> {
        if !self.close.poll(now) {
            return None;
        }
        self.panel = PanelVisibility::Hidden;
        self.active.take()
    }

    /// Drops the selection immediately, without the exit transition.
    pub fn clear(&mut self) -> Option<usize> {
        self.close.cancel();
        self.panel = PanelVisibility::Hidden;
        self.active.take()
    }
}

#[cfg(test)]
mod tests {
    use super::{PanelVisibility, SelectionState};
    use foundation::time::Time;

    #[test]
    fn close_clears_after_delay() {
        let mut sel = SelectionState::new(0.26);
        assert_eq!(sel.open(2), None);
        assert_eq!(sel.panel(), PanelVisibility::Open);
        assert!(sel.begin_close(Time(1.0)));
        assert_eq!(sel.panel(), PanelVisibility::Closing);
        assert_eq!(sel.active(), Some(2));
        assert_eq!(sel.tick(Time(1.2)), None);
        assert_eq!(sel.tick(Time(1.27)), Some(2));
        assert_eq!(sel.active(), None);
        assert_eq!(sel.panel(), PanelVisibility::Hidden);
        assert_eq!(sel.tick(Time(5.0)), None);
    }

    #[test]
    fn reopening_cancels_pending_close() {
        let mut sel = SelectionState::new(0.26);
        sel.open(0);
        sel.begin_close(Time(1.0));
        assert_eq!(sel.open(1), Some(0));
        assert!(!sel.is_closing());
        assert_eq!(sel.tick(Time(2.0)), None);
        assert_eq!(sel.active(), Some(1));
    }

    #[test]
    fn repeated_close_restarts_the_delay() {
        let mut sel = SelectionState::new(0.26);
        sel.open(0);
        sel.begin_close(Time(1.0));
        sel.begin_close(Time(1.2));
        assert_eq!(sel.tick(Time(1.3)), None);
        assert_eq!(sel.tick(Time(1.47)), Some(0));
        assert_eq!(sel.tick(Time(1.8)), None);
    }

    #[test]
    fn close_without_selection_is_a_no_op() {
        let mut sel = SelectionState::new(0.26);
        assert!(!sel.begin_close(Time(0.0)));
        assert!(!sel.is_closing());
        assert_eq!(sel.clear(), None);
    }
}
