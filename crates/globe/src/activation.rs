use tracing::{debug, warn};

/// What the host environment offers, probed before anything is built.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub webgpu: bool,
    pub webgl2: bool,
    pub intersection_observer: bool,
}

impl Capabilities {
    pub fn has_graphics(&self) -> bool {
        self.webgpu || self.webgl2
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum GateState {
    /// Terminal: show the fallback message.
    Unsupported,
    AwaitingVisibility,
    Authorized,
}

/// Decides whether and when the engine may be constructed.
#[derive(Debug, Clone)]
pub struct ActivationGate {
    state: GateState,
}

impl ActivationGate {
    pub fn evaluate(caps: Capabilities) -> Self {
        let state = if !caps.has_graphics() {
            GateState::Unsupported
        } else if caps.intersection_observer {
            GateState::AwaitingVisibility
        } else {
            GateState::Authorized
        };
        debug!(?caps, ?state, "activation.evaluate");
        Self { state }
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    /// Feeds an intersection observation. Returns `true` on the one
    /// transition to `Authorized`.
    pub fn on_intersection(&mut self, is_intersecting: bool) -> bool {
        if self.state == GateState::AwaitingVisibility && is_intersecting {
            self.state = GateState::Authorized;
            return true;
        }
        false
    }

    /// Context creation failed after a successful probe. Never retried.
    pub fn on_context_failed(&mut self, reason: &str) {
        warn!(reason, "activation.context_failed");
        self.state = GateState::Unsupported;
    }

    pub fn is_supported(&self) -> bool {
        self.state != GateState::Unsupported
    }

    pub fn is_authorized(&self) -> bool {
        self.state == GateState::Authorized
    }
}

#[cfg(test)]
mod tests {
    use super::{ActivationGate, Capabilities, GateState};

    fn caps(webgpu: bool, webgl2: bool, observer: bool) -> Capabilities {
        Capabilities {
            webgpu,
            webgl2,
            intersection_observer: observer,
        }
    }

    #[test]
    fn no_graphics_is_terminal() {
        let mut gate = ActivationGate::evaluate(caps(false, false, true));
        assert_eq!(gate.state(), GateState::Unsupported);
        assert!(!gate.on_intersection(true));
        assert!(!gate.is_supported());
        assert!(!gate.is_authorized());
    }

    #[test]
    fn waits_for_intersection() {
        let mut gate = ActivationGate::evaluate(caps(true, false, true));
        assert!(gate.is_supported());
        assert!(!gate.is_authorized());
        assert!(!gate.on_intersection(false));
        assert!(gate.on_intersection(true));
        assert!(!gate.on_intersection(true));
        assert!(gate.is_authorized());
    }

    #[test]
    fn without_observer_authorizes_immediately() {
        let gate = ActivationGate::evaluate(caps(false, true, false));
        assert!(gate.is_authorized());
    }

    #[test]
    fn context_failure_falls_back_for_good() {
        let mut gate = ActivationGate::evaluate(caps(true, true, false));
        gate.on_context_failed("adapter request rejected");
        assert_eq!(gate.state(), GateState::Unsupported);
        assert!(!gate.on_intersection(true));
    }
}
