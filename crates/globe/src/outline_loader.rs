use formats::{OutlineError, OutlineRings, Ring};
use foundation::math::{Vec3, lat_lon_to_vec3};
use tracing::debug;

/// Identifies one outline request. Results carrying any other ticket are stale.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct OutlineTicket(u64);

impl OutlineTicket {
    pub fn id(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LoaderState {
    Idle,
    InFlight(OutlineTicket),
    Applied,
    Unavailable,
    Disposed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OutlineOutcome {
    Decoded(OutlineRings),
    /// Fetch or decode failed; outlines will not appear.
    Unavailable(OutlineError),
    /// Stale ticket or the engine is gone; nothing to apply.
    Discarded,
}

/// Tracks the single background outline request of an engine.
#[derive(Debug, Clone)]
pub struct OutlineLoader {
    state: LoaderState,
    object: String,
    next_ticket: u64,
}

impl OutlineLoader {
    pub fn new(object: impl Into<String>) -> Self {
        Self {
            state: LoaderState::Idle,
            object: object.into(),
            next_ticket: 1,
        }
    }

    pub fn state(&self) -> LoaderState {
        self.state
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(self.state, LoaderState::InFlight(_))
    }

    /// Starts the request. Only the first call on an idle loader gets a ticket.
    pub fn begin(&mut self) -> Option<OutlineTicket> {
        if self.state != LoaderState::Idle {
            return None;
        }
        let ticket = OutlineTicket(self.next_ticket);
        self.next_ticket += 1;
        self.state = LoaderState::InFlight(ticket);
        debug!(ticket = ticket.0, "outlines.begin");
        Some(ticket)
    }

    /// Settles the request with the fetched payload or the transport error.
    pub fn complete(
        &mut self,
        ticket: OutlineTicket,
        payload: Result<String, OutlineError>,
    ) -> OutlineOutcome {
        if self.state != LoaderState::InFlight(ticket) {
            debug!(ticket = ticket.0, state = ?self.state, "outlines.discard");
            return OutlineOutcome::Discarded;
        }
        let decoded = payload.and_then(|text| OutlineRings::from_json_str(&text, &self.object));
        match decoded {
            Ok(rings) => {
                self.state = LoaderState::Applied;
                OutlineOutcome::Decoded(rings)
            }
            Err(e) => {
                self.state = LoaderState::Unavailable;
                OutlineOutcome::Unavailable(e)
            }
        }
    }

    /// Any result arriving after this is discarded.
    pub fn dispose(&mut self) {
        self.state = LoaderState::Disposed;
    }
}

/// Closed-ring line list for every ring, lifted onto a sphere of `radius`.
/// Consecutive duplicate vertices produce no segment.
pub fn outline_segments(rings: &[Ring], radius: f64) -> Vec<[Vec3; 2]> {
    let mut out = Vec::new();
    for ring in rings {
        if ring.len() < 2 {
            continue;
        }
        let points: Vec<Vec3> = ring
            .iter()
            .map(|p| lat_lon_to_vec3(p.lat_deg, p.lon_deg, radius))
            .collect();
        for (i, a) in points.iter().enumerate() {
            let b = points[(i + 1) % points.len()];
            if a.distance(b) > 1e-12 {
                out.push([*a, b]);
            }
        }
    }
    out
}
