use foundation::math::{Quat, Vec3};

use crate::config::CameraConfig;

/// Scripted intro dolly towards the origin.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct IntroCameraPath {
    pub start: Vec3,
    pub end: Vec3,
}

impl IntroCameraPath {
    pub fn new(start: Vec3, end: Vec3) -> Self {
        Self { start, end }
    }

    /// Camera position for an already-eased progress in [0, 1].
    pub fn position(&self, progress: f64) -> Vec3 {
        self.start.lerp(self.end, progress.clamp(0.0, 1.0))
    }
}

/// Radius, polar angle from +Y, and azimuth around +Y measured from +Z.
#[derive(Debug, Copy, Clone, PartialEq)]
struct Spherical {
    radius: f64,
    phi: f64,
    theta: f64,
}

impl Spherical {
    fn from_vec3(v: Vec3) -> Self {
        let radius = v.length();
        if radius <= 0.0 {
            return Self {
                radius: 0.0,
                phi: std::f64::consts::FRAC_PI_2,
                theta: 0.0,
            };
        }
        Self {
            radius,
            theta: v.x.atan2(v.z),
            phi: (v.y / radius).clamp(-1.0, 1.0).acos(),
        }
    }

    fn to_vec3(self) -> Vec3 {
        let s = self.phi.sin();
        Vec3::new(
            self.radius * s * self.theta.sin(),
            self.radius * self.phi.cos(),
            self.radius * s * self.theta.cos(),
        )
    }
}

const POLE_EPS: f64 = 1e-6;

/// Drag-to-orbit and wheel-to-zoom around the origin, with inertia.
///
/// Input only queues deltas; [`OrbitController::update`] applies them once per
/// frame. There is no panning: the target is always the origin.
#[derive(Debug, Clone)]
pub struct OrbitController {
    spherical: Spherical,
    delta_theta: f64,
    delta_phi: f64,
    scale: f64,
    enabled: bool,
    rotate_enabled: bool,
    dragging: Option<(f64, f64)>,
    pub min_distance: f64,
    pub max_distance: f64,
    damping: f64,
    rotate_speed: f64,
    zoom_speed: f64,
}

impl OrbitController {
    pub fn new(position: Vec3, config: &CameraConfig) -> Self {
        Self {
            spherical: Spherical::from_vec3(position),
            delta_theta: 0.0,
            delta_phi: 0.0,
            scale: 1.0,
            enabled: false,
            rotate_enabled: true,
            dragging: None,
            min_distance: config.min_distance,
            max_distance: config.max_distance,
            damping: config.damping,
            rotate_speed: config.rotate_speed,
            zoom_speed: config.zoom_speed,
        }
    }

    pub fn position(&self) -> Vec3 {
        self.spherical.to_vec3()
    }

    pub fn distance(&self) -> f64 {
        self.spherical.radius
    }

    /// Jumps to `position` and drops any queued motion.
    pub fn set_position(&mut self, position: Vec3) {
        self.spherical = Spherical::from_vec3(position);
        self.delta_theta = 0.0;
        self.delta_phi = 0.0;
        self.scale = 1.0;
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.dragging = None;
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Disabling rotation also stops any remaining inertia.
    pub fn set_rotate_enabled(&mut self, rotate: bool) {
        if !rotate {
            self.delta_theta = 0.0;
            self.delta_phi = 0.0;
        }
        self.rotate_enabled = rotate;
    }

    pub fn rotate_enabled(&self) -> bool {
        self.rotate_enabled
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging.is_some()
    }

    pub fn drag_start(&mut self, x_px: f64, y_px: f64) {
        if self.enabled {
            self.dragging = Some((x_px, y_px));
        }
    }

    /// Pointer moved while dragging. A full viewport height of travel turns
    /// the camera one full revolution.
    pub fn drag(&mut self, x_px: f64, y_px: f64, viewport_height: f64) {
        let Some((last_x, last_y)) = self.dragging else {
            return;
        };
        self.dragging = Some((x_px, y_px));
        if !self.enabled || !self.rotate_enabled || viewport_height <= 0.0 {
            return;
        }
        let k = std::f64::consts::TAU / viewport_height * self.rotate_speed;
        self.delta_theta -= (x_px - last_x) * k;
        self.delta_phi -= (y_px - last_y) * k;
    }

    pub fn drag_end(&mut self) {
        self.dragging = None;
    }

    /// Wheel input; positive `delta_y` moves away from the globe.
    pub fn zoom(&mut self, delta_y: f64) {
        if !self.enabled || delta_y == 0.0 || !delta_y.is_finite() {
            return;
        }
        let step = 0.95f64.powf(self.zoom_speed);
        if delta_y > 0.0 {
            self.scale /= step;
        } else {
            self.scale *= step;
        }
    }

    /// Applies queued motion and returns the new camera position.
    pub fn update(&mut self) -> Vec3 {
        let k = if self.damping > 0.0 { self.damping } else { 1.0 };
        self.spherical.theta += self.delta_theta * k;
        self.spherical.phi = (self.spherical.phi + self.delta_phi * k)
            .clamp(POLE_EPS, std::f64::consts::PI - POLE_EPS);
        self.spherical.radius =
            (self.spherical.radius * self.scale).clamp(self.min_distance, self.max_distance);

        if self.damping > 0.0 {
            self.delta_theta *= 1.0 - self.damping;
            self.delta_phi *= 1.0 - self.damping;
        } else {
            self.delta_theta = 0.0;
            self.delta_phi = 0.0;
        }
        self.scale = 1.0;
        self.position()
    }
}

/// Frame rate the focus rate is expressed against.
const REFERENCE_FPS: f64 = 60.0;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FocusStep {
    pub rotation: Quat,
    /// The target was reached this step and has been cleared.
    pub reached: bool,
}

/// Slerps the globe orientation towards a target that brings a marker in
/// front of the camera.
#[derive(Debug, Clone)]
pub struct FocusAnimator {
    target: Option<Quat>,
    rate: f64,
    epsilon: f64,
}

impl FocusAnimator {
    pub fn new(rate: f64, epsilon: f64) -> Self {
        Self {
            target: None,
            rate: rate.clamp(0.0, 1.0),
            epsilon,
        }
    }

    /// Targets the orientation that turns `local_dir` (in the globe's frame)
    /// onto `toward` (world direction from the globe centre to the camera).
    pub fn begin(&mut self, current: Quat, local_dir: Vec3, toward: Vec3) -> Quat {
        let world_dir = current.rotate(local_dir);
        let target = (Quat::from_unit_vectors(world_dir, toward) * current).normalize();
        self.target = Some(target);
        target
    }

    pub fn cancel(&mut self) {
        self.target = None;
    }

    pub fn is_pending(&self) -> bool {
        self.target.is_some()
    }

    pub fn target(&self) -> Option<Quat> {
        self.target
    }

    pub fn angle_to_target(&self, current: Quat) -> Option<f64> {
        self.target.map(|t| current.angle_to(t))
    }

    /// One frame of motion; `None` when nothing is pending.
    pub fn step(&mut self, current: Quat, dt_s: f64) -> Option<FocusStep> {
        let target = self.target?;
        let t = 1.0 - (1.0 - self.rate).powf(dt_s.max(0.0) * REFERENCE_FPS);
        let next = current.slerp(target, t);
        if next.angle_to(target) < self.epsilon {
            self.target = None;
            return Some(FocusStep {
                rotation: target,
                reached: true,
            });
        }
        Some(FocusStep {
            rotation: next,
            reached: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{FocusAnimator, IntroCameraPath, OrbitController};
    use crate::config::CameraConfig;
    use foundation::math::{Quat, Vec3};

    fn assert_close(a: f64, b: f64, eps: f64) {
        assert!((a - b).abs() <= eps, "expected {a} ~= {b}");
    }

    #[test]
    fn intro_path_interpolates_between_ends() {
        let path = IntroCameraPath::new(Vec3::new(0.0, 6.0, 48.0), Vec3::new(0.0, 0.0, 3.6));
        assert_eq!(path.position(0.0), path.start);
        assert_eq!(path.position(1.0), path.end);
        assert_eq!(path.position(2.0), path.end);
        assert_close(path.position(0.5).y, 3.0, 1e-12);
    }

    fn orbit() -> OrbitController {
        let mut orbit = OrbitController::new(Vec3::new(0.0, 0.0, 3.6), &CameraConfig::default());
        orbit.set_enabled(true);
        orbit
    }

    #[test]
    fn ignores_input_until_enabled() {
        let mut orbit = OrbitController::new(Vec3::new(0.0, 0.0, 3.6), &CameraConfig::default());
        orbit.drag_start(0.0, 0.0);
        orbit.drag(100.0, 0.0, 600.0);
        orbit.zoom(120.0);
        assert!(orbit.update().distance(Vec3::new(0.0, 0.0, 3.6)) < 1e-12);
    }

    #[test]
    fn zoom_is_clamped_to_distance_bounds() {
        let mut orbit = orbit();
        for _ in 0..200 {
            orbit.zoom(100.0);
            orbit.update();
        }
        assert_close(orbit.distance(), 5.2, 1e-12);
        for _ in 0..200 {
            orbit.zoom(-100.0);
            orbit.update();
        }
        assert_close(orbit.distance(), 2.6, 1e-12);
    }

    #[test]
    fn drag_orbits_with_inertia_and_keeps_distance() {
        let mut orbit = orbit();
        orbit.drag_start(300.0, 300.0);
        orbit.drag(360.0, 300.0, 600.0);
        orbit.drag_end();
        let first = orbit.update();
        let second = orbit.update();
        assert!(first.x < 0.0, "dragging right swings the camera left: {first:?}");
        assert!(second.x < first.x);
        assert_close(second.length(), 3.6, 1e-9);
    }

    #[test]
    fn disabling_rotation_stops_motion() {
        let mut orbit = orbit();
        orbit.drag_start(0.0, 0.0);
        orbit.drag(50.0, 40.0, 600.0);
        orbit.set_rotate_enabled(false);
        orbit.drag(90.0, 80.0, 600.0);
        let p = orbit.update();
        assert!(p.distance(Vec3::new(0.0, 0.0, 3.6)) < 1e-12);
    }

    #[test]
    fn focus_brings_marker_to_camera_axis() {
        let start = Quat::from_rotation_y(-std::f64::consts::FRAC_PI_2);
        let local = Vec3::new(0.2, 0.5, -0.8).normalize_or_zero();
        let mut focus = FocusAnimator::new(0.08, 0.001);
        let target = focus.begin(start, local, Vec3::Z);
        assert!(target.rotate(local).distance(Vec3::Z) < 1e-9);

        let mut current = start;
        let mut last = focus.angle_to_target(current).expect("pending");
        let mut frames = 0;
        while let Some(step) = focus.step(current, 1.0 / 60.0) {
            current = step.rotation;
            frames += 1;
            if step.reached {
                break;
            }
            let angle = focus.angle_to_target(current).expect("pending");
            assert!(angle <= last + 1e-12);
            last = angle;
            assert!(frames < 1000);
        }
        assert!(!focus.is_pending());
        assert_eq!(current, target);
    }

    #[test]
    fn focus_handles_marker_directly_behind() {
        let mut focus = FocusAnimator::new(0.08, 0.001);
        let target = focus.begin(Quat::IDENTITY, -Vec3::Z, Vec3::Z);
        assert!(target.rotate(-Vec3::Z).distance(Vec3::Z) < 1e-9);
        let mut current = Quat::IDENTITY;
        for _ in 0..1000 {
            match focus.step(current, 1.0 / 30.0) {
                Some(step) => current = step.rotation,
                None => break,
            }
        }
        assert!(!focus.is_pending());
    }

    #[test]
    fn zero_dt_does_not_move() {
        let mut focus = FocusAnimator::new(0.08, 0.001);
        focus.begin(Quat::IDENTITY, Vec3::X, Vec3::Z);
        let step = focus.step(Quat::IDENTITY, 0.0).expect("pending");
        assert!(!step.reached);
        assert_eq!(step.rotation, Quat::IDENTITY);
    }
}
