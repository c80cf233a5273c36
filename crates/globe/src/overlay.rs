use foundation::math::{Vec2, Vec3};
use gpu::{Camera3D, Viewport};

/// Screen-space line from a marker to the detail card, in CSS pixels
/// relative to the globe container.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ConnectorGeometry {
    pub marker_px: Vec2,
    pub anchor_px: Vec2,
    pub length: f64,
    /// Angle of `anchor - marker` from +x, clockwise on screen (y down).
    pub angle_rad: f64,
}

pub struct OverlayProjector;

impl OverlayProjector {
    /// Recomputes the connector from scratch. `None` when the point is
    /// behind the camera or the viewport is empty.
    pub fn project(
        camera: &Camera3D,
        world_point: Vec3,
        viewport: &Viewport,
        anchor: Vec2,
    ) -> Option<ConnectorGeometry> {
        if viewport.width <= 0.0 || viewport.height <= 0.0 {
            return None;
        }
        let ndc = camera.project(world_point)?;
        let marker_px = viewport.to_pixels(Vec2::new(ndc.x, ndc.y));
        let delta = anchor - marker_px;
        Some(ConnectorGeometry {
            marker_px,
            anchor_px: anchor,
            length: delta.length(),
            angle_rad: delta.angle(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::OverlayProjector;
    use foundation::math::{Vec2, Vec3};
    use gpu::{Camera3D, Viewport};

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "expected {a} ~= {b}");
    }

    fn camera(viewport: &Viewport) -> Camera3D {
        Camera3D::look_at(Vec3::new(0.0, 0.0, 3.6), Vec3::ZERO, 45f64.to_radians(), 0.1, 100.0)
            .with_aspect(viewport.aspect())
    }

    #[test]
    fn centre_point_connects_to_anchor() {
        let viewport = Viewport::new(800.0, 600.0, 2.0);
        let cam = camera(&viewport);
        let c = OverlayProjector::project(&cam, Vec3::ZERO, &viewport, Vec2::new(700.0, 300.0))
            .expect("connector");
        assert_close(c.marker_px.x, 400.0);
        assert_close(c.marker_px.y, 300.0);
        assert_close(c.length, 300.0);
        assert_close(c.angle_rad, 0.0);

        let below = OverlayProjector::project(&cam, Vec3::ZERO, &viewport, Vec2::new(400.0, 500.0))
            .expect("connector");
        assert_close(below.angle_rad, std::f64::consts::FRAC_PI_2);
    }

    #[test]
    fn follows_resize() {
        let small = Viewport::new(400.0, 300.0, 1.0);
        let large = Viewport::new(1200.0, 900.0, 1.0);
        let point = Vec3::new(0.5, 0.5, 0.0);
        let anchor = Vec2::new(10.0, 10.0);
        let a = OverlayProjector::project(&camera(&small), point, &small, anchor).expect("a");
        let b = OverlayProjector::project(&camera(&large), point, &large, anchor).expect("b");
        assert_close(b.marker_px.x - 600.0, 3.0 * (a.marker_px.x - 200.0));
        assert!(b.length > a.length);
    }

    #[test]
    fn behind_camera_has_no_connector() {
        let viewport = Viewport::new(800.0, 600.0, 1.0);
        let behind = Vec3::new(0.0, 0.0, 10.0);
        let anchor = Vec2::new(0.0, 0.0);
        assert!(OverlayProjector::project(&camera(&viewport), behind, &viewport, anchor).is_none());
    }
}
