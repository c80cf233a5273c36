use foundation::math::{Mat4, Vec2, Vec3};

/// Size of the drawing surface in CSS pixels plus the device pixel ratio used
/// for the backing store.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    pub pixel_ratio: f64,
}

impl Viewport {
    pub const MAX_PIXEL_RATIO: f64 = 2.0;

    pub fn new(width: f64, height: f64, pixel_ratio: f64) -> Self {
        let pixel_ratio = if pixel_ratio.is_finite() && pixel_ratio > 0.0 {
            pixel_ratio.min(Self::MAX_PIXEL_RATIO)
        } else {
            1.0
        };
        Self {
            width: width.max(0.0),
            height: height.max(0.0),
            pixel_ratio,
        }
    }

    pub fn aspect(&self) -> f64 {
        if self.height <= 0.0 {
            1.0
        } else {
            (self.width / self.height).max(1e-6)
        }
    }

    /// Backing-store size in device pixels (at least 1x1).
    pub fn physical_size(&self) -> (u32, u32) {
        let w = (self.width * self.pixel_ratio).round().max(1.0);
        let h = (self.height * self.pixel_ratio).round().max(1.0);
        (w as u32, h as u32)
    }

    /// Element-relative pixel position to normalized device coordinates
    /// (+y up), or `None` for an empty viewport.
    pub fn to_ndc(&self, x_px: f64, y_px: f64) -> Option<Vec2> {
        if self.width <= 0.0 || self.height <= 0.0 {
            return None;
        }
        Some(Vec2::new(
            (x_px / self.width) * 2.0 - 1.0,
            -(y_px / self.height) * 2.0 + 1.0,
        ))
    }

    /// Normalized device coordinates back to element-relative pixels.
    pub fn to_pixels(&self, ndc: Vec2) -> Vec2 {
        Vec2::new(
            (ndc.x * 0.5 + 0.5) * self.width,
            (-ndc.y * 0.5 + 0.5) * self.height,
        )
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Camera3D {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov_y_rad: f64,
    pub aspect: f64,
    pub near: f64,
    pub far: f64,
}

/// Orthonormal camera frame: `forward` points at the target, `right` and `up`
/// span the image plane.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CameraBasis {
    pub forward: Vec3,
    pub right: Vec3,
    pub up: Vec3,
}

impl Camera3D {
    pub fn look_at(position: Vec3, target: Vec3, fov_y_rad: f64, near: f64, far: f64) -> Self {
        Self {
            position,
            target,
            up: Vec3::Y,
            fov_y_rad,
            aspect: 1.0,
            near,
            far,
        }
    }

    pub fn with_aspect(mut self, aspect: f64) -> Self {
        self.aspect = aspect;
        self
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh_z0(self.fov_y_rad, self.aspect, self.near, self.far)
    }

    pub fn view_proj(&self) -> Mat4 {
        self.projection() * self.view()
    }

    pub fn basis(&self) -> CameraBasis {
        let forward = (self.target - self.position).normalize_or_zero();
        let right = forward.cross(self.up).normalize_or_zero();
        let up = right.cross(forward);
        CameraBasis { forward, right, up }
    }

    /// Projects a world point to normalized device coordinates. `None` when
    /// the point is behind the camera.
    pub fn project(&self, world: Vec3) -> Option<Vec3> {
        let [x, y, z, w] = self.view_proj().mul_vec4([world.x, world.y, world.z, 1.0]);
        if w <= 1e-9 {
            return None;
        }
        Some(Vec3::new(x / w, y / w, z / w))
    }
}

#[cfg(test)]
mod tests {
    use super::{Camera3D, Viewport};
    use foundation::math::{Vec2, Vec3};

    fn camera() -> Camera3D {
        Camera3D::look_at(Vec3::new(0.0, 0.0, 3.6), Vec3::ZERO, 45f64.to_radians(), 0.1, 100.0)
            .with_aspect(2.0)
    }

    #[test]
    fn target_projects_to_center() {
        let ndc = camera().project(Vec3::ZERO).expect("in front");
        assert!(ndc.x.abs() < 1e-12 && ndc.y.abs() < 1e-12);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
        assert!(camera().project(Vec3::new(0.0, 0.0, 10.0)).is_none());
    }

    #[test]
    fn basis_is_orthonormal() {
        let b = camera().basis();
        assert!(b.forward.distance(Vec3::new(0.0, 0.0, -1.0)) < 1e-12);
        assert!(b.right.distance(Vec3::X) < 1e-12);
        assert!(b.up.distance(Vec3::Y) < 1e-12);
    }

    #[test]
    fn viewport_conversions_round_trip_corners() {
        let vp = Viewport::new(800.0, 400.0, 3.0);
        assert_eq!(vp.pixel_ratio, 2.0);
        assert_eq!(vp.physical_size(), (1600, 800));
        assert_eq!(vp.aspect(), 2.0);
        assert_eq!(vp.to_ndc(0.0, 0.0), Some(Vec2::new(-1.0, 1.0)));
        assert_eq!(vp.to_ndc(400.0, 200.0), Some(Vec2::new(0.0, 0.0)));
        assert_eq!(vp.to_pixels(Vec2::new(1.0, -1.0)), Vec2::new(800.0, 400.0));
        assert_eq!(Viewport::new(0.0, 0.0, 1.0).to_ndc(1.0, 1.0), None);
    }
}
