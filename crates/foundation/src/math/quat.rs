use super::Vec3;

/// Unit quaternion `[x, y, z, w]` used for orientations.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Quat {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Default for Quat {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Quat {
    pub const IDENTITY: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };

    pub fn new(x: f64, y: f64, z: f64, w: f64) -> Self {
        Self { x, y, z, w }
    }

    pub fn from_axis_angle(axis: Vec3, angle_rad: f64) -> Self {
        let Some(axis) = axis.try_normalize() else {
            return Self::IDENTITY;
        };
        let (s, c) = (0.5 * angle_rad).sin_cos();
        Self::new(axis.x * s, axis.y * s, axis.z * s, c)
    }

    pub fn from_rotation_y(angle_rad: f64) -> Self {
        Self::from_axis_angle(Vec3::Y, angle_rad)
    }

    /// Shortest-arc rotation taking direction `from` onto direction `to`.
    pub fn from_unit_vectors(from: Vec3, to: Vec3) -> Self {
        let a = from.normalize_or_zero();
        let b = to.normalize_or_zero();
        let dot = a.dot(b).clamp(-1.0, 1.0);

        // Nearly opposite: any axis orthogonal to `a` works.
        if dot < -0.999_999 {
            let mut axis = Vec3::X.cross(a);
            if axis.dot(axis) < 1e-12 {
                axis = Vec3::Y.cross(a);
            }
            let axis = axis.normalize_or_zero();
            return Self::new(axis.x, axis.y, axis.z, 0.0);
        }

        let axis = a.cross(b);
        Self::new(axis.x, axis.y, axis.z, 1.0 + dot).normalize()
    }

    pub fn dot(self, other: Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z + self.w * other.w
    }

    pub fn normalize(self) -> Self {
        let n = self.dot(self).sqrt();
        if n <= 0.0 || !n.is_finite() {
            return Self::IDENTITY;
        }
        Self::new(self.x / n, self.y / n, self.z / n, self.w / n)
    }

    pub fn conjugate(self) -> Self {
        Self::new(-self.x, -self.y, -self.z, self.w)
    }

    /// Rotates `v` by this (unit) quaternion.
    pub fn rotate(self, v: Vec3) -> Vec3 {
        let qv = Vec3::new(self.x, self.y, self.z);
        let t = qv.cross(v) * 2.0;
        v + t * self.w + qv.cross(t)
    }

    /// Angle in radians of the rotation separating `self` from `other`.
    pub fn angle_to(self, other: Self) -> f64 {
        let d = self.dot(other).abs().min(1.0);
        2.0 * d.acos()
    }

    /// Spherical interpolation along the shortest path.
    ///
    /// `t = 0` yields `self`, `t = 1` yields `other` (up to sign).
    pub fn slerp(self, other: Self, t: f64) -> Self {
        let t = t.clamp(0.0, 1.0);
        let mut other = other;
        let mut cos_half = self.dot(other);
        if cos_half < 0.0 {
            other = Self::new(-other.x, -other.y, -other.z, -other.w);
            cos_half = -cos_half;
        }

        if cos_half > 0.999_999 {
            // Nearly identical: linear blend avoids dividing by ~0.
            return Self::new(
                self.x + (other.x - self.x) * t,
                self.y + (other.y - self.y) * t,
                self.z + (other.z - self.z) * t,
                self.w + (other.w - self.w) * t,
            )
            .normalize();
        }

        let half = cos_half.acos();
        let sin_half = half.sin();
        let ra = ((1.0 - t) * half).sin() / sin_half;
        let rb = (t * half).sin() / sin_half;
        Self::new(
            self.x * ra + other.x * rb,
            self.y * ra + other.y * rb,
            self.z * ra + other.z * rb,
            self.w * ra + other.w * rb,
        )
        .normalize()
    }
}

impl std::ops::Mul for Quat {
    type Output = Self;

    /// Hamilton product: `(a * b).rotate(v) == a.rotate(b.rotate(v))`.
    fn mul(self, b: Self) -> Self::Output {
        let a = self;
        Self::new(
            a.w * b.x + a.x * b.w + a.y * b.z - a.z * b.y,
            a.w * b.y - a.x * b.z + a.y * b.w + a.z * b.x,
            a.w * b.z + a.x * b.y - a.y * b.x + a.z * b.w,
            a.w * b.w - a.x * b.x - a.y * b.y - a.z * b.z,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::Quat;
    use crate::math::Vec3;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn assert_vec_close(a: Vec3, b: Vec3, eps: f64) {
        let d = a.distance(b);
        assert!(d <= eps, "expected {a:?} ~= {b:?} (diff {d})");
    }

    #[test]
    fn rotation_y_quarter_turn() {
        let q = Quat::from_rotation_y(FRAC_PI_2);
        assert_vec_close(q.rotate(Vec3::Z), Vec3::X, 1e-12);
        assert_vec_close(q.rotate(Vec3::X), -Vec3::Z, 1e-12);
    }

    #[test]
    fn from_unit_vectors_maps_source_onto_target() {
        let from = Vec3::new(0.3, -0.8, 0.5).normalize_or_zero();
        let to = Vec3::new(-0.1, 0.2, 0.9).normalize_or_zero();
        let q = Quat::from_unit_vectors(from, to);
        assert_vec_close(q.rotate(from), to, 1e-9);
    }

    #[test]
    fn from_unit_vectors_handles_opposites() {
        let q = Quat::from_unit_vectors(Vec3::Z, -Vec3::Z);
        assert_vec_close(q.rotate(Vec3::Z), -Vec3::Z, 1e-9);
    }

    #[test]
    fn product_composes_rotations() {
        let a = Quat::from_rotation_y(0.4);
        let b = Quat::from_axis_angle(Vec3::X, -1.1);
        let v = Vec3::new(0.2, 0.7, -0.3);
        assert_vec_close((a * b).rotate(v), a.rotate(b.rotate(v)), 1e-12);
    }

    #[test]
    fn slerp_endpoints_and_angle() {
        let a = Quat::IDENTITY;
        let b = Quat::from_rotation_y(PI / 3.0);
        assert!(a.slerp(b, 0.0).angle_to(a) < 1e-9);
        assert!(a.slerp(b, 1.0).angle_to(b) < 1e-9);
        let mid = a.slerp(b, 0.5);
        assert!((mid.angle_to(a) - PI / 6.0).abs() < 1e-9);
        assert!((a.angle_to(b) - PI / 3.0).abs() < 1e-9);
    }
}
