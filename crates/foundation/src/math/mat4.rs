use super::{Quat, Vec3};

/// Column-major 4x4 matrix (`cols[c][r]`), the layout WGSL expects.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Mat4 {
    pub cols: [[f64; 4]; 4],
}

impl Default for Mat4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mat4 {
    pub const IDENTITY: Self = Self {
        cols: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    /// Right-handed perspective projection with depth range [0, 1].
    pub fn perspective_rh_z0(fov_y_rad: f64, aspect: f64, near: f64, far: f64) -> Self {
        let f = 1.0 / (0.5 * fov_y_rad).tan();
        let aspect = aspect.max(1e-6);
        let m22 = far / (near - far);
        let m23 = (near * far) / (near - far);
        Self {
            cols: [
                [f / aspect, 0.0, 0.0, 0.0],
                [0.0, f, 0.0, 0.0],
                [0.0, 0.0, m22, -1.0],
                [0.0, 0.0, m23, 0.0],
            ],
        }
    }

    pub fn look_at_rh(eye: Vec3, target: Vec3, up: Vec3) -> Self {
        let f = (target - eye).normalize_or_zero();
        let s = f.cross(up).normalize_or_zero();
        let u = s.cross(f);
        Self {
            cols: [
                [s.x, u.x, -f.x, 0.0],
                [s.y, u.y, -f.y, 0.0],
                [s.z, u.z, -f.z, 0.0],
                [-s.dot(eye), -u.dot(eye), f.dot(eye), 1.0],
            ],
        }
    }

    /// `T * R * S`.
    pub fn from_translation_rotation_scale(t: Vec3, r: Quat, s: Vec3) -> Self {
        let x = r.rotate(Vec3::X) * s.x;
        let y = r.rotate(Vec3::Y) * s.y;
        let z = r.rotate(Vec3::Z) * s.z;
        Self {
            cols: [
                [x.x, x.y, x.z, 0.0],
                [y.x, y.y, y.z, 0.0],
                [z.x, z.y, z.z, 0.0],
                [t.x, t.y, t.z, 1.0],
            ],
        }
    }

    pub fn mul_vec4(&self, v: [f64; 4]) -> [f64; 4] {
        let m = &self.cols;
        let mut out = [0.0; 4];
        for (row, o) in out.iter_mut().enumerate() {
            *o = m[0][row] * v[0] + m[1][row] * v[1] + m[2][row] * v[2] + m[3][row] * v[3];
        }
        out
    }

    /// Transforms a point (w = 1) without perspective divide.
    pub fn transform_point(&self, p: Vec3) -> Vec3 {
        let [x, y, z, _] = self.mul_vec4([p.x, p.y, p.z, 1.0]);
        Vec3::new(x, y, z)
    }

    pub fn to_f32_cols(&self) -> [[f32; 4]; 4] {
        let mut out = [[0.0f32; 4]; 4];
        for (c, col) in self.cols.iter().enumerate() {
            for (r, v) in col.iter().enumerate() {
                out[c][r] = *v as f32;
            }
        }
        out
    }
}

impl std::ops::Mul for Mat4 {
    type Output = Self;

    fn mul(self, b: Self) -> Self::Output {
        let a = &self.cols;
        let mut c = [[0.0; 4]; 4];
        for col in 0..4 {
            for row in 0..4 {
                c[col][row] = a[0][row] * b.cols[col][0]
                    + a[1][row] * b.cols[col][1]
                    + a[2][row] * b.cols[col][2]
                    + a[3][row] * b.cols[col][3];
            }
        }
        Self { cols: c }
    }
}
