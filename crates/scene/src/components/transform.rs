use foundation::math::{Mat4, Quat, Vec3};

/// Local transform of a node relative to its parent.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    pub fn identity() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::splat(1.0),
        }
    }

    pub fn translate(position: Vec3) -> Self {
        Self {
            position,
            ..Self::identity()
        }
    }

    pub fn rotate(rotation: Quat) -> Self {
        Self {
            rotation,
            ..Self::identity()
        }
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_translation_rotation_scale(self.position, self.rotation, self.scale)
    }
}

#[cfg(test)]
mod tests {
    use super::Transform;
    use foundation::math::{Mat4, Vec3};

    #[test]
    fn identity_is_origin() {
        let transform = Transform::identity();
        assert_eq!(transform.position, Vec3::ZERO);
        assert_eq!(transform.matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn translate_moves_points() {
        let t = Transform::translate(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(t.matrix().transform_point(Vec3::ZERO), Vec3::new(1.0, 2.0, 3.0));
    }
}
