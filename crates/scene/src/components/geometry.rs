use foundation::math::Vec3;

/// Backend-neutral geometry description.
///
/// Geometries are immutable once inserted into the scene graph; a changed
/// shape is a new resource.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    /// UV sphere centred on the node origin.
    Sphere {
        radius: f64,
        width_segments: u32,
        height_segments: u32,
    },
    /// Independent line segments (a line list).
    LineSegments { segments: Vec<[Vec3; 2]> },
    /// Point cloud with one colour per point.
    Points {
        positions: Vec<Vec3>,
        colors: Vec<[f32; 3]>,
    },
}

impl Geometry {
    pub fn sphere(radius: f64, segments: u32) -> Self {
        Self::Sphere {
            radius,
            width_segments: segments.max(3),
            height_segments: segments.max(2),
        }
    }

    pub fn kind(&self) -> GeometryKind {
        match self {
            Self::Sphere { .. } => GeometryKind::Sphere,
            Self::LineSegments { .. } => GeometryKind::LineSegments,
            Self::Points { .. } => GeometryKind::Points,
        }
    }

    /// Radius of a bounding sphere centred on the node origin.
    pub fn bounding_radius(&self) -> f64 {
        match self {
            Self::Sphere { radius, .. } => *radius,
            Self::LineSegments { segments } => segments
                .iter()
                .flat_map(|s| s.iter())
                .map(|p| p.length())
                .fold(0.0, f64::max),
            Self::Points { positions, .. } => {
                positions.iter().map(|p| p.length()).fold(0.0, f64::max)
            }
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum GeometryKind {
    Sphere,
    LineSegments,
    Points,
}

#[cfg(test)]
mod tests {
    use super::{Geometry, GeometryKind};
    use foundation::math::Vec3;

    #[test]
    fn bounding_radius_covers_every_vertex() {
        let lines = Geometry::LineSegments {
            segments: vec![[Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 3.0, 4.0)]],
        };
        assert_eq!(lines.bounding_radius(), 5.0);
        assert_eq!(lines.kind(), GeometryKind::LineSegments);
        assert_eq!(Geometry::sphere(1.5, 16).bounding_radius(), 1.5);
    }

    #[test]
    fn sphere_segments_are_clamped() {
        let Geometry::Sphere {
            width_segments,
            height_segments,
            ..
        } = Geometry::sphere(1.0, 0)
        else {
            panic!("expected a sphere");
        };
        assert_eq!(width_segments, 3);
        assert_eq!(height_segments, 2);
    }
}
