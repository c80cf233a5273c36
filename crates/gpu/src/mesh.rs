use foundation::math::Vec3;
use scene::components::Geometry;

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LineVertex {
    pub position: [f32; 3],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PointVertex {
    pub position: [f32; 3],
    pub color: [f32; 3],
}

/// Vertex data ready for upload, one variant per geometry kind.
#[derive(Debug, Clone, PartialEq)]
pub enum MeshData {
    Triangles {
        vertices: Vec<MeshVertex>,
        indices: Vec<u32>,
    },
    Lines { vertices: Vec<LineVertex> },
    Points { vertices: Vec<PointVertex> },
}

impl MeshData {
    pub fn from_geometry(geometry: &Geometry) -> Self {
        match geometry {
            Geometry::Sphere {
                radius,
                width_segments,
                height_segments,
            } => {
                let (vertices, indices) =
                    generate_sphere_mesh(*radius, *height_segments, *width_segments);
                MeshData::Triangles { vertices, indices }
            }
            Geometry::LineSegments { segments } => MeshData::Lines {
                vertices: segments
                    .iter()
                    .flat_map(|[a, b]| [line_vertex(*a), line_vertex(*b)])
                    .collect(),
            },
            Geometry::Points { positions, colors } => MeshData::Points {
                vertices: positions
                    .iter()
                    .enumerate()
                    .map(|(i, p)| PointVertex {
                        position: p.as_f32(),
                        color: colors.get(i).copied().unwrap_or([1.0, 1.0, 1.0]),
                    })
                    .collect(),
            },
        }
    }

    /// Vertices (or indices, for triangles) the draw call consumes.
    pub fn element_count(&self) -> u32 {
        match self {
            MeshData::Triangles { indices, .. } => indices.len() as u32,
            MeshData::Lines { vertices } => vertices.len() as u32,
            MeshData::Points { vertices } => vertices.len() as u32,
        }
    }
}

fn line_vertex(p: Vec3) -> LineVertex {
    LineVertex { position: p.as_f32() }
}

/// UV sphere with outward normals, counter-clockwise front faces.
pub fn generate_sphere_mesh(
    radius: f64,
    lat_segments: u32,
    lon_segments: u32,
) -> (Vec<MeshVertex>, Vec<u32>) {
    let lat_segments = lat_segments.max(2);
    let lon_segments = lon_segments.max(3);
    let radius = radius as f32;

    let mut vertices = Vec::with_capacity(((lat_segments + 1) * (lon_segments + 1)) as usize);
    for lat in 0..=lat_segments {
        let v = lat as f32 / lat_segments as f32;
        let theta = v * std::f32::consts::PI;
        let (sin_t, cos_t) = theta.sin_cos();

        for lon in 0..=lon_segments {
            let u = lon as f32 / lon_segments as f32;
            let phi = u * std::f32::consts::TAU;
            let (sin_p, cos_p) = phi.sin_cos();

            let n = [sin_t * cos_p, cos_t, sin_t * sin_p];
            vertices.push(MeshVertex {
                position: [n[0] * radius, n[1] * radius, n[2] * radius],
                normal: n,
            });
        }
    }

    let stride = lon_segments + 1;
    let mut indices = Vec::with_capacity((lat_segments * lon_segments * 6) as usize);
    for lat in 0..lat_segments {
        for lon in 0..lon_segments {
            let i0 = lat * stride + lon;
            let i1 = i0 + 1;
            let i2 = i0 + stride;
            let i3 = i2 + 1;
            indices.extend_from_slice(&[i0, i1, i2, i1, i3, i2]);
        }
    }

    (vertices, indices)
}
