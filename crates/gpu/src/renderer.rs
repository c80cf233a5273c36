use foundation::math::Vec3;
use scene::components::{GeometryKind, Shading};
use scene::{GeometryId, NodeId, SceneGraph};

use crate::camera::Camera3D;

/// Draw passes in submission order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RenderPass {
    /// Star and galaxy points, drawn first without depth writes.
    Background,
    Opaque,
    Lines,
    Transparent,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RenderCommand {
    pub node: NodeId,
    pub pass: RenderPass,
    pub geometry: GeometryId,
    pub kind: GeometryKind,
    pub shading: Shading,
    pub model: [[f32; 4]; 4],
    /// Linear RGB plus opacity.
    pub color: [f32; 4],
    pub emissive: [f32; 3],
    pub point_size: f32,
    pub depth_write: bool,
    pub render_order: i32,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct RenderFrame {
    pub view_proj: [[f32; 4]; 4],
    pub camera_position: [f32; 3],
    pub light_dir: [f32; 3],
    pub commands: Vec<RenderCommand>,
}

impl RenderFrame {
    pub fn pass(&self, pass: RenderPass) -> impl Iterator<Item = &RenderCommand> + '_ {
        self.commands.iter().filter(move |c| c.pass == pass)
    }
}

/// Key light direction (towards the light), matching a light at (4, 2, 3).
pub const KEY_LIGHT_DIR: Vec3 = Vec3::new(0.742_781_352_7, 0.371_390_676_4, 0.557_086_014_5);

pub struct Renderer;

impl Renderer {
    /// Flattens the visible part of the scene into an ordered command list.
    ///
    /// Ordering contract:
    /// - Commands are grouped by [`RenderPass`].
    /// - Within a pass, lower `render_order` draws first.
    /// - Transparent commands with equal `render_order` draw back to front.
    /// - Remaining ties keep scene traversal order.
    ///
    /// Fully transparent meshes are skipped.
    pub fn collect(scene: &SceneGraph, camera: &Camera3D) -> RenderFrame {
        let mut keyed: Vec<(RenderPass, i32, f64, usize, RenderCommand)> = Vec::new();

        for (seq, visible) in scene.visible_meshes().into_iter().enumerate() {
            let Some(material) = scene.material(visible.mesh.material) else {
                continue;
            };
            let Some(geometry) = scene.geometry(visible.mesh.geometry) else {
                continue;
            };
            if material.opacity <= 0.0 {
                continue;
            }

            let kind = geometry.kind();
            let pass = match kind {
                GeometryKind::Points => RenderPass::Background,
                GeometryKind::LineSegments => RenderPass::Lines,
                GeometryKind::Sphere if material.transparent => RenderPass::Transparent,
                GeometryKind::Sphere => RenderPass::Opaque,
            };

            let center = visible.world.transform_point(Vec3::ZERO);
            let depth = if pass == RenderPass::Transparent {
                -center.distance(camera.position)
            } else {
                0.0
            };

            let command = RenderCommand {
                node: visible.node,
                pass,
                geometry: visible.mesh.geometry,
                kind,
                shading: material.shading,
                model: visible.world.to_f32_cols(),
                color: [
                    srgb_to_linear(material.color.r),
                    srgb_to_linear(material.color.g),
                    srgb_to_linear(material.color.b),
                    material.opacity,
                ],
                emissive: [
                    srgb_to_linear(material.emissive.r),
                    srgb_to_linear(material.emissive.g),
                    srgb_to_linear(material.emissive.b),
                ],
                point_size: material.point_size,
                depth_write: material.depth_write,
                render_order: visible.render_order,
            };
            keyed.push((pass, visible.render_order, depth, seq, command));
        }

        keyed.sort_by(|a, b| {
            a.0.cmp(&b.0)
                .then_with(|| a.1.cmp(&b.1))
                .then_with(|| a.2.total_cmp(&b.2))
                .then_with(|| a.3.cmp(&b.3))
        });

        RenderFrame {
            view_proj: camera.view_proj().to_f32_cols(),
            camera_position: camera.position.as_f32(),
            light_dir: KEY_LIGHT_DIR.as_f32(),
            commands: keyed.into_iter().map(|(.., c)| c).collect(),
        }
    }
}

fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

#[cfg(test)]
mod tests {
    use super::{RenderPass, Renderer};
    use crate::camera::Camera3D;
    use foundation::math::Vec3;
    use pretty_assertions::assert_eq;
    use scene::components::{Color, Geometry, Material};
    use scene::{SceneGraph, Source};

    fn camera() -> Camera3D {
        Camera3D::look_at(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO, 1.0, 0.1, 1000.0)
    }

    #[test]
    fn groups_commands_by_pass() {
        let mut scene = SceneGraph::new();
        let glass = scene
            .spawn_mesh(
                None,
                "glass",
                Source::Own(Geometry::sphere(1.0, 8)),
                Source::Own(Material::unlit(Color::WHITE, 0.5)),
            )
            .expect("glass");
        let lines = scene
            .spawn_mesh(
                None,
                "lines",
                Source::Own(Geometry::LineSegments {
                    segments: vec![[Vec3::ZERO, Vec3::X]],
                }),
                Source::Own(Material::line(Color::WHITE, 0.4)),
            )
            .expect("lines");
        let solid = scene
            .spawn_mesh(
                None,
                "solid",
                Source::Own(Geometry::sphere(1.0, 8)),
                Source::Own(Material::lit(Color::WHITE, Color::WHITE)),
            )
            .expect("solid");
        let stars = scene
            .spawn_mesh(
                None,
                "stars",
                Source::Own(Geometry::Points {
                    positions: vec![Vec3::Y],
                    colors: vec![[1.0, 1.0, 1.0]],
                }),
                Source::Own(Material::points(Color::WHITE, 0.6, 2.0)),
            )
            .expect("stars");

        let frame = Renderer::collect(&scene, &camera());
        let order: Vec<_> = frame.commands.iter().map(|c| (c.node, c.pass)).collect();
        assert_eq!(
            order,
            vec![
                (stars, RenderPass::Background),
                (solid, RenderPass::Opaque),
                (lines, RenderPass::Lines),
                (glass, RenderPass::Transparent),
            ]
        );
        assert_eq!(frame.pass(RenderPass::Opaque).count(), 1);
    }

    #[test]
    fn transparent_draws_back_to_front_and_skips_invisible() {
        let mut scene = SceneGraph::new();
        let mut spawn = |name: &str, z: f64, opacity: f32| {
            let node = scene
                .spawn_mesh(
                    None,
                    name,
                    Source::Own(Geometry::sphere(0.1, 8)),
                    Source::Own(Material::unlit(Color::WHITE, opacity)),
                )
                .expect("spawn");
            scene.node_mut(node).expect("node").transform.position = Vec3::new(0.0, 0.0, z);
            node
        };
        let near = spawn("near", 5.0, 0.5);
        let far = spawn("far", -5.0, 0.5);
        let _hidden = spawn("hidden", 0.0, 0.0);

        let frame = Renderer::collect(&scene, &camera());
        let order: Vec<_> = frame.commands.iter().map(|c| c.node).collect();
        assert_eq!(order, vec![far, near]);
    }
}
