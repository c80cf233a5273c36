use foundation::math::Vec3;

use crate::SceneGraph;
use crate::components::Geometry;
use crate::entity::NodeId;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub dir: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, dir: Vec3) -> Self {
        Self { origin, dir }
    }

    pub fn at(&self, t: f64) -> Vec3 {
        self.origin + self.dir * t
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PickHit {
    pub node: NodeId,
    /// Position of `node` in the candidate slice.
    pub candidate: usize,
    pub distance: f64,
    pub point: Vec3,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PickOptions {
    pub max_distance: f64,
}

impl Default for PickOptions {
    fn default() -> Self {
        Self {
            max_distance: 1.0e30,
        }
    }
}

/// Deterministic ray picking against sphere meshes.
///
/// Ordering contract:
/// - The closest hit along the (normalized) ray wins.
/// - If multiple nodes are hit at the same distance, the lower `NodeId::index()` wins.
///
/// Notes:
/// - Only `candidates` are tested; everything else in the graph is ignored.
/// - Hidden nodes (or nodes under a hidden parent) never hit.
/// - The sphere radius follows the node's world scale, so pulsing markers are
///   picked at their drawn size.
pub fn pick_ray(
    scene: &SceneGraph,
    ray: Ray,
    candidates: &[NodeId],
    opts: PickOptions,
) -> Option<PickHit> {
    let dir = ray.dir.try_normalize()?;
    let ray = Ray::new(ray.origin, dir);

    let mut best: Option<(f64, NodeId, usize)> = None;
    for (candidate, node) in candidates.iter().enumerate() {
        if !scene.is_effectively_visible(*node) {
            continue;
        }
        let Some(mesh) = scene.node(*node).and_then(|n| n.mesh()) else {
            continue;
        };
        let Some(Geometry::Sphere { radius, .. }) = scene.geometry(mesh.geometry) else {
            continue;
        };
        let Some(world) = scene.world_matrix(*node) else {
            continue;
        };

        let center = world.transform_point(Vec3::ZERO);
        let scale = world_scale(&world.cols);
        let Some(t) = ray_sphere_hit_t(ray, center, radius * scale) else {
            continue;
        };
        if t > opts.max_distance {
            continue;
        }

        best = match best {
            None => Some((t, *node, candidate)),
            Some((bt, bn, bc)) => {
                let ord = t.total_cmp(&bt).then_with(|| node.index().cmp(&bn.index()));
                if ord.is_lt() {
                    Some((t, *node, candidate))
                } else {
                    Some((bt, bn, bc))
                }
            }
        };
    }

    let (t, node, candidate) = best?;
    Some(PickHit {
        node,
        candidate,
        distance: t,
        point: ray.at(t),
    })
}

fn world_scale(cols: &[[f64; 4]; 4]) -> f64 {
    (0..3)
        .map(|c| Vec3::new(cols[c][0], cols[c][1], cols[c][2]).length())
        .fold(0.0, f64::max)
}

/// Entry distance of a normalized ray into a sphere; `0` when starting inside.
fn ray_sphere_hit_t(ray: Ray, center: Vec3, radius: f64) -> Option<f64> {
    if radius <= 0.0 {
        return None;
    }
    let oc = ray.origin - center;
    let b = oc.dot(ray.dir);
    let c = oc.dot(oc) - radius * radius;
    if c > 0.0 && b > 0.0 {
        return None;
    }
    let disc = b * b - c;
    if disc < 0.0 {
        return None;
    }
    Some((-b - disc.sqrt()).max(0.0))
}

#[cfg(test)]
mod tests {
    use super::{PickOptions, Ray, pick_ray};
    use crate::components::{Color, Geometry, Material};
    use crate::{SceneGraph, Source};
    use foundation::math::Vec3;

    fn ball(scene: &mut SceneGraph, at: Vec3, radius: f64) -> crate::NodeId {
        let node = scene
            .spawn_mesh(
                None,
                "ball",
                Source::Own(Geometry::sphere(radius, 8)),
                Source::Own(Material::unlit(Color::WHITE, 1.0)),
            )
            .expect("spawn");
        scene.node_mut(node).expect("node").transform.position = at;
        node
    }

    #[test]
    fn ray_picks_nearest_hit() {
        let mut scene = SceneGraph::new();
        let far = ball(&mut scene, Vec3::new(10.0, 0.0, 0.0), 1.0);
        let near = ball(&mut scene, Vec3::new(5.0, 0.0, 0.0), 1.0);

        let ray = Ray::new(Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0));
        let hit = pick_ray(&scene, ray, &[far, near], PickOptions::default()).expect("hit");
        assert_eq!(hit.node, near);
        assert_eq!(hit.candidate, 1);
        assert!((hit.distance - 4.0).abs() < 1e-12);
        assert!(hit.point.distance(Vec3::new(4.0, 0.0, 0.0)) < 1e-12);
    }

    #[test]
    fn tie_breaks_by_node_index() {
        let mut scene = SceneGraph::new();
        let first = ball(&mut scene, Vec3::new(5.0, 0.0, 0.0), 1.0);
        let second = ball(&mut scene, Vec3::new(5.0, 0.0, 0.0), 1.0);

        let ray = Ray::new(Vec3::ZERO, Vec3::X);
        let hit = pick_ray(&scene, ray, &[second, first], PickOptions::default()).expect("hit");
        assert_eq!(hit.node, first);
    }

    #[test]
    fn misses_hidden_and_non_candidates() {
        let mut scene = SceneGraph::new();
        let a = ball(&mut scene, Vec3::new(5.0, 0.0, 0.0), 1.0);
        let b = ball(&mut scene, Vec3::new(8.0, 0.0, 0.0), 1.0);
        scene.set_visible(a, false).expect("hide");

        let ray = Ray::new(Vec3::ZERO, Vec3::X);
        assert!(pick_ray(&scene, ray, &[a], PickOptions::default()).is_none());
        let hit = pick_ray(&scene, ray, &[a, b], PickOptions::default()).expect("hit");
        assert_eq!(hit.node, b);

        let away = Ray::new(Vec3::ZERO, -Vec3::X);
        assert!(pick_ray(&scene, away, &[b], PickOptions::default()).is_none());
    }

    #[test]
    fn scale_grows_the_hit_radius() {
        let mut scene = SceneGraph::new();
        let a = ball(&mut scene, Vec3::new(5.0, 0.0, 0.0), 1.0);
        let ray = Ray::new(Vec3::new(0.0, 1.2, 0.0), Vec3::X);
        assert!(pick_ray(&scene, ray, &[a], PickOptions::default()).is_none());
        scene.node_mut(a).expect("node").transform.scale = Vec3::splat(1.5);
        assert!(pick_ray(&scene, ray, &[a], PickOptions::default()).is_some());
    }
}
