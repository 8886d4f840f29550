//! Scene-wide ray intersection backed by a triangle BVH.

use vesper_core::{Scene, SceneError};
use vesper_math::{Aabb, Interval, Ray, Vec2};

use crate::bvh::BvhNode;
use crate::hittable::{hit_error_bound, HitRecord, RayCaster};
use crate::triangle::Triangle;

/// Flattens every instance into world-space triangles under one BVH.
pub struct SceneIntersector {
    bvh: BvhNode,
    triangle_count: usize,
}

impl SceneIntersector {
    /// Build the acceleration structure for a validated scene.
    pub fn build(scene: &Scene) -> Result<Self, SceneError> {
        scene.validate()?;

        let mut triangles = Vec::with_capacity(scene.total_triangle_count());
        for (instance_id, instance) in scene.instances.iter().enumerate() {
            let model = scene.model_data(instance_id as u32, instance.geometry_id)?;
            for (primitive_id, vertices) in model.mesh.extract_triangle_vertices() {
                let world = vertices.map(|v| model.local_to_world.transform_point3(v));
                triangles.push(Triangle::new(
                    world,
                    instance_id as u32,
                    instance.geometry_id,
                    primitive_id,
                ));
            }
        }

        let triangle_count = triangles.len();
        let bvh = BvhNode::new(triangles);
        log::debug!(
            "Built BVH over {} triangles from {} instances",
            triangle_count,
            scene.instances.len()
        );

        Ok(Self { bvh, triangle_count })
    }

    pub fn triangle_count(&self) -> usize {
        self.triangle_count
    }

    pub fn bounds(&self) -> Aabb {
        self.bvh.bounding_box()
    }
}

impl RayCaster for SceneIntersector {
    fn cast_ray(&self, ray: &Ray, ray_t: Interval) -> Option<HitRecord> {
        let (hit, triangle) = self.bvh.hit(ray, ray_t)?;
        let position = ray.at(hit.t);

        Some(HitRecord {
            position,
            normal: triangle.normal(),
            view: -ray.direction.normalize(),
            t: hit.t,
            error: hit_error_bound(position, hit.t),
            bary: Vec2::new(hit.u, hit.v),
            instance_id: triangle.instance_id,
            geometry_id: triangle.geometry_id,
            primitive_id: triangle.primitive_id,
        })
    }

    fn occluded(&self, ray: &Ray, ray_t: Interval) -> bool {
        self.bvh.any_hit(ray, ray_t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use vesper_core::{Material, Mesh, Transform};
    use vesper_math::Vec3;

    fn two_instance_scene() -> Scene {
        let mut scene = Scene::new("quads");
        let material_id = scene.add_material(Material::diffuse("white", Vec3::ONE));
        let mesh = Mesh::new(
            vec![
                Vec3::new(-1.0, -1.0, 0.0),
                Vec3::new(1.0, -1.0, 0.0),
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::new(-1.0, 1.0, 0.0),
            ],
            vec![0, 1, 2, 0, 2, 3],
            None,
        );
        let geometry_id = scene.add_geometry("quad", Arc::new(mesh), material_id);
        scene.add_instance(geometry_id, Transform::from_translation(Vec3::new(0.0, 0.0, -2.0)));
        scene.add_instance(geometry_id, Transform::from_translation(Vec3::new(0.0, 0.0, -5.0)));
        scene
    }

    #[test]
    fn test_cast_ray_reports_ids_and_error() {
        let intersector = SceneIntersector::build(&two_instance_scene()).unwrap();
        assert_eq!(intersector.triangle_count(), 4);

        let ray = Ray::new(Vec3::new(0.2, 0.5, 0.0), Vec3::new(0.0, 0.0, -1.0));
        let hit = intersector.cast_ray(&ray, Interval::FORWARD).unwrap();

        assert_eq!(hit.instance_id, 0);
        assert_eq!(hit.geometry_id, 0);
        assert!((hit.t - 2.0).abs() < 0.001);
        assert!((hit.normal - Vec3::Z).length() < 0.001);
        assert!((hit.view - Vec3::Z).length() < 0.001);
        assert!(hit.error > 0.0 && hit.error < 1e-4);
    }

    #[test]
    fn test_occluded_respects_interval() {
        let intersector = SceneIntersector::build(&two_instance_scene()).unwrap();
        let ray = Ray::new(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0));

        assert!(intersector.occluded(&ray, Interval::new(0.0, 3.0)));
        assert!(!intersector.occluded(&ray, Interval::new(0.0, 1.5)));

        let beyond = Ray::new(Vec3::new(0.0, 0.0, -3.0), Vec3::new(0.0, 0.0, -1.0));
        let hit = intersector.cast_ray(&beyond, Interval::FORWARD).unwrap();
        assert_eq!(hit.instance_id, 1);
    }

    #[test]
    fn test_build_rejects_empty_scene() {
        assert!(SceneIntersector::build(&Scene::new("empty")).is_err());
    }
}
