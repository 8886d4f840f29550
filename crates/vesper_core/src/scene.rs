//! Scene description consumed by the renderer.
//!
//! A scene is a flat list of geometries (mesh + material) and instances
//! placing them in the world. Ray hits identify their surface by
//! `(instance_id, geometry_id, primitive_id)`.

use std::sync::Arc;

use thiserror::Error;
use vesper_math::{Aabb, Mat4, Mat4Ext, Quat, Vec3};

use crate::material::Material;
use crate::mesh::Mesh;

/// Errors raised by scene lookups and validation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SceneError {
    #[error("Instance {0} does not exist")]
    MissingInstance(u32),

    #[error("Instance {instance_id} references geometry {expected}, not {geometry_id}")]
    GeometryMismatch {
        instance_id: u32,
        geometry_id: u32,
        expected: u32,
    },

    #[error("Geometry {0} does not exist")]
    MissingGeometry(u32),

    #[error("Geometry {geometry_id} references missing material {material_id}")]
    MissingMaterial { geometry_id: u32, material_id: usize },

    #[error("Scene has no geometry")]
    Empty,
}

pub type SceneResult<T> = Result<T, SceneError>;

/// A mesh with its material, shared by any number of instances.
#[derive(Clone, Debug)]
pub struct Geometry {
    pub name: String,
    pub mesh: Arc<Mesh>,
    pub material_id: usize,
}

/// Transform components that can be composed into a matrix.
#[derive(Clone, Debug)]
pub struct Transform {
    /// Translation
    pub translation: Vec3,

    /// Rotation (as quaternion)
    pub rotation: Quat,

    /// Scale
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    /// Create a new transform with only translation.
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Default::default()
        }
    }

    /// Create a new transform from a 4x4 matrix.
    ///
    /// Decomposes the matrix into translation, rotation, and scale.
    pub fn from_matrix(matrix: Mat4) -> Self {
        let (scale, rotation, translation) = matrix.to_scale_rotation_translation();
        Self {
            translation,
            rotation,
            scale,
        }
    }

    /// Convert to a 4x4 transformation matrix.
    ///
    /// Order: Scale -> Rotate -> Translate (SRT)
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

/// A placed geometry.
#[derive(Clone, Debug)]
pub struct Instance {
    pub geometry_id: u32,
    pub transform: Transform,
}

impl Instance {
    pub fn new(geometry_id: u32, transform: Transform) -> Self {
        Self {
            geometry_id,
            transform,
        }
    }

    /// Local-to-world matrix of this instance.
    pub fn local_to_world(&self) -> Mat4 {
        self.transform.to_matrix()
    }
}

/// Everything surface construction needs about one hit object.
#[derive(Clone, Copy, Debug)]
pub struct ModelData<'a> {
    pub local_to_world: Mat4,
    pub mesh: &'a Mesh,
    pub material: &'a Material,
}

/// A complete scene containing geometries, instances, and materials.
#[derive(Clone, Debug, Default)]
pub struct Scene {
    pub geometries: Vec<Geometry>,
    pub instances: Vec<Instance>,
    pub materials: Vec<Arc<Material>>,
    pub name: String,
}

impl Scene {
    /// Create an empty scene.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Add a material to the scene and return its ID.
    pub fn add_material(&mut self, material: Material) -> usize {
        let id = self.materials.len();
        self.materials.push(Arc::new(material));
        id
    }

    /// Add a geometry and return its ID.
    pub fn add_geometry(&mut self, name: impl Into<String>, mesh: Arc<Mesh>, material_id: usize) -> u32 {
        let id = self.geometries.len() as u32;
        self.geometries.push(Geometry {
            name: name.into(),
            mesh,
            material_id,
        });
        id
    }

    /// Add an instance of a geometry and return its ID.
    pub fn add_instance(&mut self, geometry_id: u32, transform: Transform) -> u32 {
        let id = self.instances.len() as u32;
        self.instances.push(Instance::new(geometry_id, transform));
        id
    }

    /// Resolve the transform, mesh and material behind a hit.
    pub fn model_data(&self, instance_id: u32, geometry_id: u32) -> SceneResult<ModelData<'_>> {
        let instance = self
            .instances
            .get(instance_id as usize)
            .ok_or(SceneError::MissingInstance(instance_id))?;
        if instance.geometry_id != geometry_id {
            return Err(SceneError::GeometryMismatch {
                instance_id,
                geometry_id,
                expected: instance.geometry_id,
            });
        }

        let geometry = self.geometry(geometry_id)?;
        let material = self.materials.get(geometry.material_id).ok_or(SceneError::MissingMaterial {
            geometry_id,
            material_id: geometry.material_id,
        })?;

        Ok(ModelData {
            local_to_world: instance.local_to_world(),
            mesh: &geometry.mesh,
            material,
        })
    }

    fn geometry(&self, geometry_id: u32) -> SceneResult<&Geometry> {
        self.geometries
            .get(geometry_id as usize)
            .ok_or(SceneError::MissingGeometry(geometry_id))
    }

    /// Check every instance/material reference.
    pub fn validate(&self) -> SceneResult<()> {
        if self.instances.is_empty() {
            return Err(SceneError::Empty);
        }
        for (id, instance) in self.instances.iter().enumerate() {
            self.model_data(id as u32, instance.geometry_id)?;
        }
        Ok(())
    }

    /// Get total triangle count across all instances.
    pub fn total_triangle_count(&self) -> usize {
        self.instances
            .iter()
            .filter_map(|instance| self.geometries.get(instance.geometry_id as usize))
            .map(|geometry| geometry.mesh.triangle_count())
            .sum()
    }

    /// Compute the world-space bounding box of all instances.
    pub fn world_bounds(&self) -> Aabb {
        self.instances.iter().fold(Aabb::EMPTY, |bounds, instance| {
            match self.geometries.get(instance.geometry_id as usize) {
                Some(geometry) if !geometry.mesh.bounds.is_empty() => {
                    let world = instance.local_to_world().transform_aabb(&geometry.mesh.bounds);
                    Aabb::surrounding(&bounds, &world)
                }
                _ => bounds,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle_scene() -> Scene {
        let mut scene = Scene::new("test");
        let material_id = scene.add_material(Material::new("grey", Vec3::splat(0.5)));
        let mesh = Arc::new(Mesh::new(vec![Vec3::ZERO, Vec3::X, Vec3::Y], vec![0, 1, 2], None));
        let geometry_id = scene.add_geometry("triangle", mesh, material_id);

        scene.add_instance(geometry_id, Transform::default());
        scene.add_instance(geometry_id, Transform::from_translation(Vec3::new(1.0, 0.0, 0.0)));
        scene
    }

    #[test]
    fn test_scene_creation() {
        let scene = triangle_scene();

        assert_eq!(scene.instances.len(), 2);
        assert_eq!(scene.total_triangle_count(), 2);
        assert!(scene.validate().is_ok());

        let bounds = scene.world_bounds();
        assert!((bounds.max().x - 2.0).abs() < 0.001);
    }

    #[test]
    fn test_model_data_lookup() {
        let scene = triangle_scene();

        let data = scene.model_data(1, 0).unwrap();
        let p = data.local_to_world.transform_point3(Vec3::ZERO);
        assert!((p - Vec3::X).length() < 0.001);
        assert_eq!(data.material.name, "grey");

        assert_eq!(scene.model_data(5, 0).unwrap_err(), SceneError::MissingInstance(5));
        assert!(matches!(
            scene.model_data(0, 3),
            Err(SceneError::GeometryMismatch { expected: 0, .. })
        ));
    }

    #[test]
    fn test_validate_missing_material() {
        let mut scene = Scene::new("broken");
        let mesh = Arc::new(Mesh::new(vec![Vec3::ZERO, Vec3::X, Vec3::Y], vec![0, 1, 2], None));
        let geometry_id = scene.add_geometry("triangle", mesh, 4);
        scene.add_instance(geometry_id, Transform::default());

        assert!(matches!(scene.validate(), Err(SceneError::MissingMaterial { material_id: 4, .. })));
        assert_eq!(Scene::new("empty").validate(), Err(SceneError::Empty));
    }

    #[test]
    fn test_transform_matrix_roundtrip() {
        let transform = Transform {
            translation: Vec3::new(1.0, 2.0, 3.0),
            rotation: Quat::from_rotation_y(std::f32::consts::FRAC_PI_4),
            scale: Vec3::new(2.0, 2.0, 2.0),
        };

        let recovered = Transform::from_matrix(transform.to_matrix());

        assert!((recovered.translation - transform.translation).length() < 0.001);
        assert!((recovered.scale - transform.scale).length() < 0.001);
    }
}
