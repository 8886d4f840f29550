//! Per-hit shading state.
//!
//! [`SurfaceParameters`] gathers everything the BSDF needs at one ray hit: the
//! shading frame, the resolved base color and the material's scalar inputs.
//! It is rebuilt for every hit and never modified afterwards.

use vesper_core::{FaceTextureFilter, MaterialFlags, ModelData, Scene, SceneError, ShaderType};
use vesper_math::{saturate, Mat3, Mat4Ext, TangentFrame, Vec3};

use crate::bsdf::calculate_lobe_pdfs;
use crate::hittable::HitRecord;
use crate::Color;

/// Roughness below which specular lobes are treated as perfect mirrors.
pub const DIRAC_ROUGHNESS: f32 = 0.01;

/// Gamma applied to authored base colors.
const BASE_COLOR_GAMMA: f32 = 2.2;

/// Shading inputs at a single surface point.
#[derive(Clone, Debug, PartialEq)]
pub struct SurfaceParameters {
    pub position: Vec3,
    /// Bound on the floating point error of `position`
    pub error: f32,
    /// True (unflipped) face normal of the hit triangle
    pub face_normal: Vec3,
    pub world_to_tangent: Mat3,
    pub tangent_to_world: Mat3,
    /// Unit direction towards the viewer (or previous path vertex)
    pub view: Vec3,

    pub base_color: Color,
    pub transmittance_color: Color,
    pub metallic: f32,
    pub roughness: f32,
    pub anisotropic: f32,
    pub specular_tint: f32,
    pub sheen: f32,
    pub sheen_tint: f32,
    pub clearcoat: f32,
    pub clearcoat_gloss: f32,
    pub spec_trans: f32,
    pub diffuse_trans: f32,
    pub flatness: f32,
    pub scatter_distance: f32,
    pub ior: f32,
    /// Ratio of the indices of refraction across the surface as seen from `view`
    pub relative_ior: f32,

    pub flags: MaterialFlags,
    pub shader: ShaderType,
}

/// Build the shading state for a hit on a resolved model.
///
/// `face_filter` overrides the base color when the material uses per-face
/// texturing; the material's own uv texture is used otherwise.
pub fn calculate_surface_params(
    hit: &HitRecord,
    model: &ModelData<'_>,
    face_filter: Option<&dyn FaceTextureFilter>,
) -> SurfaceParameters {
    let mesh = model.mesh;
    let material = model.material;
    let params = &material.params;

    // Shading normal: interpolated vertex normals, else the face normal
    let normal = mesh
        .interpolate_normal(hit.primitive_id, hit.bary)
        .map(|n| model.local_to_world.transform_normal3(n))
        .filter(|n| n.is_finite() && n.length_squared() > 0.0)
        .unwrap_or(hit.normal);

    let frame = match mesh.interpolate_tangent(hit.primitive_id, hit.bary) {
        Some(tangent) => {
            let world = model.local_to_world.transform_vector3(tangent.truncate());
            TangentFrame::from_normal_tangent(normal, world, tangent.w)
        }
        None => TangentFrame::from_normal(normal),
    };

    let uv = mesh.interpolate_uv(hit.primitive_id, hit.bary);
    let face_color = if material.flags.contains(MaterialFlags::USES_FACE_TEXTURE) {
        face_filter.and_then(|filter| filter.eval(hit.primitive_id, hit.bary))
    } else {
        None
    };
    let authored = face_color
        .or_else(|| {
            let texture = material.base_color_texture.as_ref()?;
            let uv = uv?;
            Some(texture.sample(uv.x, uv.y))
        })
        .unwrap_or(params.base_color);
    let base_color = authored.max(Vec3::ZERO).powf(BASE_COLOR_GAMMA);

    let relative_ior = if material.flags.contains(MaterialFlags::TRANSPARENT)
        && hit.view.dot(frame.normal) < 0.0
    {
        params.ior
    } else {
        1.0 / params.ior
    };

    SurfaceParameters {
        position: hit.position,
        error: hit.error,
        face_normal: hit.normal,
        world_to_tangent: frame.world_to_tangent(),
        tangent_to_world: frame.tangent_to_world(),
        view: hit.view,
        base_color,
        transmittance_color: params.transmittance_color,
        metallic: saturate(params.metallic),
        roughness: params.roughness,
        anisotropic: params.anisotropic,
        specular_tint: params.specular_tint,
        sheen: params.sheen,
        sheen_tint: params.sheen_tint,
        clearcoat: params.clearcoat,
        clearcoat_gloss: params.clearcoat_gloss,
        spec_trans: saturate(params.spec_trans),
        diffuse_trans: params.diffuse_trans * 0.5,
        flatness: params.flatness,
        scatter_distance: params.scatter_distance,
        ior: params.ior,
        relative_ior,
        flags: material.flags,
        shader: material.shader,
    }
}

impl SurfaceParameters {
    /// Resolve the hit's model in `scene` and build its shading state.
    ///
    /// Uses the material's own per-face texture as the face filter.
    pub fn from_hit(scene: &Scene, hit: &HitRecord) -> Result<Self, SceneError> {
        let model = scene.model_data(hit.instance_id, hit.geometry_id)?;
        let filter = model
            .material
            .face_texture
            .as_deref()
            .map(|texture| texture as &dyn FaceTextureFilter);
        Ok(calculate_surface_params(hit, &model, filter))
    }

    pub fn geometric_tangent(&self) -> Vec3 {
        self.tangent_to_world.x_axis
    }

    pub fn geometric_normal(&self) -> Vec3 {
        self.tangent_to_world.y_axis
    }

    pub fn geometric_bitangent(&self) -> Vec3 {
        self.tangent_to_world.z_axis
    }

    #[inline]
    pub fn to_local(&self, v: Vec3) -> Vec3 {
        self.world_to_tangent * v
    }

    #[inline]
    pub fn to_world(&self, v: Vec3) -> Vec3 {
        self.tangent_to_world * v
    }

    /// Ray origin pushed off the surface to the side `direction` leaves on.
    pub fn offset_ray_origin(&self, direction: Vec3, bias_scale: f32) -> Vec3 {
        self.offset_ray_origin_signed(direction, bias_scale).0
    }

    /// Like [`SurfaceParameters::offset_ray_origin`], also returning the
    /// signed distance moved along the face normal.
    pub fn offset_ray_origin_signed(&self, direction: Vec3, bias_scale: f32) -> (Vec3, f32) {
        let sign = if direction.dot(self.face_normal) < 0.0 { -1.0 } else { 1.0 };
        let signed_bias = sign * self.error * bias_scale;
        (self.position + self.face_normal * signed_bias, signed_bias)
    }

    /// Survival probability for Russian roulette.
    pub fn continuation_probability(&self) -> f32 {
        saturate(self.base_color.max_element())
    }

    pub fn is_thin(&self) -> bool {
        self.shader.is_thin()
    }

    /// True when every active lobe is a perfect mirror or refraction.
    ///
    /// Such vertices cannot be connected to or merged at.
    pub fn is_dirac(&self) -> bool {
        if self.roughness >= DIRAC_ROUGHNESS {
            return false;
        }
        let pdfs = calculate_lobe_pdfs(self);
        pdfs.diffuse <= 0.0 && pdfs.clearcoat <= 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use vesper_core::{FaceTile, Material, Mesh, PerFaceTexture, Texture, Transform};
    use vesper_math::{Mat4, Quat, Vec2, Vec4};

    fn quad_mesh() -> Mesh {
        Mesh::new(
            vec![
                Vec3::new(-1.0, 0.0, 1.0),
                Vec3::new(1.0, 0.0, 1.0),
                Vec3::new(1.0, 0.0, -1.0),
                Vec3::new(-1.0, 0.0, -1.0),
            ],
            vec![0, 1, 2, 0, 2, 3],
            None,
        )
    }

    fn hit_from_above() -> HitRecord {
        HitRecord {
            position: Vec3::new(0.25, 0.0, 0.1),
            normal: Vec3::Y,
            view: Vec3::new(0.0, 1.0, 1.0).normalize(),
            t: 2.0,
            error: 1e-3,
            bary: Vec2::new(0.3, 0.2),
            instance_id: 0,
            geometry_id: 0,
            primitive_id: 0,
        }
    }

    fn model<'a>(mesh: &'a Mesh, material: &'a Material) -> ModelData<'a> {
        ModelData {
            local_to_world: Mat4::IDENTITY,
            mesh,
            material,
        }
    }

    #[test]
    fn test_falls_back_to_face_normal() {
        let mesh = quad_mesh();
        let material = Material::new("grey", Vec3::splat(0.5));
        let surface = calculate_surface_params(&hit_from_above(), &model(&mesh, &material), None);

        assert!((surface.geometric_normal() - Vec3::Y).length() < 1e-4);
        assert!((surface.to_local(Vec3::Y) - Vec3::Y).length() < 1e-4);
        let t = surface.geometric_tangent();
        let b = surface.geometric_bitangent();
        assert!(t.dot(Vec3::Y).abs() < 1e-4 && b.dot(Vec3::Y).abs() < 1e-4);
        assert!(t.dot(b).abs() < 1e-4);
    }

    #[test]
    fn test_interpolated_normal_uses_instance_transform() {
        let mut mesh = quad_mesh();
        mesh.normals = Some(vec![Vec3::Y; 4]);
        let material = Material::new("grey", Vec3::splat(0.5));
        let rotation = Quat::from_rotation_z(std::f32::consts::FRAC_PI_2);
        let data = ModelData {
            local_to_world: Mat4::from_quat(rotation),
            mesh: &mesh,
            material: &material,
        };

        let surface = calculate_surface_params(&hit_from_above(), &data, None);
        assert!((surface.geometric_normal() - Vec3::new(-1.0, 0.0, 0.0)).length() < 1e-4);
    }

    #[test]
    fn test_authored_tangent_is_kept() {
        let mut mesh = quad_mesh();
        mesh.normals = Some(vec![Vec3::Y; 4]);
        let mesh = mesh.with_tangents(vec![Vec4::new(0.0, 0.0, 1.0, 1.0); 4]);
        let material = Material::new("grey", Vec3::splat(0.5));

        let surface = calculate_surface_params(&hit_from_above(), &model(&mesh, &material), None);
        assert!((surface.geometric_tangent() - Vec3::Z).length() < 1e-4);
        // Columns of tangent_to_world are the rows of world_to_tangent
        let round_trip = surface.world_to_tangent * surface.tangent_to_world;
        assert!(round_trip.abs_diff_eq(Mat3::IDENTITY, 1e-4));
    }

    #[test]
    fn test_base_color_is_linearized() {
        let mesh = quad_mesh();
        let material = Material::new("grey", Vec3::new(0.5, 1.0, 0.0));
        let surface = calculate_surface_params(&hit_from_above(), &model(&mesh, &material), None);

        assert!((surface.base_color.x - 0.5f32.powf(2.2)).abs() < 1e-5);
        assert!((surface.base_color.y - 1.0).abs() < 1e-5);
        assert_eq!(surface.base_color.z, 0.0);
        assert!((surface.continuation_probability() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_uv_texture_overrides_constant_color() {
        let mesh = quad_mesh().with_uvs(vec![Vec2::ZERO, Vec2::X, Vec2::ONE, Vec2::Y]);
        let texture = Arc::new(Texture::solid_color(Vec3::new(0.25, 0.25, 0.25)));
        let material = Material::new("textured", Vec3::ONE).with_base_color_texture(texture);

        let surface = calculate_surface_params(&hit_from_above(), &model(&mesh, &material), None);
        assert!((surface.base_color.x - 0.25f32.powf(2.2)).abs() < 1e-4);
    }

    #[test]
    fn test_face_filter_takes_precedence() {
        let mesh = quad_mesh();
        let faces = PerFaceTexture::new(vec![
            FaceTile::constant(Vec3::new(1.0, 0.0, 0.0)),
            FaceTile::constant(Vec3::new(0.0, 1.0, 0.0)),
        ]);
        let material = Material::new("faces", Vec3::splat(0.5)).with_face_texture(Arc::new(faces.clone()));

        let surface = calculate_surface_params(&hit_from_above(), &model(&mesh, &material), Some(&faces));
        assert!((surface.base_color - Vec3::X).length() < 1e-4);

        // Without a filter the constant color is used
        let surface = calculate_surface_params(&hit_from_above(), &model(&mesh, &material), None);
        assert!((surface.base_color.x - 0.5f32.powf(2.2)).abs() < 1e-5);
    }

    #[test]
    fn test_scalar_attributes_are_conditioned() {
        let mesh = quad_mesh();
        let mut material = Material::new("m", Vec3::ONE);
        material.params.metallic = 1.5;
        material.params.spec_trans = -0.5;
        material.params.diffuse_trans = 0.8;

        let surface = calculate_surface_params(&hit_from_above(), &model(&mesh, &material), None);
        assert_eq!(surface.metallic, 1.0);
        assert_eq!(surface.spec_trans, 0.0);
        assert!((surface.diffuse_trans - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_relative_ior_depends_on_side() {
        let mesh = quad_mesh();
        let glass = Material::glass("glass", 1.5, 0.0);

        let front = calculate_surface_params(&hit_from_above(), &model(&mesh, &glass), None);
        assert!((front.relative_ior - 1.0 / 1.5).abs() < 1e-6);

        let mut below = hit_from_above();
        below.view = -Vec3::Y;
        let back = calculate_surface_params(&below, &model(&mesh, &glass), None);
        assert!((back.relative_ior - 1.5).abs() < 1e-6);

        // Opaque materials always see the outside ratio
        let opaque = Material::new("grey", Vec3::ONE);
        let back = calculate_surface_params(&below, &model(&mesh, &opaque), None);
        assert!((back.relative_ior - 1.0 / 1.5).abs() < 1e-6);
    }

    #[test]
    fn test_offset_follows_direction_side() {
        let mesh = quad_mesh();
        let material = Material::new("grey", Vec3::ONE);
        let surface = calculate_surface_params(&hit_from_above(), &model(&mesh, &material), None);

        let (up, bias) = surface.offset_ray_origin_signed(Vec3::new(0.3, 0.5, 0.0), 1.0);
        assert!((bias - 1e-3).abs() < 1e-9);
        assert!((up - surface.position - Vec3::Y * 1e-3).length() < 1e-7);

        let down = surface.offset_ray_origin(Vec3::new(0.0, -1.0, 0.2), 0.1);
        assert!((down.y + 1e-4).abs() < 1e-8);
    }

    #[test]
    fn test_dirac_classification() {
        let mesh = quad_mesh();
        let data_surface = |material: &Material| {
            calculate_surface_params(&hit_from_above(), &model(&mesh, material), None)
        };

        assert!(data_surface(&Material::metal("mirror", Vec3::ONE, 0.0)).is_dirac());
        assert!(data_surface(&Material::glass("glass", 1.5, 0.0)).is_dirac());
        assert!(!data_surface(&Material::metal("brushed", Vec3::ONE, 0.3)).is_dirac());
        // A diffuse lobe keeps the vertex connectable
        assert!(!data_surface(&Material::new("plastic", Vec3::ONE).with_roughness(0.0)).is_dirac());
    }

    #[test]
    fn test_from_hit_resolves_scene_model() {
        let mut scene = Scene::new("surface");
        let material_id = scene.add_material(Material::new("grey", Vec3::splat(0.5)));
        let geometry_id = scene.add_geometry("quad", Arc::new(quad_mesh()), material_id);
        scene.add_instance(geometry_id, Transform::default());

        let surface = SurfaceParameters::from_hit(&scene, &hit_from_above()).unwrap();
        assert_eq!(surface.shader, ShaderType::DisneySolid);

        let mut missing = hit_from_above();
        missing.instance_id = 3;
        assert_eq!(
            SurfaceParameters::from_hit(&scene, &missing).unwrap_err(),
            SceneError::MissingInstance(3)
        );
    }
}
