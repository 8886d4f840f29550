//! Material descriptors for the Disney shading model.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use vesper_math::Vec3;

use crate::texture::{PerFaceTexture, Texture};

/// Which variant of the Disney BSDF shades a surface.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShaderType {
    /// Closed surfaces bounding a volume; transmission refracts.
    #[default]
    DisneySolid,
    /// Infinitely thin sheets (leaves, paper); transmission passes through.
    DisneyThin,
}

impl ShaderType {
    pub fn is_thin(self) -> bool {
        matches!(self, ShaderType::DisneyThin)
    }
}

bitflags::bitflags! {
    /// Per-material switches.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct MaterialFlags: u32 {
        /// Surface can be seen from behind; ior is used as-is on back faces.
        const TRANSPARENT = 1 << 0;
        /// Base color comes from the per-face texture.
        const USES_FACE_TEXTURE = 1 << 1;
    }
}

/// Scalar and colour inputs of the Disney BSDF.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisneyParameters {
    /// Base color (display referred; linearized with a 2.2 gamma)
    pub base_color: Vec3,
    /// Colour used for the extinction of refracted light
    pub transmittance_color: Vec3,
    pub metallic: f32,
    pub roughness: f32,
    pub anisotropic: f32,
    pub specular_tint: f32,
    pub sheen: f32,
    pub sheen_tint: f32,
    pub clearcoat: f32,
    pub clearcoat_gloss: f32,
    /// Weight of the specular transmission lobe
    pub spec_trans: f32,
    /// Weight of diffuse transmission (thin surfaces)
    pub diffuse_trans: f32,
    /// Blend towards the thin subsurface approximation
    pub flatness: f32,
    /// Mean free path for the extinction of refracted light
    pub scatter_distance: f32,
    pub ior: f32,
}

impl Default for DisneyParameters {
    fn default() -> Self {
        Self {
            base_color: Vec3::new(0.8, 0.8, 0.8),
            transmittance_color: Vec3::ONE,
            metallic: 0.0,
            roughness: 0.5,
            anisotropic: 0.0,
            specular_tint: 0.0,
            sheen: 0.0,
            sheen_tint: 0.5,
            clearcoat: 0.0,
            clearcoat_gloss: 1.0,
            spec_trans: 0.0,
            diffuse_trans: 0.0,
            flatness: 0.0,
            scatter_distance: 0.0,
            ior: 1.5,
        }
    }
}

/// A material: Disney parameters plus optional textures.
#[derive(Clone, Debug, Default)]
pub struct Material {
    pub name: String,
    pub shader: ShaderType,
    pub flags: MaterialFlags,
    pub params: DisneyParameters,
    /// uv-mapped base color
    pub base_color_texture: Option<Arc<Texture>>,
    /// Per-face base color, used when `USES_FACE_TEXTURE` is set
    pub face_texture: Option<Arc<PerFaceTexture>>,
}

impl Default for MaterialFlags {
    fn default() -> Self {
        MaterialFlags::empty()
    }
}

impl Material {
    /// Create a new material with just a name and base color.
    pub fn new(name: impl Into<String>, base_color: Vec3) -> Self {
        Self {
            name: name.into(),
            params: DisneyParameters {
                base_color,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Create a rough diffuse material.
    pub fn diffuse(name: impl Into<String>, color: Vec3) -> Self {
        Self::new(name, color).with_roughness(1.0)
    }

    /// Create a metallic material.
    pub fn metal(name: impl Into<String>, color: Vec3, roughness: f32) -> Self {
        Self::new(name, color)
            .with_metallic(1.0)
            .with_roughness(roughness)
    }

    /// Create a clear dielectric (glass) material.
    pub fn glass(name: impl Into<String>, ior: f32, roughness: f32) -> Self {
        let mut material = Self::new(name, Vec3::ONE)
            .with_roughness(roughness)
            .with_spec_trans(1.0);
        material.params.ior = ior;
        material.flags |= MaterialFlags::TRANSPARENT;
        material
    }

    /// Builder method to set the shader variant.
    pub fn with_shader(mut self, shader: ShaderType) -> Self {
        self.shader = shader;
        self
    }

    /// Builder method to set metallic.
    pub fn with_metallic(mut self, metallic: f32) -> Self {
        self.params.metallic = metallic.clamp(0.0, 1.0);
        self
    }

    /// Builder method to set roughness.
    pub fn with_roughness(mut self, roughness: f32) -> Self {
        self.params.roughness = roughness.clamp(0.0, 1.0);
        self
    }

    pub fn with_spec_trans(mut self, spec_trans: f32) -> Self {
        self.params.spec_trans = spec_trans.clamp(0.0, 1.0);
        self
    }

    pub fn with_clearcoat(mut self, clearcoat: f32, gloss: f32) -> Self {
        self.params.clearcoat = clearcoat.clamp(0.0, 1.0);
        self.params.clearcoat_gloss = gloss.clamp(0.0, 1.0);
        self
    }

    pub fn with_base_color_texture(mut self, texture: Arc<Texture>) -> Self {
        self.base_color_texture = Some(texture);
        self
    }

    /// Attach a per-face texture and switch base color lookups to it.
    pub fn with_face_texture(mut self, texture: Arc<PerFaceTexture>) -> Self {
        self.face_texture = Some(texture);
        self.flags |= MaterialFlags::USES_FACE_TEXTURE;
        self
    }

    pub fn is_transparent(&self) -> bool {
        self.flags.contains(MaterialFlags::TRANSPARENT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_material_default() {
        let mat = Material::new("grey", Vec3::splat(0.5));
        assert!((mat.params.metallic - 0.0).abs() < 0.001);
        assert!((mat.params.roughness - 0.5).abs() < 0.001);
        assert!((mat.params.ior - 1.5).abs() < 0.001);
        assert_eq!(mat.shader, ShaderType::DisneySolid);
        assert!(mat.flags.is_empty());
    }

    #[test]
    fn test_material_presets() {
        let metal = Material::metal("gold", Vec3::new(1.0, 0.8, 0.0), 0.1);
        assert!((metal.params.metallic - 1.0).abs() < 0.001);
        assert!((metal.params.roughness - 0.1).abs() < 0.001);

        let glass = Material::glass("glass", 1.33, 0.0);
        assert!(glass.is_transparent());
        assert!((glass.params.spec_trans - 1.0).abs() < 0.001);
        assert!((glass.params.ior - 1.33).abs() < 0.001);
    }

    #[test]
    fn test_builder_clamps() {
        let mat = Material::new("m", Vec3::ONE)
            .with_metallic(2.0)
            .with_roughness(-1.0)
            .with_shader(ShaderType::DisneyThin);
        assert_eq!(mat.params.metallic, 1.0);
        assert_eq!(mat.params.roughness, 0.0);
        assert!(mat.shader.is_thin());
    }

    #[test]
    fn test_face_texture_sets_flag() {
        let mat = Material::new("m", Vec3::ONE).with_face_texture(Arc::new(PerFaceTexture::default()));
        assert!(mat.flags.contains(MaterialFlags::USES_FACE_TEXTURE));
    }

    #[test]
    fn test_parameters_deserialize_with_defaults() {
        let json = r#"{ "metallic": 1.0, "base_color": [0.9, 0.6, 0.2] }"#;
        let params: DisneyParameters = serde_json::from_str(json).unwrap();
        assert_eq!(params.metallic, 1.0);
        assert!((params.base_color - Vec3::new(0.9, 0.6, 0.2)).length() < 0.001);
        assert!((params.ior - 1.5).abs() < 0.001);
    }
}
