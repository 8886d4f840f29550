//! Vesper Core - scene-side data for the Vesper renderer.
//!
//! This crate provides:
//!
//! - **Geometry**: `Mesh` with optional normals, tangents and uvs
//! - **Materials**: Disney BSDF parameters, shader variants and flags
//! - **Textures**: uv-mapped images and per-face tiles
//! - **Scene**: geometries, instances and the lookups used at ray hits

pub mod material;
pub mod mesh;
pub mod scene;
pub mod texture;

// Re-export commonly used types
pub use material::{DisneyParameters, Material, MaterialFlags, ShaderType};
pub use mesh::Mesh;
pub use scene::{Geometry, Instance, ModelData, Scene, SceneError, SceneResult, Transform};
pub use texture::{FaceTextureFilter, FaceTile, PerFaceTexture, Texture, TextureError};
