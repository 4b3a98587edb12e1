//! Material definitions.

use glam::{Mat4, Vec3, Vec4};

use crate::ubo::MaterialConstants;

/// Surface material shared by any number of render items.
///
/// The fields are the authoritative state; [`constants`](Self::constants)
/// packs them for upload. Whoever mutates a material is responsible for
/// marking it dirty so every frame resource picks up the change.
#[derive(Debug, Clone)]
pub struct Material {
    /// Unique name for lookup
    pub name: String,
    /// Index into the per-frame material constant region
    pub constant_index: usize,
    /// Descriptor-heap slot of the diffuse texture
    pub diffuse_srv_index: u32,
    /// Diffuse reflectance (RGBA)
    pub diffuse_albedo: Vec4,
    /// Reflectance at normal incidence
    pub fresnel_r0: Vec3,
    /// Roughness factor (0.0 = smooth, 1.0 = rough)
    pub roughness: f32,
    /// Texture coordinate transform
    pub mat_transform: Mat4,
}

impl Material {
    /// Creates a material with default shading parameters.
    pub fn new(name: impl Into<String>, constant_index: usize, diffuse_srv_index: u32) -> Self {
        Self {
            name: name.into(),
            constant_index,
            diffuse_srv_index,
            diffuse_albedo: Vec4::ONE,
            fresnel_r0: Vec3::splat(0.01),
            roughness: 0.25,
            mat_transform: Mat4::IDENTITY,
        }
    }

    /// Sets the diffuse albedo.
    pub fn with_albedo(mut self, diffuse_albedo: Vec4) -> Self {
        self.diffuse_albedo = diffuse_albedo;
        self
    }

    /// Sets Fresnel R0 and roughness.
    pub fn with_surface(mut self, fresnel_r0: Vec3, roughness: f32) -> Self {
        self.fresnel_r0 = fresnel_r0;
        self.roughness = roughness;
        self
    }

    /// Current texture translation (u, v).
    pub fn texture_offset(&self) -> (f32, f32) {
        (self.mat_transform.w_axis.x, self.mat_transform.w_axis.y)
    }

    /// Replaces the texture translation, keeping the rest of the transform.
    pub fn set_texture_offset(&mut self, u: f32, v: f32) {
        self.mat_transform.w_axis.x = u;
        self.mat_transform.w_axis.y = v;
    }

    /// Packs the material for upload.
    pub fn constants(&self) -> MaterialConstants {
        MaterialConstants::new(
            self.diffuse_albedo,
            self.fresnel_r0,
            self.roughness,
            self.mat_transform,
        )
    }
}
