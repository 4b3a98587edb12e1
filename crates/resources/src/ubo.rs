//! Packed shader constant layouts.
//!
//! This module defines the data written into each frame resource's constant
//! regions. All structures use `#[repr(C)]` for correct memory layout and
//! implement `bytemuck::Pod` and `bytemuck::Zeroable` for safe byte-level
//! operations.
//!
//! # Overview
//!
//! - [`ObjectConstants`] - per render item transforms
//! - [`MaterialConstants`] - per material shading parameters
//! - [`PassConstants`] - one block per frame: camera, timing, fog, lights
//! - [`Light`] - one entry of the pass light array
//!
//! # Matrix Storage
//!
//! The shaders declare their cbuffers `row_major`, so every matrix is stored
//! transposed relative to glam's column-major layout. The constructors here
//! do the transposition; callers pass ordinary glam matrices.
//!
//! # Example
//!
//! ```
//! use frameflight_resources::ubo::ObjectConstants;
//! use glam::{Mat4, Vec3};
//!
//! let world = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
//! let constants = ObjectConstants::new(world, Mat4::IDENTITY);
//! assert_eq!(constants.world, world.transpose());
//!
//! let bytes: &[u8] = bytemuck::bytes_of(&constants);
//! assert_eq!(bytes.len(), 128);
//! ```

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2, Vec3, Vec4};

/// Number of entries in [`PassConstants::lights`].
pub const MAX_LIGHTS: usize = 16;

/// Inverts `m`, falling back to identity when it is singular.
///
/// Keeps NaN/Inf out of the constant buffers when a transform degenerates
/// (e.g. zero scale).
#[inline]
pub fn inverse_or_identity(m: Mat4) -> Mat4 {
    const EPSILON: f32 = 1e-6;
    if m.determinant().abs() < EPSILON {
        Mat4::IDENTITY
    } else {
        m.inverse()
    }
}

/// Per render item constants.
///
/// # Memory Layout
///
/// | Offset | Size | Field |
/// |--------|------|-------|
/// | 0      | 64   | world |
/// | 64     | 64   | tex_transform |
///
/// Total size: 128 bytes
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct ObjectConstants {
    /// Object to world transform, transposed.
    pub world: Mat4,
    /// Texture coordinate transform, transposed.
    pub tex_transform: Mat4,
}

impl ObjectConstants {
    /// Packs a render item's transforms.
    #[inline]
    pub fn new(world: Mat4, tex_transform: Mat4) -> Self {
        Self {
            world: world.transpose(),
            tex_transform: tex_transform.transpose(),
        }
    }
}

/// Per material constants.
///
/// # Memory Layout
///
/// | Offset | Size | Field |
/// |--------|------|-------|
/// | 0      | 16   | diffuse_albedo |
/// | 16     | 12   | fresnel_r0 |
/// | 28     | 4    | roughness |
/// | 32     | 64   | mat_transform |
///
/// Total size: 96 bytes
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct MaterialConstants {
    /// Diffuse reflectance (RGBA).
    pub diffuse_albedo: Vec4,
    /// Reflectance at normal incidence.
    pub fresnel_r0: Vec3,
    /// Surface roughness in [0, 1].
    pub roughness: f32,
    /// Texture coordinate transform, transposed.
    pub mat_transform: Mat4,
}

impl MaterialConstants {
    /// Packs material parameters.
    #[inline]
    pub fn new(diffuse_albedo: Vec4, fresnel_r0: Vec3, roughness: f32, mat_transform: Mat4) -> Self {
        Self {
            diffuse_albedo,
            fresnel_r0,
            roughness,
            mat_transform: mat_transform.transpose(),
        }
    }
}

/// Light source entry.
///
/// Directional, point and spot lights share the layout; unused fields are
/// ignored by the shader for each kind.
///
/// Total size: 48 bytes
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Light {
    /// Emitted radiance (RGB).
    pub strength: Vec3,
    /// Distance at which attenuation starts (point/spot).
    pub falloff_start: f32,
    /// Direction the light travels (directional/spot).
    pub direction: Vec3,
    /// Distance at which the light is fully attenuated (point/spot).
    pub falloff_end: f32,
    /// World position (point/spot).
    pub position: Vec3,
    /// Spot cone exponent.
    pub spot_power: f32,
}

impl Default for Light {
    fn default() -> Self {
        Self {
            strength: Vec3::splat(0.5),
            falloff_start: 1.0,
            direction: Vec3::new(0.0, -1.0, 0.0),
            falloff_end: 10.0,
            position: Vec3::ZERO,
            spot_power: 64.0,
        }
    }
}

impl Light {
    /// A point light at `position`.
    pub fn point(position: Vec3, strength: Vec3) -> Self {
        Self {
            position,
            strength,
            ..Self::default()
        }
    }

    /// A directional light travelling along `direction`.
    pub fn directional(direction: Vec3, strength: Vec3) -> Self {
        Self {
            // normalize_or_zero keeps NaN out of the buffer for a zero vector
            direction: direction.normalize_or_zero(),
            strength,
            ..Self::default()
        }
    }
}

/// Pass-global constants, rebuilt every frame.
///
/// # Memory Layout
///
/// | Offset | Size | Field |
/// |--------|------|-------|
/// | 0      | 384  | view .. inv_view_proj (6 × Mat4) |
/// | 384    | 16   | eye_pos_w + pad |
/// | 400    | 16   | render target size and inverse |
/// | 416    | 16   | near_z, far_z, total_time, delta_time |
/// | 432    | 16   | ambient_light |
/// | 448    | 16   | fog_color |
/// | 464    | 16   | fog_start, fog_range + pad |
/// | 480    | 768  | lights |
///
/// Total size: 1248 bytes
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct PassConstants {
    pub view: Mat4,
    pub inv_view: Mat4,
    pub proj: Mat4,
    pub inv_proj: Mat4,
    pub view_proj: Mat4,
    pub inv_view_proj: Mat4,
    pub eye_pos_w: Vec3,
    pub _padding0: f32,
    pub render_target_size: Vec2,
    pub inv_render_target_size: Vec2,
    pub near_z: f32,
    pub far_z: f32,
    pub total_time: f32,
    pub delta_time: f32,
    pub ambient_light: Vec4,
    pub fog_color: Vec4,
    pub fog_start: f32,
    pub fog_range: f32,
    pub _padding1: Vec2,
    pub lights: [Light; MAX_LIGHTS],
}

impl Default for PassConstants {
    fn default() -> Self {
        Self {
            view: Mat4::IDENTITY,
            inv_view: Mat4::IDENTITY,
            proj: Mat4::IDENTITY,
            inv_proj: Mat4::IDENTITY,
            view_proj: Mat4::IDENTITY,
            inv_view_proj: Mat4::IDENTITY,
            eye_pos_w: Vec3::ZERO,
            _padding0: 0.0,
            render_target_size: Vec2::ZERO,
            inv_render_target_size: Vec2::ZERO,
            near_z: 0.0,
            far_z: 0.0,
            total_time: 0.0,
            delta_time: 0.0,
            ambient_light: Vec4::new(0.0, 0.0, 0.0, 1.0),
            fog_color: Vec4::new(0.7, 0.7, 0.7, 1.0),
            fog_start: 5.0,
            fog_range: 150.0,
            _padding1: Vec2::ZERO,
            lights: [Light::default(); MAX_LIGHTS],
        }
    }
}

impl PassConstants {
    /// Sets the camera matrices and eye position.
    ///
    /// Derives the view-projection product and all three inverses, then
    /// stores everything transposed.
    pub fn set_camera(&mut self, view: Mat4, proj: Mat4, eye_pos_w: Vec3) {
        // Row-vector convention on the shader side: v * view * proj.
        let view_proj = proj * view;

        self.view = view.transpose();
        self.inv_view = inverse_or_identity(view).transpose();
        self.proj = proj.transpose();
        self.inv_proj = inverse_or_identity(proj).transpose();
        self.view_proj = view_proj.transpose();
        self.inv_view_proj = inverse_or_identity(view_proj).transpose();
        self.eye_pos_w = eye_pos_w;
    }

    /// Sets the render target size and its reciprocal.
    pub fn set_render_target_size(&mut self, width: u32, height: u32) {
        let size = Vec2::new(width as f32, height as f32);
        self.render_target_size = size;
        self.inv_render_target_size = size.recip();
    }
}
