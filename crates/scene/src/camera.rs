//! Orbit camera.
//!
//! The eye sits on a sphere around the origin, parameterized by azimuth
//! `theta`, polar angle `phi` and `radius`, and always looks at the origin.
//! Matrices are left-handed with depth in [0, 1].

use std::f32::consts::PI;

use glam::{Mat4, Vec3};

/// Perspective projection parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projection {
    /// Vertical field of view in radians
    pub fov_y: f32,
    /// Width / height
    pub aspect: f32,
    /// Near plane distance
    pub near: f32,
    /// Far plane distance
    pub far: f32,
}

impl Default for Projection {
    fn default() -> Self {
        Self {
            fov_y: 0.25 * PI,
            aspect: 16.0 / 9.0,
            near: 1.0,
            far: 1000.0,
        }
    }
}

/// Camera orbiting the origin in spherical coordinates.
#[derive(Clone, Debug)]
pub struct OrbitCamera {
    /// Azimuth around the Y axis
    pub theta: f32,
    /// Angle from the +Y axis
    pub phi: f32,
    /// Distance from the origin
    pub radius: f32,
    /// Projection settings
    pub projection: Projection,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self {
            theta: 1.5 * PI,
            phi: 0.2 * PI,
            radius: 15.0,
            projection: Projection::default(),
        }
    }
}

impl OrbitCamera {
    /// Minimum distance from the target.
    pub const MIN_RADIUS: f32 = 5.0;
    /// Maximum distance from the target.
    pub const MAX_RADIUS: f32 = 150.0;

    /// Create a new camera with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Update the aspect ratio from a render target size.
    pub fn set_aspect(&mut self, width: u32, height: u32) {
        if height > 0 {
            self.projection.aspect = width as f32 / height as f32;
        }
    }

    /// Rotates the camera, keeping `phi` away from the poles.
    pub fn orbit(&mut self, d_theta: f32, d_phi: f32) {
        self.theta += d_theta;
        self.phi = (self.phi + d_phi).clamp(0.1, PI - 0.1);
    }

    /// Moves the camera toward or away from the origin.
    pub fn zoom(&mut self, delta: f32) {
        self.radius = (self.radius + delta).clamp(Self::MIN_RADIUS, Self::MAX_RADIUS);
    }

    /// Eye position in world space.
    pub fn eye_position(&self) -> Vec3 {
        Vec3::new(
            self.radius * self.phi.sin() * self.theta.cos(),
            self.radius * self.phi.cos(),
            self.radius * self.phi.sin() * self.theta.sin(),
        )
    }

    /// Get the view matrix.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_lh(self.eye_position(), Vec3::ZERO, Vec3::Y)
    }

    /// Get the projection matrix.
    pub fn projection_matrix(&self) -> Mat4 {
        let p = self.projection;
        Mat4::perspective_lh(p.fov_y, p.aspect, p.near, p.far)
    }
}
