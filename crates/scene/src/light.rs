//! Scene lighting written into the pass constants.

use frameflight_resources::{Light, MAX_LIGHTS, PassConstants};
use glam::{Vec3, Vec4};
use tracing::warn;

/// Ambient term plus a list of lights.
#[derive(Clone, Debug)]
pub struct SceneLighting {
    /// Ambient light colour
    pub ambient: Vec4,
    /// Lights in shader array order
    pub lights: Vec<Light>,
}

impl Default for SceneLighting {
    fn default() -> Self {
        Self {
            ambient: Vec4::new(0.25, 0.25, 0.35, 1.0),
            lights: Vec::new(),
        }
    }
}

impl SceneLighting {
    /// Lighting of the demo courtyard: a blue point light over the pedestal
    /// and a red one at the far wall.
    ///
    /// The first three array entries are reserved for directional lights and
    /// left dark.
    pub fn courtyard() -> Self {
        let dark = Light {
            strength: Vec3::ZERO,
            ..Light::default()
        };
        Self {
            lights: vec![
                dark,
                dark,
                dark,
                Light::point(Vec3::new(0.0, 3.5, -0.75), Vec3::new(0.0, 0.0, 2.0)),
                Light::point(Vec3::new(0.0, 3.5, -11.0), Vec3::new(2.0, 0.0, 0.0)),
            ],
            ..Self::default()
        }
    }

    /// Writes the ambient term and lights into `pass`.
    ///
    /// Unused array entries are zeroed; lights past [`MAX_LIGHTS`] are
    /// dropped with a warning.
    pub fn write_into(&self, pass: &mut PassConstants) {
        if self.lights.len() > MAX_LIGHTS {
            warn!(
                "Scene has {} lights, only the first {} are uploaded",
                self.lights.len(),
                MAX_LIGHTS
            );
        }
        pass.ambient_light = self.ambient;
        for (i, slot) in pass.lights.iter_mut().enumerate() {
            *slot = self.lights.get(i).copied().unwrap_or(Light {
                strength: Vec3::ZERO,
                ..Light::default()
            });
        }
    }
}
