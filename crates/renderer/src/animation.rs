//! Built-in scene animators.
//!
//! - [`MaterialScroll`] scrolls a material's texture to fake flowing water
//! - [`WaveAnimator`] steps the wave simulation and streams its vertices into
//!   the slot's dynamic vertex buffer

use glam::Vec2;
use tracing::trace;

use frameflight_rhi::{RhiError, RhiResult};
use frameflight_scene::{MaterialId, Waves};

use crate::context::{FrameUpdate, SceneAnimator};

/// Scrolls a material's texture translation at a constant rate.
///
/// Both coordinates wrap back into [0, 1).
#[derive(Clone, Debug)]
pub struct MaterialScroll {
    material: MaterialId,
    rate: Vec2,
}

impl MaterialScroll {
    /// Default rate in texture units per second.
    pub const DEFAULT_RATE: Vec2 = Vec2::new(0.1, 0.02);

    /// Scrolls `material` at [`DEFAULT_RATE`](Self::DEFAULT_RATE).
    pub fn new(material: MaterialId) -> Self {
        Self::with_rate(material, Self::DEFAULT_RATE)
    }

    /// Scrolls `material` at `rate` units per second.
    pub fn with_rate(material: MaterialId, rate: Vec2) -> Self {
        Self { material, rate }
    }
}

fn wrap_unit(x: f32) -> f32 {
    if x >= 1.0 { x - 1.0 } else { x }
}

impl SceneAnimator for MaterialScroll {
    fn name(&self) -> &str {
        "material scroll"
    }

    fn animate(&mut self, update: &mut FrameUpdate<'_>) -> RhiResult<()> {
        let dt = update.time().delta;
        let material = update
            .scene()
            .material_mut(self.material)
            .ok_or_else(|| RhiError::InvalidState(format!("{} does not exist", self.material)))?;

        let (u, v) = material.texture_offset();
        let u = wrap_unit(u + self.rate.x * dt);
        let v = wrap_unit(v + self.rate.y * dt);
        material.set_texture_offset(u, v);
        Ok(())
    }
}

/// Drives a [`Waves`] simulation.
///
/// Every `disturb_interval` seconds of total time a random point is
/// disturbed. Each frame the grid is stepped and every vertex is written
/// into the current slot's dynamic vertex buffer.
#[derive(Debug)]
pub struct WaveAnimator {
    waves: Waves,
    disturb_interval: f32,
    next_disturb: f32,
}

impl WaveAnimator {
    /// Default seconds between random disturbances.
    pub const DEFAULT_DISTURB_INTERVAL: f32 = 0.25;

    /// Animates `waves`.
    pub fn new(waves: Waves) -> Self {
        Self {
            waves,
            disturb_interval: Self::DEFAULT_DISTURB_INTERVAL,
            next_disturb: Self::DEFAULT_DISTURB_INTERVAL,
        }
    }

    /// The simulated grid.
    pub fn waves(&self) -> &Waves {
        &self.waves
    }
}

impl SceneAnimator for WaveAnimator {
    fn name(&self) -> &str {
        "waves"
    }

    fn animate(&mut self, update: &mut FrameUpdate<'_>) -> RhiResult<()> {
        let time = update.time();

        // One disturbance per elapsed interval, even after a long frame.
        while time.total >= self.next_disturb {
            self.next_disturb += self.disturb_interval;
            let (i, j, magnitude) = self.waves.disturb_random();
            trace!("Disturbed waves at ({}, {}) by {:.2}", i, j, magnitude);
        }

        self.waves.update(time.delta);

        let frame_index = update.frame_index();
        let vertices = update.dynamic_vertices().ok_or_else(|| {
            RhiError::InvalidState(format!(
                "frame {frame_index} has no dynamic vertex buffer for the wave grid"
            ))
        })?;
        for i in 0..self.waves.vertex_count() {
            vertices.copy_data(i, &self.waves.vertex(i))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RenderContext;
    use crate::frame_resource::{FrameResource, FrameResourceDesc};
    use frameflight_core::FrameTime;
    use frameflight_resources::Material;
    use frameflight_scene::{Scene, WaveParams};

    fn small_waves() -> Waves {
        Waves::with_seed(
            WaveParams {
                rows: 12,
                columns: 12,
                ..WaveParams::default()
            },
            3,
        )
    }

    fn water_context() -> RenderContext {
        let mut scene = Scene::new();
        scene.add_material(Material::new("water", 0, 0));
        RenderContext::new(scene, 3)
    }

    #[test]
    fn test_wrap_unit() {
        assert_eq!(wrap_unit(0.5), 0.5);
        assert!((wrap_unit(1.25) - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_material_scroll_moves_and_wraps() {
        let mut ctx = water_context();
        let water = MaterialId::new(0);
        ctx.update().material_mut(water).unwrap().set_texture_offset(0.95, 0.0);
        ctx.add_animator(MaterialScroll::new(water));

        let mut frame = FrameResource::new(0, &FrameResourceDesc::default()).unwrap();
        ctx.update_frame(&mut frame, FrameTime::default().advanced(1.0))
            .unwrap();

        let (u, v) = ctx.scene().material(water).unwrap().texture_offset();
        assert!((u - 0.05).abs() < 1e-5);
        assert!((v - 0.02).abs() < 1e-6);
        assert_eq!(ctx.dirty().material_dirty_count(water), 2);
    }

    #[test]
    fn test_material_scroll_missing_material_is_error() {
        let mut ctx = water_context();
        ctx.add_animator(MaterialScroll::new(MaterialId::new(3)));
        let mut frame = FrameResource::new(0, &FrameResourceDesc::default()).unwrap();
        assert!(ctx.update_frame(&mut frame, FrameTime::default()).is_err());
    }

    #[test]
    fn test_wave_animator_fills_dynamic_vertices() {
        let mut ctx = water_context();
        ctx.add_animator(WaveAnimator::new(small_waves()));
        let desc = FrameResourceDesc {
            dynamic_vertex_count: 144,
            ..FrameResourceDesc::default()
        };
        let mut frame = FrameResource::new(0, &desc).unwrap();

        ctx.update_frame(&mut frame, FrameTime::default().advanced(0.3))
            .unwrap();

        let vertices = frame.dynamic_vertices().unwrap();
        assert_eq!(vertices.write_count(), 144);
        assert_eq!(vertices.read(0).unwrap().position.x, -5.5);
    }

    #[test]
    fn test_wave_animator_disturbs_on_schedule() {
        let mut animator = WaveAnimator::new(small_waves());
        let mut ctx = water_context();
        let desc = FrameResourceDesc {
            dynamic_vertex_count: 144,
            ..FrameResourceDesc::default()
        };
        let mut frame = FrameResource::new(0, &desc).unwrap();

        // 0.6 s of total time covers the 0.25 and 0.5 marks.
        let mut update = FrameUpdate::new(
            ctx.update(),
            &mut frame,
            FrameTime::default().advanced(0.6),
        );
        animator.animate(&mut update).unwrap();
        assert!((animator.next_disturb - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_wave_animator_without_buffer_is_error() {
        let mut ctx = water_context();
        ctx.add_animator(WaveAnimator::new(small_waves()));
        let mut frame = FrameResource::new(0, &FrameResourceDesc::default()).unwrap();
        assert!(matches!(
            ctx.update_frame(&mut frame, FrameTime::default()),
            Err(RhiError::InvalidState(_))
        ));
    }

    #[test]
    fn test_wave_buffer_too_small_is_capacity_error() {
        let mut ctx = water_context();
        ctx.add_animator(WaveAnimator::new(small_waves()));
        let desc = FrameResourceDesc {
            dynamic_vertex_count: 100,
            ..FrameResourceDesc::default()
        };
        let mut frame = FrameResource::new(0, &desc).unwrap();
        assert!(matches!(
            ctx.update_frame(&mut frame, FrameTime::default()),
            Err(RhiError::CapacityExceeded { .. })
        ));
    }
}
