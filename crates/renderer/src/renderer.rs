//! Frame orchestration.
//!
//! This module provides the [`Renderer`] struct, which drives one frame at a
//! time through the ring:
//!
//! ```text
//! Idle ─► Acquiring ─► Updating ─► Recording ─► Submitted ─┐
//!            ▲                                              │
//!            └──────────────────────────────────────────────┘
//! ```
//!
//! - *Acquiring*: the ring selects the next slot, blocking if the GPU has not
//!   retired it yet
//! - *Updating*: animators run, dirty entities are uploaded into the slot and
//!   the pass block is rebuilt
//! - *Recording*: draws are recorded layer by layer in
//!   [`RenderLayer::DRAW_ORDER`]
//! - *Submitted*: the command buffer is submitted, a fence value is issued and
//!   the slot is stamped with it
//!
//! [`Renderer::run_frame`] returns after submission, not after the GPU
//! finishes.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use frameflight_renderer::{RenderContext, Renderer, RendererSettings};
//! use frameflight_resources::Material;
//! use frameflight_rhi::queue::SimulatedQueue;
//! use frameflight_rhi::sync::TimelineFence;
//! use frameflight_scene::Scene;
//!
//! # fn example() -> Result<(), frameflight_rhi::RhiError> {
//! let mut scene = Scene::new();
//! scene.add_material(Material::new("stone", 0, 0));
//! let mut ctx = RenderContext::new(scene, 3);
//!
//! let queue = Arc::new(SimulatedQueue::new(Duration::from_millis(1)));
//! let fence = Arc::new(TimelineFence::new());
//! let mut renderer = Renderer::new(RendererSettings::default(), &ctx, queue, fence)?;
//!
//! for _ in 0..10 {
//!     renderer.run_frame(&mut ctx, 1.0 / 60.0)?;
//! }
//! renderer.shutdown()?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, debug_span, error, info};

use frameflight_core::{Config, FrameTime};
use frameflight_resources::PassConstants;
use frameflight_rhi::buffer::BufferView;
use frameflight_rhi::command::CommandBuffer;
use frameflight_rhi::queue::CommandQueue;
use frameflight_rhi::sync::{Fence, FenceValue};
use frameflight_rhi::{RhiError, RhiResult};
use frameflight_scene::{RenderLayer, Scene, VertexSource};

use crate::context::RenderContext;
use crate::dirty::DirtyTracker;
use crate::fence::FenceSynchronizer;
use crate::frame_manager::FrameManager;
use crate::frame_resource::{FrameRegions, FrameResourceDesc};

/// Phase of the frame currently being processed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameState {
    /// No frame started yet, or shut down.
    Idle,
    /// Selecting (and possibly waiting for) the next slot.
    Acquiring,
    /// Running animators and uploading constants.
    Updating,
    /// Recording the command buffer.
    Recording,
    /// The frame's commands are queued on the GPU.
    Submitted,
}

/// Renderer construction parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RendererSettings {
    /// Ring size N.
    pub frames_in_flight: usize,
    /// Upper bound on a single fence wait; `None` waits forever.
    pub fence_timeout: Option<Duration>,
    /// Render target width in pixels.
    pub render_width: u32,
    /// Render target height in pixels.
    pub render_height: u32,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            frames_in_flight: crate::DEFAULT_FRAMES_IN_FLIGHT,
            fence_timeout: None,
            render_width: 1280,
            render_height: 720,
        }
    }
}

impl RendererSettings {
    /// Takes the renderer fields of a loaded config.
    pub fn from_config(config: &Config) -> Self {
        Self {
            frames_in_flight: config.frames_in_flight,
            fence_timeout: config.fence_timeout(),
            render_width: config.render_width,
            render_height: config.render_height,
        }
    }
}

/// Summary of one [`Renderer::run_frame`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameStats {
    /// Zero-based frame counter.
    pub frame_number: u64,
    /// Ring slot the frame used.
    pub slot: usize,
    /// Fence value the slot was stamped with.
    pub fence: FenceValue,
    /// Object constant entries uploaded.
    pub objects_written: usize,
    /// Material constant entries uploaded.
    pub materials_written: usize,
    /// Draws recorded.
    pub draws: usize,
}

/// Frame orchestrator.
///
/// Owns the frame ring and the fence synchronizer, and borrows the
/// [`RenderContext`] for the duration of each frame.
///
/// # Shutdown
///
/// [`shutdown`](Self::shutdown) waits until the GPU has retired every slot.
/// Dropping a renderer that was not shut down performs the same wait and logs
/// any failure.
pub struct Renderer {
    queue: Arc<dyn CommandQueue>,
    sync: FenceSynchronizer,
    frames: FrameManager,
    settings: RendererSettings,
    state: FrameState,
    time: FrameTime,
    frame_number: u64,
    shut_down: bool,
}

impl Renderer {
    /// Creates a renderer whose frame resources fit the scene in `ctx`.
    ///
    /// # Arguments
    ///
    /// * `settings` - Ring size, wait timeout and render target size
    /// * `ctx` - Context the renderer will draw; sizes the constant regions
    /// * `queue` - Queue receiving submissions and fence signals
    /// * `fence` - Completion fence signaled by `queue`
    ///
    /// # Errors
    ///
    /// Returns an error if the ring cannot be allocated or a constant index
    /// in the scene does not fit its region.
    pub fn new(
        settings: RendererSettings,
        ctx: &RenderContext,
        queue: Arc<dyn CommandQueue>,
        fence: Arc<dyn Fence>,
    ) -> RhiResult<Self> {
        let desc = FrameResourceDesc::for_scene(ctx.scene());
        Self::with_desc(settings, &desc, ctx.scene(), queue, fence)
    }

    /// Creates a renderer with explicit region capacities.
    ///
    /// # Errors
    ///
    /// Returns [`RhiError::CapacityExceeded`] if the constants or per-frame
    /// vertices of `scene` do not fit `desc`.
    pub fn with_desc(
        settings: RendererSettings,
        desc: &FrameResourceDesc,
        scene: &Scene,
        queue: Arc<dyn CommandQueue>,
        fence: Arc<dyn Fence>,
    ) -> RhiResult<Self> {
        info!(
            "Initializing renderer ({} frames in flight, {}x{})",
            settings.frames_in_flight, settings.render_width, settings.render_height
        );

        let frames = FrameManager::new(settings.frames_in_flight, desc)?;
        if let Some(frame) = frames.frame(0) {
            DirtyTracker::validate_capacity(scene, frame)?;
            frame.validate_dynamic_vertices(scene)?;
        }
        let sync = FenceSynchronizer::new(fence, settings.fence_timeout)?;

        Ok(Self {
            queue,
            sync,
            frames,
            settings,
            state: FrameState::Idle,
            time: FrameTime::default(),
            frame_number: 0,
            shut_down: false,
        })
    }

    /// Prepares, records and submits one frame.
    ///
    /// Blocks only if the slot it needs is still in flight.
    ///
    /// # Errors
    ///
    /// Every error is fatal to the frame loop: device loss and wait timeouts
    /// from the fence, capacity violations from the uploads, and a closed
    /// queue.
    pub fn run_frame(&mut self, ctx: &mut RenderContext, delta_time: f32) -> RhiResult<FrameStats> {
        if self.shut_down {
            return Err(RhiError::InvalidState(
                "run_frame called after shutdown".to_string(),
            ));
        }
        // Dirty counts must cover exactly one pass over the ring.
        let tracked = ctx.dirty().frames_in_flight() as usize;
        if tracked != self.frames.frames_in_flight() {
            return Err(RhiError::InvalidState(format!(
                "context tracks {} frames in flight, ring has {}",
                tracked,
                self.frames.frames_in_flight()
            )));
        }

        let span = debug_span!(
            "frame",
            number = self.frame_number,
            slot = tracing::field::Empty
        );
        let _enter = span.enter();

        self.time = self.time.advanced(delta_time);

        self.state = FrameState::Acquiring;
        let frame = self.frames.acquire_current(&self.sync)?;
        let slot = frame.index();
        span.record("slot", slot);

        self.state = FrameState::Updating;
        let updates = ctx.update_frame(frame, self.time)?;
        let pass = build_pass_constants(ctx, self.time, &self.settings);
        frame.pass_constants_mut().copy_data(0, &pass)?;

        self.state = FrameState::Recording;
        let (cmd, regions) = frame.split_for_recording();
        record_commands(ctx.scene(), ctx.clear_color(), cmd, &regions)?;
        let draws = cmd.draw_count();

        self.queue.submit(frame.command_buffer())?;
        let fence = self.sync.advance(self.queue.as_ref())?;
        self.frames.stamp_current(fence)?;
        self.state = FrameState::Submitted;

        let stats = FrameStats {
            frame_number: self.frame_number,
            slot,
            fence,
            objects_written: updates.objects_written,
            materials_written: updates.materials_written,
            draws,
        };
        debug!(
            "Submitted frame {} on slot {} (fence {}, {} draws, {} objects, {} materials)",
            stats.frame_number,
            slot,
            fence,
            draws,
            updates.objects_written,
            updates.materials_written
        );

        self.frame_number += 1;
        Ok(stats)
    }

    /// Waits for the GPU to retire every slot.
    ///
    /// Further calls are no-ops; [`run_frame`](Self::run_frame) fails after
    /// shutdown.
    ///
    /// # Errors
    ///
    /// Returns an error if a fence wait fails.
    pub fn shutdown(&mut self) -> RhiResult<()> {
        if self.shut_down {
            return Ok(());
        }
        info!(
            "Shutting down renderer after {} frames, draining {} slots",
            self.frame_number,
            self.frames.frames_in_flight()
        );
        self.frames.wait_for_all_frames(&self.sync)?;
        self.shut_down = true;
        self.state = FrameState::Idle;
        Ok(())
    }

    /// Phase reached by the last frame.
    #[inline]
    pub fn state(&self) -> FrameState {
        self.state
    }

    /// Number of frames submitted so far.
    #[inline]
    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    /// Accumulated frame time.
    #[inline]
    pub fn time(&self) -> FrameTime {
        self.time
    }

    /// The frame ring.
    #[inline]
    pub fn frames(&self) -> &FrameManager {
        &self.frames
    }

    /// The fence synchronizer.
    #[inline]
    pub fn sync(&self) -> &FenceSynchronizer {
        &self.sync
    }

    /// The settings the renderer was created with.
    #[inline]
    pub fn settings(&self) -> &RendererSettings {
        &self.settings
    }

    /// Returns true once [`shutdown`](Self::shutdown) has completed.
    #[inline]
    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        // The GPU may still read the slots; wait before they are freed.
        if let Err(e) = self.shutdown() {
            error!("Failed to drain frame resources during renderer drop: {}", e);
        }
        info!("Renderer destroyed");
    }
}

/// Builds the per-frame pass block from the camera, timer and lighting.
pub fn build_pass_constants(
    ctx: &RenderContext,
    time: FrameTime,
    settings: &RendererSettings,
) -> PassConstants {
    let mut camera = ctx.camera().clone();
    camera.set_aspect(settings.render_width, settings.render_height);

    let mut pass = PassConstants::default();
    pass.set_camera(
        camera.view_matrix(),
        camera.projection_matrix(),
        camera.eye_position(),
    );
    pass.set_render_target_size(settings.render_width, settings.render_height);
    pass.near_z = camera.projection.near;
    pass.far_z = camera.projection.far;
    pass.total_time = time.total;
    pass.delta_time = time.delta;
    ctx.lighting().write_into(&mut pass);
    pass
}

/// Records the draws of every layer into `cmd`.
///
/// The buffer is reset first; the caller guarantees the GPU is done with it.
pub fn record_commands(
    scene: &Scene,
    clear_color: [f32; 4],
    cmd: &mut CommandBuffer,
    regions: &FrameRegions<'_>,
) -> RhiResult<()> {
    cmd.reset()?;
    cmd.begin()?;
    cmd.clear(clear_color);
    cmd.bind_pass_constants(regions.pass.address(0)?);

    for layer in RenderLayer::DRAW_ORDER {
        let items = scene.layer(layer);
        if items.is_empty() {
            continue;
        }
        cmd.set_pipeline(layer.pipeline());

        for &id in items {
            let item = scene
                .render_item(id)
                .ok_or_else(|| RhiError::InvalidState(format!("{id} is not in the scene")))?;
            let geometry = scene.geometry(item.geometry).ok_or_else(|| {
                RhiError::InvalidState(format!("{} of {} is not in the scene", item.geometry, id))
            })?;
            let material = scene.material(item.material).ok_or_else(|| {
                RhiError::InvalidState(format!("{} of {} is not in the scene", item.material, id))
            })?;

            let vertices = match geometry.vertices {
                VertexSource::Static(view) => view,
                VertexSource::PerFrame { vertex_count } => {
                    let buffer = regions.dynamic_vertices.ok_or_else(|| {
                        RhiError::InvalidState(format!(
                            "'{}' needs a dynamic vertex buffer",
                            geometry.name
                        ))
                    })?;
                    let view = buffer.view();
                    BufferView {
                        size_in_bytes: u64::from(vertex_count) * u64::from(view.stride),
                        ..view
                    }
                }
            };

            cmd.bind_vertex_buffer(vertices);
            cmd.bind_index_buffer(geometry.index_buffer);
            cmd.set_primitive_topology(item.topology);
            cmd.bind_object_constants(regions.objects.address(item.object_constant_index)?);
            cmd.bind_material_constants(regions.materials.address(material.constant_index)?);
            cmd.bind_texture(material.diffuse_srv_index);
            cmd.draw_indexed(
                item.submesh.index_count,
                item.submesh.start_index,
                item.submesh.base_vertex,
            );
        }
    }

    cmd.end()
}
