//! Explicit render state passed to the orchestrator.
//!
//! [`RenderContext`] owns the scene together with its dirty tracker, camera,
//! lighting and animators. Scene mutation goes through [`SceneUpdate`] (or
//! [`FrameUpdate`] inside an animator), which marks whatever it hands out as
//! dirty, so a change can never skip the propagation step.

use frameflight_core::FrameTime;
use frameflight_resources::Material;
use frameflight_rhi::RhiResult;
use frameflight_rhi::buffer::UploadBuffer;
use frameflight_rhi::vertex::Vertex;
use frameflight_scene::{MaterialId, OrbitCamera, RenderItem, RenderItemId, Scene, SceneLighting};

use crate::dirty::DirtyTracker;
use crate::frame_resource::FrameResource;

/// Per-frame scene mutation, run during the update phase.
pub trait SceneAnimator: Send {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Advances the animation and applies it through `update`.
    fn animate(&mut self, update: &mut FrameUpdate<'_>) -> RhiResult<()>;
}

/// Mutable access to scene entities that marks them dirty.
pub struct SceneUpdate<'a> {
    scene: &'a mut Scene,
    dirty: &'a mut DirtyTracker,
}

impl<'a> SceneUpdate<'a> {
    pub(crate) fn new(scene: &'a mut Scene, dirty: &'a mut DirtyTracker) -> Self {
        Self { scene, dirty }
    }

    /// Read-only view of the scene.
    pub fn scene(&self) -> &Scene {
        self.scene
    }

    /// Returns a material for mutation and marks it dirty.
    pub fn material_mut(&mut self, id: MaterialId) -> Option<&mut Material> {
        let material = self.scene.material_mut(id)?;
        self.dirty.mark_dirty(id);
        Some(material)
    }

    /// Returns a render item for mutation and marks it dirty.
    pub fn render_item_mut(&mut self, id: RenderItemId) -> Option<&mut RenderItem> {
        let item = self.scene.render_item_mut(id)?;
        self.dirty.mark_dirty(id);
        Some(item)
    }

    /// The dirty tracker.
    pub fn dirty(&self) -> &DirtyTracker {
        self.dirty
    }
}

/// What an animator sees during one frame's update phase.
pub struct FrameUpdate<'a> {
    scene: SceneUpdate<'a>,
    frame: &'a mut FrameResource,
    time: FrameTime,
}

impl<'a> FrameUpdate<'a> {
    pub(crate) fn new(scene: SceneUpdate<'a>, frame: &'a mut FrameResource, time: FrameTime) -> Self {
        Self { scene, frame, time }
    }

    /// Frame timing.
    #[inline]
    pub fn time(&self) -> FrameTime {
        self.time
    }

    /// Scene access that marks mutated entities dirty.
    pub fn scene(&mut self) -> &mut SceneUpdate<'a> {
        &mut self.scene
    }

    /// Ring index of the slot being prepared.
    pub fn frame_index(&self) -> usize {
        self.frame.index()
    }

    /// Dynamic vertex buffer of the slot being prepared.
    pub fn dynamic_vertices(&mut self) -> Option<&mut UploadBuffer<Vertex>> {
        self.frame.dynamic_vertices_mut()
    }
}

/// Everything the orchestrator reads and mutates each frame.
pub struct RenderContext {
    scene: Scene,
    dirty: DirtyTracker,
    animators: Vec<Box<dyn SceneAnimator>>,
    camera: OrbitCamera,
    lighting: SceneLighting,
    clear_color: [f32; 4],
}

impl RenderContext {
    /// Wraps a fully built scene.
    ///
    /// Every entity starts dirty so its initial constants reach all
    /// `frames_in_flight` slots.
    pub fn new(scene: Scene, frames_in_flight: usize) -> Self {
        let mut dirty = DirtyTracker::new(frames_in_flight);
        dirty.mark_all_dirty(&scene);
        Self {
            scene,
            dirty,
            animators: Vec::new(),
            camera: OrbitCamera::default(),
            lighting: SceneLighting::default(),
            clear_color: [0.7, 0.7, 0.7, 1.0],
        }
    }

    /// Sets the camera.
    pub fn with_camera(mut self, camera: OrbitCamera) -> Self {
        self.camera = camera;
        self
    }

    /// Sets the lighting.
    pub fn with_lighting(mut self, lighting: SceneLighting) -> Self {
        self.lighting = lighting;
        self
    }

    /// Sets the render target clear colour.
    pub fn with_clear_color(mut self, clear_color: [f32; 4]) -> Self {
        self.clear_color = clear_color;
        self
    }

    /// Registers an animator; animators run in registration order.
    pub fn add_animator(&mut self, animator: impl SceneAnimator + 'static) {
        self.animators.push(Box::new(animator));
    }

    /// Read-only scene access.
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Scene access that marks mutated entities dirty.
    pub fn update(&mut self) -> SceneUpdate<'_> {
        SceneUpdate::new(&mut self.scene, &mut self.dirty)
    }

    /// The dirty tracker.
    pub fn dirty(&self) -> &DirtyTracker {
        &self.dirty
    }

    /// The camera.
    pub fn camera(&self) -> &OrbitCamera {
        &self.camera
    }

    /// The camera, for mutation.
    ///
    /// The pass block is rebuilt every frame, so camera changes need no
    /// dirty marking.
    pub fn camera_mut(&mut self) -> &mut OrbitCamera {
        &mut self.camera
    }

    /// The lighting.
    pub fn lighting(&self) -> &SceneLighting {
        &self.lighting
    }

    /// The clear colour.
    pub fn clear_color(&self) -> [f32; 4] {
        self.clear_color
    }

    /// Number of registered animators.
    pub fn animator_count(&self) -> usize {
        self.animators.len()
    }

    /// Runs the update phase for `frame`: animators first, then dirty
    /// propagation into the slot.
    pub(crate) fn update_frame(
        &mut self,
        frame: &mut FrameResource,
        time: FrameTime,
    ) -> RhiResult<crate::dirty::UpdateStats> {
        for animator in &mut self.animators {
            let scene = SceneUpdate::new(&mut self.scene, &mut self.dirty);
            let mut update = FrameUpdate::new(scene, frame, time);
            animator.animate(&mut update).inspect_err(|e| {
                tracing::error!("Animator '{}' failed: {}", animator.name(), e);
            })?;
        }
        self.dirty.apply_updates(&self.scene, frame)
    }
}

impl std::fmt::Debug for RenderContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderContext")
            .field("render_items", &self.scene.render_item_count())
            .field("materials", &self.scene.material_count())
            .field("animators", &self.animators.len())
            .finish_non_exhaustive()
    }
}
