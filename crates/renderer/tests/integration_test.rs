//! Integration tests for the frame pipeline.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use frameflight_renderer::{
    FrameUpdate, MaterialScroll, RenderContext, Renderer, RendererSettings, SceneAnimator,
};
use frameflight_resources::Material;
use frameflight_rhi::RhiError;
use frameflight_rhi::buffer::{BufferUsage, UploadBuffer};
use frameflight_rhi::command::CommandBuffer;
use frameflight_rhi::queue::{CommandQueue, SimulatedQueue};
use frameflight_rhi::sync::{Fence, FenceValue, TimelineFence};
use frameflight_rhi::vertex::Vertex;
use frameflight_scene::{
    MaterialId, MeshGeometry, RenderItem, RenderItemId, RenderLayer, Scene, SubmeshGeometry,
    VertexSource,
};

/// Queue that holds fence signals until the test releases them.
#[derive(Default)]
struct HeldQueue {
    pending: Mutex<Vec<(Arc<dyn Fence>, FenceValue)>>,
}

impl HeldQueue {
    fn release_all(&self) {
        for (fence, value) in self.pending.lock().unwrap().drain(..) {
            fence.signal(value).unwrap();
        }
    }
}

impl CommandQueue for HeldQueue {
    fn submit(&self, _buffer: &CommandBuffer) -> frameflight_rhi::RhiResult<()> {
        Ok(())
    }

    fn signal(&self, fence: &Arc<dyn Fence>, value: FenceValue) -> frameflight_rhi::RhiResult<()> {
        self.pending.lock().unwrap().push((fence.clone(), value));
        Ok(())
    }
}

/// Queue that retires work the moment it is signaled.
#[derive(Default)]
struct InstantQueue;

impl CommandQueue for InstantQueue {
    fn submit(&self, _buffer: &CommandBuffer) -> frameflight_rhi::RhiResult<()> {
        Ok(())
    }

    fn signal(&self, fence: &Arc<dyn Fence>, value: FenceValue) -> frameflight_rhi::RhiResult<()> {
        fence.signal(value)
    }
}

/// Records the fence's completed value each time the update phase runs.
struct FenceRecorder {
    fence: Arc<TimelineFence>,
    seen: Arc<Mutex<Vec<FenceValue>>>,
}

impl SceneAnimator for FenceRecorder {
    fn name(&self) -> &str {
        "fence recorder"
    }

    fn animate(&mut self, _update: &mut FrameUpdate<'_>) -> frameflight_rhi::RhiResult<()> {
        let completed = self.fence.completed_value()?;
        self.seen.lock().unwrap().push(completed);
        Ok(())
    }
}

/// Two materials and three opaque boxes sharing one static mesh.
fn courtyard_scene() -> Scene {
    let vertices = UploadBuffer::<Vertex>::new("box vertices", BufferUsage::Vertex, 24).unwrap();
    let indices = UploadBuffer::<u16>::new("box indices", BufferUsage::Index, 36).unwrap();
    let submesh = SubmeshGeometry {
        index_count: 36,
        ..SubmeshGeometry::default()
    };

    let mut scene = Scene::new();
    let stone = scene.add_material(Material::new("stone", 0, 0));
    let water = scene.add_material(Material::new("water", 1, 1));
    let geo = scene.add_geometry(
        MeshGeometry::new("box", VertexSource::Static(vertices.view()), indices.view())
            .with_submesh("box", submesh),
    );
    scene.add_render_item(RenderLayer::Opaque, RenderItem::new(0, stone, geo, submesh));
    scene.add_render_item(RenderLayer::Opaque, RenderItem::new(1, stone, geo, submesh));
    scene.add_render_item(RenderLayer::Transparent, RenderItem::new(2, water, geo, submesh));
    scene
}

fn settings(frames_in_flight: usize) -> RendererSettings {
    RendererSettings {
        frames_in_flight,
        ..RendererSettings::default()
    }
}

fn renderer_with(
    ctx: &RenderContext,
    settings: RendererSettings,
    queue: Arc<dyn CommandQueue>,
    fence: Arc<dyn Fence>,
) -> Renderer {
    Renderer::new(settings, ctx, queue, fence).expect("Failed to create renderer")
}

#[test]
fn test_slots_cycle_in_ring_order() {
    let mut ctx = RenderContext::new(courtyard_scene(), 3);
    let mut renderer = renderer_with(
        &ctx,
        settings(3),
        Arc::new(InstantQueue),
        Arc::new(TimelineFence::new()),
    );

    let slots: Vec<usize> = (0..7)
        .map(|_| renderer.run_frame(&mut ctx, 0.016).unwrap().slot)
        .collect();
    assert_eq!(slots, vec![0, 1, 2, 0, 1, 2, 0]);
    renderer.shutdown().unwrap();
}

#[test]
fn test_fence_values_are_gapless_and_stamped() {
    let mut ctx = RenderContext::new(courtyard_scene(), 3);
    let mut renderer = renderer_with(
        &ctx,
        settings(3),
        Arc::new(InstantQueue),
        Arc::new(TimelineFence::new()),
    );

    for expected in 1..=10u64 {
        let stats = renderer.run_frame(&mut ctx, 0.016).unwrap();
        assert_eq!(stats.fence, FenceValue::new(expected), "fence values must not skip");
        let slot = renderer.frames().frame(stats.slot).unwrap();
        assert_eq!(slot.fence(), stats.fence, "slot must carry the value it was submitted with");
    }
    assert_eq!(renderer.frames().last_stamp(), FenceValue::new(10));
}

#[test]
fn test_fourth_frame_waits_for_gpu() {
    const GPU_DELAY: Duration = Duration::from_millis(50);

    let queue = Arc::new(HeldQueue::default());
    let fence = Arc::new(TimelineFence::new());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut ctx = RenderContext::new(courtyard_scene(), 3);
    ctx.add_animator(FenceRecorder {
        fence: fence.clone(),
        seen: seen.clone(),
    });
    let mut renderer = renderer_with(&ctx, settings(3), queue.clone(), fence.clone());

    // The CPU runs ahead by exactly the ring size without blocking.
    for _ in 0..3 {
        renderer.run_frame(&mut ctx, 0.016).unwrap();
    }
    assert_eq!(fence.completed_value().unwrap(), FenceValue::ZERO);
    assert_eq!(*seen.lock().unwrap(), vec![FenceValue::ZERO; 3]);

    let start = Instant::now();
    let gpu = {
        let queue = queue.clone();
        thread::spawn(move || {
            thread::sleep(GPU_DELAY);
            queue.release_all();
        })
    };

    let stats = renderer.run_frame(&mut ctx, 0.016).unwrap();
    let blocked = start.elapsed();
    gpu.join().unwrap();

    assert_eq!(stats.slot, 0);
    assert!(
        blocked >= GPU_DELAY,
        "frame 4 returned after {blocked:?}, before the GPU released slot 0"
    );
    // The update phase runs right after the slot is handed back.
    let at_update = seen.lock().unwrap()[3];
    assert!(
        at_update >= FenceValue::new(1),
        "slot 0 was handed back while fence was at {at_update}"
    );
    queue.release_all();
    renderer.shutdown().unwrap();
}

#[test]
fn test_mutation_reaches_every_slot_once() {
    let mut ctx = RenderContext::new(courtyard_scene(), 3);
    let mut renderer = renderer_with(
        &ctx,
        settings(3),
        Arc::new(InstantQueue),
        Arc::new(TimelineFence::new()),
    );

    // Initial upload: every slot receives every entity once.
    for _ in 0..3 {
        renderer.run_frame(&mut ctx, 0.016).unwrap();
    }
    assert!(ctx.dirty().is_clean());

    let water = MaterialId::new(1);
    ctx.update()
        .material_mut(water)
        .unwrap()
        .set_texture_offset(0.5, 0.25);
    assert_eq!(ctx.dirty().material_dirty_count(water), 3);

    let written: Vec<usize> = (0..4)
        .map(|_| renderer.run_frame(&mut ctx, 0.016).unwrap().materials_written)
        .collect();
    assert_eq!(written, vec![1, 1, 1, 0]);

    for frame in renderer.frames().frames() {
        let constants = frame.material_constants().read(1).unwrap();
        // Uploaded transposed: the translation lands in the last row.
        assert_eq!(constants.mat_transform.x_axis.w, 0.5, "slot {} is stale", frame.index());
        // Two initial writes (stone, water) plus the one propagated change.
        assert_eq!(frame.material_constants().write_count(), 3);
    }
}

#[test]
fn test_dirty_count_bounded_by_ring_size() {
    for n in 1..=4usize {
        let mut ctx = RenderContext::new(courtyard_scene(), n);
        let mut renderer = renderer_with(
            &ctx,
            settings(n),
            Arc::new(InstantQueue),
            Arc::new(TimelineFence::new()),
        );
        let item = RenderItemId::new(2);

        for remaining in (0..n as u32).rev() {
            renderer.run_frame(&mut ctx, 0.016).unwrap();
            assert_eq!(ctx.dirty().object_dirty_count(item), remaining);
        }
        ctx.update().render_item_mut(item).unwrap().world =
            glam::Mat4::from_translation(glam::Vec3::X);
        assert_eq!(ctx.dirty().object_dirty_count(item), n as u32);

        for _ in 0..n + 2 {
            renderer.run_frame(&mut ctx, 0.016).unwrap();
            assert!(ctx.dirty().object_dirty_count(item) <= n as u32);
        }
        assert_eq!(ctx.dirty().object_dirty_count(item), 0, "N = {n}");
    }
}

#[test]
fn test_wait_timeout_is_fatal() {
    let mut ctx = RenderContext::new(courtyard_scene(), 2);
    let settings = RendererSettings {
        fence_timeout: Some(Duration::from_millis(20)),
        ..settings(2)
    };
    let mut renderer = renderer_with(
        &ctx,
        settings,
        Arc::new(HeldQueue::default()),
        Arc::new(TimelineFence::new()),
    );

    renderer.run_frame(&mut ctx, 0.016).unwrap();
    renderer.run_frame(&mut ctx, 0.016).unwrap();
    let err = renderer.run_frame(&mut ctx, 0.016).unwrap_err();
    assert!(matches!(err, RhiError::WaitTimeout { .. }), "got {err:?}");
}

#[test]
fn test_device_loss_is_fatal() {
    let fence = Arc::new(TimelineFence::new());
    let mut ctx = RenderContext::new(courtyard_scene(), 2);
    let mut renderer = renderer_with(
        &ctx,
        settings(2),
        Arc::new(HeldQueue::default()),
        fence.clone(),
    );

    renderer.run_frame(&mut ctx, 0.016).unwrap();
    renderer.run_frame(&mut ctx, 0.016).unwrap();
    fence.mark_device_lost("test reset");

    let err = renderer.run_frame(&mut ctx, 0.016).unwrap_err();
    assert!(matches!(err, RhiError::DeviceLost(_)), "got {err:?}");
    assert!(renderer.shutdown().is_err());
}

#[test]
fn test_simulated_gpu_pipeline() {
    let mut ctx = RenderContext::new(courtyard_scene(), 3);
    ctx.add_animator(MaterialScroll::new(MaterialId::new(1)));

    let queue = Arc::new(SimulatedQueue::new(Duration::from_millis(1)));
    let fence = Arc::new(TimelineFence::new());
    let mut renderer = renderer_with(&ctx, settings(3), queue.clone(), fence.clone());

    let frames = 20u64;
    for _ in 0..frames {
        let stats = renderer.run_frame(&mut ctx, 1.0 / 60.0).unwrap();
        assert_eq!(stats.draws, 3);
        // The scrolled material changes every frame.
        assert!(stats.materials_written >= 1);
    }
    renderer.shutdown().unwrap();

    assert_eq!(fence.completed_value().unwrap(), FenceValue::new(frames));
    assert_eq!(renderer.sync().last_issued(), FenceValue::new(frames));
    let stats = queue.stats();
    assert_eq!(stats.submissions, frames);
    assert_eq!(stats.signals, frames);
    assert_eq!(stats.draws, frames * 3);

    assert!(matches!(
        renderer.run_frame(&mut ctx, 0.016),
        Err(RhiError::InvalidState(_))
    ));
}
