//! Dirty propagation across frame resources.
//!
//! Every frame resource carries its own copy of the object and material
//! constants. When an entity changes, its new constants have to reach all N
//! copies, but only the copy of the slot being prepared is safe to write this
//! frame. [`DirtyTracker`] bridges the two: marking an entity sets its dirty
//! count to N, and each frame's [`apply_updates`](DirtyTracker::apply_updates)
//! writes every dirty entity into the current slot and decrements its count.
//! After N consecutive frames every slot holds the new data and the entity is
//! clean again.
//!
//! ```text
//! mark_dirty(e)   count = 3
//! frame 0         write slot 0, count = 2
//! frame 1         write slot 1, count = 1
//! frame 2         write slot 2, count = 0
//! frame 3         skipped
//! ```
//!
//! Marking again while dirty resets the count to N; counts never accumulate.

use tracing::{debug, error};

use frameflight_rhi::{RhiError, RhiResult};
use frameflight_scene::{MaterialId, RenderItemId, Scene};

use crate::frame_resource::FrameResource;

/// An entity whose constants are replicated per frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DirtyEntity {
    /// A render item's object constants.
    RenderItem(RenderItemId),
    /// A material's constants.
    Material(MaterialId),
}

impl From<RenderItemId> for DirtyEntity {
    fn from(id: RenderItemId) -> Self {
        DirtyEntity::RenderItem(id)
    }
}

impl From<MaterialId> for DirtyEntity {
    fn from(id: MaterialId) -> Self {
        DirtyEntity::Material(id)
    }
}

/// Number of constant writes performed by one [`DirtyTracker::apply_updates`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UpdateStats {
    /// Object constant entries written.
    pub objects_written: usize,
    /// Material constant entries written.
    pub materials_written: usize,
}

/// Per-entity dirty counters for render items and materials.
///
/// Entities the tracker has not seen yet (added to the scene after the last
/// update) start fully dirty.
#[derive(Clone, Debug)]
pub struct DirtyTracker {
    frames_in_flight: u32,
    objects: Vec<u32>,
    materials: Vec<u32>,
}

impl DirtyTracker {
    /// Creates a tracker for a ring of `frames_in_flight` slots.
    pub fn new(frames_in_flight: usize) -> Self {
        debug_assert!(frames_in_flight > 0, "ring needs at least one slot");
        Self {
            frames_in_flight: frames_in_flight as u32,
            objects: Vec::new(),
            materials: Vec::new(),
        }
    }

    /// Ring size the counters count down from.
    #[inline]
    pub fn frames_in_flight(&self) -> u32 {
        self.frames_in_flight
    }

    /// Sets the entity's dirty count to the ring size.
    pub fn mark_dirty(&mut self, entity: impl Into<DirtyEntity>) {
        let n = self.frames_in_flight;
        let (counts, index) = match entity.into() {
            DirtyEntity::RenderItem(id) => (&mut self.objects, id.index()),
            DirtyEntity::Material(id) => (&mut self.materials, id.index()),
        };
        if counts.len() <= index {
            counts.resize(index + 1, n);
        }
        counts[index] = n;
    }

    /// Marks every entity of `scene` dirty.
    ///
    /// Called after scene construction so the initial state reaches every
    /// slot.
    pub fn mark_all_dirty(&mut self, scene: &Scene) {
        let n = self.frames_in_flight;
        self.objects.clear();
        self.objects.resize(scene.render_item_count(), n);
        self.materials.clear();
        self.materials.resize(scene.material_count(), n);
        debug!(
            "Marked {} render items and {} materials dirty",
            self.objects.len(),
            self.materials.len()
        );
    }

    /// Writes every dirty entity's constants into `frame` and decrements its
    /// count.
    ///
    /// Entities with a zero count are skipped. Constants are recomputed from
    /// the entity's current fields.
    ///
    /// # Errors
    ///
    /// Returns [`RhiError::CapacityExceeded`] if an entity's constant index
    /// does not fit the frame's region. This is a setup error: the regions
    /// were sized for fewer entities than the scene holds.
    pub fn apply_updates(
        &mut self,
        scene: &Scene,
        frame: &mut FrameResource,
    ) -> RhiResult<UpdateStats> {
        let n = self.frames_in_flight;
        if self.objects.len() < scene.render_item_count() {
            self.objects.resize(scene.render_item_count(), n);
        }
        if self.materials.len() < scene.material_count() {
            self.materials.resize(scene.material_count(), n);
        }

        let mut stats = UpdateStats::default();

        for (id, item) in scene.render_items() {
            let count = &mut self.objects[id.index()];
            if *count == 0 {
                continue;
            }
            frame
                .object_constants_mut()
                .copy_data(item.object_constant_index, &item.constants())
                .inspect_err(|e| error!("Cannot upload {}: {}", id, e))?;
            *count -= 1;
            stats.objects_written += 1;
        }

        for (id, material) in scene.materials() {
            let count = &mut self.materials[id.index()];
            if *count == 0 {
                continue;
            }
            frame
                .material_constants_mut()
                .copy_data(material.constant_index, &material.constants())
                .inspect_err(|e| error!("Cannot upload {} '{}': {}", id, material.name, e))?;
            *count -= 1;
            stats.materials_written += 1;
        }

        Ok(stats)
    }

    /// Checks that every constant index of `scene` fits `frame`.
    ///
    /// # Errors
    ///
    /// Returns the first [`RhiError::CapacityExceeded`] found.
    pub fn validate_capacity(scene: &Scene, frame: &FrameResource) -> RhiResult<()> {
        let objects = frame.object_constants();
        if let Some((_, item)) = scene
            .render_items()
            .find(|(_, item)| item.object_constant_index >= objects.element_count())
        {
            return Err(RhiError::CapacityExceeded {
                region: objects.label().to_string(),
                index: item.object_constant_index,
                capacity: objects.element_count(),
            });
        }

        let materials = frame.material_constants();
        if let Some((_, material)) = scene
            .materials()
            .find(|(_, m)| m.constant_index >= materials.element_count())
        {
            return Err(RhiError::CapacityExceeded {
                region: materials.label().to_string(),
                index: material.constant_index,
                capacity: materials.element_count(),
            });
        }
        Ok(())
    }

    /// Remaining dirty count of a render item.
    pub fn object_dirty_count(&self, id: RenderItemId) -> u32 {
        self.objects.get(id.index()).copied().unwrap_or(0)
    }

    /// Remaining dirty count of a material.
    pub fn material_dirty_count(&self, id: MaterialId) -> u32 {
        self.materials.get(id.index()).copied().unwrap_or(0)
    }

    /// Remaining dirty count of any entity.
    pub fn dirty_count(&self, entity: impl Into<DirtyEntity>) -> u32 {
        match entity.into() {
            DirtyEntity::RenderItem(id) => self.object_dirty_count(id),
            DirtyEntity::Material(id) => self.material_dirty_count(id),
        }
    }

    /// Returns true when no entity is waiting for an upload.
    pub fn is_clean(&self) -> bool {
        self.objects.iter().chain(&self.materials).all(|&c| c == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame_resource::FrameResourceDesc;
    use frameflight_resources::Material;
    use frameflight_rhi::buffer::{BufferUsage, UploadBuffer};
    use frameflight_scene::{MeshGeometry, RenderItem, RenderLayer, SubmeshGeometry, VertexSource};
    use glam::{Mat4, Vec3, Vec4};

    fn scene(items: usize, materials: usize) -> Scene {
        let indices = UploadBuffer::<u16>::new("idx", BufferUsage::Vertex, 3).unwrap();
        let mut scene = Scene::new();
        let geo = scene.add_geometry(MeshGeometry::new(
            "geo",
            VertexSource::PerFrame { vertex_count: 3 },
            indices.view(),
        ));
        let mats: Vec<MaterialId> = (0..materials)
            .map(|i| scene.add_material(Material::new(format!("m{i}"), i, 0)))
            .collect();
        for i in 0..items {
            scene.add_render_item(
                RenderLayer::Opaque,
                RenderItem::new(i, mats[i % mats.len()], geo, SubmeshGeometry::default()),
            );
        }
        scene
    }

    fn frames(n: usize, objects: usize, materials: usize) -> Vec<FrameResource> {
        let desc = FrameResourceDesc {
            object_count: objects,
            material_count: materials,
            ..FrameResourceDesc::default()
        };
        (0..n).map(|i| FrameResource::new(i, &desc).unwrap()).collect()
    }

    #[test]
    fn test_mark_sets_count_to_ring_size() {
        let mut tracker = DirtyTracker::new(3);
        let id = MaterialId::new(0);
        tracker.mark_dirty(id);
        assert_eq!(tracker.material_dirty_count(id), 3);
        tracker.mark_dirty(id);
        assert_eq!(tracker.material_dirty_count(id), 3);
        assert!(!tracker.is_clean());
    }

    #[test]
    fn test_unknown_entity_is_clean() {
        let tracker = DirtyTracker::new(3);
        assert_eq!(tracker.object_dirty_count(RenderItemId::new(7)), 0);
        assert!(tracker.is_clean());
    }

    #[test]
    fn test_mark_all_dirty() {
        let scene = scene(3, 2);
        let mut tracker = DirtyTracker::new(2);
        tracker.mark_all_dirty(&scene);
        assert_eq!(tracker.dirty_count(RenderItemId::new(2)), 2);
        assert_eq!(tracker.dirty_count(MaterialId::new(1)), 2);
    }

    #[test]
    fn test_update_reaches_every_slot_then_stops() {
        let mut scene = scene(1, 1);
        let mut slots = frames(3, 1, 1);
        let mut tracker = DirtyTracker::new(3);
        tracker.mark_all_dirty(&scene);
        for slot in slots.iter_mut() {
            tracker.apply_updates(&scene, slot).unwrap();
        }
        assert!(tracker.is_clean());

        let id = MaterialId::new(0);
        scene.material_mut(id).unwrap().diffuse_albedo = Vec4::new(0.0, 1.0, 0.0, 1.0);
        tracker.mark_dirty(id);

        for slot in slots.iter_mut() {
            let stats = tracker.apply_updates(&scene, slot).unwrap();
            assert_eq!(stats.materials_written, 1);
            assert_eq!(stats.objects_written, 0);
        }
        assert_eq!(tracker.material_dirty_count(id), 0);

        for slot in &slots {
            let written = slot.material_constants().read(0).unwrap();
            assert_eq!(written.diffuse_albedo, Vec4::new(0.0, 1.0, 0.0, 1.0));
        }

        let before = slots[0].material_constants().write_count();
        let stats = tracker.apply_updates(&scene, &mut slots[0]).unwrap();
        assert_eq!(stats, UpdateStats::default());
        assert_eq!(slots[0].material_constants().write_count(), before);
    }

    #[test]
    fn test_object_constants_are_transposed() {
        let mut scene = scene(1, 1);
        let world = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        scene.render_item_mut(RenderItemId::new(0)).unwrap().world = world;
        let mut slots = frames(1, 1, 1);
        let mut tracker = DirtyTracker::new(1);
        tracker.mark_all_dirty(&scene);
        tracker.apply_updates(&scene, &mut slots[0]).unwrap();
        assert_eq!(
            slots[0].object_constants().read(0).unwrap().world,
            world.transpose()
        );
    }

    #[test]
    fn test_counts_stay_in_bounds() {
        for n in 1..=4usize {
            let scene = scene(2, 2);
            let mut slots = frames(n, 2, 2);
            let mut tracker = DirtyTracker::new(n);
            tracker.mark_all_dirty(&scene);

            // Interleave marks with updates in an irregular pattern.
            for frame in 0..(4 * n) {
                if frame % 3 == 0 {
                    tracker.mark_dirty(RenderItemId::new(1));
                }
                if frame % 5 == 1 {
                    tracker.mark_dirty(MaterialId::new(0));
                    tracker.mark_dirty(MaterialId::new(0));
                }
                tracker.apply_updates(&scene, &mut slots[frame % n]).unwrap();
                for i in 0..2 {
                    assert!(tracker.object_dirty_count(RenderItemId::new(i)) <= n as u32);
                    assert!(tracker.material_dirty_count(MaterialId::new(i)) <= n as u32);
                }
            }
        }
    }

    #[test]
    fn test_capacity_violation_is_error() {
        let scene = scene(3, 1);
        let mut slots = frames(1, 2, 1);
        let mut tracker = DirtyTracker::new(1);
        tracker.mark_all_dirty(&scene);

        assert!(DirtyTracker::validate_capacity(&scene, &slots[0]).is_err());
        let err = tracker.apply_updates(&scene, &mut slots[0]).unwrap_err();
        match err {
            RhiError::CapacityExceeded {
                index, capacity, ..
            } => {
                assert_eq!(index, 2);
                assert_eq!(capacity, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // The failed entity keeps its count.
        assert_eq!(tracker.object_dirty_count(RenderItemId::new(2)), 1);
    }

    #[test]
    fn test_new_entities_start_dirty() {
        let mut scene = scene(1, 1);
        let mut slots = frames(2, 4, 1);
        let mut tracker = DirtyTracker::new(2);
        tracker.mark_all_dirty(&scene);
        tracker.apply_updates(&scene, &mut slots[0]).unwrap();
        tracker.apply_updates(&scene, &mut slots[1]).unwrap();
        assert!(tracker.is_clean());

        let material = MaterialId::new(0);
        let geo = frameflight_scene::GeometryId::new(0);
        let id = scene.add_render_item(
            RenderLayer::Opaque,
            RenderItem::new(1, material, geo, SubmeshGeometry::default()),
        );
        let stats = tracker.apply_updates(&scene, &mut slots[0]).unwrap();
        assert_eq!(stats.objects_written, 1);
        assert_eq!(tracker.object_dirty_count(id), 1);
    }
}
