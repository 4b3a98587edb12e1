//! Per-frame resource bundle.
//!
//! A [`FrameResource`] holds everything the CPU writes for one frame and the
//! GPU reads while executing it: a command buffer, one copy of every constant
//! region and the dynamic vertex buffer. The ring keeps N of them so the CPU
//! can fill one while the GPU consumes the others.
//!
//! # Ownership
//!
//! ```text
//! acquire ──► CPU writes constants, records commands ──► submit ──► GPU reads
//!    ▲                                                                  │
//!    └──────────────── fence reaches the slot's stamp ◄─────────────────┘
//! ```

use tracing::debug;

use frameflight_resources::{MaterialConstants, ObjectConstants, PassConstants};
use frameflight_rhi::{RhiError, RhiResult};
use frameflight_rhi::buffer::{BufferUsage, UploadBuffer};
use frameflight_rhi::command::CommandBuffer;
use frameflight_rhi::sync::FenceValue;
use frameflight_rhi::vertex::Vertex;
use frameflight_scene::{Scene, VertexSource};

/// Capacities of the regions inside each frame resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameResourceDesc {
    /// Pass constant blocks (normally one).
    pub pass_count: usize,
    /// Object constant entries, one per render item.
    pub object_count: usize,
    /// Material constant entries, one per material.
    pub material_count: usize,
    /// Dynamic vertices; zero allocates no dynamic vertex buffer.
    pub dynamic_vertex_count: usize,
}

impl Default for FrameResourceDesc {
    fn default() -> Self {
        Self {
            pass_count: 1,
            object_count: 1,
            material_count: 1,
            dynamic_vertex_count: 0,
        }
    }
}

impl FrameResourceDesc {
    /// Capacities that fit every entity of `scene`.
    ///
    /// Region sizes follow the highest constant index in use rather than the
    /// entity count, so sparse indices still fit. The dynamic vertex buffer
    /// is sized for the largest per-frame geometry.
    pub fn for_scene(scene: &Scene) -> Self {
        let object_count = scene
            .render_items()
            .map(|(_, item)| item.object_constant_index + 1)
            .max()
            .unwrap_or(1);
        let material_count = scene
            .materials()
            .map(|(_, m)| m.constant_index + 1)
            .max()
            .unwrap_or(1);
        let dynamic_vertex_count = scene
            .geometries()
            .filter_map(|(_, g)| match g.vertices {
                VertexSource::PerFrame { vertex_count } => Some(vertex_count as usize),
                VertexSource::Static(_) => None,
            })
            .max()
            .unwrap_or(0);

        Self {
            pass_count: 1,
            object_count,
            material_count,
            dynamic_vertex_count,
        }
    }
}

/// Constant and vertex regions of a slot, borrowed alongside its command
/// buffer while recording.
#[derive(Clone, Copy, Debug)]
pub struct FrameRegions<'a> {
    /// Pass constant region.
    pub pass: &'a UploadBuffer<PassConstants>,
    /// Object constant region.
    pub objects: &'a UploadBuffer<ObjectConstants>,
    /// Material constant region.
    pub materials: &'a UploadBuffer<MaterialConstants>,
    /// Dynamic vertex buffer.
    pub dynamic_vertices: Option<&'a UploadBuffer<Vertex>>,
}

/// One slot of the frame ring.
#[derive(Debug)]
pub struct FrameResource {
    index: usize,
    command_buffer: CommandBuffer,
    pass_constants: UploadBuffer<PassConstants>,
    object_constants: UploadBuffer<ObjectConstants>,
    material_constants: UploadBuffer<MaterialConstants>,
    dynamic_vertices: Option<UploadBuffer<Vertex>>,
    fence: FenceValue,
}

impl FrameResource {
    /// Allocates slot `index` with the capacities in `desc`.
    ///
    /// # Errors
    ///
    /// Returns an error if any constant region would be empty.
    pub fn new(index: usize, desc: &FrameResourceDesc) -> RhiResult<Self> {
        let pass_constants = UploadBuffer::new(
            format!("frame {index} pass constants"),
            BufferUsage::Constant,
            desc.pass_count,
        )?;
        let object_constants = UploadBuffer::new(
            format!("frame {index} object constants"),
            BufferUsage::Constant,
            desc.object_count,
        )?;
        let material_constants = UploadBuffer::new(
            format!("frame {index} material constants"),
            BufferUsage::Constant,
            desc.material_count,
        )?;
        let dynamic_vertices = if desc.dynamic_vertex_count > 0 {
            Some(UploadBuffer::new(
                format!("frame {index} dynamic vertices"),
                BufferUsage::Vertex,
                desc.dynamic_vertex_count,
            )?)
        } else {
            None
        };

        debug!("Created frame resource {} ({:?})", index, desc);

        Ok(Self {
            index,
            command_buffer: CommandBuffer::new(format!("frame {index}")),
            pass_constants,
            object_constants,
            material_constants,
            dynamic_vertices,
            fence: FenceValue::ZERO,
        })
    }

    /// Position of this slot in the ring.
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Fence value marking when the GPU finished this slot's last submission.
    ///
    /// [`FenceValue::ZERO`] means the slot was never submitted.
    #[inline]
    pub fn fence(&self) -> FenceValue {
        self.fence
    }

    pub(crate) fn set_fence(&mut self, value: FenceValue) {
        self.fence = value;
    }

    /// The slot's command buffer.
    #[inline]
    pub fn command_buffer(&self) -> &CommandBuffer {
        &self.command_buffer
    }

    /// The slot's command buffer, for recording.
    #[inline]
    pub fn command_buffer_mut(&mut self) -> &mut CommandBuffer {
        &mut self.command_buffer
    }

    /// Pass constant region.
    #[inline]
    pub fn pass_constants(&self) -> &UploadBuffer<PassConstants> {
        &self.pass_constants
    }

    /// Pass constant region, for writing.
    #[inline]
    pub fn pass_constants_mut(&mut self) -> &mut UploadBuffer<PassConstants> {
        &mut self.pass_constants
    }

    /// Object constant region.
    #[inline]
    pub fn object_constants(&self) -> &UploadBuffer<ObjectConstants> {
        &self.object_constants
    }

    /// Object constant region, for writing.
    #[inline]
    pub fn object_constants_mut(&mut self) -> &mut UploadBuffer<ObjectConstants> {
        &mut self.object_constants
    }

    /// Material constant region.
    #[inline]
    pub fn material_constants(&self) -> &UploadBuffer<MaterialConstants> {
        &self.material_constants
    }

    /// Material constant region, for writing.
    #[inline]
    pub fn material_constants_mut(&mut self) -> &mut UploadBuffer<MaterialConstants> {
        &mut self.material_constants
    }

    /// Dynamic vertex buffer, if one was allocated.
    #[inline]
    pub fn dynamic_vertices(&self) -> Option<&UploadBuffer<Vertex>> {
        self.dynamic_vertices.as_ref()
    }

    /// Dynamic vertex buffer, for writing.
    #[inline]
    pub fn dynamic_vertices_mut(&mut self) -> Option<&mut UploadBuffer<Vertex>> {
        self.dynamic_vertices.as_mut()
    }

    /// Checks that every per-frame geometry of `scene` fits the dynamic
    /// vertex buffer.
    ///
    /// # Errors
    ///
    /// Returns [`RhiError::CapacityExceeded`] for the first geometry whose
    /// vertices would run past the buffer, including when none was allocated.
    pub fn validate_dynamic_vertices(&self, scene: &Scene) -> RhiResult<()> {
        let capacity = self
            .dynamic_vertices
            .as_ref()
            .map_or(0, UploadBuffer::element_count);
        for (_, geometry) in scene.geometries() {
            if let VertexSource::PerFrame { vertex_count } = geometry.vertices
                && vertex_count as usize > capacity
            {
                return Err(RhiError::CapacityExceeded {
                    region: format!("frame {} dynamic vertices ({})", self.index, geometry.name),
                    index: vertex_count as usize - 1,
                    capacity,
                });
            }
        }
        Ok(())
    }

    /// Splits the slot into its command buffer and read-only regions.
    pub fn split_for_recording(&mut self) -> (&mut CommandBuffer, FrameRegions<'_>) {
        (
            &mut self.command_buffer,
            FrameRegions {
                pass: &self.pass_constants,
                objects: &self.object_constants,
                materials: &self.material_constants,
                dynamic_vertices: self.dynamic_vertices.as_ref(),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_frame_resource_is_unsubmitted() {
        let desc = FrameResourceDesc {
            object_count: 4,
            material_count: 2,
            ..FrameResourceDesc::default()
        };
        let frame = FrameResource::new(1, &desc).unwrap();
        assert_eq!(frame.index(), 1);
        assert!(frame.fence().is_zero());
        assert_eq!(frame.object_constants().element_count(), 4);
        assert_eq!(frame.material_constants().element_count(), 2);
        assert_eq!(frame.pass_constants().element_count(), 1);
        assert!(frame.dynamic_vertices().is_none());
        assert_eq!(frame.command_buffer().label(), "frame 1");
    }

    #[test]
    fn test_dynamic_vertices_allocated_on_request() {
        let desc = FrameResourceDesc {
            dynamic_vertex_count: 64,
            ..FrameResourceDesc::default()
        };
        let frame = FrameResource::new(0, &desc).unwrap();
        let vertices = frame.dynamic_vertices().unwrap();
        assert_eq!(vertices.element_count(), 64);
        assert_eq!(vertices.element_stride(), 32);
    }

    #[test]
    fn test_constant_regions_are_padded() {
        let frame = FrameResource::new(0, &FrameResourceDesc::default()).unwrap();
        assert_eq!(frame.object_constants().element_stride(), 256);
        assert_eq!(frame.pass_constants().element_stride(), 1280);
    }

    #[test]
    fn test_desc_for_scene_follows_highest_index() {
        use frameflight_resources::Material;
        use frameflight_scene::{MeshGeometry, RenderItem, RenderLayer, SubmeshGeometry};

        let indices = UploadBuffer::<u16>::new("idx", BufferUsage::Vertex, 3).unwrap();
        let mut scene = Scene::new();
        let water = scene.add_material(Material::new("water", 4, 0));
        let geo = scene.add_geometry(MeshGeometry::new(
            "water",
            VertexSource::PerFrame { vertex_count: 900 },
            indices.view(),
        ));
        scene.add_render_item(
            RenderLayer::Transparent,
            RenderItem::new(6, water, geo, SubmeshGeometry::default()),
        );

        let desc = FrameResourceDesc::for_scene(&scene);
        assert_eq!(desc.object_count, 7);
        assert_eq!(desc.material_count, 5);
        assert_eq!(desc.dynamic_vertex_count, 900);
        assert_eq!(desc.pass_count, 1);
    }

    #[test]
    fn test_per_frame_geometry_must_fit_dynamic_vertices() {
        use frameflight_scene::MeshGeometry;

        let indices = UploadBuffer::<u16>::new("idx", BufferUsage::Index, 6).unwrap();
        let mut scene = Scene::new();
        scene.add_geometry(MeshGeometry::new(
            "water",
            VertexSource::PerFrame { vertex_count: 100 },
            indices.view(),
        ));

        let fits = FrameResource::new(0, &FrameResourceDesc::for_scene(&scene)).unwrap();
        assert!(fits.validate_dynamic_vertices(&scene).is_ok());

        let small = FrameResourceDesc {
            dynamic_vertex_count: 64,
            ..FrameResourceDesc::default()
        };
        let frame = FrameResource::new(1, &small).unwrap();
        match frame.validate_dynamic_vertices(&scene).unwrap_err() {
            RhiError::CapacityExceeded {
                index, capacity, ..
            } => {
                assert_eq!(index, 99);
                assert_eq!(capacity, 64);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let none = FrameResource::new(2, &FrameResourceDesc::default()).unwrap();
        assert!(matches!(
            none.validate_dynamic_vertices(&scene),
            Err(RhiError::CapacityExceeded { capacity: 0, .. })
        ));
    }

    #[test]
    fn test_empty_scene_desc_is_allocatable() {
        let desc = FrameResourceDesc::for_scene(&Scene::new());
        assert!(FrameResource::new(0, &desc).is_ok());
    }

    #[test]
    fn test_empty_region_is_rejected() {
        let desc = FrameResourceDesc {
            material_count: 0,
            ..FrameResourceDesc::default()
        };
        assert!(FrameResource::new(0, &desc).is_err());
    }

    #[test]
    fn test_frame_resource_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<FrameResource>();
    }
}
