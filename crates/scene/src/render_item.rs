//! Render items and render layers.

use frameflight_resources::ObjectConstants;
use frameflight_rhi::command::PipelineHandle;
use frameflight_rhi::vk;
use glam::Mat4;

use crate::geometry::SubmeshGeometry;
use crate::handle::{GeometryId, MaterialId};

/// Pipeline-state group a render item is drawn with.
///
/// Layers are recorded strictly in [`RenderLayer::DRAW_ORDER`], so
/// transparent surfaces blend over everything opaque.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RenderLayer {
    /// Depth-tested, no blending
    Opaque,
    /// Alpha-clipped (fences, foliage)
    AlphaTested,
    /// Point sprites expanded to camera-facing quads
    Billboard,
    /// Alpha-blended (water)
    Transparent,
}

impl RenderLayer {
    /// Number of layers.
    pub const COUNT: usize = 4;

    /// Recording order of the layers.
    pub const DRAW_ORDER: [RenderLayer; Self::COUNT] = [
        RenderLayer::Opaque,
        RenderLayer::AlphaTested,
        RenderLayer::Billboard,
        RenderLayer::Transparent,
    ];

    /// Dense index of the layer, in draw order.
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            RenderLayer::Opaque => 0,
            RenderLayer::AlphaTested => 1,
            RenderLayer::Billboard => 2,
            RenderLayer::Transparent => 3,
        }
    }

    /// Pipeline state used for the layer.
    #[inline]
    pub const fn pipeline(self) -> PipelineHandle {
        PipelineHandle::new(self.index() as u32)
    }

    /// Returns a human-readable name for the layer.
    pub fn name(self) -> &'static str {
        match self {
            RenderLayer::Opaque => "opaque",
            RenderLayer::AlphaTested => "alpha_tested",
            RenderLayer::Billboard => "billboard",
            RenderLayer::Transparent => "transparent",
        }
    }
}

/// One draw of one submesh with one material.
///
/// The world and texture transforms are the authoritative state; after
/// changing either, mark the item dirty so every frame resource re-uploads
/// its [`ObjectConstants`].
#[derive(Clone, Debug)]
pub struct RenderItem {
    /// Object to world transform
    pub world: Mat4,
    /// Texture coordinate transform
    pub tex_transform: Mat4,
    /// Index into the per-frame object constant region
    pub object_constant_index: usize,
    /// Material used for shading
    pub material: MaterialId,
    /// Geometry the draw arguments refer to
    pub geometry: GeometryId,
    /// Input-assembler topology
    pub topology: vk::PrimitiveTopology,
    /// Draw arguments
    pub submesh: SubmeshGeometry,
}

impl RenderItem {
    /// Creates a triangle-list item with identity transforms.
    pub fn new(
        object_constant_index: usize,
        material: MaterialId,
        geometry: GeometryId,
        submesh: SubmeshGeometry,
    ) -> Self {
        Self {
            world: Mat4::IDENTITY,
            tex_transform: Mat4::IDENTITY,
            object_constant_index,
            material,
            geometry,
            topology: vk::PrimitiveTopology::TRIANGLE_LIST,
            submesh,
        }
    }

    /// Sets the world transform.
    pub fn with_world(mut self, world: Mat4) -> Self {
        self.world = world;
        self
    }

    /// Sets the texture transform.
    pub fn with_tex_transform(mut self, tex_transform: Mat4) -> Self {
        self.tex_transform = tex_transform;
        self
    }

    /// Sets the primitive topology.
    pub fn with_topology(mut self, topology: vk::PrimitiveTopology) -> Self {
        self.topology = topology;
        self
    }

    /// Packs the item's transforms for upload.
    pub fn constants(&self) -> ObjectConstants {
        ObjectConstants::new(self.world, self.tex_transform)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_draw_order() {
        let order: Vec<usize> = RenderLayer::DRAW_ORDER.iter().map(|l| l.index()).collect();
        assert_eq!(order, vec![0, 1, 2, 3]);
        assert_eq!(RenderLayer::DRAW_ORDER[2], RenderLayer::Billboard);
        assert_eq!(RenderLayer::Transparent.pipeline(), PipelineHandle::new(3));
    }

    #[test]
    fn test_render_item_constants() {
        let world = Mat4::from_translation(Vec3::new(0.0, 1.0, 0.0));
        let item = RenderItem::new(
            2,
            MaterialId::new(0),
            GeometryId::new(0),
            SubmeshGeometry::default(),
        )
        .with_world(world)
        .with_topology(vk::PrimitiveTopology::POINT_LIST);

        assert_eq!(item.constants().world, world.transpose());
        assert_eq!(item.topology, vk::PrimitiveTopology::POINT_LIST);
        assert_eq!(item.object_constant_index, 2);
    }
}
