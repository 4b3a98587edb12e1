//! Vertex data structures and input descriptions.
//!
//! # Vertex Types
//!
//! - [`Vertex`] - lit, textured vertex used by meshes and the dynamic wave grid
//! - [`BillboardVertex`] - point expanded to a camera-facing quad in the geometry stage

use std::mem::{offset_of, size_of};

use ash::vk;
use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};

/// Lit, textured vertex.
///
/// # Memory Layout
///
/// | Offset | Size | Field |
/// |--------|------|-------|
/// | 0      | 12   | position |
/// | 12     | 12   | normal |
/// | 24     | 8    | tex_coord |
///
/// Total size: 32 bytes
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    /// Position in object space.
    pub position: Vec3,
    /// Unit surface normal.
    pub normal: Vec3,
    /// Texture coordinates.
    pub tex_coord: Vec2,
}

impl Vertex {
    /// Creates a new vertex.
    #[inline]
    pub const fn new(position: Vec3, normal: Vec3, tex_coord: Vec2) -> Self {
        Self {
            position,
            normal,
            tex_coord,
        }
    }

    /// Per-vertex binding at slot 0.
    pub fn binding_description() -> vk::VertexInputBindingDescription {
        per_vertex_binding::<Self>()
    }

    /// Position, normal and texture coordinate at locations 0..3.
    pub fn attribute_descriptions() -> [vk::VertexInputAttributeDescription; 3] {
        [
            attribute(0, vk::Format::R32G32B32_SFLOAT, offset_of!(Self, position)),
            attribute(1, vk::Format::R32G32B32_SFLOAT, offset_of!(Self, normal)),
            attribute(2, vk::Format::R32G32_SFLOAT, offset_of!(Self, tex_coord)),
        ]
    }
}

fn per_vertex_binding<T>() -> vk::VertexInputBindingDescription {
    vk::VertexInputBindingDescription {
        binding: 0,
        stride: size_of::<T>() as u32,
        input_rate: vk::VertexInputRate::VERTEX,
    }
}

fn attribute(location: u32, format: vk::Format, offset: usize) -> vk::VertexInputAttributeDescription {
    vk::VertexInputAttributeDescription {
        binding: 0,
        location,
        format,
        offset: offset as u32,
    }
}

/// Billboard sprite point: world-space centre and quad size.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct BillboardVertex {
    /// Quad centre in world space.
    pub center: Vec3,
    /// Quad width and height.
    pub size: Vec2,
}

impl BillboardVertex {
    /// Per-vertex binding at slot 0.
    pub fn binding_description() -> vk::VertexInputBindingDescription {
        per_vertex_binding::<Self>()
    }

    /// Centre and size at locations 0 and 1.
    pub fn attribute_descriptions() -> [vk::VertexInputAttributeDescription; 2] {
        [
            attribute(0, vk::Format::R32G32B32_SFLOAT, offset_of!(Self, center)),
            attribute(1, vk::Format::R32G32_SFLOAT, offset_of!(Self, size)),
        ]
    }
}
