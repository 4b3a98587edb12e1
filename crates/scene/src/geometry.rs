//! Shared mesh geometry.
//!
//! A [`MeshGeometry`] groups one vertex buffer and one index buffer with a set
//! of named [`SubmeshGeometry`] ranges. Render items reference a geometry by
//! handle and copy the draw arguments of one submesh.
//!
//! Geometry whose vertices change every frame (the wave grid) does not own a
//! vertex buffer; its [`VertexSource::PerFrame`] says to bind the dynamic
//! vertex region of whichever frame resource is being recorded.

use std::collections::HashMap;

use frameflight_rhi::buffer::BufferView;

/// Index range of one drawable part of a mesh.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SubmeshGeometry {
    /// Number of indices to draw.
    pub index_count: u32,
    /// First index in the mesh's index buffer.
    pub start_index: u32,
    /// Value added to every index before fetching a vertex.
    pub base_vertex: i32,
}

/// Where a mesh's vertices come from at draw time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VertexSource {
    /// Immutable buffer uploaded once at startup.
    Static(BufferView),
    /// Dynamic vertex region of the current frame resource.
    PerFrame {
        /// Number of vertices written each frame.
        vertex_count: u32,
    },
}

/// Named vertex/index buffers with named submeshes.
#[derive(Clone, Debug)]
pub struct MeshGeometry {
    /// Unique name for lookup
    pub name: String,
    /// Vertex binding
    pub vertices: VertexSource,
    /// Index buffer binding
    pub index_buffer: BufferView,
    submeshes: HashMap<String, SubmeshGeometry>,
}

impl MeshGeometry {
    /// Creates a geometry with no submeshes.
    pub fn new(name: impl Into<String>, vertices: VertexSource, index_buffer: BufferView) -> Self {
        Self {
            name: name.into(),
            vertices,
            index_buffer,
            submeshes: HashMap::new(),
        }
    }

    /// Adds (or replaces) a named submesh.
    pub fn with_submesh(mut self, name: impl Into<String>, submesh: SubmeshGeometry) -> Self {
        self.submeshes.insert(name.into(), submesh);
        self
    }

    /// Looks up a submesh by name.
    pub fn submesh(&self, name: &str) -> Option<SubmeshGeometry> {
        self.submeshes.get(name).copied()
    }

    /// Returns true when the vertices come from the per-frame dynamic region.
    pub fn is_dynamic(&self) -> bool {
        matches!(self.vertices, VertexSource::PerFrame { .. })
    }
}
