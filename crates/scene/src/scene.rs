//! Scene tables.
//!
//! [`Scene`] owns every material, geometry and render item. Entries are
//! appended during scene construction and never removed, so handles handed
//! out by the `add_*` methods stay valid for the life of the scene.

use frameflight_resources::Material;
use tracing::debug;

use crate::geometry::MeshGeometry;
use crate::handle::{GeometryId, MaterialId, RenderItemId};
use crate::render_item::{RenderItem, RenderLayer};

/// Owned tables of materials, geometry and render items.
#[derive(Debug, Default)]
pub struct Scene {
    materials: Vec<Material>,
    geometries: Vec<MeshGeometry>,
    items: Vec<RenderItem>,
    layers: [Vec<RenderItemId>; RenderLayer::COUNT],
}

impl Scene {
    /// Creates an empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a material.
    pub fn add_material(&mut self, material: Material) -> MaterialId {
        let id = MaterialId::new(self.materials.len() as u32);
        debug!("Added {} '{}'", id, material.name);
        self.materials.push(material);
        id
    }

    /// Adds a geometry.
    pub fn add_geometry(&mut self, geometry: MeshGeometry) -> GeometryId {
        let id = GeometryId::new(self.geometries.len() as u32);
        debug!("Added {} '{}'", id, geometry.name);
        self.geometries.push(geometry);
        id
    }

    /// Adds a render item and files it under `layer`.
    pub fn add_render_item(&mut self, layer: RenderLayer, item: RenderItem) -> RenderItemId {
        let id = RenderItemId::new(self.items.len() as u32);
        self.items.push(item);
        self.layers[layer.index()].push(id);
        id
    }

    /// Returns a material.
    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id.index())
    }

    /// Returns a material for mutation.
    ///
    /// Prefer the renderer's update accessor, which also marks it dirty.
    pub fn material_mut(&mut self, id: MaterialId) -> Option<&mut Material> {
        self.materials.get_mut(id.index())
    }

    /// Finds a material by name.
    pub fn find_material(&self, name: &str) -> Option<MaterialId> {
        self.materials
            .iter()
            .position(|m| m.name == name)
            .map(|i| MaterialId::new(i as u32))
    }

    /// Returns a geometry.
    pub fn geometry(&self, id: GeometryId) -> Option<&MeshGeometry> {
        self.geometries.get(id.index())
    }

    /// Returns a render item.
    pub fn render_item(&self, id: RenderItemId) -> Option<&RenderItem> {
        self.items.get(id.index())
    }

    /// Returns a render item for mutation.
    ///
    /// Prefer the renderer's update accessor, which also marks it dirty.
    pub fn render_item_mut(&mut self, id: RenderItemId) -> Option<&mut RenderItem> {
        self.items.get_mut(id.index())
    }

    /// Render items filed under `layer`, in insertion order.
    pub fn layer(&self, layer: RenderLayer) -> &[RenderItemId] {
        &self.layers[layer.index()]
    }

    /// All materials with their handles.
    pub fn materials(&self) -> impl Iterator<Item = (MaterialId, &Material)> {
        self.materials
            .iter()
            .enumerate()
            .map(|(i, m)| (MaterialId::new(i as u32), m))
    }

    /// All geometries with their handles.
    pub fn geometries(&self) -> impl Iterator<Item = (GeometryId, &MeshGeometry)> {
        self.geometries
            .iter()
            .enumerate()
            .map(|(i, g)| (GeometryId::new(i as u32), g))
    }

    /// All render items with their handles.
    pub fn render_items(&self) -> impl Iterator<Item = (RenderItemId, &RenderItem)> {
        self.items
            .iter()
            .enumerate()
            .map(|(i, r)| (RenderItemId::new(i as u32), r))
    }

    /// Number of materials.
    pub fn material_count(&self) -> usize {
        self.materials.len()
    }

    /// Number of render items.
    pub fn render_item_count(&self) -> usize {
        self.items.len()
    }

    /// Number of geometries.
    pub fn geometry_count(&self) -> usize {
        self.geometries.len()
    }
}
