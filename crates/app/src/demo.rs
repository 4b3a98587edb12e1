//! Demo courtyard: a castle yard with a pond, built from procedural shapes.

use bytemuck::Pod;
use glam::{Mat4, Quat, Vec2, Vec3, Vec4};
use tracing::info;

use frameflight_renderer::{MaterialScroll, RenderContext, WaveAnimator};
use frameflight_resources::Material;
use frameflight_rhi::{RhiResult, vk};
use frameflight_rhi::buffer::{BufferUsage, UploadBuffer};
use frameflight_rhi::vertex::{BillboardVertex, Vertex};
use frameflight_scene::{
    MaterialId, MeshGeometry, OrbitCamera, RenderItem, RenderLayer, Scene, SceneLighting,
    SubmeshGeometry, VertexSource, WaveParams, Waves,
};

use crate::shapes::{self, MeshData};

/// Immutable buffers referenced by the scene's static geometry.
///
/// Kept alive for as long as the scene is drawn.
#[derive(Debug)]
pub struct StaticBuffers {
    shape_vertices: UploadBuffer<Vertex>,
    shape_indices: UploadBuffer<u16>,
    tree_vertices: UploadBuffer<BillboardVertex>,
    tree_indices: UploadBuffer<u16>,
    wave_indices: UploadBuffer<u32>,
}

impl StaticBuffers {
    /// Total bytes held by the static buffers.
    pub fn size_in_bytes(&self) -> u64 {
        self.shape_vertices.view().size_in_bytes
            + self.shape_indices.view().size_in_bytes
            + self.tree_vertices.view().size_in_bytes
            + self.tree_indices.view().size_in_bytes
            + self.wave_indices.view().size_in_bytes
    }
}

/// The demo scene, ready to render.
pub struct Demo {
    pub context: RenderContext,
    pub buffers: StaticBuffers,
}

fn upload<T: Pod>(label: &str, usage: BufferUsage, data: &[T]) -> RhiResult<UploadBuffer<T>> {
    let mut buffer = UploadBuffer::new(label, usage, data.len())?;
    for (i, value) in data.iter().enumerate() {
        buffer.copy_data(i, value)?;
    }
    Ok(buffer)
}

fn place(scale: Vec3, translation: Vec3) -> Mat4 {
    Mat4::from_scale_rotation_translation(scale, Quat::IDENTITY, translation)
}

struct MaterialTable {
    grass: MaterialId,
    water: MaterialId,
    bricks: MaterialId,
    wood: MaterialId,
    ice: MaterialId,
    gate: MaterialId,
    roof: MaterialId,
    metal: MaterialId,
    floor: MaterialId,
    trees: MaterialId,
}

fn add_materials(scene: &mut Scene) -> MaterialTable {
    // Constant slots 2, 4 and 5 belong to textures this yard does not use.
    let mut add = |name: &str, index: usize, albedo_alpha: f32, r0: f32, roughness: f32| {
        scene.add_material(
            Material::new(name, index, index as u32)
                .with_albedo(Vec4::new(1.0, 1.0, 1.0, albedo_alpha))
                .with_surface(Vec3::splat(r0), roughness),
        )
    };
    MaterialTable {
        grass: add("grass0", 0, 1.0, 0.01, 1.0),
        water: add("water", 1, 0.5, 0.1, 0.0),
        bricks: add("bricks0", 3, 1.0, 0.02, 0.5),
        wood: add("wood0", 6, 1.0, 0.02, 1.0),
        ice: add("ice0", 7, 1.0, 0.02, 0.0),
        gate: add("gate0", 8, 0.0, 0.02, 0.3),
        roof: add("roof0", 9, 1.0, 0.02, 0.5),
        metal: add("metal0", 10, 1.0, 0.02, 0.1),
        floor: add("bricks2", 11, 1.0, 0.02, 1.0),
        trees: add("treeSprites", 12, 1.0, 0.01, 0.125),
    }
}

/// Builds the courtyard scene with its animators.
///
/// # Arguments
///
/// * `frames_in_flight` - Ring size the context tracks dirty counts for
/// * `wave_seed` - Seed for wave disturbances; `None` seeds from entropy
///
/// # Errors
///
/// Returns an error if a static buffer cannot be allocated.
pub fn build(frames_in_flight: usize, wave_seed: Option<u64>) -> RhiResult<Demo> {
    let mut scene = Scene::new();
    let materials = add_materials(&mut scene);

    // Water surface, rewritten into the slot's dynamic buffer every frame.
    let waves = match wave_seed {
        Some(seed) => Waves::with_seed(WaveParams::default(), seed),
        None => Waves::new(WaveParams::default()),
    };
    let wave_indices = upload("waves indices", BufferUsage::Index, &waves.indices())?;
    let wave_grid = SubmeshGeometry {
        index_count: wave_indices.element_count() as u32,
        ..SubmeshGeometry::default()
    };
    let water_geo = scene.add_geometry(
        MeshGeometry::new(
            "waterGeo",
            VertexSource::PerFrame {
                vertex_count: waves.vertex_count() as u32,
            },
            wave_indices.view(),
        )
        .with_submesh("grid", wave_grid),
    );

    // Tree sprites, expanded to quads on the GPU.
    let trees: Vec<BillboardVertex> = [(12.5, 11.0), (-12.5, 11.0), (12.5, -11.0), (-12.5, -11.0)]
        .into_iter()
        .map(|(x, z)| BillboardVertex {
            center: Vec3::new(x, 10.0, z),
            size: Vec2::splat(20.0),
        })
        .collect();
    let tree_vertices = upload("tree sprite vertices", BufferUsage::Vertex, &trees)?;
    let tree_index_data: Vec<u16> = (0..trees.len() as u16).collect();
    let tree_indices = upload("tree sprite indices", BufferUsage::Index, &tree_index_data)?;
    let tree_points = SubmeshGeometry {
        index_count: tree_index_data.len() as u32,
        ..SubmeshGeometry::default()
    };
    let tree_geo = scene.add_geometry(
        MeshGeometry::new(
            "treeSpritesGeo",
            VertexSource::Static(tree_vertices.view()),
            tree_indices.view(),
        )
        .with_submesh("points", tree_points),
    );

    // Every solid shares one vertex/index pair.
    let mut packed = MeshData::default();
    let pedestal = packed.append(shapes::cuboid(1.5, 0.5, 1.5));
    let grid = packed.append(shapes::grid(1.0, 1.0, 60, 40));
    let cylinder = packed.append(shapes::prism(0.5, 3.0, 20));
    let diamond = packed.append(shapes::diamond(1.0, 1.5));
    let wall = packed.append(shapes::cuboid(10.0, 4.0, 2.0));
    let ramp = packed.append(shapes::ramp(1.5, 0.5, 1.5));
    let pyramid = packed.append(shapes::pyramid(1.5, 1.5));
    let kite = packed.append(shapes::kite(1.0, 1.5, 0.1));
    let pentagon = packed.append(shapes::pentagon(0.75, 0.1));
    let shape_vertices = upload("shape vertices", BufferUsage::Vertex, &packed.vertices)?;
    let shape_indices = upload("shape indices", BufferUsage::Index, &packed.indices)?;
    let shape_geo = scene.add_geometry(
        MeshGeometry::new(
            "shapeGeo",
            VertexSource::Static(shape_vertices.view()),
            shape_indices.view(),
        )
        .with_submesh("pedestal", pedestal)
        .with_submesh("grid", grid)
        .with_submesh("cylinder", cylinder)
        .with_submesh("diamond", diamond)
        .with_submesh("wall", wall)
        .with_submesh("ramp", ramp)
        .with_submesh("pyramid", pyramid)
        .with_submesh("kite", kite)
        .with_submesh("pentagon", pentagon),
    );

    scene.add_render_item(
        RenderLayer::Transparent,
        RenderItem::new(0, materials.water, water_geo, wave_grid)
            .with_tex_transform(Mat4::from_scale(Vec3::new(5.0, 5.0, 1.0))),
    );
    scene.add_render_item(
        RenderLayer::Billboard,
        RenderItem::new(1, materials.trees, tree_geo, tree_points)
            .with_topology(vk::PrimitiveTopology::POINT_LIST),
    );

    let mut next_index = 2;
    let mut solid = |scene: &mut Scene, material, submesh, world| {
        let item = RenderItem::new(next_index, material, shape_geo, submesh).with_world(world);
        next_index += 1;
        scene.add_render_item(RenderLayer::Opaque, item)
    };

    solid(&mut scene, materials.metal, pedestal, place(Vec3::splat(2.0), Vec3::new(0.0, 1.5, 0.0)));
    solid(&mut scene, materials.ice, diamond, place(Vec3::splat(2.0), Vec3::new(0.0, 2.5, 0.0)));
    solid(
        &mut scene,
        materials.floor,
        grid,
        place(Vec3::new(15.0, 1.0, 19.0), Vec3::new(0.0, 1.0, 0.0)),
    );
    for i in 0..2 {
        let i = i as f32;
        solid(
            &mut scene,
            materials.bricks,
            wall,
            Mat4::from_translation(Vec3::new(0.0, 3.5, -8.75 + i * 18.0)),
        );
        solid(
            &mut scene,
            materials.bricks,
            wall,
            place(Vec3::new(0.1, 1.0, 8.9), Vec3::new(-7.0 + i * 14.0, 3.5, 0.0)),
        );
    }
    solid(&mut scene, materials.wood, ramp, place(Vec3::splat(2.0), Vec3::new(0.0, 1.5, 0.0)));
    for i in 0..2 {
        let i = i as f32;
        let z = -10.0 + i * 20.0;
        solid(&mut scene, materials.bricks, cylinder, Mat4::from_translation(Vec3::new(-7.5, 2.5, z)));
        solid(&mut scene, materials.bricks, cylinder, Mat4::from_translation(Vec3::new(7.5, 2.5, z)));
        let x = -7.5 + i * 15.0;
        let roof_scale = Vec3::new(1.0, 2.0, 1.0);
        solid(&mut scene, materials.roof, pyramid, place(roof_scale, Vec3::new(x, 9.0, -10.0)));
        solid(&mut scene, materials.roof, pyramid, place(roof_scale, Vec3::new(x, 9.0, 10.0)));
    }
    solid(&mut scene, materials.metal, kite, place(Vec3::splat(2.0), Vec3::new(0.0, 2.0, 9.25)));
    solid(&mut scene, materials.gate, pentagon, place(Vec3::splat(2.0), Vec3::new(0.0, 3.5, -8.75)));
    solid(
        &mut scene,
        materials.grass,
        grid,
        place(Vec3::new(30.0, 1.0, 30.0), Vec3::new(0.0, 0.9, 0.0)),
    );

    info!(
        "Built demo scene: {} materials, {} geometries, {} render items",
        scene.material_count(),
        scene.geometry_count(),
        scene.render_item_count()
    );

    let mut context = RenderContext::new(scene, frames_in_flight)
        .with_camera(OrbitCamera::new())
        .with_lighting(SceneLighting::courtyard());
    context.add_animator(MaterialScroll::new(materials.water));
    context.add_animator(WaveAnimator::new(waves));

    Ok(Demo {
        context,
        buffers: StaticBuffers {
            shape_vertices,
            shape_indices,
            tree_vertices,
            tree_indices,
            wave_indices,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use frameflight_renderer::FrameResourceDesc;
    use frameflight_scene::RenderItemId;

    #[test]
    fn test_demo_scene_layout() {
        let demo = build(3, Some(7)).unwrap();
        let scene = demo.context.scene();
        assert_eq!(scene.material_count(), 10);
        assert_eq!(scene.render_item_count(), 21);
        assert_eq!(scene.layer(RenderLayer::Transparent), &[RenderItemId::new(0)]);
        assert_eq!(scene.layer(RenderLayer::Billboard), &[RenderItemId::new(1)]);
        assert_eq!(scene.layer(RenderLayer::Opaque).len(), 19);
        assert_eq!(demo.context.animator_count(), 2);
    }

    #[test]
    fn test_object_indices_are_dense() {
        let demo = build(3, Some(7)).unwrap();
        for (id, item) in demo.context.scene().render_items() {
            assert_eq!(item.object_constant_index, id.index());
        }
    }

    #[test]
    fn test_demo_regions_fit_sparse_material_indices() {
        let demo = build(3, Some(7)).unwrap();
        let desc = FrameResourceDesc::for_scene(demo.context.scene());
        assert_eq!(desc.object_count, 21);
        assert_eq!(desc.material_count, 13);
        assert_eq!(desc.dynamic_vertex_count, 128 * 128);
    }

    #[test]
    fn test_static_buffers_are_filled() {
        let demo = build(2, Some(1)).unwrap();
        assert!(demo.buffers.size_in_bytes() > 0);
        assert_eq!(
            demo.buffers.wave_indices.element_count(),
            127 * 127 * 6
        );
    }
}
