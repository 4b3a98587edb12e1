//! Procedural meshes for the demo courtyard.
//!
//! Every solid is described as a list of convex faces. Each face gets its own
//! vertices so normals stay flat, and is triangulated as a fan. All shapes
//! are packed into one vertex/index pair and addressed through named
//! submeshes.

use std::f32::consts::TAU;

use glam::{Vec2, Vec3};

use frameflight_rhi::vertex::Vertex;
use frameflight_scene::SubmeshGeometry;

/// CPU-side vertices and 16-bit indices of one or more shapes.
#[derive(Debug, Default)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u16>,
}

impl MeshData {
    /// Appends a convex polygon.
    ///
    /// The winding is flipped if needed so the normal points away from the
    /// shape's origin.
    fn push_face(&mut self, corners: &[Vec3]) {
        let centroid = corners.iter().copied().sum::<Vec3>() / corners.len() as f32;
        let mut normal = (corners[1] - corners[0])
            .cross(corners[2] - corners[0])
            .normalize_or_zero();
        let flipped = normal.dot(centroid) < 0.0;
        if flipped {
            normal = -normal;
        }

        let base = self.vertices.len() as u16;
        let count = corners.len();
        for (k, &position) in corners.iter().enumerate() {
            let angle = TAU * k as f32 / count as f32;
            let tex = Vec2::new(0.5 + 0.5 * angle.cos(), 0.5 - 0.5 * angle.sin());
            self.vertices.push(Vertex::new(position, normal, tex));
        }
        for k in 1..count as u16 - 1 {
            if flipped {
                self.indices.extend_from_slice(&[base, base + k + 1, base + k]);
            } else {
                self.indices.extend_from_slice(&[base, base + k, base + k + 1]);
            }
        }
    }

    /// Appends `other` and returns the submesh addressing it.
    pub fn append(&mut self, other: MeshData) -> SubmeshGeometry {
        let submesh = SubmeshGeometry {
            index_count: other.indices.len() as u32,
            start_index: self.indices.len() as u32,
            base_vertex: self.vertices.len() as i32,
        };
        self.vertices.extend(other.vertices);
        self.indices.extend(other.indices);
        submesh
    }
}

/// Axis-aligned box centred on the origin.
pub fn cuboid(width: f32, height: f32, depth: f32) -> MeshData {
    let (w, h, d) = (width * 0.5, height * 0.5, depth * 0.5);
    let c = |x: f32, y: f32, z: f32| Vec3::new(x * w, y * h, z * d);
    let mut mesh = MeshData::default();
    mesh.push_face(&[c(-1., -1., -1.), c(-1., 1., -1.), c(1., 1., -1.), c(1., -1., -1.)]);
    mesh.push_face(&[c(-1., -1., 1.), c(1., -1., 1.), c(1., 1., 1.), c(-1., 1., 1.)]);
    mesh.push_face(&[c(-1., 1., -1.), c(-1., 1., 1.), c(1., 1., 1.), c(1., 1., -1.)]);
    mesh.push_face(&[c(-1., -1., -1.), c(1., -1., -1.), c(1., -1., 1.), c(-1., -1., 1.)]);
    mesh.push_face(&[c(-1., -1., 1.), c(-1., 1., 1.), c(-1., 1., -1.), c(-1., -1., -1.)]);
    mesh.push_face(&[c(1., -1., -1.), c(1., 1., -1.), c(1., 1., 1.), c(1., -1., 1.)]);
    mesh
}

/// Flat `m` x `n` vertex grid in the XZ plane, facing +Y.
pub fn grid(width: f32, depth: f32, m: usize, n: usize) -> MeshData {
    let dx = width / (n - 1) as f32;
    let dz = depth / (m - 1) as f32;
    let du = 1.0 / (n - 1) as f32;
    let dv = 1.0 / (m - 1) as f32;

    let mut mesh = MeshData::default();
    for i in 0..m {
        let z = 0.5 * depth - i as f32 * dz;
        for j in 0..n {
            let x = -0.5 * width + j as f32 * dx;
            mesh.vertices.push(Vertex::new(
                Vec3::new(x, 0.0, z),
                Vec3::Y,
                Vec2::new(j as f32 * du, i as f32 * dv),
            ));
        }
    }
    for i in 0..m - 1 {
        for j in 0..n - 1 {
            let at = |r: usize, c: usize| (r * n + c) as u16;
            mesh.indices.extend_from_slice(&[
                at(i, j),
                at(i, j + 1),
                at(i + 1, j),
                at(i + 1, j),
                at(i, j + 1),
                at(i + 1, j + 1),
            ]);
        }
    }
    mesh
}

/// Square-based pyramid with its base on y = 0.
pub fn pyramid(base: f32, height: f32) -> MeshData {
    let b = base * 0.5;
    let apex = Vec3::new(0.0, height, 0.0);
    let corners = [
        Vec3::new(-b, 0.0, -b),
        Vec3::new(b, 0.0, -b),
        Vec3::new(b, 0.0, b),
        Vec3::new(-b, 0.0, b),
    ];
    let mut mesh = MeshData::default();
    for k in 0..4 {
        mesh.push_face(&[corners[k], apex, corners[(k + 1) % 4]]);
    }
    // Base faces down; its centroid is the origin, so wind it explicitly.
    mesh.push_face(&[corners[0], corners[1], corners[2], corners[3]]);
    mesh
}

/// Octahedral gem centred on the origin.
pub fn diamond(width: f32, height: f32) -> MeshData {
    let w = width * 0.5;
    let top = Vec3::new(0.0, height * 0.5, 0.0);
    let bottom = -top;
    let girdle = [
        Vec3::new(-w, 0.0, 0.0),
        Vec3::new(0.0, 0.0, w),
        Vec3::new(w, 0.0, 0.0),
        Vec3::new(0.0, 0.0, -w),
    ];
    let mut mesh = MeshData::default();
    for k in 0..4 {
        let (a, b) = (girdle[k], girdle[(k + 1) % 4]);
        mesh.push_face(&[a, top, b]);
        mesh.push_face(&[a, b, bottom]);
    }
    mesh
}

/// Wedge rising from -Z to +Z.
pub fn ramp(width: f32, height: f32, depth: f32) -> MeshData {
    let (w, d) = (width * 0.5, depth * 0.5);
    let (h0, h1) = (-height * 0.5, height * 0.5);
    let bl = Vec3::new(-w, h0, -d);
    let br = Vec3::new(w, h0, -d);
    let fl = Vec3::new(-w, h0, d);
    let fr = Vec3::new(w, h0, d);
    let tl = Vec3::new(-w, h1, d);
    let tr = Vec3::new(w, h1, d);

    let mut mesh = MeshData::default();
    mesh.push_face(&[bl, tl, tr, br]);
    mesh.push_face(&[fl, fr, tr, tl]);
    mesh.push_face(&[bl, br, fr, fl]);
    mesh.push_face(&[bl, fl, tl]);
    mesh.push_face(&[br, tr, fr]);
    mesh
}

/// Regular prism approximating a cylinder along +Y, centred on the origin.
pub fn prism(radius: f32, height: f32, slices: usize) -> MeshData {
    let h = height * 0.5;
    let ring = |y: f32| -> Vec<Vec3> {
        (0..slices)
            .map(|k| {
                let angle = TAU * k as f32 / slices as f32;
                Vec3::new(radius * angle.cos(), y, radius * angle.sin())
            })
            .collect()
    };
    let bottom = ring(-h);
    let top = ring(h);

    let mut mesh = MeshData::default();
    for k in 0..slices {
        let next = (k + 1) % slices;
        mesh.push_face(&[bottom[k], top[k], top[next], bottom[next]]);
    }
    mesh.push_face(&top);
    mesh.push_face(&bottom);
    mesh
}

/// Thin slab whose outline is a kite, standing in the XY plane.
pub fn kite(width: f32, height: f32, thickness: f32) -> MeshData {
    let outline = [
        Vec2::new(0.0, height * 0.5),
        Vec2::new(width * 0.5, height * 0.2),
        Vec2::new(0.0, -height * 0.5),
        Vec2::new(-width * 0.5, height * 0.2),
    ];
    slab(&outline, thickness)
}

/// Thin slab whose outline is a regular pentagon, standing in the XY plane.
pub fn pentagon(radius: f32, thickness: f32) -> MeshData {
    let outline: Vec<Vec2> = (0..5)
        .map(|k| {
            let angle = TAU * k as f32 / 5.0 + std::f32::consts::FRAC_PI_2;
            Vec2::new(radius * angle.cos(), radius * angle.sin())
        })
        .collect();
    slab(&outline, thickness)
}

fn slab(outline: &[Vec2], thickness: f32) -> MeshData {
    let t = thickness * 0.5;
    let front: Vec<Vec3> = outline.iter().map(|p| Vec3::new(p.x, p.y, -t)).collect();
    let back: Vec<Vec3> = outline.iter().map(|p| Vec3::new(p.x, p.y, t)).collect();

    let mut mesh = MeshData::default();
    mesh.push_face(&front);
    mesh.push_face(&back);
    for k in 0..outline.len() {
        let next = (k + 1) % outline.len();
        mesh.push_face(&[front[k], back[k], back[next], front[next]]);
    }
    mesh
}
