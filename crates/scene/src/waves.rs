//! Water surface simulation.
//!
//! Solves the damped 2D wave equation on a regular grid with an explicit
//! finite-difference scheme. Two height fields are kept; each fixed time step
//! computes the next field from the current and previous ones and swaps them.
//! The boundary rows and columns stay at rest.
//!
//! # Example
//!
//! ```
//! use frameflight_scene::waves::{WaveParams, Waves};
//!
//! let mut waves = Waves::with_seed(WaveParams::default(), 7);
//! waves.disturb(10, 10, 0.5);
//! waves.update(0.1);
//! assert_eq!(waves.vertex_count(), 128 * 128);
//! ```

use frameflight_rhi::vertex::Vertex;
use glam::{Vec2, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::warn;

/// Grid and propagation parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WaveParams {
    /// Grid rows (along Z)
    pub rows: usize,
    /// Grid columns (along X)
    pub columns: usize,
    /// Distance between neighbouring grid points
    pub spatial_step: f32,
    /// Fixed simulation step in seconds
    pub time_step: f32,
    /// Wave propagation speed
    pub speed: f32,
    /// Damping factor
    pub damping: f32,
}

impl Default for WaveParams {
    fn default() -> Self {
        Self {
            rows: 128,
            columns: 128,
            spatial_step: 1.0,
            time_step: 0.03,
            speed: 4.0,
            damping: 0.2,
        }
    }
}

/// Magnitude range of random disturbances.
const DISTURB_MAGNITUDE: std::ops::RangeInclusive<f32> = 0.2..=0.5;

/// Distance from the grid edge within which random disturbances never land.
const DISTURB_MARGIN: usize = 4;

/// Smallest row or column count that leaves a point for random disturbances.
pub const MIN_GRID_SIZE: usize = 2 * DISTURB_MARGIN + 1;

/// Finite-difference wave grid.
#[derive(Debug)]
pub struct Waves {
    params: WaveParams,
    k1: f32,
    k2: f32,
    k3: f32,
    accumulated: f32,
    prev: Vec<Vec3>,
    curr: Vec<Vec3>,
    normals: Vec<Vec3>,
    tangents: Vec<Vec3>,
    rng: StdRng,
}

impl Waves {
    /// Creates a flat grid centred on the origin in the XZ plane.
    pub fn new(params: WaveParams) -> Self {
        Self::with_rng(params, StdRng::from_entropy())
    }

    /// Same as [`new`](Self::new) with a deterministic disturbance sequence.
    pub fn with_seed(params: WaveParams, seed: u64) -> Self {
        Self::with_rng(params, StdRng::seed_from_u64(seed))
    }

    /// Grids smaller than [`MIN_GRID_SIZE`] in either direction are enlarged
    /// to it.
    fn with_rng(mut params: WaveParams, rng: StdRng) -> Self {
        if params.rows < MIN_GRID_SIZE || params.columns < MIN_GRID_SIZE {
            warn!(
                "Wave grid {}x{} is too small, using at least {MIN_GRID_SIZE}x{MIN_GRID_SIZE}",
                params.rows, params.columns
            );
            params.rows = params.rows.max(MIN_GRID_SIZE);
            params.columns = params.columns.max(MIN_GRID_SIZE);
        }

        let WaveParams {
            rows,
            columns,
            spatial_step: dx,
            time_step: dt,
            speed,
            damping,
        } = params;

        let d = damping * dt + 2.0;
        let e = (speed * speed) * (dt * dt) / (dx * dx);
        let k1 = (damping * dt - 2.0) / d;
        let k2 = (4.0 - 8.0 * e) / d;
        let k3 = (2.0 * e) / d;

        let half_width = (columns - 1) as f32 * dx * 0.5;
        let half_depth = (rows - 1) as f32 * dx * 0.5;
        let mut grid = Vec::with_capacity(rows * columns);
        for i in 0..rows {
            let z = half_depth - i as f32 * dx;
            for j in 0..columns {
                let x = -half_width + j as f32 * dx;
                grid.push(Vec3::new(x, 0.0, z));
            }
        }

        let count = grid.len();
        Self {
            params,
            k1,
            k2,
            k3,
            accumulated: 0.0,
            prev: grid.clone(),
            curr: grid,
            normals: vec![Vec3::Y; count],
            tangents: vec![Vec3::X; count],
            rng,
        }
    }

    /// Returns the simulation parameters.
    pub fn params(&self) -> &WaveParams {
        &self.params
    }

    /// Number of grid rows.
    pub fn row_count(&self) -> usize {
        self.params.rows
    }

    /// Number of grid columns.
    pub fn column_count(&self) -> usize {
        self.params.columns
    }

    /// Number of grid vertices.
    pub fn vertex_count(&self) -> usize {
        self.curr.len()
    }

    /// Number of triangles covering the grid.
    pub fn triangle_count(&self) -> usize {
        (self.params.rows - 1) * (self.params.columns - 1) * 2
    }

    /// Extent along X.
    pub fn width(&self) -> f32 {
        self.params.columns as f32 * self.params.spatial_step
    }

    /// Extent along Z.
    pub fn depth(&self) -> f32 {
        self.params.rows as f32 * self.params.spatial_step
    }

    /// Current position of vertex `i`.
    pub fn position(&self, i: usize) -> Vec3 {
        self.curr[i]
    }

    /// Current normal of vertex `i`.
    pub fn normal(&self, i: usize) -> Vec3 {
        self.normals[i]
    }

    /// Current tangent (along +X) of vertex `i`.
    pub fn tangent(&self, i: usize) -> Vec3 {
        self.tangents[i]
    }

    /// Vertex `i` ready for upload, with texture coordinates mapping the
    /// grid extent onto [0, 1].
    pub fn vertex(&self, i: usize) -> Vertex {
        let p = self.curr[i];
        let tex_coord = Vec2::new(0.5 + p.x / self.width(), 0.5 - p.z / self.depth());
        Vertex::new(p, self.normals[i], tex_coord)
    }

    /// Triangle-list indices, two triangles per grid cell.
    pub fn indices(&self) -> Vec<u32> {
        let (m, n) = (self.params.rows as u32, self.params.columns as u32);
        let mut indices = Vec::with_capacity(self.triangle_count() * 3);
        for i in 0..m - 1 {
            for j in 0..n - 1 {
                indices.extend_from_slice(&[
                    i * n + j,
                    i * n + j + 1,
                    (i + 1) * n + j,
                    (i + 1) * n + j,
                    i * n + j + 1,
                    (i + 1) * n + j + 1,
                ]);
            }
        }
        indices
    }

    /// Advances the simulation by `dt` seconds.
    ///
    /// The grid only steps once the accumulated time reaches the fixed time
    /// step, so calling this with small `dt` is cheap.
    pub fn update(&mut self, dt: f32) {
        self.accumulated += dt;
        if self.accumulated < self.params.time_step {
            return;
        }

        let n = self.params.columns;
        let m = self.params.rows;

        // Only interior points; the boundary is clamped at rest.
        for i in 1..m - 1 {
            for j in 1..n - 1 {
                let idx = i * n + j;
                let neighbours = self.curr[(i + 1) * n + j].y
                    + self.curr[(i - 1) * n + j].y
                    + self.curr[idx + 1].y
                    + self.curr[idx - 1].y;
                self.prev[idx].y =
                    self.k1 * self.prev[idx].y + self.k2 * self.curr[idx].y + self.k3 * neighbours;
            }
        }

        // prev now holds the newest solution.
        std::mem::swap(&mut self.prev, &mut self.curr);
        self.accumulated = 0.0;

        let two_dx = 2.0 * self.params.spatial_step;
        for i in 1..m - 1 {
            for j in 1..n - 1 {
                let idx = i * n + j;
                let l = self.curr[idx - 1].y;
                let r = self.curr[idx + 1].y;
                let t = self.curr[(i - 1) * n + j].y;
                let b = self.curr[(i + 1) * n + j].y;
                self.normals[idx] = Vec3::new(l - r, two_dx, b - t).normalize();
                self.tangents[idx] = Vec3::new(two_dx, r - l, 0.0).normalize();
            }
        }
    }

    /// Raises the point at row `i`, column `j` by `magnitude` and its four
    /// neighbours by half that.
    ///
    /// Points within two cells of the edge are ignored.
    pub fn disturb(&mut self, i: usize, j: usize, magnitude: f32) {
        let (m, n) = (self.params.rows, self.params.columns);
        if !(i > 1 && i < m - 2 && j > 1 && j < n - 2) {
            return;
        }

        let half = 0.5 * magnitude;
        let idx = i * n + j;
        self.curr[idx].y += magnitude;
        self.curr[idx + 1].y += half;
        self.curr[idx - 1].y += half;
        self.curr[idx + n].y += half;
        self.curr[idx - n].y += half;
    }

    /// Disturbs a random interior point by a random magnitude in [0.2, 0.5].
    ///
    /// Returns the chosen `(row, column, magnitude)`.
    pub fn disturb_random(&mut self) -> (usize, usize, f32) {
        let i = self
            .rng
            .gen_range(DISTURB_MARGIN..=self.params.rows - 1 - DISTURB_MARGIN);
        let j = self
            .rng
            .gen_range(DISTURB_MARGIN..=self.params.columns - 1 - DISTURB_MARGIN);
        let magnitude = self.rng.gen_range(DISTURB_MAGNITUDE);
        self.disturb(i, j, magnitude);
        (i, j, magnitude)
    }
}
