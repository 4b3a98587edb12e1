//! Scene data consumed by the frame pipeline.
//!
//! This crate provides the scene-side collaborators of the renderer:
//! - Owned tables of materials, geometry and render items with stable handles
//! - Render layers and their draw order
//! - Orbit camera and scene lighting
//! - Water surface simulation

pub mod camera;
pub mod geometry;
pub mod handle;
pub mod light;
pub mod render_item;
pub mod scene;
pub mod waves;

pub use camera::{OrbitCamera, Projection};
pub use geometry::{MeshGeometry, SubmeshGeometry, VertexSource};
pub use handle::{GeometryId, MaterialId, RenderItemId};
pub use light::SceneLighting;
pub use render_item::{RenderItem, RenderLayer};
pub use scene::Scene;
pub use waves::{WaveParams, Waves};
