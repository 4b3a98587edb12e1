//! Shader-facing resource definitions.
//!
//! This crate defines the data the frame pipeline uploads:
//! - Packed constant layouts (object, material, pass, light)
//! - Material definitions

pub mod material;
pub mod ubo;

pub use material::Material;
pub use ubo::{Light, MAX_LIGHTS, MaterialConstants, ObjectConstants, PassConstants};
