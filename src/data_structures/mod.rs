//! Scene data: geometry, materials, textures and per-frame uniforms.
//!
//! - `bbox` is the axis-aligned bounding box used for framing and culling
//! - `instance` composes the per-draw model transforms
//! - `model` contains vertex, mesh and material definitions and their GPU buffers
//! - `scene` ties a loaded asset to its GPU resources, camera and light
//! - `texture` holds GPU texture wrappers and the texture heap
//! - `uniforms` builds and uploads the per-frame uniform slots

pub mod bbox;
pub mod instance;
pub mod model;
pub mod scene;
pub mod texture;
pub mod uniforms;
