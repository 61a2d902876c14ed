//! render-steps
//!
//! Step-by-step GPU rendering tutorials on wgpu. Every step draws the same
//! base scene (a loaded mesh, an orbit camera and one light) and adds one
//! technique on top of the previous: a hello triangle, forward shading,
//! deferred shading, shadow mapping, tile-based deferred lighting and
//! GPU-driven rendering with compute-generated indirect draws.
//!
//! High-level modules
//! - `camera`: orbit/look-at camera, projection and light matrices
//! - `capture`: offscreen frame capture and RMS image comparison
//! - `config`: run configuration and the list of techniques
//! - `context`: device, queue and target description (windowed or headless)
//! - `data_structures`: meshes, materials, texture heap, uniforms and the scene
//! - `flow`: the winit event loop driving one renderer
//! - `pipelines`: render and compute pipelines with their WGSL sources
//! - `render`: the `Renderer` trait and helpers shared by every pass
//! - `renderers`: one renderer per tutorial step
//! - `resources`: OBJ/glTF loading, images and procedural primitives
//!

pub mod camera;
pub mod capture;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod flow;
pub mod pipelines;
pub mod render;
pub mod renderers;
pub mod resources;

// Re-exports commonly used types for convenience in downstream code.
pub use config::{RenderConfig, Technique};
pub use context::Context;
pub use flow::run;
pub use render::Renderer;
pub use renderers::{create_renderer, load_renderer};
