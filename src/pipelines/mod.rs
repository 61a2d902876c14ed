//! Render and compute pipelines for every tutorial step.
//!
//! WGSL has no includes, so the shared shader chunks are concatenated in
//! front of each pass's own source (see [`basic::mk_shader`]).

pub mod basic;
pub mod deferred;
pub mod indirect;
pub mod scene;
pub mod tiled;
pub mod triangle;

/// Uniform layouts and the lighting model.
pub const COMMON_WGSL: &str = include_str!("shaders/common.wgsl");
/// Scene bindings, vertex stages and material sampling.
pub const SCENE_WGSL: &str = include_str!("shaders/scene.wgsl");
pub const FULLSCREEN_WGSL: &str = include_str!("shaders/fullscreen.wgsl");
