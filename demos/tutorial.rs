//! Run one tutorial step in a window.
//!
//! ```text
//! cargo run --example tutorial -- <technique|step> [asset]
//! cargo run --example tutorial -- deferred cube.obj
//! cargo run --example tutorial -- 6
//! ```
//!
//! Techniques: triangle, forward, deferred, shadow, tiled, gpu-driven (or
//! steps 1-6). Assets resolve relative to `assets/`; `cube` and `sphere`
//! name the built-in meshes, the cube being the default. Press `R` to toggle the rotation.

use render_steps::{RenderConfig, Technique};

fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let technique: Technique = match args.next() {
        Some(arg) => arg.parse()?,
        None => Technique::Forward,
    };
    let mut config = RenderConfig::new(technique);
    if let Some(asset) = args.next() {
        config = config.with_asset(asset);
    }
    render_steps::run(config)
}
