//! One [`Renderer`] per tutorial step.
//!
//! Steps 3 to 6 are built from the same pass components in [`passes`]; they
//! differ in which passes run and whether draws come from the CPU or from
//! the draw kernel.

pub mod deferred;
pub mod forward;
pub mod gpu_driven;
pub mod passes;
pub mod tiled;
pub mod triangle;

use anyhow::bail;

pub use deferred::{DeferredRenderer, ShadowDeferredRenderer};
pub use forward::ForwardRenderer;
pub use gpu_driven::GpuDrivenRenderer;
pub use tiled::TiledDeferredRenderer;
pub use triangle::TriangleRenderer;

use crate::{
    config::{RenderConfig, Technique},
    context::Context,
    data_structures::scene::Scene,
    render::Renderer,
    resources,
};

/// Build the renderer for `config.technique`. Every step but the triangle
/// needs an uploaded scene.
pub fn create_renderer(
    ctx: &Context,
    config: &RenderConfig,
    scene: Option<Scene>,
) -> anyhow::Result<Box<dyn Renderer>> {
    let technique = config.technique;
    let renderer: Box<dyn Renderer> = match (technique, scene) {
        (Technique::Triangle, _) => Box::new(TriangleRenderer::new(ctx)),
        (_, None) => bail!("the {technique} renderer needs a scene"),
        (Technique::Forward, Some(scene)) => Box::new(ForwardRenderer::new(ctx, scene)),
        (Technique::Deferred, Some(scene)) => Box::new(DeferredRenderer::new(ctx, scene)),
        (Technique::ShadowDeferred, Some(scene)) => Box::new(ShadowDeferredRenderer::new(ctx, scene)?),
        (Technique::TiledDeferred, Some(scene)) => Box::new(TiledDeferredRenderer::new(ctx, scene)?),
        (Technique::GpuDriven, Some(scene)) => Box::new(GpuDrivenRenderer::new(ctx, scene)?),
    };
    log::info!("renderer ready: {}", renderer.label());
    Ok(renderer)
}

/// Load the configured asset, upload it and build the renderer.
pub async fn load_renderer(ctx: &Context, config: &RenderConfig) -> anyhow::Result<Box<dyn Renderer>> {
    let scene = if config.technique.loads_scene() {
        let data = resources::load_scene_for(config).await?;
        Some(Scene::upload(&ctx.device, &ctx.queue, &data, config)?)
    } else {
        None
    };
    create_renderer(ctx, config, scene)
}
