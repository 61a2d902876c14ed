#![allow(dead_code)]

use image::RgbaImage;
use instant::Instant;
use render_steps::{
    RenderConfig, Technique, capture::render_to_image, context::Context, renderers::load_renderer,
};

pub(crate) const TEST_SIZE: [u32; 2] = [160, 120];

/// A configuration that renders the same picture on every run: fixed size,
/// no rotation.
pub(crate) fn still(technique: Technique) -> RenderConfig {
    RenderConfig::new(technique)
        .with_window_size(TEST_SIZE[0], TEST_SIZE[1])
        .with_rotation(false)
}

pub(crate) fn runtime() -> tokio::runtime::Runtime {
    let _ = env_logger::builder().is_test(true).try_init();
    tokio::runtime::Runtime::new().expect("Failed to create the test runtime")
}

/// `None` when the machine has no adapter; GPU tests are skipped then.
pub(crate) async fn headless(config: &RenderConfig) -> Option<Context> {
    match Context::headless(config.window_size, config.clear_color).await {
        Ok(ctx) => Some(ctx),
        Err(e) => {
            eprintln!("skipping GPU test: {e:#}");
            None
        }
    }
}

/// The gpu-driven renderer needs indirect draws with a first instance.
pub(crate) fn supported(ctx: &Context, config: &RenderConfig) -> bool {
    config.technique != Technique::GpuDriven
        || ctx
            .device
            .features()
            .contains(wgpu::Features::INDIRECT_FIRST_INSTANCE)
}

pub(crate) async fn capture_with(ctx: &Context, config: &RenderConfig) -> RgbaImage {
    let mut renderer = load_renderer(ctx, config)
        .await
        .expect("Failed to build the renderer");
    render_to_image(ctx, renderer.as_mut(), Instant::now())
        .await
        .expect("Failed to capture a frame")
}

pub(crate) fn f_to_u8(v: f64) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Capture one frame of each configuration with a fresh renderer on a shared
/// headless context, then hand the images to the assertions.
macro_rules! capture_test {
    ([$($config:expr),+ $(,)?], $validate:expr) => {{
        let configs = vec![$($config),+];
        let runtime = $crate::common::test_utils::runtime();
        runtime.block_on(async move {
            let Some(ctx) = $crate::common::test_utils::headless(&configs[0]).await else {
                return;
            };
            if !configs
                .iter()
                .all(|config| $crate::common::test_utils::supported(&ctx, config))
            {
                eprintln!("skipping GPU test: the adapter lacks INDIRECT_FIRST_INSTANCE");
                return;
            }
            let mut images = Vec::with_capacity(configs.len());
            for config in &configs {
                images.push($crate::common::test_utils::capture_with(&ctx, config).await);
            }
            ($validate)(images);
        });
    }};
}
