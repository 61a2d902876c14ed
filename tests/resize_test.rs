#![cfg(feature = "integration-tests")]

mod common;

use common::test_utils::{headless, runtime, still, supported};
use instant::Instant;
use render_steps::{Technique, capture::render_to_image, renderers::load_renderer};

#[test]
fn every_technique_follows_a_resize() {
    runtime().block_on(async {
        let config = still(Technique::Forward);
        let Some(mut ctx) = headless(&config).await else {
            return;
        };
        for technique in Technique::ALL {
            let config = still(technique);
            if !supported(&ctx, &config) {
                continue;
            }
            let mut renderer = load_renderer(&ctx, &config)
                .await
                .expect("Failed to build the renderer");
            assert!(ctx.resize(96, 64));
            renderer
                .resize(&ctx, ctx.size())
                .expect("Failed to resize the renderer");
            let image = render_to_image(&ctx, renderer.as_mut(), Instant::now())
                .await
                .expect("Failed to capture a frame");
            assert_eq!(image.dimensions(), (96, 64), "{technique}");
            assert!(ctx.resize(config.window_size[0], config.window_size[1]));
        }
        assert!(!ctx.resize(0, 10));
    });
}
