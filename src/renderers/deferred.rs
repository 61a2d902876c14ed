use instant::Instant;

use crate::{
    context::Context,
    data_structures::scene::Scene,
    render::{Renderer, SceneDraw, labelled_pass, log_frame},
    renderers::passes::{CompositionPass, GBufferPass, ShadowPass},
};

/// G-buffer fill followed by a full-screen lighting pass.
pub struct DeferredRenderer {
    scene: Scene,
    gbuffer: GBufferPass,
    composition: CompositionPass,
}

impl DeferredRenderer {
    pub fn new(ctx: &Context, scene: Scene) -> Self {
        let gbuffer = GBufferPass::new(&ctx.device, &scene, ctx.size(), None);
        let composition = CompositionPass::new(&ctx.device, &scene, &gbuffer.read_layout, ctx.format());
        Self {
            scene,
            gbuffer,
            composition,
        }
    }
}

impl Renderer for DeferredRenderer {
    fn label(&self) -> &'static str {
        "deferred"
    }

    fn resize(&mut self, ctx: &Context, size: [u32; 2]) -> anyhow::Result<()> {
        self.gbuffer.resize(&ctx.device, size);
        Ok(())
    }

    fn update(&mut self, ctx: &Context, now: Instant) {
        self.scene.update(&ctx.queue, ctx.size(), now);
        log_frame(self.label(), &self.scene);
    }

    fn render(&mut self, ctx: &Context, target: &wgpu::TextureView, encoder: &mut wgpu::CommandEncoder) {
        labelled_pass(encoder, "gbuffer", |encoder| {
            self.gbuffer.record(encoder, &self.scene, SceneDraw::Direct, None);
        });
        labelled_pass(encoder, "composition", |encoder| {
            self.composition
                .record(encoder, target, ctx.clear_color, &self.scene, &self.gbuffer.gbuffer);
        });
    }

    fn scene_mut(&mut self) -> Option<&mut Scene> {
        Some(&mut self.scene)
    }
}

/// Deferred shading with a shadow map rendered from the light first.
pub struct ShadowDeferredRenderer {
    scene: Scene,
    shadow: ShadowPass,
    gbuffer: GBufferPass,
    composition: CompositionPass,
}

impl ShadowDeferredRenderer {
    pub fn new(ctx: &Context, scene: Scene) -> anyhow::Result<Self> {
        let shadow = ShadowPass::new(&ctx.device, &scene, ctx.size())?;
        let gbuffer = GBufferPass::new(&ctx.device, &scene, ctx.size(), Some(&shadow.layout));
        let composition = CompositionPass::new(&ctx.device, &scene, &gbuffer.read_layout, ctx.format());
        Ok(Self {
            scene,
            shadow,
            gbuffer,
            composition,
        })
    }
}

impl Renderer for ShadowDeferredRenderer {
    fn label(&self) -> &'static str {
        "shadow deferred"
    }

    fn resize(&mut self, ctx: &Context, size: [u32; 2]) -> anyhow::Result<()> {
        self.shadow.resize(&ctx.device, size)?;
        self.gbuffer.resize(&ctx.device, size);
        Ok(())
    }

    fn update(&mut self, ctx: &Context, now: Instant) {
        self.scene.update(&ctx.queue, ctx.size(), now);
        log_frame(self.label(), &self.scene);
    }

    fn render(&mut self, ctx: &Context, target: &wgpu::TextureView, encoder: &mut wgpu::CommandEncoder) {
        labelled_pass(encoder, "shadow", |encoder| {
            self.shadow.record(encoder, &self.scene, SceneDraw::Direct);
        });
        labelled_pass(encoder, "gbuffer", |encoder| {
            self.gbuffer.record(
                encoder,
                &self.scene,
                SceneDraw::Direct,
                Some(&self.shadow.bind_group),
            );
        });
        labelled_pass(encoder, "composition", |encoder| {
            self.composition
                .record(encoder, target, ctx.clear_color, &self.scene, &self.gbuffer.gbuffer);
        });
    }

    fn scene_mut(&mut self) -> Option<&mut Scene> {
        Some(&mut self.scene)
    }
}
