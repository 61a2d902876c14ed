use instant::Instant;

use crate::{
    context::Context,
    data_structures::{scene::Scene, texture::Texture},
    pipelines::{
        deferred::BlitPipeline,
        tiled::{LIT_FORMAT, TilePipeline, tile_count},
    },
    render::{Renderer, SceneDraw, clear_color_attachment, labelled_pass, log_frame},
    renderers::passes::{GBufferPass, ShadowPass},
};

/// Shadowed G-buffer lit by a compute pass over 16x16 tiles, then copied to
/// the target.
pub struct TiledDeferredRenderer {
    scene: Scene,
    shadow: ShadowPass,
    gbuffer: GBufferPass,
    tiles: TilePipeline,
    lit: Texture,
    output_bind_group: wgpu::BindGroup,
    blit: BlitPipeline,
    blit_bind_group: wgpu::BindGroup,
    size: [u32; 2],
}

impl TiledDeferredRenderer {
    pub fn new(ctx: &Context, scene: Scene) -> anyhow::Result<Self> {
        let size = ctx.size();
        let shadow = ShadowPass::new(&ctx.device, &scene, size)?;
        let gbuffer = GBufferPass::new(&ctx.device, &scene, size, Some(&shadow.layout));
        let tiles = TilePipeline::new(
            &ctx.device,
            &scene.uniforms.frame_layout,
            &gbuffer.read_layout,
            ctx.clear_color,
        );
        let blit = BlitPipeline::new(&ctx.device, ctx.format());
        let lit = Texture::create_storage_target(&ctx.device, size, LIT_FORMAT, "tile lit output");
        let output_bind_group = tiles.output_bind_group(&ctx.device, &lit);
        let blit_bind_group = blit.bind_group(&ctx.device, &lit);
        Ok(Self {
            scene,
            shadow,
            gbuffer,
            tiles,
            lit,
            output_bind_group,
            blit,
            blit_bind_group,
            size,
        })
    }
}

impl Renderer for TiledDeferredRenderer {
    fn label(&self) -> &'static str {
        "tiled deferred"
    }

    fn resize(&mut self, ctx: &Context, size: [u32; 2]) -> anyhow::Result<()> {
        self.shadow.resize(&ctx.device, size)?;
        self.gbuffer.resize(&ctx.device, size);
        self.lit = Texture::create_storage_target(&ctx.device, size, LIT_FORMAT, "tile lit output");
        self.output_bind_group = self.tiles.output_bind_group(&ctx.device, &self.lit);
        self.blit_bind_group = self.blit.bind_group(&ctx.device, &self.lit);
        self.size = size;
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
        labelled_pass(encoder, "tile lighting", |encoder| {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Tile Lighting Pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.tiles.pipeline);
            pass.set_bind_group(0, &self.scene.uniforms.frame_bind_group, &[]);
            pass.set_bind_group(1, &self.gbuffer.gbuffer.read_bind_group, &[]);
            pass.set_bind_group(2, &self.output_bind_group, &[]);
            let [x, y] = tile_count(self.size);
            pass.dispatch_workgroups(x, y, 1);
        });
        labelled_pass(encoder, "blit", |encoder| {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Blit Pass"),
                color_attachments: &[clear_color_attachment(target, ctx.clear_color)],
                depth_stencil_attachment: None,
                ..Default::default()
            });
            pass.set_pipeline(&self.blit.pipeline);
            pass.set_bind_group(0, &self.blit_bind_group, &[]);
            pass.draw(0..3, 0..1);
        });
    }

    fn scene_mut(&mut self) -> Option<&mut Scene> {
        Some(&mut self.scene)
    }
}
