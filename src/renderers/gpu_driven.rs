use anyhow::bail;
use instant::Instant;

use crate::{
    context::Context,
    data_structures::scene::Scene,
    pipelines::indirect::{DrawCommands, DrawKernel, PassKind},
    render::{Renderer, SceneDraw, labelled_pass, log_frame},
    renderers::passes::{CompositionPass, GBufferPass, ShadowPass},
};

/// Shadowed deferred shading whose draw calls are written by a compute
/// kernel. The CPU only binds the combined buffers and replays one indirect
/// draw per submesh; culled submeshes carry an instance count of zero.
pub struct GpuDrivenRenderer {
    scene: Scene,
    kernel: DrawKernel,
    shadow_draws: DrawCommands,
    camera_draws: DrawCommands,
    shadow: ShadowPass,
    gbuffer: GBufferPass,
    composition: CompositionPass,
}

impl GpuDrivenRenderer {
    pub fn new(ctx: &Context, scene: Scene) -> anyhow::Result<Self> {
        // the kernel hands each draw its slot through first_instance
        if !ctx
            .device
            .features()
            .contains(wgpu::Features::INDIRECT_FIRST_INSTANCE)
        {
            bail!("the gpu-driven renderer needs INDIRECT_FIRST_INSTANCE");
        }
        let kernel = DrawKernel::new(&ctx.device);
        let shadow_draws = DrawCommands::new(&ctx.device, &kernel, &scene, PassKind::Shadow);
        let camera_draws = DrawCommands::new(&ctx.device, &kernel, &scene, PassKind::Camera);
        let shadow = ShadowPass::new(&ctx.device, &scene, ctx.size())?;
        let gbuffer = GBufferPass::new(&ctx.device, &scene, ctx.size(), Some(&shadow.layout));
        let composition = CompositionPass::new(&ctx.device, &scene, &gbuffer.read_layout, ctx.format());
        log::info!("gpu-driven renderer: {} indirect draws per pass", camera_draws.count);
        Ok(Self {
            scene,
            kernel,
            shadow_draws,
            camera_draws,
            shadow,
            gbuffer,
            composition,
        })
    }
}

impl Renderer for GpuDrivenRenderer {
    fn label(&self) -> &'static str {
        "gpu-driven"
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
        labelled_pass(encoder, "encode draws", |encoder| {
            self.shadow_draws.encode(encoder, &self.kernel);
            self.camera_draws.encode(encoder, &self.kernel);
        });
        labelled_pass(encoder, "shadow", |encoder| {
            self.shadow
                .record(encoder, &self.scene, SceneDraw::Indirect(&self.shadow_draws));
        });
        labelled_pass(encoder, "gbuffer", |encoder| {
            self.gbuffer.record(
                encoder,
                &self.scene,
                SceneDraw::Indirect(&self.camera_draws),
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
