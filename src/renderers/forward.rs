use instant::Instant;

use crate::{
    context::Context,
    data_structures::scene::Scene,
    pipelines::scene::mk_forward_pipeline,
    render::{
        Renderer, SceneDraw, bind_scene_groups, clear_color_attachment, clear_depth_attachment,
        labelled_pass, log_frame,
    },
    renderers::passes::scene_layouts,
};

/// Lights every fragment as it is rasterized, depth tested against the
/// context's depth buffer.
pub struct ForwardRenderer {
    scene: Scene,
    pipeline: wgpu::RenderPipeline,
}

impl ForwardRenderer {
    pub fn new(ctx: &Context, scene: Scene) -> Self {
        let pipeline = mk_forward_pipeline(&ctx.device, &scene_layouts(&scene), ctx.format());
        Self { scene, pipeline }
    }
}

impl Renderer for ForwardRenderer {
    fn label(&self) -> &'static str {
        "forward"
    }

    // the depth buffer lives in the context and follows its size
    fn resize(&mut self, _ctx: &Context, _size: [u32; 2]) -> anyhow::Result<()> {
        Ok(())
    }

    fn update(&mut self, ctx: &Context, now: Instant) {
        self.scene.update(&ctx.queue, ctx.size(), now);
        log_frame(self.label(), &self.scene);
    }

    fn render(&mut self, ctx: &Context, target: &wgpu::TextureView, encoder: &mut wgpu::CommandEncoder) {
        labelled_pass(encoder, "forward", |encoder| {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Forward Pass"),
                color_attachments: &[clear_color_attachment(target, ctx.clear_color)],
                depth_stencil_attachment: clear_depth_attachment(&ctx.depth_texture.view),
                ..Default::default()
            });
            pass.set_pipeline(&self.pipeline);
            bind_scene_groups(&mut pass, &self.scene, true);
            SceneDraw::Direct.draw(&mut pass, &self.scene);
        });
    }

    fn scene_mut(&mut self) -> Option<&mut Scene> {
        Some(&mut self.scene)
    }
}
