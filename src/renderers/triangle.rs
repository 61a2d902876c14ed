use instant::Instant;

use crate::{
    context::Context,
    pipelines::triangle::{TrianglePipeline, ViewportUniform},
    render::{Renderer, clear_color_attachment, labelled_pass},
};

/// Three coloured vertices placed in pixels, so the triangle keeps its size
/// when the window changes.
pub struct TriangleRenderer {
    pipeline: TrianglePipeline,
}

impl TriangleRenderer {
    pub fn new(ctx: &Context) -> Self {
        Self {
            pipeline: TrianglePipeline::new(&ctx.device, ctx.format(), ctx.size()),
        }
    }
}

impl Renderer for TriangleRenderer {
    fn label(&self) -> &'static str {
        "triangle"
    }

    fn resize(&mut self, ctx: &Context, size: [u32; 2]) -> anyhow::Result<()> {
        ctx.queue.write_buffer(
            &self.pipeline.viewport_buffer,
            0,
            bytemuck::cast_slice(&[ViewportUniform::new(size)]),
        );
        Ok(())
    }

    fn update(&mut self, _ctx: &Context, _now: Instant) {}

    fn render(&mut self, ctx: &Context, target: &wgpu::TextureView, encoder: &mut wgpu::CommandEncoder) {
        labelled_pass(encoder, "triangle", |encoder| {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Triangle Pass"),
                color_attachments: &[clear_color_attachment(target, ctx.clear_color)],
                depth_stencil_attachment: None,
                ..Default::default()
            });
            pass.set_pipeline(&self.pipeline.pipeline);
            pass.set_bind_group(0, &self.pipeline.bind_group, &[]);
            pass.set_vertex_buffer(0, self.pipeline.vertex_buffer.slice(..));
            pass.draw(0..3, 0..1);
        });
    }
}
