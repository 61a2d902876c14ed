//! Frame composition shared by all tutorials.
//!
//! Every tutorial step is a [`Renderer`]: it owns its pipelines and
//! size-dependent attachments and records one frame into a command encoder.
//! The passes that rasterize the scene describe how the submeshes are
//! submitted with [`SceneDraw`]: CPU-issued draws or the commands a compute
//! kernel generated.
//!
//! # Key types
//!
//! - [`Renderer`] is the per-technique frame recorder
//! - [`SceneDraw`] selects direct or indirect submission inside a pass
//! - [`labelled_pass`] wraps a render pass in a debug group

use instant::Instant;

use crate::{
    context::Context,
    data_structures::{model::DrawModel, scene::Scene},
    pipelines::indirect::DrawCommands,
};

/// One tutorial technique.
pub trait Renderer {
    fn label(&self) -> &'static str;

    /// Recreate everything that depends on the target size.
    fn resize(&mut self, ctx: &Context, size: [u32; 2]) -> anyhow::Result<()>;

    /// Advance animation state and upload this frame's uniforms.
    fn update(&mut self, ctx: &Context, now: Instant);

    /// Record the frame into `encoder`, ending with `target` fully written.
    fn render(&mut self, ctx: &Context, target: &wgpu::TextureView, encoder: &mut wgpu::CommandEncoder);

    fn scene_mut(&mut self) -> Option<&mut Scene> {
        None
    }
}

/// How the scene's submeshes are submitted inside a render pass.
#[derive(Clone, Copy)]
pub enum SceneDraw<'a> {
    /// One `draw_indexed` per submesh from the CPU.
    Direct,
    /// One `draw_indexed_indirect` per submesh from a kernel-written buffer.
    Indirect(&'a DrawCommands),
}

impl<'a> SceneDraw<'a> {
    /// The scene's bind groups must already be set, see [`bind_scene_groups`].
    pub fn draw(self, render_pass: &mut wgpu::RenderPass<'_>, scene: &Scene) {
        match self {
            SceneDraw::Direct => {
                for mesh in &scene.meshes {
                    render_pass.draw_mesh(mesh);
                }
            }
            SceneDraw::Indirect(commands) => commands.draw(render_pass, scene),
        }
    }
}

/// Run `record` inside a labelled debug group so captures show the pass structure.
pub fn labelled_pass<F>(encoder: &mut wgpu::CommandEncoder, label: &str, record: F)
where
    F: FnOnce(&mut wgpu::CommandEncoder),
{
    encoder.push_debug_group(label);
    record(encoder);
    encoder.pop_debug_group();
}

pub fn clear_color_attachment(
    view: &wgpu::TextureView,
    clear_color: wgpu::Color,
) -> Option<wgpu::RenderPassColorAttachment<'_>> {
    Some(wgpu::RenderPassColorAttachment {
        view,
        resolve_target: None,
        depth_slice: None,
        ops: wgpu::Operations {
            load: wgpu::LoadOp::Clear(clear_color),
            store: wgpu::StoreOp::Store,
        },
    })
}

pub fn clear_depth_attachment(view: &wgpu::TextureView) -> Option<wgpu::RenderPassDepthStencilAttachment<'_>> {
    Some(wgpu::RenderPassDepthStencilAttachment {
        view,
        depth_ops: Some(wgpu::Operations {
            load: wgpu::LoadOp::Clear(1.0),
            store: wgpu::StoreOp::Store,
        }),
        stencil_ops: None,
    })
}

/// Bind the frame uniforms, the per-draw arrays and optionally the texture
/// heap. Draws select their slot through the instance index, so these stay
/// bound for the whole pass.
pub fn bind_scene_groups(render_pass: &mut wgpu::RenderPass<'_>, scene: &Scene, with_heap: bool) {
    render_pass.set_bind_group(0, &scene.uniforms.frame_bind_group, &[]);
    render_pass.set_bind_group(1, &scene.uniforms.draw_bind_group, &[]);
    if with_heap {
        render_pass.set_bind_group(2, &scene.heap.bind_group, &[]);
    }
}

pub fn log_frame(label: &str, scene: &Scene) {
    log::debug!(
        "{label}: {} draws, angle {:?}",
        scene.draw_count(),
        scene.clock.angle()
    );
}
