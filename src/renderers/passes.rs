//! Passes shared by the deferred tutorials: shadow depth, G-buffer fill and
//! full-screen composition. Each owns its pipeline and the attachments it
//! writes, and records itself into a caller-provided encoder.

use crate::{
    data_structures::{scene::Scene, texture::Texture},
    pipelines::{
        deferred::{GBuffer, gbuffer_read_layout, mk_compose_pipeline},
        scene::{SceneLayouts, mk_gbuffer_pipeline, mk_shadow_pipeline, shadow_bind_group, shadow_layout},
    },
    render::{SceneDraw, bind_scene_groups, clear_color_attachment, clear_depth_attachment},
};

pub fn scene_layouts(scene: &Scene) -> SceneLayouts<'_> {
    SceneLayouts {
        frame: &scene.uniforms.frame_layout,
        draw: &scene.uniforms.draw_layout,
        heap: &scene.heap.layout,
    }
}

/// Depth from the light's point of view. The map has the viewport's size.
pub struct ShadowPass {
    pipeline: wgpu::RenderPipeline,
    pub layout: wgpu::BindGroupLayout,
    pub map: Texture,
    pub bind_group: wgpu::BindGroup,
}

impl ShadowPass {
    pub fn new(device: &wgpu::Device, scene: &Scene, size: [u32; 2]) -> anyhow::Result<Self> {
        let pipeline = mk_shadow_pipeline(device, &scene_layouts(scene));
        let layout = shadow_layout(device);
        let map = Texture::create_depth_texture(device, size, "shadow map");
        let bind_group = shadow_bind_group(device, &layout, &map)?;
        Ok(Self {
            pipeline,
            layout,
            map,
            bind_group,
        })
    }

    pub fn resize(&mut self, device: &wgpu::Device, size: [u32; 2]) -> anyhow::Result<()> {
        self.map = Texture::create_depth_texture(device, size, "shadow map");
        self.bind_group = shadow_bind_group(device, &self.layout, &self.map)?;
        Ok(())
    }

    pub fn record(&self, encoder: &mut wgpu::CommandEncoder, scene: &Scene, draw: SceneDraw) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Shadow Pass"),
            color_attachments: &[],
            depth_stencil_attachment: clear_depth_attachment(&self.map.view),
            ..Default::default()
        });
        pass.set_pipeline(&self.pipeline);
        bind_scene_groups(&mut pass, scene, false);
        draw.draw(&mut pass, scene);
    }
}

pub struct GBufferPass {
    pipeline: wgpu::RenderPipeline,
    pub read_layout: wgpu::BindGroupLayout,
    pub gbuffer: GBuffer,
}

impl GBufferPass {
    /// With `shadow_layout` the pass expects the shadow map bound at group 3.
    pub fn new(
        device: &wgpu::Device,
        scene: &Scene,
        size: [u32; 2],
        shadow_layout: Option<&wgpu::BindGroupLayout>,
    ) -> Self {
        let pipeline = mk_gbuffer_pipeline(device, &scene_layouts(scene), shadow_layout);
        let read_layout = gbuffer_read_layout(device);
        let gbuffer = GBuffer::new(device, size, &read_layout);
        Self {
            pipeline,
            read_layout,
            gbuffer,
        }
    }

    pub fn resize(&mut self, device: &wgpu::Device, size: [u32; 2]) {
        self.gbuffer = GBuffer::new(device, size, &self.read_layout);
    }

    pub fn record(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        scene: &Scene,
        draw: SceneDraw,
        shadow: Option<&wgpu::BindGroup>,
    ) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("GBuffer Pass"),
            color_attachments: &self.gbuffer.color_attachments(),
            depth_stencil_attachment: clear_depth_attachment(&self.gbuffer.depth.view),
            ..Default::default()
        });
        pass.set_pipeline(&self.pipeline);
        bind_scene_groups(&mut pass, scene, true);
        if let Some(shadow) = shadow {
            pass.set_bind_group(3, shadow, &[]);
        }
        draw.draw(&mut pass, scene);
    }
}

/// Lights every covered G-buffer pixel; the rest keeps the clear colour.
pub struct CompositionPass {
    pipeline: wgpu::RenderPipeline,
}

impl CompositionPass {
    pub fn new(
        device: &wgpu::Device,
        scene: &Scene,
        read_layout: &wgpu::BindGroupLayout,
        format: wgpu::TextureFormat,
    ) -> Self {
        Self {
            pipeline: mk_compose_pipeline(device, &scene.uniforms.frame_layout, read_layout, format),
        }
    }

    pub fn record(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        clear_color: wgpu::Color,
        scene: &Scene,
        gbuffer: &GBuffer,
    ) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Composition Pass"),
            color_attachments: &[clear_color_attachment(target, clear_color)],
            depth_stencil_attachment: None,
            ..Default::default()
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &scene.uniforms.frame_bind_group, &[]);
        pass.set_bind_group(1, &gbuffer.read_bind_group, &[]);
        pass.draw(0..3, 0..1);
    }
}
