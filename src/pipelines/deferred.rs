//! G-buffer attachments and the full-screen passes that read them.

use crate::{
    data_structures::texture::Texture,
    pipelines::{
        COMMON_WGSL, FULLSCREEN_WGSL,
        basic::{
            PipelineTargets, color_target, load_textures_layout, mk_layout, mk_render_pipeline,
            mk_shader, texture_bind_group,
        },
        scene::{ALBEDO_FORMAT, NORMAL_FORMAT, POSITION_FORMAT},
    },
};

/// Albedo + specular, normal + shadow visibility, view position + shininess
/// and the depth buffer of the G-buffer pass. Recreated on resize.
pub struct GBuffer {
    pub albedo: Texture,
    pub normal: Texture,
    pub position: Texture,
    pub depth: Texture,
    pub read_bind_group: wgpu::BindGroup,
}

impl GBuffer {
    pub fn new(device: &wgpu::Device, size: [u32; 2], read_layout: &wgpu::BindGroupLayout) -> Self {
        let albedo = Texture::create_render_target(device, size, ALBEDO_FORMAT, "gbuffer albedo");
        let normal = Texture::create_render_target(device, size, NORMAL_FORMAT, "gbuffer normal");
        let position =
            Texture::create_render_target(device, size, POSITION_FORMAT, "gbuffer position");
        let depth = Texture::create_depth_texture(device, size, "gbuffer depth");
        let read_bind_group = texture_bind_group(
            device,
            "gbuffer_read_bind_group",
            read_layout,
            &[&albedo.view, &normal.view, &position.view],
        );
        log::debug!("gbuffer created at {}x{}", size[0], size[1]);
        Self {
            albedo,
            normal,
            position,
            depth,
            read_bind_group,
        }
    }

    /// Cleared to zero, so an untouched pixel has shininess 0 and counts as background.
    pub fn color_attachments(&self) -> [Option<wgpu::RenderPassColorAttachment<'_>>; 3] {
        [&self.albedo, &self.normal, &self.position].map(|target| {
            Some(wgpu::RenderPassColorAttachment {
                view: &target.view,
                resolve_target: None,
                depth_slice: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                    store: wgpu::StoreOp::Store,
                },
            })
        })
    }
}

/// The three G-buffer colour targets, readable from fragment and compute.
pub fn gbuffer_read_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    load_textures_layout(
        device,
        "gbuffer_read_bind_group_layout",
        3,
        wgpu::ShaderStages::FRAGMENT | wgpu::ShaderStages::COMPUTE,
    )
}

pub fn mk_compose_pipeline(
    device: &wgpu::Device,
    frame_layout: &wgpu::BindGroupLayout,
    read_layout: &wgpu::BindGroupLayout,
    format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let shader = mk_shader(
        device,
        "Composition Shader",
        &[COMMON_WGSL, FULLSCREEN_WGSL, include_str!("shaders/compose.wgsl")],
    );
    mk_render_pipeline(
        device,
        "Composition Pipeline",
        &mk_layout(device, "Composition Pipeline Layout", &[frame_layout, read_layout]),
        &shader,
        "vs_fullscreen",
        "fs_main",
        &[],
        PipelineTargets {
            targets: &[color_target(format)],
            depth: None,
        },
        None,
    )
}

pub struct BlitPipeline {
    pub pipeline: wgpu::RenderPipeline,
    pub layout: wgpu::BindGroupLayout,
}

impl BlitPipeline {
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat) -> Self {
        let layout = load_textures_layout(
            device,
            "blit_bind_group_layout",
            1,
            wgpu::ShaderStages::FRAGMENT,
        );
        let shader = mk_shader(
            device,
            "Blit Shader",
            &[FULLSCREEN_WGSL, include_str!("shaders/blit.wgsl")],
        );
        let pipeline = mk_render_pipeline(
            device,
            "Blit Pipeline",
            &mk_layout(device, "Blit Pipeline Layout", &[&layout]),
            &shader,
            "vs_fullscreen",
            "fs_blit",
            &[],
            PipelineTargets {
                targets: &[color_target(format)],
                depth: None,
            },
            None,
        );
        Self { pipeline, layout }
    }

    pub fn bind_group(&self, device: &wgpu::Device, source: &Texture) -> wgpu::BindGroup {
        texture_bind_group(device, "blit_bind_group", &self.layout, &[&source.view])
    }
}
