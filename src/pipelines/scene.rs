//! Pipelines that rasterize the scene's submeshes: forward shading, the
//! G-buffer fill and the shadow depth pass. They share `scene.wgsl`, the
//! vertex layout and bind groups 0-2 (frame, per-draw arrays, texture heap).

use crate::{
    camera::SHADOW_BIAS,
    data_structures::{
        model::{ModelVertex, Vertex},
        texture::Texture,
    },
    pipelines::{
        COMMON_WGSL, SCENE_WGSL,
        basic::{PipelineTargets, color_target, depth_state, mk_layout, mk_render_pipeline, mk_shader},
    },
};

pub const ALBEDO_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
pub const NORMAL_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
pub const POSITION_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

/// The bind group layouts every scene pipeline starts with.
pub struct SceneLayouts<'a> {
    pub frame: &'a wgpu::BindGroupLayout,
    pub draw: &'a wgpu::BindGroupLayout,
    pub heap: &'a wgpu::BindGroupLayout,
}

pub fn mk_forward_pipeline(
    device: &wgpu::Device,
    layouts: &SceneLayouts,
    format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let shader = mk_shader(
        device,
        "Forward Shader",
        &[COMMON_WGSL, SCENE_WGSL, include_str!("shaders/forward.wgsl")],
    );
    mk_render_pipeline(
        device,
        "Forward Pipeline",
        &mk_layout(device, "Forward Pipeline Layout", &[layouts.frame, layouts.draw, layouts.heap]),
        &shader,
        "vs_main",
        "fs_main",
        &[ModelVertex::desc()],
        PipelineTargets {
            targets: &[color_target(format)],
            depth: depth_state(wgpu::DepthBiasState::default()),
        },
        None,
    )
}

/// With `shadow_layout` the pipeline samples the shadow map (group 3) and
/// stores the visibility in the normal target's alpha; without it every
/// pixel is fully lit.
pub fn mk_gbuffer_pipeline(
    device: &wgpu::Device,
    layouts: &SceneLayouts,
    shadow_layout: Option<&wgpu::BindGroupLayout>,
) -> wgpu::RenderPipeline {
    let shader = mk_shader(
        device,
        "GBuffer Shader",
        &[
            COMMON_WGSL,
            SCENE_WGSL,
            &shadow_bias_wgsl(),
            include_str!("shaders/gbuffer.wgsl"),
        ],
    );
    let mut groups = vec![layouts.frame, layouts.draw, layouts.heap];
    groups.extend(shadow_layout);
    let fs_entry = if shadow_layout.is_some() {
        "fs_shadowed"
    } else {
        "fs_main"
    };
    mk_render_pipeline(
        device,
        "GBuffer Pipeline",
        &mk_layout(device, "GBuffer Pipeline Layout", &groups),
        &shader,
        "vs_main",
        fs_entry,
        &[ModelVertex::desc()],
        PipelineTargets {
            targets: &[
                color_target(ALBEDO_FORMAT),
                color_target(NORMAL_FORMAT),
                color_target(POSITION_FORMAT),
            ],
            depth: depth_state(wgpu::DepthBiasState::default()),
        },
        None,
    )
}

fn shadow_bias_wgsl() -> String {
    format!("const SHADOW_BIAS: f32 = {SHADOW_BIAS:.8};")
}

pub fn mk_shadow_pipeline(device: &wgpu::Device, layouts: &SceneLayouts) -> wgpu::RenderPipeline {
    let shader = mk_shader(device, "Shadow Shader", &[COMMON_WGSL, SCENE_WGSL]);
    mk_render_pipeline(
        device,
        "Shadow Pipeline",
        &mk_layout(device, "Shadow Pipeline Layout", &[layouts.frame, layouts.draw]),
        &shader,
        "vs_shadow",
        "",
        &[ModelVertex::desc()],
        PipelineTargets {
            targets: &[],
            depth: depth_state(wgpu::DepthBiasState {
                constant: 2,
                slope_scale: 2.0,
                clamp: 0.0,
            }),
        },
        None,
    )
}

/// Group 3 of the shadowed G-buffer pass: shadow map and comparison sampler.
pub fn shadow_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Depth,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                count: None,
            },
        ],
        label: Some("shadow_bind_group_layout"),
    })
}

pub fn shadow_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    shadow_map: &Texture,
) -> anyhow::Result<wgpu::BindGroup> {
    let sampler = shadow_map
        .sampler
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("shadow map has no comparison sampler"))?;
    Ok(device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&shadow_map.view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
        label: Some("shadow_bind_group"),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shadow_bias_is_a_plain_wgsl_literal() {
        assert_eq!(shadow_bias_wgsl(), "const SHADOW_BIAS: f32 = 0.00001000;");
    }
}
