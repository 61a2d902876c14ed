use wgpu::util::DeviceExt;

use crate::{
    data_structures::texture::Texture,
    pipelines::{
        COMMON_WGSL,
        basic::{mk_compute_pipeline, mk_layout, mk_shader},
    },
};

/// Edge length of a lighting tile; matches `@workgroup_size` in `tiled.wgsl`.
pub const TILE_SIZE: u32 = 16;

/// Format of the compute output that is blitted to the target afterwards.
/// Linear colour is only quantized once, by the sRGB target.
pub const LIT_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TileParams {
    pub clear_color: [f32; 4],
}

impl From<wgpu::Color> for TileParams {
    fn from(c: wgpu::Color) -> Self {
        Self {
            clear_color: [c.r as f32, c.g as f32, c.b as f32, c.a as f32],
        }
    }
}

/// Workgroups needed to cover `size` with tiles.
pub fn tile_count(size: [u32; 2]) -> [u32; 2] {
    [size[0].div_ceil(TILE_SIZE), size[1].div_ceil(TILE_SIZE)]
}

pub struct TilePipeline {
    pub pipeline: wgpu::ComputePipeline,
    pub output_layout: wgpu::BindGroupLayout,
    pub params: wgpu::Buffer,
}

impl TilePipeline {
    pub fn new(
        device: &wgpu::Device,
        frame_layout: &wgpu::BindGroupLayout,
        gbuffer_layout: &wgpu::BindGroupLayout,
        clear_color: wgpu::Color,
    ) -> Self {
        let output_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::StorageTexture {
                        access: wgpu::StorageTextureAccess::WriteOnly,
                        format: LIT_FORMAT,
                        view_dimension: wgpu::TextureViewDimension::D2,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
            label: Some("tile_output_bind_group_layout"),
        });
        let params = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Tile Params"),
            contents: bytemuck::cast_slice(&[TileParams::from(clear_color)]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let shader = mk_shader(
            device,
            "Tile Lighting Shader",
            &[COMMON_WGSL, include_str!("shaders/tiled.wgsl")],
        );
        let pipeline = mk_compute_pipeline(
            device,
            "Tile Lighting Pipeline",
            &mk_layout(
                device,
                "Tile Lighting Pipeline Layout",
                &[frame_layout, gbuffer_layout, &output_layout],
            ),
            &shader,
            "tile_lighting",
        );
        Self {
            pipeline,
            output_layout,
            params,
        }
    }

    pub fn output_bind_group(&self, device: &wgpu::Device, output: &Texture) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &self.output_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&output.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: self.params.as_entire_binding(),
                },
            ],
            label: Some("tile_output_bind_group"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_tiles_get_their_own_workgroup() {
        assert_eq!(tile_count([800, 600]), [50, 38]);
        assert_eq!(tile_count([16, 16]), [1, 1]);
        assert_eq!(tile_count([17, 1]), [2, 1]);
    }

    #[test]
    fn clear_color_is_passed_through() {
        let params = TileParams::from(wgpu::Color {
            r: 0.25,
            g: 0.5,
            b: 0.75,
            a: 1.0,
        });
        assert_eq!(params.clear_color, [0.25, 0.5, 0.75, 1.0]);
    }

    #[test]
    fn lit_output_is_a_float_storage_target() {
        assert_eq!(LIT_FORMAT.block_copy_size(None), Some(8));
        assert!(!LIT_FORMAT.is_srgb());
        let features = LIT_FORMAT.guaranteed_format_features(wgpu::Features::empty());
        assert!(features.allowed_usages.contains(wgpu::TextureUsages::STORAGE_BINDING));
    }
}
