use wgpu::util::DeviceExt;

use crate::{
    data_structures::model::Vertex,
    pipelines::basic::{PipelineTargets, color_target, mk_layout, mk_render_pipeline, mk_shader},
};

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TriangleVertex {
    /// Pixels from the viewport center.
    pub position: [f32; 2],
    pub color: [f32; 4],
}

impl Vertex for TriangleVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
            wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x4];
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<TriangleVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &ATTRIBUTES,
        }
    }
}

pub const TRIANGLE: [TriangleVertex; 3] = [
    TriangleVertex {
        position: [250.0, -250.0],
        color: [1.0, 0.0, 0.0, 1.0],
    },
    TriangleVertex {
        position: [-250.0, -250.0],
        color: [0.0, 1.0, 0.0, 1.0],
    },
    TriangleVertex {
        position: [0.0, 250.0],
        color: [0.0, 0.0, 1.0, 1.0],
    },
];

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ViewportUniform {
    pub size: [u32; 2],
    _padding: [u32; 2],
}

impl ViewportUniform {
    pub fn new(size: [u32; 2]) -> Self {
        Self {
            size,
            _padding: [0; 2],
        }
    }
}

pub struct TrianglePipeline {
    pub pipeline: wgpu::RenderPipeline,
    pub vertex_buffer: wgpu::Buffer,
    pub viewport_buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

impl TrianglePipeline {
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat, size: [u32; 2]) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Triangle Vertex Buffer"),
            contents: bytemuck::cast_slice(&TRIANGLE),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let viewport_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Viewport Buffer"),
            contents: bytemuck::cast_slice(&[ViewportUniform::new(size)]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
            label: Some("viewport_bind_group_layout"),
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: viewport_buffer.as_entire_binding(),
            }],
            label: Some("viewport_bind_group"),
        });

        let shader = mk_shader(device, "Triangle Shader", &[include_str!("shaders/triangle.wgsl")]);
        let pipeline = mk_render_pipeline(
            device,
            "Triangle Pipeline",
            &mk_layout(device, "Triangle Pipeline Layout", &[&layout]),
            &shader,
            "vs_main",
            "fs_main",
            &[TriangleVertex::desc()],
            PipelineTargets {
                targets: &[color_target(format)],
                depth: None,
            },
            None,
        );

        Self {
            pipeline,
            vertex_buffer,
            viewport_buffer,
            bind_group,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triangle_layouts() {
        assert_eq!(std::mem::size_of::<TriangleVertex>(), 24);
        assert_eq!(std::mem::size_of::<ViewportUniform>(), 16);
        assert_eq!(TriangleVertex::desc().attributes[1].offset, 8);
    }
}
