//! Per-frame uniform data.
//!
//! Every struct in here is uploaded verbatim, so the field order and padding
//! must match the WGSL declarations in `pipelines/common.wgsl`. Per-draw data
//! lives in two storage arrays indexed by submesh slot; draws pass the slot as
//! their first instance, so group 1 is bound once per pass.

use cgmath::{Matrix, Matrix3, Matrix4, SquareMatrix, Vector3, Vector4};
use wgpu::util::DeviceExt;

use crate::data_structures::model::MaterialParams;

/// Transforms for a single submesh. Mirrors `VertexUniforms` in WGSL.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct VertexUniforms {
    pub model_view: [[f32; 4]; 4],
    // mat3x3 columns are padded to 16 bytes in WGSL
    pub model_view_inverse_transpose: [[f32; 4]; 3],
    pub model_view_projection: [[f32; 4]; 4],
    pub shadow_model_view_projection: [[f32; 4]; 4],
}

/// Lighting inputs shared by every fragment of a frame.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FragmentUniforms {
    pub view_light_position: [f32; 4],
}

/// The matrices a frame is built from.
#[derive(Clone, Copy, Debug)]
pub struct FrameMatrices {
    pub view: Matrix4<f32>,
    pub projection: Matrix4<f32>,
    pub shadow_view: Matrix4<f32>,
    pub shadow_projection: Matrix4<f32>,
}

impl VertexUniforms {
    pub fn new(frame: &FrameMatrices, model: &Matrix4<f32>) -> Self {
        let model_view = frame.view * model;
        let shadow_model_view = frame.shadow_view * model;
        Self {
            model_view: model_view.into(),
            model_view_inverse_transpose: pad_columns(normal_matrix(&model_view)),
            model_view_projection: (frame.projection * model_view).into(),
            shadow_model_view_projection: (frame.shadow_projection * shadow_model_view).into(),
        }
    }
}

/// Inverse transpose of the upper 3x3 block, falling back to the plain block
/// for singular matrices (e.g. a zero scale).
pub fn normal_matrix(model_view: &Matrix4<f32>) -> Matrix3<f32> {
    let upper = Matrix3::from_cols(
        model_view.x.truncate(),
        model_view.y.truncate(),
        model_view.z.truncate(),
    );
    upper.transpose().invert().unwrap_or(upper)
}

fn pad_columns(m: Matrix3<f32>) -> [[f32; 4]; 3] {
    [m.x.extend(0.0).into(), m.y.extend(0.0).into(), m.z.extend(0.0).into()]
}

/// One `VertexUniforms` per instance transform, in the same order.
pub fn build_vertex_uniforms(
    frame: &FrameMatrices,
    instances: &[Matrix4<f32>],
) -> Vec<VertexUniforms> {
    instances
        .iter()
        .map(|model| VertexUniforms::new(frame, model))
        .collect()
}

pub fn build_fragment_uniforms(frame: &FrameMatrices, light: Vector3<f32>) -> FragmentUniforms {
    let view_light: Vector4<f32> = frame.view * light.extend(1.0);
    FragmentUniforms {
        view_light_position: view_light.into(),
    }
}

/// GPU side of the per-frame uniforms.
///
/// Group 0 holds the fragment uniforms, group 1 the per-draw arrays
/// (vertex uniforms and materials) indexed by slot.
#[derive(Debug)]
pub struct UniformBuffers {
    pub slot_count: u32,
    pub vertex_slots: wgpu::Buffer,
    pub material_slots: wgpu::Buffer,
    pub fragment: wgpu::Buffer,
    pub frame_layout: wgpu::BindGroupLayout,
    pub frame_bind_group: wgpu::BindGroup,
    pub draw_layout: wgpu::BindGroupLayout,
    pub draw_bind_group: wgpu::BindGroup,
}

impl UniformBuffers {
    pub fn new(device: &wgpu::Device, materials_per_slot: &[MaterialParams]) -> Self {
        let slot_count = materials_per_slot.len() as u32;
        // the draw kernel reads the same transforms for culling
        let vertex_slots = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Vertex Uniforms Array"),
            size: array_size::<VertexUniforms>(slot_count),
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        // an empty scene still needs a non-empty binding
        let material_slots = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Material Array"),
            contents: bytemuck::cast_slice(&padded(materials_per_slot)),
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
        });
        let fragment = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Fragment Uniforms"),
            size: std::mem::size_of::<FragmentUniforms>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let frame_layout = frame_layout(device);
        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &frame_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: fragment.as_entire_binding(),
            }],
            label: Some("frame_bind_group"),
        });

        let draw_layout = draw_layout(device);
        let draw_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &draw_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: vertex_slots.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: material_slots.as_entire_binding(),
                },
            ],
            label: Some("draw_bind_group"),
        });

        Self {
            slot_count,
            vertex_slots,
            material_slots,
            fragment,
            frame_layout,
            frame_bind_group,
            draw_layout,
            draw_bind_group,
        }
    }

    pub fn write(
        &self,
        queue: &wgpu::Queue,
        vertex: &[VertexUniforms],
        fragment: &FragmentUniforms,
    ) {
        if vertex.len() as u32 != self.slot_count {
            log::warn!(
                "{} vertex uniforms for {} draw slots",
                vertex.len(),
                self.slot_count
            );
        }
        let count = vertex.len().min(self.slot_count as usize);
        if count > 0 {
            queue.write_buffer(&self.vertex_slots, 0, bytemuck::cast_slice(&vertex[..count]));
        }
        queue.write_buffer(&self.fragment, 0, bytemuck::cast_slice(&[*fragment]));
    }
}

/// Byte size of a storage array of `count` elements, never zero.
pub fn array_size<T>(count: u32) -> wgpu::BufferAddress {
    count.max(1) as wgpu::BufferAddress * std::mem::size_of::<T>() as wgpu::BufferAddress
}

fn padded<T: bytemuck::Pod>(items: &[T]) -> Vec<T> {
    if items.is_empty() {
        vec![T::zeroed()]
    } else {
        items.to_vec()
    }
}

pub fn frame_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT | wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
        label: Some("frame_bind_group_layout"),
    })
}

pub fn draw_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    let read_only_array = |binding, visibility, element: usize| wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only: true },
            has_dynamic_offset: false,
            min_binding_size: wgpu::BufferSize::new(element as u64),
        },
        count: None,
    };
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            read_only_array(
                0,
                wgpu::ShaderStages::VERTEX,
                std::mem::size_of::<VertexUniforms>(),
            ),
            read_only_array(
                1,
                wgpu::ShaderStages::FRAGMENT,
                std::mem::size_of::<MaterialParams>(),
            ),
        ],
        label: Some("draw_bind_group_layout"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{Deg, Matrix4, Point3, Vector3};

    fn frame() -> FrameMatrices {
        FrameMatrices {
            view: Matrix4::look_at_rh(
                Point3::new(0.0, 0.0, 5.0),
                Point3::new(0.0, 0.0, 0.0),
                Vector3::unit_y(),
            ),
            projection: cgmath::perspective(Deg(60.0), 1.0, 0.1, 100.0),
            shadow_view: Matrix4::look_at_rh(
                Point3::new(10.0, 10.0, 10.0),
                Point3::new(0.0, 0.0, 0.0),
                Vector3::unit_y(),
            ),
            shadow_projection: cgmath::perspective(Deg(45.0), 1.0, 0.1, 10000.0),
        }
    }

    #[test]
    fn struct_sizes_match_wgsl_layout() {
        assert_eq!(std::mem::size_of::<VertexUniforms>(), 240);
        assert_eq!(std::mem::size_of::<FragmentUniforms>(), 16);
        // WGSL array strides round up to the struct alignment of 16
        assert_eq!(std::mem::size_of::<VertexUniforms>() % 16, 0);
        assert_eq!(std::mem::size_of::<MaterialParams>() % 16, 0);
    }

    #[test]
    fn normal_matrix_undoes_non_uniform_scale() {
        let m = Matrix4::from_nonuniform_scale(2.0, 4.0, 1.0);
        let n = normal_matrix(&m);
        assert!((n.x.x - 0.5).abs() < 1e-6);
        assert!((n.y.y - 0.25).abs() < 1e-6);
        assert!((n.z.z - 1.0).abs() < 1e-6);
    }

    #[test]
    fn normal_matrix_of_rotation_is_the_rotation() {
        let m = Matrix4::from_angle_y(Deg(30.0));
        let n = normal_matrix(&m);
        let r = Matrix3::from_angle_y(Deg(30.0));
        for c in 0..3 {
            for r_ in 0..3 {
                assert!((n[c][r_] - r[c][r_]).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn one_vertex_uniform_per_instance_in_order() {
        let f = frame();
        let instances = [
            Matrix4::from_translation(Vector3::new(1.0, 0.0, 0.0)),
            Matrix4::from_scale(3.0),
        ];
        let uniforms = build_vertex_uniforms(&f, &instances);
        assert_eq!(uniforms.len(), 2);
        let expected: [[f32; 4]; 4] = (f.view * instances[1]).into();
        assert_eq!(uniforms[1].model_view, expected);
        let mvp: [[f32; 4]; 4] = (f.projection * f.view * instances[0]).into();
        for c in 0..4 {
            for r in 0..4 {
                assert!((uniforms[0].model_view_projection[c][r] - mvp[c][r]).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn light_is_moved_into_view_space() {
        let f = frame();
        let uniforms = build_fragment_uniforms(&f, Vector3::new(0.0, 0.0, 0.0));
        // the camera sits 5 units in front of the origin
        assert!((uniforms.view_light_position[2] + 5.0).abs() < 1e-5);
        assert_eq!(uniforms.view_light_position[3], 1.0);
    }

    #[test]
    fn arrays_hold_one_element_per_slot() {
        assert_eq!(array_size::<VertexUniforms>(3), 720);
        assert_eq!(array_size::<MaterialParams>(3), 144);
        // an empty scene still gets a bindable buffer
        assert_eq!(array_size::<MaterialParams>(0), 48);
        assert_eq!(padded::<MaterialParams>(&[]).len(), 1);
    }

    #[test]
    fn slot_indexes_the_packed_array() {
        let f = frame();
        let instances = [Matrix4::from_scale(1.0), Matrix4::from_scale(2.0)];
        let uniforms = build_vertex_uniforms(&f, &instances);
        let bytes: &[u8] = bytemuck::cast_slice(&uniforms);
        let stride = std::mem::size_of::<VertexUniforms>();
        let second: &VertexUniforms = bytemuck::from_bytes(&bytes[stride..2 * stride]);
        assert_eq!(second, &uniforms[1]);
    }
}
