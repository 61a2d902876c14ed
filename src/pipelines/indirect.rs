//! Compute-generated draw commands.
//!
//! The kernel in `indirect.wgsl` reads the submesh argument buffer and the
//! per-draw transforms and writes one `DrawIndexedIndirect` command per
//! submesh. Each pass that draws the scene owns a [`DrawCommands`] so the
//! shadow and camera passes cull against their own clip volume.

use wgpu::util::{DeviceExt, DrawIndexedIndirectArgs};

use crate::{
    capture::read_buffer,
    context::Context,
    data_structures::scene::Scene,
    pipelines::{
        COMMON_WGSL,
        basic::{mk_compute_pipeline, mk_layout, mk_shader},
    },
};

pub const KERNEL_WORKGROUP_SIZE: u32 = 64;

/// Byte size of one command in the indirect buffer.
pub const DRAW_ARGS_SIZE: wgpu::BufferAddress =
    std::mem::size_of::<DrawIndexedIndirectArgs>() as wgpu::BufferAddress;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PassKind {
    Camera = 0,
    Shadow = 1,
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct KernelParams {
    pub submesh_count: u32,
    pub pass_kind: u32,
    _padding: [u32; 2],
}

impl KernelParams {
    pub fn new(submesh_count: u32, pass: PassKind) -> Self {
        Self {
            submesh_count,
            pass_kind: pass as u32,
            _padding: [0; 2],
        }
    }
}

pub fn indirect_offset(draw: u32) -> wgpu::BufferAddress {
    draw as wgpu::BufferAddress * DRAW_ARGS_SIZE
}

pub fn workgroup_count(submeshes: u32) -> u32 {
    submeshes.div_ceil(KERNEL_WORKGROUP_SIZE).max(1)
}

pub struct DrawKernel {
    pub pipeline: wgpu::ComputePipeline,
    pub layout: wgpu::BindGroupLayout,
}

impl DrawKernel {
    pub fn new(device: &wgpu::Device) -> Self {
        let storage = |binding, read_only| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                storage(1, true),
                storage(2, true),
                storage(3, false),
            ],
            label: Some("draw_kernel_bind_group_layout"),
        });
        let shader = mk_shader(
            device,
            "Draw Kernel Shader",
            &[COMMON_WGSL, include_str!("shaders/indirect.wgsl")],
        );
        let pipeline = mk_compute_pipeline(
            device,
            "Draw Kernel Pipeline",
            &mk_layout(device, "Draw Kernel Pipeline Layout", &[&layout]),
            &shader,
            "encode_draws",
        );
        Self { pipeline, layout }
    }
}

/// Indirect buffer and kernel bindings for one pass.
pub struct DrawCommands {
    pub pass: PassKind,
    pub count: u32,
    pub args: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

impl DrawCommands {
    pub fn new(device: &wgpu::Device, kernel: &DrawKernel, scene: &Scene, pass: PassKind) -> Self {
        let count = scene.combined.records.len() as u32;
        let label = format!("{pass:?} Draw Commands");
        let args = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&label),
            size: indirect_offset(count.max(1)),
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::INDIRECT
                | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        let params = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{pass:?} Kernel Params")),
            contents: bytemuck::cast_slice(&[KernelParams::new(count, pass)]),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &kernel.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: params.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: scene.combined.record_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: scene.uniforms.vertex_slots.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: args.as_entire_binding(),
                },
            ],
            label: Some(&label),
        });
        Self {
            pass,
            count,
            args,
            bind_group,
        }
    }

    pub fn encode(&self, encoder: &mut wgpu::CommandEncoder, kernel: &DrawKernel) {
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some(match self.pass {
                PassKind::Camera => "Encode Camera Draws",
                PassKind::Shadow => "Encode Shadow Draws",
            }),
            timestamp_writes: None,
        });
        pass.set_pipeline(&kernel.pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);
        pass.dispatch_workgroups(workgroup_count(self.count), 1, 1);
    }

    /// One indirect draw per submesh; the combined buffers are bound once
    /// and nothing is rebound between draws. Every bind group must already be
    /// set, the slot reaches the shaders as the first instance.
    pub fn draw(&self, render_pass: &mut wgpu::RenderPass<'_>, scene: &Scene) {
        render_pass.set_vertex_buffer(0, scene.combined.vertex_buffer.slice(..));
        render_pass.set_index_buffer(
            scene.combined.index_buffer.slice(..),
            wgpu::IndexFormat::Uint32,
        );
        for draw in 0..self.count {
            render_pass.draw_indexed_indirect(&self.args, indirect_offset(draw));
        }
    }

    /// Copy the generated commands back to the CPU. Waits for the device.
    pub async fn read_back(&self, ctx: &Context) -> anyhow::Result<Vec<DrawIndexedIndirectArgs>> {
        let size = indirect_offset(self.count);
        let staging = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Draw Commands Readback"),
            size: size.max(DRAW_ARGS_SIZE),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });
        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Draw Commands Readback Encoder"),
            });
        encoder.copy_buffer_to_buffer(&self.args, 0, &staging, 0, size.max(DRAW_ARGS_SIZE));
        ctx.queue.submit(std::iter::once(encoder.finish()));
        let bytes = read_buffer(ctx, &staging).await?;
        Ok(decode_commands(&bytes[..size as usize]))
    }
}

/// Parse tightly packed little-endian `DrawIndexedIndirect` commands.
pub fn decode_commands(bytes: &[u8]) -> Vec<DrawIndexedIndirectArgs> {
    bytes
        .chunks_exact(DRAW_ARGS_SIZE as usize)
        .map(|command| {
            let word = |i: usize| {
                let mut raw = [0u8; 4];
                raw.copy_from_slice(&command[i * 4..i * 4 + 4]);
                raw
            };
            DrawIndexedIndirectArgs {
                index_count: u32::from_le_bytes(word(0)),
                instance_count: u32::from_le_bytes(word(1)),
                first_index: u32::from_le_bytes(word(2)),
                base_vertex: i32::from_le_bytes(word(3)),
                first_instance: u32::from_le_bytes(word(4)),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_are_tightly_packed() {
        assert_eq!(DRAW_ARGS_SIZE, 20);
        assert_eq!(indirect_offset(3), 60);
        assert_eq!(std::mem::size_of::<KernelParams>(), 16);
    }

    #[test]
    fn every_submesh_gets_an_invocation() {
        assert_eq!(workgroup_count(0), 1);
        assert_eq!(workgroup_count(64), 1);
        assert_eq!(workgroup_count(65), 2);
    }

    #[test]
    fn commands_decode_from_the_indirect_layout() {
        let args = DrawIndexedIndirectArgs {
            index_count: 36,
            instance_count: 0,
            first_index: 6,
            base_vertex: -2,
            first_instance: 7,
        };
        let mut bytes = args.as_bytes().to_vec();
        bytes.extend_from_slice(args.as_bytes());
        let decoded = decode_commands(&bytes);
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[1].index_count, 36);
        assert_eq!(decoded[1].instance_count, 0);
        assert_eq!(decoded[1].first_index, 6);
        assert_eq!(decoded[1].base_vertex, -2);
        assert_eq!(decoded[1].first_instance, 7);
    }

    #[test]
    fn params_carry_the_pass() {
        assert_eq!(KernelParams::new(5, PassKind::Shadow).pass_kind, 1);
        assert_eq!(KernelParams::new(5, PassKind::Camera).pass_kind, 0);
    }
}
