//! Meshes, submeshes and materials.
//!
//! Loading produces the CPU-side [`MeshData`] / [`MaterialData`]; uploading
//! turns them into [`Mesh`] (own vertex and index buffers plus the offsets
//! into the scene's combined buffers) and [`MaterialParams`] uniforms.

use std::ops::Range;

use wgpu::util::DeviceExt;

use crate::data_structures::bbox::Aabb;

/// Anything that can describe its own vertex buffer layout.
pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub tex_coords: [f32; 2],
    pub normal: [f32; 3],
    pub tangent: [f32; 3],
    pub bitangent: [f32; 3],
}

impl Vertex for ModelVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        const ATTRIBUTES: [wgpu::VertexAttribute; 5] = wgpu::vertex_attr_array![
            0 => Float32x3,
            1 => Float32x2,
            2 => Float32x3,
            3 => Float32x3,
            4 => Float32x3,
        ];
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<ModelVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &ATTRIBUTES,
        }
    }
}

/// Material as read from the asset. Texture names are keys into the heap table.
#[derive(Clone, Debug, PartialEq)]
pub struct MaterialData {
    pub name: String,
    pub base_color: [f32; 4],
    pub specular_color: [f32; 3],
    pub shininess: f32,
    pub base_color_texture: Option<String>,
    pub specular_texture: Option<String>,
}

impl Default for MaterialData {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            base_color: [0.8, 0.8, 0.8, 1.0],
            specular_color: [0.2, 0.2, 0.2],
            shininess: 32.0,
            base_color_texture: None,
            specular_texture: None,
        }
    }
}

/// Material uniform. Mirrors `Material` in WGSL; a layer of `-1` means
/// "no texture, use the constant colour".
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialParams {
    pub base_color: [f32; 4],
    pub specular_color: [f32; 3],
    pub shininess: f32,
    pub base_color_layer: i32,
    pub specular_layer: i32,
    _padding: [u32; 2],
}

impl MaterialParams {
    pub fn new(material: &MaterialData, base_color_layer: i32, specular_layer: i32) -> Self {
        Self {
            base_color: material.base_color,
            specular_color: material.specular_color,
            shininess: material.shininess.max(1.0),
            base_color_layer,
            specular_layer,
            _padding: [0; 2],
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SubmeshData {
    pub indices: Vec<u32>,
    pub material: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MeshData {
    pub name: String,
    pub vertices: Vec<ModelVertex>,
    pub submeshes: Vec<SubmeshData>,
}

impl MeshData {
    pub fn bbox(&self) -> Aabb {
        Aabb::from_points(self.vertices.iter().map(|v| v.position))
    }

    pub fn index_count(&self) -> usize {
        self.submeshes.iter().map(|s| s.indices.len()).sum()
    }
}

#[derive(Clone, Debug)]
pub struct Submesh {
    /// Range inside the mesh's own index buffer.
    pub indices: Range<u32>,
    pub material: usize,
    /// Local-space bounds of the vertices this submesh references.
    pub bbox: Aabb,
    /// Position in draw order; also the uniform slot.
    pub slot: u32,
}

#[derive(Debug)]
pub struct Mesh {
    pub name: String,
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub submeshes: Vec<Submesh>,
    /// First vertex of this mesh inside the combined vertex buffer.
    pub base_vertex: i32,
    /// First index of this mesh inside the combined index buffer.
    pub first_index: u32,
}

impl Mesh {
    /// Upload `data`, assigning consecutive slots starting at `first_slot`.
    pub fn upload(
        device: &wgpu::Device,
        data: &MeshData,
        first_slot: u32,
        base_vertex: i32,
        first_index: u32,
    ) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Vertex Buffer", data.name)),
            contents: bytemuck::cast_slice(&data.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let mut indices = Vec::with_capacity(data.index_count());
        let mut submeshes = Vec::with_capacity(data.submeshes.len());
        for (i, sub) in data.submeshes.iter().enumerate() {
            let start = indices.len() as u32;
            indices.extend_from_slice(&sub.indices);
            let bbox = Aabb::from_points(
                sub.indices
                    .iter()
                    .filter_map(|&i| data.vertices.get(i as usize))
                    .map(|v| v.position),
            );
            submeshes.push(Submesh {
                indices: start..indices.len() as u32,
                material: sub.material,
                bbox,
                slot: first_slot + i as u32,
            });
        }

        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Index Buffer", data.name)),
            contents: bytemuck::cast_slice(&indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        Self {
            name: data.name.clone(),
            vertex_buffer,
            index_buffer,
            submeshes,
            base_vertex,
            first_index,
        }
    }
}

/// Instance range that selects `slot` in the per-draw arrays.
pub fn slot_instances(slot: u32) -> Range<u32> {
    slot..slot + 1
}

/// Draw helpers on a render pass. Group 1 must hold the per-draw arrays.
pub trait DrawModel {
    fn draw_mesh(&mut self, mesh: &Mesh);
}

impl DrawModel for wgpu::RenderPass<'_> {
    fn draw_mesh(&mut self, mesh: &Mesh) {
        self.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
        self.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        for submesh in &mesh.submeshes {
            self.draw_indexed(submesh.indices.clone(), 0, slot_instances(submesh.slot));
        }
    }
}
