//! The base scene every tutorial draws: a loaded asset, an optional floor
//! plane, a camera and a light.
//!
//! [`SceneData`] is what the loaders produce. [`Scene::upload`] turns it into
//! GPU buffers, the texture heap, the per-draw uniform slots and the combined
//! geometry the GPU-driven renderer consumes. Draw order is mesh order, then
//! submesh order; the plane is appended last.

use std::collections::HashMap;

use anyhow::Result;
use cgmath::{Rad, Vector3};
use image::DynamicImage;
use instant::Instant;
use wgpu::util::DeviceExt;

use crate::{
    camera::{self, Camera, Projection},
    config::{ModelConfigs, RenderConfig},
    data_structures::{
        bbox::Aabb,
        instance::instance_matrices,
        model::{MaterialData, MaterialParams, Mesh, MeshData, ModelVertex, Submesh},
        texture::TextureHeap,
        uniforms::{self, FrameMatrices, UniformBuffers},
    },
    resources::primitives,
};

/// CPU side of a scene, straight from the loaders.
#[derive(Clone, Debug, Default)]
pub struct SceneData {
    pub meshes: Vec<MeshData>,
    pub materials: Vec<MaterialData>,
    pub images: HashMap<String, DynamicImage>,
    /// Index of the base plane in `meshes`, always the last one.
    pub plane: Option<usize>,
}

impl SceneData {
    /// Bounds of the asset, ignoring the plane.
    pub fn bbox(&self) -> Aabb {
        self.asset_meshes()
            .iter()
            .fold(Aabb::empty(), |acc, mesh| acc.union(&mesh.bbox()))
    }

    pub fn asset_meshes(&self) -> &[MeshData] {
        match self.plane {
            Some(plane) => &self.meshes[..plane],
            None => &self.meshes,
        }
    }

    pub fn asset_submesh_count(&self) -> usize {
        self.asset_meshes().iter().map(|m| m.submeshes.len()).sum()
    }

    pub fn submesh_count(&self) -> usize {
        self.meshes.iter().map(|m| m.submeshes.len()).sum()
    }

    /// Append the floor quad with its own material.
    pub fn with_base_plane(mut self) -> Self {
        if self.plane.is_some() {
            return self;
        }
        let material = self.materials.len();
        self.materials.push(MaterialData {
            name: "base plane".to_string(),
            base_color: [0.6, 0.6, 0.6, 1.0],
            specular_color: [0.1, 0.1, 0.1],
            shininess: 8.0,
            ..Default::default()
        });
        self.plane = Some(self.meshes.len());
        self.meshes.push(primitives::quad(material));
        self
    }

    /// Material of every submesh in draw order, falling back to the default
    /// material for out-of-range indices.
    pub fn materials_per_draw(&self, resolved: &[MaterialParams]) -> Vec<MaterialParams> {
        let fallback = MaterialParams::new(&MaterialData::default(), -1, -1);
        self.meshes
            .iter()
            .flat_map(|m| &m.submeshes)
            .map(|s| resolved.get(s.material).copied().unwrap_or(fallback))
            .collect()
    }
}

/// Frame clock for the spinning asset.
///
/// While enabled the angle decreases by the seconds elapsed since the last
/// tick; disabling forgets the reference time so re-enabling does not jump.
#[derive(Clone, Copy, Debug, Default)]
pub struct RotationClock {
    angle: f32,
    last: Option<Instant>,
}

impl RotationClock {
    pub fn tick(&mut self, now: Instant, enabled: bool) -> Rad<f32> {
        if enabled {
            if let Some(last) = self.last {
                self.angle -= now.duration_since(last).as_secs_f32();
            }
            self.last = Some(now);
        } else {
            self.last = None;
        }
        Rad(self.angle)
    }

    pub fn angle(&self) -> Rad<f32> {
        Rad(self.angle)
    }
}

/// One record per submesh of the argument buffer read by the draw kernel.
/// Mirrors `SubmeshRecord` in `indirect.wgsl`.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SubmeshRecord {
    pub index_count: u32,
    pub first_index: u32,
    pub base_vertex: i32,
    pub slot: u32,
    pub bbox_min: [f32; 4],
    pub bbox_max: [f32; 4],
}

impl SubmeshRecord {
    pub fn new(submesh: &Submesh, base_vertex: i32, mesh_first_index: u32) -> Self {
        Self {
            index_count: submesh.indices.end - submesh.indices.start,
            first_index: mesh_first_index + submesh.indices.start,
            base_vertex,
            slot: submesh.slot,
            bbox_min: submesh.bbox.min.extend(1.0).into(),
            bbox_max: submesh.bbox.max.extend(1.0).into(),
        }
    }
}

/// Every mesh concatenated. Indices stay mesh-local, draws add `base_vertex`.
pub fn concat_geometry(meshes: &[MeshData]) -> (Vec<ModelVertex>, Vec<u32>) {
    let vertices = meshes.iter().flat_map(|m| m.vertices.iter().copied()).collect();
    let indices = meshes
        .iter()
        .flat_map(|m| m.submeshes.iter().flat_map(|s| s.indices.iter().copied()))
        .collect();
    (vertices, indices)
}

/// Geometry and records for GPU-driven drawing.
#[derive(Debug)]
pub struct CombinedGeometry {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub records: Vec<SubmeshRecord>,
    pub record_buffer: wgpu::Buffer,
}

#[derive(Debug)]
pub struct Scene {
    pub meshes: Vec<Mesh>,
    pub heap: TextureHeap,
    pub uniforms: UniformBuffers,
    pub combined: CombinedGeometry,
    pub bbox: Aabb,
    pub configs: ModelConfigs,
    pub clock: RotationClock,
    pub camera: Camera,
    pub projection: Projection,
    pub light_offset: Vector3<f32>,
    pub plane_scale: Option<f32>,
    asset_submeshes: usize,
}

impl Scene {
    pub fn upload(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        data: &SceneData,
        config: &RenderConfig,
    ) -> Result<Self> {
        let heap = TextureHeap::new(device, queue, &data.materials, &data.images)?;
        let resolved: Vec<MaterialParams> = data
            .materials
            .iter()
            .map(|m| heap.table.resolve(m))
            .collect();
        let uniforms = UniformBuffers::new(device, &data.materials_per_draw(&resolved));

        let mut meshes = Vec::with_capacity(data.meshes.len());
        let (mut slot, mut base_vertex, mut first_index) = (0u32, 0i32, 0u32);
        for mesh in &data.meshes {
            meshes.push(Mesh::upload(device, mesh, slot, base_vertex, first_index));
            slot += mesh.submeshes.len() as u32;
            base_vertex += mesh.vertices.len() as i32;
            first_index += mesh.index_count() as u32;
        }

        let (vertices, indices) = concat_geometry(&data.meshes);
        let records: Vec<SubmeshRecord> = meshes
            .iter()
            .flat_map(|mesh| {
                mesh.submeshes
                    .iter()
                    .map(|s| SubmeshRecord::new(s, mesh.base_vertex, mesh.first_index))
            })
            .collect();
        let combined = CombinedGeometry {
            vertex_buffer: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Combined Vertex Buffer"),
                contents: bytemuck::cast_slice(&vertices),
                usage: wgpu::BufferUsages::VERTEX,
            }),
            index_buffer: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Combined Index Buffer"),
                contents: bytemuck::cast_slice(&indices),
                usage: wgpu::BufferUsages::INDEX,
            }),
            record_buffer: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Submesh Argument Buffer"),
                contents: bytemuck::cast_slice(&records),
                usage: wgpu::BufferUsages::STORAGE,
            }),
            records,
        };

        let bbox = data.bbox();
        log::info!(
            "scene uploaded: {} meshes, {} draws, {} vertices, bbox {:?}..{:?}",
            meshes.len(),
            uniforms.slot_count,
            vertices.len(),
            bbox.min,
            bbox.max
        );

        Ok(Self {
            meshes,
            heap,
            uniforms,
            combined,
            bbox,
            configs: config.model,
            clock: RotationClock::default(),
            camera: config.camera,
            projection: Projection::default(),
            light_offset: config.light_offset,
            plane_scale: data.plane.map(|_| config.plane_scale),
            asset_submeshes: data.asset_submesh_count(),
        })
    }

    pub fn draw_count(&self) -> u32 {
        self.uniforms.slot_count
    }

    pub fn light_position(&self) -> Vector3<f32> {
        camera::light_position(&self.bbox, self.light_offset)
    }

    pub fn frame_matrices(&self, size: [u32; 2]) -> FrameMatrices {
        FrameMatrices {
            view: self.camera.view_matrix(&self.bbox),
            projection: self.projection.matrix(camera::aspect_ratio(size)),
            shadow_view: camera::shadow_view(self.light_position()),
            shadow_projection: camera::shadow_projection(),
        }
    }

    pub fn toggle_rotation(&mut self) {
        self.configs.rotate_around_bbox = !self.configs.rotate_around_bbox;
        log::info!("rotation around bbox: {}", self.configs.rotate_around_bbox);
    }

    /// Advance the clock and upload this frame's uniforms.
    pub fn update(&mut self, queue: &wgpu::Queue, size: [u32; 2], now: Instant) {
        let angle = self.clock.tick(now, self.configs.rotate_around_bbox);
        let instances = instance_matrices(&self.bbox, angle, self.asset_submeshes, self.plane_scale);
        let frame = self.frame_matrices(size);
        let vertex = uniforms::build_vertex_uniforms(&frame, &instances);
        let fragment = uniforms::build_fragment_uniforms(&frame, self.light_position());
        self.uniforms.write(queue, &vertex, &fragment);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_structures::model::SubmeshData;
    use instant::Duration;

    fn two_mesh_data() -> SceneData {
        SceneData {
            meshes: vec![
                primitives::cube(2.0, 0),
                MeshData {
                    name: "pair".into(),
                    vertices: primitives::quad(0).vertices,
                    submeshes: vec![
                        SubmeshData {
                            indices: vec![0, 1, 2],
                            material: 1,
                        },
                        SubmeshData {
                            indices: vec![0, 2, 3],
                            material: 7,
                        },
                    ],
                },
            ],
            materials: vec![MaterialData::default(), MaterialData::default()],
            ..Default::default()
        }
    }

    #[test]
    fn rotation_clock_counts_down_and_pauses() {
        let start = Instant::now();
        let mut clock = RotationClock::default();
        assert_eq!(clock.tick(start, true), Rad(0.0));
        let angle = clock.tick(start + Duration::from_millis(500), true);
        assert!((angle.0 + 0.5).abs() < 1e-4);

        // paused time is not accounted for after re-enabling
        clock.tick(start + Duration::from_secs(1), false);
        clock.tick(start + Duration::from_secs(10), true);
        let angle = clock.tick(start + Duration::from_millis(10_250), true);
        assert!((angle.0 + 0.75).abs() < 1e-4);
    }

    #[test]
    fn plane_is_appended_last_and_excluded_from_bounds() {
        let data = two_mesh_data();
        let bbox = data.bbox();
        let data = data.with_base_plane();
        assert_eq!(data.plane, Some(2));
        assert_eq!(data.meshes.len(), 3);
        assert_eq!(data.submesh_count(), 4);
        assert_eq!(data.asset_submesh_count(), 3);
        assert_eq!(data.bbox(), bbox);
        assert_eq!(data.materials.len(), 3);
        // idempotent
        assert_eq!(data.with_base_plane().meshes.len(), 3);
    }

    #[test]
    fn materials_follow_draw_order_with_fallback() {
        let data = two_mesh_data();
        let mut first = MaterialParams::new(&data.materials[0], -1, -1);
        first.base_color = [1.0, 0.0, 0.0, 1.0];
        let second = MaterialParams::new(&data.materials[1], 4, -1);
        let per_draw = data.materials_per_draw(&[first, second]);
        assert_eq!(per_draw.len(), 3);
        assert_eq!(per_draw[0], first);
        assert_eq!(per_draw[1], second);
        assert_eq!(per_draw[2].base_color_layer, -1);
    }

    #[test]
    fn combined_geometry_keeps_mesh_local_indices() {
        let data = two_mesh_data();
        let (vertices, indices) = concat_geometry(&data.meshes);
        assert_eq!(vertices.len(), 24 + 4);
        assert_eq!(indices.len(), 36 + 6);
        assert_eq!(&indices[36..], &[0, 1, 2, 0, 2, 3]);
    }

    #[test]
    fn records_point_into_combined_buffers() {
        assert_eq!(std::mem::size_of::<SubmeshRecord>(), 48);
        let submesh = Submesh {
            indices: 3..6,
            material: 0,
            bbox: Aabb::new(Vector3::new(-1.0, 0.0, 0.0), Vector3::new(1.0, 2.0, 0.5)),
            slot: 2,
        };
        let record = SubmeshRecord::new(&submesh, 24, 36);
        assert_eq!(record.index_count, 3);
        assert_eq!(record.first_index, 39);
        assert_eq!(record.base_vertex, 24);
        assert_eq!(record.slot, 2);
        assert_eq!(record.bbox_max, [1.0, 2.0, 0.5, 1.0]);
    }
}
