use std::collections::HashMap;

use cgmath::{InnerSpace, SquareMatrix};
use image::DynamicImage;

use crate::data_structures::model::{MaterialData, MeshData, ModelVertex, SubmeshData};
use crate::resources::texture::decode_image;

/**
 * Obj files (and many gltf exports) don't come with tangents and bitangents so they are
 * calculated per triangle and averaged over every triangle a vertex belongs to.
 */
pub fn compute_tangents(vertices: &mut [ModelVertex], indices: &[u32]) {
    let mut triangles_included = vec![0u32; vertices.len()];
    for v in vertices.iter_mut() {
        v.tangent = [0.0; 3];
        v.bitangent = [0.0; 3];
    }

    for c in indices.chunks_exact(3) {
        let (i0, i1, i2) = (c[0] as usize, c[1] as usize, c[2] as usize);
        if i0 >= vertices.len() || i1 >= vertices.len() || i2 >= vertices.len() {
            continue;
        }
        let (v0, v1, v2) = (vertices[i0], vertices[i1], vertices[i2]);

        let pos0: cgmath::Vector3<f32> = v0.position.into();
        let pos1: cgmath::Vector3<f32> = v1.position.into();
        let pos2: cgmath::Vector3<f32> = v2.position.into();

        let uv0: cgmath::Vector2<f32> = v0.tex_coords.into();
        let uv1: cgmath::Vector2<f32> = v1.tex_coords.into();
        let uv2: cgmath::Vector2<f32> = v2.tex_coords.into();

        let delta_pos1 = pos1 - pos0;
        let delta_pos2 = pos2 - pos0;
        let delta_uv1 = uv1 - uv0;
        let delta_uv2 = uv2 - uv0;

        // Solves
        //     delta_pos1 = delta_uv1.x * T + delta_uv1.y * B
        //     delta_pos2 = delta_uv2.x * T + delta_uv2.y * B
        let det = delta_uv1.x * delta_uv2.y - delta_uv1.y * delta_uv2.x;
        if det.abs() < f32::EPSILON {
            // degenerate uv mapping, nothing sensible to contribute
            continue;
        }
        let r = 1.0 / det;
        let tangent = (delta_pos1 * delta_uv2.y - delta_pos2 * delta_uv1.y) * r;
        // flipped for right-handed normal maps with wgpu's texture coordinates
        let bitangent = (delta_pos2 * delta_uv1.x - delta_pos1 * delta_uv2.x) * -r;

        for i in [i0, i1, i2] {
            let v = &mut vertices[i];
            v.tangent = (tangent + cgmath::Vector3::from(v.tangent)).into();
            v.bitangent = (bitangent + cgmath::Vector3::from(v.bitangent)).into();
            triangles_included[i] += 1;
        }
    }

    for (v, n) in vertices.iter_mut().zip(triangles_included) {
        if n == 0 {
            continue;
        }
        let denom = 1.0 / n as f32;
        v.tangent = (cgmath::Vector3::from(v.tangent) * denom).into();
        v.bitangent = (cgmath::Vector3::from(v.bitangent) * denom).into();
    }
}

/// Flat normals for sources that have none.
fn face_normals(vertices: &mut [ModelVertex], indices: &[u32]) {
    let mut sums = vec![cgmath::Vector3::new(0.0f32, 0.0, 0.0); vertices.len()];
    for c in indices.chunks_exact(3) {
        if c.iter().any(|&i| i as usize >= vertices.len()) {
            continue;
        }
        let p: [cgmath::Vector3<f32>; 3] = [
            vertices[c[0] as usize].position.into(),
            vertices[c[1] as usize].position.into(),
            vertices[c[2] as usize].position.into(),
        ];
        let n = (p[1] - p[0]).cross(p[2] - p[0]);
        for &i in c {
            sums[i as usize] += n;
        }
    }
    for (v, n) in vertices.iter_mut().zip(sums) {
        if n.magnitude2() > 0.0 {
            v.normal = n.normalize().into();
        }
    }
}

/// Convert tobj output. Every tobj model becomes one mesh with a single
/// submesh; material indices are shifted by `material_base`.
pub fn meshes_from_obj(models: &[tobj::Model], material_base: usize) -> Vec<MeshData> {
    models
        .iter()
        .filter(|m| !m.mesh.indices.is_empty())
        .map(|m| {
            let mut vertices = (0..m.mesh.positions.len() / 3)
                .map(|i| ModelVertex {
                    position: [
                        m.mesh.positions[i * 3],
                        m.mesh.positions[i * 3 + 1],
                        m.mesh.positions[i * 3 + 2],
                    ],
                    tex_coords: [
                        m.mesh.texcoords.get(i * 2).map_or(0.0, |f| *f),
                        1.0 - m.mesh.texcoords.get(i * 2 + 1).map_or(0.0, |f| *f),
                    ],
                    normal: [
                        m.mesh.normals.get(i * 3).map_or(0.0, |f| *f),
                        m.mesh.normals.get(i * 3 + 1).map_or(0.0, |f| *f),
                        m.mesh.normals.get(i * 3 + 2).map_or(0.0, |f| *f),
                    ],
                    tangent: [0.0; 3],
                    bitangent: [0.0; 3],
                })
                .collect::<Vec<_>>();

            if m.mesh.normals.is_empty() {
                face_normals(&mut vertices, &m.mesh.indices);
            }
            compute_tangents(&mut vertices, &m.mesh.indices);

            MeshData {
                name: m.name.clone(),
                vertices,
                submeshes: vec![SubmeshData {
                    indices: m.mesh.indices.clone(),
                    material: material_base + m.mesh.material_id.unwrap_or(0),
                }],
            }
        })
        .collect()
}

pub fn materials_from_obj(materials: &[tobj::Material]) -> Vec<MaterialData> {
    materials
        .iter()
        .map(|m| {
            let diffuse = m.diffuse.unwrap_or([0.8, 0.8, 0.8]);
            MaterialData {
                name: m.name.clone(),
                base_color: [diffuse[0], diffuse[1], diffuse[2], m.dissolve.unwrap_or(1.0)],
                specular_color: m.specular.unwrap_or([0.2, 0.2, 0.2]),
                shininess: m.shininess.unwrap_or(32.0),
                base_color_texture: m.diffuse_texture.clone(),
                specular_texture: m.specular_texture.clone(),
            }
        })
        .collect()
}

/// Everything pulled out of a gltf document.
pub struct GltfContents {
    pub meshes: Vec<MeshData>,
    pub materials: Vec<MaterialData>,
    pub images: HashMap<String, DynamicImage>,
}

/// Meshes are flattened with their node transforms applied; every primitive
/// becomes a submesh. Embedded images are decoded right away and keyed by
/// `<file>#<image index>`; external ones keep their uri as name.
pub fn from_gltf(
    file_name: &str,
    document: &gltf::Document,
    buffers: &[Vec<u8>],
    material_base: usize,
) -> anyhow::Result<GltfContents> {
    let mut images = HashMap::new();
    let mut image_names = Vec::new();
    for image in document.images() {
        let name = match image.source() {
            gltf::image::Source::View { view, mime_type } => {
                let name = format!("{file_name}#{}", image.index());
                let start = view.offset();
                let bytes = buffers
                    .get(view.buffer().index())
                    .and_then(|b| b.get(start..start + view.length()))
                    .ok_or_else(|| anyhow::anyhow!("image {name} points outside its buffer"))?;
                match decode_image(bytes, mime_type.split('/').next_back()) {
                    Ok(img) => {
                        images.insert(name.clone(), img);
                    }
                    Err(e) => log::warn!("could not decode {name}: {e}"),
                }
                name
            }
            gltf::image::Source::Uri { uri, .. } => crate::resources::texture::sibling(file_name, uri),
        };
        image_names.push(name);
    }

    let texture_name = |info: Option<gltf::texture::Info>| {
        info.and_then(|t| image_names.get(t.texture().source().index()).cloned())
    };

    let mut materials = document
        .materials()
        .map(|material| {
            let pbr = material.pbr_metallic_roughness();
            let specular = 1.0 - pbr.roughness_factor();
            MaterialData {
                name: material.name().unwrap_or("gltf material").to_string(),
                base_color: pbr.base_color_factor(),
                specular_color: [specular * 0.5; 3],
                shininess: 2.0 + 126.0 * specular * specular,
                base_color_texture: texture_name(pbr.base_color_texture()),
                specular_texture: None,
            }
        })
        .collect::<Vec<_>>();
    let default_material = materials.len();

    let mut meshes = Vec::new();
    for scene in document.scenes() {
        for node in scene.nodes() {
            collect_node(
                &node,
                cgmath::Matrix4::identity(),
                buffers,
                material_base,
                default_material,
                &mut meshes,
            );
        }
    }
    if meshes
        .iter()
        .flat_map(|m| &m.submeshes)
        .any(|s| s.material == material_base + default_material)
    {
        materials.push(MaterialData::default());
    }

    Ok(GltfContents {
        meshes,
        materials,
        images,
    })
}

fn collect_node(
    node: &gltf::Node,
    parent: cgmath::Matrix4<f32>,
    buffers: &[Vec<u8>],
    material_base: usize,
    default_material: usize,
    out: &mut Vec<MeshData>,
) {
    let transform = parent * cgmath::Matrix4::from(node.transform().matrix());
    if let Some(mesh) = node.mesh() {
        let normal_matrix = crate::data_structures::uniforms::normal_matrix(&transform);
        let mut vertices = Vec::new();
        let mut submeshes = Vec::new();
        let mut needs_normals = false;
        for primitive in mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                log::warn!("skipping non-triangle primitive in mesh {:?}", mesh.name());
                continue;
            }
            let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(Vec::as_slice));
            let Some(positions) = reader.read_positions() else {
                continue;
            };
            let base = vertices.len() as u32;
            let positions: Vec<[f32; 3]> = positions.collect();
            let normals: Vec<[f32; 3]> = reader.read_normals().map(|n| n.collect()).unwrap_or_default();
            let tex_coords: Vec<[f32; 2]> = reader
                .read_tex_coords(0)
                .map(|t| t.into_f32().collect())
                .unwrap_or_default();
            needs_normals |= normals.is_empty();

            for (i, p) in positions.iter().enumerate() {
                let position = transform * cgmath::Vector4::new(p[0], p[1], p[2], 1.0);
                let normal = normals
                    .get(i)
                    .map(|n| (normal_matrix * cgmath::Vector3::from(*n)).normalize().into())
                    .unwrap_or([0.0; 3]);
                vertices.push(ModelVertex {
                    position: [position.x, position.y, position.z],
                    tex_coords: tex_coords.get(i).copied().unwrap_or([0.0; 2]),
                    normal,
                    tangent: [0.0; 3],
                    bitangent: [0.0; 3],
                });
            }

            let indices: Vec<u32> = match reader.read_indices() {
                Some(indices) => indices.into_u32().map(|i| i + base).collect(),
                None => (base..vertices.len() as u32).collect(),
            };
            submeshes.push(SubmeshData {
                indices,
                material: material_base + primitive.material().index().unwrap_or(default_material),
            });
        }

        if !submeshes.is_empty() {
            let all_indices: Vec<u32> = submeshes.iter().flat_map(|s| s.indices.iter().copied()).collect();
            if needs_normals {
                face_normals(&mut vertices, &all_indices);
            }
            compute_tangents(&mut vertices, &all_indices);
            out.push(MeshData {
                name: mesh.name().unwrap_or("gltf mesh").to_string(),
                vertices,
                submeshes,
            });
        }
    }
    for child in node.children() {
        collect_node(&child, transform, buffers, material_base, default_material, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertex(position: [f32; 3], tex_coords: [f32; 2]) -> ModelVertex {
        ModelVertex {
            position,
            tex_coords,
            ..Default::default()
        }
    }

    #[test]
    fn tangents_follow_the_uv_axes() {
        let mut vertices = vec![
            vertex([0.0, 0.0, 0.0], [0.0, 0.0]),
            vertex([1.0, 0.0, 0.0], [1.0, 0.0]),
            vertex([0.0, 1.0, 0.0], [0.0, 1.0]),
        ];
        compute_tangents(&mut vertices, &[0, 1, 2]);
        for v in &vertices {
            assert_eq!(v.tangent, [1.0, 0.0, 0.0]);
            assert_eq!(v.bitangent, [0.0, -1.0, 0.0]);
        }
    }

    #[test]
    fn shared_vertices_average_their_tangents() {
        let mut vertices = vec![
            vertex([0.0, 0.0, 0.0], [0.0, 0.0]),
            vertex([1.0, 0.0, 0.0], [1.0, 0.0]),
            vertex([0.0, 1.0, 0.0], [0.0, 1.0]),
            vertex([0.0, 0.0, 2.0], [0.0, 1.0]),
        ];
        // the second triangle stretches v along +Z
        compute_tangents(&mut vertices, &[0, 1, 2, 0, 1, 3]);
        assert_eq!(vertices[0].tangent, [1.0, 0.0, 0.0]);
        assert_eq!(vertices[0].bitangent, [0.0, -0.5, -1.0]);
        assert_eq!(vertices[2].bitangent, [0.0, -1.0, 0.0]);
    }

    #[test]
    fn degenerate_uvs_leave_tangents_zero() {
        let mut vertices = vec![
            vertex([0.0, 0.0, 0.0], [0.5, 0.5]),
            vertex([1.0, 0.0, 0.0], [0.5, 0.5]),
            vertex([0.0, 1.0, 0.0], [0.5, 0.5]),
        ];
        compute_tangents(&mut vertices, &[0, 1, 2]);
        assert!(vertices.iter().all(|v| v.tangent == [0.0; 3]));
    }

    #[test]
    fn missing_normals_are_generated_from_faces() {
        let mut vertices = vec![
            vertex([0.0, 0.0, 0.0], [0.0, 0.0]),
            vertex([1.0, 0.0, 0.0], [1.0, 0.0]),
            vertex([0.0, 1.0, 0.0], [0.0, 1.0]),
        ];
        face_normals(&mut vertices, &[0, 1, 2]);
        assert_eq!(vertices[1].normal, [0.0, 0.0, 1.0]);
    }
}
