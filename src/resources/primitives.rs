//! Procedural meshes, so every tutorial runs without external assets.

use std::f32::consts::{PI, TAU};

use crate::data_structures::model::{MeshData, ModelVertex, SubmeshData};
use crate::resources::mesh::compute_tangents;

fn finish(name: &str, mut vertices: Vec<ModelVertex>, indices: Vec<u32>, material: usize) -> MeshData {
    compute_tangents(&mut vertices, &indices);
    MeshData {
        name: name.to_string(),
        vertices,
        submeshes: vec![SubmeshData { indices, material }],
    }
}

/// Quad spanning [-1, 1] on X and Y, facing +Z.
pub fn quad(material: usize) -> MeshData {
    let corner = |x: f32, y: f32| ModelVertex {
        position: [x, y, 0.0],
        tex_coords: [(x + 1.0) * 0.5, (1.0 - y) * 0.5],
        normal: [0.0, 0.0, 1.0],
        ..Default::default()
    };
    let vertices = vec![corner(-1.0, -1.0), corner(1.0, -1.0), corner(1.0, 1.0), corner(-1.0, 1.0)];
    finish("quad", vertices, vec![0, 1, 2, 0, 2, 3], material)
}

/// Axis-aligned cube of edge `size` centered at the origin, 4 vertices per face.
pub fn cube(size: f32, material: usize) -> MeshData {
    let h = size * 0.5;
    // normal, then the two in-plane axes (u, v) with u x v = normal
    let faces: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
        ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
        ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
        ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
        ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
    ];
    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for (n, u, v) in faces {
        let base = vertices.len() as u32;
        for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            let position = [0, 1, 2].map(|i| (n[i] + su * u[i] + sv * v[i]) * h);
            vertices.push(ModelVertex {
                position,
                tex_coords: [(su + 1.0) * 0.5, (1.0 - sv) * 0.5],
                normal: n,
                ..Default::default()
            });
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    finish("cube", vertices, indices, material)
}

pub fn uv_sphere(radius: f32, segments: u32, rings: u32, material: usize) -> MeshData {
    let segments = segments.max(3);
    let rings = rings.max(2);
    let mut vertices = Vec::with_capacity(((segments + 1) * (rings + 1)) as usize);
    for ring in 0..=rings {
        let v = ring as f32 / rings as f32;
        let phi = v * PI;
        for segment in 0..=segments {
            let u = segment as f32 / segments as f32;
            let theta = u * TAU;
            let normal = [phi.sin() * theta.cos(), phi.cos(), -phi.sin() * theta.sin()];
            vertices.push(ModelVertex {
                position: normal.map(|c| c * radius),
                tex_coords: [u, v],
                normal,
                ..Default::default()
            });
        }
    }
    let stride = segments + 1;
    let mut indices = Vec::with_capacity((segments * rings * 6) as usize);
    for ring in 0..rings {
        for segment in 0..segments {
            let a = ring * stride + segment;
            let b = a + stride;
            indices.extend_from_slice(&[a, b, a + 1, a + 1, b, b + 1]);
        }
    }
    finish("uv sphere", vertices, indices, material)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{InnerSpace, Vector3};

    fn winding_matches_normals(mesh: &MeshData) -> bool {
        mesh.submeshes[0].indices.chunks(3).all(|c| {
            let p: Vec<Vector3<f32>> = c.iter().map(|&i| mesh.vertices[i as usize].position.into()).collect();
            let n: Vector3<f32> = mesh.vertices[c[0] as usize].normal.into();
            let face = (p[1] - p[0]).cross(p[2] - p[0]);
            face.magnitude2() < 1e-12 || face.dot(n) > 0.0
        })
    }

    #[test]
    fn quad_faces_positive_z() {
        let quad = quad(0);
        assert_eq!(quad.vertices.len(), 4);
        assert!(winding_matches_normals(&quad));
        let bbox = quad.bbox();
        assert_eq!(bbox.min, Vector3::new(-1.0, -1.0, 0.0));
        assert_eq!(bbox.max, Vector3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn cube_is_closed_and_counter_clockwise() {
        let cube = cube(2.0, 3);
        assert_eq!(cube.vertices.len(), 24);
        assert_eq!(cube.index_count(), 36);
        assert_eq!(cube.submeshes[0].material, 3);
        assert!(winding_matches_normals(&cube));
        assert_eq!(cube.bbox().extent(), Vector3::new(2.0, 2.0, 2.0));
    }

    #[test]
    fn sphere_vertices_sit_on_the_radius() {
        let sphere = uv_sphere(1.5, 16, 8, 0);
        assert!(sphere
            .vertices
            .iter()
            .all(|v| (Vector3::from(v.position).magnitude() - 1.5).abs() < 1e-4));
        assert!(winding_matches_normals(&sphere));
    }
}
