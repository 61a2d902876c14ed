//! Per-submesh model transforms.
//!
//! Each frame the scene builds one [`Instance`] per submesh: the asset's
//! submeshes share the spinning transform around the bounding box, the base
//! plane gets its own floor transform.

use std::ops::Mul;

use cgmath::{Deg, One, Rad};

use crate::data_structures::bbox::Aabb;

/// Position, rotation (as quaternion) and scale.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Instance {
    pub position: cgmath::Vector3<f32>,
    pub rotation: cgmath::Quaternion<f32>,
    pub scale: cgmath::Vector3<f32>,
}

impl Instance {
    /// Identity transformation (no move, rotate, or scale).
    pub fn new() -> Self {
        Self {
            position: cgmath::Vector3::new(0.0, 0.0, 0.0),
            rotation: cgmath::Quaternion::one(),
            scale: cgmath::Vector3::new(1.0, 1.0, 1.0),
        }
    }

    pub fn to_matrix(&self) -> cgmath::Matrix4<f32> {
        cgmath::Matrix4::from_translation(self.position)
            * cgmath::Matrix4::from(self.rotation)
            * cgmath::Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }

    /// `rotY(angle) * translate(-center)`: the asset spins in place around
    /// the center of its bounding box.
    pub fn around_bbox(bbox: &Aabb, angle: Rad<f32>) -> Self {
        let spin = Instance {
            rotation: cgmath::Quaternion::from(cgmath::Matrix3::from_angle_y(angle)),
            ..Default::default()
        };
        spin * Instance::from(-bbox.center())
    }

    /// Unit XY quad turned into a floor touching the bottom of the centered box.
    pub fn base_plane(bbox: &Aabb, scale: f32) -> Self {
        Instance {
            position: cgmath::Vector3::new(0.0, bbox.min.y - bbox.center().y, 0.0),
            rotation: cgmath::Quaternion::from(cgmath::Matrix3::from_angle_x(Deg(-90.0))),
            scale: cgmath::Vector3::new(scale, scale, scale),
        }
    }
}

impl Mul<Instance> for Instance {
    type Output = Self;

    fn mul(self, rhs: Instance) -> Self::Output {
        let new_rotation = self.rotation * rhs.rotation;

        let new_scale = cgmath::Vector3::new(
            self.scale.x * rhs.scale.x,
            self.scale.y * rhs.scale.y,
            self.scale.z * rhs.scale.z,
        );
        let scaled_rhs_pos = cgmath::Vector3::new(
            self.scale.x * rhs.position.x,
            self.scale.y * rhs.position.y,
            self.scale.z * rhs.position.z,
        );
        let new_position = self.position + (self.rotation * scaled_rhs_pos);

        Instance {
            position: new_position,
            rotation: new_rotation,
            scale: new_scale,
        }
    }
}

impl From<cgmath::Vector3<f32>> for Instance {
    fn from(position: cgmath::Vector3<f32>) -> Self {
        Instance {
            position,
            ..Default::default()
        }
    }
}

impl Default for Instance {
    fn default() -> Self {
        Self::new()
    }
}

/// Model matrices parallel to draw order: `asset_submeshes` copies of the
/// asset transform followed by the plane transform when present.
pub fn instance_matrices(
    bbox: &Aabb,
    angle: Rad<f32>,
    asset_submeshes: usize,
    plane_scale: Option<f32>,
) -> Vec<cgmath::Matrix4<f32>> {
    let model = Instance::around_bbox(bbox, angle).to_matrix();
    let mut matrices = vec![model; asset_submeshes];
    if let Some(scale) = plane_scale {
        matrices.push(Instance::base_plane(bbox, scale).to_matrix());
    }
    matrices
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{Matrix4, Vector3, Vector4};

    fn assert_close(a: Matrix4<f32>, b: Matrix4<f32>) {
        let (a, b): ([[f32; 4]; 4], [[f32; 4]; 4]) = (a.into(), b.into());
        for c in 0..4 {
            for r in 0..4 {
                assert!((a[c][r] - b[c][r]).abs() < 1e-5, "{a:?} != {b:?}");
            }
        }
    }

    fn bbox() -> Aabb {
        Aabb::new(Vector3::new(1.0, 2.0, 3.0), Vector3::new(3.0, 6.0, 5.0))
    }

    #[test]
    fn around_bbox_is_rotation_after_centering() {
        let angle = Rad(0.7);
        let expected = Matrix4::from_angle_y(angle) * Matrix4::from_translation(-bbox().center());
        assert_close(Instance::around_bbox(&bbox(), angle).to_matrix(), expected);
    }

    #[test]
    fn base_plane_lies_under_the_centered_box() {
        let plane = Instance::base_plane(&bbox(), 100.0).to_matrix();
        // quad corner (1, 1, 0) ends up on the floor at y = -2
        let p = plane * Vector4::new(1.0, 1.0, 0.0, 1.0);
        assert!((p.y + 2.0).abs() < 1e-4);
        assert!((p.x - 100.0).abs() < 1e-3);
        assert!((p.z + 100.0).abs() < 1e-3);
        // the quad normal (+Z) points up
        let n = plane * Vector4::new(0.0, 0.0, 1.0, 0.0);
        assert!(n.y > 99.0);
    }

    #[test]
    fn matrices_follow_draw_order() {
        let matrices = instance_matrices(&bbox(), Rad(0.0), 3, Some(10.0));
        assert_eq!(matrices.len(), 4);
        assert_eq!(matrices[0], matrices[2]);
        assert_ne!(matrices[2], matrices[3]);
        assert_eq!(instance_matrices(&bbox(), Rad(0.0), 2, None).len(), 2);
    }
}
