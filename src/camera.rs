//! Camera and light placement.
//!
//! The tutorials use a camera framed on the asset's bounding box: by default
//! an orbit camera whose distance grows with the box depth. The light sits at
//! an offset from the box corner and doubles as the shadow-map camera.

use cgmath::{Deg, EuclideanSpace, Matrix4, Point3, Quaternion, Rad, Rotation, Vector3};

use crate::data_structures::bbox::Aabb;

/// cgmath builds OpenGL style projections with depth in [-1, 1]; wgpu wants [0, 1].
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Camera {
    /// Looks at the origin from `rotation * (0, 0, 2 + extent.z)`.
    Orbit { rotation: Quaternion<f32> },
    LookAt {
        eye: Point3<f32>,
        target: Point3<f32>,
        up: Vector3<f32>,
    },
}

impl Default for Camera {
    fn default() -> Self {
        Camera::Orbit {
            rotation: Quaternion::new(1.0, 0.0, 0.0, 0.0),
        }
    }
}

impl Camera {
    pub fn eye(&self, bbox: &Aabb) -> Point3<f32> {
        match self {
            Camera::Orbit { rotation } => {
                let distance = 2.0 + bbox.extent().z;
                Point3::from_vec(rotation.rotate_vector(Vector3::new(0.0, 0.0, distance)))
            }
            Camera::LookAt { eye, .. } => *eye,
        }
    }

    pub fn view_matrix(&self, bbox: &Aabb) -> Matrix4<f32> {
        match self {
            Camera::Orbit { .. } => {
                Matrix4::look_at_rh(self.eye(bbox), Point3::origin(), Vector3::unit_y())
            }
            Camera::LookAt { eye, target, up } => Matrix4::look_at_rh(*eye, *target, *up),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projection {
    pub fovy: Rad<f32>,
    pub znear: f32,
    pub zfar: f32,
}

impl Default for Projection {
    fn default() -> Self {
        Self {
            fovy: Rad(std::f32::consts::FRAC_PI_3),
            znear: 0.1,
            zfar: 100.0,
        }
    }
}

impl Projection {
    pub fn matrix(&self, aspect: f32) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * cgmath::perspective(self.fovy, aspect, self.znear, self.zfar)
    }
}

pub fn aspect_ratio(size: [u32; 2]) -> f32 {
    size[0].max(1) as f32 / size[1].max(1) as f32
}

/// World-space light position for the centered asset.
///
/// The asset is drawn centered on the origin, so the offset is added to the
/// box corner relative to the center (not to `bbox.max` in asset space) and
/// the shadow camera aims at the origin rather than at `bbox.center()`.
pub fn light_position(bbox: &Aabb, offset: Vector3<f32>) -> Vector3<f32> {
    bbox.max - bbox.center() + offset
}

/// The shadow map is rendered from the light towards the origin.
pub fn shadow_view(light: Vector3<f32>) -> Matrix4<f32> {
    let eye = Point3::from_vec(light);
    // looking straight down the Y axis would make `up` degenerate
    let up = if light.x.abs() < 1e-4 && light.z.abs() < 1e-4 {
        Vector3::unit_z()
    } else {
        Vector3::unit_y()
    };
    Matrix4::look_at_rh(eye, Point3::origin(), up)
}

/// Subtracted from the receiver's light-space NDC depth before the shadow
/// map comparison. The far plane at 10000 packs depth close to 1, so a caster
/// one unit above a receiver 30 units from the light is only ~1e-4 closer.
/// Acne is handled by the shadow pipeline's slope bias.
pub const SHADOW_BIAS: f32 = 1e-5;

pub fn shadow_projection() -> Matrix4<f32> {
    OPENGL_TO_WGPU_MATRIX * cgmath::perspective(Deg(45.0), 1.0, 0.1, 10000.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{InnerSpace, Rotation3, Transform, Vector4};

    fn unit_box() -> Aabb {
        Aabb::new(Vector3::new(-1.0, -1.0, -1.0), Vector3::new(1.0, 1.0, 1.0))
    }

    #[test]
    fn orbit_distance_grows_with_box_depth() {
        let eye = Camera::default().eye(&unit_box());
        assert_eq!(eye, Point3::new(0.0, 0.0, 4.0));

        let turned = Camera::Orbit {
            rotation: Quaternion::from_angle_y(Deg(90.0)),
        };
        let eye = turned.eye(&unit_box());
        assert!((eye.x - 4.0).abs() < 1e-5 && eye.z.abs() < 1e-5);
    }

    #[test]
    fn origin_projects_to_screen_center_inside_depth_range() {
        let bbox = unit_box();
        let view = Camera::default().view_matrix(&bbox);
        let clip = Projection::default().matrix(16.0 / 9.0) * view * Vector4::new(0.0, 0.0, 0.0, 1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() < 1e-6 && ndc.y.abs() < 1e-6);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }

    #[test]
    fn near_plane_maps_to_zero_depth() {
        let proj = Projection::default().matrix(1.0);
        let p = proj.transform_point(Point3::new(0.0, 0.0, -0.1));
        assert!(p.z.abs() < 1e-5);
    }

    #[test]
    fn light_is_offset_from_the_box_corner() {
        let bbox = Aabb::new(Vector3::new(0.0, 0.0, 0.0), Vector3::new(2.0, 4.0, 6.0));
        let light = light_position(&bbox, Vector3::new(20.0, 20.0, 10.0));
        assert_eq!(light, Vector3::new(21.0, 22.0, 13.0));
    }

    #[test]
    fn shadow_bias_is_smaller_than_caster_separation() {
        let light = Vector3::new(20.5, 20.5, 10.5);
        let light_space = shadow_projection() * shadow_view(light);
        // a floor point next to the unit cube and the cube edge shadowing it
        let receiver = Point3::new(-1.0, -0.5, 0.0);
        let towards_light = (Point3::from_vec(light) - receiver).normalize();
        let caster = receiver + towards_light;
        let depth = |p: Point3<f32>| light_space.transform_point(p).z;
        let separation = depth(receiver) - depth(caster);
        assert!(separation > 0.0);
        assert!(separation > 5.0 * SHADOW_BIAS, "separation {separation}");
    }

    #[test]
    fn shadow_view_handles_overhead_light() {
        let view = shadow_view(Vector3::new(0.0, 50.0, 0.0));
        let origin = view.transform_point(Point3::origin());
        assert!((origin.z + 50.0).abs() < 1e-3);
        assert!(origin.x.is_finite() && origin.y.is_finite());
    }
}
