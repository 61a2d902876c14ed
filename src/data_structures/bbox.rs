//! Axis-aligned bounding boxes.
//!
//! The tutorials frame the camera, the light and the base plane around the
//! bounding box of the loaded asset, and the GPU-driven renderer culls
//! submeshes against their local boxes.

use cgmath::{Matrix4, Point3, Transform, Vector3};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vector3<f32>,
    pub max: Vector3<f32>,
}

impl Aabb {
    /// An inverted box that any point or union expands.
    pub fn empty() -> Self {
        Self {
            min: Vector3::new(f32::MAX, f32::MAX, f32::MAX),
            max: Vector3::new(f32::MIN, f32::MIN, f32::MIN),
        }
    }

    pub fn new(min: Vector3<f32>, max: Vector3<f32>) -> Self {
        Self { min, max }
    }

    pub fn from_points<I>(points: I) -> Self
    where
        I: IntoIterator<Item = [f32; 3]>,
    {
        points.into_iter().fold(Self::empty(), |mut bbox, p| {
            bbox.grow(p.into());
            bbox
        })
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn grow(&mut self, p: Vector3<f32>) {
        self.min = Vector3::new(self.min.x.min(p.x), self.min.y.min(p.y), self.min.z.min(p.z));
        self.max = Vector3::new(self.max.x.max(p.x), self.max.y.max(p.y), self.max.z.max(p.z));
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        if other.is_empty() {
            return *self;
        }
        let mut out = *self;
        out.grow(other.min);
        out.grow(other.max);
        out
    }

    pub fn center(&self) -> Vector3<f32> {
        (self.min + self.max) * 0.5
    }

    pub fn extent(&self) -> Vector3<f32> {
        self.max - self.min
    }

    pub fn corners(&self) -> [Vector3<f32>; 8] {
        let (a, b) = (self.min, self.max);
        [
            Vector3::new(a.x, a.y, a.z),
            Vector3::new(b.x, a.y, a.z),
            Vector3::new(a.x, b.y, a.z),
            Vector3::new(b.x, b.y, a.z),
            Vector3::new(a.x, a.y, b.z),
            Vector3::new(b.x, a.y, b.z),
            Vector3::new(a.x, b.y, b.z),
            Vector3::new(b.x, b.y, b.z),
        ]
    }

    /// Box enclosing the eight transformed corners.
    pub fn transformed(&self, m: &Matrix4<f32>) -> Aabb {
        if self.is_empty() {
            return *self;
        }
        let corners = self.corners().map(|c| {
            let p = m.transform_point(Point3::new(c.x, c.y, c.z));
            [p.x, p.y, p.z]
        });
        Aabb::from_points(corners)
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::empty()
    }
}
