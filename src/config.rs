//! Run configuration.
//!
//! [`RenderConfig`] bundles everything a tutorial needs to know before the
//! first frame: which technique to run, what to load and how to frame it.

use std::fmt;
use std::str::FromStr;

use cgmath::Vector3;

use crate::camera::Camera;

/// The tutorial steps, in the order they build on each other.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Technique {
    Triangle,
    Forward,
    Deferred,
    ShadowDeferred,
    TiledDeferred,
    GpuDriven,
}

impl Technique {
    pub const ALL: [Technique; 6] = [
        Technique::Triangle,
        Technique::Forward,
        Technique::Deferred,
        Technique::ShadowDeferred,
        Technique::TiledDeferred,
        Technique::GpuDriven,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Technique::Triangle => "triangle",
            Technique::Forward => "forward",
            Technique::Deferred => "deferred",
            Technique::ShadowDeferred => "shadow",
            Technique::TiledDeferred => "tiled",
            Technique::GpuDriven => "gpu-driven",
        }
    }

    /// Techniques from shadow mapping on draw the asset onto a base plane.
    pub fn uses_base_plane(&self) -> bool {
        matches!(
            self,
            Technique::ShadowDeferred | Technique::TiledDeferred | Technique::GpuDriven
        )
    }

    pub fn loads_scene(&self) -> bool {
        !matches!(self, Technique::Triangle)
    }
}

impl fmt::Display for Technique {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Technique {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        if let Ok(step) = lower.parse::<usize>() {
            return Technique::ALL
                .get(step.wrapping_sub(1))
                .copied()
                .ok_or_else(|| anyhow::anyhow!("no tutorial step {step}, expected 1-6"));
        }
        Technique::ALL
            .iter()
            .copied()
            .find(|t| t.name() == lower)
            .ok_or_else(|| anyhow::anyhow!("unknown technique {s:?}"))
    }
}

/// Per-asset behaviour flags.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ModelConfigs {
    pub rotate_around_bbox: bool,
}

impl Default for ModelConfigs {
    fn default() -> Self {
        Self {
            rotate_around_bbox: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RenderConfig {
    pub technique: Technique,
    /// Asset file relative to the `assets` directory. `None` uses the
    /// built-in cube.
    pub asset: Option<String>,
    pub window_size: [u32; 2],
    pub clear_color: wgpu::Color,
    pub light_offset: Vector3<f32>,
    pub model: ModelConfigs,
    pub camera: Camera,
    /// `None` follows the technique's default.
    pub base_plane: Option<bool>,
    pub plane_scale: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            technique: Technique::Forward,
            asset: None,
            window_size: [800, 600],
            clear_color: wgpu::Color {
                r: 0.1,
                g: 0.2,
                b: 0.3,
                a: 1.0,
            },
            light_offset: Vector3::new(20.0, 20.0, 10.0),
            model: ModelConfigs::default(),
            camera: Camera::default(),
            base_plane: None,
            plane_scale: 100.0,
        }
    }
}

impl RenderConfig {
    pub fn new(technique: Technique) -> Self {
        Self {
            technique,
            ..Default::default()
        }
    }

    pub fn with_asset(mut self, asset: impl Into<String>) -> Self {
        self.asset = Some(asset.into());
        self
    }

    pub fn with_window_size(mut self, width: u32, height: u32) -> Self {
        self.window_size = [width, height];
        self
    }

    pub fn with_clear_color(mut self, clear_color: wgpu::Color) -> Self {
        self.clear_color = clear_color;
        self
    }

    pub fn with_light_offset(mut self, offset: Vector3<f32>) -> Self {
        self.light_offset = offset;
        self
    }

    pub fn with_camera(mut self, camera: Camera) -> Self {
        self.camera = camera;
        self
    }

    pub fn with_rotation(mut self, rotate: bool) -> Self {
        self.model.rotate_around_bbox = rotate;
        self
    }

    pub fn with_base_plane(mut self, enabled: bool) -> Self {
        self.base_plane = Some(enabled);
        self
    }

    pub fn with_plane_scale(mut self, scale: f32) -> Self {
        self.plane_scale = scale;
        self
    }

    pub fn base_plane_enabled(&self) -> bool {
        self.base_plane
            .unwrap_or_else(|| self.technique.uses_base_plane())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn techniques_parse_by_name_or_step() {
        assert_eq!("tiled".parse::<Technique>().unwrap(), Technique::TiledDeferred);
        assert_eq!("GPU-Driven".parse::<Technique>().unwrap(), Technique::GpuDriven);
        assert_eq!("1".parse::<Technique>().unwrap(), Technique::Triangle);
        assert_eq!("4".parse::<Technique>().unwrap(), Technique::ShadowDeferred);
        assert!("0".parse::<Technique>().is_err());
        assert!("7".parse::<Technique>().is_err());
        assert!("raytraced".parse::<Technique>().is_err());
    }

    #[test]
    fn names_round_trip_through_display() {
        for t in Technique::ALL {
            assert_eq!(t.to_string().parse::<Technique>().unwrap(), t);
        }
    }

    #[test]
    fn base_plane_defaults_follow_technique() {
        assert!(!RenderConfig::new(Technique::Deferred).base_plane_enabled());
        assert!(RenderConfig::new(Technique::ShadowDeferred).base_plane_enabled());
        assert!(
            !RenderConfig::new(Technique::GpuDriven)
                .with_base_plane(false)
                .base_plane_enabled()
        );
    }

    #[test]
    fn default_light_offset_and_rotation() {
        let config = RenderConfig::default();
        assert_eq!(config.light_offset, Vector3::new(20.0, 20.0, 10.0));
        assert!(config.model.rotate_around_bbox);
        assert!(!config.clone().with_rotation(false).model.rotate_around_bbox);
    }
}
