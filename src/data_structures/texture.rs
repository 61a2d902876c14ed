//! GPU textures, render targets and the texture heap.
//!
//! [`Texture`] wraps a wgpu texture with its view and an optional sampler and
//! offers constructors for every attachment the renderers need. The
//! [`TextureHeap`] packs all material textures of a scene into one 2D-array
//! texture so a single binding covers every draw.

use std::collections::HashMap;

use anyhow::*;
use image::{DynamicImage, GenericImageView, imageops::FilterType};

use crate::data_structures::model::{MaterialData, MaterialParams};

/// A GPU texture with a view and optional sampler.
#[derive(Clone, Debug)]
pub struct Texture {
    #[allow(unused)]
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: Option<wgpu::Sampler>,
}

impl Texture {
    /// Standard depth buffer texture format (32-bit float).
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    /// Depth attachment that can also be sampled with a comparison sampler,
    /// which is how the shadow map is read.
    pub fn create_depth_texture(device: &wgpu::Device, size: [u32; 2], label: &str) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: extent(size),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[Self::DEPTH_FORMAT],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = Some(device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("shadow comparison sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            compare: Some(wgpu::CompareFunction::LessEqual),
            lod_min_clamp: 0.0,
            lod_max_clamp: 100.0,
            ..Default::default()
        }));

        Self {
            texture,
            view,
            sampler,
        }
    }

    /// Colour attachment that later passes read with `textureLoad`.
    pub fn create_render_target(
        device: &wgpu::Device,
        size: [u32; 2],
        format: wgpu::TextureFormat,
        label: &str,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: extent(size),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            sampler: None,
        }
    }

    /// Write-only storage texture for compute output.
    pub fn create_storage_target(
        device: &wgpu::Device,
        size: [u32; 2],
        format: wgpu::TextureFormat,
        label: &str,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: extent(size),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::STORAGE_BINDING | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            sampler: None,
        }
    }
}

fn extent(size: [u32; 2]) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width: size[0].max(1),
        height: size[1].max(1),
        depth_or_array_layers: 1,
    }
}

pub fn create_default_sampler(device: &wgpu::Device) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        address_mode_u: wgpu::AddressMode::Repeat,
        address_mode_v: wgpu::AddressMode::Repeat,
        address_mode_w: wgpu::AddressMode::Repeat,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Linear,
        ..Default::default()
    })
}

/// Largest edge of a heap layer.
pub const MAX_HEAP_LAYER_SIZE: u32 = 2048;

/// Texture name to heap layer table.
///
/// Built once per scene. Names are numbered in order of first appearance
/// while walking the materials (base colour before specular).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HeapTable {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl HeapTable {
    /// `available` filters out names whose image could not be loaded, so
    /// those resolve to `-1` like a material without a texture.
    pub fn build<F>(materials: &[MaterialData], mut available: F) -> Self
    where
        F: FnMut(&str) -> bool,
    {
        let mut table = Self::default();
        for material in materials {
            let names = [&material.base_color_texture, &material.specular_texture];
            for name in names.into_iter().flatten() {
                if table.index.contains_key(name) {
                    continue;
                }
                if !available(name) {
                    log::warn!("texture {name:?} of material {:?} is missing", material.name);
                    continue;
                }
                table.index.insert(name.clone(), table.names.len());
                table.names.push(name.clone());
            }
        }
        table
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Names in layer order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn layer(&self, name: Option<&str>) -> i32 {
        name.and_then(|n| self.index.get(n))
            .map_or(-1, |&layer| layer as i32)
    }

    pub fn resolve(&self, material: &MaterialData) -> MaterialParams {
        MaterialParams::new(
            material,
            self.layer(material.base_color_texture.as_deref()),
            self.layer(material.specular_texture.as_deref()),
        )
    }
}

/// Common layer size: the largest source dimensions, clamped.
pub fn heap_layer_size<'a, I>(images: I) -> [u32; 2]
where
    I: IntoIterator<Item = &'a DynamicImage>,
{
    let (w, h) = images
        .into_iter()
        .map(|img| img.dimensions())
        .fold((1, 1), |(w, h), (iw, ih)| (w.max(iw), h.max(ih)));
    [w.min(MAX_HEAP_LAYER_SIZE), h.min(MAX_HEAP_LAYER_SIZE)]
}

/// All material textures of a scene in one 2D-array texture.
#[derive(Debug)]
pub struct TextureHeap {
    pub table: HeapTable,
    pub texture: Texture,
    pub layout: wgpu::BindGroupLayout,
    pub bind_group: wgpu::BindGroup,
}

impl TextureHeap {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        materials: &[MaterialData],
        images: &HashMap<String, DynamicImage>,
    ) -> Result<Self> {
        let table = HeapTable::build(materials, |name| images.contains_key(name));
        let sources = table
            .names()
            .iter()
            .map(|name| {
                images
                    .get(name)
                    .with_context(|| format!("no image for heap texture {name:?}"))
            })
            .collect::<Result<Vec<_>>>()?;
        let [width, height] = heap_layer_size(sources.iter().copied());
        // an array texture needs at least one layer
        let layers = table.len().max(1) as u32;

        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: layers,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("texture heap"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        let white = image::RgbaImage::from_pixel(width, height, image::Rgba([255; 4]));
        for layer in 0..layers {
            let rgba = match sources.get(layer as usize) {
                Some(img) if img.dimensions() == (width, height) => img.to_rgba8(),
                Some(img) => image::imageops::resize(&img.to_rgba8(), width, height, FilterType::Triangle),
                None => white.clone(),
            };
            queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    aspect: wgpu::TextureAspect::All,
                    texture: &texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d {
                        x: 0,
                        y: 0,
                        z: layer,
                    },
                },
                &rgba,
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(4 * width),
                    rows_per_image: Some(height),
                },
                wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
            );
        }
        if table.is_empty() {
            log::info!("texture heap: no textures, one blank layer");
        } else {
            log::info!("texture heap: {} layers of {width}x{height}", table.len());
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            dimension: Some(wgpu::TextureViewDimension::D2Array),
            ..Default::default()
        });
        let sampler = create_default_sampler(device);
        let layout = Self::layout(device);
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
            label: Some("texture_heap_bind_group"),
        });

        Ok(Self {
            table,
            texture: Texture {
                texture,
                view,
                sampler: Some(sampler),
            },
            layout,
            bind_group,
        })
    }

    pub fn layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2Array,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
            label: Some("texture_heap_bind_group_layout"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn material(name: &str, base: Option<&str>, spec: Option<&str>) -> MaterialData {
        MaterialData {
            name: name.to_string(),
            base_color_texture: base.map(str::to_string),
            specular_texture: spec.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn repeated_names_share_a_layer() {
        let materials = [
            material("a", Some("wood.png"), Some("wood_spec.png")),
            material("b", Some("metal.png"), None),
            material("c", Some("wood.png"), Some("metal.png")),
        ];
        let table = HeapTable::build(&materials, |_| true);
        assert_eq!(table.len(), 3);
        assert_eq!(table.names(), &["wood.png", "wood_spec.png", "metal.png"]);
        let c = table.resolve(&materials[2]);
        assert_eq!(c.base_color_layer, 0);
        assert_eq!(c.specular_layer, 2);
        assert_eq!(table.resolve(&materials[1]).specular_layer, -1);
    }

    #[test]
    fn missing_images_resolve_to_no_texture() {
        let materials = [material("a", Some("gone.png"), Some("here.png"))];
        let table = HeapTable::build(&materials, |name| name == "here.png");
        assert_eq!(table.len(), 1);
        let params = table.resolve(&materials[0]);
        assert_eq!(params.base_color_layer, -1);
        assert_eq!(params.specular_layer, 0);

        let none = HeapTable::build(&materials, |_| false);
        assert!(none.is_empty());
        assert_eq!(none.resolve(&materials[0]).specular_layer, -1);
    }

    #[test]
    fn layer_size_is_largest_source_clamped() {
        let images = [
            DynamicImage::new_rgba8(64, 16),
            DynamicImage::new_rgba8(32, 128),
        ];
        assert_eq!(heap_layer_size(images.iter()), [64, 128]);
        let huge = [DynamicImage::new_rgba8(4096, 8)];
        assert_eq!(heap_layer_size(huge.iter()), [MAX_HEAP_LAYER_SIZE, 8]);
        assert_eq!(heap_layer_size(std::iter::empty()), [1, 1]);
    }
}
