//! Offscreen frame capture and image comparison.
//!
//! [`render_to_image`] runs one frame of a [`Renderer`] into a texture,
//! copies it into a mappable buffer and waits for the mapping once. The
//! integration tests compare captures with [`rms_difference`].

use std::time::Duration;

use anyhow::{Context as _, bail};
use image::RgbaImage;
use instant::Instant;

use crate::{context::Context, render::Renderer};

/// Largest RMS error at which two captures count as the same picture.
pub const GOLDEN_RMS_THRESHOLD: f64 = 0.1;

const BYTES_PER_PIXEL: u32 = 4;

/// Buffer copies need rows aligned to 256 bytes.
pub fn padded_bytes_per_row(width: u32) -> u32 {
    let unpadded = width * BYTES_PER_PIXEL;
    unpadded.div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT) * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT
}

/// Drop the alignment padding at the end of every row.
pub fn unpad_rows(data: &[u8], width: u32, height: u32) -> Vec<u8> {
    let padded = padded_bytes_per_row(width) as usize;
    let unpadded = (width * BYTES_PER_PIXEL) as usize;
    data.chunks(padded)
        .take(height as usize)
        .flat_map(|row| &row[..unpadded])
        .copied()
        .collect()
}

/// Render one frame at the context's size and read it back as RGBA8.
pub async fn render_to_image(
    ctx: &Context,
    renderer: &mut dyn Renderer,
    now: Instant,
) -> anyhow::Result<RgbaImage> {
    let [width, height] = ctx.size();
    let format = ctx.format();
    let extent = wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };
    let texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
        label: Some("capture target"),
        size: extent,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

    let bytes_per_row = padded_bytes_per_row(width);
    let output_buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("capture readback"),
        size: (bytes_per_row * height) as wgpu::BufferAddress,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    renderer.update(ctx, now);
    let mut encoder = ctx
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Capture Encoder"),
        });
    renderer.render(ctx, &view, &mut encoder);
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            aspect: wgpu::TextureAspect::All,
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &output_buffer,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(bytes_per_row),
                rows_per_image: Some(height),
            },
        },
        extent,
    );
    ctx.queue.submit(std::iter::once(encoder.finish()));

    let data = read_buffer(ctx, &output_buffer).await?;
    let mut pixels = unpad_rows(&data, width, height);

    if matches!(
        format,
        wgpu::TextureFormat::Bgra8Unorm | wgpu::TextureFormat::Bgra8UnormSrgb
    ) {
        pixels.chunks_exact_mut(4).for_each(|px| px.swap(0, 2));
    }
    log::debug!("captured {width}x{height} frame of {}", renderer.label());
    RgbaImage::from_raw(width, height, pixels).context("captured frame has the wrong size")
}

/// Map a `MAP_READ` buffer whose copies were already submitted and return
/// its contents.
pub async fn read_buffer(ctx: &Context, buffer: &wgpu::Buffer) -> anyhow::Result<Vec<u8>> {
    let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
    let buffer_slice = buffer.slice(..);
    buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
        // the receiver only goes away when the read already failed
        let _ = tx.send(result);
    });
    ctx.device
        .poll(wgpu::PollType::Wait {
            submission_index: None,
            timeout: Some(Duration::from_secs(3)),
        })
        .context("waiting for the readback")?;
    rx.receive()
        .await
        .context("buffer mapping was dropped")?
        .context("mapping the readback buffer")?;

    let data = buffer_slice.get_mapped_range().to_vec();
    buffer.unmap();
    Ok(data)
}

/// Root mean square difference over the colour channels, values in `[0, 1]`.
/// Alpha is ignored.
pub fn rms_difference(a: &RgbaImage, b: &RgbaImage) -> anyhow::Result<f64> {
    if a.dimensions() != b.dimensions() {
        bail!(
            "cannot compare a {:?} image with a {:?} image",
            a.dimensions(),
            b.dimensions()
        );
    }
    let pixel_count = (a.width() as f64 * a.height() as f64).max(1.0);
    let mut squared = [0.0f64; 3];
    for (pa, pb) in a.pixels().zip(b.pixels()) {
        for (channel, sum) in squared.iter_mut().enumerate() {
            let d = (pa[channel] as f64 - pb[channel] as f64) / 255.0;
            *sum += d * d;
        }
    }
    let mean: f64 = squared.iter().map(|s| s / pixel_count).sum::<f64>() / 3.0;
    Ok(mean.sqrt())
}

pub fn matches_golden(capture: &RgbaImage, golden: &RgbaImage) -> anyhow::Result<bool> {
    let rms = rms_difference(capture, golden)?;
    log::info!("rms difference {rms:.4} (threshold {GOLDEN_RMS_THRESHOLD})");
    Ok(rms < GOLDEN_RMS_THRESHOLD)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_are_padded_to_copy_alignment() {
        assert_eq!(padded_bytes_per_row(64), 256);
        assert_eq!(padded_bytes_per_row(65), 512);
        assert_eq!(padded_bytes_per_row(1), 256);
    }

    #[test]
    fn padding_is_stripped_per_row() {
        let width = 3;
        let padded = padded_bytes_per_row(width) as usize;
        let mut data = vec![0u8; padded * 2];
        data[..12].copy_from_slice(&[1; 12]);
        data[padded..padded + 12].copy_from_slice(&[2; 12]);
        data[12] = 9;
        let rows = unpad_rows(&data, width, 2);
        assert_eq!(rows.len(), 24);
        assert!(rows[..12].iter().all(|&b| b == 1));
        assert!(rows[12..].iter().all(|&b| b == 2));
    }

    #[test]
    fn identical_images_have_no_difference() {
        let img = RgbaImage::from_fn(8, 4, |x, y| image::Rgba([x as u8 * 30, y as u8 * 60, 7, 255]));
        assert_eq!(rms_difference(&img, &img).unwrap(), 0.0);
        assert!(matches_golden(&img, &img).unwrap());
    }

    #[test]
    fn black_and_white_differ_completely() {
        let black = RgbaImage::from_pixel(4, 4, image::Rgba([0, 0, 0, 255]));
        let white = RgbaImage::from_pixel(4, 4, image::Rgba([255, 255, 255, 0]));
        assert!((rms_difference(&black, &white).unwrap() - 1.0).abs() < 1e-12);
        assert!(!matches_golden(&black, &white).unwrap());
    }

    #[test]
    fn one_channel_off_counts_a_third() {
        let a = RgbaImage::from_pixel(2, 2, image::Rgba([0, 0, 0, 255]));
        let b = RgbaImage::from_pixel(2, 2, image::Rgba([255, 0, 0, 255]));
        let rms = rms_difference(&a, &b).unwrap();
        assert!((rms - (1.0f64 / 3.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn sizes_must_match() {
        let a = RgbaImage::new(2, 2);
        let b = RgbaImage::new(2, 3);
        assert!(rms_difference(&a, &b).is_err());
    }
}
