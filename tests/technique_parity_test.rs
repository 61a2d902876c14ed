#![cfg(feature = "integration-tests")]

#[macro_use]
mod common;

use common::test_utils::still;
use render_steps::{
    Technique,
    capture::{GOLDEN_RMS_THRESHOLD, rms_difference},
};

fn assert_same_picture(a: &image::RgbaImage, b: &image::RgbaImage, what: &str) {
    let rms = rms_difference(a, b).expect("captures differ in size");
    assert!(
        rms < GOLDEN_RMS_THRESHOLD,
        "{what}: rms difference {rms} exceeds {GOLDEN_RMS_THRESHOLD}"
    );
}

#[test]
fn deferred_matches_forward_shading() {
    capture_test!(
        [still(Technique::Forward), still(Technique::Deferred)],
        |images: Vec<image::RgbaImage>| {
            assert_same_picture(&images[0], &images[1], "forward vs deferred");
        }
    );
}

#[test]
fn tiled_and_gpu_driven_match_shadowed_deferred() {
    capture_test!(
        [
            still(Technique::ShadowDeferred),
            still(Technique::TiledDeferred),
            still(Technique::GpuDriven),
        ],
        |images: Vec<image::RgbaImage>| {
            assert_same_picture(&images[0], &images[1], "shadow vs tiled");
            assert_same_picture(&images[0], &images[2], "shadow vs gpu-driven");
        }
    );
}

fn brightness(pixel: &image::Rgba<u8>) -> i32 {
    pixel.0[..3].iter().map(|&c| c as i32).sum()
}

#[test]
fn shadow_map_darkens_part_of_the_plane() {
    // large enough for the cube's shadow to cover a clear patch of floor
    capture_test!(
        [
            still(Technique::Deferred)
                .with_base_plane(true)
                .with_window_size(320, 240),
            still(Technique::ShadowDeferred).with_window_size(320, 240),
        ],
        |images: Vec<image::RgbaImage>| {
            let (lit, shadowed) = (&images[0], &images[1]);
            let mut darkened = 0u32;
            let mut darkened_x = 0u64;
            for ((x, y, plain), dimmed) in lit.enumerate_pixels().zip(shadowed.pixels()) {
                let delta = brightness(plain) - brightness(dimmed);
                assert!(delta >= -3, "pixel ({x}, {y}) got brighter under the shadow map");
                if delta > 12 {
                    darkened += 1;
                    darkened_x += x as u64;
                }
            }
            assert!(darkened >= 100, "only {darkened} pixels are in shadow");
            // the light is up and to the right, the shadow falls to the left
            let mean_x = darkened_x / darkened as u64;
            assert!(
                mean_x < lit.width() as u64 / 2,
                "shadow centered at x = {mean_x}"
            );
        }
    );
}

#[test]
fn shadowed_techniques_share_the_clear_colour_exactly() {
    capture_test!(
        [
            still(Technique::ShadowDeferred),
            still(Technique::TiledDeferred),
            still(Technique::GpuDriven),
        ],
        |images: Vec<image::RgbaImage>| {
            let corners = |image: &image::RgbaImage| {
                [*image.get_pixel(0, 0), *image.get_pixel(image.width() - 1, 0)]
            };
            assert_eq!(corners(&images[0]), corners(&images[1]), "shadow vs tiled");
            assert_eq!(corners(&images[0]), corners(&images[2]), "shadow vs gpu-driven");
        }
    );
}

#[test]
fn textured_asset_matches_between_forward_and_gpu_driven_deferred() {
    capture_test!(
        [
            still(Technique::Forward).with_asset("cube.obj"),
            still(Technique::GpuDriven).with_asset("cube.obj").with_base_plane(false),
        ],
        |images: Vec<image::RgbaImage>| {
            assert_same_picture(&images[0], &images[1], "forward vs gpu-driven");
        }
    );
}
