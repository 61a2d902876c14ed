#![cfg(feature = "integration-tests")]

#[macro_use]
mod common;

use common::test_utils::still;
use image::{RgbaImage, open};
use render_steps::{
    Technique,
    capture::{matches_golden, rms_difference},
};
use wgpu::Color;

/// Compare a capture with `tests/fixtures/<name>.png`. With `UPDATE_GOLDEN`
/// set the capture replaces the fixture instead.
fn assert_matches_fixture(actual: &RgbaImage, name: &str) {
    let path = format!("{}/tests/fixtures/{name}.png", env!("CARGO_MANIFEST_DIR"));
    if std::env::var_os("UPDATE_GOLDEN").is_some() {
        actual.save(&path).expect("failed to write fixture");
        return;
    }
    let expected = open(&path).expect("failed to load fixture").to_rgba8();
    assert_eq!(actual.dimensions(), expected.dimensions(), "image sizes differ");
    let rms = rms_difference(actual, &expected).expect("image sizes differ");
    assert!(
        matches_golden(actual, &expected).expect("image sizes differ"),
        "{name}: rms difference {rms} from the fixture"
    );
}

#[test]
fn triangle_matches_fixture() {
    capture_test!(
        [still(Technique::Triangle)
            .with_window_size(800, 600)
            .with_clear_color(Color::WHITE)],
        |images: Vec<RgbaImage>| assert_matches_fixture(&images[0], "triangle")
    );
}

#[test]
fn unshadowed_cube_matches_fixture() {
    capture_test!(
        [still(Technique::Forward), still(Technique::Deferred)],
        |images: Vec<RgbaImage>| {
            for image in &images {
                assert_matches_fixture(image, "cube");
            }
        }
    );
}

#[test]
fn shadowed_cube_matches_fixture() {
    capture_test!(
        [
            still(Technique::ShadowDeferred),
            still(Technique::TiledDeferred),
            still(Technique::GpuDriven),
        ],
        |images: Vec<RgbaImage>| {
            for image in &images {
                assert_matches_fixture(image, "cube_shadowed");
            }
        }
    );
}
