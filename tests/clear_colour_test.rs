#![cfg(feature = "integration-tests")]

#[macro_use]
mod common;

use common::test_utils::{f_to_u8, still};
use render_steps::Technique;
use wgpu::Color;

fn corner_is(image: &image::RgbaImage, colour: Color) {
    let desired_pixel = image::Rgba([f_to_u8(colour.r), f_to_u8(colour.g), f_to_u8(colour.b), 255]);
    assert_eq!(*image.get_pixel(0, 0), desired_pixel);
    assert_eq!(*image.get_pixel(image.width() - 1, 0), desired_pixel);
}

#[test]
fn triangle_leaves_the_clear_colour_around_it() {
    // the vertices sit 250 pixels from the center, so the corners need a larger viewport
    let config = still(Technique::Triangle)
        .with_window_size(800, 600)
        .with_clear_color(Color::WHITE);
    capture_test!([config], |images: Vec<image::RgbaImage>| {
        let image = &images[0];
        corner_is(image, Color::WHITE);
        let center = image.get_pixel(image.width() / 2, image.height() / 2);
        assert_ne!(*center, image::Rgba([255, 255, 255, 255]));
    });
}

#[test]
fn deferred_background_keeps_the_clear_colour() {
    capture_test!(
        [
            still(Technique::Deferred).with_clear_color(Color::BLACK),
            still(Technique::TiledDeferred).with_clear_color(Color::BLACK),
        ],
        |images: Vec<image::RgbaImage>| {
            for image in &images {
                corner_is(image, Color::BLACK);
            }
        }
    );
}

#[test]
fn forward_draws_the_cube_in_the_middle() {
    capture_test!([still(Technique::Forward).with_clear_color(Color::WHITE)], |images: Vec<image::RgbaImage>| {
        let image = &images[0];
        corner_is(image, Color::WHITE);
        let center = image.get_pixel(image.width() / 2, image.height() / 2);
        assert_ne!(*center, image::Rgba([255, 255, 255, 255]));
    });
}
