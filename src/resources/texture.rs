use std::path::{Path, PathBuf};

use anyhow::Context as _;
use image::{DynamicImage, ImageFormat};

/// Absolute paths are used as they are, everything else is looked up in the
/// crate's `assets` directory.
pub fn asset_path(file_name: &str) -> PathBuf {
    let path = Path::new(file_name);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("assets")
            .join(file_name)
    }
}

/// Resolve `name` next to the file that referenced it (mtllib, texture maps, gltf uris).
pub fn sibling(file_name: &str, name: &str) -> String {
    match Path::new(file_name).parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.join(name).to_string_lossy().into_owned(),
        _ => name.to_string(),
    }
}

pub async fn load_string(file_name: &str) -> anyhow::Result<String> {
    let path = asset_path(file_name);
    std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))
}

pub async fn load_binary(file_name: &str) -> anyhow::Result<Vec<u8>> {
    let path = asset_path(file_name);
    std::fs::read(&path).with_context(|| format!("reading {}", path.display()))
}

/// Decode an image, using `format` (a file extension or mime subtype) as a hint.
pub fn decode_image(bytes: &[u8], format: Option<&str>) -> anyhow::Result<DynamicImage> {
    let img = match format.and_then(ImageFormat::from_extension) {
        Some(fmt) => image::load_from_memory_with_format(bytes, fmt)?,
        None => image::load_from_memory(bytes)?,
    };
    Ok(img)
}

pub async fn load_image(file_name: &str) -> anyhow::Result<DynamicImage> {
    let data = load_binary(file_name).await?;
    let extension = Path::new(file_name).extension().and_then(|e| e.to_str());
    decode_image(&data, extension).with_context(|| format!("decoding {file_name}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_names_live_in_the_asset_directory() {
        let path = asset_path("cube.obj");
        assert!(path.ends_with("assets/cube.obj"));
        assert!(path.is_absolute());
    }

    #[test]
    fn siblings_share_the_parent_directory() {
        assert_eq!(sibling("cube.obj", "cube.mtl"), "cube.mtl");
        assert_eq!(
            Path::new(&sibling("models/bunny.obj", "bunny.mtl")),
            Path::new("models").join("bunny.mtl")
        );
    }

    #[test]
    fn decodes_png_with_and_without_hint() {
        let img = image::RgbaImage::from_pixel(2, 3, image::Rgba([10, 20, 30, 255]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut std::io::Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        assert_eq!(decode_image(&bytes, Some("png")).unwrap().width(), 2);
        assert_eq!(decode_image(&bytes, None).unwrap().height(), 3);
    }
}
