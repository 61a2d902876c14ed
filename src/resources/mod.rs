use std::{
    collections::HashMap,
    io::{BufReader, Cursor},
    path::Path,
};

use anyhow::{Context as _, bail};

use crate::{
    config::RenderConfig,
    data_structures::{model::MaterialData, scene::SceneData},
    resources::texture::{load_binary, load_image, load_string, sibling},
};

/**
 * This module contains all logic for loading meshes, materials and textures from external
 * files into `SceneData`.
 */
pub mod mesh;
pub mod primitives;
pub mod texture;

/// Load an asset by extension: `.obj` (+ `.mtl`) or `.gltf` / `.glb`.
pub async fn load_scene_data(file_name: &str) -> anyhow::Result<SceneData> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    let data = match extension.as_deref() {
        Some("obj") => load_obj(file_name).await?,
        Some("gltf") | Some("glb") => load_gltf(file_name).await?,
        _ => bail!("unsupported asset format: {file_name}"),
    };
    if data.meshes.is_empty() {
        bail!("{file_name} contains no triangle meshes");
    }
    log::info!(
        "loaded {file_name}: {} meshes, {} submeshes, {} materials, {} images",
        data.meshes.len(),
        data.submesh_count(),
        data.materials.len(),
        data.images.len()
    );
    Ok(data)
}

/// Procedural stand-ins that need no files: `cube` and `sphere`.
pub fn builtin_scene(name: &str) -> Option<SceneData> {
    let mesh = match name {
        "cube" => primitives::cube(1.0, 0),
        "sphere" => primitives::uv_sphere(0.5, 48, 24, 0),
        _ => return None,
    };
    Some(SceneData {
        meshes: vec![mesh],
        materials: vec![MaterialData {
            name: name.to_string(),
            base_color: [0.8, 0.35, 0.2, 1.0],
            ..Default::default()
        }],
        ..Default::default()
    })
}

/// The scene a run configuration asks for: its asset (or the built-in cube)
/// plus the base plane when enabled.
pub async fn load_scene_for(config: &RenderConfig) -> anyhow::Result<SceneData> {
    let name = config.asset.as_deref().unwrap_or("cube");
    let data = match builtin_scene(name) {
        Some(data) => data,
        None => load_scene_data(name).await?,
    };
    Ok(if config.base_plane_enabled() {
        data.with_base_plane()
    } else {
        data
    })
}

pub async fn load_obj(file_name: &str) -> anyhow::Result<SceneData> {
    let obj_text = load_string(file_name).await?;
    let data = parse_obj(file_name, &obj_text, |p| async move { load_string(&p).await }).await?;

    let mut images = HashMap::new();
    for name in texture_names(&data.materials) {
        match load_image(&sibling(file_name, &name)).await {
            Ok(img) => {
                images.insert(name, img);
            }
            Err(e) => log::warn!("texture {name} of {file_name} could not be loaded: {e:#}"),
        }
    }
    Ok(SceneData { images, ..data })
}

/// Parse OBJ text; `load_mtl` resolves material libraries (relative to the
/// OBJ file) to their text. Missing libraries only cost the materials.
pub async fn parse_obj<F, Fut>(file_name: &str, obj_text: &str, load_mtl: F) -> anyhow::Result<SceneData>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = anyhow::Result<String>>,
{
    let mut obj_reader = BufReader::new(Cursor::new(obj_text));
    let (models, obj_materials) = tobj::load_obj_buf_async(
        &mut obj_reader,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
        |p| {
            let path = sibling(file_name, &p);
            let mtl = load_mtl(path);
            async move {
                match mtl.await {
                    Ok(text) => tobj::load_mtl_buf(&mut BufReader::new(Cursor::new(text))),
                    Err(e) => {
                        log::warn!("material library {p} missing: {e:#}");
                        Err(tobj::LoadError::OpenFileFailed)
                    }
                }
            }
        },
    )
    .await
    .with_context(|| format!("parsing {file_name}"))?;

    let mut materials = match obj_materials {
        Ok(materials) => mesh::materials_from_obj(&materials),
        Err(e) => {
            log::warn!("{file_name}: no usable materials ({e})");
            Vec::new()
        }
    };
    // submeshes without a material (or with an unknown one) use the default
    if materials.is_empty() {
        materials.push(MaterialData::default());
    }

    Ok(SceneData {
        meshes: mesh::meshes_from_obj(&models, 0),
        materials,
        ..Default::default()
    })
}

pub async fn load_gltf(file_name: &str) -> anyhow::Result<SceneData> {
    let gltf_bytes = load_binary(file_name).await?;
    let gltf = gltf::Gltf::from_reader(BufReader::new(Cursor::new(gltf_bytes)))?;

    let mut buffer_data = Vec::new();
    for buffer in gltf.buffers() {
        match buffer.source() {
            gltf::buffer::Source::Bin => match gltf.blob.as_deref() {
                Some(blob) => buffer_data.push(blob.to_vec()),
                None => bail!("{file_name} references a binary chunk it does not have"),
            },
            gltf::buffer::Source::Uri(uri) => {
                buffer_data.push(load_binary(&sibling(file_name, uri)).await?);
            }
        }
    }

    let contents = mesh::from_gltf(file_name, &gltf.document, &buffer_data, 0)?;
    let mut images = contents.images;
    for material in &contents.materials {
        for name in [&material.base_color_texture, &material.specular_texture]
            .into_iter()
            .flatten()
        {
            if images.contains_key(name) {
                continue;
            }
            match load_image(name).await {
                Ok(img) => {
                    images.insert(name.clone(), img);
                }
                Err(e) => log::warn!("texture {name} of {file_name} could not be loaded: {e:#}"),
            }
        }
    }

    Ok(SceneData {
        meshes: contents.meshes,
        materials: contents.materials,
        images,
        plane: None,
    })
}

fn texture_names(materials: &[MaterialData]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for material in materials {
        for name in [&material.base_color_texture, &material.specular_texture]
            .into_iter()
            .flatten()
        {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    const OBJ: &str = "\
mtllib two.mtl
o first
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
vn 0 0 1
usemtl red
f 1/1/1 2/2/1 3/3/1 4/4/1
o second
v 0 0 2
v 1 0 2
v 0 1 2
usemtl textured
f 5 6 7
";

    const MTL: &str = "\
newmtl red
Kd 1 0 0
Ks 0.5 0.5 0.5
Ns 10

newmtl textured
Kd 1 1 1
map_Kd wood.png
map_Ks wood.png
";

    fn parse(mtl: Option<&'static str>) -> SceneData {
        futures::executor::block_on(parse_obj("dir/two.obj", OBJ, |p| async move {
            assert_eq!(Path::new(&p), Path::new("dir").join("two.mtl"));
            mtl.map(str::to_string).ok_or_else(|| anyhow::anyhow!("not found"))
        }))
        .unwrap()
    }

    #[test]
    fn obj_objects_become_meshes_with_materials() {
        let data = parse(Some(MTL));
        assert_eq!(data.meshes.len(), 2);
        // the quad face is triangulated
        assert_eq!(data.meshes[0].submeshes[0].indices.len(), 6);
        assert_eq!(data.meshes[1].vertices.len(), 3);

        let red = &data.materials[data.meshes[0].submeshes[0].material];
        assert_eq!(red.base_color, [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(red.shininess, 10.0);
        let textured = &data.materials[data.meshes[1].submeshes[0].material];
        assert_eq!(textured.base_color_texture.as_deref(), Some("wood.png"));
        assert_eq!(texture_names(&data.materials), vec!["wood.png".to_string()]);
    }

    #[test]
    fn obj_without_normals_gets_face_normals() {
        let data = parse(Some(MTL));
        for v in &data.meshes[1].vertices {
            assert_eq!(v.normal, [0.0, 0.0, 1.0]);
        }
    }

    #[test]
    fn missing_material_library_falls_back_to_default() {
        let data = parse(None);
        assert_eq!(data.meshes.len(), 2);
        assert_eq!(data.materials, vec![MaterialData::default()]);
        assert!(data.meshes.iter().all(|m| m.submeshes[0].material == 0));
    }

    #[test]
    fn unknown_extension_is_an_error() {
        let err = futures::executor::block_on(load_scene_data("scene.fbx")).unwrap_err();
        assert!(err.to_string().contains("unsupported"));
    }

    #[test]
    fn bundled_cube_loads_with_its_texture() {
        let data = futures::executor::block_on(load_scene_data("cube.obj")).unwrap();
        assert_eq!(data.meshes.len(), 1);
        assert_eq!(data.meshes[0].index_count(), 36);
        assert_eq!(data.materials[0].base_color_texture.as_deref(), Some("crate.png"));
        assert!(data.images.contains_key("crate.png"));
        let bbox = data.bbox();
        assert_eq!(bbox.extent(), cgmath::Vector3::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn builtin_names_need_no_files() {
        let sphere = builtin_scene("sphere").unwrap();
        assert_eq!(sphere.meshes.len(), 1);
        assert_eq!(sphere.materials.len(), 1);
        assert!(builtin_scene("cube").is_some());
        assert!(builtin_scene("cube.obj").is_none());
    }
}
