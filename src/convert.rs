//! File-to-file conversions behind the command line tool.

use crate::asset::{Asset, FileKind, parse_asset_or};
use crate::config::ExportConfig;
use crate::error::Result;
use crate::mesh::serialize_mesh;
use crate::obj::{
    ObjDocument, anim_to_obj, material_libraries, mesh_to_obj, obj_to_mesh, obj_to_physics, physics_to_obj,
};
use crate::options::ParseOptions;
use crate::phys::serialize_physics_mesh;
use std::fs;
use std::io;
use std::path::Path;

fn stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "mesh".to_string())
}

/// Converts an in-memory asset to OBJ; `name` labels the objects and
/// materials, `mtllib` is the library file the OBJ should reference.
pub fn asset_to_obj(asset: &Asset, name: &str, mtllib: Option<&str>) -> Result<ObjDocument> {
    match asset {
        Asset::Mesh(mesh) => mesh_to_obj(mesh, name, mtllib),
        Asset::Physics(phys) => physics_to_obj(phys, name),
        Asset::Anim(anim) => anim_to_obj(anim, name, mtllib),
    }
}

/// Parses `input`; a lenient parse of an unrecognised file goes by its
/// extension.
pub fn inspect_file(input: &Path, opts: ParseOptions) -> Result<Asset> {
    let data = fs::read(input)?;
    parse_asset_or(&data, FileKind::from_path(input), opts)
}

/// Writes `output` and, when materials exist, a `.mtl` beside it.
pub fn file_to_obj(input: &Path, output: &Path, opts: ParseOptions) -> Result<Asset> {
    let asset = inspect_file(input, opts)?;
    let mtl_path = output.with_extension("mtl");
    let mtl_name = mtl_path.file_name().map(|n| n.to_string_lossy().into_owned());

    let wants_mtl = !matches!(asset, Asset::Physics(_));
    let doc = asset_to_obj(&asset, &stem(input), mtl_name.as_deref().filter(|_| wants_mtl))?;
    fs::write(output, doc.obj)?;
    if wants_mtl {
        fs::write(&mtl_path, doc.mtl)?;
    }
    Ok(asset)
}

/// Concatenated text of the material libraries `obj_data` names, looked
/// up beside `input`. Missing libraries are skipped with a warning.
fn read_material_libraries(input: &Path, obj_data: &[u8]) -> Result<Option<Vec<u8>>> {
    let dir = input.parent().unwrap_or_else(|| Path::new(""));
    let mut mtl = Vec::new();
    let mut found = false;
    for library in material_libraries(obj_data) {
        let path = dir.join(&library);
        match fs::read(&path) {
            Ok(data) => {
                mtl.extend_from_slice(&data);
                mtl.push(b'\n');
                found = true;
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::warn!("material library {:?} not found", path);
            }
            Err(err) => return Err(err.into()),
        }
    }
    Ok(found.then_some(mtl))
}

pub fn obj_file_to_mesh(input: &Path, output: &Path, config: &ExportConfig) -> Result<()> {
    let data = fs::read(input)?;
    let mtl = read_material_libraries(input, &data)?;
    let mesh = obj_to_mesh(&data, mtl.as_deref(), config.name_mode)?;
    tracing::info!(
        "packed {} vertices, {} triangles into {} submeshes",
        mesh.vertices.len(),
        mesh.triangle_count(),
        mesh.submeshes.len()
    );
    fs::write(output, serialize_mesh(&mesh)?)?;
    Ok(())
}

pub fn obj_file_to_physics(input: &Path, output: &Path, config: &ExportConfig) -> Result<()> {
    let data = fs::read(input)?;
    let phys = obj_to_physics(&data, config.grid())?;
    tracing::info!(
        "packed {} triangles into {} physics sub meshes",
        phys.triangle_count(),
        phys.sub_meshes.len()
    );
    fs::write(output, serialize_physics_mesh(&phys)?)?;
    Ok(())
}
