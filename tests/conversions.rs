//! File-level conversions with scratch directories.

use std::fs;
use stormworks_mesh::config::ExportConfig;
use stormworks_mesh::convert::{file_to_obj, inspect_file, obj_file_to_mesh, obj_file_to_physics};
use stormworks_mesh::obj::NameMode;
use stormworks_mesh::{
    Color4, FileKind, ParseOptions, PhysicsMesh, ShaderKind, parse_mesh, parse_physics_mesh, serialize_physics_mesh,
};
use tempfile::tempdir;

const CUBE_FACE_OBJ: &str = "\
o panel
v 0 0 0
v 2 0 0
v 2 0 2
v 0 0 2
f 1 2 3 4
o light_MATERIALadditive
v 0 1 0
v 1 1 0
v 0 1 1
f 5 6 7
";

#[test]
fn obj_to_mesh_and_back() {
    let dir = tempdir().expect("Failed to create temp dir");
    let obj_path = dir.path().join("panel.obj");
    let mesh_path = dir.path().join("panel.mesh");
    fs::write(&obj_path, CUBE_FACE_OBJ).unwrap();

    let config = ExportConfig { name_mode: NameMode::Object, ..ExportConfig::default() };
    obj_file_to_mesh(&obj_path, &mesh_path, &config).unwrap();

    let data = fs::read(&mesh_path).unwrap();
    assert_eq!(FileKind::detect(&data), Some(FileKind::Mesh));
    let mesh = parse_mesh(&data, ParseOptions::strict()).unwrap();
    assert_eq!(mesh.triangle_count(), 3);
    assert_eq!(mesh.submeshes.len(), 2);
    assert_eq!(mesh.submeshes[0].name, "panel");
    assert_eq!(mesh.submeshes[1].shader(), Some(ShaderKind::Additive));

    let back_path = dir.path().join("panel_out.obj");
    let asset = file_to_obj(&mesh_path, &back_path, ParseOptions::strict()).unwrap();
    assert_eq!(asset.kind(), FileKind::Mesh);
    let obj = fs::read_to_string(&back_path).unwrap();
    assert!(obj.starts_with("mtllib panel_out.mtl\n"));
    assert!(obj.contains("o panel_MATERIALadditive\n"));
    let mtl = fs::read_to_string(dir.path().join("panel_out.mtl")).unwrap();
    assert!(mtl.contains("newmtl MATERIALadditive\n"));
}

#[test]
fn obj_to_physics_respects_grid_setting() {
    let dir = tempdir().expect("Failed to create temp dir");
    let obj_path = dir.path().join("hull.obj");
    fs::write(&obj_path, "v 0 0 0\nv 1 0 0\nv 0 1 0\nv 400 0 0\nv 401 0 0\nv 400 1 0\nf 1 2 3\nf 4 5 6\n").unwrap();

    let split_path = dir.path().join("split.phys");
    obj_file_to_physics(&obj_path, &split_path, &ExportConfig::default()).unwrap();
    let split = parse_physics_mesh(&fs::read(&split_path).unwrap(), ParseOptions::strict()).unwrap();
    assert_eq!(split.sub_meshes.len(), 2);

    let whole_path = dir.path().join("whole.phys");
    let config = ExportConfig { divide_grid: false, ..ExportConfig::default() };
    obj_file_to_physics(&obj_path, &whole_path, &config).unwrap();
    let whole = parse_physics_mesh(&fs::read(&whole_path).unwrap(), ParseOptions::strict()).unwrap();
    assert_eq!(whole.sub_meshes.len(), 1);
    assert_eq!(whole.triangle_count(), 2);

    let summary = inspect_file(&split_path, ParseOptions::strict()).unwrap().to_string();
    assert!(summary.starts_with("physics mesh: 2 sub meshes, 2 triangles"));
}

#[test]
fn config_file_is_loaded() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("export.json");
    fs::write(&path, r#"{ "name_mode": "material", "divide_grid": false }"#).unwrap();
    let config = ExportConfig::load(&path).unwrap();
    assert_eq!(config.name_mode, NameMode::Material);
    assert!(!config.divide_grid);

    assert!(ExportConfig::load(&dir.path().join("missing.json")).is_err());
}

#[test]
fn obj_materials_are_read_from_the_library_beside_it() {
    let dir = tempdir().expect("Failed to create temp dir");
    let obj_path = dir.path().join("canopy.obj");
    let mesh_path = dir.path().join("canopy.mesh");
    fs::write(
        &obj_path,
        "mtllib canopy.mtl\no canopy\nv 0 0 0\nv 1 0 0\nv 0 1 0\nusemtl MATERIALglass\nf 1 2 3\n",
    )
    .unwrap();
    fs::write(dir.path().join("canopy.mtl"), "newmtl MATERIALglass\nKd 0 1 0\nd 0.25\n").unwrap();

    let config = ExportConfig { name_mode: NameMode::Material, ..ExportConfig::default() };
    obj_file_to_mesh(&obj_path, &mesh_path, &config).unwrap();
    let mesh = parse_mesh(&fs::read(&mesh_path).unwrap(), ParseOptions::strict()).unwrap();
    assert_eq!(mesh.submeshes[0].shader(), Some(ShaderKind::Glass));
    assert_eq!(mesh.submeshes[0].name, "MATERIALglass");
    assert_eq!(mesh.vertices[0].color, Color4::new(0, 255, 0, 64));

    fs::remove_file(dir.path().join("canopy.mtl")).unwrap();
    obj_file_to_mesh(&obj_path, &mesh_path, &config).unwrap();
    let mesh = parse_mesh(&fs::read(&mesh_path).unwrap(), ParseOptions::strict()).unwrap();
    assert_eq!(mesh.vertices[0].color, stormworks_mesh::materials::GLASS_COLOR);
}

#[test]
fn lenient_inspect_reads_unknown_magic_by_extension() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("damaged.phys");
    let mut bytes = serialize_physics_mesh(&PhysicsMesh::default()).unwrap();
    bytes[0] = b'x';
    fs::write(&path, &bytes).unwrap();

    assert!(inspect_file(&path, ParseOptions::strict()).is_err());
    let asset = inspect_file(&path, ParseOptions::lenient()).unwrap();
    assert_eq!(asset.kind(), FileKind::Physics);
}
