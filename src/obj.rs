//! Wavefront OBJ interchange for the codec aggregates.
//!
//! Output positions and normals are in the host's `(x, z, y)` convention;
//! vertex colors are appended to `v` lines as unit floats. Special-shader
//! submeshes are written as separate objects whose name ends in the
//! shader's material name, and their faces use that material.
//!
//! On the way back in, a face's material decides its shader, color and
//! (with [`NameMode::Material`]) submesh name; the object name suffix is
//! the fallback for faces without a special material.

use crate::anim::AnimFile;
use crate::builder::{Grid, MeshBuilder, build_physics_mesh};
use crate::coords::{from_host, to_host};
use crate::error::{MeshError, Result, argument_err};
use crate::materials::{Material, MaterialTable, shader_color};
use crate::mesh::{Mesh, MeshVertex, ShaderKind};
use crate::phys::PhysicsMesh;
use crate::types::{Color4, Vec3, VertexLike};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write as FmtWrite};

/// Which name an exported submesh carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum NameMode {
    #[default]
    None,
    Object,
    Material,
}

/// OBJ text plus the MTL library it refers to.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjDocument {
    pub obj: String,
    pub mtl: String,
}

struct ObjWriter {
    out: String,
    mtllib: Option<String>,
    vertex_base: usize,
}

impl ObjWriter {
    fn new(mtllib: Option<&str>) -> Result<Self> {
        let mut writer = Self { out: String::new(), mtllib: mtllib.map(str::to_owned), vertex_base: 0 };
        if let Some(lib) = &writer.mtllib {
            fmt_ok(writeln!(&mut writer.out, "mtllib {}", lib))?;
        }
        Ok(writer)
    }

    fn object(&mut self, name: &str) -> Result<()> {
        fmt_ok(writeln!(&mut self.out, "o {}", name))
    }

    fn vertex(&mut self, position: Vec3, color: Option<Color4>) -> Result<()> {
        let [x, y, z] = to_host(position);
        match color {
            Some(color) => {
                let [r, g, b, _] = color.to_unit();
                fmt_ok(writeln!(&mut self.out, "v {:.6} {:.6} {:.6} {:.6} {:.6} {:.6}", x, y, z, r, g, b))
            }
            None => fmt_ok(writeln!(&mut self.out, "v {:.6} {:.6} {:.6}", x, y, z)),
        }
    }

    fn normal(&mut self, normal: Vec3) -> Result<()> {
        let [x, y, z] = to_host(normal);
        fmt_ok(writeln!(&mut self.out, "vn {:.6} {:.6} {:.6}", x, y, z))
    }

    /// Writes faces over the last `count` vertices, switching material
    /// whenever it changes between triangles.
    fn faces(&mut self, count: usize, indices: &[u32], materials: &[(usize, &str)], with_normals: bool) -> Result<()> {
        let mut current = None;
        for (triangle, &(material, name)) in indices.chunks_exact(3).zip(materials) {
            if self.mtllib.is_some() && current != Some(material) {
                fmt_ok(writeln!(&mut self.out, "usemtl {}", name))?;
                current = Some(material);
            }
            let [a, b, c] = [triangle[0], triangle[1], triangle[2]].map(|i| self.vertex_base + i as usize + 1);
            if with_normals {
                fmt_ok(writeln!(&mut self.out, "f {a}//{a} {b}//{b} {c}//{c}"))?;
            } else {
                fmt_ok(writeln!(&mut self.out, "f {a} {b} {c}"))?;
            }
        }
        self.vertex_base += count;
        Ok(())
    }

    fn finish(self) -> String {
        self.out
    }
}

fn write_colored<V: VertexLike>(
    writer: &mut ObjWriter,
    table: &mut MaterialTable,
    shader_id: u32,
    vertices: &[V],
    normals: impl Iterator<Item = Vec3>,
    indices: &[u32],
) -> Result<()> {
    if let Some(&bad) = indices.iter().find(|&&i| i as usize >= vertices.len()) {
        return Err(argument_err(format!("index {} is out of range for {} vertices", bad, vertices.len())));
    }
    for vertex in vertices {
        writer.vertex(vertex.position(), Some(vertex.color()))?;
    }
    for normal in normals {
        writer.normal(normal)?;
    }
    let assigned = table.assign(shader_id, vertices, indices)?;
    let names: Vec<(usize, String)> = assigned
        .iter()
        .map(|&m| (m, table.materials()[m].name.clone()))
        .collect();
    let refs: Vec<(usize, &str)> = names.iter().map(|(m, n)| (*m, n.as_str())).collect();
    writer.faces(vertices.len(), indices, &refs, true)
}

fn object_name(base: &str, shader: Option<ShaderKind>) -> String {
    match shader.and_then(ShaderKind::material_name) {
        Some(material) => format!("{}_{}", base, material),
        None => base.to_string(),
    }
}

pub fn mesh_to_obj(mesh: &Mesh, name: &str, mtllib: Option<&str>) -> Result<ObjDocument> {
    let mut writer = ObjWriter::new(mtllib)?;
    let mut table = MaterialTable::new(name);

    for submesh in &mesh.submeshes {
        let (vertices, indices) = mesh.submesh_geometry(submesh)?;
        if indices.is_empty() {
            continue;
        }
        writer.object(&object_name(name, submesh.shader()))?;
        let normals = vertices.iter().map(|v| v.normal);
        write_colored(&mut writer, &mut table, submesh.shader_id as u32, &vertices, normals, &indices)?;
    }

    Ok(ObjDocument { obj: writer.finish(), mtl: materials_to_mtl(table.materials())? })
}

pub fn anim_to_obj(anim: &AnimFile, name: &str, mtllib: Option<&str>) -> Result<ObjDocument> {
    let mut writer = ObjWriter::new(mtllib)?;
    let mut table = MaterialTable::new(name);

    for mesh in &anim.meshes {
        let shader = u16::try_from(mesh.shader_id).ok().and_then(ShaderKind::from_id);
        writer.object(&object_name(name, shader))?;
        let normals = mesh.vertices.iter().map(|v| v.normal);
        write_colored(&mut writer, &mut table, mesh.shader_id, &mesh.vertices, normals, &mesh.indices)?;
    }

    Ok(ObjDocument { obj: writer.finish(), mtl: materials_to_mtl(table.materials())? })
}

pub fn physics_to_obj(phys: &PhysicsMesh, name: &str) -> Result<ObjDocument> {
    let mut writer = ObjWriter::new(None)?;
    let single = phys.sub_meshes.len() == 1;

    for (i, sub) in phys.sub_meshes.iter().enumerate() {
        if single {
            writer.object(name)?;
        } else {
            writer.object(&format!("{}_{:02}", name, i))?;
        }
        for &vertex in &sub.vertices {
            writer.vertex(vertex, None)?;
        }
        let triangles = sub.vertices.len() / 3;
        let indices: Vec<u32> = (0..triangles as u32 * 3).collect();
        let materials = vec![(0, ""); triangles];
        writer.faces(sub.vertices.len(), &indices, &materials, false)?;
    }

    Ok(ObjDocument { obj: writer.finish(), mtl: String::new() })
}

pub fn materials_to_mtl(materials: &[Material]) -> Result<String> {
    let mut out = String::new();
    for material in materials {
        let [r, g, b, a] = material.color.to_unit();
        fmt_ok(writeln!(&mut out, "newmtl {}", material.name))?;
        fmt_ok(writeln!(&mut out, "Kd {:.6} {:.6} {:.6}", r, g, b))?;
        fmt_ok(writeln!(&mut out, "d {:.6}", a))?;
        fmt_ok(writeln!(&mut out))?;
    }
    Ok(out)
}

/// A triangle read from an OBJ file, already in game coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjTriangle {
    pub object: String,
    /// Name of the material the face uses, if any.
    pub material: Option<String>,
    pub shader: ShaderKind,
    pub positions: [Vec3; 3],
    /// Per-corner vertex colors, when the OBJ carries them.
    pub colors: Option<[Color4; 3]>,
    /// Diffuse color and dissolve of the face's material.
    pub material_color: Option<Color4>,
    pub normal: Vec3,
}

impl ObjTriangle {
    /// Color every corner is exported with: the material's base color if
    /// set, else vertex colors on opaque faces, else the shader's tint.
    pub fn corner_colors(&self) -> [Color4; 3] {
        if let Some(color) = self.material_color {
            return [color; 3];
        }
        match (self.shader, self.colors) {
            (ShaderKind::Opaque, Some(colors)) => colors,
            (shader, _) => [shader_color(shader); 3],
        }
    }
}

/// Distinct arguments of every `directive` line, in first-use order.
fn directive_values(obj_data: &[u8], directive: &str) -> Vec<String> {
    let mut values: Vec<String> = Vec::new();
    for line in obj_data.split(|&b| b == b'\n') {
        let Ok(line) = std::str::from_utf8(line) else {
            continue;
        };
        let Some((keyword, value)) = line.trim().split_once(char::is_whitespace) else {
            continue;
        };
        let value = value.trim();
        if keyword == directive && !value.is_empty() && !values.iter().any(|v| v == value) {
            values.push(value.to_string());
        }
    }
    values
}

/// File names the OBJ lists with `mtllib`.
pub fn material_libraries(obj_data: &[u8]) -> Vec<String> {
    directive_values(obj_data, "mtllib")
}

/// Reads triangulated faces; `mtl_data` is the text of the material
/// library the OBJ names with `mtllib`. Materials used but not defined
/// there still resolve by name, without a color.
pub fn read_obj_triangles(obj_data: &[u8], mtl_data: Option<&[u8]>) -> Result<Vec<ObjTriangle>> {
    let used = directive_values(obj_data, "usemtl");
    let (models, materials) = tobj::load_obj_buf(
        &mut obj_data.as_ref(),
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
        |_| {
            let (mut materials, mut by_name): (Vec<tobj::Material>, _) = match mtl_data {
                Some(mtl) => tobj::load_mtl_buf(&mut mtl.as_ref())?,
                None => Default::default(),
            };
            for name in &used {
                if !by_name.contains_key(name) {
                    by_name.insert(name.clone(), materials.len());
                    materials.push(tobj::Material { name: name.clone(), ..Default::default() });
                }
            }
            Ok((materials, by_name))
        },
    )?;
    let materials = materials.unwrap_or_else(|err| {
        tracing::warn!("ignoring material library: {}", err);
        Vec::new()
    });

    let mut triangles = Vec::new();
    for model in models {
        let mesh = &model.mesh;
        let material = mesh.material_id.and_then(|id| materials.get(id));
        let shader = match material.map(|m| ShaderKind::from_material_name(&m.name)) {
            Some(shader) if shader != ShaderKind::Opaque => shader,
            _ => ShaderKind::from_material_name(&model.name),
        };
        let material_color = material.and_then(|m| {
            let [r, g, b] = m.diffuse?;
            Some(Color4::from_unit([r, g, b, m.dissolve.unwrap_or(1.0)]))
        });
        let has_colors = mesh.vertex_color.len() == mesh.positions.len();

        for face in mesh.indices.chunks_exact(3) {
            let mut host = [[0.0f32; 3]; 3];
            let mut colors = [Color4::WHITE; 3];
            for (corner, &index) in face.iter().enumerate() {
                let base = index as usize * 3;
                let position = mesh
                    .positions
                    .get(base..base + 3)
                    .ok_or_else(|| MeshError::Argument(format!("obj index {} has no position", index)))?;
                host[corner] = [position[0], position[1], position[2]];
                if has_colors {
                    let c = &mesh.vertex_color[base..base + 3];
                    colors[corner] = Color4::from_unit([c[0], c[1], c[2], 1.0]);
                }
            }

            let [a, b, c] = host.map(Vec3::from);
            let host_normal = b.sub(a).cross(c.sub(a)).normalized();
            triangles.push(ObjTriangle {
                object: model.name.clone(),
                material: material.map(|m| m.name.clone()),
                shader,
                positions: host.map(from_host),
                colors: has_colors.then_some(colors),
                material_color,
                normal: from_host(host_normal.to_array()),
            });
        }
    }

    tracing::debug!("read {} triangles from obj", triangles.len());
    Ok(triangles)
}

/// Packs OBJ faces into a mesh, one submesh per shader.
pub fn obj_to_mesh(obj_data: &[u8], mtl_data: Option<&[u8]>, name_mode: NameMode) -> Result<Mesh> {
    let triangles = read_obj_triangles(obj_data, mtl_data)?;
    if triangles.is_empty() {
        return Err(MeshError::Argument("obj file contains no faces".to_string()));
    }

    let mut builder = MeshBuilder::new();
    for triangle in triangles {
        let shader_id = triangle.shader.id();
        let colors = triangle.corner_colors();
        let corners = [0, 1, 2].map(|i| MeshVertex::new(triangle.positions[i], colors[i], triangle.normal));
        builder.add_triangle(shader_id, corners)?;

        match name_mode {
            NameMode::None => {}
            NameMode::Object => builder.set_name(shader_id, triangle.object)?,
            NameMode::Material => {
                let name = triangle.material.or_else(|| triangle.shader.material_name().map(str::to_owned));
                if let Some(name) = name {
                    builder.set_name(shader_id, name)?;
                }
            }
        }
    }
    builder.build()
}

pub fn obj_to_physics(obj_data: &[u8], grid: Option<&Grid>) -> Result<PhysicsMesh> {
    let triangles: Vec<[Vec3; 3]> = read_obj_triangles(obj_data, None)?
        .into_iter()
        .map(|t| t.positions)
        .collect();
    build_physics_mesh(&triangles, grid)
}

fn fmt_ok(result: fmt::Result) -> Result<()> {
    result.map_err(|_| MeshError::Argument("failed to format obj output".to_string()))
}
