//! Static mesh format (`.mesh`).
//!
//! ```text
//! "mesh"
//! u16 x5            7, 1, vertex_count, 19, 0
//! MeshVertex x vertex_count          (28 bytes each)
//! u32               index_count      (multiple of 3)
//! u16 x index_count                  (each < vertex_count)
//! u16               submesh_count
//! SubMesh x submesh_count
//! u16               0
//! ```

use crate::codec::{ByteReader, ByteWriter, count_as};
use crate::error::{Result, argument_err};
use crate::options::ParseOptions;
use crate::types::{Color4, Vec3, VertexLike};
use std::collections::BTreeMap;

pub const MESH_MAGIC: &[u8; 4] = b"mesh";
const HEADER_0: u16 = 7;
const HEADER_1: u16 = 1;
const HEADER_3: u16 = 19;
const HEADER_4: u16 = 0;
const TRAILER: u16 = 0;
pub const MESH_VERTEX_SIZE: usize = 28;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MeshVertex {
    pub position: Vec3,
    pub color: Color4,
    pub normal: Vec3,
}

impl MeshVertex {
    pub fn new(position: Vec3, color: Color4, normal: Vec3) -> Self {
        Self { position, color, normal }
    }

    fn read(reader: &mut ByteReader<'_>) -> Result<Self> {
        let position = Vec3::read(reader, "vertex.position")?;
        let color = Color4::read(reader, "vertex.color")?;
        let normal = Vec3::read(reader, "vertex.normal")?;
        Ok(Self { position, color, normal })
    }

    fn write(&self, writer: &mut ByteWriter) -> Result<()> {
        self.position.write(writer)?;
        self.color.write(writer)?;
        self.normal.write(writer)
    }

    /// Exact bit pattern of the record, for de-duplication.
    pub(crate) fn key(&self) -> ([u32; 3], Color4, [u32; 3]) {
        (self.position.bits(), self.color, self.normal.bits())
    }
}

impl VertexLike for MeshVertex {
    fn position(&self) -> Vec3 {
        self.position
    }

    fn color(&self) -> Color4 {
        self.color
    }
}

/// Render pass a submesh is drawn with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShaderKind {
    Opaque,
    Glass,
    Additive,
    Lava,
}

impl ShaderKind {
    pub const ALL: [ShaderKind; 4] = [ShaderKind::Opaque, ShaderKind::Glass, ShaderKind::Additive, ShaderKind::Lava];

    pub fn from_id(id: u16) -> Option<Self> {
        match id {
            0 => Some(ShaderKind::Opaque),
            1 => Some(ShaderKind::Glass),
            2 => Some(ShaderKind::Additive),
            3 => Some(ShaderKind::Lava),
            _ => None,
        }
    }

    pub fn id(self) -> u16 {
        self as u16
    }

    /// Material name the game's editor associates with the shader.
    pub fn material_name(self) -> Option<&'static str> {
        match self {
            ShaderKind::Opaque => None,
            ShaderKind::Glass => Some("MATERIALglass"),
            ShaderKind::Additive => Some("MATERIALadditive"),
            ShaderKind::Lava => Some("MATERIALlava"),
        }
    }

    pub fn from_material_name(name: &str) -> Self {
        ShaderKind::ALL
            .into_iter()
            .find(|kind| kind.material_name().is_some_and(|m| name.ends_with(m)))
            .unwrap_or(ShaderKind::Opaque)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubMesh {
    pub index_start: u32,
    pub index_count: u32,
    pub shader_id: u16,
    pub bounds_min: Vec3,
    pub bounds_max: Vec3,
    pub name: String,
}

impl SubMesh {
    pub fn shader(&self) -> Option<ShaderKind> {
        ShaderKind::from_id(self.shader_id)
    }

    pub fn index_range(&self) -> std::ops::Range<usize> {
        let start = self.index_start as usize;
        start..start + self.index_count as usize
    }

    fn read(reader: &mut ByteReader<'_>, opts: &ParseOptions) -> Result<Self> {
        let index_start = reader.read_u32("submesh.index_start")?;
        let index_count = reader.read_u32("submesh.index_count")?;
        opts.check("submesh.index_count", index_count % 3 == 0, "a multiple of 3", index_count)?;

        let reserved = reader.read_u16("submesh.reserved_0")?;
        opts.check_eq("submesh.reserved_0", 0, reserved)?;
        let shader_id = reader.read_u16("submesh.shader_id")?;
        opts.check("submesh.shader_id", shader_id <= 3, "a value in 0..=3", shader_id)?;

        let bounds_min = Vec3::read(reader, "submesh.bounds_min")?;
        let bounds_max = Vec3::read(reader, "submesh.bounds_max")?;

        let reserved = reader.read_u16("submesh.reserved_1")?;
        opts.check_eq("submesh.reserved_1", 0, reserved)?;
        let name = reader.read_string("submesh.name")?;

        let trailer = Vec3::read(reader, "submesh.trailer")?;
        opts.check("submesh.trailer", trailer == Vec3::ONE, "(1, 1, 1)", format_vec(trailer))?;

        Ok(Self { index_start, index_count, shader_id, bounds_min, bounds_max, name })
    }

    fn write(&self, writer: &mut ByteWriter) -> Result<()> {
        writer.write_u32(self.index_start)?;
        writer.write_u32(self.index_count)?;
        writer.write_u16(0)?;
        writer.write_u16(self.shader_id)?;
        self.bounds_min.write(writer)?;
        self.bounds_max.write(writer)?;
        writer.write_u16(0)?;
        writer.write_string("submesh.name", &self.name)?;
        Vec3::ONE.write(writer)
    }
}

fn format_vec(v: Vec3) -> String {
    format!("({}, {}, {})", v.x, v.y, v.z)
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Mesh {
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u16>,
    pub submeshes: Vec<SubMesh>,
}

impl Mesh {
    /// Builds a mesh, enforcing the same invariants as a strict parse.
    pub fn new(vertices: Vec<MeshVertex>, indices: Vec<u16>, submeshes: Vec<SubMesh>) -> Result<Self> {
        let mesh = Self { vertices, indices, submeshes };
        mesh.validate(&ParseOptions::strict())?;
        Ok(mesh)
    }

    fn validate(&self, opts: &ParseOptions) -> Result<()> {
        opts.check(
            "vertex_count",
            self.vertices.len() <= u16::MAX as usize,
            "at most 65535",
            self.vertices.len(),
        )?;
        opts.check("index_count", self.indices.len() % 3 == 0, "a multiple of 3", self.indices.len())?;
        let vertex_count = self.vertices.len();
        if let Some(&bad) = self.indices.iter().find(|&&i| i as usize >= vertex_count) {
            opts.check("index", false, format!("an index below {}", vertex_count), bad)?;
        }
        for submesh in &self.submeshes {
            check_submesh_range(opts, submesh, self.indices.len())?;
        }
        Ok(())
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Vertices referenced by `submesh`, compacted, with indices remapped
    /// into the compacted list.
    pub fn submesh_geometry(&self, submesh: &SubMesh) -> Result<(Vec<MeshVertex>, Vec<u32>)> {
        let indices = self.indices.get(submesh.index_range()).ok_or_else(|| {
            argument_err(format!(
                "submesh '{}' range {:?} exceeds {} indices",
                submesh.name,
                submesh.index_range(),
                self.indices.len()
            ))
        })?;

        let mut local: BTreeMap<u16, u32> = indices.iter().map(|&i| (i, 0)).collect();
        let mut vertices = Vec::with_capacity(local.len());
        for (next, (&global, slot)) in local.iter_mut().enumerate() {
            let vertex = self
                .vertices
                .get(global as usize)
                .ok_or_else(|| argument_err(format!("index {} is out of range for {} vertices", global, self.vertices.len())))?;
            vertices.push(*vertex);
            *slot = next as u32;
        }

        let remapped = indices.iter().map(|i| local[i]).collect();
        Ok((vertices, remapped))
    }
}

fn check_submesh_range(opts: &ParseOptions, submesh: &SubMesh, index_count: usize) -> Result<()> {
    opts.check("submesh.index_count", submesh.index_count % 3 == 0, "a multiple of 3", submesh.index_count)?;
    let end = submesh.index_start as u64 + submesh.index_count as u64;
    opts.check(
        "submesh.index_range",
        end <= index_count as u64,
        format!("a range within 0..{}", index_count),
        format!("{}..{}", submesh.index_start, end),
    )
}

pub fn parse_mesh(data: &[u8], opts: ParseOptions) -> Result<Mesh> {
    let mut reader = ByteReader::new(data);
    opts.expect_magic(&mut reader, MESH_MAGIC)?;

    let h0 = reader.read_u16("header[0]")?;
    opts.check_eq("header[0]", HEADER_0, h0)?;
    let h1 = reader.read_u16("header[1]")?;
    opts.check_eq("header[1]", HEADER_1, h1)?;
    let vertex_count = reader.read_u16("vertex_count")? as usize;
    let h3 = reader.read_u16("header[3]")?;
    opts.check_eq("header[3]", HEADER_3, h3)?;
    let h4 = reader.read_u16("header[4]")?;
    opts.check_eq("header[4]", HEADER_4, h4)?;

    let mut vertices = Vec::with_capacity(vertex_count.min(reader.remaining() / MESH_VERTEX_SIZE));
    for _ in 0..vertex_count {
        vertices.push(MeshVertex::read(&mut reader)?);
    }

    let index_count = reader.read_u32("index_count")? as usize;
    opts.check("index_count", index_count % 3 == 0, "a multiple of 3", index_count)?;
    let mut indices = Vec::with_capacity(index_count.min(reader.remaining() / 2));
    let mut out_of_range = 0usize;
    for _ in 0..index_count {
        let index = reader.read_u16("index")?;
        if index as usize >= vertex_count {
            opts.check("index", false, format!("an index below {}", vertex_count), index)?;
            out_of_range += 1;
        }
        indices.push(index);
    }

    let submesh_count = reader.read_u16("submesh_count")?;
    let mut submeshes = Vec::with_capacity(submesh_count as usize);
    for _ in 0..submesh_count {
        let submesh = SubMesh::read(&mut reader, &opts)?;
        check_submesh_range(&opts, &submesh, indices.len())?;
        submeshes.push(submesh);
    }

    let trailer = reader.read_u16("trailer")?;
    opts.check_eq("trailer", TRAILER, trailer)?;

    if out_of_range > 0 {
        tracing::warn!("mesh has {} indices outside of {} vertices", out_of_range, vertex_count);
    }
    tracing::debug!(
        "parsed mesh: {} vertices, {} indices, {} submeshes",
        vertices.len(),
        indices.len(),
        submeshes.len()
    );

    Ok(Mesh { vertices, indices, submeshes })
}

pub fn serialize_mesh(mesh: &Mesh) -> Result<Vec<u8>> {
    let mut writer = ByteWriter::with_capacity(
        20 + mesh.vertices.len() * MESH_VERTEX_SIZE + mesh.indices.len() * 2 + mesh.submeshes.len() * 64,
    );
    writer.write_bytes(MESH_MAGIC)?;

    writer.write_u16(HEADER_0)?;
    writer.write_u16(HEADER_1)?;
    writer.write_u16(count_as("vertex count", mesh.vertices.len())?)?;
    writer.write_u16(HEADER_3)?;
    writer.write_u16(HEADER_4)?;

    for vertex in &mesh.vertices {
        vertex.write(&mut writer)?;
    }

    writer.write_u32(count_as("index count", mesh.indices.len())?)?;
    for &index in &mesh.indices {
        writer.write_u16(index)?;
    }

    writer.write_u16(count_as("submesh count", mesh.submeshes.len())?)?;
    for submesh in &mesh.submeshes {
        submesh.write(&mut writer)?;
    }

    writer.write_u16(TRAILER)?;
    Ok(writer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, MeshError};

    fn vertex(x: f32) -> MeshVertex {
        MeshVertex::new(Vec3::new(x, 0.0, 0.0), Color4::new(255, 0, 0, 255), Vec3::new(0.0, 0.0, 1.0))
    }

    fn sample_mesh() -> Mesh {
        Mesh {
            vertices: vec![vertex(0.0), vertex(1.0), vertex(2.0)],
            indices: vec![0, 1, 2, 2, 1, 0],
            submeshes: vec![
                SubMesh {
                    index_start: 0,
                    index_count: 3,
                    shader_id: 0,
                    bounds_min: Vec3::ZERO,
                    bounds_max: Vec3::new(2.0, 0.0, 0.0),
                    name: "hull".to_string(),
                },
                SubMesh {
                    index_start: 3,
                    index_count: 3,
                    shader_id: 1,
                    bounds_min: Vec3::ZERO,
                    bounds_max: Vec3::new(2.0, 0.0, 0.0),
                    name: String::new(),
                },
            ],
        }
    }

    #[test]
    fn vertex_record_is_28_bytes() {
        let mut writer = ByteWriter::new();
        vertex(1.0).write(&mut writer).unwrap();
        assert_eq!(writer.len(), MESH_VERTEX_SIZE);
    }

    #[test]
    fn round_trip_is_identity() {
        let mesh = sample_mesh();
        let bytes = serialize_mesh(&mesh).unwrap();
        let parsed = parse_mesh(&bytes, ParseOptions::strict()).unwrap();
        assert_eq!(parsed, mesh);
        assert_eq!(serialize_mesh(&parsed).unwrap(), bytes);
    }

    #[test]
    fn submesh_reserved_fields_are_canonical() {
        let bytes = serialize_mesh(&sample_mesh()).unwrap();
        // first submesh starts after magic, header, 3 vertices, index count, 6 indices, submesh count
        let start = 4 + 10 + 3 * MESH_VERTEX_SIZE + 4 + 12 + 2;
        let sub = &bytes[start..];
        assert_eq!(&sub[8..10], &[0, 0]);
        let name_field = 12 + 24;
        assert_eq!(&sub[name_field..name_field + 2], &[0, 0]);
        assert_eq!(&sub[name_field + 2..name_field + 4], &[4, 0]);
        let trailer = name_field + 4 + 4;
        assert_eq!(&sub[trailer..trailer + 4], &1.0f32.to_le_bytes());
    }

    #[test]
    fn strict_rejects_out_of_range_index() {
        let mut mesh = sample_mesh();
        mesh.indices[4] = 7;
        let bytes = serialize_mesh(&mesh).unwrap();
        let err = parse_mesh(&bytes, ParseOptions::strict()).unwrap_err();
        assert!(matches!(err, MeshError::FormatViolation { field: "index", .. }));

        let lenient = parse_mesh(&bytes, ParseOptions::lenient()).unwrap();
        assert_eq!(lenient.indices[4], 7);
    }

    #[test]
    fn strict_rejects_bad_shader_and_reserved_values() {
        let mut mesh = sample_mesh();
        mesh.submeshes[0].shader_id = 4;
        let bytes = serialize_mesh(&mesh).unwrap();
        let err = parse_mesh(&bytes, ParseOptions::strict()).unwrap_err();
        assert!(matches!(err, MeshError::FormatViolation { field: "submesh.shader_id", .. }));
        assert_eq!(parse_mesh(&bytes, ParseOptions::lenient()).unwrap().submeshes[0].shader_id, 4);

        let mut bytes = serialize_mesh(&sample_mesh()).unwrap();
        let last = bytes.len() - 2;
        bytes[last] = 1;
        let err = parse_mesh(&bytes, ParseOptions::strict()).unwrap_err();
        assert!(matches!(err, MeshError::FormatViolation { field: "trailer", .. }));
    }

    #[test]
    fn strict_checks_each_fixed_field() {
        let sub = 4 + 10 + 3 * MESH_VERTEX_SIZE + 4 + 12 + 2;
        let cases = [
            (0, "magic"),
            (4, "header[0]"),
            (6, "header[1]"),
            (10, "header[3]"),
            (12, "header[4]"),
            (sub + 8, "submesh.reserved_0"),
            (sub + 36, "submesh.reserved_1"),
            (sub + 44, "submesh.trailer"),
        ];
        for (offset, expected_field) in cases {
            let mut bytes = serialize_mesh(&sample_mesh()).unwrap();
            bytes[offset] = bytes[offset].wrapping_add(1);
            let err = parse_mesh(&bytes, ParseOptions::strict()).unwrap_err();
            assert!(
                matches!(err, MeshError::FormatViolation { field, .. } if field == expected_field),
                "{}: {:?}",
                expected_field,
                err
            );
            let lenient = parse_mesh(&bytes, ParseOptions::lenient()).unwrap();
            assert_eq!(lenient.vertices, sample_mesh().vertices, "{}", expected_field);
        }
    }

    #[test]
    fn invalid_submesh_name_fails_to_decode() {
        let mut bytes = serialize_mesh(&sample_mesh()).unwrap();
        // first byte of "hull"
        let name = 4 + 10 + 3 * MESH_VERTEX_SIZE + 4 + 12 + 2 + 40;
        bytes[name] = 0xff;
        for opts in [ParseOptions::strict(), ParseOptions::lenient()] {
            let err = parse_mesh(&bytes, opts).unwrap_err();
            assert!(matches!(err, MeshError::Decode { field: "submesh.name", .. }));
        }
    }

    #[test]
    fn strict_rejects_submesh_range_past_index_buffer() {
        let mut mesh = sample_mesh();
        mesh.submeshes[1].index_start = 6;
        let bytes = serialize_mesh(&mesh).unwrap();
        let err = parse_mesh(&bytes, ParseOptions::strict()).unwrap_err();
        assert!(matches!(err, MeshError::FormatViolation { field: "submesh.index_range", .. }));
    }

    #[test]
    fn constructor_enforces_invariants() {
        let m = sample_mesh();
        assert!(Mesh::new(m.vertices.clone(), m.indices.clone(), m.submeshes.clone()).is_ok());
        let err = Mesh::new(m.vertices.clone(), vec![0, 1], vec![]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FormatViolation);
        let err = Mesh::new(m.vertices, vec![0, 1, 3], vec![]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FormatViolation);
        let err = Mesh::new(vec![vertex(0.0); 65536], vec![], vec![]).unwrap_err();
        assert!(matches!(err, MeshError::FormatViolation { field: "vertex_count", .. }));
    }

    #[test]
    fn submesh_geometry_compacts_vertices() {
        let mesh = Mesh {
            vertices: vec![vertex(0.0), vertex(1.0), vertex(2.0), vertex(3.0)],
            indices: vec![0, 1, 2, 3, 2, 3],
            submeshes: vec![],
        };
        let sub = SubMesh {
            index_start: 3,
            index_count: 3,
            shader_id: 0,
            bounds_min: Vec3::ZERO,
            bounds_max: Vec3::ZERO,
            name: String::new(),
        };
        let (vertices, indices) = mesh.submesh_geometry(&sub).unwrap();
        assert_eq!(vertices, vec![vertex(2.0), vertex(3.0)]);
        assert_eq!(indices, vec![1, 0, 1]);

        let out_of_bounds = SubMesh { index_start: 6, ..sub };
        assert_eq!(mesh.submesh_geometry(&out_of_bounds).unwrap_err().kind(), ErrorKind::Argument);
    }

    #[test]
    fn shader_kind_from_material_name() {
        assert_eq!(ShaderKind::from_material_name("cockpit_MATERIALglass"), ShaderKind::Glass);
        assert_eq!(ShaderKind::from_material_name("MATERIALlava"), ShaderKind::Lava);
        assert_eq!(ShaderKind::from_material_name("hull"), ShaderKind::Opaque);
        assert_eq!(ShaderKind::from_id(2).map(ShaderKind::id), Some(2));
        assert_eq!(ShaderKind::from_id(9), None);
    }
}
