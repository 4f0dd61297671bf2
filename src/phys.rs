//! Physics mesh format (`.phys`).
//!
//! ```text
//! "phys"
//! u16 x2            2, sub_mesh_count
//! per sub mesh:
//!   u16 vertex_count, Vec3 x vertex_count
//!   u16 index_count,  u32 x index_count
//! ```
//!
//! Triangles are implied by vertex order; the index array is carried
//! through untouched.

use crate::codec::{ByteReader, ByteWriter, count_as};
use crate::error::Result;
use crate::options::ParseOptions;
use crate::types::Vec3;

pub const PHYS_MAGIC: &[u8; 4] = b"phys";
const HEADER_0: u16 = 2;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SubPhysMesh {
    pub vertices: Vec<Vec3>,
    pub indices: Vec<u32>,
}

impl SubPhysMesh {
    pub fn from_vertices(vertices: Vec<Vec3>) -> Self {
        Self { vertices, indices: Vec::new() }
    }

    /// Consecutive vertex triples; a trailing partial triple is dropped.
    pub fn triangles(&self) -> impl Iterator<Item = [Vec3; 3]> + '_ {
        self.vertices.chunks_exact(3).map(|t| [t[0], t[1], t[2]])
    }

    fn read(reader: &mut ByteReader<'_>) -> Result<Self> {
        let vertex_count = reader.read_u16("sub_phys.vertex_count")? as usize;
        let mut vertices = Vec::with_capacity(vertex_count.min(reader.remaining() / 12));
        for _ in 0..vertex_count {
            vertices.push(Vec3::read(reader, "sub_phys.vertex")?);
        }

        let index_count = reader.read_u16("sub_phys.index_count")? as usize;
        let mut indices = Vec::with_capacity(index_count.min(reader.remaining() / 4));
        for _ in 0..index_count {
            indices.push(reader.read_u32("sub_phys.index")?);
        }

        Ok(Self { vertices, indices })
    }

    fn write(&self, writer: &mut ByteWriter) -> Result<()> {
        writer.write_u16(count_as("physics vertex count", self.vertices.len())?)?;
        for vertex in &self.vertices {
            vertex.write(writer)?;
        }
        writer.write_u16(count_as("physics index count", self.indices.len())?)?;
        for &index in &self.indices {
            writer.write_u32(index)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PhysicsMesh {
    pub sub_meshes: Vec<SubPhysMesh>,
}

impl PhysicsMesh {
    pub fn triangle_count(&self) -> usize {
        self.sub_meshes.iter().map(|s| s.vertices.len() / 3).sum()
    }
}

pub fn parse_physics_mesh(data: &[u8], opts: ParseOptions) -> Result<PhysicsMesh> {
    let mut reader = ByteReader::new(data);
    opts.expect_magic(&mut reader, PHYS_MAGIC)?;

    let h0 = reader.read_u16("header[0]")?;
    opts.check_eq("header[0]", HEADER_0, h0)?;
    let count = reader.read_u16("sub_mesh_count")?;

    let mut sub_meshes = Vec::with_capacity(count as usize);
    for _ in 0..count {
        sub_meshes.push(SubPhysMesh::read(&mut reader)?);
    }

    tracing::debug!("parsed physics mesh: {} sub meshes", sub_meshes.len());
    Ok(PhysicsMesh { sub_meshes })
}

pub fn serialize_physics_mesh(mesh: &PhysicsMesh) -> Result<Vec<u8>> {
    let mut writer = ByteWriter::new();
    writer.write_bytes(PHYS_MAGIC)?;
    writer.write_u16(HEADER_0)?;
    writer.write_u16(count_as("physics sub mesh count", mesh.sub_meshes.len())?)?;
    for sub in &mesh.sub_meshes {
        sub.write(&mut writer)?;
    }
    Ok(writer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, MeshError};

    fn sample() -> PhysicsMesh {
        PhysicsMesh {
            sub_meshes: vec![
                SubPhysMesh::from_vertices(vec![
                    Vec3::new(0.0, 0.0, 0.0),
                    Vec3::new(1.0, 0.0, 0.0),
                    Vec3::new(0.0, 1.0, 0.0),
                ]),
                SubPhysMesh { vertices: vec![Vec3::new(5.0, 5.0, 5.0)], indices: vec![0, 42] },
            ],
        }
    }

    #[test]
    fn round_trip_preserves_unused_indices() {
        let phys = sample();
        let bytes = serialize_physics_mesh(&phys).unwrap();
        assert_eq!(&bytes[..8], &[b'p', b'h', b'y', b's', 2, 0, 2, 0]);
        let parsed = parse_physics_mesh(&bytes, ParseOptions::strict()).unwrap();
        assert_eq!(parsed, phys);
        assert_eq!(parsed.sub_meshes[1].indices, vec![0, 42]);
    }

    #[test]
    fn header_version_is_strict_only() {
        let mut bytes = serialize_physics_mesh(&sample()).unwrap();
        bytes[4] = 3;
        let err = parse_physics_mesh(&bytes, ParseOptions::strict()).unwrap_err();
        assert!(matches!(err, MeshError::FormatViolation { field: "header[0]", .. }));
        assert_eq!(parse_physics_mesh(&bytes, ParseOptions::lenient()).unwrap(), sample());
    }

    #[test]
    fn wrong_magic_fails_strict() {
        let mut bytes = serialize_physics_mesh(&sample()).unwrap();
        bytes[..4].copy_from_slice(b"mesh");
        let err = parse_physics_mesh(&bytes, ParseOptions::strict()).unwrap_err();
        assert!(matches!(err, MeshError::FormatViolation { field: "magic", .. }));
    }

    #[test]
    fn truncation_fails_in_both_modes() {
        let bytes = serialize_physics_mesh(&sample()).unwrap();
        let cut = &bytes[..bytes.len() - 3];
        for opts in [ParseOptions::strict(), ParseOptions::lenient()] {
            assert_eq!(parse_physics_mesh(cut, opts).unwrap_err().kind(), ErrorKind::Truncated);
        }
    }

    #[test]
    fn triangles_are_vertex_triples() {
        let mut sub = sample().sub_meshes.remove(0);
        sub.vertices.push(Vec3::ONE);
        let triangles: Vec<_> = sub.triangles().collect();
        assert_eq!(triangles.len(), 1);
        assert_eq!(triangles[0][1], Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(sample().triangle_count(), 1);
    }
}
