use crate::anim::{ANIM_MAGIC, AnimFile, parse_anim};
use crate::error::{MeshError, Result};
use crate::mesh::{MESH_MAGIC, Mesh, parse_mesh};
use crate::options::ParseOptions;
use crate::phys::{PHYS_MAGIC, PhysicsMesh, parse_physics_mesh};
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Mesh,
    Physics,
    Anim,
}

impl FileKind {
    /// Identifies a file by its four byte magic.
    pub fn detect(data: &[u8]) -> Option<Self> {
        match data.get(..4)? {
            m if m == MESH_MAGIC => Some(FileKind::Mesh),
            m if m == PHYS_MAGIC => Some(FileKind::Physics),
            m if m == ANIM_MAGIC => Some(FileKind::Anim),
            _ => None,
        }
    }

    /// Kind conventionally stored under `path`'s extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "mesh" => Some(FileKind::Mesh),
            "phys" => Some(FileKind::Physics),
            "anim" => Some(FileKind::Anim),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            FileKind::Mesh => "mesh",
            FileKind::Physics => "phys",
            FileKind::Anim => "anim",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Asset {
    Mesh(Mesh),
    Physics(PhysicsMesh),
    Anim(AnimFile),
}

impl Asset {
    pub fn kind(&self) -> FileKind {
        match self {
            Asset::Mesh(_) => FileKind::Mesh,
            Asset::Physics(_) => FileKind::Physics,
            Asset::Anim(_) => FileKind::Anim,
        }
    }
}

/// Parses whichever of the three formats `data` starts with.
pub fn parse_asset(data: &[u8], opts: ParseOptions) -> Result<Asset> {
    parse_asset_or(data, None, opts)
}

/// Like [`parse_asset`], but when the magic is unknown and `opts` is
/// lenient the data is parsed as `fallback`.
pub fn parse_asset_or(data: &[u8], fallback: Option<FileKind>, opts: ParseOptions) -> Result<Asset> {
    let detected = FileKind::detect(data);
    let kind = match (detected, fallback) {
        (Some(kind), _) => kind,
        (None, Some(kind)) if !opts.strict => {
            tracing::warn!("unrecognised magic, reading as {}", kind.extension());
            kind
        }
        _ => {
            return Err(MeshError::FormatViolation {
                field: "magic",
                expected: "one of mesh, phys, anim".to_string(),
                actual: String::from_utf8_lossy(&data[..data.len().min(4)]).into_owned(),
            });
        }
    };
    Ok(match kind {
        FileKind::Mesh => Asset::Mesh(parse_mesh(data, opts)?),
        FileKind::Physics => Asset::Physics(parse_physics_mesh(data, opts)?),
        FileKind::Anim => Asset::Anim(parse_anim(data, opts)?),
    })
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Asset::Mesh(mesh) => {
                writeln!(f, "mesh: {} vertices, {} triangles", mesh.vertices.len(), mesh.triangle_count())?;
                for (i, sub) in mesh.submeshes.iter().enumerate() {
                    writeln!(
                        f,
                        "  submesh {}: '{}' shader {} indices {}..{}",
                        i,
                        sub.name,
                        sub.shader_id,
                        sub.index_start,
                        sub.index_start as u64 + sub.index_count as u64
                    )?;
                }
                Ok(())
            }
            Asset::Physics(phys) => {
                writeln!(f, "physics mesh: {} sub meshes, {} triangles", phys.sub_meshes.len(), phys.triangle_count())?;
                for (i, sub) in phys.sub_meshes.iter().enumerate() {
                    writeln!(f, "  sub mesh {}: {} vertices, {} indices", i, sub.vertices.len(), sub.indices.len())?;
                }
                Ok(())
            }
            Asset::Anim(anim) => {
                writeln!(
                    f,
                    "anim: {} meshes, {} bones, {} poses, {} animations, {} aux blocks",
                    anim.meshes.len(),
                    anim.bones.len(),
                    anim.poses.len(),
                    anim.animations.len(),
                    anim.aux_blocks.len()
                )?;
                for bone in &anim.bones {
                    writeln!(f, "  bone '{}' parent {} children {:?}", bone.name, bone.parent_index, bone.child_indices)?;
                }
                for animation in &anim.animations {
                    writeln!(f, "  animation '{}': {} tracks", animation.name, animation.bone_animations.len())?;
                }
                Ok(())
            }
        }
    }
}
