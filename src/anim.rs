//! Skinned animation format (`.anim`).
//!
//! ```text
//! "anim"
//! u32 x2           1, mesh_count
//! AnimMesh x mesh_count
//!   u32 151, u32 shader_id, u16 0
//!   u32 vertex_bytes (multiple of 52), AnimVertex x vertex_bytes/52
//!   u32 index_bytes (multiple of 12),  u32 x index_bytes/4
//! u32 bone_count,      Bone x bone_count
//! u32 pose_count,      Pose x pose_count
//! u32 animation_count, Animation x animation_count
//! u32 aux_count,       AuxBlock x aux_count (140 bytes each)
//! ```
//!
//! The bone set is always checked to be a single rooted tree after
//! decoding, whatever the parse options.

use crate::codec::{ByteReader, ByteWriter, count_as};
use crate::error::Result;
use crate::options::ParseOptions;
use crate::skeleton::{self, Transform};
use crate::types::{Color4, Matrix3, Quaternion, Vec3, VertexLike};

pub const ANIM_MAGIC: &[u8; 4] = b"anim";
const FILE_VERSION: u32 = 1;
const MESH_TAG: u32 = 151;
pub const ANIM_VERTEX_SIZE: usize = 52;
const INDEX_SIZE: usize = 4;
const TRIANGLE_BYTES: u32 = 12;
pub const AUX_BLOCK_SIZE: usize = 140;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AnimVertex {
    pub position: Vec3,
    pub color: Color4,
    pub uv: [f32; 2],
    pub normal: Vec3,
    /// Bone indices are integers stored as floats.
    pub bone_index_0: f32,
    pub bone_index_1: f32,
    pub bone_weight_0: f32,
    pub bone_weight_1: f32,
}

impl AnimVertex {
    fn read(reader: &mut ByteReader<'_>) -> Result<Self> {
        Ok(Self {
            position: Vec3::read(reader, "anim_vertex.position")?,
            color: Color4::read(reader, "anim_vertex.color")?,
            uv: [reader.read_f32("anim_vertex.uv")?, reader.read_f32("anim_vertex.uv")?],
            normal: Vec3::read(reader, "anim_vertex.normal")?,
            bone_index_0: reader.read_f32("anim_vertex.bone_index")?,
            bone_index_1: reader.read_f32("anim_vertex.bone_index")?,
            bone_weight_0: reader.read_f32("anim_vertex.bone_weight")?,
            bone_weight_1: reader.read_f32("anim_vertex.bone_weight")?,
        })
    }

    fn write(&self, writer: &mut ByteWriter) -> Result<()> {
        self.position.write(writer)?;
        self.color.write(writer)?;
        writer.write_f32(self.uv[0])?;
        writer.write_f32(self.uv[1])?;
        self.normal.write(writer)?;
        writer.write_f32(self.bone_index_0)?;
        writer.write_f32(self.bone_index_1)?;
        writer.write_f32(self.bone_weight_0)?;
        writer.write_f32(self.bone_weight_1)
    }

    /// Bone indices and weights as `(bone, weight)` pairs.
    pub fn influences(&self) -> [(u32, f32); 2] {
        [
            (self.bone_index_0 as u32, self.bone_weight_0),
            (self.bone_index_1 as u32, self.bone_weight_1),
        ]
    }
}

impl VertexLike for AnimVertex {
    fn position(&self) -> Vec3 {
        self.position
    }

    fn color(&self) -> Color4 {
        self.color
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnimMesh {
    pub shader_id: u32,
    pub vertices: Vec<AnimVertex>,
    pub indices: Vec<u32>,
}

impl AnimMesh {
    fn read(reader: &mut ByteReader<'_>, opts: &ParseOptions) -> Result<Self> {
        let tag = reader.read_u32("anim_mesh.tag")?;
        opts.check_eq("anim_mesh.tag", MESH_TAG, tag)?;
        let shader_id = reader.read_u32("anim_mesh.shader_id")?;
        let reserved = reader.read_u16("anim_mesh.reserved")?;
        opts.check_eq("anim_mesh.reserved", 0, reserved)?;

        let vertex_bytes = reader.read_u32("anim_mesh.vertex_bytes")?;
        opts.check(
            "anim_mesh.vertex_bytes",
            vertex_bytes as usize % ANIM_VERTEX_SIZE == 0,
            "a multiple of 52",
            vertex_bytes,
        )?;
        let vertex_count = vertex_bytes as usize / ANIM_VERTEX_SIZE;
        let mut vertices = Vec::with_capacity(vertex_count.min(reader.remaining() / ANIM_VERTEX_SIZE));
        for _ in 0..vertex_count {
            vertices.push(AnimVertex::read(reader)?);
        }
        reader.skip("anim_mesh.vertex_padding", vertex_bytes as usize % ANIM_VERTEX_SIZE)?;

        let index_bytes = reader.read_u32("anim_mesh.index_bytes")?;
        opts.check(
            "anim_mesh.index_bytes",
            index_bytes % TRIANGLE_BYTES == 0,
            "a multiple of 12",
            index_bytes,
        )?;
        let index_count = index_bytes as usize / INDEX_SIZE;
        let mut indices = Vec::with_capacity(index_count.min(reader.remaining() / INDEX_SIZE));
        for _ in 0..index_count {
            indices.push(reader.read_u32("anim_mesh.index")?);
        }
        reader.skip("anim_mesh.index_padding", index_bytes as usize % INDEX_SIZE)?;

        Ok(Self { shader_id, vertices, indices })
    }

    fn write(&self, writer: &mut ByteWriter) -> Result<()> {
        writer.write_u32(MESH_TAG)?;
        writer.write_u32(self.shader_id)?;
        writer.write_u16(0)?;
        writer.write_u32(count_as("anim vertex bytes", self.vertices.len() * ANIM_VERTEX_SIZE)?)?;
        for vertex in &self.vertices {
            vertex.write(writer)?;
        }
        writer.write_u32(count_as("anim index bytes", self.indices.len() * INDEX_SIZE)?)?;
        for &index in &self.indices {
            writer.write_u32(index)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bone {
    pub name: String,
    pub rotation: Matrix3,
    pub translation: Vec3,
    /// `-1` for the root bone.
    pub parent_index: i32,
    pub child_indices: Vec<u32>,
}

impl Bone {
    pub fn local_transform(&self) -> Transform {
        Transform::new(self.rotation, self.translation)
    }

    pub fn is_root(&self) -> bool {
        self.parent_index == skeleton::ROOT_PARENT
    }

    fn read(reader: &mut ByteReader<'_>) -> Result<Self> {
        let name = reader.read_string("bone.name")?;
        let rotation = Matrix3::read(reader, "bone.rotation")?;
        let translation = Vec3::read(reader, "bone.translation")?;
        let parent_index = reader.read_i32("bone.parent_index")?;
        let child_count = reader.read_u32("bone.child_count")? as usize;
        let mut child_indices = Vec::with_capacity(child_count.min(reader.remaining() / 4));
        for _ in 0..child_count {
            child_indices.push(reader.read_u32("bone.child_index")?);
        }
        Ok(Self { name, rotation, translation, parent_index, child_indices })
    }

    fn write(&self, writer: &mut ByteWriter) -> Result<()> {
        writer.write_string("bone.name", &self.name)?;
        self.rotation.write(writer)?;
        self.translation.write(writer)?;
        writer.write_i32(self.parent_index)?;
        writer.write_u32(count_as("bone child count", self.child_indices.len())?)?;
        for &child in &self.child_indices {
            writer.write_u32(child)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pose {
    pub name: String,
    /// One transform per bone, matched by position.
    pub bone_transforms: Vec<Transform>,
}

impl Pose {
    fn read(reader: &mut ByteReader<'_>) -> Result<Self> {
        let name = reader.read_string("pose.name")?;
        let count = reader.read_u32("pose.bone_count")? as usize;
        let mut bone_transforms = Vec::with_capacity(count.min(reader.remaining() / 48));
        for _ in 0..count {
            let rotation = Matrix3::read(reader, "pose.rotation")?;
            let translation = Vec3::read(reader, "pose.translation")?;
            bone_transforms.push(Transform::new(rotation, translation));
        }
        Ok(Self { name, bone_transforms })
    }

    fn write(&self, writer: &mut ByteWriter) -> Result<()> {
        writer.write_string("pose.name", &self.name)?;
        writer.write_u32(count_as("pose bone count", self.bone_transforms.len())?)?;
        for transform in &self.bone_transforms {
            transform.rotation.write(writer)?;
            transform.translation.write(writer)?;
        }
        Ok(())
    }
}

/// Keyframe time, normalised over the clip to `0..=65535`.
pub type Tick = u16;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TranslationKeyframe {
    pub timestamp: Tick,
    pub translation: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationKeyframe {
    pub timestamp: Tick,
    pub rotation: Quaternion,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoneAnimation {
    pub bone_index: u32,
    pub translations: Vec<TranslationKeyframe>,
    pub rotations: Vec<RotationKeyframe>,
}

impl BoneAnimation {
    fn read(reader: &mut ByteReader<'_>) -> Result<Self> {
        let bone_index = reader.read_u32("bone_animation.bone_index")?;

        let count = reader.read_u32("bone_animation.translation_count")? as usize;
        let mut translations = Vec::with_capacity(count.min(reader.remaining() / 14));
        for _ in 0..count {
            translations.push(TranslationKeyframe {
                timestamp: reader.read_u16("translation_key.timestamp")?,
                translation: Vec3::read(reader, "translation_key.translation")?,
            });
        }

        let count = reader.read_u32("bone_animation.rotation_count")? as usize;
        let mut rotations = Vec::with_capacity(count.min(reader.remaining() / 18));
        for _ in 0..count {
            rotations.push(RotationKeyframe {
                timestamp: reader.read_u16("rotation_key.timestamp")?,
                rotation: Quaternion::read(reader, "rotation_key.rotation")?,
            });
        }

        Ok(Self { bone_index, translations, rotations })
    }

    fn write(&self, writer: &mut ByteWriter) -> Result<()> {
        writer.write_u32(self.bone_index)?;
        writer.write_u32(count_as("translation key count", self.translations.len())?)?;
        for key in &self.translations {
            writer.write_u16(key.timestamp)?;
            key.translation.write(writer)?;
        }
        writer.write_u32(count_as("rotation key count", self.rotations.len())?)?;
        for key in &self.rotations {
            writer.write_u16(key.timestamp)?;
            key.rotation.write(writer)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Animation {
    pub name: String,
    pub bone_animations: Vec<BoneAnimation>,
}

impl Animation {
    fn read(reader: &mut ByteReader<'_>) -> Result<Self> {
        let name = reader.read_string("animation.name")?;
        let count = reader.read_u32("animation.bone_count")? as usize;
        let mut bone_animations = Vec::with_capacity(count.min(reader.remaining() / 12));
        for _ in 0..count {
            bone_animations.push(BoneAnimation::read(reader)?);
        }
        Ok(Self { name, bone_animations })
    }

    fn write(&self, writer: &mut ByteWriter) -> Result<()> {
        writer.write_string("animation.name", &self.name)?;
        writer.write_u32(count_as("bone animation count", self.bone_animations.len())?)?;
        for bone_animation in &self.bone_animations {
            bone_animation.write(writer)?;
        }
        Ok(())
    }
}

/// Trailing fixed-shape record of unknown purpose, kept as read.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AuxBlock {
    pub header: u32,
    pub m0: Matrix3,
    pub v0: Vec3,
    pub p0: [f32; 2],
    pub m1: Matrix3,
    pub m2: Matrix3,
    pub p1: [f32; 2],
}

impl AuxBlock {
    fn read(reader: &mut ByteReader<'_>) -> Result<Self> {
        Ok(Self {
            header: reader.read_u32("aux.header")?,
            m0: Matrix3::read(reader, "aux.m0")?,
            v0: Vec3::read(reader, "aux.v0")?,
            p0: [reader.read_f32("aux.p0")?, reader.read_f32("aux.p0")?],
            m1: Matrix3::read(reader, "aux.m1")?,
            m2: Matrix3::read(reader, "aux.m2")?,
            p1: [reader.read_f32("aux.p1")?, reader.read_f32("aux.p1")?],
        })
    }

    fn write(&self, writer: &mut ByteWriter) -> Result<()> {
        writer.write_u32(self.header)?;
        self.m0.write(writer)?;
        self.v0.write(writer)?;
        writer.write_f32(self.p0[0])?;
        writer.write_f32(self.p0[1])?;
        self.m1.write(writer)?;
        self.m2.write(writer)?;
        writer.write_f32(self.p1[0])?;
        writer.write_f32(self.p1[1])
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnimFile {
    pub meshes: Vec<AnimMesh>,
    pub bones: Vec<Bone>,
    pub poses: Vec<Pose>,
    pub animations: Vec<Animation>,
    pub aux_blocks: Vec<AuxBlock>,
}

impl AnimFile {
    /// Root-space transform of every bone.
    pub fn global_transforms(&self) -> Result<Vec<Transform>> {
        skeleton::resolve_global_transforms(&self.bones)
    }

    pub fn bone_by_name(&self, name: &str) -> Option<(usize, &Bone)> {
        self.bones.iter().enumerate().find(|(_, b)| b.name == name)
    }
}

fn read_list<'a, T>(
    reader: &mut ByteReader<'a>,
    field: &'static str,
    mut read_one: impl FnMut(&mut ByteReader<'a>) -> Result<T>,
) -> Result<Vec<T>> {
    let count = reader.read_u32(field)? as usize;
    let mut items = Vec::with_capacity(count.min(reader.remaining()));
    for _ in 0..count {
        items.push(read_one(reader)?);
    }
    Ok(items)
}

pub fn parse_anim(data: &[u8], opts: ParseOptions) -> Result<AnimFile> {
    let mut reader = ByteReader::new(data);
    opts.expect_magic(&mut reader, ANIM_MAGIC)?;

    let version = reader.read_u32("header[0]")?;
    opts.check_eq("header[0]", FILE_VERSION, version)?;

    let meshes = read_list(&mut reader, "mesh_count", |r| AnimMesh::read(r, &opts))?;
    let bones = read_list(&mut reader, "bone_count", Bone::read)?;
    let poses = read_list(&mut reader, "pose_count", Pose::read)?;
    let animations = read_list(&mut reader, "animation_count", Animation::read)?;
    let aux_blocks = read_list(&mut reader, "aux_count", AuxBlock::read)?;

    skeleton::validate_bone_tree(&bones)?;

    tracing::debug!(
        "parsed anim: {} meshes, {} bones, {} poses, {} animations, {} aux blocks",
        meshes.len(),
        bones.len(),
        poses.len(),
        animations.len(),
        aux_blocks.len()
    );

    Ok(AnimFile { meshes, bones, poses, animations, aux_blocks })
}

pub fn serialize_anim(anim: &AnimFile) -> Result<Vec<u8>> {
    let mut writer = ByteWriter::new();
    writer.write_bytes(ANIM_MAGIC)?;
    writer.write_u32(FILE_VERSION)?;

    writer.write_u32(count_as("anim mesh count", anim.meshes.len())?)?;
    for mesh in &anim.meshes {
        mesh.write(&mut writer)?;
    }
    writer.write_u32(count_as("bone count", anim.bones.len())?)?;
    for bone in &anim.bones {
        bone.write(&mut writer)?;
    }
    writer.write_u32(count_as("pose count", anim.poses.len())?)?;
    for pose in &anim.poses {
        pose.write(&mut writer)?;
    }
    writer.write_u32(count_as("animation count", anim.animations.len())?)?;
    for animation in &anim.animations {
        animation.write(&mut writer)?;
    }
    writer.write_u32(count_as("aux block count", anim.aux_blocks.len())?)?;
    for block in &anim.aux_blocks {
        block.write(&mut writer)?;
    }

    Ok(writer.into_inner())
}
