//! Codec for the `.mesh`, `.phys` and `.anim` binary asset formats.
//!
//! Each format has a `parse_*` function that decodes a whole byte buffer
//! into an owned value and a matching `serialize_*` function. Parsing is
//! strict by default; see [`ParseOptions`].

pub mod anim;
pub mod asset;
pub mod builder;
pub mod codec;
pub mod config;
pub mod convert;
pub mod coords;
pub mod error;
pub mod materials;
pub mod mesh;
pub mod obj;
pub mod options;
pub mod phys;
pub mod skeleton;
pub mod types;

pub use anim::{
    AnimFile, AnimMesh, AnimVertex, Animation, AuxBlock, Bone, BoneAnimation, Pose, RotationKeyframe,
    TranslationKeyframe, parse_anim, serialize_anim,
};
pub use asset::{Asset, FileKind, parse_asset, parse_asset_or};
pub use builder::{Grid, MeshBuilder, build_physics_mesh};
pub use error::{ErrorKind, MeshError, Result, TreeViolation};
pub use mesh::{Mesh, MeshVertex, ShaderKind, SubMesh, parse_mesh, serialize_mesh};
pub use options::ParseOptions;
pub use phys::{PhysicsMesh, SubPhysMesh, parse_physics_mesh, serialize_physics_mesh};
pub use skeleton::{Transform, resolve_global_transforms, validate_bone_tree};
pub use types::{Color4, Matrix3, Quaternion, Vec3, VertexLike};
