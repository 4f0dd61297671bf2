//! Material grouping used when handing codec data to a scene consumer.

use crate::error::Result;
use crate::mesh::ShaderKind;
use crate::types::{Color4, VertexLike};
use std::collections::HashMap;

pub const GLASS_COLOR: Color4 = Color4::new(160, 160, 199, 128);
pub const ADDITIVE_COLOR: Color4 = Color4::new(255, 255, 0, 255);
pub const LAVA_COLOR: Color4 = Color4::new(149, 149, 149, 255);
pub const OVERRIDE_COLOR_1: Color4 = Color4::new(255, 125, 0, 255);
pub const OVERRIDE_COLOR_2: Color4 = Color4::new(155, 125, 0, 255);
pub const OVERRIDE_COLOR_3: Color4 = Color4::new(55, 125, 0, 255);
/// Color given to exported opaque faces with no color of their own.
pub const DEFAULT_COLOR: Color4 = Color4::new(153, 153, 153, 255);

pub fn shader_color(shader: ShaderKind) -> Color4 {
    match shader {
        ShaderKind::Opaque => DEFAULT_COLOR,
        ShaderKind::Glass => GLASS_COLOR,
        ShaderKind::Additive => ADDITIVE_COLOR,
        ShaderKind::Lava => LAVA_COLOR,
    }
}

fn override_name(color: Color4) -> Option<&'static str> {
    match color {
        OVERRIDE_COLOR_1 => Some("OverrideColor1"),
        OVERRIDE_COLOR_2 => Some("OverrideColor2"),
        OVERRIDE_COLOR_3 => Some("OverrideColor3"),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    pub color: Color4,
}

/// Materials of one output object, created on first use.
#[derive(Debug)]
pub struct MaterialTable {
    object: String,
    materials: Vec<Material>,
    by_name: HashMap<String, usize>,
    by_color: HashMap<Color4, usize>,
}

impl MaterialTable {
    pub fn new(object: impl Into<String>) -> Self {
        Self {
            object: object.into(),
            materials: Vec::new(),
            by_name: HashMap::new(),
            by_color: HashMap::new(),
        }
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    fn named(&mut self, name: &str, color: Color4) -> usize {
        if let Some(&index) = self.by_name.get(name) {
            return index;
        }
        let index = self.materials.len();
        self.materials.push(Material { name: name.to_string(), color });
        self.by_name.insert(name.to_string(), index);
        index
    }

    fn by_color(&mut self, color: Color4) -> usize {
        if let Some(name) = override_name(color) {
            return self.named(name, color);
        }
        if let Some(&index) = self.by_color.get(&color) {
            return index;
        }
        let index = self.materials.len();
        self.by_color.insert(color, index);
        // numbering counts the color just registered, so the first is _02
        let name = format!("{}_{:02}", self.object, self.by_color.len() + 1);
        self.materials.push(Material { name, color });
        index
    }

    /// Material index for every triangle of `indices`.
    ///
    /// Glass, additive and lava submeshes share one material each, tinted
    /// by the first vertex. Opaque triangles take the color of their first
    /// corner.
    pub fn assign<V: VertexLike>(&mut self, shader_id: u32, vertices: &[V], indices: &[u32]) -> Result<Vec<usize>> {
        crate::builder::check_triangle_list(indices.len())?;
        let triangles = indices.len() / 3;
        let special = u16::try_from(shader_id)
            .ok()
            .and_then(ShaderKind::from_id)
            .and_then(|kind| kind.material_name());

        if let Some(name) = special {
            let Some(first) = vertices.first() else {
                return Ok(Vec::new());
            };
            let index = self.named(name, first.color());
            return Ok(vec![index; triangles]);
        }

        indices
            .chunks_exact(3)
            .map(|triangle| {
                let vertex = vertices.get(triangle[0] as usize).ok_or_else(|| {
                    crate::error::argument_err(format!(
                        "index {} is out of range for {} vertices",
                        triangle[0],
                        vertices.len()
                    ))
                })?;
                Ok(self.by_color(vertex.color()))
            })
            .collect()
    }
}
