//! Packs triangulated geometry from a producer into codec aggregates.

use crate::error::{Result, argument_err};
use crate::mesh::{Mesh, MeshVertex, ShaderKind, SubMesh};
use crate::phys::{PhysicsMesh, SubPhysMesh};
use crate::types::Vec3;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Largest vertex buffer whose length fits the `u16` vertex count.
pub const MAX_VERTICES: usize = u16::MAX as usize;

pub(crate) fn check_triangle_list(len: usize) -> Result<()> {
    if len % 3 != 0 {
        return Err(argument_err(format!("index list length must be a multiple of 3; {} given", len)));
    }
    Ok(())
}

/// Collects triangles per shader and emits one submesh per non-empty
/// shader, in shader id order, over a de-duplicated vertex buffer.
#[derive(Debug, Default)]
pub struct MeshBuilder {
    buckets: [Vec<[MeshVertex; 3]>; 4],
    names: [Option<String>; 4],
}

impl MeshBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn shader(shader_id: u16) -> Result<ShaderKind> {
        ShaderKind::from_id(shader_id)
            .ok_or_else(|| argument_err(format!("shader id must be in 0..=3; {} given", shader_id)))
    }

    pub fn add_triangle(&mut self, shader_id: u16, triangle: [MeshVertex; 3]) -> Result<()> {
        let shader = Self::shader(shader_id)?;
        self.buckets[shader as usize].push(triangle);
        Ok(())
    }

    pub fn add_indexed(&mut self, shader_id: u16, vertices: &[MeshVertex], indices: &[u32]) -> Result<()> {
        check_triangle_list(indices.len())?;
        let shader = Self::shader(shader_id)?;
        for triangle in indices.chunks_exact(3) {
            let mut corners = [MeshVertex::default(); 3];
            for (corner, &index) in corners.iter_mut().zip(triangle) {
                *corner = *vertices.get(index as usize).ok_or_else(|| {
                    argument_err(format!("index {} is out of range for {} vertices", index, vertices.len()))
                })?;
            }
            self.buckets[shader as usize].push(corners);
        }
        Ok(())
    }

    /// Names the submesh of `shader_id`; a later name replaces an earlier one.
    pub fn set_name(&mut self, shader_id: u16, name: impl Into<String>) -> Result<()> {
        let shader = Self::shader(shader_id)?;
        self.names[shader as usize] = Some(name.into());
        Ok(())
    }

    pub fn build(self) -> Result<Mesh> {
        let mut vertices: Vec<MeshVertex> = Vec::new();
        let mut indices: Vec<u16> = Vec::new();
        let mut submeshes = Vec::new();
        let mut vertex_map = HashMap::new();

        for (shader, (triangles, name)) in ShaderKind::ALL.into_iter().zip(self.buckets.into_iter().zip(self.names)) {
            let Some(first) = triangles.first() else {
                continue;
            };
            let index_start = indices.len();
            let mut bounds_min = first[0].position;
            let mut bounds_max = first[0].position;

            for vertex in triangles.iter().flatten() {
                bounds_min = bounds_min.min(vertex.position);
                bounds_max = bounds_max.max(vertex.position);

                let index = match vertex_map.get(&vertex.key()) {
                    Some(&existing) => existing,
                    None => {
                        if vertices.len() >= MAX_VERTICES {
                            return Err(argument_err("mesh needs more than 65535 unique vertices"));
                        }
                        let next = vertices.len() as u16;
                        vertices.push(*vertex);
                        vertex_map.insert(vertex.key(), next);
                        next
                    }
                };
                indices.push(index);
            }

            submeshes.push(SubMesh {
                index_start: index_start as u32,
                index_count: (triangles.len() * 3) as u32,
                shader_id: shader.id(),
                bounds_min,
                bounds_max,
                name: name.unwrap_or_default(),
            });
        }

        tracing::debug!(
            "built mesh: {} unique vertices, {} indices, {} submeshes",
            vertices.len(),
            indices.len(),
            submeshes.len()
        );
        Mesh::new(vertices, indices, submeshes)
    }
}

/// Voxel grid used to split physics geometry, in game coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    pub origin: [f32; 3],
    pub size: [f32; 3],
}

impl Default for Grid {
    fn default() -> Self {
        Self { origin: [-500.0, -1000.0, -500.0], size: [128.0, 128.0, 128.0] }
    }
}

impl Grid {
    fn cell(&self, triangle: &[Vec3; 3]) -> (i32, i32, i32) {
        let center = (triangle[0] + triangle[1] + triangle[2]).to_array().map(|c| c / 3.0);
        let key = |axis: usize| ((center[axis] - self.origin[axis]) / self.size[axis]).floor() as i32;
        (key(0), key(1), key(2))
    }
}

/// Flattens triangles into physics sub meshes, one per occupied grid cell
/// when `grid` is given, otherwise a single sub mesh.
pub fn build_physics_mesh(triangles: &[[Vec3; 3]], grid: Option<&Grid>) -> Result<PhysicsMesh> {
    let groups: Vec<Vec<[Vec3; 3]>> = match grid {
        Some(grid) => {
            let mut cells: BTreeMap<(i32, i32, i32), Vec<[Vec3; 3]>> = BTreeMap::new();
            for triangle in triangles {
                cells.entry(grid.cell(triangle)).or_default().push(*triangle);
            }
            cells.into_values().collect()
        }
        None if triangles.is_empty() => Vec::new(),
        None => vec![triangles.to_vec()],
    };

    let sub_meshes = groups
        .into_iter()
        .map(|group| {
            if group.len() * 3 > u16::MAX as usize {
                return Err(argument_err(format!(
                    "physics sub mesh of {} triangles exceeds 65535 vertices",
                    group.len()
                )));
            }
            Ok(SubPhysMesh::from_vertices(group.into_iter().flatten().collect()))
        })
        .collect::<Result<Vec<_>>>()?;

    tracing::debug!("built physics mesh: {} sub meshes", sub_meshes.len());
    Ok(PhysicsMesh { sub_meshes })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::types::Color4;

    fn v(x: f32, y: f32, color: Color4) -> MeshVertex {
        MeshVertex::new(Vec3::new(x, y, 0.0), color, Vec3::new(0.0, 0.0, 1.0))
    }

    #[test]
    fn shares_identical_vertices_and_orders_by_shader() {
        let white = Color4::WHITE;
        let quad = [v(0.0, 0.0, white), v(1.0, 0.0, white), v(1.0, 1.0, white), v(0.0, 1.0, white)];
        let mut builder = MeshBuilder::new();
        builder.add_indexed(2, &quad, &[0, 1, 2]).unwrap();
        builder.add_indexed(0, &quad, &[0, 1, 2, 0, 2, 3]).unwrap();
        builder.set_name(0, "deck").unwrap();
        let mesh = builder.build().unwrap();

        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.indices, vec![0, 1, 2, 0, 2, 3, 0, 1, 2]);
        assert_eq!(mesh.submeshes.len(), 2);
        assert_eq!(mesh.submeshes[0].shader_id, 0);
        assert_eq!(mesh.submeshes[0].name, "deck");
        assert_eq!(mesh.submeshes[0].index_count, 6);
        assert_eq!(mesh.submeshes[0].bounds_max, Vec3::new(1.0, 1.0, 0.0));
        assert_eq!(mesh.submeshes[1].shader_id, 2);
        assert_eq!(mesh.submeshes[1].index_start, 6);
        assert_eq!(mesh.submeshes[1].name, "");
    }

    #[test]
    fn vertices_differing_in_color_are_kept_apart() {
        let mut builder = MeshBuilder::new();
        let red = Color4::new(255, 0, 0, 255);
        builder
            .add_triangle(0, [v(0.0, 0.0, red), v(1.0, 0.0, red), v(0.0, 0.0, Color4::WHITE)])
            .unwrap();
        assert_eq!(builder.build().unwrap().vertices.len(), 3);
    }

    #[test]
    fn rejects_bad_arguments() {
        let quad = [v(0.0, 0.0, Color4::WHITE)];
        let mut builder = MeshBuilder::new();
        assert_eq!(builder.add_indexed(0, &quad, &[0, 0]).unwrap_err().kind(), ErrorKind::Argument);
        assert_eq!(builder.add_indexed(4, &quad, &[0, 0, 0]).unwrap_err().kind(), ErrorKind::Argument);
        assert_eq!(builder.add_indexed(0, &quad, &[0, 0, 1]).unwrap_err().kind(), ErrorKind::Argument);
    }

    #[test]
    fn vertex_buffer_stops_at_u16_count() {
        let white = Color4::WHITE;
        let mut builder = MeshBuilder::new();
        for t in 0..MAX_VERTICES / 3 {
            let x = (t * 3) as f32;
            builder
                .add_triangle(0, [v(x, 0.0, white), v(x + 1.0, 0.0, white), v(x + 2.0, 0.0, white)])
                .unwrap();
        }
        let full = builder.build().unwrap();
        assert_eq!(full.vertices.len(), MAX_VERTICES);

        let mut builder = MeshBuilder::new();
        for t in 0..MAX_VERTICES / 3 {
            let x = (t * 3) as f32;
            builder
                .add_triangle(0, [v(x, 0.0, white), v(x + 1.0, 0.0, white), v(x + 2.0, 0.0, white)])
                .unwrap();
        }
        builder
            .add_triangle(0, [v(0.0, 0.0, white), v(1.0, 0.0, white), v(0.0, 1.0, white)])
            .unwrap();
        assert_eq!(builder.build().unwrap_err().kind(), ErrorKind::Argument);
    }

    #[test]
    fn empty_builder_yields_empty_mesh() {
        let mesh = MeshBuilder::new().build().unwrap();
        assert!(mesh.vertices.is_empty() && mesh.submeshes.is_empty());
    }

    fn tri(offset: f32) -> [Vec3; 3] {
        [
            Vec3::new(offset, 0.0, 0.0),
            Vec3::new(offset + 1.0, 0.0, 0.0),
            Vec3::new(offset, 0.0, 1.0),
        ]
    }

    #[test]
    fn physics_without_grid_is_one_sub_mesh() {
        let phys = build_physics_mesh(&[tri(0.0), tri(300.0)], None).unwrap();
        assert_eq!(phys.sub_meshes.len(), 1);
        assert_eq!(phys.sub_meshes[0].vertices.len(), 6);
        assert!(phys.sub_meshes[0].indices.is_empty());
        assert!(build_physics_mesh(&[], None).unwrap().sub_meshes.is_empty());
    }

    #[test]
    fn physics_grid_splits_by_cell_in_key_order() {
        let phys = build_physics_mesh(&[tri(300.0), tri(0.0), tri(1.0)], Some(&Grid::default())).unwrap();
        assert_eq!(phys.sub_meshes.len(), 2);
        assert_eq!(phys.sub_meshes[0].vertices, [tri(0.0), tri(1.0)].concat());
        assert_eq!(phys.sub_meshes[1].vertices, tri(300.0).to_vec());
    }
}
