//! Mesh building for 16³ blocks of voxels
//!
//! A mesh-build block is copied into an 18³ cache (one cell of padding on
//! every side) so each voxel can test its six neighbours without touching
//! the tree. Exposed faces form a 6-bit mask which is rotated into the
//! voxel's local frame and used to pick prebuilt geometry from the
//! [`VoxelShapeCache`].

use std::collections::HashMap;
use std::sync::LazyLock;

use bytemuck::{Pod, Zeroable};

use crate::block::MaterialKey;
use crate::core::types::{IVec3, Vec2, Vec3, Vec4};
use crate::math::ROTATION_COUNT;
use crate::math::rotation::rotate_direction_inverted;
use crate::shape::{Face, ShapePrebuilt, ShapeType, VoxelShapeCache};

use super::BlockType;
use super::config::MeshConfig;
use super::node::Voxel;

/// Side length of a mesh-build block
pub const MESH_BUILD_WIDTH: usize = 16;

/// Side length of the padded voxel cache of one mesh-build block
pub const CACHE_BUILD_WIDTH: usize = MESH_BUILD_WIDTH + 2;

const MASK_COUNT: usize = 64;

/// Vertex as uploaded to the GPU
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct VertexFinal {
    pub position: Vec3,
    pub normal: Vec3,
    pub tex_coords: Vec2,
    pub tangent: Vec4,
}

/// Vertex and index buffers of one material
#[derive(Clone, Debug, Default)]
pub struct BlocksData {
    pub vertices: Vec<VertexFinal>,
    pub indices: Vec<u32>,
}

/// Mesh output keyed by material identity
pub type RawPrimitiveData = HashMap<MaterialKey, BlocksData>;

/// Row-major index of `pos` in a cube array of side `width`
#[inline]
pub fn coord_to_idx(pos: IVec3, width: usize) -> usize {
    pos.x as usize + pos.y as usize * width + pos.z as usize * width * width
}

/// `ROTATED_MASKS[mask][rotation]` re-expresses a grid-space face mask in the
/// local frame of a voxel with that rotation.
pub static ROTATED_MASKS: LazyLock<[[u8; ROTATION_COUNT]; MASK_COUNT]> = LazyLock::new(|| {
    let local_face = |rotation: u8, face: Face| -> Face {
        let rotated = rotate_direction_inverted(rotation, face.normal())
            .expect("rotation index within range");
        Face::ALL
            .into_iter()
            .find(|target| rotated.dot(target.normal()) > 0.95)
            .expect("cube rotations map axes onto axes")
    };

    std::array::from_fn(|mask| {
        std::array::from_fn(|rotation| {
            Face::ALL
                .into_iter()
                .filter(|face| mask as u8 & face.mask() != 0)
                .fold(0u8, |acc, face| acc | local_face(rotation as u8, face).mask())
        })
    })
});

/// Rotated face mask, `None` for rotations outside the 24 valid ones
pub fn rotated_mask(mask: u8, rotation: u8) -> Option<u8> {
    ROTATED_MASKS
        .get(mask as usize)?
        .get(rotation as usize)
        .copied()
}

/// Padded voxel copy of one mesh-build block.
///
/// Coordinates are local to the block: `0..16` is the interior, `-1` and
/// `16` the padding ring.
#[derive(Clone)]
pub struct MeshBlockCache {
    cells: Vec<Voxel>,
}

impl MeshBlockCache {
    pub fn new() -> Self {
        Self {
            cells: vec![Voxel::default(); CACHE_BUILD_WIDTH * CACHE_BUILD_WIDTH * CACHE_BUILD_WIDTH],
        }
    }

    pub fn clear(&mut self) {
        self.cells.fill(Voxel::default());
    }

    fn slot(local: IVec3) -> usize {
        debug_assert!(
            local.cmpge(IVec3::NEG_ONE).all() && local.cmple(IVec3::splat(MESH_BUILD_WIDTH as i32)).all(),
            "cache position {:?} outside padded block",
            local
        );
        coord_to_idx(local + IVec3::ONE, CACHE_BUILD_WIDTH)
    }

    pub fn get(&self, local: IVec3) -> Voxel {
        self.cells[Self::slot(local)]
    }

    pub fn set(&mut self, local: IVec3, voxel: Voxel) {
        self.cells[Self::slot(local)] = voxel;
    }

    /// Number of stored voxels, padding included
    pub fn count(&self) -> usize {
        self.cells.iter().filter(|v| !v.is_empty()).count()
    }
}

impl Default for MeshBlockCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Texture coordinates of a vertex projected along the dominant normal axis
pub fn box_projection(normal: Vec3, position: Vec3, config: &MeshConfig) -> Vec2 {
    let abs = normal.abs();
    let project = |a: f32, b: f32| Vec2::new(a, b) * config.uv_scale + config.uv_offset;
    let flip_v = |uv: Vec2| Vec2::new(uv.x, 1.0 - uv.y);

    if abs.x > abs.y && abs.x > abs.z {
        let uv = project(position.y, position.z);
        if normal.x >= 0.0 { flip_v(uv) } else { uv }
    } else if abs.y > abs.z {
        if normal.y >= 0.0 {
            flip_v(project(position.z, position.x))
        } else {
            flip_v(project(position.x, position.z))
        }
    } else {
        let uv = project(position.y, position.x);
        if normal.z >= 0.0 { uv } else { flip_v(uv) }
    }
}

/// Append prebuilt geometry translated to `pos`.
///
/// Each triangle writes its tangent to all three of its vertices; shared
/// vertices keep the tangent of the last triangle using them.
///
/// # Panics
/// Panics if the index count is not a multiple of 3.
pub fn append_shape_vertices(data: &mut BlocksData, shape: &ShapePrebuilt, pos: Vec3, config: &MeshConfig) {
    assert!(
        shape.indices.len() % 3 == 0,
        "Indices must be divisible by 3, got {}",
        shape.indices.len()
    );

    let vertex_offset = data.vertices.len() as u32;
    data.vertices.extend(shape.vertices.iter().map(|src| {
        let position = src.position + pos;
        VertexFinal {
            position,
            normal: src.normal,
            tex_coords: box_projection(src.normal, position, config),
            tangent: Vec4::X,
        }
    }));

    let index_offset = data.indices.len();
    data.indices
        .extend(shape.indices.iter().map(|&i| i as u32 + vertex_offset));

    for tri in data.indices[index_offset..].chunks_exact(3) {
        let [i0, i1, i2] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        let (v0, v1, v2) = (data.vertices[i0], data.vertices[i1], data.vertices[i2]);

        let delta_pos1 = v1.position - v0.position;
        let delta_pos2 = v2.position - v0.position;
        let delta_uv1 = v1.tex_coords - v0.tex_coords;
        let delta_uv2 = v2.tex_coords - v0.tex_coords;

        let r = 1.0 / (delta_uv1.x * delta_uv2.y - delta_uv1.y * delta_uv2.x);
        let tangent = ((delta_pos1 * delta_uv2.y - delta_pos2 * delta_uv1.y) * r)
            .extend(0.0)
            .normalize_or_zero();

        for i in [i0, i1, i2] {
            data.vertices[i].tangent = tangent;
        }
    }
}

/// Mesh the 16³ interior of `cache`, whose local origin sits at `offset`
/// in grid space.
///
/// Voxels with an unknown type, shape, rotation or face material are
/// skipped.
pub fn build(
    shapes: &VoxelShapeCache,
    cache: &MeshBlockCache,
    types: &[BlockType],
    out: &mut RawPrimitiveData,
    offset: IVec3,
    config: &MeshConfig,
) {
    let width = MESH_BUILD_WIDTH as i32;
    for z in 0..width {
        for y in 0..width {
            for x in 0..width {
                let local = IVec3::new(x, y, z);
                let item = cache.get(local);
                if item.is_empty() {
                    continue;
                }

                let Some(block_type) = types.get(item.block_type() as usize) else {
                    log::trace!("Skipping voxel at {:?}: unknown type {}", offset + local, item.block_type());
                    continue;
                };
                let block = &block_type.block;

                let mut mask = 0u8;
                for face in Face::ALL {
                    let neighbour = cache.get(local + face.offset());
                    let solid = !neighbour.is_empty()
                        && ShapeType::from_u8(neighbour.shape())
                            .is_some_and(|shape| shape.solid_mask() & face.mask() != 0);
                    if !solid {
                        mask |= face.mask();
                    }
                }

                let Some(mask) = rotated_mask(mask, item.rotation()) else {
                    log::trace!("Skipping voxel at {:?}: bad rotation {}", offset + local, item.rotation());
                    continue;
                };
                if mask == 0 {
                    continue;
                }

                let pos = (offset + local).as_vec3();

                if block.is_singular() {
                    let Some(shape) = shapes.get(item.shape(), item.rotation(), mask) else {
                        log::trace!("Skipping voxel at {:?}: no shape {}", offset + local, item.shape());
                        continue;
                    };
                    if !shape.is_empty() {
                        let data = out.entry(MaterialKey(block.material().clone())).or_default();
                        append_shape_vertices(data, shape, pos, config);
                    }
                } else {
                    for face in Face::ALL.into_iter().filter(|f| mask & f.mask() != 0) {
                        let Some(shape) = shapes.get(item.shape(), item.rotation(), face.mask()) else {
                            log::trace!("Skipping voxel at {:?}: no shape {}", offset + local, item.shape());
                            break;
                        };
                        let Some(material) = block.material_for_side(face) else {
                            continue;
                        };
                        if !shape.is_empty() {
                            let data = out.entry(MaterialKey(material.clone())).or_default();
                            append_shape_vertices(data, shape, pos, config);
                        }
                    }
                }
            }
        }
    }
}
