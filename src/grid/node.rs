//! Bit-packed octree node
//!
//! Every node is a single 64-bit word. Whether it is read as a [`Voxel`] or a
//! [`Branch`] depends only on the level it sits at: the bottom level holds
//! voxels, all levels above hold branches.
//!
//! Voxel layout:
//! - bits 0-23: next sibling index
//! - bits 24-31: color
//! - bits 32-41: block type
//! - bits 42-46: rotation
//! - bits 47-49: octant index
//! - bits 50-54: shape
//!
//! Branch layout:
//! - bits 0-23: next sibling index
//! - bits 24-47: first child index
//! - bit 48: compressed flag (reserved)
//! - bits 49-51: octant index

use std::fmt;

use bytemuck::{Pod, Zeroable};
use rkyv::{Archive, Deserialize, Serialize};

use super::pool::PoolItem;

/// Pool index as stored in node link fields
pub type Index = u32;

/// Link value meaning "no node"
pub const BAD_INDEX: Index = 0xFF_FFFF;

#[inline]
fn get_bits(data: u64, shift: u32, width: u32) -> u64 {
    (data >> shift) & ((1u64 << width) - 1)
}

#[inline]
fn set_bits(data: &mut u64, shift: u32, width: u32, value: u64) {
    let mask = ((1u64 << width) - 1) << shift;
    *data = (*data & !mask) | ((value << shift) & mask);
}

/// Leaf payload
#[repr(transparent)]
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct Voxel(pub u64);

impl Voxel {
    /// Voxel payload without any link information
    pub fn new(block_type: u16, color: u8, rotation: u8, shape: u8) -> Self {
        let mut voxel = Self(0);
        voxel.set_block_type(block_type);
        voxel.set_color(color);
        voxel.set_rotation(rotation);
        voxel.set_shape(shape);
        voxel
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn next(&self) -> Index {
        get_bits(self.0, 0, 24) as Index
    }

    pub fn set_next(&mut self, next: Index) {
        set_bits(&mut self.0, 0, 24, next as u64);
    }

    pub fn color(&self) -> u8 {
        get_bits(self.0, 24, 8) as u8
    }

    pub fn set_color(&mut self, color: u8) {
        set_bits(&mut self.0, 24, 8, color as u64);
    }

    /// Index into the owning grid's type table
    pub fn block_type(&self) -> u16 {
        get_bits(self.0, 32, 10) as u16
    }

    pub fn set_block_type(&mut self, block_type: u16) {
        set_bits(&mut self.0, 32, 10, block_type as u64);
    }

    pub fn rotation(&self) -> u8 {
        get_bits(self.0, 42, 5) as u8
    }

    pub fn set_rotation(&mut self, rotation: u8) {
        set_bits(&mut self.0, 42, 5, rotation as u64);
    }

    /// Octant within the parent branch
    pub fn index(&self) -> u8 {
        get_bits(self.0, 47, 3) as u8
    }

    pub fn set_index(&mut self, index: u8) {
        set_bits(&mut self.0, 47, 3, index as u64);
    }

    pub fn shape(&self) -> u8 {
        get_bits(self.0, 50, 5) as u8
    }

    pub fn set_shape(&mut self, shape: u8) {
        set_bits(&mut self.0, 50, 5, shape as u64);
    }

    /// Copy the block payload (type, color, rotation, shape) from another voxel
    pub fn assign_payload(&mut self, other: &Voxel) {
        self.set_block_type(other.block_type());
        self.set_color(other.color());
        self.set_rotation(other.rotation());
        self.set_shape(other.shape());
    }

    /// True if the block payload matches, ignoring links
    pub fn same_payload(&self, other: &Voxel) -> bool {
        self.block_type() == other.block_type()
            && self.color() == other.color()
            && self.rotation() == other.rotation()
            && self.shape() == other.shape()
    }
}

impl fmt::Debug for Voxel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<index: {}, next: {}, color: {}, type: {}, rotation: {}, shape: {}>",
            self.index(),
            self.next(),
            self.color(),
            self.block_type(),
            self.rotation(),
            self.shape()
        )
    }
}

/// Interior node payload
#[repr(transparent)]
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct Branch(pub u64);

impl Branch {
    pub fn next(&self) -> Index {
        get_bits(self.0, 0, 24) as Index
    }

    pub fn set_next(&mut self, next: Index) {
        set_bits(&mut self.0, 0, 24, next as u64);
    }

    pub fn child(&self) -> Index {
        get_bits(self.0, 24, 24) as Index
    }

    pub fn set_child(&mut self, child: Index) {
        set_bits(&mut self.0, 24, 24, child as u64);
    }

    pub fn compressed(&self) -> bool {
        get_bits(self.0, 48, 1) != 0
    }

    pub fn set_compressed(&mut self, compressed: bool) {
        set_bits(&mut self.0, 48, 1, compressed as u64);
    }

    pub fn index(&self) -> u8 {
        get_bits(self.0, 49, 3) as u8
    }

    pub fn set_index(&mut self, index: u8) {
        set_bits(&mut self.0, 49, 3, index as u64);
    }
}

impl fmt::Debug for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<index: {}, next: {}, child: {}, compressed: {}>",
            self.index(),
            self.next(),
            self.child(),
            self.compressed()
        )
    }
}

/// One pooled octree node, viewed as [`Voxel`] or [`Branch`] by level
#[repr(transparent)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable, Archive, Deserialize, Serialize)]
pub struct Node(pub u64);

impl Node {
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn voxel(&self) -> &Voxel {
        bytemuck::cast_ref(self)
    }

    pub fn voxel_mut(&mut self) -> &mut Voxel {
        bytemuck::cast_mut(self)
    }

    pub fn branch(&self) -> &Branch {
        bytemuck::cast_ref(self)
    }

    pub fn branch_mut(&mut self) -> &mut Branch {
        bytemuck::cast_mut(self)
    }

    /// Sibling link, read through the view matching the node's level
    pub fn next(&self, is_voxel: bool) -> Index {
        if is_voxel {
            self.voxel().next()
        } else {
            self.branch().next()
        }
    }

    /// Octant index, read through the view matching the node's level
    pub fn index(&self, is_voxel: bool) -> u8 {
        if is_voxel {
            self.voxel().index()
        } else {
            self.branch().index()
        }
    }

    pub fn set_next(&mut self, is_voxel: bool, next: Index) {
        if is_voxel {
            self.voxel_mut().set_next(next);
        } else {
            self.branch_mut().set_next(next);
        }
    }

    pub fn set_index(&mut self, is_voxel: bool, index: u8) {
        if is_voxel {
            self.voxel_mut().set_index(index);
        } else {
            self.branch_mut().set_index(index);
        }
    }
}

/// True if `idx` points at a node
#[inline]
pub fn is_link(idx: Index) -> bool {
    idx != 0 && idx != BAD_INDEX
}

impl From<Voxel> for Node {
    fn from(voxel: Voxel) -> Self {
        Self(voxel.0)
    }
}

impl From<Branch> for Node {
    fn from(branch: Branch) -> Self {
        Self(branch.0)
    }
}

impl PoolItem for Node {
    fn is_vacant(&self) -> bool {
        self.is_empty()
    }
}
