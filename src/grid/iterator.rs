//! Cursor over octree sibling lists

use crate::core::types::IVec3;

use super::node::{BAD_INDEX, Index, Node, Voxel, is_link};
use super::octree::{Octree, idx_to_offset, idx_to_offset_voxel, width_for_level};

/// Non-owning cursor over one sibling list of an [`Octree`].
///
/// Level 0 is the root; a cursor at level `depth` walks voxels. `advance`
/// moves along the siblings, `children` descends one level.
#[derive(Clone, Copy, Debug)]
pub struct OctreeIterator<'a> {
    octree: &'a Octree,
    idx: Index,
    level: usize,
    origin: IVec3,
    pos: IVec3,
}

impl<'a> OctreeIterator<'a> {
    pub fn new(octree: &'a Octree, idx: Index, level: usize, origin: IVec3) -> Self {
        let mut it = Self {
            octree,
            idx: if level == 0 || is_link(idx) { idx } else { BAD_INDEX },
            level,
            origin,
            pos: IVec3::ZERO,
        };
        it.pos = it.compute_pos();
        it
    }

    fn compute_pos(&self) -> IVec3 {
        if self.level == 0 {
            self.origin
        } else if !self.is_valid() {
            IVec3::ZERO
        } else if self.is_voxel() {
            idx_to_offset_voxel(self.value().voxel().index(), self.origin)
        } else {
            idx_to_offset(self.value().branch().index(), self.branch_width() / 2, self.origin)
        }
    }

    /// False once the sibling list is exhausted
    pub fn is_valid(&self) -> bool {
        self.idx != BAD_INDEX
    }

    /// True if this cursor walks the bottom level
    pub fn is_voxel(&self) -> bool {
        self.octree.depth() == self.level
    }

    /// Side length of the region covered by the current node
    pub fn branch_width(&self) -> i32 {
        width_for_level(self.octree.depth() - self.level + 1)
    }

    /// Move to the next sibling
    pub fn advance(&mut self) {
        if !self.is_valid() {
            return;
        }
        let next = self.value().next(self.is_voxel());
        self.idx = if is_link(next) { next } else { BAD_INDEX };
        self.pos = self.compute_pos();
    }

    /// Cursor over the children of the current branch; exhausted for voxels
    /// and invalid cursors.
    pub fn children(&self) -> OctreeIterator<'a> {
        if self.is_valid() && !self.is_voxel() {
            OctreeIterator::new(self.octree, self.value().branch().child(), self.level + 1, self.pos)
        } else {
            OctreeIterator::new(self.octree, BAD_INDEX, self.level + 1, IVec3::ZERO)
        }
    }

    /// Current node
    ///
    /// # Panics
    /// Panics on an exhausted cursor.
    pub fn value(&self) -> &'a Node {
        self.octree.pool().at(self.idx as usize)
    }

    /// Pool index of the current node
    pub fn index(&self) -> Index {
        self.idx
    }

    pub fn level(&self) -> usize {
        self.level
    }

    /// Centre of the parent branch
    pub fn origin(&self) -> IVec3 {
        self.origin
    }

    /// Centre of the current branch, or the cell of the current voxel
    pub fn pos(&self) -> IVec3 {
        self.pos
    }
}

/// Depth-first walk over every stored voxel
pub struct Voxels<'a> {
    stack: Vec<OctreeIterator<'a>>,
}

impl<'a> Voxels<'a> {
    pub(crate) fn new(root: OctreeIterator<'a>) -> Self {
        Self { stack: vec![root] }
    }
}

impl Iterator for Voxels<'_> {
    type Item = (IVec3, Voxel);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let top = self.stack.last_mut()?;
            if !top.is_valid() {
                self.stack.pop();
            } else if top.is_voxel() {
                let item = (top.pos(), *top.value().voxel());
                top.advance();
                return Some(item);
            } else {
                let children = top.children();
                top.advance();
                self.stack.push(children);
            }
        }
    }
}
