//! Pooled sparse voxel octree
//!
//! The tree is centred on the origin and covers `[-width, width)` on every
//! axis, where `width = width_for_level(depth)`. Children of a branch form a
//! singly linked sibling list through their `next` field. Nodes at level
//! `depth` are voxels; everything above is a branch. Inserting outside the
//! covered volume grows the tree one level at a time around the origin.

use crate::core::types::{IVec3, Vec3};
use crate::math::{Aabb, intersect_box, vec_to_normal};

use super::iterator::{OctreeIterator, Voxels};
use super::node::{BAD_INDEX, Branch, Index, Node, Voxel, is_link};
use super::pool::Pool;

/// Node capacity of a single tree
pub const MAX_NODES_PER_TREE: usize = 256 * 256 * 256;

pub type NodesPool = Pool<Node, MAX_NODES_PER_TREE>;

/// Deepest tree supported; keeps every width, including the root cursor's
/// `width_for_level(depth + 1)`, within `i32`
pub const MAX_DEPTH: usize = 30;

/// Half-extent of the largest tree: positions must lie in `[-MAX_WIDTH, MAX_WIDTH)`
pub const MAX_WIDTH: i32 = width_for_level(MAX_DEPTH);

/// Half-extent of a node whose subtree is `level` levels tall
pub const fn width_for_level(level: usize) -> i32 {
    ((1i64 << level) / 2) as i32
}

/// True if `pos` fits in a tree of at most [`MAX_DEPTH`] levels
pub fn is_addressable(pos: IVec3) -> bool {
    pos.cmpge(IVec3::splat(-MAX_WIDTH)).all() && pos.cmplt(IVec3::splat(MAX_WIDTH)).all()
}

/// Pool index as a node link.
///
/// # Panics
/// Panics if `idx` would collide with the [`BAD_INDEX`] sentinel.
fn node_link(idx: usize) -> Index {
    assert!(idx < BAD_INDEX as usize, "Node index {} collides with the link sentinel", idx);
    idx as Index
}

/// Octant sign pattern; top layer 0-3, bottom layer 4-7
const OCTANT_SIGNS: [IVec3; 8] = [
    IVec3::new(1, 1, 1),
    IVec3::new(-1, 1, 1),
    IVec3::new(-1, 1, -1),
    IVec3::new(1, 1, -1),
    IVec3::new(1, -1, 1),
    IVec3::new(-1, -1, 1),
    IVec3::new(-1, -1, -1),
    IVec3::new(1, -1, -1),
];

/// Octant of `pos` relative to a branch centred at `origin`
pub fn pos_to_index(pos: IVec3, origin: IVec3) -> u8 {
    let top = pos.y >= origin.y;
    let east = pos.x >= origin.x;
    let south = pos.z >= origin.z;
    match (top, east, south) {
        (true, true, true) => 0,
        (true, false, true) => 1,
        (true, false, false) => 2,
        (true, true, false) => 3,
        (false, true, true) => 4,
        (false, false, true) => 5,
        (false, false, false) => 6,
        (false, true, false) => 7,
    }
}

/// Centre of octant `idx` of a branch centred at `origin`, `s` being the
/// quarter width of that branch
pub fn idx_to_offset(idx: u8, s: i32, origin: IVec3) -> IVec3 {
    origin + OCTANT_SIGNS[idx as usize] * s
}

/// Floating point variant of [`idx_to_offset`]
pub fn idx_to_offset_f(idx: u8, s: f32, origin: Vec3) -> Vec3 {
    origin + OCTANT_SIGNS[idx as usize].as_vec3() * s
}

/// Cell of the voxel in octant `idx` of a bottom branch centred at `origin`
pub fn idx_to_offset_voxel(idx: u8, origin: IVec3) -> IVec3 {
    origin + OCTANT_SIGNS[idx as usize].min(IVec3::ZERO)
}

/// Octant a root child moves to inside its new parent when the tree grows
pub fn idx_to_move(idx: u8) -> u8 {
    const MOVES: [u8; 8] = [6, 7, 4, 5, 2, 3, 0, 1];
    MOVES[idx as usize]
}

/// Nearest voxel hit by a ray segment
#[derive(Clone, Copy, Debug)]
pub struct RayCastResult {
    /// Pool index of the hit voxel
    pub node: Index,
    pub voxel: Voxel,
    /// Normal of the face that was hit
    pub normal: Vec3,
    pub hit_pos: Vec3,
    /// Integer cell of the voxel
    pub pos: IVec3,
    /// Centre of the voxel box
    pub world_pos: Vec3,
    /// `normal` as an integer face offset
    pub orientation: IVec3,
}

/// One step of a root-to-leaf walk
#[derive(Clone, Copy, Debug)]
struct PathStep {
    parent: usize,
    node: usize,
    prev: Option<usize>,
    is_voxel: bool,
}

/// Sparse voxel octree backed by a [`NodesPool`]
#[derive(Clone, Debug)]
pub struct Octree {
    nodes: NodesPool,
    depth: usize,
}

impl Octree {
    /// Create an empty tree of depth 1, holding the cells `{-1, 0}³`
    pub fn new() -> Self {
        let mut nodes = NodesPool::new();
        let root = nodes.insert();
        assert_eq!(root, 0, "Root must occupy the first pool slot");
        *nodes.at_mut(root) = Self::new_branch(0, BAD_INDEX).into();
        Self { nodes, depth: 1 }
    }

    /// Reassemble a tree from a pool and depth without validation
    pub(crate) fn from_parts(nodes: NodesPool, depth: usize) -> Self {
        Self { nodes, depth }
    }

    fn new_branch(index: u8, child: Index) -> Branch {
        let mut branch = Branch::default();
        branch.set_index(index);
        branch.set_child(child);
        branch.set_next(BAD_INDEX);
        branch
    }

    /// Number of levels below the root
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Half-extent of the covered volume
    pub fn width(&self) -> i32 {
        width_for_level(self.depth)
    }

    /// Number of live nodes, root included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True if no voxel is stored
    pub fn is_empty(&self) -> bool {
        !is_link(self.nodes.at(0).branch().child())
    }

    pub fn pool(&self) -> &NodesPool {
        &self.nodes
    }

    pub fn is_outside(&self, pos: IVec3) -> bool {
        let w = self.width();
        pos.cmplt(IVec3::splat(-w)).any() || pos.cmpge(IVec3::splat(w)).any()
    }

    /// Iterate over a sibling list starting at `first`
    pub(crate) fn siblings(&self, first: Index, is_voxel: bool) -> impl Iterator<Item = usize> + '_ {
        std::iter::successors(Some(first).filter(|&i| is_link(i)), move |&i| {
            Some(self.nodes.at(i as usize).next(is_voxel)).filter(|&n| is_link(n))
        })
        .map(|i| i as usize)
    }

    /// Store `voxel`'s payload at `pos`, growing the tree as needed.
    ///
    /// An existing voxel at `pos` is overwritten in place. Returns the pool
    /// index of the voxel node.
    ///
    /// # Panics
    /// Panics if `pos` is not [`is_addressable`].
    pub fn insert(&mut self, pos: IVec3, voxel: Voxel) -> Index {
        assert!(
            is_addressable(pos),
            "Position {:?} outside the addressable range [-{}, {})",
            pos,
            MAX_WIDTH,
            MAX_WIDTH
        );
        while self.is_outside(pos) {
            self.expand(0, 1);
        }

        let mut parent = 0usize;
        let mut origin = IVec3::ZERO;
        let mut level = 1usize;

        loop {
            let is_voxel = self.depth == level;
            let octant = pos_to_index(pos, origin);

            let mut last_child = None;
            let mut found = None;
            for child in self.siblings(self.nodes.at(parent).branch().child(), is_voxel) {
                if self.nodes.at(child).index(is_voxel) == octant {
                    found = Some(child);
                    break;
                }
                last_child = Some(child);
            }

            let child = match found {
                Some(child) if is_voxel => {
                    self.nodes.at_mut(child).voxel_mut().assign_payload(&voxel);
                    return child as Index;
                }
                Some(child) => child,
                None => {
                    let child = self.alloc_child(parent, last_child, octant, is_voxel, &voxel);
                    if is_voxel {
                        return child as Index;
                    }
                    child
                }
            };

            origin = idx_to_offset(octant, width_for_level(self.depth - level + 1) / 2, origin);
            parent = child;
            level += 1;
        }
    }

    fn alloc_child(
        &mut self,
        parent: usize,
        last_child: Option<usize>,
        octant: u8,
        is_voxel: bool,
        voxel: &Voxel,
    ) -> usize {
        let node = if is_voxel {
            let mut leaf = *voxel;
            leaf.set_index(octant);
            leaf.set_next(BAD_INDEX);
            leaf.into()
        } else {
            Self::new_branch(octant, BAD_INDEX).into()
        };
        let idx = self.alloc_node(node);

        match last_child {
            None => self.nodes.at_mut(parent).branch_mut().set_child(idx),
            Some(last) => self.nodes.at_mut(last).set_next(is_voxel, idx),
        }
        idx as usize
    }

    /// Store `node` in a fresh pool slot and return its link
    fn alloc_node(&mut self, node: Node) -> Index {
        let idx = node_link(self.nodes.insert());
        *self.nodes.at_mut(idx as usize) = node;
        idx
    }

    /// Root-to-leaf walk towards `pos`; `None` if any node along it is missing
    fn path_to(&self, pos: IVec3) -> Option<Vec<PathStep>> {
        if self.is_outside(pos) {
            return None;
        }

        let mut path = Vec::with_capacity(self.depth);
        let mut parent = 0usize;
        let mut origin = IVec3::ZERO;

        for level in 1..=self.depth {
            let is_voxel = self.depth == level;
            let octant = pos_to_index(pos, origin);

            let mut prev = None;
            let mut found = None;
            for child in self.siblings(self.nodes.at(parent).branch().child(), is_voxel) {
                if self.nodes.at(child).index(is_voxel) == octant {
                    found = Some(child);
                    break;
                }
                prev = Some(child);
            }

            let node = found?;
            path.push(PathStep { parent, node, prev, is_voxel });
            origin = idx_to_offset(octant, width_for_level(self.depth - level + 1) / 2, origin);
            parent = node;
        }

        Some(path)
    }

    /// Pool index of the voxel stored at `pos`
    pub fn find_node(&self, pos: IVec3) -> Option<Index> {
        self.path_to(pos)?.last().map(|step| step.node as Index)
    }

    pub fn find(&self, pos: IVec3) -> Option<Voxel> {
        self.find_node(pos).map(|idx| *self.nodes.at(idx as usize).voxel())
    }

    /// Remove the voxel at `pos`, pruning branches left without children.
    ///
    /// The root and the tree depth are never removed. Returns `false` if
    /// nothing was stored at `pos`.
    pub fn remove(&mut self, pos: IVec3) -> bool {
        let Some(path) = self.path_to(pos) else {
            return false;
        };

        for step in path.iter().rev() {
            let next = self.nodes.at(step.node).next(step.is_voxel);
            match step.prev {
                Some(prev) => self.nodes.at_mut(prev).set_next(step.is_voxel, next),
                None => self.nodes.at_mut(step.parent).branch_mut().set_child(next),
            }
            self.nodes.erase(step.node);
            *self.nodes.at_mut(step.node) = Node::default();

            let parent_has_children = is_link(self.nodes.at(step.parent).branch().child());
            if step.parent == 0 || parent_has_children {
                break;
            }
        }

        true
    }

    /// Grow the tree by one level.
    ///
    /// Every child of `idx` (whose children sit at `level`) is wrapped in a
    /// new branch occupying the child's old octant, and moves to the
    /// opposite octant inside that wrapper. World positions of all stored
    /// voxels are unchanged. Only meaningful for the root.
    ///
    /// # Panics
    /// Panics if the tree is already [`MAX_DEPTH`] levels deep.
    pub fn expand(&mut self, idx: usize, level: usize) {
        assert!(self.depth < MAX_DEPTH, "Octree cannot grow beyond depth {}", MAX_DEPTH);
        let is_voxel = self.depth == level;
        let mut child_idx = self.nodes.at(idx).branch().child();
        self.nodes.at_mut(idx).branch_mut().set_child(BAD_INDEX);
        let mut last_wrapper: Option<usize> = None;

        while is_link(child_idx) {
            let child = self.nodes.at_mut(child_idx as usize);
            let next = child.next(is_voxel);
            let octant = child.index(is_voxel);
            child.set_next(is_voxel, BAD_INDEX);
            child.set_index(is_voxel, idx_to_move(octant));

            let wrapper = self.alloc_node(Self::new_branch(octant, child_idx).into());
            match last_wrapper {
                None => self.nodes.at_mut(idx).branch_mut().set_child(wrapper),
                Some(last) => self.nodes.at_mut(last).branch_mut().set_next(wrapper),
            }
            last_wrapper = Some(wrapper as usize);

            child_idx = next;
        }

        self.depth += 1;
        log::debug!("Octree expanded to depth {} (width {})", self.depth, self.width());
    }

    /// Nearest voxel intersected by the segment `from..to`
    pub fn ray_cast(&self, from: Vec3, to: Vec3) -> Option<RayCastResult> {
        self.ray_cast_children(0, IVec3::ZERO, 1, from, to)
    }

    fn ray_cast_children(
        &self,
        parent: usize,
        origin: IVec3,
        level: usize,
        from: Vec3,
        to: Vec3,
    ) -> Option<RayCastResult> {
        let is_voxel = self.depth == level;
        let branch_width = width_for_level(self.depth - level + 1);
        let half = branch_width as f32 / 2.0;
        let mut result: Option<RayCastResult> = None;

        for child in self.siblings(self.nodes.at(parent).branch().child(), is_voxel) {
            let node = self.nodes.at(child);
            let octant = node.index(is_voxel);

            let child_pos = idx_to_offset_f(octant, half, origin.as_vec3());
            let min = child_pos - Vec3::splat(half + 0.5);
            let max = child_pos + Vec3::splat(half - 0.5);
            let Some(hit) = intersect_box(min, max, from, to) else {
                continue;
            };

            let candidate = if is_voxel {
                let pos = idx_to_offset_voxel(octant, origin);
                let world_pos = Aabb::cell(pos).center();
                let normal = vec_to_normal(hit - world_pos);
                Some(RayCastResult {
                    node: child as Index,
                    voxel: *node.voxel(),
                    normal,
                    hit_pos: hit,
                    pos,
                    world_pos,
                    orientation: normal.as_ivec3(),
                })
            } else {
                let child_origin = idx_to_offset(octant, branch_width / 2, origin);
                self.ray_cast_children(child, child_origin, level + 1, from, to)
            };

            if let Some(candidate) = candidate {
                let nearer = result
                    .as_ref()
                    .is_none_or(|r| r.hit_pos.distance(from) > candidate.hit_pos.distance(from));
                if nearer {
                    result = Some(candidate);
                }
            }
        }

        result
    }

    /// Cursor positioned at the root
    pub fn iterate(&self) -> OctreeIterator<'_> {
        OctreeIterator::new(self, 0, 0, IVec3::ZERO)
    }

    /// Every stored voxel with its cell, depth first
    pub fn voxels(&self) -> Voxels<'_> {
        Voxels::new(self.iterate())
    }

    /// Indented description of every node, root first
    pub fn dump_lines(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(self.len());
        self.dump_node(0, 0, &mut lines);
        lines
    }

    /// Log the tree structure at debug level
    pub fn dump(&self) {
        for line in self.dump_lines() {
            log::debug!("{}", line);
        }
    }

    fn dump_node(&self, idx: usize, level: usize, lines: &mut Vec<String>) {
        let indent = "  ".repeat(level);
        let node = self.nodes.at(idx);
        if self.depth == level {
            lines.push(format!("{}Voxel: [{}] {:?}", indent, idx, node.voxel()));
        } else {
            lines.push(format!("{}Branch: [{}] {:?}", indent, idx, node.branch()));
            for child in self.siblings(node.branch().child(), self.depth == level + 1) {
                self.dump_node(child, level + 1, lines);
            }
        }
    }
}

impl Default for Octree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voxel(block_type: u16, color: u8) -> Voxel {
        Voxel::new(block_type, color, 0, 0)
    }

    fn three_in_a_row() -> Octree {
        let mut tree = Octree::new();
        tree.insert(IVec3::new(0, 0, 0), voxel(1, 1));
        tree.insert(IVec3::new(1, 0, 0), voxel(2, 2));
        tree.insert(IVec3::new(2, 0, 0), voxel(3, 3));
        tree
    }

    #[test]
    fn test_helpers() {
        assert_eq!(width_for_level(0), 0);
        assert_eq!(width_for_level(1), 1);
        assert_eq!(width_for_level(4), 8);

        for idx in 0..8u8 {
            let centre = idx_to_offset(idx, 1, IVec3::ZERO);
            assert_eq!(pos_to_index(centre, IVec3::ZERO), idx);
            assert_eq!(pos_to_index(idx_to_offset_voxel(idx, IVec3::ZERO), IVec3::ZERO), idx);
            assert_eq!(idx_to_move(idx_to_move(idx)), idx);
            assert_eq!(OCTANT_SIGNS[idx_to_move(idx) as usize], -OCTANT_SIGNS[idx as usize]);
        }
        assert_eq!(idx_to_offset_voxel(6, IVec3::ZERO), IVec3::new(-1, -1, -1));
        assert_eq!(idx_to_offset(3, 2, IVec3::ZERO), IVec3::new(2, 2, -2));
    }

    #[test]
    fn test_new_tree() {
        let tree = Octree::new();
        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.width(), 1);
        assert_eq!(tree.len(), 1);
        assert!(tree.is_empty());
        assert!(!tree.is_outside(IVec3::ZERO));
        assert!(!tree.is_outside(IVec3::new(-1, -1, -1)));
        assert!(tree.is_outside(IVec3::new(1, 0, 0)));
        assert!(tree.is_outside(IVec3::new(0, -2, 0)));
        assert!(tree.find(IVec3::ZERO).is_none());
    }

    #[test]
    fn test_insert_and_expand() {
        let mut tree = Octree::new();
        tree.insert(IVec3::new(0, 0, 0), voxel(1, 10));
        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.len(), 2);
        assert!(tree.find(IVec3::new(1, 0, 0)).is_none());
        assert!(tree.find(IVec3::new(-1, 0, 0)).is_none());

        tree.insert(IVec3::new(1, 0, 0), voxel(2, 20));
        assert_eq!(tree.depth(), 2);
        assert_eq!(tree.width(), 2);
        assert_eq!(tree.len(), 4);

        let a = tree.find(IVec3::new(0, 0, 0)).unwrap();
        assert_eq!((a.block_type(), a.color()), (1, 10));
        let b = tree.find(IVec3::new(1, 0, 0)).unwrap();
        assert_eq!((b.block_type(), b.color()), (2, 20));

        tree.insert(IVec3::new(2, 0, 0), voxel(3, 30));
        assert_eq!(tree.depth(), 3);
        assert_eq!(tree.width(), 4);
        assert_eq!(tree.len(), 7);
        assert_eq!(tree.find(IVec3::new(0, 0, 0)).unwrap().color(), 10);
        assert_eq!(tree.find(IVec3::new(1, 0, 0)).unwrap().color(), 20);
        assert_eq!(tree.find(IVec3::new(2, 0, 0)).unwrap().color(), 30);
        assert!(tree.find(IVec3::new(3, 0, 0)).is_none());
        assert!(tree.find(IVec3::new(0, 1, 0)).is_none());
    }

    #[test]
    fn test_row_along_x() {
        let mut tree = Octree::new();
        for x in 0..8 {
            tree.insert(IVec3::new(x, 0, 0), voxel(x as u16, x as u8));
        }
        assert_eq!(tree.depth(), 4);
        for x in 0..8 {
            let v = tree.find(IVec3::new(x, 0, 0)).unwrap();
            assert_eq!(v.block_type(), x as u16);
        }
        for x in [-8, -1, 8, 100] {
            assert!(tree.find(IVec3::new(x, 0, 0)).is_none());
        }
        assert!(tree.find(IVec3::new(3, 1, 0)).is_none());
        assert!(tree.find(IVec3::new(3, 0, -1)).is_none());
    }

    #[test]
    fn test_octant_corners() {
        let mut tree = Octree::new();
        let corners: Vec<IVec3> = (0..8)
            .map(|i| IVec3::new(-(i & 1), -((i >> 1) & 1), -((i >> 2) & 1)))
            .collect();
        for (i, pos) in corners.iter().enumerate() {
            tree.insert(*pos, voxel(i as u16, i as u8));
        }
        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.len(), 9);
        for (i, pos) in corners.iter().enumerate() {
            assert_eq!(tree.find(*pos).unwrap().color(), i as u8, "{:?}", pos);
        }
    }

    #[test]
    fn test_overwrite_in_place() {
        let mut tree = Octree::new();
        let first = tree.insert(IVec3::new(-3, 5, 2), Voxel::new(4, 1, 2, 0));
        let len = tree.len();
        let second = tree.insert(IVec3::new(-3, 5, 2), Voxel::new(7, 9, 11, 1));
        assert_eq!(first, second);
        assert_eq!(tree.len(), len);
        let v = tree.find(IVec3::new(-3, 5, 2)).unwrap();
        assert!(v.same_payload(&Voxel::new(7, 9, 11, 1)));
    }

    #[test]
    fn test_round_trip_and_non_interference() {
        let mut tree = Octree::new();
        let positions: Vec<IVec3> = (0..200)
            .map(|i| IVec3::new((i * 7) % 23 - 11, (i * 13) % 17 - 8, (i * 5) % 29 - 14))
            .collect();
        for (i, pos) in positions.iter().enumerate() {
            tree.insert(*pos, Voxel::new((i % 1000) as u16, i as u8, (i % 24) as u8, (i % 4) as u8));
            assert!(!tree.is_outside(*pos));
        }
        // Later inserts at the same position win
        let mut expected = std::collections::HashMap::new();
        for (i, pos) in positions.iter().enumerate() {
            expected.insert(*pos, i);
        }
        for (pos, i) in expected {
            let v = tree.find(pos).unwrap();
            assert!(v.same_payload(&Voxel::new((i % 1000) as u16, i as u8, (i % 24) as u8, (i % 4) as u8)));
        }
    }

    #[test]
    fn test_depth_never_decreases() {
        let mut tree = Octree::new();
        let mut depth = tree.depth();
        for pos in [IVec3::new(5, 0, 0), IVec3::new(0, 0, 0), IVec3::new(-40, 2, 3), IVec3::new(1, 1, 1)] {
            tree.insert(pos, voxel(1, 1));
            assert!(tree.depth() >= depth);
            depth = tree.depth();
        }
        tree.remove(IVec3::new(-40, 2, 3));
        assert_eq!(tree.depth(), depth);
    }

    #[test]
    fn test_addressable_range_limits() {
        assert!(is_addressable(IVec3::splat(MAX_WIDTH - 1)));
        assert!(is_addressable(IVec3::splat(-MAX_WIDTH)));
        assert!(!is_addressable(IVec3::new(MAX_WIDTH, 0, 0)));
        assert!(!is_addressable(IVec3::new(0, -MAX_WIDTH - 1, 0)));

        let mut tree = Octree::new();
        let far = IVec3::new(MAX_WIDTH - 1, 0, -MAX_WIDTH);
        tree.insert(far, voxel(1, 1));
        tree.insert(IVec3::ZERO, voxel(2, 2));
        assert_eq!(tree.depth(), MAX_DEPTH);
        assert_eq!(tree.width(), MAX_WIDTH);
        assert_eq!(tree.find(far).unwrap().block_type(), 1);
        assert_eq!(tree.find(IVec3::ZERO).unwrap().block_type(), 2);
        assert!(tree.find(IVec3::new(MAX_WIDTH, 0, 0)).is_none());
        assert_eq!(tree.iterate().branch_width(), 2 * MAX_WIDTH);
        assert_eq!(tree.voxels().count(), 2);
    }

    #[test]
    #[should_panic(expected = "outside the addressable range")]
    fn test_insert_beyond_max_width() {
        let mut tree = Octree::new();
        tree.insert(IVec3::new(1 << 29, 0, 0), voxel(1, 1));
    }

    #[test]
    #[should_panic(expected = "cannot grow beyond depth")]
    fn test_expand_stops_at_max_depth() {
        let mut tree = Octree::new();
        tree.insert(IVec3::splat(-MAX_WIDTH), voxel(1, 1));
        tree.expand(0, 1);
    }

    #[test]
    #[should_panic(expected = "collides with the link sentinel")]
    fn test_node_link_rejects_sentinel() {
        node_link(BAD_INDEX as usize);
    }

    #[test]
    fn test_node_link() {
        assert_eq!(node_link(0), 0);
        assert_eq!(node_link(BAD_INDEX as usize - 1), BAD_INDEX - 1);
    }

    #[test]
    fn test_remove() {
        let mut tree = three_in_a_row();
        assert!(tree.remove(IVec3::new(2, 0, 0)));
        // The voxel and its now-empty branch are released
        assert_eq!(tree.len(), 5);
        assert!(tree.find(IVec3::new(2, 0, 0)).is_none());
        assert!(tree.find(IVec3::new(0, 0, 0)).is_some());
        assert!(tree.find(IVec3::new(1, 0, 0)).is_some());

        assert!(!tree.remove(IVec3::new(2, 0, 0)));
        assert!(!tree.remove(IVec3::new(100, 0, 0)));

        assert!(tree.remove(IVec3::new(0, 0, 0)));
        assert!(tree.remove(IVec3::new(1, 0, 0)));
        assert_eq!(tree.len(), 1);
        assert!(tree.is_empty());

        // Freed slots are reused
        tree.insert(IVec3::new(1, 1, 1), voxel(5, 5));
        assert!(tree.len() > 1);
        assert_eq!(tree.find(IVec3::new(1, 1, 1)).unwrap().block_type(), 5);
    }

    #[test]
    fn test_remove_middle_sibling() {
        let mut tree = Octree::new();
        tree.insert(IVec3::new(0, 0, 0), voxel(1, 1));
        tree.insert(IVec3::new(-1, 0, 0), voxel(2, 2));
        tree.insert(IVec3::new(-1, 0, -1), voxel(3, 3));
        assert!(tree.remove(IVec3::new(-1, 0, 0)));
        assert_eq!(tree.find(IVec3::new(0, 0, 0)).unwrap().color(), 1);
        assert_eq!(tree.find(IVec3::new(-1, 0, -1)).unwrap().color(), 3);
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn test_ray_cast_hits_first_voxel() {
        let tree = three_in_a_row();
        let from = Vec3::new(-1.807_902_1, 1.619_721_3, 2.196_398_5);
        let to = Vec3::new(56.626_148, -37.619_316, -71.303_925);
        let res = tree.ray_cast(from, to).unwrap();
        assert!(res.hit_pos.distance(Vec3::new(-0.140_433_67, 0.5, 0.099_000_454)) < 0.05);
        assert_eq!(res.node, 1);
        assert_eq!(res.pos, IVec3::new(0, 0, 0));
        assert_eq!(res.normal, Vec3::Y);
        assert_eq!(res.orientation, IVec3::Y);
        assert_eq!(res.voxel.color(), 1);
    }

    #[test]
    fn test_ray_cast_shallow_angle() {
        let tree = three_in_a_row();
        let from = Vec3::new(-2.318_130_5, 0.834_588_8, 0.807_334_3);
        let to = Vec3::new(96.662_598, -14.871_897, -22.763_479);
        let res = tree.ray_cast(from, to).unwrap();
        assert!(res.hit_pos.distance(Vec3::new(-0.209_584_71, 0.5, 0.305_214_94)) < 0.05);
        assert_eq!(res.node, 1);
        assert_eq!(res.pos, IVec3::new(0, 0, 0));
    }

    #[test]
    fn test_ray_cast_from_other_side() {
        let tree = three_in_a_row();
        let from = Vec3::new(6.017_351, 0.846_191_8, 0.043_358_475);
        let to = Vec3::new(-94.387_1, -12.235_116, 0.299_766_1);
        let res = tree.ray_cast(from, to).unwrap();
        assert!(res.hit_pos.distance(Vec3::new(2.5, 0.387_929_65, 0.052_340_902)) < 0.05);
        assert_eq!(res.node, 6);
        assert_eq!(res.pos, IVec3::new(2, 0, 0));
        assert_eq!(res.world_pos, Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(res.normal, Vec3::X);
    }

    #[test]
    fn test_ray_cast_miss() {
        let tree = three_in_a_row();
        assert!(tree.ray_cast(Vec3::new(-5.0, 3.0, 0.0), Vec3::new(5.0, 3.0, 0.0)).is_none());
        // Segment ending before the first voxel
        assert!(tree.ray_cast(Vec3::new(-5.0, 0.0, 0.0), Vec3::new(-2.0, 0.0, 0.0)).is_none());
        assert!(Octree::new().ray_cast(Vec3::splat(-3.0), Vec3::splat(3.0)).is_none());
    }

    #[test]
    fn test_dump_lines() {
        let tree = three_in_a_row();
        let lines = tree.dump_lines();
        assert_eq!(lines.len(), tree.len());
        assert!(lines[0].starts_with("Branch: [0]"));
        assert_eq!(lines.iter().filter(|l| l.trim_start().starts_with("Voxel")).count(), 3);
        assert!(lines.iter().any(|l| l.starts_with("      Voxel: [6]")));
    }
}
