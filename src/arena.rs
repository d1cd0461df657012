//! The node arena: a ring of fixed-size node slabs.
//!
//! Grounded on `examples/original_source/ltjson.c`'s "Memory layout" block
//! and `get_new_node`. The C version allocates nodes in sets (slabs); the
//! first slot of each set is a "basenode" that overlays an in-use counter
//! into the ordinary node structure, and slabs are linked into a ring so a
//! fully-recycled arena can hand out storage again without calling
//! `malloc`. This port keeps exactly that shape — see [`NodeType::BaseNode`]
//! in `crate::node` for why a basenode is a real, addressable `Node` rather
//! than separate metadata — but trades the C version's raw-pointer ring
//! for a flat `Vec<Slab>` addressed by index, and trades pointer arithmetic
//! (`basenode + nused`) for a `NodeId` encoding. Either substitution is
//! sanctioned as an equally faithful translation of the pinned-slab design;
//! this crate just cannot get the compiler's help verifying raw pointers
//! the way the C original's author could get from a fuzzer and asan.

use crate::error::JsonError;
use crate::node::{Node, NodeId, NodeType, ROOT_ID};

struct Slab {
    /// Count of slots in use, *including* the basenode slot itself — a
    /// fresh slab starts at 1, matching `nused = 1` in `get_new_node`.
    nused: u32,
    /// The slab's usable node slots; always exactly `cap` long. Slots at
    /// and past `nused - 1` hold stale data and must not be read.
    nodes: Vec<Node>,
    /// Ring link: index of the next slab.
    next: usize,
}

/// A ring of node slabs, handing out [`NodeId`]s. The root node is *not*
/// part of this arena — it is embedded directly in
/// [`crate::context::Context`], matching `ltjson_info_t::rootnode` — so
/// every id this arena produces is `>= 1`.
pub struct NodeArena {
    slabs: Vec<Slab>,
    /// Index of the ring's head slab (the first one ever allocated).
    head: Option<usize>,
    /// Index of the slab currently being filled.
    current: Option<usize>,
    /// Usable node slots per slab (slab size minus one, for the basenode).
    cap: usize,
}

impl NodeArena {
    /// `slab_size` is the configured total slot count per slab, basenode
    /// included (mirrors `nodeasize` after `create_tree`'s `nodeasize++`).
    pub fn new(slab_size: usize) -> Self {
        NodeArena {
            slabs: Vec::new(),
            head: None,
            current: None,
            cap: slab_size.saturating_sub(1).max(1),
        }
    }

    fn node_id(&self, slab: usize, local: usize) -> NodeId {
        1 + (slab * self.cap + local) as u32
    }

    fn locate(&self, id: NodeId) -> (usize, usize) {
        debug_assert!(id != ROOT_ID, "root is not an arena node");
        let offset = (id - 1) as usize;
        (offset / self.cap, offset % self.cap)
    }

    /// Allocate a fresh, empty node. Mirrors `get_new_node`.
    pub fn alloc(&mut self) -> Result<NodeId, JsonError> {
        if let Some(cur) = self.current {
            if (self.slabs[cur].nused as usize) < self.cap + 1 {
                let local = self.slabs[cur].nused as usize - 1;
                self.slabs[cur].nused += 1;
                self.slabs[cur].nodes[local] = Node::empty();
                return Ok(self.node_id(cur, local));
            }
        }

        let cur = match self.current {
            None => self.push_slab()?,
            Some(cur) => {
                let next = self.slabs[cur].next;
                if Some(next) == self.head {
                    // Ring exhausted for this pass: every slab up to the
                    // head has already been claimed. Grow the ring.
                    self.push_slab()?
                } else {
                    // `next` was allocated in an earlier pass and reset to
                    // `nused == 1` by `recycle`; reuse it.
                    next
                }
            }
        };

        self.current = Some(cur);
        self.slabs[cur].nused = 2;
        self.slabs[cur].nodes[0] = Node::empty();
        Ok(self.node_id(cur, 0))
    }

    fn push_slab(&mut self) -> Result<usize, JsonError> {
        let idx = self.slabs.len();
        let mut nodes = Vec::new();
        nodes
            .try_reserve_exact(self.cap)
            .map_err(|_| JsonError::OutOfMemory)?;
        nodes.resize_with(self.cap, Node::empty);

        let next = self.head.unwrap_or(idx);
        self.slabs.push(Slab {
            nused: 1,
            nodes,
            next,
        });

        if let Some(cur) = self.current {
            self.slabs[cur].next = idx;
        }
        if self.head.is_none() {
            self.head = Some(idx);
        }
        Ok(idx)
    }

    pub fn get(&self, id: NodeId) -> &Node {
        let (slab, local) = self.locate(id);
        &self.slabs[slab].nodes[local]
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut Node {
        let (slab, local) = self.locate(id);
        &mut self.slabs[slab].nodes[local]
    }

    /// Mark every slab's basenode reusable again and rewind the ring to
    /// its head, without touching a single allocation. Mirrors the
    /// `cbasenode` loop in `create_tree`.
    pub fn recycle(&mut self) {
        if let Some(head) = self.head {
            let mut idx = head;
            loop {
                self.slabs[idx].nused = 1;
                idx = self.slabs[idx].next;
                if idx == head {
                    break;
                }
            }
            self.current = Some(head);
        }
    }

    /// `(slab count, node slots allocated, node slots filled)`, feeding
    /// `MSTAT_NODES_ALLOC` / `MSTAT_NODES_USED`.
    pub fn stats(&self) -> (usize, usize, usize) {
        let per_slab = self.cap + 1;
        let allocated = self.slabs.len() * per_slab;
        let used: usize = self.slabs.iter().map(|s| s.nused as usize).sum();
        (self.slabs.len(), allocated, used)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_stays_within_one_slab() {
        let mut arena = NodeArena::new(4);
        let ids: Vec<_> = (0..3).map(|_| arena.alloc().unwrap()).collect();
        assert_eq!(arena.stats().0, 1);
        assert_eq!(ids.len(), 3);
    }

    #[test]
    fn alloc_grows_into_new_slab() {
        let mut arena = NodeArena::new(4);
        for _ in 0..3 {
            arena.alloc().unwrap();
        }
        arena.alloc().unwrap();
        assert_eq!(arena.stats().0, 2);
    }

    #[test]
    fn recycle_reuses_slabs_without_growing() {
        let mut arena = NodeArena::new(4);
        for _ in 0..6 {
            arena.alloc().unwrap();
        }
        let slabs_before = arena.stats().0;

        arena.recycle();
        for _ in 0..6 {
            arena.alloc().unwrap();
        }

        assert_eq!(arena.stats().0, slabs_before);
    }

    #[test]
    fn node_ids_are_distinct_and_resolvable() {
        let mut arena = NodeArena::new(4);
        let a = arena.alloc().unwrap();
        let b = arena.alloc().unwrap();
        assert_ne!(a, b);
        arena.get_mut(a).ntype = NodeType::Integer;
        assert_eq!(arena.get(a).ntype, NodeType::Integer);
        assert_eq!(arena.get(b).ntype, NodeType::Empty);
    }
}
