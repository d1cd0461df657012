//! The engine handle: owns the root node, the three arenas, the lexer's
//! suspended state, and the two process-wide tunables snapshotted at
//! creation time.
//!
//! Grounded on `examples/original_source/ltjson.c`'s `ltjson_info_t` /
//! `create_tree` / `destroy_tree` / `get_new_node`. The C struct's trick of
//! overlaying the root node as the first field of the info struct (so a
//! `ltjson_node_t *` and a `ltjson_info_t *` are interchangeable) is called
//! out in `spec.md` §9 as "not a contract" — this port keeps the root
//! separate, as a plain `Node` field, and every traversal/mutation routine
//! special-cases `ROOT_ID` instead.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::arena::NodeArena;
use crate::error::{JsonError, SequenceError};
use crate::lexer::Lexer;
use crate::nhash::NameHash;
use crate::node::{Node, NodeId, NodeType, ROOT_ID};
use crate::sstore::{StringRef, StringStore};

/// `JSONNODE_DEF_ALLOC` in `ltlocal.h`, plus one for the basenode —
/// matching `create_tree`'s `nodeasize++`.
const DEFAULT_SLAB_SIZE: usize = 33;
/// `JSONNODE_MIN_ALLOC` (8 usable nodes) plus the basenode slot.
const MIN_SLAB_SIZE: usize = 9;
/// `SSTORE_DEF_ALLOC` (`2048 - sizeof(struct sstore)`, rounded for a crate
/// with no separate block-header struct to subtract).
const DEFAULT_SSTORE_BLOCK: usize = 2048;

static DEFAULT_SLAB: AtomicUsize = AtomicUsize::new(DEFAULT_SLAB_SIZE);
static DEFAULT_SSTORE: AtomicUsize = AtomicUsize::new(DEFAULT_SSTORE_BLOCK);

/// Override the process-wide default node-slab size for contexts created
/// after this call. Mirrors setting the C global `ltjson_allocsize_nodes`.
/// Contexts snapshot this value at creation (§5), so existing contexts are
/// unaffected.
pub fn set_default_slab_size(n: usize) {
    DEFAULT_SLAB.store(n.max(MIN_SLAB_SIZE), Ordering::Relaxed);
}

/// Override the process-wide default string-store block size (including
/// notional header) for contexts created after this call.
pub fn set_default_sstore_block_size(n: usize) {
    DEFAULT_SSTORE.store(n, Ordering::Relaxed);
}

/// The engine's view of whether a tree can currently accept more text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseOutcome {
    /// The tree's outermost container has been closed; `trailing` counts
    /// remaining non-whitespace bytes the caller passed but the parser
    /// never consumed.
    Closed { trailing: usize },
    /// The tree is still open; feed more bytes in a subsequent `parse` call.
    NeedMore,
}

/// Saved mid-grammar state, restored on resume. Distinct from the lexer's
/// own mid-lexeme state (`Lexer`), which survives independently.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ParseCursor {
    pub node: NodeId,
}

pub struct Context {
    pub(crate) root: Node,
    pub(crate) arena: NodeArena,
    pub(crate) sstore: StringStore,
    pub(crate) nhash: Option<NameHash>,
    pub(crate) lexer: Lexer,

    /// `Some` while the tree is mid-parse; the cursor node to resume at.
    pub(crate) cursor: Option<ParseCursor>,
    /// Set by `store_strnum`-equivalent tokenisation when the current
    /// lexeme is itself an object-member name awaiting `:` (mirrors
    /// `JSONNODE_NFLAGS_COLON` being set on `cursor`, tracked here only to
    /// remember we were mid-lexeme across a suspend inside the grammar
    /// loop rather than inside the lexer).
    pub(crate) lasterr: Option<SequenceError>,
}

impl Context {
    /// Create a fresh context, snapshotting the process-wide tunables.
    /// Mirrors `create_tree(NULL)`.
    pub fn new() -> Self {
        let slab_size = DEFAULT_SLAB.load(Ordering::Relaxed).max(MIN_SLAB_SIZE);
        let sstore_block_size = DEFAULT_SSTORE.load(Ordering::Relaxed);

        Context {
            root: Node::empty(),
            arena: NodeArena::new(slab_size),
            sstore: StringStore::new(sstore_block_size),
            nhash: None,
            lexer: Lexer::new(),
            cursor: None,
            lasterr: None,
        }
    }

    pub fn with_hash() -> Self {
        let mut ctx = Context::new();
        ctx.nhash = Some(NameHash::new());
        ctx
    }

    /// `true` once the root has been opened (type set) and not yet closed
    /// and not mid-parse i.e. the tree is in a terminal, readable state.
    /// Mirrors `is_closed_tree` minus the `lasterr` check (callers combine
    /// this with `self.lasterr.is_none()` where the spec requires it).
    pub fn is_closed(&self) -> bool {
        self.cursor.is_none() && self.lasterr.is_none() && self.root.ntype != NodeType::Empty
    }

    pub fn last_error(&self) -> &'static str {
        match self.lasterr {
            Some(e) => e.description(),
            None => SequenceError::NoError.description(),
        }
    }

    /// Reset node slabs, string store and (per `use_hash`) the name hash so
    /// the same allocations serve a brand-new tree. Mirrors `create_tree`'s
    /// recycle branch. Does not reallocate the `Context` itself — callers
    /// recycle by calling this on an existing `Context`, which is the
    /// idiomatic stand-in for "pass a non-null closed tree back into
    /// `ltjson_parse`".
    pub(crate) fn recycle(&mut self, use_hash: bool) {
        log::debug!("recycling json tree (use_hash={use_hash})");

        self.arena.recycle();
        self.sstore.clear();

        match (use_hash, self.nhash.is_some()) {
            (true, true) => self.nhash.as_mut().unwrap().reset(),
            (true, false) => self.nhash = Some(NameHash::new()),
            (false, _) => self.nhash = None,
        }

        self.root = Node::empty();
        self.cursor = None;
        self.lasterr = None;
        self.lexer = Lexer::new();
    }

    /// Resolve a `NodeId` to its node, transparently handling the root.
    pub(crate) fn node(&self, id: NodeId) -> &Node {
        if id == ROOT_ID {
            &self.root
        } else {
            self.arena.get(id)
        }
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        if id == ROOT_ID {
            &mut self.root
        } else {
            self.arena.get_mut(id)
        }
    }

    /// Allocate a fresh, empty node. Mirrors `get_new_node`.
    pub(crate) fn new_node(&mut self) -> Result<NodeId, JsonError> {
        self.arena.alloc()
    }

    /// Intern or store a name string for an object member, following the
    /// hash-or-plain-store split `process_json_alnum` makes when it calls
    /// `nhash_insert` vs `sstore_add`.
    pub(crate) fn intern_name(&mut self, s: &str) -> Result<StringRef, JsonError> {
        match self.nhash.as_mut() {
            Some(hash) => hash.insert(&mut self.sstore, s),
            None => self.sstore.add(s),
        }
    }

    pub(crate) fn store_value_string(&mut self, s: &str) -> Result<StringRef, JsonError> {
        self.sstore.add(s)
    }

    pub fn resolve(&self, r: StringRef) -> &str {
        self.sstore.get(r)
    }

    /// Look an already-interned name up without inserting it. Returns
    /// `None` both when the hash has no such entry and when the context
    /// carries no hash at all — callers distinguish the two via
    /// [`Context::has_hash`].
    pub fn get_hashstring(&self, name: &str) -> Result<Option<StringRef>, JsonError> {
        match self.nhash.as_ref() {
            Some(hash) => Ok(hash.lookup(&self.sstore, name)),
            None => Err(JsonError::NoHash),
        }
    }

    pub fn has_hash(&self) -> bool {
        self.nhash.is_some()
    }

    /// Root's `NodeId`, exposed for traversal/query entry points that take
    /// "the tree" rather than a specific subtree.
    pub fn root_id(&self) -> NodeId {
        ROOT_ID
    }

    /// 13-entry memory statistic vector, matching `ltjson_memstat`'s
    /// `MSTAT_*` table in `ltlocal.h`. Returns at most `n` entries (and at
    /// most 7 if the context has no name hash, exactly as the C version
    /// clamps `nents` when `!jsoninfo->nhtab`).
    pub fn memstat(&self, n: usize) -> Vec<i64> {
        let (slabs, node_alloc, node_used) = self.arena.stats();
        let (sstore_blocks, sstore_alloc, sstore_used) = self.sstore.stats();

        let mut full = vec![0i64; 13];
        full[1] = node_alloc as i64 - slabs as i64; // basenodes excluded, MSTAT_NODES_ALLOC
        full[2] = node_used as i64 - slabs as i64; // MSTAT_NODES_USED
        full[3] = 0; // MSTAT_WORKSTR_ALLOC: lexer buffer is a Vec<u8>, not tracked as a separate alloc
        full[4] = sstore_blocks as i64;
        full[5] = sstore_alloc as i64;
        full[6] = sstore_used as i64;

        let mut n = n.min(13);

        if let Some(hash) = &self.nhash {
            let (buckets_filled, cells_alloc, cells_used) = hash.stats();
            full[7] = 512;
            full[8] = buckets_filled as i64;
            full[9] = cells_alloc as i64;
            full[10] = cells_used as i64;
            full[11] = hash.hits() as i64;
            full[12] = hash.misses() as i64;
        } else {
            n = n.min(7);
        }

        full[0] = std::mem::size_of::<Context>() as i64
            + full[1] * std::mem::size_of::<Node>() as i64
            + full[5]
            + full[9] * std::mem::size_of::<StringRef>() as i64;

        full.truncate(n);
        full
    }

    /// Description strings matching `ltjson_statstring`/`ltjson_memstatdesc`.
    pub fn stat_name(index: usize) -> Option<&'static str> {
        const NAMES: [&str; 13] = [
            "total memory (bytes)",
            "json nodes created",
            "json nodes filled",
            "working store (bytes)",
            "string store chains",
            "string store total (bytes)",
            "string store used (bytes)",
            "hash buckets created",
            "hash buckets filled",
            "hash cells created",
            "hash cells filled",
            "hash hits",
            "hash misses",
        ];
        NAMES.get(index).copied()
    }

    /// `println!`-based dump of every available statistic, matching
    /// `ltjson_statdump`'s teacher-style output-to-stdout convention (see
    /// also `Database::print_outline`).
    pub fn dump_stats(&self) {
        println!("jsontree memory statistics");
        for (i, value) in self.memstat(13).iter().enumerate() {
            if let Some(name) = Context::stat_name(i) {
                println!("\t{name}: {value}");
            }
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Context::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_context_is_not_closed() {
        let ctx = Context::new();
        assert!(!ctx.is_closed());
        assert_eq!(ctx.last_error(), "No error");
    }

    #[test]
    fn memstat_clamps_to_seven_entries_without_hash() {
        let ctx = Context::new();
        assert_eq!(ctx.memstat(13).len(), 7);
    }

    #[test]
    fn memstat_returns_full_vector_with_hash() {
        let ctx = Context::with_hash();
        assert_eq!(ctx.memstat(13).len(), 13);
    }
}
