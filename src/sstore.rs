//! The string store: an append-only chain of fixed blocks that strings are
//! packed into, cleared by rewinding rather than freeing.
//!
//! Grounded on `examples/original_source/lttext.c`'s `sstore_*` family. The
//! C version hands back raw `char *` into the block; because the block's
//! backing memory is never moved while a parse is in progress, that pointer
//! stays valid for as long as the store itself lives. This version hands
//! back a [`StringRef`] — `(block, offset, len)` — instead of a pointer. The
//! same stability argument holds (a block's `Vec<u8>` is only ever appended
//! to, never reallocated past its initial block size, and blocks are never
//! removed, only rewound), so a `StringRef` stays valid for exactly as long
//! as a C pointer would: until the store is cleared or the owning `Context`
//! is dropped.

use crate::error::JsonError;

/// A fixed-size allocation in the block chain.
struct Block {
    data: Vec<u8>,
    cap: usize,
    next: Option<u32>,
    prev: Option<u32>,
}

impl Block {
    fn avail(&self) -> usize {
        self.cap - self.data.len()
    }
}

/// Minimum block size, matching `SSTORE_MIN_ALLOC` in `ltlocal.h`.
const SSTORE_MIN_ALLOC: usize = 64;

/// A handle to a string previously added to a [`StringStore`]. Two
/// `StringRef`s compare equal iff they were handed back from the same
/// `add`/`add_str` call on the same store, or both are `EMPTY` — this is
/// the safe stand-in for the original's pointer-identity interning trick
/// (see `examples/original_source/ltsort.c`'s `LTJSON_SEARCH_NAMEISHASH`
/// handling and `crate::nhash`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StringRef {
    block: u32,
    offset: u32,
    len: u32,
}

impl StringRef {
    /// The empty string needs no storage at all; every empty string shares
    /// this one sentinel so identity comparison works for it too, mirroring
    /// the C library's `ltjson_empty_name` sentinel in `lthash.c`.
    pub const EMPTY: StringRef = StringRef {
        block: u32::MAX,
        offset: 0,
        len: 0,
    };

    pub fn is_empty(self) -> bool {
        self.len == 0
    }

    pub fn len(self) -> usize {
        self.len as usize
    }
}

pub struct StringStore {
    blocks: Vec<Block>,
    head: Option<u32>,
    cur: Option<u32>,
    block_size: usize,
}

impl StringStore {
    /// `block_size` is the configured default block payload size (the
    /// process-wide tunable in `crate::context`, already net of any
    /// notional header — there is no separate header struct here).
    pub fn new(block_size: usize) -> Self {
        StringStore {
            blocks: Vec::new(),
            head: None,
            cur: None,
            block_size: block_size.max(SSTORE_MIN_ALLOC),
        }
    }

    /// Store `s`, returning a handle that can be resolved back with
    /// [`StringStore::get`]. Mirrors `sstore_add`/`sstore_nadd`.
    pub fn add(&mut self, s: &str) -> Result<StringRef, JsonError> {
        if s.is_empty() {
            return Ok(StringRef::EMPTY);
        }

        let needed = s.len();

        if let Some(idx) = self.find_forward(needed) {
            return Ok(self.append_to(idx, s));
        }

        if let Some(idx) = self.find_backward_clearing(needed) {
            return Ok(self.append_to(idx, s));
        }

        let alloc = self.block_size.max(needed).max(SSTORE_MIN_ALLOC);
        let idx = self.push_block(alloc)?;
        Ok(self.append_to(idx, s))
    }

    /// Forward scan from `cur` toward the tail, looking for an existing
    /// block with room, exactly as `sstore_nadd`'s first loop does.
    fn find_forward(&self, needed: usize) -> Option<u32> {
        let mut cur = self.cur;
        while let Some(idx) = cur {
            let block = &self.blocks[idx as usize];
            if block.avail() >= needed {
                return Some(idx);
            }
            cur = block.next;
        }
        None
    }

    /// When nothing ahead has room, back up toward the head, clearing each
    /// block as we pass it (they're stale once we've scanned past `cur`
    /// forward), until one is big enough once cleared.
    fn find_backward_clearing(&mut self, needed: usize) -> Option<u32> {
        let mut cur = self.cur?;
        loop {
            let prev = self.blocks[cur as usize].prev?;
            cur = prev;
            let block = &mut self.blocks[cur as usize];
            block.data.clear();
            if block.cap >= needed {
                return Some(cur);
            }
        }
    }

    fn push_block(&mut self, cap: usize) -> Result<u32, JsonError> {
        let idx = self.blocks.len() as u32;
        let mut data = Vec::new();
        data.try_reserve_exact(cap).map_err(|_| JsonError::OutOfMemory)?;

        self.blocks.push(Block {
            data,
            cap,
            next: self.head,
            prev: None,
        });

        if let Some(old_head) = self.head {
            self.blocks[old_head as usize].prev = Some(idx);
        }
        self.head = Some(idx);
        Ok(idx)
    }

    fn append_to(&mut self, idx: u32, s: &str) -> StringRef {
        let block = &mut self.blocks[idx as usize];
        let offset = block.data.len();
        block.data.extend_from_slice(s.as_bytes());
        self.cur = Some(idx);

        StringRef {
            block: idx,
            offset: offset as u32,
            len: s.len() as u32,
        }
    }

    /// Resolve a handle back to its text.
    pub fn get(&self, r: StringRef) -> &str {
        if r.is_empty() {
            return "";
        }
        let block = &self.blocks[r.block as usize];
        let bytes = &block.data[r.offset as usize..(r.offset + r.len) as usize];
        std::str::from_utf8(bytes).expect("sstore only ever stores valid utf8")
    }

    /// Rewind to a single block and mark it empty, ready for reuse, instead
    /// of freeing anything. Mirrors `sstore_clear`.
    pub fn clear(&mut self) {
        let Some(start) = self.cur.or(self.head) else {
            return;
        };

        let mut idx = start;
        while let Some(n) = self.blocks[idx as usize].next {
            idx = n;
        }

        self.blocks[idx as usize].data.clear();
        self.cur = Some(idx);
    }

    /// `(block count, bytes allocated, bytes filled)`, matching
    /// `sstore_stats`.
    pub fn stats(&self) -> (usize, usize, usize) {
        let mut blocks = 0;
        let mut alloc = 0;
        let mut filled = 0;

        let mut cur = self.head;
        while let Some(idx) = cur {
            let block = &self.blocks[idx as usize];
            blocks += 1;
            alloc += block.cap;
            filled += block.data.len();
            cur = block.next;
        }

        (blocks, alloc, filled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_needs_no_block() {
        let mut store = StringStore::new(256);
        let r = store.add("").unwrap();
        assert_eq!(r, StringRef::EMPTY);
        assert_eq!(store.stats(), (0, 0, 0));
    }

    #[test]
    fn round_trips_through_ref() {
        let mut store = StringStore::new(256);
        let r = store.add("hello").unwrap();
        assert_eq!(store.get(r), "hello");
    }

    #[test]
    fn identical_text_added_twice_is_not_identity_equal() {
        // Interning happens in `crate::nhash`, not here: the store itself
        // just appends, so two adds of the same text get distinct refs.
        let mut store = StringStore::new(256);
        let a = store.add("same").unwrap();
        let b = store.add("same").unwrap();
        assert_ne!(a, b);
        assert_eq!(store.get(a), store.get(b));
    }

    #[test]
    fn grows_past_one_block() {
        let mut store = StringStore::new(8);
        let a = store.add("abcdefgh").unwrap();
        let b = store.add("ijklmnop").unwrap();
        assert_eq!(store.get(a), "abcdefgh");
        assert_eq!(store.get(b), "ijklmnop");
        let (blocks, ..) = store.stats();
        assert!(blocks >= 2);
    }

    #[test]
    fn clear_reuses_blocks_without_growing() {
        let mut store = StringStore::new(64);
        store.add("one").unwrap();
        store.add("two").unwrap();
        let (blocks_before, alloc_before, _) = store.stats();

        store.clear();
        store.add("three").unwrap();

        let (blocks_after, alloc_after, _) = store.stats();
        assert_eq!(blocks_before, blocks_after);
        assert_eq!(alloc_before, alloc_after);
    }
}
