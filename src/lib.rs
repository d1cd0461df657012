//! A streaming, low-memory JSON document engine.
//!
//! Text is fed incrementally to [`parse`] against a reusable [`Context`],
//! which owns three small arenas (node slabs, a string-store block chain,
//! and an optional name hash) instead of allocating per node the way a
//! tree of `Box`es would. Once a tree is closed, the same `Context`
//! exposes traversal (`find`/`search`/`get_member`), path queries
//! ([`path_refer`]), in-place [`sort`]/[`promote`], node insertion
//! ([`add_after`]/[`add_under`]), a human-readable [`display`], and memory
//! statistics (`Context::memstat`).
//!
//! Dropping a `Context` releases everything it owns; there is no separate
//! `free` call to make — Rust's ownership model already gives the "release
//! all memory" operation for free.

mod arena;
mod context;
mod diag;
mod display;
mod error;
mod lexer;
mod nhash;
mod node;
mod parser;
mod path;
mod sort;
mod sstore;
mod traverse;

pub use context::{set_default_sstore_block_size, set_default_slab_size, Context, ParseOutcome};
pub use diag::{diagnose, to_annotations, DiagnosticClass};
pub use display::display;
pub use error::{JsonError, SequenceError};
pub use node::{NodeId, NodeType, NodeValue, ROOT_ID};
pub use parser::parse;
pub use path::path_refer;
pub use sort::sort;
pub use sstore::StringRef;
pub use traverse::{add_after, add_under, find, get_member, promote, search, NewNodeType, SearchFlags};
