//! Depth-first traversal and the query/mutation operations built on top of
//! it: `find`/`search`, `get_member`, `promote`, and node insertion.
//!
//! Grounded on `examples/original_source/ltsort.c` (`traverse_tree_nodes`,
//! `ltjson_search`, `ltjson_promote`) and `ltutils.c` (`ltjson_get_member`,
//! `add_new_node`/`ltjson_addnode_after`/`ltjson_addnode_under`).

use crate::context::Context;
use crate::error::JsonError;
use crate::node::{NodeId, NodeType, NodeValue, ROOT_ID};
use crate::sstore::StringRef;

/// Mirrors `LTJSON_SEARCH_NAMEISHASH`: tells `search`/`get_member` that
/// `name` is already an interned pointer from `get_hashstring`, so
/// comparison can be by identity instead of by byte content. A plain `u8`
/// flag set, in the same hand-rolled style as `crate::node::flags`, rather
/// than pulling in a bitflags crate for one bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchFlags(u8);

impl SearchFlags {
    pub const NAME_IS_HASH: SearchFlags = SearchFlags(0x01);

    pub fn empty() -> SearchFlags {
        SearchFlags(0)
    }

    pub fn contains(self, flag: SearchFlags) -> bool {
        self.0 & flag.0 != 0
    }
}

impl std::ops::BitOr for SearchFlags {
    type Output = SearchFlags;
    fn bitor(self, rhs: SearchFlags) -> SearchFlags {
        SearchFlags(self.0 | rhs.0)
    }
}

/// Stateless depth-first step, restricted to the subtree rooted at `within`
/// when given. Mirrors `traverse_tree_nodes`.
pub fn next(ctx: &Context, node: NodeId, within: Option<NodeId>) -> Option<NodeId> {
    let n = ctx.node(node);

    if n.ntype.is_container() {
        if let NodeValue::Child(Some(child)) = n.value {
            return Some(child);
        }
        if within == Some(node) {
            return None;
        }
    }

    if let Some(sib) = n.next {
        return Some(sib);
    }

    let mut cur = node;
    while let Some(parent) = ctx.node(cur).parent {
        if within == Some(parent) {
            return None;
        }
        if let Some(sib) = ctx.node(parent).next {
            return Some(sib);
        }
        cur = parent;
    }
    None
}

/// Depth-first name search over the whole tree, optionally resuming after
/// `from`. Mirrors `ltjson_findname`, which is `ltjson_search` rooted at
/// the tree itself with no flags.
pub fn find(ctx: &Context, name: &str, from: Option<NodeId>) -> Option<NodeId> {
    search(ctx, ROOT_ID, name, from, SearchFlags::empty()).ok().flatten()
}

/// Depth-first name search rooted at `within`, with the hash-pointer-
/// identity fast path from §B.3 of `SPEC_FULL.md`. Mirrors `ltjson_search`.
pub fn search(
    ctx: &Context,
    within: NodeId,
    name: &str,
    from: Option<NodeId>,
    flags: SearchFlags,
) -> Result<Option<NodeId>, JsonError> {
    let root_node = ctx.node(within);
    if !root_node.ntype.is_container() {
        return Err(JsonError::WrongType);
    }

    // When the caller passes a plain string but the tree is hashed, do a
    // single lookup up front so every comparison below becomes identity.
    let (needle_ref, by_hash) = if flags.contains(SearchFlags::NAME_IS_HASH) {
        // `name` still arrives as a plain `&str` (see `get_member`'s same
        // branch below); resolve it to its interned pointer so the
        // comparison loop can use identity instead of byte comparison.
        let needle = ctx
            .get_hashstring(name)
            .ok()
            .flatten()
            .ok_or(JsonError::InvalidArg)?;
        (Some(needle), true)
    } else if ctx.has_hash() {
        match ctx.get_hashstring(name) {
            Ok(Some(r)) => (Some(r), true),
            Ok(None) => return Ok(None), // name never interned: cannot exist
            Err(_) => (None, false),
        }
    } else {
        (None, false)
    };

    let mut cur = match from {
        Some(f) => next(ctx, f, Some(within)),
        None => Some(within),
    };

    while let Some(id) = cur {
        let node = ctx.node(id);
        if let Some(n) = node.name {
            let matched = if by_hash {
                Some(n) == needle_ref
            } else {
                ctx.resolve(n) == name
            };
            if matched {
                return Ok(Some(id));
            }
        }
        cur = next(ctx, id, Some(within));
    }

    Ok(None)
}

/// Direct (non-recursive) member lookup within an object. Mirrors
/// `ltjson_get_member`.
pub fn get_member(
    ctx: &Context,
    object: NodeId,
    name: &str,
    flags: SearchFlags,
) -> Result<Option<NodeId>, JsonError> {
    let node = ctx.node(object);
    if node.ntype != NodeType::Object {
        return Err(JsonError::WrongType);
    }

    let NodeValue::Child(mut cur) = node.value else {
        return Ok(None);
    };

    if flags.contains(SearchFlags::NAME_IS_HASH) {
        let needle = ctx
            .get_hashstring(name)
            .ok()
            .flatten()
            .ok_or(JsonError::InvalidArg)?;
        while let Some(id) = cur {
            if ctx.node(id).name == Some(needle) {
                return Ok(Some(id));
            }
            cur = ctx.node(id).next;
        }
        return Ok(None);
    }

    while let Some(id) = cur {
        if let Some(n) = ctx.node(id).name {
            if ctx.resolve(n) == name {
                return Ok(Some(id));
            }
        }
        cur = ctx.node(id).next;
    }
    Ok(None)
}

/// Convert a plain name into a `(StringRef, SearchFlags)` pair usable with
/// `search`/`get_member`'s hashed fast path when available, falling back
/// cleanly when the tree carries no hash. Mirrors `ltjson_mksearch`, with
/// the C version's plain-string fallback represented as `None` here (the
/// caller then searches by raw `&str` instead).
pub fn prepare_search(ctx: &Context, name: &str) -> Option<(StringRef, SearchFlags)> {
    if !ctx.has_hash() {
        return None;
    }
    ctx.get_hashstring(name).ok().flatten().map(|r| (r, SearchFlags::NAME_IS_HASH))
}

/// Hoist the object member named `name` to the front of its parent's child
/// list, in every `OBJECT` reachable within `within`. Mirrors
/// `ltjson_promote`.
pub fn promote(ctx: &mut Context, within: NodeId, name: &str) -> Result<usize, JsonError> {
    let root_node = ctx.node(within);
    if !root_node.ntype.is_container() {
        return Err(JsonError::WrongType);
    }
    if root_node.first_child().is_none() {
        return Err(JsonError::NotFound);
    }

    // Resolve the name to a hash pointer once, up front, exactly as
    // `ltjson_promote` calls `ltjson_get_hashstring` before the traversal
    // (falling back to byte comparison when the tree has no hash table).
    let hashed = if ctx.has_hash() {
        Some(ctx.get_hashstring(name).ok().flatten())
    } else {
        None
    };

    let mut matches = 0usize;
    let mut cur = Some(within);

    while let Some(id) = cur {
        if ctx.node(id).ntype == NodeType::Object {
            if let NodeValue::Child(Some(first)) = ctx.node(id).value {
                let target = match hashed {
                    Some(Some(needle)) => find_direct_child_by_ref(ctx, id, needle),
                    Some(None) => None, // name never interned: cannot exist anywhere
                    None => find_direct_child_by_name(ctx, id, name),
                };

                if let Some(target) = target {
                    if target != first {
                        splice_to_front(ctx, id, target);
                        matches += 1;
                    }
                }
            }
        }
        cur = next(ctx, id, Some(within));
    }

    if matches == 0 {
        return Err(JsonError::NotFound);
    }
    Ok(matches)
}

fn find_direct_child_by_name(ctx: &Context, object: NodeId, name: &str) -> Option<NodeId> {
    let NodeValue::Child(mut cur) = ctx.node(object).value else {
        return None;
    };
    while let Some(id) = cur {
        if let Some(n) = ctx.node(id).name {
            if ctx.resolve(n) == name {
                return Some(id);
            }
        }
        cur = ctx.node(id).next;
    }
    None
}

fn find_direct_child_by_ref(ctx: &Context, object: NodeId, needle: StringRef) -> Option<NodeId> {
    let NodeValue::Child(mut cur) = ctx.node(object).value else {
        return None;
    };
    while let Some(id) = cur {
        if ctx.node(id).name == Some(needle) {
            return Some(id);
        }
        cur = ctx.node(id).next;
    }
    None
}

fn splice_to_front(ctx: &mut Context, object: NodeId, target: NodeId) {
    let NodeValue::Child(Some(mut prev)) = ctx.node(object).value else {
        unreachable!("target is a direct child, so the object has a child list");
    };

    if prev == target {
        return;
    }

    while ctx.node(prev).next != Some(target) {
        prev = ctx.node(prev).next.expect("target reachable from the child list");
    }

    let old_head = ctx.node(object).first_child().unwrap();
    let after_target = ctx.node(target).next;
    ctx.node_mut(prev).next = after_target;
    ctx.node_mut(target).next = Some(old_head);
    ctx.node_mut(object).value = NodeValue::Child(Some(target));
}

/// A fillable, caller-requested node type for `add_after`/`add_under`.
/// Excludes `Empty` and `BaseNode`, matching `add_new_node`'s `ntype`
/// range check (`LTJSON_NTYPE_BASENODE < ntype <= LTJSON_NTYPE_STRING`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NewNodeType {
    Null,
    Bool,
    Integer,
    Float,
    String,
    Array,
    Object,
}

impl From<NewNodeType> for NodeType {
    fn from(t: NewNodeType) -> Self {
        match t {
            NewNodeType::Null => NodeType::Null,
            NewNodeType::Bool => NodeType::Bool,
            NewNodeType::Integer => NodeType::Integer,
            NewNodeType::Float => NodeType::Float,
            NewNodeType::String => NodeType::String,
            NewNodeType::Array => NodeType::Array,
            NewNodeType::Object => NodeType::Object,
        }
    }
}

/// Shared insertion logic for `add_after`/`add_under`. Mirrors
/// `add_new_node`.
fn add_new_node(
    ctx: &mut Context,
    reference: NodeId,
    after: bool,
    ntype: NewNodeType,
    name: Option<&str>,
    sval: Option<&str>,
) -> Result<NodeId, JsonError> {
    let object_or_array = if after {
        ctx.node(reference).parent.ok_or(JsonError::InvalidArg)?
    } else {
        reference
    };

    let parent_node = ctx.node(object_or_array);
    if !parent_node.ntype.is_container() {
        return Err(JsonError::WrongParent);
    }
    let parent_is_object = parent_node.ntype == NodeType::Object;
    if parent_is_object && name.is_none() {
        return Err(JsonError::InvalidArg);
    }

    let new_id = ctx.new_node()?;

    let name_ref = if parent_is_object {
        Some(ctx.intern_name(name.unwrap())?)
    } else {
        None
    };

    let value = match ntype {
        NewNodeType::Null => NodeValue::Nothing,
        NewNodeType::Bool => NodeValue::Bool(false),
        NewNodeType::Integer => NodeValue::Int(0),
        NewNodeType::Float => NodeValue::Float(0.0),
        NewNodeType::Array | NewNodeType::Object => NodeValue::Child(None),
        NewNodeType::String => {
            let sref = match sval {
                Some(s) if !s.is_empty() => ctx.store_value_string(s)?,
                _ => StringRef::EMPTY,
            };
            NodeValue::Str(sref)
        }
    };

    {
        let n = ctx.node_mut(new_id);
        n.ntype = ntype.into();
        n.name = name_ref;
        n.value = value;
    }

    if after {
        let next_of_ref = ctx.node(reference).next;
        ctx.node_mut(new_id).next = next_of_ref;
        ctx.node_mut(new_id).parent = Some(object_or_array);
        ctx.node_mut(reference).next = Some(new_id);
    } else {
        let old_head = ctx.node(object_or_array).first_child();
        ctx.node_mut(new_id).next = old_head;
        ctx.node_mut(new_id).parent = Some(object_or_array);
        ctx.node_mut(object_or_array).value = NodeValue::Child(Some(new_id));
    }

    Ok(new_id)
}

/// Insert a new sibling immediately after `reference`. Mirrors
/// `ltjson_addnode_after`.
pub fn add_after(
    ctx: &mut Context,
    reference: NodeId,
    ntype: NewNodeType,
    name: Option<&str>,
    sval: Option<&str>,
) -> Result<NodeId, JsonError> {
    add_new_node(ctx, reference, true, ntype, name, sval)
}

/// Insert a new first child under `container`. Mirrors
/// `ltjson_addnode_under`.
pub fn add_under(
    ctx: &mut Context,
    container: NodeId,
    ntype: NewNodeType,
    name: Option<&str>,
    sval: Option<&str>,
) -> Result<NodeId, JsonError> {
    add_new_node(ctx, container, false, ntype, name, sval)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::parser;

    fn closed(json: &str, use_hash: bool) -> Context {
        let mut ctx = if use_hash { Context::with_hash() } else { Context::new() };
        parser::parse(&mut ctx, Some(json), use_hash).unwrap();
        ctx
    }

    #[test]
    fn find_locates_member_anywhere_in_tree() {
        let ctx = closed(r#"{"a":{"b":{"c":42}}}"#, false);
        let id = find(&ctx, "c", None).unwrap();
        assert!(matches!(ctx.node(id).value, NodeValue::Int(42)));
    }

    #[test]
    fn find_resumes_after_from() {
        let ctx = closed(r#"[{"k":1},{"k":2},{"k":3}]"#, false);
        let first = find(&ctx, "k", None).unwrap();
        let second = find(&ctx, "k", Some(first)).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn get_member_is_direct_not_recursive() {
        let ctx = closed(r#"{"a":{"b":1},"c":2}"#, false);
        let root_obj = ctx.root_id();
        assert!(get_member(&ctx, root_obj, "b", SearchFlags::empty()).unwrap().is_none());
        assert!(get_member(&ctx, root_obj, "c", SearchFlags::empty()).unwrap().is_some());
    }

    #[test]
    fn promote_moves_member_to_front() {
        let mut ctx = closed(r#"{"a":{"b":1,"price":9,"c":2}}"#, false);
        let root = ctx.root_id();
        let matched = promote(&mut ctx, root, "price").unwrap();
        assert_eq!(matched, 1);

        let a = find(&ctx, "a", None).unwrap();
        let first = ctx.node(a).first_child().unwrap();
        assert_eq!(ctx.resolve(ctx.node(first).name.unwrap()), "price");
    }

    #[test]
    fn promote_reports_not_found() {
        let mut ctx = closed(r#"{"a":1}"#, false);
        let root = ctx.root_id();
        let err = promote(&mut ctx, root, "nope").unwrap_err();
        assert_matches!(err, JsonError::NotFound);
    }

    #[test]
    fn promote_on_empty_container_reports_not_found() {
        let mut ctx = closed(r#"{}"#, false);
        let root = ctx.root_id();
        let err = promote(&mut ctx, root, "nope").unwrap_err();
        assert_matches!(err, JsonError::NotFound);
    }

    #[test]
    fn add_under_object_requires_name() {
        let mut ctx = closed(r#"{"a":1}"#, false);
        let root = ctx.root_id();
        let err = add_under(&mut ctx, root, NewNodeType::Integer, None, None).unwrap_err();
        assert_matches!(err, JsonError::InvalidArg);
    }

    #[test]
    fn add_after_inserts_sibling() {
        let mut ctx = closed(r#"{"a":1}"#, false);
        let root = ctx.root_id();
        let a = get_member(&ctx, root, "a", SearchFlags::empty()).unwrap().unwrap();
        let new_id = add_after(&mut ctx, a, NewNodeType::String, Some("b"), Some("hi")).unwrap();
        assert_eq!(ctx.node(a).next, Some(new_id));
        assert_eq!(ctx.resolve(ctx.node(new_id).name.unwrap()), "b");
    }

    #[test]
    fn hashed_search_uses_pointer_identity() {
        let ctx = closed(r#"{"a":{"x":1},"b":{"x":2}}"#, true);
        let root = ctx.root_id();
        let first = search(&ctx, root, "x", None, SearchFlags::empty()).unwrap().unwrap();
        let second = search(&ctx, root, "x", Some(first), SearchFlags::empty()).unwrap().unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn search_with_name_is_hash_flag_still_finds_the_member() {
        let ctx = closed(r#"{"a":{"x":1},"b":{"x":2}}"#, true);
        let root = ctx.root_id();
        let first = search(&ctx, root, "x", None, SearchFlags::NAME_IS_HASH).unwrap().unwrap();
        assert!(matches!(ctx.node(first).value, NodeValue::Int(1)));
        let second = search(&ctx, root, "x", Some(first), SearchFlags::NAME_IS_HASH)
            .unwrap()
            .unwrap();
        assert!(matches!(ctx.node(second).value, NodeValue::Int(2)));
    }

    #[test]
    fn search_with_name_is_hash_flag_on_unhashed_tree_is_invalid_arg() {
        let ctx = closed(r#"{"a":1}"#, false);
        let root = ctx.root_id();
        let err = search(&ctx, root, "a", None, SearchFlags::NAME_IS_HASH).unwrap_err();
        assert_matches!(err, JsonError::InvalidArg);
    }
}
