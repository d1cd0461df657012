//! JSON Path-like reference expressions: `/seg/seg[idx]`, with `[]`/`[*]`
//! meaning "every element".
//!
//! Grounded on `examples/original_source/ltpath.c`: `path_tokenise`,
//! `path_hashify_rpath`, `path_getobject` and `ltjson_pathrefer`. The C
//! version bounds everything to a fixed `refpaths[8]` stack array and a
//! caller-supplied output array; this keeps the same two bounds (segment
//! count and match-output count) but returns an owned `Vec` for the
//! latter rather than writing through a caller pointer.

use tinyvec::ArrayVec;

use crate::context::Context;
use crate::error::JsonError;
use crate::node::{NodeId, NodeType};
use crate::sstore::StringRef;

/// `sizeof(refpaths) / sizeof(refpaths[0])` in `ltjson_pathrefer`.
const MAX_SEGMENTS: usize = 8;

#[derive(Default)]
struct Segment {
    name: String,
    hasindex: bool,
    /// `-1` means every index (`[]`/`[*]`/no brackets on an array).
    aindex: i32,
    /// Set by `hashify` when the tree has a name hash; then `name`
    /// comparisons become pointer-identity instead of byte comparison.
    hashref: Option<StringRef>,
}

/// Fixed-capacity stack of path segments, matching `refpaths[8]`'s
/// stack-array storage in `ltjson_pathrefer` directly instead of a `Vec`.
type Segments = ArrayVec<[Segment; MAX_SEGMENTS]>;

/// Mirrors `path_tokenise`.
fn tokenize(path: &str) -> Result<Segments, JsonError> {
    let bytes = path.as_bytes();
    if bytes.first() != Some(&b'/') {
        return Err(JsonError::BadPath);
    }

    let mut idx = 1;
    let mut segments = Segments::new();

    while idx < bytes.len() {
        if segments.len() == MAX_SEGMENTS {
            return Err(JsonError::PathTooLong);
        }

        let name_start = idx;
        while idx < bytes.len() && bytes[idx] != b'[' && bytes[idx] != b'/' {
            idx += 1;
        }
        let name = std::str::from_utf8(&bytes[name_start..idx])
            .map_err(|_| JsonError::BadPath)?
            .to_string();

        let mut seg = Segment {
            name,
            hasindex: false,
            aindex: -1,
            hashref: None,
        };

        if idx == bytes.len() {
            segments.push(seg);
            break;
        }

        if bytes[idx] == b'/' {
            idx += 1;
            segments.push(seg);
            continue;
        }

        // bytes[idx] == b'['
        seg.hasindex = true;
        idx += 1;

        if bytes.get(idx) == Some(&b']') {
            idx += 1;
        } else if bytes.get(idx) == Some(&b'*') && bytes.get(idx + 1) == Some(&b']') {
            idx += 2;
        } else {
            let digit_start = idx;
            while bytes.get(idx).is_some_and(u8::is_ascii_digit) {
                idx += 1;
            }
            if digit_start == idx || bytes.get(idx) != Some(&b']') {
                return Err(JsonError::BadPath);
            }
            let text = std::str::from_utf8(&bytes[digit_start..idx]).unwrap();
            seg.aindex = text.parse().map_err(|_| JsonError::BadPath)?;
            idx += 1;
        }

        if idx < bytes.len() {
            if bytes[idx] != b'/' {
                return Err(JsonError::BadPath);
            }
            idx += 1;
        }

        segments.push(seg);
    }

    Ok(segments)
}

/// Resolve every non-empty segment name to its hash pointer. Mirrors
/// `path_hashify_rpath`: a `false` return means some name was never
/// interned and so can never match anything in this tree.
fn hashify(ctx: &Context, segments: &mut [Segment]) -> bool {
    if !ctx.has_hash() {
        return true;
    }
    for seg in segments.iter_mut() {
        if seg.name.is_empty() {
            continue;
        }
        match ctx.get_hashstring(&seg.name) {
            Ok(Some(r)) => seg.hashref = Some(r),
            _ => return false,
        }
    }
    true
}

fn name_matches(ctx: &Context, seg: &Segment, node_name: Option<StringRef>) -> bool {
    let Some(n) = node_name else { return false };
    match seg.hashref {
        Some(h) => h == n,
        None => ctx.resolve(n) == seg.name,
    }
}

/// Recursively walk `segments` from `idx`, rooted at `atnode`. Mirrors
/// `path_getobject`. Returns the total number of matches found, storing
/// at most `cap` of them into `out` (further matches are still counted,
/// matching the original's "count past capacity" behaviour).
fn path_getobject(
    ctx: &Context,
    atnode: NodeId,
    segments: &[Segment],
    idx: usize,
    out: &mut Vec<NodeId>,
    cap: usize,
) -> usize {
    let Some(seg) = segments.get(idx) else {
        if out.len() < cap {
            out.push(atnode);
        }
        return 1;
    };

    match ctx.node(atnode).ntype {
        NodeType::Object => {
            if seg.name.is_empty() && seg.hashref.is_none() {
                return 0;
            }
        }
        NodeType::Array => {
            if !seg.name.is_empty() || seg.hashref.is_some() {
                return 0;
            }
            return search_array(ctx, atnode, seg, segments, idx, out, cap);
        }
        _ => return 0,
    }

    let Some(first) = ctx.node(atnode).first_child() else {
        return 0;
    };

    let mut cur = Some(first);
    let mut matched = None;
    while let Some(id) = cur {
        if name_matches(ctx, seg, ctx.node(id).name) {
            matched = Some(id);
            break;
        }
        cur = ctx.node(id).next;
    }
    let Some(matched) = matched else { return 0 };

    if ctx.node(matched).ntype != NodeType::Array {
        if seg.hasindex {
            return 0;
        }
        return path_getobject(ctx, matched, segments, idx + 1, out, cap);
    }

    // Matched item is an array: if no index was given and this was the
    // last segment, the array itself is the result, not its elements.
    if !seg.hasindex && idx + 1 == segments.len() {
        return path_getobject(ctx, matched, segments, idx + 1, out, cap);
    }

    search_array(ctx, matched, seg, segments, idx, out, cap)
}

fn search_array(
    ctx: &Context,
    arraynode: NodeId,
    seg: &Segment,
    segments: &[Segment],
    idx: usize,
    out: &mut Vec<NodeId>,
    cap: usize,
) -> usize {
    let Some(first) = ctx.node(arraynode).first_child() else {
        return 0;
    };

    let mut cur = Some(first);
    let mut pos: i32 = 0;
    let mut total = 0;

    while let Some(id) = cur {
        if seg.aindex < 0 || seg.aindex == pos {
            total += path_getobject(ctx, id, segments, idx + 1, out, cap);
        }
        pos += 1;
        cur = ctx.node(id).next;
    }

    total
}

/// Search a closed tree for the nodes a reference path names. Mirrors
/// `ltjson_pathrefer`. `cap` bounds how many matches get stored in the
/// returned `Vec`; the returned count is the total number of matches,
/// which can exceed `cap`.
pub fn path_refer(ctx: &Context, path: &str, cap: usize) -> Result<(usize, Vec<NodeId>), JsonError> {
    if cap == 0 || !ctx.is_closed() {
        return Err(JsonError::InvalidArg);
    }

    let mut segments = tokenize(path)?;

    if segments.is_empty() {
        return Ok((1, vec![ctx.root_id()]));
    }

    if !hashify(ctx, &mut segments) {
        return Ok((0, Vec::new()));
    }

    let mut out = Vec::new();
    let total = path_getobject(ctx, ctx.root_id(), &segments, 0, &mut out, cap);
    Ok((total, out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser;

    fn closed(json: &str) -> Context {
        let mut ctx = Context::new();
        parser::parse(&mut ctx, Some(json), false).unwrap();
        ctx
    }

    #[test]
    fn bare_slash_returns_root() {
        let ctx = closed(r#"{"a":1}"#);
        let (total, nodes) = path_refer(&ctx, "/", 4).unwrap();
        assert_eq!(total, 1);
        assert_eq!(nodes, vec![ctx.root_id()]);
    }

    #[test]
    fn simple_member_path() {
        let ctx = closed(r#"{"phoneNumbers":{"type":"home"}}"#);
        let (total, nodes) = path_refer(&ctx, "/phoneNumbers/type", 4).unwrap();
        assert_eq!(total, 1);
        let id = nodes[0];
        assert!(matches!(ctx.node(id).value, crate::node::NodeValue::Str(_)));
    }

    #[test]
    fn array_index_selects_one_element() {
        let ctx = closed(r#"{"items":[10,20,30]}"#);
        let (total, nodes) = path_refer(&ctx, "/items[1]", 4).unwrap();
        assert_eq!(total, 1);
        assert!(matches!(ctx.node(nodes[0]).value, crate::node::NodeValue::Int(20)));
    }

    #[test]
    fn wildcard_index_selects_all_elements() {
        let ctx = closed(r#"{"items":[{"n":1},{"n":2},{"n":3}]}"#);
        let (total, nodes) = path_refer(&ctx, "/items[*]/n", 16).unwrap();
        assert_eq!(total, 3);
        assert_eq!(nodes.len(), 3);
    }

    #[test]
    fn array_as_last_segment_returns_the_array_itself() {
        let ctx = closed(r#"{"items":[1,2,3]}"#);
        let (total, nodes) = path_refer(&ctx, "/items", 4).unwrap();
        assert_eq!(total, 1);
        assert_eq!(ctx.node(nodes[0]).ntype, NodeType::Array);
    }

    #[test]
    fn capacity_limits_storage_but_not_count() {
        let ctx = closed(r#"{"items":[1,2,3,4]}"#);
        let (total, nodes) = path_refer(&ctx, "/items[*]", 2).unwrap();
        assert_eq!(total, 4);
        assert_eq!(nodes.len(), 2);
    }

    #[test]
    fn missing_leading_slash_is_rejected() {
        let ctx = closed(r#"{"a":1}"#);
        assert!(matches!(path_refer(&ctx, "a", 4), Err(JsonError::BadPath)));
    }

    #[test]
    fn too_many_segments_is_rejected() {
        let ctx = closed(r#"{"a":1}"#);
        let long_path = "/a".repeat(9);
        assert!(matches!(path_refer(&ctx, &long_path, 4), Err(JsonError::PathTooLong)));
    }
}
