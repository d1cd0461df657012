//! Sorting a container's children in place.
//!
//! Grounded on `examples/original_source/ltsort.c`'s `ltjson_sort`: Tatham's
//! bottom-up linked-list merge sort
//! (<http://www.chiark.greenend.org.uk/~sgtatham/algorithms/listsort.html>).
//! The C version mutates the `next` pointers of the actual nodes as it
//! goes, needing no scratch memory beyond a few locals; that isn't
//! available here because the comparator also needs read access to the
//! same `Context` the merge is rearranging, and the borrow checker won't
//! allow overlapping `&mut`/`&` on it. This keeps the algorithm exactly,
//! sorting a local next-pointer snapshot, and only writes the result back
//! to the arena once the merge is done.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::context::Context;
use crate::error::JsonError;
use crate::node::{NodeId, NodeValue};

/// Sort the children of `snode` (an object or array) in place. `compar`
/// takes the context (for resolving names/values) and two sibling node
/// ids, returning their relative order; ties keep the earlier of the two
/// first, matching the `<= 0` comparison in `ltjson_sort`.
pub fn sort<F>(ctx: &mut Context, snode: NodeId, mut compar: F) -> Result<(), JsonError>
where
    F: FnMut(&Context, NodeId, NodeId) -> Ordering,
{
    if !ctx.node(snode).ntype.is_container() {
        return Err(JsonError::WrongType);
    }

    let Some(first) = ctx.node(snode).first_child() else {
        return Ok(());
    };

    let mut next: HashMap<NodeId, Option<NodeId>> = HashMap::new();
    let mut cur = Some(first);
    while let Some(id) = cur {
        let n = ctx.node(id).next;
        next.insert(id, n);
        cur = n;
    }

    let mut listhead = Some(first);
    let mut ksize = 1usize;

    loop {
        let mut p = listhead;
        let mut listtail: Option<NodeId> = None;
        listhead = None;
        let mut merges = 0usize;

        while let Some(pstart) = p {
            merges += 1;

            let mut q = Some(pstart);
            let mut psize = 0usize;
            for _ in 0..ksize {
                psize += 1;
                q = next[&q.unwrap()];
                if q.is_none() {
                    break;
                }
            }
            let mut qsize = ksize;

            let mut p_cur = Some(pstart);
            let mut q_cur = q;

            while psize > 0 || (q_cur.is_some() && qsize > 0) {
                let take_p = if psize == 0 {
                    false
                } else if q_cur.is_none() || qsize == 0 {
                    true
                } else {
                    compar(ctx, p_cur.unwrap(), q_cur.unwrap()) != Ordering::Greater
                };

                let enode = if take_p {
                    let id = p_cur.unwrap();
                    p_cur = next[&id];
                    psize -= 1;
                    id
                } else {
                    let id = q_cur.unwrap();
                    q_cur = next[&id];
                    qsize -= 1;
                    id
                };

                match listtail {
                    Some(t) => {
                        next.insert(t, Some(enode));
                    }
                    None => listhead = Some(enode),
                }
                listtail = Some(enode);
                next.insert(enode, None);
            }

            p = q_cur;
        }

        if merges <= 1 {
            break;
        }
        ksize *= 2;
    }

    let mut cur = listhead;
    while let Some(id) = cur {
        let nxt = next[&id];
        ctx.node_mut(id).next = nxt;
        cur = nxt;
    }
    ctx.node_mut(snode).value = NodeValue::Child(listhead);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeValue;
    use crate::parser;

    fn closed(json: &str) -> Context {
        let mut ctx = Context::new();
        parser::parse(&mut ctx, Some(json), false).unwrap();
        ctx
    }

    fn collect_ints(ctx: &Context, array: NodeId) -> Vec<i64> {
        let mut out = Vec::new();
        let mut cur = ctx.node(array).first_child();
        while let Some(id) = cur {
            if let NodeValue::Int(n) = ctx.node(id).value {
                out.push(n);
            }
            cur = ctx.node(id).next;
        }
        out
    }

    #[test]
    fn sorts_array_of_integers_ascending() {
        let mut ctx = closed("[5,3,4,1,2]");
        let root = ctx.root_id();
        sort(&mut ctx, root, |ctx, a, b| {
            let (NodeValue::Int(x), NodeValue::Int(y)) = (ctx.node(a).value, ctx.node(b).value) else {
                unreachable!()
            };
            x.cmp(&y)
        })
        .unwrap();
        assert_eq!(collect_ints(&ctx, root), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn sort_is_stable_on_ties() {
        let mut ctx = closed(r#"[{"k":1,"tag":"a"},{"k":1,"tag":"b"},{"k":0,"tag":"c"}]"#);
        let root = ctx.root_id();
        sort(&mut ctx, root, |ctx, a, b| {
            let ka = crate::traverse::get_member(ctx, a, "k", crate::traverse::SearchFlags::empty())
                .unwrap()
                .unwrap();
            let kb = crate::traverse::get_member(ctx, b, "k", crate::traverse::SearchFlags::empty())
                .unwrap()
                .unwrap();
            let (NodeValue::Int(x), NodeValue::Int(y)) = (ctx.node(ka).value, ctx.node(kb).value) else {
                unreachable!()
            };
            x.cmp(&y)
        })
        .unwrap();

        let mut tags = Vec::new();
        let mut cur = ctx.node(root).first_child();
        while let Some(id) = cur {
            let tag = crate::traverse::get_member(&ctx, id, "tag", crate::traverse::SearchFlags::empty())
                .unwrap()
                .unwrap();
            if let NodeValue::Str(s) = ctx.node(tag).value {
                tags.push(ctx.resolve(s).to_string());
            }
            cur = ctx.node(id).next;
        }
        assert_eq!(tags, vec!["c", "a", "b"]);
    }

    #[test]
    fn sort_on_scalar_node_is_rejected() {
        let mut ctx = closed(r#"{"a":1}"#);
        let a = crate::traverse::get_member(&ctx, ctx.root_id(), "a", crate::traverse::SearchFlags::empty())
            .unwrap()
            .unwrap();
        assert!(matches!(sort(&mut ctx, a, |_, _, _| Ordering::Equal), Err(JsonError::WrongType)));
    }
}
