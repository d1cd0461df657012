//! Human-readable tree dump.
//!
//! Grounded on `examples/original_source/ltutils.c`'s `ltjson_display` and
//! `print_nodeinfo`. Writes to stdout via `println!`, matching the
//! teacher-style output-to-stdout convention already used by
//! `Context::dump_stats`.

use crate::context::Context;
use crate::error::JsonError;
use crate::node::{NodeId, NodeType, NodeValue};

/// Print the subtree rooted at `rnode`. The owning tree must be closed.
/// Mirrors `ltjson_display`.
pub fn display(ctx: &Context, rnode: NodeId) -> Result<(), JsonError> {
    if !ctx.is_closed() {
        return Err(JsonError::InvalidArg);
    }

    println!("JSON tree:");

    if !ctx.node(rnode).ntype.is_container() {
        print_nodeinfo(ctx, rnode, 4);
        return Ok(());
    }

    let mut cur = rnode;
    let mut depth = 0usize;

    'outer: loop {
        print_nodeinfo(ctx, cur, 4 + 4 * depth);

        if ctx.node(cur).ntype.is_container() {
            if let Some(child) = ctx.node(cur).first_child() {
                cur = child;
                depth += 1;
                continue 'outer;
            } else if cur == rnode {
                break 'outer;
            }
        }

        if let Some(next) = ctx.node(cur).next {
            cur = next;
            continue 'outer;
        }

        // No sibling: climb back up, printing a closer for every
        // container we leave, until one has a sibling of its own or we
        // reach the display root.
        let mut climb = cur;
        loop {
            let Some(parent) = ctx.node(climb).parent else {
                break 'outer;
            };
            depth -= 1;
            let closer = if ctx.node(parent).ntype == NodeType::Array { ']' } else { '}' };
            println!("{:indent$}{closer}", "", indent = 4 + 4 * depth);

            if parent == rnode {
                break 'outer;
            }

            if let Some(next) = ctx.node(parent).next {
                cur = next;
                continue 'outer;
            }

            climb = parent;
        }
    }

    Ok(())
}

/// Render `value` the way C's `printf("%g", value)` would (default
/// precision 6 significant digits): scientific notation with a signed,
/// zero-padded exponent when the exponent is `< -4` or `>= 6`, otherwise
/// fixed-point, trailing zeros and a bare trailing `.` trimmed either way.
/// Grounded on `print_nodeinfo`'s `"%g"` format in
/// `examples/original_source/ltutils.c`, per `spec.md` §6.
fn format_g(value: f64) -> String {
    if value == 0.0 {
        return if value.is_sign_negative() { "-0".to_string() } else { "0".to_string() };
    }
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf".to_string() } else { "-inf".to_string() };
    }

    const PRECISION: i32 = 6;
    let sci = format!("{:.*e}", (PRECISION - 1) as usize, value);
    let (mantissa, exp_str) = sci.split_once('e').expect("LowerExp always emits an 'e'");
    let exp_val: i32 = exp_str.parse().expect("exponent is always a valid integer");

    if exp_val < -4 || exp_val >= PRECISION {
        let sign = if exp_val < 0 { '-' } else { '+' };
        format!("{}e{sign}{:02}", strip_trailing_zeros(mantissa), exp_val.abs())
    } else {
        let decimals = (PRECISION - 1 - exp_val).max(0) as usize;
        strip_trailing_zeros(&format!("{value:.decimals$}"))
    }
}

/// Drop a float's trailing fractional zeros, and the `.` itself if nothing
/// is left after it (`"1.50000"` -> `"1.5"`, `"1.00000"` -> `"1"`).
fn strip_trailing_zeros(s: &str) -> String {
    if !s.contains('.') {
        return s.to_string();
    }
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

fn print_nodeinfo(ctx: &Context, node: NodeId, indent: usize) {
    let n = ctx.node(node);
    let mut line = format!("{:indent$}", "", indent = indent);

    if let Some(parent) = n.parent {
        if ctx.node(parent).ntype == NodeType::Object {
            match n.name {
                Some(name) if !name.is_empty() => {
                    line.push_str(ctx.resolve(name));
                    line.push_str(" : ");
                }
                _ => line.push_str("(no name) : "),
            }
        }
    }

    match n.ntype {
        NodeType::Null => line.push_str("null"),
        NodeType::Bool => line.push_str(match n.value {
            NodeValue::Bool(true) => "true",
            _ => "false",
        }),
        NodeType::Array => line.push_str(if n.first_child().is_some() { "[" } else { "[]" }),
        NodeType::Object => line.push_str(if n.first_child().is_some() { "{" } else { "{}" }),
        NodeType::Float => {
            if let NodeValue::Float(f) = n.value {
                line.push_str(&format_g(f));
            }
        }
        NodeType::Integer => {
            if let NodeValue::Int(i) = n.value {
                line.push_str(&i.to_string());
            }
        }
        NodeType::String => {
            if let NodeValue::Str(s) = n.value {
                line.push('"');
                line.push_str(ctx.resolve(s));
                line.push('"');
            }
        }
        NodeType::Empty | NodeType::BaseNode => line.push_str("!!node does not look valid!!"),
    }

    println!("{line}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser;

    #[test]
    fn display_refuses_an_open_tree() {
        let mut ctx = Context::new();
        parser::parse(&mut ctx, Some(r#"{"a":"#), false).unwrap();
        let root = ctx.root_id();
        assert!(matches!(display(&ctx, root), Err(JsonError::InvalidArg)));
    }

    #[test]
    fn display_accepts_a_closed_tree() {
        let mut ctx = Context::new();
        parser::parse(&mut ctx, Some(r#"{"a":[1,2,{"b":null}],"c":"x"}"#), false).unwrap();
        let root = ctx.root_id();
        assert!(display(&ctx, root).is_ok());
    }

    #[test]
    fn format_g_switches_to_scientific_past_six_digits() {
        assert_eq!(format_g(1e10), "1e+10");
        assert_eq!(format_g(1.5e20), "1.5e+20");
        assert_eq!(format_g(-1.5e20), "-1.5e+20");
    }

    #[test]
    fn format_g_switches_to_scientific_for_small_magnitudes() {
        assert_eq!(format_g(0.00001234), "1.234e-05");
    }

    #[test]
    fn format_g_uses_fixed_point_in_between() {
        assert_eq!(format_g(1.5), "1.5");
        assert_eq!(format_g(100000.0), "100000");
        assert_eq!(format_g(0.0001234), "0.0001234");
        assert_eq!(format_g(-2.5), "-2.5");
    }

    #[test]
    fn format_g_trims_trailing_zeros_and_bare_dot() {
        assert_eq!(format_g(1.0), "1");
        assert_eq!(format_g(9.0), "9");
    }

    #[test]
    fn format_g_renders_signed_zero() {
        assert_eq!(format_g(0.0), "0");
        assert_eq!(format_g(-0.0), "-0");
    }
}
