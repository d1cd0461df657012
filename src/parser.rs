//! The parser state machine: drives the lexer and the three arenas from
//! whatever UTF-8 text arrives this call, resuming wherever the previous
//! call left off.
//!
//! Grounded on `examples/original_source/ltjson.c`'s main dispatch loop in
//! `ltjson_parse` and `process_json_alnum`. The C version folds tree
//! creation, recycling and the grammar loop into one function; this port
//! keeps the same three-way branch (`cursor == None` => fresh/recycle,
//! `cursor == Some` with a pending lexeme => resume tokenising first, then
//! fall into the ordinary grammar loop) but splits tree setup into
//! `Context::new`/`Context::recycle` (see `crate::context`) so `parse`
//! itself is just the loop.

use crate::context::{Context, ParseCursor, ParseOutcome};
use crate::error::{JsonError, SequenceError};
use crate::lexer::{self, Logic, Number, TokenKind};
use crate::node::{flags, NodeId, NodeType, NodeValue, ROOT_ID};

fn skip_space(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|b| b.is_ascii_whitespace()).count()
}

/// Parse (or continue parsing) `text` into `ctx`. Mirrors `ltjson_parse`.
///
/// `text = None` forces an open context into a terminal error state
/// (`SequenceError::Discontinued`) and always succeeds — matching "bytes =
/// null forces an open context into a terminal error state" in §4.E. On a
/// closed context, new text triggers a recycle first (`use_hash` decides
/// whether the hash table survives or is dropped/created), exactly as
/// `create_tree` does when handed a non-null, non-open `jsoninfo`.
pub fn parse(ctx: &mut Context, text: Option<&str>, use_hash: bool) -> Result<ParseOutcome, JsonError> {
    let Some(text) = text else {
        if ctx.cursor.is_some() {
            ctx.cursor = None;
            ctx.lasterr = Some(SequenceError::Discontinued);
        }
        return Ok(ParseOutcome::Closed { trailing: 0 });
    };

    // `ltjson_parse` runs `create_tree(jsoninfo)` (its recycle branch)
    // whenever the tree exists but isn't currently open, whether it got
    // there by a clean close, a forced discontinue, or (harmlessly) a
    // context that was never opened at all.
    if ctx.cursor.is_none() {
        ctx.recycle(use_hash);
    }

    let mut bytes = text.as_bytes();
    let mut cursor;

    if let Some(saved) = ctx.cursor.take() {
        cursor = saved.node;

        if ctx.lexer.is_pending() {
            match resume_lexeme(ctx, &mut bytes, cursor)? {
                Some(()) => {}
                None => {
                    log::trace!("suspending mid-lexeme, awaiting more input");
                    ctx.cursor = Some(ParseCursor { node: cursor });
                    return Ok(ParseOutcome::NeedMore);
                }
            }
        }
    } else {
        // Fresh or just-recycled context: the root hasn't been opened yet.
        let skip = skip_space(bytes);
        bytes = &bytes[skip..];

        if bytes.is_empty() {
            return Ok(ParseOutcome::NeedMore);
        }

        let first = bytes[0];
        match first {
            b'{' => ctx.root.ntype = NodeType::Object,
            b'[' => ctx.root.ntype = NodeType::Array,
            _ => {
                ctx.lasterr = Some(SequenceError::BeginTree);
                return Err(JsonError::InvalidSequence(SequenceError::BeginTree));
            }
        }
        ctx.root.set_flag(flags::OPEN_OBJECT_OR_ARRAY);
        ctx.root.value = NodeValue::Child(None);
        cursor = ROOT_ID;
        bytes = &bytes[1..];
    }

    drive(ctx, &mut bytes, &mut cursor)
}

/// Resume a lexeme that was half-read when the previous call suspended.
/// `Ok(Some(()))` means the lexeme completed and was placed; `Ok(None)`
/// means input exhausted again mid-lexeme (caller re-suspends as-is).
fn resume_lexeme(ctx: &mut Context, bytes: &mut &[u8], cursor: NodeId) -> Result<Option<()>, JsonError> {
    let mut text = std::str::from_utf8(bytes).map_err(|_| JsonError::InvalidArg)?;

    match ctx.lexer.feed(&mut text) {
        Ok(kind) => {
            *bytes = text.as_bytes();
            place_token(ctx, cursor, kind)?;
            Ok(Some(()))
        }
        Err(JsonError::NeedMore) => {
            *bytes = &[];
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// The grammar driver loop. Mirrors the `while(*text)` loop in
/// `ltjson_parse` after the resume/creation preamble.
fn drive(ctx: &mut Context, bytes: &mut &[u8], cursor: &mut NodeId) -> Result<ParseOutcome, JsonError> {
    loop {
        let skip = skip_space(bytes);
        *bytes = &bytes[skip..];

        let Some(&c) = bytes.first() else {
            log::trace!("suspending between tokens, awaiting more input");
            ctx.cursor = Some(ParseCursor { node: *cursor });
            return Ok(ParseOutcome::NeedMore);
        };

        // Descend into an opened but still-empty container: allocate its
        // first child, unless we're about to close it right back up.
        let node = ctx.node(*cursor);
        if node.has_flag(flags::OPEN_OBJECT_OR_ARRAY) && c != b'}' && c != b']' {
            let child = ctx.new_node()?;
            ctx.node_mut(child).parent = Some(*cursor);
            ctx.node_mut(*cursor).value = NodeValue::Child(Some(child));
            *cursor = child;
        }

        let node = ctx.node(*cursor);
        if node.has_flag(flags::EXPECT_COLON) {
            if c != b':' {
                return seq_err(ctx, SequenceError::NoColon);
            }
            ctx.node_mut(*cursor).clear_flag(flags::EXPECT_COLON);
            *bytes = &bytes[1..];
            continue;
        }

        match c {
            b':' => return seq_err(ctx, SequenceError::UnexpectedColon),

            b',' => {
                if ctx.node(*cursor).ntype == NodeType::Empty {
                    return seq_err(ctx, SequenceError::LeadingComma);
                }
                let parent = ctx.node(*cursor).parent;
                let new_node = ctx.new_node()?;
                ctx.node_mut(new_node).parent = parent;
                ctx.node_mut(*cursor).next = Some(new_node);
                *cursor = new_node;
                *bytes = &bytes[1..];
            }

            b'{' | b'[' => {
                if ctx.node(*cursor).ntype != NodeType::Empty {
                    return seq_err(ctx, SequenceError::UnexpectedOpen);
                }
                let parent = ctx.node(*cursor).parent;
                let no_name = ctx.node(*cursor).name.is_none();
                let parent_is_object =
                    parent.is_some_and(|p| ctx.node(p).ntype == NodeType::Object);
                if no_name && parent_is_object {
                    return seq_err(ctx, SequenceError::ObjectNoName);
                }

                let ntype = if c == b'{' { NodeType::Object } else { NodeType::Array };
                let n = ctx.node_mut(*cursor);
                n.ntype = ntype;
                n.set_flag(flags::OPEN_OBJECT_OR_ARRAY);
                n.value = NodeValue::Child(None);
                *bytes = &bytes[1..];
            }

            b'}' | b']' => {
                if ctx.node(*cursor).ntype == NodeType::Empty {
                    return seq_err(ctx, SequenceError::EmptyClosure);
                }
                if !ctx.node(*cursor).has_flag(flags::OPEN_OBJECT_OR_ARRAY) {
                    *cursor = ctx.node(*cursor).parent.expect("non-root closer has a parent");
                }

                let want = if c == b'}' { NodeType::Object } else { NodeType::Array };
                if ctx.node(*cursor).ntype != want {
                    let err = if c == b'}' {
                        SequenceError::MismatchedCloseObject
                    } else {
                        SequenceError::MismatchedCloseArray
                    };
                    return seq_err(ctx, err);
                }

                ctx.node_mut(*cursor).clear_flag(flags::OPEN_OBJECT_OR_ARRAY);

                *bytes = &bytes[1..];
                if ctx.node(*cursor).parent.is_none() {
                    let trailing = count_trailing(bytes);
                    return Ok(ParseOutcome::Closed { trailing });
                }
            }

            b'"' | b'-' | b'0'..=b'9' | b'A'..=b'Z' | b'a'..=b'z' => {
                let mut text = std::str::from_utf8(bytes).map_err(|_| JsonError::InvalidArg)?;

                match ctx.lexer.feed(&mut text) {
                    Ok(kind) => {
                        *bytes = text.as_bytes();
                        place_token(ctx, *cursor, kind)?;
                    }
                    Err(JsonError::NeedMore) => {
                        log::trace!("suspending mid-lexeme, awaiting more input");
                        *bytes = &[];
                        ctx.cursor = Some(ParseCursor { node: *cursor });
                        return Ok(ParseOutcome::NeedMore);
                    }
                    Err(e) => return Err(e),
                }
            }

            _ => return seq_err(ctx, SequenceError::BadText),
        }
    }
}

fn count_trailing(bytes: &[u8]) -> usize {
    let skip = skip_space(bytes);
    bytes.len() - skip
}

fn seq_err(ctx: &mut Context, err: SequenceError) -> Result<ParseOutcome, JsonError> {
    ctx.lasterr = Some(err);
    Err(JsonError::InvalidSequence(err))
}

/// Place a just-completed lexeme into the tree at `cursor`. Mirrors
/// `process_json_alnum`'s three branches (string/number/logic).
fn place_token(ctx: &mut Context, cursor: NodeId, kind: TokenKind) -> Result<(), JsonError> {
    let raw = ctx.lexer.take_raw();

    match kind {
        TokenKind::Str => {
            let decoded = lexer::unescape_string(&raw).map_err(|e| {
                ctx.lasterr = Some(e);
                JsonError::InvalidSequence(e)
            })?;

            let node = ctx.node(cursor);
            if node.ntype != NodeType::Empty {
                ctx.lasterr = Some(SequenceError::UnexpectedString);
                return Err(JsonError::InvalidSequence(SequenceError::UnexpectedString));
            }

            let parent_is_array = node
                .parent
                .is_some_and(|p| ctx.node(p).ntype == NodeType::Array);

            if node.name.is_some() || parent_is_array {
                // Value slot: store plainly, no hashing.
                let sref = ctx.store_value_string(&decoded)?;
                let n = ctx.node_mut(cursor);
                n.ntype = NodeType::String;
                n.value = NodeValue::Str(sref);
            } else {
                // Object-member name: hash if available.
                let sref = ctx.intern_name(&decoded)?;
                let n = ctx.node_mut(cursor);
                n.name = Some(sref);
                n.set_flag(flags::EXPECT_COLON);
            }
            Ok(())
        }

        TokenKind::Num => {
            let node = ctx.node(cursor);
            if node.ntype != NodeType::Empty {
                ctx.lasterr = Some(SequenceError::UnexpectedNumber);
                return Err(JsonError::InvalidSequence(SequenceError::UnexpectedNumber));
            }
            check_has_name_if_object_member(ctx, cursor, SequenceError::ObjectNoName)?;

            let text = std::str::from_utf8(&raw).map_err(|_| JsonError::InvalidArg)?;
            match lexer::convert_to_number(text) {
                Some(Number::Int(v)) => {
                    let n = ctx.node_mut(cursor);
                    n.ntype = NodeType::Integer;
                    n.value = NodeValue::Int(v);
                    Ok(())
                }
                Some(Number::Float(v)) => {
                    let n = ctx.node_mut(cursor);
                    n.ntype = NodeType::Float;
                    n.value = NodeValue::Float(v);
                    Ok(())
                }
                None => {
                    ctx.lasterr = Some(SequenceError::BadNumber);
                    Err(JsonError::InvalidSequence(SequenceError::BadNumber))
                }
            }
        }

        TokenKind::Logic => {
            let node = ctx.node(cursor);
            if node.ntype != NodeType::Empty {
                ctx.lasterr = Some(SequenceError::UnexpectedText);
                return Err(JsonError::InvalidSequence(SequenceError::UnexpectedText));
            }
            check_has_name_if_object_member(ctx, cursor, SequenceError::ObjectNoName)?;

            let text = std::str::from_utf8(&raw).map_err(|_| JsonError::InvalidArg)?;
            match lexer::convert_to_logic(text) {
                Some(Logic::Null) => {
                    ctx.node_mut(cursor).ntype = NodeType::Null;
                    Ok(())
                }
                Some(Logic::Bool(b)) => {
                    let n = ctx.node_mut(cursor);
                    n.ntype = NodeType::Bool;
                    n.value = NodeValue::Bool(b);
                    Ok(())
                }
                None => {
                    ctx.lasterr = Some(SequenceError::BadLogic);
                    Err(JsonError::InvalidSequence(SequenceError::BadLogic))
                }
            }
        }
    }
}

fn check_has_name_if_object_member(
    ctx: &mut Context,
    cursor: NodeId,
    err: SequenceError,
) -> Result<(), JsonError> {
    let node = ctx.node(cursor);
    let parent_is_object = node.parent.is_some_and(|p| ctx.node(p).ntype == NodeType::Object);
    if node.name.is_none() && parent_is_object {
        ctx.lasterr = Some(err);
        return Err(JsonError::InvalidSequence(err));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::node::NodeType;

    fn parse_all(ctx: &mut Context, s: &str) -> ParseOutcome {
        parse(ctx, Some(s), false).expect("parse should succeed")
    }

    #[test]
    fn parses_flat_object() {
        let mut ctx = Context::new();
        let outcome = parse_all(&mut ctx, r#"{"n":1,"b":true,"s":"hi"}"#);
        assert_eq!(outcome, ParseOutcome::Closed { trailing: 0 });
        assert_eq!(ctx.root.ntype, NodeType::Object);

        let first = ctx.root.first_child().unwrap();
        assert_eq!(ctx.resolve(ctx.node(first).name.unwrap()), "n");
        assert!(matches!(ctx.node(first).value, NodeValue::Int(1)));
    }

    #[test]
    fn chunked_input_across_escape_boundary() {
        let mut ctx = Context::new();
        let outcome1 = parse(&mut ctx, Some(r#"{"na"#), false).unwrap();
        assert_eq!(outcome1, ParseOutcome::NeedMore);
        let outcome2 = parse(&mut ctx, Some(r#"me":"aé"}"#), false).unwrap();
        assert_eq!(outcome2, ParseOutcome::Closed { trailing: 0 });

        let first = ctx.root.first_child().unwrap();
        assert_eq!(ctx.resolve(ctx.node(first).name.unwrap()), "name");
        let NodeValue::Str(s) = ctx.node(first).value else { panic!() };
        assert_eq!(ctx.resolve(s), "a\u{e9}");
    }

    #[test]
    fn empty_object_and_array() {
        let mut ctx = Context::new();
        parse_all(&mut ctx, "{}");
        assert!(ctx.root.first_child().is_none());

        let mut ctx2 = Context::new();
        parse_all(&mut ctx2, "[]");
        assert_eq!(ctx2.root.ntype, NodeType::Array);
    }

    #[test]
    fn dangling_comma_errors() {
        let mut ctx = Context::new();
        let err = parse(&mut ctx, Some("[1,]"), false).unwrap_err();
        assert_matches!(err, JsonError::InvalidSequence(SequenceError::EmptyClosure));
    }

    #[test]
    fn leading_comma_errors() {
        let mut ctx = Context::new();
        let err = parse(&mut ctx, Some("[,1]"), false).unwrap_err();
        assert_matches!(err, JsonError::InvalidSequence(SequenceError::LeadingComma));
    }

    #[test]
    fn discontinue_then_recycle() {
        let mut ctx = Context::new();
        parse_all(&mut ctx, r#"{"n":1}"#);
        assert!(ctx.is_closed());

        parse(&mut ctx, Some(r#"{"m":2}"#), false).unwrap();
        assert!(ctx.is_closed());
    }

    #[test]
    fn null_bytes_discontinues_open_tree() {
        let mut ctx = Context::new();
        parse(&mut ctx, Some(r#"{"n":1"#), false).unwrap();
        parse(&mut ctx, None, false).unwrap();
        assert_eq!(ctx.last_error(), "Tree forced to discontinue parse");

        let outcome = parse(&mut ctx, Some(r#"{"m":2}"#), false).unwrap();
        assert_eq!(outcome, ParseOutcome::Closed { trailing: 0 });
    }

    #[test]
    fn object_member_requires_name() {
        let mut ctx = Context::new();
        let err = parse(&mut ctx, Some(r#"{1:2}"#), false).unwrap_err();
        assert_matches!(err, JsonError::InvalidSequence(SequenceError::ObjectNoName));
    }
}
