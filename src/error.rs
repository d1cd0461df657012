//! Error types.
//!
//! Hand-rolled, matching the rest of the crate's avoidance of a derive-macro
//! error crate (the teacher builds its own `export::ExportError` by hand;
//! this follows the same texture). [`SequenceError`] is a closed enum
//! mirroring `ltjson_errordesc` in `examples/original_source/ltlocal.h`
//! verbatim, one variant per table entry, in table order.

use std::fmt;

/// Every public entry point in this crate returns `Result<_, JsonError>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonError {
    /// A caller-supplied argument was null/empty/out of range.
    InvalidArg,
    /// Parse suspended: more bytes are needed to make progress.
    NeedMore,
    /// An arena, string-store or hash-table growth allocation failed.
    OutOfMemory,
    /// The byte stream violates JSON grammar; carries the specific reason.
    InvalidSequence(SequenceError),
    /// A search completed without a hit. Not a hard error.
    NotFound,
    /// `get_member` found the object but not the requested key.
    NoSuchKey,
    /// A path expression could not be tokenised.
    BadPath,
    /// A path expression has more segments than the fixed stack holds.
    PathTooLong,
    /// An operation was attempted on a node of the wrong `NodeType`.
    WrongType,
    /// `add_after`/`promote`/`sort` was given a node with the wrong parent
    /// relationship for the requested operation.
    WrongParent,
    /// An `ntype` argument to `add_after`/`add_under` was not a valid,
    /// fillable node type.
    BadType,
    /// `get_hashstring` was called on a context with no name hash.
    NoHash,
}

impl fmt::Display for JsonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsonError::InvalidArg => write!(f, "invalid argument"),
            JsonError::NeedMore => write!(f, "need more input"),
            JsonError::OutOfMemory => write!(f, "out of memory"),
            JsonError::InvalidSequence(e) => write!(f, "{e}"),
            JsonError::NotFound => write!(f, "not found"),
            JsonError::NoSuchKey => write!(f, "no such key"),
            JsonError::BadPath => write!(f, "malformed path expression"),
            JsonError::PathTooLong => write!(f, "path expression has too many segments"),
            JsonError::WrongType => write!(f, "wrong node type for this operation"),
            JsonError::WrongParent => write!(f, "node has the wrong parent for this operation"),
            JsonError::BadType => write!(f, "invalid node type argument"),
            JsonError::NoHash => write!(f, "context has no name hash table"),
        }
    }
}

impl std::error::Error for JsonError {}

/// One of the 20 fixed sequence-error descriptions a JSON text can trigger
/// during parsing, in the exact order `ltjson_errordesc` lists them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceError {
    NoError,
    InvalidTree,
    Internal,
    BeginTree,
    UnexpectedString,
    BadEscape,
    UnexpectedNumber,
    ObjectNoName,
    BadNumber,
    UnexpectedText,
    BadLogic,
    Discontinued,
    NoColon,
    LeadingComma,
    UnexpectedOpen,
    MismatchedCloseObject,
    MismatchedCloseArray,
    EmptyClosure,
    UnexpectedColon,
    BadText,
}

impl SequenceError {
    pub fn description(self) -> &'static str {
        match self {
            SequenceError::NoError => "No error",
            SequenceError::InvalidTree => "JSON tree argument is not valid",
            SequenceError::Internal => "Internal parsing error (report bug)",
            SequenceError::BeginTree => "JSON tree must start with an object or array",
            SequenceError::UnexpectedString => "Unexpected string (missing comma?)",
            SequenceError::BadEscape => "Cannot decode an escape in string",
            SequenceError::UnexpectedNumber => "Unexpected number (missing comma?)",
            SequenceError::ObjectNoName => "Object entry with no name",
            SequenceError::BadNumber => "Cannot convert number representation",
            SequenceError::UnexpectedText => "Unexpected non-string text",
            SequenceError::BadLogic => "Cannot convert logic representation",
            SequenceError::Discontinued => "Tree forced to discontinue parse",
            SequenceError::NoColon => "Expected a name-value separator (:)",
            SequenceError::LeadingComma => "Comma after empty value",
            SequenceError::UnexpectedOpen => "Unexpected object or array (missing comma?)",
            SequenceError::MismatchedCloseObject => "Mismatched object closure",
            SequenceError::MismatchedCloseArray => "Mismatched array closure",
            SequenceError::EmptyClosure => "Empty entry at object or array close",
            SequenceError::UnexpectedColon => "Unexpected name-value separator (:)",
            SequenceError::BadText => "Random unquoted text in content",
        }
    }
}

impl fmt::Display for SequenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

impl std::error::Error for SequenceError {}
