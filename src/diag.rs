//! Pretty, source-annotated rendering of a parse failure.
//!
//! Grounded on the teacher's own (not present in this retrieval) `diag`
//! module, referenced from `database.rs` as `diag::to_annotations` /
//! `DiagnosticClass` / `Notation`. This reconstructs the same idea for a
//! [`SequenceError`] instead of a verifier diagnostic: classify the
//! failure, then hand a window of the source plus an annotation to
//! `annotate-snippets`. Purely a reporting convenience layered on top of
//! [`Context::last_error`]; it changes no parsing behavior.

use annotate_snippets::display_list::{DisplayList, FormatOptions};
use annotate_snippets::snippet::{Annotation, AnnotationType, Slice, Snippet, SourceAnnotation};

use crate::context::Context;
use crate::error::SequenceError;

/// Coarse bucket for a [`SequenceError`], the way `DiagnosticClass` buckets
/// verifier errors by severity in the teacher's own diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticClass {
    /// The byte stream does not follow JSON grammar.
    Grammar,
    /// A string escape could not be decoded.
    Encoding,
    /// The engine itself hit a state it should never reach.
    Internal,
}

impl DiagnosticClass {
    pub fn of(err: SequenceError) -> Self {
        match err {
            SequenceError::BadEscape => DiagnosticClass::Encoding,
            SequenceError::Internal => DiagnosticClass::Internal,
            _ => DiagnosticClass::Grammar,
        }
    }

    fn annotation_type(self) -> AnnotationType {
        match self {
            DiagnosticClass::Internal => AnnotationType::Error,
            DiagnosticClass::Grammar => AnnotationType::Error,
            DiagnosticClass::Encoding => AnnotationType::Warning,
        }
    }
}

/// How many bytes of source context to show either side of the failing
/// byte.
const WINDOW: usize = 24;

fn floor_char_boundary(s: &str, mut idx: usize) -> usize {
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

fn ceil_char_boundary(s: &str, mut idx: usize) -> usize {
    while idx < s.len() && !s.is_char_boundary(idx) {
        idx += 1;
    }
    idx
}

/// Render `err`, which fired at byte `offset` into `source`, as a
/// multi-line annotated snippet. Mirrors what `diag::to_annotations` does
/// for a single parse result: turn one failure into display-ready text.
pub fn to_annotations(err: SequenceError, source: &str, offset: usize) -> String {
    let offset = offset.min(source.len());
    let start = floor_char_boundary(source, offset.saturating_sub(WINDOW));
    let end = ceil_char_boundary(source, (offset + WINDOW).min(source.len()));

    let label = err.description();
    let annotation_type = DiagnosticClass::of(err).annotation_type();

    let snippet = Snippet {
        title: Some(Annotation {
            id: None,
            label: Some(label),
            annotation_type,
        }),
        footer: vec![],
        slices: vec![Slice {
            source: &source[start..end],
            line_start: 1,
            origin: Some("<input>"),
            fold: true,
            annotations: vec![SourceAnnotation {
                range: (offset - start, ceil_char_boundary(source, offset + 1).min(end) - start),
                label,
                annotation_type,
            }],
        }],
        opt: FormatOptions {
            color: true,
            ..Default::default()
        },
    };

    DisplayList::from(snippet).to_string()
}

/// Render the context's current last error against a window of `source`
/// centred on `offset`. Returns `None` if the tree carries no error.
pub fn diagnose(ctx: &Context, source: &str, offset: usize) -> Option<String> {
    let err = ctx.lasterr?;
    Some(to_annotations(err, source, offset))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_bad_escape_as_encoding() {
        assert_eq!(DiagnosticClass::of(SequenceError::BadEscape), DiagnosticClass::Encoding);
    }

    #[test]
    fn classifies_grammar_errors() {
        assert_eq!(DiagnosticClass::of(SequenceError::NoColon), DiagnosticClass::Grammar);
    }

    #[test]
    fn renders_a_non_empty_report() {
        let out = to_annotations(SequenceError::NoColon, r#"{"a" 1}"#, 5);
        assert!(out.contains("name-value separator"));
    }
}
