//! Edit batches sent to the host in a single request.

use crate::core::selection::{Position, Range};

/// Replace `range` with `text`. Deletions carry empty text, insertions an empty range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    pub range: Range,
    pub text: String,
}

impl TextEdit {
    pub fn replace(range: Range, text: impl Into<String>) -> Self {
        Self {
            range,
            text: text.into(),
        }
    }

    pub fn delete(range: Range) -> Self {
        Self::replace(range, String::new())
    }

    pub fn insert(at: Position, text: impl Into<String>) -> Self {
        Self::replace(Range::point(at), text)
    }
}

/// Where each edit's text lands once the whole batch has been applied.
///
/// Edits are expressed in pre-edit coordinates and must not overlap. The result
/// is index-aligned with `edits`.
pub fn resolve_edits(edits: &[TextEdit]) -> Vec<Range> {
    let mut order: Vec<usize> = (0..edits.len()).collect();
    order.sort_by_key(|&i| edits[i].range.start);

    let mut resolved = vec![Range::default(); edits.len()];
    let mut line_delta: isize = 0;
    // (original line the previous edit ended on, column shift for that line)
    let mut carry: Option<(usize, isize)> = None;

    for i in order {
        let TextEdit { range, text } = &edits[i];
        let character = match carry {
            Some((line, shift)) if line == range.start.line => {
                (range.start.character as isize + shift) as usize
            }
            _ => range.start.character,
        };
        let start = Position::new((range.start.line as isize + line_delta) as usize, character);
        let end = start.advance(text);

        let removed_lines = (range.end.line - range.start.line) as isize;
        line_delta += text.matches('\n').count() as isize - removed_lines;
        carry = Some((
            range.end.line,
            end.character as isize - range.end.character as isize,
        ));
        resolved[i] = Range::new(start, end);
    }

    resolved
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(line: usize, character: usize) -> Position {
        Position::new(line, character)
    }

    #[test]
    fn test_same_line_edits_shift_columns() {
        let edits = vec![
            TextEdit::replace(Range::new(pos(0, 2), pos(0, 4)), "X"),
            TextEdit::insert(pos(0, 6), "YY"),
        ];
        let resolved = resolve_edits(&edits);
        assert_eq!(resolved[0], Range::new(pos(0, 2), pos(0, 3)));
        assert_eq!(resolved[1], Range::new(pos(0, 5), pos(0, 7)));
    }

    #[test]
    fn test_multiline_insert_shifts_following_lines() {
        let edits = vec![
            TextEdit::insert(pos(3, 0), "tail"),
            TextEdit::insert(pos(0, 2), "a\nbc"),
            TextEdit::insert(pos(0, 5), "!"),
        ];
        let resolved = resolve_edits(&edits);
        assert_eq!(resolved[1], Range::new(pos(0, 2), pos(1, 2)));
        assert_eq!(resolved[2], Range::new(pos(1, 5), pos(1, 6)));
        assert_eq!(resolved[0], Range::new(pos(4, 0), pos(4, 4)));
    }

    #[test]
    fn test_multiline_delete_pulls_lines_up() {
        let edits = vec![
            TextEdit::delete(Range::new(pos(0, 2), pos(1, 3))),
            TextEdit::delete(Range::new(pos(1, 5), pos(1, 6))),
            TextEdit::delete(Range::new(pos(2, 0), pos(3, 0))),
        ];
        let resolved = resolve_edits(&edits);
        assert_eq!(resolved[0], Range::point(pos(0, 2)));
        assert_eq!(resolved[1], Range::point(pos(0, 4)));
        assert_eq!(resolved[2], Range::point(pos(1, 0)));
    }
}
