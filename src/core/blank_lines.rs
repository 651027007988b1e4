//! `C-x C-o`: delete blank lines around each cursor.
//!
//! On a blank line inside a run of blank lines, the run shrinks to one empty
//! line. On an isolated blank line, that line goes. On a non-blank line, the
//! blank lines right after it go.

use tracing::debug;

use crate::core::selection::{Position, Range, Selection, merge_overlapping};
use crate::core::surface::Surface;
use crate::core::text_edit::{TextEdit, resolve_edits};
use crate::error::Result;

fn is_blank(surface: &dyn Surface, line: usize) -> bool {
    surface.line_info(line).is_some_and(|info| info.is_blank())
}

fn line_end(surface: &dyn Surface, line: usize) -> Position {
    surface
        .line_info(line)
        .map(|info| info.end)
        .unwrap_or(Position::new(line, 0))
}

/// Range deleted for a cursor on `line`, `None` when there is nothing to do
pub fn blank_line_range(surface: &dyn Surface, line: usize) -> Option<Range> {
    let last_line = surface.line_count().saturating_sub(1);

    if !is_blank(surface, line) {
        let mut last_blank = line;
        while last_blank < last_line && is_blank(surface, last_blank + 1) {
            last_blank += 1;
        }
        if last_blank == line {
            return None;
        }
        let end = if last_blank < last_line {
            Position::new(last_blank + 1, 0)
        } else {
            line_end(surface, last_blank)
        };
        let range = Range::new(Position::new(line + 1, 0), end);
        return (!range.is_empty()).then_some(range);
    }

    let mut first = line;
    while first > 0 && is_blank(surface, first - 1) {
        first -= 1;
    }
    let mut last = line;
    while last < last_line && is_blank(surface, last + 1) {
        last += 1;
    }

    let range = if first != last {
        Range::new(Position::new(first, 0), line_end(surface, last))
    } else if line < last_line {
        Range::new(Position::new(line, 0), Position::new(line + 1, 0))
    } else if line > 0 {
        Range::new(line_end(surface, line - 1), line_end(surface, line))
    } else {
        Range::new(Position::new(0, 0), line_end(surface, 0))
    };
    (!range.is_empty()).then_some(range)
}

/// Delete blank lines around every cursor as one edit batch.
///
/// Cursors that started on a blank line land where the deletion began; the
/// others keep their position. Returns `false` when nothing was deleted.
pub async fn delete_blank_lines(surface: &dyn Surface) -> Result<bool> {
    let selections = surface.selections();
    let ranges = merge_overlapping(
        selections
            .iter()
            .filter_map(|selection| blank_line_range(surface, selection.active.line))
            .collect(),
    );
    if ranges.is_empty() {
        return Ok(false);
    }

    let edits: Vec<TextEdit> = ranges.iter().map(|range| TextEdit::delete(*range)).collect();
    surface.apply_edit(&edits).await?;

    // Zero-width markers ahead of the real edits track where each cursor lands
    let mut tracked: Vec<TextEdit> = selections
        .iter()
        .map(|selection| {
            let at = match ranges.iter().find(|range| range.contains(selection.active)) {
                Some(range) => range.start,
                None => selection.active,
            };
            TextEdit::insert(at, "")
        })
        .collect();
    let markers = tracked.len();
    tracked.extend(edits);
    let carets = resolve_edits(&tracked)
        .into_iter()
        .take(markers)
        .map(|range| Selection::caret(range.start))
        .collect();
    surface.set_selections(carets);

    debug!(ranges = ranges.len(), "delete blank lines");
    Ok(true)
}
