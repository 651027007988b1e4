//! The host editing surface, as seen by the command core.
//!
//! A surface is one open view onto a document: its own selections over shared
//! document text. The core reads through it, sends edit batches and named
//! commands to it, and publishes user feedback and context flags through it.
//! Everything here is implemented by the host (or by [`MemorySurface`] in tests).
//!
//! [`MemorySurface`]: crate::core::memory::MemorySurface

use async_trait::async_trait;
use serde_json::Value;

use crate::core::id::{DocumentId, SurfaceId};
use crate::core::selection::{Position, Range, Selection};
use crate::core::text_edit::TextEdit;
use crate::error::Result;

/// Host command ids issued by the core.
pub mod host_commands {
    /// Insert `args.text` at every cursor, replacing selections.
    pub const TYPE: &str = "default:type";
    /// Insert a line break after every cursor without moving it.
    pub const LINE_BREAK_INSERT: &str = "lineBreakInsert";
    pub const REMOVE_SECONDARY_CURSORS: &str = "removeSecondaryCursors";
    pub const TRANSFORM_TO_UPPERCASE: &str = "editor.action.transformToUppercase";
    pub const TRANSFORM_TO_LOWERCASE: &str = "editor.action.transformToLowercase";
    pub const ADD_SELECTION_TO_NEXT_FIND_MATCH: &str = "editor.action.addSelectionToNextFindMatch";
    pub const ADD_SELECTION_TO_PREVIOUS_FIND_MATCH: &str =
        "editor.action.addSelectionToPreviousFindMatch";

    /// Counted motion: `{ "to": "left"|"right"|"up"|"down", "by": "character"|"line", "value": n, "select": bool }`
    pub const CURSOR_MOVE: &str = "cursorMove";
    pub const CURSOR_WORD_RIGHT: &str = "cursorWordRight";
    pub const CURSOR_WORD_RIGHT_SELECT: &str = "cursorWordRightSelect";
    pub const CURSOR_WORD_LEFT: &str = "cursorWordLeft";
    pub const CURSOR_WORD_LEFT_SELECT: &str = "cursorWordLeftSelect";
    pub const CURSOR_LINE_START: &str = "cursorLineStart";
    pub const CURSOR_LINE_START_SELECT: &str = "cursorLineStartSelect";
    pub const CURSOR_LINE_END: &str = "cursorLineEnd";
    pub const CURSOR_LINE_END_SELECT: &str = "cursorLineEndSelect";
    pub const CURSOR_TOP: &str = "cursorTop";
    pub const CURSOR_TOP_SELECT: &str = "cursorTopSelect";
    pub const CURSOR_BOTTOM: &str = "cursorBottom";
    pub const CURSOR_BOTTOM_SELECT: &str = "cursorBottomSelect";
    pub const CURSOR_PAGE_DOWN: &str = "cursorPageDown";
    pub const CURSOR_PAGE_DOWN_SELECT: &str = "cursorPageDownSelect";
    pub const CURSOR_PAGE_UP: &str = "cursorPageUp";
    pub const CURSOR_PAGE_UP_SELECT: &str = "cursorPageUpSelect";
}

/// Geometry of one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineInfo {
    /// Position just before the line break (or end of document)
    pub end: Position,
    /// Column of the first non-whitespace character; the line length when blank
    pub first_non_whitespace: usize,
}

impl LineInfo {
    pub fn is_blank(&self) -> bool {
        self.first_non_whitespace == self.end.character
    }
}

/// Where `reveal_line` should place the line inside the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealAt {
    Center,
    Top,
    Bottom,
}

/// Emitted by the host after text of a document changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentChangeEvent {
    pub document: DocumentId,
    /// Changed ranges in pre-change coordinates
    pub changes: Vec<Range>,
}

/// Host editing surface.
///
/// Methods take `&self`: hosts hand out shared handles and keep their own
/// interior state. The model is single-threaded, so futures need not be `Send`.
#[async_trait(?Send)]
pub trait Surface {
    fn id(&self) -> SurfaceId;

    fn document_id(&self) -> DocumentId;

    fn line_count(&self) -> usize;

    /// `None` when `line` is past the last line.
    fn line_info(&self, line: usize) -> Option<LineInfo>;

    fn read_text(&self, range: Range) -> String;

    /// Current selections, primary first.
    fn selections(&self) -> Vec<Selection>;

    fn set_selections(&self, selections: Vec<Selection>);

    /// Apply a batch of non-overlapping edits as a single atomic change.
    async fn apply_edit(&self, edits: &[TextEdit]) -> Result<()>;

    /// Run a host command by id.
    async fn execute_named(&self, command: &str, args: Option<Value>) -> Result<()>;

    fn show_message(&self, text: &str);

    /// Publish a context flag for key-binding conditions.
    fn set_context(&self, key: &str, value: bool);

    fn reveal_line(&self, line: usize, at: RevealAt);

    /// Position of the end of the document.
    fn document_end(&self) -> Position {
        let last = self.line_count().saturating_sub(1);
        self.line_info(last)
            .map(|info| info.end)
            .unwrap_or_default()
    }
}
