//! In-memory surface backed by a `ropey` rope.
//!
//! Several [`MemorySurface`]s may view one [`MemoryDocument`], each with its own
//! selections. Edit batches apply atomically and queue a [`DocumentChangeEvent`]
//! that the owner delivers to the registry. Named commands that only move the
//! viewport or need real motion algorithms (words, pages, find matches) are
//! recorded and acknowledged without effect.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use ropey::Rope;
use serde::Deserialize;
use serde_json::Value;

use crate::core::id::{DocumentId, SurfaceId};
use crate::core::selection::{Position, Range, Selection};
use crate::core::surface::{
    DocumentChangeEvent, LineInfo, RevealAt, Surface, host_commands as cmd,
};
use crate::core::text_edit::{TextEdit, resolve_edits};
use crate::error::{Error, Result};

static NEXT_DOCUMENT_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_SURFACE_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug)]
struct DocumentState {
    id: DocumentId,
    rope: Rope,
    /// Change notifications not yet taken by the host loop
    events: Vec<DocumentChangeEvent>,
    reject_next_edit: Option<String>,
}

impl DocumentState {
    /// Line length in chars, excluding the line break
    fn line_len(&self, line: usize) -> usize {
        let slice = self.rope.line(line);
        let mut len = slice.len_chars();
        if len > 0 && slice.char(len - 1) == '\n' {
            len -= 1;
            if len > 0 && slice.char(len - 1) == '\r' {
                len -= 1;
            }
        }
        len
    }

    fn clamp(&self, pos: Position) -> Position {
        let last = self.rope.len_lines().saturating_sub(1);
        if pos.line > last {
            return Position::new(last, self.line_len(last));
        }
        Position::new(pos.line, pos.character.min(self.line_len(pos.line)))
    }

    fn to_char(&self, pos: Position) -> usize {
        let pos = self.clamp(pos);
        self.rope.line_to_char(pos.line) + pos.character
    }

    fn to_position(&self, char_idx: usize) -> Position {
        let char_idx = char_idx.min(self.rope.len_chars());
        let line = self.rope.char_to_line(char_idx);
        Position::new(line, char_idx - self.rope.line_to_char(line))
    }

    fn validate(&self, range: Range) -> Result<()> {
        let line_count = self.rope.len_lines();
        let valid = |pos: Position| pos.line < line_count && pos.character <= self.line_len(pos.line);
        if valid(range.start) && valid(range.end) {
            Ok(())
        } else {
            Err(Error::InvalidRange { range, line_count })
        }
    }

    fn apply(&mut self, edits: &[TextEdit]) -> Result<()> {
        if let Some(reason) = self.reject_next_edit.take() {
            return Err(Error::EditRejected(reason));
        }
        for edit in edits {
            self.validate(edit.range)?;
        }

        let mut sorted: Vec<&TextEdit> = edits.iter().collect();
        sorted.sort_by_key(|edit| edit.range.start);
        for pair in sorted.windows(2) {
            if pair[0].range.end > pair[1].range.start {
                return Err(Error::OverlappingEdits(pair[1].range.start));
            }
        }

        // Back to front so earlier positions stay valid
        for edit in sorted.iter().rev() {
            let start = self.to_char(edit.range.start);
            let end = self.to_char(edit.range.end);
            self.rope.remove(start..end);
            self.rope.insert(start, &edit.text);
        }

        let changes: Vec<Range> = edits.iter().map(|edit| edit.range).collect();
        if !changes.is_empty() {
            self.events.push(DocumentChangeEvent {
                document: self.id,
                changes,
            });
        }
        Ok(())
    }
}

/// Document text shared by any number of surfaces
#[derive(Debug, Clone)]
pub struct MemoryDocument {
    inner: Rc<RefCell<DocumentState>>,
}

impl MemoryDocument {
    pub fn new(text: &str) -> Self {
        let id = DocumentId(NEXT_DOCUMENT_ID.fetch_add(1, Ordering::Relaxed));
        Self {
            inner: Rc::new(RefCell::new(DocumentState {
                id,
                rope: Rope::from_str(text),
                events: Vec::new(),
                reject_next_edit: None,
            })),
        }
    }

    pub fn id(&self) -> DocumentId {
        self.inner.borrow().id
    }

    pub fn text(&self) -> String {
        self.inner.borrow().rope.to_string()
    }

    /// Open a new view with a caret at the start of the document
    pub fn open_surface(&self) -> MemorySurface {
        MemorySurface {
            id: SurfaceId(NEXT_SURFACE_ID.fetch_add(1, Ordering::Relaxed)),
            document: self.clone(),
            selections: RefCell::new(vec![Selection::default()]),
            messages: RefCell::new(Vec::new()),
            context: RefCell::new(HashMap::new()),
            executed: RefCell::new(Vec::new()),
            revealed: RefCell::new(Vec::new()),
        }
    }

    /// Drain queued change notifications
    pub fn take_events(&self) -> Vec<DocumentChangeEvent> {
        std::mem::take(&mut self.inner.borrow_mut().events)
    }

    /// Make the next edit batch fail with `reason`
    pub fn reject_next_edit(&self, reason: &str) {
        self.inner.borrow_mut().reject_next_edit = Some(reason.to_string());
    }

    fn apply(&self, edits: &[TextEdit]) -> Result<()> {
        self.inner.borrow_mut().apply(edits)
    }
}

#[derive(Debug, Deserialize)]
struct TypeArgs {
    text: String,
}

#[derive(Debug, Deserialize)]
struct CursorMoveArgs {
    to: String,
    #[serde(default = "default_by")]
    by: String,
    #[serde(default = "default_value")]
    value: usize,
    #[serde(default)]
    select: bool,
}

fn default_by() -> String {
    "character".to_string()
}

fn default_value() -> usize {
    1
}

fn decode<T: for<'de> Deserialize<'de>>(command: &str, args: Option<Value>) -> Result<T> {
    serde_json::from_value(args.unwrap_or(Value::Null)).map_err(|e| Error::InvalidArguments {
        command: command.to_string(),
        reason: e.to_string(),
    })
}

/// One view of a [`MemoryDocument`]; records everything the core publishes.
#[derive(Debug)]
pub struct MemorySurface {
    id: SurfaceId,
    document: MemoryDocument,
    selections: RefCell<Vec<Selection>>,
    messages: RefCell<Vec<String>>,
    context: RefCell<HashMap<String, bool>>,
    executed: RefCell<Vec<(String, Option<Value>)>>,
    revealed: RefCell<Vec<(usize, RevealAt)>>,
}

impl MemorySurface {
    pub fn document(&self) -> &MemoryDocument {
        &self.document
    }

    pub fn text(&self) -> String {
        self.document.text()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.borrow().clone()
    }

    pub fn last_message(&self) -> Option<String> {
        self.messages.borrow().last().cloned()
    }

    pub fn context(&self, key: &str) -> Option<bool> {
        self.context.borrow().get(key).copied()
    }

    /// Ids of every named command executed, in order
    pub fn executed(&self) -> Vec<String> {
        self.executed
            .borrow()
            .iter()
            .map(|(command, _)| command.clone())
            .collect()
    }

    pub fn executed_with_args(&self) -> Vec<(String, Option<Value>)> {
        self.executed.borrow().clone()
    }

    pub fn revealed(&self) -> Vec<(usize, RevealAt)> {
        self.revealed.borrow().clone()
    }

    fn move_each(&self, select: bool, step: impl Fn(&DocumentState, Position) -> Position) {
        let state = self.document.inner.borrow();
        let moved = self
            .selections
            .borrow()
            .iter()
            .map(|selection| {
                let target = step(&state, state.clamp(selection.active));
                if select {
                    Selection::new(selection.anchor, target)
                } else {
                    Selection::caret(target)
                }
            })
            .collect();
        drop(state);
        self.set_selections(moved);
    }

    fn cursor_move(&self, args: CursorMoveArgs) -> Result<()> {
        let n = args.value;
        match (args.to.as_str(), args.by.as_str()) {
            ("right", "character") => self.move_each(args.select, |state, pos| {
                state.to_position(state.to_char(pos).saturating_add(n))
            }),
            ("left", "character") => self.move_each(args.select, |state, pos| {
                state.to_position(state.to_char(pos).saturating_sub(n))
            }),
            ("down", _) => self.move_each(args.select, |state, pos| {
                state.clamp(Position::new(pos.line.saturating_add(n), pos.character))
            }),
            ("up", _) => self.move_each(args.select, |state, pos| {
                state.clamp(Position::new(pos.line.saturating_sub(n), pos.character))
            }),
            (to, by) => {
                return Err(Error::InvalidArguments {
                    command: cmd::CURSOR_MOVE.to_string(),
                    reason: format!("unsupported motion to `{to}` by `{by}`"),
                });
            }
        }
        Ok(())
    }

    async fn type_text(&self, text: &str) -> Result<()> {
        let mut selections = self.selections();
        selections.sort_by_key(Selection::start);
        let edits: Vec<TextEdit> = selections
            .iter()
            .map(|selection| TextEdit::replace(selection.range(), text))
            .collect();
        self.apply_edit(&edits).await?;
        let carets = resolve_edits(&edits)
            .into_iter()
            .map(|range| Selection::caret(range.end))
            .collect();
        self.set_selections(carets);
        Ok(())
    }

    async fn line_break_insert(&self) -> Result<()> {
        let mut carets: Vec<Position> = self.selections().iter().map(|s| s.active).collect();
        carets.sort();
        carets.dedup();
        let edits: Vec<TextEdit> = carets
            .iter()
            .map(|&pos| {
                let indent = self.line_info(pos.line).map_or(0, |info| info.first_non_whitespace);
                let carried = self.read_text(Range::new(
                    Position::new(pos.line, 0),
                    Position::new(pos.line, indent.min(pos.character)),
                ));
                TextEdit::insert(pos, format!("\n{carried}"))
            })
            .collect();
        self.apply_edit(&edits).await?;
        let stay = resolve_edits(&edits)
            .into_iter()
            .map(|range| Selection::caret(range.start))
            .collect();
        self.set_selections(stay);
        Ok(())
    }

    async fn transform(&self, upper: bool) -> Result<()> {
        let mut selections: Vec<Selection> = self
            .selections()
            .into_iter()
            .filter(|selection| !selection.is_empty())
            .collect();
        selections.sort_by_key(Selection::start);
        let edits: Vec<TextEdit> = selections
            .iter()
            .map(|selection| {
                let text = self.read_text(selection.range());
                let text = if upper {
                    text.to_uppercase()
                } else {
                    text.to_lowercase()
                };
                TextEdit::replace(selection.range(), text)
            })
            .collect();
        self.apply_edit(&edits).await
    }
}

#[async_trait(?Send)]
impl Surface for MemorySurface {
    fn id(&self) -> SurfaceId {
        self.id
    }

    fn document_id(&self) -> DocumentId {
        self.document.id()
    }

    fn line_count(&self) -> usize {
        self.document.inner.borrow().rope.len_lines()
    }

    fn line_info(&self, line: usize) -> Option<LineInfo> {
        let state = self.document.inner.borrow();
        if line >= state.rope.len_lines() {
            return None;
        }
        let len = state.line_len(line);
        let first_non_whitespace = state
            .rope
            .line(line)
            .chars()
            .take(len)
            .position(|c| !c.is_whitespace())
            .unwrap_or(len);
        Some(LineInfo {
            end: Position::new(line, len),
            first_non_whitespace,
        })
    }

    fn read_text(&self, range: Range) -> String {
        let state = self.document.inner.borrow();
        let start = state.to_char(range.start);
        let end = state.to_char(range.end);
        state.rope.slice(start..end).to_string()
    }

    fn selections(&self) -> Vec<Selection> {
        self.selections.borrow().clone()
    }

    fn set_selections(&self, selections: Vec<Selection>) {
        if !selections.is_empty() {
            *self.selections.borrow_mut() = selections;
        }
    }

    async fn apply_edit(&self, edits: &[TextEdit]) -> Result<()> {
        self.document.apply(edits)
    }

    async fn execute_named(&self, command: &str, args: Option<Value>) -> Result<()> {
        self.executed
            .borrow_mut()
            .push((command.to_string(), args.clone()));

        match command {
            cmd::TYPE => {
                let TypeArgs { text } = decode(command, args)?;
                self.type_text(&text).await
            }
            cmd::LINE_BREAK_INSERT => self.line_break_insert().await,
            cmd::REMOVE_SECONDARY_CURSORS => {
                let primary = self.selections().into_iter().take(1).collect();
                self.set_selections(primary);
                Ok(())
            }
            cmd::TRANSFORM_TO_UPPERCASE => self.transform(true).await,
            cmd::TRANSFORM_TO_LOWERCASE => self.transform(false).await,
            cmd::CURSOR_MOVE => self.cursor_move(decode(command, args)?),
            cmd::CURSOR_LINE_START | cmd::CURSOR_LINE_START_SELECT => {
                self.move_each(command == cmd::CURSOR_LINE_START_SELECT, |_, pos| {
                    Position::new(pos.line, 0)
                });
                Ok(())
            }
            cmd::CURSOR_LINE_END | cmd::CURSOR_LINE_END_SELECT => {
                self.move_each(command == cmd::CURSOR_LINE_END_SELECT, |state, pos| {
                    Position::new(pos.line, state.line_len(pos.line))
                });
                Ok(())
            }
            cmd::CURSOR_TOP | cmd::CURSOR_TOP_SELECT => {
                self.move_each(command == cmd::CURSOR_TOP_SELECT, |_, _| Position::default());
                Ok(())
            }
            cmd::CURSOR_BOTTOM | cmd::CURSOR_BOTTOM_SELECT => {
                self.move_each(command == cmd::CURSOR_BOTTOM_SELECT, |state, _| {
                    state.to_position(state.rope.len_chars())
                });
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn show_message(&self, text: &str) {
        self.messages.borrow_mut().push(text.to_string());
    }

    fn set_context(&self, key: &str, value: bool) {
        self.context.borrow_mut().insert(key.to_string(), value);
    }

    fn reveal_line(&self, line: usize, at: RevealAt) {
        self.revealed.borrow_mut().push((line, at));
    }
}
