//! Kill, copy, yank and yank-pop against one surface.
//!
//! Eligibility for kill-append and yank-pop is derived from the last committed
//! operation together with the selections and ring generation it left behind.
//! A cursor move or edit from anywhere else changes the selections, and a push
//! from another session sharing the ring changes the generation. Either one
//! breaks the chain.

use std::rc::Rc;

use tracing::{debug, trace};

use crate::core::kill_ring::{KillRingEntry, PushMode, SharedKillRing};
use crate::core::selection::{Range, Selection, merge_overlapping};
use crate::core::surface::Surface;
use crate::core::text_edit::{TextEdit, resolve_edits};
use crate::error::Result;

/// Direction a kill extends from the cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KillDirection {
    Forward,
    Backward,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
enum LastOp {
    #[default]
    Other,
    Kill {
        direction: KillDirection,
        selections: Vec<Selection>,
        generation: u64,
    },
    Yank {
        /// Inserted text, post-edit coordinates, in edit order
        ranges: Vec<Range>,
        selections: Vec<Selection>,
        generation: u64,
    },
}

pub struct KillYanker {
    surface: Rc<dyn Surface>,
    kill_ring: SharedKillRing,
    last: LastOp,
}

/// Text for the i-th of `count` cursors
fn text_for(entry: &KillRingEntry, index: usize, count: usize) -> String {
    if entry.segments.len() == count {
        entry.segments[index].clone()
    } else {
        entry.text()
    }
}

impl KillYanker {
    pub fn new(surface: Rc<dyn Surface>, kill_ring: SharedKillRing) -> Self {
        Self {
            surface,
            kill_ring,
            last: LastOp::Other,
        }
    }

    /// Rebind to another surface; chains never survive a surface change
    pub fn set_surface(&mut self, surface: Rc<dyn Surface>) {
        self.surface = surface;
        self.last = LastOp::Other;
    }

    pub fn kill_ring(&self) -> &SharedKillRing {
        &self.kill_ring
    }

    /// Neither the cursors nor the ring moved since `selections` and
    /// `generation` were recorded
    fn chain_intact(&self, selections: &[Selection], generation: u64) -> bool {
        self.kill_ring.borrow().generation() == generation && self.surface.selections() == selections
    }

    /// Whether the next kill in `direction` would merge into the current entry
    pub fn is_appending(&self, direction: KillDirection) -> bool {
        match &self.last {
            LastOp::Kill {
                direction: last,
                selections,
                generation,
            } => *last == direction && self.chain_intact(selections, *generation),
            _ => false,
        }
    }

    /// Whether `yank_pop` would act now
    pub fn can_yank_pop(&self) -> bool {
        match &self.last {
            LastOp::Yank {
                selections,
                generation,
                ..
            } => self.chain_intact(selections, *generation),
            _ => false,
        }
    }

    /// Delete `ranges` and store their text as one ring entry
    pub async fn kill(&mut self, ranges: Vec<Range>, direction: KillDirection) -> Result<()> {
        self.kill_with(ranges, direction, false).await
    }

    /// Like `kill`, marking the entry as whole-line text
    pub async fn kill_lines(&mut self, ranges: Vec<Range>) -> Result<()> {
        self.kill_with(ranges, KillDirection::Forward, true).await
    }

    async fn kill_with(
        &mut self,
        ranges: Vec<Range>,
        direction: KillDirection,
        full_line: bool,
    ) -> Result<()> {
        let appending = self.is_appending(direction);
        self.last = LastOp::Other;

        let ranges = merge_overlapping(ranges);
        if ranges.is_empty() {
            return Ok(());
        }
        let segments: Vec<String> = ranges
            .iter()
            .map(|range| self.surface.read_text(*range))
            .collect();

        let deletions: Vec<TextEdit> = ranges.iter().map(|range| TextEdit::delete(*range)).collect();
        let edits: Vec<TextEdit> = deletions
            .iter()
            .filter(|edit| !edit.range.is_empty())
            .cloned()
            .collect();
        if !edits.is_empty() {
            self.surface.apply_edit(&edits).await?;
            let carets = resolve_edits(&deletions)
                .into_iter()
                .map(|range| Selection::caret(range.start))
                .collect();
            self.surface.set_selections(carets);
        }

        let mut entry = KillRingEntry::new(segments);
        entry.full_line = full_line;
        if !entry.is_blank() {
            let mode = match (appending, direction) {
                (false, _) => PushMode::New,
                (true, KillDirection::Forward) => PushMode::Append,
                (true, KillDirection::Backward) => PushMode::Prepend,
            };
            self.kill_ring.borrow_mut().push(entry, mode);
        }
        debug!(ranges = ranges.len(), appending, ?direction, "kill");

        self.last = LastOp::Kill {
            direction,
            selections: self.surface.selections(),
            generation: self.kill_ring.borrow().generation(),
        };
        Ok(())
    }

    /// Store the text of `ranges` without deleting it
    pub fn copy(&mut self, ranges: Vec<Range>) {
        self.last = LastOp::Other;
        let ranges = merge_overlapping(ranges);
        if ranges.is_empty() {
            return;
        }
        let segments = ranges
            .iter()
            .map(|range| self.surface.read_text(*range))
            .collect();
        let mut ring = self.kill_ring.borrow_mut();
        ring.push(KillRingEntry::new(segments), PushMode::New);
        ring.seal_current();
        debug!(ranges = ranges.len(), "copy");
    }

    /// Insert the current ring entry at every cursor.
    ///
    /// Returns `false` when the ring is empty.
    pub async fn yank(&mut self) -> Result<bool> {
        self.last = LastOp::Other;
        let Some(entry) = self.kill_ring.borrow().current().cloned() else {
            return Ok(false);
        };

        let mut selections = self.surface.selections();
        selections.sort_by_key(Selection::start);
        let count = selections.len();
        let edits: Vec<TextEdit> = selections
            .iter()
            .enumerate()
            .map(|(i, selection)| TextEdit::replace(selection.range(), text_for(&entry, i, count)))
            .collect();

        self.apply_insertions(&edits).await?;
        self.record_yank(resolve_edits(&edits));
        debug!(cursors = count, split = entry.segments.len() == count, "yank");
        Ok(true)
    }

    /// Replace the text the last yank inserted with the previous ring entry.
    ///
    /// Returns `false` (nothing changed) unless the previous operation was a
    /// yank or yank-pop and the cursors have not moved since.
    pub async fn yank_pop(&mut self) -> Result<bool> {
        let ranges = match &self.last {
            LastOp::Yank {
                ranges,
                selections,
                generation,
            } if self.chain_intact(selections, *generation) => ranges.clone(),
            _ => {
                self.last = LastOp::Other;
                return Ok(false);
            }
        };
        self.last = LastOp::Other;

        let Some(entry) = self.kill_ring.borrow().peek_back().cloned() else {
            return Ok(false);
        };

        let count = ranges.len();
        let edits: Vec<TextEdit> = ranges
            .iter()
            .enumerate()
            .map(|(i, range)| TextEdit::replace(*range, text_for(&entry, i, count)))
            .collect();

        self.apply_insertions(&edits).await?;
        // Rotate only once the replacement committed
        self.kill_ring.borrow_mut().rotate_back();
        self.record_yank(resolve_edits(&edits));
        debug!(cursors = count, "yank-pop");
        Ok(true)
    }

    async fn apply_insertions(&mut self, edits: &[TextEdit]) -> Result<()> {
        self.surface.apply_edit(edits).await?;
        let carets = resolve_edits(edits)
            .iter()
            .map(|range| Selection::caret(range.end))
            .collect();
        self.surface.set_selections(carets);
        Ok(())
    }

    fn record_yank(&mut self, ranges: Vec<Range>) {
        self.last = LastOp::Yank {
            ranges,
            selections: self.surface.selections(),
            generation: self.kill_ring.borrow().generation(),
        };
    }

    /// Make the next kill start a fresh entry
    pub fn cancel_kill_append(&mut self) {
        if matches!(self.last, LastOp::Kill { .. }) {
            self.last = LastOp::Other;
        }
        self.kill_ring.borrow_mut().seal_current();
        trace!("kill append cancelled");
    }

    /// Record that a command other than kill/yank ran
    pub fn note_other_command(&mut self) {
        self.last = LastOp::Other;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::kill_ring::KillRing;
    use crate::core::memory::{MemoryDocument, MemorySurface};
    use crate::core::selection::Position;
    use pollster::block_on;
    use std::cell::RefCell;

    fn pos(line: usize, character: usize) -> Position {
        Position::new(line, character)
    }

    fn setup(text: &str) -> (Rc<MemorySurface>, KillYanker) {
        let doc = MemoryDocument::new(text);
        let surface = Rc::new(doc.open_surface());
        let ring = Rc::new(RefCell::new(KillRing::new()));
        let yanker = KillYanker::new(surface.clone(), ring);
        (surface, yanker)
    }

    fn ring_texts(yanker: &KillYanker) -> Vec<String> {
        yanker.kill_ring().borrow().iter().map(KillRingEntry::text).collect()
    }

    #[test]
    fn test_kill_deletes_and_stores() {
        let (surface, mut yanker) = setup("hello world");
        block_on(yanker.kill(vec![Range::new(pos(0, 0), pos(0, 6))], KillDirection::Forward))
            .unwrap();
        assert_eq!(surface.text(), "world");
        assert_eq!(ring_texts(&yanker), vec!["hello "]);
        assert_eq!(surface.selections(), vec![Selection::caret(pos(0, 0))]);
    }

    #[test]
    fn test_consecutive_kills_append() {
        let (surface, mut yanker) = setup("abc def ghi");
        for _ in 0..3 {
            let at = surface.selections()[0].active;
            let line_end = surface.line_info(0).unwrap().end;
            let end = Position::new(0, (at.character + 4).min(line_end.character));
            block_on(yanker.kill(vec![Range::new(at, end)], KillDirection::Forward)).unwrap();
        }
        assert_eq!(ring_texts(&yanker), vec!["abc def ghi"]);
    }

    #[test]
    fn test_backward_kills_prepend() {
        let (surface, mut yanker) = setup("abc def");
        surface.set_selections(vec![Selection::caret(pos(0, 7))]);
        block_on(yanker.kill(vec![Range::new(pos(0, 4), pos(0, 7))], KillDirection::Backward))
            .unwrap();
        block_on(yanker.kill(vec![Range::new(pos(0, 0), pos(0, 4))], KillDirection::Backward))
            .unwrap();
        assert_eq!(ring_texts(&yanker), vec!["abc def"]);
    }

    #[test]
    fn test_direction_change_starts_new_entry() {
        let (surface, mut yanker) = setup("abc def");
        surface.set_selections(vec![Selection::caret(pos(0, 4))]);
        block_on(yanker.kill(vec![Range::new(pos(0, 4), pos(0, 7))], KillDirection::Forward))
            .unwrap();
        block_on(yanker.kill(vec![Range::new(pos(0, 0), pos(0, 4))], KillDirection::Backward))
            .unwrap();
        assert_eq!(ring_texts(&yanker), vec!["def", "abc "]);
    }

    #[test]
    fn test_cursor_move_breaks_append() {
        let (surface, mut yanker) = setup("one two");
        block_on(yanker.kill(vec![Range::new(pos(0, 0), pos(0, 3))], KillDirection::Forward))
            .unwrap();
        surface.set_selections(vec![Selection::caret(pos(0, 1))]);
        block_on(yanker.kill(vec![Range::new(pos(0, 1), pos(0, 4))], KillDirection::Forward))
            .unwrap();
        assert_eq!(ring_texts(&yanker), vec!["one", "two"]);
    }

    #[test]
    fn test_cancel_kill_append() {
        let (_surface, mut yanker) = setup("one two");
        block_on(yanker.kill(vec![Range::new(pos(0, 0), pos(0, 3))], KillDirection::Forward))
            .unwrap();
        yanker.cancel_kill_append();
        assert!(!yanker.is_appending(KillDirection::Forward));
        block_on(yanker.kill(vec![Range::new(pos(0, 0), pos(0, 4))], KillDirection::Forward))
            .unwrap();
        assert_eq!(ring_texts(&yanker), vec!["one", " two"]);
    }

    #[test]
    fn test_multi_range_kill_keeps_segments() {
        let (surface, mut yanker) = setup("ab\ncd\n");
        block_on(yanker.kill(
            vec![
                Range::new(pos(1, 0), pos(1, 1)),
                Range::new(pos(0, 0), pos(0, 1)),
            ],
            KillDirection::Forward,
        ))
        .unwrap();
        assert_eq!(surface.text(), "b\nd\n");
        let ring = yanker.kill_ring().borrow();
        assert_eq!(ring.current().unwrap().segments, vec!["a", "c"]);
        drop(ring);
        assert_eq!(
            surface.selections(),
            vec![Selection::caret(pos(0, 0)), Selection::caret(pos(1, 0))]
        );
    }

    #[test]
    fn test_overlapping_ranges_merge() {
        let (surface, mut yanker) = setup("abcdef");
        block_on(yanker.kill(
            vec![Range::new(pos(0, 0), pos(0, 3)), Range::new(pos(0, 2), pos(0, 4))],
            KillDirection::Forward,
        ))
        .unwrap();
        assert_eq!(surface.text(), "ef");
        assert_eq!(ring_texts(&yanker), vec!["abcd"]);
    }

    #[test]
    fn test_zero_width_kill_keeps_buffer_and_ring() {
        let (surface, mut yanker) = setup("abc");
        block_on(yanker.kill(vec![Range::point(pos(0, 1))], KillDirection::Forward)).unwrap();
        assert_eq!(surface.text(), "abc");
        assert!(yanker.kill_ring().borrow().is_empty());
        assert!(surface.document().take_events().is_empty());
    }

    #[test]
    fn test_failed_kill_does_not_store_or_chain() {
        let (surface, mut yanker) = setup("abc");
        surface.document().reject_next_edit("read-only");
        let result =
            block_on(yanker.kill(vec![Range::new(pos(0, 0), pos(0, 1))], KillDirection::Forward));
        assert!(result.is_err());
        assert!(yanker.kill_ring().borrow().is_empty());
        assert!(!yanker.is_appending(KillDirection::Forward));
    }

    #[test]
    fn test_copy_then_yank_round_trip() {
        let (surface, mut yanker) = setup("copy me\n");
        yanker.copy(vec![Range::new(pos(0, 0), pos(0, 7))]);
        assert_eq!(surface.text(), "copy me\n");
        surface.set_selections(vec![Selection::caret(pos(1, 0))]);
        assert!(block_on(yanker.yank()).unwrap());
        assert_eq!(surface.text(), "copy me\ncopy me");
    }

    #[test]
    fn test_copy_is_never_appended_to() {
        let (surface, mut yanker) = setup("one two");
        yanker.copy(vec![Range::new(pos(0, 0), pos(0, 3))]);
        surface.set_selections(vec![Selection::caret(pos(0, 3))]);
        block_on(yanker.kill(vec![Range::new(pos(0, 3), pos(0, 7))], KillDirection::Forward))
            .unwrap();
        assert_eq!(ring_texts(&yanker), vec!["one", " two"]);
    }

    #[test]
    fn test_yank_empty_ring() {
        let (surface, mut yanker) = setup("abc");
        assert!(!block_on(yanker.yank()).unwrap());
        assert_eq!(surface.text(), "abc");
    }

    #[test]
    fn test_yank_splits_segments_per_cursor() {
        let (surface, mut yanker) = setup("1\n2\n");
        yanker.copy(vec![
            Range::new(pos(0, 0), pos(0, 1)),
            Range::new(pos(1, 0), pos(1, 1)),
        ]);
        surface.set_selections(vec![Selection::caret(pos(0, 1)), Selection::caret(pos(1, 1))]);
        block_on(yanker.yank()).unwrap();
        assert_eq!(surface.text(), "11\n22\n");
    }

    #[test]
    fn test_yank_broadcasts_on_count_mismatch() {
        let (surface, mut yanker) = setup("x\ny\nz");
        yanker.copy(vec![
            Range::new(pos(0, 0), pos(0, 1)),
            Range::new(pos(1, 0), pos(1, 1)),
        ]);
        surface.set_selections(vec![Selection::caret(pos(2, 1))]);
        block_on(yanker.yank()).unwrap();
        assert_eq!(surface.text(), "x\ny\nzx\ny");
    }

    #[test]
    fn test_yank_replaces_selection() {
        let (surface, mut yanker) = setup("keep drop");
        yanker.copy(vec![Range::new(pos(0, 0), pos(0, 4))]);
        surface.set_selections(vec![Selection::new(pos(0, 5), pos(0, 9))]);
        block_on(yanker.yank()).unwrap();
        assert_eq!(surface.text(), "keep keep");
    }

    #[test]
    fn test_yank_pop_cycles_entries() {
        let (surface, mut yanker) = setup("a b c\n");
        yanker.copy(vec![Range::new(pos(0, 0), pos(0, 1))]);
        yanker.copy(vec![Range::new(pos(0, 2), pos(0, 3))]);
        yanker.copy(vec![Range::new(pos(0, 4), pos(0, 5))]);
        surface.set_selections(vec![Selection::caret(pos(1, 0))]);

        block_on(yanker.yank()).unwrap();
        assert_eq!(surface.text(), "a b c\nc");
        assert!(block_on(yanker.yank_pop()).unwrap());
        assert_eq!(surface.text(), "a b c\nb");
        assert!(block_on(yanker.yank_pop()).unwrap());
        assert_eq!(surface.text(), "a b c\na");
        assert!(block_on(yanker.yank_pop()).unwrap());
        assert_eq!(surface.text(), "a b c\nc");
        assert_eq!(surface.selections(), vec![Selection::caret(pos(1, 1))]);
    }

    #[test]
    fn test_yank_pop_without_yank_is_noop() {
        let (surface, mut yanker) = setup("abc");
        yanker.copy(vec![Range::new(pos(0, 0), pos(0, 1))]);
        yanker.copy(vec![Range::new(pos(0, 1), pos(0, 2))]);
        assert!(!block_on(yanker.yank_pop()).unwrap());
        assert_eq!(surface.text(), "abc");
        assert_eq!(
            yanker.kill_ring().borrow().current().map(KillRingEntry::text).as_deref(),
            Some("b")
        );
    }

    #[test]
    fn test_yank_pop_after_cursor_move_is_noop() {
        let (surface, mut yanker) = setup("abc");
        yanker.copy(vec![Range::new(pos(0, 0), pos(0, 1))]);
        block_on(yanker.yank()).unwrap();
        surface.set_selections(vec![Selection::caret(pos(0, 0))]);
        assert!(!block_on(yanker.yank_pop()).unwrap());
    }

    #[test]
    fn test_failed_yank_pop_leaves_ring_unrotated() {
        let (surface, mut yanker) = setup("ab\n");
        yanker.copy(vec![Range::new(pos(0, 0), pos(0, 1))]);
        yanker.copy(vec![Range::new(pos(0, 1), pos(0, 2))]);
        surface.set_selections(vec![Selection::caret(pos(1, 0))]);
        block_on(yanker.yank()).unwrap();

        surface.document().reject_next_edit("busy");
        assert!(block_on(yanker.yank_pop()).is_err());
        assert_eq!(surface.text(), "ab\nb");
        assert_eq!(
            yanker.kill_ring().borrow().current().map(KillRingEntry::text).as_deref(),
            Some("b")
        );
        assert!(!yanker.can_yank_pop());
    }

    #[test]
    fn test_multi_cursor_yank_pop() {
        let (surface, mut yanker) = setup("\n\n");
        {
            let mut ring = yanker.kill_ring().borrow_mut();
            ring.push(KillRingEntry::new(vec!["long\ntext".into()]), PushMode::New);
            ring.push(KillRingEntry::new(vec!["x".into(), "y".into()]), PushMode::New);
        }

        surface.set_selections(vec![Selection::caret(pos(0, 0)), Selection::caret(pos(1, 0))]);
        block_on(yanker.yank()).unwrap();
        assert_eq!(surface.text(), "x\ny\n");
        assert!(block_on(yanker.yank_pop()).unwrap());
        assert_eq!(surface.text(), "long\ntext\nlong\ntext\n");
        assert_eq!(
            surface.selections(),
            vec![Selection::caret(pos(1, 4)), Selection::caret(pos(3, 4))]
        );
    }

    /// Two yankers over different documents sharing one ring
    fn setup_pair(
        a: &str,
        b: &str,
    ) -> (Rc<MemorySurface>, KillYanker, Rc<MemorySurface>, KillYanker) {
        let ring = Rc::new(RefCell::new(KillRing::new()));
        let left = Rc::new(MemoryDocument::new(a).open_surface());
        let right = Rc::new(MemoryDocument::new(b).open_surface());
        let left_yanker = KillYanker::new(left.clone(), Rc::clone(&ring));
        let right_yanker = KillYanker::new(right.clone(), ring);
        (left, left_yanker, right, right_yanker)
    }

    #[test]
    fn test_push_through_shared_ring_breaks_append() {
        let (_left, mut left_yanker, _right, mut right_yanker) = setup_pair("abcd", "wxyz");
        block_on(left_yanker.kill(vec![Range::new(pos(0, 0), pos(0, 2))], KillDirection::Forward))
            .unwrap();
        assert!(left_yanker.is_appending(KillDirection::Forward));

        block_on(right_yanker.kill(vec![Range::new(pos(0, 0), pos(0, 2))], KillDirection::Forward))
            .unwrap();
        assert!(!left_yanker.is_appending(KillDirection::Forward));
        block_on(left_yanker.kill(vec![Range::new(pos(0, 0), pos(0, 2))], KillDirection::Forward))
            .unwrap();
        assert_eq!(ring_texts(&left_yanker), vec!["ab", "wx", "cd"]);
    }

    #[test]
    fn test_push_through_shared_ring_ends_yank_chain() {
        let (left, mut left_yanker, _right, mut right_yanker) = setup_pair("one two\n", "xyz");
        left_yanker.copy(vec![Range::new(pos(0, 0), pos(0, 3))]);
        left_yanker.copy(vec![Range::new(pos(0, 4), pos(0, 7))]);
        left.set_selections(vec![Selection::caret(pos(1, 0))]);
        block_on(left_yanker.yank()).unwrap();
        assert!(left_yanker.can_yank_pop());

        right_yanker.copy(vec![Range::new(pos(0, 0), pos(0, 3))]);
        assert!(!left_yanker.can_yank_pop());
        assert!(!block_on(left_yanker.yank_pop()).unwrap());
        assert_eq!(left.text(), "one two\ntwo");
        assert_eq!(
            left_yanker.kill_ring().borrow().current().map(KillRingEntry::text).as_deref(),
            Some("xyz")
        );
    }

    #[test]
    fn test_yank_pop_chain_survives_own_rotation() {
        let (left, mut left_yanker, _right, _right_yanker) = setup_pair("a b\n", "");
        left_yanker.copy(vec![Range::new(pos(0, 0), pos(0, 1))]);
        left_yanker.copy(vec![Range::new(pos(0, 2), pos(0, 3))]);
        left.set_selections(vec![Selection::caret(pos(1, 0))]);
        block_on(left_yanker.yank()).unwrap();
        assert!(block_on(left_yanker.yank_pop()).unwrap());
        assert!(left_yanker.can_yank_pop());
        assert!(block_on(left_yanker.yank_pop()).unwrap());
        assert_eq!(left.text(), "a b\nb");
    }

    #[test]
    fn test_kill_with_empty_and_nonempty_ranges_keeps_every_caret() {
        let (surface, mut yanker) = setup("ab\n\ncd");
        block_on(yanker.kill(
            vec![
                Range::new(pos(0, 0), pos(0, 2)),
                Range::point(pos(1, 0)),
                Range::new(pos(2, 0), pos(2, 1)),
            ],
            KillDirection::Forward,
        ))
        .unwrap();
        assert_eq!(surface.text(), "\n\nd");
        assert_eq!(surface.selections().len(), 3);
        assert_eq!(
            yanker.kill_ring().borrow().current().unwrap().segments,
            vec!["ab", "", "c"]
        );
    }
}
