//! Per-document command state.
//!
//! A [`Session`] owns the prefix argument, mark mode, kill/yank chain and
//! recenter cycle for the surface it is bound to. The prefix argument is read
//! here, once per command, and handed to whatever needs it; commands never
//! reach back for it.

use std::collections::HashMap;
use std::rc::Rc;

use serde_json::json;
use tracing::{debug, trace};

use crate::config::Config;
use crate::core::blank_lines;
use crate::core::command::Motion;
use crate::core::commands::movement;
use crate::core::kill_ring::SharedKillRing;
use crate::core::kill_yank::{KillDirection, KillYanker};
use crate::core::mark::MarkMode;
use crate::core::prefix_argument::PrefixArgument;
use crate::core::recenter::Recenterer;
use crate::core::selection::{Position, Range, Selection};
use crate::core::surface::{DocumentChangeEvent, RevealAt, Surface, host_commands as cmd};
use crate::error::{Error, Result};

pub struct Session {
    surface: Rc<dyn Surface>,
    kill_yanker: KillYanker,
    prefix: PrefixArgument,
    mark: MarkMode,
    recenterer: Recenterer,
    motions: HashMap<&'static str, Box<dyn Motion>>,
    mark_context: String,
    /// Upper bound for text produced by a prefixed `type`
    max_insert_bytes: usize,
}

impl Session {
    pub fn new(surface: Rc<dyn Surface>, kill_ring: SharedKillRing, config: &Config) -> Self {
        let session = Self {
            kill_yanker: KillYanker::new(Rc::clone(&surface), kill_ring),
            prefix: PrefixArgument::new(config.universal_argument_base),
            mark: MarkMode::new(),
            recenterer: Recenterer::new(Rc::clone(&surface)),
            motions: movement::register_all(),
            mark_context: config.mark_mode_context.clone(),
            max_insert_bytes: config.max_kill_bytes,
            surface,
        };
        session.publish_mark_mode();
        session
    }

    pub fn surface(&self) -> &Rc<dyn Surface> {
        &self.surface
    }

    /// Bind to another surface of the same document, keeping prefix and mark state
    pub fn set_surface(&mut self, surface: Rc<dyn Surface>) {
        if Rc::ptr_eq(&self.surface, &surface) {
            return;
        }
        trace!(from = %self.surface.id(), to = %surface.id(), "session rebound");
        self.kill_yanker.set_surface(Rc::clone(&surface));
        self.recenterer.set_surface(Rc::clone(&surface));
        self.surface = surface;
        self.publish_mark_mode();
    }

    /// Pick up changed settings without losing command state.
    ///
    /// A renamed mark context is cleared under the old key before the flag is
    /// published under the new one.
    pub fn apply_config(&mut self, config: &Config) {
        self.prefix.set_base(config.universal_argument_base);
        self.max_insert_bytes = config.max_kill_bytes;
        self.kill_yanker.kill_ring().borrow_mut().configure(config);
        if self.mark_context != config.mark_mode_context {
            self.surface.set_context(&self.mark_context, false);
            self.mark_context = config.mark_mode_context.clone();
            self.publish_mark_mode();
        }
    }

    pub fn kill_ring(&self) -> &SharedKillRing {
        self.kill_yanker.kill_ring()
    }

    pub fn is_in_mark_mode(&self) -> bool {
        self.mark.is_active()
    }

    pub fn prefix_argument(&self) -> Option<i64> {
        self.prefix.get()
    }

    fn publish_mark_mode(&self) {
        self.surface
            .set_context(&self.mark_context, self.mark.is_active());
    }

    fn set_mark_active(&mut self, active: bool) {
        let changed = if active {
            self.mark.enter()
        } else {
            self.mark.exit()
        };
        if changed {
            trace!(active, "mark mode");
        }
        self.publish_mark_mode();
    }

    /// Start a command: consume the prefix and stop the recenter cycle
    fn begin(&mut self) -> Option<i64> {
        self.recenterer.reset();
        self.prefix.take()
    }

    /// Start a command that is neither a kill nor a yank
    fn begin_other(&mut self) -> Option<i64> {
        self.kill_yanker.note_other_command();
        self.begin()
    }

    fn has_non_empty_selection(&self) -> bool {
        self.surface.selections().iter().any(|s| !s.is_empty())
    }

    fn non_empty_ranges(&self) -> Vec<Range> {
        self.surface
            .selections()
            .iter()
            .filter(|s| !s.is_empty())
            .map(Selection::range)
            .collect()
    }

    fn collapse_selections(&self) {
        let collapsed = self
            .surface
            .selections()
            .iter()
            .map(Selection::collapse)
            .collect();
        self.surface.set_selections(collapsed);
    }

    // =========================================================================
    // Prefix argument and typing
    // =========================================================================

    /// Insert typed text, unless the prefix argument absorbs it.
    ///
    /// A prefix of `n >= 0` inserts the text `n` times in one request.
    pub async fn type_text(&mut self, text: &str) -> Result<()> {
        if self.prefix.handle_type(text) {
            if let Some(echo) = self.prefix.describe() {
                self.surface.show_message(&echo);
            }
            return Ok(());
        }

        let count = self.begin_other();
        let text = match count {
            Some(n) if n >= 0 => {
                let n = usize::try_from(n).unwrap_or(usize::MAX);
                if text.len().saturating_mul(n) > self.max_insert_bytes {
                    return Err(Error::InvalidArguments {
                        command: cmd::TYPE.to_string(),
                        reason: format!("repeat count {n} is too large"),
                    });
                }
                text.repeat(n)
            }
            _ => text.to_string(),
        };
        if text.is_empty() {
            return Ok(());
        }
        self.surface
            .execute_named(cmd::TYPE, Some(json!({ "text": text })))
            .await
    }

    pub fn universal_argument(&mut self) {
        self.prefix.universal_argument();
        if let Some(echo) = self.prefix.describe() {
            self.surface.show_message(&echo);
        }
    }

    pub fn cancel_prefix_argument(&mut self) {
        self.prefix.cancel();
    }

    // =========================================================================
    // Motion and mark
    // =========================================================================

    /// Run a named motion with the current prefix and mark state
    pub async fn cursor_move(&mut self, name: &str) -> Result<()> {
        let prefix = self.begin_other();
        let motion = self.motions.get(name).ok_or_else(|| Error::CommandFailed {
            command: name.to_string(),
            reason: "unknown motion".to_string(),
        })?;
        motion
            .run(self.surface.as_ref(), self.mark.is_active(), prefix)
            .await
    }

    /// `C-SPC`: toggles off when repeated without moving, otherwise activates
    pub fn set_mark_command(&mut self) {
        self.begin_other();
        if self.mark.is_active() && !self.has_non_empty_selection() {
            self.set_mark_active(false);
            self.surface.show_message("Mark deactivated");
        } else {
            self.set_mark_active(true);
            self.surface.show_message("Mark activated");
        }
    }

    pub fn enter_mark_mode(&mut self) {
        self.begin_other();
        self.set_mark_active(true);
    }

    pub fn exit_mark_mode(&mut self) {
        self.begin_other();
        self.set_mark_active(false);
    }

    pub async fn add_selection_to_next_find_match(&mut self) -> Result<()> {
        self.begin_other();
        self.set_mark_active(true);
        self.surface
            .execute_named(cmd::ADD_SELECTION_TO_NEXT_FIND_MATCH, None)
            .await
    }

    pub async fn add_selection_to_previous_find_match(&mut self) -> Result<()> {
        self.begin_other();
        self.set_mark_active(true);
        self.surface
            .execute_named(cmd::ADD_SELECTION_TO_PREVIOUS_FIND_MATCH, None)
            .await
    }

    /// `C-g`: drop back to a clean baseline.
    ///
    /// Every reset happens even when the host fails to remove secondary
    /// cursors; that failure is returned afterwards.
    pub async fn cancel(&mut self) -> Result<()> {
        let result = self.reset_to_baseline().await;
        self.surface.show_message("Quit");
        result
    }

    async fn reset_to_baseline(&mut self) -> Result<()> {
        let selections = self.surface.selections();
        let result = if selections.len() > 1 && selections.iter().all(Selection::is_empty) {
            self.surface
                .execute_named(cmd::REMOVE_SECONDARY_CURSORS, None)
                .await
        } else {
            self.collapse_selections();
            Ok(())
        };

        if self.mark.is_active() {
            self.set_mark_active(false);
        }
        self.kill_yanker.cancel_kill_append();
        self.kill_yanker.note_other_command();
        self.recenterer.reset();
        self.prefix.cancel();
        result
    }

    // =========================================================================
    // Kill and yank
    // =========================================================================

    /// `M-w`: copy every non-empty selection, then return to baseline.
    ///
    /// The baseline reset happens with or without a region.
    pub async fn copy_region(&mut self) -> Result<()> {
        self.begin_other();
        let ranges = self.non_empty_ranges();
        if ranges.is_empty() {
            let result = self.reset_to_baseline().await;
            self.surface.show_message("The region is empty");
            return result;
        }
        self.kill_yanker.copy(ranges);
        debug!("copy region");
        self.reset_to_baseline().await
    }

    /// `C-k` with the current prefix argument
    pub async fn kill_line(&mut self) -> Result<()> {
        let prefix = self.prefix.get();
        self.kill_line_with(prefix).await
    }

    /// `C-k` with an explicit count.
    ///
    /// With a count, kills from the cursor to the start of the line `count`
    /// lines away (backward when negative, nothing at all when zero). Without
    /// one, kills to the end of the line, or the line break when already there.
    pub async fn kill_line_with(&mut self, prefix: Option<i64>) -> Result<()> {
        self.begin();
        let direction = match prefix {
            Some(n) if n < 0 => KillDirection::Backward,
            _ => KillDirection::Forward,
        };
        let ranges = self
            .surface
            .selections()
            .iter()
            .map(|selection| self.kill_line_range(selection.active, prefix))
            .collect();
        self.kill_yanker.kill(ranges, direction).await?;
        self.set_mark_active(false);
        Ok(())
    }

    fn kill_line_range(&self, cursor: Position, prefix: Option<i64>) -> Range {
        let last_line = self.surface.line_count().saturating_sub(1);
        match prefix {
            Some(0) => Range::point(cursor),
            Some(n) => {
                let target = i64::try_from(cursor.line)
                    .unwrap_or(i64::MAX)
                    .saturating_add(n);
                let end = if target < 0 {
                    Position::default()
                } else if target as u64 > last_line as u64 {
                    self.surface.document_end()
                } else {
                    Position::new(target as usize, 0)
                };
                Range::new(cursor, end)
            }
            None => {
                let line_end = self
                    .surface
                    .line_info(cursor.line)
                    .map_or(cursor, |info| info.end);
                if cursor < line_end {
                    Range::new(cursor, line_end)
                } else if cursor.line < last_line {
                    Range::new(cursor, Position::new(cursor.line + 1, 0))
                } else {
                    Range::point(cursor)
                }
            }
        }
    }

    /// Kill every line holding a cursor, line break included
    pub async fn kill_whole_line(&mut self) -> Result<()> {
        self.begin();
        let last_line = self.surface.line_count().saturating_sub(1);
        let ranges = self
            .surface
            .selections()
            .iter()
            .map(|selection| {
                let line = selection.active.line;
                let line_end = self
                    .surface
                    .line_info(line)
                    .map_or(Position::new(line, 0), |info| info.end);
                if line < last_line {
                    Range::new(Position::new(line, 0), Position::new(line + 1, 0))
                } else if line > 0 {
                    let previous_end = self
                        .surface
                        .line_info(line - 1)
                        .map_or(Position::new(line - 1, 0), |info| info.end);
                    Range::new(previous_end, line_end)
                } else {
                    Range::new(Position::new(0, 0), line_end)
                }
            })
            .collect();
        self.kill_yanker.kill_lines(ranges).await?;
        self.set_mark_active(false);
        Ok(())
    }

    /// `C-w`: kill every non-empty selection as a fresh, sealed entry
    pub async fn kill_region(&mut self) -> Result<()> {
        self.begin();
        let ranges = self.non_empty_ranges();
        if ranges.is_empty() {
            self.kill_yanker.note_other_command();
            self.set_mark_active(false);
            self.surface.show_message("The region is empty");
            return Ok(());
        }
        self.kill_yanker.kill(ranges, KillDirection::Forward).await?;
        self.set_mark_active(false);
        self.kill_yanker.cancel_kill_append();
        Ok(())
    }

    pub fn cancel_kill_append(&mut self) {
        self.begin_other();
        self.kill_yanker.cancel_kill_append();
    }

    /// `C-y`: returns `false` when the kill ring is empty
    pub async fn yank(&mut self) -> Result<bool> {
        self.begin();
        if !self.kill_yanker.yank().await? {
            self.surface.show_message("Kill ring is empty");
            return Ok(false);
        }
        self.set_mark_active(false);
        Ok(true)
    }

    /// `M-y`: returns `false` when the previous command was not a yank
    pub async fn yank_pop(&mut self) -> Result<bool> {
        self.begin();
        if !self.kill_yanker.yank_pop().await? {
            self.surface.show_message("Previous command was not a yank");
            return Ok(false);
        }
        self.set_mark_active(false);
        Ok(true)
    }

    // =========================================================================
    // Editing
    // =========================================================================

    /// Break the line at every cursor and indent to the new line's content
    pub async fn new_line(&mut self) -> Result<()> {
        self.begin_other();
        self.collapse_selections();
        self.set_mark_active(false);

        self.surface
            .execute_named(cmd::LINE_BREAK_INSERT, None)
            .await?;

        let carets = self
            .surface
            .selections()
            .iter()
            .map(|selection| {
                let line = selection.active.line + 1;
                let indent = self
                    .surface
                    .line_info(line)
                    .map_or(0, |info| info.first_non_whitespace);
                Selection::caret(Position::new(line, indent))
            })
            .collect();
        self.surface.set_selections(carets);
        Ok(())
    }

    /// Returns `false` when there were no blank lines to delete
    pub async fn delete_blank_lines(&mut self) -> Result<bool> {
        self.begin_other();
        blank_lines::delete_blank_lines(self.surface.as_ref()).await
    }

    pub async fn transform_to_uppercase(&mut self) -> Result<()> {
        self.transform_case(cmd::TRANSFORM_TO_UPPERCASE).await
    }

    pub async fn transform_to_lowercase(&mut self) -> Result<()> {
        self.transform_case(cmd::TRANSFORM_TO_LOWERCASE).await
    }

    /// Transform the region, or the word(s) after the cursor when there is none
    async fn transform_case(&mut self, command: &str) -> Result<()> {
        let prefix = self.begin_other();
        if !self.has_non_empty_selection() {
            if let Some(forward_word) = self.motions.get("forwardWord") {
                forward_word.run(self.surface.as_ref(), true, prefix).await?;
            }
        }
        self.surface.execute_named(command, None).await?;
        self.collapse_selections();
        Ok(())
    }

    /// `C-l`
    pub fn recenter_top_bottom(&mut self) -> RevealAt {
        self.kill_yanker.note_other_command();
        self.prefix.cancel();
        self.recenterer.recenter_top_bottom()
    }

    // =========================================================================
    // Notifications
    // =========================================================================

    /// Leave mark mode when a change touches any current selection
    pub fn on_did_change_document(&mut self, event: &DocumentChangeEvent) {
        if event.document != self.surface.document_id() || !self.mark.is_active() {
            return;
        }
        let selections = self.surface.selections();
        let hit = event.changes.iter().any(|change| {
            selections
                .iter()
                .any(|selection| selection.range().intersects(change))
        });
        if hit {
            trace!("edit under the region ended mark mode");
            self.set_mark_active(false);
        }
    }
}
