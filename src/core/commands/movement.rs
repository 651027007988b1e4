/// Cursor movement commands
///
/// Motions translate the prefix argument and mark flag into host motion
/// commands. Selecting variants are used while in mark mode; negative counts
/// reverse direction.
use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::json;

use crate::core::command::Motion;
use crate::core::surface::{Surface, host_commands as cmd};
use crate::error::Result;

/// Send one counted `cursorMove` request
async fn cursor_move(
    surface: &dyn Surface,
    forward: &str,
    backward: &str,
    by: &str,
    in_mark_mode: bool,
    count: i64,
) -> Result<()> {
    let to = if count < 0 { backward } else { forward };
    surface
        .execute_named(
            cmd::CURSOR_MOVE,
            Some(json!({
                "to": to,
                "by": by,
                "value": count.unsigned_abs(),
                "select": in_mark_mode,
            })),
        )
        .await
}

/// Run a plain/select command pair `|count|` times
async fn repeat(
    surface: &dyn Surface,
    (plain, select): (&str, &str),
    in_mark_mode: bool,
    count: u64,
) -> Result<()> {
    let command = if in_mark_mode { select } else { plain };
    for _ in 0..count {
        surface.execute_named(command, None).await?;
    }
    Ok(())
}

/// Move cursor forward by character(s)
pub struct ForwardChar;

#[async_trait(?Send)]
impl Motion for ForwardChar {
    async fn run(&self, surface: &dyn Surface, in_mark_mode: bool, prefix: Option<i64>) -> Result<()> {
        let count = prefix.unwrap_or(1);
        cursor_move(surface, "right", "left", "character", in_mark_mode, count).await
    }
}

/// Move cursor backward by character(s)
pub struct BackwardChar;

#[async_trait(?Send)]
impl Motion for BackwardChar {
    async fn run(&self, surface: &dyn Surface, in_mark_mode: bool, prefix: Option<i64>) -> Result<()> {
        let count = prefix.unwrap_or(1);
        cursor_move(surface, "left", "right", "character", in_mark_mode, count).await
    }
}

/// Move cursor down by line(s)
pub struct NextLine;

#[async_trait(?Send)]
impl Motion for NextLine {
    async fn run(&self, surface: &dyn Surface, in_mark_mode: bool, prefix: Option<i64>) -> Result<()> {
        let count = prefix.unwrap_or(1);
        cursor_move(surface, "down", "up", "line", in_mark_mode, count).await
    }
}

/// Move cursor up by line(s)
pub struct PreviousLine;

#[async_trait(?Send)]
impl Motion for PreviousLine {
    async fn run(&self, surface: &dyn Surface, in_mark_mode: bool, prefix: Option<i64>) -> Result<()> {
        let count = prefix.unwrap_or(1);
        cursor_move(surface, "up", "down", "line", in_mark_mode, count).await
    }
}

/// Move to the start of the line
pub struct MoveBeginningOfLine;

#[async_trait(?Send)]
impl Motion for MoveBeginningOfLine {
    async fn run(&self, surface: &dyn Surface, in_mark_mode: bool, _prefix: Option<i64>) -> Result<()> {
        let pair = (cmd::CURSOR_LINE_START, cmd::CURSOR_LINE_START_SELECT);
        repeat(surface, pair, in_mark_mode, 1).await
    }
}

/// Move to the end of the line
pub struct MoveEndOfLine;

#[async_trait(?Send)]
impl Motion for MoveEndOfLine {
    async fn run(&self, surface: &dyn Surface, in_mark_mode: bool, _prefix: Option<i64>) -> Result<()> {
        let pair = (cmd::CURSOR_LINE_END, cmd::CURSOR_LINE_END_SELECT);
        repeat(surface, pair, in_mark_mode, 1).await
    }
}

/// Move forward over word(s)
pub struct ForwardWord;

#[async_trait(?Send)]
impl Motion for ForwardWord {
    async fn run(&self, surface: &dyn Surface, in_mark_mode: bool, prefix: Option<i64>) -> Result<()> {
        let count = prefix.unwrap_or(1);
        let pair = if count < 0 {
            (cmd::CURSOR_WORD_LEFT, cmd::CURSOR_WORD_LEFT_SELECT)
        } else {
            (cmd::CURSOR_WORD_RIGHT, cmd::CURSOR_WORD_RIGHT_SELECT)
        };
        repeat(surface, pair, in_mark_mode, count.unsigned_abs()).await
    }
}

/// Move backward over word(s)
pub struct BackwardWord;

#[async_trait(?Send)]
impl Motion for BackwardWord {
    async fn run(&self, surface: &dyn Surface, in_mark_mode: bool, prefix: Option<i64>) -> Result<()> {
        let count = prefix.unwrap_or(1);
        let pair = if count < 0 {
            (cmd::CURSOR_WORD_RIGHT, cmd::CURSOR_WORD_RIGHT_SELECT)
        } else {
            (cmd::CURSOR_WORD_LEFT, cmd::CURSOR_WORD_LEFT_SELECT)
        };
        repeat(surface, pair, in_mark_mode, count.unsigned_abs()).await
    }
}

/// Move to the beginning of the buffer
pub struct BeginningOfBuffer;

#[async_trait(?Send)]
impl Motion for BeginningOfBuffer {
    async fn run(&self, surface: &dyn Surface, in_mark_mode: bool, _prefix: Option<i64>) -> Result<()> {
        repeat(surface, (cmd::CURSOR_TOP, cmd::CURSOR_TOP_SELECT), in_mark_mode, 1).await
    }
}

/// Move to the end of the buffer
pub struct EndOfBuffer;

#[async_trait(?Send)]
impl Motion for EndOfBuffer {
    async fn run(&self, surface: &dyn Surface, in_mark_mode: bool, _prefix: Option<i64>) -> Result<()> {
        repeat(surface, (cmd::CURSOR_BOTTOM, cmd::CURSOR_BOTTOM_SELECT), in_mark_mode, 1).await
    }
}

/// Scroll text up (cursor moves down) a page, or `n` lines with a prefix
pub struct ScrollUpCommand;

#[async_trait(?Send)]
impl Motion for ScrollUpCommand {
    async fn run(&self, surface: &dyn Surface, in_mark_mode: bool, prefix: Option<i64>) -> Result<()> {
        match prefix {
            Some(lines) => cursor_move(surface, "down", "up", "line", in_mark_mode, lines).await,
            None => {
                let pair = (cmd::CURSOR_PAGE_DOWN, cmd::CURSOR_PAGE_DOWN_SELECT);
                repeat(surface, pair, in_mark_mode, 1).await
            }
        }
    }
}

/// Scroll text down (cursor moves up) a page, or `n` lines with a prefix
pub struct ScrollDownCommand;

#[async_trait(?Send)]
impl Motion for ScrollDownCommand {
    async fn run(&self, surface: &dyn Surface, in_mark_mode: bool, prefix: Option<i64>) -> Result<()> {
        match prefix {
            Some(lines) => cursor_move(surface, "up", "down", "line", in_mark_mode, lines).await,
            None => {
                let pair = (cmd::CURSOR_PAGE_UP, cmd::CURSOR_PAGE_UP_SELECT);
                repeat(surface, pair, in_mark_mode, 1).await
            }
        }
    }
}

/// Names of every registered motion
pub const MOTION_NAMES: [&str; 12] = [
    "forwardChar",
    "backwardChar",
    "nextLine",
    "previousLine",
    "moveBeginningOfLine",
    "moveEndOfLine",
    "forwardWord",
    "backwardWord",
    "beginningOfBuffer",
    "endOfBuffer",
    "scrollUpCommand",
    "scrollDownCommand",
];

/// Build the motion table a session dispatches through
pub fn register_all() -> HashMap<&'static str, Box<dyn Motion>> {
    let mut registry: HashMap<&'static str, Box<dyn Motion>> = HashMap::new();

    registry.insert("forwardChar", Box::new(ForwardChar));
    registry.insert("backwardChar", Box::new(BackwardChar));
    registry.insert("nextLine", Box::new(NextLine));
    registry.insert("previousLine", Box::new(PreviousLine));
    registry.insert("moveBeginningOfLine", Box::new(MoveBeginningOfLine));
    registry.insert("moveEndOfLine", Box::new(MoveEndOfLine));
    registry.insert("forwardWord", Box::new(ForwardWord));
    registry.insert("backwardWord", Box::new(BackwardWord));
    registry.insert("beginningOfBuffer", Box::new(BeginningOfBuffer));
    registry.insert("endOfBuffer", Box::new(EndOfBuffer));
    registry.insert("scrollUpCommand", Box::new(ScrollUpCommand));
    registry.insert("scrollDownCommand", Box::new(ScrollDownCommand));

    registry
}
