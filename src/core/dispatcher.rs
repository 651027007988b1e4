use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::core::commands::movement::MOTION_NAMES;
use crate::core::registry::SessionRegistry;
use crate::core::session::Session;
use crate::core::surface::Surface;
use crate::error::{Error, Result};

/// Result of command dispatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchResult {
    /// Command executed successfully
    Success,
    /// Command not found/handled
    NotHandled,
    /// The host has no focused surface to run the command on
    NoActiveSurface,
    /// Nothing was done; message for the user
    Info(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown command `{0}`")]
pub struct UnknownCommand(pub String);

/// Commands the host can bind keys to, by name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// One of the named motions (`forwardChar`, `scrollUpCommand`, ...)
    Motion(&'static str),
    /// Typed text; arguments `{ "text": ... }`
    Type,
    UniversalArgument,
    CancelPrefixArgument,
    SetMarkCommand,
    EnterMarkMode,
    ExitMarkMode,
    AddSelectionToNextFindMatch,
    AddSelectionToPreviousFindMatch,
    Cancel,
    CopyRegion,
    KillLine,
    KillWholeLine,
    KillRegion,
    CancelKillAppend,
    Yank,
    YankPop,
    NewLine,
    DeleteBlankLines,
    TransformToUppercase,
    TransformToLowercase,
    RecenterTopBottom,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Motion(name) => *name,
            Command::Type => "type",
            Command::UniversalArgument => "universalArgument",
            Command::CancelPrefixArgument => "cancelPrefixArgument",
            Command::SetMarkCommand => "setMarkCommand",
            Command::EnterMarkMode => "enterMarkMode",
            Command::ExitMarkMode => "exitMarkMode",
            Command::AddSelectionToNextFindMatch => "addSelectionToNextFindMatch",
            Command::AddSelectionToPreviousFindMatch => "addSelectionToPreviousFindMatch",
            Command::Cancel => "cancel",
            Command::CopyRegion => "copyRegion",
            Command::KillLine => "killLine",
            Command::KillWholeLine => "killWholeLine",
            Command::KillRegion => "killRegion",
            Command::CancelKillAppend => "cancelKillAppend",
            Command::Yank => "yank",
            Command::YankPop => "yankPop",
            Command::NewLine => "newLine",
            Command::DeleteBlankLines => "deleteBlankLines",
            Command::TransformToUppercase => "transformToUppercase",
            Command::TransformToLowercase => "transformToLowercase",
            Command::RecenterTopBottom => "recenterTopBottom",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Command {
    type Err = UnknownCommand;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if let Some(name) = MOTION_NAMES.iter().find(|name| **name == s) {
            return Ok(Command::Motion(*name));
        }
        let command = match s {
            "type" => Command::Type,
            "universalArgument" => Command::UniversalArgument,
            "cancelPrefixArgument" => Command::CancelPrefixArgument,
            "setMarkCommand" => Command::SetMarkCommand,
            "enterMarkMode" => Command::EnterMarkMode,
            "exitMarkMode" => Command::ExitMarkMode,
            "addSelectionToNextFindMatch" => Command::AddSelectionToNextFindMatch,
            "addSelectionToPreviousFindMatch" => Command::AddSelectionToPreviousFindMatch,
            "cancel" => Command::Cancel,
            "copyRegion" => Command::CopyRegion,
            "killLine" => Command::KillLine,
            "killWholeLine" => Command::KillWholeLine,
            "killRegion" => Command::KillRegion,
            "cancelKillAppend" => Command::CancelKillAppend,
            "yank" => Command::Yank,
            "yankPop" => Command::YankPop,
            "newLine" => Command::NewLine,
            "deleteBlankLines" => Command::DeleteBlankLines,
            "transformToUppercase" => Command::TransformToUppercase,
            "transformToLowercase" => Command::TransformToLowercase,
            "recenterTopBottom" => Command::RecenterTopBottom,
            _ => return Err(UnknownCommand(s.to_string())),
        };
        Ok(command)
    }
}

#[derive(Debug, Deserialize)]
struct TypeArgs {
    text: String,
}

/// Run a host command by name on the session of the active surface.
///
/// The session is looked up (or created) in `registry` and bound to
/// `active`. Host failures are shown on the surface as `<command>: <error>`
/// and returned unchanged.
pub async fn dispatch(
    registry: &mut SessionRegistry,
    active: Option<Rc<dyn Surface>>,
    name: &str,
    args: Option<Value>,
) -> Result<DispatchResult> {
    let command = match name.parse::<Command>() {
        Ok(command) => command,
        Err(err) => {
            trace!(%err, "not handled");
            return Ok(DispatchResult::NotHandled);
        }
    };
    let Some(surface) = active else {
        return Ok(DispatchResult::NoActiveSurface);
    };

    let (session, created) = registry.get_or_create(Rc::clone(&surface));
    if created {
        trace!(document = %surface.document_id(), "session created on dispatch");
    }

    match execute(session, command, args).await {
        Ok(result) => {
            debug!(%command, ?result, "dispatched");
            Ok(result)
        }
        Err(err) => {
            warn!(%command, %err, "command failed");
            surface.show_message(&format!("{command}: {err}"));
            Err(err)
        }
    }
}

async fn execute(
    session: &mut Session,
    command: Command,
    args: Option<Value>,
) -> Result<DispatchResult> {
    match command {
        Command::Motion(name) => session.cursor_move(name).await?,
        Command::Type => {
            let TypeArgs { text } = serde_json::from_value(args.unwrap_or(Value::Null))
                .map_err(|e| Error::InvalidArguments {
                    command: command.name().to_string(),
                    reason: e.to_string(),
                })?;
            session.type_text(&text).await?
        }
        Command::UniversalArgument => session.universal_argument(),
        Command::CancelPrefixArgument => session.cancel_prefix_argument(),
        Command::SetMarkCommand => session.set_mark_command(),
        Command::EnterMarkMode => session.enter_mark_mode(),
        Command::ExitMarkMode => session.exit_mark_mode(),
        Command::AddSelectionToNextFindMatch => session.add_selection_to_next_find_match().await?,
        Command::AddSelectionToPreviousFindMatch => {
            session.add_selection_to_previous_find_match().await?
        }
        Command::Cancel => session.cancel().await?,
        Command::CopyRegion => session.copy_region().await?,
        Command::KillLine => session.kill_line().await?,
        Command::KillWholeLine => session.kill_whole_line().await?,
        Command::KillRegion => session.kill_region().await?,
        Command::CancelKillAppend => session.cancel_kill_append(),
        Command::Yank => {
            if !session.yank().await? {
                return Ok(DispatchResult::Info("Kill ring is empty".to_string()));
            }
        }
        Command::YankPop => {
            if !session.yank_pop().await? {
                return Ok(DispatchResult::Info(
                    "Previous command was not a yank".to_string(),
                ));
            }
        }
        Command::NewLine => session.new_line().await?,
        Command::DeleteBlankLines => {
            session.delete_blank_lines().await?;
        }
        Command::TransformToUppercase => session.transform_to_uppercase().await?,
        Command::TransformToLowercase => session.transform_to_lowercase().await?,
        Command::RecenterTopBottom => {
            session.recenter_top_bottom();
        }
    }
    Ok(DispatchResult::Success)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::memory::{MemoryDocument, MemorySurface};
    use crate::core::selection::{Position, Selection};
    use pollster::block_on;
    use serde_json::json;

    fn setup(text: &str) -> (SessionRegistry, Rc<MemorySurface>) {
        let doc = MemoryDocument::new(text);
        (SessionRegistry::default(), Rc::new(doc.open_surface()))
    }

    fn run(
        registry: &mut SessionRegistry,
        surface: &Rc<MemorySurface>,
        name: &str,
        args: Option<Value>,
    ) -> Result<DispatchResult> {
        let active: Rc<dyn Surface> = surface.clone();
        block_on(dispatch(registry, Some(active), name, args))
    }

    #[test]
    fn test_command_names_round_trip() {
        for name in MOTION_NAMES {
            assert_eq!(name.parse::<Command>().unwrap().name(), name);
        }
        let command: Command = "yankPop".parse().unwrap();
        assert_eq!(command, Command::YankPop);
        assert_eq!(command.to_string(), "yankPop");
        assert_eq!(
            "teleport".parse::<Command>(),
            Err(UnknownCommand("teleport".to_string()))
        );
    }

    #[test]
    fn test_unknown_command_not_handled() {
        let (mut registry, surface) = setup("");
        assert_eq!(
            run(&mut registry, &surface, "teleport", None),
            Ok(DispatchResult::NotHandled)
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn test_no_active_surface() {
        let mut registry = SessionRegistry::default();
        let result = block_on(dispatch(&mut registry, None, "yank", None));
        assert_eq!(result, Ok(DispatchResult::NoActiveSurface));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_type_and_kill_line() {
        let (mut registry, surface) = setup("");
        run(&mut registry, &surface, "type", Some(json!({ "text": "hi" }))).unwrap();
        assert_eq!(surface.text(), "hi");

        surface.set_selections(vec![Selection::caret(Position::new(0, 0))]);
        assert_eq!(
            run(&mut registry, &surface, "killLine", None),
            Ok(DispatchResult::Success)
        );
        assert_eq!(surface.text(), "");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_type_requires_text() {
        let (mut registry, surface) = setup("");
        let result = run(&mut registry, &surface, "type", Some(json!({ "txt": "x" })));
        assert!(matches!(result, Err(Error::InvalidArguments { .. })));
        assert!(
            surface
                .last_message()
                .is_some_and(|m| m.starts_with("type: invalid arguments"))
        );
    }

    #[test]
    fn test_yank_on_empty_ring_is_info() {
        let (mut registry, surface) = setup("abc");
        assert_eq!(
            run(&mut registry, &surface, "yank", None),
            Ok(DispatchResult::Info("Kill ring is empty".to_string()))
        );
        assert_eq!(surface.text(), "abc");
    }

    #[test]
    fn test_yank_pop_without_yank_is_info() {
        let (mut registry, surface) = setup("");
        assert_eq!(
            run(&mut registry, &surface, "yankPop", None),
            Ok(DispatchResult::Info("Previous command was not a yank".to_string()))
        );
    }

    #[test]
    fn test_host_failure_is_shown_and_propagated() {
        let (mut registry, surface) = setup("abc");
        surface.document().reject_next_edit("read-only");
        let result = run(&mut registry, &surface, "killLine", None);
        assert_eq!(result, Err(Error::EditRejected("read-only".to_string())));
        assert_eq!(
            surface.last_message().as_deref(),
            Some("killLine: edit rejected: read-only")
        );
    }

    #[test]
    fn test_prefix_flows_through_dispatch() {
        let (mut registry, surface) = setup("abcdef");
        run(&mut registry, &surface, "universalArgument", None).unwrap();
        run(&mut registry, &surface, "type", Some(json!({ "text": "3" }))).unwrap();
        run(&mut registry, &surface, "forwardChar", None).unwrap();
        assert_eq!(
            surface.selections(),
            vec![Selection::caret(Position::new(0, 3))]
        );
        assert_eq!(surface.text(), "abcdef");
    }
}
