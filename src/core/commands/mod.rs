//! Command implementations for emcx
//!
//! - **movement**: Cursor navigation (forward-char, next-line, forward-word, etc.)
//!
//! Motions implement the [`Motion`](crate::core::command::Motion) trait and
//! are looked up by name from the session.

/// Cursor movement
pub mod movement;
