//! This module constitutes the headless command core of emcx.
//! It manages the per-document session state (prefix argument, mark mode,
//! kill ring and yank chain) and issues everything else to the host surface
//! through the [`surface::Surface`] trait.

pub mod blank_lines;
pub mod command;
pub mod commands;
pub mod dispatcher;
pub mod id;
pub mod kill_ring;
pub mod kill_yank;
pub mod mark;
pub mod memory;
pub mod prefix_argument;
pub mod recenter;
pub mod registry;
pub mod selection;
pub mod session;
pub mod surface;
pub mod text_edit;
