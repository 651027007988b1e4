use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use tracing::{trace, warn};

use crate::config::{Config, DEFAULT_MAX_KILL_BYTES};

/// A kill ring handle that several sessions may hold.
///
/// Never keep a borrow alive across an `.await`.
pub type SharedKillRing = Rc<RefCell<KillRing>>;

/// One killed (or copied) piece of text, one segment per cursor involved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KillRingEntry {
    pub segments: Vec<String>,
    /// Later kills may merge into this entry
    pub appendable: bool,
    /// Produced by a whole-line kill
    pub full_line: bool,
}

impl KillRingEntry {
    pub fn new(segments: Vec<String>) -> Self {
        Self {
            segments,
            appendable: true,
            full_line: false,
        }
    }

    /// Segments joined by newlines, what a single cursor receives on yank
    pub fn text(&self) -> String {
        self.segments.join("\n")
    }

    pub fn byte_len(&self) -> usize {
        self.segments.iter().map(String::len).sum::<usize>() + self.segments.len().saturating_sub(1)
    }

    pub fn is_blank(&self) -> bool {
        self.segments.iter().all(String::is_empty)
    }

    fn merge(&mut self, other: KillRingEntry, mode: PushMode) {
        if self.segments.len() == other.segments.len() {
            for (mine, theirs) in self.segments.iter_mut().zip(other.segments) {
                match mode {
                    PushMode::Prepend => mine.insert_str(0, &theirs),
                    _ => mine.push_str(&theirs),
                }
            }
        } else {
            let merged = match mode {
                PushMode::Prepend => other.text() + &self.text(),
                _ => self.text() + &other.text(),
            };
            self.segments = vec![merged];
        }
        self.appendable = other.appendable;
        self.full_line &= other.full_line;
    }
}

/// How a push relates to the current entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushMode {
    /// Always start a new entry
    New,
    /// Add to the end of the current entry when it is appendable
    Append,
    /// Add to the front of the current entry when it is appendable
    Prepend,
}

/// Kill ring for storing cut/copied text
#[derive(Debug, Clone)]
pub struct KillRing {
    /// Ring buffer of entries, oldest first
    ring: VecDeque<KillRingEntry>,
    /// Maximum number of entries
    max_size: usize,
    /// Largest entry accepted, in bytes
    max_entry_bytes: usize,
    /// Index of the entry a yank would insert (for yank-pop rotation)
    current_index: Option<usize>,
    /// Bumped whenever the contents or the current entry change
    generation: u64,
}

impl Default for KillRing {
    fn default() -> Self {
        Self::new()
    }
}

impl KillRing {
    /// Create a new kill ring with default size (60)
    pub fn new() -> Self {
        Self::with_size(60)
    }

    /// Create a new kill ring with specified size
    pub fn with_size(max_size: usize) -> Self {
        Self {
            ring: VecDeque::with_capacity(max_size),
            max_size: max_size.max(1),
            max_entry_bytes: DEFAULT_MAX_KILL_BYTES,
            current_index: None,
            generation: 0,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let mut ring = Self::with_size(config.kill_ring_max);
        ring.max_entry_bytes = config.max_kill_bytes;
        ring
    }

    pub fn shared(config: &Config) -> SharedKillRing {
        Rc::new(RefCell::new(Self::from_config(config)))
    }

    /// Adopt new limits, discarding the oldest entries beyond `kill-ring-max`
    pub fn configure(&mut self, config: &Config) {
        self.max_entry_bytes = config.max_kill_bytes;
        self.max_size = config.kill_ring_max.max(1);
        let excess = self.ring.len().saturating_sub(self.max_size);
        if excess == 0 {
            return;
        }
        self.ring.drain(..excess);
        self.current_index = self
            .current_index
            .map(|i| i.saturating_sub(excess).min(self.ring.len() - 1));
        self.generation += 1;
        trace!(dropped = excess, "kill ring shrunk");
    }

    /// Push an entry, merging into the current one when `mode` asks for it
    /// and the current entry is appendable.
    ///
    /// Returns `false` when the entry was refused for exceeding the size limit.
    pub fn push(&mut self, entry: KillRingEntry, mode: PushMode) -> bool {
        if entry.byte_len() > self.max_entry_bytes {
            warn!(bytes = entry.byte_len(), "kill rejected: entry too large");
            return false;
        }

        if mode != PushMode::New {
            let limit = self.max_entry_bytes;
            if let Some(current) = self.current_mut().filter(|current| current.appendable) {
                if current.byte_len() + entry.byte_len() > limit {
                    warn!("kill rejected: merged entry too large");
                    return false;
                }
                current.merge(entry, mode);
                self.generation += 1;
                trace!(?mode, "merged kill into current entry");
                return true;
            }
        }

        if self.ring.len() >= self.max_size {
            self.ring.pop_front(); // Remove oldest
        }
        self.ring.push_back(entry);
        self.current_index = Some(self.ring.len() - 1);
        self.generation += 1;
        true
    }

    /// Changes on every push and rotation.
    ///
    /// A holder of a shared ring compares it with the value it saw after its
    /// own last push to tell whether anyone else touched the ring since.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The entry a yank would insert
    pub fn current(&self) -> Option<&KillRingEntry> {
        self.current_index.and_then(|i| self.ring.get(i))
    }

    fn current_mut(&mut self) -> Option<&mut KillRingEntry> {
        self.current_index.and_then(|i| self.ring.get_mut(i))
    }

    fn previous_index(&self) -> Option<usize> {
        self.current_index.map(|i| match i {
            0 => self.ring.len() - 1,
            i => i - 1,
        })
    }

    /// The entry `rotate_back` would make current, without moving
    pub fn peek_back(&self) -> Option<&KillRingEntry> {
        self.previous_index().and_then(|i| self.ring.get(i))
    }

    /// Move to the next older entry, wrapping to the newest (for yank-pop)
    pub fn rotate_back(&mut self) -> Option<&KillRingEntry> {
        self.current_index = self.previous_index();
        if self.current_index.is_some() {
            self.generation += 1;
        }
        self.current()
    }

    /// Stop the current entry from absorbing later kills
    pub fn seal_current(&mut self) {
        if let Some(current) = self.current_mut() {
            current.appendable = false;
        }
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Entries, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &KillRingEntry> {
        self.ring.iter()
    }
}
