//! Session registry: one [`Session`] per open document.
//!
//! A document may be shown in several surfaces at once. The registry tracks
//! which surfaces are open per document and keeps the session alive until the
//! last of them closes.

use std::collections::hash_map::Entry as MapEntry;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use tracing::{debug, trace};

use crate::config::{Config, ConfigValue, KillRingScope};
use crate::core::id::{DocumentId, SurfaceId};
use crate::core::kill_ring::{KillRing, SharedKillRing};
use crate::core::session::Session;
use crate::core::surface::{DocumentChangeEvent, Surface};
use crate::error::ConfigError;

struct Entry {
    session: Session,
    surfaces: HashSet<SurfaceId>,
}

pub struct SessionRegistry {
    config: Config,
    /// Ring handed to every session when the scope is shared
    shared_ring: SharedKillRing,
    entries: HashMap<DocumentId, Entry>,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl SessionRegistry {
    pub fn new(config: Config) -> Self {
        Self {
            shared_ring: KillRing::shared(&config),
            config,
            entries: HashMap::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Apply one host setting by its TOML key and pass it on to live sessions.
    ///
    /// Nothing changes when the setting is rejected.
    pub fn set<V: Into<ConfigValue>>(&mut self, key: &str, value: V) -> Result<(), ConfigError> {
        let mut next = self.config.clone();
        next.set(key, value)?;
        self.set_config(next)
    }

    /// Replace the whole configuration.
    ///
    /// Ring limits, the `C-u` base and the mark context take effect in every
    /// live session. A new `kill-ring-scope` only applies to sessions created
    /// afterwards.
    pub fn set_config(&mut self, config: Config) -> Result<(), ConfigError> {
        config.validate()?;
        self.shared_ring.borrow_mut().configure(&config);
        for entry in self.entries.values_mut() {
            entry.session.apply_config(&config);
        }
        debug!(sessions = self.entries.len(), "configuration updated");
        self.config = config;
        Ok(())
    }

    /// The process-wide ring; unused by sessions when the scope is isolated
    pub fn shared_kill_ring(&self) -> &SharedKillRing {
        &self.shared_ring
    }

    /// Session for the document behind `surface`, created on first use.
    ///
    /// The session is (re)bound to `surface`. The flag is `true` when the
    /// session was just created, so the caller can hook up disposal.
    pub fn get_or_create(&mut self, surface: Rc<dyn Surface>) -> (&mut Session, bool) {
        let document = surface.document_id();
        match self.entries.entry(document) {
            MapEntry::Occupied(occupied) => {
                let entry = occupied.into_mut();
                entry.surfaces.insert(surface.id());
                entry.session.set_surface(surface);
                (&mut entry.session, false)
            }
            MapEntry::Vacant(vacant) => {
                let ring = match self.config.kill_ring_scope {
                    KillRingScope::Shared => Rc::clone(&self.shared_ring),
                    KillRingScope::Isolated => KillRing::shared(&self.config),
                };
                let surfaces = HashSet::from([surface.id()]);
                debug!(%document, scope = ?self.config.kill_ring_scope, "session created");
                let entry = vacant.insert(Entry {
                    session: Session::new(surface, ring, &self.config),
                    surfaces,
                });
                (&mut entry.session, true)
            }
        }
    }

    pub fn get(&self, document: DocumentId) -> Option<&Session> {
        self.entries.get(&document).map(|entry| &entry.session)
    }

    pub fn get_mut(&mut self, document: DocumentId) -> Option<&mut Session> {
        self.entries.get_mut(&document).map(|entry| &mut entry.session)
    }

    /// Drop a session regardless of open surfaces
    pub fn delete(&mut self, document: DocumentId) -> Option<Session> {
        let removed = self.entries.remove(&document).map(|entry| entry.session);
        if removed.is_some() {
            debug!(%document, "session deleted");
        }
        removed
    }

    /// Documents with a live session, in id order
    pub fn keys(&self) -> Vec<DocumentId> {
        let mut keys: Vec<DocumentId> = self.entries.keys().copied().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of open surfaces tracked for `document`
    pub fn open_surfaces(&self, document: DocumentId) -> usize {
        self.entries
            .get(&document)
            .map_or(0, |entry| entry.surfaces.len())
    }

    /// Forget a closed surface.
    ///
    /// Returns `true` when it was the document's last surface and the
    /// session went with it.
    pub fn close_surface(&mut self, document: DocumentId, surface: SurfaceId) -> bool {
        let Some(entry) = self.entries.get_mut(&document) else {
            return false;
        };
        entry.surfaces.remove(&surface);
        trace!(%document, %surface, remaining = entry.surfaces.len(), "surface closed");
        if entry.surfaces.is_empty() {
            self.entries.remove(&document);
            debug!(%document, "last surface closed, session disposed");
            return true;
        }
        false
    }

    /// Drop sessions whose documents are no longer open; returns how many went
    pub fn retain_open(&mut self, open: &HashSet<DocumentId>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|document, _| open.contains(document));
        let removed = before - self.entries.len();
        if removed > 0 {
            debug!(removed, "swept sessions of closed documents");
        }
        removed
    }

    /// Deliver a change notification to the session of its document
    pub fn notify_document_change(&mut self, event: &DocumentChangeEvent) {
        if let Some(session) = self.get_mut(event.document) {
            session.on_did_change_document(event);
        }
    }
}
