//! Host-assigned identities.
//!
//! The host owns documents and the panes showing them. The core keys its
//! sessions by [`DocumentId`] and counts open panes by [`SurfaceId`]; it never
//! holds a host document itself. Ids order by value, which is the order
//! `SessionRegistry::keys` reports.

use std::fmt;

/// A document, whichever surfaces view it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(pub u64);

/// One editor pane onto a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(pub u64);

impl From<u64> for DocumentId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl From<u64> for SurfaceId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "doc#{}", self.0)
    }
}

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "surface#{}", self.0)
    }
}
