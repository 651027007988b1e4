/// Mark mode: whether the current selections are an active, extendable region
///
/// The session publishes `is_active()` to the host after every `enter`/`exit`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MarkMode {
    active: bool,
}

impl MarkMode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Returns `true` if the state changed
    pub fn enter(&mut self) -> bool {
        !std::mem::replace(&mut self.active, true)
    }

    /// Returns `true` if the state changed
    pub fn exit(&mut self) -> bool {
        std::mem::replace(&mut self.active, false)
    }
}
