//! `C-l` cycling: center, top, bottom.

use std::rc::Rc;

use crate::core::surface::{RevealAt, Surface};

pub struct Recenterer {
    surface: Rc<dyn Surface>,
    /// Next placement and the cursor line it applies to
    cycle: Option<(RevealAt, usize)>,
}

impl Recenterer {
    pub fn new(surface: Rc<dyn Surface>) -> Self {
        Self {
            surface,
            cycle: None,
        }
    }

    pub fn set_surface(&mut self, surface: Rc<dyn Surface>) {
        self.surface = surface;
        self.reset();
    }

    /// Start the cycle at center on the next call
    pub fn reset(&mut self) {
        self.cycle = None;
    }

    /// Reveal the primary cursor line; consecutive calls on the same line cycle
    /// center, top, bottom.
    pub fn recenter_top_bottom(&mut self) -> RevealAt {
        let line = self
            .surface
            .selections()
            .first()
            .map(|selection| selection.active.line)
            .unwrap_or(0);

        let at = match self.cycle {
            Some((at, cycle_line)) if cycle_line == line => at,
            _ => RevealAt::Center,
        };
        self.surface.reveal_line(line, at);

        let next = match at {
            RevealAt::Center => RevealAt::Top,
            RevealAt::Top => RevealAt::Bottom,
            RevealAt::Bottom => RevealAt::Center,
        };
        self.cycle = Some((next, line));
        at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::memory::MemoryDocument;
    use crate::core::selection::{Position, Selection};

    #[test]
    fn test_cycles_and_resets() {
        let doc = MemoryDocument::new("a\nb\nc\n");
        let surface = Rc::new(doc.open_surface());
        let mut recenterer = Recenterer::new(surface.clone());

        assert_eq!(recenterer.recenter_top_bottom(), RevealAt::Center);
        assert_eq!(recenterer.recenter_top_bottom(), RevealAt::Top);
        assert_eq!(recenterer.recenter_top_bottom(), RevealAt::Bottom);
        assert_eq!(recenterer.recenter_top_bottom(), RevealAt::Center);

        recenterer.recenter_top_bottom();
        recenterer.reset();
        assert_eq!(recenterer.recenter_top_bottom(), RevealAt::Center);

        // Moving the cursor restarts the cycle
        surface.set_selections(vec![Selection::caret(Position::new(2, 0))]);
        assert_eq!(recenterer.recenter_top_bottom(), RevealAt::Center);
        assert_eq!(surface.revealed().last(), Some(&(2, RevealAt::Center)));
    }
}
