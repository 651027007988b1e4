//! Prefix argument (`C-u`) accumulation.
//!
//! `C-u` starts entry with a default magnitude of `base`; repeating it with no
//! digits typed multiplies the magnitude by `base`. While entry is open, digits
//! and a leading `-` are absorbed instead of inserted. Once digits have been
//! typed, another `C-u` closes digit entry so following digits insert normally.

use tracing::trace;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Accumulator {
    /// Number of `C-u` presses
    presses: u32,
    digits: Option<i64>,
    negative: bool,
    /// Digit entry closed by a `C-u` after digits
    sealed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixArgument {
    state: Option<Accumulator>,
    base: i64,
}

impl Default for PrefixArgument {
    fn default() -> Self {
        Self::new(4)
    }
}

impl PrefixArgument {
    pub fn new(base: i64) -> Self {
        Self { state: None, base }
    }

    /// Change the `C-u` magnitude; an entry in progress picks it up too
    pub fn set_base(&mut self, base: i64) {
        self.base = base;
    }

    /// Begin entry, or escalate the default magnitude when no digits follow yet
    pub fn universal_argument(&mut self) {
        if let Some(acc) = self.state.as_mut() {
            if acc.digits.is_some() {
                acc.sealed = true;
            } else {
                acc.presses = acc.presses.saturating_add(1);
            }
        } else {
            self.state = Some(Accumulator {
                presses: 1,
                ..Accumulator::default()
            });
        }
        trace!(prefix = ?self.get(), "universal argument");
    }

    /// Offer one typed input to the accumulator.
    ///
    /// Returns `true` if the input was absorbed and must not be inserted.
    pub fn handle_type(&mut self, text: &str) -> bool {
        let Some(acc) = self.state.as_mut().filter(|acc| !acc.sealed) else {
            return false;
        };

        let mut chars = text.chars();
        let (Some(c), None) = (chars.next(), chars.next()) else {
            return false;
        };

        if let Some(digit) = c.to_digit(10) {
            let value = acc.digits.unwrap_or(0);
            acc.digits = Some(value.saturating_mul(10).saturating_add(i64::from(digit)));
            trace!(digits = ?acc.digits, "prefix digit");
            return true;
        }

        if c == '-' && acc.digits.is_none() && !acc.negative {
            acc.negative = true;
            return true;
        }

        false
    }

    /// Current value; `None` means no argument was given, which differs from `Some(0)`
    pub fn get(&self) -> Option<i64> {
        let acc = self.state.as_ref()?;
        let magnitude = match acc.digits {
            Some(digits) => digits,
            None if acc.negative => 1,
            None => self.base.saturating_pow(acc.presses),
        };
        Some(if acc.negative { -magnitude } else { magnitude })
    }

    /// Read the value and reset to absent
    pub fn take(&mut self) -> Option<i64> {
        let value = self.get();
        self.state = None;
        value
    }

    pub fn cancel(&mut self) {
        self.state = None;
    }

    pub fn is_active(&self) -> bool {
        self.state.is_some()
    }

    /// Echo-area rendering, e.g. `C-u 16` or `C-u -`
    pub fn describe(&self) -> Option<String> {
        let acc = self.state.as_ref()?;
        Some(match (acc.digits, acc.negative) {
            (None, true) => "C-u -".to_string(),
            _ => format!("C-u {}", self.get().unwrap_or_default()),
        })
    }
}
