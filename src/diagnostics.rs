// SPDX-License-Identifier: MIT OR Apache-2.0

//! Non-fatal diagnostics accumulated across a compile (`spec.md` §8,
//! "warn but continue" cases such as an unconsumed `Stream` variable).
//!
//! Kept as a flat accumulator rather than threaded through every pass
//! function, mirroring how the teacher's `core::validation` module collects
//! soft findings separately from the hard `EventFluxError` path.

#[derive(Debug, Clone, PartialEq)]
pub enum Warning {
    /// A `Stream`-kind variable was bound but never consumed by a `select`.
    UnusedStream(String),
    /// An input stream had no explicit map and no type-compatible
    /// auto-map target; it is simply dropped.
    UnmappedStream(String),
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::UnusedStream(name) => {
                write!(f, "stream '{name}' is declared but never consumed by a select")
            }
            Warning::UnmappedStream(name) => {
                write!(f, "stream '{name}' has no explicit or auto-mapped destination and was dropped")
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Diagnostics::default()
    }

    pub fn push(&mut self, warning: Warning) {
        log::warn!("{warning}");
        self.warnings.push(warning);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        for w in other.warnings {
            self.push(w);
        }
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }
}
