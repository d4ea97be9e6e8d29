use std::fmt;

/// A `LimitTracker` enforces a recursion depth bound within the match
/// engine. It keeps track of utilization so implementations can report how
/// close to the limit a parse got.
///
/// This is ambient robustness, not a grammar-correctness feature: a
/// pathological grammar (e.g. deeply right-nested `Sequence`s) would
/// otherwise overflow the native call stack. `thicket-core` carries a guard
/// the way the teacher does, with the same high-water-mark bookkeeping.
#[derive(PartialEq, Eq, Clone, Copy)]
pub struct LimitTracker {
    current: usize,
    /// High-water mark for this limit.
    pub high: usize,
    /// The configured limit.
    pub limit: usize,
}

impl Default for LimitTracker {
    fn default() -> Self {
        Self {
            current: 0,
            high: 0,
            limit: 4_096,
        }
    }
}

impl LimitTracker {
    pub fn new(limit: usize) -> Self {
        Self {
            current: 0,
            high: 0,
            limit,
        }
    }

    pub fn limited(&self) -> bool {
        self.current > self.limit
    }

    pub fn consume(&mut self) {
        self.current += 1;
        if self.current > self.high {
            self.high = self.current;
        }
    }

    pub fn release(&mut self) {
        self.current = self.current.saturating_sub(1);
    }
}

impl fmt::Debug for LimitTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "recursion limit: {}, high: {}", self.limit, self.high)
    }
}
