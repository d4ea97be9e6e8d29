//! Character-range sets for the `Switch` symbol variant (component C3).
//!
//! A `Switch` is built from an arbitrary list of `RangeInclusive<char>`
//! supplied by the grammar builder. `spec.md` §4.3 requires the ranges to be
//! "sorted, merged, and may be inverted" before matching; we normalize once,
//! at `Grammar::build()` time, rather than per match.

use std::ops::RangeInclusive;

/// Lower bound of the UTF-16 surrogate gap. `char` can never hold a value in
/// `0xD800..=0xDFFF`, so that gap is never a "hole" in an otherwise-full
/// range for the purposes of the all-inclusive check below.
const SURROGATE_START: u32 = 0xD800;
const SURROGATE_END: u32 = 0xDFFF;

/// The smallest `char` strictly greater than `c`, skipping the surrogate
/// gap. Returns `None` for `char::MAX`.
fn next_char(c: char) -> Option<char> {
    let next = c as u32 + 1;
    let next = if next == SURROGATE_START {
        SURROGATE_END + 1
    } else {
        next
    };
    char::from_u32(next)
}

/// A normalized, possibly-inverted set of character ranges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SwitchData {
    /// Sorted, non-overlapping, non-adjacent ranges (pre-inversion).
    ranges: Vec<RangeInclusive<char>>,
    invert: bool,
}

impl SwitchData {
    pub(crate) fn new(mut ranges: Vec<RangeInclusive<char>>, invert: bool) -> Self {
        ranges.sort_by_key(|r| *r.start());
        let mut merged: Vec<RangeInclusive<char>> = Vec::with_capacity(ranges.len());
        for r in ranges {
            if let Some(last) = merged.last_mut() {
                if *r.start() <= *last.end()
                    || Some(*r.start()) == next_char(*last.end())
                {
                    if r.end() > last.end() {
                        *last = *last.start()..=*r.end();
                    }
                    continue;
                }
            }
            merged.push(r);
        }
        Self {
            ranges: merged,
            invert,
        }
    }

    pub(crate) fn matches(&self, c: char) -> bool {
        let hit = self.ranges.iter().any(|r| r.contains(&c));
        hit != self.invert
    }

    /// True iff this switch's *pre-inversion* range list already spans every
    /// `char`, which would make an inverted switch match nothing.
    pub(crate) fn is_source_all_inclusive(&self) -> bool {
        let mut cursor = '\u{0}';
        for r in &self.ranges {
            if *r.start() > cursor {
                return false;
            }
            if *r.end() >= char::MAX {
                return true;
            }
            match next_char(*r.end()) {
                Some(next) => cursor = next,
                None => return true,
            }
        }
        false
    }

    pub(crate) fn invert(&self) -> bool {
        self.invert
    }

    pub(crate) fn ranges(&self) -> &[RangeInclusive<char>] {
        &self.ranges
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merges_overlapping_and_adjacent() {
        let sw = SwitchData::new(vec!['a'..='c', 'b'..='e', 'g'..='h'], false);
        assert_eq!(sw.ranges(), &['a'..='e', 'g'..='h']);
    }

    #[test]
    fn matches_respects_invert() {
        let sw = SwitchData::new(vec!['0'..='9'], false);
        assert!(sw.matches('5'));
        assert!(!sw.matches('a'));

        let inv = SwitchData::new(vec!['0'..='9'], true);
        assert!(!inv.matches('5'));
        assert!(inv.matches('a'));
    }

    #[test]
    fn detects_all_inclusive_source() {
        let sw = SwitchData::new(vec!['\u{0}'..=char::MAX], false);
        assert!(sw.is_source_all_inclusive());

        let partial = SwitchData::new(vec!['\u{0}'..='\u{10FFFE}'], false);
        assert!(!partial.is_source_all_inclusive());
    }

    #[test]
    fn all_inclusive_ignores_surrogate_gap() {
        let sw = SwitchData::new(vec!['\u{0}'..='\u{D7FF}', '\u{E000}'..=char::MAX], false);
        assert!(sw.is_source_all_inclusive());
    }
}
