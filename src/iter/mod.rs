//! The revertible / pivoting input iterator (component C1 of the design).
//!
//! `RevertibleIter` is the one contract the match engine (C4) consumes; it
//! is implemented for in-memory character slices, in-memory element lists
//! (used for the token stream of a lexer-parser) and chunked streaming byte
//! sources. Positions are comparable values (`Self::Pos: Ord`) so the pivot
//! map (C2) can key on them directly.

mod elem;
mod slice;
mod stream;

pub use elem::ElemIter;
pub use slice::SliceIter;
pub use stream::StreamIter;

/// A position-savable, peekable stream consumed by the match engine.
///
/// Implementations provide `peek`/`next`/`position`/`seek`/`has_next` and
/// `substring`; `save`, `revert`, `remove_save` and `advance` are derived
/// from those in terms of an internal save stack (`saves_mut`).
///
/// `seek` and `substring` go beyond the abstract contract in `spec.md` §4.1,
/// which only promises `save`/`revert` for backtracking. They are the
/// concrete primitive the match engine needs to jump straight to a
/// memoized node's end position (rather than replaying `next()` calls) and
/// to recover the exact matched text for a node. Every position ever
/// produced by `position()` remains valid to `seek` to for the lifetime of
/// the iterator, which is what makes packrat memoization sound.
pub trait RevertibleIter {
    /// The element type yielded by this source (`char` for text sources,
    /// [`crate::lexer::Token`] for a lexer-parser's token stream).
    type Elem: Clone;

    /// A totally-ordered, `Copy`able position value.
    type Pos: Copy + Ord + std::fmt::Debug;

    /// Returns the current element without consuming it.
    fn peek(&mut self) -> Option<Self::Elem>;

    /// Returns the current element and advances past it.
    fn next(&mut self) -> Option<Self::Elem>;

    /// The position of the element that would be returned by `peek`/`next`.
    fn position(&self) -> Self::Pos;

    /// Jumps directly to a previously observed position.
    fn seek(&mut self, pos: Self::Pos);

    /// Whether there is a further element to read. May trigger chunk loading
    /// for streaming sources.
    fn has_next(&mut self) -> bool;

    /// The exact source text between two positions obtained from this
    /// iterator, `start <= end`. Used to build a node's matched substring
    /// and to render recovered/unnamed lexer tokens.
    fn substring(&self, start: Self::Pos, end: Self::Pos) -> String;

    /// A lossy `usize` offset for diagnostics (`IllegalToken::offset` and
    /// friends). Not used by matching semantics.
    fn offset(&self) -> usize;

    /// Mutable access to the save stack backing `save`/`revert`/`remove_save`.
    fn saves_mut(&mut self) -> &mut Vec<Self::Pos>;

    /// Pushes the current position. May be called when exhausted.
    fn save(&mut self) {
        let pos = self.position();
        self.saves_mut().push(pos);
    }

    /// Pops the most recent save and restores the iterator to it.
    ///
    /// # Panics
    /// Panics if no save is pending — this is an engine-internal invariant
    /// (every `save` the match engine issues is matched by exactly one
    /// `revert` or `remove_save`), not a condition grammars can trigger.
    fn revert(&mut self) {
        let pos = self
            .saves_mut()
            .pop()
            .expect("revert() called with no matching save()");
        self.seek(pos);
    }

    /// Pops the most recent save without restoring position.
    ///
    /// # Panics
    /// See `revert`.
    fn remove_save(&mut self) {
        self.saves_mut()
            .pop()
            .expect("remove_save() called with no matching save()");
    }

    /// Advances by `n` elements, stopping early at exhaustion.
    fn advance(&mut self, n: usize) {
        for _ in 0..n {
            if self.next().is_none() {
                break;
            }
        }
    }
}

/// A `&mut I` is itself a `RevertibleIter`, forwarding every call through to
/// `I`. This is what lets [`crate::Grammar::parse_stream_with`] hand the
/// match engine a *borrowed* iterator instead of a fresh, owned one — the
/// caller keeps the iterator (and can `close`/inspect it) across calls.
impl<I: RevertibleIter + ?Sized> RevertibleIter for &mut I {
    type Elem = I::Elem;
    type Pos = I::Pos;

    fn peek(&mut self) -> Option<Self::Elem> {
        (**self).peek()
    }

    fn next(&mut self) -> Option<Self::Elem> {
        (**self).next()
    }

    fn position(&self) -> Self::Pos {
        (**self).position()
    }

    fn seek(&mut self, pos: Self::Pos) {
        (**self).seek(pos)
    }

    fn has_next(&mut self) -> bool {
        (**self).has_next()
    }

    fn substring(&self, start: Self::Pos, end: Self::Pos) -> String {
        (**self).substring(start, end)
    }

    fn offset(&self) -> usize {
        (**self).offset()
    }

    fn saves_mut(&mut self) -> &mut Vec<Self::Pos> {
        (**self).saves_mut()
    }
}
