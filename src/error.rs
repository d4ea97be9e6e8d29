//! Error types surfaced by [`crate::grammar`] build validation, [`crate::lexer`]
//! tokenization and the revertible iterators in [`crate::iter`].
//!
//! Local match failure — the ordinary way combinators signal non-match up the
//! recursion — is *not* represented here. It is a plain `None`/`bool`, never
//! an `Err`; only the three fatal kinds below ever leave the engine as an
//! error.

use crate::lexer::Token;

/// Raised by [`crate::grammar::GrammarBuilder::build`] when the assembled
/// grammar violates one of the invariants in the grammar container contract.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GrammarError {
    /// A symbol was referenced (by name, import, or as start/skip/recovery)
    /// but no definition was ever bound for it.
    #[error("symbol `{0}` is referenced but never defined")]
    UndefinedSymbol(String),

    /// `build()` was called on a lexerless grammar with no start symbol set.
    #[error("grammar has no start symbol")]
    MissingStart,

    /// A lexer-symbol behavior references a mode name that was never
    /// declared via [`crate::grammar::GrammarBuilder::add_lexer_symbol`].
    #[error("lexer mode `{0}` is referenced by a token behavior but never declared")]
    UndefinedMode(String),

    /// [`crate::grammar::GrammarBuilder::import_from`] named a symbol that
    /// does not exist in the origin grammar.
    #[error("imported symbol `{name}` does not exist in its origin grammar")]
    UndefinedImport { name: String },

    /// A listener was registered for a name with no corresponding declared
    /// symbol.
    #[error("listener `{0}` does not correspond to any declared symbol")]
    UndefinedListener(String),

    /// Inverting a [`crate::symbol::SwitchData`] that already spans every
    /// `char` would produce a combinator that can never match.
    #[error("inversion of an all-inclusive character range matches nothing")]
    AllInclusiveInversion,

    /// A single-value grammar property (`start`, `skip`, `recovery`, ...) was
    /// set more than once.
    #[error("property `{0}` was set more than once")]
    Redefined(&'static str),
}

/// Raised by [`crate::lexer::tokenize`] when no lexer symbol in the current
/// mode matches and there is no usable recovery.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("no lexer symbol matched at offset {offset}")]
pub struct IllegalToken {
    /// Offset (in elements of the underlying source) where tokenization
    /// stalled.
    pub offset: usize,
    /// Every token produced before the stall.
    pub tokens_so_far: Vec<Token>,
}

/// Raised when a streaming source is accessed after it has been closed
/// (exhausted and explicitly released).
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("revertible iterator accessed after being closed")]
pub struct IteratorClosed;

/// The two fatal outcomes of a [`crate::lexer::tokenize`] run: either it
/// stalls on unrecognized input, or the grammar itself is defective (a
/// behavior popped the mode stack past empty, which is a grammar-build bug
/// that validation should have caught but didn't for a dynamically
/// constructed mode name).
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenizeError {
    #[error(transparent)]
    Illegal(#[from] IllegalToken),

    #[error("lexer mode stack underflow: cannot pop the default mode")]
    ModeStackUnderflow,
}
