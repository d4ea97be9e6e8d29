//! The symbol algebra (component C3): a closed sum type of grammar atoms and
//! combinators, arena-allocated and cross-referenced by index per the arena
//! representation adopted in `SPEC_FULL.md` §3.

use std::ops::RangeInclusive;

use crate::iter::RevertibleIter;
use crate::lexer::{ModeBehavior, Token};
use crate::switch::SwitchData;

/// An index into a [`crate::grammar::Grammar`]'s symbol arena.
///
/// `SymbolId` is `Copy` and carries no lifetime: the symbol graph can be
/// cyclic (forward/recursive named references) so nothing here borrows from
/// the arena itself. Cross-references are resolved by indexing back into
/// the owning grammar's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(pub(crate) u32);

impl SymbolId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// A lexer-scope fragment composed with an optional mode-stack behavior,
/// executed by the lexer driver (C5) after a successful match — never by
/// the generic parsing engine directly.
#[derive(Debug, Clone)]
pub(crate) struct LexerData {
    pub fragment: SymbolId,
    pub behavior: Option<ModeBehavior>,
}

/// One arena slot. `name` is set only for symbols created via
/// [`crate::grammar::GrammarBuilder::add_named`] (the `Named` variant);
/// every other variant leaves it `None`.
#[derive(Debug, Clone)]
pub(crate) struct SymbolDef {
    pub kind: SymbolKind,
}

#[derive(Debug, Clone)]
pub(crate) enum SymbolKind {
    Text(String),
    Switch(SwitchData),
    Option(SymbolId),
    Repetition(SymbolId),
    Junction(Vec<SymbolId>),
    Sequence(Vec<SymbolId>),
    Inversion(SymbolId),
    End,
    Lexer(LexerData),
    /// A named symbol: `(name, inner)`. Produces a node tagged with `name`
    /// whose children are `inner`'s children directly (not wrapped).
    Named(String, SymbolId),
    /// A by-name forward reference, resolved against the grammar's name
    /// table at match time. Lets grammars express cyclic recursion
    /// (`r = r | 'x'`) without a two-pass graph-patching step: the
    /// reference is created before the name it points to is bound via
    /// `add_named`, and resolution happens lazily during matching.
    Reference(String),
}

impl SymbolKind {
    /// Children referenced by this node, for validation traversal.
    pub(crate) fn children(&self) -> Vec<SymbolId> {
        match self {
            SymbolKind::Text(_)
            | SymbolKind::Switch(_)
            | SymbolKind::End
            | SymbolKind::Reference(_) => vec![],
            SymbolKind::Option(c) | SymbolKind::Repetition(c) | SymbolKind::Inversion(c) => {
                vec![*c]
            }
            SymbolKind::Junction(cs) | SymbolKind::Sequence(cs) => cs.clone(),
            SymbolKind::Lexer(data) => vec![data.fragment],
            SymbolKind::Named(_, inner) => vec![*inner],
        }
    }
}

/// Type alias kept for readability at builder call sites.
pub type CharRange = RangeInclusive<char>;

/// How a single input element participates in `Text`/`Switch` matching.
///
/// `spec.md` §4.5 runs the same symbol algebra over two kinds of input: raw
/// characters for a lexerless or lexer-stage grammar, and already-tokenized
/// [`Token`]s for a second-stage grammar over a lexer's output ("symbols
/// match tokens by name"). `Text("foo")` means "the next four characters
/// spell `foo`" over a `char` source, but "the next token is named `foo`"
/// over a `Token` source — this trait is where that distinction lives so
/// `MatchEngine`'s dispatch can stay generic over the element type.
pub(crate) trait Matchable: Clone {
    /// Attempts to consume `text` starting at the iterator's current
    /// position, leaving it just past the match on success and untouched
    /// (from the caller's perspective) on failure.
    fn match_text<I: RevertibleIter<Elem = Self>>(iter: &mut I, text: &str) -> bool;

    /// Attempts to consume one element satisfying `switch`.
    fn match_switch<I: RevertibleIter<Elem = Self>>(iter: &mut I, switch: &SwitchData) -> bool;
}

impl Matchable for char {
    fn match_text<I: RevertibleIter<Elem = char>>(iter: &mut I, text: &str) -> bool {
        for expected in text.chars() {
            match iter.next() {
                Some(actual) if actual == expected => continue,
                _ => return false,
            }
        }
        true
    }

    fn match_switch<I: RevertibleIter<Elem = char>>(iter: &mut I, switch: &SwitchData) -> bool {
        match iter.peek() {
            Some(c) if switch.matches(c) => {
                iter.next();
                true
            }
            _ => false,
        }
    }
}

impl Matchable for Token {
    fn match_text<I: RevertibleIter<Elem = Token>>(iter: &mut I, text: &str) -> bool {
        match iter.peek() {
            Some(tok) if tok.name.as_deref() == Some(text) => {
                iter.next();
                true
            }
            _ => false,
        }
    }

    /// `Switch` is meaningless over an already-tokenized stream — character
    /// ranges have no bearing on a whole token — so it never matches.
    /// Grammars built for a token-stage parser should not use `Switch`.
    fn match_switch<I: RevertibleIter<Elem = Token>>(_iter: &mut I, _switch: &SwitchData) -> bool {
        false
    }
}
