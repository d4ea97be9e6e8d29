//! The grammar container (component C7): an arena of symbols plus the
//! auxiliary tables (`start`/`skip`/`recovery`, lexer modes, listeners) that
//! the match engine (C4) and lexer driver (C5) read at parse time.
//!
//! A [`Grammar`] is assembled through [`GrammarBuilder`] and is immutable and
//! `Send + Sync` once [`GrammarBuilder::build`] succeeds, so one grammar can
//! back any number of concurrent parses (`spec.md` §5).

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::ast::Listener;
use crate::error::GrammarError;
use crate::lexer::ModeBehavior;
use crate::limit::LimitTracker;
use crate::switch::SwitchData;
use crate::symbol::{CharRange, LexerData, SymbolDef, SymbolId, SymbolKind};

/// An assembled, validated grammar. Cheap to clone-by-reference (callers hold
/// `&Grammar` for the lifetime of a parse); the arena itself is never mutated
/// after `build()`.
#[derive(Debug)]
pub struct Grammar {
    arena: Vec<SymbolDef>,
    names: IndexMap<String, SymbolId>,
    start: Option<SymbolId>,
    skip: Option<SymbolId>,
    skip_tokens: HashSet<SymbolId>,
    recovery: Option<SymbolId>,
    lexer_modes: IndexMap<String, Vec<SymbolId>>,
    listeners: IndexMap<String, Listener>,
    recursion_limit: usize,
}

impl Grammar {
    /// Starts assembling a new grammar.
    pub fn builder() -> GrammarBuilder {
        GrammarBuilder::new()
    }

    /// The symbol to begin a lexerless parse at, if one was set.
    pub fn start(&self) -> Option<SymbolId> {
        self.start
    }

    pub(crate) fn symbol_kind(&self, id: SymbolId) -> &SymbolKind {
        &self.arena[id.index()].kind
    }

    pub(crate) fn resolve_name(&self, name: &str) -> Option<SymbolId> {
        self.names.get(name).copied()
    }

    pub(crate) fn recursion_limit(&self) -> usize {
        self.recursion_limit
    }

    pub(crate) fn skip_symbol(&self) -> Option<SymbolId> {
        self.skip
    }

    pub(crate) fn lexer_mode(&self, mode: &str) -> Option<&[SymbolId]> {
        self.lexer_modes.get(mode).map(Vec::as_slice)
    }

    pub(crate) fn recovery(&self) -> Option<SymbolId> {
        self.recovery
    }

    /// Whether a lexer symbol's output should be discarded from the token
    /// stream rather than emitted (`spec.md` §4.5's skip list — distinct
    /// from [`Self::skip_symbol`], which is the match engine's in-band
    /// whitespace-between-symbols skip).
    pub(crate) fn is_skip_token(&self, id: SymbolId) -> bool {
        self.skip_tokens.contains(&id)
    }

    /// The mode-stack behavior a matched lexer symbol should run, looked up
    /// through any `Named` wrapper (a token can be both named, for listener
    /// dispatch, and carry a push/pop/set behavior).
    pub(crate) fn lexer_behavior(&self, id: SymbolId) -> Option<&ModeBehavior> {
        match &self.arena[id.index()].kind {
            SymbolKind::Lexer(data) => data.behavior.as_ref(),
            SymbolKind::Named(_, inner) => self.lexer_behavior(*inner),
            _ => None,
        }
    }

    pub(crate) fn listener(&self, name: &str) -> Option<&Listener> {
        self.listeners.get(name)
    }
}

/// The mutable assembly half of [`Grammar`]: every constructor method
/// appends one slot to the arena and returns its [`SymbolId`]. Combinators
/// take their children by `SymbolId`, so a grammar graph — including cycles
/// introduced via [`Self::reference`] — is built up bottom-up or top-down
/// freely; `build()` is the only point at which the graph is validated.
pub struct GrammarBuilder {
    arena: Vec<SymbolDef>,
    names: IndexMap<String, SymbolId>,
    start: Option<SymbolId>,
    skip: Option<SymbolId>,
    skip_tokens: HashSet<SymbolId>,
    recovery: Option<SymbolId>,
    lexer_modes: IndexMap<String, Vec<SymbolId>>,
    listeners: IndexMap<String, Listener>,
    recursion_limit: usize,
}

impl Default for GrammarBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GrammarBuilder {
    pub fn new() -> Self {
        Self {
            arena: Vec::new(),
            names: IndexMap::new(),
            start: None,
            skip: None,
            skip_tokens: HashSet::new(),
            recovery: None,
            lexer_modes: IndexMap::new(),
            listeners: IndexMap::new(),
            recursion_limit: LimitTracker::default().limit,
        }
    }

    fn push(&mut self, kind: SymbolKind) -> SymbolId {
        self.arena.push(SymbolDef { kind });
        SymbolId((self.arena.len() - 1) as u32)
    }

    /// A literal text match (`spec.md` §4.3 `Text`).
    pub fn text(&mut self, literal: impl Into<String>) -> SymbolId {
        self.push(SymbolKind::Text(literal.into()))
    }

    /// A single-character range set, normalized at construction time
    /// (`spec.md` §4.3 `Switch`).
    pub fn switch(&mut self, ranges: Vec<CharRange>, invert: bool) -> SymbolId {
        self.push(SymbolKind::Switch(SwitchData::new(ranges, invert)))
    }

    /// `inner?` — always succeeds; records whether `inner` matched.
    pub fn option(&mut self, inner: SymbolId) -> SymbolId {
        self.push(SymbolKind::Option(inner))
    }

    /// `inner+` — one or more matches of `inner`.
    pub fn repetition(&mut self, inner: SymbolId) -> SymbolId {
        self.push(SymbolKind::Repetition(inner))
    }

    /// Ordered alternation: the first alternative that matches wins.
    pub fn junction(&mut self, alternatives: Vec<SymbolId>) -> SymbolId {
        self.push(SymbolKind::Junction(alternatives))
    }

    /// An ordered, all-must-match concatenation.
    pub fn sequence(&mut self, parts: Vec<SymbolId>) -> SymbolId {
        self.push(SymbolKind::Sequence(parts))
    }

    /// `!inner` — consumes exactly one element if `inner` does not match at
    /// the current position, fails if it does.
    pub fn inversion(&mut self, inner: SymbolId) -> SymbolId {
        self.push(SymbolKind::Inversion(inner))
    }

    /// Matches only at end of input.
    pub fn end(&mut self) -> SymbolId {
        self.push(SymbolKind::End)
    }

    /// A lazily-resolved by-name reference, for cyclic/recursive grammars
    /// (`r = r | 'x'`) where the target isn't bound yet at the call site.
    pub fn reference(&mut self, name: impl Into<String>) -> SymbolId {
        self.push(SymbolKind::Reference(name.into()))
    }

    /// A lexer-scope fragment plus an optional mode-stack behavior, run by
    /// the lexer driver (`spec.md` §4.5) after a winning match. Never
    /// consumed directly by the generic match engine outside the lexer.
    pub fn lexer_symbol(&mut self, fragment: SymbolId, behavior: Option<ModeBehavior>) -> SymbolId {
        self.push(SymbolKind::Lexer(LexerData { fragment, behavior }))
    }

    /// Binds `name` to a new `Named(name, inner)` wrapper and registers it in
    /// the grammar's name table, so [`Self::reference`] and
    /// [`Self::add_listener`] can target it.
    pub fn add_named(&mut self, name: impl Into<String>, inner: SymbolId) -> SymbolId {
        let name = name.into();
        let id = self.push(SymbolKind::Named(name.clone(), inner));
        self.names.insert(name, id);
        id
    }

    /// Sets the symbol a lexerless parse starts matching at. May be called
    /// at most once.
    pub fn set_start(&mut self, id: SymbolId) -> Result<(), GrammarError> {
        if self.start.is_some() {
            return Err(GrammarError::Redefined("start"));
        }
        self.start = Some(id);
        Ok(())
    }

    /// Sets the symbol the match engine attempts once before every other
    /// symbol match (`spec.md` §4.4 step 4), typically whitespace/comments.
    /// May be called at most once.
    pub fn set_skip(&mut self, id: SymbolId) -> Result<(), GrammarError> {
        if self.skip.is_some() {
            return Err(GrammarError::Redefined("skip"));
        }
        self.skip = Some(id);
        Ok(())
    }

    /// Sets the fallback fragment the lexer driver repeats at a stall point
    /// (`spec.md` §4.5 step 4). May be called at most once.
    pub fn set_recovery(&mut self, id: SymbolId) -> Result<(), GrammarError> {
        if self.recovery.is_some() {
            return Err(GrammarError::Redefined("recovery"));
        }
        self.recovery = Some(id);
        Ok(())
    }

    /// Declares `sym` as one of the lexer symbols tried, in order, while
    /// `mode` is active.
    pub fn add_lexer_symbol(&mut self, mode: impl Into<String>, sym: SymbolId) {
        self.lexer_modes.entry(mode.into()).or_default().push(sym);
    }

    /// Marks `sym` as a token the lexer discards from its output rather than
    /// emitting (whitespace, comments).
    pub fn add_skip_token(&mut self, sym: SymbolId) {
        self.skip_tokens.insert(sym);
    }

    /// Registers a listener for the named symbol. Registering a second
    /// listener for the same name composes the two, per `SPEC_FULL.md` §8's
    /// listener extension order: the one already present runs first.
    pub fn add_listener(&mut self, name: impl Into<String>, listener: Listener) {
        let name = name.into();
        match (self.listeners.remove(&name), listener) {
            (None, new) => {
                self.listeners.insert(name, new);
            }
            (Some(Listener::Nullary(first)), Listener::Nullary(second)) => {
                self.listeners.insert(
                    name,
                    Listener::Nullary(triomphe::Arc::new(move |node| {
                        first(node);
                        second(node);
                    })),
                );
            }
            (Some(Listener::Unary(first)), Listener::Unary(second)) => {
                self.listeners.insert(
                    name,
                    Listener::Unary(triomphe::Arc::new(move |arg, node| {
                        first(arg, node);
                        second(arg, node);
                    })),
                );
            }
            (Some(existing), _) => {
                // A nullary/unary mismatch on the same name is a build-time
                // grammar-authoring mistake, not a runtime condition; keep
                // the first registration and drop the conflicting one.
                log::warn!("listener for `{name}` re-registered with a different arity, ignoring the second");
                self.listeners.insert(name, existing);
            }
        }
    }

    /// Overrides the recursion-depth guard's limit (default 4096, ported
    /// from the teacher's `limit.rs`).
    pub fn set_recursion_limit(&mut self, limit: usize) {
        self.recursion_limit = limit;
    }

    /// Copies the subtree reachable from `name` in `origin` into this
    /// builder's arena, returning the corresponding local `SymbolId`. Shared
    /// substructure (the same origin id reached two ways) is copied once.
    pub fn import_from(&mut self, origin: &Grammar, name: &str) -> Result<SymbolId, GrammarError> {
        let origin_id = origin
            .resolve_name(name)
            .ok_or_else(|| GrammarError::UndefinedImport {
                name: name.to_string(),
            })?;
        let mut copied = IndexMap::new();
        Ok(self.copy_from(origin, origin_id, &mut copied))
    }

    fn copy_from(
        &mut self,
        origin: &Grammar,
        id: SymbolId,
        copied: &mut IndexMap<SymbolId, SymbolId>,
    ) -> SymbolId {
        if let Some(&existing) = copied.get(&id) {
            return existing;
        }
        let kind = match origin.symbol_kind(id).clone() {
            SymbolKind::Text(s) => SymbolKind::Text(s),
            SymbolKind::Switch(s) => SymbolKind::Switch(s),
            SymbolKind::End => SymbolKind::End,
            SymbolKind::Reference(name) => SymbolKind::Reference(name),
            SymbolKind::Option(c) => {
                SymbolKind::Option(self.copy_from(origin, c, copied))
            }
            SymbolKind::Repetition(c) => {
                SymbolKind::Repetition(self.copy_from(origin, c, copied))
            }
            SymbolKind::Inversion(c) => {
                SymbolKind::Inversion(self.copy_from(origin, c, copied))
            }
            SymbolKind::Junction(cs) => SymbolKind::Junction(
                cs.into_iter().map(|c| self.copy_from(origin, c, copied)).collect(),
            ),
            SymbolKind::Sequence(cs) => SymbolKind::Sequence(
                cs.into_iter().map(|c| self.copy_from(origin, c, copied)).collect(),
            ),
            SymbolKind::Lexer(data) => SymbolKind::Lexer(LexerData {
                fragment: self.copy_from(origin, data.fragment, copied),
                behavior: data.behavior,
            }),
            SymbolKind::Named(name, inner) => {
                SymbolKind::Named(name, self.copy_from(origin, inner, copied))
            }
        };
        let new_id = self.push(kind);
        copied.insert(id, new_id);
        if let SymbolKind::Named(name, _) = &self.arena[new_id.index()].kind {
            self.names.insert(name.clone(), new_id);
        }
        new_id
    }

    /// Resolves `id` through any chain of `Named`/`Reference` wrappers to the
    /// underlying `Switch`, if matching one grounds out the chain. Used by
    /// `build()`'s all-inclusive-inversion check, since `Inversion(named(sw))`
    /// and `Inversion(reference("sw"))` are exactly as malformed as
    /// `Inversion(sw)` directly — the wrapper doesn't change what the
    /// inversion matches, only how a listener looks the node up.
    ///
    /// `seen` guards against a cyclic `Reference` chain (`r = r`), the same
    /// way the match engine's `calling` set does at parse time: a name
    /// already on the path means the chain never reaches a concrete symbol,
    /// so it isn't a `Switch` for this check's purposes.
    fn resolve_switch<'a>(
        &'a self,
        id: SymbolId,
        seen: &mut HashSet<SymbolId>,
    ) -> Option<&'a SwitchData> {
        if !seen.insert(id) {
            return None;
        }
        match &self.arena[id.index()].kind {
            SymbolKind::Switch(switch) => Some(switch),
            SymbolKind::Named(_, inner) => self.resolve_switch(*inner, seen),
            SymbolKind::Reference(name) => {
                let target = *self.names.get(name)?;
                self.resolve_switch(target, seen)
            }
            _ => None,
        }
    }

    /// Validates and freezes the grammar. Every undefined-reference,
    /// undefined-mode, undefined-listener, redefinition and all-inclusive
    /// inversion described in `spec.md` §4.7 is checked here.
    pub fn build(self) -> Result<Grammar, GrammarError> {
        if self.lexer_modes.is_empty() && self.start.is_none() {
            return Err(GrammarError::MissingStart);
        }

        for def in &self.arena {
            if let SymbolKind::Reference(name) = &def.kind {
                if !self.names.contains_key(name) {
                    return Err(GrammarError::UndefinedSymbol(name.clone()));
                }
            }
            if let SymbolKind::Inversion(child) = &def.kind {
                if let Some(switch) = self.resolve_switch(*child, &mut HashSet::new()) {
                    if switch.is_source_all_inclusive() {
                        return Err(GrammarError::AllInclusiveInversion);
                    }
                }
            }
        }

        for def in &self.arena {
            if let SymbolKind::Lexer(data) = &def.kind {
                if let Some(behavior) = &data.behavior {
                    let target = match behavior {
                        ModeBehavior::Push(m) | ModeBehavior::Set(m) => Some(m),
                        ModeBehavior::Pop => None,
                    };
                    if let Some(mode) = target {
                        if !self.lexer_modes.contains_key(mode) {
                            return Err(GrammarError::UndefinedMode(mode.clone()));
                        }
                    }
                }
            }
        }

        for name in self.listeners.keys() {
            if !self.names.contains_key(name) {
                return Err(GrammarError::UndefinedListener(name.clone()));
            }
        }

        Ok(Grammar {
            arena: self.arena,
            names: self.names,
            start: self.start,
            skip: self.skip,
            skip_tokens: self.skip_tokens,
            recovery: self.recovery,
            lexer_modes: self.lexer_modes,
            listeners: self.listeners,
            recursion_limit: self.recursion_limit,
        })
    }
}
