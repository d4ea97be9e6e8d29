//! The match engine (component C4): recursive-descent driver, skip handling,
//! packrat memoization and backtracking over the symbol algebra (`spec.md`
//! §4.4). Consumed directly by `Grammar::parse*` and by the lexer driver
//! (C5), which runs one engine per candidate lexer symbol at each offset.

use crate::ast::{NodeMeta, SyntaxTreeNode};
use crate::grammar::Grammar;
use crate::iter::RevertibleIter;
use crate::limit::LimitTracker;
use crate::pivot::PivotMap;
use crate::symbol::{Matchable, SymbolId, SymbolKind};

/// One parse (or one lexer-symbol attempt)'s mutable state: the iterator, the
/// packrat memoization map keyed by position, the currently-active skip
/// symbol, and a recursion-depth guard.
pub(crate) struct MatchEngine<'g, I: RevertibleIter> {
    grammar: &'g Grammar,
    iter: I,
    pivots: PivotMap<I::Pos>,
    skip: Option<SymbolId>,
    limit: LimitTracker,
}

impl<'g, I: RevertibleIter> MatchEngine<'g, I>
where
    I::Elem: Matchable,
{
    pub(crate) fn new(grammar: &'g Grammar, iter: I, skip: Option<SymbolId>) -> Self {
        Self {
            grammar,
            iter,
            pivots: PivotMap::new(),
            skip,
            limit: LimitTracker::new(grammar.recursion_limit()),
        }
    }

    /// Whether the iterator consumed the entire input. Used by callers that
    /// want to require full consumption without the grammar declaring an
    /// explicit `End` (`spec.md` §10 Open Question #2 leaves this to the
    /// caller either way).
    pub(crate) fn at_end(&mut self) -> bool {
        !self.iter.has_next()
    }

    /// Matches `id` at the current position, implementing `spec.md` §4.4's
    /// six-step algorithm. Returns `None` on local match failure — never an
    /// error; the three fatal error kinds never originate here.
    pub(crate) fn match_symbol(&mut self, id: SymbolId) -> Option<SyntaxTreeNode> {
        if self.limit.limited() {
            log::warn!("recursion limit reached while matching symbol {id:?}");
            return None;
        }
        self.limit.consume();
        let result = self.match_symbol_inner(id);
        self.limit.release();
        result
    }

    fn match_symbol_inner(&mut self, id: SymbolId) -> Option<SyntaxTreeNode> {
        // Step 1: save position.
        let start = self.iter.position();

        // Step 2: packrat lookup at the pre-skip position.
        let pivot = self.pivots.find_or_insert(start);
        if pivot.fails.contains(&id) {
            return None;
        }
        if let Some((end, node)) = pivot.successes.get(&id).cloned() {
            self.iter.seek(end);
            return Some(node);
        }
        if pivot.calling.contains(&id) {
            return None;
        }

        // Step 3: cycle guard.
        self.pivots.find_or_insert(start).calling.insert(id);

        // Step 4: attempt skip, with skip disabled for its own nested match.
        if let Some(skip_id) = self.skip {
            if skip_id != id {
                let saved_skip = self.skip.take();
                self.match_symbol(skip_id);
                self.skip = saved_skip;
            }
        }

        // Step 5: dispatch on variant.
        let outcome = self.dispatch(id);

        // Step 6: memoize and clean up.
        self.pivots.find_or_insert(start).calling.remove(&id);
        match outcome {
            Some((substring, children, meta, name)) => {
                let end = self.iter.position();
                let node = SyntaxTreeNode {
                    symbol: id,
                    name,
                    substring,
                    children,
                    meta,
                };
                self.pivots
                    .find_or_insert(start)
                    .successes
                    .insert(id, (end, node.clone()));
                log::trace!("matched {id:?} at {start:?}..{end:?}");
                Some(node)
            }
            None => {
                self.iter.seek(start);
                self.pivots.find_or_insert(start).fails.insert(id);
                log::trace!("failed {id:?} at {start:?}");
                None
            }
        }
    }

    /// Runs the variant-specific body. Returns the matched substring, its
    /// children, variant metadata, and a name on success — only `Named`
    /// introduces a name; `Reference` and `Lexer` forward whatever name
    /// their delegate produced (so a reference to a named symbol still
    /// dispatches to that name's listener), and every other variant
    /// produces `None`.
    #[allow(clippy::type_complexity)]
    fn dispatch(&mut self, id: SymbolId) -> Outcome {
        let start = self.iter.position();
        let kind = self.grammar.symbol_kind(id).clone();
        match kind {
            SymbolKind::Text(text) => self.match_text(&text),
            SymbolKind::Switch(switch) => {
                if I::Elem::match_switch(&mut self.iter, &switch) {
                    let end = self.iter.position();
                    Some((
                        self.iter.substring(start, end),
                        Vec::new(),
                        NodeMeta::None,
                        None,
                    ))
                } else {
                    None
                }
            }
            SymbolKind::Option(child) => {
                let before = self.iter.position();
                match self.match_symbol(child) {
                    Some(node) => {
                        let end = self.iter.position();
                        Some((
                            self.iter.substring(before, end),
                            vec![node],
                            NodeMeta::Option { matched: true },
                            None,
                        ))
                    }
                    None => Some((
                        String::new(),
                        Vec::new(),
                        NodeMeta::Option { matched: false },
                        None,
                    )),
                }
            }
            SymbolKind::Repetition(child) => self.match_repetition(child),
            SymbolKind::Sequence(children) => self.match_sequence(&children),
            SymbolKind::Junction(children) => self.match_junction(&children),
            SymbolKind::Inversion(child) => self.match_inversion(child),
            SymbolKind::End => {
                if self.iter.has_next() {
                    None
                } else {
                    Some((String::new(), Vec::new(), NodeMeta::None, None))
                }
            }
            SymbolKind::Lexer(data) => {
                let node = self.match_symbol(data.fragment)?;
                let end = self.iter.position();
                Some((
                    self.iter.substring(start, end),
                    node.children,
                    NodeMeta::None,
                    node.name,
                ))
            }
            SymbolKind::Named(name, inner) => {
                let node = self.match_symbol(inner)?;
                Some((node.substring, node.children, node.meta, Some(name)))
            }
            SymbolKind::Reference(name) => {
                let target = self.grammar.resolve_name(&name).unwrap_or_else(|| {
                    panic!("reference to `{name}` unresolved — not caught at build()")
                });
                let node = self.match_symbol(target)?;
                Some((node.substring, node.children, node.meta, node.name))
            }
        }
    }

    fn match_text(&mut self, text: &str) -> Outcome {
        let start = self.iter.position();
        if !I::Elem::match_text(&mut self.iter, text) {
            self.iter.seek(start);
            return None;
        }
        let end = self.iter.position();
        Some((
            self.iter.substring(start, end),
            Vec::new(),
            NodeMeta::None,
            None,
        ))
    }

    fn match_repetition(&mut self, child: SymbolId) -> Outcome {
        let start = self.iter.position();
        let mut children = Vec::new();
        loop {
            let before = self.iter.position();
            match self.match_symbol(child) {
                Some(node) => {
                    let after = self.iter.position();
                    if after == before {
                        // Zero-consumption iteration: the Design Notes
                        // resolution treats this as a stop condition rather
                        // than diverging (`spec.md` §9).
                        break;
                    }
                    children.push(node);
                }
                None => break,
            }
        }
        if children.is_empty() {
            None
        } else {
            let end = self.iter.position();
            Some((
                self.iter.substring(start, end),
                children,
                NodeMeta::None,
                None,
            ))
        }
    }

    fn match_sequence(&mut self, children: &[SymbolId]) -> Outcome {
        let start = self.iter.position();
        let mut nodes = Vec::with_capacity(children.len());
        for &child in children {
            nodes.push(self.match_symbol(child)?);
        }
        let end = self.iter.position();
        Some((
            self.iter.substring(start, end),
            nodes,
            NodeMeta::None,
            None,
        ))
    }

    fn match_junction(&mut self, children: &[SymbolId]) -> Outcome {
        let start = self.iter.position();
        for (ordinal, &child) in children.iter().enumerate() {
            if let Some(node) = self.match_symbol(child) {
                let end = self.iter.position();
                return Some((
                    self.iter.substring(start, end),
                    vec![node],
                    NodeMeta::Junction { ordinal },
                    None,
                ));
            }
        }
        None
    }

    fn match_inversion(&mut self, child: SymbolId) -> Outcome {
        let start = self.iter.position();
        if self.match_symbol(child).is_some() {
            self.iter.seek(start);
            return None;
        }
        self.iter.seek(start);
        self.iter.next()?;
        let end = self.iter.position();
        Some((
            self.iter.substring(start, end),
            Vec::new(),
            NodeMeta::None,
            None,
        ))
    }
}

/// `(substring, children, variant metadata, name)` produced by a variant's
/// match body on success.
type Outcome = Option<(String, Vec<SyntaxTreeNode>, NodeMeta, Option<String>)>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::Grammar;
    use crate::iter::SliceIter;

    #[test]
    fn sequence_backtracks_on_inner_failure() {
        let mut b = Grammar::builder();
        let a = b.text("a");
        let c = b.text("c");
        let seq = b.sequence(vec![a, c]);
        b.set_start(seq).unwrap();
        let grammar = b.build().unwrap();

        let mut engine = MatchEngine::new(&grammar, SliceIter::new("ab"), None);
        let result = engine.match_symbol(seq);
        assert!(result.is_none());
        assert_eq!(engine.iter.position(), 0);
    }

    #[test]
    fn junction_records_first_winning_ordinal() {
        let mut b = Grammar::builder();
        let foo = b.text("foo");
        let foobar = b.text("foobar");
        let foo2 = b.text("foo");
        let j = b.junction(vec![foo, foobar, foo2]);
        b.set_start(j).unwrap();
        let grammar = b.build().unwrap();

        let mut engine = MatchEngine::new(&grammar, SliceIter::new("foobar"), None);
        let node = engine.match_symbol(j).unwrap();
        assert_eq!(node.match_ordinal(), Some(0));
        assert_eq!(node.substring(), "foo");
    }

    #[test]
    fn repetition_requires_at_least_one_match() {
        let mut b = Grammar::builder();
        let digit = b.switch(vec!['0'..='9'], false);
        let digits = b.repetition(digit);
        b.set_start(digits).unwrap();
        let grammar = b.build().unwrap();

        let mut engine = MatchEngine::new(&grammar, SliceIter::new(""), None);
        assert!(engine.match_symbol(digits).is_none());

        let mut engine = MatchEngine::new(&grammar, SliceIter::new("123"), None);
        let node = engine.match_symbol(digits).unwrap();
        assert_eq!(node.substring(), "123");
        assert_eq!(node.children().len(), 3);
    }

    #[test]
    fn cycle_guard_falls_through_to_alternative() {
        // r = r | 'x'
        let mut b = Grammar::builder();
        let r_ref = b.reference("r");
        let x = b.text("x");
        let body = b.junction(vec![r_ref, x]);
        let r = b.add_named("r", body);
        b.set_start(r).unwrap();
        let grammar = b.build().unwrap();

        let mut engine = MatchEngine::new(&grammar, SliceIter::new("x"), None);
        let node = engine.match_symbol(r).unwrap();
        assert_eq!(node.substring(), "x");
    }

    #[test]
    fn inversion_consumes_one_element_on_child_failure() {
        let mut b = Grammar::builder();
        let digit = b.switch(vec!['0'..='9'], false);
        let not_digit = b.inversion(digit);
        b.set_start(not_digit).unwrap();
        let grammar = b.build().unwrap();

        let mut engine = MatchEngine::new(&grammar, SliceIter::new("a1"), None);
        let node = engine.match_symbol(not_digit).unwrap();
        assert_eq!(node.substring(), "a");

        let mut engine = MatchEngine::new(&grammar, SliceIter::new("1a"), None);
        assert!(engine.match_symbol(not_digit).is_none());
    }

    #[test]
    fn skip_is_transparent_between_symbol_boundaries() {
        let mut b = Grammar::builder();
        let digit = b.switch(vec!['0'..='9'], false);
        let digits = b.repetition(digit);
        let term = b.add_named("term", digits);
        let plus = b.text("+");
        let more_term = b.sequence(vec![plus, term]);
        let tail = b.repetition(more_term);
        let body = b.sequence(vec![term, tail]);
        let expr = b.add_named("expr", body);
        let space_char = b.switch(vec![' '..=' '], false);
        let space = b.repetition(space_char);
        b.set_skip(space).unwrap();
        b.set_start(expr).unwrap();
        let grammar = b.build().unwrap();

        let skip_id = grammar.skip_symbol();
        let mut engine = MatchEngine::new(&grammar, SliceIter::new("1 + 22 + 3"), skip_id);
        let node = engine.match_symbol(expr).unwrap();
        assert!(engine.at_end());
        assert_eq!(node.name(), Some("expr"));
    }
}
