//! `thicket-core`: a packrat parsing engine for hand-assembled grammars.
//!
//! A [`Grammar`] is a closed symbol algebra — text literals, character
//! switches, options, repetitions, junctions, sequences, inversions, named
//! wrappers and by-name references — built through [`GrammarBuilder`] and
//! consumed by a recursive-descent match engine with per-position packrat
//! memoization. A grammar can run lexerless, directly over a source's
//! characters, or pair with a lexer driver that tokenizes with a mode stack
//! before a second grammar parses the resulting token stream.
//!
//! This crate does not parse a textual grammar DSL, generate code, or ship a
//! listener-generation macro: callers assemble grammars and listeners
//! programmatically through [`GrammarBuilder`] and [`Grammar::walk`].

mod ast;
mod engine;
mod error;
mod grammar;
mod iter;
mod lexer;
mod limit;
mod pivot;
mod render;
mod switch;
mod symbol;

use std::any::Any;
use std::io::Read;

use engine::MatchEngine;
use iter::{ElemIter, SliceIter};

pub use ast::{Listener, NullaryListener, SyntaxTreeNode, UnaryListener};
pub use error::{GrammarError, IllegalToken, IteratorClosed, TokenizeError};
pub use grammar::{Grammar, GrammarBuilder};
pub use iter::{RevertibleIter, StreamIter};
pub use lexer::{tokenize, ModeBehavior, Token};
pub use render::Glyphs;
pub use symbol::{CharRange, SymbolId};

impl Grammar {
    /// Parses `input` starting at the grammar's `start` symbol, lexerless,
    /// returning the longest-prefix match (`SPEC_FULL.md` §10.2 — callers
    /// append an explicit `End` symbol to their grammar to require full
    /// consumption; this method never adds one implicitly).
    ///
    /// Returns `None` both when `start` failed to match and when the grammar
    /// has no `start` symbol set (a lexer-only grammar has no lexerless
    /// entry point).
    pub fn parse(&self, input: &str) -> Option<SyntaxTreeNode> {
        let start = self.start()?;
        let mut engine = MatchEngine::new(self, SliceIter::new(input), self.skip_symbol());
        engine.match_symbol(start)
    }

    /// As [`Self::parse`], but reads from a chunked, incrementally-decoded
    /// byte stream instead of an in-memory string (`spec.md` §4.1's
    /// streaming-source variant). Builds and owns a fresh [`StreamIter`] for
    /// this one call, so it can never observe `iterator-closed` — use
    /// [`Self::parse_stream_with`] to parse against a [`StreamIter`] the
    /// caller keeps across calls and may close.
    pub fn parse_stream<R: Read>(&self, reader: R) -> Option<SyntaxTreeNode> {
        let start = self.start()?;
        let mut engine = MatchEngine::new(self, StreamIter::new(reader), self.skip_symbol());
        engine.match_symbol(start)
    }

    /// As [`Self::parse_stream`], but against a caller-owned [`StreamIter`]
    /// instead of a fresh one built from `reader`. The iterator is borrowed,
    /// not consumed, so the same [`StreamIter`] can back several parses (or
    /// be advanced, saved and reverted by other code) across calls; calling
    /// this after the caller has [`StreamIter::close`]d it surfaces
    /// [`IteratorClosed`] (`spec.md` §7) instead of silently reading whatever
    /// chunks happen to still be loaded.
    pub fn parse_stream_with<R: Read>(
        &self,
        iter: &mut StreamIter<R>,
    ) -> Result<Option<SyntaxTreeNode>, IteratorClosed> {
        iter.ensure_open()?;
        let Some(start) = self.start() else {
            return Ok(None);
        };
        let mut engine = MatchEngine::new(self, iter, self.skip_symbol());
        Ok(engine.match_symbol(start))
    }

    /// Parses a token stream already produced by [`tokenize`] — the second
    /// stage of a lexer-parser pair. Tokens are matched by the `Text`,
    /// `Switch`, etc. symbols of this grammar the same way characters are in
    /// [`Self::parse`]; [`Token::elem_text`][crate::lexer::Token] supplies
    /// each token's substring for matching.
    pub fn parse_tokens(&self, tokens: &[Token]) -> Option<SyntaxTreeNode> {
        let start = self.start()?;
        let mut engine = MatchEngine::new(self, ElemIter::new(tokens), self.skip_symbol());
        engine.match_symbol(start)
    }

    /// Tokenizes `input` under this grammar's lexer modes (`spec.md` §4.5).
    pub fn tokenize(&self, input: &str) -> Result<Vec<Token>, TokenizeError> {
        tokenize(self, SliceIter::new(input))
    }

    /// Walks `root` in post-order, invoking each node's registered nullary
    /// listener (`spec.md` §4.6). A node with no listener, or one registered
    /// as [`Listener::Unary`], is skipped silently — mixing listener arities
    /// for the same grammar is a caller error, not a per-walk failure.
    pub fn walk(&self, root: &SyntaxTreeNode) {
        ast::walk_post_order(root, &mut |node| {
            let Some(name) = node.name() else { return };
            if let Some(Listener::Nullary(f)) = self.listener(name) {
                f(node);
            }
        });
    }

    /// As [`Self::walk`], but for listeners that take a forwarded `&mut A`
    /// argument, borrowed for the duration of this one call
    /// (`SPEC_FULL.md` §10.3 — not stored on the grammar, so `Grammar`
    /// itself stays reusable across concurrent parses).
    pub fn walk_with<A: 'static>(&self, root: &SyntaxTreeNode, argument: &mut A) {
        let argument: &mut dyn Any = argument;
        ast::walk_post_order(root, &mut |node| {
            let Some(name) = node.name() else { return };
            if let Some(Listener::Unary(f)) = self.listener(name) {
                f(argument, node);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_arithmetic_with_skip() {
        let mut b = Grammar::builder();
        let digit = b.switch(vec!['0'..='9'], false);
        let digits = b.repetition(digit);
        let term = b.add_named("term", digits);
        let plus = b.text("+");
        let tail_part = b.sequence(vec![plus, term]);
        let tail = b.repetition(tail_part);
        let opt_tail = b.option(tail);
        let body = b.sequence(vec![term, opt_tail]);
        let expr = b.add_named("expr", body);
        let space_char = b.switch(vec![' '..=' '], false);
        let space = b.repetition(space_char);
        b.set_skip(space).unwrap();
        b.set_start(expr).unwrap();
        let grammar = b.build().unwrap();

        let tree = grammar.parse("1 + 22 + 3").unwrap();
        assert_eq!(tree.name(), Some("expr"));
        assert_eq!(tree.substring(), "1 + 22 + 3");
    }

    #[test]
    fn walk_invokes_nullary_listener_in_post_order() {
        use std::cell::RefCell;
        use std::rc::Rc;

        let mut b = Grammar::builder();
        let digit = b.switch(vec!['0'..='9'], false);
        let digits = b.repetition(digit);
        let number = b.add_named("number", digits);
        b.set_start(number).unwrap();

        let seen: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = seen.clone();
        b.add_listener(
            "number",
            Listener::Nullary(triomphe::Arc::new(move |node| {
                seen_clone.borrow_mut().push(node.substring().to_string());
            })),
        );
        let grammar = b.build().unwrap();

        let tree = grammar.parse("42").unwrap();
        grammar.walk(&tree);
        assert_eq!(*seen.borrow(), vec!["42".to_string()]);
    }

    #[test]
    fn walk_with_forwards_argument_to_unary_listener() {
        let mut b = Grammar::builder();
        let digit = b.switch(vec!['0'..='9'], false);
        let digits = b.repetition(digit);
        let number = b.add_named("number", digits);
        b.set_start(number).unwrap();

        b.add_listener(
            "number",
            Listener::Unary(triomphe::Arc::new(|arg, node| {
                let total = arg.downcast_mut::<i64>().unwrap();
                *total += node.substring().parse::<i64>().unwrap();
            })),
        );
        let grammar = b.build().unwrap();

        let tree = grammar.parse("42").unwrap();
        let mut total = 0i64;
        grammar.walk_with(&tree, &mut total);
        assert_eq!(total, 42);
    }

    #[test]
    fn tokenizes_then_parses_two_stage() {
        let mut lb = Grammar::builder();
        let lower = lb.switch(vec!['a'..='z'], false);
        let word = lb.repetition(lower);
        let word_lexer = lb.lexer_symbol(word, None);
        let word_sym = lb.add_named("WORD", word_lexer);
        lb.add_lexer_symbol("", word_sym);
        let space_char = lb.switch(vec![' '..=' '], false);
        let space = lb.repetition(space_char);
        let space_sym = lb.lexer_symbol(space, None);
        lb.add_lexer_symbol("", space_sym);
        lb.add_skip_token(space_sym);
        let lexer_grammar = lb.build().unwrap();
        let tokens = lexer_grammar.tokenize("cat dog").unwrap();
        assert_eq!(tokens.len(), 2);
        assert!(tokens.iter().all(|t| t.name.as_deref() == Some("WORD")));

        // Second stage: a grammar over the token stream, matching tokens by
        // the name the lexer stage assigned them (`spec.md` §4.5).
        let mut pb = Grammar::builder();
        let one_word = pb.text("WORD");
        let words = pb.repetition(one_word);
        pb.set_start(words).unwrap();
        let token_grammar = pb.build().unwrap();
        let tree = token_grammar.parse_tokens(&tokens).unwrap();
        assert_eq!(tree.children().len(), 2);
    }

    #[test]
    fn parse_stream_reads_a_streaming_source() {
        let mut b = Grammar::builder();
        let digit = b.switch(vec!['0'..='9'], false);
        let digits = b.repetition(digit);
        b.set_start(digits).unwrap();
        let grammar = b.build().unwrap();

        let tree = grammar.parse_stream("12345".as_bytes()).unwrap();
        assert_eq!(tree.substring(), "12345");
    }

    #[test]
    fn recursion_limit_fails_pathological_nesting_instead_of_overflowing() {
        // A chain of single-element `Sequence` wrappers nested deeper than
        // the configured recursion limit must surface as an ordinary match
        // failure (the innermost call returns `None`, which every enclosing
        // `Sequence` propagates) rather than blow the native call stack.
        let mut b = Grammar::builder();
        b.set_recursion_limit(8);
        let mut sym = b.text("x");
        for _ in 0..32 {
            sym = b.sequence(vec![sym]);
        }
        b.set_start(sym).unwrap();
        let grammar = b.build().unwrap();

        assert!(grammar.parse("x").is_none());
    }
}
