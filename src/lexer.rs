//! The lexer driver (component C5): longest-match-per-position tokenization
//! over a mode stack of lexer symbols, with a `skip` list and a `recovery`
//! fallback for unrecognized input (`spec.md` §4.5).

use crate::engine::MatchEngine;
use crate::error::{IllegalToken, TokenizeError};
use crate::grammar::Grammar;
use crate::iter::RevertibleIter;
use crate::symbol::SymbolId;

/// A mode-stack transition a [`crate::symbol::SymbolKind::Lexer`] symbol runs
/// after a successful match (`spec.md` §4.5's state machine).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModeBehavior {
    /// Push a mode onto the stack, making it active.
    Push(String),
    /// Pop the active mode. Popping the last (default) mode is a grammar
    /// defect, not a recoverable condition (`spec.md` §4.5 invariants).
    Pop,
    /// Replace the active mode without changing stack depth.
    Set(String),
}

/// One token produced by [`tokenize`].
///
/// `name` is `None` for the unnamed tokens recovery produces
/// (`spec.md` §6: "Name is empty for recovery-produced tokens").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub name: Option<String>,
    pub substring: String,
    pub start: usize,
}

impl crate::iter::ElemText for Token {
    fn elem_text(&self) -> &str {
        &self.substring
    }
}

/// Runs the lexer driver over `input` to exhaustion, returning every emitted
/// token (recovery runs merged into unnamed tokens, skip-list tokens
/// discarded per `spec.md` §4.5).
pub fn tokenize<I>(grammar: &Grammar, mut iter: I) -> Result<Vec<Token>, TokenizeError>
where
    I: RevertibleIter<Elem = char>,
{
    let mut tokens = Vec::new();
    let mut mode_stack = vec![String::new()];

    while iter.has_next() {
        let start = iter.offset();
        let mode = mode_stack.last().expect("mode stack never empty").clone();
        let symbols = grammar
            .lexer_mode(&mode)
            .expect("validated at build(): every behavior target mode exists");

        match try_symbols(grammar, &mut iter, symbols, &mut mode_stack)? {
            Some((sym, name, substring)) => {
                log::trace!("lexer matched {:?} {:?}", name, substring);
                if grammar.is_skip_token(sym) {
                    continue;
                }
                tokens.push(Token {
                    name,
                    substring,
                    start,
                });
            }
            None => {
                let recovered = run_recovery(grammar, &mut iter);
                match recovered {
                    Some(substring) if !substring.is_empty() => {
                        log::trace!("recovery consumed {:?}", substring);
                        tokens.push(Token {
                            name: None,
                            substring,
                            start,
                        });
                    }
                    _ => {
                        return Err(IllegalToken {
                            offset: start,
                            tokens_so_far: tokens,
                        }
                        .into());
                    }
                }
            }
        }
    }

    Ok(tokens)
}

/// Tries every lexer symbol of the active mode in declaration order; the
/// first whose fragment matches wins (`spec.md` §4.5 step 2). Runs the
/// winner's behavior against `mode_stack` before returning. The token's name
/// comes from the matched node itself (set only if `sym` is, or delegates to,
/// a `Named` symbol) rather than from the lexer-symbol declaration, so an
/// anonymous lexer symbol wrapping a named fragment still carries that name.
fn try_symbols<I>(
    grammar: &Grammar,
    iter: &mut I,
    symbols: &[SymbolId],
    mode_stack: &mut Vec<String>,
) -> Result<Option<(SymbolId, Option<String>, String)>, TokenizeError>
where
    I: RevertibleIter<Elem = char>,
{
    for &sym in symbols {
        let start = iter.position();
        let mut engine = MatchEngine::new(grammar, NoOpIter(iter), None);
        let node = engine.match_symbol(sym);
        drop(engine);

        if let Some(node) = node {
            if let Some(behavior) = grammar.lexer_behavior(sym) {
                apply_behavior(mode_stack, behavior)?;
            }
            return Ok(Some((
                sym,
                node.name().map(str::to_string),
                node.substring().to_string(),
            )));
        }
        iter.seek(start);
    }
    Ok(None)
}

/// Greedily matches the `recovery` symbol, merging adjacent matches into one
/// unnamed token (`spec.md` §4.5 step 4). Returns `None` if no recovery
/// symbol is configured.
fn run_recovery<I>(grammar: &Grammar, iter: &mut I) -> Option<String>
where
    I: RevertibleIter<Elem = char>,
{
    let recovery = grammar.recovery()?;
    let mut out = String::new();
    loop {
        if !iter.has_next() {
            break;
        }
        let start = iter.position();
        let mut engine = MatchEngine::new(grammar, NoOpIter(iter), None);
        let node = engine.match_symbol(recovery);
        drop(engine);
        match node {
            Some(node) if !node.substring().is_empty() => out.push_str(node.substring()),
            _ => {
                iter.seek(start);
                break;
            }
        }
    }
    Some(out)
}

fn apply_behavior(
    mode_stack: &mut Vec<String>,
    behavior: &ModeBehavior,
) -> Result<(), TokenizeError> {
    match behavior {
        ModeBehavior::Push(mode) => mode_stack.push(mode.clone()),
        ModeBehavior::Set(mode) => {
            *mode_stack.last_mut().expect("mode stack never empty") = mode.clone();
        }
        ModeBehavior::Pop => {
            if mode_stack.len() == 1 {
                // A mode stack underflow can only happen from a dynamically
                // shaped mode sequence validation couldn't see ahead of time
                // (`spec.md` §4.5: "mode-stack underflow ... is a grammar
                // defect → fatal error"), so it surfaces to the caller rather
                // than being swallowed.
                log::error!("lexer mode stack underflow on pop");
                return Err(TokenizeError::ModeStackUnderflow);
            }
            mode_stack.pop();
        }
    }
    Ok(())
}

/// Borrows an existing iterator for the duration of a single lexer-symbol
/// attempt, so [`MatchEngine`] can own an `I` generically without the lexer
/// driver giving up its iterator.
struct NoOpIter<'a, I>(&'a mut I);

impl<'a, I: RevertibleIter> RevertibleIter for NoOpIter<'a, I> {
    type Elem = I::Elem;
    type Pos = I::Pos;

    fn peek(&mut self) -> Option<Self::Elem> {
        self.0.peek()
    }

    fn next(&mut self) -> Option<Self::Elem> {
        self.0.next()
    }

    fn position(&self) -> Self::Pos {
        self.0.position()
    }

    fn seek(&mut self, pos: Self::Pos) {
        self.0.seek(pos)
    }

    fn has_next(&mut self) -> bool {
        self.0.has_next()
    }

    fn substring(&self, start: Self::Pos, end: Self::Pos) -> String {
        self.0.substring(start, end)
    }

    fn offset(&self) -> usize {
        self.0.offset()
    }

    fn saves_mut(&mut self) -> &mut Vec<Self::Pos> {
        self.0.saves_mut()
    }
}
