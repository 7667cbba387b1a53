//! Sentence generation from a parsed rule set.
//!
//! [`generate`] walks one derivation from the start symbol, asking a
//! [`Selector`] which alternative to take at every non-terminal.
//! [`generate_all`] enumerates every derivation instead and needs no selector.
//!
//! Both take the rules as produced by [`parse`](crate::grammar::parse),
//! whether or not the parse reported errors. Without a depth bound a grammar
//! with a cyclic reference such as `$SENTENCE -> A $SENTENCE` never finishes
//! enumerating, so callers handling arbitrary grammars must pass one.

use std::collections::{HashMap, VecDeque};

use rand::rngs::{StdRng, ThreadRng};
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{GrammarError, Result};
use crate::grammar::{Rule, START_SYMBOL, Symbol};

/// A generated sentence and the choices that produced it.
///
/// `sequence[i]` is the candidate index chosen at the i-th non-terminal
/// expansion, leftmost-first and depth-first. Feeding it back through a
/// [`ReplaySelector`] reproduces `text`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Generation {
    pub text: String,
    pub sequence: Vec<usize>,
}

impl Generation {
    fn join(&self, other: &Generation) -> Generation {
        let mut sequence = self.sequence.clone();
        sequence.extend_from_slice(&other.sequence);
        Generation {
            text: format!("{}{}", self.text, other.text),
            sequence,
        }
    }
}

/// Strategy deciding which alternative rule to expand.
pub trait Selector {
    /// Return an index in `0..candidate_count`. Called once per expansion.
    fn choose_index(&mut self, candidate_count: usize) -> usize;
}

impl<F> Selector for F
where
    F: FnMut(usize) -> usize,
{
    fn choose_index(&mut self, candidate_count: usize) -> usize {
        self(candidate_count)
    }
}

/// Picks uniformly at random among the candidates
#[derive(Debug, Clone)]
pub struct RandomSelector<R> {
    rng: R,
}

impl<R: Rng> RandomSelector<R> {
    /// Draw choices from `rng`
    pub fn new(rng: R) -> Self {
        RandomSelector { rng }
    }
}

impl RandomSelector<StdRng> {
    /// A reproducible selector: the same seed always makes the same choices
    pub fn from_seed(seed: u64) -> Self {
        RandomSelector::new(StdRng::seed_from_u64(seed))
    }
}

impl RandomSelector<ThreadRng> {
    /// Draw choices from the thread-local random number generator
    pub fn thread_local() -> Self {
        RandomSelector::new(rand::thread_rng())
    }
}

impl<R: Rng> Selector for RandomSelector<R> {
    fn choose_index(&mut self, candidate_count: usize) -> usize {
        if candidate_count == 0 {
            return 0;
        }
        self.rng.gen_range(0..candidate_count)
    }
}

/// Replays a fixed list of indices, then keeps answering `0`
#[derive(Debug, Clone, Default)]
pub struct ReplaySelector {
    choices: VecDeque<usize>,
}

impl ReplaySelector {
    /// Replay `choices` in order
    pub fn new(choices: impl IntoIterator<Item = usize>) -> Self {
        ReplaySelector {
            choices: choices.into_iter().collect(),
        }
    }

    /// Indices not consumed yet
    pub fn remaining(&self) -> usize {
        self.choices.len()
    }
}

impl Selector for ReplaySelector {
    fn choose_index(&mut self, _candidate_count: usize) -> usize {
        self.choices.pop_front().unwrap_or(0)
    }
}

/// Rules grouped by left-hand side, each group in parse order
struct RuleIndex<'a> {
    candidates: HashMap<&'a str, Vec<&'a Rule>>,
}

impl<'a> RuleIndex<'a> {
    fn new(rules: &'a [Rule]) -> Self {
        let mut candidates: HashMap<&str, Vec<&Rule>> = HashMap::new();
        for rule in rules {
            candidates.entry(rule.left.as_str()).or_default().push(rule);
        }
        RuleIndex { candidates }
    }

    fn candidates(&self, name: &str) -> &[&'a Rule] {
        self.candidates.get(name).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Outcome of expanding one non-terminal during [`generate`]
enum Expansion {
    Complete,
    /// A non-terminal had no rules or the depth limit was hit
    Stuck,
}

struct Expander<'a, S: ?Sized> {
    index: &'a RuleIndex<'a>,
    selector: &'a mut S,
    max_depth: usize,
    text: String,
    sequence: Vec<usize>,
}

impl<S: Selector + ?Sized> Expander<'_, S> {
    fn expand(&mut self, name: &str, depth: usize) -> Result<Expansion> {
        let index = self.index;
        let candidates = index.candidates(name);
        if candidates.is_empty() || depth >= self.max_depth {
            return Ok(Expansion::Stuck);
        }

        let choice = self.selector.choose_index(candidates.len());
        let rule = candidates
            .get(choice)
            .ok_or(GrammarError::SelectionOutOfRange {
                index: choice,
                candidates: candidates.len(),
            })?;
        self.sequence.push(choice);

        for symbol in &rule.right {
            match symbol {
                Symbol::Terminal(text) => self.text.push_str(text),
                Symbol::NonTerminal(name) => {
                    if let Expansion::Stuck = self.expand(name, depth + 1)? {
                        return Ok(Expansion::Stuck);
                    }
                }
            }
        }
        Ok(Expansion::Complete)
    }
}

/// Generate one sentence from [`START_SYMBOL`].
///
/// At each non-terminal the selector picks among the rules for it, in parse
/// order. If a non-terminal has no rules, or `max_depth` nested expansions
/// are reached, the partial sentence is discarded and the result is instead
/// picked with the same selector from every sentence [`generate_all`] finds.
///
/// Fails if the start symbol has no rules, if that fallback finds no
/// sentence at all, or if the selector returns an index out of range.
pub fn generate<S: Selector + ?Sized>(
    rules: &[Rule],
    selector: &mut S,
    max_depth: Option<usize>,
) -> Result<Generation> {
    let index = RuleIndex::new(rules);
    if index.candidates(START_SYMBOL).is_empty() {
        return Err(GrammarError::MissingStartRule(START_SYMBOL.to_string()));
    }

    let mut expander = Expander {
        index: &index,
        selector: &mut *selector,
        max_depth: max_depth.unwrap_or(usize::MAX),
        text: String::new(),
        sequence: Vec::new(),
    };

    match expander.expand(START_SYMBOL, 0)? {
        Expansion::Complete => Ok(Generation {
            text: expander.text,
            sequence: expander.sequence,
        }),
        Expansion::Stuck => pick_from_all(&index, selector, max_depth),
    }
}

fn pick_from_all<S: Selector + ?Sized>(
    index: &RuleIndex<'_>,
    selector: &mut S,
    max_depth: Option<usize>,
) -> Result<Generation> {
    let mut sentences = enumerate(index, START_SYMBOL, 0, max_depth.unwrap_or(usize::MAX));
    if sentences.is_empty() {
        return Err(GrammarError::NoDerivableSentence);
    }

    let candidates = sentences.len();
    let choice = selector.choose_index(candidates);
    if choice >= candidates {
        return Err(GrammarError::SelectionOutOfRange {
            index: choice,
            candidates,
        });
    }
    Ok(sentences.swap_remove(choice))
}

/// Enumerate every sentence derivable from [`START_SYMBOL`].
///
/// Results come depth-first in candidate order: every sentence using the
/// first rule for a non-terminal precedes those using the second. Branches
/// reaching a non-terminal without rules, or needing more than `max_depth`
/// nested expansions, are dropped.
pub fn generate_all(rules: &[Rule], max_depth: Option<usize>) -> Vec<Generation> {
    let index = RuleIndex::new(rules);
    enumerate(&index, START_SYMBOL, 0, max_depth.unwrap_or(usize::MAX))
}

fn enumerate(index: &RuleIndex<'_>, name: &str, depth: usize, max_depth: usize) -> Vec<Generation> {
    if depth >= max_depth {
        return Vec::new();
    }

    let mut results = Vec::new();
    for (choice, rule) in index.candidates(name).iter().enumerate() {
        for completion in enumerate_symbols(index, &rule.right, depth + 1, max_depth) {
            let mut sequence = Vec::with_capacity(completion.sequence.len() + 1);
            sequence.push(choice);
            sequence.extend(completion.sequence);
            results.push(Generation {
                text: completion.text,
                sequence,
            });
        }
    }
    results
}

fn enumerate_symbols(
    index: &RuleIndex<'_>,
    symbols: &[Symbol],
    depth: usize,
    max_depth: usize,
) -> Vec<Generation> {
    let mut partials = vec![Generation::default()];

    for symbol in symbols {
        match symbol {
            Symbol::Terminal(text) => {
                for partial in &mut partials {
                    partial.text.push_str(text);
                }
            }
            Symbol::NonTerminal(name) => {
                let expansions = enumerate(index, name, depth, max_depth);
                partials = partials
                    .iter()
                    .flat_map(|prefix| expansions.iter().map(move |expansion| prefix.join(expansion)))
                    .collect();
            }
        }
        if partials.is_empty() {
            break;
        }
    }
    partials
}
