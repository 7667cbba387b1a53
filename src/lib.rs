//! Abuse compiles a small grammar of insult templates and generates
//! sentences from it.
//!
//! Each line of a grammar is a production rule. The right-hand side mixes
//! literal text with `$NAME` or `${NAME}` references to other rules, and
//! generation always starts from `$SENTENCE`.
//!
//! # Example
//!
//! ```rust
//! use abuse::{generate, generate_all, parse, ReplaySelector};
//!
//! let result = parse(
//!     "$SENTENCE -> You smell of $SMELL\n\
//!      $SMELL -> elderberries\n\
//!      $SMELL -> dogfood",
//! );
//! assert!(result.errors.is_empty());
//!
//! // Every sentence, in rule order
//! let all: Vec<String> = generate_all(&result.rules, None)
//!     .into_iter()
//!     .map(|generation| generation.text)
//!     .collect();
//! assert_eq!(all, ["You smell of elderberries", "You smell of dogfood"]);
//!
//! // One sentence, choosing the second $SMELL
//! let generation = generate(&result.rules, &mut ReplaySelector::new([0, 1]), None).unwrap();
//! assert_eq!(generation.text, "You smell of dogfood");
//! assert_eq!(generation.sequence, [0, 1]);
//! ```

pub mod error;
pub mod generator;
pub mod grammar;

pub use error::{ErrorKind, GrammarError, Location, ParseError, Result};
pub use generator::{Generation, RandomSelector, ReplaySelector, Selector, generate, generate_all};
pub use grammar::{Grammar, GrammarConfig, ParseResult, Rule, START_SYMBOL, Symbol, parse};

/// The example grammar shipped with the crate
pub const EXAMPLE_GRAMMAR: &str = include_str!("../grammars/insults.txt");
