use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{GrammarError, Location, ParseError, Result};
use crate::generator::{self, Generation, RandomSelector, Selector};

/// Name of the non-terminal every sentence is generated from
pub const START_SYMBOL: &str = "SENTENCE";

/// Default expansion depth used by [`GrammarConfig`]
pub const DEFAULT_MAX_DEPTH: usize = 10;

static LEFT_HAND_SIDE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\$([A-Za-z0-9_]+)\s*").expect("valid left-hand side regex"));

static NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]+$").expect("valid name regex"));

/// A symbol on the right-hand side of a rule
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum Symbol {
    /// Literal text copied to the output
    Terminal(String),
    /// Reference to every rule with this name on its left-hand side
    NonTerminal(String),
}

impl Symbol {
    /// Create a terminal contributing `text` verbatim
    pub fn terminal(text: impl Into<String>) -> Self {
        Symbol::Terminal(text.into())
    }

    /// Create a reference to the rules for `name`
    pub fn non_terminal(name: impl Into<String>) -> Self {
        Symbol::NonTerminal(name.into())
    }

    /// Whether this symbol is literal text
    pub fn is_terminal(&self) -> bool {
        matches!(self, Symbol::Terminal(_))
    }

    /// Whether this symbol refers to other rules
    pub fn is_non_terminal(&self) -> bool {
        matches!(self, Symbol::NonTerminal(_))
    }
}

/// A production rule: one non-terminal expanding to a sequence of symbols.
///
/// Rules sharing a left-hand side are alternatives; their order in the rule
/// list is the candidate order seen by a [`Selector`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    /// Name of the non-terminal this rule produces. The left-hand side is
    /// always a non-terminal, so only its name is stored.
    pub left: String,
    pub right: Vec<Symbol>,
    pub line_number: usize,
}

impl Rule {
    /// Create a rule for the non-terminal `left`
    pub fn new(left: impl Into<String>, right: Vec<Symbol>, line_number: usize) -> Self {
        Rule {
            left: left.into(),
            right,
            line_number,
        }
    }
}

/// Everything a parse produced: the rules of every well-formed line and
/// every problem found along the way.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParseResult {
    pub rules: Vec<Rule>,
    pub errors: Vec<ParseError>,
}

impl ParseResult {
    /// Whether the source parsed without any error
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// A non-terminal reference found while scanning, kept for validation
struct Reference {
    name: String,
    location: Location,
}

/// Parse grammar source into rules, collecting errors instead of stopping.
///
/// Each non-blank line holds one rule, `$NAME -> text with $REFS and ${REFS}`.
/// A broken line produces an error and no rule; the remaining lines are still
/// parsed. Once every line is read the rules are checked for references
/// without a rule and rules that are never referenced.
pub fn parse(text: &str) -> ParseResult {
    let mut result = ParseResult::default();
    let mut references = Vec::new();

    for (index, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let line_number = index + 1;
        match parse_line(line, line_number) {
            Ok((rule, line_references)) => {
                result.rules.push(rule);
                references.extend(line_references);
            }
            Err(error) => result.errors.push(error),
        }
    }

    validate(&result.rules, &references, &mut result.errors);
    result
}

fn parse_line(line: &str, line_number: usize) -> std::result::Result<(Rule, Vec<Reference>), ParseError> {
    let captures = LEFT_HAND_SIDE
        .captures(line)
        .ok_or(ParseError::InvalidLeftHandSide { line_number })?;
    let head = captures.get(0).map_or(0, |head| head.end());
    let left = captures
        .get(1)
        .map(|name| name.as_str().to_string())
        .ok_or(ParseError::InvalidLeftHandSide { line_number })?;

    // The separator must directly follow the non-terminal
    if !line[head..].starts_with("->") {
        return Err(ParseError::MissingArrow { line_number });
    }

    let chars: Vec<char> = line.chars().collect();
    let mut current_pos = line[..head + 2].chars().count();
    while current_pos < chars.len() && chars[current_pos].is_whitespace() {
        current_pos += 1;
    }

    let mut right = Vec::new();
    let mut references = Vec::new();
    let mut buffer = String::new();

    while current_pos < chars.len() {
        let start_pos = current_pos;

        if chars[current_pos] == '$' && chars.get(current_pos + 1) == Some(&'{') {
            let name_start = current_pos + 2;
            let close = chars[name_start..]
                .iter()
                .position(|&c| c == '}')
                .map(|offset| name_start + offset)
                .ok_or(ParseError::MissingClosingBrace {
                    line_number,
                    opening_brace_character_number: start_pos + 2,
                })?;

            let name: String = chars[name_start..close].iter().collect();
            if NAME.is_match(&name) {
                push_reference(&mut right, &mut references, &mut buffer, name, line_number, start_pos);
                current_pos = close + 1;
                continue;
            }
        } else if chars[current_pos] == '$'
            && chars.get(current_pos + 1).is_some_and(|&c| is_name_char(c))
        {
            current_pos += 1;
            while current_pos < chars.len() && is_name_char(chars[current_pos]) {
                current_pos += 1;
            }
            let name: String = chars[start_pos + 1..current_pos].iter().collect();
            push_reference(&mut right, &mut references, &mut buffer, name, line_number, start_pos);
            continue;
        }

        buffer.push(chars[current_pos]);
        current_pos += 1;
    }

    // Only trailing whitespace of the whole line is dropped
    let tail = buffer.trim_end();
    if !tail.is_empty() {
        right.push(Symbol::terminal(tail));
    }

    Ok((Rule::new(left, right, line_number), references))
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn push_reference(
    right: &mut Vec<Symbol>,
    references: &mut Vec<Reference>,
    buffer: &mut String,
    name: String,
    line_number: usize,
    dollar_pos: usize,
) {
    if !buffer.is_empty() {
        right.push(Symbol::Terminal(std::mem::take(buffer)));
    }
    references.push(Reference {
        name: name.clone(),
        location: Location {
            line_number,
            character_number: dollar_pos + 1,
        },
    });
    right.push(Symbol::NonTerminal(name));
}

fn validate(rules: &[Rule], references: &[Reference], errors: &mut Vec<ParseError>) {
    let defined: HashSet<&str> = rules.iter().map(|rule| rule.left.as_str()).collect();

    let start_referenced = references.iter().any(|r| r.name == START_SYMBOL);
    if !defined.contains(START_SYMBOL) && !start_referenced {
        errors.push(ParseError::NoProductionRule {
            non_terminal: START_SYMBOL.to_string(),
            location: None,
        });
    }

    for reference in references {
        if !defined.contains(reference.name.as_str()) {
            errors.push(ParseError::NoProductionRule {
                non_terminal: reference.name.clone(),
                location: Some(reference.location),
            });
        }
    }

    let referenced: HashSet<&str> = references.iter().map(|r| r.name.as_str()).collect();
    let mut reported = HashSet::new();
    for rule in rules {
        let name = rule.left.as_str();
        if name != START_SYMBOL && !referenced.contains(name) && reported.insert(name) {
            errors.push(ParseError::RuleNeverUsed {
                start: name.to_string(),
                line_number: rule.line_number,
            });
        }
    }
}

/// Configuration options for generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrammarConfig {
    /// Maximum number of nested non-terminal expansions along one derivation.
    /// `None` removes the bound, which only terminates for acyclic grammars.
    pub max_depth: Option<usize>,
}

impl Default for GrammarConfig {
    fn default() -> Self {
        GrammarConfig {
            max_depth: Some(DEFAULT_MAX_DEPTH),
        }
    }
}

/// A parsed rule set together with the settings used to generate from it
#[derive(Debug, Clone)]
pub struct Grammar {
    rules: Vec<Rule>,
    config: GrammarConfig,
}

impl Grammar {
    /// Wrap already parsed rules. They are not validated again.
    pub fn new(rules: Vec<Rule>) -> Self {
        Grammar {
            rules,
            config: GrammarConfig::default(),
        }
    }

    /// Wrap already parsed rules with custom configuration
    pub fn with_config(rules: Vec<Rule>, config: GrammarConfig) -> Self {
        Grammar { rules, config }
    }

    /// Load and parse a grammar file, rejecting it if it has any error
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let source = fs::read_to_string(path)?;
        source.parse()
    }

    /// Generate one sentence, letting `selector` pick among alternatives
    pub fn generate<S: Selector + ?Sized>(&self, selector: &mut S) -> Result<Generation> {
        generator::generate(&self.rules, selector, self.config.max_depth)
    }

    /// Generate one sentence using the thread-local random number generator
    pub fn generate_random(&self) -> Result<Generation> {
        self.generate(&mut RandomSelector::thread_local())
    }

    /// Every sentence the grammar can produce within the configured depth
    pub fn generate_all(&self) -> Vec<Generation> {
        generator::generate_all(&self.rules, self.config.max_depth)
    }

    /// Check if any rule produces the non-terminal `name`
    pub fn has_non_terminal(&self, name: &str) -> bool {
        self.rules.iter().any(|rule| rule.left == name)
    }

    /// Get the rules in parse order
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Get a reference to the grammar's configuration
    pub fn config(&self) -> &GrammarConfig {
        &self.config
    }

    /// Set a new configuration
    pub fn set_config(&mut self, config: GrammarConfig) {
        self.config = config;
    }
}

impl FromStr for Grammar {
    type Err = GrammarError;

    fn from_str(source: &str) -> Result<Self> {
        let ParseResult { rules, errors } = parse(source);
        if !errors.is_empty() {
            return Err(GrammarError::InvalidGrammar(errors));
        }
        Ok(Grammar::new(rules))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use pretty_assertions::assert_eq;

    fn t(text: &str) -> Symbol {
        Symbol::terminal(text)
    }

    fn nt(name: &str) -> Symbol {
        Symbol::non_terminal(name)
    }

    #[test]
    fn test_whitespace_only_source() {
        let result = parse("\n\n\n\n\n\r\t\t \n\n     \r\n\n");
        assert!(result.rules.is_empty());
        // Only the missing start symbol is reported
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].kind(), ErrorKind::NoProductionRule);
    }

    #[test]
    fn test_single_terminal_rule() {
        let rules = parse("$SENTENCE -> I hate you!").rules;
        assert_eq!(rules, vec![Rule::new("SENTENCE", vec![t("I hate you!")], 1)]);
    }

    #[test]
    fn test_multiple_rules_and_blank_lines() {
        let rules = parse("\n    \t\n\n$SENTENCE -> I hate you!\n     \n\n$SENTENCE -> You smell!\n\n\n").rules;
        assert_eq!(
            rules,
            vec![
                Rule::new("SENTENCE", vec![t("I hate you!")], 4),
                Rule::new("SENTENCE", vec![t("You smell!")], 7),
            ]
        );
    }

    #[test]
    fn test_trailing_whitespace_is_trimmed() {
        let rules = parse("$SENTENCE -> I hate you!   \t\t  ").rules;
        assert_eq!(rules[0].right, vec![t("I hate you!")]);
    }

    #[test]
    fn test_final_terminal_only_trimmed_on_right() {
        let rules = parse("$VERY -> $VERY very").rules;
        assert_eq!(rules[0].right, vec![nt("VERY"), t(" very")]);
    }

    #[test]
    fn test_no_empty_terminals() {
        let rules = parse("$SENTENCE -> $INSULT  ").rules;
        assert_eq!(rules[0].right, vec![nt("INSULT")]);
    }

    #[test]
    fn test_empty_right_hand_side() {
        let rules = parse("$SENTENCE -> ").rules;
        assert_eq!(rules, vec![Rule::new("SENTENCE", vec![], 1)]);
    }

    #[test]
    fn test_non_terminals_on_right() {
        let rules = parse("$SENTENCE -> You're as $ADJ as a $ANIMAL").rules;
        assert_eq!(
            rules[0].right,
            vec![t("You're as "), nt("ADJ"), t(" as a "), nt("ANIMAL")]
        );
    }

    #[test]
    fn test_non_terminal_names_stop_at_punctuation() {
        let rules = parse("$SENTENCE -> You smell of $Smell2.").rules;
        assert_eq!(rules[0].right, vec![t("You smell of "), nt("Smell2"), t(".")]);
    }

    #[test]
    fn test_braced_non_terminals() {
        let rules = parse("$SENTENCE -> You're ${RUDE_ADJ}er than I thought").rules;
        assert_eq!(
            rules[0].right,
            vec![t("You're "), nt("RUDE_ADJ"), t("er than I thought")]
        );
    }

    #[test]
    fn test_lone_dollar_is_literal() {
        let rules = parse("$SENTENCE -> You owe me $ 5 and ${not a name}").rules;
        assert_eq!(rules[0].right, vec![t("You owe me $ 5 and ${not a name}")]);
    }

    #[test]
    fn test_missing_arrow() {
        let errors = parse(
            "\n\n$SENTENCE - You're ${RUDE_ADJ}er than I thought\n$RUDE_ADJ ->\n$SENTENCE -> $RUDE_ADJ",
        )
        .errors;
        assert_eq!(errors, vec![ParseError::MissingArrow { line_number: 3 }]);
        assert_eq!(errors[0].to_string(), "Missing symbol on line 3: ->");
    }

    #[test]
    fn test_missing_arrow_after_left_hand_side() {
        let result = parse("$SENTENCE - You're -> x\n$SENTENCE -> hi");
        assert_eq!(result.errors, vec![ParseError::MissingArrow { line_number: 1 }]);
        assert_eq!(result.rules, vec![Rule::new("SENTENCE", vec![t("hi")], 2)]);
    }

    #[test]
    fn test_arrow_without_spaces() {
        let rules = parse("$SENTENCE->Go away!").rules;
        assert_eq!(rules, vec![Rule::new("SENTENCE", vec![t("Go away!")], 1)]);
    }

    #[test]
    fn test_missing_closing_brace() {
        let errors = parse("\n\n$SENTENCE -> You're ${RUDE_ADJer than I thought\n$SENTENCE ->\n").errors;
        assert_eq!(
            errors,
            vec![ParseError::MissingClosingBrace {
                line_number: 3,
                opening_brace_character_number: 22,
            }]
        );
    }

    #[test]
    fn test_missing_closing_brace_on_second_reference() {
        let errors = parse("\n\n$SENTENCE -> You're ${RUDE_ADJ}er than ${OBJ\n$SENTENCE ->\n\n").errors;
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].to_string(),
            "Missing closing brace on line 3 (opening brace at character 41)"
        );
    }

    #[test]
    fn test_invalid_left_hand_side() {
        let result = parse("SENTENCE -> hi\n$SENTENCE -> hello");
        assert_eq!(result.errors, vec![ParseError::InvalidLeftHandSide { line_number: 1 }]);
        assert_eq!(result.rules.len(), 1);
    }

    #[test]
    fn test_no_production_rule_for_reference() {
        let errors = parse("\n\n$SENTENCE -> $INSULT\n\n").errors;
        assert_eq!(
            errors,
            vec![ParseError::NoProductionRule {
                non_terminal: "INSULT".to_string(),
                location: Some(Location {
                    line_number: 3,
                    character_number: 14,
                }),
            }]
        );
    }

    #[test]
    fn test_no_production_rule_for_braced_reference() {
        let errors = parse("$SENTENCE -> a ${MISSING}b").errors;
        assert_eq!(errors[0].character_number(), Some(16));
    }

    #[test]
    fn test_no_production_rule_for_start_symbol() {
        let errors = parse("").errors;
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].to_string(), "No production rule for non-terminal $SENTENCE");
        assert_eq!(errors[0].kind(), ErrorKind::NoProductionRule);
    }

    #[test]
    fn test_referenced_start_symbol_reported_once() {
        let errors = parse("$A -> $SENTENCE").errors;
        assert_eq!(
            errors.iter().map(ToString::to_string).collect::<Vec<_>>(),
            vec![
                "No production rule for non-terminal $SENTENCE (line 1, character 7)",
                "Production rule with start symbol $A is never used (line 1)",
            ]
        );
    }

    #[test]
    fn test_rule_never_used() {
        let errors = parse("$SENTENCE -> \n$RUDE_ADJ -> ugly\n$RUDE_ADJ -> smelly").errors;
        assert_eq!(
            errors,
            vec![ParseError::RuleNeverUsed {
                start: "RUDE_ADJ".to_string(),
                line_number: 2,
            }]
        );
    }

    #[test]
    fn test_parse_is_idempotent() {
        let source = "$SENTENCE -> You're ${ADJ}er\n$ADJ -> dumb\n$X -> ${Y";
        assert_eq!(parse(source), parse(source));
    }

    #[test]
    fn test_grammar_from_str_rejects_errors() {
        let err = "$SENTENCE -> $MISSING".parse::<Grammar>().unwrap_err();
        match err {
            GrammarError::InvalidGrammar(errors) => assert_eq!(errors.len(), 1),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_grammar_config() {
        let mut grammar: Grammar = "$SENTENCE -> B\n$SENTENCE -> A $SENTENCE".parse().unwrap();
        assert_eq!(grammar.config().max_depth, Some(DEFAULT_MAX_DEPTH));
        assert!(grammar.has_non_terminal("SENTENCE"));

        grammar.set_config(GrammarConfig { max_depth: Some(2) });
        let texts: Vec<String> = grammar.generate_all().into_iter().map(|g| g.text).collect();
        assert_eq!(texts, vec!["B", "A B"]);
    }
}
