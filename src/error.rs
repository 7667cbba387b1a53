//! Error types for parsing grammars and generating sentences.
//!
//! Problems found in grammar source are collected as [`ParseError`] values
//! rather than returned early, so a single parse reports every broken line.
//! [`GrammarError`] covers everything else that can go wrong.

use std::io;

use serde::Serialize;
use thiserror::Error;

/// The kinds of problem a grammar source can contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    /// A rule line without the `->` separator.
    MissingArrow,
    /// A `${` reference that is never closed on its line.
    MissingClosingBrace,
    /// A rule line whose left-hand side is not a single `$NAME`.
    InvalidLeftHandSide,
    /// A non-terminal that no rule produces.
    NoProductionRule,
    /// A rule whose non-terminal is never referenced.
    RuleNeverUsed,
}

impl ErrorKind {
    /// Syntactic errors are found while scanning a single line; the others
    /// only once every line has been read.
    pub fn is_syntactic(self) -> bool {
        matches!(
            self,
            ErrorKind::MissingArrow | ErrorKind::MissingClosingBrace | ErrorKind::InvalidLeftHandSide
        )
    }
}

/// Where a non-terminal reference appears in the grammar source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub line_number: usize,
    /// 1-based character offset of the `$` introducing the reference.
    pub character_number: usize,
}

/// A problem found in grammar source.
///
/// Line and character numbers are 1-based and count characters, not bytes.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ParseError {
    #[error("Missing symbol on line {line_number}: ->")]
    MissingArrow { line_number: usize },

    #[error(
        "Missing closing brace on line {line_number} (opening brace at character {opening_brace_character_number})"
    )]
    MissingClosingBrace {
        line_number: usize,
        opening_brace_character_number: usize,
    },

    #[error("Missing non-terminal at start of line {line_number}")]
    InvalidLeftHandSide { line_number: usize },

    #[error("No production rule for non-terminal ${non_terminal}{}", location_suffix(.location))]
    NoProductionRule {
        non_terminal: String,
        /// `None` for the implicit start symbol, which has no source position.
        location: Option<Location>,
    },

    #[error("Production rule with start symbol ${start} is never used (line {line_number})")]
    RuleNeverUsed { start: String, line_number: usize },
}

fn location_suffix(location: &Option<Location>) -> String {
    match location {
        Some(location) => format!(
            " (line {}, character {})",
            location.line_number, location.character_number
        ),
        None => String::new(),
    }
}

impl ParseError {
    /// The fieldless kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            ParseError::MissingArrow { .. } => ErrorKind::MissingArrow,
            ParseError::MissingClosingBrace { .. } => ErrorKind::MissingClosingBrace,
            ParseError::InvalidLeftHandSide { .. } => ErrorKind::InvalidLeftHandSide,
            ParseError::NoProductionRule { .. } => ErrorKind::NoProductionRule,
            ParseError::RuleNeverUsed { .. } => ErrorKind::RuleNeverUsed,
        }
    }

    /// The line the error refers to, if it has one.
    pub fn line_number(&self) -> Option<usize> {
        match self {
            ParseError::MissingArrow { line_number }
            | ParseError::MissingClosingBrace { line_number, .. }
            | ParseError::InvalidLeftHandSide { line_number }
            | ParseError::RuleNeverUsed { line_number, .. } => Some(*line_number),
            ParseError::NoProductionRule { location, .. } => {
                location.map(|location| location.line_number)
            }
        }
    }

    /// The character the error points at: the opening brace for
    /// [`ParseError::MissingClosingBrace`], the `$` of the reference for
    /// [`ParseError::NoProductionRule`].
    pub fn character_number(&self) -> Option<usize> {
        match self {
            ParseError::MissingClosingBrace {
                opening_brace_character_number,
                ..
            } => Some(*opening_brace_character_number),
            ParseError::NoProductionRule { location, .. } => {
                location.map(|location| location.character_number)
            }
            _ => None,
        }
    }
}

/// Errors raised while loading grammars or generating sentences
#[derive(Error, Debug)]
pub enum GrammarError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid grammar: {} error(s), first: {}", .0.len(), first_error(.0))]
    InvalidGrammar(Vec<ParseError>),

    #[error("No production rule for the start symbol ${0}")]
    MissingStartRule(String),

    #[error("No complete sentence can be derived within the depth limit")]
    NoDerivableSentence,

    #[error("Selector chose index {index} but only {candidates} candidate(s) exist")]
    SelectionOutOfRange { index: usize, candidates: usize },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn first_error(errors: &[ParseError]) -> String {
    errors
        .first()
        .map(ToString::to_string)
        .unwrap_or_else(|| "none".to_string())
}

/// Result type for grammar operations
pub type Result<T> = std::result::Result<T, GrammarError>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_messages() {
        assert_eq!(
            ParseError::MissingArrow { line_number: 3 }.to_string(),
            "Missing symbol on line 3: ->"
        );
        assert_eq!(
            ParseError::MissingClosingBrace {
                line_number: 3,
                opening_brace_character_number: 22
            }
            .to_string(),
            "Missing closing brace on line 3 (opening brace at character 22)"
        );
        assert_eq!(
            ParseError::NoProductionRule {
                non_terminal: "INSULT".to_string(),
                location: Some(Location {
                    line_number: 3,
                    character_number: 14
                }),
            }
            .to_string(),
            "No production rule for non-terminal $INSULT (line 3, character 14)"
        );
        assert_eq!(
            ParseError::NoProductionRule {
                non_terminal: "SENTENCE".to_string(),
                location: None,
            }
            .to_string(),
            "No production rule for non-terminal $SENTENCE"
        );
        assert_eq!(
            ParseError::RuleNeverUsed {
                start: "RUDE_ADJ".to_string(),
                line_number: 2
            }
            .to_string(),
            "Production rule with start symbol $RUDE_ADJ is never used (line 2)"
        );
    }

    #[test]
    fn test_accessors() {
        let error = ParseError::MissingClosingBrace {
            line_number: 4,
            opening_brace_character_number: 41,
        };
        assert_eq!(error.kind(), ErrorKind::MissingClosingBrace);
        assert_eq!(error.line_number(), Some(4));
        assert_eq!(error.character_number(), Some(41));
        assert!(error.kind().is_syntactic());

        let error = ParseError::NoProductionRule {
            non_terminal: "SENTENCE".to_string(),
            location: None,
        };
        assert_eq!(error.line_number(), None);
        assert_eq!(error.character_number(), None);
        assert!(!error.kind().is_syntactic());
    }

    #[test]
    fn test_serialized_shape() {
        let error = ParseError::MissingClosingBrace {
            line_number: 3,
            opening_brace_character_number: 22,
        };
        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(json["type"], "missingClosingBrace");
        assert_eq!(json["lineNumber"], 3);
        assert_eq!(json["openingBraceCharacterNumber"], 22);
    }

    #[test]
    fn test_json_error_conversion() {
        fn decode(text: &str) -> Result<Location> {
            Ok(serde_json::from_str::<serde_json::Value>(text).map(|_| Location {
                line_number: 1,
                character_number: 1,
            })?)
        }

        let err = decode("{not json").unwrap_err();
        assert!(matches!(err, GrammarError::Json(_)));
        assert!(err.to_string().starts_with("JSON error: "));
    }

    #[test]
    fn test_invalid_grammar_message() {
        let error = GrammarError::InvalidGrammar(vec![ParseError::MissingArrow { line_number: 1 }]);
        assert_eq!(
            error.to_string(),
            "Invalid grammar: 1 error(s), first: Missing symbol on line 1: ->"
        );
    }
}
