use thiserror::Error;

use crate::gate::GateState;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid config file: {0}")]
    InvalidConfig(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid gate transition: {from} -> {to}")]
    InvalidTransition { from: GateState, to: GateState },
}

/// No structured block could be located in a transcript.
///
/// This is an expected outcome, not a fault: callers report it and stop.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{reason}")]
pub struct ExtractionFailure {
    pub reason: String,
    pub raw_excerpt: String,
}

/// Why a candidate payload was refused.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationKind {
    Malformed { parser_error: String },
    MissingField { field: &'static str },
    InvalidField { field: String, expected: &'static str },
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("{}", self.describe())]
pub struct ValidationFailure {
    pub kind: ValidationKind,
    pub raw_excerpt: String,
}

impl ValidationFailure {
    /// Short, stable reason string.
    pub fn reason(&self) -> &'static str {
        match self.kind {
            ValidationKind::Malformed { .. } => "malformed payload",
            ValidationKind::MissingField { .. } => "missing required field",
            ValidationKind::InvalidField { .. } => "invalid field type",
        }
    }

    fn describe(&self) -> String {
        match &self.kind {
            ValidationKind::Malformed { parser_error } => {
                format!("{}: {parser_error}", self.reason())
            }
            ValidationKind::MissingField { field } => format!("{}: {field}", self.reason()),
            ValidationKind::InvalidField { field, expected } => {
                format!("{}: {field} (expected {expected})", self.reason())
            }
        }
    }
}

/// Cut `text` down to at most `max_chars` characters for error reports.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_excerpt_respects_char_boundaries() {
        assert_eq!(excerpt("héllo wörld", 4), "héll...");
        assert_eq!(excerpt("short", 200), "short");
        assert_eq!(excerpt("", 10), "");
    }

    #[test]
    fn test_validation_reason_strings() {
        let missing = ValidationFailure {
            kind: ValidationKind::MissingField {
                field: "primary_content",
            },
            raw_excerpt: String::new(),
        };
        assert_eq!(missing.reason(), "missing required field");
        assert_eq!(
            missing.to_string(),
            "missing required field: primary_content"
        );

        let malformed = ValidationFailure {
            kind: ValidationKind::Malformed {
                parser_error: "EOF while parsing".into(),
            },
            raw_excerpt: "{".into(),
        };
        assert_eq!(malformed.reason(), "malformed payload");
    }
}
