//! Column-level matching rules
//!
//! A [`Rule`] binds one reference table column to a comparison test. Rules
//! are parsed once from the reference table's rule row (see [`parser`]) and
//! evaluated for every candidate reference row during match finding.

use crate::app::models::Row;
use crate::app::services::temporal::parse_date;
use crate::constants::{WILDCARD_MARKER, rule_tokens};
use crate::{Error, Result};
use std::fmt;
use tracing::debug;

pub mod parser;

pub use parser::parse_rules;

/// Comparison performed by a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleType {
    /// Case-insensitive equality; empty matches empty
    Equal,
    /// Input value must be non-empty
    NotEmpty,
    /// Input date on or before the reference date
    DateBefore,
    /// Input date on or after the reference date
    DateAfter,
}

impl RuleType {
    /// Recognise a rule row token (trimmed, case-insensitive)
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_lowercase().as_str() {
            rule_tokens::EQUAL => Some(Self::Equal),
            rule_tokens::NOT_EMPTY => Some(Self::NotEmpty),
            rule_tokens::DATE_BEFORE => Some(Self::DateBefore),
            rule_tokens::DATE_AFTER => Some(Self::DateAfter),
            _ => None,
        }
    }

    /// Token used for this rule type in the rule row
    pub fn token(self) -> &'static str {
        match self {
            Self::Equal => rule_tokens::EQUAL,
            Self::NotEmpty => rule_tokens::NOT_EMPTY,
            Self::DateBefore => rule_tokens::DATE_BEFORE,
            Self::DateAfter => rule_tokens::DATE_AFTER,
        }
    }
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Three-valued result of a single rule test
///
/// The numeric codes are summed by match finding: a candidate row whose
/// rules sum to zero never had a real test and does not match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchCode {
    /// Reference cell holds the wildcard; no test was made
    NoTest = 0,
    Success = 1,
    Failure = 2,
}

impl MatchCode {
    /// Numeric code (0, 1, 2)
    pub fn code(self) -> u32 {
        self as u32
    }

    fn from_bool(passed: bool) -> Self {
        if passed { Self::Success } else { Self::Failure }
    }
}

/// A test of one input row against one reference cell
///
/// Implemented by [`Rule`]; match finding is generic over it.
pub trait RowTest {
    /// 0-based column index in the reference table
    fn column_index(&self) -> usize;

    /// Evaluate the test. A date that cannot be parsed is an error, not a
    /// failure.
    fn evaluate(&self, input: &Row, reference_value: &str) -> Result<MatchCode>;
}

/// A single column-bound matching rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    column_index: usize,
    column_name: String,
    rule_type: RuleType,
}

impl Rule {
    /// Create a rule from a rule row token
    ///
    /// # Errors
    /// * `Error::UnknownRuleType` if the token is not a known rule type
    pub fn new(column_index: usize, column_name: impl Into<String>, token: &str) -> Result<Self> {
        let column_name = column_name.into();
        let rule_type = RuleType::from_token(token)
            .ok_or_else(|| Error::unknown_rule_type(&column_name, token.trim()))?;
        Ok(Self::with_type(column_index, column_name, rule_type))
    }

    pub fn with_type(column_index: usize, column_name: impl Into<String>, rule_type: RuleType) -> Self {
        Self {
            column_index,
            column_name: column_name.into(),
            rule_type,
        }
    }

    pub fn column_name(&self) -> &str {
        &self.column_name
    }

    pub fn rule_type(&self) -> RuleType {
        self.rule_type
    }

    /// Test an input row against a reference cell value
    pub fn matches(&self, input: &Row, reference_value: &str) -> Result<MatchCode> {
        let reference = reference_value.trim();
        if reference == WILDCARD_MARKER {
            return Ok(MatchCode::NoTest);
        }
        let value = input.value_or_empty(&self.column_name).trim();

        let code = match self.rule_type {
            RuleType::Equal => equal_test(value, reference),
            RuleType::NotEmpty => MatchCode::from_bool(!value.is_empty()),
            RuleType::DateBefore | RuleType::DateAfter => self.date_test(value, reference)?,
        };
        Ok(code)
    }

    fn date_test(&self, value: &str, reference: &str) -> Result<MatchCode> {
        match (value.is_empty(), reference.is_empty()) {
            (true, true) => Ok(MatchCode::Success),
            (true, false) | (false, true) => Ok(MatchCode::Failure),
            (false, false) => {
                let (input_date, reference_date) = parse_date(value)
                    .and_then(|i| parse_date(reference).map(|r| (i, r)))
                    .inspect_err(|e| {
                        debug!(
                            "Failed to convert '{}' or '{}' to a date for column {}: {}",
                            value, reference, self.column_name, e
                        )
                    })?;
                let passed = match self.rule_type {
                    RuleType::DateBefore => input_date <= reference_date,
                    _ => input_date >= reference_date,
                };
                Ok(MatchCode::from_bool(passed))
            }
        }
    }
}

impl RowTest for Rule {
    fn column_index(&self) -> usize {
        self.column_index
    }

    fn evaluate(&self, input: &Row, reference_value: &str) -> Result<MatchCode> {
        self.matches(input, reference_value)
    }
}

fn equal_test(value: &str, reference: &str) -> MatchCode {
    match (value.is_empty(), reference.is_empty()) {
        (true, true) => MatchCode::Success,
        (true, false) | (false, true) => MatchCode::Failure,
        (false, false) => MatchCode::from_bool(value.to_lowercase() == reference.to_lowercase()),
    }
}
