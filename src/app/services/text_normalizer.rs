//! Text normalization for value comparison
//!
//! Input values are canonicalized before they are tested against the
//! reference table: runs of whitespace collapse to one space, configured
//! regex substitutions are applied in order, and configured characters are
//! deleted.

use crate::app::models::Row;
use crate::{Error, Result};
use regex::Regex;
use std::sync::LazyLock;

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Compiled normalization options
#[derive(Debug, Clone, Default)]
pub struct TextNormalizer {
    ignore_chars: String,
    substitutions: Vec<(Regex, String)>,
}

impl TextNormalizer {
    /// Compile a normalizer from the ignore character set and an ordered
    /// pattern → replacement list.
    ///
    /// Replacements use the `regex` crate syntax (`$1`, `${name}`).
    pub fn new<I, P, R>(ignore_chars: impl Into<String>, substitutions: I) -> Result<Self>
    where
        I: IntoIterator<Item = (P, R)>,
        P: AsRef<str>,
        R: Into<String>,
    {
        let substitutions = substitutions
            .into_iter()
            .map(|(pattern, replacement)| {
                let pattern = pattern.as_ref();
                Regex::new(pattern)
                    .map(|re| (re, replacement.into()))
                    .map_err(|e| Error::invalid_pattern(pattern, e))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            ignore_chars: ignore_chars.into(),
            substitutions,
        })
    }

    /// Characters deleted from every value
    pub fn ignore_chars(&self) -> &str {
        &self.ignore_chars
    }

    /// Number of configured substitutions
    pub fn substitution_count(&self) -> usize {
        self.substitutions.len()
    }

    /// Normalize a single value. Empty values pass through unchanged.
    pub fn normalize(&self, value: &str) -> String {
        if value.is_empty() {
            return String::new();
        }

        let mut text = WHITESPACE.replace_all(value, " ").into_owned();
        for (pattern, replacement) in &self.substitutions {
            text = pattern.replace_all(&text, replacement.as_str()).into_owned();
        }
        if !self.ignore_chars.is_empty() {
            text.retain(|c| !self.ignore_chars.contains(c));
        }
        text
    }

    /// Normalize every value of a row
    pub fn normalize_row(&self, row: &Row) -> Row {
        row.map_values(|v| self.normalize(v))
    }
}
