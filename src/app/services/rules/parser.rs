//! Rule set parsing from reference table header rows

use super::Rule;
use crate::Result;
use tracing::debug;

/// Build the ordered rule set from the column names and the rule row.
///
/// A column gets a rule when it has a name and its rule row token (trimmed,
/// lowercased) is one of `accepted_rule_types`. Rules keep column order,
/// which is also their evaluation order during matching.
///
/// # Errors
/// * `Error::UnknownRuleType` if an accepted token is not a rule type the
///   crate knows how to evaluate
pub fn parse_rules(
    column_names: &[String],
    rule_row: &[String],
    accepted_rule_types: &[&str],
) -> Result<Vec<Rule>> {
    let mut rules = Vec::new();

    for (index, name) in column_names.iter().enumerate() {
        if name.trim().is_empty() {
            continue;
        }
        let token = rule_row
            .get(index)
            .map(|t| t.trim().to_lowercase())
            .unwrap_or_default();
        if !accepted_rule_types
            .iter()
            .any(|accepted| accepted.trim().eq_ignore_ascii_case(&token))
        {
            continue;
        }

        let rule = Rule::new(index, name.trim(), &token)?;
        debug!(
            "Parsed rule for column {} ({}): {}",
            index + 1,
            rule.column_name(),
            rule.rule_type()
        );
        rules.push(rule);
    }

    Ok(rules)
}
