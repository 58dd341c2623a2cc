//! Output actions and the command tokens that select them


/// How a matched reference value is merged into the output row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputAction {
    /// Overwrite the output cell
    Replace,
    /// Append a non-empty value after the existing content
    Append,
    /// Set the output cell only when it is empty
    FillIfEmpty,
    /// Leave the output cell alone
    Ignore,
}

impl OutputAction {
    /// Whether this action can change an output cell
    pub fn is_active(self) -> bool {
        !matches!(self, Self::Ignore)
    }
}

/// Deployment-defined rule row tokens for the output commands
///
/// Tokens are compared exactly after trimming, so `R` and `r` are different
/// commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandNames {
    pub replace: String,
    pub append: String,
    pub fill_empty: String,
    pub nothing: String,
}

impl CommandNames {
    pub fn new(
        replace: impl Into<String>,
        append: impl Into<String>,
        fill_empty: impl Into<String>,
        nothing: impl Into<String>,
    ) -> Self {
        Self {
            replace: replace.into(),
            append: append.into(),
            fill_empty: fill_empty.into(),
            nothing: nothing.into(),
        }
    }

    /// Action selected by a rule row token, `None` if the token is not a command
    pub fn action_for(&self, token: &str) -> Option<OutputAction> {
        let token = token.trim();
        if token.is_empty() {
            None
        } else if token == self.replace.trim() {
            Some(OutputAction::Replace)
        } else if token == self.append.trim() {
            Some(OutputAction::Append)
        } else if token == self.fill_empty.trim() {
            Some(OutputAction::FillIfEmpty)
        } else if token == self.nothing.trim() {
            Some(OutputAction::Ignore)
        } else {
            None
        }
    }

    /// Whether the token selects replace, append or fill-empty
    pub fn is_active(&self, token: &str) -> bool {
        self.action_for(token).is_some_and(OutputAction::is_active)
    }
}
