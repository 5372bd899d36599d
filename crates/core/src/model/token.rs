use std::fmt;
use std::str::FromStr;

/// Opaque token attached to a presented answer option.
///
/// The token carries the `(question, option)` pair it was minted for, so
/// the engine can resolve a selection against the session's current
/// cursor instead of a global answer table. A token echoed back for a
/// question the session has already moved past is detectably stale.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct AnswerToken {
    question: usize,
    option: usize,
}

impl AnswerToken {
    #[must_use]
    pub fn new(question: usize, option: usize) -> Self {
        Self { question, option }
    }

    /// Index of the question this token was minted for.
    #[must_use]
    pub fn question(&self) -> usize {
        self.question
    }

    /// Index of the option within that question.
    #[must_use]
    pub fn option(&self) -> usize {
        self.option
    }
}

impl fmt::Debug for AnswerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AnswerToken(q{}.o{})", self.question, self.option)
    }
}

// Compact textual form for callback data: "a<question>.<option>".
impl fmt::Display for AnswerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a{}.{}", self.question, self.option)
    }
}

/// Error type for parsing an `AnswerToken` from callback data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTokenError;

impl fmt::Display for ParseTokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse answer token")
    }
}

impl std::error::Error for ParseTokenError {}

impl FromStr for AnswerToken {
    type Err = ParseTokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s.strip_prefix('a').ok_or(ParseTokenError)?;
        let (question, option) = rest.split_once('.').ok_or(ParseTokenError)?;
        let question = question.parse::<usize>().map_err(|_| ParseTokenError)?;
        let option = option.parse::<usize>().map_err(|_| ParseTokenError)?;
        Ok(Self { question, option })
    }
}
