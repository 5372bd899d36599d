use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionBankError {
    #[error("question bank cannot be empty")]
    EmptyBank,

    #[error("question {index} has empty text")]
    EmptyQuestionText { index: usize },

    #[error("question {index} has no answer options")]
    NoOptions { index: usize },

    #[error("question {question}, option {option} has an empty label")]
    EmptyOptionLabel { question: usize, option: usize },
}

//
// ─── QUESTIONS ─────────────────────────────────────────────────────────────────
//

/// A single selectable answer and the score it contributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerOption {
    label: String,
    score_delta: i32,
}

impl AnswerOption {
    #[must_use]
    pub fn new(label: impl Into<String>, score_delta: i32) -> Self {
        Self {
            label: label.into(),
            score_delta,
        }
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub fn score_delta(&self) -> i32 {
        self.score_delta
    }
}

/// One quiz question with its ordered answer options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    text: String,
    options: Vec<AnswerOption>,
}

impl Question {
    #[must_use]
    pub fn new(text: impl Into<String>, options: Vec<AnswerOption>) -> Self {
        Self {
            text: text.into(),
            options,
        }
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn options(&self) -> &[AnswerOption] {
        &self.options
    }

    #[must_use]
    pub fn option_at(&self, index: usize) -> Option<&AnswerOption> {
        self.options.get(index)
    }
}

/// Immutable ordered catalog of questions.
///
/// Built once at startup from configuration and shared read-only after
/// that; sessions address it by plain index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionBank {
    questions: Vec<Question>,
}

impl QuestionBank {
    /// Validate and build the catalog.
    ///
    /// # Errors
    ///
    /// Returns `QuestionBankError` if the bank is empty, a question has no
    /// text or no options, or an option label is empty.
    pub fn new(questions: Vec<Question>) -> Result<Self, QuestionBankError> {
        if questions.is_empty() {
            return Err(QuestionBankError::EmptyBank);
        }
        for (index, question) in questions.iter().enumerate() {
            if question.text.trim().is_empty() {
                return Err(QuestionBankError::EmptyQuestionText { index });
            }
            if question.options.is_empty() {
                return Err(QuestionBankError::NoOptions { index });
            }
            for (option, ans) in question.options.iter().enumerate() {
                if ans.label.trim().is_empty() {
                    return Err(QuestionBankError::EmptyOptionLabel {
                        question: index,
                        option,
                    });
                }
            }
        }
        Ok(Self { questions })
    }

    #[must_use]
    pub fn question_at(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    /// Number of questions in the catalog.
    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
