use chrono::{DateTime, Utc};

use crate::model::UserId;

/// Per-user in-progress quiz state.
///
/// `cursor` is the index of the next unanswered question in the bank and
/// only ever moves forward; the two answer methods below are the only
/// mutations, so a session can never revisit a question or lose score it
/// has already accumulated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    user_id: UserId,
    cursor: usize,
    score: i32,
    started_at: DateTime<Utc>,
    last_activity_at: DateTime<Utc>,
}

impl Session {
    /// Fresh session at cursor 0 with score 0.
    #[must_use]
    pub fn new(user_id: UserId, started_at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            cursor: 0,
            score: 0,
            started_at,
            last_activity_at: started_at,
        }
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Index of the next unanswered question.
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Accumulated score so far.
    #[must_use]
    pub fn score(&self) -> i32 {
        self.score
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn last_activity_at(&self) -> DateTime<Utc> {
        self.last_activity_at
    }

    /// Record a scored answer: apply the option's delta and advance.
    pub fn apply_scored_answer(&mut self, delta: i32, at: DateTime<Utc>) {
        self.score = self.score.saturating_add(delta);
        self.cursor += 1;
        self.last_activity_at = at;
    }

    /// Advance past the current question without scoring it.
    ///
    /// Used for answers that did not resolve to a known option; the quiz
    /// continues rather than stalling on a bad token.
    pub fn advance_unscored(&mut self, at: DateTime<Utc>) {
        self.cursor += 1;
        self.last_activity_at = at;
    }
}
