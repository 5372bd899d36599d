mod ids;
mod outcome;
mod question;
mod session;
mod token;

pub use ids::{ParseUserIdError, UserId};
pub use outcome::{ClassifierError, OutcomeName, ScoreBand, ScoreClassifier};
pub use question::{AnswerOption, Question, QuestionBank, QuestionBankError};
pub use session::Session;
pub use token::{AnswerToken, ParseTokenError};
