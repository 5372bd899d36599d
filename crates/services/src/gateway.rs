use async_trait::async_trait;

use quiz_core::model::UserId;

use crate::error::GatewayError;

//
// ─── OUTBOUND ──────────────────────────────────────────────────────────────────
//

/// One selectable choice attached to an outbound message.
///
/// `token` is the opaque callback data the transport must echo back when
/// the user picks this choice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub label: String,
    pub token: String,
}

impl Choice {
    #[must_use]
    pub fn new(label: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            token: token.into(),
        }
    }
}

/// Abstract messaging channel the engine presents through.
///
/// Implementations own delivery only; they hold no quiz state. A send
/// failure is reported back so the engine can apologize to the user
/// without touching the session.
#[async_trait]
pub trait MessagingGateway: Send + Sync {
    /// Deliver plain text.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError` if delivery fails.
    async fn send_text(&self, user: UserId, text: &str) -> Result<(), GatewayError>;

    /// Deliver text with selectable choices.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError` if delivery fails.
    async fn send_choices(
        &self,
        user: UserId,
        text: &str,
        choices: &[Choice],
    ) -> Result<(), GatewayError>;

    /// Deliver an image by reference (path or URL, transport's call).
    ///
    /// # Errors
    ///
    /// Returns `GatewayError` if delivery fails.
    async fn send_image(&self, user: UserId, image: &str) -> Result<(), GatewayError>;
}

//
// ─── INBOUND ───────────────────────────────────────────────────────────────────
//

/// Callback tokens for the non-answer choices the engine mints.
pub mod callback {
    pub const BEGIN_QUIZ: &str = "quiz";
    pub const PROGRAM: &str = "program";
    pub const FEEDBACK: &str = "feedback";
    pub const HELP: &str = "help";
    pub const RESTART: &str = "restart";
    pub const RESTART_YES: &str = "restart_yes";
    pub const RESTART_NO: &str = "restart_no";
}

/// Normalized inbound user action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// `/start`: greeting plus the main menu.
    Greet,
    /// Begin (or re-begin) the quiz. Last start wins.
    BeginQuiz,
    /// A selected choice that is not one of the engine's menu tokens;
    /// carries the raw token for answer resolution.
    Answer(String),
    /// The post-result "try again?" offer was taken.
    RestartRequested,
    /// Answer to the restart confirmation prompt.
    RestartConfirmed { accepted: bool },
    ShowProgram,
    ShowFeedback,
    ShowHelp,
    /// Free-form text the transport could not interpret.
    Unknown(String),
}

impl Intent {
    /// Normalize echoed callback data into an intent.
    ///
    /// Anything that is not a known menu token is treated as an answer
    /// attempt; the engine decides whether the token actually resolves.
    #[must_use]
    pub fn from_callback(data: &str) -> Self {
        match data {
            callback::BEGIN_QUIZ => Intent::BeginQuiz,
            callback::PROGRAM => Intent::ShowProgram,
            callback::FEEDBACK => Intent::ShowFeedback,
            callback::HELP => Intent::ShowHelp,
            callback::RESTART => Intent::RestartRequested,
            callback::RESTART_YES => Intent::RestartConfirmed { accepted: true },
            callback::RESTART_NO => Intent::RestartConfirmed { accepted: false },
            other => Intent::Answer(other.to_owned()),
        }
    }

    /// Normalize a slash command (without arguments) into an intent.
    #[must_use]
    pub fn from_command(name: &str) -> Self {
        match name {
            "start" => Intent::Greet,
            "start_quiz" | "quiz" => Intent::BeginQuiz,
            "program" => Intent::ShowProgram,
            "feedback" => Intent::ShowFeedback,
            "help" => Intent::ShowHelp,
            other => Intent::Unknown(format!("/{other}")),
        }
    }
}
