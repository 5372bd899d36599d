//! Static quiz content: question catalog, score bands, and every piece of
//! user-facing copy. Loaded once at startup from a single TOML file and
//! validated before the engine ever runs, so a missing asset is a fatal
//! startup error instead of a mid-quiz surprise.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use quiz_core::model::{
    AnswerOption, OutcomeName, Question, QuestionBank, ScoreBand, ScoreClassifier,
};

use crate::error::ContentError;

//
// ─── RAW CONFIG SHAPE ──────────────────────────────────────────────────────────
//

// The raw serde structs mirror the TOML layout; they are converted into
// validated domain values and never leave this module.

#[derive(Debug, Deserialize)]
struct QuizConfigSpec {
    /// Sessions idle longer than this many seconds are dropped by the
    /// dispatcher sweep. Absent or zero disables expiry.
    idle_timeout_secs: Option<u64>,
    #[serde(default)]
    messages: Messages,
    questions: Vec<QuestionSpec>,
    outcomes: Vec<OutcomeSpec>,
}

#[derive(Debug, Deserialize)]
struct QuestionSpec {
    text: String,
    options: Vec<OptionSpec>,
}

#[derive(Debug, Deserialize)]
struct OptionSpec {
    label: String,
    score: i32,
}

#[derive(Debug, Deserialize)]
struct OutcomeSpec {
    name: String,
    /// Inclusive upper score bound; omitted on the final catch-all band.
    upper: Option<i32>,
    title: String,
    narrative: String,
    image: Option<String>,
}

//
// ─── CONTENT ───────────────────────────────────────────────────────────────────
//

/// User-facing copy for commands, prompts, and fallbacks.
///
/// Every field has an English default so a minimal config only needs
/// questions and outcomes.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Messages {
    pub greeting: String,
    pub greeting_image: Option<String>,
    pub help: String,
    pub program: String,
    pub feedback: String,
    pub restart_offer: String,
    pub restart_confirm: String,
    pub restart_cancelled: String,
    pub missing_session: String,
    pub misunderstood: String,
    pub send_failed: String,
    pub buttons: Buttons,
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            greeting: "Welcome! Ready to find out your result? Pick an option below.".into(),
            greeting_image: None,
            help: "Commands:\n/start - greeting and menu\n/start_quiz - begin the quiz\n\
                   /program - about the program\n/feedback - leave feedback\n/help - this list"
                .into(),
            program: "More about the program on our website.".into(),
            feedback: "We would love your feedback!".into(),
            restart_offer: "Want to take the quiz again?".into(),
            restart_confirm: "Are you sure you want to restart the quiz?".into(),
            restart_cancelled: "Quiz restart cancelled.".into(),
            missing_session: "Something went wrong. Please start the quiz again.".into(),
            misunderstood: "Sorry, I did not understand that. Please use the commands!".into(),
            send_failed: "Sorry, something went wrong on our side. Please try again.".into(),
            buttons: Buttons::default(),
        }
    }
}

/// Labels for the choices the engine mints.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Buttons {
    pub begin: String,
    pub program: String,
    pub feedback: String,
    pub help: String,
    pub restart: String,
    pub yes: String,
    pub no: String,
}

impl Default for Buttons {
    fn default() -> Self {
        Self {
            begin: "Start the quiz".into(),
            program: "About the program".into(),
            feedback: "Leave feedback".into(),
            help: "Command list".into(),
            restart: "Try again?".into(),
            yes: "Yes".into(),
            no: "No".into(),
        }
    }
}

/// Presentation for one terminal outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutcomeContent {
    pub title: String,
    pub narrative: String,
    pub image: Option<String>,
}

/// All static copy, keyed where the engine needs lookups.
#[derive(Debug, Clone)]
pub struct QuizContent {
    pub messages: Messages,
    outcomes: HashMap<OutcomeName, OutcomeContent>,
}

impl QuizContent {
    #[must_use]
    pub fn outcome(&self, name: &OutcomeName) -> Option<&OutcomeContent> {
        self.outcomes.get(name)
    }
}

//
// ─── LOADED CONFIG ─────────────────────────────────────────────────────────────
//

/// Everything the engine needs, validated and ready to share.
#[derive(Debug, Clone)]
pub struct QuizConfig {
    pub bank: QuestionBank,
    pub classifier: ScoreClassifier,
    pub content: QuizContent,
    pub idle_timeout: Option<chrono::Duration>,
}

impl QuizConfig {
    /// Read and validate a config file.
    ///
    /// Image references are resolved against the config file's directory
    /// and must exist.
    ///
    /// # Errors
    ///
    /// Returns `ContentError` for I/O, parse, or validation failures.
    pub fn load(path: &Path) -> Result<Self, ContentError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ContentError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml_str(&raw)?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        config.check_images(base)?;
        Ok(config)
    }

    /// Parse and validate config from TOML text, without touching the
    /// filesystem (image references are not checked).
    ///
    /// # Errors
    ///
    /// Returns `ContentError` for parse or validation failures.
    pub fn from_toml_str(raw: &str) -> Result<Self, ContentError> {
        let parsed: QuizConfigSpec = toml::from_str(raw)?;

        let questions = parsed
            .questions
            .into_iter()
            .map(|q| {
                let options = q
                    .options
                    .into_iter()
                    .map(|o| AnswerOption::new(o.label, o.score))
                    .collect();
                Question::new(q.text, options)
            })
            .collect();
        let bank = QuestionBank::new(questions)?;

        let mut bands = Vec::with_capacity(parsed.outcomes.len());
        let mut outcomes = HashMap::with_capacity(parsed.outcomes.len());
        for outcome in parsed.outcomes {
            let name = OutcomeName::new(outcome.name);
            bands.push(match outcome.upper {
                Some(upper) => ScoreBand::up_to(upper, name.clone()),
                None => ScoreBand::catch_all(name.clone()),
            });
            outcomes.insert(
                name,
                OutcomeContent {
                    title: outcome.title,
                    narrative: outcome.narrative,
                    image: outcome.image,
                },
            );
        }
        let classifier = ScoreClassifier::new(bands)?;

        let idle_timeout = parsed
            .idle_timeout_secs
            .filter(|secs| *secs > 0)
            .and_then(|secs| i64::try_from(secs).ok())
            .map(chrono::Duration::seconds);

        Ok(Self {
            bank,
            classifier,
            content: QuizContent {
                messages: parsed.messages,
                outcomes,
            },
            idle_timeout,
        })
    }

    fn check_images(&self, base: &Path) -> Result<(), ContentError> {
        for name in self.classifier.outcomes() {
            let Some(content) = self.content.outcome(name) else {
                continue;
            };
            if let Some(image) = &content.image {
                if !base.join(image).exists() {
                    return Err(ContentError::MissingImage {
                        name: name.to_string(),
                        path: image.clone(),
                    });
                }
            }
        }
        if let Some(image) = &self.content.messages.greeting_image {
            if !base.join(image).exists() {
                return Err(ContentError::MissingImage {
                    name: "greeting".to_owned(),
                    path: image.clone(),
                });
            }
        }
        Ok(())
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
