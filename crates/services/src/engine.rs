use std::sync::Arc;
use tracing::{info, warn};

use quiz_core::Clock;
use quiz_core::model::{AnswerToken, QuestionBank, ScoreClassifier, UserId};

use crate::content::{OutcomeContent, QuizContent};
use crate::error::{EngineError, GatewayError};
use crate::gateway::{Choice, Intent, MessagingGateway, callback};
use crate::store::SessionStore;

//
// ─── ENGINE ────────────────────────────────────────────────────────────────────
//

/// The per-user quiz state machine.
///
/// Every inbound intent runs through one flat `dispatch`; transitions are
/// decided from the intent plus the user's current session state, with no
/// handlers registered or re-bound at runtime. The question catalog and
/// classifier are immutable; the session store is the only mutable state
/// the engine touches.
pub struct QuizEngine {
    bank: Arc<QuestionBank>,
    classifier: Arc<ScoreClassifier>,
    content: Arc<QuizContent>,
    store: Arc<SessionStore>,
    gateway: Arc<dyn MessagingGateway>,
    clock: Clock,
}

impl QuizEngine {
    #[must_use]
    pub fn new(
        bank: Arc<QuestionBank>,
        classifier: Arc<ScoreClassifier>,
        content: Arc<QuizContent>,
        store: Arc<SessionStore>,
        gateway: Arc<dyn MessagingGateway>,
    ) -> Self {
        Self {
            bank,
            classifier,
            content,
            store,
            gateway,
            clock: Clock::default_clock(),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Run one inbound intent to completion.
    ///
    /// Delivery failures are handled here: the user gets a generic
    /// apology and the session is left untouched, so the transition can
    /// be retried by simply acting again.
    ///
    /// # Errors
    ///
    /// Returns `EngineError` for store failures or a missing outcome
    /// content entry; both indicate a bug, not a user condition.
    pub async fn dispatch(&self, user: UserId, intent: Intent) -> Result<(), EngineError> {
        match self.handle(user, intent).await {
            Err(EngineError::Gateway(err)) => {
                warn!(%user, error = %err, "presentation failed");
                let apology = &self.content.messages.send_failed;
                if let Err(err) = self.gateway.send_text(user, apology).await {
                    warn!(%user, error = %err, "apology could not be delivered");
                }
                Ok(())
            }
            other => other,
        }
    }

    async fn handle(&self, user: UserId, intent: Intent) -> Result<(), EngineError> {
        match intent {
            Intent::Greet => self.greet(user).await,
            Intent::BeginQuiz => self.start_quiz(user).await,
            Intent::Answer(raw) => self.answer(user, &raw).await,
            Intent::RestartRequested => self.request_restart_confirmation(user).await,
            Intent::RestartConfirmed { accepted } => self.confirm_restart(user, accepted).await,
            Intent::ShowProgram => {
                self.gateway
                    .send_text(user, &self.content.messages.program)
                    .await?;
                Ok(())
            }
            Intent::ShowFeedback => {
                self.gateway
                    .send_text(user, &self.content.messages.feedback)
                    .await?;
                Ok(())
            }
            Intent::ShowHelp => {
                self.gateway
                    .send_text(user, &self.content.messages.help)
                    .await?;
                Ok(())
            }
            Intent::Unknown(raw) => {
                info!(%user, raw, "unrecognized message");
                self.gateway
                    .send_text(user, &self.content.messages.misunderstood)
                    .await?;
                Ok(())
            }
        }
    }

    //
    // ─── TRANSITIONS ───────────────────────────────────────────────────────────
    //

    async fn greet(&self, user: UserId) -> Result<(), EngineError> {
        let m = &self.content.messages;
        if let Some(image) = &m.greeting_image {
            self.gateway.send_image(user, image).await?;
        }
        let menu = vec![
            Choice::new(m.buttons.begin.as_str(), callback::BEGIN_QUIZ),
            Choice::new(m.buttons.program.as_str(), callback::PROGRAM),
            Choice::new(m.buttons.feedback.as_str(), callback::FEEDBACK),
            Choice::new(m.buttons.help.as_str(), callback::HELP),
        ];
        self.gateway.send_choices(user, &m.greeting, &menu).await?;
        Ok(())
    }

    /// Start a fresh session. Re-entrant: an active session for the same
    /// user is discarded without confirmation (last start wins).
    async fn start_quiz(&self, user: UserId) -> Result<(), EngineError> {
        self.store.create(user, self.clock.now())?;
        info!(%user, "quiz started");
        self.present_next(user).await
    }

    /// Present the question under the cursor, or finish when the bank is
    /// exhausted. The cursor moves on answers only, so a failed or
    /// repeated presentation re-sends the same question.
    async fn present_next(&self, user: UserId) -> Result<(), EngineError> {
        let Some(session) = self.store.get(user)? else {
            return self.recover_missing_session(user).await;
        };
        let cursor = session.cursor();
        match self.bank.question_at(cursor) {
            Some(question) => {
                let choices: Vec<Choice> = question
                    .options()
                    .iter()
                    .enumerate()
                    .map(|(option, ans)| {
                        Choice::new(ans.label(), AnswerToken::new(cursor, option).to_string())
                    })
                    .collect();
                info!(%user, question = cursor, "presenting question");
                self.gateway
                    .send_choices(user, question.text(), &choices)
                    .await?;
                Ok(())
            }
            None => self.finish(user).await,
        }
    }

    /// Resolve an echoed token against the current cursor and advance.
    ///
    /// A token that is malformed, aimed at a different question, or out
    /// of option range contributes nothing to the score but still moves
    /// the quiz forward; a bad button press never stalls a session.
    async fn answer(&self, user: UserId, raw: &str) -> Result<(), EngineError> {
        let now = self.clock.now();
        let token = raw.parse::<AnswerToken>().ok();
        let applied = self.store.mutate(user, |session| {
            let delta = token.and_then(|t| {
                if t.question() != session.cursor() {
                    return None;
                }
                self.bank
                    .question_at(t.question())
                    .and_then(|q| q.option_at(t.option()))
                    .map(quiz_core::model::AnswerOption::score_delta)
            });
            match delta {
                Some(delta) => {
                    session.apply_scored_answer(delta, now);
                    Some(delta)
                }
                None => {
                    session.advance_unscored(now);
                    None
                }
            }
        })?;

        match applied {
            None => self.recover_missing_session(user).await,
            Some(Some(delta)) => {
                info!(%user, delta, "answer scored");
                self.present_next(user).await
            }
            Some(None) => {
                warn!(%user, token = raw, "unrecognized or stale answer token");
                self.present_next(user).await
            }
        }
    }

    /// Classify and present the final result.
    ///
    /// The session is removed from the store in the same operation that
    /// yields its final score, so a finished session cannot be scored a
    /// second time no matter what arrives afterwards.
    async fn finish(&self, user: UserId) -> Result<(), EngineError> {
        let Some(session) = self.store.take_for_finish(user)? else {
            return self.recover_missing_session(user).await;
        };
        let score = session.score();
        let name = self.classifier.classify(score).clone();
        let outcome =
            self.content
                .outcome(&name)
                .ok_or_else(|| EngineError::MissingOutcomeContent {
                    name: name.to_string(),
                })?;
        info!(%user, score, outcome = %name, "quiz finished");

        // If the result cannot be delivered, the session goes back in
        // the table with its score intact; the next event for this user
        // runs the finish again instead of losing the outcome.
        if let Err(err) = self.present_outcome(user, outcome).await {
            self.store.restore(session)?;
            return Err(err.into());
        }
        Ok(())
    }

    async fn present_outcome(
        &self,
        user: UserId,
        outcome: &OutcomeContent,
    ) -> Result<(), GatewayError> {
        if let Some(image) = &outcome.image {
            self.gateway.send_image(user, image).await?;
        }
        let text = format!("{}\n\n{}", outcome.title, outcome.narrative);
        self.gateway.send_text(user, &text).await?;

        let offer = vec![Choice::new(
            self.content.messages.buttons.restart.as_str(),
            callback::RESTART,
        )];
        self.gateway
            .send_choices(user, &self.content.messages.restart_offer, &offer)
            .await?;
        Ok(())
    }

    async fn request_restart_confirmation(&self, user: UserId) -> Result<(), EngineError> {
        self.store.mark_restart_pending(user)?;
        let m = &self.content.messages;
        let choices = vec![
            Choice::new(m.buttons.yes.as_str(), callback::RESTART_YES),
            Choice::new(m.buttons.no.as_str(), callback::RESTART_NO),
        ];
        self.gateway
            .send_choices(user, &m.restart_confirm, &choices)
            .await?;
        Ok(())
    }

    async fn confirm_restart(&self, user: UserId, accepted: bool) -> Result<(), EngineError> {
        let was_pending = self.store.take_restart_pending(user)?;
        if accepted {
            if was_pending {
                info!(%user, "restart confirmed");
                return self.start_quiz(user).await;
            }
            // A yes with nothing pending is just noise.
            self.gateway
                .send_text(user, &self.content.messages.misunderstood)
                .await?;
            return Ok(());
        }
        self.gateway
            .send_text(user, &self.content.messages.restart_cancelled)
            .await?;
        Ok(())
    }

    async fn recover_missing_session(&self, user: UserId) -> Result<(), EngineError> {
        warn!(%user, "event for user with no active session");
        self.gateway
            .send_text(user, &self.content.messages.missing_session)
            .await?;
        Ok(())
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::QuizConfig;
    use async_trait::async_trait;
    use quiz_core::time::fixed_clock;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Sent {
        Text(UserId, String),
        Choices(UserId, String, Vec<Choice>),
        Image(UserId, String),
    }

    #[derive(Default)]
    struct RecordingGateway {
        sent: Mutex<Vec<Sent>>,
        fail_choices: AtomicBool,
    }

    impl RecordingGateway {
        fn sent(&self) -> Vec<Sent> {
            self.sent.lock().unwrap().clone()
        }

        fn texts_for(&self, user: UserId) -> Vec<String> {
            self.sent()
                .into_iter()
                .filter_map(|s| match s {
                    Sent::Text(u, text) if u == user => Some(text),
                    _ => None,
                })
                .collect()
        }
    }

    #[async_trait]
    impl MessagingGateway for RecordingGateway {
        async fn send_text(&self, user: UserId, text: &str) -> Result<(), GatewayError> {
            self.sent
                .lock()
                .unwrap()
                .push(Sent::Text(user, text.to_owned()));
            Ok(())
        }

        async fn send_choices(
            &self,
            user: UserId,
            text: &str,
            choices: &[Choice],
        ) -> Result<(), GatewayError> {
            if self.fail_choices.load(Ordering::SeqCst) {
                return Err(GatewayError::Send("boom".into()));
            }
            self.sent
                .lock()
                .unwrap()
                .push(Sent::Choices(user, text.to_owned(), choices.to_vec()));
            Ok(())
        }

        async fn send_image(&self, user: UserId, image: &str) -> Result<(), GatewayError> {
            self.sent
                .lock()
                .unwrap()
                .push(Sent::Image(user, image.to_owned()));
            Ok(())
        }
    }

    const CONFIG: &str = r#"
[[questions]]
text = "First question"
options = [
    { label = "low", score = 0 },
    { label = "mid", score = 3 },
    { label = "high", score = 5 },
]

[[questions]]
text = "Second question"
options = [
    { label = "low", score = 0 },
    { label = "mid", score = 3 },
    { label = "high", score = 5 },
]

[[questions]]
text = "Third question"
options = [
    { label = "low", score = 0 },
    { label = "mid", score = 3 },
    { label = "high", score = 5 },
]

[[outcomes]]
name = "wolf"
upper = 10
title = "Wolf"
narrative = "Loyal and strong."
image = "images/wolf.jpg"

[[outcomes]]
name = "eagle"
upper = 17
title = "Eagle"
narrative = "Sharp-eyed."

[[outcomes]]
name = "tiger"
title = "Tiger"
narrative = "Bold."
"#;

    fn build_engine() -> (QuizEngine, Arc<RecordingGateway>, Arc<SessionStore>) {
        let config = QuizConfig::from_toml_str(CONFIG).unwrap();
        let gateway = Arc::new(RecordingGateway::default());
        let store = Arc::new(SessionStore::new());
        let engine = QuizEngine::new(
            Arc::new(config.bank),
            Arc::new(config.classifier),
            Arc::new(config.content),
            Arc::clone(&store),
            Arc::clone(&gateway) as Arc<dyn MessagingGateway>,
        )
        .with_clock(fixed_clock());
        (engine, gateway, store)
    }

    const USER: UserId = UserId::new(7);

    #[tokio::test]
    async fn begin_quiz_presents_the_first_question() {
        let (engine, gateway, store) = build_engine();
        engine.dispatch(USER, Intent::BeginQuiz).await.unwrap();

        let session = store.get(USER).unwrap().unwrap();
        assert_eq!(session.cursor(), 0);
        assert_eq!(session.score(), 0);

        match &gateway.sent()[0] {
            Sent::Choices(user, text, choices) => {
                assert_eq!(*user, USER);
                assert_eq!(text, "First question");
                assert_eq!(choices.len(), 3);
                assert_eq!(choices[0].token, "a0.0");
                assert_eq!(choices[2].token, "a0.2");
            }
            other => panic!("expected question presentation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn scenario_a_middle_answers_reach_wolf() {
        let (engine, gateway, store) = build_engine();
        engine.dispatch(USER, Intent::BeginQuiz).await.unwrap();
        for question in 0..3 {
            engine
                .dispatch(USER, Intent::Answer(format!("a{question}.1")))
                .await
                .unwrap();
        }

        // Final answer triggered classification in the same transition.
        assert!(store.get(USER).unwrap().is_none());

        let sent = gateway.sent();
        assert!(sent.contains(&Sent::Image(USER, "images/wolf.jpg".into())));
        let texts = gateway.texts_for(USER);
        assert!(texts.iter().any(|t| t.starts_with("Wolf")), "{texts:?}");
        match sent.last().unwrap() {
            Sent::Choices(_, text, choices) => {
                assert_eq!(text, "Want to take the quiz again?");
                assert_eq!(choices[0].token, "restart");
            }
            other => panic!("expected restart offer, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn cursor_moves_by_one_per_answer() {
        let (engine, _gateway, store) = build_engine();
        engine.dispatch(USER, Intent::BeginQuiz).await.unwrap();

        engine
            .dispatch(USER, Intent::Answer("a0.0".into()))
            .await
            .unwrap();
        assert_eq!(store.get(USER).unwrap().unwrap().cursor(), 1);

        engine
            .dispatch(USER, Intent::Answer("a1.2".into()))
            .await
            .unwrap();
        let session = store.get(USER).unwrap().unwrap();
        assert_eq!(session.cursor(), 2);
        assert_eq!(session.score(), 5);
    }

    #[tokio::test]
    async fn scores_accumulate_independently_across_users() {
        let (engine, _gateway, store) = build_engine();
        let alice = UserId::new(1);
        let bob = UserId::new(2);

        engine.dispatch(alice, Intent::BeginQuiz).await.unwrap();
        engine.dispatch(bob, Intent::BeginQuiz).await.unwrap();

        // Interleave answers; each session only sees its own deltas.
        engine
            .dispatch(alice, Intent::Answer("a0.2".into()))
            .await
            .unwrap();
        engine
            .dispatch(bob, Intent::Answer("a0.1".into()))
            .await
            .unwrap();
        engine
            .dispatch(alice, Intent::Answer("a1.2".into()))
            .await
            .unwrap();

        assert_eq!(store.get(alice).unwrap().unwrap().score(), 10);
        assert_eq!(store.get(bob).unwrap().unwrap().score(), 3);
    }

    #[tokio::test]
    async fn repeated_starts_keep_a_single_session() {
        let (engine, _gateway, store) = build_engine();
        engine.dispatch(USER, Intent::BeginQuiz).await.unwrap();
        engine
            .dispatch(USER, Intent::Answer("a0.2".into()))
            .await
            .unwrap();
        engine.dispatch(USER, Intent::BeginQuiz).await.unwrap();

        assert_eq!(store.active_count().unwrap(), 1);
        let session = store.get(USER).unwrap().unwrap();
        assert_eq!(session.cursor(), 0);
        assert_eq!(session.score(), 0);
    }

    #[tokio::test]
    async fn scenario_b_restart_then_old_first_question_token_scores_fresh_session() {
        let (engine, _gateway, store) = build_engine();
        engine.dispatch(USER, Intent::BeginQuiz).await.unwrap();
        engine
            .dispatch(USER, Intent::Answer("a0.0".into()))
            .await
            .unwrap();
        assert_eq!(store.get(USER).unwrap().unwrap().cursor(), 1);

        // Restart discards progress; the old session's first-question
        // token still targets question 0, which is exactly where the new
        // session stands, so it scores here.
        engine.dispatch(USER, Intent::BeginQuiz).await.unwrap();
        engine
            .dispatch(USER, Intent::Answer("a0.2".into()))
            .await
            .unwrap();

        let session = store.get(USER).unwrap().unwrap();
        assert_eq!(session.cursor(), 1);
        assert_eq!(session.score(), 5);
    }

    #[tokio::test]
    async fn scenario_c_answer_without_session_is_recoverable() {
        let (engine, gateway, store) = build_engine();
        engine
            .dispatch(USER, Intent::Answer("a0.1".into()))
            .await
            .unwrap();

        assert_eq!(store.active_count().unwrap(), 0);
        assert_eq!(
            gateway.texts_for(USER),
            vec!["Something went wrong. Please start the quiz again.".to_owned()]
        );
    }

    #[tokio::test]
    async fn unrecognized_token_advances_without_scoring() {
        let (engine, _gateway, store) = build_engine();
        engine.dispatch(USER, Intent::BeginQuiz).await.unwrap();
        engine
            .dispatch(USER, Intent::Answer("bogus".into()))
            .await
            .unwrap();

        let session = store.get(USER).unwrap().unwrap();
        assert_eq!(session.cursor(), 1);
        assert_eq!(session.score(), 0);
    }

    #[tokio::test]
    async fn stale_token_for_another_question_does_not_score() {
        let (engine, _gateway, store) = build_engine();
        engine.dispatch(USER, Intent::BeginQuiz).await.unwrap();

        // A well-formed token for question 2 while the cursor is at 0.
        engine
            .dispatch(USER, Intent::Answer("a2.2".into()))
            .await
            .unwrap();

        let session = store.get(USER).unwrap().unwrap();
        assert_eq!(session.cursor(), 1);
        assert_eq!(session.score(), 0);
    }

    #[tokio::test]
    async fn out_of_range_option_does_not_score() {
        let (engine, _gateway, store) = build_engine();
        engine.dispatch(USER, Intent::BeginQuiz).await.unwrap();
        engine
            .dispatch(USER, Intent::Answer("a0.9".into()))
            .await
            .unwrap();

        let session = store.get(USER).unwrap().unwrap();
        assert_eq!(session.cursor(), 1);
        assert_eq!(session.score(), 0);
    }

    #[tokio::test]
    async fn maximal_answers_land_in_a_higher_band() {
        let (engine, gateway, _store) = build_engine();
        engine.dispatch(USER, Intent::BeginQuiz).await.unwrap();
        for question in 0..3 {
            engine
                .dispatch(USER, Intent::Answer(format!("a{question}.2")))
                .await
                .unwrap();
        }

        // Score 15 lands in the eagle band; no image configured for it.
        let texts = gateway.texts_for(USER);
        assert!(texts.iter().any(|t| t.starts_with("Eagle")), "{texts:?}");
    }

    #[tokio::test]
    async fn restart_offer_flows_through_confirmation() {
        let (engine, gateway, store) = build_engine();
        engine.dispatch(USER, Intent::BeginQuiz).await.unwrap();
        for question in 0..3 {
            engine
                .dispatch(USER, Intent::Answer(format!("a{question}.0")))
                .await
                .unwrap();
        }
        assert!(store.get(USER).unwrap().is_none());

        engine.dispatch(USER, Intent::RestartRequested).await.unwrap();
        match gateway.sent().last().unwrap() {
            Sent::Choices(_, text, choices) => {
                assert_eq!(text, "Are you sure you want to restart the quiz?");
                assert_eq!(choices[0].token, "restart_yes");
                assert_eq!(choices[1].token, "restart_no");
            }
            other => panic!("expected confirmation prompt, got {other:?}"),
        }

        engine
            .dispatch(USER, Intent::RestartConfirmed { accepted: true })
            .await
            .unwrap();
        let session = store.get(USER).unwrap().unwrap();
        assert_eq!(session.cursor(), 0);
        assert_eq!(session.score(), 0);
    }

    #[tokio::test]
    async fn declined_restart_is_acknowledged() {
        let (engine, gateway, store) = build_engine();
        engine.dispatch(USER, Intent::RestartRequested).await.unwrap();
        engine
            .dispatch(USER, Intent::RestartConfirmed { accepted: false })
            .await
            .unwrap();

        assert!(store.get(USER).unwrap().is_none());
        assert!(
            gateway
                .texts_for(USER)
                .contains(&"Quiz restart cancelled.".to_owned())
        );
        // The flag is cleared; a follow-up yes no longer restarts.
        engine
            .dispatch(USER, Intent::RestartConfirmed { accepted: true })
            .await
            .unwrap();
        assert!(store.get(USER).unwrap().is_none());
    }

    #[tokio::test]
    async fn stray_confirmation_yes_does_not_start_a_quiz() {
        let (engine, gateway, store) = build_engine();
        engine
            .dispatch(USER, Intent::RestartConfirmed { accepted: true })
            .await
            .unwrap();

        assert_eq!(store.active_count().unwrap(), 0);
        assert!(
            gateway
                .texts_for(USER)
                .iter()
                .any(|t| t.contains("did not understand"))
        );
    }

    #[tokio::test]
    async fn greet_sends_the_menu() {
        let (engine, gateway, store) = build_engine();
        engine.dispatch(USER, Intent::Greet).await.unwrap();

        assert_eq!(store.active_count().unwrap(), 0);
        match gateway.sent().last().unwrap() {
            Sent::Choices(_, _, choices) => {
                let tokens: Vec<&str> = choices.iter().map(|c| c.token.as_str()).collect();
                assert_eq!(tokens, vec!["quiz", "program", "feedback", "help"]);
            }
            other => panic!("expected menu, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_text_gets_static_reply_and_no_session() {
        let (engine, gateway, store) = build_engine();
        engine
            .dispatch(USER, Intent::Unknown("hello there".into()))
            .await
            .unwrap();

        assert_eq!(store.active_count().unwrap(), 0);
        assert!(
            gateway
                .texts_for(USER)
                .iter()
                .any(|t| t.contains("did not understand"))
        );
    }

    #[tokio::test]
    async fn failed_presentation_apologizes_and_keeps_the_session() {
        let (engine, gateway, store) = build_engine();
        engine.dispatch(USER, Intent::BeginQuiz).await.unwrap();

        gateway.fail_choices.store(true, Ordering::SeqCst);
        engine
            .dispatch(USER, Intent::Answer("a0.1".into()))
            .await
            .unwrap();

        // The answer was applied before presentation failed; the user got
        // an apology and the session survives for a retry.
        let session = store.get(USER).unwrap().unwrap();
        assert_eq!(session.cursor(), 1);
        assert_eq!(session.score(), 3);
        assert!(
            gateway
                .texts_for(USER)
                .iter()
                .any(|t| t.contains("something went wrong on our side"))
        );
    }

    #[tokio::test]
    async fn failed_outcome_delivery_keeps_the_result_for_retry() {
        let (engine, gateway, store) = build_engine();
        engine.dispatch(USER, Intent::BeginQuiz).await.unwrap();
        engine
            .dispatch(USER, Intent::Answer("a0.1".into()))
            .await
            .unwrap();
        engine
            .dispatch(USER, Intent::Answer("a1.1".into()))
            .await
            .unwrap();

        // The last answer lands, but the restart offer at the end of the
        // finish cannot be sent.
        gateway.fail_choices.store(true, Ordering::SeqCst);
        engine
            .dispatch(USER, Intent::Answer("a2.1".into()))
            .await
            .unwrap();

        // The finished session went back in the table with its score.
        let session = store.get(USER).unwrap().unwrap();
        assert_eq!(session.score(), 9);
        assert_eq!(session.cursor(), 3);
        assert!(
            gateway
                .texts_for(USER)
                .iter()
                .any(|t| t.contains("something went wrong on our side"))
        );

        // Any further event retries the finish and delivers the outcome.
        gateway.fail_choices.store(false, Ordering::SeqCst);
        engine
            .dispatch(USER, Intent::Answer("a0.0".into()))
            .await
            .unwrap();

        let results = gateway
            .texts_for(USER)
            .iter()
            .filter(|t| t.contains("Wolf"))
            .count();
        assert_eq!(results, 2, "retry re-presents the outcome");
        assert!(
            gateway
                .sent()
                .iter()
                .any(|s| matches!(s, Sent::Choices(u, text, _)
                    if *u == USER && text.contains("again")))
        );
        assert!(store.get(USER).unwrap().is_none());
    }
}
