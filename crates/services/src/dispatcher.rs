use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use quiz_core::Clock;
use quiz_core::model::UserId;

use crate::engine::QuizEngine;
use crate::gateway::Intent;

/// One normalized inbound event, ready for dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    pub user: UserId,
    pub intent: Intent,
}

impl InboundEvent {
    #[must_use]
    pub fn new(user: UserId, intent: Intent) -> Self {
        Self { user, intent }
    }
}

/// When and how aggressively idle sessions are dropped.
#[derive(Debug, Clone, Copy)]
pub struct IdlePolicy {
    pub max_idle: chrono::Duration,
    pub sweep_every: Duration,
}

impl IdlePolicy {
    /// Policy with the default one-minute sweep interval.
    #[must_use]
    pub fn new(max_idle: chrono::Duration) -> Self {
        Self {
            max_idle,
            sweep_every: Duration::from_secs(60),
        }
    }

    #[must_use]
    pub fn with_sweep_every(mut self, sweep_every: Duration) -> Self {
        self.sweep_every = sweep_every;
        self
    }
}

/// Single sequential event loop in front of the engine.
///
/// Events are drained from one queue and each transition runs to
/// completion before the next starts, so two events for the same user can
/// never interleave. Events for different users share the same queue and
/// simply run in arrival order; per-user sessions are independent, so
/// that ordering is the only one that matters.
pub struct Dispatcher {
    engine: Arc<QuizEngine>,
    events: mpsc::Receiver<InboundEvent>,
    clock: Clock,
    idle: Option<IdlePolicy>,
}

impl Dispatcher {
    #[must_use]
    pub fn new(engine: Arc<QuizEngine>, events: mpsc::Receiver<InboundEvent>) -> Self {
        Self {
            engine,
            events,
            clock: Clock::default_clock(),
            idle: None,
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Enable the idle-session sweep. Without a policy, sessions that
    /// never receive another answer persist for the process lifetime.
    #[must_use]
    pub fn with_idle_policy(mut self, policy: IdlePolicy) -> Self {
        self.idle = Some(policy);
        self
    }

    /// Process events until every sender is dropped.
    pub async fn run(mut self) {
        let sweep_every = self
            .idle
            .map_or(Duration::from_secs(60), |policy| policy.sweep_every);
        let mut sweep = tokio::time::interval(sweep_every);
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                event = self.events.recv() => {
                    let Some(InboundEvent { user, intent }) = event else {
                        break;
                    };
                    if let Err(err) = self.engine.dispatch(user, intent).await {
                        error!(%user, error = %err, "transition failed");
                    }
                }
                _ = sweep.tick(), if self.idle.is_some() => {
                    self.sweep_idle();
                }
            }
        }
        info!("dispatcher stopped");
    }

    fn sweep_idle(&self) {
        let Some(policy) = self.idle else {
            return;
        };
        match self
            .engine
            .store()
            .expire_idle(self.clock.now(), policy.max_idle)
        {
            Ok(expired) => {
                for user in expired {
                    info!(%user, "idle session expired");
                }
            }
            Err(err) => error!(error = %err, "idle sweep failed"),
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
