#![forbid(unsafe_code)]

pub mod content;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod store;

pub use quiz_core::Clock;

pub use content::{OutcomeContent, QuizConfig, QuizContent};
pub use dispatcher::{Dispatcher, IdlePolicy, InboundEvent};
pub use engine::QuizEngine;
pub use error::{ContentError, EngineError, GatewayError, StoreError};
pub use gateway::{Choice, Intent, MessagingGateway};
pub use store::SessionStore;
