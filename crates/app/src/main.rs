use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use quiz_core::Clock;
use quiz_core::model::{AnswerToken, UserId};
use services::{
    Choice, Dispatcher, GatewayError, IdlePolicy, InboundEvent, Intent, MessagingGateway,
    QuizConfig, QuizEngine, SessionStore,
};

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

struct Args {
    config_path: PathBuf,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut config_path = std::env::var("QUIZ_CONFIG")
            .map_or_else(|_| PathBuf::from("config/quiz.toml"), PathBuf::from);

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" => {
                    config_path = PathBuf::from(require_value(args, "--config")?);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self { config_path })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- [--config <quiz.toml>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --config config/quiz.toml");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  QUIZ_CONFIG, RUST_LOG");
}

/// Console rendering of the messaging gateway: choices print as their
/// callback tokens, which the user types back to select them.
struct ConsoleGateway;

#[async_trait]
impl MessagingGateway for ConsoleGateway {
    async fn send_text(&self, _user: UserId, text: &str) -> Result<(), GatewayError> {
        println!("{text}");
        println!();
        Ok(())
    }

    async fn send_choices(
        &self,
        _user: UserId,
        text: &str,
        choices: &[Choice],
    ) -> Result<(), GatewayError> {
        println!("{text}");
        for choice in choices {
            println!("  [{}] {}", choice.token, choice.label);
        }
        println!();
        Ok(())
    }

    async fn send_image(&self, _user: UserId, image: &str) -> Result<(), GatewayError> {
        println!("[image: {image}]");
        Ok(())
    }
}

/// Map one typed line to an intent, or `None` for blank input.
///
/// A leading slash means a command. Anything else is treated as a pressed
/// choice token when it looks like one; free text that matches neither
/// becomes `Unknown`, same as an unparseable chat message would.
fn intent_from_line(line: &str) -> Option<Intent> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Some(command) = trimmed.strip_prefix('/') {
        return Some(Intent::from_command(command));
    }
    Some(match Intent::from_callback(trimmed) {
        Intent::Answer(raw) if raw.parse::<AnswerToken>().is_err() => Intent::Unknown(raw),
        intent => intent,
    })
}

// The console is a single-participant transport.
const CONSOLE_USER: UserId = UserId::new(0);

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);
    let args = Args::parse(&mut argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let config = QuizConfig::load(&args.config_path)?;

    let store = Arc::new(SessionStore::new());
    let engine = Arc::new(QuizEngine::new(
        Arc::new(config.bank),
        Arc::new(config.classifier),
        Arc::new(config.content),
        Arc::clone(&store),
        Arc::new(ConsoleGateway),
    ));

    let (tx, rx) = mpsc::channel::<InboundEvent>(64);
    let mut dispatcher = Dispatcher::new(engine, rx).with_clock(Clock::default_clock());
    if let Some(max_idle) = config.idle_timeout {
        dispatcher = dispatcher.with_idle_policy(IdlePolicy::new(max_idle));
    }
    let dispatcher = tokio::spawn(dispatcher.run());

    println!("Type /start to begin. Ctrl-D quits.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let Some(intent) = intent_from_line(&line) else {
            continue;
        };
        if tx.send(InboundEvent::new(CONSOLE_USER, intent)).await.is_err() {
            warn!("dispatcher stopped; exiting input loop");
            break;
        }
    }

    drop(tx);
    dispatcher.await?;
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
