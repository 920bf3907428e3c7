use std::fmt;
use std::time::Duration;

use assess_core::model::{ActivityId, UnitBody};
use services::config::parse_timeout;
use services::content::ContentFormat;
use services::{
    Clock, Completion, ServiceConfig, SessionCommand, SessionError, SessionRuntime,
    SessionSnapshot, ShellSignal,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt as log_fmt};

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingRequired { flag: &'static str, env: &'static str },
    UnknownArg(String),
    InvalidActivity { raw: String },
    InvalidVersion(String),
    InvalidTimeout { raw: String },
    InvalidLogFormat { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingRequired { flag, env } => {
                write!(f, "{flag} is required (or set {env})")
            }
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidActivity { raw } => write!(f, "invalid --activity value: {raw:?}"),
            ArgsError::InvalidVersion(reason) => write!(f, "invalid --version value: {reason}"),
            ArgsError::InvalidTimeout { raw } => write!(f, "invalid --timeout value: {raw}"),
            ArgsError::InvalidLogFormat { raw } => {
                write!(f, "invalid --log-format value: {raw} (expected text or json)")
            }
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

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    fn from_arg(raw: &str) -> Result<Self, ArgsError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(ArgsError::InvalidLogFormat {
                raw: raw.to_string(),
            }),
        }
    }
}

struct Args {
    base_url: String,
    activity: ActivityId,
    version: Option<ContentFormat>,
    token: Option<String>,
    timeout: Option<Duration>,
    log_format: LogFormat,
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- --activity <id> [--base-url <url>] [--version <format>]");
    eprintln!("                      [--token <bearer>] [--timeout <secs>] [--log-format text|json]");
    eprintln!();
    eprintln!("Formats for --version:");
    eprintln!("  slides (v2), sections (keyed), points (v1)");
    eprintln!();
    eprintln!("Commands on stdin:");
    eprintln!("  next | prev | jump <n> | answer <question> <option> | up <n> | down <n>");
    eprintln!("  submit | retry | refresh | dismiss | quit");
    eprintln!("  Positions for jump, up and down count from 1, as listed.");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  ASSESS_BASE_URL, ASSESS_AUTH_TOKEN, ASSESS_TIMEOUT_SECS, RUST_LOG");
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut base_url = std::env::var("ASSESS_BASE_URL").ok();
        let mut token = std::env::var("ASSESS_AUTH_TOKEN").ok();
        let mut timeout = match std::env::var("ASSESS_TIMEOUT_SECS") {
            Ok(raw) => Some(parse_timeout(&raw).map_err(|_| ArgsError::InvalidTimeout { raw })?),
            Err(_) => None,
        };
        let mut activity = None;
        let mut version = None;
        let mut log_format = LogFormat::Text;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--base-url" => base_url = Some(require_value(args, "--base-url")?),
                "--activity" => {
                    let value = require_value(args, "--activity")?;
                    let parsed = value
                        .parse::<ActivityId>()
                        .map_err(|_| ArgsError::InvalidActivity { raw: value.clone() })?;
                    activity = Some(parsed);
                }
                "--version" => {
                    let value = require_value(args, "--version")?;
                    version = Some(
                        value
                            .parse::<ContentFormat>()
                            .map_err(ArgsError::InvalidVersion)?,
                    );
                }
                "--token" => token = Some(require_value(args, "--token")?),
                "--timeout" => {
                    let value = require_value(args, "--timeout")?;
                    timeout = Some(
                        parse_timeout(&value)
                            .map_err(|_| ArgsError::InvalidTimeout { raw: value.clone() })?,
                    );
                }
                "--log-format" => {
                    log_format = LogFormat::from_arg(&require_value(args, "--log-format")?)?;
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            base_url: base_url.ok_or(ArgsError::MissingRequired {
                flag: "--base-url",
                env: "ASSESS_BASE_URL",
            })?,
            activity: activity.ok_or(ArgsError::MissingRequired {
                flag: "--activity",
                env: "(none)",
            })?,
            version,
            token,
            timeout,
            log_format,
        })
    }

    fn service_config(&self) -> Result<ServiceConfig, services::ConfigError> {
        let mut config = ServiceConfig::new(&self.base_url)?;
        if let Some(token) = &self.token {
            config = config.with_auth_token(token.clone());
        }
        if let Some(timeout) = self.timeout {
            config = config.with_timeout(timeout);
        }
        Ok(config)
    }
}

fn init_tracing(log_format: LogFormat) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // Session output owns stdout.
    let subscriber = log_fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);

    let installed = match log_format {
        LogFormat::Text => subscriber.try_init(),
        LogFormat::Json => subscriber.json().try_init(),
    };
    installed.map_err(|err| format!("failed to init tracing: {err}"))?;
    Ok(())
}

enum Input {
    Command(SessionCommand),
    Quit,
}

fn parse_input(line: &str) -> Result<Option<Input>, String> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    // Positions are 1-based for people and 0-based for the session.
    let position = |raw: Option<&str>| -> Result<usize, String> {
        let n = raw
            .ok_or_else(|| format!("{verb} needs a position"))?
            .parse::<usize>()
            .map_err(|e| format!("bad position: {e}"))?;
        n.checked_sub(1)
            .ok_or_else(|| "positions start at 1".to_string())
    };

    let command = match verb {
        "next" | "n" => SessionCommand::Next,
        "prev" | "p" => SessionCommand::Previous,
        "jump" => SessionCommand::JumpTo(position(words.next())?),
        "up" => SessionCommand::MoveUp(position(words.next())?),
        "down" => SessionCommand::MoveDown(position(words.next())?),
        "answer" | "a" => {
            let (Some(question), Some(option)) = (words.next(), words.next()) else {
                return Err("usage: answer <question> <option>".into());
            };
            SessionCommand::SelectAnswer {
                question: question.parse().map_err(|e| format!("{e}"))?,
                option: option.parse().map_err(|e| format!("{e}"))?,
            }
        }
        "submit" => SessionCommand::Submit,
        "retry" => SessionCommand::Retry,
        "refresh" => SessionCommand::Refresh,
        "dismiss" => SessionCommand::DismissNotice,
        "quit" | "q" | "exit" => return Ok(Some(Input::Quit)),
        other => return Err(format!("unknown command: {other}")),
    };
    Ok(Some(Input::Command(command)))
}

fn render(snapshot: &SessionSnapshot) {
    let title = snapshot.title.as_deref().unwrap_or("(loading)");
    println!();
    println!(
        "[{:?}] {title}  {}/{}",
        snapshot.phase,
        (snapshot.unit_index + 1).min(snapshot.unit_count),
        snapshot.unit_count
    );
    if let Some(remaining) = snapshot.remaining_secs {
        println!("time left: {}:{:02}", remaining / 60, remaining % 60);
    }

    if let Some(order) = &snapshot.order {
        for (i, step) in order.iter().enumerate() {
            println!("  {}. {step}", i + 1);
        }
    } else if let Some(unit) = &snapshot.current_unit {
        match unit.body() {
            UnitBody::Slide(slide) => {
                if let Some(heading) = &slide.heading {
                    println!("## {heading}");
                }
                for point in &slide.points {
                    println!("  - {point}");
                }
            }
            UnitBody::Question(question) => {
                println!("{} {}", unit.id(), question.prompt);
                for option in &question.options {
                    let marker = if snapshot.selected_option.as_ref() == Some(&option.id) {
                        "*"
                    } else {
                        " "
                    };
                    println!("  {marker} {}) {}", option.id, option.text);
                }
            }
            UnitBody::Step(step) => println!("  {}", step.text),
        }
    }

    let progress = snapshot.progress;
    if progress.total > 0 {
        println!("progress: {}/{}", progress.answered, progress.total);
    }
    if let Some(notice) = &snapshot.notice {
        println!("! {} (dismiss to hide)", notice.message);
    }
    if let Some(rejection) = &snapshot.rejection {
        println!("x {rejection}");
    }
    if let Some(failure) = &snapshot.failure {
        if failure.is_retryable() {
            println!("x {failure} (retry to reload)");
        } else {
            println!("x {failure}");
        }
    }
    match &snapshot.completion {
        Some(Completion::Scored(result)) => {
            let score = result
                .score()
                .zip(result.max_score())
                .map(|(s, m)| format!("{s}/{m} "))
                .unwrap_or_default();
            let verdict = if result.passed() { "passed" } else { "not passed" };
            println!("result: {score}{verdict}");
        }
        Some(Completion::LessonFinished { slides }) => println!("lesson finished ({slides} slides)"),
        None => {}
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);
    let args = Args::parse(&mut argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;
    init_tracing(args.log_format)?;

    let config = args.service_config()?;
    info!(base_url = %config.base_url, activity = %args.activity, "starting session");
    let runtime = SessionRuntime::from_config(&config, Clock::default_clock())?;
    let mut handle = runtime.open(args.activity.clone(), args.version);
    let mut snapshots = handle.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    render(&snapshots.borrow_and_update());
    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                None => break,
                Some(line) => match parse_input(&line) {
                    Ok(Some(Input::Command(command))) => handle.send(command)?,
                    Ok(Some(Input::Quit)) => break,
                    Ok(None) => {}
                    Err(message) => eprintln!("{message}"),
                },
            },
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                render(&snapshot);
                while let Some(signal) = handle.try_next_signal() {
                    match signal {
                        ShellSignal::ShowResults(attempt) => println!("-> results for attempt {attempt}"),
                        ShellSignal::LessonFinished => println!("-> lesson finished"),
                        ShellSignal::RedirectToLogin => println!("-> please sign in again"),
                    }
                }
                let retryable = snapshot.failure.as_ref().is_some_and(SessionError::is_retryable);
                if snapshot.phase.is_terminal() && !retryable {
                    break;
                }
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
