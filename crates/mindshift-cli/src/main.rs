mod logging;
mod render;

use std::borrow::Cow::{self, Borrowed, Owned};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::Parser;
use colored::Colorize;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};
use tokio::sync::mpsc;

use mindshift_application::{InMemoryRateLimitStore, OrchestratorFactory, UndoOutcome};
use mindshift_core::speech::SpeechRecognizer;
use mindshift_core::step::StepRegistry;
use mindshift_execution::{SessionHandle, SessionService, SessionTraceEvent, SessionUpdate};
use mindshift_infrastructure::{ConfigService, HttpSessionAuthority, HttpTranscriber, MindshiftPaths};

#[derive(Parser)]
#[command(name = "mindshift")]
#[command(about = "Guided Mind Shifting sessions in the terminal", long_about = None)]
struct Cli {
    /// Config file (defaults to <config dir>/mindshift/config.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// User id sent to the session service
    #[arg(long, default_value = "local-user")]
    user: String,

    /// Reattach to an existing session instead of starting a new one
    #[arg(long, value_name = "SESSION_ID")]
    resume: Option<String>,

    /// Show protocol trace events inline
    #[arg(long)]
    trace: bool,
}

const COMMANDS: &[&str] = &["/undo", "/status", "/transcribe", "/health", "/help", "/quit"];

/// CLI helper for rustyline that provides completion, highlighting, and hints.
#[derive(Clone)]
struct CliHelper {
    commands: Vec<String>,
}

impl CliHelper {
    fn new() -> Self {
        Self {
            commands: COMMANDS.iter().map(|c| c.to_string()).collect(),
        }
    }
}

impl Helper for CliHelper {}

impl Completer for CliHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line = &line[..pos];

        if line.starts_with('/') && !line.contains(' ') {
            let candidates: Vec<Pair> = self
                .commands
                .iter()
                .filter(|cmd| cmd.starts_with(line))
                .map(|cmd| Pair {
                    display: cmd.clone(),
                    replacement: cmd.clone(),
                })
                .collect();
            Ok((0, candidates))
        } else {
            Ok((0, vec![]))
        }
    }
}

impl Highlighter for CliHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if line.starts_with('/') {
            Owned(line.bright_cyan().to_string())
        } else {
            Borrowed(line)
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

impl Hinter for CliHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let line = &line[..pos];

        if line.starts_with('/') && !line.contains(' ') {
            self.commands
                .iter()
                .find(|cmd| cmd.starts_with(line) && cmd.len() > line.len())
                .map(|cmd| cmd[line.len()..].to_string())
        } else {
            None
        }
    }
}

impl Validator for CliHelper {}

/// What a line of input asks for.
#[derive(Debug, PartialEq)]
enum Input<'a> {
    Quit,
    Help,
    Undo,
    Status,
    Health,
    Transcribe(&'a str),
    Unknown(&'a str),
    Answer(&'a str),
}

fn parse_input(line: &str) -> Input<'_> {
    let trimmed = line.trim();
    if !trimmed.starts_with('/') {
        return Input::Answer(trimmed);
    }
    let (command, rest) = trimmed
        .split_once(char::is_whitespace)
        .map(|(c, r)| (c, r.trim()))
        .unwrap_or((trimmed, ""));
    match command {
        "/quit" | "/exit" => Input::Quit,
        "/help" => Input::Help,
        "/undo" => Input::Undo,
        "/status" => Input::Status,
        "/health" => Input::Health,
        "/transcribe" => Input::Transcribe(rest),
        other => Input::Unknown(other),
    }
}

fn print_help() {
    println!("{}", "Answer at the prompt, or pick a numbered choice.".bright_black());
    println!("{}", "  /undo              go back one step".bright_black());
    println!("{}", "  /status            show where the session is".bright_black());
    println!("{}", "  /transcribe <file> answer with a recorded audio file".bright_black());
    println!("{}", "  /health            check the transcription service".bright_black());
    println!("{}", "  /quit              leave the session".bright_black());
}

/// Prints turns as the session publishes them.
async fn print_updates(mut updates: mpsc::UnboundedReceiver<SessionUpdate>) {
    while let Some(update) = updates.recv().await {
        if update.rolled_back > 0 {
            println!(
                "{}",
                format!("(removed {} turn(s))", update.rolled_back).bright_black()
            );
        }
        for turn in &update.appended {
            println!("{}", render::turn_line(turn));
        }
        if update.appended.iter().any(|t| t.is_system() && !t.is_error) {
            if let Some(menu) = render::choice_menu(&update.view) {
                println!("{}", menu);
            }
        }
        if update.view.is_complete {
            println!("{}", "Session complete. Type /quit to leave.".bright_green());
        }
    }
}

async fn print_trace(mut events: mpsc::UnboundedReceiver<SessionTraceEvent>) {
    while let Some(event) = events.recv().await {
        let mut fields: Vec<String> = event
            .fields
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        fields.sort();
        println!(
            "{}",
            format!("  · {} {}", event.message, fields.join(" ")).bright_black()
        );
    }
}

async fn answer(service: &SessionService, handle: &SessionHandle, text: &str) -> Result<()> {
    let view = handle.view().await?;
    let result = if view.affordance.response_type.is_structured() {
        let value = render::selection_value(&view.affordance, text);
        service.select(handle.session_id(), &value).await
    } else {
        service.submit(handle.session_id(), text).await
    };
    // Failed exchanges already show up as an error turn.
    if let Err(e) = result {
        println!("{}", e.to_string().red());
    }
    Ok(())
}

async fn undo(service: &SessionService, handle: &SessionHandle) {
    match service.undo(handle.session_id()).await {
        Ok(UndoOutcome::Restored { step_id }) => {
            println!("{}", format!("Back at {}", step_id).yellow());
        }
        Ok(UndoOutcome::NothingToUndo) => println!("{}", "Nothing to undo".bright_black()),
        Ok(UndoOutcome::Rejected { error }) => println!("{}", error.to_string().red()),
        Err(e) => println!("{}", e.to_string().red()),
    }
}

async fn transcribe(
    service: &SessionService,
    handle: &SessionHandle,
    transcriber: &HttpTranscriber,
    file: &str,
) {
    if file.is_empty() {
        println!("{}", "Usage: /transcribe <audio file>".yellow());
        return;
    }
    let text = match transcriber.transcribe(Path::new(file)).await {
        Ok(text) => text,
        Err(e) => {
            println!("{}", e.to_string().red());
            return;
        }
    };
    println!("{}", format!("(heard) {}", text).bright_black());
    if let Err(e) = service.submit_transcript(handle.session_id(), &text).await {
        println!("{}", e.to_string().red());
    }
}

async fn health(transcriber: &HttpTranscriber) {
    match transcriber.health().await {
        Ok(status) if status.is_healthy() => {
            println!("{}", format!("Transcription service healthy ({})", status.model).green());
        }
        Ok(status) => println!(
            "{}",
            format!(
                "Transcription service unhealthy: {}",
                status.error.unwrap_or(status.model)
            )
            .red()
        ),
        Err(e) => println!("{}", e.to_string().red()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let paths = MindshiftPaths::default();
    let (trace_tx, trace_rx) = if cli.trace {
        let (tx, rx) = mpsc::unbounded_channel();
        (Some(tx), Some(rx))
    } else {
        (None, None)
    };
    let logs_dir = paths.logs_dir().context("Failed to resolve log directory")?;
    let _log_guard = logging::init(&logs_dir, trace_tx)?;

    // ===== Backend Initialization =====
    let config_service = match &cli.config {
        Some(path) => ConfigService::with_path(path),
        None => ConfigService::new()?,
    };
    let config = config_service.get_config()?;
    tracing::info!(path = %config_service.path().display(), config = %config.summary(), "Starting mindshift");

    let registry = Arc::new(StepRegistry::standard()?);
    let authority = Arc::new(HttpSessionAuthority::new(&config.authority)?);
    let factory = OrchestratorFactory::new(registry, authority, config.orchestrator.clone());
    let rate_limit = Arc::new(InMemoryRateLimitStore::new(&config.rate_limit));
    let service = SessionService::new(factory, rate_limit);
    let transcriber = HttpTranscriber::new(config.transcription.clone())?;

    if let Some(rx) = trace_rx {
        tokio::spawn(print_trace(rx));
    }

    println!("{}", "=== Mindshift ===".bright_magenta().bold());
    println!("{}", "Type /help for commands.".bright_black());
    println!();

    let opened = match &cli.resume {
        Some(session_id) => service.resume(session_id, &cli.user).await?,
        None => service.start(&cli.user).await?,
    };
    let handle = opened.handle;
    println!("{}", format!("session {}", handle.session_id()).bright_black());
    let printer = tokio::spawn(print_updates(opened.updates));

    // ===== REPL Setup =====
    let mut rl = Editor::new()?;
    rl.set_helper(Some(CliHelper::new()));

    // ===== Main REPL Loop =====
    loop {
        let line = match rl.readline(">> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type /quit to exit.".yellow());
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("{}", "CTRL-D detected. Exiting...".bright_green());
                break;
            }
            Err(err) => {
                eprintln!("{}", format!("Error: {:?}", err).red());
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        let _ = rl.add_history_entry(line.as_str());

        match parse_input(&line) {
            Input::Quit => break,
            Input::Help => print_help(),
            Input::Undo => undo(&service, &handle).await,
            Input::Status => println!("{}", render::status(&handle.view().await?)),
            Input::Health => health(&transcriber).await,
            Input::Transcribe(file) => transcribe(&service, &handle, &transcriber, file).await,
            Input::Unknown(command) => {
                println!("{}", format!("Unknown command {}", command).bright_black());
            }
            Input::Answer(text) => answer(&service, &handle, text).await?,
        }
    }

    println!("{}", "Goodbye!".bright_green());
    service.close(handle.session_id()).await;
    drop(handle);
    let _ = printer.await;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse_input("/quit"), Input::Quit);
        assert_eq!(parse_input(" /exit "), Input::Quit);
        assert_eq!(parse_input("/undo"), Input::Undo);
        assert_eq!(
            parse_input("/transcribe  clip.wav "),
            Input::Transcribe("clip.wav")
        );
        assert_eq!(parse_input("/transcribe"), Input::Transcribe(""));
        assert_eq!(parse_input("/plan"), Input::Unknown("/plan"));
    }

    #[test]
    fn test_plain_text_is_an_answer() {
        assert_eq!(parse_input("  it feels heavy "), Input::Answer("it feels heavy"));
        assert_eq!(parse_input("2"), Input::Answer("2"));
    }

    #[test]
    fn test_cli_arguments() {
        let cli = Cli::parse_from(["mindshift", "--resume", "s-1", "--user", "u-7", "--trace"]);
        assert_eq!(cli.resume.as_deref(), Some("s-1"));
        assert_eq!(cli.user, "u-7");
        assert!(cli.trace);
        assert!(cli.config.is_none());
    }
}
