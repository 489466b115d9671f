//! PhishZil command-line shell
//!
//! Thin presentation layer over the scanner and SMS crates: it loads config,
//! starts sessions, and renders their progress in the terminal.

mod render;

use std::future::Future;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use phishzil_core::{AppConfig, ScanKind};
use phishzil_scanner::{
    ScanEvent, ScanProfile, ScanSequencer, SequencerHandle, StageTable, TerminalAction,
    ThreatReport,
};
use phishzil_sms::{inspect, SmsMessage, SmsMonitor};
use serde::Deserialize;
use tracing::info;

use crate::render::{OutputMode, Renderer};

#[derive(Parser, Debug)]
#[command(name = "phishzil", version, about = "Run phishing scan progress sessions")]
struct Cli {
    /// Config file to use instead of the platform default
    #[arg(long, global = true, env = "PHISHZIL_CONFIG")]
    config: Option<PathBuf>,

    /// Emit JSON instead of human-readable output
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a scan session for a link or an email
    Scan {
        #[arg(value_enum)]
        kind: KindArg,
        /// URL, or email/file name, to scan
        subject: Option<String>,
        /// TOML file with a `[[stages]]` table replacing the built-in one
        #[arg(long)]
        stages: Option<PathBuf>,
    },
    /// Inspect an SMS body and scan any link it carries
    Sms {
        body: String,
        #[arg(long)]
        sender: Option<String>,
    },
    /// Print a built-in stage table
    Stages {
        #[arg(value_enum)]
        kind: KindArg,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum KindArg {
    Link,
    Email,
}

impl From<KindArg> for ScanKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Link => Self::Link,
            KindArg::Email => Self::Email,
        }
    }
}

#[derive(Deserialize)]
struct StageFile {
    stages: StageTable,
}

/// Filter used when `RUST_LOG` is unset or invalid.
const DEFAULT_LOG_FILTER: &str = "warn,phishzil=info";

/// Initialize tracing subscriber for logging
fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => {
            let mut config = AppConfig::load_from(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            config.apply_env_overrides(|key| std::env::var(key).ok());
            config.validate()?;
            config
        }
        None => AppConfig::load_with_env().context("Failed to load config")?,
    };
    Ok(config)
}

fn load_stage_table(path: &Path) -> Result<StageTable> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read stage table {}", path.display()))?;
    let file: StageFile = toml::from_str(&contents)
        .with_context(|| format!("Invalid stage table in {}", path.display()))?;
    Ok(file.stages)
}

fn output_mode(json: bool, config: &AppConfig) -> OutputMode {
    if json {
        OutputMode::Json
    } else if config.general.progress_bar {
        OutputMode::Bar
    } else {
        OutputMode::Plain
    }
}

/// How a rendered session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    Finished,
    Interrupted,
}

/// Render a session through to its terminal action.
///
/// `interrupt` is polled for the whole session, results delay included, and
/// cancels it when it fires.
async fn present<F>(
    mut handle: SequencerHandle,
    renderer: &Renderer,
    interrupt: F,
) -> Result<SessionEnd>
where
    F: Future,
{
    tokio::pin!(interrupt);

    let outcome = loop {
        tokio::select! {
            event = handle.next_event() => {
                let Some(event) = event else {
                    return Ok(SessionEnd::Interrupted);
                };
                renderer.render(&event)?;
                if let ScanEvent::Completed(outcome) = event {
                    break outcome;
                }
            }
            _ = &mut interrupt => {
                handle.cancel();
                renderer.cancelled();
                return Ok(SessionEnd::Interrupted);
            }
        }
    };

    match outcome.action {
        TerminalAction::ShowResults { delay } => {
            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                _ = &mut interrupt => {
                    info!(session_id = %outcome.session_id, "Interrupted before results were shown");
                    return Ok(SessionEnd::Interrupted);
                }
            }
            if let Some(report) = ThreatReport::for_outcome(&outcome) {
                renderer.report(&report)?;
            }
        }
        TerminalAction::ReturnHome => {
            info!(session_id = %outcome.session_id, "Scan finished, returning home");
        }
    }
    Ok(SessionEnd::Finished)
}

async fn run_scan(
    config: &AppConfig,
    mode: OutputMode,
    kind: ScanKind,
    subject: Option<&str>,
    stages: Option<&Path>,
) -> Result<()> {
    let mut profile = ScanProfile::for_kind(kind, &config.scanning);
    if let Some(path) = stages {
        profile = profile.with_stages(load_stage_table(path)?);
    }

    let sequencer = ScanSequencer::from_config(&config.scanning);
    let handle = sequencer.start_profile(&profile, subject)?;
    let renderer = Renderer::new(mode, &handle.state().subject_label);

    present(handle, &renderer, tokio::signal::ctrl_c()).await?;
    Ok(())
}

async fn run_sms(
    config: &AppConfig,
    mode: OutputMode,
    body: String,
    sender: Option<String>,
) -> Result<()> {
    let message = SmsMessage::new(sender, body);
    let verdict = inspect(&message);
    if mode == OutputMode::Json {
        println!("{}", serde_json::to_string(&verdict)?);
    } else if !verdict.is_suspicious() {
        println!("No links found in message from {}", message.sender_label());
    }

    let monitor = SmsMonitor::new(
        ScanSequencer::from_config(&config.scanning),
        config.sms.clone(),
    )
    .with_profile(ScanProfile::for_kind(ScanKind::Link, &config.scanning));

    let Some(alert) = monitor.handle(&message)? else {
        return Ok(());
    };
    if mode != OutputMode::Json {
        println!(
            "Possible phishing link from {}: {}",
            message.sender_label(),
            alert.links.join(", ")
        );
    }

    if let Some(handle) = alert.scan {
        let renderer = Renderer::new(mode, &handle.state().subject_label);
        present(handle, &renderer, tokio::signal::ctrl_c()).await?;
    }
    Ok(())
}

fn print_stages(kind: ScanKind, json: bool) -> Result<()> {
    let table = match kind {
        ScanKind::Link => StageTable::link_scan(),
        ScanKind::Email => StageTable::email_scan(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&table)?);
        return Ok(());
    }

    for (index, stage) in table.iter().enumerate() {
        println!(
            "{index}. {} ({}%){}",
            stage.title,
            stage.progress_target,
            if stage.is_final { " [final]" } else { "" }
        );
        println!("   {}", stage.subtitle);
        for step in &stage.steps {
            println!("   - {step}");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config = load_config(cli.config.as_deref())?;
    let mode = output_mode(cli.json, &config);

    match cli.command {
        Command::Scan {
            kind,
            subject,
            stages,
        } => {
            run_scan(
                &config,
                mode,
                kind.into(),
                subject.as_deref(),
                stages.as_deref(),
            )
            .await
        }
        Command::Sms { body, sender } => run_sms(&config, mode, body, sender).await,
        Command::Stages { kind } => print_stages(kind.into(), cli.json),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use phishzil_scanner::Stage;
    use std::time::Duration;
    use tempfile::TempDir;

    fn results_profile() -> ScanProfile {
        let table = StageTable::new(vec![
            Stage::new("Looking", "Checking the subject", 50).with_steps(["one"]),
            Stage::new("Done", "", 100).final_stage(),
        ])
        .expect("valid table");
        ScanProfile::email()
            .with_stages(table)
            .with_terminal_action(TerminalAction::ShowResults {
                delay: Duration::from_millis(1000),
            })
    }

    async fn present_with_interrupt_at(profile: &ScanProfile, at_ms: u64) -> SessionEnd {
        let handle = ScanSequencer::default()
            .start_profile(profile, Some("invoice.eml"))
            .expect("start");
        let renderer = Renderer::new(OutputMode::Json, "invoice.eml");
        present(
            handle,
            &renderer,
            tokio::time::sleep(Duration::from_millis(at_ms)),
        )
        .await
        .expect("present session")
    }

    #[tokio::test(start_paused = true)]
    async fn test_present_runs_through_results_delay() {
        let start = tokio::time::Instant::now();
        let end = present_with_interrupt_at(&results_profile(), 60_000).await;
        assert_eq!(end, SessionEnd::Finished);
        // 800ms step, 500ms gap, then the 1000ms results delay.
        assert_eq!(start.elapsed(), Duration::from_millis(2300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_present_interrupted_mid_stage() {
        let start = tokio::time::Instant::now();
        let end = present_with_interrupt_at(&results_profile(), 500).await;
        assert_eq!(end, SessionEnd::Interrupted);
        assert_eq!(start.elapsed(), Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_present_interrupted_during_results_delay() {
        let start = tokio::time::Instant::now();
        let end = present_with_interrupt_at(&results_profile(), 1800).await;
        assert_eq!(end, SessionEnd::Interrupted);
        assert_eq!(start.elapsed(), Duration::from_millis(1800));
    }

    #[tokio::test(start_paused = true)]
    async fn test_present_return_home_ignores_later_interrupt() {
        let profile = results_profile().with_terminal_action(TerminalAction::ReturnHome);
        let end = present_with_interrupt_at(&profile, 1400).await;
        assert_eq!(end, SessionEnd::Finished);
    }

    #[test]
    fn test_default_log_filter_parses() {
        assert!(tracing_subscriber::EnvFilter::try_new(DEFAULT_LOG_FILTER).is_ok());
    }

    #[test]
    fn test_parse_scan_command() {
        let cli = Cli::try_parse_from([
            "phishzil",
            "--json",
            "scan",
            "email",
            "invoice.eml",
        ])
        .expect("parse args");
        assert!(cli.json);
        match cli.command {
            Command::Scan { kind, subject, .. } => {
                assert_eq!(kind, KindArg::Email);
                assert_eq!(subject.as_deref(), Some("invoice.eml"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_rejects_unknown_kind() {
        assert!(Cli::try_parse_from(["phishzil", "scan", "fax"]).is_err());
    }

    #[test]
    fn test_output_mode() {
        let mut config = AppConfig::default();
        assert_eq!(output_mode(true, &config), OutputMode::Json);
        assert_eq!(output_mode(false, &config), OutputMode::Bar);
        config.general.progress_bar = false;
        assert_eq!(output_mode(false, &config), OutputMode::Plain);
    }

    #[test]
    fn test_load_stage_table() {
        let tmp = TempDir::new().expect("create temp dir");
        let path = tmp.path().join("stages.toml");
        std::fs::write(
            &path,
            r#"
[[stages]]
title = "Looking"
subtitle = "Checking the subject"
steps = ["one"]
progress_target = 30

[[stages]]
title = "Done"
subtitle = ""
progress_target = 100
is_final = true
"#,
        )
        .expect("write stage file");

        let table = load_stage_table(&path).expect("load stage table");
        assert_eq!(table.len(), 2);
        assert_eq!(table.final_index(), 1);
    }

    #[test]
    fn test_load_stage_table_rejects_invalid() {
        let tmp = TempDir::new().expect("create temp dir");
        let path = tmp.path().join("stages.toml");
        std::fs::write(
            &path,
            "[[stages]]\ntitle = \"x\"\nsubtitle = \"\"\nprogress_target = 10\n",
        )
        .expect("write stage file");

        let err = load_stage_table(&path).expect_err("missing final stage");
        assert!(format!("{err:#}").contains("final"));
    }

    #[test]
    fn test_load_config_from_path() {
        let tmp = TempDir::new().expect("create temp dir");
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[general]\nprogress_bar = false\n").expect("write config");

        let config = load_config(Some(&path)).expect("load config");
        assert!(!config.general.progress_bar);
    }
}
