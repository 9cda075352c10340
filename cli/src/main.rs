//! CLI entrypoint for the challenge coordinator
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{bail, Context, Result};
use clap::Parser;
use gauntlet_application::{
    AnswerCollector, ChallengeScheduler, NextQuestionPacing, RoundRunner,
};
use gauntlet_infrastructure::{
    read_roster_file, ConfigLoader, FileQuestionFeed, HttpParticipantConnector,
    JsonlAnswerStore, JsonlQuestionStore, SentinelFileShutdown, TitlePrefixFilter,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// CLI arguments for the challenge coordinator
#[derive(Parser, Debug)]
#[command(name = "gauntlet")]
#[command(author, version, about = "Timed question-answering challenge coordinator")]
#[command(long_about = r#"
Runs a timed question-answering challenge: questions are pulled from the
configured feed one at a time and sent to every registered participant
system over HTTP. Answers arriving within the deadline are collected and
appended to the answers file; participants that miss the deadline are
recorded as absent for that question.

Configuration files are loaded from (in priority order):
1. --config <path>     Explicit config file
2. ./gauntlet.toml     Working-directory config
3. Built-in defaults

Example:
  gauntlet --config ./challenge.toml -vv
  touch shutdown       # winds a running challenge down
"#)]
struct Cli {
    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long)]
    no_config: bool,

    /// Also write logs to this file
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity level
    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"), // -vvv or more
    };

    // The non-blocking writer guard must outlive the challenge.
    let _log_guard = match &cli.log_file {
        Some(path) => {
            let directory = path.parent().filter(|p| !p.as_os_str().is_empty());
            let file_name = path
                .file_name()
                .context("--log-file must name a file")?;
            let appender = tracing_appender::rolling::never(
                directory.unwrap_or_else(|| std::path::Path::new(".")),
                file_name,
            );
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .init();
            None
        }
    };

    info!("Starting the challenge coordinator");

    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_deref()).map_err(|e| anyhow::anyhow!(e))?
    };
    let problems = config.validate();
    if !problems.is_empty() {
        bail!("configuration is unusable:\n  - {}", problems.join("\n  - "));
    }

    let roster = Arc::new(
        read_roster_file(&config.participants.roster_file)
            .context("loading the participant roster")?,
    );
    info!(participants = roster.len(), "roster ready");

    let timing = config.request.to_timing();
    let limits = config.request.to_limits();

    // === Dependency Injection ===
    let connector = Arc::new(HttpParticipantConnector::new(timing, limits));
    let question_store = Arc::new(
        JsonlQuestionStore::open(&config.storage.questions_file)
            .context("opening the question store")?,
    );
    let answer_store = Arc::new(
        JsonlAnswerStore::open(&config.storage.answers_file)
            .context("opening the answer store")?,
    );
    let feed = Arc::new(FileQuestionFeed::new(
        &config.feed.questions_file,
        Arc::new(TitlePrefixFilter::new(config.feed.title_prefix.clone())),
    ));
    let shutdown = Arc::new(SentinelFileShutdown::new(&config.shutdown.sentinel_file));

    let runner = Arc::new(RoundRunner::new(
        roster,
        connector,
        question_store,
        answer_store,
        AnswerCollector::new(timing, limits),
    ));
    let scheduler = ChallengeScheduler::new(
        runner,
        feed,
        shutdown,
        NextQuestionPacing::new(config.challenge.pacing()),
        config.challenge.to_parameters(),
    );

    scheduler.run().await.context("the challenge aborted")?;
    info!("challenge coordinator exiting normally");
    Ok(())
}
