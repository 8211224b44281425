use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use chrono::Local;
use clap::Parser;
use log::LevelFilter;
use research_core::{AppViewModel, ConversationId, SchedulerPhase};
use research_engine::{HttpResearchApi, Orchestrator};
use research_logging::{research_info, research_warn};

use super::logging::{self, LogDestination};
use super::render::render;
use super::settings::{AppSettings, DEFAULT_SETTINGS_FILE};

/// Runs one deep research job against a chat server and prints its progress.
#[derive(Debug, Parser)]
#[command(name = "deep-research", author, version, about, long_about = None)]
struct Args {
    /// Research question to submit.
    query: String,

    /// Conversation the job belongs to. Overrides `conversation_id` in the
    /// settings file.
    #[arg(short, long)]
    conversation: Option<String>,

    /// Server base URL, e.g. http://127.0.0.1:5000
    #[arg(long)]
    base_url: Option<String>,

    /// CSRF token sent with every request.
    #[arg(long)]
    csrf_token: Option<String>,

    /// RON settings file.
    #[arg(long, default_value = DEFAULT_SETTINGS_FILE)]
    config: PathBuf,

    #[arg(long, value_enum, default_value = "file")]
    log: LogDestination,

    /// off, error, warn, info, debug or trace.
    #[arg(long, default_value = "info")]
    log_level: String,
}

pub fn run_app() -> anyhow::Result<ExitCode> {
    let args = Args::parse();
    let level: LevelFilter = args
        .log_level
        .parse()
        .map_err(|_| anyhow::anyhow!("unknown log level {:?}", args.log_level))?;
    logging::initialize(args.log, level);

    let mut settings = AppSettings::load(&args.config)?;
    if args.base_url.is_some() {
        settings.base_url = args.base_url.clone();
    }
    if args.csrf_token.is_some() {
        settings.csrf_token = args.csrf_token.clone();
    }
    if args.conversation.is_some() {
        settings.conversation_id = args.conversation.clone();
    }
    let conversation = settings
        .conversation_id
        .clone()
        .context("no conversation given; pass --conversation or set conversation_id")?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start the async runtime")?;
    runtime.block_on(run(settings, ConversationId::new(conversation), args.query))
}

async fn run(
    settings: AppSettings,
    conversation: ConversationId,
    query: String,
) -> anyhow::Result<ExitCode> {
    let api = HttpResearchApi::new(settings.client_settings())
        .context("invalid server settings")?;
    let mut orchestrator = Orchestrator::new(Arc::new(api), settings.orchestrator_settings());
    let mut stream = orchestrator.subscribe();
    let mut shown = AppViewModel::default();

    orchestrator.switch_conversation(conversation);
    orchestrator.submit_job(&query)?;
    print_changes(&mut shown, &stream.borrow_and_update());

    let mut listening = true;
    let mut interrupted = false;

    while !orchestrator.is_settled() {
        tokio::select! {
            () = orchestrator.next() => {}
            result = tokio::signal::ctrl_c(), if listening => {
                if let Err(err) = result {
                    research_warn!("Failed to listen for interrupt: {}", err);
                    listening = false;
                    continue;
                }
                if interrupted {
                    research_warn!("Interrupted again; exiting without waiting");
                    break;
                }
                interrupted = true;
                research_info!("Interrupted; tearing down the active job");
                orchestrator.teardown();
            }
        }
        if stream.has_changed().unwrap_or(false) {
            print_changes(&mut shown, &stream.borrow_and_update());
        }
    }

    let outcome = orchestrator.view().scheduler;
    research_info!("Finished with {:?}", outcome);
    Ok(match outcome {
        SchedulerPhase::Completed => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    })
}

fn print_changes(shown: &mut AppViewModel, view: &AppViewModel) {
    let stamp = Local::now().format("%H:%M:%S");
    for line in render(shown, view) {
        println!("[{stamp}] {line}");
    }
    *shown = view.clone();
}
