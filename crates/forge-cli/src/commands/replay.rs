//! Replay command - stream a recorded response through the workbench

use anyhow::{Context, Result};
use colored::{ColoredString, Colorize};
use forge_core::stream::{chunk_text, drive};
use forge_core::{ConfigManager, StreamingParser, Workbench};
use forge_types::{ActionSnapshot, ActionStatus, FileEntry, ParseEvent, ParsedAction};
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

pub struct ReplayOptions {
    pub file: PathBuf,
    pub chunk_size: usize,
    pub config: Option<PathBuf>,
    pub work_dir: Option<String>,
    pub shell_delay: Option<u64>,
    pub events: bool,
    pub json: bool,
}

pub async fn run(options: ReplayOptions) -> Result<()> {
    let response = super::read_input(&options.file)?;
    let loaded = crate::config::load(options.config.as_deref(), &std::env::current_dir()?)?;

    let mut config = loaded.config;
    if let Some(work_dir) = options.work_dir {
        config = config.with_work_dir(work_dir.trim_matches('/'));
    }
    if let Some(delay) = options.shell_delay {
        config.shell_delay_ms = delay;
    }
    ConfigManager::new()
        .ensure_valid(&config)
        .context("Validation failed")?;

    let start = Instant::now();
    let mut parser = StreamingParser::from_config(&config);
    let mut workbench = Workbench::new(config);

    let chunks = chunk_text(&response, options.chunk_size);
    info!("Replaying {} bytes in {} chunks", response.len(), chunks.len());

    let print_events = options.events && !options.json;
    let count = drive(
        &mut parser,
        &mut workbench,
        futures::stream::iter(chunks),
        |event| {
            if print_events {
                print_event(event);
            }
        },
    )
    .await
    .context("Failed to route parser events")?;

    workbench.settled().await;
    info!("Replay finished: {} events in {:?}", count, start.elapsed());

    if options.json {
        println!("{}", serde_json::to_string_pretty(&workbench.snapshot())?);
        return Ok(());
    }

    print_report(&workbench);
    Ok(())
}

fn print_event(event: &ParseEvent) {
    match event {
        ParseEvent::Text { text } => {
            let text = text.trim();
            if !text.is_empty() {
                println!("{}", text.dimmed());
            }
        }
        ParseEvent::ArtifactOpen { artifact } => {
            println!("📦 {} {}", artifact.id.cyan().bold(), artifact.title);
        }
        ParseEvent::ActionOpen {
            action_id, action, ..
        } => {
            println!("   ▶ {} {}", action_id.cyan(), describe(action));
        }
        ParseEvent::ActionUpdate { .. } => {}
        ParseEvent::ActionClose {
            action_id, action, ..
        } => {
            println!(
                "   ■ {} {}",
                action_id.cyan(),
                format!("closed, {} bytes", action.content().len()).dimmed()
            );
        }
        ParseEvent::ArtifactClose { artifact_id } => {
            println!("📦 {} {}", artifact_id.cyan(), "closed".dimmed());
        }
        ParseEvent::Error { error } => {
            println!("{} {}", "⚠️  Parse error:".yellow(), error);
        }
    }
}

fn print_report(workbench: &Workbench) {
    println!();
    for artifact in workbench.artifacts() {
        let state = if artifact.closed() { "closed" } else { "open" };
        println!(
            "📦 {} - {} {}",
            artifact.id().cyan().bold(),
            artifact.title(),
            format!("({})", state).dimmed()
        );
        for action in artifact.runner().snapshot() {
            println!("{}", action_line(&action));
        }
    }

    println!();
    println!(
        "{} {}",
        "🗂  Files".yellow(),
        format!("({})", workbench.files().files_count()).dimmed()
    );
    for snapshot in workbench.files().entries() {
        match snapshot.entry {
            FileEntry::Folder => println!("   {}/", snapshot.path.to_string().blue()),
            FileEntry::File(file) => println!(
                "   {} {}",
                snapshot.path,
                format!("{} bytes", file.content.len()).dimmed()
            ),
        }
    }

    let diagnostics = workbench.diagnostics();
    if !diagnostics.is_empty() {
        println!();
        println!("{}", "⚠️  Diagnostics".yellow());
        for diagnostic in diagnostics {
            println!("   {}", diagnostic);
        }
    }

    let duplicates = workbench.files().duplicate_groups();
    if !duplicates.is_empty() {
        println!();
        println!("{}", "🔁 Identical files".yellow());
        for group in duplicates {
            let paths: Vec<String> = group.iter().map(ToString::to_string).collect();
            println!("   {}", paths.join(", "));
        }
    }

    if !workbench.parse_errors().is_empty() {
        println!();
        println!("{}", "❌ Parse errors".red());
        for error in workbench.parse_errors() {
            println!("   {}", error);
        }
    }
}

fn describe(action: &ParsedAction) -> String {
    match action {
        ParsedAction::File { file_path, .. } => format!("file {}", file_path),
        ParsedAction::Shell { content } => {
            let command = content.lines().next().unwrap_or("");
            format!("shell {}", command)
        }
    }
}

fn status_icon(status: &ActionStatus) -> ColoredString {
    match status {
        ActionStatus::Pending => "…".dimmed(),
        ActionStatus::Running => "⏳".normal(),
        ActionStatus::Complete => "✅".green(),
        ActionStatus::Aborted => "⏹".yellow(),
        ActionStatus::Failed { .. } => "❌".red(),
    }
}

fn action_line(action: &ActionSnapshot) -> String {
    let mut line = format!(
        "   {} {} {}",
        status_icon(&action.status),
        action.id,
        describe(&action.action)
    );
    if let Some(error) = action.status.error() {
        line.push_str(&format!(" - {}", error.red()));
    }
    line
}
