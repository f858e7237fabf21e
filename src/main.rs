use anyhow::Context;
use chrono::Local;
use clap::{Parser, Subcommand};
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use hookwright::config::{resolve_project_root, HooksConfig};
use hookwright::context::{ContextUpdater, UpdateOutcome, UpdaterSettings};
use hookwright::hook::{guarded, HookInput, HookOutcome};
use hookwright::hooks::{self, HookContext};
use hookwright::sections::SectionUpdater;

#[derive(Parser, Debug)]
#[command(
    name = "hookwright",
    about = "Editor tool-use hooks and CLAUDE.md context updater",
    version
)]
struct Args {
    /// Project root (defaults to $CLAUDE_PROJECT_DIR, then the current directory)
    #[arg(long, global = true)]
    project_root: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Regenerate the dynamic region of CLAUDE.md from the context plugins
    UpdateContext,
    /// Regenerate the named START_SECTION/END_SECTION blocks of CLAUDE.md
    UpdateSections,
    /// PreToolUse: block edits to critical files, warn on sensitive ones
    Protect,
    /// PostToolUse: prettier, eslint --fix and a quick tsc check
    Format,
    /// PostToolUse: cached parallel eslint/prettier/tsc
    Lint,
    /// PostToolUse: suggest documentation updates for a change
    DocsTrack,
    /// PostToolUse: TypeScript strictness heuristics
    StrictTs,
    /// PreToolUse: keep edits inside monorepo workspace boundaries
    MonorepoGuard,
    /// PostToolUse: migration reminder for schema edits
    MigrationCheck,
    /// PostToolUse: flag media served from outside the CDN
    AssetCheck,
    /// SessionStart: project dashboard
    SessionStart,
}

fn open_log_file(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Stderr logging filtered by `RUST_LOG` (default `warn`), plus an optional
/// info-level file log for the document updaters.
fn init_tracing(log_file: Option<&Path>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let stderr_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .with_filter(filter);

    let file_layer = log_file
        .and_then(|path| open_log_file(path).ok())
        .map(|file| {
            fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_filter(LevelFilter::INFO)
        });

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .init();
}

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

/// Read the payload, run one edit hook behind the error guard, print its report.
fn run_hook(
    name: &str,
    root: &Path,
    hook: fn(&HookInput, &HookContext) -> anyhow::Result<HookOutcome>,
) -> ExitCode {
    let Some(input) = HookInput::from_reader(io::stdin().lock()) else {
        return ExitCode::SUCCESS;
    };
    let ctx = HookContext::load(root);
    emit(guarded(name, || hook(&input, &ctx)))
}

fn emit(outcome: HookOutcome) -> ExitCode {
    if !outcome.report.is_empty() {
        println!("{}", outcome.report);
    }
    exit_code(outcome.exit_code)
}

fn update_context(root: &Path) -> ExitCode {
    let settings = UpdaterSettings::for_root(root);
    tracing::info!("Context update started for {}", root.display());

    let mut updater = ContextUpdater::new(settings);
    match updater.update() {
        Ok(UpdateOutcome::Written) => {
            println!("✅ CLAUDE.md context updated");
            ExitCode::SUCCESS
        }
        Ok(UpdateOutcome::Unchanged) => {
            println!("CLAUDE.md context already up to date");
            ExitCode::SUCCESS
        }
        Ok(UpdateOutcome::Disabled) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("Context update failed: {:#}", err);
            eprintln!("Error updating context: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn update_sections(root: &Path) -> ExitCode {
    let updater = SectionUpdater::new(root, HooksConfig::load(root));
    match updater.run_update(Local::now()) {
        Ok(true) => {
            println!("✅ CLAUDE.md sections updated");
            ExitCode::SUCCESS
        }
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            tracing::error!("Section update failed: {:#}", err);
            eprintln!("Error updating sections: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    let root = match resolve_project_root(args.project_root).context("Failed to resolve project root") {
        Ok(root) => root,
        Err(err) => {
            eprintln!("{:#}", err);
            return ExitCode::SUCCESS;
        }
    };

    let log_file = match args.command {
        Command::UpdateContext => Some(UpdaterSettings::for_root(&root).log_path),
        Command::UpdateSections => Some(SectionUpdater::log_path(&root)),
        _ => None,
    };
    init_tracing(log_file.as_deref());

    match args.command {
        Command::UpdateContext => update_context(&root),
        Command::UpdateSections => update_sections(&root),
        Command::Protect => run_hook("file protection", &root, hooks::protect::run),
        Command::Format => run_hook("auto formatter", &root, hooks::format::run),
        Command::Lint => run_hook("fast lint", &root, hooks::lint::run),
        Command::DocsTrack => run_hook("documentation tracker", &root, hooks::docs::run),
        Command::StrictTs => run_hook("typescript strict", &root, hooks::strict::run),
        Command::MonorepoGuard => run_hook("monorepo guard", &root, hooks::monorepo::run),
        Command::MigrationCheck => run_hook("migration check", &root, hooks::migration::run),
        Command::AssetCheck => run_hook("asset check", &root, hooks::assets::run),
        Command::SessionStart => {
            let ctx = HookContext::load(&root);
            emit(guarded("session start", || hooks::session::run(&ctx)))
        }
    }
}
