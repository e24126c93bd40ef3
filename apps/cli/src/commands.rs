//! CLI command definitions, routing, and tracing setup.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::Section;
use color_eyre::eyre::{Report, Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use tubekeeper_core::{
    DescriptionUpdater, RunPhase, SnapshotConfig, SnapshotProgress, SnapshotReport,
};
use tubekeeper_section::SectionEditor;
use tubekeeper_shared::{
    AppConfig, TubekeeperError, init_config, init_config_at, load_config, load_config_from,
    validate_credentials,
};
use tubekeeper_storage::Storage;
use tubekeeper_youtube::{VideoSource, YouTubeClient};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// tubekeeper: YouTube description links and metadata backups.
#[derive(Parser)]
#[command(
    name = "tubekeeper",
    version,
    about = "Keep the link section of your YouTube descriptions current and back up video metadata.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Config file (defaults to ~/.tubekeeper/tubekeeper.toml).
    #[arg(long = "config", global = true, env = "TUBEKEEPER_CONFIG")]
    pub config_file: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Show the authenticated channel and its latest upload.
    Channel,

    /// Inspect or rewrite a single video.
    Video {
        #[command(subcommand)]
        action: VideoAction,
    },

    /// Preview or apply the delimited link section of a description.
    Links {
        #[command(subcommand)]
        action: LinksAction,
    },

    /// Snapshot every upload into the local backup database.
    Backup {
        #[command(subcommand)]
        action: BackupAction,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub(crate) enum VideoAction {
    /// Print a video's metadata.
    Show {
        /// Video id.
        id: String,

        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },
    /// Replace the whole description (and optionally title and tags).
    SetDescription {
        /// Video id.
        id: String,

        /// File holding the new description.
        #[arg(short, long)]
        file: PathBuf,

        /// New title.
        #[arg(long)]
        title: Option<String>,

        /// New tags, replacing the existing ones (repeatable).
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
}

#[derive(Subcommand)]
pub(crate) enum LinksAction {
    /// Show the description that `apply` would write.
    Preview {
        /// Video id.
        id: String,

        /// File holding the section content.
        #[arg(short, long, default_value = "description.txt")]
        file: PathBuf,
    },
    /// Write the section content into the video's description.
    Apply {
        /// Video id.
        id: String,

        /// File holding the section content.
        #[arg(short, long, default_value = "description.txt")]
        file: PathBuf,

        /// Skip the confirmation prompt.
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
pub(crate) enum BackupAction {
    /// Back up every upload of the channel.
    Run {
        /// Note stored with the run (defaults to `backup.note`).
        #[arg(long)]
        note: Option<String>,
    },
    /// Show what the backup database holds.
    Stats {
        /// Number of recent runs to list.
        #[arg(long, default_value = "5")]
        runs: u32,

        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "tubekeeper=info",
        1 => "tubekeeper=debug",
        _ => "tubekeeper=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

/// Attach remediation hints to well-known failures.
pub(crate) fn with_hints(report: Report) -> Report {
    let hint = match report.downcast_ref::<TubekeeperError>() {
        Some(err) if err.is_quota_exceeded() => Some(
            "The YouTube Data API quota resets daily (midnight Pacific time). \
             Try again later or request a higher quota for your project.",
        ),
        Some(TubekeeperError::Auth(_)) => Some(
            "Check the OAuth client id, secret and refresh token named in the [auth] config section.",
        ),
        _ => None,
    };

    match hint {
        Some(hint) => report.suggestion(hint),
        None => report,
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config_file;
    match cli.command {
        Command::Channel => cmd_channel(config_path.as_deref()).await,
        Command::Video { action } => match action {
            VideoAction::Show { id, json } => {
                cmd_video_show(config_path.as_deref(), &id, json).await
            }
            VideoAction::SetDescription {
                id,
                file,
                title,
                tags,
            } => {
                cmd_set_description(config_path.as_deref(), &id, &file, title.as_deref(), tags)
                    .await
            }
        },
        Command::Links { action } => match action {
            LinksAction::Preview { id, file } => {
                cmd_links_preview(config_path.as_deref(), &id, &file).await
            }
            LinksAction::Apply { id, file, yes } => {
                cmd_links_apply(config_path.as_deref(), &id, &file, yes).await
            }
        },
        Command::Backup { action } => match action {
            BackupAction::Run { note } => {
                cmd_backup_run(config_path.as_deref(), note.as_deref()).await
            }
            BackupAction::Stats { runs, json } => {
                cmd_backup_stats(config_path.as_deref(), runs, json).await
            }
        },
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(config_path.as_deref()).await,
            ConfigAction::Show => cmd_config_show(config_path.as_deref()).await,
        },
    }
}

// ---------------------------------------------------------------------------
// Shared setup
// ---------------------------------------------------------------------------

fn load(config_path: Option<&Path>) -> Result<AppConfig> {
    let config = match config_path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    Ok(config)
}

/// Load config, check credentials and build the API client.
fn connect(config_path: Option<&Path>) -> Result<(AppConfig, YouTubeClient)> {
    let config = load(config_path)?;
    validate_credentials(&config)?;
    let client = YouTubeClient::from_config(&config)?;
    Ok((config, client))
}

/// Read section content from `path`, trimmed.
fn read_content_file(path: &Path) -> Result<String> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| eyre!("cannot read '{}': {e}", path.display()))?;
    let content = raw.trim().to_string();
    if content.is_empty() {
        return Err(eyre!("'{}' is empty", path.display()));
    }
    Ok(content)
}

/// Read a full description from `path` exactly as written.
///
/// An empty file clears the description; only the trailing newline editors
/// add is dropped.
fn read_description_file(path: &Path) -> Result<String> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| eyre!("cannot read '{}': {e}", path.display()))?;
    let body = raw
        .strip_suffix("\r\n")
        .or_else(|| raw.strip_suffix('\n'))
        .unwrap_or(&raw);
    Ok(body.to_string())
}

fn confirm(question: &str) -> Result<bool> {
    print!("{question} [y/N] ");
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_channel(config_path: Option<&Path>) -> Result<()> {
    let (_config, client) = connect(config_path)?;
    let overview = tubekeeper_core::channel_overview(&client).await?;
    let info = &overview.info;

    println!();
    println!("  Channel:     {}", info.title);
    println!("  ID:          {}", info.id);
    match info.subscriber_count {
        Some(count) => println!("  Subscribers: {count}"),
        None => println!("  Subscribers: hidden"),
    }
    println!("  Videos:      {}", info.video_count);
    if let Some(latest) = &overview.latest {
        println!("  Latest:      {} ({})", latest.title, latest.id);
        println!("  Published:   {}", latest.published_at.format("%Y-%m-%d %H:%M UTC"));
    }
    println!();

    Ok(())
}

async fn cmd_video_show(config_path: Option<&Path>, id: &str, json: bool) -> Result<()> {
    let (_config, client) = connect(config_path)?;
    let video = client
        .get_video(id)
        .await?
        .ok_or_else(|| TubekeeperError::not_found(format!("video {id}")))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&video)?);
        return Ok(());
    }

    println!();
    println!("  Title:     {}", video.title);
    println!("  ID:        {}", video.id);
    println!("  Published: {}", video.published_at.format("%Y-%m-%d %H:%M UTC"));
    println!("  Category:  {}", video.category_id);
    if let Some(lang) = &video.default_language {
        println!("  Language:  {lang}");
    }
    if !video.tags.is_empty() {
        println!("  Tags:      {}", video.tags.join(", "));
    }
    println!();
    println!("{}", video.description);

    Ok(())
}

async fn cmd_set_description(
    config_path: Option<&Path>,
    id: &str,
    file: &Path,
    title: Option<&str>,
    tags: Vec<String>,
) -> Result<()> {
    let (config, client) = connect(config_path)?;
    let editor = SectionEditor::from_config(&config.section)?;
    let body = read_description_file(file)?;
    let tags = (!tags.is_empty()).then_some(tags);

    info!(video_id = id, file = %file.display(), "replacing description");
    let update = DescriptionUpdater::new(&client, &editor)
        .replace_description(id, &body, title, tags)
        .await?;

    println!("Updated video {} ({})", update.id, update.title);
    Ok(())
}

async fn cmd_links_preview(config_path: Option<&Path>, id: &str, file: &Path) -> Result<()> {
    let (config, client) = connect(config_path)?;
    let editor = SectionEditor::from_config(&config.section)?;
    let content = read_content_file(file)?;

    let preview = DescriptionUpdater::new(&client, &editor)
        .preview(id, &content)
        .await?;

    println!("Video: {} ({})", preview.video.title, preview.video.id);
    match &preview.old_section {
        Some(old) => println!("\n--- current section ---\n{old}"),
        None => println!("\n(no section yet, one will be added under policy {})", editor.policy()),
    }
    println!("\n--- new description ---\n{}", preview.new_description);
    if preview.is_unchanged() {
        println!("\nThe description is already up to date.");
    }

    Ok(())
}

async fn cmd_links_apply(
    config_path: Option<&Path>,
    id: &str,
    file: &Path,
    yes: bool,
) -> Result<()> {
    let (config, client) = connect(config_path)?;
    let editor = SectionEditor::from_config(&config.section)?;
    let content = read_content_file(file)?;
    let updater = DescriptionUpdater::new(&client, &editor);

    if !yes {
        let preview = updater.preview(id, &content).await?;
        println!("--- new description ---\n{}\n", preview.new_description);
        if !confirm(&format!("Update \"{}\"?", preview.video.title))? {
            println!("Aborted, nothing was written.");
            return Ok(());
        }
    }

    let applied = updater.apply(id, &content).await?;
    let action = if applied.old_section.is_some() {
        "replaced"
    } else {
        "added"
    };
    println!("Link section {action} on video {}", applied.video_id);
    Ok(())
}

async fn cmd_backup_run(config_path: Option<&Path>, note: Option<&str>) -> Result<()> {
    let (config, client) = connect(config_path)?;
    let db_path = config.backup.resolved_db_path()?;
    let storage = Storage::open(&db_path).await?;

    let mut snapshot_config = SnapshotConfig::from_config(&config.backup);
    if let Some(note) = note {
        snapshot_config.note = note.to_string();
    }

    info!(db = %db_path.display(), "starting backup");
    let reporter = CliProgress::new();
    let result = tubekeeper_core::run_snapshot(&client, &storage, &snapshot_config, &reporter).await;
    reporter.finish();
    let report = result?;

    println!();
    println!("  Backup complete!");
    println!("  Run:      #{}", report.run_id);
    println!("  Videos:   {}", report.total);
    println!("  New:      {}", report.new);
    println!("  Updated:  {}", report.updated);
    if report.errors > 0 {
        println!("  Errors:   {}", report.errors);
    }
    println!("  Database: {}", db_path.display());
    println!("  Time:     {:.1}s", report.elapsed.as_secs_f64());
    println!();

    Ok(())
}

async fn cmd_backup_stats(config_path: Option<&Path>, runs: u32, json: bool) -> Result<()> {
    let config = load(config_path)?;
    let db_path = config.backup.resolved_db_path()?;
    let storage = Storage::open_readonly(&db_path).await?;
    let stats = tubekeeper_core::backup_stats(&storage, runs).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!();
    println!("  Database: {}", db_path.display());
    println!("  Videos:   {}", stats.stored_videos);
    if stats.recent_runs.is_empty() {
        println!("  No backup runs recorded yet.");
    }
    for run in &stats.recent_runs {
        println!(
            "  #{:<4} {}  {} videos ({} new, {} updated)  {}",
            run.id,
            run.timestamp.format("%Y-%m-%d %H:%M"),
            run.videos_count,
            run.new_count,
            run.updated_count,
            run.notes
        );
    }
    println!();

    Ok(())
}

async fn cmd_config_init(config_path: Option<&Path>) -> Result<()> {
    let path = match config_path {
        Some(path) => {
            init_config_at(path)?;
            path.to_path_buf()
        }
        None => init_config()?,
    };
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = load(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }
}

impl SnapshotProgress for CliProgress {
    fn phase(&self, phase: RunPhase) {
        match phase {
            RunPhase::Authenticating => self.spinner.set_message("Authenticating"),
            RunPhase::Listing => self.spinner.set_message("Looking up channel"),
            RunPhase::RunRecorded => self.spinner.set_message("Recording run"),
            _ => {}
        }
    }

    fn batch_stored(&self, processed: u64, expected: u64) {
        self.spinner
            .set_message(format!("Stored {processed}/{expected} videos"));
    }

    fn done(&self, _report: &SnapshotReport) {
        self.spinner.finish_and_clear();
    }
}
