use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use date_renamer_core::{
    app_paths, collect_media_files, format_placeholders, load_config, preview_folder, save_config,
    AppConfig, BatchSummary, NamingPattern, NamingSettings, OperationJournal, PreviewRow,
    RenameError, RenameManager, ScanOptions, TimestampResolver, UndoSummary,
};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "date-renamer")]
#[command(about = "Rename photos and videos after the date they were taken")]
struct Cli {
    /// Log adapter decisions (same as RUST_LOG=debug).
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Show planned names without changing anything.
    Preview(PreviewArgs),
    /// Rename files; dry-run unless --apply is given.
    Rename(RenameArgs),
    /// Interactive loop with undo for the lifetime of the session.
    Session(NamingArgs),
    /// List the date format placeholders.
    Tokens,
    Config(ConfigArgs),
}

#[derive(Debug, Args)]
struct ConfigArgs {
    #[command(subcommand)]
    action: ConfigAction,
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    Show,
    /// Write the current settings (defaults when no file exists) to the config file.
    Init,
}

#[derive(Debug, Args)]
struct NamingArgs {
    folder: PathBuf,
    #[arg(long)]
    format: Option<String>,
    #[arg(long)]
    prefix: Option<String>,
    #[arg(long)]
    suffix: Option<String>,
    #[arg(long, value_enum)]
    pattern: Option<PatternArg>,
    /// Use file system times when no metadata is found.
    #[arg(long, default_value_t = false, conflicts_with = "no_fallback")]
    fallback: bool,
    /// Never use file system times, even if the config file enables them.
    #[arg(long, default_value_t = false)]
    no_fallback: bool,
    #[arg(long, default_value_t = false)]
    recursive: bool,
    #[arg(long, default_value_t = false)]
    include_hidden: bool,
    #[arg(long, default_value_t = false)]
    no_exiftool: bool,
}

#[derive(Debug, Args)]
struct PreviewArgs {
    #[command(flatten)]
    naming: NamingArgs,
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,
}

#[derive(Debug, Args)]
struct RenameArgs {
    #[command(flatten)]
    naming: NamingArgs,
    #[arg(long, default_value_t = false)]
    apply: bool,
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PatternArg {
    DateOnly,
    DatePlusOriginal,
    OriginalOnly,
    OriginalPlusDate,
}

impl From<PatternArg> for NamingPattern {
    fn from(value: PatternArg) -> Self {
        match value {
            PatternArg::DateOnly => Self::DateOnly,
            PatternArg::DatePlusOriginal => Self::DatePlusOriginal,
            PatternArg::OriginalOnly => Self::OriginalOnly,
            PatternArg::OriginalPlusDate => Self::OriginalPlusDate,
        }
    }
}

/// Config file values with command-line overrides applied.
struct RunContext {
    config: AppConfig,
    folder: PathBuf,
    settings: NamingSettings,
    scan: ScanOptions,
}

impl RunContext {
    fn new(args: &NamingArgs) -> Result<Self> {
        let mut config = load_config()?;
        if args.no_exiftool {
            config.exiftool = date_renamer_core::ExifToolSetting::Off;
        }
        let mut settings = config.naming_settings();
        if let Some(format) = &args.format {
            settings.format_str = format.clone();
        }
        if let Some(prefix) = &args.prefix {
            settings.prefix = prefix.clone();
        }
        if let Some(suffix) = &args.suffix {
            settings.suffix = suffix.clone();
        }
        if let Some(pattern) = args.pattern {
            settings.pattern = pattern.into();
        }
        settings.use_filesystem_fallback = fallback_override(
            settings.use_filesystem_fallback,
            args.fallback,
            args.no_fallback,
        );

        let scan = ScanOptions {
            recursive: args.recursive || config.recursive_default,
            include_hidden: args.include_hidden || config.include_hidden_default,
        };
        Ok(Self {
            config,
            folder: args.folder.clone(),
            settings,
            scan,
        })
    }

    fn resolver(&self) -> TimestampResolver {
        TimestampResolver::new(&self.config.resolver_options())
    }

    fn files(&self) -> Result<Vec<PathBuf>> {
        let (files, stats) = collect_media_files(&self.folder, &self.scan)?;
        eprintln!(
            "scanned={} media={} non_media_skip={} hidden_skip={}",
            stats.scanned_files, stats.media_files, stats.skipped_non_media, stats.skipped_hidden
        );
        Ok(files)
    }

    fn preview(&self, resolver: &TimestampResolver) -> Result<Vec<PreviewRow>> {
        let files = self.files()?;
        Ok(preview_folder(
            resolver,
            &self.folder,
            &files,
            &self.settings,
            self.config.parallel_scan,
        )?)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Preview(args) => cmd_preview(args),
        Commands::Rename(args) => cmd_rename(args),
        Commands::Session(args) => cmd_session(args),
        Commands::Tokens => {
            cmd_tokens();
            Ok(())
        }
        Commands::Config(config) => match config.action {
            ConfigAction::Show => cmd_config_show(),
            ConfigAction::Init => cmd_config_init(),
        },
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn open_manager(ctx: &RunContext) -> RenameManager {
    let manager = RenameManager::new(ctx.resolver());
    let journal = app_paths().and_then(|paths| {
        OperationJournal::open(&paths.journal_path)
            .with_context(|| format!("cannot open {}", paths.journal_path.display()))
    });
    match journal {
        Ok(journal) => manager.with_journal(journal),
        Err(err) => {
            warn!(error = %err, "operation journal disabled");
            manager
        }
    }
}

fn cmd_preview(args: PreviewArgs) -> Result<()> {
    let ctx = RunContext::new(&args.naming)?;
    let rows = ctx.preview(&ctx.resolver())?;
    match args.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
        OutputFormat::Table => print_preview(&rows),
    }
    Ok(())
}

fn cmd_rename(args: RenameArgs) -> Result<()> {
    let ctx = RunContext::new(&args.naming)?;

    if !args.apply {
        let rows = ctx.preview(&ctx.resolver())?;
        match args.output {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
            OutputFormat::Table => print_preview(&rows),
        }
        eprintln!("dry run: no files were changed. Pass --apply to rename.");
        return Ok(());
    }

    let mut manager = open_manager(&ctx);
    let files = ctx.files()?;
    let summary = manager.run_batch(&ctx.folder, &files, &ctx.settings)?;
    manager.close();
    match args.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        OutputFormat::Table => print_batch(&summary),
    }
    Ok(())
}

fn cmd_session(args: NamingArgs) -> Result<()> {
    let ctx = RunContext::new(&args)?;
    let mut manager = open_manager(&ctx);
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    println!("commands: preview, rename, undo, depth, quit");
    loop {
        print!("date-renamer> ");
        stdout.flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        match line.trim() {
            "" => {}
            "preview" => report(ctx.preview(manager.resolver()).map(|rows| print_preview(&rows))),
            "rename" => report(ctx.files().and_then(|files| {
                let summary = manager.run_batch(&ctx.folder, &files, &ctx.settings)?;
                print_batch(&summary);
                Ok(())
            })),
            "undo" => match manager.undo_last() {
                Ok(summary) => print_undo(&summary),
                Err(RenameError::NothingToUndo) => println!("nothing to undo"),
                Err(err) => eprintln!("error: {err}"),
            },
            "depth" => println!("undo depth: {}", manager.history_depth()),
            "quit" | "exit" => break,
            other => println!("unknown command: {other}"),
        }
    }

    manager.close();
    Ok(())
}

fn report(result: Result<()>) {
    if let Err(err) = result {
        eprintln!("error: {err:#}");
    }
}

fn cmd_tokens() {
    for (token, description) in format_placeholders() {
        println!("{token:<4} {description}");
    }
}

fn cmd_config_show() -> Result<()> {
    let config = load_config()?;
    let paths = app_paths()?;
    println!("config file: {}", paths.config_path.display());
    println!("operation log: {}", paths.journal_path.display());
    println!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let config = load_config()?;
    let paths = app_paths()?;
    save_config(&config)?;
    println!("wrote {}", paths.config_path.display());
    Ok(())
}

fn fallback_override(configured: bool, fallback: bool, no_fallback: bool) -> bool {
    if no_fallback {
        false
    } else {
        configured || fallback
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|v| v.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

fn print_preview(rows: &[PreviewRow]) {
    println!("original -> new (source)");
    for row in rows {
        let source = row.source.map(|s| s.label()).unwrap_or("-");
        match &row.note {
            Some(note) => println!("{} -> error: {note}", row.path.display()),
            None => println!("{} -> {} ({source})", row.path.display(), row.preview),
        }
    }
}

fn print_batch(summary: &BatchSummary) {
    for pair in &summary.renamed {
        println!(
            "renamed: {} -> {}",
            pair.original.display(),
            display_name(&pair.renamed)
        );
    }
    for skipped in &summary.skipped {
        println!("skipped: {} ({})", skipped.path.display(), skipped.reason);
    }
    for fault in &summary.errors {
        println!("error: {}: {}", fault.path.display(), fault.reason);
    }
    println!(
        "\nrenamed={} skipped={} errors={}{}",
        summary.renamed.len(),
        summary.skipped.len(),
        summary.errors.len(),
        if summary.cancelled { " (cancelled)" } else { "" }
    );
}

fn print_undo(summary: &UndoSummary) {
    for pair in &summary.restored {
        println!(
            "restored: {} -> {}",
            display_name(&pair.renamed),
            pair.original.display()
        );
    }
    for fault in &summary.errors {
        println!("undo error: {}: {}", fault.pair.renamed.display(), fault.kind);
    }
    println!(
        "\nrestored={} errors={}",
        summary.restored.len(),
        summary.errors.len()
    );
}

#[cfg(test)]
mod tests {
    use super::{fallback_override, Cli, Commands};
    use clap::Parser;

    #[test]
    fn no_fallback_overrides_config() {
        assert!(!fallback_override(true, false, true));
        assert!(fallback_override(true, false, false));
        assert!(fallback_override(false, true, false));
        assert!(!fallback_override(false, false, false));
    }

    #[test]
    fn fallback_flags_conflict() {
        let parsed = Cli::try_parse_from(["date-renamer", "preview", ".", "--fallback", "--no-fallback"]);
        assert!(parsed.is_err());

        let cli = Cli::try_parse_from(["date-renamer", "rename", "photos", "--no-fallback"])
            .expect("parse");
        match cli.command {
            Commands::Rename(args) => {
                assert!(args.naming.no_fallback);
                assert!(!args.naming.fallback);
                assert!(!args.apply);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
