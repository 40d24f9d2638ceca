//! CLI entry point for regex working sets.
//!
//! This binary validates rule text, previews the files a group would hold,
//! and keeps groups current while a workspace changes.
//!
//! # Usage
//!
//! ```bash
//! rws [OPTIONS] <COMMAND>
//!
//! # Check rule text before saving it
//! rws validate 'src/.*\.txt'
//!
//! # Preview a group, or every group in the config file
//! rws scan --root ./workspace --rules 'src/.*\.txt'
//! rws scan --config groups.json --format json
//!
//! # Keep groups current until Ctrl-C
//! rws watch --config groups.json
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

use std::io::Write;
use std::sync::Arc;

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{WrapErr, eyre};
use rws_core::{Config, GroupConfig, ResourcePath};
use rws_engine::{FsWorkspace, SharedWorkingSet, WorkingSet, WorkingSetUpdater, collect_matches};
use rws_watcher::{FileWatcher, SkipDirsFilter};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// CLI ARGUMENT TYPES
// =============================================================================

/// Maintain file groups defined by include/exclude regular expressions.
///
/// Rules are one per line: a plain line includes paths it matches, a line
/// starting with `-` excludes them and a line starting with `#` is a comment.
/// The last rule written that matches a path decides.
#[derive(Parser)]
#[command(name = "rws", version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    command: Commands,

    /// Workspace root directory (overrides the config file).
    #[arg(short, long, global = true, env = "RWS_ROOT")]
    root: Option<Utf8PathBuf>,

    /// JSON configuration file.
    #[arg(short, long, global = true, env = "RWS_CONFIG")]
    config: Option<Utf8PathBuf>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Check rule text and report the first problem.
    Validate {
        /// Rule text, one rule per line.
        rules: String,
    },

    /// List the files a group matches right now.
    Scan {
        /// Rule text to preview (defaults to every configured group).
        #[arg(long, conflicts_with = "rules_file")]
        rules: Option<String>,

        /// File holding the rule text to preview.
        #[arg(long)]
        rules_file: Option<Utf8PathBuf>,

        /// Output format.
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Keep groups current while the workspace changes.
    Watch {
        /// Extra group rule text; may be repeated.
        #[arg(long)]
        rules: Vec<String>,
    },
}

/// Scan output format.
#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// One path per line, grouped by label.
    Text,
    /// JSON array of groups.
    Json,
}

// =============================================================================
// INITIALIZATION FUNCTIONS
// =============================================================================

/// Initializes the tracing subscriber for logging.
///
/// Respects `RUST_LOG` if set. Otherwise uses `debug` with `--verbose` and
/// `info` by default, with `notify` kept at `warn`.
fn init_tracing(verbose: bool, no_color: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if verbose { "debug" } else { "info" };
        EnvFilter::new(format!("{level},notify=warn,notify_debouncer_mini=warn"))
    });

    let use_ansi = !no_color && std::env::var("NO_COLOR").is_err();

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(use_ansi)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

/// Builds the [`Config`] from the config file and CLI overrides.
///
/// # Errors
///
/// Returns an error if the config file cannot be read, or if the resulting
/// configuration is invalid.
fn build_config(cli: &Cli) -> color_eyre::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path).wrap_err_with(|| format!("Failed to load {path}"))?,
        None => Config::default(),
    };
    if let Some(root) = &cli.root {
        config.workspace.root.clone_from(root);
    }
    config.validate()?;
    config.workspace.ensure_root()?;
    config.workspace.root = config.workspace.root.canonicalize_utf8()?;
    Ok(config)
}

/// Creates the filesystem workspace described by the configuration.
fn create_workspace(config: &Config) -> color_eyre::Result<FsWorkspace> {
    FsWorkspace::from_config(&config.workspace)
        .map_err(|e| eyre!("Failed to open workspace: {e}"))
}

/// Groups from the config file followed by groups given on the command line.
fn collect_groups(config: &Config, extra_rules: &[String]) -> Vec<GroupConfig> {
    config
        .groups
        .iter()
        .cloned()
        .chain(extra_rules.iter().map(|rules| GroupConfig {
            label: String::new(),
            rules: rules.clone(),
        }))
        .collect()
}

// =============================================================================
// COMMAND IMPLEMENTATIONS
// =============================================================================

/// Validates rule text.
///
/// # Errors
///
/// Returns the validation message as an error when the text is invalid.
fn run_validate(rules: &str) -> color_eyre::Result<()> {
    match rws_rules::validate(rules) {
        Ok(count) => {
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            writeln!(handle, "ok ({count} rules)")?;
            Ok(())
        }
        Err(err) => Err(eyre!("{err}")),
    }
}

/// One group in scan output.
#[derive(serde::Serialize)]
struct ScanOutput {
    label: String,
    rules: String,
    matches: Vec<ResourcePath>,
}

/// Runs a full rescan and prints the matching items.
///
/// # Errors
///
/// Returns an error if the workspace cannot be walked or rules don't compile.
fn run_scan(
    config: &Config,
    rules: Option<&str>,
    rules_file: Option<&Utf8PathBuf>,
    format: OutputFormat,
) -> color_eyre::Result<()> {
    let groups = match (rules, rules_file) {
        (Some(rules), _) => vec![GroupConfig {
            label: String::new(),
            rules: rules.to_owned(),
        }],
        (None, Some(path)) => vec![GroupConfig {
            label: path.to_string(),
            rules: std::fs::read_to_string(path)
                .wrap_err_with(|| format!("Failed to read {path}"))?,
        }],
        (None, None) => collect_groups(config, &[]),
    };
    if groups.is_empty() {
        return Err(eyre!("No rules given and no groups configured"));
    }

    info!(root = %config.workspace.root, groups = groups.len(), "Starting scan");
    let workspace = create_workspace(config)?;

    let mut outputs = Vec::with_capacity(groups.len());
    for group in groups {
        rws_rules::validate(&group.rules)?;
        let matches = collect_matches(&workspace, &group.rules)?;
        let label = if group.label.is_empty() {
            rws_core::group_name(&group.rules)
        } else {
            group.label
        };
        outputs.push(ScanOutput {
            label,
            rules: group.rules,
            matches,
        });
    }

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut handle, &outputs)?;
            writeln!(handle)?;
        }
        OutputFormat::Text => {
            for output in &outputs {
                writeln!(handle, "{} ({} matches)", output.label, output.matches.len())?;
                for path in &output.matches {
                    writeln!(handle, "  {path}")?;
                }
            }
        }
    }
    Ok(())
}

/// Registers groups, commits them, and applies watcher batches until stopped.
///
/// # Errors
///
/// Returns an error if the workspace or watcher cannot be started.
async fn run_watch(config: Config, extra_rules: &[String]) -> color_eyre::Result<()> {
    let groups = collect_groups(&config, extra_rules);
    if groups.is_empty() {
        return Err(eyre!("No groups to watch; pass --rules or configure groups"));
    }

    let updater = WorkingSetUpdater::new(create_workspace(&config)?)
        .with_metadata_file_name(config.workspace.metadata_file_name.clone());

    let mut working_sets = Vec::with_capacity(groups.len());
    for group in &groups {
        let working_set = SharedWorkingSet::new(&group.rules).with_label(group.label.clone());
        let name = updater.add(Arc::new(working_set.clone()));
        match updater.commit(&name) {
            Ok(_) => info!(
                group = %working_set.label(),
                members = working_set.elements().len(),
                "Group ready"
            ),
            Err(err) => tracing::warn!(group = %working_set.label(), error = %err, "Group not committed"),
        }
        working_sets.push(working_set);
    }

    let filter = SkipDirsFilter::from_names(&config.workspace.skip_dirs);
    let mut watcher = FileWatcher::new(&config.workspace.root, &config.watch, filter).await?;
    info!(root = %watcher.watch_path(), groups = working_sets.len(), "Watching workspace");

    #[cfg(unix)]
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

    loop {
        #[cfg(unix)]
        let terminate = sigterm.recv();
        #[cfg(not(unix))]
        let terminate = std::future::pending::<Option<()>>();

        tokio::select! {
            batch = watcher.recv() => {
                let Some(batch) = batch else {
                    tracing::warn!("Watcher stopped");
                    break;
                };
                let before: Vec<usize> = working_sets.iter().map(SharedWorkingSet::publish_count).collect();
                let report = updater.process(&batch);
                for (working_set, count) in working_sets.iter().zip(before) {
                    if working_set.publish_count() != count {
                        info!(
                            group = %working_set.label(),
                            members = working_set.elements().len(),
                            "Group updated"
                        );
                    }
                }
                if let Some(err) = &report.aborted {
                    tracing::warn!(error = %err, "Batch only partially applied");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl-C, shutting down");
                break;
            }
            _ = terminate => {
                info!("Received SIGTERM, shutting down");
                break;
            }
        }
    }

    watcher.shutdown().await?;
    Ok(())
}

// =============================================================================
// MAIN ENTRY POINT
// =============================================================================

/// Application entry point.
#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.no_color);

    match &cli.command {
        Commands::Validate { rules } => run_validate(rules),
        Commands::Scan {
            rules,
            rules_file,
            format,
        } => {
            let config = build_config(&cli)?;
            run_scan(&config, rules.as_deref(), rules_file.as_ref(), *format)
        }
        Commands::Watch { rules } => {
            let config = build_config(&cli)?;
            run_watch(config, rules).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_scan_flags_parse() {
        let cli = Cli::try_parse_from(["rws", "--root", "/tmp", "scan", "--rules", "src/", "-f", "json"])
            .unwrap();
        assert_eq!(cli.root.as_deref().map(camino::Utf8Path::as_str), Some("/tmp"));
        assert!(matches!(
            cli.command,
            Commands::Scan { rules: Some(_), format: OutputFormat::Json, .. }
        ));
    }

    #[test]
    fn test_watch_accepts_repeated_rules() {
        let cli = Cli::try_parse_from(["rws", "watch", "--rules", "a", "--rules", "b"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Watch { ref rules } if rules == &["a", "b"]
        ));
    }

    #[test]
    fn test_collect_groups_appends_cli_rules() {
        let mut config = Config::default();
        config.groups.push(GroupConfig {
            label: "Sources".to_owned(),
            rules: "src/".to_owned(),
        });
        let groups = collect_groups(&config, &["docs/".to_owned()]);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[1].rules, "docs/");
        assert!(groups[1].label.is_empty());
    }

    #[test]
    fn test_validate_reports_message() {
        let err = run_validate("(").unwrap_err();
        assert!(err.to_string().starts_with("Regular expression syntax (line 1)"));
    }
}
