// ai
//! 🚀 edgelog: the front door for humans with a terminal and a backlog.
//!
//! 🎬 *[narrator voice]* "Six months of CDN logs. Zero of them queryable. One CLI."
//!
//! 📦 Thin wrapper: parse args, set up logging, load config, hand off to the
//! library. Subcommands:
//! - `backfill`: list a bucket and print or fire one invocation per batch
//! - `process`: run the per-object pipeline on a single S3 object
//! - `transform`: same reshaping, local files, no cloud involved
//! - `dest-key`: show where an object would land. Cheap, offline, honest. 🦆

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use edgelog::app_config::{AppConfig, BackfillAction, config_figment, extract_config};
use edgelog::keys::SourceObjectKey;
use edgelog::process::transform_local_file;
use edgelog::progress::summary_table;
use figment::providers::Serialized;
use serde::Serialize;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// 📜 Default config file, only used when it actually exists.
const DEFAULT_CONFIG_FILE: &str = "edgelog.toml";

#[derive(Debug, Parser)]
#[command(name = "edgelog", version, about = "CDN edge logs in, date-partitioned JSON lines out")]
struct Cli {
    /// TOML config file. Falls back to ./edgelog.toml when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List every object under a prefix and dispatch them in batches.
    Backfill(BackfillArgs),
    /// Transform one S3 object into the destination bucket.
    Process(ProcessArgs),
    /// Transform a local log file (gzip if it ends in .gz) into a local output file.
    Transform {
        input: PathBuf,
        output: PathBuf,
    },
    /// Print the destination key for one or more source object names.
    DestKey {
        #[arg(required = true)]
        names: Vec<String>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ActionArg {
    /// Print each batch as `function([keys])` on stdout.
    Print,
    /// Fire one async invocation per batch.
    Index,
}

impl From<ActionArg> for BackfillAction {
    fn from(action: ActionArg) -> Self {
        match action {
            ActionArg::Print => BackfillAction::Print,
            ActionArg::Index => BackfillAction::Index,
        }
    }
}

#[derive(Debug, clap::Args)]
struct BackfillArgs {
    #[arg(long)]
    bucket: Option<String>,
    #[arg(long)]
    prefix: Option<String>,
    #[arg(long)]
    batch_size: Option<usize>,
    #[arg(long, value_enum)]
    action: Option<ActionArg>,
    #[arg(long)]
    function_name: Option<String>,
    /// Concurrent invocations. Print mode always runs with one.
    #[arg(long)]
    parallelism: Option<usize>,
    /// Keys per listing page, at most 1000.
    #[arg(long)]
    page_size: Option<usize>,
    #[arg(long)]
    region: Option<String>,
    /// Hide the spinner even on a terminal.
    #[arg(long)]
    no_progress: bool,
}

#[derive(Debug, clap::Args)]
struct ProcessArgs {
    #[arg(long)]
    bucket: String,
    #[arg(long)]
    key: String,
    #[arg(long)]
    dest_bucket: Option<String>,
    #[arg(long)]
    region: Option<String>,
}

/// 🧅 The outermost config layer: only what was actually typed on the command line.
#[derive(Debug, Default, Serialize)]
struct CliOverrides {
    #[serde(skip_serializing_if = "BackfillOverrides::is_empty")]
    backfill: BackfillOverrides,
    #[serde(skip_serializing_if = "ProcessOverrides::is_empty")]
    process: ProcessOverrides,
}

#[derive(Debug, Default, Serialize)]
struct BackfillOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    bucket: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    batch_size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    action: Option<BackfillAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dispatch_parallelism: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    page_size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    region: Option<String>,
}

impl BackfillOverrides {
    fn is_empty(&self) -> bool {
        self.bucket.is_none()
            && self.prefix.is_none()
            && self.batch_size.is_none()
            && self.action.is_none()
            && self.function_name.is_none()
            && self.dispatch_parallelism.is_none()
            && self.page_size.is_none()
            && self.region.is_none()
    }
}

#[derive(Debug, Default, Serialize)]
struct ProcessOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    dest_bucket: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    region: Option<String>,
}

impl ProcessOverrides {
    fn is_empty(&self) -> bool {
        self.dest_bucket.is_none() && self.region.is_none()
    }
}

impl From<&BackfillArgs> for BackfillOverrides {
    fn from(args: &BackfillArgs) -> Self {
        Self {
            bucket: args.bucket.clone(),
            prefix: args.prefix.clone(),
            batch_size: args.batch_size,
            action: args.action.map(BackfillAction::from),
            function_name: args.function_name.clone(),
            dispatch_parallelism: args.parallelism,
            page_size: args.page_size,
            region: args.region.clone(),
        }
    }
}

/// 🔍 Explicit `--config` must exist. The default file is optional.
fn resolve_config_file(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
    match explicit {
        Some(path) => {
            let the_file_is_there = path.try_exists().with_context(|| {
                format!("💀 Couldn't check whether the config file exists: '{}'", path.display())
            })?;
            if !the_file_is_there {
                anyhow::bail!(
                    "💀 Config file '{}' does not exist. Relative paths are resolved from the current directory; an absolute path removes the guesswork.",
                    path.display()
                );
            }
            Ok(Some(path.to_path_buf()))
        }
        None => {
            let the_default = Path::new(DEFAULT_CONFIG_FILE);
            Ok(the_default.is_file().then(|| the_default.to_path_buf()))
        }
    }
}

/// 🔧 env, then TOML, then whatever was typed on the command line.
fn load_with_overrides(config_file: Option<&Path>, overrides: &CliOverrides) -> Result<AppConfig> {
    let the_figment = config_figment(config_file).merge(Serialized::defaults(overrides));
    extract_config(the_figment, config_file)
}

async fn run(cli: Cli) -> Result<()> {
    let the_config_file = resolve_config_file(cli.config.as_deref())?;

    match cli.command {
        Command::Backfill(args) => {
            let overrides = CliOverrides {
                backfill: BackfillOverrides::from(&args),
                ..Default::default()
            };
            let app_config = load_with_overrides(the_config_file.as_deref(), &overrides)?;
            let the_start = Instant::now();
            let summary = edgelog::run_backfill(&app_config, !args.no_progress).await?;

            eprintln!("{}", summary_table(&summary, the_start.elapsed()));
            if !summary.is_clean() {
                anyhow::bail!(
                    "💀 {} of {} batches failed to dispatch",
                    summary.failed.len(),
                    summary.batches_built
                );
            }
            info!("🏁 backfill complete");
        }
        Command::Process(args) => {
            let overrides = CliOverrides {
                process: ProcessOverrides {
                    dest_bucket: args.dest_bucket.clone(),
                    region: args.region.clone(),
                },
                ..Default::default()
            };
            let app_config = load_with_overrides(the_config_file.as_deref(), &overrides)?;
            let report = edgelog::run_process(&app_config, &args.bucket, &args.key).await?;
            println!(
                "{}",
                serde_json::to_string(&report).context("💀 couldn't serialize the report")?
            );
        }
        Command::Transform { input, output } => {
            let stats = transform_local_file(&input, &output)?;
            info!(
                "✅ {} rows read, {} records written, {} skipped → {}",
                stats.rows_read,
                stats.records_emitted,
                stats.rows_skipped,
                output.display()
            );
        }
        Command::DestKey { names } => {
            let mut the_bad_ones = 0usize;
            for name in &names {
                match SourceObjectKey::parse(name) {
                    Ok(key) => println!("{name}\t{}", key.destination_key()),
                    Err(err) => {
                        the_bad_ones += 1;
                        warn!("⚠️  {err}");
                    }
                }
            }
            if the_bad_ones > 0 {
                anyhow::bail!("💀 {the_bad_ones} of {} names could not be parsed", names.len());
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    // -- 📡 logs to stderr; stdout belongs to print-mode batches and reports
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        error!("💀 error: {}", err);
        // -- 🧅 peel the onion, one layer at a time
        let mut the_vibes_are_giving_connection_issues = false;
        let mut the_vibes_are_giving_credential_issues = false;
        for cause in err.chain().skip(1) {
            error!("⚠️  cause: {}", cause);
            let cause_str = cause.to_string();
            if cause_str.contains("dispatch failure")
                || cause_str.contains("connection refused")
                || cause_str.contains("Connection refused")
                || cause_str.contains("dns error")
                || cause_str.contains("timed out")
            {
                the_vibes_are_giving_connection_issues = true;
            }
            if cause_str.contains("credentials")
                || cause_str.contains("ExpiredToken")
                || cause_str.contains("AccessDenied")
            {
                the_vibes_are_giving_credential_issues = true;
            }
        }

        if the_vibes_are_giving_credential_issues {
            error!(
                "🔧 hint: AWS said no. Check AWS_PROFILE / AWS_ACCESS_KEY_ID, run `aws sts get-caller-identity`, \
                and make sure the role can list the source bucket and invoke the function."
            );
        }
        if the_vibes_are_giving_connection_issues {
            error!(
                "🔧 hint: looks like AWS isn't reachable from here. Check the region (--region or AWS_REGION), \
                any proxy settings, and whether you're on the VPN. Even clouds need a nudge sometimes. ☕"
            );
        }

        std::process::exit(1);
    }
}
