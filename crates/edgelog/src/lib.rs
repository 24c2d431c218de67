// ai
//! 🗂️ edgelog: CDN edge logs in, date-partitioned JSON lines out.
//!
//! Two jobs live here:
//! - the per-object pipeline ([`process`]): parse the name, stream the gzip TSV,
//!   reshape every row into canonical JSON, upload under `date=YYYY-MM-DD/`.
//! - the bulk backfill ([`supervisors`]): list every object under a prefix, batch
//!   them in order, and print or fire one async invocation per batch.
//!
//! The binaries (`edgelog`, `bootstrap`) are thin: config, logging, then one of
//! the entry points below. 🦆

use anyhow::{Context, Result};

pub mod app_config;
pub mod backends;
pub mod errors;
pub mod event;
pub mod keys;
pub mod process;
pub mod progress;
pub mod supervisors;
pub mod transforms;

pub use errors::EdgeLogError;

use crate::app_config::{AppConfig, BackfillAction};
use crate::backends::{InvokerBackend, LambdaInvoker, ListerBackend, S3Backend, StoreBackend};
use crate::process::{ObjectProcessor, ProcessReport};
use crate::supervisors::{BackfillSummary, BackfillSupervisor, Dispatcher, KeyCursor};

/// 🚀 Run a backfill against the real bucket with the configured action.
pub async fn run_backfill(config: &AppConfig, show_progress: bool) -> Result<BackfillSummary> {
    let backfill = &config.backfill;
    backfill
        .validate()
        .context("💀 the [backfill] configuration is not usable")?;
    let the_bucket = backfill.bucket()?;

    let the_dispatcher = match backfill.action {
        BackfillAction::Print => {
            Dispatcher::print_to_stdout(backfill.function_name.as_deref().unwrap_or("<function>"))
        }
        BackfillAction::Index => {
            let the_function = backfill.function_name.as_deref().unwrap_or_default();
            let the_invoker = LambdaInvoker::from_env(backfill.region.as_deref()).await;
            Dispatcher::invoke(the_function, the_bucket, InvokerBackend::Lambda(the_invoker))
        }
    };

    let the_lister = ListerBackend::S3(S3Backend::from_env(backfill.region.as_deref()).await);
    let the_cursor = KeyCursor::new(the_lister, the_bucket, backfill.prefix.as_str())
        .with_page_size(backfill.page_size);

    let summary = BackfillSupervisor::new(the_dispatcher, backfill.supervisor_settings())
        .with_progress(show_progress)
        .run(the_cursor)
        .await
        .context("💀 backfill aborted")?;
    Ok(summary)
}

/// 🔄 Build the per-object processor against real S3.
pub async fn s3_processor(config: &AppConfig) -> Result<ObjectProcessor> {
    let the_store = StoreBackend::S3(S3Backend::from_env(config.process.region.as_deref()).await);
    ObjectProcessor::new(the_store, &config.process)
        .context("💀 the [process] configuration is not usable")
}

/// 🔄 Process one object from S3 into the destination bucket.
pub async fn run_process(config: &AppConfig, bucket: &str, key: &str) -> Result<ProcessReport> {
    let processor = s3_processor(config).await?;
    processor
        .process_key(bucket, key)
        .await
        .with_context(|| format!("💀 processing s3://{bucket}/{key} failed"))
}
