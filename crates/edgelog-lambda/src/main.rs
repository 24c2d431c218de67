// ai
//! 🐑 bootstrap: the per-object pipeline, wearing a Lambda costume.
//!
//! Every S3 `ObjectCreated` notification (or a backfill batch pretending to be
//! one) lands here. Each record is parsed, streamed, reshaped and uploaded under
//! `date=YYYY-MM-DD/` in the destination bucket. The reports go back as the
//! invocation result; a failed record fails the invocation so the platform retries.
//!
//! 🦆 The duck asked if it could be serverless too. It's already weightless.

use edgelog::app_config::load_config;
use edgelog::event::TriggerEvent;
use edgelog::process::{ObjectProcessor, ProcessReport};
use lambda_runtime::{Error, LambdaEvent, run, service_fn};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

async fn handle(
    processor: &ObjectProcessor,
    event: LambdaEvent<TriggerEvent>,
) -> Result<Vec<ProcessReport>, Error> {
    let (the_event, the_context) = event.into_parts();
    info!(
        "📥 request {}: {} record(s)",
        the_context.request_id,
        the_event.records.len()
    );

    match processor.process_event(&the_event).await {
        Ok(reports) => Ok(reports),
        Err(err) => {
            error!("💀 request {} failed: {}", the_context.request_id, err);
            Err(err.into())
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // -- 📡 CloudWatch adds its own timestamps and hates ANSI
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_ansi(false)
        .without_time()
        .init();

    let app_config = load_config(None)?;
    let processor = edgelog::s3_processor(&app_config).await?;
    info!("🚀 writing to s3://{}", processor.dest_bucket());

    run(service_fn(|event| handle(&processor, event))).await
}
