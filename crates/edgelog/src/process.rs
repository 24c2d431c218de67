// ai
//! 🔄 Process: one log object in, one JSON-lines object out.
//!
//! 🎬 COLD OPEN - INT. LAMBDA SANDBOX - 2:14 AM
//!
//! An `ObjectCreated` notification lands. Somewhere in a bucket sits
//! `E2ABC.2020-07-16-13.a1b2c3d4.gz`, freshly delivered by the edge. By the time
//! the function returns, `date=2020-07-16/13_a1b2c3d4.json.gz` will exist in the
//! destination bucket, and nobody will have to read a tab character ever again.
//!
//! ```text
//!   parse key ──▶ GetObject ──▶ SyncIoBridge ──▶ MultiGzDecoder ──▶ RecordTransformer
//!   (fail fast,                 (blocking task)                          │
//!    no I/O yet)                                                         ▼
//!                  PutObject ◀── size check ◀── scratch file ◀── GzEncoder
//! ```
//!
//! 🧠 Knowledge graph:
//! - The name is parsed before anything is fetched. A bad name costs zero bytes of I/O.
//! - The object is streamed, never buffered whole. The transform runs on a blocking
//!   thread because flate2 speaks `std::io`.
//! - The destination key is a pure function of the source name, so re-running is safe:
//!   same input, same output key, overwritten with the same bytes.
//! - Every record of an event is attempted. Failures are collected, not short-circuited.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use serde::Serialize;
use tokio_util::io::SyncIoBridge;
use tracing::{debug, error, info};

use crate::app_config::ProcessConfig;
use crate::backends::{ObjectStore, StoreBackend};
use crate::errors::EdgeLogError;
use crate::event::TriggerEvent;
use crate::keys::SourceObjectKey;
use crate::transforms::{RecordTransformer, TransformStats};

/// 🧾 What happened to one object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessReport {
    pub source_key: String,
    pub destination_key: String,
    pub records_emitted: u64,
    pub compressed_bytes: u64,
}

/// 🔄 Gzip TSV in, gzip NDJSON out. Hands the writer back once the gzip trailer is written.
pub fn transform_gzip_stream<R, W>(input: R, output: W) -> io::Result<(TransformStats, W)>
where
    R: Read,
    W: Write,
{
    let the_reader = BufReader::with_capacity(64 * 1024, MultiGzDecoder::new(input));
    let mut the_encoder = GzEncoder::new(output, Compression::default());
    let stats = RecordTransformer.transform(the_reader, &mut the_encoder)?;
    let output = the_encoder.finish()?;
    Ok((stats, output))
}

/// 📁 The same pipeline between two local files. `.gz` names are (de)compressed, others are plain.
pub fn transform_local_file(input: &Path, output: &Path) -> Result<TransformStats, EdgeLogError> {
    let the_input = File::open(input)?;
    let the_output = BufWriter::new(File::create(output)?);

    let stats = match (is_gzip_name(input), is_gzip_name(output)) {
        (true, true) => {
            let (stats, mut writer) = transform_gzip_stream(the_input, the_output)?;
            writer.flush()?;
            stats
        }
        (true, false) => {
            let the_reader = BufReader::new(MultiGzDecoder::new(the_input));
            RecordTransformer.transform(the_reader, the_output)?
        }
        (false, true) => {
            let mut the_encoder = GzEncoder::new(the_output, Compression::default());
            let stats = RecordTransformer.transform(BufReader::new(the_input), &mut the_encoder)?;
            the_encoder.finish()?.flush()?;
            stats
        }
        (false, false) => RecordTransformer.transform(BufReader::new(the_input), the_output)?,
    };

    info!(
        "✅ '{}' → '{}': {} record(s), {} row(s) skipped",
        input.display(),
        output.display(),
        stats.records_emitted,
        stats.rows_skipped
    );
    Ok(stats)
}

fn is_gzip_name(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("gz"))
}

/// 🔄 Fetch, transform, upload. One object at a time, one scratch file.
#[derive(Debug, Clone)]
pub struct ObjectProcessor {
    store: StoreBackend,
    dest_bucket: String,
    scratch_path: PathBuf,
    max_output_bytes: u64,
}

impl ObjectProcessor {
    pub fn new(store: StoreBackend, config: &ProcessConfig) -> Result<Self, EdgeLogError> {
        config.validate()?;
        Ok(Self {
            store,
            dest_bucket: config.dest_bucket()?.to_string(),
            scratch_path: config.scratch_path.clone(),
            max_output_bytes: config.max_output_bytes,
        })
    }

    pub fn dest_bucket(&self) -> &str {
        &self.dest_bucket
    }

    /// 🚀 Process `bucket/key` into the destination bucket.
    pub async fn process_key(&self, bucket: &str, key: &str) -> Result<ProcessReport, EdgeLogError> {
        let the_source = SourceObjectKey::parse(key)?;
        let the_destination = the_source.destination_key();
        debug!("🗺️ s3://{bucket}/{key} → s3://{}/{the_destination}", self.dest_bucket);

        let the_reader = self
            .store
            .get(bucket, key)
            .await
            .map_err(|e| EdgeLogError::Storage {
                operation: "get",
                bucket: bucket.to_string(),
                key: key.to_string(),
                source: e.into(),
            })?;

        // -- 🌉 the bridge grabs the runtime handle here, on the async side
        let the_bridge = SyncIoBridge::new(the_reader);
        let the_scratch = self.scratch_path.clone();
        let the_transformed = tokio::task::spawn_blocking(move || {
            let the_file = BufWriter::new(File::create(&the_scratch)?);
            let (stats, the_file) = transform_gzip_stream(the_bridge, the_file)?;
            the_file.into_inner().map_err(|e| e.into_error())?.sync_all()?;
            let compressed_bytes = std::fs::metadata(&the_scratch)?.len();
            Ok::<_, io::Error>((stats, compressed_bytes))
        })
        .await
        .map_err(io::Error::other)
        .and_then(|inner| inner);
        let (stats, compressed_bytes) = match the_transformed {
            Ok(done) => done,
            Err(e) => {
                // -- 🧹 a half-written scratch file must not outlive the attempt
                self.discard_scratch();
                return Err(e.into());
            }
        };

        if compressed_bytes > self.max_output_bytes {
            self.discard_scratch();
            return Err(EdgeLogError::OutputTooLarge {
                key: key.to_string(),
                size: compressed_bytes,
                limit: self.max_output_bytes,
            });
        }

        let the_upload = self
            .store
            .put_file(&self.dest_bucket, &the_destination, &self.scratch_path)
            .await;
        self.discard_scratch();
        the_upload.map_err(|e| EdgeLogError::Storage {
            operation: "put",
            bucket: self.dest_bucket.clone(),
            key: the_destination.clone(),
            source: e.into(),
        })?;

        info!(
            "✅ s3://{bucket}/{key} → s3://{}/{the_destination}: {} record(s), {compressed_bytes} byte(s)",
            self.dest_bucket, stats.records_emitted
        );
        Ok(ProcessReport {
            source_key: key.to_string(),
            destination_key: the_destination,
            records_emitted: stats.records_emitted,
            compressed_bytes,
        })
    }

    /// 📬 Every record of the event, in order. Failures are collected, the rest still run.
    pub async fn process_event(
        &self,
        event: &TriggerEvent,
    ) -> Result<Vec<ProcessReport>, EdgeLogError> {
        let mut reports = Vec::with_capacity(event.records.len());
        let mut failed = Vec::new();

        for record in &event.records {
            match self.process_key(record.bucket(), record.key()).await {
                Ok(report) => reports.push(report),
                Err(e) => {
                    error!("💀 s3://{}/{}: {e}", record.bucket(), record.key());
                    failed.push(record.key().to_string());
                }
            }
        }

        if failed.is_empty() {
            Ok(reports)
        } else {
            Err(EdgeLogError::EventFailed {
                failed,
                total: event.records.len(),
            })
        }
    }

    fn discard_scratch(&self) {
        if let Err(e) = std::fs::remove_file(&self.scratch_path) {
            debug!("🧹 could not remove scratch '{}': {e}", self.scratch_path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::InMemoryBucket;
    use flate2::read::GzDecoder;

    const THE_KEY: &str = "logs/E2ABC.2020-07-16-07.a1b2c3d4.gz";

    fn gzip(bytes: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(bytes).expect("💀 Vec writes don't fail");
        encoder.finish().expect("💀 Vec writes don't fail")
    }

    fn gunzip(bytes: &[u8]) -> String {
        let mut text = String::new();
        GzDecoder::new(bytes)
            .read_to_string(&mut text)
            .expect("💀 output is gzip and UTF-8");
        text
    }

    fn the_log() -> &'static str {
        "#Version: 1.0\n#Fields: date time x-edge-location sc-bytes\n\
         2020-07-16\t07:05:47\tSEA19-C1\t1024\n\
         2020-07-16\t07:05:48\tcafé\t2048\n"
    }

    fn the_processor(store: &InMemoryBucket, dir: &tempfile::TempDir, limit: u64) -> ObjectProcessor {
        let config = ProcessConfig {
            dest_bucket: Some("json-logs".to_string()),
            scratch_path: dir.path().join("dest.gz"),
            max_output_bytes: limit,
            region: None,
        };
        ObjectProcessor::new(StoreBackend::InMemory(store.clone()), &config)
            .expect("💀 test config is valid")
    }

    #[tokio::test]
    async fn the_one_where_an_object_goes_all_the_way_through() -> anyhow::Result<()> {
        let store = InMemoryBucket::new().with_object("cdn-logs", THE_KEY, gzip(the_log().as_bytes()));
        let dir = tempfile::tempdir()?;
        let report = the_processor(&store, &dir, 1 << 20)
            .process_key("cdn-logs", THE_KEY)
            .await?;

        assert_eq!(report.destination_key, "date=2020-07-16/7_a1b2c3d4.json.gz");
        assert_eq!(report.records_emitted, 2);

        let the_uploaded = store
            .object("json-logs", "date=2020-07-16/7_a1b2c3d4.json.gz")
            .expect("💀 the object was uploaded");
        assert_eq!(report.compressed_bytes, the_uploaded.len() as u64);

        let mut the_expected = Vec::new();
        RecordTransformer.transform(the_log().as_bytes(), &mut the_expected)?;
        assert_eq!(gunzip(&the_uploaded), String::from_utf8(the_expected)?);
        assert!(gunzip(&the_uploaded).contains(r#""x_edge_location":"caf\u00e9""#));

        // -- 🧹 scratch is cleaned up after the upload
        assert!(!dir.path().join("dest.gz").exists());
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_a_bad_name_fails_before_any_io() -> anyhow::Result<()> {
        // -- 🙈 not even in the bucket; parsing must fail first
        let store = InMemoryBucket::new();
        let dir = tempfile::tempdir()?;
        let the_result = the_processor(&store, &dir, 1 << 20)
            .process_key("cdn-logs", "definitely-not-a-log.txt")
            .await;
        assert!(matches!(the_result, Err(EdgeLogError::MalformedKey { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_a_missing_object_is_a_storage_error() -> anyhow::Result<()> {
        let store = InMemoryBucket::new();
        let dir = tempfile::tempdir()?;
        let the_result = the_processor(&store, &dir, 1 << 20)
            .process_key("cdn-logs", THE_KEY)
            .await;
        assert!(matches!(
            the_result,
            Err(EdgeLogError::Storage { operation: "get", .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_the_output_is_too_big_to_upload() -> anyhow::Result<()> {
        let store = InMemoryBucket::new().with_object("cdn-logs", THE_KEY, gzip(the_log().as_bytes()));
        let dir = tempfile::tempdir()?;
        let the_result = the_processor(&store, &dir, 8)
            .process_key("cdn-logs", THE_KEY)
            .await;
        assert!(matches!(the_result, Err(EdgeLogError::OutputTooLarge { limit: 8, .. })));
        assert!(store.keys("json-logs").is_empty());
        assert!(!dir.path().join("dest.gz").exists());
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_a_corrupt_gzip_leaves_no_scratch_behind() -> anyhow::Result<()> {
        // -- 🗑️ plain text wearing a .gz name: the gzip header check fails on the first read
        let store = InMemoryBucket::new().with_object("cdn-logs", THE_KEY, the_log().as_bytes());
        let dir = tempfile::tempdir()?;
        let the_result = the_processor(&store, &dir, 1 << 20)
            .process_key("cdn-logs", THE_KEY)
            .await;
        assert!(matches!(the_result, Err(EdgeLogError::Io(_))));
        assert!(!dir.path().join("dest.gz").exists());
        assert!(store.keys("json-logs").is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_a_refused_upload_still_cleans_up() -> anyhow::Result<()> {
        let store = InMemoryBucket::new()
            .with_object("cdn-logs", THE_KEY, gzip(the_log().as_bytes()))
            .with_upload_failure();
        let dir = tempfile::tempdir()?;
        let the_result = the_processor(&store, &dir, 1 << 20)
            .process_key("cdn-logs", THE_KEY)
            .await;
        assert!(matches!(
            the_result,
            Err(EdgeLogError::Storage { operation: "put", .. })
        ));
        assert!(!dir.path().join("dest.gz").exists());
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_an_event_processes_every_record_and_names_the_failures() -> anyhow::Result<()> {
        let the_other = "E3XYZ.2021-01-02-23.zz99.gz";
        let store = InMemoryBucket::new()
            .with_object("cdn-logs", THE_KEY, gzip(the_log().as_bytes()))
            .with_object("cdn-logs", the_other, gzip(the_log().as_bytes()));
        let dir = tempfile::tempdir()?;
        let processor = the_processor(&store, &dir, 1 << 20);

        let the_event = TriggerEvent::for_batch("cdn-logs", &[THE_KEY, "nope.txt", the_other]);
        match processor.process_event(&the_event).await {
            Err(EdgeLogError::EventFailed { failed, total }) => {
                assert_eq!(failed, vec!["nope.txt".to_string()]);
                assert_eq!(total, 3);
            }
            other => panic!("💀 expected EventFailed, got {other:?}"),
        }
        assert_eq!(
            store.keys("json-logs"),
            vec![
                "date=2020-07-16/7_a1b2c3d4.json.gz".to_string(),
                "date=2021-01-02/23_zz99.json.gz".to_string(),
            ]
        );

        let the_clean = TriggerEvent::for_batch("cdn-logs", &[THE_KEY]);
        let reports = processor.process_event(&the_clean).await?;
        assert_eq!(reports.len(), 1);
        Ok(())
    }

    #[test]
    fn the_one_where_local_files_pick_compression_by_extension() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let the_input = dir.path().join("in.gz");
        std::fs::write(&the_input, gzip(the_log().as_bytes()))?;

        let the_gz_output = dir.path().join("out.json.gz");
        let stats = transform_local_file(&the_input, &the_gz_output)?;
        assert_eq!(stats.records_emitted, 2);

        let the_plain_output = dir.path().join("out.json");
        transform_local_file(&the_input, &the_plain_output)?;
        assert_eq!(
            gunzip(&std::fs::read(&the_gz_output)?),
            std::fs::read_to_string(&the_plain_output)?
        );
        Ok(())
    }
}
