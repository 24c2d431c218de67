// ai
//! 🪣📡 S3 Backend: listing, streaming reads, and uploads against the real thing.
//!
//! COLD OPEN - EXT. DATA CENTER - 3:47 AM
//!
//! Two years of edge logs. One bucket. Thirty million objects named like
//! `E2ABC.2020-07-16-13.a1b2c3d4.gz`. The on-call engineer types `backfill`
//! and goes to make coffee. The S3Backend starts paging. A thousand at a time.
//!
//! 🧠 Knowledge graph:
//! - Client built from the environment: env vars → ~/.aws/config → IAM role → hope.
//! - `ListObjectsV2` with `max_keys`, optional prefix, continuation token.
//!   The next token is followed only when S3 hands one back.
//! - `GetObject` → `ByteStream::into_async_read()` → boxed `AsyncRead`. Same pipe,
//!   no buffering of the whole object.
//! - `PutObject` streams the scratch file from disk via `ByteStream::from_path`.

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use tracing::{debug, trace};

use super::{KeyLister, ListPage, ObjectReader, ObjectStore};

/// 🪣 Thin wrapper over an `aws_sdk_s3::Client`. Cheap to clone, the SDK client is an `Arc` inside.
#[derive(Debug, Clone)]
pub struct S3Backend {
    client: aws_sdk_s3::Client,
}

impl S3Backend {
    /// 🚀 Build a client from the ambient AWS configuration, optionally pinning a region.
    pub async fn from_env(region: Option<&str>) -> Self {
        let mut the_loader = aws_config::from_env();
        if let Some(region) = region {
            the_loader = the_loader.region(aws_sdk_s3::config::Region::new(region.to_string()));
        }
        let the_aws_config = the_loader.load().await;
        Self::from_client(aws_sdk_s3::Client::new(&the_aws_config))
    }

    pub fn from_client(client: aws_sdk_s3::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl KeyLister for S3Backend {
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        page_size: usize,
        token: Option<&str>,
    ) -> Result<ListPage> {
        let the_max_keys = i32::try_from(page_size)
            .with_context(|| format!("💀 page size {page_size} does not fit in ListObjectsV2 max_keys"))?;

        let the_response = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .set_prefix((!prefix.is_empty()).then(|| prefix.to_string()))
            .max_keys(the_max_keys)
            .set_continuation_token(token.map(str::to_string))
            .send()
            .await
            .with_context(|| {
                format!(
                    "💀 ListObjectsV2 failed for s3://{bucket}/{prefix}. \
                     Check: bucket name, region, and s3:ListBucket permission."
                )
            })?;

        // -- 📭 no Contents at all is just an empty page, not a tragedy
        let keys: Vec<String> = the_response
            .contents()
            .iter()
            .filter_map(|object| object.key().map(str::to_string))
            .collect();
        let next_token = the_response.next_continuation_token().map(str::to_string);

        trace!(
            "📄 s3://{bucket}/{prefix}: page of {} key(s), more: {}",
            keys.len(),
            next_token.is_some()
        );
        Ok(ListPage { keys, next_token })
    }
}

#[async_trait]
impl ObjectStore for S3Backend {
    async fn get(&self, bucket: &str, key: &str) -> Result<ObjectReader> {
        let the_response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .with_context(|| {
                format!(
                    "💀 GetObject failed for s3://{bucket}/{key}. \
                     Check: key path, IAM permissions, bucket policy, KMS key access."
                )
            })?;

        debug!(
            "📥 opened s3://{bucket}/{key} ({} bytes)",
            the_response.content_length().unwrap_or_default()
        );
        Ok(Box::new(the_response.body.into_async_read()))
    }

    async fn put_file(&self, bucket: &str, key: &str, path: &Path) -> Result<()> {
        let the_body = ByteStream::from_path(path)
            .await
            .with_context(|| format!("💀 could not open scratch file '{}' for upload", path.display()))?;

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(the_body)
            .send()
            .await
            .with_context(|| {
                format!("💀 PutObject failed for s3://{bucket}/{key}. Check: s3:PutObject permission.")
            })?;

        debug!("📤 uploaded '{}' to s3://{bucket}/{key}", path.display());
        Ok(())
    }
}
