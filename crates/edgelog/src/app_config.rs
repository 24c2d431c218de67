//! 🔧 App Configuration: the sacred TOML-and-env-to-struct pipeline.
//!
//! 📡 "Config not found: We looked everywhere. Under the couch. Behind the fridge.
//! In the junk drawer. Nothing." (every developer at 3am 🦆)
//!
//! 🏗️ Powered by Figment, because manually parsing env vars is a form of
//! self-harm that even the borrow checker wouldn't approve of.
//!
//! Layers, lowest to highest:
//! 1. serde defaults on the structs below
//! 2. `S3_DEST_BUCKET` (the variable the deployed function has always been given)
//! 3. `EDGELOG_*` env vars, `__` for nesting: `EDGELOG_BACKFILL__BATCH_SIZE=50`
//! 4. the TOML file, when one is given
//! 5. whatever the caller merges on top (the CLI's flags)

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use anyhow::Context;
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::EdgeLogError;
use crate::supervisors::SupervisorSettings;

/// 📦 The AppConfig: one struct to rule them all, one struct to find them,
/// one struct to bring them all, and in the Figment bind them.
#[derive(Debug, Default, Deserialize, Serialize, Clone, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub process: ProcessConfig,
    #[serde(default)]
    pub backfill: BackfillConfig,
}

/// 🔄 Single-object pipeline knobs. Used by `process` and by the Lambda.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ProcessConfig {
    /// 🪣 where the JSON lines land. Required.
    #[serde(default)]
    pub dest_bucket: Option<String>,
    /// 📝 local compressed output buffer before upload
    #[serde(default = "default_scratch_path")]
    pub scratch_path: PathBuf,
    /// 🐘 refuse to upload anything bigger than this (the sandbox's /tmp is finite)
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: u64,
    #[serde(default)]
    pub region: Option<String>,
}

/// 🚀 What a backfill does with each batch.
#[derive(Debug, Default, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BackfillAction {
    /// 🖨️ dry run
    #[default]
    Print,
    /// 📡 invoke the function for real
    #[serde(alias = "execute")]
    Index,
}

/// 📜 Bulk orchestrator knobs.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct BackfillConfig {
    /// 🪣 the bucket holding the raw edge logs. Required.
    #[serde(default)]
    pub bucket: Option<String>,
    #[serde(default)]
    pub prefix: String,
    /// 📦 keys per invocation. Zero is rejected by the type.
    #[serde(default = "default_batch_size")]
    pub batch_size: NonZeroUsize,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default)]
    pub action: BackfillAction,
    /// 📡 required when `action = "index"`
    #[serde(default)]
    pub function_name: Option<String>,
    #[serde(default = "default_dispatch_parallelism")]
    pub dispatch_parallelism: usize,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    #[serde(default)]
    pub region: Option<String>,
}

fn default_scratch_path() -> PathBuf {
    PathBuf::from("/tmp/dest.gz")
}

fn default_max_output_bytes() -> u64 {
    512 * 1024 * 1024
}

fn default_batch_size() -> NonZeroUsize {
    NonZeroUsize::new(20).unwrap_or(NonZeroUsize::MIN)
}

fn default_page_size() -> usize {
    1000
}

fn default_dispatch_parallelism() -> usize {
    4
}

fn default_queue_capacity() -> usize {
    16
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            dest_bucket: None,
            scratch_path: default_scratch_path(),
            max_output_bytes: default_max_output_bytes(),
            region: None,
        }
    }
}

impl Default for BackfillConfig {
    fn default() -> Self {
        Self {
            bucket: None,
            prefix: String::new(),
            batch_size: default_batch_size(),
            page_size: default_page_size(),
            action: BackfillAction::default(),
            function_name: None,
            dispatch_parallelism: default_dispatch_parallelism(),
            queue_capacity: default_queue_capacity(),
            region: None,
        }
    }
}

impl ProcessConfig {
    /// ✅ The destination bucket, or a config error saying how to set it.
    pub fn dest_bucket(&self) -> Result<&str, EdgeLogError> {
        match self.dest_bucket.as_deref() {
            Some(bucket) if !bucket.is_empty() => Ok(bucket),
            _ => Err(EdgeLogError::Config(
                "process.dest_bucket is not set (S3_DEST_BUCKET, EDGELOG_PROCESS__DEST_BUCKET, or [process] dest_bucket)"
                    .to_string(),
            )),
        }
    }

    pub fn validate(&self) -> Result<(), EdgeLogError> {
        self.dest_bucket()?;
        if self.max_output_bytes == 0 {
            return Err(EdgeLogError::Config(
                "process.max_output_bytes must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl BackfillConfig {
    pub fn bucket(&self) -> Result<&str, EdgeLogError> {
        match self.bucket.as_deref() {
            Some(bucket) if !bucket.is_empty() => Ok(bucket),
            _ => Err(EdgeLogError::Config(
                "backfill.bucket is not set (--bucket, EDGELOG_BACKFILL__BUCKET, or [backfill] bucket)"
                    .to_string(),
            )),
        }
    }

    pub fn validate(&self) -> Result<(), EdgeLogError> {
        self.bucket()?;
        if !(1..=1000).contains(&self.page_size) {
            return Err(EdgeLogError::Config(format!(
                "backfill.page_size must be within 1..=1000, got {}",
                self.page_size
            )));
        }
        if self.dispatch_parallelism == 0 {
            return Err(EdgeLogError::Config(
                "backfill.dispatch_parallelism must be at least 1".to_string(),
            ));
        }
        if self.queue_capacity == 0 {
            return Err(EdgeLogError::Config(
                "backfill.queue_capacity must be at least 1".to_string(),
            ));
        }
        if self.action == BackfillAction::Index && self.function_name.is_none() {
            return Err(EdgeLogError::Config(
                "backfill.function_name is required when action = \"index\"".to_string(),
            ));
        }
        Ok(())
    }

    pub fn supervisor_settings(&self) -> SupervisorSettings {
        SupervisorSettings {
            batch_size: self.batch_size,
            parallelism: self.dispatch_parallelism,
            queue_capacity: self.queue_capacity,
        }
    }
}

/// 🏗️ The layered Figment, before extraction. Callers merge their own overrides on top.
pub fn config_figment(config_file_name: Option<&Path>) -> Figment {
    // -- 📜 the deployed function only ever knew this one variable
    let the_legacy = Env::raw()
        .only(&["S3_DEST_BUCKET"])
        .map(|_| "process.dest_bucket".into());

    let config = Figment::new()
        .merge(the_legacy)
        .merge(Env::prefixed("EDGELOG_").split("__"));

    match config_file_name {
        Some(file_name) => config.merge(Toml::file(file_name)),
        None => config,
    }
}

/// 🚀 Load the config from env vars and, if given, a TOML file.
pub fn load_config(config_file_name: Option<&Path>) -> anyhow::Result<AppConfig> {
    extract_config(config_figment(config_file_name), config_file_name)
}

/// 🎯 Extract an `AppConfig` from an already-layered Figment, with a message that
/// actually says where we looked.
pub fn extract_config(
    config: Figment,
    config_file_name: Option<&Path>,
) -> anyhow::Result<AppConfig> {
    info!(
        "🔧 Loading configuration: {}",
        config_file_name.map_or("<env only>".to_string(), |p| p.display().to_string())
    );

    let context_msg = match config_file_name {
        Some(path) => format!(
            "💀 Failed to parse configuration from file '{}' and environment variables (EDGELOG_*, S3_DEST_BUCKET). \
             The file exists in our hearts, but apparently not on disk.",
            path.display()
        ),
        None => "💀 Failed to parse configuration from environment variables (EDGELOG_*, S3_DEST_BUCKET). \
                 No file was provided, this one's all on the environment. Classic."
            .to_string(),
    };

    config.extract().context(context_msg)
}
