//! 🔌 Backends: where the real I/O happens.
//!
//! 📜 Listers enumerate the bucket, stores hand out bytes and take them back,
//! invokers poke the remote function and walk away without waiting for an answer.
//!
//! 🎭 This module is the casting agency. Need to list a real bucket? Read from
//! S3? Fire an async Lambda invocation? Or do all of it in RAM so the tests run
//! on a plane? We've got a backend for that.
//!
//! 🧠 Knowledge graph:
//! - Three traits, one per collaborator: [`KeyLister`], [`ObjectStore`], [`Invoker`].
//! - Each has an enum (`ListerBackend`, `StoreBackend`, `InvokerBackend`) that
//!   dispatches to the concrete type, so supervisors never learn where the bytes live.
//! - Implementations return `anyhow::Result` with context. The layers above fold
//!   those into typed `EdgeLogError`s (`Listing`, `Storage`, `Dispatch`).
//!
//! 🦆 The duck is here because every file must have one. This is law. Do not question the duck.

use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;
use tokio::io::AsyncRead;

pub mod in_mem;
pub mod lambda;
pub mod s3;

pub use in_mem::{InMemoryBucket, InMemoryInvoker};
pub use lambda::LambdaInvoker;
pub use s3::S3Backend;

/// 🧵 Type-erased async byte stream for an object body. One vtable hop per read.
/// The network round trip laughs at this cost.
pub type ObjectReader = Box<dyn AsyncRead + Send + Unpin>;

/// 📄 One page of a listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPage {
    pub keys: Vec<String>,
    /// 🔗 `None` means this was the last page. An empty `keys` with a token is still not the end.
    pub next_token: Option<String>,
}

// ===== Lister =====

/// 📜 Enumerates object names under a prefix, one page per call.
#[async_trait]
pub trait KeyLister: std::fmt::Debug + Send + Sync {
    /// 📄 Fetch at most `page_size` names, continuing from `token` when given.
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        page_size: usize,
        token: Option<&str>,
    ) -> Result<ListPage>;
}

/// 🎭 The many faces of a lister.
#[derive(Debug, Clone)]
pub enum ListerBackend {
    S3(S3Backend),
    InMemory(InMemoryBucket),
}

#[async_trait]
impl KeyLister for ListerBackend {
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        page_size: usize,
        token: Option<&str>,
    ) -> Result<ListPage> {
        match self {
            ListerBackend::S3(s3) => s3.list_page(bucket, prefix, page_size, token).await,
            ListerBackend::InMemory(mem) => mem.list_page(bucket, prefix, page_size, token).await,
        }
    }
}

// ===== Store =====

/// 🪣 Reads objects as streams and uploads local files as objects.
#[async_trait]
pub trait ObjectStore: std::fmt::Debug + Send + Sync {
    /// 📥 Open `bucket/key` for streaming reads.
    async fn get(&self, bucket: &str, key: &str) -> Result<ObjectReader>;
    /// 📤 Upload the file at `path` as `bucket/key`, replacing whatever was there.
    async fn put_file(&self, bucket: &str, key: &str, path: &Path) -> Result<()>;
}

/// 🎭 The many faces of a store.
#[derive(Debug, Clone)]
pub enum StoreBackend {
    S3(S3Backend),
    InMemory(InMemoryBucket),
}

#[async_trait]
impl ObjectStore for StoreBackend {
    async fn get(&self, bucket: &str, key: &str) -> Result<ObjectReader> {
        match self {
            StoreBackend::S3(s3) => s3.get(bucket, key).await,
            StoreBackend::InMemory(mem) => mem.get(bucket, key).await,
        }
    }

    async fn put_file(&self, bucket: &str, key: &str, path: &Path) -> Result<()> {
        match self {
            StoreBackend::S3(s3) => s3.put_file(bucket, key, path).await,
            StoreBackend::InMemory(mem) => mem.put_file(bucket, key, path).await,
        }
    }
}

// ===== Invoker =====

/// 📡 Fire-and-forget invocation of a remote function. No response body is consumed.
#[async_trait]
pub trait Invoker: std::fmt::Debug + Send + Sync {
    async fn invoke_async(&self, function: &str, payload: Vec<u8>) -> Result<()>;
}

/// 🎭 The many faces of an invoker.
#[derive(Debug, Clone)]
pub enum InvokerBackend {
    Lambda(LambdaInvoker),
    InMemory(InMemoryInvoker),
}

#[async_trait]
impl Invoker for InvokerBackend {
    async fn invoke_async(&self, function: &str, payload: Vec<u8>) -> Result<()> {
        match self {
            InvokerBackend::Lambda(lambda) => lambda.invoke_async(function, payload).await,
            InvokerBackend::InMemory(mem) => mem.invoke_async(function, payload).await,
        }
    }
}
