// ai
//! 📡 Lambda invoker: knock on the function's door, leave the package, do not wait.
//!
//! `InvocationType::Event` queues the payload on the Lambda side and returns
//! immediately with a 202. Whatever the function does with it afterwards is its
//! own business (and its own CloudWatch log group). 🦆

use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_lambda::primitives::Blob;
use aws_sdk_lambda::types::InvocationType;
use tracing::trace;

use super::Invoker;

/// 📡 Async-invokes functions through an `aws_sdk_lambda::Client`.
#[derive(Debug, Clone)]
pub struct LambdaInvoker {
    client: aws_sdk_lambda::Client,
}

impl LambdaInvoker {
    /// 🚀 Client from the ambient AWS configuration, optionally pinned to a region.
    pub async fn from_env(region: Option<&str>) -> Self {
        let mut the_loader = aws_config::from_env();
        if let Some(region) = region {
            the_loader =
                the_loader.region(aws_sdk_lambda::config::Region::new(region.to_string()));
        }
        let the_aws_config = the_loader.load().await;
        Self::from_client(aws_sdk_lambda::Client::new(&the_aws_config))
    }

    pub fn from_client(client: aws_sdk_lambda::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Invoker for LambdaInvoker {
    async fn invoke_async(&self, function: &str, payload: Vec<u8>) -> Result<()> {
        let the_payload_len = payload.len();
        let the_response = self
            .client
            .invoke()
            .function_name(function)
            .invocation_type(InvocationType::Event)
            .payload(Blob::new(payload))
            .send()
            .await
            .with_context(|| {
                format!(
                    "💀 async Invoke of '{function}' failed. \
                     Check: function name, region, and lambda:InvokeFunction permission."
                )
            })?;

        trace!(
            "📡 invoked '{function}' with {the_payload_len} byte payload, status {}",
            the_response.status_code()
        );
        Ok(())
    }
}
