// ai
//! 📨 The triggering event: the envelope a batch travels in.
//!
//! 🎬 *[a Lambda wakes up. it has been handed a JSON object. it does not know where it came from.]*
//! *[the JSON says "Records". the Lambda nods. it has seen this shape before.]*
//!
//! Shape on the wire, compact, no spaces:
//!
//! ```text
//! {"Records":[{"s3":{"bucket":{"name":B},"object":{"key":K}}}, ...]}
//! ```
//!
//! It is the same skeleton a real S3 `ObjectCreated` notification has, minus
//! everything we do not read. Unknown fields are ignored on the way in, so a
//! genuine notification deserializes just fine, and our synthetic ones look
//! enough like the real thing that the function cannot tell them apart. 🦆

use serde::{Deserialize, Serialize};

use crate::errors::EdgeLogError;

/// 📨 One or more object references, grouped for a single invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<TriggerRecord>,
}

/// 🧾 One object reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerRecord {
    pub s3: S3Entity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct S3Entity {
    pub bucket: BucketRef,
    pub object: ObjectRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketRef {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRef {
    pub key: String,
}

impl TriggerRecord {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            s3: S3Entity {
                bucket: BucketRef { name: bucket.into() },
                object: ObjectRef { key: key.into() },
            },
        }
    }

    pub fn bucket(&self) -> &str {
        &self.s3.bucket.name
    }

    pub fn key(&self) -> &str {
        &self.s3.object.key
    }
}

impl TriggerEvent {
    /// 📦 One record per key, in the order given, all pointing at `bucket`.
    pub fn for_batch<K: AsRef<str>>(bucket: &str, keys: &[K]) -> Self {
        Self {
            records: keys
                .iter()
                .map(|key| TriggerRecord::new(bucket, key.as_ref()))
                .collect(),
        }
    }

    /// 🧵 Compact JSON bytes, ready to hand to an invoker.
    pub fn to_payload(&self) -> Result<Vec<u8>, EdgeLogError> {
        Ok(serde_json::to_vec(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_one_where_the_payload_is_byte_exact() -> anyhow::Result<()> {
        let payload = TriggerEvent::for_batch("b", &["k"]).to_payload()?;
        assert_eq!(
            String::from_utf8(payload)?,
            r#"{"Records":[{"s3":{"bucket":{"name":"b"},"object":{"key":"k"}}}]}"#
        );
        Ok(())
    }

    #[test]
    fn the_one_where_record_order_follows_key_order() {
        let the_keys = vec!["z".to_string(), "a".to_string(), "m".to_string()];
        let event = TriggerEvent::for_batch("logs", &the_keys);
        let the_order: Vec<&str> = event.records.iter().map(TriggerRecord::key).collect();
        assert_eq!(the_order, ["z", "a", "m"]);
        assert!(event.records.iter().all(|r| r.bucket() == "logs"));
    }

    #[test]
    fn the_one_where_a_real_s3_notification_still_parses() -> anyhow::Result<()> {
        // 📜 trimmed-down ObjectCreated:Put, but with all the noise we ignore
        let the_notification = r#"{
          "Records": [{
            "eventVersion": "2.1",
            "eventSource": "aws:s3",
            "eventName": "ObjectCreated:Put",
            "s3": {
              "s3SchemaVersion": "1.0",
              "bucket": {"name": "cdn-logs", "arn": "arn:aws:s3:::cdn-logs"},
              "object": {"key": "E2ABC.2020-07-16-13.a1b2c3d4.gz", "size": 1024}
            }
          }]
        }"#;
        let event: TriggerEvent = serde_json::from_str(the_notification)?;
        assert_eq!(event.records.len(), 1);
        assert_eq!(event.records[0].bucket(), "cdn-logs");
        assert_eq!(event.records[0].key(), "E2ABC.2020-07-16-13.a1b2c3d4.gz");
        Ok(())
    }

    #[test]
    fn the_one_where_no_records_means_an_empty_event() -> anyhow::Result<()> {
        let event: TriggerEvent = serde_json::from_str("{}")?;
        assert!(event.records.is_empty());
        Ok(())
    }
}
