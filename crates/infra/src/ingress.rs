//! Storage-notification envelope parsing
//!
//! Accepts the S3-style `{"Records": [...]}` body delivered to the pipeline
//! and turns each record into a [`StorageEvent`]. Object keys arrive
//! form-encoded (`+` for space, `%XX` escapes) and are decoded here so the
//! event guard compares against the real key.
//!
//! Bodies without a `Records` array (such as the provider's test event)
//! yield no events.

use std::collections::BTreeMap;

use changecast_domain::{ChangecastError, Result, StorageEvent};
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "Records", default)]
    records: Vec<Record>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Record {
    event_name: String,
    s3: S3Entity,
}

#[derive(Debug, Deserialize)]
struct S3Entity {
    object: S3Object,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct S3Object {
    key: String,
    /// Present when a forwarder enriched the record with object metadata
    #[serde(default)]
    user_metadata: BTreeMap<String, String>,
}

/// Parse a notification body into events, in record order.
///
/// # Errors
/// Returns `ChangecastError::InvalidInput` for malformed JSON, a record
/// missing required fields, or an undecodable key.
pub fn parse_storage_events(body: &str) -> Result<Vec<StorageEvent>> {
    let envelope: Envelope = serde_json::from_str(body)
        .map_err(|e| ChangecastError::InvalidInput(format!("Invalid storage notification: {e}")))?;

    let events = envelope
        .records
        .into_iter()
        .map(|record| {
            Ok(StorageEvent {
                key: decode_object_key(&record.s3.object.key)?,
                event_type: record.event_name,
                metadata: record.s3.object.user_metadata,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    debug!(events = events.len(), "storage notification parsed");
    Ok(events)
}

/// Decode a form-encoded object key.
///
/// # Errors
/// Returns `ChangecastError::InvalidInput` if the escapes do not decode to
/// UTF-8.
pub fn decode_object_key(raw: &str) -> Result<String> {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|key| key.into_owned())
        .map_err(|e| ChangecastError::InvalidInput(format!("Invalid object key '{raw}': {e}")))
}
