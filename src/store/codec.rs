//! Versioned JSON payload for the dataset slot.
//!
//! Layout: `{version, saved_at, metadata, records: [...]}`. Decoding is strict
//! about the envelope (version, records sequence) and lenient about the
//! records inside it: a bad record is dropped and counted, the rest survive.

use chrono::{DateTime, Utc};
use serde::de::{IgnoredAny, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, warn};

use crate::error::DecodeError;
use crate::model::{self, Dataset, DatasetMetadata, PropertyRecord, RecordRejection};

pub const PAYLOAD_VERSION: &str = "1.0";

const SUPPORTED_VERSIONS: &[&str] = &[PAYLOAD_VERSION];

#[derive(Serialize)]
struct Payload<'a> {
    version: &'a str,
    saved_at: DateTime<Utc>,
    metadata: &'a DatasetMetadata,
    records: &'a [PropertyRecord],
}

/// Result of a successful decode.
#[derive(Debug)]
pub struct Decoded {
    pub dataset: Dataset,
    /// Records dropped for missing required fields, malformed content or duplicate identity.
    pub skipped: usize,
    /// Subset of `skipped` that had no usable identity.
    pub missing_identity: usize,
}

pub fn encode(
    records: &[PropertyRecord],
    metadata: &DatasetMetadata,
    saved_at: DateTime<Utc>,
) -> Result<String, serde_json::Error> {
    let mut metadata = metadata.clone();
    metadata.refresh_counts(records);

    serde_json::to_string(&Payload {
        version: PAYLOAD_VERSION,
        saved_at,
        metadata: &metadata,
        records,
    })
}

fn check_version(version: Option<&str>) -> Result<(), DecodeError> {
    match version {
        None => Err(DecodeError::MissingVersion),
        Some(v) if SUPPORTED_VERSIONS.contains(&v) => Ok(()),
        Some(v) => Err(DecodeError::UnsupportedVersion(v.to_string())),
    }
}

fn parse_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    raw.and_then(model::parse_timestamp)
}

pub fn decode(payload: &str) -> Result<Decoded, DecodeError> {
    let mut root: Value = serde_json::from_str(payload)?;

    let Some(envelope) = root.as_object_mut() else {
        return Err(DecodeError::MissingVersion);
    };

    let version = envelope.get("version").and_then(Value::as_str);
    check_version(version)?;
    let version = version.unwrap_or(PAYLOAD_VERSION).to_string();

    let raw_records = match envelope.remove("records") {
        Some(Value::Array(items)) => items,
        _ => return Err(DecodeError::RecordsNotSequence),
    };

    let saved_at = parse_timestamp(envelope.get("saved_at").and_then(Value::as_str))
        .unwrap_or_else(|| {
            debug!("payload saved_at missing or unreadable, using epoch");
            DateTime::<Utc>::UNIX_EPOCH
        });

    let metadata = match envelope.remove("metadata") {
        Some(value) => serde_json::from_value(value).unwrap_or_else(|e| {
            warn!(error = %e, "payload metadata unreadable, using defaults");
            DatasetMetadata::default()
        }),
        None => DatasetMetadata::default(),
    };

    let batch = decode_records(raw_records);

    Ok(Decoded {
        dataset: Dataset {
            version,
            saved_at,
            metadata,
            records: batch.records,
        },
        skipped: batch.skipped,
        missing_identity: batch.missing_identity,
    })
}

/// Records that passed validation, plus counts of what was dropped.
#[derive(Debug, Default)]
pub struct RecordBatch {
    pub records: Vec<PropertyRecord>,
    pub skipped: usize,
    pub missing_identity: usize,
}

/// Validate raw records one by one, dropping (and counting) the bad ones.
///
/// Duplicate identities keep their first occurrence.
pub fn decode_records(raw_records: Vec<Value>) -> RecordBatch {
    let mut batch = RecordBatch {
        records: Vec::with_capacity(raw_records.len()),
        ..Default::default()
    };
    let mut seen_ids = HashSet::new();

    for (index, raw) in raw_records.into_iter().enumerate() {
        match PropertyRecord::from_value(raw) {
            Ok(record) => {
                if seen_ids.insert(record.id.clone()) {
                    batch.records.push(record);
                } else {
                    debug!(index, id = %record.id, "dropping duplicate record");
                    batch.skipped += 1;
                }
            }
            Err(rejection) => {
                debug!(index, reason = %rejection, "dropping record");
                if matches!(rejection, RecordRejection::MissingIdentity) {
                    batch.missing_identity += 1;
                }
                batch.skipped += 1;
            }
        }
    }

    if batch.skipped > 0 {
        warn!(skipped = batch.skipped, kept = batch.records.len(), "dropped unreadable records");
    }

    batch
}

/// A scraper export ready to be saved.
#[derive(Debug, Default)]
pub struct Feed {
    pub batch: RecordBatch,
    pub search_params: Value,
}

/// Read a scraper export: either a bare array of records, or an object with
/// a `records` array and optional `search_params` (top level or under `metadata`).
pub fn decode_feed(input: &str) -> Result<Feed, DecodeError> {
    let root: Value = serde_json::from_str(input)?;

    let (raw_records, search_params) = match root {
        Value::Array(items) => (items, Value::Null),
        Value::Object(mut object) => {
            let raw_records = match object.remove("records") {
                Some(Value::Array(items)) => items,
                _ => return Err(DecodeError::RecordsNotSequence),
            };
            let search_params = object
                .remove("search_params")
                .or_else(|| {
                    object
                        .get_mut("metadata")
                        .and_then(Value::as_object_mut)
                        .and_then(|metadata| metadata.remove("search_params"))
                })
                .unwrap_or(Value::Null);
            (raw_records, search_params)
        }
        _ => return Err(DecodeError::RecordsNotSequence),
    };

    Ok(Feed {
        batch: decode_records(raw_records),
        search_params,
    })
}

/// Counts a json array without materialising its elements.
struct SequenceLen(usize);

impl<'de> Deserialize<'de> for SequenceLen {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CountVisitor;

        impl<'de> Visitor<'de> for CountVisitor {
            type Value = SequenceLen;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a sequence of records")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
                let mut len = 0;
                while seq.next_element::<IgnoredAny>()?.is_some() {
                    len += 1;
                }
                Ok(SequenceLen(len))
            }
        }

        deserializer.deserialize_seq(CountVisitor)
    }
}

#[derive(Deserialize)]
struct RawHeader {
    version: Option<String>,
    saved_at: Option<String>,
    records: Option<SequenceLen>,
}

/// Envelope fields only, for summaries that do not need the records.
#[derive(Debug, Clone, PartialEq)]
pub struct PayloadHeader {
    pub version: String,
    pub saved_at: Option<DateTime<Utc>>,
    /// Records physically present in the payload, before any validation.
    pub record_count: usize,
}

pub fn decode_header(payload: &str) -> Result<PayloadHeader, DecodeError> {
    let raw: RawHeader = serde_json::from_str(payload).map_err(|e| {
        if e.is_data() {
            // records present but not an array lands here
            DecodeError::RecordsNotSequence
        } else {
            DecodeError::Malformed(e)
        }
    })?;

    check_version(raw.version.as_deref())?;

    let Some(SequenceLen(record_count)) = raw.records else {
        return Err(DecodeError::RecordsNotSequence);
    };

    Ok(PayloadHeader {
        version: raw.version.unwrap_or_else(|| PAYLOAD_VERSION.to_string()),
        saved_at: parse_timestamp(raw.saved_at.as_deref()),
        record_count,
    })
}
