//! Novelty flags for listings.
//!
//! A listing is new while its identity was first observed within the aging
//! window. Flags are never stored with the dataset; they are recomputed from
//! the seen index each time records are classified, so a changed window takes
//! effect immediately.

pub mod seen;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::model::PropertyRecord;
use seen::{price_bucket, SeenIndex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Novelty {
    pub is_new: bool,
    pub first_seen_at: Option<DateTime<Utc>>,
}

impl Novelty {
    pub fn untracked() -> Self {
        Novelty {
            is_new: false,
            first_seen_at: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedRecord {
    pub record: PropertyRecord,
    pub novelty: Novelty,
}

/// New-vs-known counts for a classified batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NoveltySummary {
    pub new: usize,
    pub known: usize,
    pub untracked: usize,
}

/// Whether something first seen at `first_seen` is still new at `now`.
pub fn is_within_window(first_seen: DateTime<Utc>, now: DateTime<Utc>, max_age: Duration) -> bool {
    now - first_seen <= max_age
}

/// Flag each record as new or known, registering unseen identities.
///
/// Newly registered identities are persisted in one write at the end. A
/// failed write is logged; the flags are still returned.
pub fn classify(
    index: &mut SeenIndex,
    records: Vec<PropertyRecord>,
    max_age: Duration,
    now: DateTime<Utc>,
) -> Vec<ClassifiedRecord> {
    let mut registered = 0usize;

    let classified: Vec<ClassifiedRecord> = records
        .into_iter()
        .map(|record| {
            if !record.has_identity() {
                return ClassifiedRecord {
                    record,
                    novelty: Novelty::untracked(),
                };
            }

            let novelty = match index.first_seen_at(&record.id) {
                Some(first_seen) => Novelty {
                    is_new: is_within_window(first_seen, now, max_age),
                    first_seen_at: Some(first_seen),
                },
                None => {
                    let label = record.neighborhood.as_deref().unwrap_or("");
                    index.insert(&record.id, label, price_bucket(record.price), now);
                    registered += 1;
                    Novelty {
                        is_new: true,
                        first_seen_at: Some(now),
                    }
                }
            };

            ClassifiedRecord { record, novelty }
        })
        .collect();

    if registered > 0 {
        if let Err(e) = index.persist() {
            warn!(error = %e, registered, "failed to persist seen index");
        }
    }

    debug!(records = classified.len(), registered, "classified records");
    classified
}

pub fn summarize(classified: &[ClassifiedRecord]) -> NoveltySummary {
    classified
        .iter()
        .fold(NoveltySummary::default(), |mut summary, c| {
            match (c.novelty.is_new, c.novelty.first_seen_at) {
                (true, _) => summary.new += 1,
                (false, Some(_)) => summary.known += 1,
                (false, None) => summary.untracked += 1,
            }
            summary
        })
}
