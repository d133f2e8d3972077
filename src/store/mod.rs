//! Single-slot dataset storage.
//!
//! Holds exactly one dataset under the `real_estate_data` key:
//! - save replaces the whole payload in one write, or fails leaving it intact
//! - load treats a missing or corrupt payload as "no data"
//! - clear removes the dataset and nothing else (the seen index is separate)

pub mod backend;
pub mod codec;
pub mod quota;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::rc::Rc;
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::model::{Dataset, DatasetMetadata, PropertyRecord};
use backend::Backend;
use quota::StorageQuota;

pub const DATA_KEY: &str = "real_estate_data";

/// A dataset read back from storage.
#[derive(Debug)]
pub struct LoadedDataset {
    pub dataset: Dataset,
    /// Records dropped while decoding.
    pub skipped: usize,
    pub byte_size: u64,
}

/// Summary of the slot, built from the payload envelope only.
#[derive(Debug, Clone, Serialize)]
pub struct DatasetInfo {
    pub has_data: bool,
    pub byte_size: u64,
    pub record_count: usize,
    pub saved_at: Option<DateTime<Utc>>,
    pub quota: StorageQuota,
    pub durable: bool,
}

pub struct DurableStore {
    backend: Rc<dyn Backend>,
    ceiling_bytes: u64,
}

impl DurableStore {
    pub fn new(backend: Rc<dyn Backend>, ceiling_bytes: u64) -> Self {
        DurableStore {
            backend,
            ceiling_bytes,
        }
    }

    pub fn ceiling_bytes(&self) -> u64 {
        self.ceiling_bytes
    }

    /// Replace the stored dataset.
    pub fn save(
        &self,
        records: &[PropertyRecord],
        metadata: &DatasetMetadata,
    ) -> Result<StorageQuota, StoreError> {
        self.save_at(records, metadata, Utc::now())
    }

    /// Like [`save`](Self::save) with an explicit saved-at timestamp.
    pub fn save_at(
        &self,
        records: &[PropertyRecord],
        metadata: &DatasetMetadata,
        saved_at: DateTime<Utc>,
    ) -> Result<StorageQuota, StoreError> {
        let payload = codec::encode(records, metadata, saved_at)?;
        let size = quota::measure(&payload);

        if !quota::fits(size, self.ceiling_bytes) {
            warn!(size, ceiling = self.ceiling_bytes, "dataset rejected, storage ceiling exceeded");
            return Err(StoreError::QuotaExceeded {
                size,
                ceiling: self.ceiling_bytes,
            });
        }

        self.backend.put(DATA_KEY, &payload)?;

        info!(records = records.len(), bytes = size, "saved dataset");
        Ok(StorageQuota::new(size, self.ceiling_bytes))
    }

    /// Read the current dataset. None when empty, corrupt or unreadable.
    pub fn load(&self) -> Option<LoadedDataset> {
        let payload = self.read_payload()?;

        match codec::decode(&payload) {
            Ok(decoded) => {
                debug!(records = decoded.dataset.records.len(), skipped = decoded.skipped, "loaded dataset");
                Some(LoadedDataset {
                    dataset: decoded.dataset,
                    skipped: decoded.skipped,
                    byte_size: quota::measure(&payload),
                })
            }
            Err(e) => {
                warn!(error = %e, "stored dataset is corrupt, treating as empty");
                None
            }
        }
    }

    /// True when the slot holds a payload that `load` would accept.
    pub fn exists(&self) -> bool {
        self.read_payload()
            .is_some_and(|payload| codec::decode_header(&payload).is_ok())
    }

    /// Remove the stored dataset. The seen index is untouched.
    pub fn clear(&self) -> Result<(), StoreError> {
        self.backend.remove(DATA_KEY)?;
        info!("cleared stored dataset");
        Ok(())
    }

    pub fn info(&self) -> DatasetInfo {
        let durable = self.backend.is_durable();

        let Some(payload) = self.read_payload() else {
            return DatasetInfo {
                has_data: false,
                byte_size: 0,
                record_count: 0,
                saved_at: None,
                quota: StorageQuota::new(0, self.ceiling_bytes),
                durable,
            };
        };

        let byte_size = quota::measure(&payload);
        let header = codec::decode_header(&payload).ok();

        DatasetInfo {
            has_data: header.is_some(),
            byte_size,
            record_count: header.as_ref().map_or(0, |h| h.record_count),
            saved_at: header.and_then(|h| h.saved_at),
            quota: StorageQuota::new(byte_size, self.ceiling_bytes),
            durable,
        }
    }

    fn read_payload(&self) -> Option<String> {
        match self.backend.get(DATA_KEY) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "failed to read stored dataset");
                None
            }
        }
    }
}
